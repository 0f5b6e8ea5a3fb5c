//! 命令定义和实现

pub mod bitrates;
pub mod config;
pub mod connect;

pub use bitrates::BitratesCommand;
pub use config::ConfigCommand;
pub use connect::ConnectCommand;

//! 驱动层模块
//!
//! 把 CAN 总线包装成字节流连接：
//! - 会话建立与回滚（客户端注册、网络扫描、过滤器、波特率）
//! - 接收轮询线程 + 唤醒信号（容量 1 的通道）
//! - 接收帧分发与 Bus-Off 恢复
//! - 分块发送与发送余量查询
//!
//! # 使用示例
//!
//! ```
//! use pcanlink_can::SimBus;
//! use pcanlink_driver::{Session, SessionConfig};
//! use std::sync::Arc;
//!
//! let bus = Arc::new(SimBus::builder().net(1, "PCAN_USB", 1).build());
//! let config = SessionConfig::parse("PCAN_USB 0x7E8 0x7E0", 0).unwrap();
//! let mut session = Session::open(bus, config).unwrap();
//!
//! let sent = session.send(b"ATZ\r").unwrap();
//! assert_eq!(sent, 4);
//!
//! let mut received = Vec::new();
//! session.dispatch_pending(&mut received);
//! session.close();
//! ```

mod builder;
pub mod config;
pub mod dispatch;
mod error;
mod guard;
pub mod metrics;
pub mod poller;
pub mod recovery;
mod session;

pub use builder::{SessionBuilder, default_client_name};
pub use config::SessionConfig;
pub use dispatch::{ByteSink, Disposition, DrainStats};
pub use error::{ConfigError, SessionError};
pub use metrics::{MetricsSnapshot, SessionMetrics};
pub use poller::{AtomicPollerState, PollerState};
pub use recovery::RecoveryMethod;
pub use session::{Session, SessionHandles, transmit_headroom};

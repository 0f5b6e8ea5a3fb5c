//! # pcanlink CLI
//!
//! 把标准输入/输出桥接到 CAN 字节流会话（运行在内存模拟总线上）。
//!
//! ```bash
//! # 保存默认连接
//! pcanlink-cli config set --connection "PCAN_USB 0x7E8 0x7E0" --bitrate 500
//!
//! # 连接，并在总线上挂一个回显节点
//! echo "ATZ" | pcanlink-cli connect --echo
//!
//! # 支持的波特率
//! pcanlink-cli bitrates
//! ```
//!
//! 日志写到 stderr（`RUST_LOG` 控制，默认 `pcanlink=info`），stdout 只输出接收到的数据。

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod sink;

use commands::{BitratesCommand, ConfigCommand, ConnectCommand};

/// pcanlink CLI - CAN 字节流终端
#[derive(Parser, Debug)]
#[command(name = "pcanlink-cli")]
#[command(about = "Bridge stdin/stdout to a CAN byte-stream session", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认位于系统配置目录）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 打开会话并桥接 stdin/stdout
    Connect {
        #[command(flatten)]
        args: ConnectCommand,
    },

    /// 列出支持的波特率
    Bitrates {
        #[command(flatten)]
        args: BitratesCommand,
    },
}

fn main() -> Result<()> {
    // 日志走 stderr，stdout 留给数据
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("pcanlink=info"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => commands::config::default_config_file()?,
    };

    match cli.command {
        Commands::Config(cmd) => cmd.execute(&config_path),
        Commands::Connect { args } => args.execute(&config_path),
        Commands::Bitrates { args } => args.execute(),
    }
}

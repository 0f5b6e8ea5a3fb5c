//! 连接命令
//!
//! 在内存模拟总线上打开会话：
//! - stdin 读到的字节通过会话发送（发送余量不足时保留未发送部分，稍后重试）
//! - 唤醒信号到达时把接收数据写到 stdout
//! - `--echo` 在同一网络上挂一个 RX/TX 互换的回显会话
//!
//! stdin 结束后继续接收 `--linger-ms` 毫秒再退出；Ctrl+C 立即退出。

use crate::commands::config::CliConfig;
use crate::sink::WriteSink;
use anyhow::{Context, Result, bail};
use clap::Args;
use crossbeam_channel::{Receiver, bounded, never, select};
use pcanlink_can::SimBus;
use pcanlink_driver::{Session, SessionBuilder, SessionConfig};
use pcanlink_protocol::handle::MAX_NETS;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 主循环的空闲超时（检查 Ctrl+C 与待发送数据）
const TICK: Duration = Duration::from_millis(20);

/// 连接命令参数
#[derive(Args, Debug)]
pub struct ConnectCommand {
    /// 连接字符串 `<netname> <rxid> <txid>`（覆盖配置）
    pub connection: Option<String>,

    /// 波特率（kbit/s，覆盖配置）
    #[arg(short, long)]
    pub bitrate: Option<u32>,

    /// 客户端名称（覆盖配置）
    #[arg(long)]
    pub client_name: Option<String>,

    /// 模拟总线上配置的网络名（可重复，默认只有连接字符串中的网络）
    #[arg(long = "sim-net")]
    pub sim_nets: Vec<String>,

    /// 模拟网络不绑定硬件（虚拟网络）
    #[arg(long = "virtual")]
    pub virtual_net: bool,

    /// 挂一个回显节点
    #[arg(long)]
    pub echo: bool,

    /// 接收轮询间隔（毫秒）
    #[arg(long, default_value_t = 10)]
    pub poll_ms: u64,

    /// stdin 结束后继续接收的时间（毫秒）
    #[arg(long, default_value_t = 500)]
    pub linger_ms: u64,
}

impl ConnectCommand {
    pub fn execute(self, config_path: &Path) -> Result<()> {
        let stored = CliConfig::load(config_path)?;

        let line = self
            .connection
            .clone()
            .or(stored.connection)
            .context("No connection configured (use `config set --connection` or pass one)")?;
        let bitrate = self.bitrate.or(stored.bitrate).unwrap_or(0);
        let config = SessionConfig::parse(&line, bitrate).context("Invalid connection string")?;

        let bus = Arc::new(self.sim_bus(&config)?);
        let mut builder = SessionBuilder::new(bus.clone(), config.clone())
            .poll_interval(Duration::from_millis(self.poll_ms));
        if let Some(name) = self.client_name.clone().or(stored.client_name) {
            builder = builder.client_name(name);
        }
        let mut session = builder
            .build()
            .with_context(|| format!("Failed to open CAN device {}", config.net_name))?;

        let mut peer = if self.echo {
            let peer_config = SessionConfig::new(config.net_name.clone(), config.tx_id, config.rx_id);
            let peer = SessionBuilder::new(bus, peer_config)
                .client_name("pcanlink-echo")
                .poll_interval(Duration::from_millis(self.poll_ms))
                .build()
                .context("Failed to open echo peer")?;
            Some(peer)
        } else {
            None
        };

        let running = Arc::new(AtomicBool::new(true));
        let handler_flag = running.clone();
        ctrlc::set_handler(move || {
            handler_flag.store(false, Ordering::Release);
        })
        .context("Failed to set Ctrl-C handler")?;

        let result = self.bridge(&session, peer.as_ref(), &running);

        let snapshot = session.metrics().snapshot();
        info!(
            "Sent {} bytes in {} frames, received {} bytes, {} bus-off recoveries",
            snapshot.bytes_sent,
            snapshot.frames_sent,
            snapshot.bytes_forwarded,
            snapshot.bus_off_recoveries
        );

        if let Some(peer) = peer.as_mut() {
            peer.close();
        }
        session.close();
        result
    }

    fn sim_bus(&self, config: &SessionConfig) -> Result<SimBus> {
        let names = if self.sim_nets.is_empty() {
            vec![config.net_name.clone()]
        } else {
            self.sim_nets.clone()
        };
        if names.len() > usize::from(MAX_NETS) {
            bail!(
                "Too many simulated networks ({}, at most {})",
                names.len(),
                MAX_NETS
            );
        }

        let mut builder = SimBus::builder();
        for (slot, name) in (1..=MAX_NETS).zip(names) {
            let hw = if self.virtual_net { 0 } else { slot };
            builder = builder.net(slot, name, hw);
        }
        Ok(builder.build())
    }

    /// stdin → 会话 → stdout 主循环
    fn bridge(&self, session: &Session, peer: Option<&Session>, running: &AtomicBool) -> Result<()> {
        let input = spawn_stdin_reader()?;
        let wake = session
            .wake_receiver()
            .cloned()
            .context("Session closed before start")?;
        let peer_wake = peer.and_then(|p| p.wake_receiver().cloned());

        let no_input = never::<Vec<u8>>();
        let no_peer = never::<()>();
        let linger = Duration::from_millis(self.linger_ms);

        let mut out = WriteSink::new(io::stdout());
        let mut pending: Vec<u8> = Vec::new();
        let mut input_open = true;
        let mut linger_until: Option<Instant> = None;

        while running.load(Ordering::Acquire) {
            // 上次未发完的数据
            if !pending.is_empty() && session.send_ok() {
                let sent = session.send(&pending)?;
                pending.drain(..sent);
            }

            if !input_open && pending.is_empty() {
                let deadline = *linger_until.get_or_insert_with(|| Instant::now() + linger);
                if Instant::now() >= deadline {
                    break;
                }
            }

            // 有待发送数据时不再读 stdin
            let input_rx = if input_open && pending.is_empty() {
                &input
            } else {
                &no_input
            };
            let peer_rx = peer_wake.as_ref().unwrap_or(&no_peer);

            select! {
                recv(input_rx) -> msg => match msg {
                    Ok(bytes) => pending.extend_from_slice(&bytes),
                    Err(_) => {
                        debug!("stdin closed");
                        input_open = false;
                    },
                },
                recv(wake) -> msg => {
                    if msg.is_err() {
                        bail!("Receive poller stopped unexpectedly");
                    }
                    session.dispatch_pending(&mut out);
                },
                recv(peer_rx) -> msg => {
                    if msg.is_err() {
                        bail!("Echo peer poller stopped unexpectedly");
                    }
                    if let Some(peer) = peer {
                        echo(peer)?;
                    }
                },
                default(TICK) => {},
            }
        }

        if !pending.is_empty() {
            warn!("Discarding {} unsent bytes", pending.len());
        }
        Ok(())
    }
}

/// 回显节点：收到什么发回什么
fn echo(peer: &Session) -> Result<()> {
    let mut received = Vec::new();
    peer.dispatch_pending(&mut received);
    if received.is_empty() {
        return Ok(());
    }
    let sent = peer.send(&received)?;
    if sent < received.len() {
        warn!("Echo peer dropped {} bytes", received.len() - sent);
    }
    Ok(())
}

/// stdin 读取线程（阻塞读取不能放在主循环里）
fn spawn_stdin_reader() -> Result<Receiver<Vec<u8>>> {
    let (tx, rx) = bounded(16);
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            let mut stdin = io::stdin().lock();
            let mut buf = [0u8; 256];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    },
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!("stdin read failed: {}", e);
                        break;
                    },
                }
            }
        })
        .context("Failed to spawn stdin reader")?;
    Ok(rx)
}

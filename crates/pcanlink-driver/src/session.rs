//! 连接会话
//!
//! 一个会话独占一个客户端句柄和一个网络连接，二者在建立时一起创建、在关闭时一起释放。
//!
//! # 线程模型
//!
//! - 主控制流：建立、发送、分发接收帧、关闭
//! - 轮询线程：只查询接收队列深度并发出唤醒信号
//!
//! 两者之间只共享轮询状态和唤醒通道。

use crate::config::SessionConfig;
use crate::dispatch::{ByteSink, DrainStats, drain};
use crate::error::SessionError;
use crate::guard::SetupGuard;
use crate::metrics::SessionMetrics;
use crate::poller::{AtomicPollerState, Poller, PollerState};
use crate::recovery::{RecoveryMethod, clear_bus_off};
use crossbeam_channel::{Receiver, bounded};
use pcanlink_can::CanApi;
use pcanlink_protocol::bitrate::require_kbps;
use pcanlink_protocol::{
    CanFrame, ClientHandle, HwHandle, MAX_PAYLOAD, NetHandle, ParamCode, encode_chunks,
};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// 会话持有的驱动句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHandles {
    pub client: ClientHandle,
    pub net: NetHandle,
    /// `HwHandle::NONE` 表示虚拟网络
    pub hw: HwHandle,
}

/// 建立会话的可调参数（由 [`SessionBuilder`](crate::SessionBuilder) 填充）
#[derive(Debug, Clone)]
pub(crate) struct SessionOptions {
    pub(crate) client_name: String,
    pub(crate) poll_interval: Duration,
    pub(crate) settle_delay: Duration,
    pub(crate) net_slots: RangeInclusive<u8>,
}

/// 发送余量：每个空闲发送队列槽位按 8 字节计
///
/// 容量小于当前填充时返回 0。
pub fn transmit_headroom(capacity: u32, fill: u32) -> usize {
    capacity.saturating_sub(fill) as usize * MAX_PAYLOAD
}

/// 活动的 CAN 连接会话
///
/// 通过 [`SessionBuilder`](crate::SessionBuilder) 或 [`Session::open`] 创建。
/// `Drop` 时自动关闭。
pub struct Session {
    api: Arc<dyn CanApi>,
    config: SessionConfig,
    /// `None` 表示已关闭
    handles: Option<SessionHandles>,
    xmt_queue_size: u32,
    settle_delay: Duration,
    poller: Option<Poller>,
    poller_state: Arc<AtomicPollerState>,
    wake_rx: Option<Receiver<()>>,
    metrics: Arc<SessionMetrics>,
}

impl Session {
    /// 使用默认参数建立会话
    pub fn open(api: Arc<dyn CanApi>, config: SessionConfig) -> Result<Self, SessionError> {
        crate::SessionBuilder::new(api, config).build()
    }

    /// 按顺序执行建立步骤，任一致命步骤失败时回滚已获得的资源
    pub(crate) fn establish(
        api: Arc<dyn CanApi>,
        config: SessionConfig,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        info!("Opening CAN device {}", config.net_name);

        let metrics = Arc::new(SessionMetrics::new());
        let mut guard = SetupGuard::new(api.as_ref());

        // 1. 注册客户端
        let client = api
            .register_client(&options.client_name)
            .map_err(SessionError::Register)?;
        guard.client(client);
        debug!("Registered {} as {}", options.client_name, client);

        // 2. 扫描网络槽位（空槽位是正常的）
        let slot = find_net(api.as_ref(), &config.net_name, options.net_slots.clone())
            .ok_or_else(|| SessionError::NetworkNotFound(config.net_name.clone()))?;
        debug!("Network '{}' found at slot {}", config.net_name, slot);

        // 3. 连接网络
        let net = api
            .connect_to_net(client, &config.net_name)
            .map_err(|source| SessionError::Connect {
                net: config.net_name.clone(),
                source,
            })?;
        guard.connection(client, net);

        // 4. 网络对应的硬件（0 = 虚拟网络）
        let hw = api
            .hardware_of(net)
            .map_err(|source| SessionError::Hardware {
                net: config.net_name.clone(),
                source,
            })?;

        // 5. 精确匹配过滤，只注册 RX ID
        api.set_client_param(client, ParamCode::Exact11BitFilter, 1)
            .map_err(SessionError::Filter)?;
        let filter = CanFrame::data_frame(config.rx_id, &[]);
        api.register_msg(client, net, &filter, &filter)
            .map_err(SessionError::Filter)?;

        // 6. 波特率（0 = 不修改）
        let kbps = config.bitrate_kbps;
        if kbps != 0 {
            let btr = require_kbps(kbps)
                .map_err(|_| SessionError::UnsupportedBitrate(kbps))?
                .btr;
            if hw.is_virtual() {
                debug!("Virtual network, bitrate {}kbps not applied", kbps);
            } else {
                api.set_hw_param(hw, ParamCode::Baudrate, u32::from(btr))
                    .map_err(|source| SessionError::Bitrate { kbps, source })?;
            }
        }

        // 7. 计时器修正（旧驱动/硬件不支持）
        if let Err(e) = api.set_client_param(client, ParamCode::TimerFix, 1) {
            debug!("Timer fix not available: {}", e);
        }

        // 8. 唤醒通道与轮询线程
        let (wake_tx, wake_rx) = bounded(1);
        let poller = Poller::spawn(
            api.clone(),
            client,
            wake_tx,
            options.poll_interval,
            metrics.clone(),
        )
        .map_err(SessionError::Poller)?;

        guard.commit();

        // 9. 发送队列容量
        let xmt_queue_size = match api.get_client_param(client, ParamCode::XmtQueueSize) {
            Ok(size) => size,
            Err(e) => {
                warn!("Could not query transmit queue size: {}", e);
                0
            },
        };

        info!("RX-id={}, TX-id={}", config.rx_id, config.tx_id);

        Ok(Self {
            poller_state: poller.state().clone(),
            api,
            config,
            handles: Some(SessionHandles { client, net, hw }),
            xmt_queue_size,
            settle_delay: options.settle_delay,
            poller: Some(poller),
            wake_rx: Some(wake_rx),
            metrics,
        })
    }

    /// 发送字节流
    ///
    /// 按 8 字节切块逐帧写入。某一帧写入失败时放弃剩余的块，
    /// 返回实际发送的字节数，调用方自行保留未发送部分。
    pub fn send(&self, data: &[u8]) -> Result<usize, SessionError> {
        let handles = self.handles.ok_or(SessionError::Closed)?;

        let mut sent = 0;
        for frame in encode_chunks(self.config.tx_id, data) {
            match self.api.write(handles.client, handles.net, &frame) {
                Ok(()) => {
                    sent += frame.len as usize;
                    self.metrics.frames_sent.fetch_add(1, Ordering::Relaxed);
                },
                Err(e) => {
                    self.metrics.failed_writes.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "transmit buffer overflow (only sent {} from {} bytes): {}",
                        sent,
                        data.len(),
                        e
                    );
                    break;
                },
            }
        }

        self.metrics
            .bytes_sent
            .fetch_add(sent as u64, Ordering::Relaxed);
        trace!("Sent {}/{} bytes", sent, data.len());
        Ok(sent)
    }

    /// 当前可以接受的字节数
    ///
    /// - 虚拟网络的"硬件句柄无效"视为状态正常
    /// - Bus-Off 时触发恢复并返回 0
    /// - 其他状态错误返回 0
    pub fn send_buffer(&self) -> usize {
        let Some(handles) = self.handles else {
            return 0;
        };

        match self.api.status(handles.hw) {
            Ok(()) => {},
            Err(e) if e.is_bus_off() => {
                self.recover_bus_off();
                return 0;
            },
            Err(e) if e.is_illegal_hardware() => {},
            Err(e) => {
                debug!("Hardware status {}: {}", handles.hw, e);
                return 0;
            },
        }

        match self
            .api
            .get_client_param(handles.client, ParamCode::XmtQueueFill)
        {
            Ok(fill) => transmit_headroom(self.xmt_queue_size, fill),
            Err(e) => {
                debug!("Could not query transmit queue fill: {}", e);
                0
            },
        }
    }

    /// 是否可以发送
    pub fn send_ok(&self) -> bool {
        self.send_buffer() > 0
    }

    /// 会话打开期间始终为连接状态
    pub fn is_connected(&self) -> bool {
        self.handles.is_some()
    }

    /// 唤醒信号接收端（关闭后为 `None`）
    ///
    /// 收到信号后调用 [`dispatch_pending`](Self::dispatch_pending)。
    pub fn wake_receiver(&self) -> Option<&Receiver<()>> {
        self.wake_rx.as_ref()
    }

    /// 读空接收队列并把匹配的载荷交给 `sink`
    pub fn dispatch_pending<S: ByteSink + ?Sized>(&self, sink: &mut S) -> DrainStats {
        let Some(handles) = self.handles else {
            return DrainStats::default();
        };

        // 先消费掉已有的信号，读空之后到达的帧会产生新信号
        if let Some(wake) = &self.wake_rx {
            let _ = wake.try_recv();
        }

        let stats = drain(
            self.api.as_ref(),
            handles.client,
            self.config.rx_id,
            sink,
            || {
                self.recover_bus_off();
            },
        );

        let metrics = &self.metrics;
        metrics
            .frames_received
            .fetch_add(stats.frames_read as u64, Ordering::Relaxed);
        metrics
            .frames_dropped
            .fetch_add(stats.frames_dropped as u64, Ordering::Relaxed);
        metrics
            .bytes_forwarded
            .fetch_add(stats.bytes_forwarded as u64, Ordering::Relaxed);
        metrics
            .bytes_rejected
            .fetch_add(stats.bytes_rejected as u64, Ordering::Relaxed);
        stats
    }

    /// Bus-Off 恢复（每次调用尝试一次）
    pub fn recover_bus_off(&self) -> Option<RecoveryMethod> {
        let handles = self.handles?;
        warn!("CAN bus-off, trying to restart...");
        let method = clear_bus_off(self.api.as_ref(), handles.hw, self.settle_delay);
        self.metrics
            .bus_off_recoveries
            .fetch_add(1, Ordering::Relaxed);
        debug!("Bus-off recovery on {}: {:?}", handles.hw, method);
        Some(method)
    }

    /// 运行时重新配置不受支持，只记录日志
    pub fn reconfigure(&self, config: &SessionConfig) {
        info!(
            "Reconfiguration of CAN device {} to '{}' ignored",
            self.config.net_name, config
        );
    }

    /// 关闭会话
    ///
    /// 顺序：停止轮询并等待线程退出 → 释放唤醒通道 → 断开网络 → 注销客户端。
    /// 某一步失败不影响后续步骤。重复调用无副作用。
    pub fn close(&mut self) {
        let Some(handles) = self.handles.take() else {
            return;
        };
        info!("Closing CAN device {}", self.config.net_name);

        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
        self.wake_rx = None;

        if let Err(e) = self.api.disconnect_from_net(handles.client, handles.net) {
            warn!("Could not disconnect {} from {}: {}", handles.client, handles.net, e);
        }
        if let Err(e) = self.api.remove_client(handles.client) {
            warn!("Could not remove {}: {}", handles.client, e);
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn net_name(&self) -> &str {
        &self.config.net_name
    }

    /// 驱动句柄（关闭后为 `None`）
    pub fn handles(&self) -> Option<SessionHandles> {
        self.handles
    }

    /// 发送队列容量（帧）
    pub fn xmt_queue_size(&self) -> u32 {
        self.xmt_queue_size
    }

    pub fn poller_state(&self) -> PollerState {
        self.poller_state.get(Ordering::Acquire)
    }

    pub fn metrics(&self) -> &Arc<SessionMetrics> {
        &self.metrics
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("handles", &self.handles)
            .field("xmt_queue_size", &self.xmt_queue_size)
            .field("poller_state", &self.poller_state())
            .finish()
    }
}

/// 在槽位范围内按名称查找网络（大小写敏感）
///
/// 空槽位或查询失败的槽位被跳过。
fn find_net(api: &dyn CanApi, name: &str, slots: RangeInclusive<u8>) -> Option<u8> {
    slots.into_iter().find(|&slot| match api.get_net_name(NetHandle(slot)) {
        Ok(slot_name) => slot_name == name,
        Err(e) => {
            trace!("Net slot {} unavailable: {}", slot, e);
            false
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcanlink_can::SimBus;

    #[test]
    fn test_transmit_headroom() {
        assert_eq!(transmit_headroom(32767, 0), 32767 * 8);
        assert_eq!(transmit_headroom(10, 4), 48);
        assert_eq!(transmit_headroom(10, 10), 0);
        assert_eq!(transmit_headroom(10, 12), 0);
    }

    #[test]
    fn test_find_net_skips_gaps() {
        let bus = SimBus::builder()
            .net(3, "CAN_A", 1)
            .net(7, "CAN_B", 2)
            .net(20, "VCAN", 0)
            .build();
        assert_eq!(find_net(&bus, "CAN_B", 1..=32), Some(7));
        assert_eq!(find_net(&bus, "VCAN", 1..=32), Some(20));
        assert_eq!(find_net(&bus, "can_b", 1..=32), None);
        assert_eq!(find_net(&bus, "VCAN", 1..=10), None);
    }
}

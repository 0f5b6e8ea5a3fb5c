//! 接收轮询线程
//!
//! 驱动的单帧读取是同步调用，不能混入主控制流的事件处理。
//! 轮询线程只做一件事：按固定间隔查询接收队列深度，非空时发出唤醒信号，
//! 由主控制流调用 [`Session::dispatch_pending`](crate::Session::dispatch_pending) 读空队列。
//!
//! 唤醒信号是容量为 1 的通道：只携带"有数据"这个事实，不携带帧。
//! 通道已满时重复发送直接忽略，消费者读空之前信号不会丢失。

use crate::metrics::SessionMetrics;
use crossbeam_channel::{Sender, TrySendError};
use pcanlink_can::CanApi;
use pcanlink_protocol::{ClientHandle, ParamCode};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, trace};

/// 轮询线程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PollerState {
    /// 正在轮询
    #[default]
    Running = 0,
    /// 已请求停止，线程将在下一次循环开头退出
    Stopping = 1,
    /// 线程已退出，不再发出任何驱动调用
    Stopped = 2,
}

impl PollerState {
    /// 从 u8 转换，无效值视为 `Stopped`
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Running,
            1 => Self::Stopping,
            _ => Self::Stopped,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

/// 轮询线程状态（原子版本，会话与轮询线程共享）
///
/// 单写者单读者：会话写 `Stopping`，轮询线程写 `Stopped`。
#[derive(Debug)]
pub struct AtomicPollerState {
    inner: AtomicU8,
}

impl AtomicPollerState {
    pub fn new(state: PollerState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    pub fn get(&self, ordering: Ordering) -> PollerState {
        PollerState::from_u8(self.inner.load(ordering))
    }

    pub fn set(&self, state: PollerState, ordering: Ordering) {
        self.inner.store(state.as_u8(), ordering);
    }

    /// 仅当当前为 `Running` 时切换到 `Stopping`
    ///
    /// 返回 `true` 表示本次调用发出了停止请求。
    pub fn request_stop(&self) -> bool {
        self.inner
            .compare_exchange(
                PollerState::Running.as_u8(),
                PollerState::Stopping.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

impl Default for AtomicPollerState {
    fn default() -> Self {
        Self::new(PollerState::Running)
    }
}

/// 轮询循环
///
/// # 参数
/// - `api`: 驱动
/// - `client`: 被轮询的客户端
/// - `state`: 共享状态（非 `Running` 时退出）
/// - `wake`: 唤醒信号（容量 1）
/// - `interval`: 轮询间隔
/// - `metrics`: 指标
///
/// 查询失败违反驱动契约，轮询线程记录错误后退出（状态变为 `Stopped`）。
pub fn rx_poll_loop(
    api: Arc<dyn CanApi>,
    client: ClientHandle,
    state: Arc<AtomicPollerState>,
    wake: Sender<()>,
    interval: Duration,
    metrics: Arc<SessionMetrics>,
) {
    loop {
        if !state.get(Ordering::Acquire).is_running() {
            trace!("RX poller: stop requested, exiting");
            break;
        }

        match api.get_client_param(client, ParamCode::RcvQueueFill) {
            Ok(0) => {},
            Ok(fill) => {
                trace!("RX poller: {} frame(s) pending", fill);
                match wake.try_send(()) {
                    Ok(()) => {
                        metrics.poll_wakeups.fetch_add(1, Ordering::Relaxed);
                    },
                    // 上一个信号尚未被消费
                    Err(TrySendError::Full(())) => {},
                    Err(TrySendError::Disconnected(())) => {
                        debug!("RX poller: wake receiver dropped, exiting");
                        break;
                    },
                }
            },
            Err(e) => {
                metrics.poll_errors.fetch_add(1, Ordering::Relaxed);
                error!("RX poller: receive queue query failed for {}: {}", client, e);
                break;
            },
        }

        thread::sleep(interval);
    }

    state.set(PollerState::Stopped, Ordering::Release);
}

/// 轮询线程句柄
pub(crate) struct Poller {
    state: Arc<AtomicPollerState>,
    thread: Option<JoinHandle<()>>,
}

impl Poller {
    /// 启动轮询线程
    pub(crate) fn spawn(
        api: Arc<dyn CanApi>,
        client: ClientHandle,
        wake: Sender<()>,
        interval: Duration,
        metrics: Arc<SessionMetrics>,
    ) -> std::io::Result<Self> {
        let state = Arc::new(AtomicPollerState::new(PollerState::Running));
        let thread_state = state.clone();
        let thread = thread::Builder::new()
            .name("pcanlink-rx".to_string())
            .spawn(move || rx_poll_loop(api, client, thread_state, wake, interval, metrics))?;

        Ok(Self {
            state,
            thread: Some(thread),
        })
    }

    pub(crate) fn state(&self) -> &Arc<AtomicPollerState> {
        &self.state
    }

    /// 请求停止并等待线程退出
    ///
    /// 线程每个轮询间隔检查一次状态，join 的等待时间有上界。
    pub(crate) fn stop(&mut self) {
        self.state.request_stop();
        if let Some(handle) = self.thread.take()
            && handle.join().is_err()
        {
            error!("RX poller thread panicked");
        }
        self.state.set(PollerState::Stopped, Ordering::Release);
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use pcanlink_can::SimBus;
    use pcanlink_can::sim::SimOp;
    use pcanlink_protocol::status::codes;
    use pcanlink_protocol::{CanFrame, CanId};
    use std::time::Instant;

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        false
    }

    fn setup() -> (Arc<SimBus>, ClientHandle, CanId) {
        let bus = Arc::new(SimBus::builder().net(1, "CAN_A", 1).build());
        let client = bus.register_client("poller").unwrap();
        let net = bus.connect_to_net(client, "CAN_A").unwrap();
        let rx = CanId::standard(0x100).unwrap();
        let frame = CanFrame::data_frame(rx, &[]);
        bus.register_msg(client, net, &frame, &frame).unwrap();
        (bus, client, rx)
    }

    #[test]
    fn test_state_conversion() {
        assert_eq!(PollerState::from_u8(0), PollerState::Running);
        assert_eq!(PollerState::from_u8(1), PollerState::Stopping);
        assert_eq!(PollerState::from_u8(2), PollerState::Stopped);
        assert_eq!(PollerState::from_u8(200), PollerState::Stopped);
    }

    #[test]
    fn test_request_stop_only_from_running() {
        let state = AtomicPollerState::default();
        assert!(state.request_stop());
        assert_eq!(state.get(Ordering::Acquire), PollerState::Stopping);
        assert!(!state.request_stop());

        state.set(PollerState::Stopped, Ordering::Release);
        assert!(!state.request_stop());
        assert_eq!(state.get(Ordering::Acquire), PollerState::Stopped);
    }

    #[test]
    fn test_signals_when_queue_non_empty() {
        let (bus, client, rx) = setup();
        let (tx, wake) = bounded(1);
        let metrics = Arc::new(SessionMetrics::new());
        let mut poller = Poller::spawn(
            bus.clone(),
            client,
            tx,
            Duration::from_millis(1),
            metrics.clone(),
        )
        .unwrap();

        // 空队列不发信号
        assert!(wake.recv_timeout(Duration::from_millis(30)).is_err());

        bus.inject("CAN_A", CanFrame::data_frame(rx, &[1, 2]));
        assert!(wake.recv_timeout(Duration::from_secs(2)).is_ok());

        // 未读空前重复信号被合并，不会阻塞轮询线程
        thread::sleep(Duration::from_millis(20));
        assert!(wake.len() <= 1);
        assert!(metrics.snapshot().poll_wakeups >= 1);

        poller.stop();
        assert_eq!(poller.state().get(Ordering::Acquire), PollerState::Stopped);
    }

    #[test]
    fn test_query_failure_stops_poller() {
        let (bus, client, _) = setup();
        let (tx, _wake) = bounded(1);
        let metrics = Arc::new(SessionMetrics::new());
        let poller = Poller::spawn(
            bus.clone(),
            client,
            tx,
            Duration::from_millis(1),
            metrics.clone(),
        )
        .unwrap();

        bus.fail(SimOp::GetClientParam, codes::ILLCLIENT);
        let state = poller.state().clone();
        assert!(wait_for(|| state.get(Ordering::Acquire) == PollerState::Stopped));
        assert_eq!(metrics.snapshot().poll_errors, 1);
    }

    #[test]
    fn test_exits_when_receiver_dropped() {
        let (bus, client, rx) = setup();
        let (tx, wake) = bounded(1);
        drop(wake);
        let poller = Poller::spawn(
            bus.clone(),
            client,
            tx,
            Duration::from_millis(1),
            Arc::new(SessionMetrics::new()),
        )
        .unwrap();

        bus.inject("CAN_A", CanFrame::data_frame(rx, &[1]));
        let state = poller.state().clone();
        assert!(wait_for(|| state.get(Ordering::Acquire) == PollerState::Stopped));
    }

    #[test]
    fn test_drop_joins_thread() {
        let (bus, client, _) = setup();
        let (tx, _wake) = bounded(1);
        let poller = Poller::spawn(
            bus.clone(),
            client,
            tx,
            Duration::from_millis(1),
            Arc::new(SessionMetrics::new()),
        )
        .unwrap();
        let state = poller.state().clone();
        drop(poller);
        assert_eq!(state.get(Ordering::Acquire), PollerState::Stopped);
    }
}

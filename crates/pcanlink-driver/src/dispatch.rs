//! 接收帧分发
//!
//! 收到唤醒信号后读空接收队列：
//! - 数据帧：有效 ID 等于配置的 RX ID 时，载荷交给上层；否则丢弃（硬件过滤不保证精确）
//! - 状态报文：Bus-Off 位置位时触发恢复
//! - 其他帧：丢弃
//!
//! 读到"队列空"或任何其他错误都结束本轮读取。

use pcanlink_can::CanApi;
use pcanlink_protocol::{CanFrame, CanId, ClientHandle, MsgKind};
use tracing::{debug, trace, warn};

/// 上层字节流消费者
pub trait ByteSink {
    /// 交付字节，返回实际接收的字节数
    fn deliver(&mut self, bytes: &[u8]) -> usize;
}

impl ByteSink for Vec<u8> {
    fn deliver(&mut self, bytes: &[u8]) -> usize {
        self.extend_from_slice(bytes);
        bytes.len()
    }
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    fn deliver(&mut self, bytes: &[u8]) -> usize {
        (**self).deliver(bytes)
    }
}

/// 单帧的分发结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition<'a> {
    /// 交给上层的载荷
    Forward(&'a [u8]),
    /// 状态报文报告 Bus-Off
    BusOff,
    /// 丢弃
    Discard,
}

/// 判定单帧如何处理
pub fn classify(frame: &CanFrame, rx_id: CanId) -> Disposition<'_> {
    match frame.kind {
        MsgKind::Standard | MsgKind::Extended => {
            if frame.matches(rx_id) {
                Disposition::Forward(frame.payload())
            } else {
                Disposition::Discard
            }
        },
        MsgKind::Status => match frame.status_word() {
            Some(word) if word.bus_off() => Disposition::BusOff,
            _ => Disposition::Discard,
        },
        MsgKind::Remote | MsgKind::Error | MsgKind::Echo => Disposition::Discard,
    }
}

/// 一轮读取的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// 读出的帧数
    pub frames_read: usize,
    /// 丢弃的帧数
    pub frames_dropped: usize,
    /// 交给上层的字节数
    pub bytes_forwarded: usize,
    /// 上层拒收的字节数
    pub bytes_rejected: usize,
    /// 触发的 Bus-Off 恢复次数
    pub bus_off_events: usize,
}

/// 读空接收队列
///
/// 上层拒收的字节只记录日志，不重试。
pub fn drain<S: ByteSink + ?Sized>(
    api: &dyn CanApi,
    client: ClientHandle,
    rx_id: CanId,
    sink: &mut S,
    mut on_bus_off: impl FnMut(),
) -> DrainStats {
    let mut stats = DrainStats::default();

    loop {
        let received = match api.read(client) {
            Ok(received) => received,
            Err(e) if e.is_queue_empty() => break,
            Err(e) => {
                debug!("Receive drain stopped on {}: {}", client, e);
                break;
            },
        };
        stats.frames_read += 1;

        match classify(&received.frame, rx_id) {
            Disposition::Forward(payload) => {
                let accepted = sink.deliver(payload).min(payload.len());
                stats.bytes_forwarded += accepted;
                if accepted < payload.len() {
                    let rejected = payload.len() - accepted;
                    stats.bytes_rejected += rejected;
                    warn!(
                        "Upstream rejected {} of {} received bytes, dropping",
                        rejected,
                        payload.len()
                    );
                }
            },
            Disposition::BusOff => {
                stats.bus_off_events += 1;
                on_bus_off();
            },
            Disposition::Discard => {
                trace!(
                    "Discarding {:?} frame id=0x{:X} on {}",
                    received.frame.kind, received.frame.id, received.net
                );
                stats.frames_dropped += 1;
            },
        }
    }

    stats
}

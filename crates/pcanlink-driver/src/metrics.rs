//! 会话运行指标
//!
//! 原子计数器，轮询线程与主控制流都可以无锁更新和读取。

use std::sync::atomic::{AtomicU64, Ordering};

/// 会话指标
///
/// # 使用示例
///
/// ```rust
/// use pcanlink_driver::SessionMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = SessionMetrics::default();
/// metrics.frames_sent.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(metrics.snapshot().frames_sent, 1);
/// ```
#[derive(Debug, Default)]
pub struct SessionMetrics {
    /// 成功写入驱动的帧数
    pub frames_sent: AtomicU64,

    /// 成功发送的字节数
    pub bytes_sent: AtomicU64,

    /// 被驱动拒绝的写入次数（发送队列满或总线错误）
    pub failed_writes: AtomicU64,

    /// 从接收队列读出的帧数（含被丢弃的帧）
    pub frames_received: AtomicU64,

    /// 丢弃的帧数（ID 不匹配或非数据帧）
    pub frames_dropped: AtomicU64,

    /// 交给上层的字节数
    pub bytes_forwarded: AtomicU64,

    /// 上层拒收的字节数（已丢失）
    pub bytes_rejected: AtomicU64,

    /// Bus-Off 恢复次数
    pub bus_off_recoveries: AtomicU64,

    /// 轮询线程发出的唤醒信号数
    pub poll_wakeups: AtomicU64,

    /// 轮询线程查询失败次数
    pub poll_errors: AtomicU64,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            failed_writes: self.failed_writes.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            bytes_forwarded: self.bytes_forwarded.load(Ordering::Relaxed),
            bytes_rejected: self.bytes_rejected.load(Ordering::Relaxed),
            bus_off_recoveries: self.bus_off_recoveries.load(Ordering::Relaxed),
            poll_wakeups: self.poll_wakeups.load(Ordering::Relaxed),
            poll_errors: self.poll_errors.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        for counter in [
            &self.frames_sent,
            &self.bytes_sent,
            &self.failed_writes,
            &self.frames_received,
            &self.frames_dropped,
            &self.bytes_forwarded,
            &self.bytes_rejected,
            &self.bus_off_recoveries,
            &self.poll_wakeups,
            &self.poll_errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// 指标快照（普通整数，便于打印和比较）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub failed_writes: u64,
    pub frames_received: u64,
    pub frames_dropped: u64,
    pub bytes_forwarded: u64,
    pub bytes_rejected: u64,
    pub bus_off_recoveries: u64,
    pub poll_wakeups: u64,
    pub poll_errors: u64,
}

impl MetricsSnapshot {
    /// 发送失败率（百分比）
    pub fn write_failure_rate(&self) -> f64 {
        let attempts = self.frames_sent + self.failed_writes;
        if attempts == 0 {
            0.0
        } else {
            (self.failed_writes as f64 / attempts as f64) * 100.0
        }
    }
}

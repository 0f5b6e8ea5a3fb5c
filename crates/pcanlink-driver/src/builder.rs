//! Builder 模式实现
//!
//! 提供链式构造 [`Session`] 的便捷方式。

use crate::config::{DEFAULT_NET_SLOTS, DEFAULT_POLL_INTERVAL, DEFAULT_SETTLE_DELAY, SessionConfig};
use crate::error::SessionError;
use crate::session::{Session, SessionOptions};
use pcanlink_can::CanApi;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

/// 未能取得可执行文件名时使用的客户端名称
const FALLBACK_CLIENT_NAME: &str = "pcanlink";

/// Session Builder（链式构造）
///
/// # Example
///
/// ```
/// use pcanlink_can::SimBus;
/// use pcanlink_driver::{SessionBuilder, SessionConfig};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let bus = Arc::new(SimBus::builder().net(1, "PCAN_USB", 1).build());
/// let config = SessionConfig::parse("PCAN_USB 0x7E8 0x7E0", 500).unwrap();
///
/// let session = SessionBuilder::new(bus, config)
///     .client_name("tester")
///     .poll_interval(Duration::from_millis(5))
///     .build()
///     .unwrap();
/// assert!(session.is_connected());
/// ```
pub struct SessionBuilder {
    api: Arc<dyn CanApi>,
    config: SessionConfig,
    /// 向驱动注册的客户端名称
    client_name: Option<String>,
    poll_interval: Duration,
    settle_delay: Duration,
    net_slots: RangeInclusive<u8>,
}

impl SessionBuilder {
    /// 创建新的 Builder
    pub fn new(api: Arc<dyn CanApi>, config: SessionConfig) -> Self {
        Self {
            api,
            config,
            client_name: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
            net_slots: DEFAULT_NET_SLOTS,
        }
    }

    /// 设置客户端名称（可选，默认为可执行文件名）
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    /// 设置接收轮询间隔（可选，默认 10ms）
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// 设置 Bus-Off 恢复后的稳定等待时间（可选，默认 100ms）
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// 设置扫描的网络槽位范围（可选，默认 1..=32）
    pub fn net_slots(mut self, slots: RangeInclusive<u8>) -> Self {
        self.net_slots = slots;
        self
    }

    /// 建立会话
    ///
    /// # Errors
    /// 返回第一个失败步骤对应的 [`SessionError`]，失败前获得的驱动资源已全部释放。
    pub fn build(self) -> Result<Session, SessionError> {
        let options = SessionOptions {
            client_name: self.client_name.unwrap_or_else(default_client_name),
            poll_interval: self.poll_interval,
            settle_delay: self.settle_delay,
            net_slots: self.net_slots,
        };
        Session::establish(self.api, self.config, options)
    }
}

/// 可执行文件名（不含扩展名）
pub fn default_client_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_CLIENT_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcanlink_can::SimBus;
    use pcanlink_can::sim::ApiCall;
    use pcanlink_protocol::CanId;

    fn config() -> SessionConfig {
        SessionConfig::new(
            "CAN_A",
            CanId::standard(0x7E8).unwrap(),
            CanId::standard(0x7E0).unwrap(),
        )
    }

    #[test]
    fn test_defaults() {
        let bus = Arc::new(SimBus::builder().build());
        let builder = SessionBuilder::new(bus, config());
        assert_eq!(builder.poll_interval, Duration::from_millis(10));
        assert_eq!(builder.settle_delay, Duration::from_millis(100));
        assert_eq!(builder.net_slots, 1..=32);
        assert!(builder.client_name.is_none());
    }

    #[test]
    fn test_default_client_name_is_executable_stem() {
        let name = default_client_name();
        assert!(!name.is_empty());
        assert!(!name.contains('/'));
    }

    #[test]
    fn test_client_name_reaches_driver() {
        let bus = Arc::new(SimBus::builder().net(1, "CAN_A", 1).record_calls().build());
        let _session = SessionBuilder::new(bus.clone(), config())
            .client_name("terminal")
            .build()
            .unwrap();
        assert_eq!(bus.calls()[0], ApiCall::RegisterClient("terminal".to_string()));
    }
}

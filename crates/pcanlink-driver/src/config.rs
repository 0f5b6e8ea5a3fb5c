//! 连接配置
//!
//! 外部配置只有两项：
//! - 连接字符串 `<netname> <rxid> <txid>`，分隔符为空格、逗号、分号或冒号（可混用、可重复）
//! - 波特率（kbit/s），`0` 表示不修改硬件当前波特率

use crate::error::ConfigError;
use pcanlink_protocol::CanId;
use std::fmt;
use std::ops::RangeInclusive;
use std::time::Duration;

/// 连接字符串允许的分隔符
pub const SEPARATORS: [char; 4] = [' ', ',', ';', ':'];

/// 默认接收轮询间隔
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// 默认 Bus-Off 恢复后的稳定等待时间
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// 默认扫描的网络槽位
pub const DEFAULT_NET_SLOTS: RangeInclusive<u8> = 1..=pcanlink_protocol::handle::MAX_NETS;

/// 会话配置（解析后不可变）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// 网络名称（大小写敏感）
    pub net_name: String,
    /// 接收标识符
    pub rx_id: CanId,
    /// 发送标识符
    pub tx_id: CanId,
    /// 波特率（kbit/s），`0` = 不修改
    pub bitrate_kbps: u32,
}

impl SessionConfig {
    pub fn new(net_name: impl Into<String>, rx_id: CanId, tx_id: CanId) -> Self {
        Self {
            net_name: net_name.into(),
            rx_id,
            tx_id,
            bitrate_kbps: 0,
        }
    }

    pub fn with_bitrate(mut self, kbps: u32) -> Self {
        self.bitrate_kbps = kbps;
        self
    }

    /// 解析连接字符串
    ///
    /// 多余的字段被忽略。
    ///
    /// # Example
    ///
    /// ```
    /// use pcanlink_driver::SessionConfig;
    ///
    /// let config = SessionConfig::parse("PCAN_USB:0x7E8,0x7E0", 500).unwrap();
    /// assert_eq!(config.net_name, "PCAN_USB");
    /// assert_eq!(config.rx_id.raw(), 0x7E8);
    /// assert_eq!(config.tx_id.raw(), 0x7E0);
    /// assert_eq!(config.bitrate_kbps, 500);
    /// ```
    pub fn parse(line: &str, bitrate_kbps: u32) -> Result<Self, ConfigError> {
        let mut fields = line
            .split(|c: char| SEPARATORS.contains(&c))
            .filter(|field| !field.is_empty());

        let net_name = fields.next().ok_or(ConfigError::MissingField("netname"))?;
        let rx_id = parse_id(fields.next(), "rxid")?;
        let tx_id = parse_id(fields.next(), "txid")?;

        Ok(Self {
            net_name: net_name.to_string(),
            rx_id,
            tx_id,
            bitrate_kbps,
        })
    }
}

fn parse_id(field: Option<&str>, name: &'static str) -> Result<CanId, ConfigError> {
    let text = field.ok_or(ConfigError::MissingField(name))?;
    CanId::parse(text).map_err(|source| ConfigError::InvalidIdentifier {
        field: name,
        source,
    })
}

/// 输出可被 [`SessionConfig::parse`] 重新解析的连接字符串
impl fmt::Display for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.net_name, self.rx_id, self.tx_id)
    }
}

//! 驱动层错误类型定义

use pcanlink_can::ApiError;
use pcanlink_protocol::ProtocolError;
use thiserror::Error;

/// 连接配置解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 缺少字段（网络名、RX ID 或 TX ID）
    #[error("Invalid configuration! (Use: 'netname rxid txid'): missing {0}")]
    MissingField(&'static str),

    /// 标识符不是合法的整数字面量，或超出范围
    #[error("Invalid configuration! (Use: 'netname rxid txid'): bad {field}: {source}")]
    InvalidIdentifier {
        field: &'static str,
        #[source]
        source: ProtocolError,
    },
}

/// 会话错误类型
///
/// 建立连接的每一步失败都是致命的，错误信息描述第一个失败的步骤。
#[derive(Error, Debug)]
pub enum SessionError {
    /// 配置错误
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// 注册驱动客户端失败（驱动未加载或资源耗尽）
    #[error("Could not register to PEAK CAN driver: {0}")]
    Register(#[source] ApiError),

    /// 所有网络槽位中都没有该名称
    #[error("Could not register to CAN network '{0}' (not existing?)")]
    NetworkNotFound(String),

    /// 连接网络失败
    #[error("Could not register to CAN network '{net}' (not existing?): {source}")]
    Connect {
        net: String,
        #[source]
        source: ApiError,
    },

    /// 查询网络对应的硬件失败
    #[error("Could not query CAN hardware of network '{net}': {source}")]
    Hardware {
        net: String,
        #[source]
        source: ApiError,
    },

    /// 接收过滤器设置失败
    #[error("Could not set CAN RX filter: {0}")]
    Filter(#[source] ApiError),

    /// 波特率不在对照表中
    #[error("Could not set CAN bitrate ({0}kbps)")]
    UnsupportedBitrate(u32),

    /// 驱动拒绝设置波特率
    #[error("Could not set CAN bitrate ({kbps}kbps): {source}")]
    Bitrate {
        kbps: u32,
        #[source]
        source: ApiError,
    },

    /// 接收轮询线程或唤醒信号创建失败
    #[error("Could not create RX thread or event: {0}")]
    Poller(#[source] std::io::Error),

    /// 会话已关闭
    #[error("Session is closed")]
    Closed,

    /// 协议错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 其他驱动错误
    #[error("CAN driver error: {0}")]
    Api(#[from] ApiError),
}

//! # pcanlink Protocol
//!
//! CAN 字节流桥接的协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `ids`: 配置标识符（最高位标记扩展帧）
//! - `frame`: CAN 帧与消息类型，字节块 ↔ 帧转换
//! - `bitrate`: 波特率 → BTR0BTR1 寄存器码对照表
//! - `status`: 驱动状态字 / 返回码位域
//! - `handle`: 硬件、网络、客户端句柄与参数码
//!
//! ## 在架构中的位置
//!
//! ```text
//! pcanlink-driver (Session / Poller / Dispatcher)
//!     ↓ encode_chunks() / CanFrame::payload()
//! pcanlink-protocol (此 crate)
//!     ↓ CanFrame
//! pcanlink-can (CanApi 驱动契约)
//! ```

pub mod bitrate;
pub mod frame;
pub mod handle;
pub mod ids;
pub mod status;

// 重新导出常用类型
pub use bitrate::{BITRATES, Bitrate, btr_for_kbps};
pub use frame::{CanFrame, MAX_PAYLOAD, MsgKind, encode_chunks};
pub use handle::{ClientHandle, HwHandle, NetHandle, ParamCode};
pub use ids::{CanId, EXTENDED_FLAG};
pub use status::{HandleFault, StatusWord};

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid identifier literal: {0:?}")]
    InvalidLiteral(String),

    #[error("CAN ID 0x{id:X} out of range (max 0x{max:X})")]
    IdOutOfRange { id: u32, max: u32 },

    #[error("Unsupported bitrate: {0} kbit/s")]
    UnsupportedBitrate(u32),
}

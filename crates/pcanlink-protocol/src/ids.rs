//! 配置标识符定义
//!
//! 连接配置中的 RX/TX 标识符是 32 位整数：
//! - Bit 31（`0x8000_0000`）：1 = 扩展帧（29-bit），0 = 标准帧（11-bit）
//! - Bit 0-28：数值 ID
//!
//! 文本形式按 C 整数字面量解析（`0x` 十六进制、前导 `0` 八进制、否则十进制）。

use crate::ProtocolError;
use crate::frame::MsgKind;
use std::fmt;
use std::str::FromStr;

/// 扩展帧标记位
pub const EXTENDED_FLAG: u32 = 0x8000_0000;

/// 标准帧 ID 上限（11-bit）
pub const STANDARD_ID_MAX: u32 = 0x7FF;

/// 扩展帧 ID 上限（29-bit）
pub const EXTENDED_ID_MAX: u32 = 0x1FFF_FFFF;

/// 带扩展标记的 CAN 标识符
///
/// 内部保存原始 32 位值（含标记位），构造时校验数值范围。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u32", into = "u32"))]
pub struct CanId(u32);

impl CanId {
    /// 创建标准帧标识符
    pub fn standard(id: u32) -> Result<Self, ProtocolError> {
        Self::from_raw(id & !EXTENDED_FLAG)
    }

    /// 创建扩展帧标识符
    pub fn extended(id: u32) -> Result<Self, ProtocolError> {
        Self::from_raw(id | EXTENDED_FLAG)
    }

    /// 从带标记位的原始值创建
    pub fn from_raw(raw: u32) -> Result<Self, ProtocolError> {
        let numeric = raw & !EXTENDED_FLAG;
        let max = if raw & EXTENDED_FLAG != 0 {
            EXTENDED_ID_MAX
        } else {
            STANDARD_ID_MAX
        };
        if numeric > max {
            return Err(ProtocolError::IdOutOfRange { id: numeric, max });
        }
        Ok(Self(raw))
    }

    /// 按 C 整数字面量解析（`0x7E0`、`0x800001A0`、`2016`、`03740`）
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let raw = parse_c_u32(text).ok_or_else(|| ProtocolError::InvalidLiteral(text.to_string()))?;
        Self::from_raw(raw)
    }

    /// 原始值（含扩展标记位），用于与接收帧的有效 ID 比较
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// 数值 ID（去掉标记位）
    pub const fn numeric(self) -> u32 {
        self.0 & !EXTENDED_FLAG
    }

    pub const fn is_extended(self) -> bool {
        self.0 & EXTENDED_FLAG != 0
    }

    /// 该标识符对应的数据帧类型
    pub const fn kind(self) -> MsgKind {
        if self.is_extended() {
            MsgKind::Extended
        } else {
            MsgKind::Standard
        }
    }
}

impl fmt::Display for CanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl FromStr for CanId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<u32> for CanId {
    type Error = ProtocolError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}

impl From<CanId> for u32 {
    fn from(id: CanId) -> Self {
        id.raw()
    }
}

/// `strtoul(text, NULL, 0)` 的严格版本：整个字符串必须是合法字面量
fn parse_c_u32(text: &str) -> Option<u32> {
    let text = text.trim();
    let text = text.strip_prefix('+').unwrap_or(text);

    let (digits, radix) = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        (hex, 16)
    } else if text.len() > 1 && text.starts_with('0') {
        (&text[1..], 8)
    } else {
        (text, 10)
    };

    // from_str_radix 自己也接受符号位，这里不允许
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    u32::from_str_radix(digits, radix).ok()
}

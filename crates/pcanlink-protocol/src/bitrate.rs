//! 波特率对照表
//!
//! 将配置中的 kbit/s 值（或其文本标签）映射为硬件 BTR0BTR1 位定时寄存器码。
//! 纯查表，无状态。

use crate::ProtocolError;

/// 单个波特率条目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bitrate {
    /// 文本标签（如 "500"）
    pub label: &'static str,
    /// kbit/s
    pub kbps: u32,
    /// BTR0BTR1 寄存器码
    pub btr: u16,
}

/// 支持的全部波特率
///
/// 40/200/400/800 kbit/s 不在驱动的预定义常量中，寄存器码按 16 MHz 时钟计算：
/// - 40K:  T1 = 17, T2 = 3, SP = 85%, SJW = 2
/// - 200K: T1 = 14, T2 = 6, SP = 70%, SJW = 3
/// - 400K: T1 = 15, T2 = 5, SP = 75%, SJW = 3
/// - 800K: T1 = 8,  T2 = 2, SP = 80%, SJW = 1
pub const BITRATES: [Bitrate; 13] = [
    Bitrate { label: "5", kbps: 5, btr: 0x7F7F },
    Bitrate { label: "10", kbps: 10, btr: 0x672F },
    Bitrate { label: "20", kbps: 20, btr: 0x532F },
    Bitrate { label: "40", kbps: 40, btr: 0x492F },
    Bitrate { label: "50", kbps: 50, btr: 0x472F },
    Bitrate { label: "100", kbps: 100, btr: 0x432F },
    Bitrate { label: "125", kbps: 125, btr: 0x031C },
    Bitrate { label: "200", kbps: 200, btr: 0x815C },
    Bitrate { label: "250", kbps: 250, btr: 0x011C },
    Bitrate { label: "400", kbps: 400, btr: 0x804D },
    Bitrate { label: "500", kbps: 500, btr: 0x001C },
    Bitrate { label: "800", kbps: 800, btr: 0x0016 },
    Bitrate { label: "1000", kbps: 1000, btr: 0x0014 },
];

/// 按 kbit/s 查找寄存器码
pub fn btr_for_kbps(kbps: u32) -> Option<u16> {
    lookup_kbps(kbps).map(|bitrate| bitrate.btr)
}

pub fn lookup_kbps(kbps: u32) -> Option<&'static Bitrate> {
    BITRATES.iter().find(|bitrate| bitrate.kbps == kbps)
}

/// 按文本标签查找（"1M"/"1000" 等常见写法均接受）
pub fn lookup_label(label: &str) -> Option<&'static Bitrate> {
    let label = label.trim();
    let normalized = match label {
        "1M" | "1m" => "1000",
        other => other
            .strip_suffix('K')
            .or_else(|| other.strip_suffix('k'))
            .unwrap_or(other),
    };
    BITRATES.iter().find(|bitrate| bitrate.label == normalized)
}

/// 按 kbit/s 查找，未知值返回错误
pub fn require_kbps(kbps: u32) -> Result<&'static Bitrate, ProtocolError> {
    lookup_kbps(kbps).ok_or(ProtocolError::UnsupportedBitrate(kbps))
}

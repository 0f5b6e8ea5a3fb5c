//! CAN 帧定义与字节块编解码
//!
//! 发送方向：任意长度字节流按 8 字节切块，每块一帧（[`encode_chunks`]）。
//! 接收方向：数据帧的有效载荷原样交给上层（[`CanFrame::payload`]）。

use crate::ids::{CanId, EXTENDED_FLAG};
use crate::status::StatusWord;

/// CAN 2.0 单帧最大载荷
pub const MAX_PAYLOAD: usize = 8;

/// 驱动 MSGTYPE 字节的位定义
pub mod msgtype {
    pub const STANDARD: u8 = 0x00;
    pub const RTR: u8 = 0x01;
    pub const EXTENDED: u8 = 0x02;
    pub const SELFRECEIVE: u8 = 0x04;
    pub const SINGLESHOT: u8 = 0x08;
    pub const PARAMETER: u8 = 0x20;
    pub const ERRFRAME: u8 = 0x40;
    pub const STATUS: u8 = 0x80;
}

/// 帧类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MsgKind {
    /// 标准数据帧（11-bit ID）
    Standard,
    /// 扩展数据帧（29-bit ID）
    Extended,
    /// 远程帧
    Remote,
    /// 驱动状态/参数报文（前 4 字节为状态字）
    Status,
    /// 错误帧 / 总线事件
    Error,
    /// 带自收或单次发送标记的数据帧（本节点发出的回显）
    Echo,
}

impl MsgKind {
    /// 从驱动 MSGTYPE 字节转换
    ///
    /// 状态位优先于其他位判断；参数报文与状态报文同属 `Status`。
    pub fn from_raw(raw: u8) -> Self {
        if raw & (msgtype::STATUS | msgtype::PARAMETER) != 0 {
            Self::Status
        } else if raw & msgtype::ERRFRAME != 0 {
            Self::Error
        } else if raw & msgtype::RTR != 0 {
            Self::Remote
        } else if raw & (msgtype::SELFRECEIVE | msgtype::SINGLESHOT) != 0 {
            Self::Echo
        } else if raw & msgtype::EXTENDED != 0 {
            Self::Extended
        } else {
            Self::Standard
        }
    }

    /// 转换为驱动 MSGTYPE 字节
    pub fn to_raw(self) -> u8 {
        match self {
            Self::Standard => msgtype::STANDARD,
            Self::Extended => msgtype::EXTENDED,
            Self::Remote => msgtype::RTR,
            Self::Status => msgtype::STATUS,
            Self::Error => msgtype::ERRFRAME,
            Self::Echo => msgtype::SELFRECEIVE,
        }
    }

    /// 是否为数据帧（标准或扩展）
    pub fn is_data(self) -> bool {
        matches!(self, Self::Standard | Self::Extended)
    }
}

/// 驱动层的单个 CAN 帧
///
/// - 固定 8 字节数据：避免堆分配
/// - `len` 之后的字节无意义
/// - 帧是瞬态的，只在产生/消费它的调用内存在
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CanFrame {
    /// 数值 ID（不含扩展标记位）
    pub id: u32,
    pub kind: MsgKind,
    /// 有效数据长度 (0-8)
    pub len: u8,
    pub data: [u8; 8],
}

impl CanFrame {
    /// 通用构造器（超过 8 字节的数据被截断）
    pub fn new(id: u32, kind: MsgKind, data: &[u8]) -> Self {
        let mut fixed_data = [0u8; 8];
        let len = data.len().min(MAX_PAYLOAD);
        fixed_data[..len].copy_from_slice(&data[..len]);

        Self {
            id,
            kind,
            len: len as u8,
            data: fixed_data,
        }
    }

    /// 以配置标识符为目标构造数据帧
    ///
    /// 帧类型由标识符最高位决定，帧 ID 为去掉标记位的数值 ID。
    pub fn data_frame(target: CanId, chunk: &[u8]) -> Self {
        Self::new(target.numeric(), target.kind(), chunk)
    }

    /// 构造状态报文（前 4 字节为小端状态字）
    pub fn status(word: StatusWord) -> Self {
        Self::new(0, MsgKind::Status, &u32::from(word).to_le_bytes())
    }

    /// 有效载荷（恰好 `len` 字节）
    pub fn payload(&self) -> &[u8] {
        &self.data[..(self.len as usize).min(MAX_PAYLOAD)]
    }

    /// 用于过滤比较的有效 ID：数值 ID 并入扩展标记位
    ///
    /// 非数据帧没有有效 ID。
    pub fn effective_id(&self) -> Option<u32> {
        match self.kind {
            MsgKind::Standard => Some(self.id),
            MsgKind::Extended => Some(self.id | EXTENDED_FLAG),
            _ => None,
        }
    }

    /// 是否为发往 `target` 的数据帧
    pub fn matches(&self, target: CanId) -> bool {
        self.effective_id() == Some(target.raw())
    }

    /// 状态报文携带的驱动状态字
    pub fn status_word(&self) -> Option<StatusWord> {
        if self.kind != MsgKind::Status || self.len < 4 {
            return None;
        }
        let raw = u32::from_le_bytes([self.data[0], self.data[1], self.data[2], self.data[3]]);
        Some(StatusWord::from(raw))
    }
}

/// 将字节流切分为发往 `target` 的数据帧序列
///
/// N 字节产生 ⌈N/8⌉ 帧，按顺序拼接载荷即得到原字节流。
pub fn encode_chunks(target: CanId, bytes: &[u8]) -> impl Iterator<Item = CanFrame> + '_ {
    bytes
        .chunks(MAX_PAYLOAD)
        .map(move |chunk| CanFrame::data_frame(target, chunk))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msgkind_from_raw() {
        assert_eq!(MsgKind::from_raw(msgtype::STANDARD), MsgKind::Standard);
        assert_eq!(MsgKind::from_raw(msgtype::EXTENDED), MsgKind::Extended);
        assert_eq!(MsgKind::from_raw(msgtype::RTR), MsgKind::Remote);
        assert_eq!(
            MsgKind::from_raw(msgtype::RTR | msgtype::EXTENDED),
            MsgKind::Remote
        );
        assert_eq!(MsgKind::from_raw(msgtype::STATUS), MsgKind::Status);
        assert_eq!(MsgKind::from_raw(msgtype::PARAMETER), MsgKind::Status);
        assert_eq!(MsgKind::from_raw(msgtype::ERRFRAME), MsgKind::Error);
    }

    #[test]
    fn test_self_received_frames_are_not_data() {
        for raw in [
            msgtype::SELFRECEIVE,
            msgtype::SELFRECEIVE | msgtype::EXTENDED,
            msgtype::SINGLESHOT,
            msgtype::SINGLESHOT | msgtype::EXTENDED,
        ] {
            let kind = MsgKind::from_raw(raw);
            assert_eq!(kind, MsgKind::Echo);
            assert!(!kind.is_data());
        }

        let echo = CanFrame::new(0x100, MsgKind::Echo, &[1, 2]);
        assert_eq!(echo.effective_id(), None);
        assert!(!echo.matches(CanId::standard(0x100).unwrap()));
    }

    #[test]
    fn test_msgkind_raw_roundtrip() {
        for kind in [
            MsgKind::Standard,
            MsgKind::Extended,
            MsgKind::Remote,
            MsgKind::Status,
            MsgKind::Error,
            MsgKind::Echo,
        ] {
            assert_eq!(MsgKind::from_raw(kind.to_raw()), kind);
        }
    }

    #[test]
    fn test_data_frame_standard() {
        let id = CanId::parse("0x7E0").unwrap();
        let frame = CanFrame::data_frame(id, &[0x01, 0x02, 0x03]);
        assert_eq!(frame.id, 0x7E0);
        assert_eq!(frame.kind, MsgKind::Standard);
        assert_eq!(frame.payload(), &[0x01, 0x02, 0x03]);
        assert_eq!(frame.effective_id(), Some(0x7E0));
    }

    #[test]
    fn test_data_frame_extended_strips_flag() {
        let id = CanId::parse("0x98DA00F1").unwrap();
        let frame = CanFrame::data_frame(id, &[0xAA; 8]);
        assert_eq!(frame.id, 0x18DA00F1);
        assert_eq!(frame.kind, MsgKind::Extended);
        assert_eq!(frame.effective_id(), Some(0x98DA00F1));
        assert!(frame.matches(id));
    }

    #[test]
    fn test_identifier_kind_roundtrip() {
        // 29-bit ID 带扩展标记：编码再解码得到相同数值与标记
        let ext = CanId::extended(0x1ABC_DEF0).unwrap();
        let frame = CanFrame::data_frame(ext, &[]);
        let decoded = CanId::from_raw(frame.effective_id().unwrap()).unwrap();
        assert_eq!(decoded, ext);
        assert!(decoded.is_extended());

        // 11-bit ID 不带标记：标准帧
        let std_id = CanId::standard(0x321).unwrap();
        let frame = CanFrame::data_frame(std_id, &[]);
        assert_eq!(frame.kind, MsgKind::Standard);
        assert_eq!(CanId::from_raw(frame.effective_id().unwrap()).unwrap(), std_id);
    }

    #[test]
    fn test_matches_distinguishes_kind() {
        // 同数值 ID、不同帧类型不匹配
        let std_id = CanId::standard(0x100).unwrap();
        let ext_id = CanId::extended(0x100).unwrap();
        let std_frame = CanFrame::data_frame(std_id, &[1]);
        let ext_frame = CanFrame::data_frame(ext_id, &[1]);
        assert!(std_frame.matches(std_id));
        assert!(!std_frame.matches(ext_id));
        assert!(ext_frame.matches(ext_id));
        assert!(!ext_frame.matches(std_id));
    }

    #[test]
    fn test_non_data_frames_have_no_effective_id() {
        let remote = CanFrame::new(0x100, MsgKind::Remote, &[]);
        assert_eq!(remote.effective_id(), None);
        assert!(!remote.matches(CanId::standard(0x100).unwrap()));
    }

    #[test]
    fn test_truncation() {
        let frame = CanFrame::new(0x1, MsgKind::Standard, &[0u8; 12]);
        assert_eq!(frame.len, 8);
        assert_eq!(frame.payload().len(), 8);
    }

    #[test]
    fn test_payload_clamps_bogus_len() {
        let mut frame = CanFrame::new(0x1, MsgKind::Standard, &[1, 2]);
        frame.len = 15;
        assert_eq!(frame.payload().len(), 8);
    }

    #[test]
    fn test_status_word_roundtrip() {
        let word = StatusWord::from(0x0000_0010);
        let frame = CanFrame::status(word);
        assert_eq!(frame.kind, MsgKind::Status);
        assert!(frame.status_word().unwrap().bus_off());
    }

    #[test]
    fn test_status_word_requires_status_kind() {
        let frame = CanFrame::new(0x1, MsgKind::Standard, &[0x10, 0, 0, 0]);
        assert!(frame.status_word().is_none());
        let short = CanFrame::new(0x0, MsgKind::Status, &[0x10]);
        assert!(short.status_word().is_none());
    }

    #[test]
    fn test_encode_chunks_sizes() {
        let id = CanId::standard(0x7E0).unwrap();
        let bytes: Vec<u8> = (0..20).collect();
        let frames: Vec<_> = encode_chunks(id, &bytes).collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].len, 8);
        assert_eq!(frames[1].len, 8);
        assert_eq!(frames[2].len, 4);
        assert_eq!(encode_chunks(id, &[]).count(), 0);
    }
}

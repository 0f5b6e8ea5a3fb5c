//! 帧编解码的属性测试
//!
//! 使用 proptest 验证切块与标识符的不变量。

use pcanlink_protocol::ids::{EXTENDED_ID_MAX, STANDARD_ID_MAX};
use pcanlink_protocol::{CanFrame, CanId, MAX_PAYLOAD, MsgKind, encode_chunks};
use proptest::prelude::*;

proptest! {
    /// N 字节切成 ⌈N/8⌉ 帧，载荷按序拼接还原原数据
    #[test]
    fn chunking_preserves_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..200)) {
        let id = CanId::standard(0x7E0).unwrap();
        let frames: Vec<CanFrame> = encode_chunks(id, &bytes).collect();

        prop_assert_eq!(frames.len(), bytes.len().div_ceil(MAX_PAYLOAD));
        for frame in &frames {
            prop_assert!(frame.payload().len() <= MAX_PAYLOAD);
            prop_assert!(frame.matches(id));
        }

        let joined: Vec<u8> = frames.iter().flat_map(|f| f.payload().to_vec()).collect();
        prop_assert_eq!(joined, bytes);
    }

    /// 扩展 ID 编码后再解码，数值与标记不变
    #[test]
    fn extended_id_roundtrip(raw in 0u32..=EXTENDED_ID_MAX) {
        let id = CanId::extended(raw).unwrap();
        let frame = CanFrame::data_frame(id, &[0x55]);
        prop_assert_eq!(frame.kind, MsgKind::Extended);
        prop_assert_eq!(frame.id, raw);

        let decoded = CanId::from_raw(frame.effective_id().unwrap()).unwrap();
        prop_assert_eq!(decoded.numeric(), raw);
        prop_assert!(decoded.is_extended());
    }

    /// 11-bit ID 不带标记时为标准帧
    #[test]
    fn standard_id_is_standard_kind(raw in 0u32..=STANDARD_ID_MAX) {
        let id = CanId::standard(raw).unwrap();
        let frame = CanFrame::data_frame(id, &[]);
        prop_assert_eq!(frame.kind, MsgKind::Standard);
        prop_assert_eq!(frame.effective_id(), Some(raw));
    }

    /// 十六进制文本解析与原始值一致
    #[test]
    fn hex_literal_parse(raw in 0u32..=STANDARD_ID_MAX) {
        let text = format!("0x{raw:X}");
        prop_assert_eq!(CanId::parse(&text).unwrap().raw(), raw);
    }
}

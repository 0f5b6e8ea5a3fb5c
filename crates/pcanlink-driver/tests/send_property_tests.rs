//! 发送路径的属性测试
//!
//! 使用 proptest 验证分块、部分发送计数与发送余量公式。

mod common;

use common::*;
use proptest::prelude::*;
use std::sync::Arc;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// N 字节产生 ⌈N/8⌉ 帧，载荷按顺序拼接还原原始数据
    #[test]
    fn send_issues_ceil_n_over_8_frames(data in prop::collection::vec(any::<u8>(), 0..200)) {
        let bus = Arc::new(single_net().build());
        let session = open(&bus, config("CAN_A"));

        prop_assert_eq!(session.send(&data).unwrap(), data.len());

        let frames = bus.written_frames();
        prop_assert_eq!(frames.len(), data.len().div_ceil(8));
        prop_assert!(frames.iter().all(|f| f.len <= 8));
        let joined: Vec<u8> = frames.iter().flat_map(|f| f.payload().to_vec()).collect();
        prop_assert_eq!(joined, data);
    }

    /// 前 K 块成功后失败：报告的字节数等于前 K 块的长度之和，不会更多
    #[test]
    fn partial_send_never_overreports(len in 1usize..200, budget in 0usize..30) {
        let bus = Arc::new(single_net().build());
        let session = open(&bus, config("CAN_A"));
        bus.limit_writes(budget);

        let data = vec![0x55u8; len];
        let sent = session.send(&data).unwrap();
        prop_assert_eq!(sent, len.min(budget * 8));
        prop_assert!(sent <= budget * 8);
    }

    /// 正常状态下余量恰好为 (C - F) * 8
    #[test]
    fn headroom_matches_formula(capacity in 1u32..64, fill_ratio in 0.0f64..=1.0) {
        let fill = ((capacity as f64) * fill_ratio) as u32;
        let bus = Arc::new(single_net().xmt_queue_size(capacity).build());
        let session = open(&bus, config("CAN_A"));

        bus.pause_transmit(true);
        let queued = session.send(&vec![0u8; fill as usize * 8]).unwrap();
        prop_assert_eq!(queued, fill as usize * 8);

        let headroom = session.send_buffer();
        prop_assert_eq!(headroom, (capacity - fill) as usize * 8);
    }
}

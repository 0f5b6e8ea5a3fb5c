//! 集成测试公共工具

#![allow(dead_code)]

use pcanlink_can::SimBus;
use pcanlink_can::sim::SimBusBuilder;
use pcanlink_driver::{Session, SessionBuilder, SessionConfig};
use pcanlink_protocol::CanId;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const RX: u32 = 0x7E8;
pub const TX: u32 = 0x7E0;

pub fn std_id(id: u32) -> CanId {
    CanId::standard(id).unwrap()
}

pub fn ext_id(id: u32) -> CanId {
    CanId::extended(id).unwrap()
}

/// 单网络 "CAN_A"（槽位 1，硬件 1）
pub fn single_net() -> SimBusBuilder {
    SimBus::builder().net(1, "CAN_A", 1)
}

pub fn config(net: &str) -> SessionConfig {
    SessionConfig::new(net, std_id(RX), std_id(TX))
}

/// 测试用 Builder：快速轮询，无恢复等待
pub fn builder(bus: &Arc<SimBus>, config: SessionConfig) -> SessionBuilder {
    SessionBuilder::new(bus.clone(), config)
        .client_name("pcanlink-test")
        .poll_interval(Duration::from_millis(1))
        .settle_delay(Duration::ZERO)
}

pub fn open(bus: &Arc<SimBus>, config: SessionConfig) -> Session {
    builder(bus, config).build().unwrap()
}

pub fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

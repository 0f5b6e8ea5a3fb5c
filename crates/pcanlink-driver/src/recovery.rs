//! Bus-Off 恢复
//!
//! 先尝试快速 Bus-On 参数；驱动不支持时退回硬件复位。
//! 无论哪种方式，都等待固定的稳定时间后才认为硬件可用。
//! 每次触发只尝试一次，持续 Bus-Off 会在下一次检测时再次触发。

use pcanlink_can::CanApi;
use pcanlink_protocol::{HwHandle, ParamCode};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// 恢复使用的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryMethod {
    /// 快速 Bus-On 成功
    BusOn,
    /// 快速路径被拒绝，已复位硬件
    Reset,
    /// 两种方式都失败（不再重试）
    Failed,
}

/// 清除 Bus-Off 状态
pub fn clear_bus_off(api: &dyn CanApi, hw: HwHandle, settle_delay: Duration) -> RecoveryMethod {
    let method = match api.set_hw_param(hw, ParamCode::BusOn, 1) {
        Ok(()) => RecoveryMethod::BusOn,
        Err(e) => {
            debug!("Fast bus-on rejected on {} ({}), resetting hardware", hw, e);
            match api.reset_hardware(hw) {
                Ok(()) => RecoveryMethod::Reset,
                Err(e) => {
                    warn!("Hardware reset of {} failed: {}", hw, e);
                    RecoveryMethod::Failed
                },
            }
        },
    };

    if !settle_delay.is_zero() {
        thread::sleep(settle_delay);
    }
    method
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcanlink_can::SimBus;
    use pcanlink_can::sim::{ApiCall, SimHardwareConfig, SimOp};
    use pcanlink_protocol::status::codes;
    use std::time::Instant;

    #[test]
    fn test_fast_bus_on() {
        let bus = SimBus::builder().net(1, "CAN_A", 1).record_calls().build();
        bus.raise_bus_off(1);

        assert_eq!(
            clear_bus_off(&bus, HwHandle(1), Duration::ZERO),
            RecoveryMethod::BusOn
        );
        assert!(!bus.is_bus_off(1));
        assert_eq!(bus.reset_count(1), 0);
        assert_eq!(
            bus.calls(),
            vec![ApiCall::SetHwParam(HwHandle(1), ParamCode::BusOn, 1)]
        );
    }

    #[test]
    fn test_falls_back_to_reset() {
        let bus = SimBus::builder()
            .net(1, "CAN_A", 1)
            .hardware(1, SimHardwareConfig {
                fast_bus_on: false,
                ..Default::default()
            })
            .build();
        bus.raise_bus_off(1);

        assert_eq!(
            clear_bus_off(&bus, HwHandle(1), Duration::ZERO),
            RecoveryMethod::Reset
        );
        assert!(!bus.is_bus_off(1));
        assert_eq!(bus.reset_count(1), 1);
    }

    #[test]
    fn test_failed_recovery_is_not_retried() {
        let bus = SimBus::builder().net(1, "CAN_A", 1).record_calls().build();
        bus.fail(SimOp::SetHwParam, codes::ILLPARAMTYPE);
        bus.fail(SimOp::ResetHardware, codes::UNKNOWN);

        assert_eq!(
            clear_bus_off(&bus, HwHandle(1), Duration::ZERO),
            RecoveryMethod::Failed
        );
        assert_eq!(bus.calls().len(), 2);
    }

    #[test]
    fn test_settle_delay() {
        let bus = SimBus::builder().net(1, "CAN_A", 1).build();
        let start = Instant::now();
        clear_bus_off(&bus, HwHandle(1), Duration::from_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}

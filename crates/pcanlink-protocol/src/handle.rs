//! 驱动句柄与参数码
//!
//! 句柄只是驱动分配的不透明编号，本身没有行为；生命周期由持有它的会话管理。

use std::fmt;

/// 网络槽位上限（网络编号 1..=MAX_NETS）
pub const MAX_NETS: u8 = 32;

/// 硬件句柄上限
pub const MAX_HARDWARE: u8 = 16;

/// 客户端句柄上限
pub const MAX_CLIENTS: u8 = 32;

/// 网络名称最大长度
pub const MAX_NET_NAME_LEN: usize = 20;

/// 客户端名称最大长度
pub const MAX_CLIENT_NAME_LEN: usize = 20;

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u8);

        impl $name {
            pub const fn get(self) -> u8 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

handle_type!(
    /// 客户端句柄
    ClientHandle,
    "client"
);

handle_type!(
    /// 网络句柄（同时也是网络槽位编号）
    NetHandle,
    "net"
);

handle_type!(
    /// 硬件句柄，`0` 表示没有物理接口的虚拟网络
    HwHandle,
    "hw"
);

impl HwHandle {
    /// 虚拟网络（无硬件）
    pub const NONE: Self = Self(0);

    pub const fn is_virtual(self) -> bool {
        self.0 == 0
    }
}

/// 驱动参数码
///
/// 数值与厂商头文件一致，只列出会话用到的参数。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, num_enum::IntoPrimitive, num_enum::TryFromPrimitive,
)]
#[repr(u16)]
pub enum ParamCode {
    /// 网络/客户端名称（字符串）
    Name = 3,
    /// 硬件波特率（BTR0BTR1 码）
    Baudrate = 7,
    /// 客户端发送队列当前帧数
    XmtQueueFill = 11,
    /// 客户端接收队列当前帧数
    RcvQueueFill = 12,
    /// 网络对应的硬件句柄
    NetHw = 19,
    /// 客户端发送队列容量
    XmtQueueSize = 23,
    /// 客户端接收队列容量
    RcvQueueSize = 24,
    /// 11-bit 精确匹配过滤模式
    Exact11BitFilter = 56,
    /// USB 性能计时器修正
    TimerFix = 65,
    /// 快速恢复 Bus-On
    BusOn = 90,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_display() {
        assert_eq!(ClientHandle(3).to_string(), "client#3");
        assert_eq!(NetHandle(7).to_string(), "net#7");
        assert_eq!(HwHandle(1).to_string(), "hw#1");
    }

    #[test]
    fn test_virtual_hardware() {
        assert!(HwHandle::NONE.is_virtual());
        assert!(HwHandle(0).is_virtual());
        assert!(!HwHandle(2).is_virtual());
    }

    #[test]
    fn test_param_code_values() {
        assert_eq!(u16::from(ParamCode::Name), 3);
        assert_eq!(u16::from(ParamCode::XmtQueueSize), 23);
        assert_eq!(u16::from(ParamCode::BusOn), 90);
        assert_eq!(ParamCode::try_from(12u16).ok(), Some(ParamCode::RcvQueueFill));
        assert!(ParamCode::try_from(999u16).is_err());
    }
}

//! 驱动状态字与返回码
//!
//! 驱动所有调用返回同一套 32 位码：`0` 表示成功，其余为可单独测试的失败位。
//! 状态报文（`MsgKind::Status`）前 4 字节、`CAN_Status()` 返回值也使用这套位定义。
//!
//! Bit 10-12 不是独立位，而是句柄/占用错误的编号（见 [`HandleFault`]）。

use bilge::prelude::*;

/// 返回码常量
pub mod codes {
    pub const OK: u32 = 0x0000;
    /// 控制器发送缓冲满
    pub const XMTFULL: u32 = 0x0001;
    /// 控制器读取过迟
    pub const OVERRUN: u32 = 0x0002;
    /// 错误计数器达到警告限
    pub const BUSLIGHT: u32 = 0x0004;
    /// 错误计数器达到被动限
    pub const BUSHEAVY: u32 = 0x0008;
    /// 控制器进入 Bus-Off
    pub const BUSOFF: u32 = 0x0010;
    /// 接收队列已读空
    pub const QRCVEMPTY: u32 = 0x0020;
    /// 接收队列溢出
    pub const QOVERRUN: u32 = 0x0040;
    /// 发送队列已满
    pub const QXMTFULL: u32 = 0x0080;
    pub const REGTEST: u32 = 0x0100;
    /// 驱动未加载
    pub const NOVXD: u32 = 0x0200;
    pub const HWINUSE: u32 = 0x0400;
    pub const NETINUSE: u32 = 0x0800;
    /// 硬件句柄无效（虚拟网络没有硬件）
    pub const ILLHW: u32 = 0x1400;
    pub const ILLNET: u32 = 0x1800;
    pub const ILLCLIENT: u32 = 0x1C00;
    /// 资源（FIFO、客户端、定时器）无法创建
    pub const RESOURCE: u32 = 0x2000;
    pub const ILLPARAMTYPE: u32 = 0x4000;
    pub const ILLPARAMVAL: u32 = 0x8000;
    pub const UNKNOWN: u32 = 0x10000;

    /// 任意总线错误
    pub const ANYBUSERR: u32 = BUSLIGHT | BUSHEAVY | BUSOFF;
}

/// 驱动状态字位域
///
/// 位定义（LSB 在前）：
/// - Bit 0-9: 发送/接收/总线状态位
/// - Bit 10-12: 句柄错误编号
/// - Bit 13-16: 资源/参数/未知错误
/// - Bit 17-31: 保留
#[bitsize(32)]
#[derive(FromBits, DebugBits, Clone, Copy, Default)]
pub struct StatusWord {
    pub xmt_full: bool,            // Bit 0
    pub overrun: bool,             // Bit 1
    pub bus_light: bool,           // Bit 2
    pub bus_heavy: bool,           // Bit 3
    pub bus_off: bool,             // Bit 4
    pub rcv_queue_empty: bool,     // Bit 5
    pub rcv_queue_overrun: bool,   // Bit 6
    pub xmt_queue_full: bool,      // Bit 7
    pub reg_test: bool,            // Bit 8
    pub no_driver: bool,           // Bit 9
    pub handle_error: u3,          // Bit 10-12
    pub resource: bool,            // Bit 13
    pub illegal_param_type: bool,  // Bit 14
    pub illegal_param_value: bool, // Bit 15
    pub unknown: bool,             // Bit 16
    pub reserved: u15,             // Bit 17-31
}

/// 句柄/占用错误编号（状态字 Bit 10-12）
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::TryFromPrimitive)]
#[repr(u8)]
pub enum HandleFault {
    /// 硬件已被其他网络占用
    HardwareInUse = 1,
    /// 网络已有客户端连接
    NetInUse = 2,
    /// 硬件句柄无效
    IllegalHardware = 5,
    /// 网络句柄无效
    IllegalNet = 6,
    /// 客户端句柄无效
    IllegalClient = 7,
}

impl StatusWord {
    /// 原始 32 位码
    pub fn code(self) -> u32 {
        u32::from(self)
    }

    pub fn is_ok(self) -> bool {
        self.code() == codes::OK
    }

    /// 解码句柄错误编号
    pub fn handle_fault(self) -> Option<HandleFault> {
        HandleFault::try_from(self.handle_error().value()).ok()
    }

    /// 置位的错误名称（用于日志）
    pub fn names(self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let flags = [
            (self.xmt_full(), "XMTFULL"),
            (self.overrun(), "OVERRUN"),
            (self.bus_light(), "BUSLIGHT"),
            (self.bus_heavy(), "BUSHEAVY"),
            (self.bus_off(), "BUSOFF"),
            (self.rcv_queue_empty(), "QRCVEMPTY"),
            (self.rcv_queue_overrun(), "QOVERRUN"),
            (self.xmt_queue_full(), "QXMTFULL"),
            (self.reg_test(), "REGTEST"),
            (self.no_driver(), "NOVXD"),
        ];
        names.extend(flags.iter().filter(|(set, _)| *set).map(|(_, name)| *name));

        match self.handle_fault() {
            Some(HandleFault::HardwareInUse) => names.push("HWINUSE"),
            Some(HandleFault::NetInUse) => names.push("NETINUSE"),
            Some(HandleFault::IllegalHardware) => names.push("ILLHW"),
            Some(HandleFault::IllegalNet) => names.push("ILLNET"),
            Some(HandleFault::IllegalClient) => names.push("ILLCLIENT"),
            None => {},
        }

        let tail = [
            (self.resource(), "RESOURCE"),
            (self.illegal_param_type(), "ILLPARAMTYPE"),
            (self.illegal_param_value(), "ILLPARAMVAL"),
            (self.unknown(), "UNKNOWN"),
        ];
        names.extend(tail.iter().filter(|(set, _)| *set).map(|(_, name)| *name));
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_positions_match_codes() {
        assert!(StatusWord::from(codes::XMTFULL).xmt_full());
        assert!(StatusWord::from(codes::BUSHEAVY).bus_heavy());
        assert!(StatusWord::from(codes::BUSOFF).bus_off());
        assert!(StatusWord::from(codes::QRCVEMPTY).rcv_queue_empty());
        assert!(StatusWord::from(codes::QXMTFULL).xmt_queue_full());
        assert!(StatusWord::from(codes::NOVXD).no_driver());
        assert!(StatusWord::from(codes::RESOURCE).resource());
        assert!(StatusWord::from(codes::ILLPARAMVAL).illegal_param_value());
        assert!(StatusWord::from(codes::UNKNOWN).unknown());
    }

    #[test]
    fn test_handle_fault_decoding() {
        assert_eq!(
            StatusWord::from(codes::ILLHW).handle_fault(),
            Some(HandleFault::IllegalHardware)
        );
        assert_eq!(
            StatusWord::from(codes::ILLNET).handle_fault(),
            Some(HandleFault::IllegalNet)
        );
        assert_eq!(
            StatusWord::from(codes::ILLCLIENT).handle_fault(),
            Some(HandleFault::IllegalClient)
        );
        assert_eq!(
            StatusWord::from(codes::HWINUSE).handle_fault(),
            Some(HandleFault::HardwareInUse)
        );
        assert_eq!(StatusWord::from(codes::BUSOFF).handle_fault(), None);
    }

    #[test]
    fn test_combined_bus_errors() {
        let word = StatusWord::from(codes::ANYBUSERR);
        assert!(word.bus_light() && word.bus_heavy() && word.bus_off());
        assert_eq!(word.names(), vec!["BUSLIGHT", "BUSHEAVY", "BUSOFF"]);
    }

    #[test]
    fn test_code_roundtrip_and_ok() {
        assert!(StatusWord::from(codes::OK).is_ok());
        assert_eq!(StatusWord::from(0x1_2345).code(), 0x1_2345);
        assert!(StatusWord::default().is_ok());
    }

    #[test]
    fn test_names_for_handle_error() {
        assert_eq!(StatusWord::from(codes::ILLHW).names(), vec!["ILLHW"]);
        assert_eq!(
            StatusWord::from(codes::ILLCLIENT | codes::RESOURCE).names(),
            vec!["ILLCLIENT", "RESOURCE"]
        );
    }
}

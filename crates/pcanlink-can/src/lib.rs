//! # pcanlink CAN Driver Contract
//!
//! 厂商 CAN 驱动（客户端 / 网络 / 硬件三级句柄）的抽象层。
//!
//! 驱动本身不在本 crate 中实现，这里只定义调用契约：
//! - 所有调用返回结果码，`0` 为成功，非零码包装为 [`ApiError`]
//! - 接收队列为空时 `read()` 返回 `QRCVEMPTY`
//! - 驱动对象显式创建，以 `Arc<dyn CanApi>` 注入会话，不使用进程级全局表
//!
//! `sim` feature 提供内存模拟总线 [`sim::SimBus`]，用于测试和无硬件演示。

use pcanlink_protocol::status::codes;
use pcanlink_protocol::{
    CanFrame, ClientHandle, HwHandle, NetHandle, ParamCode, StatusWord,
};
use thiserror::Error;

#[cfg(feature = "sim")]
pub mod sim;

#[cfg(feature = "sim")]
pub use sim::SimBus;

pub use pcanlink_protocol as protocol;

fn describe(code: &u32) -> String {
    let names = StatusWord::from(*code).names();
    if names.is_empty() {
        "unnamed".to_string()
    } else {
        names.join("|")
    }
}

/// 驱动调用失败（非零结果码）
///
/// 结果码是位掩码，调用方可以单独测试感兴趣的失败位。
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("CAN API error 0x{code:05X} ({})", describe(.code))]
pub struct ApiError {
    code: u32,
}

impl ApiError {
    /// 从非零结果码创建
    ///
    /// `0` 不是错误，此时按 `UNKNOWN` 处理，避免构造出"成功的错误"。
    pub fn new(code: u32) -> Self {
        let code = if code == codes::OK { codes::UNKNOWN } else { code };
        Self { code }
    }

    /// 将驱动结果码转换为 `Result`
    pub fn check(code: u32) -> Result<(), ApiError> {
        if code == codes::OK {
            Ok(())
        } else {
            Err(Self::new(code))
        }
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn status(&self) -> StatusWord {
        StatusWord::from(self.code)
    }

    pub fn is_bus_off(&self) -> bool {
        self.status().bus_off()
    }

    /// 接收队列已读空（`read()` 的正常结束条件）
    pub fn is_queue_empty(&self) -> bool {
        self.status().rcv_queue_empty()
    }

    /// 发送队列/缓冲已满（瞬态，可稍后重试）
    pub fn is_transmit_full(&self) -> bool {
        let status = self.status();
        status.xmt_queue_full() || status.xmt_full()
    }

    /// 硬件句柄无效（虚拟网络没有物理接口）
    ///
    /// 只认单独的 `ILLHW`：同时带有其他错误位（如 `BUSOFF`）的结果码不算。
    pub fn is_illegal_hardware(&self) -> bool {
        self.code == codes::ILLHW
    }

    /// 参数不被该驱动/硬件支持
    pub fn is_unsupported_param(&self) -> bool {
        self.status().illegal_param_type()
    }
}

/// `read()` 读出的帧及其来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceivedFrame {
    pub frame: CanFrame,
    /// 帧来自哪个网络
    pub net: NetHandle,
    /// 驱动时间戳（微秒）
    pub timestamp_us: u64,
}

/// CAN 驱动契约
///
/// 方法与厂商 API 一一对应，全部同步返回。驱动保证调用有界、不阻塞，
/// 因此这里不提供超时参数。
///
/// # 线程安全
///
/// 实现必须 `Send + Sync`：接收轮询线程只调用 `get_client_param(RcvQueueFill)`，
/// 其余调用都来自主控制流。
pub trait CanApi: Send + Sync {
    /// 注册客户端
    fn register_client(&self, name: &str) -> Result<ClientHandle, ApiError>;

    /// 注销客户端（同时断开其所有网络连接）
    fn remove_client(&self, client: ClientHandle) -> Result<(), ApiError>;

    /// 按名称连接网络
    fn connect_to_net(&self, client: ClientHandle, net_name: &str)
    -> Result<NetHandle, ApiError>;

    fn disconnect_from_net(&self, client: ClientHandle, net: NetHandle) -> Result<(), ApiError>;

    /// 注册接收过滤范围 `[lower, upper]`（按 ID 与帧类型）
    fn register_msg(
        &self,
        client: ClientHandle,
        net: NetHandle,
        lower: &CanFrame,
        upper: &CanFrame,
    ) -> Result<(), ApiError>;

    /// 查询网络槽位的配置名称（空槽位返回 `ILLNET`）
    fn get_net_name(&self, net: NetHandle) -> Result<String, ApiError>;

    fn get_net_param(&self, net: NetHandle, param: ParamCode) -> Result<u32, ApiError>;

    fn get_hw_param(&self, hw: HwHandle, param: ParamCode) -> Result<u32, ApiError>;

    fn set_hw_param(&self, hw: HwHandle, param: ParamCode, value: u32) -> Result<(), ApiError>;

    fn get_client_param(&self, client: ClientHandle, param: ParamCode) -> Result<u32, ApiError>;

    fn set_client_param(
        &self,
        client: ClientHandle,
        param: ParamCode,
        value: u32,
    ) -> Result<(), ApiError>;

    /// 读取单帧；队列为空时返回 `QRCVEMPTY`
    fn read(&self, client: ClientHandle) -> Result<ReceivedFrame, ApiError>;

    /// 写入单帧
    fn write(&self, client: ClientHandle, net: NetHandle, frame: &CanFrame)
    -> Result<(), ApiError>;

    /// 硬件状态（`Ok` 表示无错误位）
    fn status(&self, hw: HwHandle) -> Result<(), ApiError>;

    /// 硬件复位
    fn reset_hardware(&self, hw: HwHandle) -> Result<(), ApiError>;

    /// 网络对应的硬件句柄（`0` = 虚拟网络）
    ///
    /// 超出句柄范围的值按 `ILLHW` 处理，不截断。
    fn hardware_of(&self, net: NetHandle) -> Result<HwHandle, ApiError> {
        let hw = self.get_net_param(net, ParamCode::NetHw)?;
        u8::try_from(hw)
            .map(HwHandle)
            .map_err(|_| ApiError::new(codes::ILLHW))
    }

    /// 非阻塞读取
    ///
    /// - `Ok(Some(frame))`: 读到一帧
    /// - `Ok(None)`: 队列为空
    /// - `Err(e)`: 其他驱动错误
    fn try_read(&self, client: ClientHandle) -> Result<Option<ReceivedFrame>, ApiError> {
        match self.read(client) {
            Ok(frame) => Ok(Some(frame)),
            Err(e) if e.is_queue_empty() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

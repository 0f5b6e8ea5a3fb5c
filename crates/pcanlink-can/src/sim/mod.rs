//! 内存模拟 CAN 总线
//!
//! 按驱动契约实现 [`CanApi`]，不依赖任何硬件：
//! - 网络槽位可以有空洞（未配置的槽位返回 `ILLNET`）
//! - 硬件句柄 `0` 表示虚拟网络
//! - 每个客户端有独立的接收队列，按注册的过滤范围投递
//! - 写入的帧回环投递给同一网络上的其他客户端
//! - 支持 Bus-Off 注入、发送暂停（积压发送队列）、按操作注入故障
//! - 可选的调用日志，用于断言调用顺序
//!
//! # 示例
//!
//! ```rust
//! use pcanlink_can::{CanApi, SimBus};
//! use pcanlink_protocol::{CanFrame, CanId};
//!
//! let bus = SimBus::builder()
//!     .net(3, "CAN_A", 1)
//!     .build();
//!
//! let client = bus.register_client("demo").unwrap();
//! let net = bus.connect_to_net(client, "CAN_A").unwrap();
//! let frame = CanFrame::data_frame(CanId::standard(0x100).unwrap(), &[1, 2, 3]);
//! bus.write(client, net, &frame).unwrap();
//! assert_eq!(bus.written_frames().len(), 1);
//! ```

use crate::{ApiError, CanApi, ReceivedFrame};
use parking_lot::Mutex;
use pcanlink_protocol::handle::{MAX_CLIENT_NAME_LEN, MAX_CLIENTS, MAX_NETS};
use pcanlink_protocol::status::codes;
use pcanlink_protocol::{CanFrame, ClientHandle, HwHandle, MsgKind, NetHandle, ParamCode, StatusWord};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Instant;
use tracing::{debug, trace};

/// 默认接收队列容量（帧）
pub const DEFAULT_RCV_QUEUE_SIZE: u32 = 32767;

/// 默认发送队列容量（帧）
pub const DEFAULT_XMT_QUEUE_SIZE: u32 = 32767;

/// `written_frames()` 默认保留的帧数
pub const DEFAULT_WRITE_LOG_LIMIT: usize = 4096;

/// 驱动操作（用于故障注入和调用日志）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimOp {
    RegisterClient,
    RemoveClient,
    ConnectToNet,
    DisconnectFromNet,
    RegisterMsg,
    GetNetName,
    GetNetParam,
    GetHwParam,
    SetHwParam,
    GetClientParam,
    SetClientParam,
    Read,
    Write,
    Status,
    ResetHardware,
}

/// 调用日志条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    RegisterClient(String),
    RemoveClient(ClientHandle),
    ConnectToNet(ClientHandle, String),
    DisconnectFromNet(ClientHandle, NetHandle),
    RegisterMsg(ClientHandle, NetHandle),
    GetNetName(NetHandle),
    GetNetParam(NetHandle, ParamCode),
    GetHwParam(HwHandle, ParamCode),
    SetHwParam(HwHandle, ParamCode, u32),
    GetClientParam(ClientHandle, ParamCode),
    SetClientParam(ClientHandle, ParamCode, u32),
    Read(ClientHandle),
    Write(ClientHandle, NetHandle),
    Status(HwHandle),
    ResetHardware(HwHandle),
}

impl ApiCall {
    pub fn op(&self) -> SimOp {
        match self {
            Self::RegisterClient(_) => SimOp::RegisterClient,
            Self::RemoveClient(_) => SimOp::RemoveClient,
            Self::ConnectToNet(..) => SimOp::ConnectToNet,
            Self::DisconnectFromNet(..) => SimOp::DisconnectFromNet,
            Self::RegisterMsg(..) => SimOp::RegisterMsg,
            Self::GetNetName(_) => SimOp::GetNetName,
            Self::GetNetParam(..) => SimOp::GetNetParam,
            Self::GetHwParam(..) => SimOp::GetHwParam,
            Self::SetHwParam(..) => SimOp::SetHwParam,
            Self::GetClientParam(..) => SimOp::GetClientParam,
            Self::SetClientParam(..) => SimOp::SetClientParam,
            Self::Read(_) => SimOp::Read,
            Self::Write(..) => SimOp::Write,
            Self::Status(_) => SimOp::Status,
            Self::ResetHardware(_) => SimOp::ResetHardware,
        }
    }
}

/// 模拟硬件的能力配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimHardwareConfig {
    /// 是否支持 `BusOn` 参数（快速恢复）；不支持时只能复位硬件
    pub fast_bus_on: bool,
    /// 是否支持 `TimerFix` 参数
    pub timer_fix: bool,
    /// 初始 BTR0BTR1 码
    pub btr: u16,
}

impl Default for SimHardwareConfig {
    fn default() -> Self {
        Self {
            fast_bus_on: true,
            timer_fix: true,
            btr: 0x001C, // 500K
        }
    }
}

#[derive(Debug)]
struct SimNet {
    name: String,
    hw: HwHandle,
}

#[derive(Debug)]
struct SimHardware {
    config: SimHardwareConfig,
    btr: u16,
    bus_off: bool,
    bus_on_count: u32,
    reset_count: u32,
}

#[derive(Debug, Clone, Copy)]
struct Filter {
    kind: MsgKind,
    lower: u32,
    upper: u32,
}

#[derive(Debug)]
struct SimClient {
    name: String,
    net: Option<NetHandle>,
    exact_filter: bool,
    filter: Option<Filter>,
    timer_fix: bool,
    rx: VecDeque<ReceivedFrame>,
    xmt_fill: u32,
}

impl SimClient {
    fn accepts(&self, frame: &CanFrame, leaky: bool) -> bool {
        if !frame.kind.is_data() {
            return true;
        }
        if leaky {
            return true;
        }
        match self.filter {
            Some(filter) => {
                filter.kind == frame.kind && (filter.lower..=filter.upper).contains(&frame.id)
            },
            None => false,
        }
    }
}

#[derive(Debug)]
struct SimState {
    nets: BTreeMap<u8, SimNet>,
    hardware: BTreeMap<u8, SimHardware>,
    clients: BTreeMap<u8, SimClient>,
    faults: HashMap<SimOp, u32>,
    /// 剩余可成功写入次数（`None` 表示不限）
    write_budget: Option<usize>,
    transmit_paused: bool,
    leaky_filter: bool,
    record_calls: bool,
    calls: Vec<ApiCall>,
    /// 最近写入的帧（超过上限时丢弃最早的）
    written: VecDeque<CanFrame>,
    written_limit: usize,
    xmt_queue_size: u32,
    rcv_queue_size: u32,
}

impl SimState {
    fn log(&mut self, call: ApiCall) {
        if self.record_calls {
            self.calls.push(call);
        }
    }

    fn fault(&self, op: SimOp) -> Result<(), ApiError> {
        match self.faults.get(&op) {
            Some(&code) => Err(ApiError::new(code)),
            None => Ok(()),
        }
    }

    fn client_mut(&mut self, client: ClientHandle) -> Result<&mut SimClient, ApiError> {
        self.clients
            .get_mut(&client.0)
            .ok_or(ApiError::new(codes::ILLCLIENT))
    }

    fn client(&self, client: ClientHandle) -> Result<&SimClient, ApiError> {
        self.clients
            .get(&client.0)
            .ok_or(ApiError::new(codes::ILLCLIENT))
    }

    fn hardware_mut(&mut self, hw: HwHandle) -> Result<&mut SimHardware, ApiError> {
        if hw.is_virtual() {
            return Err(ApiError::new(codes::ILLHW));
        }
        self.hardware
            .get_mut(&hw.0)
            .ok_or(ApiError::new(codes::ILLHW))
    }

    fn net_hw(&self, net: NetHandle) -> Option<HwHandle> {
        self.nets.get(&net.0).map(|n| n.hw)
    }

    fn record_written(&mut self, frame: CanFrame) {
        if self.written_limit == 0 {
            return;
        }
        if self.written.len() >= self.written_limit {
            self.written.pop_front();
        }
        self.written.push_back(frame);
    }

    /// 投递到连接在 `net` 上的客户端（`except` 除外）
    fn deliver(&mut self, net: NetHandle, frame: CanFrame, timestamp_us: u64, except: Option<u8>) {
        let leaky = self.leaky_filter;
        let capacity = self.rcv_queue_size as usize;
        for (id, client) in self.clients.iter_mut() {
            if Some(*id) == except || client.net != Some(net) {
                continue;
            }
            if !client.accepts(&frame, leaky) {
                trace!("sim: client#{} filtered frame id=0x{:X}", id, frame.id);
                continue;
            }
            if client.rx.len() >= capacity {
                debug!("sim: client#{} receive queue overrun", id);
                continue;
            }
            client.rx.push_back(ReceivedFrame {
                frame,
                net,
                timestamp_us,
            });
        }
    }
}

/// 模拟总线构建器
#[derive(Debug, Default)]
pub struct SimBusBuilder {
    nets: Vec<(u8, String, u8)>,
    hardware: Vec<(u8, SimHardwareConfig)>,
    leaky_filter: bool,
    record_calls: bool,
    xmt_queue_size: Option<u32>,
    rcv_queue_size: Option<u32>,
    write_log_limit: Option<usize>,
}

impl SimBusBuilder {
    /// 在槽位 `slot` 配置名为 `name` 的网络，绑定硬件 `hw`（`0` = 虚拟网络）
    pub fn net(mut self, slot: u8, name: impl Into<String>, hw: u8) -> Self {
        self.nets.push((slot, name.into(), hw));
        self
    }

    /// 覆盖硬件能力配置
    pub fn hardware(mut self, hw: u8, config: SimHardwareConfig) -> Self {
        self.hardware.push((hw, config));
        self
    }

    /// 模拟粗粒度硬件过滤：所有数据帧都投递给客户端
    pub fn leaky_filter(mut self) -> Self {
        self.leaky_filter = true;
        self
    }

    /// 记录调用日志
    pub fn record_calls(mut self) -> Self {
        self.record_calls = true;
        self
    }

    pub fn xmt_queue_size(mut self, frames: u32) -> Self {
        self.xmt_queue_size = Some(frames);
        self
    }

    pub fn rcv_queue_size(mut self, frames: u32) -> Self {
        self.rcv_queue_size = Some(frames);
        self
    }

    /// `written_frames()` 保留的最近帧数（`0` = 不记录）
    pub fn write_log_limit(mut self, frames: usize) -> Self {
        self.write_log_limit = Some(frames);
        self
    }

    pub fn build(self) -> SimBus {
        let mut nets = BTreeMap::new();
        let mut hardware = BTreeMap::new();

        for (slot, name, hw) in self.nets {
            if hw != 0 {
                hardware.entry(hw).or_insert_with(|| SimHardware::new(SimHardwareConfig::default()));
            }
            nets.insert(slot, SimNet {
                name,
                hw: HwHandle(hw),
            });
        }
        for (hw, config) in self.hardware {
            hardware.insert(hw, SimHardware::new(config));
        }

        SimBus {
            state: Mutex::new(SimState {
                nets,
                hardware,
                clients: BTreeMap::new(),
                faults: HashMap::new(),
                write_budget: None,
                transmit_paused: false,
                leaky_filter: self.leaky_filter,
                record_calls: self.record_calls,
                calls: Vec::new(),
                written: VecDeque::new(),
                written_limit: self.write_log_limit.unwrap_or(DEFAULT_WRITE_LOG_LIMIT),
                xmt_queue_size: self.xmt_queue_size.unwrap_or(DEFAULT_XMT_QUEUE_SIZE),
                rcv_queue_size: self.rcv_queue_size.unwrap_or(DEFAULT_RCV_QUEUE_SIZE),
            }),
            epoch: Instant::now(),
        }
    }
}

impl SimHardware {
    fn new(config: SimHardwareConfig) -> Self {
        Self {
            config,
            btr: config.btr,
            bus_off: false,
            bus_on_count: 0,
            reset_count: 0,
        }
    }
}

/// 内存模拟总线
#[derive(Debug)]
pub struct SimBus {
    state: Mutex<SimState>,
    epoch: Instant,
}

impl SimBus {
    pub fn builder() -> SimBusBuilder {
        SimBusBuilder::default()
    }

    fn now_us(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }

    // ------------------------------------------------------------------
    // 测试/演示控制接口
    // ------------------------------------------------------------------

    /// 让操作 `op` 持续返回错误码 `code`
    pub fn fail(&self, op: SimOp, code: u32) {
        self.state.lock().faults.insert(op, code);
    }

    pub fn clear_fault(&self, op: SimOp) {
        self.state.lock().faults.remove(&op);
    }

    /// 只允许再成功写入 `frames` 帧，之后写入返回 `QXMTFULL`
    pub fn limit_writes(&self, frames: usize) {
        self.state.lock().write_budget = Some(frames);
    }

    pub fn unlimit_writes(&self) {
        self.state.lock().write_budget = None;
    }

    /// 暂停/恢复发送：暂停时写入的帧积压在客户端发送队列中
    pub fn pause_transmit(&self, paused: bool) {
        let mut state = self.state.lock();
        state.transmit_paused = paused;
        if !paused {
            for client in state.clients.values_mut() {
                client.xmt_fill = 0;
            }
        }
    }

    /// 从外部节点向网络 `net_name` 注入一帧
    pub fn inject(&self, net_name: &str, frame: CanFrame) -> bool {
        let timestamp_us = self.now_us();
        let mut state = self.state.lock();
        let slot = state
            .nets
            .iter()
            .find(|(_, net)| net.name == net_name)
            .map(|(slot, _)| *slot);
        match slot {
            Some(slot) => {
                state.deliver(NetHandle(slot), frame, timestamp_us, None);
                true
            },
            None => false,
        }
    }

    /// 让硬件 `hw` 进入 Bus-Off，并向相关客户端投递状态报文
    pub fn raise_bus_off(&self, hw: u8) {
        let timestamp_us = self.now_us();
        let mut state = self.state.lock();
        if let Some(hardware) = state.hardware.get_mut(&hw) {
            hardware.bus_off = true;
        }
        let slots: Vec<u8> = state
            .nets
            .iter()
            .filter(|(_, net)| net.hw == HwHandle(hw))
            .map(|(slot, _)| *slot)
            .collect();
        let frame = CanFrame::status(StatusWord::from(codes::BUSOFF));
        for slot in slots {
            state.deliver(NetHandle(slot), frame, timestamp_us, None);
        }
    }

    /// 调用日志快照（需要 `record_calls()`）
    pub fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// 最近成功发送到总线的帧（最多保留 `write_log_limit` 帧）
    pub fn written_frames(&self) -> Vec<CanFrame> {
        self.state.lock().written.iter().copied().collect()
    }

    pub fn client_count(&self) -> usize {
        self.state.lock().clients.len()
    }

    /// 已连接到网络的客户端数
    pub fn connected_count(&self) -> usize {
        self.state
            .lock()
            .clients
            .values()
            .filter(|c| c.net.is_some())
            .count()
    }

    pub fn hardware_btr(&self, hw: u8) -> Option<u16> {
        self.state.lock().hardware.get(&hw).map(|h| h.btr)
    }

    pub fn is_bus_off(&self, hw: u8) -> bool {
        self.state
            .lock()
            .hardware
            .get(&hw)
            .is_some_and(|h| h.bus_off)
    }

    pub fn bus_on_count(&self, hw: u8) -> u32 {
        self.state
            .lock()
            .hardware
            .get(&hw)
            .map_or(0, |h| h.bus_on_count)
    }

    pub fn reset_count(&self, hw: u8) -> u32 {
        self.state
            .lock()
            .hardware
            .get(&hw)
            .map_or(0, |h| h.reset_count)
    }

    /// 客户端是否开启了计时器修正
    pub fn timer_fix_enabled(&self, client: ClientHandle) -> bool {
        self.state
            .lock()
            .clients
            .get(&client.0)
            .is_some_and(|c| c.timer_fix)
    }
}

impl CanApi for SimBus {
    fn register_client(&self, name: &str) -> Result<ClientHandle, ApiError> {
        let mut state = self.state.lock();
        state.log(ApiCall::RegisterClient(name.to_string()));
        state.fault(SimOp::RegisterClient)?;

        let id = (1..=MAX_CLIENTS)
            .find(|id| !state.clients.contains_key(id))
            .ok_or(ApiError::new(codes::RESOURCE))?;
        let name: String = name.chars().take(MAX_CLIENT_NAME_LEN).collect();
        debug!("sim: register client#{} ({})", id, name);
        state.clients.insert(id, SimClient {
            name,
            net: None,
            exact_filter: false,
            filter: None,
            timer_fix: false,
            rx: VecDeque::new(),
            xmt_fill: 0,
        });
        Ok(ClientHandle(id))
    }

    fn remove_client(&self, client: ClientHandle) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.log(ApiCall::RemoveClient(client));
        state.fault(SimOp::RemoveClient)?;
        let removed = state
            .clients
            .remove(&client.0)
            .ok_or(ApiError::new(codes::ILLCLIENT))?;
        debug!("sim: remove client#{} ({})", client.0, removed.name);
        Ok(())
    }

    fn connect_to_net(
        &self,
        client: ClientHandle,
        net_name: &str,
    ) -> Result<NetHandle, ApiError> {
        let mut state = self.state.lock();
        state.log(ApiCall::ConnectToNet(client, net_name.to_string()));
        state.fault(SimOp::ConnectToNet)?;

        let slot = state
            .nets
            .iter()
            .find(|(_, net)| net.name == net_name)
            .map(|(slot, _)| *slot)
            .ok_or(ApiError::new(codes::ILLNET))?;
        let entry = state.client_mut(client)?;
        if entry.net.is_some() {
            return Err(ApiError::new(codes::NETINUSE));
        }
        entry.net = Some(NetHandle(slot));
        Ok(NetHandle(slot))
    }

    fn disconnect_from_net(&self, client: ClientHandle, net: NetHandle) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.log(ApiCall::DisconnectFromNet(client, net));
        state.fault(SimOp::DisconnectFromNet)?;
        let entry = state.client_mut(client)?;
        if entry.net != Some(net) {
            return Err(ApiError::new(codes::ILLNET));
        }
        entry.net = None;
        entry.filter = None;
        entry.rx.clear();
        Ok(())
    }

    fn register_msg(
        &self,
        client: ClientHandle,
        net: NetHandle,
        lower: &CanFrame,
        upper: &CanFrame,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.log(ApiCall::RegisterMsg(client, net));
        state.fault(SimOp::RegisterMsg)?;
        let entry = state.client_mut(client)?;
        if entry.net != Some(net) {
            return Err(ApiError::new(codes::ILLNET));
        }
        if lower.kind != upper.kind || !lower.kind.is_data() || lower.id > upper.id {
            return Err(ApiError::new(codes::ILLPARAMVAL));
        }
        entry.filter = Some(Filter {
            kind: lower.kind,
            lower: lower.id,
            upper: upper.id,
        });
        Ok(())
    }

    fn get_net_name(&self, net: NetHandle) -> Result<String, ApiError> {
        let mut state = self.state.lock();
        state.log(ApiCall::GetNetName(net));
        state.fault(SimOp::GetNetName)?;
        if net.0 == 0 || net.0 > MAX_NETS {
            return Err(ApiError::new(codes::ILLNET));
        }
        state
            .nets
            .get(&net.0)
            .map(|n| n.name.clone())
            .ok_or(ApiError::new(codes::ILLNET))
    }

    fn get_net_param(&self, net: NetHandle, param: ParamCode) -> Result<u32, ApiError> {
        let mut state = self.state.lock();
        state.log(ApiCall::GetNetParam(net, param));
        state.fault(SimOp::GetNetParam)?;
        let hw = state.net_hw(net).ok_or(ApiError::new(codes::ILLNET))?;
        match param {
            ParamCode::NetHw => Ok(hw.0 as u32),
            _ => Err(ApiError::new(codes::ILLPARAMTYPE)),
        }
    }

    fn get_hw_param(&self, hw: HwHandle, param: ParamCode) -> Result<u32, ApiError> {
        let mut state = self.state.lock();
        state.log(ApiCall::GetHwParam(hw, param));
        state.fault(SimOp::GetHwParam)?;
        let hardware = state.hardware_mut(hw)?;
        match param {
            ParamCode::Baudrate => Ok(hardware.btr as u32),
            _ => Err(ApiError::new(codes::ILLPARAMTYPE)),
        }
    }

    fn set_hw_param(&self, hw: HwHandle, param: ParamCode, value: u32) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.log(ApiCall::SetHwParam(hw, param, value));
        state.fault(SimOp::SetHwParam)?;
        let hardware = state.hardware_mut(hw)?;
        match param {
            ParamCode::Baudrate => {
                let btr = u16::try_from(value).map_err(|_| ApiError::new(codes::ILLPARAMVAL))?;
                hardware.btr = btr;
                Ok(())
            },
            ParamCode::BusOn if hardware.config.fast_bus_on => {
                hardware.bus_off = false;
                hardware.bus_on_count += 1;
                Ok(())
            },
            _ => Err(ApiError::new(codes::ILLPARAMTYPE)),
        }
    }

    fn get_client_param(&self, client: ClientHandle, param: ParamCode) -> Result<u32, ApiError> {
        let mut state = self.state.lock();
        state.log(ApiCall::GetClientParam(client, param));
        state.fault(SimOp::GetClientParam)?;
        let xmt_queue_size = state.xmt_queue_size;
        let rcv_queue_size = state.rcv_queue_size;
        let entry = state.client(client)?;
        match param {
            ParamCode::RcvQueueFill => Ok(entry.rx.len() as u32),
            ParamCode::XmtQueueFill => Ok(entry.xmt_fill),
            ParamCode::XmtQueueSize => Ok(xmt_queue_size),
            ParamCode::RcvQueueSize => Ok(rcv_queue_size),
            ParamCode::Exact11BitFilter => Ok(entry.exact_filter as u32),
            ParamCode::TimerFix => Ok(entry.timer_fix as u32),
            _ => Err(ApiError::new(codes::ILLPARAMTYPE)),
        }
    }

    fn set_client_param(
        &self,
        client: ClientHandle,
        param: ParamCode,
        value: u32,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.log(ApiCall::SetClientParam(client, param, value));
        state.fault(SimOp::SetClientParam)?;

        // 计时器修正取决于客户端所连网络的硬件
        let timer_fix_supported = {
            let entry = state.client(client)?;
            entry
                .net
                .and_then(|net| state.net_hw(net))
                .and_then(|hw| state.hardware.get(&hw.0))
                .is_some_and(|h| h.config.timer_fix)
        };

        let entry = state.client_mut(client)?;
        match param {
            ParamCode::Exact11BitFilter => {
                entry.exact_filter = value != 0;
                Ok(())
            },
            ParamCode::TimerFix if timer_fix_supported => {
                entry.timer_fix = value != 0;
                Ok(())
            },
            _ => Err(ApiError::new(codes::ILLPARAMTYPE)),
        }
    }

    fn read(&self, client: ClientHandle) -> Result<ReceivedFrame, ApiError> {
        let mut state = self.state.lock();
        state.log(ApiCall::Read(client));
        state.fault(SimOp::Read)?;
        state
            .client_mut(client)?
            .rx
            .pop_front()
            .ok_or(ApiError::new(codes::QRCVEMPTY))
    }

    fn write(
        &self,
        client: ClientHandle,
        net: NetHandle,
        frame: &CanFrame,
    ) -> Result<(), ApiError> {
        let timestamp_us = self.now_us();
        let mut state = self.state.lock();
        state.log(ApiCall::Write(client, net));
        state.fault(SimOp::Write)?;

        if state.client(client)?.net != Some(net) {
            return Err(ApiError::new(codes::ILLNET));
        }
        let hw = state.net_hw(net).ok_or(ApiError::new(codes::ILLNET))?;
        if state.hardware.get(&hw.0).is_some_and(|h| h.bus_off) {
            return Err(ApiError::new(codes::BUSOFF));
        }
        if let Some(budget) = state.write_budget {
            if budget == 0 {
                return Err(ApiError::new(codes::QXMTFULL));
            }
            state.write_budget = Some(budget - 1);
        }

        let xmt_queue_size = state.xmt_queue_size;
        let paused = state.transmit_paused;
        let entry = state.client_mut(client)?;
        if paused {
            if entry.xmt_fill >= xmt_queue_size {
                return Err(ApiError::new(codes::QXMTFULL));
            }
            entry.xmt_fill += 1;
        }

        state.record_written(*frame);
        state.deliver(net, *frame, timestamp_us, Some(client.0));
        Ok(())
    }

    fn status(&self, hw: HwHandle) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.log(ApiCall::Status(hw));
        state.fault(SimOp::Status)?;
        let hardware = state.hardware_mut(hw)?;
        if hardware.bus_off {
            return Err(ApiError::new(codes::BUSOFF));
        }
        Ok(())
    }

    fn reset_hardware(&self, hw: HwHandle) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.log(ApiCall::ResetHardware(hw));
        state.fault(SimOp::ResetHardware)?;
        let hardware = state.hardware_mut(hw)?;
        hardware.bus_off = false;
        hardware.reset_count += 1;
        Ok(())
    }
}

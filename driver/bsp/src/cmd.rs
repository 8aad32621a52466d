//! 命令通道
//!
//! 主机命令帧（HOST_DS_COMMAND）的头部与序列化、命令/事件 ID 的封闭枚举，
//! 以及命令管理器：单一共享发送缓冲、一问一答的在途命令跟踪、暂存的 Associate 帧。

use alloc::vec::Vec;

use crate::error::CoreError;
use crate::sdio::{BssRole, SdioOps, SdioType, CTRL_PORT, SDIO_FUNC_1, SDIO_HDR_SIZE, TX_BUF_SIZE};

/// 命令头长度：pack_len, pack_type, command, size, seq_num (u16 x5) + bss, result (u8 x2)
pub const CMD_HDR_SIZE: usize = 12;
/// 事件头长度：pack_len, pack_type, event_id(u16), reserved(u16)
pub const EVENT_HDR_SIZE: usize = 8;
/// 响应中 command 字段的最高位
pub const HOST_RET_BIT: u16 = 0x8000;
/// 命令体最大长度
pub const CMD_PARAM_MAX: usize = TX_BUF_SIZE - CMD_HDR_SIZE;
/// 响应 result：成功
pub const HOST_RESULT_OK: u8 = 0;

/// 命令 ID。未知 ID 用 `Unknown` 保留原值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCmdId {
    GetHwSpec,
    Scan,
    Associate,
    Deauthenticate,
    MacControl,
    MacAddr,
    FuncInit,
    FuncShutdown,
    SysConfigure,
    BssStart,
    BssStop,
    StaDeauth,
    SupplicantPmk,
    AddbaRsp,
    Unknown(u16),
}

impl HostCmdId {
    pub fn from_u16(v: u16) -> Self {
        match v {
            0x0003 => Self::GetHwSpec,
            0x0006 => Self::Scan,
            0x0012 => Self::Associate,
            0x0024 => Self::Deauthenticate,
            0x0028 => Self::MacControl,
            0x004D => Self::MacAddr,
            0x00A9 => Self::FuncInit,
            0x00AA => Self::FuncShutdown,
            0x00B0 => Self::SysConfigure,
            0x00B1 => Self::BssStart,
            0x00B2 => Self::BssStop,
            0x00B5 => Self::StaDeauth,
            0x00C4 => Self::SupplicantPmk,
            0x00CF => Self::AddbaRsp,
            other => Self::Unknown(other),
        }
    }

    pub fn as_u16(self) -> u16 {
        match self {
            Self::GetHwSpec => 0x0003,
            Self::Scan => 0x0006,
            Self::Associate => 0x0012,
            Self::Deauthenticate => 0x0024,
            Self::MacControl => 0x0028,
            Self::MacAddr => 0x004D,
            Self::FuncInit => 0x00A9,
            Self::FuncShutdown => 0x00AA,
            Self::SysConfigure => 0x00B0,
            Self::BssStart => 0x00B1,
            Self::BssStop => 0x00B2,
            Self::StaDeauth => 0x00B5,
            Self::SupplicantPmk => 0x00C4,
            Self::AddbaRsp => 0x00CF,
            Self::Unknown(v) => v,
        }
    }

    /// 命令所属 BSS：uAP 系列命令走 uAP，其余走 STA
    pub fn bss_role(self) -> BssRole {
        match self {
            Self::SysConfigure | Self::BssStart | Self::BssStop | Self::StaDeauth => BssRole::Uap,
            _ => BssRole::Sta,
        }
    }
}

/// 事件 ID。未知 ID 用 `Unknown` 保留原值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEventId {
    Deauthenticated,
    WmmStatusChange,
    PortRelease,
    UapStaDeauth,
    UapStaAssoc,
    UapBssStart,
    Addba,
    Delba,
    UapBssIdle,
    UapBssActive,
    UapRsnConnect,
    Unknown(u16),
}

impl HostEventId {
    pub fn from_u16(v: u16) -> Self {
        match v {
            0x0008 => Self::Deauthenticated,
            0x0017 => Self::WmmStatusChange,
            0x002B => Self::PortRelease,
            0x002C => Self::UapStaDeauth,
            0x002D => Self::UapStaAssoc,
            0x002E => Self::UapBssStart,
            0x0033 => Self::Addba,
            0x0034 => Self::Delba,
            0x0043 => Self::UapBssIdle,
            0x0044 => Self::UapBssActive,
            0x0051 => Self::UapRsnConnect,
            other => Self::Unknown(other),
        }
    }

    pub fn as_u16(self) -> u16 {
        match self {
            Self::Deauthenticated => 0x0008,
            Self::WmmStatusChange => 0x0017,
            Self::PortRelease => 0x002B,
            Self::UapStaDeauth => 0x002C,
            Self::UapStaAssoc => 0x002D,
            Self::UapBssStart => 0x002E,
            Self::Addba => 0x0033,
            Self::Delba => 0x0034,
            Self::UapBssIdle => 0x0043,
            Self::UapBssActive => 0x0044,
            Self::UapRsnConnect => 0x0051,
            Self::Unknown(v) => v,
        }
    }
}

/// 命令动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CmdAction {
    Get = 0,
    Set = 1,
}

/// 命令头（HOST_DS_COMMAND 前 12 字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmdHeader {
    pub pack_len: u16,
    pub pack_type: u16,
    pub command: u16,
    pub size: u16,
    pub seq_num: u16,
    pub bss: u8,
    pub result: u8,
}

impl CmdHeader {
    /// 从收到的帧解析命令头
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < CMD_HDR_SIZE {
            return None;
        }
        let u16_at = |off: usize| u16::from_le_bytes([buf[off], buf[off + 1]]);
        Some(Self {
            pack_len: u16_at(0),
            pack_type: u16_at(2),
            command: u16_at(4),
            size: u16_at(6),
            seq_num: u16_at(8),
            bss: buf[10],
            result: buf[11],
        })
    }

    /// 去掉 HOST_RET_BIT 后的命令 ID
    pub fn cmd_id(&self) -> HostCmdId {
        HostCmdId::from_u16(self.command & !HOST_RET_BIT)
    }

    pub fn is_response(&self) -> bool {
        self.command & HOST_RET_BIT != 0
    }
}

/// 主机命令：头 + 定长命令体，序列化后经控制端口发送
#[derive(Clone)]
pub struct HostCmd {
    pub id: HostCmdId,
    pub role: BssRole,
    pub param_len: usize,
    pub param: [u8; CMD_PARAM_MAX],
}

impl core::fmt::Debug for HostCmd {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HostCmd")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("param_len", &self.param_len)
            .finish()
    }
}

impl HostCmd {
    /// 新建命令，命令体预留 `param_len` 字节（清零）
    pub fn new(id: HostCmdId, param_len: usize) -> Result<Self, CoreError> {
        if param_len > CMD_PARAM_MAX {
            return Err(CoreError::PayloadTooLarge);
        }
        Ok(Self {
            id,
            role: id.bss_role(),
            param_len,
            param: [0; CMD_PARAM_MAX],
        })
    }

    /// 有效命令体
    pub fn body(&self) -> &[u8] {
        &self.param[..self.param_len]
    }

    /// 有效命令体（可写）
    pub fn body_mut(&mut self) -> &mut [u8] {
        &mut self.param[..self.param_len]
    }

    /// 帧总长（含 SDIO 包头与命令头）
    pub fn pack_len(&self) -> usize {
        CMD_HDR_SIZE + self.param_len
    }

    pub fn header(&self) -> CmdHeader {
        let pack_len = self.pack_len() as u16;
        CmdHeader {
            pack_len,
            pack_type: SdioType::CmdRsp.as_u16(),
            command: self.id.as_u16(),
            size: pack_len - SDIO_HDR_SIZE as u16,
            // 一问一答，不做序号匹配
            seq_num: 0,
            bss: (self.role as u8) << 4,
            result: 0,
        }
    }

    /// 序列化到 buf：[header 12 bytes][param param_len bytes]，返回总长度
    pub fn serialize(&self, buf: &mut [u8]) -> Result<usize, CoreError> {
        let total = self.pack_len();
        if buf.len() < total {
            return Err(CoreError::PayloadTooLarge);
        }
        let h = self.header();
        buf[0..2].copy_from_slice(&h.pack_len.to_le_bytes());
        buf[2..4].copy_from_slice(&h.pack_type.to_le_bytes());
        buf[4..6].copy_from_slice(&h.command.to_le_bytes());
        buf[6..8].copy_from_slice(&h.size.to_le_bytes());
        buf[8..10].copy_from_slice(&h.seq_num.to_le_bytes());
        buf[10] = h.bss;
        buf[11] = h.result;
        buf[CMD_HDR_SIZE..total].copy_from_slice(self.body());
        Ok(total)
    }
}

/// 发送侧状态，整体由一把锁保护
struct TxState {
    buf: [u8; TX_BUF_SIZE],
    len: usize,
    in_flight: Option<HostCmdId>,
    sent: u32,
}

/// 命令管理器
///
/// 通道严格一问一答：下一个到达的响应属于最后发出的命令。
/// 发送侧可经共享引用使用（如中断上下文与任务上下文共用一个管理器），
/// 编码发送期间再次进入返回 [`CoreError::Busy`]。
/// WPA/WPA2 关联时 Associate 帧先暂存在 `pending_associate`，由 SUPPLICANT_PMK 的响应处理取走发送。
pub struct CmdMgr {
    tx: spin::Mutex<TxState>,
    pending_associate: Option<HostCmd>,
}

impl Default for CmdMgr {
    fn default() -> Self {
        Self::new()
    }
}

impl CmdMgr {
    pub const fn new() -> Self {
        Self {
            tx: spin::Mutex::new(TxState {
                buf: [0; TX_BUF_SIZE],
                len: 0,
                in_flight: None,
                sent: 0,
            }),
            pending_associate: None,
        }
    }

    /// 序列化进共享发送缓冲并经控制端口发出；缓冲正被占用时返回 Busy
    pub fn send(&self, sdio: &dyn SdioOps, ctrl_port: u32, cmd: &HostCmd) -> Result<(), CoreError> {
        let mut tx = self.tx.try_lock().ok_or_else(|| {
            log::warn!(target: "wireless::bsp", "cmd tx id={:?} while tx buffer held", cmd.id);
            CoreError::Busy
        })?;
        let len = cmd.serialize(&mut tx.buf[..])?;
        tx.len = len;
        log::debug!(
            target: "wireless::bsp",
            "cmd tx id={:?} (0x{:04x}) len={}",
            cmd.id,
            cmd.id.as_u16(),
            len
        );
        sdio.write_block(SDIO_FUNC_1, ctrl_port + CTRL_PORT as u32, false, &tx.buf[..len])
            .map_err(|e| {
                log::error!(target: "wireless::bsp", "cmd tx id={:?} failed err={}", cmd.id, e);
                CoreError::Io(e)
            })?;
        if let Some(prev) = tx.in_flight.replace(cmd.id) {
            log::trace!(target: "wireless::bsp", "cmd {:?} superseded by {:?} before its response", prev, cmd.id);
        }
        tx.sent = tx.sent.wrapping_add(1);
        Ok(())
    }

    /// 暂存 Associate 帧，不发送；已有暂存帧时被替换
    pub fn stage_associate(&mut self, cmd: HostCmd) {
        if self.pending_associate.is_some() {
            log::warn!(target: "wireless::bsp", "replacing previously staged associate frame");
        }
        log::debug!(target: "wireless::bsp", "associate staged, waiting SUPPLICANT_PMK response");
        self.pending_associate = Some(cmd);
    }

    pub fn staged_associate(&self) -> Option<&HostCmd> {
        self.pending_associate.as_ref()
    }

    /// 取走暂存的 Associate 帧
    pub fn take_staged_associate(&mut self) -> Option<HostCmd> {
        self.pending_associate.take()
    }

    /// 丢弃暂存帧（连接请求被替换或放弃时）
    pub fn clear_staged(&mut self) {
        if self.pending_associate.take().is_some() {
            log::debug!(target: "wireless::bsp", "staged associate frame dropped");
        }
    }

    /// 收到命令响应：清除在途标记，返回在途命令是否与响应匹配
    pub fn on_response(&self, id: HostCmdId) -> bool {
        match self.tx.lock().in_flight.take() {
            Some(sent) if sent == id => true,
            Some(sent) => {
                log::warn!(target: "wireless::bsp", "response {:?} while {:?} in flight", id, sent);
                false
            }
            None => {
                log::warn!(target: "wireless::bsp", "unsolicited response {:?}", id);
                false
            }
        }
    }

    pub fn in_flight(&self) -> Option<HostCmdId> {
        self.tx.lock().in_flight
    }

    /// 最近一次写入共享发送缓冲的帧
    pub fn last_tx(&self) -> Vec<u8> {
        let tx = self.tx.lock();
        tx.buf[..tx.len].to_vec()
    }

    /// 已发出命令数
    pub fn sent_count(&self) -> u32 {
        self.tx.lock().sent
    }
}

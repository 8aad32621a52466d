//! 88W8801 SDIO 寄存器与常量
//!
//! Function 1 寄存器偏移；多端口（multi-port）模式下 0x00 起 64 字节为一个寄存器块，
//! 一次 CMD53 读出中断状态、读/写位图和各端口读长度。

/// SDIO Function 编号
pub const SDIO_FUNC_1: u8 = 1;

/// Function 1 寄存器偏移
pub mod reg {
    /// 寄存器块起始（CMD53 一次读 MAX_MP_REGS 字节）
    pub const REG_PORT: u32 = 0x00;
    pub const HOST_INT_MASK: u32 = 0x02;
    pub const UP_LD_HOST_INT_MASK: u8 = 0x01;
    pub const HOST_INT_STATUS: u32 = 0x03;
    pub const UP_LD_HOST_INT_STATUS: u8 = 0x01;
    pub const RD_BITMAP_L: u32 = 0x04;
    pub const RD_BITMAP_U: u32 = 0x05;
    pub const WR_BITMAP_L: u32 = 0x06;
    pub const WR_BITMAP_U: u32 = 0x07;
    /// 端口 p 的读长度位于 RD_LEN_P0_L + 2p / RD_LEN_P0_U + 2p
    pub const RD_LEN_P0_L: u32 = 0x08;
    pub const RD_LEN_P0_U: u32 = 0x09;
    pub const CARD_TO_HOST_EVENT: u32 = 0x30;
    pub const CARD_IO_READY: u8 = 0x08;
    pub const DN_LD_CARD_RDY: u8 = 0x01;
    /// 固件下载时芯片请求的下一块长度
    pub const READ_BASE_0: u32 = 0x40;
    pub const READ_BASE_1: u32 = 0x41;
    pub const CARD_FW_STATUS0: u32 = 0x60;
    pub const CARD_FW_STATUS1: u32 = 0x61;
    /// 控制端口基址（24 位小端）
    pub const IO_PORT_0: u32 = 0x78;
    pub const IO_PORT_1: u32 = 0x79;
    pub const IO_PORT_2: u32 = 0x7A;
}

/// 固件就绪签名（FW_STATUS0/1 小端）
pub const FIRMWARE_READY: u16 = 0xFEDC;
/// 寄存器块长度
pub const MAX_MP_REGS: usize = 64;
/// 端口总数
pub const MAX_PORT: u8 = 16;
/// 端口 0 专用于命令/响应
pub const CTRL_PORT: u8 = 0;
pub const CTRL_PORT_MASK: u16 = 0x0001;

/// 收发缓冲大小
pub const TX_BUF_SIZE: usize = 0x800;
pub const RX_BUF_SIZE: usize = 0x800;

/// SDIO 包头：pack_len(u16) + pack_type(u16)
pub const SDIO_HDR_SIZE: usize = 4;

/// 包类型（pack_type 低字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdioType {
    Data,
    CmdRsp,
    Event,
    Unknown(u8),
}

impl SdioType {
    pub const TYPE_DATA: u8 = 0;
    pub const TYPE_CMD_CMDRSP: u8 = 1;
    pub const TYPE_EVENT: u8 = 3;

    pub fn from_u8(v: u8) -> Self {
        match v {
            Self::TYPE_DATA => SdioType::Data,
            Self::TYPE_CMD_CMDRSP => SdioType::CmdRsp,
            Self::TYPE_EVENT => SdioType::Event,
            other => SdioType::Unknown(other),
        }
    }

    pub fn as_u16(self) -> u16 {
        match self {
            SdioType::Data => Self::TYPE_DATA as u16,
            SdioType::CmdRsp => Self::TYPE_CMD_CMDRSP as u16,
            SdioType::Event => Self::TYPE_EVENT as u16,
            SdioType::Unknown(v) => v as u16,
        }
    }
}

/// BSS 角色：STA（客户端）或 uAP（软 AP）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BssRole {
    Sta = 0,
    Uap = 1,
}

impl BssRole {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(BssRole::Sta),
            1 => Some(BssRole::Uap),
            _ => None,
        }
    }
}

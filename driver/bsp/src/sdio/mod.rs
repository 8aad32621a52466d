//! 88W8801 SDIO 接口
//!
//! - `types`：寄存器偏移、端口/包类型常量
//! - `ops`：SdioOps（CMD52/CMD53 原语）、寄存器块快照、控制端口读取

mod ops;
mod types;

pub use ops::{read_ctrl_port, MpRegs, SdioOps};
pub use types::{
    reg, BssRole, SdioType, CTRL_PORT, CTRL_PORT_MASK, FIRMWARE_READY, MAX_MP_REGS, MAX_PORT,
    RX_BUF_SIZE, SDIO_FUNC_1, SDIO_HDR_SIZE, TX_BUF_SIZE,
};

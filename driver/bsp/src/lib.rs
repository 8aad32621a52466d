//! Marvell 88W8801 WiFi BSP (Board Support Package)
//!
//! 功能包括:
//! - SDIO 总线原语抽象与寄存器块快照
//! - 多端口分配（控制端口优先，数据端口轮转）
//! - 主机命令帧、命令/事件 ID、命令管理器（一问一答 + Associate 暂存）
//! - 固件注册表与分块下载
//! - 带 headroom 的包缓冲
//! - 有界轮询与上电锁
//!
//! 平台只提供 [`SdioOps`]；上电、固件下载、引导命令链由 FDRV 按顺序调用。

#![no_std]

extern crate alloc;

mod cmd;
mod error;
mod fw_load;
mod pktbuf;
mod port;
mod sdio;
mod sync;

pub use cmd::{
    CmdAction, CmdHeader, CmdMgr, HostCmd, HostCmdId, HostEventId, CMD_HDR_SIZE, CMD_PARAM_MAX,
    EVENT_HDR_SIZE, HOST_RESULT_OK, HOST_RET_BIT,
};
pub use error::{errno, CoreError, FwFailure, WaitPoint};
pub use fw_load::{
    fw_download, get_wifi_firmware, lookup_firmware, set_wifi_firmware, FwBudgets,
    DEFAULT_FW_NAME,
};
pub use pktbuf::PktBuf;
pub use port::PortAllocator;
pub use sdio::{
    read_ctrl_port, reg as sdio_reg, BssRole, MpRegs, SdioOps, SdioType, CTRL_PORT,
    CTRL_PORT_MASK, FIRMWARE_READY, MAX_MP_REGS, MAX_PORT, RX_BUF_SIZE, SDIO_FUNC_1,
    SDIO_HDR_SIZE, TX_BUF_SIZE,
};
pub use sync::{delay_spin_us, power_lock, PollBudget, LOOPS_PER_MS};

/// 默认轮询次数（写端口、固件块就绪、固件就绪签名）
pub const MAX_POLL_TRIES: u32 = 50000;

/// 上电并下载固件：复位芯片 → 读控制端口 → 分块下载 → 打开上行中断
///
/// 整段在 power_lock 内执行。返回控制端口基址。
pub fn w8801_power_on(
    sdio: &dyn SdioOps,
    image: &[u8],
    budgets: &FwBudgets,
) -> Result<u32, CoreError> {
    let _guard = sync::power_lock();
    log::info!(target: "wireless::bsp", "步骤1: PDN 复位");
    sdio.power_reset().map_err(CoreError::Io)?;

    log::info!(target: "wireless::bsp", "步骤2: 读取控制端口");
    let ctrl_port = read_ctrl_port(sdio).map_err(|e| {
        log::error!(target: "wireless::bsp", "read io port failed err={}", e);
        CoreError::UnknownIoPort
    })?;
    log::info!(target: "wireless::bsp", "ctrl_port = 0x{:06x}", ctrl_port);

    log::info!(target: "wireless::bsp", "步骤3: 固件下载");
    fw_download(sdio, ctrl_port, image, budgets)?;

    log::info!(target: "wireless::bsp", "步骤4: 打开上行中断");
    sdio.writeb_f1(sdio_reg::HOST_INT_MASK, sdio_reg::UP_LD_HOST_INT_MASK)
        .map_err(|e| {
            log::error!(target: "wireless::bsp", "write HOST_INT_MASK failed err={}", e);
            CoreError::IntMaskFailed
        })?;
    Ok(ctrl_port)
}

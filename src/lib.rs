//! 88W8801 wireless crate
//!
//! Marvell 88W8801 SDIO WiFi 主机驱动：BSP + FDRV
//! - BSP: SDIO 原语、端口分配、命令通道、固件注册与下载
//! - FDRV: TLV 编解码、命令编码、收包分发、引导与连接状态机

#![no_std]

extern crate alloc;

pub use bsp;
pub use fdrv;

use axerrno::{AxError, AxResult};
use bsp::SdioOps;
use fdrv::{parse_configfile, NetStack, WlanCallbacks, WlanCore, WlanOps};

/// 创建协议引擎并启动：解析配置 → 上电下载固件 → 发出引导链第一条命令
///
/// `cfg_text` 为 `key=value` 文本，为空时全部取默认值。固件按配置中的 `FW_NAME`
/// 从注册表取，需先调用 [`bsp::set_wifi_firmware`] 登记。
/// 返回后平台在每次 I/O 就绪时调用 `process_pending_io`，引导结果经 `on_init` 回调报告。
pub fn wireless_driver_init<S, N, C>(
    sdio: S,
    net: N,
    cb: C,
    cfg_text: &[u8],
) -> AxResult<WlanCore<S, N, C>>
where
    S: SdioOps,
    N: NetStack,
    C: WlanCallbacks,
{
    let cfg = parse_configfile(cfg_text);
    log::info!(target: "wireless", "wireless: init 88W8801, firmware {}", cfg.fw_name);
    let mut core = WlanCore::new(sdio, net, cb, cfg);
    core.init().map_err(|e| {
        log::error!(target: "wireless", "wireless: init failed {:?} (errno {})", e, e.errno());
        AxError::from(e)
    })?;
    Ok(core)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsp::{errno, BssRole};
    use fdrv::NoCallbacks;

    /// 任何总线访问都失败
    struct DeadBus;

    impl SdioOps for DeadBus {
        fn readb(&self, _func: u8, _addr: u32) -> Result<u8, i32> {
            Err(errno::EIO)
        }
        fn writeb(&self, _func: u8, _addr: u32, _val: u8) -> Result<(), i32> {
            Err(errno::EIO)
        }
        fn read_block(&self, _func: u8, _addr: u32, _incr: bool, _buf: &mut [u8]) -> Result<(), i32> {
            Err(errno::EIO)
        }
        fn write_block(&self, _func: u8, _addr: u32, _incr: bool, _buf: &[u8]) -> Result<(), i32> {
            Err(errno::EIO)
        }
    }

    struct NullNet;

    impl NetStack for NullNet {
        fn deliver_frame(&mut self, _frame: &[u8], _role: BssRole) {}
    }

    #[test]
    fn missing_firmware_fails_init() {
        let r = wireless_driver_init(DeadBus, NullNet, NoCallbacks, b"FW_NAME=not_registered.bin\n");
        assert_eq!(r.err(), Some(AxError::Io));
    }

    #[test]
    fn dead_bus_reports_io_port_error() {
        static IMAGE: [u8; 4] = [1, 2, 3, 4];
        assert!(bsp::set_wifi_firmware("dead_bus.bin", &IMAGE));
        let r = wireless_driver_init(DeadBus, NullNet, NoCallbacks, b"FW_NAME=dead_bus.bin\n");
        assert_eq!(r.err(), Some(AxError::NotFound));
    }
}

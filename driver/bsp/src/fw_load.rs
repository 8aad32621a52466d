//! 固件下载
//!
//! 上电复位后按芯片请求的块长度把固件镜像分块写入控制端口，
//! 全部写完后轮询 FW_STATUS 直到出现就绪签名。
//! 固件镜像按名称登记在注册表中，由平台在初始化前注册。

use spin::Mutex;

use crate::error::{CoreError, FwFailure, WaitPoint};
use crate::sdio::{reg, SdioOps, FIRMWARE_READY, SDIO_FUNC_1};
use crate::sync::PollBudget;

/// 默认固件文件名（STA + uAP 合一固件）
pub const DEFAULT_FW_NAME: &str = "sd8801_uapsta.bin";

const MAX_FIRMWARE_SLOTS: usize = 4;
static WIFI_FIRMWARE_STORE: Mutex<[Option<(&'static str, &'static [u8])>; MAX_FIRMWARE_SLOTS]> =
    Mutex::new([None; MAX_FIRMWARE_SLOTS]);

/// 注册固件镜像；同名再次注册时覆盖，槽位满时返回 false
pub fn set_wifi_firmware(name: &'static str, data: &'static [u8]) -> bool {
    let mut guard = WIFI_FIRMWARE_STORE.lock();
    if let Some(slot) = guard
        .iter_mut()
        .find(|s| matches!(s, Some((n, _)) if *n == name))
    {
        *slot = Some((name, data));
        return true;
    }
    match guard.iter_mut().find(|s| s.is_none()) {
        Some(slot) => {
            *slot = Some((name, data));
            true
        }
        None => {
            log::warn!(target: "wireless::bsp", "firmware store full, drop {}", name);
            false
        }
    }
}

/// 按文件名取已注册的固件
pub fn get_wifi_firmware(name: &str) -> Option<&'static [u8]> {
    let guard = WIFI_FIRMWARE_STORE.lock();
    guard
        .iter()
        .find_map(|s| s.as_ref().filter(|(n, _)| *n == name).map(|(_, d)| *d))
}

/// 按名称取固件，找不到或为空时返回对应的 `FirmwareFailed`
pub fn lookup_firmware(name: &str) -> Result<&'static [u8], CoreError> {
    match get_wifi_firmware(name) {
        None => {
            log::error!(target: "wireless::bsp", "firmware {} not registered", name);
            Err(CoreError::FirmwareFailed(FwFailure::ImageMissing))
        }
        Some(d) if d.is_empty() => Err(CoreError::FirmwareFailed(FwFailure::EmptyImage)),
        Some(d) => Ok(d),
    }
}

/// 下载固件的轮询预算
#[derive(Debug, Clone, Copy)]
pub struct FwBudgets {
    /// 等待块就绪（含下一块长度为 0 的重读）
    pub chunk_ready: PollBudget,
    /// 等待就绪签名
    pub fw_ready: PollBudget,
}

/// 芯片是否可以接收下一块
fn chunk_ready(sdio: &dyn SdioOps) -> Result<bool, CoreError> {
    let ev = sdio.readb_f1(reg::CARD_TO_HOST_EVENT).map_err(CoreError::Io)?;
    Ok(ev & reg::CARD_IO_READY != 0 && ev & reg::DN_LD_CARD_RDY != 0)
}

/// 分块下载固件并等待就绪签名
///
/// 第一块之前不检查就绪标志；之后每块都等待 CARD_IO_READY 与 DN_LD_CARD_RDY 同时置位。
/// 芯片请求奇数长度表示上一块 CRC 失败，立即中止。
pub fn fw_download(
    sdio: &dyn SdioOps,
    ctrl_port: u32,
    image: &[u8],
    budgets: &FwBudgets,
) -> Result<(), CoreError> {
    if image.is_empty() {
        return Err(CoreError::FirmwareFailed(FwFailure::EmptyImage));
    }
    log::info!(target: "wireless::bsp", "fw_download: {} bytes to port 0x{:x}", image.len(), ctrl_port);

    let mut offset = 0usize;
    let mut next_report = 0usize;
    while offset < image.len() {
        let first = offset == 0;
        let required = budgets.chunk_ready.poll(WaitPoint::FwChunkReady, || {
            if !first && !chunk_ready(sdio)? {
                return Ok(None);
            }
            let len = sdio
                .read_u16_f1(reg::READ_BASE_0, reg::READ_BASE_1)
                .map_err(CoreError::Io)?;
            Ok(if len == 0 { None } else { Some(len) })
        })?;
        if required & 1 != 0 {
            log::error!(target: "wireless::bsp", "fw_download: odd chunk length {} at offset {}", required, offset);
            return Err(CoreError::FirmwareFailed(FwFailure::OddChunk(required)));
        }
        let len = (required as usize).min(image.len() - offset);
        sdio.write_block(SDIO_FUNC_1, ctrl_port, false, &image[offset..offset + len])
            .map_err(|e| {
                log::error!(target: "wireless::bsp", "fw_download: write at offset {} failed err={}", offset, e);
                CoreError::Io(e)
            })?;
        offset += len;
        if offset >= next_report {
            log::debug!(target: "wireless::bsp", "fw_download: {}/{} bytes", offset, image.len());
            next_report = offset + 16 * 1024;
        }
    }

    let tries = core::cell::Cell::new(0u32);
    budgets.fw_ready.poll(WaitPoint::FwReady, || {
        tries.set(tries.get() + 1);
        let status = sdio
            .read_u16_f1(reg::CARD_FW_STATUS0, reg::CARD_FW_STATUS1)
            .map_err(CoreError::Io)?;
        Ok((status == FIRMWARE_READY).then_some(()))
    })?;
    log::info!(target: "wireless::bsp", "firmware active after {} status polls", tries.get());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::VecDeque;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    /// 按脚本返回 READ_BASE 长度，记录写入的块
    struct FwChip {
        lengths: RefCell<VecDeque<u16>>,
        cur_len: RefCell<u16>,
        ready_after: RefCell<u32>,
        writes: RefCell<Vec<usize>>,
        fw_status: u16,
    }

    impl FwChip {
        fn new(lengths: &[u16], fw_status: u16) -> Self {
            Self {
                lengths: RefCell::new(lengths.iter().copied().collect()),
                cur_len: RefCell::new(0),
                ready_after: RefCell::new(0),
                writes: RefCell::new(Vec::new()),
                fw_status,
            }
        }
    }

    impl SdioOps for FwChip {
        fn readb(&self, _func: u8, addr: u32) -> Result<u8, i32> {
            match addr {
                reg::CARD_TO_HOST_EVENT => {
                    let mut n = self.ready_after.borrow_mut();
                    if *n > 0 {
                        *n -= 1;
                        Ok(0)
                    } else {
                        Ok(reg::CARD_IO_READY | reg::DN_LD_CARD_RDY)
                    }
                }
                reg::READ_BASE_0 => {
                    let v = self.lengths.borrow_mut().pop_front().unwrap_or(0);
                    *self.cur_len.borrow_mut() = v;
                    Ok(v as u8)
                }
                reg::READ_BASE_1 => Ok((*self.cur_len.borrow() >> 8) as u8),
                reg::CARD_FW_STATUS0 => Ok(self.fw_status as u8),
                reg::CARD_FW_STATUS1 => Ok((self.fw_status >> 8) as u8),
                _ => Ok(0),
            }
        }
        fn writeb(&self, _func: u8, _addr: u32, _val: u8) -> Result<(), i32> {
            Ok(())
        }
        fn read_block(&self, _f: u8, _a: u32, _i: bool, _b: &mut [u8]) -> Result<(), i32> {
            Ok(())
        }
        fn write_block(&self, _f: u8, _a: u32, _i: bool, buf: &[u8]) -> Result<(), i32> {
            self.writes.borrow_mut().push(buf.len());
            Ok(())
        }
    }

    fn budgets(tries: u32) -> FwBudgets {
        FwBudgets {
            chunk_ready: PollBudget::new(tries, 0),
            fw_ready: PollBudget::new(tries, 0),
        }
    }

    #[test]
    fn chunks_follow_requested_lengths_and_clamp() {
        let image = [0xAAu8; 100];
        // 第二次读到 0 需重读
        let chip = FwChip::new(&[40, 0, 40, 64], FIRMWARE_READY);
        *chip.ready_after.borrow_mut() = 2;
        fw_download(&chip, 0x10000, &image, &budgets(10)).unwrap();
        assert_eq!(*chip.writes.borrow(), [40, 40, 20]);
    }

    #[test]
    fn odd_chunk_is_fatal() {
        let image = [0u8; 64];
        let chip = FwChip::new(&[32, 33], FIRMWARE_READY);
        assert_eq!(
            fw_download(&chip, 0, &image, &budgets(10)),
            Err(CoreError::FirmwareFailed(FwFailure::OddChunk(33)))
        );
        assert_eq!(*chip.writes.borrow(), [32]);
    }

    #[test]
    fn missing_signature_times_out() {
        let image = [0u8; 8];
        let chip = FwChip::new(&[8], 0x1234);
        assert_eq!(
            fw_download(&chip, 0, &image, &budgets(5)),
            Err(CoreError::Timeout(WaitPoint::FwReady))
        );
    }

    #[test]
    fn zero_length_forever_times_out() {
        let image = [0u8; 8];
        let chip = FwChip::new(&[], FIRMWARE_READY);
        assert_eq!(
            fw_download(&chip, 0, &image, &budgets(3)),
            Err(CoreError::Timeout(WaitPoint::FwChunkReady))
        );
        assert!(chip.writes.borrow().is_empty());
    }

    #[test]
    fn registry_lookup() {
        static IMG: [u8; 4] = [1, 2, 3, 4];
        assert!(set_wifi_firmware("test_fw.bin", &IMG));
        assert_eq!(lookup_firmware("test_fw.bin"), Ok(&IMG[..]));
        assert_eq!(
            lookup_firmware("absent.bin"),
            Err(CoreError::FirmwareFailed(FwFailure::ImageMissing))
        );
    }
}

//! 88W8801 SDIO 设备接口
//!
//! 平台只需提供 CMD52（单字节读写）与 CMD53（块传输）两类原语，
//! 寄存器块快照、控制端口读取等都在此基础上实现。

use super::types::{reg, MAX_MP_REGS, SDIO_FUNC_1};

/// SDIO 总线原语，由平台实现。错误返回负 errno。
pub trait SdioOps {
    /// CMD52 读一字节
    fn readb(&self, func: u8, addr: u32) -> Result<u8, i32>;
    /// CMD52 写一字节
    fn writeb(&self, func: u8, addr: u32, val: u8) -> Result<(), i32>;
    /// CMD53 读 `buf.len()` 字节。`incr_addr` 为 false 时为 FIFO 模式（端口地址不递增）
    fn read_block(&self, func: u8, addr: u32, incr_addr: bool, buf: &mut [u8]) -> Result<(), i32>;
    /// CMD53 写 `buf.len()` 字节
    fn write_block(&self, func: u8, addr: u32, incr_addr: bool, buf: &[u8]) -> Result<(), i32>;
    /// PDN 引脚拉低再拉高，复位芯片。无复位引脚的平台保持默认实现
    fn power_reset(&self) -> Result<(), i32> {
        Ok(())
    }

    /// Function 1 单字节读
    fn readb_f1(&self, addr: u32) -> Result<u8, i32> {
        self.readb(SDIO_FUNC_1, addr)
    }

    /// Function 1 单字节写
    fn writeb_f1(&self, addr: u32, val: u8) -> Result<(), i32> {
        self.writeb(SDIO_FUNC_1, addr, val)
    }

    /// 读一对相邻寄存器，按小端拼成 u16
    fn read_u16_f1(&self, lo: u32, hi: u32) -> Result<u16, i32> {
        let l = self.readb_f1(lo)?;
        let h = self.readb_f1(hi)?;
        Ok(u16::from_le_bytes([l, h]))
    }
}

/// 读取控制端口基址：IO_PORT_0..2 三个寄存器组成的 24 位小端值
pub fn read_ctrl_port(sdio: &dyn SdioOps) -> Result<u32, i32> {
    let b0 = sdio.readb_f1(reg::IO_PORT_0)?;
    let b1 = sdio.readb_f1(reg::IO_PORT_1)?;
    let b2 = sdio.readb_f1(reg::IO_PORT_2)?;
    Ok(u32::from_le_bytes([b0, b1, b2, 0]))
}

/// 一次 CMD53 读出的寄存器块快照
#[derive(Clone)]
pub struct MpRegs {
    buf: [u8; MAX_MP_REGS],
}

impl MpRegs {
    /// 从寄存器块起始读 MAX_MP_REGS 字节
    pub fn read(sdio: &dyn SdioOps) -> Result<Self, i32> {
        let mut buf = [0u8; MAX_MP_REGS];
        sdio.read_block(SDIO_FUNC_1, reg::REG_PORT, true, &mut buf)?;
        Ok(Self { buf })
    }

    pub fn from_bytes(buf: [u8; MAX_MP_REGS]) -> Self {
        Self { buf }
    }

    #[inline]
    fn byte(&self, addr: u32) -> u8 {
        self.buf.get(addr as usize).copied().unwrap_or(0)
    }

    #[inline]
    fn word(&self, lo: u32, hi: u32) -> u16 {
        u16::from_le_bytes([self.byte(lo), self.byte(hi)])
    }

    pub fn host_int_status(&self) -> u8 {
        self.byte(reg::HOST_INT_STATUS)
    }

    pub fn rd_bitmap(&self) -> u16 {
        self.word(reg::RD_BITMAP_L, reg::RD_BITMAP_U)
    }

    pub fn wr_bitmap(&self) -> u16 {
        self.word(reg::WR_BITMAP_L, reg::WR_BITMAP_U)
    }

    /// 端口 `port` 待读字节数
    pub fn rd_len(&self, port: u8) -> u16 {
        let off = (port as u32) << 1;
        self.word(reg::RD_LEN_P0_L + off, reg::RD_LEN_P0_U + off)
    }

    /// 清除上行中断位：把读到的状态去掉 UP_LD 位写回
    pub fn clear_upload_int(&self, sdio: &dyn SdioOps) -> Result<(), i32> {
        sdio.writeb_f1(
            reg::HOST_INT_STATUS,
            self.host_int_status() & !reg::UP_LD_HOST_INT_STATUS,
        )
    }
}

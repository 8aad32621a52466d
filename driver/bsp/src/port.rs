//! 多端口分配
//!
//! 端口 0 专用于命令/响应，由独立的 1 位掩码表示并优先于数据端口返回。
//! 读端口游标在 MAX_PORT 处回绕到 1，写端口游标在芯片上报的 mp_end_port 处回绕到 1。

use crate::error::{CoreError, WaitPoint};
use crate::sdio::{reg, SdioOps, CTRL_PORT, CTRL_PORT_MASK, MAX_PORT};
use crate::sync::PollBudget;

/// 读/写位图与游标
#[derive(Debug, Clone)]
pub struct PortAllocator {
    read_bitmap: u16,
    write_bitmap: u16,
    curr_rd_port: u8,
    curr_wr_port: u8,
    /// GET_HW_SPEC 上报的可用端口上界；0 表示尚未获取
    mp_end_port: u16,
}

impl Default for PortAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl PortAllocator {
    pub const fn new() -> Self {
        Self {
            read_bitmap: 0,
            write_bitmap: 0,
            curr_rd_port: 1,
            curr_wr_port: 1,
            mp_end_port: 0,
        }
    }

    /// 用寄存器块中的位图刷新（每轮收包前调用）
    pub fn refresh(&mut self, read_bitmap: u16, write_bitmap: u16) {
        self.read_bitmap = read_bitmap;
        self.write_bitmap = write_bitmap;
    }

    pub fn set_write_bitmap(&mut self, write_bitmap: u16) {
        self.write_bitmap = write_bitmap;
    }

    pub fn set_mp_end_port(&mut self, mp_end_port: u16) {
        log::debug!(target: "wireless::bsp::sdio", "mp_end_port = {}", mp_end_port);
        self.mp_end_port = mp_end_port;
    }

    pub fn mp_end_port(&self) -> u16 {
        self.mp_end_port
    }

    pub fn read_bitmap(&self) -> u16 {
        self.read_bitmap
    }

    /// 写游标回绕上界：mp_end_port 合法时用它，否则退回 MAX_PORT
    fn write_wrap(&self) -> u8 {
        match self.mp_end_port {
            2..=16 => self.mp_end_port as u8,
            _ => MAX_PORT,
        }
    }

    /// 下一个待读端口；None 表示本轮已读完（不是错误）
    pub fn next_readable_port(&mut self) -> Option<u8> {
        if self.read_bitmap & CTRL_PORT_MASK != 0 {
            self.read_bitmap &= !CTRL_PORT_MASK;
            return Some(CTRL_PORT);
        }
        let bit = 1u16 << self.curr_rd_port;
        if self.read_bitmap & bit == 0 {
            return None;
        }
        self.read_bitmap &= !bit;
        let port = self.curr_rd_port;
        self.curr_rd_port += 1;
        if self.curr_rd_port >= MAX_PORT {
            self.curr_rd_port = 1;
        }
        Some(port)
    }

    /// 下一个可写端口；None 表示需重新读取写位图后再试
    pub fn next_writable_port(&mut self) -> Option<u8> {
        let bit = 1u16 << self.curr_wr_port;
        if self.write_bitmap & bit == 0 {
            return None;
        }
        self.write_bitmap &= !bit;
        let port = self.curr_wr_port;
        self.curr_wr_port += 1;
        if self.curr_wr_port >= self.write_wrap() {
            self.curr_wr_port = 1;
        }
        Some(port)
    }

    /// 申请一个写端口：每次失败重读 WR_BITMAP 寄存器，预算耗尽返回超时
    pub fn acquire_write_port(
        &mut self,
        sdio: &dyn SdioOps,
        budget: &PollBudget,
    ) -> Result<u8, CoreError> {
        budget.poll(WaitPoint::WritePort, || {
            let bitmap = sdio
                .read_u16_f1(reg::WR_BITMAP_L, reg::WR_BITMAP_U)
                .map_err(|_| CoreError::SendDataFailed)?;
            self.write_bitmap = bitmap;
            Ok(self.next_writable_port())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn drain(alloc: &mut PortAllocator) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(p) = alloc.next_readable_port() {
            out.push(p);
        }
        out
    }

    #[test]
    fn control_port_has_priority() {
        let mut a = PortAllocator::new();
        a.refresh(0b0000_0000_0000_0111, 0);
        assert_eq!(drain(&mut a), [0, 1, 2]);
        assert_eq!(a.read_bitmap(), 0);
    }

    #[test]
    fn read_ports_visited_cyclically_from_cursor() {
        let mut a = PortAllocator::new();
        a.refresh(0b0000_0000_0000_0110, 0);
        assert_eq!(drain(&mut a), [1, 2]);
        // 游标停在 3；3..=15 依次，再回绕到 1
        a.refresh(0xFFFE, 0);
        let order = drain(&mut a);
        assert_eq!(order, [3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 1, 2]);
        // 每个端口恰好一次
        let mut sorted = order.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), order.len());
    }

    #[test]
    fn drain_stops_at_gap_in_bitmap() {
        let mut a = PortAllocator::new();
        // 端口 1 无数据，端口 2 有：本轮不前进（与芯片按序填充端口一致）
        a.refresh(0b100, 0);
        assert_eq!(a.next_readable_port(), None);
    }

    #[test]
    fn write_port_wraps_at_mp_end_port() {
        let mut a = PortAllocator::new();
        a.set_mp_end_port(4);
        a.set_write_bitmap(0xFFFE);
        assert_eq!(a.next_writable_port(), Some(1));
        assert_eq!(a.next_writable_port(), Some(2));
        assert_eq!(a.next_writable_port(), Some(3));
        // 游标回到 1，但位 1 已被清除
        assert_eq!(a.next_writable_port(), None);
        a.set_write_bitmap(0x0002);
        assert_eq!(a.next_writable_port(), Some(1));
    }
}

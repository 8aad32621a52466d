//! 测试用 88W8801 模拟：寄存器文件、块传输记录、自动应答命令、按端口排队的上行帧

use alloc::collections::VecDeque;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use bsp::{
    sdio_reg as reg, BssRole, CoreError, HostCmdId, SdioOps, SdioType, CMD_HDR_SIZE, FIRMWARE_READY,
    HOST_RET_BIT, MAX_MP_REGS, MAX_PORT,
};

use crate::cfgfile::WlanConfig;
use crate::host_cmd::HW_SPEC_SIZE;
use crate::net_device::{ClientInfo, NetStack};
use crate::wiphy::{ConnectFailure, ScanResult, WlanCallbacks, WlanOps};
use crate::wiphy_impl::WlanCore;

pub const MAC: [u8; 6] = [0x02, 0x88, 0x01, 0xAA, 0xBB, 0xCC];
pub const CTRL_BASE: u32 = 0x0001_0000;
pub static FW_IMAGE: [u8; 64] = [0xA5; 64];

pub fn cmd_rsp(id: u16, result: u8, body: &[u8]) -> Vec<u8> {
    let len = (CMD_HDR_SIZE + body.len()) as u16;
    let mut v = Vec::with_capacity(len as usize);
    v.extend_from_slice(&len.to_le_bytes());
    v.extend_from_slice(&SdioType::CmdRsp.as_u16().to_le_bytes());
    v.extend_from_slice(&(id | HOST_RET_BIT).to_le_bytes());
    v.extend_from_slice(&(len - 4).to_le_bytes());
    v.extend_from_slice(&[0, 0, 0, result]);
    v.extend_from_slice(body);
    v
}

pub fn event(id: u16, body: &[u8]) -> Vec<u8> {
    let len = (8 + body.len()) as u16;
    let mut v = Vec::new();
    v.extend_from_slice(&len.to_le_bytes());
    v.extend_from_slice(&SdioType::Event.as_u16().to_le_bytes());
    v.extend_from_slice(&id.to_le_bytes());
    v.extend_from_slice(&[0, 0]);
    v.extend_from_slice(body);
    v
}

/// SSID, rates, DS 参数，再加若干 (id, payload) IE
pub fn bss_ies(ssid: &[u8], channel: u8, extra: &[(u8, &[u8])]) -> Vec<u8> {
    let mut v = vec![0, ssid.len() as u8];
    v.extend_from_slice(ssid);
    v.extend_from_slice(&[1, 2, 0x82, 0x84, 3, 1, channel]);
    for (id, payload) in extra {
        v.push(*id);
        v.push(payload.len() as u8);
        v.extend_from_slice(payload);
    }
    v
}

fn default_body(id: HostCmdId) -> Vec<u8> {
    match id {
        HostCmdId::GetHwSpec => {
            let mut b = vec![0u8; HW_SPEC_SIZE];
            b[43] = 16;
            b
        }
        HostCmdId::MacAddr => {
            let mut b = vec![0u8, 0];
            b.extend_from_slice(&MAC);
            b
        }
        HostCmdId::Scan => vec![0, 0, 0],
        HostCmdId::Associate => vec![0x11, 0x04, 0, 0, 0xC0, 0x01],
        _ => Vec::new(),
    }
}

pub struct MockChip {
    regs: RefCell<[u8; 256]>,
    writes: RefCell<Vec<(u32, Vec<u8>)>>,
    /// 待上送的命令响应（端口 0）与其它帧（数据端口）
    cmd_q: RefCell<VecDeque<Vec<u8>>>,
    data_q: RefCell<VecDeque<Vec<u8>>>,
    /// 本轮寄存器快照中分配到各端口的帧
    ports: RefCell<[Option<Vec<u8>>; MAX_PORT as usize]>,
    next_port: Cell<u8>,
    overrides: RefCell<Vec<(HostCmdId, u8, Vec<u8>)>>,
    fail_reads: Cell<bool>,
}

impl MockChip {
    pub fn new() -> Self {
        let mut regs = [0u8; 256];
        let base = CTRL_BASE.to_le_bytes();
        regs[reg::IO_PORT_0 as usize] = base[0];
        regs[reg::IO_PORT_1 as usize] = base[1];
        regs[reg::IO_PORT_2 as usize] = base[2];
        regs[reg::CARD_TO_HOST_EVENT as usize] = reg::CARD_IO_READY | reg::DN_LD_CARD_RDY;
        regs[reg::READ_BASE_1 as usize] = 0x01;
        let ready = FIRMWARE_READY.to_le_bytes();
        regs[reg::CARD_FW_STATUS0 as usize] = ready[0];
        regs[reg::CARD_FW_STATUS1 as usize] = ready[1];
        regs[reg::WR_BITMAP_L as usize] = 0xFE;
        regs[reg::WR_BITMAP_U as usize] = 0xFF;
        Self {
            regs: RefCell::new(regs),
            writes: RefCell::new(Vec::new()),
            cmd_q: RefCell::new(VecDeque::new()),
            data_q: RefCell::new(VecDeque::new()),
            ports: RefCell::new(Default::default()),
            next_port: Cell::new(1),
            overrides: RefCell::new(Vec::new()),
            fail_reads: Cell::new(false),
        }
    }

    /// 下一条 `id` 命令以给定 result / body 应答
    pub fn override_rsp(&self, id: HostCmdId, result: u8, body: &[u8]) {
        self.overrides.borrow_mut().push((id, result, body.to_vec()));
    }

    pub fn push_rx(&self, frame: Vec<u8>) {
        if frame[2] == SdioType::CmdRsp.as_u16() as u8 {
            self.cmd_q.borrow_mut().push_back(frame);
        } else {
            self.data_q.borrow_mut().push_back(frame);
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.cmd_q.borrow().is_empty() || !self.data_q.borrow().is_empty()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    pub fn set_wr_bitmap(&self, bitmap: u16) {
        let b = bitmap.to_le_bytes();
        let mut regs = self.regs.borrow_mut();
        regs[reg::WR_BITMAP_L as usize] = b[0];
        regs[reg::WR_BITMAP_U as usize] = b[1];
    }

    fn is_cmd(frame: &[u8]) -> bool {
        frame.len() >= CMD_HDR_SIZE && frame[2] == SdioType::CmdRsp.as_u16() as u8
    }

    /// 发出的命令 (ID, 命令体)，按发送顺序
    pub fn cmds(&self) -> Vec<(HostCmdId, Vec<u8>)> {
        self.writes
            .borrow()
            .iter()
            .filter(|(addr, f)| *addr == CTRL_BASE && Self::is_cmd(f))
            .map(|(_, f)| {
                (
                    HostCmdId::from_u16(u16::from_le_bytes([f[4], f[5]])),
                    f[CMD_HDR_SIZE..].to_vec(),
                )
            })
            .collect()
    }

    pub fn last_cmd(&self) -> Option<(HostCmdId, Vec<u8>)> {
        self.cmds().pop()
    }

    pub fn last_write(&self) -> Option<(u32, Vec<u8>)> {
        self.writes.borrow().last().cloned()
    }

    pub fn write_count(&self) -> usize {
        self.writes.borrow().len()
    }

    /// 写入控制端口的固件字节数
    pub fn fw_bytes(&self) -> usize {
        self.writes
            .borrow()
            .iter()
            .filter(|(addr, f)| *addr == CTRL_BASE && f.first() == Some(&0xA5))
            .map(|(_, f)| f.len())
            .sum()
    }

    fn respond(&self, cmd: &[u8]) {
        let raw = u16::from_le_bytes([cmd[4], cmd[5]]);
        let id = HostCmdId::from_u16(raw);
        let mut overrides = self.overrides.borrow_mut();
        let (result, body) = match overrides.iter().position(|o| o.0 == id) {
            Some(i) => {
                let (_, result, body) = overrides.remove(i);
                (result, body)
            }
            None => (0, default_body(id)),
        };
        self.cmd_q.borrow_mut().push_back(cmd_rsp(raw, result, &body));
    }

    /// 为一次寄存器块读取分配端口：命令响应占端口 0，其余帧按游标顺序占数据端口
    fn snapshot(&self) -> [u8; MAX_MP_REGS] {
        let mut ports = self.ports.borrow_mut();
        let mut bitmap = 0u16;
        if let Some(f) = self.cmd_q.borrow_mut().pop_front() {
            ports[0] = Some(f);
            bitmap |= 1;
        }
        let mut data_q = self.data_q.borrow_mut();
        for _ in 1..MAX_PORT {
            let Some(f) = data_q.pop_front() else { break };
            let p = self.next_port.get();
            ports[p as usize] = Some(f);
            bitmap |= 1 << p;
            self.next_port.set(if p + 1 >= MAX_PORT { 1 } else { p + 1 });
        }

        let regs = self.regs.borrow();
        let mut block = [0u8; MAX_MP_REGS];
        block.copy_from_slice(&regs[..MAX_MP_REGS]);
        if bitmap != 0 {
            block[reg::HOST_INT_STATUS as usize] |= reg::UP_LD_HOST_INT_STATUS;
        }
        block[reg::RD_BITMAP_L as usize] = bitmap as u8;
        block[reg::RD_BITMAP_U as usize] = (bitmap >> 8) as u8;
        for (p, f) in ports.iter().enumerate() {
            let len = f.as_ref().map_or(0, |f| f.len() as u16).to_le_bytes();
            block[reg::RD_LEN_P0_L as usize + 2 * p] = len[0];
            block[reg::RD_LEN_P0_U as usize + 2 * p] = len[1];
        }
        block
    }
}

impl SdioOps for MockChip {
    fn readb(&self, _func: u8, addr: u32) -> Result<u8, i32> {
        Ok(self.regs.borrow().get(addr as usize).copied().unwrap_or(0))
    }

    fn writeb(&self, _func: u8, addr: u32, val: u8) -> Result<(), i32> {
        if let Some(r) = self.regs.borrow_mut().get_mut(addr as usize) {
            *r = val;
        }
        Ok(())
    }

    fn read_block(&self, _func: u8, addr: u32, _incr: bool, buf: &mut [u8]) -> Result<(), i32> {
        if addr == reg::REG_PORT {
            let block = self.snapshot();
            let n = buf.len().min(MAX_MP_REGS);
            buf[..n].copy_from_slice(&block[..n]);
            return Ok(());
        }
        if self.fail_reads.get() {
            return Err(bsp::errno::EIO);
        }
        let port = addr.wrapping_sub(CTRL_BASE) as usize;
        let frame = self
            .ports
            .borrow_mut()
            .get_mut(port)
            .and_then(Option::take)
            .ok_or(bsp::errno::ENODATA)?;
        let n = buf.len().min(frame.len());
        buf[..n].copy_from_slice(&frame[..n]);
        Ok(())
    }

    fn write_block(&self, _func: u8, addr: u32, _incr: bool, buf: &[u8]) -> Result<(), i32> {
        self.writes.borrow_mut().push((addr, buf.to_vec()));
        if addr == CTRL_BASE && Self::is_cmd(buf) {
            self.respond(buf);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MockNet {
    pub netif: Option<[u8; 6]>,
    pub delivered: Vec<(Vec<u8>, BssRole)>,
    pub links: Vec<(BssRole, bool)>,
    pub leases: Vec<([u8; 6], ClientInfo)>,
}

impl NetStack for MockNet {
    fn netif_init(&mut self, mac: &[u8; 6]) {
        self.netif = Some(*mac);
    }

    fn deliver_frame(&mut self, frame: &[u8], role: BssRole) {
        self.delivered.push((frame.to_vec(), role));
    }

    fn link_up(&mut self, role: BssRole) {
        self.links.push((role, true));
    }

    fn link_down(&mut self, role: BssRole) {
        self.links.push((role, false));
    }

    fn erase_client(&mut self, mac: &[u8; 6]) -> Option<ClientInfo> {
        let i = self.leases.iter().position(|(m, _)| m == mac)?;
        Some(self.leases.remove(i).1)
    }
}

#[derive(Default)]
pub struct Recorder {
    pub inits: Vec<Result<[u8; 6], CoreError>>,
    pub scans: Vec<Option<ScanResult>>,
    pub sta_connect: Vec<Result<(), ConnectFailure>>,
    pub sta_disconnect: u32,
    pub ap_start: Vec<Result<(), CoreError>>,
    pub ap_stop: u32,
    pub client_connect: Vec<([u8; 6], ClientInfo)>,
    pub client_disconnect: Vec<([u8; 6], Option<ClientInfo>)>,
}

impl WlanCallbacks for Recorder {
    fn on_init(&mut self, status: Result<[u8; 6], CoreError>) {
        self.inits.push(status);
    }
    fn on_scan_result(&mut self, result: Option<&ScanResult>) {
        self.scans.push(result.cloned());
    }
    fn on_sta_connect(&mut self, status: Result<(), ConnectFailure>) {
        self.sta_connect.push(status);
    }
    fn on_sta_disconnect(&mut self) {
        self.sta_disconnect += 1;
    }
    fn on_ap_start(&mut self, status: Result<(), CoreError>) {
        self.ap_start.push(status);
    }
    fn on_ap_stop(&mut self) {
        self.ap_stop += 1;
    }
    fn on_ap_client_connect(&mut self, mac: &[u8; 6], info: &ClientInfo) {
        self.client_connect.push((*mac, info.clone()));
    }
    fn on_ap_client_disconnect(&mut self, mac: &[u8; 6], info: Option<&ClientInfo>) {
        self.client_disconnect.push((*mac, info.cloned()));
    }
}

pub type MockCore = WlanCore<MockChip, MockNet, Recorder>;

pub fn core_with(chip: MockChip, retry_limit: u8) -> MockCore {
    let cfg = WlanConfig {
        write_port_retries: 8,
        connect_retry_limit: retry_limit,
        ..WlanConfig::default()
    };
    WlanCore::new(chip, MockNet::default(), Recorder::default(), cfg).with_firmware(&FW_IMAGE)
}

/// 已完成引导链的引擎
pub fn ready_core(retry_limit: u8) -> MockCore {
    let mut core = core_with(MockChip::new(), retry_limit);
    core.init().unwrap();
    while core.sdio().has_pending() {
        core.process_pending_io().unwrap();
    }
    assert_eq!(core.callbacks().inits, [Ok(MAC)]);
    core
}

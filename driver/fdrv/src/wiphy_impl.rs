//! WlanOps 实现：88W8801 协议引擎
//!
//! [`WlanCore`] 持有 SDIO 传输、网络栈与回调三个协作者，以及端口分配、命令通道、
//! 引导状态机、连接状态机和 uAP 客户端表。命令一律经控制端口发送；
//! 响应、事件、数据帧的处理见 `rx_dispatch`。

use alloc::vec::Vec;
use bsp::{
    lookup_firmware, w8801_power_on, BssRole, CmdAction, CmdMgr, CoreError, HostCmd, HostCmdId,
    PortAllocator, SdioOps, SDIO_FUNC_1,
};
use ieee80211::ETH_ALEN;

use crate::bootstrap::{BootStage, Bootstrap};
use crate::cfgfile::WlanConfig;
use crate::cmd_encoder::{encode, tx_gate, EncodeCtx, TxGate};
use crate::host_cmd::{build_ap_sys_config, build_scan_channels, build_scan_ssid};
use crate::manager::{ConnManager, ConnStatus, RetryDecision, StaTable};
use crate::net_device::{ClientInfo, NetDevice, NetDeviceStats, NetStack};
use crate::txrxif::build_tx_frame;
use crate::wiphy::{ApConfig, ConnectFailure, WlanCallbacks, WlanOps};

/// 88W8801 协议引擎
pub struct WlanCore<S: SdioOps, N: NetStack, C: WlanCallbacks> {
    pub(crate) sdio: S,
    pub(crate) net: N,
    pub(crate) cb: C,
    pub(crate) cfg: WlanConfig,
    /// 直接给定的固件镜像；None 时按 cfg.fw_name 查注册表
    image: Option<&'static [u8]>,
    pub(crate) ctrl_port: u32,
    pub(crate) mac: [u8; ETH_ALEN],
    pub(crate) ports: PortAllocator,
    pub(crate) cmd: CmdMgr,
    pub(crate) boot: Bootstrap,
    pub(crate) conn: ConnManager,
    pub(crate) clients: StaTable,
    pub(crate) sta_dev: NetDevice,
    pub(crate) uap_dev: NetDevice,
}

impl<S: SdioOps, N: NetStack, C: WlanCallbacks> WlanCore<S, N, C> {
    pub fn new(sdio: S, net: N, cb: C, cfg: WlanConfig) -> Self {
        let conn = ConnManager::new(cfg.connect_retry_limit);
        Self {
            sdio,
            net,
            cb,
            cfg,
            image: None,
            ctrl_port: 0,
            mac: [0; ETH_ALEN],
            ports: PortAllocator::new(),
            cmd: CmdMgr::new(),
            boot: Bootstrap::new(),
            conn,
            clients: StaTable::new(),
            sta_dev: NetDevice::new(BssRole::Sta),
            uap_dev: NetDevice::new(BssRole::Uap),
        }
    }

    /// 使用给定固件镜像，不查注册表
    pub fn with_firmware(mut self, image: &'static [u8]) -> Self {
        self.image = Some(image);
        self
    }

    pub fn sdio(&self) -> &S {
        &self.sdio
    }

    pub fn net(&self) -> &N {
        &self.net
    }

    pub fn net_mut(&mut self) -> &mut N {
        &mut self.net
    }

    pub fn callbacks(&self) -> &C {
        &self.cb
    }

    pub fn callbacks_mut(&mut self) -> &mut C {
        &mut self.cb
    }

    pub fn config(&self) -> &WlanConfig {
        &self.cfg
    }

    pub fn mac_addr(&self) -> [u8; ETH_ALEN] {
        self.mac
    }

    pub fn status(&self) -> ConnStatus {
        self.conn.status()
    }

    pub fn boot_stage(&self) -> BootStage {
        self.boot.stage()
    }

    pub fn ports(&self) -> &PortAllocator {
        &self.ports
    }

    pub fn cmd_mgr(&self) -> &CmdMgr {
        &self.cmd
    }

    pub fn stats(&self, role: BssRole) -> &NetDeviceStats {
        &self.dev(role).stats
    }

    pub(crate) fn dev(&self, role: BssRole) -> &NetDevice {
        match role {
            BssRole::Sta => &self.sta_dev,
            BssRole::Uap => &self.uap_dev,
        }
    }

    pub(crate) fn dev_mut(&mut self, role: BssRole) -> &mut NetDevice {
        match role {
            BssRole::Sta => &mut self.sta_dev,
            BssRole::Uap => &mut self.uap_dev,
        }
    }

    fn ensure_ready(&self) -> Result<(), CoreError> {
        if self.boot.is_ready() {
            Ok(())
        } else {
            Err(CoreError::InvalidState)
        }
    }

    /// DHCP 服务端完成租约后调用，触发 `on_ap_client_connect`
    pub fn client_leased(&mut self, mac: &[u8; ETH_ALEN], info: &ClientInfo) {
        if self.clients.find(mac).is_none() {
            log::warn!(target: "wireless::fdrv", "lease for unknown client {:02x?}", mac);
            return;
        }
        log::info!(target: "wireless::fdrv", "client {:02x?} leased {:?} ({})", mac, info.ip, info.hostname);
        self.cb.on_ap_client_connect(mac, info);
    }

    /// 编码并按发送时机发出或暂存一条命令
    pub(crate) fn issue(
        &mut self,
        id: HostCmdId,
        action: CmdAction,
        payload: &[u8],
    ) -> Result<(), CoreError> {
        let ap = self.conn.ap();
        let ctx = EncodeCtx {
            peer_bssid: ap.bssid,
            peer_cap: ap.cap,
        };
        let gate = tx_gate(id, ap.security);
        let cmd = encode(id, action, payload, &ctx)?;
        match gate {
            TxGate::SendNow => self.send_cmd(&cmd)?,
            TxGate::Stage => self.cmd.stage_associate(cmd),
        }
        Ok(())
    }

    pub(crate) fn send_cmd(&mut self, cmd: &HostCmd) -> Result<(), CoreError> {
        self.cmd.send(&self.sdio, self.ctrl_port, cmd)?;
        if cmd.id == HostCmdId::Scan {
            self.conn.on_scan_sent();
        }
        Ok(())
    }

    /// 发出引导状态机排好的下一条命令；失败时中止引导并回调 on_init
    pub(crate) fn pump_bootstrap(&mut self) -> Result<(), CoreError> {
        let Some(id) = self.boot.take_next_cmd() else {
            return Ok(());
        };
        if let Err(e) = self.issue(id, CmdAction::Get, &[]) {
            log::error!(target: "wireless::fdrv", "bootstrap: send {:?} failed: {:?}", id, e);
            self.boot.fail();
            self.cb.on_init(Err(e));
            return Err(e);
        }
        Ok(())
    }

    /// 为当前连接目标发 SSID 扫描
    pub(crate) fn send_connect_scan(&mut self) -> Result<(), CoreError> {
        let tlvs = build_scan_ssid(&self.conn.ap().ssid, self.cfg.scan_max_time)?;
        self.issue(HostCmdId::Scan, CmdAction::Get, tlvs.as_bytes())
    }

    /// 连接尝试失败：按重试预算重扫，或回到 NotConnected 并回调失败
    pub(crate) fn connect_failed(&mut self, why: ConnectFailure) {
        self.cmd.clear_staged();
        match self.conn.on_connect_failed() {
            RetryDecision::Rescan => {
                if let Err(e) = self.send_connect_scan() {
                    self.conn.abort_connect();
                    self.cb.on_sta_connect(Err(ConnectFailure::Command(e)));
                }
            }
            RetryDecision::GiveUp => {
                log::warn!(target: "wireless::fdrv", "connect failed: {:?}", why);
                self.cb.on_sta_connect(Err(why));
            }
        }
    }

    /// 申请写端口并发出一个数据帧
    fn transmit(&mut self, payload: &[u8], role: BssRole) -> Result<(), CoreError> {
        let pkt = build_tx_frame(payload, role)?;
        let budget = self.cfg.write_port_budget();
        let port = self.ports.acquire_write_port(&self.sdio, &budget)?;
        self.sdio
            .write_block(SDIO_FUNC_1, self.ctrl_port + port as u32, false, pkt.data())
            .map_err(|e| {
                log::error!(target: "wireless::fdrv", "data tx on port {} failed err={}", port, e);
                CoreError::SendDataFailed
            })?;
        log::trace!(target: "wireless::fdrv", "data tx {:?} port={} len={}", role, port, pkt.len());
        Ok(())
    }
}

impl<S: SdioOps, N: NetStack, C: WlanCallbacks> WlanOps for WlanCore<S, N, C> {
    fn init(&mut self) -> Result<(), CoreError> {
        let image = match self.image {
            Some(image) => Ok(image),
            None => lookup_firmware(&self.cfg.fw_name),
        };
        let budgets = self.cfg.fw_budgets();
        let powered = image.and_then(|image| w8801_power_on(&self.sdio, image, &budgets));
        let ctrl_port = match powered {
            Ok(port) => port,
            Err(e) => {
                log::error!(target: "wireless::fdrv", "power on failed: {:?}", e);
                self.boot.fail();
                self.cb.on_init(Err(e));
                return Err(e);
            }
        };
        self.ctrl_port = ctrl_port;
        log::info!(target: "wireless::fdrv", "firmware running, start bootstrap");
        self.boot.start();
        self.pump_bootstrap()
    }

    fn shutdown(&mut self) -> Result<(), CoreError> {
        self.issue(HostCmdId::FuncShutdown, CmdAction::Get, &[])
    }

    fn process_pending_io(&mut self) -> Result<(), CoreError> {
        self.drain()
    }

    fn scan(&mut self, channels: &[u8], max_time: u16) -> Result<(), CoreError> {
        self.ensure_ready()?;
        if self.conn.status() == ConnStatus::Connecting {
            return Err(CoreError::InvalidState);
        }
        let tlvs = build_scan_channels(channels, max_time)?;
        self.issue(HostCmdId::Scan, CmdAction::Get, tlvs.as_bytes())
    }

    fn scan_ssid(&mut self, ssid: &[u8], max_time: u16) -> Result<(), CoreError> {
        self.ensure_ready()?;
        if self.conn.status() == ConnStatus::Connecting {
            return Err(CoreError::InvalidState);
        }
        let tlvs = build_scan_ssid(ssid, max_time)?;
        self.issue(HostCmdId::Scan, CmdAction::Get, tlvs.as_bytes())
    }

    fn connect(&mut self, ssid: &[u8], passphrase: &[u8]) -> Result<(), CoreError> {
        self.ensure_ready()?;
        self.conn.begin_connect(ssid, passphrase)?;
        self.cmd.clear_staged();
        log::info!(
            target: "wireless::fdrv",
            "connect to {:?}",
            core::str::from_utf8(ssid).unwrap_or("<non-utf8>")
        );
        self.send_connect_scan().map_err(|e| {
            self.conn.abort_connect();
            e
        })
    }

    fn disconnect(&mut self) -> Result<(), CoreError> {
        if self.conn.status() != ConnStatus::Connected {
            return Ok(());
        }
        self.issue(HostCmdId::Deauthenticate, CmdAction::Get, &[])
    }

    fn start_ap(&mut self, cfg: &ApConfig<'_>) -> Result<(), CoreError> {
        self.ensure_ready()?;
        let tlvs = build_ap_sys_config(cfg.ssid, cfg.passphrase, cfg.security, cfg.broadcast_ssid)?;
        if tlvs.is_empty() {
            self.issue(HostCmdId::BssStart, CmdAction::Get, &[])
        } else {
            self.issue(HostCmdId::SysConfigure, CmdAction::Set, tlvs.as_bytes())
        }
    }

    fn stop_ap(&mut self) -> Result<(), CoreError> {
        self.ensure_ready()?;
        self.issue(HostCmdId::BssStop, CmdAction::Get, &[])
    }

    fn deauth_client(&mut self, mac: &[u8; ETH_ALEN]) -> Result<(), CoreError> {
        self.ensure_ready()?;
        self.issue(HostCmdId::StaDeauth, CmdAction::Get, mac)
    }

    fn list_clients(&self) -> Vec<(usize, [u8; ETH_ALEN])> {
        let list: Vec<_> = self.clients.iter().collect();
        for (slot, mac) in &list {
            log::info!(target: "wireless::fdrv", "client[{}] {:02x?}", slot, mac);
        }
        list
    }

    fn send_data(&mut self, payload: &[u8], role: BssRole) -> Result<(), CoreError> {
        self.ensure_ready()?;
        match self.transmit(payload, role) {
            Ok(()) => {
                self.dev_mut(role).count_tx(payload.len());
                Ok(())
            }
            Err(e) => {
                let dev = self.dev_mut(role);
                dev.stats.tx_errors = dev.stats.tx_errors.wrapping_add(1);
                Err(e)
            }
        }
    }
}

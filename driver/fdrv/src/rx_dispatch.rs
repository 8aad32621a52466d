//! 收包排空与分发
//!
//! 一次 I/O 就绪：读一次寄存器块 → 清上行中断 → 刷新位图 → 按 [`PortAllocator`] 给出的顺序
//! 逐个端口读帧并按类型分发给命令响应、事件、数据三个处理函数。
//! 读端口失败或命令响应 result 非 0 会中止本轮排空。
//!
//! [`PortAllocator`]: bsp::PortAllocator

use alloc::string::String;
use alloc::vec;
use bsp::{
    BssRole, CmdAction, CmdHeader, CoreError, HostCmdId, HostEventId, MpRegs, SdioOps, SdioType,
    CMD_HDR_SIZE, EVENT_HDR_SIZE, HOST_RESULT_OK, RX_BUF_SIZE, SDIO_FUNC_1, SDIO_HDR_SIZE,
};

use crate::bootstrap::BootStep;
use crate::host_cmd::{
    append_assoc_security, build_assoc_base, build_pmk_tlvs, event_sta_mac,
    parse_assoc_capability, parse_hw_spec_mp_end_port, parse_mac_addr_rsp,
};
use crate::manager::{ConnStatus, ScanVerdict, TableFull};
use crate::net_device::NetStack;
use crate::scan::{BssDescriptor, ScanRsp};
use crate::txrxif::{route_uap, RxPd, UapRoute};
use crate::wiphy::{AssocRefusal, ConnectFailure, ScanResult, WlanCallbacks, WlanOps};
use crate::wiphy_impl::WlanCore;

impl<S: SdioOps, N: NetStack, C: WlanCallbacks> WlanCore<S, N, C> {
    /// 排空所有待读端口
    pub(crate) fn drain(&mut self) -> Result<(), CoreError> {
        let regs = MpRegs::read(&self.sdio).map_err(|e| {
            log::error!(target: "wireless::fdrv::rx", "read mp regs failed err={}", e);
            CoreError::IntStatusFailed
        })?;
        regs.clear_upload_int(&self.sdio).map_err(|e| {
            log::error!(target: "wireless::fdrv::rx", "clear int status failed err={}", e);
            CoreError::IntStatusFailed
        })?;
        self.ports.refresh(regs.rd_bitmap(), regs.wr_bitmap());

        while let Some(port) = self.ports.next_readable_port() {
            let len = regs.rd_len(port) as usize;
            if len < SDIO_HDR_SIZE || len > RX_BUF_SIZE {
                log::error!(target: "wireless::fdrv::rx", "port {} bad rd_len {}", port, len);
                return Err(CoreError::InvalidRxBuffer);
            }
            let mut frame = vec![0u8; len];
            self.sdio
                .read_block(SDIO_FUNC_1, self.ctrl_port + port as u32, false, &mut frame)
                .map_err(|e| {
                    log::error!(target: "wireless::fdrv::rx", "read port {} failed err={}", port, e);
                    CoreError::InvalidRxBuffer
                })?;
            log::debug!(target: "wireless::fdrv::rx", "rx port={} len={}", port, len);
            self.dispatch(&frame)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, frame: &[u8]) -> Result<(), CoreError> {
        match SdioType::from_u8(frame[2]) {
            SdioType::Data => self.on_data(frame),
            SdioType::CmdRsp => self.on_cmd_rsp(frame),
            SdioType::Event => self.on_event(frame),
            SdioType::Unknown(t) => {
                log::warn!(target: "wireless::fdrv::rx", "unknown frame type {}", t);
                Ok(())
            }
        }
    }

    fn on_cmd_rsp(&mut self, frame: &[u8]) -> Result<(), CoreError> {
        let hdr = CmdHeader::parse(frame).ok_or(CoreError::MalformedFrame)?;
        let id = hdr.cmd_id();
        let body = frame.get(CMD_HDR_SIZE..).unwrap_or(&[]);
        self.cmd.on_response(id);
        if hdr.result != HOST_RESULT_OK {
            let e = CoreError::InvalidCmdResponse {
                cmd: id.as_u16(),
                result: hdr.result,
            };
            log::error!(target: "wireless::fdrv::rx", "cmd {:?} response result={}", id, hdr.result);
            self.cmd_failed(id, e);
            return Err(e);
        }
        log::debug!(target: "wireless::fdrv::rx", "cmd {:?} response ok, body {} bytes", id, body.len());

        match id {
            HostCmdId::FuncInit | HostCmdId::MacControl | HostCmdId::GetHwSpec | HostCmdId::MacAddr => {
                self.on_boot_rsp(id, body)
            }
            HostCmdId::FuncShutdown => {
                log::info!(target: "wireless::fdrv", "firmware shut down");
                self.boot.reset();
                self.conn.reset();
                self.cmd.clear_staged();
                self.clients.clear();
                self.cb.on_init(Err(CoreError::InvalidState));
                Ok(())
            }
            HostCmdId::Scan => self.on_scan_rsp(body),
            HostCmdId::Associate => {
                let cap = parse_assoc_capability(body).ok_or(CoreError::MalformedFrame)?;
                match AssocRefusal::from_capability(cap) {
                    Some(r) if self.conn.status() == ConnStatus::Connecting => {
                        log::warn!(target: "wireless::fdrv", "associate refused: {:?}", r);
                        self.connect_failed(ConnectFailure::Refused(r));
                    }
                    Some(r) => log::debug!(target: "wireless::fdrv", "late associate refusal {:?}", r),
                    None => log::info!(target: "wireless::fdrv", "associated, cap=0x{:04x}", cap),
                }
                Ok(())
            }
            HostCmdId::SupplicantPmk => {
                match self.cmd.take_staged_associate() {
                    Some(assoc) => {
                        log::debug!(target: "wireless::fdrv", "pmk cached, flush staged associate");
                        if let Err(e) = self.send_cmd(&assoc) {
                            self.connect_failed(ConnectFailure::Command(e));
                        }
                    }
                    None => log::debug!(target: "wireless::fdrv", "pmk response without staged associate"),
                }
                Ok(())
            }
            HostCmdId::SysConfigure => {
                if let Err(e) = self.issue(HostCmdId::BssStart, CmdAction::Get, &[]) {
                    self.cb.on_ap_start(Err(e));
                }
                Ok(())
            }
            HostCmdId::BssStop => {
                log::info!(target: "wireless::fdrv", "uap stopped");
                self.uap_dev.carrier_off();
                self.clients.clear();
                self.net.link_down(BssRole::Uap);
                self.cb.on_ap_stop();
                Ok(())
            }
            HostCmdId::Deauthenticate
            | HostCmdId::BssStart
            | HostCmdId::StaDeauth
            | HostCmdId::AddbaRsp => Ok(()),
            HostCmdId::Unknown(raw) => {
                log::warn!(target: "wireless::fdrv::rx", "response for unknown command 0x{:04x}", raw);
                Ok(())
            }
        }
    }

    /// 非 OK 响应：通知对应的操作失败
    fn cmd_failed(&mut self, id: HostCmdId, e: CoreError) {
        match id {
            HostCmdId::FuncInit | HostCmdId::MacControl | HostCmdId::GetHwSpec | HostCmdId::MacAddr
                if !self.boot.is_ready() =>
            {
                self.boot.fail();
                self.cb.on_init(Err(e));
            }
            HostCmdId::Scan => match self.conn.on_scan_rsp() {
                ScanVerdict::Connect => self.connect_failed(ConnectFailure::Command(e)),
                ScanVerdict::Plain => self.cb.on_scan_result(None),
                ScanVerdict::Stale => {}
            },
            HostCmdId::SupplicantPmk | HostCmdId::Associate
                if self.conn.status() == ConnStatus::Connecting =>
            {
                self.connect_failed(ConnectFailure::Command(e));
            }
            HostCmdId::SysConfigure | HostCmdId::BssStart => self.cb.on_ap_start(Err(e)),
            _ => {}
        }
    }

    fn on_boot_rsp(&mut self, id: HostCmdId, body: &[u8]) -> Result<(), CoreError> {
        match id {
            HostCmdId::GetHwSpec => {
                let end = parse_hw_spec_mp_end_port(body).ok_or(CoreError::MalformedFrame)?;
                self.ports.set_mp_end_port(end);
            }
            HostCmdId::MacAddr => {
                let mac = parse_mac_addr_rsp(body).ok_or(CoreError::MalformedFrame)?;
                self.mac = mac;
                self.sta_dev.set_mac_addr(&mac);
                self.uap_dev.set_mac_addr(&mac);
            }
            _ => {}
        }
        match self.boot.advance(id) {
            BootStep::Next(_) => self.pump_bootstrap(),
            BootStep::Done => {
                log::info!(target: "wireless::fdrv", "bootstrap done, mac {:02x?}", self.mac);
                self.net.netif_init(&self.mac);
                self.cb.on_init(Ok(self.mac));
                Ok(())
            }
            BootStep::NotMine => {
                log::debug!(target: "wireless::fdrv", "{:?} response outside bootstrap", id);
                Ok(())
            }
        }
    }

    fn on_scan_rsp(&mut self, body: &[u8]) -> Result<(), CoreError> {
        let verdict = self.conn.on_scan_rsp();
        let rsp = match ScanRsp::parse(body) {
            Ok(rsp) => rsp,
            Err(e) => {
                match verdict {
                    ScanVerdict::Connect => self.connect_failed(ConnectFailure::Command(e)),
                    ScanVerdict::Plain => self.cb.on_scan_result(None),
                    ScanVerdict::Stale => {}
                }
                return Err(e);
            }
        };
        log::debug!(target: "wireless::fdrv", "scan response: {} sets, {:?}", rsp.number_of_sets, verdict);
        match verdict {
            ScanVerdict::Stale => {
                log::warn!(target: "wireless::fdrv", "drop scan response of replaced connect request");
            }
            ScanVerdict::Plain => {
                for desc in rsp.descriptors() {
                    let Ok(desc) = desc else { break };
                    let result = ScanResult {
                        ssid: String::from_utf8_lossy(desc.ssid).into_owned(),
                        bssid: desc.bssid,
                        rssi: desc.rssi,
                        channel: desc.channel,
                        security: desc.security,
                    };
                    self.cb.on_scan_result(Some(&result));
                }
                self.cb.on_scan_result(None);
            }
            ScanVerdict::Connect => {
                let target = self.conn.ap().ssid.clone();
                let found = rsp
                    .descriptors()
                    .map_while(Result::ok)
                    .find(|d| d.ssid == target.as_slice());
                match found {
                    Some(desc) => {
                        if let Err(e) = self.associate(&desc) {
                            self.connect_failed(ConnectFailure::Command(e));
                        }
                    }
                    None => self.connect_failed(ConnectFailure::NotFound),
                }
            }
        }
        Ok(())
    }

    /// 对选中的 BSS 发起关联
    ///
    /// WPA/WPA2：先发 SUPPLICANT_PMK，再补齐 vendor / RSN 参数并暂存 Associate，
    /// 由 PMK 响应取出发送。开放网络直接发送 Associate。
    fn associate(&mut self, desc: &BssDescriptor<'_>) -> Result<(), CoreError> {
        self.conn.set_peer(desc.bssid, desc.cap_info, desc.security);
        let ap = self.conn.ap();
        let ssid = ap.ssid.clone();
        let passphrase = ap.passphrase.clone();
        log::info!(
            target: "wireless::fdrv",
            "associate with {:02x?} ch={} security={:?}",
            desc.bssid,
            desc.channel,
            desc.security
        );

        let mut tlvs = build_assoc_base(&ssid, desc.channel, desc.security)?;
        if desc.security.is_wpa_family() {
            let pmk = build_pmk_tlvs(&ssid, &desc.bssid, &passphrase)?;
            self.issue(HostCmdId::SupplicantPmk, CmdAction::Set, pmk.as_bytes())?;
        }
        append_assoc_security(&mut tlvs, desc.security, desc.vendor_ies(), desc.rsn)?;
        self.issue(HostCmdId::Associate, CmdAction::Get, tlvs.as_bytes())
    }

    fn on_event(&mut self, frame: &[u8]) -> Result<(), CoreError> {
        if frame.len() < EVENT_HDR_SIZE {
            return Err(CoreError::MalformedFrame);
        }
        let id = HostEventId::from_u16(u16::from_le_bytes([frame[4], frame[5]]));
        let body = &frame[EVENT_HDR_SIZE..];
        log::debug!(target: "wireless::fdrv::rx", "event {:?}", id);

        match id {
            HostEventId::Deauthenticated => {
                let prev = self.conn.on_deauthenticated();
                log::info!(target: "wireless::fdrv", "sta deauthenticated (was {:?})", prev);
                self.cmd.clear_staged();
                self.sta_dev.carrier_off();
                self.net.link_down(BssRole::Sta);
                self.cb.on_sta_disconnect();
            }
            HostEventId::PortRelease => {
                self.conn.on_port_release();
                log::info!(target: "wireless::fdrv", "sta link up");
                self.sta_dev.carrier_on();
                self.net.link_up(BssRole::Sta);
                self.cb.on_sta_connect(Ok(()));
            }
            HostEventId::UapStaDeauth => {
                let mac = event_sta_mac(body).ok_or(CoreError::MalformedFrame)?;
                // 表满时被拒的客户端不在表中，不回调
                let Some(slot) = self.clients.evict(&mac) else {
                    log::debug!(target: "wireless::fdrv", "deauth of untracked client {:02x?}", mac);
                    return Ok(());
                };
                log::info!(target: "wireless::fdrv", "client[{}] {:02x?} left", slot, mac);
                let info = self.net.erase_client(&mac);
                self.cb.on_ap_client_disconnect(&mac, info.as_ref());
            }
            HostEventId::UapStaAssoc => {
                let mac = event_sta_mac(body).ok_or(CoreError::MalformedFrame)?;
                match self.clients.admit(&mac) {
                    Ok(slot) => log::info!(target: "wireless::fdrv", "client[{}] {:02x?} associated", slot, mac),
                    Err(TableFull(mac)) => {
                        log::warn!(target: "wireless::fdrv", "client table full, deauth {:02x?}", mac);
                        self.issue(HostCmdId::StaDeauth, CmdAction::Get, &mac)?;
                    }
                }
            }
            HostEventId::UapBssStart => {
                log::info!(target: "wireless::fdrv", "uap started");
                self.uap_dev.carrier_on();
                self.net.link_up(BssRole::Uap);
                self.cb.on_ap_start(Ok(()));
            }
            HostEventId::Addba => {
                self.issue(HostCmdId::AddbaRsp, CmdAction::Get, body)?;
            }
            HostEventId::Delba
            | HostEventId::WmmStatusChange
            | HostEventId::UapBssIdle
            | HostEventId::UapBssActive
            | HostEventId::UapRsnConnect => {
                log::info!(target: "wireless::fdrv", "event {:?}", id);
            }
            HostEventId::Unknown(raw) => {
                log::warn!(target: "wireless::fdrv::rx", "unknown event 0x{:04x}", raw);
            }
        }
        Ok(())
    }

    fn on_data(&mut self, frame: &[u8]) -> Result<(), CoreError> {
        let Ok(pd) = RxPd::parse(frame) else {
            log::warn!(target: "wireless::fdrv::rx", "bad rxpd, drop frame of {} bytes", frame.len());
            self.sta_dev.stats.rx_dropped = self.sta_dev.stats.rx_dropped.wrapping_add(1);
            return Ok(());
        };
        let route = match (pd.role, pd.dest()) {
            (BssRole::Sta, _) => UapRoute::Deliver,
            (BssRole::Uap, Some(dest)) => route_uap(dest, &self.mac),
            (BssRole::Uap, None) => UapRoute::Deliver,
        };
        if matches!(route, UapRoute::Forward | UapRoute::ForwardAndDeliver) {
            self.forward(pd.payload);
        }
        if matches!(route, UapRoute::Deliver | UapRoute::ForwardAndDeliver) {
            self.dev_mut(pd.role).count_rx(pd.payload.len());
            self.net.deliver_frame(pd.payload, pd.role);
        }
        Ok(())
    }

    /// uAP 客户端之间的帧发回空口；失败只计数
    fn forward(&mut self, payload: &[u8]) {
        match self.send_data(payload, BssRole::Uap) {
            Ok(()) => {
                self.uap_dev.stats.forwarded = self.uap_dev.stats.forwarded.wrapping_add(1);
            }
            Err(e) => {
                log::warn!(target: "wireless::fdrv::rx", "forward failed: {:?}", e);
                self.uap_dev.stats.tx_dropped = self.uap_dev.stats.tx_dropped.wrapping_add(1);
            }
        }
    }
}

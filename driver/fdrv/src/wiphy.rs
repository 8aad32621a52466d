//! 无线控制平面
//!
//! 应用侧看到的操作集合 [`WlanOps`] 与事件回调集合 [`WlanCallbacks`]，
//! 以及二者共用的扫描结果、安全类型、连接失败原因等类型。

use alloc::string::String;
use bsp::{BssRole, CoreError};
use ieee80211::ETH_ALEN;

use crate::net_device::ClientInfo;

/// 网络安全类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityKind {
    #[default]
    None,
    Wep,
    Wpa,
    Wpa2,
}

impl SecurityKind {
    /// WPA / WPA2 需要先下发 PMK 再关联
    pub fn is_wpa_family(self) -> bool {
        matches!(self, SecurityKind::Wpa | SecurityKind::Wpa2)
    }
}

/// 扫描结果项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub ssid: String,
    pub bssid: [u8; ETH_ALEN],
    pub rssi: u8,
    pub channel: u8,
    pub security: SecurityKind,
}

/// ASSOCIATE 响应中的失败码（capability 字段 0xFFFC..=0xFFFF）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssocRefusal {
    /// 0xFFFC
    Timeout,
    /// 0xFFFD
    AuthRefused,
    /// 0xFFFE
    AuthUnhandled,
    /// 0xFFFF
    Internal,
}

impl AssocRefusal {
    pub fn from_capability(cap: u16) -> Option<Self> {
        match cap {
            0xFFFC => Some(Self::Timeout),
            0xFFFD => Some(Self::AuthRefused),
            0xFFFE => Some(Self::AuthUnhandled),
            0xFFFF => Some(Self::Internal),
            _ => None,
        }
    }
}

/// 连接失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailure {
    /// SSID 扫描没有找到网络
    NotFound,
    /// 发送 PMK / Associate 失败或其响应非 OK
    Command(CoreError),
    /// 关联被拒绝
    Refused(AssocRefusal),
}

/// 启动 AP 的参数
#[derive(Debug, Clone, Copy)]
pub struct ApConfig<'a> {
    /// None 时使用固件默认 SSID
    pub ssid: Option<&'a [u8]>,
    pub passphrase: Option<&'a [u8]>,
    pub security: SecurityKind,
    pub broadcast_ssid: bool,
}

/// 应用侧 API
pub trait WlanOps {
    /// 上电、下载固件、开始引导命令链；链完成后回调 `on_init`
    fn init(&mut self) -> Result<(), CoreError>;
    /// 发送 FUNC_SHUTDOWN
    fn shutdown(&mut self) -> Result<(), CoreError>;
    /// 中断或轮询到有待处理 I/O 时调用，排空所有读端口
    fn process_pending_io(&mut self) -> Result<(), CoreError>;
    fn scan(&mut self, channels: &[u8], max_time: u16) -> Result<(), CoreError>;
    fn scan_ssid(&mut self, ssid: &[u8], max_time: u16) -> Result<(), CoreError>;
    fn connect(&mut self, ssid: &[u8], passphrase: &[u8]) -> Result<(), CoreError>;
    /// 未连接时为空操作
    fn disconnect(&mut self) -> Result<(), CoreError>;
    fn start_ap(&mut self, cfg: &ApConfig<'_>) -> Result<(), CoreError>;
    fn stop_ap(&mut self) -> Result<(), CoreError>;
    fn deauth_client(&mut self, mac: &[u8; ETH_ALEN]) -> Result<(), CoreError>;
    /// 已接入客户端的 (槽位, MAC)
    fn list_clients(&self) -> alloc::vec::Vec<(usize, [u8; ETH_ALEN])>;
    fn send_data(&mut self, payload: &[u8], role: BssRole) -> Result<(), CoreError>;
}

/// 事件回调，未覆盖的方法为空操作
#[allow(unused_variables)]
pub trait WlanCallbacks {
    /// 引导完成（Ok）或失败；FUNC_SHUTDOWN 响应也以失败上报
    fn on_init(&mut self, status: Result<[u8; ETH_ALEN], CoreError>) {}
    /// 每个 BSS 一次；`None` 表示本次扫描结束
    fn on_scan_result(&mut self, result: Option<&ScanResult>) {}
    fn on_sta_connect(&mut self, status: Result<(), ConnectFailure>) {}
    fn on_sta_disconnect(&mut self) {}
    fn on_ap_start(&mut self, status: Result<(), CoreError>) {}
    fn on_ap_stop(&mut self) {}
    fn on_ap_client_connect(&mut self, mac: &[u8; ETH_ALEN], info: &ClientInfo) {}
    /// `info` 为 None 表示租约表中没有该客户端
    fn on_ap_client_disconnect(&mut self, mac: &[u8; ETH_ALEN], info: Option<&ClientInfo>) {}
}

/// 不关心任何事件时使用
#[derive(Debug, Default)]
pub struct NoCallbacks;

impl WlanCallbacks for NoCallbacks {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refusal_codes() {
        assert_eq!(AssocRefusal::from_capability(0xFFFC), Some(AssocRefusal::Timeout));
        assert_eq!(AssocRefusal::from_capability(0xFFFF), Some(AssocRefusal::Internal));
        assert_eq!(AssocRefusal::from_capability(0x0411), None);
        assert!(SecurityKind::Wpa.is_wpa_family());
        assert!(!SecurityKind::Wep.is_wpa_family());
    }
}

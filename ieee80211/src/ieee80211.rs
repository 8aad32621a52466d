//! IEEE 802.11 类型与常量
//!
//! 88W8801 扫描响应中的 BSS 描述符携带原始 802.11 信息元素（1 字节 ID + 1 字节长度），
//! 这里只收录驱动解析/组包时用到的部分。

/// 2.4GHz 频段信道数（1..=14）
pub const MAX_CHANNEL_2G: u8 = 14;

/// MAC 地址长度
pub const ETH_ALEN: usize = 6;

/// 802.11 信息元素 ID（WLAN_EID_*）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WlanEid {
    Ssid = 0,
    SupportedRates = 1,
    DsParams = 3,
    CfParams = 4,
    Rsn = 48,
    VendorSpecific = 221,
}

impl WlanEid {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Ssid),
            1 => Some(Self::SupportedRates),
            3 => Some(Self::DsParams),
            4 => Some(Self::CfParams),
            48 => Some(Self::Rsn),
            221 => Some(Self::VendorSpecific),
            _ => None,
        }
    }
}

/// Capability Information 字段位（WLAN_CAPABILITY_*）
pub mod capability {
    pub const ESS: u16 = 1 << 0;
    pub const IBSS: u16 = 1 << 1;
    pub const PRIVACY: u16 = 1 << 4;
}

/// Deauthentication reason code（WLAN_REASON_*）
pub mod reason {
    /// 发送方离开 BSS（AP 侧踢出 STA）
    pub const DEAUTH_LEAVING: u16 = 3;
    /// 对端 STA 离开 BSS（STA 主动断开）
    pub const STA_LEAVING: u16 = 36;
}

/// Microsoft OUI，vendor IE 中 type 1 表示 WPA（WPA1）信息元素
pub const WPA_OUI: [u8; 3] = [0x00, 0x50, 0xF2];
pub const WPA_OUI_TYPE: u8 = 1;

/// 判断 vendor IE 载荷是否为 WPA 信息元素（OUI 00:50:F2，type 1）
#[inline]
pub fn is_wpa_vendor_ie(payload: &[u8]) -> bool {
    payload.len() >= 4 && payload[..3] == WPA_OUI && payload[3] == WPA_OUI_TYPE
}

/// 组播/广播地址：首字节最低位为 1
#[inline]
pub fn is_multicast_ether_addr(addr: &[u8]) -> bool {
    addr.first().map(|b| b & 0x01 != 0).unwrap_or(false)
}

/// 2.4GHz 信道号转中心频率（MHz），非法信道返回 None
pub fn channel_to_freq_2g(chan: u8) -> Option<u32> {
    match chan {
        1..=13 => Some(2407 + 5 * chan as u32),
        14 => Some(2484),
        _ => None,
    }
}

/// Supported Rates 字节转速率（单位 500kbps，去掉 basic 位）
#[inline]
pub fn rate_500kbps(rate: u8) -> u8 {
    rate & 0x7F
}

/// Supported Rates 字节转 Mbps（整数部分）
#[inline]
pub fn rate_mbps(rate: u8) -> u8 {
    rate_500kbps(rate) >> 1
}

//! # ieee80211：IEEE 802.11 常量与辅助函数
//!
//! 88W8801 主机驱动用到的 802.11 信息元素 ID、Capability 位、reason code、
//! WPA OUI 识别以及地址/信道/速率换算。

#![no_std]

pub mod ieee80211;

pub use ieee80211::{
    capability, channel_to_freq_2g, is_multicast_ether_addr, is_wpa_vendor_ie, rate_500kbps,
    rate_mbps, reason, WlanEid, ETH_ALEN, MAX_CHANNEL_2G, WPA_OUI, WPA_OUI_TYPE,
};

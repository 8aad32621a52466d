//! 主机命令参数块构建与响应/事件解析
//!
//! 命令体中的参数块均为 Marvell TLV 链：扫描信道列表、关联参数、PMK 缓存、uAP 系统配置。
//! 响应与事件体的定长字段解析在这里完成，长度不足一律返回 None。

use alloc::vec::Vec;
use bsp::CoreError;
use ieee80211::ETH_ALEN;

use crate::tlv::TlvBuilder;
use crate::wiphy::SecurityKind;

/// Marvell TLV 类型
pub mod tlv_type {
    pub const SSID: u16 = 0x0000;
    pub const RATES: u16 = 0x0001;
    pub const PHY_DS: u16 = 0x0003;
    pub const CF: u16 = 0x0004;
    pub const RSN_PARAMSET: u16 = 0x0030;
    pub const VENDOR_SPECIFIC_IE: u16 = 0x00DD;
    pub const CHANLIST: u16 = 0x0101;
    pub const AUTH_TYPE: u16 = 0x011F;
    pub const BSSID: u16 = 0x0123;
    pub const UAP_BCAST_SSID_CTL: u16 = 0x0130;
    pub const PASSPHRASE: u16 = 0x013C;
    pub const UAP_ENCRYPT_PROTOCOL: u16 = 0x0140;
    pub const UAP_AKMP: u16 = 0x0141;
    pub const PWK_CIPHER: u16 = 0x0191;
    pub const GWK_CIPHER: u16 = 0x0192;
}

/// 最大 SSID 长度
pub const MAX_SSID_LENGTH: usize = 32;
/// 最大口令长度
pub const MAX_PHRASE_LENGTH: usize = 64;
/// 2.4G 信道数，SSID 扫描时扫 1..=14
pub const MAX_CHANNEL_NUM: u8 = 14;
/// 默认单信道最大扫描时间（ms）
pub const MAX_SCAN_TIME: u16 = 200;

pub const AUTH_TYPE_OPEN: u16 = 0;
pub const WPA_CIPHER_CCMP: u16 = 0x08;
/// AKMP key_mgmt：PSK
pub const KEY_MGMT_PSK: u16 = 0x02;

/// MAC_CONTROL action 位
pub const HOST_ACT_MAC_RX_ON: u16 = 0x0001;
pub const HOST_ACT_MAC_TX_ON: u16 = 0x0002;
pub const HOST_ACT_MAC_ETHERNETII_ENABLE: u16 = 0x0010;

/// 关联时携带的 12 个支持速率（500kbps 单位，最高位为基本速率）
pub const ASSOC_RATES: [u8; 12] = [
    0x82, 0x84, 0x8B, 0x8C, 0x12, 0x96, 0x98, 0x24, 0xB0, 0x48, 0x60, 0x6C,
];

/// GET_HW_SPEC 命令体长度
pub const HW_SPEC_SIZE: usize = 47;
/// 响应体中 mp_end_port 偏移
const HW_SPEC_MP_END_PORT_OFF: usize = 43;

/// ChanScanParamSet：radio_type u8, chan u8, scan_mode u8, min_time u16, max_time u16
pub const CHAN_SCAN_PARAM_SIZE: usize = 7;

fn chan_scan_param(channel: u8, max_time: u16) -> [u8; CHAN_SCAN_PARAM_SIZE] {
    let t = max_time.to_le_bytes();
    [0, channel, 0, 0, 0, t[0], t[1]]
}

/// 追加 CHANLIST TLV：每个信道一个 7 字节 ChanScanParamSet
pub fn push_chan_list(b: &mut TlvBuilder, channels: &[u8], max_time: u16) -> Result<(), CoreError> {
    let mut params = Vec::with_capacity(channels.len() * CHAN_SCAN_PARAM_SIZE);
    for &ch in channels {
        params.extend_from_slice(&chan_scan_param(ch, max_time));
    }
    b.push(tlv_type::CHANLIST, &params)?;
    Ok(())
}

/// 普通扫描参数：仅信道列表
pub fn build_scan_channels(channels: &[u8], max_time: u16) -> Result<TlvBuilder, CoreError> {
    if channels.is_empty() {
        return Err(CoreError::InvalidParam);
    }
    let mut b = TlvBuilder::new();
    push_chan_list(&mut b, channels, max_time)?;
    Ok(b)
}

/// SSID 定向扫描参数：SSID + 信道 1..=14
pub fn build_scan_ssid(ssid: &[u8], max_time: u16) -> Result<TlvBuilder, CoreError> {
    if ssid.is_empty() || ssid.len() > MAX_SSID_LENGTH {
        return Err(CoreError::InvalidParam);
    }
    let channels: Vec<u8> = (1..=MAX_CHANNEL_NUM).collect();
    let mut b = TlvBuilder::new();
    b.push(tlv_type::SSID, ssid)?;
    push_chan_list(&mut b, &channels, max_time)?;
    Ok(b)
}

/// 关联参数（安全相关部分之前）：SSID, PHY_DS, CF, [AUTH_TYPE], CHANLIST, RATES
pub fn build_assoc_base(
    ssid: &[u8],
    channel: u8,
    security: SecurityKind,
) -> Result<TlvBuilder, CoreError> {
    let mut b = TlvBuilder::new();
    b.push(tlv_type::SSID, ssid)?;
    b.push(tlv_type::PHY_DS, &[channel])?;
    b.push(tlv_type::CF, &[0; 6])?;
    if security == SecurityKind::None {
        b.push_u16(tlv_type::AUTH_TYPE, AUTH_TYPE_OPEN)?;
    }
    push_chan_list(&mut b, &[channel], MAX_SCAN_TIME)?;
    b.push(tlv_type::RATES, &ASSOC_RATES)?;
    Ok(b)
}

/// 追加 WPA/WPA2 关联所需的 IE：全部保留的 vendor IE，WPA2 时再加 RSN
pub fn append_assoc_security(
    b: &mut TlvBuilder,
    security: SecurityKind,
    vendor_ies: &[&[u8]],
    rsn: Option<&[u8]>,
) -> Result<(), CoreError> {
    if !security.is_wpa_family() {
        return Ok(());
    }
    for ie in vendor_ies {
        b.push(tlv_type::VENDOR_SPECIFIC_IE, ie)?;
    }
    if security == SecurityKind::Wpa2 {
        let rsn = rsn.ok_or(CoreError::InvalidState)?;
        b.push(tlv_type::RSN_PARAMSET, rsn)?;
    }
    Ok(())
}

/// SUPPLICANT_PMK 参数：SSID, BSSID, PASSPHRASE
pub fn build_pmk_tlvs(
    ssid: &[u8],
    bssid: &[u8; ETH_ALEN],
    passphrase: &[u8],
) -> Result<TlvBuilder, CoreError> {
    let mut b = TlvBuilder::new();
    b.push(tlv_type::SSID, ssid)?;
    b.push(tlv_type::BSSID, bssid)?;
    b.push(tlv_type::PASSPHRASE, passphrase)?;
    Ok(b)
}

/// uAP 加密协议位：WPA 为 bit3，WPA2 为 bit5；WEP 按 WPA 处理
fn uap_protocol(security: SecurityKind) -> u16 {
    if security == SecurityKind::Wpa2 {
        1 << 5
    } else {
        1 << 3
    }
}

/// uAP SYS_CONFIGURE 参数块；返回空块时直接发 BSS_START
///
/// SSID 仅在 1..=31 字节时下发，口令仅在 1..=63 字节时下发。
pub fn build_ap_sys_config(
    ssid: Option<&[u8]>,
    passphrase: Option<&[u8]>,
    security: SecurityKind,
    broadcast_ssid: bool,
) -> Result<TlvBuilder, CoreError> {
    let mut b = TlvBuilder::new();
    if let Some(ssid) = ssid.filter(|s| !s.is_empty() && s.len() < MAX_SSID_LENGTH) {
        b.push(tlv_type::SSID, ssid)?;
        b.push(tlv_type::UAP_BCAST_SSID_CTL, &[broadcast_ssid as u8])?;
    }
    if security != SecurityKind::None {
        if let Some(pwd) = passphrase.filter(|p| !p.is_empty() && p.len() < MAX_PHRASE_LENGTH) {
            b.push(tlv_type::PASSPHRASE, pwd)?;
        }
        let protocol = uap_protocol(security);
        b.push_u16(tlv_type::UAP_ENCRYPT_PROTOCOL, protocol)?;
        b.push_parts(
            tlv_type::UAP_AKMP,
            &[&KEY_MGMT_PSK.to_le_bytes(), &0u16.to_le_bytes()],
        )?;
        b.push_parts(
            tlv_type::PWK_CIPHER,
            &[&protocol.to_le_bytes(), &WPA_CIPHER_CCMP.to_le_bytes()],
        )?;
        b.push_u16(tlv_type::GWK_CIPHER, WPA_CIPHER_CCMP)?;
    }
    Ok(b)
}

#[inline]
fn u16_at(buf: &[u8], off: usize) -> Option<u16> {
    buf.get(off..off + 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

#[inline]
fn mac_at(buf: &[u8], off: usize) -> Option<[u8; ETH_ALEN]> {
    let s = buf.get(off..off + ETH_ALEN)?;
    let mut mac = [0u8; ETH_ALEN];
    mac.copy_from_slice(s);
    Some(mac)
}

/// GET_HW_SPEC 响应：芯片可用的最高端口号
pub fn parse_hw_spec_mp_end_port(body: &[u8]) -> Option<u16> {
    u16_at(body, HW_SPEC_MP_END_PORT_OFF)
}

/// MAC_ADDR 响应：action u16 + mac[6]
pub fn parse_mac_addr_rsp(body: &[u8]) -> Option<[u8; ETH_ALEN]> {
    mac_at(body, 2)
}

/// ASSOCIATE 响应的 capability 字段（0xFFFC..=0xFFFF 为失败码）
pub fn parse_assoc_capability(body: &[u8]) -> Option<u16> {
    u16_at(body, 0)
}

/// uAP 客户端事件（STA_ASSOC / STA_DEAUTH）中的客户端 MAC，位于事件体偏移 2
pub fn event_sta_mac(body: &[u8]) -> Option<[u8; ETH_ALEN]> {
    mac_at(body, 2)
}

/// ADDBA 请求事件体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddbaReq {
    pub result: u8,
    pub peer_mac: [u8; ETH_ALEN],
    pub dialog_token: u8,
    pub block_ack_param_set: u16,
    pub block_ack_tmo: u16,
    pub ssn: u16,
}

impl AddbaReq {
    pub const SIZE: usize = 14;

    pub fn parse(body: &[u8]) -> Option<Self> {
        if body.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            result: body[0],
            peer_mac: mac_at(body, 1)?,
            dialog_token: body[7],
            block_ack_param_set: u16_at(body, 8)?,
            block_ack_tmo: u16_at(body, 10)?,
            ssn: u16_at(body, 12)?,
        })
    }
}

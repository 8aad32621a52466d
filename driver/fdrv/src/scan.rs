//! 扫描响应解析与安全类型推断
//!
//! 响应体：bss_descript_size u16, number_of_sets u8，之后是 number_of_sets 个 BSS 描述：
//! ie_length u16（不含自身）, bssid[6], rssi u8, tsf u64, beacon_interval u16, cap_info u16，
//! 其后 `ie_length - 19` 字节为 IEEE IE 链。

use bsp::CoreError;
use ieee80211::{capability, is_wpa_vendor_ie, rate_mbps, WlanEid, ETH_ALEN};

use crate::host_cmd::MAX_SSID_LENGTH;
use crate::tlv::TlvIter;
use crate::wiphy::SecurityKind;

/// 每个 BSS 最多保留的 vendor IE 个数，多余的静默丢弃
pub const MAX_VENDOR_IES: usize = 8;
/// 扫描响应体头：bss_descript_size u16 + number_of_sets u8
const SCAN_RSP_HDR: usize = 3;
/// BSS 描述中 ie_length 之后的定长部分
const BSS_FIXED_LEN: usize = ETH_ALEN + 1 + 8 + 2 + 2;

/// 一个 BSS 的解析视图，IE 均借用响应缓冲
#[derive(Debug, Clone)]
pub struct BssDescriptor<'a> {
    pub bssid: [u8; ETH_ALEN],
    pub rssi: u8,
    pub tsf: u64,
    pub beacon_interval: u16,
    pub cap_info: u16,
    pub channel: u8,
    pub ssid: &'a [u8],
    pub rates: Option<&'a [u8]>,
    pub security: SecurityKind,
    pub rsn: Option<&'a [u8]>,
    vendor: [&'a [u8]; MAX_VENDOR_IES],
    vendor_count: usize,
}

impl<'a> BssDescriptor<'a> {
    /// 保留的 vendor IE（IE 负载，不含 id/len）
    pub fn vendor_ies(&self) -> &[&'a [u8]] {
        &self.vendor[..self.vendor_count]
    }

    pub fn is_ibss(&self) -> bool {
        self.cap_info & capability::IBSS != 0
    }

    fn log(&self) {
        log::debug!(
            target: "wireless::fdrv",
            "bss ssid={:?} mac={:02x?} rssi={} ch={} cap=0x{:04x} security={:?} mode={}",
            core::str::from_utf8(self.ssid).unwrap_or("<non-utf8>"),
            self.bssid,
            self.rssi,
            self.channel,
            self.cap_info,
            self.security,
            if self.is_ibss() { "Ad-Hoc" } else { "Infrastructure" }
        );
        if let Some(rates) = self.rates {
            for r in rates {
                log::debug!(target: "wireless::fdrv", "  rate {} Mbps", rate_mbps(*r));
            }
        }
    }
}

/// 按 IE 出现顺序归约安全类型：初值 WEP；RSN 置 WPA2；WPA vendor IE 仅在尚未 WPA2 时置 WPA；
/// 最后 privacy 位为 0 时无论前面结果如何都为 None
pub fn infer_security(cap_info: u16, ies: &[u8]) -> Result<SecurityKind, CoreError> {
    let mut security = SecurityKind::Wep;
    for ie in TlvIter::ieee(ies) {
        let ie = ie?;
        match WlanEid::from_u8(ie.tlv_type as u8) {
            Some(WlanEid::Rsn) => security = SecurityKind::Wpa2,
            Some(WlanEid::VendorSpecific)
                if security != SecurityKind::Wpa2 && is_wpa_vendor_ie(ie.payload) =>
            {
                security = SecurityKind::Wpa
            }
            _ => {}
        }
    }
    if cap_info & capability::PRIVACY == 0 {
        security = SecurityKind::None;
    }
    Ok(security)
}

fn parse_descriptor<'a>(raw: &'a [u8]) -> Result<BssDescriptor<'a>, CoreError> {
    if raw.len() < BSS_FIXED_LEN {
        return Err(CoreError::MalformedFrame);
    }
    let mut bssid = [0u8; ETH_ALEN];
    bssid.copy_from_slice(&raw[..ETH_ALEN]);
    let mut tsf = [0u8; 8];
    tsf.copy_from_slice(&raw[7..15]);
    let cap_info = u16::from_le_bytes([raw[17], raw[18]]);
    let ies = &raw[BSS_FIXED_LEN..];
    let empty: &[u8] = &[];

    let mut desc = BssDescriptor {
        bssid,
        rssi: raw[6],
        tsf: u64::from_le_bytes(tsf),
        beacon_interval: u16::from_le_bytes([raw[15], raw[16]]),
        cap_info,
        channel: 0,
        ssid: empty,
        rates: None,
        security: SecurityKind::Wep,
        rsn: None,
        vendor: [empty; MAX_VENDOR_IES],
        vendor_count: 0,
    };
    for ie in TlvIter::ieee(ies) {
        let ie = ie?;
        match WlanEid::from_u8(ie.tlv_type as u8) {
            Some(WlanEid::Ssid) => {
                desc.ssid = &ie.payload[..ie.payload.len().min(MAX_SSID_LENGTH)];
            }
            Some(WlanEid::SupportedRates) => desc.rates = Some(ie.payload),
            Some(WlanEid::DsParams) => {
                if let Some(&ch) = ie.payload.first() {
                    desc.channel = ch;
                }
            }
            Some(WlanEid::Rsn) => desc.rsn = Some(ie.payload),
            Some(WlanEid::VendorSpecific) => {
                if desc.vendor_count < MAX_VENDOR_IES {
                    desc.vendor[desc.vendor_count] = ie.payload;
                    desc.vendor_count += 1;
                }
            }
            _ => {}
        }
    }
    desc.security = infer_security(cap_info, ies)?;
    Ok(desc)
}

/// 扫描响应体视图
#[derive(Debug, Clone, Copy)]
pub struct ScanRsp<'a> {
    pub bss_descript_size: u16,
    pub number_of_sets: u8,
    sets: &'a [u8],
}

impl<'a> ScanRsp<'a> {
    pub fn parse(body: &'a [u8]) -> Result<Self, CoreError> {
        if body.len() < SCAN_RSP_HDR {
            return Err(CoreError::MalformedFrame);
        }
        Ok(Self {
            bss_descript_size: u16::from_le_bytes([body[0], body[1]]),
            number_of_sets: body[2],
            sets: &body[SCAN_RSP_HDR..],
        })
    }

    pub fn is_empty(&self) -> bool {
        self.number_of_sets == 0
    }

    pub fn descriptors(&self) -> BssIter<'a> {
        BssIter {
            rest: self.sets,
            remaining: self.number_of_sets,
            failed: false,
        }
    }
}

/// 切出一个带 ie_length 前缀的 BSS 描述，返回描述与剩余缓冲
fn split_descriptor(rest: &[u8]) -> Result<(BssDescriptor<'_>, &[u8]), CoreError> {
    let len = rest
        .get(..2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]) as usize)
        .ok_or(CoreError::MalformedFrame)?;
    let raw = rest.get(2..2 + len).ok_or(CoreError::MalformedFrame)?;
    Ok((parse_descriptor(raw)?, &rest[2 + len..]))
}

/// 依次产出 BSS 描述；出错后终止
pub struct BssIter<'a> {
    rest: &'a [u8],
    remaining: u8,
    failed: bool,
}

impl<'a> Iterator for BssIter<'a> {
    type Item = Result<BssDescriptor<'a>, CoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let step = split_descriptor(self.rest).map(|(desc, rest)| {
            self.rest = rest;
            desc
        });
        match step {
            Ok(desc) => {
                desc.log();
                Some(Ok(desc))
            }
            Err(e) => {
                log::warn!(target: "wireless::fdrv", "scan response truncated: {:?}", e);
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloc::vec::Vec;

    /// 构造一个 BSS 描述（含 ie_length 前缀）
    pub(crate) fn bss(bssid: [u8; 6], rssi: u8, cap: u16, ies: &[u8]) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&((BSS_FIXED_LEN + ies.len()) as u16).to_le_bytes());
        v.extend_from_slice(&bssid);
        v.push(rssi);
        v.extend_from_slice(&0u64.to_le_bytes());
        v.extend_from_slice(&100u16.to_le_bytes());
        v.extend_from_slice(&cap.to_le_bytes());
        v.extend_from_slice(ies);
        v
    }

    pub(crate) fn scan_body(sets: &[Vec<u8>]) -> Vec<u8> {
        let total: usize = sets.iter().map(|s| s.len()).sum();
        let mut v = Vec::new();
        v.extend_from_slice(&(total as u16).to_le_bytes());
        v.push(sets.len() as u8);
        for s in sets {
            v.extend_from_slice(s);
        }
        v
    }

    const WPA_IE: [u8; 6] = [221, 4, 0x00, 0x50, 0xF2, 0x01];
    const RSN_IE: [u8; 4] = [48, 2, 1, 0];
    const PRIV: u16 = capability::ESS | capability::PRIVACY;

    #[test]
    fn security_precedence() {
        // 仅 privacy：WEP
        assert_eq!(infer_security(PRIV, &[]), Ok(SecurityKind::Wep));
        // vendor WPA
        assert_eq!(infer_security(PRIV, &WPA_IE), Ok(SecurityKind::Wpa));
        // RSN 在前，之后的 WPA vendor 不降级
        let ies: Vec<u8> = RSN_IE.iter().chain(WPA_IE.iter()).copied().collect();
        assert_eq!(infer_security(PRIV, &ies), Ok(SecurityKind::Wpa2));
        // WPA vendor 在前，RSN 覆盖为 WPA2
        let ies: Vec<u8> = WPA_IE.iter().chain(RSN_IE.iter()).copied().collect();
        assert_eq!(infer_security(PRIV, &ies), Ok(SecurityKind::Wpa2));
        // privacy 位清零时一律 None
        assert_eq!(infer_security(capability::ESS, &ies), Ok(SecurityKind::None));
        // 非 WPA 类型的 vendor IE 不影响
        assert_eq!(
            infer_security(PRIV, &[221, 4, 0x00, 0x50, 0xF2, 0x02]),
            Ok(SecurityKind::Wep)
        );
    }

    #[test]
    fn descriptors_are_walked() {
        let mut ies = Vec::new();
        ies.extend_from_slice(&[0, 4, b'h', b'o', b'm', b'e']);
        ies.extend_from_slice(&[1, 2, 0x82, 0x0C]);
        ies.extend_from_slice(&[3, 1, 11]);
        ies.extend_from_slice(&RSN_IE);
        for _ in 0..10 {
            ies.extend_from_slice(&[221, 3, 0x00, 0x10, 0x18]);
        }
        let a = bss([1; 6], 40, PRIV, &ies);
        let b = bss([2; 6], 70, capability::ESS | capability::IBSS, &[0, 1, b'x']);
        let body = scan_body(&[a, b]);
        let rsp = ScanRsp::parse(&body).unwrap();
        assert_eq!(rsp.number_of_sets, 2);
        let all: Vec<_> = rsp.descriptors().collect::<Result<_, _>>().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].ssid, b"home");
        assert_eq!(all[0].channel, 11);
        assert_eq!(all[0].rates, Some(&[0x82u8, 0x0C][..]));
        assert_eq!(all[0].security, SecurityKind::Wpa2);
        assert_eq!(all[0].rsn, Some(&[1u8, 0][..]));
        assert_eq!(all[0].vendor_ies().len(), MAX_VENDOR_IES);
        assert_eq!(all[1].bssid, [2; 6]);
        assert_eq!(all[1].security, SecurityKind::None);
        assert!(all[1].is_ibss());
    }

    #[test]
    fn malformed_chain_is_an_error() {
        let a = bss([1; 6], 40, PRIV, &[0, 9, b'a']);
        let body = scan_body(&[a]);
        let rsp = ScanRsp::parse(&body).unwrap();
        let mut it = rsp.descriptors();
        assert_eq!(it.next().map(|r| r.map(|_| ())), Some(Err(CoreError::MalformedTlv)));
        assert!(it.next().is_none());

        // number_of_sets 大于实际描述个数
        let mut body = scan_body(&[bss([1; 6], 40, PRIV, &[])]);
        body[2] = 2;
        let rsp = ScanRsp::parse(&body).unwrap();
        let r: Result<Vec<_>, _> = rsp.descriptors().collect();
        assert_eq!(r.map(|v| v.len()), Err(CoreError::MalformedFrame));
    }
}

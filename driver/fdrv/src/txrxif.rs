//! 数据面：以太网帧与 TxPD / RxPD 之间的封装与解析
//!
//! 发送帧 = SDIO 头(4) + TxPD(16) + 以太网帧；接收帧 = SDIO 头(4) + RxPD + 以太网帧，
//! 以太网帧位于 `4 + rx_pkt_offset`。

use bsp::{BssRole, CoreError, PktBuf, SdioType, SDIO_HDR_SIZE, TX_BUF_SIZE};
use ieee80211::{is_multicast_ether_addr, ETH_ALEN};

/// SDIO 头 + TxPD
pub const TXPD_SIZE: usize = 20;
/// TxPD 中记录的包偏移（相对 SDIO 头之后）
const TX_PKT_OFFSET: u16 = (TXPD_SIZE - SDIO_HDR_SIZE) as u16;
/// RxPD 定长部分：bss_type u8, bss_num u8, rx_pkt_length u16, rx_pkt_offset u16
const RXPD_MIN: usize = SDIO_HDR_SIZE + 6;

/// 封装一个待发送数据帧
pub fn build_tx_frame(payload: &[u8], role: BssRole) -> Result<PktBuf, CoreError> {
    if payload.is_empty() {
        return Err(CoreError::InvalidParam);
    }
    let total = TXPD_SIZE + payload.len();
    if total > TX_BUF_SIZE {
        return Err(CoreError::PayloadTooLarge);
    }
    let mut pkt = PktBuf::alloc_with_headroom(TX_BUF_SIZE, TXPD_SIZE);
    pkt.put(payload.len())
        .ok_or(CoreError::PayloadTooLarge)?
        .copy_from_slice(payload);
    let hdr = pkt.push(TXPD_SIZE).ok_or(CoreError::PayloadTooLarge)?;
    hdr.fill(0);
    hdr[0..2].copy_from_slice(&(total as u16).to_le_bytes());
    hdr[2..4].copy_from_slice(&SdioType::Data.as_u16().to_le_bytes());
    hdr[4] = role as u8;
    hdr[5] = 0;
    hdr[6..8].copy_from_slice(&(payload.len() as u16).to_le_bytes());
    hdr[8..10].copy_from_slice(&TX_PKT_OFFSET.to_le_bytes());
    Ok(pkt)
}

/// 接收数据帧的 RxPD 视图
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxPd<'a> {
    pub role: BssRole,
    pub payload: &'a [u8],
}

impl<'a> RxPd<'a> {
    pub fn parse(frame: &'a [u8]) -> Result<Self, CoreError> {
        if frame.len() < RXPD_MIN {
            return Err(CoreError::MalformedFrame);
        }
        let role = BssRole::from_u8(frame[4]).ok_or(CoreError::MalformedFrame)?;
        let len = u16::from_le_bytes([frame[6], frame[7]]) as usize;
        let off = SDIO_HDR_SIZE + u16::from_le_bytes([frame[8], frame[9]]) as usize;
        let payload = frame.get(off..off + len).ok_or(CoreError::MalformedFrame)?;
        Ok(Self { role, payload })
    }

    /// 目的 MAC
    pub fn dest(&self) -> Option<&'a [u8]> {
        self.payload.get(..ETH_ALEN)
    }
}

/// uAP 收到的帧怎么处理
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UapRoute {
    /// 发给本机
    Deliver,
    /// 发给其它客户端，只转发回空口
    Forward,
    /// 组播/广播：转发并上送
    ForwardAndDeliver,
}

pub fn route_uap(dest: &[u8], own_mac: &[u8; ETH_ALEN]) -> UapRoute {
    if is_multicast_ether_addr(dest) {
        UapRoute::ForwardAndDeliver
    } else if dest != own_mac {
        UapRoute::Forward
    } else {
        UapRoute::Deliver
    }
}

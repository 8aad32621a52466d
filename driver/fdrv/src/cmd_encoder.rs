//! 命令编码
//!
//! 把 (命令 ID, 动作, 参数块) 编码为完整的 [`HostCmd`]：每个命令有固定布局的命令体，
//! SCAN / ASSOCIATE / SUPPLICANT_PMK / SYS_CONFIGURE 在定长字段之后原样拼接调用方的 TLV 参数块，
//! ADDBA_RSP 从触发它的 ADDBA 请求事件体中复制字段。
//!
//! 是否立即发送由 [`tx_gate`] 决定：WPA/WPA2 网络的 Associate 只暂存，等 SUPPLICANT_PMK 响应后再发。

use bsp::{CmdAction, CoreError, HostCmd, HostCmdId};
use ieee80211::{reason, ETH_ALEN};

use crate::host_cmd::{
    AddbaReq, HOST_ACT_MAC_ETHERNETII_ENABLE, HOST_ACT_MAC_RX_ON, HOST_ACT_MAC_TX_ON, HW_SPEC_SIZE,
};
use crate::wiphy::SecurityKind;

/// SCAN 命令 bss_mode：任意类型
const HOST_BSS_MODE_ANY: u8 = 3;
/// 关联 listen interval / beacon period
const ASSOC_LISTEN_INTERVAL: u16 = 0x000A;
const ASSOC_BEACON_PERIOD: u16 = 0x0040;

/// MAC_CONTROL 默认动作：开收发、EthernetII 帧格式
pub const MAC_CONTROL_DEFAULT: u16 =
    HOST_ACT_MAC_RX_ON | HOST_ACT_MAC_TX_ON | HOST_ACT_MAC_ETHERNETII_ENABLE;

/// 编码需要的设备侧状态（关联对端）
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeCtx {
    pub peer_bssid: [u8; ETH_ALEN],
    pub peer_cap: u16,
}

/// 发送时机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxGate {
    /// 立即经控制端口发送
    SendNow,
    /// 暂存，等待 SUPPLICANT_PMK 响应
    Stage,
}

/// 除 WPA/WPA2 网络的 Associate 外，所有命令都立即发送
pub fn tx_gate(id: HostCmdId, security: SecurityKind) -> TxGate {
    if id == HostCmdId::Associate && security.is_wpa_family() {
        TxGate::Stage
    } else {
        TxGate::SendNow
    }
}

/// 依次写入命令体的小工具
struct BodyWriter<'a> {
    buf: &'a mut [u8],
    off: usize,
}

impl<'a> BodyWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, off: 0 }
    }

    fn bytes(&mut self, b: &[u8]) -> &mut Self {
        self.buf[self.off..self.off + b.len()].copy_from_slice(b);
        self.off += b.len();
        self
    }

    fn u8(&mut self, v: u8) -> &mut Self {
        self.bytes(&[v])
    }

    fn u16(&mut self, v: u16) -> &mut Self {
        self.bytes(&v.to_le_bytes())
    }
}

fn with_body(
    id: HostCmdId,
    len: usize,
    fill: impl FnOnce(&mut BodyWriter<'_>),
) -> Result<HostCmd, CoreError> {
    let mut cmd = HostCmd::new(id, len)?;
    fill(&mut BodyWriter::new(cmd.body_mut()));
    Ok(cmd)
}

fn mac_from(payload: &[u8]) -> Result<[u8; ETH_ALEN], CoreError> {
    let s = payload.get(..ETH_ALEN).ok_or(CoreError::InvalidParam)?;
    let mut mac = [0u8; ETH_ALEN];
    mac.copy_from_slice(s);
    Ok(mac)
}

/// 编码一条命令
///
/// `payload` 的含义随命令不同：
/// - Scan / Associate / SupplicantPmk / SysConfigure：TLV 参数块
/// - MacControl：2 字节 action 位图（为空时用默认值）
/// - MacAddr：Set 时为新 MAC
/// - StaDeauth：客户端 MAC
/// - AddbaRsp：ADDBA 请求事件体
pub fn encode(
    id: HostCmdId,
    action: CmdAction,
    payload: &[u8],
    ctx: &EncodeCtx,
) -> Result<HostCmd, CoreError> {
    let cmd = match id {
        HostCmdId::GetHwSpec => HostCmd::new(id, HW_SPEC_SIZE)?,
        HostCmdId::Scan => with_body(id, 1 + ETH_ALEN + payload.len(), |w| {
            w.u8(HOST_BSS_MODE_ANY).bytes(&[0; ETH_ALEN]).bytes(payload);
        })?,
        HostCmdId::Associate => with_body(id, ETH_ALEN + 7 + payload.len(), |w| {
            w.bytes(&ctx.peer_bssid)
                .u16(ctx.peer_cap)
                .u16(ASSOC_LISTEN_INTERVAL)
                .u16(ASSOC_BEACON_PERIOD)
                .u8(0)
                .bytes(payload);
        })?,
        HostCmdId::Deauthenticate => with_body(id, ETH_ALEN + 2, |w| {
            w.bytes(&ctx.peer_bssid).u16(reason::STA_LEAVING);
        })?,
        HostCmdId::MacControl => {
            let bits = match payload {
                [] => MAC_CONTROL_DEFAULT,
                [lo, hi, ..] => u16::from_le_bytes([*lo, *hi]),
                _ => return Err(CoreError::InvalidParam),
            };
            with_body(id, 4, |w| {
                w.u16(bits).u16(0);
            })?
        }
        HostCmdId::MacAddr => {
            let mac = match action {
                CmdAction::Get => [0; ETH_ALEN],
                CmdAction::Set => mac_from(payload)?,
            };
            with_body(id, 2 + ETH_ALEN, |w| {
                w.u16(action as u16).bytes(&mac);
            })?
        }
        HostCmdId::FuncInit
        | HostCmdId::FuncShutdown
        | HostCmdId::BssStart
        | HostCmdId::BssStop => HostCmd::new(id, 0)?,
        HostCmdId::SysConfigure => with_body(id, 2 + payload.len(), |w| {
            w.u16(action as u16).bytes(payload);
        })?,
        HostCmdId::StaDeauth => {
            let mac = mac_from(payload)?;
            with_body(id, ETH_ALEN + 2, |w| {
                w.bytes(&mac).u16(reason::DEAUTH_LEAVING);
            })?
        }
        HostCmdId::SupplicantPmk => with_body(id, 4 + payload.len(), |w| {
            w.u16(action as u16).u16(0).bytes(payload);
        })?,
        HostCmdId::AddbaRsp => {
            let req = AddbaReq::parse(payload).ok_or(CoreError::MalformedFrame)?;
            with_body(id, 16, |w| {
                w.u8(0)
                    .bytes(&req.peer_mac)
                    .u8(req.dialog_token)
                    .u16(0)
                    .u16(req.block_ack_param_set)
                    .u16(req.block_ack_tmo)
                    .u16(req.ssn);
            })?
        }
        HostCmdId::Unknown(raw) => {
            log::warn!(target: "wireless::fdrv", "refuse to encode unknown command 0x{:04x}", raw);
            return Err(CoreError::InvalidParam);
        }
    };
    Ok(cmd)
}

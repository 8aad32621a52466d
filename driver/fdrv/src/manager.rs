//! 连接状态机
//!
//! STA：NotConnected → Connecting（SSID 扫描、PMK、Associate）→ Connected（PORT_RELEASE 事件）。
//! 同一时刻只有一次连接尝试；连接中再次 connect 会替换目标，之前发出的扫描响应到达时作废。
//!
//! uAP：[`StaTable`] 记录已关联客户端，表满时新客户端立即被踢出。

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use bsp::CoreError;
use ieee80211::ETH_ALEN;

use crate::host_cmd::{MAX_PHRASE_LENGTH, MAX_SSID_LENGTH};
use crate::wiphy::SecurityKind;

/// uAP 最多同时接入的客户端数
pub const MAX_CLIENT_NUM: usize = 2;

/// STA 连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnStatus {
    NotConnected,
    Connecting,
    Connected,
}

/// 目标 AP
#[derive(Debug, Clone, Default)]
pub struct ApInfo {
    pub ssid: Vec<u8>,
    pub passphrase: Vec<u8>,
    pub security: SecurityKind,
    pub bssid: [u8; ETH_ALEN],
    pub cap: u16,
}

/// 扫描响应归属
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanVerdict {
    /// 被新的连接请求替换前发出的扫描
    Stale,
    /// 当前连接尝试的扫描
    Connect,
    /// 普通扫描
    Plain,
}

/// 已发出、响应未到的扫描
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingScan {
    /// 连接尝试发出的 SSID 扫描
    Connect,
    /// 已被新的连接请求替换
    Replaced,
    /// 调用者的普通扫描
    Plain,
}

/// 连接失败后的处理
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// 重新发 SSID 扫描，保持 Connecting
    Rescan,
    /// 预算耗尽，已回到 NotConnected
    GiveUp,
}

#[derive(Debug)]
pub struct ConnManager {
    status: ConnStatus,
    ap: ApInfo,
    retry_limit: u8,
    retries_left: u8,
    /// 按发出顺序排列，响应按同一顺序到达
    scans: VecDeque<PendingScan>,
}

impl ConnManager {
    pub fn new(retry_limit: u8) -> Self {
        Self {
            status: ConnStatus::NotConnected,
            ap: ApInfo::default(),
            retry_limit,
            retries_left: retry_limit,
            scans: VecDeque::new(),
        }
    }

    pub fn status(&self) -> ConnStatus {
        self.status
    }

    pub fn ap(&self) -> &ApInfo {
        &self.ap
    }

    /// 记录新的连接目标并进入 Connecting
    ///
    /// 已连接时返回 InvalidState；连接中时替换目标，之前连接请求的扫描作废，普通扫描不受影响。
    pub fn begin_connect(&mut self, ssid: &[u8], passphrase: &[u8]) -> Result<(), CoreError> {
        if ssid.is_empty() || ssid.len() > MAX_SSID_LENGTH || passphrase.len() > MAX_PHRASE_LENGTH {
            return Err(CoreError::InvalidParam);
        }
        match self.status {
            ConnStatus::Connected => return Err(CoreError::InvalidState),
            ConnStatus::Connecting => {
                log::info!(target: "wireless::fdrv", "connect request replaces pending attempt");
            }
            ConnStatus::NotConnected => {}
        }
        for s in self.scans.iter_mut().filter(|s| **s == PendingScan::Connect) {
            *s = PendingScan::Replaced;
        }
        self.ap = ApInfo {
            ssid: ssid.to_vec(),
            passphrase: passphrase.to_vec(),
            ..ApInfo::default()
        };
        self.retries_left = self.retry_limit;
        self.status = ConnStatus::Connecting;
        Ok(())
    }

    /// 连接请求发扫描失败：直接回到 NotConnected
    pub fn abort_connect(&mut self) {
        self.status = ConnStatus::NotConnected;
    }

    /// 扫描已发出；Connecting 期间发出的都属于当前连接尝试
    pub fn on_scan_sent(&mut self) {
        let kind = if self.status == ConnStatus::Connecting {
            PendingScan::Connect
        } else {
            PendingScan::Plain
        };
        self.scans.push_back(kind);
    }

    /// 扫描响应到达
    ///
    /// 连接尝试已结束（放弃或已连接）时，其扫描响应同样作废。
    pub fn on_scan_rsp(&mut self) -> ScanVerdict {
        match self.scans.pop_front() {
            Some(PendingScan::Connect) if self.status == ConnStatus::Connecting => ScanVerdict::Connect,
            Some(PendingScan::Connect | PendingScan::Replaced) => ScanVerdict::Stale,
            Some(PendingScan::Plain) => ScanVerdict::Plain,
            None => {
                log::warn!(target: "wireless::fdrv", "scan response with no scan outstanding");
                ScanVerdict::Plain
            }
        }
    }

    /// 选中的 BSS
    pub fn set_peer(&mut self, bssid: [u8; ETH_ALEN], cap: u16, security: SecurityKind) {
        self.ap.bssid = bssid;
        self.ap.cap = cap;
        self.ap.security = security;
    }

    /// 连接尝试失败（未找到网络、命令失败、关联被拒）
    pub fn on_connect_failed(&mut self) -> RetryDecision {
        if self.status == ConnStatus::Connecting && self.retries_left > 0 {
            self.retries_left -= 1;
            log::info!(
                target: "wireless::fdrv",
                "connect attempt failed, rescan ({} retries left)",
                self.retries_left
            );
            return RetryDecision::Rescan;
        }
        self.status = ConnStatus::NotConnected;
        RetryDecision::GiveUp
    }

    /// PORT_RELEASE：返回是否由 Connecting 进入 Connected
    pub fn on_port_release(&mut self) -> bool {
        let was = self.status;
        self.status = ConnStatus::Connected;
        self.retries_left = self.retry_limit;
        was == ConnStatus::Connecting
    }

    /// DEAUTHENTICATED：回到 NotConnected，返回之前的状态
    pub fn on_deauthenticated(&mut self) -> ConnStatus {
        core::mem::replace(&mut self.status, ConnStatus::NotConnected)
    }

    /// FUNC_SHUTDOWN 后清空
    pub fn reset(&mut self) {
        *self = Self::new(self.retry_limit);
    }
}

/// 表满，返回被拒绝的 MAC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFull(pub [u8; ETH_ALEN]);

/// uAP 客户端表
#[derive(Debug, Clone)]
pub struct StaTable<const N: usize = MAX_CLIENT_NUM> {
    slots: [Option<[u8; ETH_ALEN]>; N],
}

impl<const N: usize> Default for StaTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> StaTable<N> {
    pub const fn new() -> Self {
        Self { slots: [None; N] }
    }

    /// 记录新客户端，返回槽位；已在表中时返回原槽位
    pub fn admit(&mut self, mac: &[u8; ETH_ALEN]) -> Result<usize, TableFull> {
        if let Some(i) = self.find(mac) {
            return Ok(i);
        }
        let free = self.slots.iter().position(Option::is_none).ok_or(TableFull(*mac))?;
        self.slots[free] = Some(*mac);
        Ok(free)
    }

    /// 移除客户端，返回原槽位
    pub fn evict(&mut self, mac: &[u8; ETH_ALEN]) -> Option<usize> {
        let i = self.find(mac)?;
        self.slots[i] = None;
        Some(i)
    }

    pub fn find(&self, mac: &[u8; ETH_ALEN]) -> Option<usize> {
        self.slots.iter().position(|s| s.as_ref() == Some(mac))
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, [u8; ETH_ALEN])> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|mac| (i, mac)))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.slots = [None; N];
    }
}

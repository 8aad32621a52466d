//! net_device 抽象与网络栈协作接口
//!
//! 每个 BSS 角色（STA / uAP）对应一个 [`NetDevice`]，记录 MAC、carrier 状态与统计。
//! 帧的上送、链路 up/down 及 DHCP 租约查询都通过 [`NetStack`] 交给外部网络栈。

use alloc::string::String;
use bsp::BssRole;
use ieee80211::ETH_ALEN;

/// 网卡统计（对应 struct net_device_stats）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetDeviceStats {
    pub rx_packets: u32,
    pub tx_packets: u32,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_errors: u32,
    pub tx_errors: u32,
    pub rx_dropped: u32,
    pub tx_dropped: u32,
    /// uAP 转发回空口的帧
    pub forwarded: u32,
}

/// 单个角色的接口状态
#[derive(Debug, Clone)]
pub struct NetDevice {
    pub role: BssRole,
    pub mac_addr: [u8; ETH_ALEN],
    /// netif_carrier_ok
    pub carrier_ok: bool,
    pub stats: NetDeviceStats,
}

impl NetDevice {
    pub const fn new(role: BssRole) -> Self {
        Self {
            role,
            mac_addr: [0; ETH_ALEN],
            carrier_ok: false,
            stats: NetDeviceStats {
                rx_packets: 0,
                tx_packets: 0,
                rx_bytes: 0,
                tx_bytes: 0,
                rx_errors: 0,
                tx_errors: 0,
                rx_dropped: 0,
                tx_dropped: 0,
                forwarded: 0,
            },
        }
    }

    pub fn set_mac_addr(&mut self, mac: &[u8; ETH_ALEN]) {
        self.mac_addr = *mac;
    }

    pub fn carrier_on(&mut self) {
        self.carrier_ok = true;
    }

    pub fn carrier_off(&mut self) {
        self.carrier_ok = false;
    }

    pub fn count_rx(&mut self, len: usize) {
        self.stats.rx_packets = self.stats.rx_packets.wrapping_add(1);
        self.stats.rx_bytes = self.stats.rx_bytes.wrapping_add(len as u64);
    }

    pub fn count_tx(&mut self, len: usize) {
        self.stats.tx_packets = self.stats.tx_packets.wrapping_add(1);
        self.stats.tx_bytes = self.stats.tx_bytes.wrapping_add(len as u64);
    }
}

/// DHCP 服务端记录的客户端信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub hostname: String,
    pub ip: [u8; 4],
}

/// 外部网络栈（lwIP 网卡、DHCP 客户端/服务端、NAT）
#[allow(unused_variables)]
pub trait NetStack {
    /// MAC 地址就绪后初始化网卡
    fn netif_init(&mut self, mac: &[u8; ETH_ALEN]) {}
    /// 上送一个以太网帧
    fn deliver_frame(&mut self, frame: &[u8], role: BssRole);
    /// 链路 up：STA 启动 DHCP 客户端，uAP 启动 DHCP 服务端
    fn link_up(&mut self, role: BssRole) {}
    fn link_down(&mut self, role: BssRole) {}
    /// 删除客户端租约，返回其最后已知信息；没有记录时返回 None
    fn erase_client(&mut self, mac: &[u8; ETH_ALEN]) -> Option<ClientInfo> {
        None
    }
}

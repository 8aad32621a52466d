//! Marvell 88W8801 主机协议引擎 (FDRV)
//!
//! 功能包括:
//! - TLV 编解码（Marvell 4 字节头 / IEEE 2 字节头）
//! - 主机命令编码与 Associate 暂存门控
//! - 命令响应、事件、数据帧的排空与分发
//! - 引导命令链（FUNC_INIT → MAC_CONTROL → GET_HW_SPEC → MAC_ADDR）
//! - STA 连接状态机与 uAP 客户端表
//! - 扫描结果解析与安全类型推断
//! - 配置文件解析
//!
//! 平台提供 SDIO 原语（[`bsp::SdioOps`]）、网络栈（[`NetStack`]）和回调（[`WlanCallbacks`]），
//! 在 I/O 就绪时调用 [`WlanOps::process_pending_io`]。

#![no_std]

extern crate alloc;

mod bootstrap;
mod cfgfile;
mod cmd_encoder;
mod host_cmd;
mod manager;
mod net_device;
mod rx_dispatch;
mod scan;
mod tlv;
mod txrxif;
mod wiphy;
mod wiphy_impl;

#[cfg(test)]
mod mock;

pub use bootstrap::{BootStage, BootStep, Bootstrap};
pub use cfgfile::{parse_configfile, WlanConfig};
pub use cmd_encoder::{encode, tx_gate, EncodeCtx, TxGate, MAC_CONTROL_DEFAULT};
pub use host_cmd::{
    AddbaReq, MAX_CHANNEL_NUM, MAX_PHRASE_LENGTH, MAX_SCAN_TIME, MAX_SSID_LENGTH,
};
pub use manager::{ApInfo, ConnStatus, StaTable, TableFull, MAX_CLIENT_NUM};
pub use net_device::{ClientInfo, NetDevice, NetDeviceStats, NetStack};
pub use scan::{infer_security, BssDescriptor, BssIter, ScanRsp};
pub use tlv::{Tlv, TlvBuilder, TlvHeader, TlvIter, IEEE_IE_HDR, MRVL_TLV_HDR};
pub use txrxif::{build_tx_frame, RxPd, TXPD_SIZE};
pub use wiphy::{
    ApConfig, AssocRefusal, ConnectFailure, NoCallbacks, ScanResult, SecurityKind, WlanCallbacks,
    WlanOps,
};
pub use wiphy_impl::WlanCore;

//! 驱动配置文件解析
//!
//! 每行一个 `TAG=value`，按 tag 前缀查找；缺失或格式错误的值退回默认值。
//!
//! ```text
//! WRITE_PORT_RETRIES=50000
//! FW_CHUNK_READY_TRIES=50000
//! FW_READY_TRIES=50000
//! POLL_SPIN_US=0
//! SCAN_MAX_TIME=200
//! CONNECT_RETRY_LIMIT=0
//! FW_NAME=sd8801_uapsta.bin
//! ```

use alloc::string::String;
use bsp::{FwBudgets, PollBudget, DEFAULT_FW_NAME, MAX_POLL_TRIES};

use crate::host_cmd::MAX_SCAN_TIME;

/// 解析后的驱动配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WlanConfig {
    pub write_port_retries: u32,
    pub fw_chunk_ready_tries: u32,
    pub fw_ready_tries: u32,
    /// 每次轮询失败后的忙等微秒数
    pub poll_spin_us: u32,
    pub scan_max_time: u16,
    /// 连接失败后自动重扫的次数上限，0 表示不重试
    pub connect_retry_limit: u8,
    pub fw_name: String,
}

impl Default for WlanConfig {
    fn default() -> Self {
        Self {
            write_port_retries: MAX_POLL_TRIES,
            fw_chunk_ready_tries: MAX_POLL_TRIES,
            fw_ready_tries: MAX_POLL_TRIES,
            poll_spin_us: 0,
            scan_max_time: MAX_SCAN_TIME,
            connect_retry_limit: 0,
            fw_name: String::from(DEFAULT_FW_NAME),
        }
    }
}

impl WlanConfig {
    pub fn write_port_budget(&self) -> PollBudget {
        PollBudget::new(self.write_port_retries, self.poll_spin_us)
    }

    pub fn fw_budgets(&self) -> FwBudgets {
        FwBudgets {
            chunk_ready: PollBudget::new(self.fw_chunk_ready_tries, self.poll_spin_us),
            fw_ready: PollBudget::new(self.fw_ready_tries, self.poll_spin_us),
        }
    }
}

/// 查找以 tag_name 开头的行，返回其后到行尾的值（去掉行尾 '\r'）
fn find_tag<'a>(file_data: &'a [u8], tag_name: &str) -> Option<&'a [u8]> {
    let tag = tag_name.as_bytes();
    file_data
        .split(|&b| b == b'\n')
        .find(|line| line.starts_with(tag))
        .map(|line| {
            let v = &line[tag.len()..];
            v.strip_suffix(b"\r").unwrap_or(v)
        })
}

/// 十进制无符号数，允许首尾空白
fn parse_dec(s: &[u8]) -> Option<u32> {
    let s = core::str::from_utf8(s).ok()?.trim();
    s.parse().ok()
}

/// 解析配置文本；未出现的 tag 保持默认值
pub fn parse_configfile(file_data: &[u8]) -> WlanConfig {
    let mut config = WlanConfig::default();
    macro_rules! parse_tag {
        ($tag:expr, $field:ident, $ty:ty) => {
            if let Some(v) = find_tag(file_data, $tag) {
                match parse_dec(v).and_then(|n| <$ty>::try_from(n).ok()) {
                    Some(n) => config.$field = n,
                    None => log::warn!(target: "wireless::fdrv", "bad value for {}, keep default", $tag),
                }
            }
        };
    }
    parse_tag!("WRITE_PORT_RETRIES=", write_port_retries, u32);
    parse_tag!("FW_CHUNK_READY_TRIES=", fw_chunk_ready_tries, u32);
    parse_tag!("FW_READY_TRIES=", fw_ready_tries, u32);
    parse_tag!("POLL_SPIN_US=", poll_spin_us, u32);
    parse_tag!("SCAN_MAX_TIME=", scan_max_time, u16);
    parse_tag!("CONNECT_RETRY_LIMIT=", connect_retry_limit, u8);
    if let Some(name) = find_tag(file_data, "FW_NAME=")
        .and_then(|v| core::str::from_utf8(v).ok())
        .map(str::trim)
        .filter(|n| !n.is_empty())
    {
        config.fw_name = String::from(name);
    }
    log::debug!(target: "wireless::fdrv", "config: {:?}", config);
    config
}

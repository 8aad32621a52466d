//! TLV 编解码
//!
//! 两种头格式：
//! - Marvell TLV：type u16 + length u16（小端），用于命令体中的参数块
//! - IEEE IE：id u8 + length u8，用于扫描结果中的 BSS 信息元素
//!
//! length 从不包含头本身。解析时长度越界立即以 `MalformedTlv` 结束，不会越界读取。

use alloc::vec::Vec;
use bsp::CoreError;

/// Marvell TLV 头长度
pub const MRVL_TLV_HDR: usize = 4;
/// IEEE IE 头长度
pub const IEEE_IE_HDR: usize = 2;

/// 解析出的一个 TLV，payload 借用原缓冲
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    pub tlv_type: u16,
    pub payload: &'a [u8],
}

/// TLV 头格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlvHeader {
    Mrvl,
    Ieee,
}

impl TlvHeader {
    fn len(self) -> usize {
        match self {
            TlvHeader::Mrvl => MRVL_TLV_HDR,
            TlvHeader::Ieee => IEEE_IE_HDR,
        }
    }
}

/// TLV 链迭代器。出错后产出一次 `Err` 并终止
pub struct TlvIter<'a> {
    buf: &'a [u8],
    pos: usize,
    kind: TlvHeader,
    failed: bool,
}

impl<'a> TlvIter<'a> {
    pub fn new(buf: &'a [u8], kind: TlvHeader) -> Self {
        Self {
            buf,
            pos: 0,
            kind,
            failed: false,
        }
    }

    pub fn mrvl(buf: &'a [u8]) -> Self {
        Self::new(buf, TlvHeader::Mrvl)
    }

    pub fn ieee(buf: &'a [u8]) -> Self {
        Self::new(buf, TlvHeader::Ieee)
    }
}

impl<'a> Iterator for TlvIter<'a> {
    type Item = Result<Tlv<'a>, CoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.buf.len() {
            return None;
        }
        let rest = &self.buf[self.pos..];
        let hdr = self.kind.len();
        if rest.len() < hdr {
            self.failed = true;
            return Some(Err(CoreError::MalformedTlv));
        }
        let (tlv_type, len) = match self.kind {
            TlvHeader::Mrvl => (
                u16::from_le_bytes([rest[0], rest[1]]),
                u16::from_le_bytes([rest[2], rest[3]]) as usize,
            ),
            TlvHeader::Ieee => (rest[0] as u16, rest[1] as usize),
        };
        if rest.len() - hdr < len {
            log::warn!(
                target: "wireless::fdrv",
                "tlv type 0x{:x} len {} overruns {} remaining bytes",
                tlv_type,
                len,
                rest.len() - hdr
            );
            self.failed = true;
            return Some(Err(CoreError::MalformedTlv));
        }
        self.pos += hdr + len;
        Some(Ok(Tlv {
            tlv_type,
            payload: &rest[hdr..hdr + len],
        }))
    }
}

/// Marvell TLV 参数块构造器
#[derive(Debug, Clone, Default)]
pub struct TlvBuilder {
    buf: Vec<u8>,
}

impl TlvBuilder {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// 追加一个 TLV；payload 超过 u16 时返回 PayloadTooLarge
    pub fn push(&mut self, tlv_type: u16, payload: &[u8]) -> Result<&mut Self, CoreError> {
        let len = u16::try_from(payload.len()).map_err(|_| CoreError::PayloadTooLarge)?;
        self.buf.extend_from_slice(&tlv_type.to_le_bytes());
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(payload);
        Ok(self)
    }

    /// 追加 u16 值 TLV
    pub fn push_u16(&mut self, tlv_type: u16, v: u16) -> Result<&mut Self, CoreError> {
        self.push(tlv_type, &v.to_le_bytes())
    }

    /// 追加由若干段拼接而成的 TLV
    pub fn push_parts(&mut self, tlv_type: u16, parts: &[&[u8]]) -> Result<&mut Self, CoreError> {
        let total: usize = parts.iter().map(|p| p.len()).sum();
        let len = u16::try_from(total).map_err(|_| CoreError::PayloadTooLarge)?;
        self.buf.extend_from_slice(&tlv_type.to_le_bytes());
        self.buf.extend_from_slice(&len.to_le_bytes());
        for p in parts {
            self.buf.extend_from_slice(p);
        }
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

//! PktBuf：带 headroom 的单包缓冲
//!
//! 布局：`[ headroom | data (len) | tailroom ]`。发送时先 `put` 载荷，再 `push` 出 TxPD 头；
//! 接收时把整帧读入后 `pull` 掉 RxPD 到达以太网帧起始。

use alloc::vec;
use alloc::vec::Vec;
use core::ops::Deref;

#[derive(Clone)]
pub struct PktBuf {
    storage: Vec<u8>,
    head: usize,
    len: usize,
}

impl PktBuf {
    /// 分配 `capacity` 字节，前端预留 `headroom` 字节；初始 data 长度 0
    pub fn alloc_with_headroom(capacity: usize, headroom: usize) -> Self {
        Self {
            storage: vec![0; capacity],
            head: headroom.min(capacity),
            len: 0,
        }
    }

    /// 以一份已收到的帧构造，data 覆盖整帧
    pub fn from_slice(frame: &[u8]) -> Self {
        Self {
            storage: frame.to_vec(),
            head: 0,
            len: frame.len(),
        }
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.storage[self.head..self.head + self.len]
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.storage[self.head..self.head + self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn headroom(&self) -> usize {
        self.head
    }

    #[inline]
    pub fn tailroom(&self) -> usize {
        self.storage.len() - self.head - self.len
    }

    /// 尾部追加 n 字节，返回可写切片；空间不足返回 None
    pub fn put(&mut self, n: usize) -> Option<&mut [u8]> {
        if self.tailroom() < n {
            return None;
        }
        let start = self.head + self.len;
        self.len += n;
        Some(&mut self.storage[start..start + n])
    }

    /// data 前扩出 n 字节，返回新扩出的头部；headroom 不足返回 None
    pub fn push(&mut self, n: usize) -> Option<&mut [u8]> {
        if self.head < n {
            return None;
        }
        self.head -= n;
        self.len += n;
        Some(&mut self.storage[self.head..self.head + n])
    }

    /// 从 data 头部消费 n 字节；不足 n 时返回 false 且不改变缓冲
    pub fn pull(&mut self, n: usize) -> bool {
        if n > self.len {
            return false;
        }
        self.head += n;
        self.len -= n;
        true
    }

    /// 截断到 n 字节
    pub fn trim(&mut self, n: usize) {
        self.len = self.len.min(n);
    }
}

impl Deref for PktBuf {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        self.data()
    }
}

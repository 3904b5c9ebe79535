//! 内存协作者
//!
//! 核心只通过 [`Memory`] 访问内存。[`SparseMemory`] 是测试与小程序使用的
//! 参考实现：按字节稀疏存储、小端、未写入的字节读作 0。

use std::collections::BTreeMap;

use log::trace;
use svsim_core::{AccessKind, MemoryException};

/// 内存访问接口
pub trait Memory {
    /// 读取 `width` 字节（1/2/4/8）
    ///
    /// # 参数
    ///
    /// * `addr` - 有效地址
    /// * `width` - 访问宽度（字节）
    /// * `access` - 访问类型，取指时为 [`AccessKind::Execute`]
    ///
    /// # 错误
    ///
    /// 未对齐或地址无效时返回 [`MemoryException`]
    fn ld(&mut self, addr: u64, width: u8, access: AccessKind) -> Result<u64, MemoryException>;

    /// 写入 `value` 的低 `width` 字节
    fn st(&mut self, addr: u64, width: u8, value: u64) -> Result<(), MemoryException>;
}

/// 稀疏字节内存
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseMemory {
    bytes: BTreeMap<u64, u8>,
    misaligned_ok: bool,
    /// 有效地址上界，`None` 表示不限
    size: Option<u64>,
    last_ld_addr: Option<u64>,
    last_st_addr: Option<u64>,
}

impl SparseMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_misaligned(mut self, ok: bool) -> Self {
        self.misaligned_ok = ok;
        self
    }

    /// 以小端写入初始数据
    pub fn load_words(&mut self, base: u64, words: &[u64], width: u8) {
        for (i, &w) in words.iter().enumerate() {
            let addr = base.wrapping_add(i as u64 * u64::from(width));
            self.write_bytes(addr, width, w);
        }
    }

    pub fn last_ld_addr(&self) -> Option<u64> {
        self.last_ld_addr
    }

    pub fn last_st_addr(&self) -> Option<u64> {
        self.last_st_addr
    }

    fn check(&self, addr: u64, width: u8, access: AccessKind) -> Result<(), MemoryException> {
        let w = u64::from(width);
        if !matches!(width, 1 | 2 | 4 | 8) {
            return Err(MemoryException::invalid(addr, access));
        }
        if !self.misaligned_ok && !addr.is_multiple_of(w) {
            return Err(MemoryException::unaligned(addr, access));
        }
        if let Some(size) = self.size
            && addr.checked_add(w).is_none_or(|end| end > size)
        {
            return Err(MemoryException::invalid(addr, access));
        }
        Ok(())
    }

    fn write_bytes(&mut self, addr: u64, width: u8, value: u64) {
        for i in 0..u64::from(width) {
            self.bytes
                .insert(addr.wrapping_add(i), (value >> (8 * i)) as u8);
        }
    }
}

impl Memory for SparseMemory {
    fn ld(&mut self, addr: u64, width: u8, access: AccessKind) -> Result<u64, MemoryException> {
        self.check(addr, width, access)?;
        let value = (0..u64::from(width)).fold(0u64, |acc, i| {
            let b = self.bytes.get(&addr.wrapping_add(i)).copied().unwrap_or(0);
            acc | (u64::from(b) << (8 * i))
        });
        if access != AccessKind::Execute {
            self.last_ld_addr = Some(addr);
        }
        trace!("ld {:#x}/{} -> {:#x}", addr, width, value);
        Ok(value)
    }

    fn st(&mut self, addr: u64, width: u8, value: u64) -> Result<(), MemoryException> {
        self.check(addr, width, AccessKind::Store)?;
        self.write_bytes(addr, width, value);
        self.last_st_addr = Some(addr);
        trace!("st {:#x}/{} <- {:#x}", addr, width, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svsim_core::MemFaultKind;

    #[test]
    fn test_little_endian_round_trip() {
        let mut mem = SparseMemory::new();
        mem.st(0x100, 8, 0x0102_0304_0506_0708).unwrap();
        assert_eq!(mem.ld(0x100, 1, AccessKind::Load).unwrap(), 0x08);
        assert_eq!(mem.ld(0x104, 4, AccessKind::Load).unwrap(), 0x0102_0304);
        assert_eq!(mem.ld(0x200, 8, AccessKind::Load).unwrap(), 0);
        assert_eq!(mem.last_st_addr(), Some(0x100));
    }

    #[test]
    fn test_faults() {
        let mut mem = SparseMemory::new().with_size(0x1000);
        let e = mem.ld(0x101, 4, AccessKind::Load).unwrap_err();
        assert_eq!(e.kind, MemFaultKind::Unaligned);
        assert_eq!(e.address, 0x101);

        let e = mem.st(0x1000, 8, 0).unwrap_err();
        assert_eq!(e.kind, MemFaultKind::Invalid);
        assert_eq!(e.access, AccessKind::Store);

        let mut loose = SparseMemory::new().with_misaligned(true);
        assert!(loose.st(0x3, 4, 0xdead_beef).is_ok());
        assert_eq!(loose.ld(0x3, 4, AccessKind::Load).unwrap(), 0xdead_beef);
    }
}

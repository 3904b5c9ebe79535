//! 条件寄存器
//!
//! CR 是 32 位值，字段 `i` 位于 `28 - 4*i` 处（字段 0 在最高 4 位）。
//! 每个字段内部：LT=8, GT=4, EQ=2, SO=1。

use serde::{Deserialize, Serialize};

use crate::consts::NUM_CR_FIELDS;
use crate::error::{SimError, SimResult};

pub const CR_LT: u8 = 0b1000;
pub const CR_GT: u8 = 0b0100;
pub const CR_EQ: u8 = 0b0010;
pub const CR_SO: u8 = 0b0001;

/// 字段内的位，按 MSB0 顺序编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrBit {
    Lt = 0,
    Gt = 1,
    Eq = 2,
    So = 3,
}

impl CrBit {
    pub fn from_index(index: u8) -> Self {
        match index & 3 {
            0 => CrBit::Lt,
            1 => CrBit::Gt,
            2 => CrBit::Eq,
            _ => CrBit::So,
        }
    }

    pub const fn mask(self) -> u8 {
        0b1000 >> (self as u8)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrFile {
    value: u64,
}

impl CrFile {
    pub fn new(value: u64) -> Self {
        Self {
            value: value & 0xffff_ffff,
        }
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn set_value(&mut self, value: u64) {
        self.value = value & 0xffff_ffff;
    }

    fn shift(index: usize) -> SimResult<u32> {
        if index < NUM_CR_FIELDS {
            Ok((28 - 4 * index) as u32)
        } else {
            Err(SimError::CrFieldOutOfRange(index))
        }
    }

    pub fn field(&self, index: usize) -> SimResult<u8> {
        let shift = Self::shift(index)?;
        Ok(((self.value >> shift) & 0xf) as u8)
    }

    pub fn set_field(&mut self, index: usize, value: u8) -> SimResult<()> {
        let shift = Self::shift(index)?;
        self.value = (self.value & !(0xf << shift)) | (u64::from(value & 0xf) << shift);
        Ok(())
    }

    pub fn bit(&self, index: usize, bit: CrBit) -> SimResult<bool> {
        Ok(self.field(index)? & bit.mask() != 0)
    }

    /// 全部字段，字段 0 在前
    pub fn fields(&self) -> [u8; NUM_CR_FIELDS] {
        let mut out = [0u8; NUM_CR_FIELDS];
        for (i, f) in out.iter_mut().enumerate() {
            *f = ((self.value >> (28 - 4 * i)) & 0xf) as u8;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_layout() {
        let mut cr = CrFile::default();
        cr.set_field(0, CR_EQ).unwrap();
        assert_eq!(cr.value(), 0x2000_0000);
        cr.set_field(7, CR_LT | CR_SO).unwrap();
        assert_eq!(cr.value(), 0x2000_0009);
        assert_eq!(cr.fields(), [2, 0, 0, 0, 0, 0, 0, 9]);
    }

    #[test]
    fn test_bits() {
        let cr = CrFile::new(0x0400_0000);
        assert!(cr.bit(1, CrBit::Gt).unwrap());
        assert!(!cr.bit(1, CrBit::Lt).unwrap());
        assert_eq!(CrBit::from_index(3), CrBit::So);
    }

    #[test]
    fn test_field_out_of_range() {
        let mut cr = CrFile::default();
        assert_eq!(cr.field(8), Err(SimError::CrFieldOutOfRange(8)));
        assert!(cr.set_field(12, 1).is_err());
    }
}

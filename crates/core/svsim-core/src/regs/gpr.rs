//! GPR/FPR 寄存器文件

use serde::{Deserialize, Serialize};

use super::ElWidth;
use crate::bits::mask;
use crate::consts::NUM_REGS;
use crate::error::{SimError, SimResult};

/// 寄存器类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegClass {
    Gpr,
    Fpr,
}

impl RegClass {
    pub fn prefix(self) -> &'static str {
        match self {
            RegClass::Gpr => "r",
            RegClass::Fpr => "f",
        }
    }
}

impl std::fmt::Display for RegClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegClass::Gpr => write!(f, "GPR"),
            RegClass::Fpr => write!(f, "FPR"),
        }
    }
}

/// 平坦的 64 位寄存器数组
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegFile {
    class: RegClass,
    regs: Vec<u64>,
}

impl RegFile {
    pub fn new(class: RegClass) -> Self {
        Self {
            class,
            regs: vec![0; NUM_REGS],
        }
    }

    pub fn class(&self) -> RegClass {
        self.class
    }

    fn check(&self, index: usize) -> SimResult<()> {
        if index < self.regs.len() {
            Ok(())
        } else {
            Err(SimError::RegisterOutOfRange {
                class: self.class.to_string(),
                index,
            })
        }
    }

    pub fn get(&self, index: usize) -> SimResult<u64> {
        self.check(index)?;
        Ok(self.regs[index])
    }

    pub fn set(&mut self, index: usize, value: u64) -> SimResult<()> {
        self.check(index)?;
        self.regs[index] = value;
        Ok(())
    }

    /// `RA|0` 语义：寄存器 0 读作 0
    pub fn get_or_zero(&self, index: usize) -> SimResult<u64> {
        if index == 0 { Ok(0) } else { self.get(index) }
    }

    /// 读取宽度为 `ew` 的第 `element` 个元素（零扩展）
    ///
    /// 元素 `e` 位于寄存器 `base + e / (64/ew)` 的第 `e % (64/ew)` 列。
    pub fn read_element(&self, base: usize, element: usize, ew: ElWidth) -> SimResult<u64> {
        let per = ew.per_register();
        let reg = base + element / per;
        let shift = (element % per) as u32 * ew.bits();
        Ok((self.get(reg)? >> shift) & mask(ew.bits()))
    }

    /// 写入宽度为 `ew` 的第 `element` 个元素，同一寄存器中的其他元素保持不变
    pub fn write_element(
        &mut self,
        base: usize,
        element: usize,
        ew: ElWidth,
        value: u64,
    ) -> SimResult<()> {
        let per = ew.per_register();
        let reg = base + element / per;
        let shift = (element % per) as u32 * ew.bits();
        let m = mask(ew.bits()) << shift;
        let old = self.get(reg)?;
        self.set(reg, (old & !m) | ((value << shift) & m))
    }

    pub fn values(&self) -> &[u64] {
        &self.regs
    }

    pub fn len(&self) -> usize {
        self.regs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }
}

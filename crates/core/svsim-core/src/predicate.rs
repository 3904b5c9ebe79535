//! 谓词掩码计算
//!
//! 掩码第 `i` 位为 1 表示元素 `i` 参与运算。整数谓词读取固定的 GPR
//! （r3/r10/r30，可取反或展开为一元形式），CR 谓词从 CR 字段
//! [`CR_PRED_OFFSET`] 开始逐字段取选中的位。
//!
//! 每一侧（源/目标）的被屏蔽元素要么被跳过，要么以 0 参与：
//! `pred_sz`/`pred_dz` 为 0 时是跳过策略。

use log::trace;
use serde::{Deserialize, Serialize};

use crate::consts::CR_PRED_OFFSET;
use crate::error::{SimError, SimResult};
use crate::regs::{CrBit, CrFile, RegFile};

/// 谓词来源
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredMode {
    #[default]
    Always = 0,
    Int = 1,
    Cr = 2,
    /// Rc=1 结果谓词，不屏蔽元素
    Rc1 = 3,
}

impl PredMode {
    pub fn from_field(field: u8) -> SimResult<Self> {
        match field {
            0 => Ok(PredMode::Always),
            1 => Ok(PredMode::Int),
            2 => Ok(PredMode::Cr),
            3 => Ok(PredMode::Rc1),
            other => Err(SimError::InvalidPredicate(format!("predmode {}", other))),
        }
    }
}

/// 单谓词（源和目标共用 dstpred）或双谓词
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredType {
    #[default]
    Single,
    Twin,
}

/// 整数谓词选择子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredInt {
    Always = 0,
    /// `1 << r3`
    R3Unary = 1,
    R3 = 2,
    R3Inv = 3,
    R10 = 4,
    R10Inv = 5,
    R30 = 6,
    R30Inv = 7,
}

impl PredInt {
    pub fn from_field(field: u8) -> SimResult<Self> {
        Ok(match field {
            0 => PredInt::Always,
            1 => PredInt::R3Unary,
            2 => PredInt::R3,
            3 => PredInt::R3Inv,
            4 => PredInt::R10,
            5 => PredInt::R10Inv,
            6 => PredInt::R30,
            7 => PredInt::R30Inv,
            other => {
                return Err(SimError::InvalidPredicate(format!(
                    "integer predicate selector {}",
                    other
                )));
            }
        })
    }
}

/// CR 谓词选择子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredCr {
    Lt = 0,
    Ge = 1,
    Gt = 2,
    Le = 3,
    Eq = 4,
    Ne = 5,
    So = 6,
    Ns = 7,
}

impl PredCr {
    pub fn from_field(field: u8) -> SimResult<Self> {
        Ok(match field {
            0 => PredCr::Lt,
            1 => PredCr::Ge,
            2 => PredCr::Gt,
            3 => PredCr::Le,
            4 => PredCr::Eq,
            5 => PredCr::Ne,
            6 => PredCr::So,
            7 => PredCr::Ns,
            other => {
                return Err(SimError::InvalidPredicate(format!(
                    "CR predicate selector {}",
                    other
                )));
            }
        })
    }

    /// (测试的位, 期望值)
    pub fn test(self) -> (CrBit, bool) {
        let bit = CrBit::from_index(self as u8 >> 1);
        (bit, self as u8 & 1 == 0)
    }
}

/// 整数谓词掩码
pub fn predint_mask(sel: PredInt, gpr: &RegFile) -> SimResult<u64> {
    Ok(match sel {
        PredInt::Always => u64::MAX,
        PredInt::R3Unary => 1u64 << (gpr.get(3)? & 63),
        PredInt::R3 => gpr.get(3)?,
        PredInt::R3Inv => !gpr.get(3)?,
        PredInt::R10 => gpr.get(10)?,
        PredInt::R10Inv => !gpr.get(10)?,
        PredInt::R30 => gpr.get(30)?,
        PredInt::R30Inv => !gpr.get(30)?,
    })
}

/// CR 谓词掩码：对前 `vl` 个谓词字段逐一测试
///
/// # 错误
///
/// 所需字段超出 CR 范围时返回 [`SimError::CrFieldOutOfRange`]。
pub fn predcr_mask(sel: PredCr, cr: &CrFile, vl: u8) -> SimResult<u64> {
    let (bit, expect) = sel.test();
    let mut mask = 0u64;
    for i in 0..usize::from(vl).min(64) {
        if cr.bit(CR_PRED_OFFSET + i, bit)? == expect {
            mask |= 1 << i;
        }
    }
    Ok(mask)
}

/// 被屏蔽元素的处理策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaskPolicy {
    /// 跳过，不产生元素
    #[default]
    Skip,
    /// 保留位置，结果为 0
    Zero,
}

impl MaskPolicy {
    /// `pred_sz`/`pred_dz` 为 0 时跳过
    pub fn from_zero_flag(zero: bool) -> Self {
        if zero { MaskPolicy::Zero } else { MaskPolicy::Skip }
    }
}

/// 一侧的掩码与策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateMask {
    pub mask: u64,
    pub policy: MaskPolicy,
}

impl Default for PredicateMask {
    fn default() -> Self {
        Self::all()
    }
}

impl PredicateMask {
    pub fn all() -> Self {
        Self {
            mask: u64::MAX,
            policy: MaskPolicy::Skip,
        }
    }

    /// 元素 `i` 是否活跃，64 及以上的元素视为不活跃
    pub fn is_active(&self, i: usize) -> bool {
        i < 64 && self.mask & (1u64 << i) != 0
    }

    /// 跳过策略下元素 `i` 被跳过
    pub fn skips(&self, i: usize) -> bool {
        self.policy == MaskPolicy::Skip && !self.is_active(i)
    }

    /// 置零策略下元素 `i` 以 0 参与
    pub fn zeroing(&self, i: usize) -> bool {
        self.policy == MaskPolicy::Zero && !self.is_active(i)
    }
}

/// 解码器给出的谓词字段
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateConfig {
    pub mode: PredMode,
    pub ptype: PredType,
    pub srcpred: u8,
    pub dstpred: u8,
    /// 源侧置零
    pub pred_sz: bool,
    /// 目标侧置零
    pub pred_dz: bool,
}

impl PredicateConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.srcpred > 7 || self.dstpred > 7 {
            return Err(SimError::InvalidPredicate(format!(
                "selector out of range: srcpred={} dstpred={}",
                self.srcpred, self.dstpred
            )));
        }
        Ok(())
    }

    fn mask_for(&self, sel: u8, gpr: &RegFile, cr: &CrFile, vl: u8) -> SimResult<u64> {
        match self.mode {
            PredMode::Int => predint_mask(PredInt::from_field(sel)?, gpr),
            PredMode::Cr => predcr_mask(PredCr::from_field(sel)?, cr, vl),
            PredMode::Always | PredMode::Rc1 => Ok(u64::MAX),
        }
    }

    /// 源掩码：单谓词时与目标掩码相同
    pub fn read_src_mask(&self, gpr: &RegFile, cr: &CrFile, vl: u8) -> SimResult<PredicateMask> {
        self.validate()?;
        let sel = match self.ptype {
            PredType::Twin => self.srcpred,
            PredType::Single => self.dstpred,
        };
        let mask = self.mask_for(sel, gpr, cr, vl)?;
        trace!(
            "srcmask {:?}/{:?} sel={} -> {:#x} sz={}",
            self.mode, self.ptype, sel, mask, self.pred_sz
        );
        Ok(PredicateMask {
            mask,
            policy: MaskPolicy::from_zero_flag(self.pred_sz),
        })
    }

    pub fn read_dst_mask(&self, gpr: &RegFile, cr: &CrFile, vl: u8) -> SimResult<PredicateMask> {
        self.validate()?;
        let mask = self.mask_for(self.dstpred, gpr, cr, vl)?;
        trace!(
            "dstmask {:?} sel={} -> {:#x} dz={}",
            self.mode, self.dstpred, mask, self.pred_dz
        );
        Ok(PredicateMask {
            mask,
            policy: MaskPolicy::from_zero_flag(self.pred_dz),
        })
    }
}

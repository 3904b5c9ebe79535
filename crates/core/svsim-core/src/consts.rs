//! 架构常量
//!
//! 所有位号均为 64 位寄存器中的 MSB0 编号。

use crate::bits::msb0_mask;

/// MSR 位
pub mod msrb {
    pub const SF: u32 = 0;
    pub const HV: u32 = 3;
    pub const UND: u32 = 5;
    pub const TSS: u32 = 29;
    pub const TSE: u32 = 30;
    pub const TM: u32 = 31;
    pub const VEC: u32 = 38;
    pub const VSX: u32 = 40;
    pub const S: u32 = 41;
    pub const EE: u32 = 48;
    /// 问题状态（用户态）
    pub const PR: u32 = 49;
    pub const FP: u32 = 50;
    pub const ME: u32 = 51;
    pub const FE0: u32 = 52;
    pub const TES: u32 = 53;
    pub const TEE: u32 = 54;
    pub const FE1: u32 = 55;
    pub const IR: u32 = 58;
    pub const DR: u32 = 59;
    pub const PMM: u32 = 60;
    pub const RI: u32 = 62;
    pub const LE: u32 = 63;
}

/// 程序中断原因位，写入 SRR1
pub mod pib {
    pub const INVALID: u32 = 33;
    pub const PERMERR: u32 = 35;
    pub const TM_BAD_THING: u32 = 42;
    pub const FP: u32 = 43;
    /// 非法指令
    pub const ILLEG: u32 = 44;
    /// 特权指令
    pub const PRIV: u32 = 45;
    /// 陷阱指令
    pub const TRAP: u32 = 46;
    pub const ADR: u32 = 47;
}

/// XER 位
pub mod xer_bits {
    pub const SO: u32 = 32;
    pub const OV: u32 = 33;
    pub const CA: u32 = 34;
    pub const OV32: u32 = 44;
    pub const CA32: u32 = 45;
}

/// 中断向量
pub mod vector {
    pub const DATA_STORAGE: u64 = 0x300;
    pub const INSTRUCTION_STORAGE: u64 = 0x400;
    pub const ALIGNMENT: u64 = 0x600;
    pub const PROGRAM: u64 = 0x700;
}

/// KAIVB 重定位时被屏蔽的低位
pub const KAIVB_LOW_BITS: u64 = 0x1fff;

/// 陷阱入口清除的 MSR 位
pub const TRAP_MSR_CLEAR: u64 = msb0_mask(msrb::IR)
    | msb0_mask(msrb::DR)
    | msb0_mask(msrb::FE0)
    | msb0_mask(msrb::FE1)
    | msb0_mask(msrb::EE)
    | msb0_mask(msrb::RI)
    | msb0_mask(msrb::TM)
    | msb0_mask(msrb::VEC)
    | msb0_mask(msrb::VSX)
    | msb0_mask(msrb::PR)
    | msb0_mask(msrb::FP)
    | msb0_mask(msrb::PMM)
    | msb0_mask(msrb::TES)
    | msb0_mask(msrb::TEE)
    | msb0_mask(msrb::UND);

/// 陷阱入口置位的 MSR 位：64 位模式、小端
pub const TRAP_MSR_SET: u64 = msb0_mask(msrb::SF) | msb0_mask(msrb::LE);

/// 复位后的 MSR：特权态、64 位、小端
pub const DEFAULT_MSR: u64 = TRAP_MSR_SET;

/// GPR/FPR 数量（SVP64 扩展到 128 个，标量指令只看到前 32 个）
pub const NUM_REGS: usize = 128;

/// CR 字段数量
pub const NUM_CR_FIELDS: usize = 8;

/// CR 谓词从这个字段开始读取
pub const CR_PRED_OFFSET: usize = 4;

/// VL/MAXVL 的最大值（7 位字段）
pub const MAX_VL: u8 = 127;

/// 标量指令的 PC 步长
pub const SCALAR_INSN_BYTES: u64 = 4;

/// 带 SVP64 前缀的指令的 PC 步长
pub const SVP64_INSN_BYTES: u64 = 8;

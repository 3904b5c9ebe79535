//! 解码器协作者接口
//!
//! 外部解码器把原始操作码变成 [`DecodedFields`]：规范助记符、内部操作类别、
//! 每个操作数角色的寄存器号与向量标志、Rc/OE/进位使能以及 SVP64 RM 字段。
//! 调度流水线只读取这个结构，不关心解码器如何得到它。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use svsim_core::{ElWidth, MemoryException, PredicateConfig, RegClass, SvState};

/// 内部操作类别，决定特权检查与进位规则
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MicroOp {
    Add,
    Cmp,
    Logical,
    Load,
    Store,
    Branch,
    Trap,
    Mfmsr,
    Mtmsr,
    Mtmsrd,
    Mfspr,
    Mtspr,
    Rfid,
    Attn,
    Nop,
    /// setvl/svstep/svremap
    Sv,
    #[default]
    Other,
}

impl MicroOp {
    /// 问题状态下执行会触发 0x700 陷阱
    ///
    /// `mfspr`/`mtspr` 只有在 SPR 编号高半部分的最高位置位时才是特权指令。
    pub fn is_privileged(self, spr_msb: bool) -> bool {
        match self {
            MicroOp::Attn | MicroOp::Mfmsr | MicroOp::Mtmsr | MicroOp::Mtmsrd | MicroOp::Rfid => {
                true
            }
            MicroOp::Mfspr | MicroOp::Mtspr => spr_msb,
            _ => false,
        }
    }
}

/// 五个操作数角色，对应 SVSTATE 的 mi0..mi2、mo0、mo1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OperandSlot {
    In1,
    In2,
    In3,
    Out,
    Out2,
}

impl OperandSlot {
    pub const ALL: [OperandSlot; 5] = [
        OperandSlot::In1,
        OperandSlot::In2,
        OperandSlot::In3,
        OperandSlot::Out,
        OperandSlot::Out2,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// 输出角色按 dststep 步进，输入角色按 srcstep
    pub fn is_output(self) -> bool {
        matches!(self, OperandSlot::Out | OperandSlot::Out2)
    }
}

/// 已解析的寄存器操作数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegOperand {
    pub slot: OperandSlot,
    pub class: RegClass,
    /// 基寄存器号（向量操作数为第 0 个元素所在的寄存器）
    pub reg: usize,
    pub is_vec: bool,
}

impl RegOperand {
    pub fn gpr(slot: OperandSlot, reg: usize) -> Self {
        Self {
            slot,
            class: RegClass::Gpr,
            reg,
            is_vec: false,
        }
    }

    pub fn fpr(slot: OperandSlot, reg: usize) -> Self {
        Self {
            class: RegClass::Fpr,
            ..Self::gpr(slot, reg)
        }
    }

    pub fn vector(mut self) -> Self {
        self.is_vec = true;
        self
    }
}

/// Rc=1 结果写入的 CR 字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrSel {
    Cr0,
    /// 浮点指令的 CR1
    Cr1,
    /// 比较指令的 BF 字段
    Bf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrOperand {
    pub sel: CrSel,
    pub field: usize,
    pub is_vec: bool,
}

impl Default for CrOperand {
    fn default() -> Self {
        Self {
            sel: CrSel::Cr0,
            field: 0,
            is_vec: false,
        }
    }
}

/// RM 的主模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RmMode {
    #[default]
    Normal,
    MapReduce,
    FailFirst,
    Saturate,
    PredResult,
}

/// 按指令类别区分的 SVP64 模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SvMode {
    #[default]
    Normal,
    LdStImm,
    LdStIdx,
    CrOp,
    Branch,
}

impl SvMode {
    pub fn is_ldst(self) -> bool {
        matches!(self, SvMode::LdStImm | SvMode::LdStIdx)
    }
}

/// 立即数形式 LD/ST 的元素偏移方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LdStMode {
    #[default]
    Normal,
    /// `D + offset * width`
    UnitStride,
    /// `D * offset`
    ElStride,
}

/// SVP64 前缀中解出的 RM 字段
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RmFields {
    /// SUBVL-1，取值 0..3
    pub subvl: u8,
    pub pred: PredicateConfig,
    pub mode: RmMode,
    pub sv_mode: SvMode,
    /// fail-first 测试取反
    pub ff_inv: bool,
    /// fail-first 测试的 CR 位（0=LT .. 3=SO）
    pub cr_sel: u8,
    /// 截断时包含失败的元素
    pub vli: bool,
    pub reverse_gear: bool,
    pub ldstmode: LdStMode,
    pub ew_src: ElWidth,
    pub ew_dst: ElWidth,
    /// sv.bc：所有元素都成立才跳转（否则任一成立即跳转）
    pub branch_all: bool,
}

impl RmFields {
    pub fn is_ffirst(&self) -> bool {
        self.mode == RmMode::FailFirst
    }
}

/// 指令形式，决定 LD/ST 立即数替换读取 D 还是 DS
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsnForm {
    D,
    DS,
    X,
    XO,
    XFX,
    B,
    Svl,
    Svrm,
    #[default]
    Other,
}

/// 一条已解码指令
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedFields {
    /// 操作码对应的规范助记符（Rc=1 带 `.`，OE=1 带 `o`）
    pub asmop: String,
    pub op: MicroOp,
    /// 指令形式（决定 D/DS 偏移的解释）
    pub form: InsnForm,
    pub is_svp64: bool,
    /// SPR 编号高半部分的最高位
    pub spr_msb: bool,
    /// 操作数角色名（RA、RB、RT、FRS……）到寄存器的映射
    pub operands: BTreeMap<String, RegOperand>,
    pub cr_out: Option<CrOperand>,
    /// 分支的 BI、CR 操作的源字段
    pub cr_in: Option<CrOperand>,
    /// 原始指令字段（SI、D、DS、SVi、BO、BD……）
    pub fields: BTreeMap<String, u64>,
    pub rc: bool,
    pub oe: bool,
    pub output_carry: bool,
    /// 加法器对第一个操作数取反（subf 系列）
    pub invert_in: bool,
    pub imm: Option<u64>,
    /// LD/ST 访问宽度（字节）
    pub data_len: u8,
    pub rm: RmFields,
}

impl DecodedFields {
    pub fn new(asmop: impl Into<String>, op: MicroOp) -> Self {
        Self {
            asmop: asmop.into(),
            op,
            ..Default::default()
        }
    }

    pub fn svp64(mut self, rm: RmFields) -> Self {
        self.is_svp64 = true;
        self.rm = rm;
        self
    }

    pub fn with_operand(mut self, name: &str, operand: RegOperand) -> Self {
        self.operands.insert(name.to_string(), operand);
        self
    }

    pub fn with_field(mut self, name: &str, value: u64) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn with_rc(mut self, rc: bool) -> Self {
        self.rc = rc;
        self
    }

    pub fn with_oe(mut self, oe: bool) -> Self {
        self.oe = oe;
        self
    }

    pub fn with_carry(mut self, output_carry: bool) -> Self {
        self.output_carry = output_carry;
        self
    }

    pub fn with_invert_in(mut self, invert: bool) -> Self {
        self.invert_in = invert;
        self
    }

    pub fn with_imm(mut self, imm: u64) -> Self {
        self.imm = Some(imm);
        self
    }

    pub fn with_cr_out(mut self, cr: CrOperand) -> Self {
        self.cr_out = Some(cr);
        self
    }

    pub fn with_cr_in(mut self, cr: CrOperand) -> Self {
        self.cr_in = Some(cr);
        self
    }

    pub fn with_data_len(mut self, len: u8) -> Self {
        self.data_len = len;
        self
    }

    pub fn with_spr_msb(mut self, msb: bool) -> Self {
        self.spr_msb = msb;
        self
    }

    pub fn operand(&self, name: &str) -> Option<&RegOperand> {
        self.operands.get(name)
    }

    pub fn field(&self, name: &str) -> Option<u64> {
        self.fields.get(name).copied()
    }

    /// 所有输入角色都是标量
    pub fn no_in_vec(&self) -> bool {
        !self
            .operands
            .values()
            .any(|o| !o.slot.is_output() && o.is_vec)
            && !self.cr_in.is_some_and(|c| c.is_vec)
    }

    /// 所有输出角色都是标量
    pub fn no_out_vec(&self) -> bool {
        !self
            .operands
            .values()
            .any(|o| o.slot.is_output() && o.is_vec)
            && !self.cr_out.is_some_and(|c| c.is_vec)
    }
}

/// 暴露给解码器的状态视图
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderView {
    pub svstate: SvState,
    /// 每个操作数角色一位，REMAP 正在生效
    pub remap_active: u8,
    pub msr: u64,
}

/// 一次取指解码的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// 请求执行的助记符
    pub name: String,
    pub fields: DecodedFields,
}

/// 解码器协作者
///
/// 取指失败以 [`MemoryException`]（访问类型为 Execute）返回。
pub trait Decoder {
    fn decode(&mut self, pc: u64, view: &DecoderView) -> Result<Decoded, MemoryException>;
}

//! 语义函数的执行上下文
//!
//! 语义函数不直接接触调度器。它们通过 [`ExecutionContext`] 读取指令字段、
//! 访问内存、进入陷阱，或者请求一次显式的 SVSTATE 步进。

use log::debug;
use svsim_core::bits::exts;
use svsim_core::consts::xer_bits;
use svsim_core::{AccessKind, SimResult, SprId};

use crate::decoded::{DecodedFields, InsnForm};
use crate::memory::Memory;
use crate::state::CpuState;
use crate::steploop::StepState;
use crate::trap;

/// `svstep` 请求的步进
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRequest {
    /// 1 = 普通步进，2 = 只检查不前进
    pub allow: u8,
    pub mode: u8,
}

pub struct ExecutionContext<'a> {
    pub state: &'a mut CpuState,
    mem: &'a mut dyn Memory,
    insn: &'a DecodedFields,
    pub cia: u64,
    /// 语义函数可以改写（分支）
    pub nia: u64,
    pub xlen: u32,
    pub is_svp64: bool,
    /// 语义函数内进入陷阱后的 NIA，优先于 `nia`
    pub trap_nia: Option<u64>,
    pub trap_vector: Option<u64>,
    /// sv.bc：本元素之后结束元素循环
    pub end_loop: bool,
    pub steps: StepState,
    /// Rc/比较结果写入的 CR 字段（已加上元素偏移）
    pub cr_out_field: usize,
    /// 分支 BI 等读取的 CR 字段（已加上元素偏移）
    pub cr_in_field: Option<usize>,
    remap_idxs: [u32; 4],
    displacement: Option<i64>,
    next_step: Option<StepRequest>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        state: &'a mut CpuState,
        mem: &'a mut dyn Memory,
        insn: &'a DecodedFields,
        nia: u64,
        xlen: u32,
    ) -> Self {
        let steps = StepState::from_svstate(&state.svstate);
        Self {
            cia: state.pc.cia,
            nia,
            xlen,
            is_svp64: insn.is_svp64,
            trap_nia: None,
            trap_vector: None,
            end_loop: false,
            steps,
            cr_out_field: insn.cr_out.map_or(0, |c| c.field),
            cr_in_field: insn.cr_in.map(|c| c.field),
            remap_idxs: [0, 1, 2, 3],
            displacement: None,
            next_step: None,
            state,
            mem,
            insn,
        }
    }

    pub fn with_remap_idxs(mut self, idxs: [u32; 4]) -> Self {
        self.remap_idxs = idxs;
        self
    }

    /// 用元素步长替换 D/DS 立即数（字节偏移）
    pub fn with_displacement(mut self, disp: Option<i64>) -> Self {
        self.displacement = disp;
        self
    }

    pub fn insn(&self) -> &DecodedFields {
        self.insn
    }

    /// 指令字段，缺省为 0
    pub fn field(&self, name: &str) -> u64 {
        self.insn.field(name).unwrap_or(0)
    }

    /// 操作数角色的寄存器号（`_RA`、`_RT`……），没有该角色时为 0
    pub fn regnum(&self, name: &str) -> usize {
        self.insn.operand(name).map_or(0, |o| o.reg)
    }

    /// D 形式或 DS 形式的字节偏移
    pub fn displacement(&self) -> i64 {
        if let Some(d) = self.displacement {
            return d;
        }
        raw_displacement(self.insn)
    }

    pub fn xer_bit(&self, bit: u32) -> bool {
        self.state.spr.xer_bit(bit)
    }

    pub fn so(&self) -> bool {
        self.xer_bit(xer_bits::SO)
    }

    pub fn read_spr(&self, id: SprId) -> u64 {
        self.state.read_spr(id)
    }

    pub fn write_spr(&mut self, id: SprId, value: u64) {
        self.state.write_spr(id, value);
    }

    /// 读取内存，故障以 [`svsim_core::SimError::Memory`] 返回，由调度边界转成陷阱
    pub fn ld(&mut self, addr: u64, width: u8) -> SimResult<u64> {
        Ok(self.mem.ld(addr, width, AccessKind::Load)?)
    }

    pub fn st(&mut self, addr: u64, width: u8, value: u64) -> SimResult<()> {
        Ok(self.mem.st(addr, width, value)?)
    }

    /// 进入陷阱，本条指令结束后 PC 转到陷阱向量
    pub fn trap(&mut self, vector: u64, cause: Option<u32>) {
        let nia = trap::enter(self.state, vector, cause, self.is_svp64);
        self.trap_nia = Some(nia);
        self.trap_vector = Some(vector);
    }

    /// 请求显式步进，返回 `mode` 选择的当前值
    ///
    /// mode 1-4 为对应 SVSHAPE 槽的 REMAP 索引，5-8 依次为 srcstep、dststep、
    /// ssubstep、dsubstep。真正的前进在指令写回之后进行。
    pub fn svstate_next(&mut self, mode: u8, submode: u8) -> u64 {
        let value = match mode {
            1..=4 => u64::from(self.remap_idxs[usize::from(mode - 1)]),
            5 => u64::from(self.steps.srcstep),
            6 => u64::from(self.steps.dststep),
            7 => u64::from(self.steps.ssubstep),
            8 => u64::from(self.steps.dsubstep),
            _ => 0,
        };
        let mode = if (5..=8).contains(&mode) { 0 } else { mode };
        self.next_step = Some(StepRequest {
            allow: submode + 1,
            mode,
        });
        debug!(
            "SVSTATE_NEXT mode={} submode={} -> {}",
            mode, submode, value
        );
        value
    }

    pub fn next_step(&self) -> Option<StepRequest> {
        self.next_step
    }
}

/// 未经元素步长替换的 D/DS 字节偏移
pub fn raw_displacement(insn: &DecodedFields) -> i64 {
    match insn.form {
        InsnForm::DS => exts(insn.field("DS").unwrap_or(0) & 0x3fff, 14) << 2,
        _ => exts(insn.field("D").unwrap_or(0) & 0xffff, 16),
    }
}

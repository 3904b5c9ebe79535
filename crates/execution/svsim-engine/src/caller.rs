//! 指令调度流水线
//!
//! [`IsaCaller::call`] 每次执行一条指令的一个元素：
//!
//! 1. 停机、特权、非法指令检查
//! 2. 向量前导：谓词掩码、跳过被屏蔽元素、REMAP 索引
//! 3. 按操作数角色收集输入，调用语义函数
//! 4. 进位、溢出、Rc=1 的 CR 更新，fail-first 检查
//! 5. 写回
//! 6. 前进元素步进并决定是否提交 NIA
//!
//! 客户程序可见的故障（非法、特权、内存）都变成陷阱状态，`Err` 只用于
//! 说明解码器或指令元数据有缺陷的致命错误。

use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use svsim_core::bits::{mask, msb0_bit};
use svsim_core::consts::{msrb, pib, vector, xer_bits};
use svsim_core::regs::CR_SO;
use svsim_core::remap::LOOPEND_ALL;
use svsim_core::{
    AccessKind, Config, ConfigError, CrBit, ElWidth, MemFaultKind, MemoryException, PredType,
    RegClass, SimConfig, SimError, SimResult, SprId, SvState,
};

use crate::arith;
use crate::context::{ExecutionContext, raw_displacement};
use crate::decoded::{
    CrSel, Decoder, DecodedFields, DecoderView, LdStMode, MicroOp, OperandSlot, SvMode,
};
use crate::insndb::{InstructionInfo, InstructionSet, Operands, Outputs};
use crate::memory::Memory;
use crate::state::CpuState;
use crate::steploop::StepLoop;
use crate::trap;

/// 公开汇编器不认识的助记符，去掉 `.` 后按名执行
const UNLISTED_MNEMONICS: &[&str] = &[
    "setvl", "svstep", "svremap", "svindex", "svshape", "svshape2", "maddedu", "divmod2du",
    "pcdec", "ternlogi", "dsld", "dsrd",
];

/// 设置 REMAP 的指令，紧随其后的指令临时启用 REMAP
const SHAPE_SETUP_OPS: &[&str] = &["svremap", "svindex", "svshape2"];

/// FPSCR.FEX（MSB0）
const FPSCR_FEX: u32 = 33;

/// 一次 `call` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOutcome {
    /// 已停机，什么也没做
    Halted,
    /// 进入了陷阱，CIA 已经指向陷阱向量
    Trapped { vector: u64 },
    /// NIA 已提交
    Retired,
    /// 元素循环未结束，CIA 不变
    Looping,
}

/// 执行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStats {
    pub calls: u64,
    /// 提交了 NIA 的调用
    pub retired: u64,
    /// 执行了语义函数的元素
    pub elements: u64,
    pub traps: u64,
}

/// 单次调用的局部状态
#[derive(Debug, Clone)]
struct Frame {
    name: String,
    cia: u64,
    is_svp64: bool,
    nia: u64,
    xlen: u32,
    ew_src: ElWidth,
    ew_dst: ElWidth,
    /// 每个操作数角色一位
    remap_active: u8,
    role_steps: [u32; 5],
    end_loop: bool,
    allow_next_step_inc: u8,
    next_mode: u8,
    committed: bool,
}

impl Frame {
    fn new(name: String, cia: u64, insn: &DecodedFields, xlen: u32) -> Self {
        Self {
            name,
            cia,
            is_svp64: insn.is_svp64,
            nia: cia,
            xlen,
            ew_src: insn.rm.ew_src,
            ew_dst: insn.rm.ew_dst,
            remap_active: 0,
            role_steps: [0; 5],
            end_loop: false,
            allow_next_step_inc: 0,
            next_mode: 0,
            committed: false,
        }
    }

    fn is_branch(&self) -> bool {
        self.name.starts_with("sv.bc")
    }
}

fn unknown_operand(insn: &DecodedFields, name: &str) -> SimError {
    SimError::UnknownOperand {
        insn: insn.asmop.clone(),
        name: name.to_string(),
    }
}

/// 指令调度器
///
/// # 示例
///
/// ```rust,ignore
/// let mut cpu = IsaCaller::new(SimConfig::defaults(), ReferenceIsa::new(), SparseMemory::new())?;
/// let insn = DecodedFields::new("add", MicroOp::Add)
///     .with_operand("RA", RegOperand::gpr(OperandSlot::In1, 1))
///     .with_operand("RB", RegOperand::gpr(OperandSlot::In2, 2))
///     .with_operand("RT", RegOperand::gpr(OperandSlot::Out, 3));
/// cpu.call("add", &insn)?;
/// ```
pub struct IsaCaller<I, M> {
    config: SimConfig,
    isa: I,
    mem: M,
    state: CpuState,
    steps: StepLoop,
    remap_active: u8,
    stats: CallStats,
}

impl<I: InstructionSet, M: Memory> IsaCaller<I, M> {
    /// 创建调度器
    ///
    /// # 错误
    ///
    /// 配置无效时返回 [`ConfigError`]
    pub fn new(config: SimConfig, isa: I, mem: M) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = CpuState::new(&config);
        debug!(
            "IsaCaller: pc={:#x} msr={:#x} svstate={:?}",
            state.pc.cia, state.msr, state.svstate
        );
        Ok(Self {
            config,
            isa,
            mem,
            state,
            steps: StepLoop::new(),
            remap_active: 0,
            stats: CallStats::default(),
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn state(&self) -> &CpuState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut CpuState {
        &mut self.state
    }

    pub fn memory(&self) -> &M {
        &self.mem
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.mem
    }

    pub fn steps(&self) -> &StepLoop {
        &self.steps
    }

    pub fn stats(&self) -> CallStats {
        self.stats
    }

    pub fn decoder_view(&self) -> DecoderView {
        DecoderView {
            svstate: self.state.svstate,
            remap_active: self.remap_active,
            msr: self.state.msr,
        }
    }

    /// 回到配置给出的初始状态，同时解除停机
    pub fn reset(&mut self) {
        self.state = CpuState::new(&self.config);
        self.steps = StepLoop::new();
        self.remap_active = 0;
        self.stats = CallStats::default();
        info!("reset: pc={:#x}", self.state.pc.cia);
    }

    /// 进入陷阱并立即提交 NIA
    pub fn call_trap(&mut self, vector: u64, cause: Option<u32>, is_svp64: bool) -> CallOutcome {
        let nia = trap::enter(&mut self.state, vector, cause, is_svp64);
        self.state.pc.update(nia, is_svp64);
        self.stats.traps += 1;
        CallOutcome::Trapped { vector }
    }

    fn memory_trap(&mut self, e: MemoryException, is_svp64: bool) -> CallOutcome {
        debug!("memory exception: {}", e);
        self.state.spr.set(SprId::Dar, e.address);
        let vector = match (e.kind, e.access) {
            (MemFaultKind::Unaligned, _) => vector::ALIGNMENT,
            (MemFaultKind::Invalid, AccessKind::Execute) => vector::INSTRUCTION_STORAGE,
            (MemFaultKind::Invalid, _) => vector::DATA_STORAGE,
        };
        self.call_trap(vector, Some(pib::PRIV), is_svp64)
    }

    /// 取指、解码并执行 CIA 处的指令
    ///
    /// 取指故障转成陷阱（访问类型为 Execute）。
    pub fn execute_one<D: Decoder + ?Sized>(&mut self, decoder: &mut D) -> SimResult<CallOutcome> {
        if self.state.halted {
            return Ok(CallOutcome::Halted);
        }
        let view = self.decoder_view();
        match decoder.decode(self.state.pc.cia, &view) {
            Ok(decoded) => self.call(&decoded.name, &decoded.fields),
            Err(e) => Ok(self.memory_trap(e, false)),
        }
    }

    /// 连续执行直到停机或达到 `max_calls` 次调用，返回实际调用次数
    pub fn run<D: Decoder + ?Sized>(&mut self, decoder: &mut D, max_calls: u64) -> SimResult<u64> {
        let mut n = 0;
        while n < max_calls && !self.state.halted {
            self.execute_one(decoder)?;
            n += 1;
        }
        Ok(n)
    }

    /// 执行一条已解码指令的一个元素
    ///
    /// # 参数
    ///
    /// * `name` - 请求执行的助记符
    /// * `insn` - 解码器给出的字段
    ///
    /// # 错误
    ///
    /// 只返回致命错误；内存故障在这里被转换成陷阱
    pub fn call(&mut self, name: &str, insn: &DecodedFields) -> SimResult<CallOutcome> {
        self.stats.calls += 1;
        match self.dispatch(name, insn) {
            Err(SimError::Memory(e)) => Ok(self.memory_trap(e, insn.is_svp64)),
            other => other,
        }
    }

    fn dispatch(&mut self, name: &str, insn: &DecodedFields) -> SimResult<CallOutcome> {
        if self.state.halted {
            debug!("halted, ignoring {}", name);
            return Ok(CallOutcome::Halted);
        }
        let is_svp64 = insn.is_svp64;
        let asmop = insn.asmop.as_str();
        let cia = self.state.pc.cia;
        debug!(
            "call {} ({}) at {:#x} svp64={} svstate={:?}",
            name, asmop, cia, is_svp64, self.state.svstate
        );

        if insn.op.is_privileged(insn.spr_msb)
            && self.state.problem_state()
            && !self.config.allow_privileged
        {
            debug!("privileged {} in problem state", name);
            return Ok(self.call_trap(vector::PROGRAM, Some(pib::PRIV), is_svp64));
        }

        if name == "attn" {
            info!("attn at {:#x}, halting", cia);
            self.state.halted = true;
            return Ok(CallOutcome::Halted);
        }

        let mut ins_name = name.trim().to_string();
        let mut illegal = ins_name != asmop && !matches!(ins_name.as_str(), "mtcrf" | "mtocrf");
        let dotstrp = asmop.strip_suffix('.').unwrap_or(asmop);
        if UNLISTED_MNEMONICS.contains(&dotstrp) {
            illegal = false;
            ins_name = dotstrp.to_string();
        }
        if asmop.starts_with("dcbt") {
            illegal = false;
            ins_name = "nop".to_string();
        }
        if illegal {
            warn!(
                "illegal instruction at {:#x}: requested {} decoded {}",
                cia, name, asmop
            );
            return Ok(self.call_trap(vector::PROGRAM, Some(pib::ILLEG), is_svp64));
        }
        if is_svp64 && asmop.starts_with("bc") {
            ins_name = format!("sv.{}", ins_name);
        }

        let xlen = if is_svp64 {
            insn.rm.ew_src.bits().max(insn.rm.ew_dst.bits())
        } else {
            self.config.xlen
        };
        let mut frame = Frame::new(ins_name, cia, insn, xlen);
        self.update_nia(&mut frame);

        if frame.name == "nop" {
            self.update_pc_next(&mut frame);
            return Ok(self.retire(&frame, insn));
        }

        let info = self.lookup(asmop, &frame.name)?;

        self.steps.reset_remaps();
        if is_svp64 || frame.name == "svstep" {
            self.pre_inc(insn)?;
        }
        if is_svp64 && self.steps.update_new_steps(&mut self.state.svstate) {
            debug!("{}: no active elements left", frame.name);
            self.steps.reset(&mut self.state.svstate);
            self.update_nia(&mut frame);
            self.update_pc_next(&mut frame);
            return Ok(self.retire(&frame, insn));
        }

        if is_svp64 && self.state.svstate.vl == 0 {
            debug!("{}: VL=0, skipping", frame.name);
            self.update_pc_next(&mut frame);
            return Ok(self.retire(&frame, insn));
        }

        let sv = self.state.svstate;
        let remap_requested = sv.persist || self.state.last_op_svshape;
        if remap_requested {
            self.compute_remap_indices()?;
        }
        if is_svp64 && remap_requested && sv.sv_me != 0 {
            self.remap_set_steps(&mut frame);
        }
        self.remap_active = frame.remap_active;

        let is_ldst = insn.rm.sv_mode.is_ldst() && is_svp64;
        let mut operands = Operands::new();
        let mut reg_inputs = Vec::new();
        for name in info.input_names() {
            let value = self.read_input(name, &info, insn, &frame, is_ldst)?;
            if !info.is_special(name) && insn.operand(name).is_some() {
                reg_inputs.push(value);
            }
            operands.push(name, value);
        }
        trace!("{} inputs {:?}", frame.name, operands);

        let displacement = self.replaced_displacement(insn, &frame);
        let cr_out_field = self.cr_out_field(insn, &frame);
        let cr_in_field = insn
            .cr_in
            .map(|c| c.field + self.element_of(insn, &frame, OperandSlot::In1, c.is_vec).unwrap_or(0));
        if frame.is_branch() {
            let last = sv.vl.wrapping_sub(1);
            frame.end_loop = self.state.svstate.srcstep == last || self.state.svstate.dststep == last;
        }
        let inp_ca_ov = (
            self.state.spr.xer_bit(xer_bits::CA),
            self.state.spr.xer_bit(xer_bits::OV),
        );

        let mut ctx = ExecutionContext::new(
            &mut self.state,
            &mut self.mem,
            insn,
            frame.nia,
            frame.xlen,
        )
        .with_remap_idxs(self.steps.remap_idxs())
        .with_displacement(displacement);
        ctx.cr_out_field = cr_out_field;
        ctx.cr_in_field = cr_in_field;
        ctx.end_loop = frame.end_loop;

        let mut outputs = (info.func)(&mut ctx, &operands)?;

        frame.nia = ctx.trap_nia.unwrap_or(ctx.nia);
        frame.end_loop = ctx.end_loop;
        if let Some(req) = ctx.next_step() {
            frame.allow_next_step_inc = req.allow;
            frame.next_mode = req.mode;
        }
        let trapped = ctx.trap_vector;
        self.stats.elements += 1;
        trace!("{} outputs {:?}", frame.name, outputs);

        if let Some(vector) = trapped {
            self.update_pc_next(&mut frame);
            self.stats.traps += 1;
            return Ok(CallOutcome::Trapped { vector });
        }

        let carry_en = insn.output_carry;
        if carry_en {
            self.handle_carry(insn, &frame, &reg_inputs, &mut outputs, inp_ca_ov)?;
        }
        if !is_svp64 && insn.oe {
            self.handle_overflow(insn, &frame, &reg_inputs, &outputs, inp_ca_ov)?;
        }

        let rc_en = insn.rc && (!is_svp64 || !self.steps.pred_dst_zero);
        if rc_en && frame.name != "svstep" {
            self.do_rc_ov(insn, &frame, &outputs, cr_out_field)?;
        }

        let mut ffirst = (false, false);
        if is_svp64 {
            let chk = rc_en || insn.rm.sv_mode == SvMode::CrOp;
            if let Some(cr) = outputs.get("CR")
                && info.is_special("CR")
            {
                self.state.cr.set_value(cr);
            }
            ffirst = self.check_ffirst(insn, chk, cr_out_field)?;
        }
        let (ffirst_hit, vli) = ffirst;

        if !ffirst_hit || vli {
            self.do_outregs(insn, &info, &frame, &outputs, carry_en)?;
        }

        if msb0_bit(self.state.fpscr, FPSCR_FEX)
            && (msb0_bit(self.state.msr, msrb::FE0) || msb0_bit(self.state.msr, msrb::FE1))
        {
            debug!("{}: enabled floating-point exception", frame.name);
            return Ok(self.call_trap(vector::PROGRAM, Some(pib::FP), is_svp64));
        }

        let nia_update = if ffirst_hit {
            self.steps.reset(&mut self.state.svstate);
            true
        } else {
            self.check_step_increment(insn, &mut frame, rc_en)?
        };
        if nia_update {
            self.update_pc_next(&mut frame);
        }
        Ok(self.retire(&frame, insn))
    }

    fn lookup(&self, asmop: &str, ins_name: &str) -> SimResult<InstructionInfo> {
        let key = if asmop.ends_with('.') && self.isa.contains(asmop) {
            asmop
        } else {
            ins_name
        };
        self.isa
            .lookup(key)
            .copied()
            .ok_or_else(|| SimError::UnknownInstruction(key.to_string()))
    }

    fn retire(&mut self, frame: &Frame, insn: &DecodedFields) -> CallOutcome {
        if !frame.committed {
            return CallOutcome::Looping;
        }
        self.stats.retired += 1;
        if self.config.trace_instructions {
            info!(
                "{:#010x}: {} -> {:#010x}",
                frame.cia, insn.asmop, self.state.pc.cia
            );
        }
        CallOutcome::Retired
    }

    fn update_nia(&mut self, frame: &mut Frame) {
        self.state.pc.update_nia(frame.is_svp64);
        frame.nia = self.state.pc.nia;
    }

    fn update_pc_next(&mut self, frame: &mut Frame) {
        self.state.pc.update(frame.nia, frame.is_svp64);
        frame.committed = true;
    }

    fn pre_inc(&mut self, insn: &DecodedFields) -> SimResult<()> {
        self.steps.pre_inc(
            &self.state.svstate,
            &insn.rm.pred,
            insn.rm.subvl,
            &self.state.gpr,
            &self.state.cr,
        )
    }

    fn compute_remap_indices(&mut self) -> SimResult<()> {
        let shapes = [0, 1, 2, 3].map(|slot| self.state.svshape(slot));
        self.steps
            .compute_remap_indices(&self.state.svstate, &shapes, &self.state.gpr)
    }

    /// 把 REMAP 索引分派给 SVme 选中的操作数角色
    fn remap_set_steps(&self, frame: &mut Frame) {
        let sv = self.state.svstate;
        let idxs = self.steps.remap_idxs();
        for (i, slot) in sv.remap_slots().iter().enumerate() {
            let slot = usize::from(*slot);
            if sv.sv_me & (1 << i) == 0 || self.state.svshape(slot).is_zero() {
                continue;
            }
            frame.role_steps[i] = idxs[slot];
            frame.remap_active |= 1 << i;
        }
        trace!(
            "remap active={:05b} steps={:?}",
            frame.remap_active, frame.role_steps
        );
    }

    /// 向量操作数当前元素的编号，标量操作数返回 `None`
    fn element_of(
        &self,
        insn: &DecodedFields,
        frame: &Frame,
        slot: OperandSlot,
        is_vec: bool,
    ) -> Option<usize> {
        if !is_vec || !frame.is_svp64 {
            return None;
        }
        let sv = &self.state.svstate;
        let (step, substep, packed) = if slot.is_output() {
            (sv.dststep, sv.dsubstep, sv.unpack)
        } else {
            (sv.srcstep, sv.ssubstep, sv.pack)
        };
        let vl = usize::from(sv.vl);
        let step = if frame.remap_active & (1 << slot.index()) != 0 {
            frame.role_steps[slot.index()] as usize
        } else if insn.rm.reverse_gear {
            vl.saturating_sub(1 + usize::from(step))
        } else {
            usize::from(step)
        };
        let subvl = usize::from(insn.rm.subvl);
        let sub = usize::from(substep);
        Some(if subvl == 0 {
            step
        } else if packed {
            sub * vl + step
        } else {
            step * (subvl + 1) + sub
        })
    }

    fn cr_out_field(&self, insn: &DecodedFields, frame: &Frame) -> usize {
        insn.cr_out.map_or(0, |c| {
            c.field
                + self
                    .element_of(insn, frame, OperandSlot::Out, c.is_vec)
                    .unwrap_or(0)
        })
    }

    /// LD/ST 立即数的元素步长替换
    fn replaced_displacement(&self, insn: &DecodedFields, frame: &Frame) -> Option<i64> {
        if !frame.is_svp64 || insn.rm.sv_mode != SvMode::LdStImm {
            return None;
        }
        let sv = &self.state.svstate;
        let group = i64::from(insn.rm.subvl) + 1;
        let offsmul = if insn.op == MicroOp::Store {
            i64::from(sv.dststep) * group + i64::from(sv.dsubstep)
        } else if frame.remap_active & 1 != 0 {
            i64::from(frame.role_steps[0])
        } else {
            i64::from(sv.srcstep) * group + i64::from(sv.ssubstep)
        };
        let d = raw_displacement(insn);
        let replaced = match insn.rm.ldstmode {
            LdStMode::Normal => return None,
            LdStMode::UnitStride => d.wrapping_add(offsmul * i64::from(insn.data_len)),
            LdStMode::ElStride => d.wrapping_mul(offsmul),
        };
        trace!("ld/st displacement {} -> {} (offset {})", d, replaced, offsmul);
        Some(replaced)
    }

    fn read_special(&self, insn: &DecodedFields, name: &str) -> SimResult<u64> {
        Ok(match name {
            "MSR" => self.state.msr,
            "CR" => self.state.cr.value(),
            "SVSTATE" => self.state.svstate.to_u64(),
            "FPSCR" => self.state.fpscr,
            other => {
                let id = SprId::from_name(other).ok_or_else(|| unknown_operand(insn, other))?;
                self.state.read_spr(id)
            }
        })
    }

    fn read_input(
        &self,
        name: &str,
        info: &InstructionInfo,
        insn: &DecodedFields,
        frame: &Frame,
        is_ldst: bool,
    ) -> SimResult<u64> {
        let xer = |bit| u64::from(self.state.spr.xer_bit(bit));
        Ok(match name {
            "overflow" => 0,
            "FPSCR" => self.state.fpscr,
            "CA" => xer(xer_bits::CA),
            "CA32" => xer(xer_bits::CA32),
            "OV" => xer(xer_bits::OV),
            "OV32" => xer(xer_bits::OV32),
            "SO" => xer(xer_bits::SO),
            "CR0" => u64::from(self.state.cr.field(0)?),
            _ if info.is_special(name) => self.read_special(insn, name)?,
            // LD/ST 的基地址始终按 64 位读
            "RA" if is_ldst => self.read_register(name, insn, frame, ElWidth::W64, 64)?,
            _ => self.read_register(name, insn, frame, frame.ew_src, frame.xlen)?,
        })
    }

    fn read_register(
        &self,
        name: &str,
        insn: &DecodedFields,
        frame: &Frame,
        ew: ElWidth,
        xlen: u32,
    ) -> SimResult<u64> {
        let op = insn.operand(name).ok_or_else(|| unknown_operand(insn, name))?;
        if frame.is_svp64 && self.steps.pred_src_zero {
            return Ok(0);
        }
        let file = match op.class {
            RegClass::Gpr => &self.state.gpr,
            RegClass::Fpr => &self.state.fpr,
        };
        let value = match self.element_of(insn, frame, op.slot, op.is_vec) {
            Some(e) => file.read_element(op.reg, e, ew)?,
            None => file.get(op.reg)?,
        };
        Ok(value & mask(xlen))
    }

    fn handle_carry(
        &mut self,
        insn: &DecodedFields,
        frame: &Frame,
        inputs: &[u64],
        outputs: &mut Outputs,
        (ca_in, ov_in): (bool, bool),
    ) -> SimResult<()> {
        let has_ca = outputs.get("CA").is_some();
        let has_ca32 = outputs.get("CA32").is_some();
        if has_ca && has_ca32 {
            return Ok(());
        }
        if insn.op == MicroOp::Add && !has_ca && !has_ca32 {
            let si = insn.field("SI").unwrap_or(0);
            let f = arith::kludged_add_flags(&frame.name, inputs, si, ca_in, ov_in)?;
            let (bit, bit32) = if frame.name.starts_with("addex") {
                (xer_bits::OV, xer_bits::OV32)
            } else {
                (xer_bits::CA, xer_bits::CA32)
            };
            self.state.spr.set_xer_bit(bit, f.ca);
            self.state.spr.set_xer_bit(bit32, f.ca32);
            trace!("{} carry ca={} ca32={}", frame.name, f.ca, f.ca32);
            return Ok(());
        }
        let output = outputs.first().unwrap_or(0);
        let (ca, ca32) = arith::generic_carry(
            inputs,
            output,
            insn.invert_in,
            insn.imm,
            insn.op == MicroOp::Add,
            frame.xlen,
        );
        if !has_ca {
            self.state.spr.set_xer_bit(xer_bits::CA, ca);
        }
        if !has_ca32 {
            self.state.spr.set_xer_bit(xer_bits::CA32, ca32);
        }
        Ok(())
    }

    fn handle_overflow(
        &mut self,
        insn: &DecodedFields,
        frame: &Frame,
        inputs: &[u64],
        outputs: &Outputs,
        (ca_in, ov_in): (bool, bool),
    ) -> SimResult<()> {
        let (ov, ov32) = if insn.op == MicroOp::Add {
            let si = insn.field("SI").unwrap_or(0);
            let f = arith::kludged_add_flags(&frame.name, inputs, si, ca_in, ov_in)?;
            (f.ov, f.ov32)
        } else if let Some(o) = outputs.get("overflow") {
            (o != 0, o != 0)
        } else {
            let output = outputs.first().unwrap_or(0);
            match arith::sign_overflow(inputs, output, frame.xlen) {
                Some(flags) => flags,
                None => return Ok(()),
            }
        };
        let spr = &mut self.state.spr;
        spr.set_xer_bit(xer_bits::OV, ov);
        spr.set_xer_bit(xer_bits::OV32, ov32);
        if ov {
            spr.set_xer_bit(xer_bits::SO, true);
        }
        trace!("{} overflow ov={} ov32={}", frame.name, ov, ov32);
        Ok(())
    }

    /// Rc=1 的 CR 更新
    fn do_rc_ov(
        &mut self,
        insn: &DecodedFields,
        frame: &Frame,
        outputs: &Outputs,
        field: usize,
    ) -> SimResult<()> {
        if insn.cr_out.is_some_and(|c| c.sel == CrSel::Cr1) {
            let v = outputs
                .get("CR1")
                .map_or_else(|| arith::fpscr_cr1(self.state.fpscr), |v| v as u8);
            return self.state.cr.set_field(field, v & 0xf);
        }
        if let Some(v) = outputs.get("CR0") {
            return self.state.cr.set_field(field, v as u8 & 0xf);
        }
        let is_setvl = frame.name == "setvl";
        let (result, bits) = if is_setvl {
            let vl = outputs
                .get("SVSTATE")
                .map_or(self.state.svstate.vl, |v| SvState::from_u64(v).vl);
            (u64::from(vl), 64)
        } else if frame.is_svp64 {
            (outputs.first().unwrap_or(0), frame.ew_dst.bits())
        } else {
            (outputs.first().unwrap_or(0), frame.xlen)
        };
        let overflow = outputs.get("overflow") == Some(1);
        self.handle_comparison(result, bits, field, overflow, is_setvl)
    }

    /// 按有符号结果写 CR 字段
    ///
    /// `no_so` 时只写 LT/GT/EQ 并保留原来的 SO，除非发生了溢出。
    fn handle_comparison(
        &mut self,
        result: u64,
        bits: u32,
        field: usize,
        overflow: bool,
        no_so: bool,
    ) -> SimResult<()> {
        let flags = arith::compare_flags(result, bits);
        let value = if no_so && !overflow {
            (self.state.cr.field(field)? & CR_SO) | flags
        } else {
            let so = overflow || self.state.spr.xer_bit(xer_bits::SO);
            flags | if so { CR_SO } else { 0 }
        };
        trace!("CR{} <- {:04b} (result {:#x})", field, value, result);
        self.state.cr.set_field(field, value)
    }

    /// 数据相关的 fail-first：CR 测试失败时截断 VL
    ///
    /// 返回 `(命中, 包含失败元素)`
    fn check_ffirst(
        &mut self,
        insn: &DecodedFields,
        chk: bool,
        field: usize,
    ) -> SimResult<(bool, bool)> {
        let rm = &insn.rm;
        if !chk || !rm.is_ffirst() {
            return Ok((false, false));
        }
        let bit = self.state.cr.bit(field, CrBit::from_index(rm.cr_sel))?;
        let hit = bit != rm.ff_inv;
        trace!(
            "ffirst test CR{} bit {} = {} inv={} hit={}",
            field, rm.cr_sel, bit, rm.ff_inv, hit
        );
        if !hit {
            return Ok((false, false));
        }
        let sv = &mut self.state.svstate;
        let vl = sv.srcstep + u8::from(rm.vli);
        debug!("fail-first at srcstep {}: VL {} -> {}", sv.srcstep, sv.vl, vl);
        sv.vl = vl;
        Ok((true, rm.vli))
    }

    fn do_outregs(
        &mut self,
        insn: &DecodedFields,
        info: &InstructionInfo,
        frame: &Frame,
        outputs: &Outputs,
        carry_en: bool,
    ) -> SimResult<()> {
        for (name, value) in outputs.iter() {
            self.check_write(insn, info, frame, name, value, carry_en)?;
        }
        Ok(())
    }

    fn check_write(
        &mut self,
        insn: &DecodedFields,
        info: &InstructionInfo,
        frame: &Frame,
        name: &str,
        value: u64,
        carry_en: bool,
    ) -> SimResult<()> {
        let spr = &mut self.state.spr;
        match name {
            "overflow" | "CR0" | "CR1" => {}
            "FPSCR" => self.state.fpscr = value,
            "CA" if carry_en => spr.set_xer_bit(xer_bits::CA, value != 0),
            "CA32" if carry_en => spr.set_xer_bit(xer_bits::CA32, value != 0),
            "CA" | "CA32" => {}
            "OV" => spr.set_xer_bit(xer_bits::OV, value != 0),
            "OV32" => spr.set_xer_bit(xer_bits::OV32, value != 0),
            "SO" => spr.set_xer_bit(xer_bits::SO, value != 0),
            _ if info.is_special(name) => self.write_special(insn, name, value)?,
            _ => self.write_register(insn, frame, name, value)?,
        }
        Ok(())
    }

    fn write_special(&mut self, insn: &DecodedFields, name: &str, value: u64) -> SimResult<()> {
        match name {
            "MSR" => self.state.msr = value,
            "CR" => self.state.cr.set_value(value),
            "SVSTATE" => self.state.svstate = SvState::from_u64(value),
            other => {
                let id = SprId::from_name(other).ok_or_else(|| unknown_operand(insn, other))?;
                self.state.write_spr(id, value);
            }
        }
        trace!("write {} = {:#x}", name, value);
        Ok(())
    }

    fn write_register(
        &mut self,
        insn: &DecodedFields,
        frame: &Frame,
        name: &str,
        value: u64,
    ) -> SimResult<()> {
        let op = *insn.operand(name).ok_or_else(|| unknown_operand(insn, name))?;
        let value = if frame.is_svp64 && self.steps.pred_dst_zero {
            0
        } else {
            value
        };
        let element = self.element_of(insn, frame, op.slot, op.is_vec);
        let file = match op.class {
            RegClass::Gpr => &mut self.state.gpr,
            RegClass::Fpr => &mut self.state.fpr,
        };
        match element {
            Some(e) => file.write_element(op.reg, e, frame.ew_dst, value)?,
            None => file.set(op.reg, value)?,
        }
        trace!(
            "write {} {}{}[{:?}] = {:#x}",
            name,
            op.class.prefix(),
            op.reg,
            element,
            value
        );
        Ok(())
    }

    /// 指令写回之后的元素步进
    ///
    /// 返回真表示提交 NIA。
    fn check_step_increment(
        &mut self,
        insn: &DecodedFields,
        frame: &mut Frame,
        rc_en: bool,
    ) -> SimResult<bool> {
        if frame.allow_next_step_inc == 0 {
            if frame.is_svp64 {
                return self.svstate_post_inc(insn, frame);
            }
            self.state.last_op_svshape = SHAPE_SETUP_OPS.contains(&insn.asmop.as_str());
            return Ok(true);
        }

        // svstep 请求的显式步进
        self.pre_inc(insn)?;
        if self.steps.update_new_steps(&mut self.state.svstate) {
            self.steps.reset(&mut self.state.svstate);
            self.state.svstate.vfirst = false;
            self.update_nia(frame);
            if rc_en {
                self.handle_comparison(0, 64, 0, false, false)?;
            }
            return Ok(true);
        }

        let mut nia_update = true;
        if frame.allow_next_step_inc == 2 {
            nia_update = self.svstate_post_inc(insn, frame)?;
        }
        self.compute_remap_indices()?;
        if frame.allow_next_step_inc != 2 {
            self.steps.advance(&mut self.state.svstate);
        }

        let endtest = self.steps.at_loopend(self.state.svstate.vl);
        if rc_en {
            let endings = match frame.next_mode {
                1..=4 => self.steps.remap_loopends()[usize::from(frame.next_mode - 1)],
                _ => LOOPEND_ALL,
            };
            let cr0 = ((!endings) << 1 | u8::from(endtest)) & 0xf;
            self.state.cr.set_field(0, cr0)?;
            trace!("svstep CR0 <- {:04b}", cr0);
        }
        if endtest {
            self.steps.reset(&mut self.state.svstate);
            self.state.svstate.vfirst = false;
        }
        Ok(nia_update)
    }

    /// 隐式元素循环：前进一个元素，循环未结束时 NIA 保持为 CIA
    fn svstate_post_inc(&mut self, insn: &DecodedFields, frame: &mut Frame) -> SimResult<bool> {
        let sv = self.state.svstate;
        if sv.vfirst {
            if frame.is_branch() || insn.rm.is_ffirst() {
                self.update_pc_next(frame);
                return Ok(false);
            }
            self.update_nia(frame);
            return Ok(true);
        }

        if frame.is_branch() && frame.end_loop {
            self.steps.reset(&mut self.state.svstate);
            self.update_pc_next(frame);
            return Ok(false);
        }

        let in_vec = !insn.no_in_vec();
        let out_vec = !insn.no_out_vec();
        let mut vectorised = if insn.rm.pred.ptype == PredType::Twin {
            in_vec || out_vec
        } else {
            out_vec
        };
        if insn.rm.is_ffirst() || insn.rm.sv_mode == SvMode::Branch {
            vectorised = in_vec;
        }

        self.steps.advance(&mut self.state.svstate);
        if !vectorised || self.steps.loopend {
            self.steps.reset(&mut self.state.svstate);
            self.update_nia(frame);
            return Ok(true);
        }

        frame.nia = frame.cia;
        self.state.pc.nia = frame.cia;
        Ok(false)
    }
}

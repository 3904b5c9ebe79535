//! 集成测试共用的指令构造器

#![allow(dead_code)]

use svsim_core::{Config, SimConfig, SvState};
use svsim_engine::{
    CrOperand, CrSel, DecodedFields, InsnForm, IsaCaller, MicroOp, OperandSlot, ReferenceIsa,
    RegOperand, RmFields, SparseMemory,
};

pub type Cpu = IsaCaller<ReferenceIsa, SparseMemory>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn cpu() -> Cpu {
    cpu_with(SimConfig::defaults(), SparseMemory::new())
}

pub fn cpu_with(config: SimConfig, mem: SparseMemory) -> Cpu {
    init_logger();
    IsaCaller::new(config, ReferenceIsa::new(), mem).expect("valid config")
}

pub fn set_gprs(cpu: &mut Cpu, base: usize, values: &[u64]) {
    for (i, &v) in values.iter().enumerate() {
        cpu.state_mut().gpr.set(base + i, v).unwrap();
    }
}

pub fn gprs(cpu: &Cpu, base: usize, n: usize) -> Vec<u64> {
    (base..base + n)
        .map(|i| cpu.state().gpr.get(i).unwrap())
        .collect()
}

/// 直接设置 MAXVL/VL
pub fn set_vl(cpu: &mut Cpu, vl: u8) {
    cpu.state_mut().svstate = SvState {
        maxvl: vl,
        vl,
        ..Default::default()
    };
}

pub fn gpr(slot: OperandSlot, reg: usize, vec: bool) -> RegOperand {
    let op = RegOperand::gpr(slot, reg);
    if vec { op.vector() } else { op }
}

/// `add RT,RA,RB`，按 `asmop` 的后缀设置 Rc/OE
pub fn add_like(asmop: &str, rt: usize, ra: usize, rb: usize) -> DecodedFields {
    let base = asmop.trim_end_matches('.');
    DecodedFields::new(asmop, MicroOp::Add)
        .with_operand("RA", gpr(OperandSlot::In1, ra, false))
        .with_operand("RB", gpr(OperandSlot::In2, rb, false))
        .with_operand("RT", gpr(OperandSlot::Out, rt, false))
        .with_rc(asmop.ends_with('.'))
        .with_oe(base.ends_with('o'))
}

/// `sv.add *RT,*RA,RB`：RT、RA 为向量，RB 可选向量
pub fn sv_add(rm: RmFields, rt: usize, ra: usize, rb: usize, rb_vec: bool) -> DecodedFields {
    DecodedFields::new("add", MicroOp::Add)
        .with_operand("RA", gpr(OperandSlot::In1, ra, true))
        .with_operand("RB", gpr(OperandSlot::In2, rb, rb_vec))
        .with_operand("RT", gpr(OperandSlot::Out, rt, true))
        .svp64(rm)
}

/// `sv.add.`，每个元素的 CR 字段随元素号递增
pub fn sv_add_rc(rm: RmFields, rt: usize, ra: usize, rb: usize) -> DecodedFields {
    let mut insn = sv_add(rm, rt, ra, rb, false).with_cr_out(CrOperand {
        sel: CrSel::Cr0,
        field: 0,
        is_vec: true,
    });
    insn.asmop = "add.".into();
    insn.rc = true;
    insn
}

/// `setvl RT,RA,SVi,vf,vs,ms`，`SVi` 为 VL-1 的编码
pub fn setvl(rt: usize, ra: usize, svi: u64, vf: bool, vs: bool, ms: bool, rc: bool) -> DecodedFields {
    let asmop = if rc { "setvl." } else { "setvl" };
    DecodedFields::new(asmop, MicroOp::Sv)
        .with_operand("RA", gpr(OperandSlot::In1, ra, false))
        .with_operand("RT", gpr(OperandSlot::Out, rt, false))
        .with_field("SVi", svi)
        .with_field("vf", u64::from(vf))
        .with_field("vs", u64::from(vs))
        .with_field("ms", u64::from(ms))
        .with_rc(rc)
}

/// `svstep. RT,SVi,vf`
pub fn svstep_rc(rt: usize, svi: u64, vf: bool) -> DecodedFields {
    DecodedFields::new("svstep.", MicroOp::Sv)
        .with_operand("RT", gpr(OperandSlot::Out, rt, false))
        .with_field("SVi", svi)
        .with_field("vf", u64::from(vf))
        .with_rc(true)
}

/// `svremap SVme,mi0,mi1,mi2,mo0,mo1,pst`
pub fn svremap(sv_me: u64, slots: [u64; 5], persist: bool) -> DecodedFields {
    let names = ["mi0", "mi1", "mi2", "mo0", "mo1"];
    names
        .iter()
        .zip(slots)
        .fold(DecodedFields::new("svremap", MicroOp::Sv), |insn, (n, v)| {
            insn.with_field(n, v)
        })
        .with_field("SVme", sv_me)
        .with_field("pst", u64::from(persist))
}

/// `bc BO,BI,BD`，`bd` 为字节偏移
pub fn bc(bo: u64, bi: u64, bd: i64) -> DecodedFields {
    DecodedFields::new("bc", MicroOp::Branch)
        .with_field("BO", bo)
        .with_field("BI", bi)
        .with_field("BD", ((bd >> 2) as u64) & 0x3fff)
}

/// `ld RT,DS(RA)`
pub fn ld(rt: usize, ds: i64, ra: usize) -> DecodedFields {
    let mut insn = DecodedFields::new("ld", MicroOp::Load)
        .with_operand("RA", gpr(OperandSlot::In1, ra, false))
        .with_operand("RT", gpr(OperandSlot::Out, rt, false))
        .with_field("DS", ((ds >> 2) as u64) & 0x3fff)
        .with_data_len(8);
    insn.form = InsnForm::DS;
    insn
}

pub fn attn() -> DecodedFields {
    DecodedFields::new("attn", MicroOp::Attn)
}

//! 元素循环集成测试
//!
//! setvl/svstep 的 CR0 约定、水平与 Vertical-First 循环、反向步进、SUBVL 与元素宽度、
//! LD/ST 元素步长、谓词跳过与置零、fail-first 截断、REMAP 以及 sv.bc 的 ANY/ALL 语义

mod common;

use common::*;
use svsim_core::predicate::{PredMode, PredType, PredicateConfig};
use svsim_core::regs::{CR_EQ, CR_GT, CR_SO};
use svsim_core::svshape::MODE_MATRIX;
use svsim_core::{Config, ElWidth, SimConfig, SprId, SvShape};
use svsim_engine::{
    CallOutcome, CrOperand, CrSel, DecodedFields, InsnForm, LdStMode, MicroOp, OperandSlot,
    RmFields, RmMode, SparseMemory, StaticProgram, SvMode,
};

// ============================================================================
// setvl / svstep
// ============================================================================

#[test]
fn test_setvl_rc_clamps_to_maxvl() {
    let mut cpu = cpu();
    set_gprs(&mut cpu, 4, &[1000]);
    let out = cpu.call("setvl.", &setvl(5, 4, 4, false, true, true, true)).unwrap();
    assert_eq!(out, CallOutcome::Retired);

    let sv = cpu.state().svstate;
    assert_eq!(sv.maxvl, 5);
    assert_eq!(sv.vl, 5);
    assert_eq!(cpu.state().gpr.get(5).unwrap(), 5);
    // 截断报告为 SO
    assert_eq!(cpu.state().cr.field(0).unwrap(), CR_GT | CR_SO);
    assert_eq!(cpu.state().pc.cia, 4);
}

#[test]
fn test_setvl_rc_zero_ra() {
    let mut cpu = cpu();
    let out = cpu.call("setvl.", &setvl(5, 4, 4, false, true, true, true)).unwrap();
    assert_eq!(out, CallOutcome::Retired);
    assert_eq!(cpu.state().svstate.vl, 0);
    assert_eq!(cpu.state().svstate.maxvl, 5);
    assert_eq!(gprs(&cpu, 4, 2), vec![0, 0]);
    assert_eq!(cpu.state().cr.field(0).unwrap(), CR_EQ);
}

#[test]
fn test_setvl_from_ctr() {
    let mut cpu = cpu();
    cpu.state_mut().spr.set(SprId::Ctr, 3);
    cpu.call("setvl.", &setvl(5, 0, 7, false, true, true, true)).unwrap();
    assert_eq!(cpu.state().svstate.vl, 3);
    assert_eq!(cpu.state().svstate.maxvl, 8);
    assert_eq!(cpu.state().cr.field(0).unwrap(), CR_GT);

    cpu.state_mut().spr.set(SprId::Ctr, 0);
    cpu.call("setvl.", &setvl(5, 0, 7, false, true, true, true)).unwrap();
    assert_eq!(cpu.state().svstate.vl, 0);
    assert_eq!(cpu.state().cr.field(0).unwrap(), CR_EQ);
}

#[test]
fn test_setvl_immediate_sets_vertical_first() {
    let mut cpu = cpu();
    cpu.call("setvl", &setvl(0, 0, 1, true, true, true, false)).unwrap();
    let sv = cpu.state().svstate;
    assert_eq!((sv.maxvl, sv.vl), (2, 2));
    assert!(sv.vfirst);
    // RT=0 不写回
    assert_eq!(cpu.state().gpr.get(0).unwrap(), 0);
}

#[test]
fn test_svstep_pair_reports_end() {
    let mut cpu = cpu();
    cpu.call("setvl", &setvl(0, 0, 1, true, true, true, false)).unwrap();

    cpu.call("svstep.", &svstep_rc(5, 1, false)).unwrap();
    assert_eq!(cpu.state().cr.field(0).unwrap(), 0);
    assert_eq!(cpu.state().svstate.srcstep, 1);
    assert!(cpu.state().svstate.vfirst);

    cpu.call("svstep.", &svstep_rc(5, 1, false)).unwrap();
    assert_eq!(cpu.state().cr.field(0).unwrap(), 0b0001);
    assert_eq!(cpu.state().svstate.srcstep, 0);
    assert!(!cpu.state().svstate.vfirst);
    assert_eq!(cpu.state().pc.cia, 12);
}

#[test]
fn test_svstep_returns_srcstep() {
    let mut cpu = cpu();
    cpu.call("setvl", &setvl(0, 0, 2, true, true, true, false)).unwrap();
    let mut seen = Vec::new();
    for _ in 0..3 {
        cpu.call("svstep.", &svstep_rc(6, 5, false)).unwrap();
        seen.push(cpu.state().gpr.get(6).unwrap());
    }
    assert_eq!(seen, vec![0, 1, 2]);
    assert_eq!(cpu.state().cr.field(0).unwrap() & 1, 1);
}

#[test]
fn test_svstep_sets_pack_unpack() {
    let mut cpu = cpu();
    // SVi = 0b11_1_0：pack=1, unpack=0
    cpu.call("svstep.", &svstep_rc(7, 0b0001110, false)).unwrap();
    assert!(cpu.state().svstate.pack);
    assert!(!cpu.state().svstate.unpack);
    assert_eq!(cpu.state().gpr.get(7).unwrap(), 0b10);
}

// ============================================================================
// 水平循环
// ============================================================================

#[test]
fn test_sv_add_loops_until_vl() {
    let mut cpu = cpu();
    set_vl(&mut cpu, 2);
    set_gprs(&mut cpu, 1, &[10, 20]);
    set_gprs(&mut cpu, 5, &[1, 2]);
    let insn = sv_add(RmFields::default(), 9, 1, 5, true);

    assert_eq!(cpu.call("add", &insn).unwrap(), CallOutcome::Looping);
    assert_eq!(cpu.state().pc.cia, 0);
    assert_eq!(cpu.state().svstate.srcstep, 1);
    assert_eq!(cpu.call("add", &insn).unwrap(), CallOutcome::Retired);

    assert_eq!(gprs(&cpu, 9, 2), vec![11, 22]);
    assert_eq!(cpu.state().pc.cia, 8);
    assert_eq!(cpu.state().svstate.srcstep, 0);
    assert_eq!(cpu.state().svstate.dststep, 0);
}

#[test]
fn test_sv_add_leaves_tail_untouched() {
    let mut cpu = cpu();
    set_vl(&mut cpu, 2);
    set_gprs(&mut cpu, 3, &[0x77]);
    set_gprs(&mut cpu, 5, &[0x4321, 0x2223]);
    set_gprs(&mut cpu, 9, &[0x1234, 0x1111]);
    let insn = sv_add(RmFields::default(), 1, 5, 9, true);
    while cpu.call("add", &insn).unwrap() == CallOutcome::Looping {}

    assert_eq!(gprs(&cpu, 1, 3), vec![0x5555, 0x3334, 0x77]);
}

#[test]
fn test_program_runs_to_attn() {
    let mut cpu = cpu();
    set_vl(&mut cpu, 3);
    set_gprs(&mut cpu, 1, &[1, 2, 3]);
    set_gprs(&mut cpu, 5, &[100, 200, 300]);
    let mut prog = StaticProgram::new(0)
        .with("add", sv_add(RmFields::default(), 9, 1, 5, true))
        .with("attn", attn());

    let calls = cpu.run(&mut prog, 100).unwrap();
    assert_eq!(calls, 4);
    assert!(cpu.state().halted);
    assert_eq!(gprs(&cpu, 9, 3), vec![101, 202, 303]);
    assert_eq!(cpu.stats().elements, 3);
}

#[test]
fn test_vl_zero_is_a_nop() {
    let mut cpu = cpu();
    set_vl(&mut cpu, 0);
    set_gprs(&mut cpu, 9, &[77]);
    let out = cpu
        .call("add", &sv_add(RmFields::default(), 9, 1, 5, true))
        .unwrap();
    assert_eq!(out, CallOutcome::Retired);
    assert_eq!(cpu.state().gpr.get(9).unwrap(), 77);
    assert_eq!(cpu.state().pc.cia, 8);
    assert_eq!(cpu.stats().elements, 0);
}

#[test]
fn test_scalar_source_broadcasts() {
    let mut cpu = cpu();
    set_vl(&mut cpu, 3);
    set_gprs(&mut cpu, 1, &[1, 2, 3]);
    set_gprs(&mut cpu, 5, &[1000]);
    let insn = sv_add(RmFields::default(), 9, 1, 5, false);
    while cpu.call("add", &insn).unwrap() == CallOutcome::Looping {}
    assert_eq!(gprs(&cpu, 9, 3), vec![1001, 1002, 1003]);
}

#[test]
fn test_reverse_gear_walks_from_the_top() {
    let mut cpu = cpu();
    set_vl(&mut cpu, 3);
    set_gprs(&mut cpu, 1, &[1, 2, 3]);
    set_gprs(&mut cpu, 5, &[10, 20, 30]);
    set_gprs(&mut cpu, 9, &[0xdead; 3]);
    let rm = RmFields {
        reverse_gear: true,
        ..Default::default()
    };
    let insn = sv_add(rm, 9, 1, 5, true);

    // 第一个元素落在 r11
    assert_eq!(cpu.call("add", &insn).unwrap(), CallOutcome::Looping);
    assert_eq!(gprs(&cpu, 9, 3), vec![0xdead, 0xdead, 33]);
    assert_eq!(cpu.call("add", &insn).unwrap(), CallOutcome::Looping);
    assert_eq!(gprs(&cpu, 9, 3), vec![0xdead, 22, 33]);
    assert_eq!(cpu.call("add", &insn).unwrap(), CallOutcome::Retired);
    assert_eq!(gprs(&cpu, 9, 3), vec![11, 22, 33]);
}

// ============================================================================
// SUBVL 与元素宽度
// ============================================================================

fn run_counting(cpu: &mut Cpu, name: &str, insn: &DecodedFields) -> u32 {
    let mut calls = 1;
    while cpu.call(name, insn).unwrap() == CallOutcome::Looping {
        calls += 1;
    }
    calls
}

#[test]
fn test_subvl_visits_every_subelement() {
    let mut cpu = cpu();
    set_vl(&mut cpu, 2);
    set_gprs(&mut cpu, 1, &[1, 2, 3, 4]);
    set_gprs(&mut cpu, 5, &[10, 20, 30, 40]);
    let rm = RmFields {
        subvl: 1,
        ..Default::default()
    };
    let insn = sv_add(rm, 9, 1, 5, true);

    assert_eq!(cpu.call("add", &insn).unwrap(), CallOutcome::Looping);
    let sv = cpu.state().svstate;
    assert_eq!((sv.srcstep, sv.ssubstep), (0, 1));
    assert_eq!((sv.dststep, sv.dsubstep), (0, 1));

    assert_eq!(run_counting(&mut cpu, "add", &insn), 3);
    assert_eq!(gprs(&cpu, 9, 4), vec![11, 22, 33, 44]);
    assert_eq!(cpu.stats().elements, 4);
    assert_eq!(cpu.state().svstate.ssubstep, 0);
    assert_eq!(cpu.state().pc.cia, 8);
}

#[test]
fn test_pack_makes_substep_the_outer_loop() {
    let mut cpu = cpu();
    set_vl(&mut cpu, 2);
    cpu.state_mut().svstate.pack = true;
    set_gprs(&mut cpu, 1, &[1, 2, 3, 4]);
    set_gprs(&mut cpu, 5, &[10, 20, 30, 40]);
    let rm = RmFields {
        subvl: 1,
        ..Default::default()
    };
    let insn = sv_add(rm, 9, 1, 5, true);

    // 源侧先走完 VL，目标侧仍在子步进内层
    assert_eq!(cpu.call("add", &insn).unwrap(), CallOutcome::Looping);
    let sv = cpu.state().svstate;
    assert_eq!((sv.srcstep, sv.ssubstep), (1, 0));
    assert_eq!((sv.dststep, sv.dsubstep), (0, 1));

    assert_eq!(run_counting(&mut cpu, "add", &insn), 3);
    assert_eq!(cpu.stats().elements, 4);
    assert_eq!(gprs(&cpu, 9, 4), vec![11, 22, 33, 44]);
}

#[test]
fn test_elwidth_16_packs_elements_into_one_register() {
    let mut cpu = cpu();
    set_vl(&mut cpu, 4);
    set_gprs(&mut cpu, 1, &[0x0004_0003_0002_0001]);
    set_gprs(&mut cpu, 5, &[0x0040_0030_0020_0010]);
    set_gprs(&mut cpu, 10, &[0x77]);
    let rm = RmFields {
        ew_src: ElWidth::W16,
        ew_dst: ElWidth::W16,
        ..Default::default()
    };
    let insn = sv_add(rm, 9, 1, 5, true);

    assert_eq!(run_counting(&mut cpu, "add", &insn), 4);
    assert_eq!(cpu.state().gpr.get(9).unwrap(), 0x0044_0033_0022_0011);
    assert_eq!(cpu.state().gpr.get(10).unwrap(), 0x77);
}

#[test]
fn test_elwidth_16_wraps_per_element() {
    let mut cpu = cpu();
    set_vl(&mut cpu, 2);
    set_gprs(&mut cpu, 1, &[0x0001_ffff]);
    set_gprs(&mut cpu, 5, &[0x0001_0001]);
    set_gprs(&mut cpu, 9, &[0xaaaa_0000_0000]);
    let rm = RmFields {
        ew_src: ElWidth::W16,
        ew_dst: ElWidth::W16,
        ..Default::default()
    };
    run_counting(&mut cpu, "add", &sv_add(rm, 9, 1, 5, true));

    // 第 0 个元素回绕，不进位到第 1 个，高位元素不变
    assert_eq!(cpu.state().gpr.get(9).unwrap(), 0xaaaa_0002_0000);
}

// ============================================================================
// LD/ST 元素步长
// ============================================================================

fn twin_ldst(ldstmode: LdStMode) -> RmFields {
    RmFields {
        sv_mode: SvMode::LdStImm,
        ldstmode,
        pred: PredicateConfig {
            mode: PredMode::Int,
            ptype: PredType::Twin,
            srcpred: 0,
            dstpred: 0,
            pred_sz: false,
            pred_dz: false,
        },
        ..Default::default()
    }
}

/// `sv.std *RS,DS(RA)`
fn sv_std(rm: RmFields, rs: usize, ds: i64, ra: usize) -> DecodedFields {
    let mut insn = DecodedFields::new("std", MicroOp::Store)
        .with_operand("RA", gpr(OperandSlot::In1, ra, false))
        .with_operand("RS", gpr(OperandSlot::In3, rs, true))
        .with_field("DS", ((ds >> 2) as u64) & 0x3fff)
        .with_data_len(8)
        .svp64(rm);
    insn.form = InsnForm::DS;
    insn
}

/// `sv.ld *RT,DS(RA)`
fn sv_ld(rm: RmFields, rt: usize, ds: i64, ra: usize) -> DecodedFields {
    let mut insn = ld(rt, ds, ra).svp64(rm);
    insn.operands.insert("RT".into(), gpr(OperandSlot::Out, rt, true));
    insn
}

#[test]
fn test_unit_stride_store_then_load() {
    let mut cpu = cpu();
    set_vl(&mut cpu, 3);
    set_gprs(&mut cpu, 4, &[0x1000]);
    set_gprs(&mut cpu, 8, &[0xa, 0xb, 0xc]);
    let rm = twin_ldst(LdStMode::UnitStride);

    assert_eq!(run_counting(&mut cpu, "std", &sv_std(rm, 8, 0, 4)), 3);
    assert_eq!(cpu.memory().last_st_addr(), Some(0x1010));

    assert_eq!(run_counting(&mut cpu, "ld", &sv_ld(rm, 16, 0, 4)), 3);
    assert_eq!(gprs(&cpu, 16, 3), vec![0xa, 0xb, 0xc]);
    assert_eq!(cpu.memory().last_ld_addr(), Some(0x1010));
    assert_eq!(cpu.state().gpr.get(4).unwrap(), 0x1000);
}

#[test]
fn test_unit_stride_adds_base_displacement() {
    let mut mem = SparseMemory::new();
    mem.load_words(0x1000, &[1, 2, 3, 4], 8);
    let mut cpu = cpu_with(SimConfig::defaults(), mem);
    set_vl(&mut cpu, 2);
    set_gprs(&mut cpu, 4, &[0x1000]);

    let insn = sv_ld(twin_ldst(LdStMode::UnitStride), 16, 16, 4);
    run_counting(&mut cpu, "ld", &insn);
    assert_eq!(gprs(&cpu, 16, 2), vec![3, 4]);
}

#[test]
fn test_element_stride_scales_displacement() {
    let mut mem = SparseMemory::new();
    mem.load_words(0x1000, &[1, 2, 3, 4, 5, 6], 8);
    let mut cpu = cpu_with(SimConfig::defaults(), mem);
    set_vl(&mut cpu, 3);
    set_gprs(&mut cpu, 4, &[0x1000]);

    let insn = sv_ld(twin_ldst(LdStMode::ElStride), 16, 16, 4);
    assert_eq!(run_counting(&mut cpu, "ld", &insn), 3);
    assert_eq!(gprs(&cpu, 16, 3), vec![1, 3, 5]);
    assert_eq!(cpu.memory().last_ld_addr(), Some(0x1020));
}

// ============================================================================
// 谓词
// ============================================================================

fn int_pred(zero: bool) -> RmFields {
    RmFields {
        pred: PredicateConfig {
            mode: PredMode::Int,
            ptype: PredType::Single,
            srcpred: 0,
            dstpred: 2,
            pred_sz: zero,
            pred_dz: zero,
        },
        ..Default::default()
    }
}

#[test]
fn test_predicate_skips_masked_elements() {
    let mut cpu = cpu();
    set_vl(&mut cpu, 4);
    set_gprs(&mut cpu, 3, &[0b0101]);
    set_gprs(&mut cpu, 8, &[1, 2, 3, 4]);
    set_gprs(&mut cpu, 16, &[9, 9, 9, 9]);
    let insn = sv_add(int_pred(false), 16, 8, 0, false);

    assert_eq!(cpu.call("add", &insn).unwrap(), CallOutcome::Looping);
    assert_eq!(cpu.state().svstate.srcstep, 2);
    assert_eq!(cpu.call("add", &insn).unwrap(), CallOutcome::Retired);
    assert_eq!(gprs(&cpu, 16, 4), vec![1, 9, 3, 9]);
    assert_eq!(cpu.stats().elements, 2);
}

#[test]
fn test_predicate_zeroing_writes_zero() {
    let mut cpu = cpu();
    set_vl(&mut cpu, 4);
    set_gprs(&mut cpu, 3, &[0b0101]);
    set_gprs(&mut cpu, 8, &[1, 2, 3, 4]);
    set_gprs(&mut cpu, 16, &[9, 9, 9, 9]);
    let insn = sv_add(int_pred(true), 16, 8, 0, false);

    let mut calls = 1;
    while cpu.call("add", &insn).unwrap() == CallOutcome::Looping {
        calls += 1;
    }
    assert_eq!(calls, 4);
    assert_eq!(gprs(&cpu, 16, 4), vec![1, 0, 3, 0]);
}

#[test]
fn test_empty_predicate_retires_without_elements() {
    let mut cpu = cpu();
    set_vl(&mut cpu, 4);
    set_gprs(&mut cpu, 16, &[9, 9, 9, 9]);
    let insn = sv_add(int_pred(false), 16, 8, 0, false);
    assert_eq!(cpu.call("add", &insn).unwrap(), CallOutcome::Retired);
    assert_eq!(gprs(&cpu, 16, 4), vec![9; 4]);
    assert_eq!(cpu.state().pc.cia, 8);
}

// ============================================================================
// fail-first
// ============================================================================

fn ffirst(vli: bool) -> RmFields {
    RmFields {
        mode: RmMode::FailFirst,
        // EQ
        cr_sel: 2,
        vli,
        ..Default::default()
    }
}

#[test]
fn test_ffirst_truncates_vl() {
    let mut cpu = cpu();
    set_vl(&mut cpu, 4);
    set_gprs(&mut cpu, 8, &[5, 3, 0, 7]);
    set_gprs(&mut cpu, 16, &[9, 9, 9, 9]);
    let insn = sv_add_rc(ffirst(false), 16, 8, 0);

    let mut calls = 1;
    while cpu.call("add.", &insn).unwrap() == CallOutcome::Looping {
        calls += 1;
    }
    assert_eq!(calls, 3);
    assert_eq!(cpu.state().svstate.vl, 2);
    assert_eq!(gprs(&cpu, 16, 4), vec![5, 3, 9, 9]);
    assert_eq!(cpu.state().cr.field(0).unwrap(), CR_GT);
    assert_eq!(cpu.state().cr.field(2).unwrap(), CR_EQ);
    assert_eq!(cpu.state().pc.cia, 8);
}

#[test]
fn test_ffirst_vli_keeps_failing_element() {
    let mut cpu = cpu();
    set_vl(&mut cpu, 4);
    set_gprs(&mut cpu, 8, &[5, 3, 0, 7]);
    set_gprs(&mut cpu, 16, &[9, 9, 9, 9]);
    let insn = sv_add_rc(ffirst(true), 16, 8, 0);
    while cpu.call("add.", &insn).unwrap() == CallOutcome::Looping {}
    assert_eq!(cpu.state().svstate.vl, 3);
    assert_eq!(gprs(&cpu, 16, 4), vec![5, 3, 0, 9]);
}

// ============================================================================
// REMAP
// ============================================================================

#[test]
fn test_remap_transposes_source() {
    let mut cpu = cpu();
    let shape = SvShape::default()
        .with_lims([2, 3, 1])
        .with_mode(MODE_MATRIX)
        .with_permute(0b010);
    cpu.state_mut()
        .spr
        .set(SprId::SvShape0, u64::from(shape.to_u32()));
    set_gprs(&mut cpu, 8, &[10, 11, 12, 13, 14, 15]);

    cpu.call("setvl", &setvl(0, 0, 5, false, true, true, false)).unwrap();
    // RA 使用 SVSHAPE0，持久生效
    cpu.call("svremap", &svremap(0b00001, [0; 5], true)).unwrap();
    assert!(cpu.state().svstate.persist);

    let insn = sv_add(RmFields::default(), 16, 8, 0, false);
    while cpu.call("add", &insn).unwrap() == CallOutcome::Looping {}

    let cursor = shape.cursor().unwrap();
    let want: Vec<u64> = (0..6)
        .map(|i| 10 + u64::from(cursor.step_at(i).unwrap().index))
        .collect();
    assert_eq!(gprs(&cpu, 16, 6), want);
    assert_ne!(want, vec![10, 11, 12, 13, 14, 15]);
}

#[test]
fn test_svremap_without_persist_applies_once() {
    let mut cpu = cpu();
    cpu.call("svremap", &svremap(0b00001, [0; 5], false)).unwrap();
    assert!(cpu.state().last_op_svshape);
    cpu.call("add", &add_like("add", 3, 1, 2)).unwrap();
    assert!(!cpu.state().last_op_svshape);
}

// ============================================================================
// Vertical-First
// ============================================================================

#[test]
fn test_vertical_first_loop() {
    let mut cpu = cpu();
    set_gprs(&mut cpu, 1, &[1, 2, 3]);
    set_gprs(&mut cpu, 5, &[10, 20, 30]);

    let mut prog = StaticProgram::new(0);
    prog.push("setvl", setvl(0, 0, 2, true, true, true, false));
    let top = prog.push("add", sv_add(RmFields::default(), 9, 1, 5, true));
    prog.push("svstep.", svstep_rc(20, 5, false));
    let here = prog.end();
    // CR0.SO（循环结束）为 0 时回到 top
    prog.push("bc", bc(0b00110, 3, top as i64 - here as i64));
    let exit = prog.push("attn", attn());

    let calls = cpu.run(&mut prog, 100).unwrap();
    assert_eq!(calls, 11);
    assert_eq!(gprs(&cpu, 9, 3), vec![11, 22, 33]);
    assert_eq!(cpu.state().pc.cia, exit);
    assert!(!cpu.state().svstate.vfirst);
    assert_eq!(cpu.state().gpr.get(20).unwrap(), 2);
}

// ============================================================================
// sv.bc
// ============================================================================

fn sv_bc(branch_all: bool) -> DecodedFields {
    let rm = RmFields {
        sv_mode: SvMode::Branch,
        branch_all,
        ..Default::default()
    };
    // BO=0b01100：条件为真时跳转，不动 CTR；BI=2（EQ）
    bc(0b01100, 2, 0x40).svp64(rm).with_cr_in(CrOperand {
        sel: CrSel::Cr0,
        field: 0,
        is_vec: true,
    })
}

#[test]
fn test_sv_bc_any_takes_first_true() {
    let mut cpu = cpu();
    set_vl(&mut cpu, 4);
    cpu.state_mut().cr.set_field(1, CR_EQ).unwrap();
    let insn = sv_bc(false);

    assert_eq!(cpu.call("bc", &insn).unwrap(), CallOutcome::Looping);
    assert_eq!(cpu.call("bc", &insn).unwrap(), CallOutcome::Retired);
    assert_eq!(cpu.state().pc.cia, 0x40);
    assert_eq!(cpu.state().svstate.srcstep, 0);
}

#[test]
fn test_sv_bc_any_falls_through() {
    let mut cpu = cpu();
    set_vl(&mut cpu, 2);
    let insn = sv_bc(false);
    assert_eq!(cpu.call("bc", &insn).unwrap(), CallOutcome::Looping);
    assert_eq!(cpu.call("bc", &insn).unwrap(), CallOutcome::Retired);
    assert_eq!(cpu.state().pc.cia, 8);
}

#[test]
fn test_sv_bc_all_requires_every_element() {
    let mut cpu = cpu();
    set_vl(&mut cpu, 3);
    for f in 0..3 {
        cpu.state_mut().cr.set_field(f, CR_EQ).unwrap();
    }
    let insn = sv_bc(true);
    let mut calls = 1;
    while cpu.call("bc", &insn).unwrap() == CallOutcome::Looping {
        calls += 1;
    }
    assert_eq!(calls, 3);
    assert_eq!(cpu.state().pc.cia, 0x40);

    // 第二个元素不成立：提前结束，不跳转
    let mut cpu = common::cpu();
    set_vl(&mut cpu, 3);
    cpu.state_mut().cr.set_field(0, CR_EQ).unwrap();
    cpu.state_mut().cr.set_field(2, CR_EQ).unwrap();
    assert_eq!(cpu.call("bc", &insn).unwrap(), CallOutcome::Looping);
    assert_eq!(cpu.call("bc", &insn).unwrap(), CallOutcome::Retired);
    assert_eq!(cpu.state().pc.cia, 8);
}

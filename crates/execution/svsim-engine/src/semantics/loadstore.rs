//! 定点访存：立即数形式与变址形式
//!
//! 有效地址是 `(RA|0) + D`。SVP64 元素步长替换后的 D 由上下文给出。

use log::trace;
use svsim_core::SimResult;

use super::{Forms, ReferenceIsa, Spec};
use crate::context::ExecutionContext;
use crate::decoded::InsnForm;
use crate::insndb::{Operands, Outputs};

const LOAD_D: Spec = Spec {
    read: &["RA"],
    write: &["RT"],
    special: &[],
    fields: &["RT", "RA", "D"],
    form: InsnForm::D,
};

const LOAD_DS: Spec = Spec {
    fields: &["RT", "RA", "DS"],
    form: InsnForm::DS,
    ..LOAD_D
};

const LOAD_X: Spec = Spec {
    read: &["RA", "RB"],
    fields: &["RT", "RA", "RB"],
    form: InsnForm::X,
    ..LOAD_D
};

const STORE_D: Spec = Spec {
    read: &["RA", "RS"],
    write: &[],
    special: &[],
    fields: &["RS", "RA", "D"],
    form: InsnForm::D,
};

const STORE_DS: Spec = Spec {
    fields: &["RS", "RA", "DS"],
    form: InsnForm::DS,
    ..STORE_D
};

const STORE_X: Spec = Spec {
    read: &["RA", "RB", "RS"],
    fields: &["RS", "RA", "RB"],
    form: InsnForm::X,
    ..STORE_D
};

pub(super) fn register(isa: &mut ReferenceIsa) {
    isa.add("lbz", Forms::Plain, op_lbz, LOAD_D);
    isa.add("lhz", Forms::Plain, op_lhz, LOAD_D);
    isa.add("lwz", Forms::Plain, op_lwz, LOAD_D);
    isa.add("ld", Forms::Plain, op_ld, LOAD_DS);
    isa.add("ldx", Forms::Plain, op_ldx, LOAD_X);
    isa.add("stb", Forms::Plain, op_stb, STORE_D);
    isa.add("sth", Forms::Plain, op_sth, STORE_D);
    isa.add("stw", Forms::Plain, op_stw, STORE_D);
    isa.add("std", Forms::Plain, op_std, STORE_DS);
    isa.add("stdx", Forms::Plain, op_stdx, STORE_X);
}

fn base(ctx: &ExecutionContext<'_>, ops: &Operands) -> u64 {
    if ctx.regnum("RA") == 0 { 0 } else { ops.get("RA") }
}

fn ea_imm(ctx: &ExecutionContext<'_>, ops: &Operands) -> u64 {
    base(ctx, ops).wrapping_add_signed(ctx.displacement())
}

fn ea_idx(ctx: &ExecutionContext<'_>, ops: &Operands) -> u64 {
    base(ctx, ops).wrapping_add(ops.get("RB"))
}

fn load(ctx: &mut ExecutionContext<'_>, ea: u64, width: u8) -> SimResult<Outputs> {
    let value = ctx.ld(ea, width)?;
    trace!("load {}B [{:#x}] = {:#x}", width, ea, value);
    Ok(Outputs::new().with("RT", value))
}

fn store(ctx: &mut ExecutionContext<'_>, ea: u64, width: u8, value: u64) -> SimResult<Outputs> {
    trace!("store {}B [{:#x}] <- {:#x}", width, ea, value);
    ctx.st(ea, width, value)?;
    Ok(Outputs::new())
}

fn op_lbz(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let ea = ea_imm(ctx, ops);
    load(ctx, ea, 1)
}

fn op_lhz(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let ea = ea_imm(ctx, ops);
    load(ctx, ea, 2)
}

fn op_lwz(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let ea = ea_imm(ctx, ops);
    load(ctx, ea, 4)
}

fn op_ld(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let ea = ea_imm(ctx, ops);
    load(ctx, ea, 8)
}

fn op_ldx(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let ea = ea_idx(ctx, ops);
    load(ctx, ea, 8)
}

fn op_stb(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let ea = ea_imm(ctx, ops);
    store(ctx, ea, 1, ops.get("RS"))
}

fn op_sth(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let ea = ea_imm(ctx, ops);
    store(ctx, ea, 2, ops.get("RS"))
}

fn op_stw(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let ea = ea_imm(ctx, ops);
    store(ctx, ea, 4, ops.get("RS"))
}

fn op_std(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let ea = ea_imm(ctx, ops);
    store(ctx, ea, 8, ops.get("RS"))
}

fn op_stdx(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let ea = ea_idx(ctx, ops);
    store(ctx, ea, 8, ops.get("RS"))
}

//! 定点运算：加减族、比较、逻辑、除法

use svsim_core::bits::{exts, mask};
use svsim_core::consts::xer_bits;
use std::cmp::Ordering;

use svsim_core::regs::{CR_EQ, CR_GT, CR_LT, CR_SO};
use svsim_core::SimResult;

use super::{Forms, ReferenceIsa, Spec};
use crate::context::ExecutionContext;
use crate::decoded::InsnForm;
use crate::insndb::{Operands, Outputs};

const XO: Spec = Spec {
    read: &["RA", "RB"],
    write: &["RT"],
    special: &[],
    fields: &["RT", "RA", "RB", "OE", "Rc"],
    form: InsnForm::XO,
};

const XO_CA: Spec = Spec {
    read: &["RA", "RB", "CA"],
    ..XO
};

const XO_UNARY: Spec = Spec {
    read: &["RA"],
    fields: &["RT", "RA", "OE", "Rc"],
    ..XO
};

const XO_UNARY_CA: Spec = Spec {
    read: &["RA", "CA"],
    ..XO_UNARY
};

const D_IMM: Spec = Spec {
    read: &["RA"],
    write: &["RT"],
    special: &[],
    fields: &["RT", "RA", "SI"],
    form: InsnForm::D,
};

const X_LOGICAL: Spec = Spec {
    read: &["RS", "RB"],
    write: &["RA"],
    special: &[],
    fields: &["RA", "RS", "RB", "Rc"],
    form: InsnForm::X,
};

const CMP: Spec = Spec {
    read: &["RA", "RB"],
    write: &["CR"],
    special: &["CR"],
    fields: &["BF", "L", "RA", "RB"],
    form: InsnForm::X,
};

const CMPI: Spec = Spec {
    read: &["RA"],
    fields: &["BF", "L", "RA", "SI"],
    form: InsnForm::D,
    ..CMP
};

pub(super) fn register(isa: &mut ReferenceIsa) {
    isa.add("add", Forms::RcOe, op_add, XO);
    isa.add("addc", Forms::RcOe, op_add, XO);
    isa.add("adde", Forms::RcOe, op_adde, XO_CA);
    isa.add("subf", Forms::RcOe, op_subf, XO);
    isa.add("subfc", Forms::RcOe, op_subf, XO);
    isa.add("subfe", Forms::RcOe, op_subfe, XO_CA);
    isa.add("addme", Forms::RcOe, op_addme, XO_UNARY_CA);
    isa.add("addze", Forms::RcOe, op_addze, XO_UNARY_CA);
    isa.add("subfme", Forms::RcOe, op_subfme, XO_UNARY_CA);
    isa.add("subfze", Forms::RcOe, op_subfze, XO_UNARY_CA);
    isa.add("neg", Forms::RcOe, op_neg, XO_UNARY);
    isa.add("divdu", Forms::RcOe, op_divdu, XO);
    isa.add("addi", Forms::Plain, op_addi, D_IMM);
    isa.add("addis", Forms::Plain, op_addis, D_IMM);
    isa.add("addic", Forms::Rc, op_addic, D_IMM);
    isa.add("subfic", Forms::Plain, op_subfic, D_IMM);
    isa.add("and", Forms::Rc, op_and, X_LOGICAL);
    isa.add("or", Forms::Rc, op_or, X_LOGICAL);
    isa.add("xor", Forms::Rc, op_xor, X_LOGICAL);
    isa.add("cmp", Forms::Plain, op_cmp, CMP);
    isa.add("cmpl", Forms::Plain, op_cmpl, CMP);
    isa.add("cmpi", Forms::Plain, op_cmpi, CMPI);
    isa.add("cmpli", Forms::Plain, op_cmpli, CMPI);
}

fn rt(value: u64) -> SimResult<Outputs> {
    Ok(Outputs::new().with("RT", value))
}

fn ca(ops: &Operands) -> u64 {
    ops.get("CA") & 1
}

/// 16 位 SI 字段符号扩展
fn si(ctx: &ExecutionContext<'_>) -> u64 {
    exts(ctx.field("SI") & 0xffff, 16) as u64
}

/// `(RA|0)`
fn ra_or_zero(ctx: &ExecutionContext<'_>, ops: &Operands) -> u64 {
    if ctx.regnum("RA") == 0 { 0 } else { ops.get("RA") }
}

fn op_add(_: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    rt(ops.get("RA").wrapping_add(ops.get("RB")))
}

fn op_adde(_: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    rt(ops.get("RA").wrapping_add(ops.get("RB")).wrapping_add(ca(ops)))
}

fn op_subf(_: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    rt(ops.get("RB").wrapping_sub(ops.get("RA")))
}

fn op_subfe(_: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    rt((!ops.get("RA")).wrapping_add(ops.get("RB")).wrapping_add(ca(ops)))
}

fn op_addme(_: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    rt(ops.get("RA").wrapping_add(ca(ops)).wrapping_sub(1))
}

fn op_addze(_: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    rt(ops.get("RA").wrapping_add(ca(ops)))
}

fn op_subfme(_: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    rt((!ops.get("RA")).wrapping_add(ca(ops)).wrapping_sub(1))
}

fn op_subfze(_: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    rt((!ops.get("RA")).wrapping_add(ca(ops)))
}

fn op_neg(_: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    rt(ops.get("RA").wrapping_neg())
}

/// 除数为 0 时结果未定义（这里取 0）并报告溢出
fn op_divdu(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let m = mask(ctx.xlen);
    let (a, b) = (ops.get("RA") & m, ops.get("RB") & m);
    match a.checked_div(b) {
        Some(q) => Ok(Outputs::new().with("RT", q).with("overflow", 0)),
        None => Ok(Outputs::new().with("RT", 0).with("overflow", 1)),
    }
}

fn op_addi(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    rt(ra_or_zero(ctx, ops).wrapping_add(si(ctx)))
}

fn op_addis(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    rt(ra_or_zero(ctx, ops).wrapping_add(si(ctx) << 16))
}

fn op_addic(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    rt(ops.get("RA").wrapping_add(si(ctx)))
}

fn op_subfic(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    rt(si(ctx).wrapping_sub(ops.get("RA")))
}

fn op_and(_: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    Ok(Outputs::new().with("RA", ops.get("RS") & ops.get("RB")))
}

fn op_or(_: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    Ok(Outputs::new().with("RA", ops.get("RS") | ops.get("RB")))
}

fn op_xor(_: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    Ok(Outputs::new().with("RA", ops.get("RS") ^ ops.get("RB")))
}

/// 比较结果写入 `cr_out_field`，SO 取 XER.SO
fn compare(ctx: &mut ExecutionContext<'_>, a: u64, b: u64, signed: bool) -> SimResult<Outputs> {
    let bits = if ctx.field("L") == 0 { 32 } else { 64 };
    let ord = if signed {
        exts(a, bits).cmp(&exts(b, bits))
    } else {
        (a & mask(bits)).cmp(&(b & mask(bits)))
    };
    let flags = match ord {
        Ordering::Less => CR_LT,
        Ordering::Greater => CR_GT,
        Ordering::Equal => CR_EQ,
    };
    let so = if ctx.xer_bit(xer_bits::SO) { CR_SO } else { 0 };
    let mut cr = ctx.state.cr;
    cr.set_field(ctx.cr_out_field, flags | so)?;
    Ok(Outputs::new().with("CR", cr.value()))
}

fn op_cmp(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    compare(ctx, ops.get("RA"), ops.get("RB"), true)
}

fn op_cmpl(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    compare(ctx, ops.get("RA"), ops.get("RB"), false)
}

fn op_cmpi(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let imm = si(ctx);
    compare(ctx, ops.get("RA"), imm, true)
}

fn op_cmpli(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let imm = ctx.field("UI") & 0xffff;
    compare(ctx, ops.get("RA"), imm, false)
}

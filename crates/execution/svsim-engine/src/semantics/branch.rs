//! 分支：b、bc、bclr 以及向量化的 sv.bc
//!
//! sv.bc 对每个元素测试一次条件。ANY 模式下第一个成立的元素就跳转并结束
//! 循环；ALL 模式下第一个不成立的元素结束循环（不跳转），全部成立时
//! 在最后一个元素跳转。

use log::trace;
use svsim_core::bits::{exts, mask};
use svsim_core::{CrBit, SimResult};

use super::{Forms, ReferenceIsa, Spec};
use crate::context::ExecutionContext;
use crate::decoded::InsnForm;
use crate::insndb::{Operands, Outputs};

const BC: Spec = Spec {
    read: &["CTR"],
    write: &["CTR", "LR"],
    special: &["CTR", "LR"],
    fields: &["BO", "BI", "BD", "AA", "LK"],
    form: InsnForm::B,
};

const BCLR: Spec = Spec {
    read: &["CTR", "LR"],
    fields: &["BO", "BI", "BH", "LK"],
    form: InsnForm::X,
    ..BC
};

const B: Spec = Spec {
    read: &[],
    write: &["LR"],
    special: &["LR"],
    fields: &["LI", "AA", "LK"],
    form: InsnForm::Other,
};

pub(super) fn register(isa: &mut ReferenceIsa) {
    for name in ["b", "ba", "bl", "bla"] {
        isa.add(name, Forms::Plain, op_b, B);
    }
    for name in ["bc", "bca", "bcl", "bcla", "sv.bc", "sv.bca", "sv.bcl", "sv.bcla"] {
        isa.add(name, Forms::Plain, op_bc, BC);
    }
    for name in ["bclr", "bclrl", "sv.bclr", "sv.bclrl"] {
        isa.add(name, Forms::Plain, op_bclr, BCLR);
    }
}

fn link(ctx: &ExecutionContext<'_>, out: Outputs) -> Outputs {
    if ctx.field("LK") != 0 {
        out.with("LR", ctx.nia)
    } else {
        out
    }
}

fn op_b(ctx: &mut ExecutionContext<'_>, _: &Operands) -> SimResult<Outputs> {
    let disp = exts((ctx.field("LI") & 0xff_ffff) << 2, 26);
    let base = if ctx.field("AA") != 0 { 0 } else { ctx.cia };
    let out = link(ctx, Outputs::new());
    ctx.nia = base.wrapping_add_signed(disp);
    trace!("b -> {:#x}", ctx.nia);
    Ok(out)
}

/// BO/BI 条件测试，返回 `(成立, 新 CTR)`
///
/// BO_2=0 时先递减 CTR。`cr_in_field` 已经加上了元素偏移。
fn condition(ctx: &ExecutionContext<'_>, ctr: u64) -> SimResult<(bool, Option<u64>)> {
    let bo = ctx.field("BO");
    let bi = ctx.field("BI");
    let new_ctr = (bo & 0b00100 == 0).then(|| ctr.wrapping_sub(1));
    let ctr_ok = match new_ctr {
        None => true,
        Some(c) => ((c & mask(ctx.xlen)) != 0) != (bo & 0b00010 != 0),
    };
    let field = ctx.cr_in_field.unwrap_or((bi >> 2) as usize);
    let bit = ctx.state.cr.bit(field, CrBit::from_index((bi & 3) as u8))?;
    let cond_ok = bo & 0b10000 != 0 || bit == (bo & 0b01000 != 0);
    Ok((ctr_ok && cond_ok, new_ctr))
}

/// 决定本元素是否跳转，向量模式下同时决定是否结束循环
fn resolve(ctx: &mut ExecutionContext<'_>, taken: bool, target: u64) {
    let jump = if !ctx.is_svp64 {
        taken
    } else if ctx.insn().rm.branch_all {
        if !taken {
            ctx.end_loop = true;
        }
        taken && ctx.end_loop
    } else {
        if taken {
            ctx.end_loop = true;
        }
        taken
    };
    trace!(
        "branch taken={} jump={} end_loop={} target={:#x}",
        taken, jump, ctx.end_loop, target
    );
    if jump {
        ctx.nia = target;
    }
}

fn op_bc(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let (taken, new_ctr) = condition(ctx, ops.get("CTR"))?;
    let disp = exts((ctx.field("BD") & 0x3fff) << 2, 16);
    let base = if ctx.field("AA") != 0 { 0 } else { ctx.cia };
    let mut out = link(ctx, Outputs::new());
    if let Some(c) = new_ctr {
        out.set("CTR", c);
    }
    resolve(ctx, taken, base.wrapping_add_signed(disp));
    Ok(out)
}

fn op_bclr(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let (taken, new_ctr) = condition(ctx, ops.get("CTR"))?;
    let target = ops.get("LR") & !3;
    let mut out = link(ctx, Outputs::new());
    if let Some(c) = new_ctr {
        out.set("CTR", c);
    }
    resolve(ctx, taken, target);
    Ok(out)
}

//! MSR/SPR 搬移、陷阱字、rfid

use log::debug;
use svsim_core::bits::{exts, mask, msb0_mask, set_msb0_bit};
use svsim_core::consts::{msrb, pib, vector};
use svsim_core::{SimResult, SprId};

use super::{Forms, ReferenceIsa, Spec};
use crate::context::ExecutionContext;
use crate::decoded::InsnForm;
use crate::insndb::{Operands, Outputs};

const MTMSR: Spec = Spec {
    read: &["RS", "MSR"],
    write: &["MSR"],
    special: &["MSR"],
    fields: &["RS", "L"],
    form: InsnForm::X,
};

const TRAP_X: Spec = Spec {
    read: &["RA", "RB"],
    write: &[],
    special: &[],
    fields: &["TO", "RA", "RB"],
    form: InsnForm::X,
};

const TRAP_D: Spec = Spec {
    read: &["RA"],
    fields: &["TO", "RA", "SI"],
    form: InsnForm::D,
    ..TRAP_X
};

pub(super) fn register(isa: &mut ReferenceIsa) {
    isa.add(
        "mfmsr",
        Forms::Plain,
        op_mfmsr,
        Spec {
            read: &["MSR"],
            write: &["RT"],
            special: &["MSR"],
            fields: &["RT"],
            form: InsnForm::X,
        },
    );
    isa.add("mtmsr", Forms::Plain, op_mtmsr, MTMSR);
    isa.add("mtmsrd", Forms::Plain, op_mtmsrd, MTMSR);
    isa.add(
        "mfspr",
        Forms::Plain,
        op_mfspr,
        Spec {
            read: &[],
            write: &["RT"],
            special: &[],
            fields: &["RT", "SPR"],
            form: InsnForm::XFX,
        },
    );
    isa.add(
        "mtspr",
        Forms::Plain,
        op_mtspr,
        Spec {
            read: &["RS"],
            write: &[],
            special: &[],
            fields: &["RS", "SPR"],
            form: InsnForm::XFX,
        },
    );
    isa.add("tw", Forms::Plain, op_tw, TRAP_X);
    isa.add("td", Forms::Plain, op_td, TRAP_X);
    isa.add("twi", Forms::Plain, op_twi, TRAP_D);
    isa.add("tdi", Forms::Plain, op_tdi, TRAP_D);
    isa.add(
        "rfid",
        Forms::Plain,
        op_rfid,
        Spec {
            read: &["SRR0", "SRR1"],
            write: &["MSR"],
            special: &["SRR0", "SRR1", "MSR"],
            fields: &[],
            form: InsnForm::Other,
        },
    );
}

fn op_mfmsr(_: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    Ok(Outputs::new().with("RT", ops.get("MSR")))
}

/// L=1 时只搬移 EE 与 RI
fn partial_msr(msr: u64, rs: u64) -> u64 {
    let keep = msb0_mask(msrb::EE) | msb0_mask(msrb::RI);
    (msr & !keep) | (rs & keep)
}

fn op_mtmsr(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let (msr, rs) = (ops.get("MSR"), ops.get("RS"));
    let new = if ctx.field("L") != 0 {
        partial_msr(msr, rs)
    } else {
        (msr & !mask(32)) | (rs & mask(32))
    };
    Ok(Outputs::new().with("MSR", new))
}

/// HV 与 ME 不受 mtmsrd 影响
fn op_mtmsrd(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let (msr, rs) = (ops.get("MSR"), ops.get("RS"));
    let new = if ctx.field("L") != 0 {
        partial_msr(msr, rs)
    } else {
        let keep = msb0_mask(msrb::HV) | msb0_mask(msrb::ME);
        (msr & keep) | (rs & !keep)
    };
    Ok(Outputs::new().with("MSR", new))
}

fn spr_of(ctx: &ExecutionContext<'_>) -> SprId {
    SprId::from_number((ctx.field("SPR") & 0x3ff) as u16).canonical()
}

fn op_mfspr(ctx: &mut ExecutionContext<'_>, _: &Operands) -> SimResult<Outputs> {
    let id = spr_of(ctx);
    Ok(Outputs::new().with("RT", ctx.read_spr(id)))
}

fn op_mtspr(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let id = spr_of(ctx);
    debug!("mtspr {} <- {:#x}", id.name(), ops.get("RS"));
    ctx.write_spr(id, ops.get("RS"));
    Ok(Outputs::new())
}

/// TO 字段的五个条件：有符号小于/大于、相等、无符号小于/大于
fn trap_taken(to: u64, a: u64, b: u64, bits: u32) -> bool {
    let (sa, sb) = (exts(a, bits), exts(b, bits));
    let (ua, ub) = (a & mask(bits), b & mask(bits));
    (to & 0b10000 != 0 && sa < sb)
        || (to & 0b01000 != 0 && sa > sb)
        || (to & 0b00100 != 0 && ua == ub)
        || (to & 0b00010 != 0 && ua < ub)
        || (to & 0b00001 != 0 && ua > ub)
}

fn trap_word(ctx: &mut ExecutionContext<'_>, a: u64, b: u64, bits: u32) -> SimResult<Outputs> {
    if trap_taken(ctx.field("TO"), a, b, bits) {
        debug!("trap condition met at {:#x}", ctx.cia);
        ctx.trap(vector::PROGRAM, Some(pib::TRAP));
    }
    Ok(Outputs::new())
}

fn si(ctx: &ExecutionContext<'_>) -> u64 {
    exts(ctx.field("SI") & 0xffff, 16) as u64
}

fn op_tw(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    trap_word(ctx, ops.get("RA"), ops.get("RB"), 32)
}

fn op_td(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    trap_word(ctx, ops.get("RA"), ops.get("RB"), 64)
}

fn op_twi(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let imm = si(ctx);
    trap_word(ctx, ops.get("RA"), imm, 32)
}

fn op_tdi(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let imm = si(ctx);
    trap_word(ctx, ops.get("RA"), imm, 64)
}

/// 从中断返回：MSR <- SRR1，NIA <- SRR0
///
/// 返回问题状态时 EE、IR、DR 一并置位。
fn op_rfid(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let mut msr = ops.get("SRR1");
    if msr & msb0_mask(msrb::PR) != 0 {
        for bit in [msrb::EE, msrb::IR, msrb::DR] {
            msr = set_msb0_bit(msr, bit, true);
        }
    }
    ctx.nia = ops.get("SRR0") & !3;
    debug!("rfid -> {:#x} msr={:#x}", ctx.nia, msr);
    Ok(Outputs::new().with("MSR", msr))
}

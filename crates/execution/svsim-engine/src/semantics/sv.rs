//! SVP64 管理指令：setvl、svstep、svremap

use log::debug;
use svsim_core::consts::MAX_VL;
use svsim_core::{SimResult, SvState};

use super::{Forms, ReferenceIsa, Spec};
use crate::context::ExecutionContext;
use crate::decoded::InsnForm;
use crate::insndb::{Operands, Outputs};

pub(super) fn register(isa: &mut ReferenceIsa) {
    isa.add(
        "setvl",
        Forms::Plain,
        op_setvl,
        Spec {
            read: &["RA", "CTR", "SVSTATE"],
            write: &["SVSTATE", "RT"],
            special: &["CTR", "SVSTATE"],
            fields: &["RT", "RA", "SVi", "vf", "vs", "ms"],
            form: InsnForm::Svl,
        },
    );
    isa.add(
        "svstep",
        Forms::Plain,
        op_svstep,
        Spec {
            read: &["SVSTATE"],
            write: &["RT", "SVSTATE"],
            special: &["SVSTATE"],
            fields: &["RT", "SVi", "vf"],
            form: InsnForm::Svl,
        },
    );
    isa.add(
        "svremap",
        Forms::Plain,
        op_svremap,
        Spec {
            read: &["SVSTATE"],
            write: &["SVSTATE"],
            special: &["SVSTATE"],
            fields: &["SVme", "mi0", "mi1", "mi2", "mo0", "mo1", "pst"],
            form: InsnForm::Svrm,
        },
    );
}

/// 大于 127 时截断并报告溢出
fn clamp_vl(value: u64, overflow: &mut bool) -> u64 {
    let max = u64::from(MAX_VL);
    if value > max {
        *overflow = true;
        max
    } else {
        value
    }
}

/// 设置 MAXVL/VL
///
/// VL 的来源依次是：`vs=0` 时保持不变；RA 非 0 时取 RA；RT 也为 0 时取立即数；
/// 否则取 CTR。结果不超过 MAXVL，截断时 `overflow` 为 1。
fn op_setvl(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let vlimm = (ctx.field("SVi") & 0x7f) + 1;
    let ms = ctx.field("ms") != 0;
    let mut sv = SvState::from_u64(ops.get("SVSTATE"));
    let mvl = if ms {
        vlimm.min(u64::from(MAX_VL))
    } else {
        u64::from(sv.maxvl)
    };

    let mut overflow = false;
    let mut vl = if ctx.field("vs") == 0 {
        u64::from(sv.vl)
    } else if ctx.regnum("RA") != 0 {
        clamp_vl(ops.get("RA"), &mut overflow)
    } else if ctx.regnum("RT") == 0 {
        vlimm
    } else {
        clamp_vl(ops.get("CTR"), &mut overflow)
    };
    if vl > mvl {
        overflow = true;
        vl = mvl;
    }

    sv.maxvl = mvl as u8;
    sv.vl = vl as u8;
    if ms {
        sv.vfirst = ctx.field("vf") != 0;
        sv.persist = false;
    }
    debug!("setvl: MAXVL={} VL={} overflow={}", sv.maxvl, sv.vl, overflow);

    let mut out = Outputs::new().with("SVSTATE", sv.to_u64());
    if ctx.regnum("RT") != 0 {
        out.set("RT", vl);
    }
    out.set("overflow", u64::from(overflow));
    Ok(out)
}

/// 显式步进，或设置 pack/unpack
///
/// SVi 的 MSB0 第 3:4 位为 `0b11` 时，第 5、6 位分别写入 pack、unpack，
/// RT 返回这两位。否则按 SVi 选择的模式返回当前索引并请求前进一步。
fn op_svstep(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let svi = (ctx.field("SVi") & 0x7f) as u8;
    let mut sv = SvState::from_u64(ops.get("SVSTATE"));
    let rt = if (svi >> 2) & 0b11 == 0b11 {
        sv.pack = svi & 0b10 != 0;
        sv.unpack = svi & 0b01 != 0;
        (u64::from(sv.pack) << 1) | u64::from(sv.unpack)
    } else {
        let vf = (ctx.field("vf") & 1) as u8;
        ctx.svstate_next(svi, vf)
    };
    Ok(Outputs::new().with("RT", rt).with("SVSTATE", sv.to_u64()))
}

/// 设置 REMAP 角色分配
fn op_svremap(ctx: &mut ExecutionContext<'_>, ops: &Operands) -> SimResult<Outputs> {
    let f = |name: &str| (ctx.field(name) & 0b11) as u8;
    let mut sv = SvState::from_u64(ops.get("SVSTATE"));
    sv.mi0 = f("mi0");
    sv.mi1 = f("mi1");
    sv.mi2 = f("mi2");
    sv.mo0 = f("mo0");
    sv.mo1 = f("mo1");
    sv.sv_me = (ctx.field("SVme") & 0x1f) as u8;
    sv.persist = ctx.field("pst") != 0;
    Ok(Outputs::new().with("SVSTATE", sv.to_u64()))
}

//! 进位、溢出与比较辅助函数
//!
//! 加法类指令的 CA/CA32/OV/OV32 按操作数重建加法器输入后直接计算；
//! 其他指令用"某个输入无符号大于结果"的规则推出进位。

use svsim_core::bits::{exts, mask, msb0_bit};
use svsim_core::regs::{CR_EQ, CR_GT, CR_LT, CR_SO};
use svsim_core::{SimError, SimResult};

/// 一次加法产生的标志
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddFlags {
    pub ca: bool,
    pub ca32: bool,
    pub ov: bool,
    pub ov32: bool,
}

/// `width` 位加法的进位输出
fn carry_out(a: u64, b: u64, ca_in: bool, width: u32) -> bool {
    let m = u128::from(mask(width));
    let y = (u128::from(a) & m) + (u128::from(b) & m) + u128::from(ca_in);
    (y >> width) != 0
}

fn flags(a: u64, b: u64, ca_in: bool) -> AddFlags {
    let ca = carry_out(a, b, ca_in, 64);
    let ca32 = carry_out(a, b, ca_in, 32);
    AddFlags {
        ca,
        ca32,
        ov: ca != carry_out(a, b, ca_in, 63),
        ov32: ca32 != carry_out(a, b, ca_in, 31),
    }
}

/// 加法族指令的进位/溢出
///
/// # 参数
///
/// * `insn` - 助记符，可带 `.`
/// * `inputs` - 按操作数顺序排列的输入值（RA 在前）
/// * `si` - 16 位 SI 字段
/// * `ca`, `ov` - 指令执行前的 XER.CA 与 XER.OV
///
/// # 错误
///
/// 助记符不属于加法族时返回 [`SimError::UnknownInstruction`]
pub fn kludged_add_flags(
    insn: &str,
    inputs: &[u64],
    si: u64,
    ca: bool,
    ov: bool,
) -> SimResult<AddFlags> {
    let name = insn.strip_suffix('.').unwrap_or(insn);
    let in0 = inputs.first().copied().unwrap_or(0);
    let in1 = inputs.get(1).copied().unwrap_or(0);
    let si = exts(si & 0xffff, 16) as u64;

    let (a, b, ca_in) = match name {
        "add" | "addo" | "addc" | "addco" => (in0, in1, false),
        "addic" => (in0, si, false),
        "subf" | "subfo" | "subfc" | "subfco" => (!in0, in1, true),
        "subfic" => (!in0, si, true),
        "adde" | "addeo" => (in0, in1, ca),
        "subfe" | "subfeo" => (!in0, in1, ca),
        "addme" | "addmeo" => (in0, u64::MAX, ca),
        "addze" | "addzeo" => (in0, 0, ca),
        "subfme" | "subfmeo" => (!in0, u64::MAX, ca),
        "subfze" | "subfzeo" => (!in0, 0, ca),
        "addex" => {
            let c64 = carry_out(in0, in1, ov, 64);
            let c32 = carry_out(in0, in1, ov, 32);
            return Ok(AddFlags {
                ca: c64,
                ca32: c32,
                ov: c64,
                ov32: c32,
            });
        }
        "neg" | "nego" => (!in0, 0, true),
        _ => {
            return Err(SimError::UnknownInstruction(format!(
                "{} has no add carry rule",
                insn
            )));
        }
    };
    Ok(flags(a, b, ca_in))
}

/// 非加法指令的进位：任一输入无符号大于结果
///
/// 返回 `(CA, CA32)`。`is_add` 时 CA32 取结果、第一、第二输入第 32 位的异或。
pub fn generic_carry(
    inputs: &[u64],
    output: u64,
    invert_in: bool,
    imm: Option<u64>,
    is_add: bool,
    xlen: u32,
) -> (bool, bool) {
    let mut ins: Vec<u64> = inputs.to_vec();
    if invert_in && let Some(first) = ins.first_mut() {
        *first = !*first & mask(xlen);
    }
    ins.extend(imm);

    let ca = ins.iter().any(|&x| x > output);
    let ca32 = if is_add {
        let bit32 = |v: u64| v & (1 << 32) != 0;
        let a32 = ins.first().copied().is_some_and(bit32);
        let b32 = ins.get(1).copied().is_some_and(bit32);
        bit32(output) ^ a32 ^ b32
    } else {
        let lo = output & mask(32);
        ins.iter().any(|&x| (x & mask(32)) > lo)
    };
    (ca, ca32)
}

/// 两操作数有符号溢出，返回 `(OV, OV32)`，输入不足两个时返回 `None`
pub fn sign_overflow(inputs: &[u64], output: u64, bits: u32) -> Option<(bool, bool)> {
    let (&a, &b) = (inputs.first()?, inputs.get(1)?);
    let check = |w: u32| {
        let sa = exts(a, w) < 0;
        let sb = exts(b, w) < 0;
        let so = exts(output, w) < 0;
        sa == sb && so != sa
    };
    Some((check(bits), check(32)))
}

/// 有符号结果的 LT/GT/EQ 三位，位置与 CR 字段一致，SO 位为 0
pub fn compare_flags(result: u64, bits: u32) -> u8 {
    let v = exts(result, bits);
    if v < 0 {
        CR_LT
    } else if v > 0 {
        CR_GT
    } else {
        CR_EQ
    }
}

/// 浮点 Rc=1 的默认 CR1：FX、FEX、VX、OX
pub fn fpscr_cr1(fpscr: u64) -> u8 {
    [32u32, 33, 34, 35]
        .iter()
        .fold(0u8, |acc, &bit| (acc << 1) | u8::from(msb0_bit(fpscr, bit)))
}

/// 带 SO 的完整 CR 字段
pub fn cr_field(result: u64, bits: u32, so: bool) -> u8 {
    compare_flags(result, bits) | if so { CR_SO } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_carry() {
        let f = kludged_add_flags("add", &[u64::MAX, 1], 0, false, false).unwrap();
        assert!(f.ca);
        assert!(f.ca32);
        assert!(!f.ov);

        let f = kludged_add_flags("addo.", &[i64::MAX as u64, 1], 0, false, false).unwrap();
        assert!(f.ov);
        assert!(!f.ca);
    }

    #[test]
    fn test_subf_carry_means_no_borrow() {
        // 5 - 3
        let f = kludged_add_flags("subfc", &[3, 5], 0, false, false).unwrap();
        assert!(f.ca);
        // 3 - 5
        let f = kludged_add_flags("subfc", &[5, 3], 0, false, false).unwrap();
        assert!(!f.ca);
    }

    #[test]
    fn test_addic_sign_extends_si() {
        // 1 + (-1)
        let f = kludged_add_flags("addic", &[1], 0xffff, false, false).unwrap();
        assert!(f.ca);
        let f = kludged_add_flags("addic.", &[0], 0xffff, false, false).unwrap();
        assert!(!f.ca);
    }

    #[test]
    fn test_adde_uses_carry_in() {
        let f = kludged_add_flags("adde", &[u64::MAX, 0], 0, true, false).unwrap();
        assert!(f.ca);
        let f = kludged_add_flags("adde", &[u64::MAX, 0], 0, false, false).unwrap();
        assert!(!f.ca);
    }

    #[test]
    fn test_unknown_add_rule() {
        assert!(matches!(
            kludged_add_flags("mulld", &[1, 2], 0, false, false),
            Err(SimError::UnknownInstruction(_))
        ));
    }

    #[test]
    fn test_generic_carry() {
        assert_eq!(generic_carry(&[5, 3], 2, false, None, false, 64), (true, true));
        assert_eq!(generic_carry(&[1, 1], 2, false, None, false, 64), (false, false));
        let (_, ca32) = generic_carry(&[1 << 32, 0], 0, false, None, true, 64);
        assert!(ca32);
    }

    #[test]
    fn test_sign_overflow() {
        let max = i64::MAX as u64;
        assert_eq!(
            sign_overflow(&[max, 1], max.wrapping_add(1), 64),
            Some((true, false))
        );
        assert_eq!(sign_overflow(&[1], 2, 64), None);
        let m32 = i32::MAX as u64;
        assert_eq!(sign_overflow(&[m32, 1], m32 + 1, 64), Some((false, true)));
    }

    #[test]
    fn test_compare_flags() {
        assert_eq!(compare_flags(0, 64), CR_EQ);
        assert_eq!(compare_flags(5, 64), CR_GT);
        assert_eq!(compare_flags(u64::MAX, 64), CR_LT);
        assert_eq!(compare_flags(0x8000_0000, 32), CR_LT);
        assert_eq!(cr_field(0, 64, true), CR_EQ | CR_SO);
    }

    #[test]
    fn test_fpscr_cr1() {
        // FX and OX
        let fpscr = (1u64 << 31) | (1u64 << 28);
        assert_eq!(fpscr_cr1(fpscr), 0b1001);
    }
}

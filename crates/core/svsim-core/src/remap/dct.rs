//! 原地迭代 DCT 的调度
//!
//! 四种调度：内层蝶形、外层蝶形（迭代求和）、内层余弦表、半交换加载/存储。
//! 位反转和半反转只交换"引用的索引"，不移动数据。
//!
//! 所有 DCT 调度要求 n 为 2 的幂。

use super::{RemapStep, ShapeParams, loopend_bits, power_sizes};
use crate::error::{SimError, SimResult};

/// `val` 的低 `width` 位反转
pub fn reverse_bits(val: u32, width: u32) -> u32 {
    let mut v = val;
    let mut result = 0;
    for _ in 0..width {
        result = (result << 1) | (v & 1);
        v >>= 1;
    }
    result
}

fn bit_length(v: u32) -> u32 {
    32 - v.leading_zeros()
}

/// 迭代形式的半反转
///
/// `pre_rev` 时取 `vec[i ^ (i >> 1)]`（格雷码），否则取其逆变换。
/// 长度应为 2 的幂，越界的源位置保留原元素。
pub fn halfrev2(vec: &[u32], pre_rev: bool) -> Vec<u32> {
    (0..vec.len())
        .map(|i| {
            let src = if pre_rev {
                i ^ (i >> 1)
            } else {
                let bl = bit_length(i as u32);
                (1..bl).fold(i, |ri, shift| ri ^ (i >> shift))
            };
            vec.get(src).copied().unwrap_or(vec[i])
        })
        .collect()
}

fn lookup(table: &[u32], idx: u32) -> SimResult<u32> {
    table
        .get(idx as usize)
        .copied()
        .ok_or_else(|| SimError::Remap(format!("DCT index {} outside table of {}", idx, table.len())))
}

fn check_size(n: u32) -> SimResult<()> {
    if n.is_power_of_two() {
        Ok(())
    } else {
        Err(SimError::Remap(format!("DCT size {} is not a power of two", n)))
    }
}

fn bitrev_table(n: u32) -> Vec<u32> {
    let levels = bit_length(n).saturating_sub(1);
    (0..n).map(|i| reverse_bits(i, levels)).collect()
}

fn identity(n: u32) -> Vec<u32> {
    (0..n).collect()
}

fn emit(p: &ShapeParams, result: u32, loopends: u8) -> RemapStep {
    RemapStep::new(result * p.lims[2] + p.offset, loopends)
}

/// 内层蝶形（ydimsz 2 或 4）
///
/// 子模式 01 为 DCT（位反转 + 半反转），11 为 iDCT。
/// 每个 i 块结束后对 ji 做原地交换。
pub fn dct_inner_butterfly(p: &ShapeParams) -> SimResult<Vec<RemapStep>> {
    let n = p.lims[0];
    let mode = p.lims[1];
    check_size(n)?;
    let mut sizes = power_sizes(n);
    if p.inv[0] {
        sizes.reverse();
    }
    if sizes.is_empty() {
        return Ok(Vec::new());
    }

    let ri = if p.submode == 0b01 {
        bitrev_table(n)
    } else {
        identity(n)
    };
    let mut ji = identity(n);
    match p.submode {
        0b01 => ji = halfrev2(&ji, true),
        0b11 => ji = halfrev2(&ji, false),
        _ => {}
    }

    let mut out = Vec::new();
    let mut k_start = 0u32;
    for (si, &size) in sizes.iter().enumerate() {
        let x_end = si + 1 == sizes.len();
        let halfsize = size / 2;
        let mut ys: Vec<u32> = (0..n).step_by(size as usize).collect();
        if p.inv[1] {
            ys.reverse();
        }
        for (yi, &i) in ys.iter().enumerate() {
            let y_end = yi + 1 == ys.len();
            let mut j: Vec<u32> = (i..i + halfsize).collect();
            let mut jr: Vec<u32> = (i + halfsize..i + size).rev().collect();
            if p.inv[2] {
                j.reverse();
                jr.reverse();
            }
            let mut k = k_start;
            for (ci, (&jl, &jh)) in j.iter().zip(jr.iter()).enumerate() {
                let z_end = ci + 1 == j.len();
                let result = match p.skip {
                    0b00 if p.submode == 0b11 => lookup(&ji, lookup(&ri, jl)?)?,
                    0b00 => lookup(&ri, lookup(&ji, jl)?)?,
                    0b01 if p.submode == 0b11 => lookup(&ji, lookup(&ri, jl + halfsize)?)?,
                    0b01 => lookup(&ri, lookup(&ji, jh)?)?,
                    // 预生成余弦表时取表偏移，否则取系数序号
                    0b10 if mode == 4 => k,
                    0b10 => ci as u32,
                    _ => size,
                };
                out.push(emit(p, result, loopend_bits(z_end, y_end, x_end)));
                k += 1;
            }

            let hz2 = (halfsize / 2) as usize;
            for (&jl, &jh) in j.iter().zip(jr.iter()).take(hz2) {
                let jlh = (jl + halfsize) as usize;
                let jh = jh as usize;
                if jlh < ji.len() && jh < ji.len() {
                    ji.swap(jlh, jh);
                }
            }
        }
        k_start += halfsize;
    }
    Ok(out)
}

/// 外层蝶形（ydimsz 3）：size 从 n/2 递减到 2 的迭代求和调度
pub fn dct_outer_butterfly(p: &ShapeParams) -> SimResult<Vec<RemapStep>> {
    let n = p.lims[0];
    let mode = p.lims[1];
    check_size(n)?;
    let mut sizes = Vec::new();
    let mut size = n / 2;
    while size >= 2 {
        sizes.push(size);
        size /= 2;
    }
    if p.inv[0] {
        sizes.reverse();
    }
    if sizes.is_empty() {
        return Ok(Vec::new());
    }

    let ri = if matches!(p.submode, 0b01 | 0b11) {
        bitrev_table(n)
    } else {
        identity(n)
    };
    let ji = if p.submode == 0b11 {
        halfrev2(&identity(n), false)
    } else {
        identity(n)
    };
    let idct = p.submode == 0b11;
    let pick = |idx: u32| -> SimResult<u32> {
        if idct {
            lookup(&ji, lookup(&ri, idx)?)
        } else {
            lookup(&ri, lookup(&ji, idx)?)
        }
    };

    let mut out = Vec::new();
    let mut k_start = 0u32;
    for (si, &size) in sizes.iter().enumerate() {
        let x_end = si + 1 == sizes.len();
        let halfsize = size / 2;
        let mut ys: Vec<u32> = (0..halfsize).collect();
        if p.inv[1] {
            ys.reverse();
        }
        for (yi, &i) in ys.iter().enumerate() {
            let y_end = yi + 1 == ys.len();
            let mut jr: Vec<u32> = (i + halfsize..i + n - halfsize)
                .step_by(size as usize)
                .collect();
            if p.inv[2] {
                jr.reverse();
            }
            let mut k = k_start;
            for (ci, &jh) in jr.iter().enumerate() {
                let z_end = ci + 1 == jr.len();
                let result = match p.skip {
                    0b00 => pick(jh)?,
                    0b01 => pick(jh + size)?,
                    0b10 if mode == 4 => k,
                    0b10 => ci as u32,
                    _ => size,
                };
                out.push(emit(p, result, loopend_bits(z_end, y_end, x_end)));
                k += 1;
            }
        }
        k_start += halfsize;
    }
    Ok(out)
}

/// 内层余弦表（ydimsz 5 或 13）
///
/// 只有 size 和 j 两层循环，最内层结束位恒为 1。
/// k 在每个周期开始时归零。
pub fn dct_inner_costable(p: &ShapeParams) -> SimResult<Vec<RemapStep>> {
    let n = p.lims[0];
    check_size(n)?;
    let mut sizes = power_sizes(n);
    if p.inv[0] {
        sizes.reverse();
    }

    let mut out = Vec::new();
    let mut k = 0u32;
    for (si, &size) in sizes.iter().enumerate() {
        let x_end = si + 1 == sizes.len();
        let halfsize = size / 2;
        // 结果只依赖位置序号，j 的方向不影响输出
        for ci in 0..halfsize {
            let y_end = ci + 1 == halfsize;
            let result = match p.skip {
                0b10 => ci,
                0b11 => size,
                _ => k,
            };
            out.push(emit(p, result, loopend_bits(true, y_end, x_end)));
            k += 1;
        }
    }
    Ok(out)
}

/// 半交换加载/存储（ydimsz 6、14 或 15）
///
/// 产生 `jl * stride`，不加 offset；只有最后一项带结束位。
pub fn halfswap_loadstore(p: &ShapeParams) -> SimResult<Vec<RemapStep>> {
    let n = p.lims[0];
    let stride = p.lims[2];
    check_size(n)?;
    let ri = bitrev_table(n);
    let bitrev = |v: &[u32]| -> SimResult<Vec<u32>> {
        ri.iter().map(|&r| lookup(v, r)).collect()
    };

    let ident = identity(n);
    let mut ji = if p.mode == 0b01 {
        bitrev(&ident)?
    } else if p.submode == 0b001 {
        halfrev2(&bitrev(&ident)?, true)
    } else {
        bitrev(&halfrev2(&ident, false))?
    };
    if p.inv[0] {
        ji.reverse();
    }

    let last = ji.len().saturating_sub(1);
    Ok(ji
        .iter()
        .enumerate()
        .map(|(i, &jl)| RemapStep::new(jl * stride, if i == last { 0b111 } else { 0 }))
        .collect())
}

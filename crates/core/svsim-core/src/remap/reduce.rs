//! 并行归约调度（mode 0b10）
//!
//! skip 00/01：树形归约，分别产生左/右操作数索引，可带谓词；
//! skip 10/11：work-efficient 前缀和，分别产生 lhs/rhs 索引。

use super::{RemapStep, ShapeParams};

fn is_active(pred: Option<u64>, idx: u32) -> bool {
    match pred {
        None => true,
        Some(mask) => idx < 64 && mask & (1u64 << idx) != 0,
    }
}

/// 树形归约：每一轮把距离为 step/2 的两个活跃元素合并到左侧
///
/// `pred` 为 `None` 时全部元素活跃。被屏蔽的左元素由右侧的活跃元素顶替。
pub fn preduce_indices(p: &ShapeParams, pred: Option<u64>) -> Vec<RemapStep> {
    let xd = p.lims[0];
    let mut ix: Vec<u32> = (0..xd).collect();
    if p.inv[0] {
        ix.reverse();
    }
    let mut steps = Vec::new();
    let mut step = 1u32;
    while step < xd {
        step *= 2;
        steps.push(step);
    }
    if p.inv[1] {
        steps.reverse();
    }

    let mut out = Vec::new();
    for (si, &step) in steps.iter().enumerate() {
        let stepend = si + 1 == steps.len();
        let first = out.len();
        for i in (0..xd).step_by(step as usize) {
            let other = i + step / 2;
            let ci = ix[i as usize];
            let oi = ix.get(other as usize).copied();
            let other_active = oi.is_some_and(|oi| is_active(pred, oi));
            match oi {
                Some(oi) if other_active && is_active(pred, ci) => {
                    let result = if p.skip == 0b01 { oi } else { ci };
                    out.push(RemapStep::new(result + p.offset, 0));
                }
                Some(oi) if other_active => ix[i as usize] = oi,
                _ => {}
            }
        }
        if out.len() > first
            && let Some(last) = out.last_mut()
        {
            last.loopends = (u8::from(stepend) << 1) | 1;
        }
    }
    out
}

/// work-efficient 前缀和的 (lhs, rhs) 对，按行分组
fn prefix_sum_rows(n: u32) -> Vec<Vec<(u32, u32)>> {
    let mut rows = Vec::new();
    let mut dist = 1u32;
    while dist < n {
        let row: Vec<(u32, u32)> = (2 * dist - 1..n)
            .step_by((2 * dist) as usize)
            .rev()
            .map(|i| (i - dist, i))
            .collect();
        rows.push(row);
        dist <<= 1;
    }
    dist >>= 1;
    while dist >= 1 {
        let row: Vec<(u32, u32)> = (3 * dist - 1..n)
            .step_by((2 * dist) as usize)
            .rev()
            .map(|i| (i - dist, i))
            .collect();
        rows.push(row);
        dist >>= 1;
    }
    rows.retain(|r| !r.is_empty());
    rows
}

/// 前缀和调度：`items[rhs] = items[lhs] + items[rhs]`
pub fn prefix_sum_indices(p: &ShapeParams) -> Vec<RemapStep> {
    let n = p.lims[0];
    let map = |i: u32| p.offset + if p.inv[0] { n - 1 - i } else { i };
    let rows = prefix_sum_rows(n);
    let nrows = rows.len();
    let mut out = Vec::new();
    for (ri, row) in rows.iter().enumerate() {
        for (oi, &(lhs, rhs)) in row.iter().enumerate() {
            let index = if p.skip == 0b10 { map(lhs) } else { map(rhs) };
            let loopends = if oi + 1 == row.len() {
                (u8::from(ri + 1 == nrows) << 1) | 1
            } else {
                0
            };
            out.push(RemapStep::new(index, loopends));
        }
    }
    out
}

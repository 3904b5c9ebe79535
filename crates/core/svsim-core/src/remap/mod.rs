//! REMAP 索引调度
//!
//! 每个 SVSHAPE 描述一个索引生成调度（矩阵遍历、FFT/DCT 蝶形、并行归约）。
//! 调度按周期预先展开成 `Vec<RemapStep>`，由 [`RemapCursor`] 以显式位置
//! 遍历，周期结束后回绕，因此游标状态可以直接序列化、检查和恢复。
//!
//! `loopends` 位：bit0 = 最内层维度结束，bit1 = 中间层，bit2 = 整个调度结束。

mod dct;
mod fft;
mod matrix;
mod reduce;

pub use dct::{
    dct_inner_butterfly, dct_inner_costable, dct_outer_butterfly, halfrev2, halfswap_loadstore,
    reverse_bits,
};
pub use fft::fft_butterfly;
pub use matrix::matrix_indices;
pub use reduce::{prefix_sum_indices, preduce_indices};

use serde::{Deserialize, Serialize};

/// 全部维度结束
pub const LOOPEND_ALL: u8 = 0b111;

/// 调度中的一项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemapStep {
    /// 重映射后的元素索引
    pub index: u32,
    /// 维度结束标志
    pub loopends: u8,
}

impl RemapStep {
    pub const fn new(index: u32, loopends: u8) -> Self {
        Self { index, loopends }
    }
}

/// 调度生成器的输入，已从 SVSHAPE 编码中解出
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeParams {
    /// 维度大小（已加 1）
    pub lims: [u32; 3],
    /// 矩阵模式的维度嵌套顺序
    pub order: [usize; 3],
    /// 各维度是否反向
    pub inv: [bool; 3],
    pub skip: u8,
    pub offset: u32,
    pub mode: u8,
    /// permute 字段原值，DCT 族用作子模式
    pub submode: u8,
}

impl Default for ShapeParams {
    fn default() -> Self {
        Self {
            lims: [1, 1, 1],
            order: [0, 1, 2],
            inv: [false; 3],
            skip: 0,
            offset: 0,
            mode: 0,
            submode: 0,
        }
    }
}

/// 三层循环的结束标志组合
#[inline]
pub(crate) fn loopend_bits(inner: bool, middle: bool, outer: bool) -> u8 {
    u8::from(inner) | (u8::from(inner && middle) << 1) | (u8::from(inner && middle && outer) << 2)
}

/// 2, 4, 8, ... ≤ n
pub(crate) fn power_sizes(n: u32) -> Vec<u32> {
    let mut sizes = Vec::new();
    let mut size = 2u32;
    while size <= n {
        sizes.push(size);
        size *= 2;
    }
    sizes
}

/// 可恢复的 REMAP 游标
///
/// 周期性地产生 `(index, loopends)`。空调度（例如 FFT 的 n=1）不产生任何项。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemapCursor {
    schedule: Vec<RemapStep>,
    /// 第一个周期从这一项开始（FFT 的 offset 跳过）
    start: usize,
    pos: usize,
}

impl RemapCursor {
    pub fn new(schedule: Vec<RemapStep>) -> Self {
        Self::with_start(schedule, 0)
    }

    pub fn with_start(schedule: Vec<RemapStep>, start: usize) -> Self {
        let start = if schedule.is_empty() {
            0
        } else {
            start % schedule.len()
        };
        Self {
            schedule,
            start,
            pos: 0,
        }
    }

    /// 一个周期的长度
    pub fn period(&self) -> usize {
        self.schedule.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedule.is_empty()
    }

    /// 第 `n` 次迭代产生的项
    pub fn step_at(&self, n: usize) -> Option<RemapStep> {
        if self.schedule.is_empty() {
            return None;
        }
        let len = self.schedule.len();
        self.schedule.get((self.start + n % len) % len).copied()
    }

    pub fn peek(&self) -> Option<RemapStep> {
        self.step_at(self.pos)
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    pub fn schedule(&self) -> &[RemapStep] {
        &self.schedule
    }
}

impl Iterator for RemapCursor {
    type Item = RemapStep;

    fn next(&mut self) -> Option<RemapStep> {
        let item = self.step_at(self.pos)?;
        self.pos = (self.pos + 1) % self.schedule.len();
        Some(item)
    }
}

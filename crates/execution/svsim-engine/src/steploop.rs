//! 元素步进调度器
//!
//! 状态是 `(srcstep, ssubstep, dststep, dsubstep)` 四元组。源、目标两半结构
//! 相同：双谓词指令两边各自跳过被屏蔽的元素，单谓词指令两边同步前进。
//!
//! 每条指令的流程：
//!
//! 1. [`StepLoop::pre_inc`] 计算掩码，跳过被屏蔽的元素，结果缓存在 `new`
//! 2. [`StepLoop::update_new_steps`] 把缓存写回 SVSTATE，并判断循环是否已经跑完
//! 3. 指令执行后 [`StepLoop::advance`] 前进到下一个元素
//!
//! `pack`/`unpack` 为真时子步进是外层循环，否则是内层循环。

use log::{trace, warn};
use serde::{Deserialize, Serialize};
use svsim_core::remap::LOOPEND_ALL;
use svsim_core::{
    CrFile, MaskPolicy, PredicateConfig, PredicateMask, RegFile, RemapCursor, RemapStep, SimResult,
    SvShape, SvState,
};

/// 四个步进计数器
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepState {
    pub srcstep: u8,
    pub ssubstep: u8,
    pub dststep: u8,
    pub dsubstep: u8,
}

impl StepState {
    pub fn from_svstate(sv: &SvState) -> Self {
        Self {
            srcstep: sv.srcstep,
            ssubstep: sv.ssubstep,
            dststep: sv.dststep,
            dsubstep: sv.dsubstep,
        }
    }

    pub fn apply(&self, sv: &mut SvState) {
        sv.srcstep = self.srcstep;
        sv.ssubstep = self.ssubstep;
        sv.dststep = self.dststep;
        sv.dsubstep = self.dsubstep;
    }
}

/// 一次步进所需的循环参数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepConfig {
    pub vl: u8,
    /// SUBVL-1
    pub subvl: u8,
    pub pack: bool,
    pub unpack: bool,
    pub src: PredicateMask,
    pub dst: PredicateMask,
}

/// 跳过被屏蔽元素的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Skipped {
    pub step: u8,
    /// 置零策略下当前元素被屏蔽
    pub zero: bool,
    /// 跳过策略下掩码全零，循环立即结束
    pub empty: bool,
}

/// 从 `step` 开始跳过被屏蔽的元素，最多走到 `vl`
pub fn skip_masked(step: u8, mask: &PredicateMask, vl: u8) -> Skipped {
    let mut step = step;
    let mut empty = false;
    if mask.policy == MaskPolicy::Skip {
        empty = mask.mask == 0;
        while !mask.is_active(usize::from(step)) && step < vl {
            step += 1;
        }
    }
    Skipped {
        step,
        zero: mask.zeroing(usize::from(step)),
        empty,
    }
}

/// 一侧前进一个元素，返回 `(step, substep, loopend)`
///
/// `sub_outer` 为真时子步进在外层：主步进先走完整个 VL 再递增子步进。
fn iterate_side(
    step: u8,
    substep: u8,
    vl: u8,
    subvl: u8,
    sub_outer: bool,
    mask: &PredicateMask,
) -> (u8, u8, bool) {
    let last = vl.saturating_sub(1);
    let end_sub = substep == subvl;
    let skip = mask.policy == MaskPolicy::Skip;
    let mut step = step;
    let mut substep = substep;
    let mut loopend = false;

    // 主步进前进，跳过被屏蔽的元素；走过末尾时回到 0
    let walk = |step: &mut u8| -> bool {
        loop {
            if *step >= last {
                *step = 0;
                return true;
            }
            *step += 1;
            if !skip || mask.is_active(usize::from(*step)) {
                return false;
            }
        }
    };

    if sub_outer {
        if walk(&mut step) {
            if end_sub {
                loopend = true;
            } else {
                substep += 1;
            }
        }
    } else if end_sub {
        loopend = walk(&mut step);
        substep = 0;
    } else {
        substep += 1;
    }
    (step, substep, loopend)
}

/// 源、目标各前进一个元素，返回新状态与是否走完
pub fn advance(state: StepState, cfg: &StepConfig) -> (StepState, bool) {
    let (srcstep, ssubstep, src_end) = iterate_side(
        state.srcstep,
        state.ssubstep,
        cfg.vl,
        cfg.subvl,
        cfg.pack,
        &cfg.src,
    );
    let (dststep, dsubstep, dst_end) = iterate_side(
        state.dststep,
        state.dsubstep,
        cfg.vl,
        cfg.subvl,
        cfg.unpack,
        &cfg.dst,
    );
    let next = StepState {
        srcstep,
        ssubstep,
        dststep,
        dsubstep,
    };
    (next, src_end || dst_end)
}

/// 任一侧位于最后一个元素且子步进已到最大
pub fn at_loopend(state: &StepState, vl: u8, subvl: u8) -> bool {
    let last = vl.wrapping_sub(1);
    (state.srcstep == last && state.ssubstep == subvl)
        || (state.dststep == last && state.dsubstep == subvl)
}

/// 调度器的可变簿记
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepLoop {
    /// `pre_inc` 跳过之后的计数器
    pub new: StepState,
    pub loopend: bool,
    pub subvl: u8,
    pub src_mask: PredicateMask,
    pub dst_mask: PredicateMask,
    pub pred_src_zero: bool,
    pub pred_dst_zero: bool,
    remap_idxs: [u32; 4],
    remap_loopends: [u8; 4],
    /// 按 SVSHAPE 值缓存的游标
    cursors: [Option<(u32, RemapCursor)>; 4],
}

impl StepLoop {
    pub fn new() -> Self {
        let mut s = Self::default();
        s.reset_remaps();
        s
    }

    pub fn remap_idxs(&self) -> [u32; 4] {
        self.remap_idxs
    }

    pub fn remap_loopends(&self) -> [u8; 4] {
        self.remap_loopends
    }

    fn config(&self, sv: &SvState) -> StepConfig {
        StepConfig {
            vl: sv.vl,
            subvl: self.subvl,
            pack: sv.pack,
            unpack: sv.unpack,
            src: self.src_mask,
            dst: self.dst_mask,
        }
    }

    /// 计算掩码并跳过当前被屏蔽的元素
    ///
    /// 不修改子步进，也不写回 SVSTATE。
    pub fn pre_inc(
        &mut self,
        sv: &SvState,
        pred: &PredicateConfig,
        subvl: u8,
        gpr: &RegFile,
        cr: &CrFile,
    ) -> SimResult<()> {
        self.subvl = subvl;
        self.src_mask = pred.read_src_mask(gpr, cr, sv.vl)?;
        self.dst_mask = pred.read_dst_mask(gpr, cr, sv.vl)?;

        let src = skip_masked(sv.srcstep, &self.src_mask, sv.vl);
        let dst = skip_masked(sv.dststep, &self.dst_mask, sv.vl);
        if src.empty || dst.empty {
            self.loopend = true;
        }
        self.new = StepState {
            srcstep: src.step,
            ssubstep: sv.ssubstep,
            dststep: dst.step,
            dsubstep: sv.dsubstep,
        };
        self.pred_src_zero = src.zero;
        self.pred_dst_zero = dst.zero;
        trace!(
            "pre_inc: vl={} subvl={} steps {:?} zero src={} dst={} loopend={}",
            sv.vl, subvl, self.new, src.zero, dst.zero, self.loopend
        );
        Ok(())
    }

    /// 把跳过后的计数器写回 SVSTATE
    ///
    /// 返回真表示元素循环已经结束（掩码全零或跳到了 VL），本条指令不再执行。
    pub fn update_new_steps(&self, sv: &mut SvState) -> bool {
        self.new.apply(sv);
        if self.loopend {
            return true;
        }
        (sv.ssubstep == self.subvl && sv.srcstep == sv.vl)
            || (sv.dsubstep == self.subvl && sv.dststep == sv.vl)
    }

    /// 前进到下一个元素，循环已结束时什么也不做
    pub fn advance(&mut self, sv: &mut SvState) {
        if self.loopend {
            return;
        }
        let before = StepState::from_svstate(sv);
        let (next, end) = advance(before, &self.config(sv));
        next.apply(sv);
        self.loopend = end;
        trace!("advance: {:?} -> {:?} loopend={}", before, next, end);
    }

    /// 基于缓存（而不是 SVSTATE 中）的计数器判断是否是最后一个元素
    pub fn at_loopend(&self, vl: u8) -> bool {
        at_loopend(&self.new, vl, self.subvl)
    }

    /// 循环结束：四个计数器清零
    pub fn reset(&mut self, sv: &mut SvState) {
        sv.reset_steps();
        self.loopend = false;
        trace!("loop reset");
    }

    pub fn reset_remaps(&mut self) {
        self.remap_idxs = [0, 1, 2, 3];
        self.remap_loopends = [0; 4];
    }

    fn schedule_step(
        &mut self,
        slot: usize,
        shape: &SvShape,
        step: u32,
    ) -> SimResult<Option<RemapStep>> {
        let value = shape.to_u32();
        let entry = &mut self.cursors[slot];
        if entry.as_ref().is_none_or(|(v, _)| *v != value) {
            *entry = Some((value, shape.cursor()?));
        }
        Ok(entry.as_ref().and_then(|(_, c)| c.step_at(step as usize)))
    }

    /// 为四个 SVSHAPE 槽计算当前步的 REMAP 索引与循环结束位
    ///
    /// 槽 3 按 dststep 取值，其余按 srcstep。索引形状再经过 GPR 查表。
    pub fn compute_remap_indices(
        &mut self,
        sv: &SvState,
        shapes: &[SvShape; 4],
        gpr: &RegFile,
    ) -> SimResult<()> {
        self.reset_remaps();
        for (i, shape) in shapes.iter().enumerate() {
            let step = u32::from(if i == 3 { sv.dststep } else { sv.srcstep });
            let item = match self.schedule_step(i, shape, step)? {
                Some(s) => s,
                None => {
                    warn!(
                        "SVSHAPE{} {:#010x} produced an empty schedule",
                        i,
                        shape.to_u32()
                    );
                    RemapStep::new(step, LOOPEND_ALL)
                }
            };
            self.remap_idxs[i] = shape.postprocess(item.index, step, gpr)?;
            self.remap_loopends[i] = item.loopends;
            trace!(
                "remap SVSHAPE{} step={} -> idx={} ends={:03b}",
                i, step, self.remap_idxs[i], item.loopends
            );
        }
        Ok(())
    }
}

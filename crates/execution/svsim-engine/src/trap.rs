//! 陷阱入口
//!
//! 纯状态变换：保存 CIA/MSR/SVSTATE，改写 MSR，计算重定位后的向量地址。
//! 本身从不产生新的陷阱。

use log::info;
use svsim_core::bits::set_msb0_bit;
use svsim_core::consts::{KAIVB_LOW_BITS, TRAP_MSR_CLEAR, TRAP_MSR_SET};
use svsim_core::SprId;

use crate::state::CpuState;

/// 进入陷阱，返回新的 NIA
///
/// # 参数
///
/// * `vector` - 陷阱向量（0x300、0x400、0x600、0x700……）
/// * `cause` - 写入 SRR1 的原因位（MSB0），`None` 不写
/// * `is_svp64` - 当前指令带 SVP64 前缀时同时保存 SVSTATE 到 SVSRR0
pub fn enter(state: &mut CpuState, vector: u64, cause: Option<u32>, is_svp64: bool) -> u64 {
    let kaivb = state.spr.get(SprId::Kaivb);
    let msr = state.msr;

    state.spr.set(SprId::Srr0, state.pc.cia);
    let srr1 = match cause {
        Some(bit) => set_msb0_bit(msr, bit, true),
        None => msr,
    };
    state.spr.set(SprId::Srr1, srr1);
    if is_svp64 {
        state.spr.set(SprId::SvSrr0, state.svstate.to_u64());
    }

    state.msr = (msr & !TRAP_MSR_CLEAR) | TRAP_MSR_SET;
    let nia = vector | (kaivb & !KAIVB_LOW_BITS);
    info!(
        "trap {:#x} cause={:?} at {:#x}: srr1={:#x} -> nia {:#x}",
        vector, cause, state.pc.cia, srr1, nia
    );
    nia
}

#[cfg(test)]
mod tests {
    use super::*;
    use svsim_core::bits::{msb0_bit, msb0_mask};
    use svsim_core::consts::{msrb, pib};
    use svsim_core::{Config, SimConfig, SvState};

    #[test]
    fn test_enter_saves_and_masks() {
        let mut s = CpuState::new(&SimConfig::defaults());
        s.pc.cia = 0x1234;
        s.msr = msb0_mask(msrb::PR) | msb0_mask(msrb::EE) | msb0_mask(msrb::ME);
        s.spr.set(SprId::Kaivb, 0x1_2345);

        let nia = enter(&mut s, 0x700, Some(pib::PRIV), false);
        assert_eq!(nia, 0x1_2000 | 0x700);
        assert_eq!(s.spr.get(SprId::Srr0), 0x1234);
        let srr1 = s.spr.get(SprId::Srr1);
        assert!(msb0_bit(srr1, pib::PRIV));
        assert!(msb0_bit(srr1, msrb::PR));
        assert!(!msb0_bit(s.msr, msrb::PR));
        assert!(!msb0_bit(s.msr, msrb::EE));
        assert!(msb0_bit(s.msr, msrb::ME));
        assert!(msb0_bit(s.msr, msrb::SF));
        assert!(msb0_bit(s.msr, msrb::LE));
        assert_eq!(s.spr.get(SprId::SvSrr0), 0);
    }

    #[test]
    fn test_enter_svp64_saves_svstate() {
        let mut s = CpuState::new(&SimConfig::defaults());
        s.svstate = SvState {
            maxvl: 8,
            vl: 8,
            srcstep: 3,
            ..Default::default()
        };
        let nia = enter(&mut s, 0x600, None, true);
        assert_eq!(nia, 0x600);
        assert_eq!(s.spr.get(SprId::SvSrr0), s.svstate.to_u64());
        assert_eq!(s.spr.get(SprId::Srr1), SimConfig::defaults().initial_msr);
    }
}

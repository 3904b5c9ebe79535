//! CPU 架构状态
//!
//! [`CpuState`] 独占所有寄存器文件与 SVSTATE，整个运行期间只有一个
//! 调度流水线持有它。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use svsim_core::bits::msb0_bit;
use svsim_core::consts::{SCALAR_INSN_BYTES, SVP64_INSN_BYTES, msrb};
use svsim_core::{CrFile, RegClass, RegFile, SimConfig, SprFile, SprId, SvShape, SvState};

/// 程序计数器：当前指令地址与下一条指令地址
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramCounter {
    pub cia: u64,
    pub nia: u64,
}

impl ProgramCounter {
    pub fn new(pc: u64) -> Self {
        Self {
            cia: pc,
            nia: pc.wrapping_add(SCALAR_INSN_BYTES),
        }
    }

    pub fn insn_bytes(is_svp64: bool) -> u64 {
        if is_svp64 {
            SVP64_INSN_BYTES
        } else {
            SCALAR_INSN_BYTES
        }
    }

    /// NIA = CIA + 4（标量）或 + 8（SVP64）
    pub fn update_nia(&mut self, is_svp64: bool) {
        self.nia = self.cia.wrapping_add(Self::insn_bytes(is_svp64));
    }

    /// 提交 `nia`：CIA 移到 `nia`，并按默认步长重新计算 NIA
    pub fn update(&mut self, nia: u64, is_svp64: bool) {
        self.cia = nia;
        self.update_nia(is_svp64);
    }
}

/// 全部架构状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuState {
    pub gpr: RegFile,
    pub fpr: RegFile,
    pub cr: CrFile,
    /// SVSTATE 不经过 `spr`，见 [`CpuState::read_spr`]
    pub spr: SprFile,
    pub msr: u64,
    pub fpscr: u64,
    pub svstate: SvState,
    pub pc: ProgramCounter,
    pub halted: bool,
    /// 上一条指令是 svremap/svindex/svshape2，本条指令临时启用 REMAP
    pub last_op_svshape: bool,
}

impl CpuState {
    pub fn new(config: &SimConfig) -> Self {
        let mut spr = SprFile::new();
        if config.kaivb != 0 {
            spr.set(SprId::Kaivb, config.kaivb);
        }
        Self {
            gpr: RegFile::new(RegClass::Gpr),
            fpr: RegFile::new(RegClass::Fpr),
            cr: CrFile::default(),
            spr,
            msr: config.initial_msr,
            fpscr: 0,
            svstate: SvState::from_u64(config.initial_svstate),
            pc: ProgramCounter::new(config.initial_pc),
            halted: false,
            last_op_svshape: false,
        }
    }

    /// 问题状态（MSR.PR）
    pub fn problem_state(&self) -> bool {
        msb0_bit(self.msr, msrb::PR)
    }

    pub fn read_spr(&self, id: SprId) -> u64 {
        match id {
            SprId::SvState => self.svstate.to_u64(),
            other => self.spr.get(other),
        }
    }

    pub fn write_spr(&mut self, id: SprId, value: u64) {
        match id {
            SprId::SvState => self.svstate = SvState::from_u64(value),
            other => self.spr.set(other, value),
        }
    }

    /// SVSHAPE0..3，槽号越界读作全零形状
    pub fn svshape(&self, slot: usize) -> SvShape {
        SprId::svshape(slot)
            .map(|id| SvShape::from_u32(self.spr.get(id) as u32))
            .unwrap_or_default()
    }

    /// 以寄存器名为键导出全部状态
    pub fn dump(&self) -> BTreeMap<String, u64> {
        let mut out = BTreeMap::new();
        for (class, file) in [(RegClass::Gpr, &self.gpr), (RegClass::Fpr, &self.fpr)] {
            for (i, v) in file.values().iter().enumerate() {
                out.insert(format!("{}{}", class.prefix(), i), *v);
            }
        }
        for (i, f) in self.cr.fields().iter().enumerate() {
            out.insert(format!("cr{}", i), u64::from(*f));
        }
        for (id, v) in self.spr.iter() {
            out.insert(id.name(), v);
        }
        out.insert("CR".into(), self.cr.value());
        out.insert("MSR".into(), self.msr);
        out.insert("FPSCR".into(), self.fpscr);
        out.insert("SVSTATE".into(), self.svstate.to_u64());
        out.insert("CIA".into(), self.pc.cia);
        out.insert("NIA".into(), self.pc.nia);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svsim_core::Config;

    #[test]
    fn test_pc_update() {
        let mut pc = ProgramCounter::new(0x100);
        assert_eq!(pc.nia, 0x104);
        pc.update_nia(true);
        assert_eq!(pc.nia, 0x108);
        pc.update(0x2000, false);
        assert_eq!((pc.cia, pc.nia), (0x2000, 0x2004));
    }

    #[test]
    fn test_svstate_routed_through_spr_id() {
        let mut s = CpuState::new(&SimConfig::defaults());
        let sv = SvState {
            maxvl: 4,
            vl: 3,
            ..Default::default()
        };
        s.write_spr(SprId::SvState, sv.to_u64());
        assert_eq!(s.svstate.vl, 3);
        assert_eq!(s.read_spr(SprId::SvState), sv.to_u64());
        assert_eq!(s.spr.get(SprId::SvState), 0);
    }

    #[test]
    fn test_dump_names() {
        let mut s = CpuState::new(&SimConfig::defaults());
        s.gpr.set(5, 0x55).unwrap();
        s.spr.set(SprId::Ctr, 9);
        let d = s.dump();
        assert_eq!(d["r5"], 0x55);
        assert_eq!(d["CTR"], 9);
        assert_eq!(d["f0"], 0);
        assert!(d.contains_key("SVSTATE"));
        assert!(!s.problem_state());
    }
}

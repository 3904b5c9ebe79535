//! SVSTATE 向量状态寄存器
//!
//! 64 位 SPR 的结构化视图（MSB0 位号）：
//!
//! | 字段 | 位 |
//! |------|----|
//! | maxvl | 0:6 |
//! | vl | 7:13 |
//! | dststep | 14:20 |
//! | srcstep | 21:27 |
//! | dsubstep | 28:29 |
//! | ssubstep | 30:31 |
//! | mi0/mi1/mi2 | 32:33 / 34:35 / 36:37 |
//! | mo0/mo1 | 38:39 / 40:41 |
//! | SVme | 42:46 |
//! | pack / unpack | 53 / 54 |
//! | hphint | 55:61 |
//! | RMpst | 62 |
//! | vfirst | 63 |

use serde::{Deserialize, Serialize};

use crate::bits::{msb0_field, set_msb0_field};

/// SVSTATE 字段
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SvState {
    /// 最大向量长度
    pub maxvl: u8,
    /// 当前向量长度
    pub vl: u8,
    pub dststep: u8,
    pub srcstep: u8,
    pub dsubstep: u8,
    pub ssubstep: u8,
    pub mi0: u8,
    pub mi1: u8,
    pub mi2: u8,
    pub mo0: u8,
    pub mo1: u8,
    /// REMAP 使能掩码，每个操作数角色一位
    pub sv_me: u8,
    pub pack: bool,
    pub unpack: bool,
    pub hphint: u8,
    /// REMAP 持久标志（RMpst）
    pub persist: bool,
    /// Vertical-First 模式
    pub vfirst: bool,
}

const W: u32 = 64;

impl SvState {
    pub fn from_u64(value: u64) -> Self {
        let f = |s, e| msb0_field(value, W, s, e) as u8;
        Self {
            maxvl: f(0, 6),
            vl: f(7, 13),
            dststep: f(14, 20),
            srcstep: f(21, 27),
            dsubstep: f(28, 29),
            ssubstep: f(30, 31),
            mi0: f(32, 33),
            mi1: f(34, 35),
            mi2: f(36, 37),
            mo0: f(38, 39),
            mo1: f(40, 41),
            sv_me: f(42, 46),
            pack: f(53, 53) != 0,
            unpack: f(54, 54) != 0,
            hphint: f(55, 61),
            persist: f(62, 62) != 0,
            vfirst: f(63, 63) != 0,
        }
    }

    pub fn to_u64(&self) -> u64 {
        let fields: [(u32, u32, u64); 17] = [
            (0, 6, self.maxvl.into()),
            (7, 13, self.vl.into()),
            (14, 20, self.dststep.into()),
            (21, 27, self.srcstep.into()),
            (28, 29, self.dsubstep.into()),
            (30, 31, self.ssubstep.into()),
            (32, 33, self.mi0.into()),
            (34, 35, self.mi1.into()),
            (36, 37, self.mi2.into()),
            (38, 39, self.mo0.into()),
            (40, 41, self.mo1.into()),
            (42, 46, self.sv_me.into()),
            (53, 53, self.pack.into()),
            (54, 54, self.unpack.into()),
            (55, 61, self.hphint.into()),
            (62, 62, self.persist.into()),
            (63, 63, self.vfirst.into()),
        ];
        fields
            .iter()
            .fold(0, |acc, &(s, e, v)| set_msb0_field(acc, W, s, e, v))
    }

    /// 元素循环结束：四个计数器同时清零
    pub fn reset_steps(&mut self) {
        self.srcstep = 0;
        self.dststep = 0;
        self.ssubstep = 0;
        self.dsubstep = 0;
    }

    /// 五个操作数角色（in1, in2, in3, out, out2）各自选择的 SVSHAPE 槽
    pub fn remap_slots(&self) -> [u8; 5] {
        [self.mi0, self.mi1, self.mi2, self.mo0, self.mo1]
    }
}

impl From<u64> for SvState {
    fn from(value: u64) -> Self {
        SvState::from_u64(value)
    }
}

impl From<SvState> for u64 {
    fn from(state: SvState) -> Self {
        state.to_u64()
    }
}

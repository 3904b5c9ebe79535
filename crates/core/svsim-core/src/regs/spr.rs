//! 特殊用途寄存器（SPR）
//!
//! 以 10 位 SPR 编号为键的稀疏表。HSRR0/HSRR1 是 SRR0/SRR1 的别名，
//! 未知编号读作 0，首次写入时创建。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bits::{msb0_bit, set_msb0_bit};

/// 已命名的 SPR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SprId {
    Xer,
    Lr,
    Ctr,
    Dar,
    Srr0,
    Srr1,
    Hsrr0,
    Hsrr1,
    Vrsave,
    SvShape0,
    SvShape1,
    SvShape2,
    SvShape3,
    SvState,
    SvSrr0,
    Tar,
    Kaivb,
    /// 其他编号
    Other(u16),
}

const NAMED: &[(SprId, u16, &str)] = &[
    (SprId::Xer, 1, "XER"),
    (SprId::Lr, 8, "LR"),
    (SprId::Ctr, 9, "CTR"),
    (SprId::Dar, 19, "DAR"),
    (SprId::Srr0, 26, "SRR0"),
    (SprId::Srr1, 27, "SRR1"),
    (SprId::Vrsave, 256, "VRSAVE"),
    (SprId::Hsrr0, 314, "HSRR0"),
    (SprId::Hsrr1, 315, "HSRR1"),
    (SprId::SvShape0, 720, "SVSHAPE0"),
    (SprId::SvShape1, 721, "SVSHAPE1"),
    (SprId::SvShape2, 722, "SVSHAPE2"),
    (SprId::SvShape3, 723, "SVSHAPE3"),
    (SprId::SvState, 724, "SVSTATE"),
    (SprId::SvSrr0, 782, "SVSRR0"),
    (SprId::Tar, 815, "TAR"),
    (SprId::Kaivb, 850, "KAIVB"),
];

impl SprId {
    pub fn from_number(number: u16) -> Self {
        NAMED
            .iter()
            .find(|(_, n, _)| *n == number)
            .map_or(SprId::Other(number), |(id, _, _)| *id)
    }

    pub fn number(self) -> u16 {
        match self {
            SprId::Other(n) => n,
            named => NAMED
                .iter()
                .find(|(id, _, _)| *id == named)
                .map_or(0, |(_, n, _)| *n),
        }
    }

    /// 按名称查找，大小写不敏感
    pub fn from_name(name: &str) -> Option<Self> {
        NAMED
            .iter()
            .find(|(_, _, s)| s.eq_ignore_ascii_case(name))
            .map(|(id, _, _)| *id)
    }

    pub fn name(self) -> String {
        match self {
            SprId::Other(n) => format!("SPR{}", n),
            named => NAMED
                .iter()
                .find(|(id, _, _)| *id == named)
                .map_or_else(String::new, |(_, _, s)| (*s).to_string()),
        }
    }

    /// 解析别名：HSRR0→SRR0, HSRR1→SRR1
    pub fn canonical(self) -> Self {
        match self {
            SprId::Hsrr0 => SprId::Srr0,
            SprId::Hsrr1 => SprId::Srr1,
            other => other,
        }
    }

    /// SVSHAPE0..3
    pub fn svshape(slot: usize) -> Option<Self> {
        match slot {
            0 => Some(SprId::SvShape0),
            1 => Some(SprId::SvShape1),
            2 => Some(SprId::SvShape2),
            3 => Some(SprId::SvShape3),
            _ => None,
        }
    }
}

/// 稀疏 SPR 表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprFile {
    regs: BTreeMap<u16, u64>,
}

impl SprFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: SprId) -> u64 {
        self.regs
            .get(&id.canonical().number())
            .copied()
            .unwrap_or(0)
    }

    pub fn set(&mut self, id: SprId, value: u64) {
        self.regs.insert(id.canonical().number(), value);
    }

    /// 可变访问，不存在时以 0 创建
    pub fn entry(&mut self, id: SprId) -> &mut u64 {
        self.regs.entry(id.canonical().number()).or_insert(0)
    }

    /// 读取 XER 的 MSB0 位
    pub fn xer_bit(&self, bit: u32) -> bool {
        msb0_bit(self.get(SprId::Xer), bit)
    }

    pub fn set_xer_bit(&mut self, bit: u32, on: bool) {
        let xer = self.entry(SprId::Xer);
        *xer = set_msb0_bit(*xer, bit, on);
    }

    /// 已创建的 SPR，按编号排序
    pub fn iter(&self) -> impl Iterator<Item = (SprId, u64)> + '_ {
        self.regs
            .iter()
            .map(|(n, v)| (SprId::from_number(*n), *v))
    }
}

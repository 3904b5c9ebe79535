//! SVSHAPE REMAP 描述符
//!
//! 32 位 SPR（MSB0 位号）：xdimsz 0:5、ydimsz 6:11、zdimsz 12:17（均存储为
//! 实际值减一）、permute 18:20、invxyz 21:23、offset 24:27、skip 28:29、
//! mode 30:31。
//!
//! 矩阵模式下 permute 为 0b110/0b111 时是"索引"形状：没有 z 维度，
//! zdimsz 字段给出存放索引的 GPR，skip 字段给出索引的元素宽度。

use log::trace;
use serde::{Deserialize, Serialize};

use crate::bits::{msb0_field, set_msb0_field};
use crate::error::{SimError, SimResult};
use crate::regs::{ElWidth, RegFile};
use crate::remap::{
    RemapCursor, ShapeParams, dct_inner_butterfly, dct_inner_costable, dct_outer_butterfly,
    fft_butterfly, halfswap_loadstore, matrix_indices, prefix_sum_indices, preduce_indices,
};

const W: u32 = 32;

/// permute 值到维度嵌套顺序：xyz, xzy, yxz, yzx, zxy, zyx
const ORDERS: [[usize; 3]; 6] = [
    [0, 1, 2],
    [0, 2, 1],
    [1, 0, 2],
    [1, 2, 0],
    [2, 0, 1],
    [2, 1, 0],
];

pub const MODE_MATRIX: u8 = 0b00;
pub const MODE_FFT: u8 = 0b01;
pub const MODE_PREDUCE: u8 = 0b10;
pub const MODE_DCT: u8 = 0b11;

/// SVSHAPE 原始字段
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SvShape {
    xdimsz: u8,
    ydimsz: u8,
    zdimsz: u8,
    permute: u8,
    invxyz: u8,
    offset: u8,
    skip: u8,
    mode: u8,
}

impl SvShape {
    pub fn from_u32(value: u32) -> Self {
        let v = u64::from(value);
        let f = |s, e| msb0_field(v, W, s, e) as u8;
        Self {
            xdimsz: f(0, 5),
            ydimsz: f(6, 11),
            zdimsz: f(12, 17),
            permute: f(18, 20),
            invxyz: f(21, 23),
            offset: f(24, 27),
            skip: f(28, 29),
            mode: f(30, 31),
        }
    }

    pub fn to_u32(&self) -> u32 {
        let fields: [(u32, u32, u8); 8] = [
            (0, 5, self.xdimsz),
            (6, 11, self.ydimsz),
            (12, 17, self.zdimsz),
            (18, 20, self.permute),
            (21, 23, self.invxyz),
            (24, 27, self.offset),
            (28, 29, self.skip),
            (30, 31, self.mode),
        ];
        fields
            .iter()
            .fold(0u64, |acc, &(s, e, v)| set_msb0_field(acc, W, s, e, v.into())) as u32
    }

    /// 设置维度大小（实际值，1..=64）
    pub fn with_lims(mut self, lims: [u32; 3]) -> Self {
        let enc = |l: u32| (l.clamp(1, 64) - 1) as u8;
        self.xdimsz = enc(lims[0]);
        self.ydimsz = enc(lims[1]);
        self.zdimsz = enc(lims[2]);
        self
    }

    pub fn with_mode(mut self, mode: u8) -> Self {
        self.mode = mode & 0b11;
        self
    }

    pub fn with_skip(mut self, skip: u8) -> Self {
        self.skip = skip & 0b11;
        self
    }

    pub fn with_offset(mut self, offset: u8) -> Self {
        self.offset = offset & 0xf;
        self
    }

    /// bit0 = x, bit1 = y, bit2 = z
    pub fn with_invxyz(mut self, inv: u8) -> Self {
        self.invxyz = inv & 0b111;
        self
    }

    pub fn with_permute(mut self, permute: u8) -> Self {
        self.permute = permute & 0b111;
        self
    }

    /// 索引形状：zdimsz 原值给出 GPR 编号的一半
    pub fn with_index_gpr(mut self, gpr: u8) -> Self {
        self.zdimsz = (gpr >> 1) & 0x3f;
        self
    }

    pub fn is_indexed(&self) -> bool {
        self.mode == MODE_MATRIX && matches!(self.permute, 0b110 | 0b111)
    }

    pub fn is_zero(&self) -> bool {
        self.to_u32() == 0
    }

    pub fn mode(&self) -> u8 {
        self.mode
    }

    /// permute 原值（DCT 族的子模式）
    pub fn submode(&self) -> u8 {
        self.permute
    }

    pub fn order(&self) -> [usize; 3] {
        let permute = if self.is_indexed() {
            (self.permute - 0b110) * 2
        } else {
            self.permute
        };
        ORDERS
            .get(permute as usize)
            .copied()
            .unwrap_or(ORDERS[0])
    }

    pub fn lims(&self) -> [u32; 3] {
        let z = if self.is_indexed() {
            1
        } else {
            u32::from(self.zdimsz) + 1
        };
        [u32::from(self.xdimsz) + 1, u32::from(self.ydimsz) + 1, z]
    }

    pub fn inv(&self) -> [bool; 3] {
        let inv = if self.is_indexed() {
            self.invxyz & 0b011
        } else {
            self.invxyz
        };
        [inv & 1 != 0, inv & 2 != 0, inv & 4 != 0]
    }

    /// 索引形状借用 invxyz 的 z 位作为 skip
    pub fn skip(&self) -> u8 {
        if self.is_indexed() {
            (self.invxyz >> 2) & 1
        } else {
            self.skip
        }
    }

    /// 索引元素宽度（与 skip 共用字段）
    pub fn elwid(&self) -> u8 {
        self.skip
    }

    /// 存放索引的 GPR
    pub fn svgpr(&self) -> usize {
        usize::from(self.zdimsz) << 1
    }

    pub fn offset(&self) -> u32 {
        u32::from(self.offset)
    }

    pub fn params(&self) -> ShapeParams {
        ShapeParams {
            lims: self.lims(),
            order: self.order(),
            inv: self.inv(),
            skip: self.skip(),
            offset: self.offset(),
            mode: self.mode,
            submode: self.permute,
        }
    }

    /// 创建新的 REMAP 游标
    ///
    /// # 错误
    ///
    /// 模式 01/11 下 ydimsz 不是已定义的子调度时返回 [`SimError::UnsupportedShape`]，
    /// DCT 尺寸不是 2 的幂时返回 [`SimError::Remap`]。
    pub fn cursor(&self) -> SimResult<RemapCursor> {
        let p = self.params();
        trace!(
            "SVSHAPE {:#010x} cursor: mode={} lims={:?} indexed={}",
            self.to_u32(),
            self.mode,
            p.lims,
            self.is_indexed()
        );
        let cursor = match self.mode {
            MODE_MATRIX => RemapCursor::new(matrix_indices(&p)),
            MODE_PREDUCE => match p.skip {
                0b10 | 0b11 => RemapCursor::new(prefix_sum_indices(&p)),
                _ => RemapCursor::new(preduce_indices(&p, None)),
            },
            _ => match p.lims[1] {
                1 => RemapCursor::with_start(fft_butterfly(&p), p.offset as usize),
                2 | 4 => RemapCursor::new(dct_inner_butterfly(&p)?),
                3 => RemapCursor::new(dct_outer_butterfly(&p)?),
                5 | 13 => RemapCursor::new(dct_inner_costable(&p)?),
                6 | 14 | 15 => RemapCursor::new(halfswap_loadstore(&p)?),
                other => {
                    return Err(SimError::UnsupportedShape {
                        value: self.to_u32(),
                        reason: format!("no FFT/DCT schedule for ydimsz {}", other),
                    });
                }
            },
        };
        Ok(cursor)
    }

    /// 索引形状的后处理：把游标索引换成 GPR 中存放的索引
    ///
    /// 一维的索引形状（x、y 维度都为 1）直接用 `step` 作为元素号。
    pub fn postprocess(&self, idx: u32, step: u32, gpr: &RegFile) -> SimResult<u32> {
        if !self.is_indexed() {
            return Ok(idx);
        }
        let [xd, yd, _] = self.lims();
        let element = if xd == 1 && yd == 1 { step } else { idx };
        let ew = ElWidth::from_field(self.elwid())?;
        let remapped = gpr.read_element(self.svgpr(), element as usize, ew)?;
        trace!(
            "indexed REMAP: svgpr={} element={} ew={} -> {}",
            self.svgpr(),
            element,
            ew.bits(),
            remapped
        );
        Ok(remapped as u32)
    }
}

impl From<u32> for SvShape {
    fn from(value: u32) -> Self {
        SvShape::from_u32(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::RegClass;

    #[test]
    fn test_layout() {
        let s = SvShape::default().with_lims([4, 1, 1]).with_mode(MODE_FFT);
        // xdimsz=3 位于 0:5，mode 位于最低两位
        assert_eq!(s.to_u32(), (3 << 26) | 0b01);
        assert_eq!(SvShape::from_u32(s.to_u32()), s);
        assert_eq!(s.lims(), [4, 1, 1]);
    }

    #[test]
    fn test_order_table() {
        let s = SvShape::default().with_permute(0b010);
        assert_eq!(s.order(), [1, 0, 2]);
        let s = SvShape::default().with_permute(0b101);
        assert_eq!(s.order(), [2, 1, 0]);
    }

    #[test]
    fn test_indexed_fields() {
        let s = SvShape::default()
            .with_lims([2, 2, 1])
            .with_permute(0b111)
            .with_invxyz(0b111)
            .with_skip(0b01)
            .with_index_gpr(10);
        assert!(s.is_indexed());
        assert_eq!(s.order(), [1, 0, 2]);
        assert_eq!(s.lims()[2], 1);
        assert_eq!(s.inv(), [true, true, false]);
        assert_eq!(s.skip(), 1);
        assert_eq!(s.elwid(), 1);
        assert_eq!(s.svgpr(), 10);
    }

    #[test]
    fn test_indexed_postprocess() {
        let mut gpr = RegFile::new(RegClass::Gpr);
        // 字节索引 [3, 1, 2, 0]
        gpr.set(8, 0x0002_0103).unwrap();
        let s = SvShape::default()
            .with_lims([1, 1, 1])
            .with_permute(0b110)
            .with_skip(3)
            .with_index_gpr(8);
        assert_eq!(s.postprocess(0, 0, &gpr).unwrap(), 3);
        assert_eq!(s.postprocess(0, 2, &gpr).unwrap(), 2);
        assert_eq!(s.postprocess(0, 3, &gpr).unwrap(), 0);
        // 非索引形状原样返回
        assert_eq!(SvShape::default().postprocess(7, 1, &gpr).unwrap(), 7);
    }

    #[test]
    fn test_cursor_dispatch() {
        let s = SvShape::default().with_lims([3, 2, 1]);
        let got: Vec<u32> = s.cursor().unwrap().take(6).map(|x| x.index).collect();
        assert_eq!(got, vec![0, 1, 2, 3, 4, 5]);

        let fft = SvShape::default()
            .with_lims([8, 1, 1])
            .with_mode(MODE_FFT)
            .with_offset(2);
        let first = fft.cursor().unwrap().next().map(|x| x.index);
        assert_eq!(first, Some(4));

        let bad = SvShape::default().with_lims([8, 7, 1]).with_mode(MODE_DCT);
        assert!(matches!(bad.cursor(), Err(SimError::UnsupportedShape { .. })));
    }
}

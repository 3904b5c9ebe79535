//! MSB0 位编号辅助函数
//!
//! Power ISA 使用 MSB0 编号：`width` 位寄存器的第 0 位是最高位，
//! 第 `width - 1` 位是最低位。

/// 低 `bits` 位全 1 的掩码
#[inline]
pub const fn mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// 64 位寄存器中 MSB0 第 `bit` 位的掩码
#[inline]
pub const fn msb0_mask(bit: u32) -> u64 {
    1u64 << (63 - bit)
}

/// 读取 64 位寄存器的 MSB0 第 `bit` 位
#[inline]
pub const fn msb0_bit(value: u64, bit: u32) -> bool {
    value & msb0_mask(bit) != 0
}

/// 设置或清除 64 位寄存器的 MSB0 第 `bit` 位
#[inline]
pub const fn set_msb0_bit(value: u64, bit: u32, on: bool) -> u64 {
    if on {
        value | msb0_mask(bit)
    } else {
        value & !msb0_mask(bit)
    }
}

/// 读取 `width` 位寄存器中 MSB0 区间 `[start, end]` 的字段
///
/// # 示例
///
/// ```
/// use svsim_core::bits::msb0_field;
/// // 32 位寄存器的 30:31 就是最低两位
/// assert_eq!(msb0_field(0b10, 32, 30, 31), 0b10);
/// ```
#[inline]
pub const fn msb0_field(value: u64, width: u32, start: u32, end: u32) -> u64 {
    let shift = width - 1 - end;
    (value >> shift) & mask(end - start + 1)
}

/// 写入 `width` 位寄存器中 MSB0 区间 `[start, end]`，超出字段宽度的高位被丢弃
#[inline]
pub const fn set_msb0_field(value: u64, width: u32, start: u32, end: u32, field: u64) -> u64 {
    let shift = width - 1 - end;
    let m = mask(end - start + 1) << shift;
    (value & !m) | ((field << shift) & m)
}

/// 把低 `bits` 位视为有符号数并扩展到 64 位
#[inline]
pub const fn exts(value: u64, bits: u32) -> i64 {
    if bits == 0 {
        0
    } else if bits >= 64 {
        value as i64
    } else {
        let shift = 64 - bits;
        ((value << shift) as i64) >> shift
    }
}

//! 寄存器文件
//!
//! - [`RegFile`]: GPR/FPR 平坦数组，支持元素宽度覆盖下的子寄存器访问
//! - [`CrFile`]: 条件寄存器，8 个 4 位字段
//! - [`SprFile`]: 以 SPR 编号为键的稀疏表，未写入的 SPR 读作 0

mod cr;
mod gpr;
mod spr;

pub use cr::{CR_EQ, CR_GT, CR_LT, CR_SO, CrBit, CrFile};
pub use gpr::{RegClass, RegFile};
pub use spr::{SprFile, SprId};

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// 元素宽度覆盖
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ElWidth {
    #[default]
    W64,
    W32,
    W16,
    W8,
}

impl ElWidth {
    /// 从 2 位 elwidth 字段解码（0=64, 1=32, 2=16, 3=8）
    pub fn from_field(field: u8) -> SimResult<Self> {
        match field {
            0 => Ok(ElWidth::W64),
            1 => Ok(ElWidth::W32),
            2 => Ok(ElWidth::W16),
            3 => Ok(ElWidth::W8),
            other => Err(SimError::InvalidElwidth(other)),
        }
    }

    pub fn from_bits(bits: u32) -> SimResult<Self> {
        match bits {
            64 => Ok(ElWidth::W64),
            32 => Ok(ElWidth::W32),
            16 => Ok(ElWidth::W16),
            8 => Ok(ElWidth::W8),
            other => Err(SimError::InvalidElwidth(other.min(255) as u8)),
        }
    }

    pub const fn bits(self) -> u32 {
        match self {
            ElWidth::W64 => 64,
            ElWidth::W32 => 32,
            ElWidth::W16 => 16,
            ElWidth::W8 => 8,
        }
    }

    /// 每个 64 位寄存器容纳的元素数
    pub const fn per_register(self) -> usize {
        (64 / self.bits()) as usize
    }
}

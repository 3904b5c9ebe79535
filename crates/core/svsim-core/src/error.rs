//! 仿真器错误类型
//!
//! 错误分为两类：
//! - 客户机可见的故障（非法指令、特权违例、内存异常）由调度流水线转换为
//!   陷阱状态，不会以 `Err` 的形式返回给宿主；
//! - 解码器或元数据错误（[`SimError`]）属于致命错误，宿主应当中止。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 内存故障类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemFaultKind {
    /// 未对齐访问
    Unaligned,
    /// 地址无效
    Invalid,
}

/// 访问类型，用于选择陷阱向量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessKind {
    Load,
    Store,
    /// 取指
    Execute,
}

/// 内存协作者报告的异常
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind:?} {access:?} access at {address:#x}")]
pub struct MemoryException {
    pub kind: MemFaultKind,
    pub address: u64,
    pub access: AccessKind,
}

impl MemoryException {
    pub fn unaligned(address: u64, access: AccessKind) -> Self {
        Self {
            kind: MemFaultKind::Unaligned,
            address,
            access,
        }
    }

    pub fn invalid(address: u64, access: AccessKind) -> Self {
        Self {
            kind: MemFaultKind::Invalid,
            address,
            access,
        }
    }
}

/// 致命仿真错误
///
/// 这些错误说明解码器输出或指令元数据有缺陷，而不是客户程序的行为。
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimError {
    #[error("{class} register index {index} out of range")]
    RegisterOutOfRange { class: String, index: usize },

    #[error("CR field {0} out of range")]
    CrFieldOutOfRange(usize),

    #[error("instruction {insn}: no operand role provides {name}")]
    UnknownOperand { insn: String, name: String },

    #[error("instruction {0} not found in instruction database")]
    UnknownInstruction(String),

    #[error("invalid predicate configuration: {0}")]
    InvalidPredicate(String),

    #[error("REMAP conflict: {0}")]
    Remap(String),

    #[error("unsupported SVSHAPE {value:#010x}: {reason}")]
    UnsupportedShape { value: u32, reason: String },

    #[error("invalid element width {0}")]
    InvalidElwidth(u8),

    /// 语义函数内部的内存故障，只在调度边界之内传递
    #[error("memory exception: {0}")]
    Memory(#[from] MemoryException),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SimError {
    /// 内存异常会在调度边界被转换成陷阱，其余错误都应中止宿主
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SimError::Memory(_))
    }
}

/// 仿真结果类型
pub type SimResult<T> = Result<T, SimError>;

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("configuration parse error: {0}")]
    Parse(String),

    #[error("configuration merge conflict: {0}")]
    MergeConflict(String),

    #[error("configuration serialize error: {0}")]
    Serialize(String),
}

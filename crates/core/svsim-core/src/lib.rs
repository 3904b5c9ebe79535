//! # svsim-core
//!
//! SVP64 指令级仿真器的核心数据模型。
//!
//! 本 crate 只包含"叶子"组件，不依赖解码器、语义函数或内存子系统：
//!
//! ## 主要组件
//!
//! - **寄存器文件**: GPR/FPR 平坦数组、8 个字段的 CR、稀疏 SPR 表，见 [`regs`]
//! - **向量状态**: [`SvState`]，即 SVSTATE SPR 的结构化视图
//! - **REMAP 形状**: [`SvShape`] 与可恢复、可序列化的 [`RemapCursor`]
//! - **谓词**: [`predicate`] 计算源/目标掩码以及跳过/置零策略
//! - **配置**: [`SimConfig`] 与统一的 [`Config`] trait
//!
//! ## 位编号
//!
//! Power ISA 文档使用 MSB0 编号（第 0 位为最高位），[`bits`] 模块提供
//! 与之对应的辅助函数，架构常量统一定义在 [`consts`] 中。

pub mod bits;
pub mod config;
pub mod consts;
pub mod error;
pub mod predicate;
pub mod regs;
pub mod remap;
pub mod svshape;
pub mod svstate;

pub use config::{Config, SimConfig};
pub use error::{AccessKind, ConfigError, MemFaultKind, MemoryException, SimError, SimResult};
pub use predicate::{
    MaskPolicy, PredCr, PredInt, PredMode, PredType, PredicateConfig, PredicateMask,
};
pub use regs::{CrBit, CrFile, ElWidth, RegClass, RegFile, SprFile, SprId};
pub use remap::{RemapCursor, RemapStep};
pub use svshape::SvShape;
pub use svstate::SvState;

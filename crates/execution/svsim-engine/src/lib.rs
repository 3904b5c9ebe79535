//! # svsim-engine - SVP64 执行核心
//!
//! 在 [`svsim_core`] 数据模型之上实现一条指令（的一个元素）的完整执行过程。
//!
//! ## 主要组件
//!
//! - **调度流水线**: [`IsaCaller`] 负责特权/非法检查、操作数收集、CR/XER
//!   更新、写回与 NIA 提交
//! - **元素步进**: [`steploop`] 模块中的 [`StepLoop`] 按谓词掩码跳过元素，
//!   处理 SUBVL、pack/unpack 与 REMAP 索引
//! - **陷阱**: [`trap::enter`] 保存现场并计算向量地址
//! - **协作者接口**: [`Decoder`]、[`Memory`]、[`InstructionSet`]
//! - **参考实现**: [`SparseMemory`]、[`StaticProgram`]、[`ReferenceIsa`]
//!
//! ## 示例
//!
//! ```rust,ignore
//! use svsim_core::{Config, SimConfig};
//! use svsim_engine::{IsaCaller, ReferenceIsa, SparseMemory, StaticProgram};
//!
//! let mut cpu = IsaCaller::new(SimConfig::defaults(), ReferenceIsa::new(), SparseMemory::new())?;
//! let mut prog = StaticProgram::new(0).with("setvl", setvl_fields);
//! cpu.run(&mut prog, 100)?;
//! ```

pub mod arith;
pub mod caller;
pub mod context;
pub mod decoded;
pub mod insndb;
pub mod memory;
pub mod program;
pub mod semantics;
pub mod state;
pub mod steploop;
pub mod trap;

pub use caller::{CallOutcome, CallStats, IsaCaller};
pub use context::{ExecutionContext, StepRequest};
pub use decoded::{
    CrOperand, CrSel, Decoded, DecodedFields, Decoder, DecoderView, InsnForm, LdStMode, MicroOp,
    OperandSlot, RegOperand, RmFields, RmMode, SvMode,
};
pub use insndb::{InstructionInfo, InstructionSet, Operands, Outputs, SemanticFn};
pub use memory::{Memory, SparseMemory};
pub use program::StaticProgram;
pub use semantics::ReferenceIsa;
pub use state::{CpuState, ProgramCounter};
pub use steploop::{StepConfig, StepLoop, StepState};

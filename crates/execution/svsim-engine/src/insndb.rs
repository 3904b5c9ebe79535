//! 指令数据库接口
//!
//! 每条指令的元数据（语义函数、读写寄存器角色名、特殊寄存器、形式）
//! 由 [`InstructionSet`] 提供，调度流水线按名字查找。

use svsim_core::SimResult;

use crate::context::ExecutionContext;
use crate::decoded::InsnForm;

/// 语义函数：读取按序排列的操作数，返回按名字排列的结果
pub type SemanticFn = fn(&mut ExecutionContext<'_>, &Operands) -> SimResult<Outputs>;

/// 指令元数据，静态加载
#[derive(Debug, Clone, Copy)]
pub struct InstructionInfo {
    pub func: SemanticFn,
    pub read_regs: &'static [&'static str],
    /// 写之前需要读出旧值的寄存器
    pub uninit_regs: &'static [&'static str],
    pub write_regs: &'static [&'static str],
    /// MSR、CR、SVSTATE、CTR 等非 GPR 角色
    pub special_regs: &'static [&'static str],
    pub op_fields: &'static [&'static str],
    pub form: InsnForm,
}

impl InstructionInfo {
    /// 操作数名：read + uninit，去重保序
    pub fn input_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        for &name in self.read_regs.iter().chain(self.uninit_regs) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    pub fn writes(&self, name: &str) -> bool {
        self.write_regs.iter().any(|w| *w == name)
    }

    pub fn is_special(&self, name: &str) -> bool {
        self.special_regs.iter().any(|s| *s == name)
    }
}

/// 指令数据库
pub trait InstructionSet {
    fn lookup(&self, name: &str) -> Option<&InstructionInfo>;

    fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

/// 传给语义函数的操作数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operands {
    values: Vec<(&'static str, u64)>,
}

impl Operands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &'static str, value: u64) {
        self.values.push((name, value));
    }

    pub fn try_get(&self, name: &str) -> Option<u64> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    /// 未提供的操作数读作 0
    pub fn get(&self, name: &str) -> u64 {
        self.try_get(name).unwrap_or(0)
    }

    pub fn values(&self) -> impl Iterator<Item = u64> + '_ {
        self.values.iter().map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// 语义函数的结果
///
/// 除寄存器角色外还有几个约定名字：`overflow`（显式溢出）、`CR0`/`CR1`
/// （显式 CR 字段值）、`CA`/`CA32`（显式进位）。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outputs {
    values: Vec<(&'static str, u64)>,
}

impl Outputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: u64) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &'static str, value: u64) {
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    /// 第一个结果，Rc=1 与进位计算以它为准
    pub fn first(&self) -> Option<u64> {
        self.values.first().map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.values.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

//! 参考语义库
//!
//! 覆盖调度流水线自身依赖的指令：setvl/svstep/svremap、定点加减族、比较、
//! 逻辑运算、MSR/SPR 搬移、陷阱字、双字/字/字节访存以及分支。
//! Rc=1 与 OE=1 变体共享同一个语义函数，CR 与 XER 的更新由调度流水线完成。

mod branch;
mod fixedpoint;
mod loadstore;
mod sv;
mod system;

use std::collections::HashMap;

use crate::decoded::InsnForm;
use crate::insndb::{InstructionInfo, InstructionSet, SemanticFn};

/// 一条指令注册哪些助记符变体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Forms {
    Plain,
    /// `name`、`name.`
    Rc,
    /// 再加上 `nameo`、`nameo.`
    RcOe,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Spec {
    pub read: &'static [&'static str],
    pub write: &'static [&'static str],
    pub special: &'static [&'static str],
    pub fields: &'static [&'static str],
    pub form: InsnForm,
}

impl Spec {
    fn into_info(self, func: SemanticFn) -> InstructionInfo {
        InstructionInfo {
            func,
            read_regs: self.read,
            uninit_regs: &[],
            write_regs: self.write,
            special_regs: self.special,
            op_fields: self.fields,
            form: self.form,
        }
    }
}

/// 以助记符为键的指令表
#[derive(Debug, Clone)]
pub struct ReferenceIsa {
    table: HashMap<String, InstructionInfo>,
}

impl Default for ReferenceIsa {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceIsa {
    pub fn new() -> Self {
        let mut isa = Self {
            table: HashMap::new(),
        };
        fixedpoint::register(&mut isa);
        sv::register(&mut isa);
        system::register(&mut isa);
        loadstore::register(&mut isa);
        branch::register(&mut isa);
        isa
    }

    /// 注册或替换一条指令
    pub fn insert(&mut self, name: &str, info: InstructionInfo) {
        self.table.insert(name.to_string(), info);
    }

    pub(crate) fn add(&mut self, name: &str, forms: Forms, func: SemanticFn, spec: Spec) {
        let info = spec.into_info(func);
        self.insert(name, info);
        if forms != Forms::Plain {
            self.insert(&format!("{}.", name), info);
        }
        if forms == Forms::RcOe {
            self.insert(&format!("{}o", name), info);
            self.insert(&format!("{}o.", name), info);
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.table.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl InstructionSet for ReferenceIsa {
    fn lookup(&self, name: &str) -> Option<&InstructionInfo> {
        self.table.get(name)
    }
}

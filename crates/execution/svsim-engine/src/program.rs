//! 预解码程序
//!
//! [`StaticProgram`] 按地址保存已经解码好的指令，作为最简单的解码器协作者。
//! 没有指令的地址按取指故障处理。

use std::collections::BTreeMap;

use log::trace;
use svsim_core::consts::{SCALAR_INSN_BYTES, SVP64_INSN_BYTES};
use svsim_core::{AccessKind, MemoryException};

use crate::decoded::{Decoded, DecodedFields, Decoder, DecoderView};

#[derive(Debug, Clone, Default)]
pub struct StaticProgram {
    insns: BTreeMap<u64, Decoded>,
    /// 下一条 `push` 的地址
    next: u64,
}

impl StaticProgram {
    pub fn new(base: u64) -> Self {
        Self {
            insns: BTreeMap::new(),
            next: base,
        }
    }

    /// 把指令放在 `addr`
    pub fn insert(&mut self, addr: u64, name: &str, fields: DecodedFields) {
        self.insns.insert(
            addr,
            Decoded {
                name: name.to_string(),
                fields,
            },
        );
    }

    /// 顺序追加，SVP64 指令占 8 字节，返回指令地址
    pub fn push(&mut self, name: &str, fields: DecodedFields) -> u64 {
        let addr = self.next;
        let size = if fields.is_svp64 {
            SVP64_INSN_BYTES
        } else {
            SCALAR_INSN_BYTES
        };
        self.insert(addr, name, fields);
        self.next = addr.wrapping_add(size);
        addr
    }

    /// 追加一条指令（链式）
    pub fn with(mut self, name: &str, fields: DecodedFields) -> Self {
        self.push(name, fields);
        self
    }

    pub fn end(&self) -> u64 {
        self.next
    }

    pub fn len(&self) -> usize {
        self.insns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }
}

impl Decoder for StaticProgram {
    fn decode(&mut self, pc: u64, _view: &DecoderView) -> Result<Decoded, MemoryException> {
        let decoded = self
            .insns
            .get(&pc)
            .cloned()
            .ok_or_else(|| MemoryException::invalid(pc, AccessKind::Execute))?;
        trace!("decode {:#x}: {}", pc, decoded.name);
        Ok(decoded)
    }
}

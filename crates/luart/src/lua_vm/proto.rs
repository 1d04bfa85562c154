// Proto - immutable compiled-function description
//
// Shared read-only by every closure instantiated from it; nothing here is
// mutated after the builder finishes.
use std::rc::Rc;

use smol_str::SmolStr;

use crate::lua_value::LuaValue;
use crate::lua_vm::opcode::Instruction;

/// Where one upvalue of a closure comes from at instantiation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpvalueDesc {
    /// true: capture the instantiating frame's stack slot `index`;
    /// false: copy the enclosing closure's upvalue `index`
    pub in_stack: bool,
    pub index: u8,
}

impl UpvalueDesc {
    pub const fn local(index: u8) -> Self {
        UpvalueDesc {
            in_stack: true,
            index,
        }
    }

    pub const fn parent(index: u8) -> Self {
        UpvalueDesc {
            in_stack: false,
            index,
        }
    }
}

#[derive(Debug)]
pub struct Proto {
    pub code: Box<[Instruction]>,
    pub constants: Box<[LuaValue]>,
    pub upvalue_descs: Box<[UpvalueDesc]>,
    /// Nested function prototypes, indexed by the Closure opcode
    pub protos: Box<[Rc<Proto>]>,
    pub param_count: u8,
    pub is_vararg: bool,
    /// Registers this function needs; frames are sized to this
    pub max_stack: u8,
    pub source_name: Option<SmolStr>,
    /// Source line per instruction; empty when debug info is stripped
    pub line_info: Box<[u32]>,
}

impl Proto {
    pub fn builder() -> ProtoBuilder {
        ProtoBuilder::default()
    }

    #[inline]
    pub fn num_upvalues(&self) -> usize {
        self.upvalue_descs.len()
    }

    /// Source line for the instruction at `pc`, when debug info is present.
    pub fn line_at(&self, pc: usize) -> Option<u32> {
        self.line_info.get(pc).copied()
    }
}

#[derive(Debug, Default)]
pub struct ProtoBuilder {
    code: Vec<Instruction>,
    constants: Vec<LuaValue>,
    upvalue_descs: Vec<UpvalueDesc>,
    protos: Vec<Rc<Proto>>,
    param_count: u8,
    is_vararg: bool,
    max_stack: u8,
    source_name: Option<SmolStr>,
    line_info: Vec<u32>,
}

impl ProtoBuilder {
    pub fn code(mut self, code: Vec<Instruction>) -> Self {
        self.code = code;
        self
    }

    pub fn constants(mut self, constants: Vec<LuaValue>) -> Self {
        self.constants = constants;
        self
    }

    /// Index of `value` in the constant pool, appending it when new.
    pub fn add_constant(&mut self, value: LuaValue) -> u32 {
        if let Some(index) = self.constants.iter().position(|c| *c == value) {
            return index as u32;
        }
        self.constants.push(value);
        (self.constants.len() - 1) as u32
    }

    pub fn upvalue_descs(mut self, descs: Vec<UpvalueDesc>) -> Self {
        self.upvalue_descs = descs;
        self
    }

    pub fn protos(mut self, protos: Vec<Rc<Proto>>) -> Self {
        self.protos = protos;
        self
    }

    pub fn param_count(mut self, count: u8) -> Self {
        self.param_count = count;
        self
    }

    pub fn is_vararg(mut self, vararg: bool) -> Self {
        self.is_vararg = vararg;
        self
    }

    pub fn max_stack(mut self, max_stack: u8) -> Self {
        self.max_stack = max_stack;
        self
    }

    pub fn source_name(mut self, name: impl Into<SmolStr>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    pub fn line_info(mut self, lines: Vec<u32>) -> Self {
        self.line_info = lines;
        self
    }

    pub fn build(self) -> Rc<Proto> {
        debug_assert!(self.max_stack as usize >= self.param_count as usize);
        Rc::new(Proto {
            code: self.code.into_boxed_slice(),
            constants: self.constants.into_boxed_slice(),
            upvalue_descs: self.upvalue_descs.into_boxed_slice(),
            protos: self.protos.into_boxed_slice(),
            param_count: self.param_count,
            is_vararg: self.is_vararg,
            max_stack: self.max_stack,
            source_name: self.source_name,
            line_info: self.line_info.into_boxed_slice(),
        })
    }
}

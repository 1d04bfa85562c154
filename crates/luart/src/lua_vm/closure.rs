// Closures - a Proto plus its captured upvalues
//
// Two flavors behind one tag: functions compiled from source capture shared
// upvalue cells, host functions capture plain values by copy (there is no
// stack for them to alias).
use std::cell::RefCell;
use std::rc::Rc;

use crate::lua_value::LuaValue;
use crate::lua_vm::proto::Proto;
use crate::lua_vm::upvalue::{OpenUpvalues, Upvalue};

/// Host function signature: receives its own closure (for upvalue access)
/// and the argument slice.
pub type NativeFn = fn(&NativeClosure, &[LuaValue]) -> LuaValue;

pub struct NativeClosure {
    func: NativeFn,
    /// Captured by copy; RefCell because hosts may rebind them
    upvalues: RefCell<Box<[LuaValue]>>,
}

impl NativeClosure {
    pub fn new(func: NativeFn, upvalues: Vec<LuaValue>) -> Self {
        NativeClosure {
            func,
            upvalues: RefCell::new(upvalues.into_boxed_slice()),
        }
    }

    pub fn call(&self, args: &[LuaValue]) -> LuaValue {
        (self.func)(self, args)
    }

    pub fn num_upvalues(&self) -> usize {
        self.upvalues.borrow().len()
    }

    /// Captured value `index`; nil when out of range.
    pub fn upvalue(&self, index: usize) -> LuaValue {
        self.upvalues
            .borrow()
            .get(index)
            .cloned()
            .unwrap_or(LuaValue::Nil)
    }

    pub fn set_upvalue(&self, index: usize, value: LuaValue) {
        if let Some(slot) = self.upvalues.borrow_mut().get_mut(index) {
            *slot = value;
        }
    }
}

impl std::fmt::Debug for NativeClosure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeClosure")
            .field("upvalues", &self.upvalues.borrow().len())
            .finish()
    }
}

#[derive(Debug)]
pub struct LuaClosure {
    pub proto: Rc<Proto>,
    /// One cell per descriptor in the proto, fixed at instantiation
    upvalues: Box<[Rc<Upvalue>]>,
}

impl LuaClosure {
    pub fn new(proto: Rc<Proto>, upvalues: Vec<Rc<Upvalue>>) -> Self {
        debug_assert_eq!(proto.num_upvalues(), upvalues.len());
        LuaClosure {
            proto,
            upvalues: upvalues.into_boxed_slice(),
        }
    }

    #[inline]
    pub fn upvalue(&self, index: usize) -> &Rc<Upvalue> {
        &self.upvalues[index]
    }

    pub fn get_upvalue(&self, index: usize, stack: &[LuaValue]) -> LuaValue {
        self.upvalues[index].get(stack)
    }

    pub fn set_upvalue(&self, index: usize, stack: &mut [LuaValue], value: LuaValue) {
        self.upvalues[index].set(stack, value);
    }
}

#[derive(Debug)]
pub enum Closure {
    Lua(LuaClosure),
    Native(NativeClosure),
}

impl Closure {
    #[inline]
    pub fn is_lua(&self) -> bool {
        matches!(self, Closure::Lua(_))
    }

    #[inline]
    pub fn is_native(&self) -> bool {
        matches!(self, Closure::Native(_))
    }

    pub fn as_lua(&self) -> Option<&LuaClosure> {
        match self {
            Closure::Lua(c) => Some(c),
            Closure::Native(_) => None,
        }
    }

    pub fn as_native(&self) -> Option<&NativeClosure> {
        match self {
            Closure::Native(c) => Some(c),
            Closure::Lua(_) => None,
        }
    }
}

/// Build a closure from `proto` inside the currently executing frame.
///
/// Each descriptor either opens (or reuses) an upvalue against the frame's
/// own stack region starting at `stack_base`, or copies the enclosing
/// closure's already-resolved cell. The copy path is how deeply nested
/// closures share one cell without re-deriving it from the stack.
pub fn instantiate_closure(
    proto: &Rc<Proto>,
    enclosing: Option<&LuaClosure>,
    stack_base: usize,
    open: &mut OpenUpvalues,
) -> LuaClosure {
    let mut upvalues = Vec::with_capacity(proto.num_upvalues());
    for desc in proto.upvalue_descs.iter() {
        let upvalue = if desc.in_stack {
            open.find_or_create(stack_base + desc.index as usize)
        } else {
            let enclosing = enclosing
                .unwrap_or_else(|| unreachable!("parent-upvalue capture without an enclosing closure"));
            enclosing.upvalue(desc.index as usize).clone()
        };
        upvalues.push(upvalue);
    }
    LuaClosure::new(proto.clone(), upvalues)
}

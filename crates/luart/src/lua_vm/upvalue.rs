// Upvalues - shared mutable cells behind closures
//
// An upvalue starts Open, aliasing one slot of the host-owned value stack,
// and is closed exactly once when that stack region is torn down. Sharing is
// by `Rc` identity: every closure capturing the same open slot holds the
// same cell, which is what makes writes through one closure visible through
// the others.
use std::cell::RefCell;
use std::rc::Rc;

use crate::lua_value::LuaValue;

#[derive(Debug, Clone)]
enum UpvalueState {
    /// Aliases `stack[stack_index]` of the host-owned stack
    Open { stack_index: usize },
    /// Self-contained; the value moved out of the stack at close time
    Closed(LuaValue),
}

#[derive(Debug)]
pub struct Upvalue {
    state: RefCell<UpvalueState>,
}

impl Upvalue {
    pub fn new_open(stack_index: usize) -> Rc<Self> {
        Rc::new(Upvalue {
            state: RefCell::new(UpvalueState::Open { stack_index }),
        })
    }

    pub fn new_closed(value: LuaValue) -> Rc<Self> {
        Rc::new(Upvalue {
            state: RefCell::new(UpvalueState::Closed(value)),
        })
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(&*self.state.borrow(), UpvalueState::Open { .. })
    }

    /// Stack slot an open upvalue aliases; `None` once closed.
    pub fn stack_index(&self) -> Option<usize> {
        match &*self.state.borrow() {
            UpvalueState::Open { stack_index } => Some(*stack_index),
            UpvalueState::Closed(_) => None,
        }
    }

    /// Read through the cell. The caller supplies the stack the open state
    /// aliases; a closed upvalue ignores it.
    pub fn get(&self, stack: &[LuaValue]) -> LuaValue {
        match &*self.state.borrow() {
            UpvalueState::Open { stack_index } => stack[*stack_index].clone(),
            UpvalueState::Closed(value) => value.clone(),
        }
    }

    /// Write through the cell.
    pub fn set(&self, stack: &mut [LuaValue], value: LuaValue) {
        match &mut *self.state.borrow_mut() {
            UpvalueState::Open { stack_index } => stack[*stack_index] = value,
            UpvalueState::Closed(stored) => *stored = value,
        }
    }

    /// Open -> Closed transition: copy the current stack value into the cell
    /// and stop aliasing the stack. Exactly once per upvalue; a second close
    /// is a caller bug.
    pub fn close(&self, stack: &[LuaValue]) {
        let mut state = self.state.borrow_mut();
        match &*state {
            UpvalueState::Open { stack_index } => {
                *state = UpvalueState::Closed(stack[*stack_index].clone());
            }
            UpvalueState::Closed(_) => {
                debug_assert!(false, "upvalue closed twice");
            }
        }
    }
}

/// Upvalues currently open against the host stack, sorted by descending
/// stack index so closing a stack region drains a prefix.
#[derive(Debug, Default)]
pub struct OpenUpvalues {
    list: Vec<Rc<Upvalue>>,
}

impl OpenUpvalues {
    pub fn new() -> Self {
        OpenUpvalues { list: Vec::new() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// The open upvalue for `stack_index`, reusing an existing cell when one
    /// already targets that slot. Reuse is what gives closures over the same
    /// local a shared cell.
    pub fn find_or_create(&mut self, stack_index: usize) -> Rc<Upvalue> {
        // Descending order: stop as soon as we are below the target
        for (pos, upvalue) in self.list.iter().enumerate() {
            let index = upvalue
                .stack_index()
                .unwrap_or_else(|| unreachable!("closed upvalue in open list"));
            if index == stack_index {
                return upvalue.clone();
            }
            if index < stack_index {
                let created = Upvalue::new_open(stack_index);
                self.list.insert(pos, created.clone());
                return created;
            }
        }
        let created = Upvalue::new_open(stack_index);
        self.list.push(created.clone());
        created
    }

    /// Close every open upvalue at or above `level` and drop it from the
    /// list. Called at frame teardown, before the stack region is reused.
    pub fn close(&mut self, level: usize, stack: &[LuaValue]) {
        let mut keep = 0;
        while keep < self.list.len() {
            match self.list[keep].stack_index() {
                Some(index) if index >= level => keep += 1,
                _ => break,
            }
        }
        for upvalue in self.list.drain(..keep) {
            upvalue.close(stack);
        }
    }
}

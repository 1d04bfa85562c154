// Register-machine executor
//
// The VM owns the value stack that open upvalues alias. Each `call` pushes a
// frame sized to the proto's `max_stack`, dispatches until Return, closes
// the upvalues opened against that frame, and pops it. Nested calls are
// driven by the host (there is no in-bytecode call instruction); frames
// simply stack up in the same buffer.
use std::rc::Rc;

use crate::lua_value::{LuaValue, metamethod};
use crate::lua_vm::closure::{Closure, LuaClosure, instantiate_closure};
use crate::lua_vm::lua_error::{LuaError, LuaResult};
use crate::lua_vm::opcode::OpCode;
use crate::lua_vm::upvalue::OpenUpvalues;

const MAX_STACK: usize = 1 << 16;

#[derive(Debug, Default)]
pub struct LuaVM {
    stack: Vec<LuaValue>,
    open: OpenUpvalues,
}

impl LuaVM {
    pub fn new() -> Self {
        LuaVM {
            stack: Vec::new(),
            open: OpenUpvalues::new(),
        }
    }

    /// Invoke a closure with `args`, returning its results. Native closures
    /// run directly on the host; Lua closures get a stack frame.
    pub fn call(&mut self, closure: &Rc<Closure>, args: &[LuaValue]) -> LuaResult<Vec<LuaValue>> {
        match closure.as_ref() {
            Closure::Native(native) => Ok(vec![native.call(args)]),
            Closure::Lua(lua) => self.call_lua(lua, args),
        }
    }

    fn call_lua(&mut self, closure: &LuaClosure, args: &[LuaValue]) -> LuaResult<Vec<LuaValue>> {
        let proto = closure.proto.clone();
        let base = self.stack.len();
        let frame_top = base + proto.max_stack as usize;
        if frame_top > MAX_STACK {
            return Err(LuaError::StackOverflow);
        }

        // Parameters land in the frame's first registers, surplus arguments
        // are dropped, missing ones read as nil
        let params = (proto.param_count as usize).min(args.len());
        self.stack.extend_from_slice(&args[..params]);
        self.stack.resize(frame_top, LuaValue::Nil);

        let result = self.dispatch(closure, base);

        // Frame teardown: anything still aliasing this region detaches now
        self.open.close(base, &self.stack);
        self.stack.truncate(base);
        result
    }

    fn dispatch(&mut self, closure: &LuaClosure, base: usize) -> LuaResult<Vec<LuaValue>> {
        let proto = &closure.proto;
        let frame_top = base + proto.max_stack as usize;
        // Register operands come from untrusted code, same as constant and
        // upvalue indexes; all three fail the same way
        let reg = |r: usize| -> LuaResult<usize> {
            if r < proto.max_stack as usize {
                Ok(base + r)
            } else {
                Err(LuaError::IndexOutOfBounds)
            }
        };
        let mut pc = 0usize;
        while pc < proto.code.len() {
            let inst = proto.code[pc];
            pc += 1;
            let op = inst.opcode().ok_or(LuaError::InvalidInstruction)?;
            match op {
                OpCode::Move => {
                    let a = reg(inst.a())?;
                    let b = reg(inst.b())?;
                    self.stack[a] = self.stack[b].clone();
                }
                OpCode::LoadK => {
                    let a = reg(inst.a())?;
                    let constant = proto
                        .constants
                        .get(inst.bx())
                        .ok_or(LuaError::IndexOutOfBounds)?;
                    self.stack[a] = constant.clone();
                }
                OpCode::LoadNil => {
                    let a = reg(inst.a())?;
                    let last = reg(inst.a() + inst.b())?;
                    for slot in a..=last {
                        self.stack[slot] = LuaValue::Nil;
                    }
                }
                OpCode::GetUpval => {
                    let a = reg(inst.a())?;
                    if inst.b() >= closure.proto.num_upvalues() {
                        return Err(LuaError::IndexOutOfBounds);
                    }
                    let value = closure.get_upvalue(inst.b(), &self.stack);
                    self.stack[a] = value;
                }
                OpCode::SetUpval => {
                    let b = reg(inst.b())?;
                    if inst.a() >= closure.proto.num_upvalues() {
                        return Err(LuaError::IndexOutOfBounds);
                    }
                    let value = self.stack[b].clone();
                    closure.set_upvalue(inst.a(), &mut self.stack, value);
                }
                OpCode::Closure => {
                    let a = reg(inst.a())?;
                    let nested = proto
                        .protos
                        .get(inst.bx())
                        .ok_or(LuaError::IndexOutOfBounds)?;
                    let instantiated =
                        instantiate_closure(nested, Some(closure), base, &mut self.open);
                    self.stack[a] = LuaValue::Function(Rc::new(Closure::Lua(instantiated)));
                }
                OpCode::Add => {
                    let a = reg(inst.a())?;
                    let b = reg(inst.b())?;
                    let c = reg(inst.c())?;
                    let result = metamethod::add(&self.stack[b], &self.stack[c]);
                    self.stack[a] = result;
                }
                OpCode::Return => {
                    let a = base + inst.a();
                    if a + inst.b() > frame_top {
                        return Err(LuaError::IndexOutOfBounds);
                    }
                    let results = self.stack[a..a + inst.b()].to_vec();
                    return Ok(results);
                }
            }
        }
        // Ran off the end of the code: no results
        Ok(Vec::new())
    }

    /// Current stack depth, for host-side diagnostics.
    #[inline]
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    #[inline]
    pub fn open_upvalue_count(&self) -> usize {
        self.open.len()
    }
}

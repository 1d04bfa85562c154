// Execution side of the runtime: errors, upvalues, protos, closures, and
// the register machine that ties them together.
mod closure;
mod execute;
mod lua_error;
pub mod opcode;
mod proto;
mod upvalue;

pub use closure::{Closure, LuaClosure, NativeClosure, NativeFn, instantiate_closure};
pub use execute::LuaVM;
pub use lua_error::{LuaError, LuaResult};
pub use opcode::{Instruction, OpCode};
pub use proto::{Proto, ProtoBuilder, UpvalueDesc};
pub use upvalue::{OpenUpvalues, Upvalue};

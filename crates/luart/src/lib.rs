// Lua Runtime Substrate
// Tagged values, hybrid array/hash tables, and the closure/upvalue engine
// consumed by compiled Lua code

#[cfg(test)]
mod test;

pub mod lua_value;
pub mod lua_vm;

pub use lua_value::{LuaString, LuaTable, LuaValue, TableRef, metamethod};
pub use lua_vm::{
    Closure, Instruction, LuaClosure, LuaError, LuaResult, LuaVM, NativeClosure, OpCode,
    OpenUpvalues, Proto, Upvalue, UpvalueDesc, instantiate_closure,
};

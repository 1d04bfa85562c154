// Binary arithmetic with metamethod dispatch
//
// Two result policies coexist: the permissive `add`/`sub`/`mul`/`div`
// (operands that coerce to nothing count as 0.0) and the strict
// `try_*` variants that surface a `TypeError` instead.
use crate::lua_value::LuaValue;
use crate::lua_vm::{Closure, LuaError, LuaResult};

pub const MM_ADD: &str = "__add";
pub const MM_SUB: &str = "__sub";
pub const MM_MUL: &str = "__mul";
pub const MM_DIV: &str = "__div";

/// Handler lookup for a binary event: the first operand's metatable wins,
/// then the second's. Lookup is raw (no `__index` recursion).
pub fn get_metamethod(a: &LuaValue, b: &LuaValue, event: &str) -> Option<LuaValue> {
    lookup_in(a, event).or_else(|| lookup_in(b, event))
}

fn lookup_in(operand: &LuaValue, event: &str) -> Option<LuaValue> {
    let table = operand.as_table()?;
    let table = table.borrow();
    let metatable = table.metatable()?;
    let handler = metatable.borrow().get_str(event);
    if handler.is_nil() { None } else { Some(handler) }
}

/// Invoke a found handler with both original operands. Only host functions
/// are callable here (there is no implicit interpreter re-entry from value
/// arithmetic); anything else yields nil, matching the permissive call
/// contract.
fn call_handler(handler: &LuaValue, a: &LuaValue, b: &LuaValue) -> LuaValue {
    if let Some(closure) = handler.as_function() {
        if let Closure::Native(native) = closure.as_ref() {
            return native.call(&[a.clone(), b.clone()]);
        }
    }
    LuaValue::Nil
}

macro_rules! arith_op {
    ($permissive:ident, $strict:ident, $event:expr, $op:tt) => {
        /// Permissive form: a table operand dispatches to its metamethod;
        /// otherwise both operands coerce numerically, with 0.0 standing in
        /// for anything non-coercible.
        pub fn $permissive(a: &LuaValue, b: &LuaValue) -> LuaValue {
            if a.is_table() || b.is_table() {
                if let Some(handler) = get_metamethod(a, b, $event) {
                    return call_handler(&handler, a, b);
                }
            }
            LuaValue::Float(a.as_number_lenient() $op b.as_number_lenient())
        }

        /// Strict form: same dispatch, but an operand with neither a handler
        /// nor a numeric coercion is a `TypeError`.
        pub fn $strict(a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
            if a.is_table() || b.is_table() {
                if let Some(handler) = get_metamethod(a, b, $event) {
                    return Ok(call_handler(&handler, a, b));
                }
            }
            let lhs = coerce_strict(a)?;
            let rhs = coerce_strict(b)?;
            Ok(LuaValue::Float(lhs $op rhs))
        }
    };
}

arith_op!(add, try_add, MM_ADD, +);
arith_op!(sub, try_sub, MM_SUB, -);
arith_op!(mul, try_mul, MM_MUL, *);
arith_op!(div, try_div, MM_DIV, /);

fn coerce_strict(v: &LuaValue) -> LuaResult<f64> {
    v.coerce_number().ok_or(LuaError::TypeError {
        expected: "number",
        got: v.type_name(),
    })
}

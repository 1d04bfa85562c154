// LuaValue - tagged value for the compiled-Lua runtime
//
// A plain enum rather than a NaN-boxed word: the tag set is the same, every
// tag check is one discriminant compare, and the boxed payloads are owned
// `Rc` handles instead of masked raw pointers.
use std::rc::Rc;

use crate::lua_value::lua_convert::str_to_number;
use crate::lua_value::{LuaTable, StringRef, TableRef, hash_u64};
use crate::lua_vm::{Closure, LuaError, LuaResult, NativeClosure, NativeFn};

#[derive(Clone)]
pub enum LuaValue {
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(StringRef),
    Table(TableRef),
    Function(Rc<Closure>),
    LightUserdata(*mut std::ffi::c_void),
}

impl LuaValue {
    // ============ Constructors ============

    #[inline(always)]
    pub const fn nil() -> Self {
        LuaValue::Nil
    }

    #[inline(always)]
    pub const fn boolean(b: bool) -> Self {
        LuaValue::Boolean(b)
    }

    #[inline(always)]
    pub const fn integer(i: i64) -> Self {
        LuaValue::Integer(i)
    }

    #[inline(always)]
    pub const fn float(n: f64) -> Self {
        LuaValue::Float(n)
    }

    #[inline(always)]
    pub const fn number(n: f64) -> Self {
        LuaValue::Float(n)
    }

    pub fn string(s: &str) -> Self {
        LuaValue::String(Rc::new(crate::lua_value::LuaString::new(s)))
    }

    #[inline]
    pub fn from_string_ref(s: StringRef) -> Self {
        LuaValue::String(s)
    }

    #[inline]
    pub fn table(t: TableRef) -> Self {
        LuaValue::Table(t)
    }

    /// Fresh empty table with size hints, wrapped as a value.
    pub fn new_table(array_hint: usize, hash_hint: usize) -> Self {
        LuaValue::Table(LuaTable::create(array_hint, hash_hint))
    }

    #[inline]
    pub fn function(f: Rc<Closure>) -> Self {
        LuaValue::Function(f)
    }

    /// Wrap a host function with no captured upvalues.
    pub fn native_function(f: NativeFn) -> Self {
        LuaValue::Function(Rc::new(Closure::Native(NativeClosure::new(f, Vec::new()))))
    }

    #[inline]
    pub fn light_userdata(p: *mut std::ffi::c_void) -> Self {
        LuaValue::LightUserdata(p)
    }

    // ============ Type predicates ============

    #[inline(always)]
    pub fn is_nil(&self) -> bool {
        matches!(self, LuaValue::Nil)
    }

    #[inline(always)]
    pub fn is_boolean(&self) -> bool {
        matches!(self, LuaValue::Boolean(_))
    }

    #[inline(always)]
    pub fn is_integer(&self) -> bool {
        matches!(self, LuaValue::Integer(_))
    }

    #[inline(always)]
    pub fn is_float(&self) -> bool {
        matches!(self, LuaValue::Float(_))
    }

    #[inline(always)]
    pub fn is_number(&self) -> bool {
        matches!(self, LuaValue::Integer(_) | LuaValue::Float(_))
    }

    #[inline(always)]
    pub fn is_string(&self) -> bool {
        matches!(self, LuaValue::String(_))
    }

    #[inline(always)]
    pub fn is_table(&self) -> bool {
        matches!(self, LuaValue::Table(_))
    }

    #[inline(always)]
    pub fn is_function(&self) -> bool {
        matches!(self, LuaValue::Function(_))
    }

    #[inline(always)]
    pub fn is_light_userdata(&self) -> bool {
        matches!(self, LuaValue::LightUserdata(_))
    }

    // ============ Truthiness (Lua semantics) ============

    /// Only nil and false are falsy
    #[inline(always)]
    pub fn is_truthy(&self) -> bool {
        !self.is_falsy()
    }

    #[inline(always)]
    pub fn is_falsy(&self) -> bool {
        matches!(self, LuaValue::Nil | LuaValue::Boolean(false))
    }

    // ============ Value extraction ============

    #[inline(always)]
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            LuaValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer value; floats with a zero fraction count (Lua 5.4 semantics).
    #[inline(always)]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            LuaValue::Integer(i) => Some(*i),
            LuaValue::Float(f) => {
                // f must round-trip through i64: i64::MAX as f64 rounds up to
                // 2^63 which is not representable, hence the asymmetric range.
                let f = *f;
                if f >= (i64::MIN as f64) && f < -(i64::MIN as f64) && f == (f as i64 as f64) {
                    Some(f as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    #[inline(always)]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            LuaValue::Integer(i) => Some(*i as f64),
            LuaValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Numeric coercion including string parsing (strict form).
    ///
    /// Numeric tags convert directly; strings go through the
    /// locale-independent scanner. Everything else is `None`.
    #[inline]
    pub fn coerce_number(&self) -> Option<f64> {
        match self {
            LuaValue::Integer(i) => Some(*i as f64),
            LuaValue::Float(f) => Some(*f),
            LuaValue::String(s) => str_to_number(s.as_str()),
            _ => None,
        }
    }

    /// Numeric coercion with the permissive zero fallback: anything that
    /// fails to coerce counts as 0.0. Hosts wanting a recoverable error use
    /// `coerce_number` / the `try_*` arithmetic.
    #[inline]
    pub fn as_number_lenient(&self) -> f64 {
        self.coerce_number().unwrap_or(0.0)
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LuaValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[inline]
    pub fn as_string_ref(&self) -> Option<&StringRef> {
        match self {
            LuaValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_table(&self) -> Option<&TableRef> {
        match self {
            LuaValue::Table(t) => Some(t),
            _ => None,
        }
    }

    #[inline]
    pub fn as_function(&self) -> Option<&Rc<Closure>> {
        match self {
            LuaValue::Function(f) => Some(f),
            _ => None,
        }
    }

    // ============ Indexing (unified TypeError on non-tables) ============

    /// `value[key]` for reads. Never allocates a slot.
    pub fn index(&self, key: &LuaValue) -> LuaResult<LuaValue> {
        match self {
            LuaValue::Table(t) => t.borrow().raw_get(key),
            _ => Err(LuaError::TypeError {
                expected: "table",
                got: self.type_name(),
            }),
        }
    }

    /// `value[key] = v`.
    pub fn set_index(&self, key: LuaValue, value: LuaValue) -> LuaResult<()> {
        match self {
            LuaValue::Table(t) => t.borrow_mut().raw_set(key, value),
            _ => Err(LuaError::TypeError {
                expected: "table",
                got: self.type_name(),
            }),
        }
    }

    // ============ Type name / kind ============

    pub fn type_name(&self) -> &'static str {
        match self {
            LuaValue::Nil => "nil",
            LuaValue::Boolean(_) => "boolean",
            LuaValue::Integer(_) | LuaValue::Float(_) => "number",
            LuaValue::String(_) => "string",
            LuaValue::Table(_) => "table",
            LuaValue::Function(_) => "function",
            LuaValue::LightUserdata(_) => "userdata",
        }
    }

    pub fn kind(&self) -> LuaValueKind {
        match self {
            LuaValue::Nil => LuaValueKind::Nil,
            LuaValue::Boolean(_) => LuaValueKind::Boolean,
            LuaValue::Integer(_) => LuaValueKind::Integer,
            LuaValue::Float(_) => LuaValueKind::Float,
            LuaValue::String(_) => LuaValueKind::String,
            LuaValue::Table(_) => LuaValueKind::Table,
            LuaValue::Function(_) => LuaValueKind::Function,
            LuaValue::LightUserdata(_) => LuaValueKind::Userdata,
        }
    }

    /// Hash for table keys. Consistent with `==` given that exact-integer
    /// float keys are normalized to integers before they reach the hash part.
    #[inline]
    pub fn hash_value(&self) -> u64 {
        match self {
            // nil keys are rejected before hashing
            LuaValue::Nil => 0,
            LuaValue::Boolean(b) => hash_u64(1 | (*b as u64) << 8),
            LuaValue::Integer(i) => hash_u64(*i as u64),
            LuaValue::Float(f) => hash_u64(f.to_bits()),
            LuaValue::String(s) => s.cached_hash(),
            LuaValue::Table(t) => hash_u64(Rc::as_ptr(t) as usize as u64),
            LuaValue::Function(f) => hash_u64(Rc::as_ptr(f) as usize as u64),
            LuaValue::LightUserdata(p) => hash_u64(*p as usize as u64),
        }
    }
}

impl Default for LuaValue {
    #[inline(always)]
    fn default() -> Self {
        LuaValue::Nil
    }
}

impl PartialEq for LuaValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LuaValue::Nil, LuaValue::Nil) => true,
            (LuaValue::Boolean(a), LuaValue::Boolean(b)) => a == b,
            (LuaValue::Integer(a), LuaValue::Integer(b)) => a == b,
            // Bitwise compare: identical bit patterns are equal, which keeps
            // equality total (NaN can be a table key) and consistent with
            // `hash_value`
            (LuaValue::Float(a), LuaValue::Float(b)) => a.to_bits() == b.to_bits(),
            // Same pointer short-circuits; otherwise content comparison
            (LuaValue::String(a), LuaValue::String(b)) => Rc::ptr_eq(a, b) || a == b,
            (LuaValue::Table(a), LuaValue::Table(b)) => Rc::ptr_eq(a, b),
            (LuaValue::Function(a), LuaValue::Function(b)) => Rc::ptr_eq(a, b),
            (LuaValue::LightUserdata(a), LuaValue::LightUserdata(b)) => a == b,
            // All cross-tag comparisons are false, including Integer vs
            // Float: key normalization, not equality, makes t[1.0] == t[1]
            _ => false,
        }
    }
}

impl Eq for LuaValue {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LuaValueKind {
    Nil,
    Boolean,
    Integer,
    Float,
    String,
    Table,
    Function,
    Userdata,
}

impl std::fmt::Debug for LuaValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LuaValue::Nil => write!(f, "nil"),
            LuaValue::Boolean(b) => write!(f, "{}", b),
            LuaValue::Integer(i) => write!(f, "{}", i),
            LuaValue::Float(n) => write!(f, "{}", n),
            LuaValue::String(s) => write!(f, "\"{}\"", s.as_str()),
            LuaValue::Table(t) => write!(f, "table({:p})", Rc::as_ptr(t)),
            LuaValue::Function(c) => write!(f, "function({:p})", Rc::as_ptr(c)),
            LuaValue::LightUserdata(p) => write!(f, "userdata({:p})", p),
        }
    }
}

impl std::fmt::Display for LuaValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LuaValue::Nil => write!(f, "nil"),
            LuaValue::Boolean(b) => write!(f, "{}", b),
            LuaValue::Integer(i) => {
                let mut buf = itoa::Buffer::new();
                f.write_str(buf.format(*i))
            }
            LuaValue::Float(n) => {
                let n = *n;
                if n.floor() == n && n.abs() < 1e14 {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            LuaValue::String(s) => f.write_str(s.as_str()),
            LuaValue::Table(t) => write!(f, "table: 0x{:x}", Rc::as_ptr(t) as usize),
            LuaValue::Function(c) => write!(f, "function: 0x{:x}", Rc::as_ptr(c) as usize),
            LuaValue::LightUserdata(p) => write!(f, "userdata: 0x{:x}", *p as usize),
        }
    }
}

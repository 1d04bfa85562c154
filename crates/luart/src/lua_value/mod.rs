// Value representation for compiled Lua programs
mod lua_convert;
mod lua_table;
mod lua_value;
pub mod metamethod;

use std::rc::Rc;

use smol_str::SmolStr;

pub use lua_table::{HashPart, LuaTable, TableRef};
pub use lua_value::{LuaValue, LuaValueKind};

/// Fixed-seed hasher state. Table probing derives `h1`/`h2` from these
/// hashes, so they must be stable for the lifetime of the process; the
/// seeds themselves are arbitrary.
#[inline]
fn hash_state() -> ahash::RandomState {
    ahash::RandomState::with_seeds(
        0x2435_7f86_15af_b6d1,
        0x9e37_79b9_7f4a_7c15,
        0x5851_f42d_4c95_7f2d,
        0x1405_7b7e_f767_814f,
    )
}

#[inline]
pub(crate) fn hash_bytes(bytes: &[u8]) -> u64 {
    hash_state().hash_one(bytes)
}

#[inline]
pub(crate) fn hash_u64(v: u64) -> u64 {
    hash_state().hash_one(v)
}

/// Lua string (immutable, with cached content hash)
///
/// Strings are not interned: two independently created `LuaString`s with the
/// same bytes compare equal and hash identically, so table lookups never
/// depend on pointer identity.
#[derive(Debug, Clone)]
pub struct LuaString {
    hash: u64, // keep hash first for alignment
    text: SmolStr,
}

impl LuaString {
    pub fn new(text: impl Into<SmolStr>) -> Self {
        let text = text.into();
        let hash = hash_bytes(text.as_bytes());
        LuaString { hash, text }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    #[inline]
    pub fn cached_hash(&self) -> u64 {
        self.hash
    }
}

impl PartialEq for LuaString {
    fn eq(&self, other: &Self) -> bool {
        // Fast path: compare cached hashes first
        if self.hash != other.hash {
            return false;
        }
        self.text == other.text
    }
}

impl Eq for LuaString {}

impl std::hash::Hash for LuaString {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl From<&str> for LuaString {
    fn from(s: &str) -> Self {
        LuaString::new(s)
    }
}

/// Shared string handle as stored inside `LuaValue`.
pub type StringRef = Rc<LuaString>;

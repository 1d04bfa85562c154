/// Lightweight error enum - kept small and `Copy` so `LuaResult` stays cheap
/// to return from hot paths.
///
/// Programmer errors (indexing a non-table, nil table keys, resuming
/// iteration from a vanished key) are recoverable variants here; only
/// structural invariant violations assert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LuaError {
    /// Operation applied to a value of the wrong type
    TypeError {
        expected: &'static str,
        got: &'static str,
    },
    /// Nil used as a table key
    NilIndex,
    /// Iteration resumed from a key that is not in the table
    KeyNotFound,
    /// Register or upvalue index outside the frame
    IndexOutOfBounds,
    /// Value stack exceeded its limit
    StackOverflow,
    /// Instruction byte does not decode to a known opcode
    InvalidInstruction,
}

impl std::fmt::Display for LuaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LuaError::TypeError { expected, got } => {
                write!(f, "type error: expected {}, got {}", expected, got)
            }
            LuaError::NilIndex => write!(f, "table index is nil"),
            LuaError::KeyNotFound => write!(f, "invalid key to 'next'"),
            LuaError::IndexOutOfBounds => write!(f, "index out of bounds"),
            LuaError::StackOverflow => write!(f, "stack overflow"),
            LuaError::InvalidInstruction => write!(f, "invalid instruction"),
        }
    }
}

impl std::error::Error for LuaError {}

pub type LuaResult<T> = Result<T, LuaError>;

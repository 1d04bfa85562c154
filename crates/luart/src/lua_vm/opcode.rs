// Instruction encoding for the register machine
//
// 32-bit instructions, two layouts:
//   ABC:  op(8) | A(8) | B(8) | C(8)
//   ABx:  op(8) | A(8) | Bx(16)

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    /// R[A] := R[B]
    Move = 0,
    /// R[A] := K[Bx]
    LoadK,
    /// R[A..=A+B] := nil
    LoadNil,
    /// R[A] := UpValue[B]
    GetUpval,
    /// UpValue[A] := R[B]
    SetUpval,
    /// R[A] := closure(Proto[Bx]) capturing per its descriptors
    Closure,
    /// R[A] := R[B] + R[C]
    Add,
    /// return R[A..A+B]; closes the frame's open upvalues
    Return,
}

impl OpCode {
    pub fn from_u8(raw: u8) -> Option<OpCode> {
        Some(match raw {
            0 => OpCode::Move,
            1 => OpCode::LoadK,
            2 => OpCode::LoadNil,
            3 => OpCode::GetUpval,
            4 => OpCode::SetUpval,
            5 => OpCode::Closure,
            6 => OpCode::Add,
            7 => OpCode::Return,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Instruction(u32);

impl Instruction {
    pub const fn abc(op: OpCode, a: u8, b: u8, c: u8) -> Self {
        Instruction((op as u32) | (a as u32) << 8 | (b as u32) << 16 | (c as u32) << 24)
    }

    pub const fn abx(op: OpCode, a: u8, bx: u16) -> Self {
        Instruction((op as u32) | (a as u32) << 8 | (bx as u32) << 16)
    }

    /// Raw 32-bit form, for loaders that read precompiled code.
    pub const fn from_raw(raw: u32) -> Self {
        Instruction(raw)
    }

    #[inline(always)]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline(always)]
    pub fn opcode(self) -> Option<OpCode> {
        OpCode::from_u8((self.0 & 0xff) as u8)
    }

    #[inline(always)]
    pub fn a(self) -> usize {
        ((self.0 >> 8) & 0xff) as usize
    }

    #[inline(always)]
    pub fn b(self) -> usize {
        ((self.0 >> 16) & 0xff) as usize
    }

    #[inline(always)]
    pub fn c(self) -> usize {
        ((self.0 >> 24) & 0xff) as usize
    }

    #[inline(always)]
    pub fn bx(self) -> usize {
        (self.0 >> 16) as usize
    }
}

impl std::fmt::Debug for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.opcode() {
            Some(op) => write!(f, "{:?} a={} b={} c={}", op, self.a(), self.b(), self.c()),
            None => write!(f, "invalid({:#010x})", self.0),
        }
    }
}

//! Stack-machine instruction set.
//!
//! Every opcode carries zero, one, or two unsigned operands. Operator
//! opcodes (`add`, `lt`, `bit_shl`, ...) take no operands; they pop their
//! inputs from the operand stack and dispatch the matching magic method on
//! the left operand. The `jmp` family holds absolute instruction indices
//! resolved at compile time.

use serde::{Deserialize, Serialize};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    // Control
    Nop,
    Jmp,
    JmpTrue,
    JmpFalse,
    // Arithmetic
    Neg,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // In-place arithmetic (compound assignment)
    IAdd,
    ISub,
    IMul,
    IDiv,
    IMod,
    // Comparison
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    // Bitwise
    BitNot,
    BitOr,
    BitXor,
    BitAnd,
    BitShl,
    BitShr,
    // Casts
    Str,
    Boolean,
    // Functions
    Call,
    Ret,
    // Objects
    NewObj,
    Init,
    NewFunc,
    NewNum,
    NewStr,
    NewBoolean,
    NewArr,
    Null,
    GetProp,
    HasProp,
    SetProp,
    GetParent,
    // Loads and stores
    LdLoc,
    StLoc,
    LdGbl,
    StGbl,
    // Other
    Print,
    Import,
}

impl Op {
    pub fn name(self) -> &'static str {
        match self {
            Op::Nop => "nop",
            Op::Jmp => "jmp",
            Op::JmpTrue => "jmp_true",
            Op::JmpFalse => "jmp_false",
            Op::Neg => "neg",
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Mul => "mul",
            Op::Div => "div",
            Op::Mod => "mod",
            Op::IAdd => "iadd",
            Op::ISub => "isub",
            Op::IMul => "imul",
            Op::IDiv => "idiv",
            Op::IMod => "imod",
            Op::Eq => "eq",
            Op::Neq => "neq",
            Op::Lt => "lt",
            Op::Gt => "gt",
            Op::Lte => "lte",
            Op::Gte => "gte",
            Op::BitNot => "bit_not",
            Op::BitOr => "bit_or",
            Op::BitXor => "bit_xor",
            Op::BitAnd => "bit_and",
            Op::BitShl => "bit_shl",
            Op::BitShr => "bit_shr",
            Op::Str => "str",
            Op::Boolean => "boolean",
            Op::Call => "call",
            Op::Ret => "ret",
            Op::NewObj => "new_obj",
            Op::Init => "init",
            Op::NewFunc => "new_func",
            Op::NewNum => "new_num",
            Op::NewStr => "new_str",
            Op::NewBoolean => "new_boolean",
            Op::NewArr => "new_arr",
            Op::Null => "null",
            Op::GetProp => "get_prop",
            Op::HasProp => "has_prop",
            Op::SetProp => "set_prop",
            Op::GetParent => "get_parent",
            Op::LdLoc => "ldloc",
            Op::StLoc => "stloc",
            Op::LdGbl => "ldgbl",
            Op::StGbl => "stgbl",
            Op::Print => "print",
            Op::Import => "import",
        }
    }

    /// Number of instruction operands the opcode carries.
    pub fn arg_count(self) -> usize {
        match self {
            Op::Jmp
            | Op::JmpTrue
            | Op::JmpFalse
            | Op::Call
            | Op::Init
            | Op::NewFunc
            | Op::NewNum
            | Op::NewStr
            | Op::NewBoolean
            | Op::NewArr
            | Op::GetProp
            | Op::HasProp
            | Op::SetProp
            | Op::LdLoc
            | Op::StLoc
            | Op::LdGbl
            | Op::StGbl
            | Op::Import => 1,
            Op::NewObj => 2,
            _ => 0,
        }
    }
}

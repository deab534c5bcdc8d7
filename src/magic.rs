//! Magic-method names.
//!
//! The interpreter never builds these strings at dispatch time; every hook
//! resolves through a `&'static str` drawn from this fixed table, so a
//! property lookup costs one hash probe and no allocation.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Magic {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    IAdd,
    ISub,
    IMul,
    IDiv,
    IMod,
    Neg,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    BitNot,
    BitOr,
    BitXor,
    BitAnd,
    BitShl,
    BitShr,
    Str,
    Boolean,
    Call,
    Clone,
    Init,
    Iter,
    Cur,
    Done,
    Next,
}

impl Magic {
    pub fn name(self) -> &'static str {
        match self {
            Magic::Add => "__add__",
            Magic::Sub => "__sub__",
            Magic::Mul => "__mul__",
            Magic::Div => "__div__",
            Magic::Mod => "__mod__",
            Magic::IAdd => "__iadd__",
            Magic::ISub => "__isub__",
            Magic::IMul => "__imul__",
            Magic::IDiv => "__idiv__",
            Magic::IMod => "__imod__",
            Magic::Neg => "__neg__",
            Magic::Eq => "__eq__",
            Magic::Neq => "__neq__",
            Magic::Lt => "__lt__",
            Magic::Gt => "__gt__",
            Magic::Lte => "__lte__",
            Magic::Gte => "__gte__",
            Magic::BitNot => "__bit_not__",
            Magic::BitOr => "__bit_or__",
            Magic::BitXor => "__bit_xor__",
            Magic::BitAnd => "__bit_and__",
            Magic::BitShl => "__bit_shl__",
            Magic::BitShr => "__bit_shr__",
            Magic::Str => "__str__",
            Magic::Boolean => "__boolean__",
            Magic::Call => "__call__",
            Magic::Clone => "__clone__",
            Magic::Init => "__init__",
            Magic::Iter => "__iter__",
            Magic::Cur => "__cur__",
            Magic::Done => "__done__",
            Magic::Next => "__next__",
        }
    }
}

//! Operators and call modes.

use std::fmt;

/// Operator applied by an `apply_operator` instruction.
///
/// Unary operators consume the top of the evaluation stack; binary operators
/// consume the top two (left operand deeper).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Xop {
    // Unary
    IncPost,
    DecPost,
    IncPre,
    DecPre,
    Pos,
    Neg,
    NotB,
    NotL,
    Unset,
    Countof,
    Typeof,
    Abs,
    Sign,
    Head,
    Tail,

    // Binary
    Subscr,
    CmpEq,
    CmpNe,
    CmpLt,
    CmpGt,
    CmpLte,
    CmpGte,
    Cmp3way,
    CmpUn,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Sll,
    Srl,
    Sla,
    Sra,
    AndB,
    OrB,
    XorB,
    Assign,
}

impl Xop {
    /// Whether the operator takes a single operand.
    pub fn is_unary(self) -> bool {
        matches!(
            self,
            Xop::IncPost
                | Xop::DecPost
                | Xop::IncPre
                | Xop::DecPre
                | Xop::Pos
                | Xop::Neg
                | Xop::NotB
                | Xop::NotL
                | Xop::Unset
                | Xop::Countof
                | Xop::Typeof
                | Xop::Abs
                | Xop::Sign
                | Xop::Head
                | Xop::Tail
        )
    }

    /// Source spelling, for diagnostics.
    pub fn as_symbol(self) -> &'static str {
        match self {
            Xop::IncPost | Xop::IncPre => "++",
            Xop::DecPost | Xop::DecPre => "--",
            Xop::Pos | Xop::Add => "+",
            Xop::Neg | Xop::Sub => "-",
            Xop::NotB => "~",
            Xop::NotL => "!",
            Xop::Unset => "unset",
            Xop::Countof => "countof",
            Xop::Typeof => "typeof",
            Xop::Abs => "__abs",
            Xop::Sign => "__sign",
            Xop::Head => "[^]",
            Xop::Tail => "[$]",
            Xop::Subscr => "[]",
            Xop::CmpEq => "==",
            Xop::CmpNe => "!=",
            Xop::CmpLt => "<",
            Xop::CmpGt => ">",
            Xop::CmpLte => "<=",
            Xop::CmpGte => ">=",
            Xop::Cmp3way => "<=>",
            Xop::CmpUn => "</>",
            Xop::Mul => "*",
            Xop::Div => "/",
            Xop::Mod => "%",
            Xop::Sll => "<<<",
            Xop::Srl => ">>>",
            Xop::Sla => "<<",
            Xop::Sra => ">>",
            Xop::AndB => "&",
            Xop::OrB => "|",
            Xop::XorB => "^",
            Xop::Assign => "=",
        }
    }
}

impl fmt::Display for Xop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_symbol())
    }
}

/// How a call in tail position hands its result back.
///
/// Anything other than `None` makes the call a proper tail call: the callee
/// runs in place of the caller's frame and the mode is applied to the final
/// result once the tail-call chain settles.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum PtcAware {
    /// Not in tail position.
    #[default]
    None,
    /// `return ref f(...)`: the callee's reference is returned as is.
    ByRef,
    /// `return f(...)`: the result is converted to a temporary.
    ByVal,
    /// Call statement at the end of a function returning nothing.
    Void,
}

impl PtcAware {
    /// Whether the call site is in tail position.
    #[inline]
    pub fn is_tail(self) -> bool {
        !matches!(self, PtcAware::None)
    }
}

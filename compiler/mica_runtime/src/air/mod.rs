//! The instruction set.
//!
//! A compiled function body is a tree of `AirNode`s: a closed enum matched
//! exhaustively by the interpreter, so there is no dynamic dispatch per
//! executed instruction. Every variant carries only its execution-time
//! operands: resolved source locations, nested bodies, `(name, depth)`
//! pairs and bound literal values.
//!
//! Nested bodies are `Program`s, shared slices that the interpreter walks
//! in place and that deferred bodies can hold without copying.
//!
//! # Control Flow
//!
//! Early exits travel as an `AirStatus` returned from every nested execution,
//! never as values on the evaluation stack.

mod solidify;

pub(crate) use solidify::scope_index;

use std::cell::Cell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use mica_ir::{Name, PtcAware, SourceLocation, Xop};

use crate::reference::Reference;
use crate::value::Value;
use crate::variable::SharedVariable;

/// Outcome of executing a node or a body.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum AirStatus {
    /// Continue with the next node.
    #[default]
    Next,
    /// `return;`
    ReturnVoid,
    /// `return` with the result on top of the evaluation stack.
    ReturnRef,
    /// `break` to the innermost switch or loop.
    BreakUnspec,
    BreakSwitch,
    BreakWhile,
    BreakFor,
    /// `continue` to the innermost loop.
    ContinueUnspec,
    ContinueWhile,
    ContinueFor,
}

impl AirStatus {
    /// Whether execution leaves the current body.
    #[inline]
    pub fn is_exit(self) -> bool {
        self != AirStatus::Next
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AirStatus::Next => "next",
            AirStatus::ReturnVoid => "return",
            AirStatus::ReturnRef => "return ref",
            AirStatus::BreakUnspec => "break",
            AirStatus::BreakSwitch => "break switch",
            AirStatus::BreakWhile => "break while",
            AirStatus::BreakFor => "break for",
            AirStatus::ContinueUnspec => "continue",
            AirStatus::ContinueWhile => "continue while",
            AirStatus::ContinueFor => "continue for",
        }
    }
}

/// A linear instruction sequence.
///
/// Cloning shares the nodes.
#[derive(Clone, Default)]
pub struct Program(Rc<[AirNode]>);

impl Program {
    /// Report every Variable bound into the program.
    pub fn enumerate_variables(&self, callback: &mut dyn FnMut(&SharedVariable)) {
        for node in self.iter() {
            node.enumerate_variables(callback);
        }
    }
}

impl Deref for Program {
    type Target = [AirNode];

    #[inline]
    fn deref(&self) -> &[AirNode] {
        &self.0
    }
}

impl From<Vec<AirNode>> for Program {
    fn from(nodes: Vec<AirNode>) -> Self {
        Program(nodes.into())
    }
}

impl FromIterator<AirNode> for Program {
    fn from_iter<I: IntoIterator<Item = AirNode>>(iter: I) -> Self {
        Program(iter.into_iter().collect())
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// One instruction.
#[derive(Clone, Debug)]
pub enum AirNode {
    /// Statement boundary: empty the evaluation stack.
    ClearStack,

    /// Run `body` in a nested scope.
    ExecuteBlock { body: Program },

    /// Allocate an uninitialized variable, bind it, push its reference.
    DeclareVariable { sloc: SourceLocation, name: Name },

    /// Pop the initializer and initialize the variable below it, then pop
    /// the variable.
    InitializeVariable {
        sloc: SourceLocation,
        immutable: bool,
    },

    /// Declare and initialize with null.
    DefineNullVariable {
        sloc: SourceLocation,
        name: Name,
        immutable: bool,
    },

    /// Bind `name` to a placeholder, for a later `InitializeReference`.
    DeclareReference { name: Name },

    /// Pop a reference and bind it to `name`.
    InitializeReference { sloc: SourceLocation, name: Name },

    IfStatement {
        negative: bool,
        code_true: Program,
        code_false: Program,
    },

    /// `code_labels[i]` is empty for the `default` clause. `names_added[i]`
    /// lists the names clause `i` declares.
    SwitchStatement {
        code_labels: Vec<Program>,
        code_bodies: Vec<Program>,
        names_added: Vec<Vec<Name>>,
    },

    WhileStatement {
        negative: bool,
        code_cond: Program,
        code_body: Program,
    },

    DoWhileStatement {
        code_body: Program,
        negative: bool,
        code_cond: Program,
    },

    /// An empty `code_cond` loops forever.
    ForStatement {
        code_init: Program,
        code_cond: Program,
        code_step: Program,
        code_body: Program,
    },

    ForEachStatement {
        name_key: Name,
        name_mapped: Name,
        code_init: Program,
        code_body: Program,
    },

    TryStatement {
        sloc_try: SourceLocation,
        code_try: Program,
        sloc_catch: SourceLocation,
        name_except: Name,
        code_catch: Program,
    },

    ThrowStatement { sloc: SourceLocation },

    AssertStatement {
        sloc: SourceLocation,
        negative: bool,
        msg: String,
    },

    SimpleStatus { status: AirStatus },

    /// Replace the top reference with a temporary of its value.
    GlvalueToPrvalue { sloc: SourceLocation },

    PushConstant { value: Value },

    PushGlobalReference { sloc: SourceLocation, name: Name },

    /// Resolve `name` in the scope `depth` levels up. `hint` caches the
    /// bucket index of the last successful lookup.
    PushLocalReference {
        sloc: SourceLocation,
        depth: u32,
        name: Name,
        hint: Cell<usize>,
    },

    /// A reference captured when the enclosing closure was instantiated.
    PushBoundReference { reference: Reference },

    DefineFunction {
        sloc: SourceLocation,
        name: String,
        params: Vec<Name>,
        code_body: Program,
    },

    /// `?:`. An empty branch keeps the condition as the result. With `assign`
    /// the branch result is written back into the condition (`&&=`, `||=`).
    BranchExpression {
        sloc: SourceLocation,
        code_true: Program,
        code_false: Program,
        assign: bool,
    },

    /// `??` and `??=`.
    Coalescence {
        sloc: SourceLocation,
        code_null: Program,
        assign: bool,
    },

    FunctionCall {
        sloc: SourceLocation,
        nargs: usize,
        ptc: PtcAware,
    },

    /// Arguments come from a null, an array, or a generator function.
    VariadicCall { sloc: SourceLocation, ptc: PtcAware },

    MemberAccess { sloc: SourceLocation, name: Name },

    PushUnnamedArray { sloc: SourceLocation, nelems: usize },

    PushUnnamedObject { sloc: SourceLocation, keys: Vec<Name> },

    ApplyOperator {
        sloc: SourceLocation,
        xop: Xop,
        assign: bool,
    },

    UnpackStructArray {
        sloc: SourceLocation,
        immutable: bool,
        nelems: usize,
    },

    UnpackStructObject {
        sloc: SourceLocation,
        immutable: bool,
        keys: Vec<Name>,
    },

    /// Report the location to the hooks. No state change.
    SingleStepTrap { sloc: SourceLocation },

    /// Run `code_body` when the current scope exits.
    DeferExpression {
        sloc: SourceLocation,
        code_body: Program,
    },
}

impl AirNode {
    /// Local reference with an empty hint.
    pub fn local_reference(sloc: SourceLocation, depth: u32, name: Name) -> Self {
        AirNode::PushLocalReference {
            sloc,
            depth,
            name,
            hint: Cell::new(usize::MAX),
        }
    }

    /// Location reported for errors raised by this node.
    pub fn sloc(&self) -> Option<&SourceLocation> {
        match self {
            AirNode::DeclareVariable { sloc, .. }
            | AirNode::InitializeVariable { sloc, .. }
            | AirNode::DefineNullVariable { sloc, .. }
            | AirNode::InitializeReference { sloc, .. }
            | AirNode::ThrowStatement { sloc }
            | AirNode::AssertStatement { sloc, .. }
            | AirNode::GlvalueToPrvalue { sloc }
            | AirNode::PushGlobalReference { sloc, .. }
            | AirNode::PushLocalReference { sloc, .. }
            | AirNode::DefineFunction { sloc, .. }
            | AirNode::BranchExpression { sloc, .. }
            | AirNode::Coalescence { sloc, .. }
            | AirNode::FunctionCall { sloc, .. }
            | AirNode::VariadicCall { sloc, .. }
            | AirNode::MemberAccess { sloc, .. }
            | AirNode::PushUnnamedArray { sloc, .. }
            | AirNode::PushUnnamedObject { sloc, .. }
            | AirNode::ApplyOperator { sloc, .. }
            | AirNode::UnpackStructArray { sloc, .. }
            | AirNode::UnpackStructObject { sloc, .. }
            | AirNode::SingleStepTrap { sloc }
            | AirNode::DeferExpression { sloc, .. } => Some(sloc),
            AirNode::TryStatement { sloc_try, .. } => Some(sloc_try),
            AirNode::ClearStack
            | AirNode::ExecuteBlock { .. }
            | AirNode::DeclareReference { .. }
            | AirNode::IfStatement { .. }
            | AirNode::SwitchStatement { .. }
            | AirNode::WhileStatement { .. }
            | AirNode::DoWhileStatement { .. }
            | AirNode::ForStatement { .. }
            | AirNode::ForEachStatement { .. }
            | AirNode::SimpleStatus { .. }
            | AirNode::PushConstant { .. }
            | AirNode::PushBoundReference { .. } => None,
        }
    }

    /// Report every Variable bound into this node or its bodies.
    pub fn enumerate_variables(&self, callback: &mut dyn FnMut(&SharedVariable)) {
        match self {
            AirNode::PushConstant { value } => value.enumerate_variables(callback),
            AirNode::PushBoundReference { reference } => reference.enumerate_variables(callback),
            _ => {
                for body in self.bodies() {
                    body.enumerate_variables(callback);
                }
            }
        }
    }

    /// Nested bodies.
    pub fn bodies(&self) -> Vec<&Program> {
        match self {
            AirNode::ExecuteBlock { body } => vec![body],
            AirNode::IfStatement {
                code_true,
                code_false,
                ..
            }
            | AirNode::BranchExpression {
                code_true,
                code_false,
                ..
            } => vec![code_true, code_false],
            AirNode::SwitchStatement {
                code_labels,
                code_bodies,
                ..
            } => code_labels.iter().chain(code_bodies.iter()).collect(),
            AirNode::WhileStatement {
                code_cond,
                code_body,
                ..
            }
            | AirNode::DoWhileStatement {
                code_body,
                code_cond,
                ..
            } => vec![code_cond, code_body],
            AirNode::ForStatement {
                code_init,
                code_cond,
                code_step,
                code_body,
            } => vec![code_init, code_cond, code_step, code_body],
            AirNode::ForEachStatement {
                code_init,
                code_body,
                ..
            } => vec![code_init, code_body],
            AirNode::TryStatement {
                code_try,
                code_catch,
                ..
            } => vec![code_try, code_catch],
            AirNode::DefineFunction { code_body, .. }
            | AirNode::DeferExpression { code_body, .. } => vec![code_body],
            AirNode::Coalescence { code_null, .. } => vec![code_null],
            AirNode::ClearStack
            | AirNode::DeclareVariable { .. }
            | AirNode::InitializeVariable { .. }
            | AirNode::DefineNullVariable { .. }
            | AirNode::DeclareReference { .. }
            | AirNode::InitializeReference { .. }
            | AirNode::ThrowStatement { .. }
            | AirNode::AssertStatement { .. }
            | AirNode::SimpleStatus { .. }
            | AirNode::GlvalueToPrvalue { .. }
            | AirNode::PushConstant { .. }
            | AirNode::PushGlobalReference { .. }
            | AirNode::PushLocalReference { .. }
            | AirNode::PushBoundReference { .. }
            | AirNode::FunctionCall { .. }
            | AirNode::VariadicCall { .. }
            | AirNode::MemberAccess { .. }
            | AirNode::PushUnnamedArray { .. }
            | AirNode::PushUnnamedObject { .. }
            | AirNode::ApplyOperator { .. }
            | AirNode::UnpackStructArray { .. }
            | AirNode::UnpackStructObject { .. }
            | AirNode::SingleStepTrap { .. } => Vec::new(),
        }
    }
}

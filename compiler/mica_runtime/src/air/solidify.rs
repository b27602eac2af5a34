//! Solidification and closure rebinding.
//!
//! Both passes rebuild a node with transformed bodies through `map_bodies`,
//! which also reports how many scopes each body runs below the node. The
//! interpreter opens scopes in exactly these places:
//!
//! | Body | Extra scopes |
//! |------|--------------|
//! | block, `if` branches, switch bodies, loop bodies, `try`, `catch` | 1 |
//! | `for` / `for each` init, condition and step | 1 |
//! | `for` / `for each` body | 2 |
//! | function body | 1 |
//! | switch labels, loop conditions, `defer`, expression operands | 0 |

use std::convert::Infallible;

use mica_ir::Name;

use super::{AirNode, Program};
use crate::errors::{bypassed_initialization, undeclared_identifier, FatalError, RuntimeResult};
use crate::reference_dictionary::ReferenceDictionary;

impl Program {
    /// Flatten `nodes` into an executable program.
    ///
    /// Nodes after one that always leaves the body (a status other than
    /// `Next`, a throw, a tail call, or a block or `if` that always leaves)
    /// are dropped, recursively in every nested body.
    pub fn solidify(nodes: &[AirNode]) -> Program {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            let node = match node.map_bodies(&mut |body, _| Ok::<_, Infallible>(Program::solidify(body))) {
                Ok(node) => node,
                Err(never) => match never {},
            };
            let terminates = node.terminates();
            out.push(node);
            if terminates {
                break;
            }
        }
        Program::from(out)
    }
}

impl AirNode {
    /// Whether executing the node always leaves the enclosing body.
    pub fn terminates(&self) -> bool {
        match self {
            AirNode::SimpleStatus { status } => status.is_exit(),
            AirNode::ThrowStatement { .. } => true,
            AirNode::FunctionCall { ptc, .. } | AirNode::VariadicCall { ptc, .. } => ptc.is_tail(),
            AirNode::ExecuteBlock { body } => body.iter().any(AirNode::terminates),
            AirNode::IfStatement {
                code_true,
                code_false,
                ..
            } => {
                code_true.iter().any(AirNode::terminates)
                    && code_false.iter().any(AirNode::terminates)
            }
            _ => false,
        }
    }

    /// Rewrite references that reach out of a closure into bound references.
    ///
    /// `levels` is the number of scopes between this node and the closure
    /// boundary. A local reference reaching `depth >= levels` scopes up names
    /// a scope of the defining frame, `scopes` (innermost last); it is
    /// replaced by the reference currently bound there.
    pub(crate) fn rebind(&self, scopes: &[&ReferenceDictionary], levels: u32) -> RuntimeResult<AirNode> {
        if let AirNode::PushLocalReference {
            sloc, depth, name, ..
        } = self
        {
            if *depth < levels {
                return Ok(self.clone());
            }
            return bound_reference(scopes, *depth - levels, name)
                .map(|reference| AirNode::PushBoundReference { reference })
                .map_err(|e| e.at(sloc));
        }
        self.map_bodies(&mut |body, extra| {
            body.iter()
                .map(|node| node.rebind(scopes, levels + extra))
                .collect::<RuntimeResult<Program>>()
        })
    }

    /// Copy of the node with every nested body replaced by `f(body, extra)`,
    /// where `extra` is the number of scopes the body runs below the node.
    pub(crate) fn map_bodies<E>(
        &self,
        f: &mut dyn FnMut(&Program, u32) -> Result<Program, E>,
    ) -> Result<AirNode, E> {
        Ok(match self {
            AirNode::ExecuteBlock { body } => AirNode::ExecuteBlock { body: f(body, 1)? },
            AirNode::IfStatement {
                negative,
                code_true,
                code_false,
            } => AirNode::IfStatement {
                negative: *negative,
                code_true: f(code_true, 1)?,
                code_false: f(code_false, 1)?,
            },
            AirNode::SwitchStatement {
                code_labels,
                code_bodies,
                names_added,
            } => AirNode::SwitchStatement {
                code_labels: code_labels
                    .iter()
                    .map(|label| f(label, 0))
                    .collect::<Result<_, E>>()?,
                code_bodies: code_bodies
                    .iter()
                    .map(|body| f(body, 1))
                    .collect::<Result<_, E>>()?,
                names_added: names_added.clone(),
            },
            AirNode::WhileStatement {
                negative,
                code_cond,
                code_body,
            } => AirNode::WhileStatement {
                negative: *negative,
                code_cond: f(code_cond, 0)?,
                code_body: f(code_body, 1)?,
            },
            AirNode::DoWhileStatement {
                code_body,
                negative,
                code_cond,
            } => AirNode::DoWhileStatement {
                code_body: f(code_body, 1)?,
                negative: *negative,
                code_cond: f(code_cond, 0)?,
            },
            AirNode::ForStatement {
                code_init,
                code_cond,
                code_step,
                code_body,
            } => AirNode::ForStatement {
                code_init: f(code_init, 1)?,
                code_cond: f(code_cond, 1)?,
                code_step: f(code_step, 1)?,
                code_body: f(code_body, 2)?,
            },
            AirNode::ForEachStatement {
                name_key,
                name_mapped,
                code_init,
                code_body,
            } => AirNode::ForEachStatement {
                name_key: name_key.clone(),
                name_mapped: name_mapped.clone(),
                code_init: f(code_init, 1)?,
                code_body: f(code_body, 2)?,
            },
            AirNode::TryStatement {
                sloc_try,
                code_try,
                sloc_catch,
                name_except,
                code_catch,
            } => AirNode::TryStatement {
                sloc_try: sloc_try.clone(),
                code_try: f(code_try, 1)?,
                sloc_catch: sloc_catch.clone(),
                name_except: name_except.clone(),
                code_catch: f(code_catch, 1)?,
            },
            AirNode::DefineFunction {
                sloc,
                name,
                params,
                code_body,
            } => AirNode::DefineFunction {
                sloc: sloc.clone(),
                name: name.clone(),
                params: params.clone(),
                code_body: f(code_body, 1)?,
            },
            AirNode::BranchExpression {
                sloc,
                code_true,
                code_false,
                assign,
            } => AirNode::BranchExpression {
                sloc: sloc.clone(),
                code_true: f(code_true, 0)?,
                code_false: f(code_false, 0)?,
                assign: *assign,
            },
            AirNode::Coalescence {
                sloc,
                code_null,
                assign,
            } => AirNode::Coalescence {
                sloc: sloc.clone(),
                code_null: f(code_null, 0)?,
                assign: *assign,
            },
            AirNode::DeferExpression { sloc, code_body } => AirNode::DeferExpression {
                sloc: sloc.clone(),
                code_body: f(code_body, 0)?,
            },
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
            | AirNode::SingleStepTrap { .. } => self.clone(),
        })
    }
}

/// The reference bound to `name` in the scope `depth` levels above the
/// innermost of `scopes`.
fn bound_reference(
    scopes: &[&ReferenceDictionary],
    depth: u32,
    name: &Name,
) -> RuntimeResult<crate::reference::Reference> {
    let index = scope_index(depth, scopes.len())?;
    match scopes[index].find(name) {
        None => Err(undeclared_identifier(name)),
        Some(reference) if reference.is_uninit() => Err(bypassed_initialization(name)),
        Some(reference) => Ok(reference.clone()),
    }
}

/// Index of the scope `depth` levels above the innermost of `available`.
pub(crate) fn scope_index(depth: u32, available: usize) -> RuntimeResult<usize> {
    usize::try_from(depth)
        .ok()
        .filter(|&d| d < available)
        .map(|d| available - 1 - d)
        .ok_or_else(|| FatalError::ScopeDepth { depth, available }.into())
}

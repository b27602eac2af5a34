//! The interpreter loop.
//!
//! `GlobalContext::execute` walks a slice of `AirNode`s, dispatching each
//! through one exhaustive `match`. Nested bodies are executed by recursion
//! and report early exits as an `AirStatus`.
//!
//! # Frames and Scopes
//!
//! Each script call owns a `Frame`: a stack of `Scope`s plus its own
//! evaluation stack. Scopes are opened exactly where the solidify table in
//! `air` says they are, so the `depth` of a local reference always counts
//! the same scopes at compile time and at run time.
//!
//! # Modules
//!
//! - `frame`: `Frame` and `Scope`
//! - `control`: scoped execution, deferred bodies, branches, loops, `try`
//! - `operators`: `ApplyOperator`
//! - `call`: calls, the tail-call trampoline, function entry

mod call;
mod control;
mod frame;
mod operators;

use std::cell::Cell;

use mica_ir::Name;

pub(crate) use frame::Frame;
pub use operators::{evaluate_binary, evaluate_unary};
use frame::Scope;

use crate::air::{scope_index, AirNode, AirStatus};
use crate::errors::{
    assertion_failure, bypassed_initialization, invalid_initializer, undeclared_identifier,
    FatalError, RuntimeException, RuntimeResult,
};
use crate::global_context::GlobalContext;
use crate::reference::Reference;
use crate::reference_modifier::ReferenceModifier;
use crate::reference_stack::ReferenceStack;
use crate::value::{ObjectMap, Value};

impl GlobalContext {
    /// Execute `code` in the current scope of the current frame.
    pub(crate) fn execute(&mut self, code: &[AirNode]) -> RuntimeResult<AirStatus> {
        for node in code {
            let status = match self.execute_node(node) {
                Ok(status) => status,
                Err(err) => {
                    return Err(match node.sloc() {
                        Some(sloc) => err.at(sloc),
                        None => err,
                    })
                }
            };
            if status.is_exit() {
                return Ok(status);
            }
        }
        Ok(AirStatus::Next)
    }

    fn execute_node(&mut self, node: &AirNode) -> RuntimeResult<AirStatus> {
        match node {
            AirNode::ClearStack => {
                self.stack_mut()?.clear();
                self.maybe_collect();
            }
            AirNode::ExecuteBlock { body } => return self.execute_in_scope(body),
            AirNode::DeclareVariable { sloc, name } => {
                if let Some(hooks) = &self.hooks {
                    hooks.on_variable_declare(sloc, name);
                }
                let var = self.collector.create_variable();
                self.bind(name, Reference::variable(var.clone()))?;
                self.push(Reference::variable(var))?;
            }
            AirNode::InitializeVariable { immutable, .. } => {
                let value = self.pop_value()?;
                let target = self.stack_mut()?.pop()?;
                initialize_target(&target, value, *immutable)?;
            }
            AirNode::DefineNullVariable {
                sloc,
                name,
                immutable,
            } => {
                if let Some(hooks) = &self.hooks {
                    hooks.on_variable_declare(sloc, name);
                }
                let var = self.collector.create_variable();
                var.borrow_mut().initialize(Value::Null, *immutable)?;
                self.bind(name, Reference::variable(var))?;
            }
            AirNode::DeclareReference { name } => self.bind(name, Reference::uninit())?,
            AirNode::InitializeReference { name, .. } => {
                let reference = self.stack_mut()?.pop()?;
                self.bind(name, reference)?;
            }
            AirNode::IfStatement {
                negative,
                code_true,
                code_false,
            } => {
                let branch = if self.pop_value()?.test() == *negative {
                    code_false
                } else {
                    code_true
                };
                return self.execute_in_scope(branch);
            }
            AirNode::SwitchStatement {
                code_labels,
                code_bodies,
                names_added,
            } => return self.execute_switch(code_labels, code_bodies, names_added),
            AirNode::WhileStatement {
                negative,
                code_cond,
                code_body,
            } => return self.execute_while(*negative, code_cond, code_body),
            AirNode::DoWhileStatement {
                code_body,
                negative,
                code_cond,
            } => return self.execute_do_while(code_body, *negative, code_cond),
            AirNode::ForStatement {
                code_init,
                code_cond,
                code_step,
                code_body,
            } => return self.execute_for(code_init, code_cond, code_step, code_body),
            AirNode::ForEachStatement {
                name_key,
                name_mapped,
                code_init,
                code_body,
            } => return self.execute_for_each(name_key, name_mapped, code_init, code_body),
            AirNode::TryStatement {
                code_try,
                sloc_catch,
                name_except,
                code_catch,
                ..
            } => return self.execute_try(code_try, sloc_catch, name_except, code_catch),
            AirNode::ThrowStatement { sloc } => {
                let value = self.pop_value()?;
                return Err(RuntimeException::thrown(sloc.clone(), value).into());
            }
            AirNode::AssertStatement { negative, msg, .. } => {
                if self.pop_value()?.test() == *negative {
                    return Err(assertion_failure(msg));
                }
            }
            AirNode::SimpleStatus { status } => return Ok(*status),
            AirNode::GlvalueToPrvalue { .. } => self.stack_mut()?.top_mut()?.mutate_into_temporary()?,
            AirNode::PushConstant { value } => self.push(Reference::constant(value.clone()))?,
            AirNode::PushGlobalReference { name, .. } => {
                let reference = self
                    .globals
                    .find(name)
                    .cloned()
                    .ok_or_else(|| undeclared_identifier(name))?;
                self.push(reference)?;
            }
            AirNode::PushLocalReference {
                depth, name, hint, ..
            } => {
                let reference = self.resolve_local(*depth, name, hint)?;
                self.push(reference)?;
            }
            AirNode::PushBoundReference { reference } => self.push(reference.clone())?,
            AirNode::DefineFunction {
                sloc,
                name,
                params,
                code_body,
            } => {
                let function = self.instantiate_function(sloc, name, params, code_body)?;
                self.push(Reference::temporary(function))?;
            }
            AirNode::BranchExpression {
                code_true,
                code_false,
                assign,
                ..
            } => {
                let branch = if self.stack()?.top()?.dereference_readonly()?.test() {
                    code_true
                } else {
                    code_false
                };
                return self.execute_branch(branch, *assign);
            }
            AirNode::Coalescence {
                code_null, assign, ..
            } => {
                if self.stack()?.top()?.dereference_readonly()?.is_null() {
                    return self.execute_branch(code_null, *assign);
                }
            }
            AirNode::FunctionCall { sloc, nargs, ptc } => {
                return self.execute_call(sloc, *nargs, *ptc);
            }
            AirNode::VariadicCall { sloc, ptc } => return self.execute_variadic_call(sloc, *ptc),
            AirNode::MemberAccess { name, .. } => {
                self.stack_mut()?
                    .top_mut()?
                    .push_modifier(ReferenceModifier::ObjectKey(name.clone()));
            }
            AirNode::PushUnnamedArray { nelems, .. } => {
                let items = self
                    .stack_mut()?
                    .pop_n(*nelems)?
                    .iter()
                    .map(Reference::dereference_readonly)
                    .collect::<RuntimeResult<Vec<_>>>()?;
                self.push(Reference::temporary(Value::array(items)))?;
            }
            AirNode::PushUnnamedObject { keys, .. } => {
                let values = self.stack_mut()?.pop_n(keys.len())?;
                let mut members = ObjectMap::default();
                for (key, reference) in keys.iter().zip(&values) {
                    members.insert(key.clone(), reference.dereference_readonly()?);
                }
                self.push(Reference::temporary(Value::object(members)))?;
            }
            AirNode::ApplyOperator { xop, assign, .. } => self.apply_operator(*xop, *assign)?,
            AirNode::UnpackStructArray {
                immutable, nelems, ..
            } => self.unpack_array(*immutable, *nelems)?,
            AirNode::UnpackStructObject {
                immutable, keys, ..
            } => self.unpack_object(*immutable, keys)?,
            AirNode::SingleStepTrap { sloc } => {
                if let Some(hooks) = &self.hooks {
                    hooks.on_single_step_trap(sloc);
                }
            }
            AirNode::DeferExpression { sloc, code_body } => {
                self.scope_mut()?.defers.push((sloc.clone(), code_body.clone()));
            }
        }
        Ok(AirStatus::Next)
    }

    /// Resolve a local name, refreshing the lookup hint on a miss.
    fn resolve_local(&self, depth: u32, name: &Name, hint: &Cell<usize>) -> RuntimeResult<Reference> {
        let scopes = &self.frame()?.scopes;
        let names = &scopes[scope_index(depth, scopes.len())?].names;
        let found = match names.use_hint(hint.get(), name) {
            Some(reference) => reference,
            None => {
                tracing::trace!(%name, depth, "lookup hint miss");
                let reference = names.find(name).ok_or_else(|| undeclared_identifier(name))?;
                if let Some(slot) = names.get_hint(name) {
                    hint.set(slot);
                }
                reference
            }
        };
        if found.is_uninit() {
            return Err(bypassed_initialization(name));
        }
        Ok(found.clone())
    }

    /// `var [a, b] = init;`: the variables sit below the initializer.
    fn unpack_array(&mut self, immutable: bool, nelems: usize) -> RuntimeResult<()> {
        let init = self.pop_value()?;
        let items: &[Value] = match &init {
            Value::Null => &[],
            Value::Array(items) => items.as_slice(),
            other => return Err(invalid_initializer("array", other)),
        };
        let targets = self.stack_mut()?.pop_n(nelems)?;
        for (i, target) in targets.iter().enumerate() {
            let value = items.get(i).cloned().unwrap_or_default();
            initialize_target(target, value, immutable)?;
        }
        Ok(())
    }

    /// `var {a, b} = init;`
    fn unpack_object(&mut self, immutable: bool, keys: &[Name]) -> RuntimeResult<()> {
        let init = self.pop_value()?;
        let members = match &init {
            Value::Null => None,
            Value::Object(members) => Some(&**members),
            other => return Err(invalid_initializer("object", other)),
        };
        let targets = self.stack_mut()?.pop_n(keys.len())?;
        for (key, target) in keys.iter().zip(&targets) {
            let value = members.and_then(|m| m.get(key)).cloned().unwrap_or_default();
            initialize_target(target, value, immutable)?;
        }
        Ok(())
    }

    // Frame access

    pub(crate) fn frame(&self) -> RuntimeResult<&Frame> {
        self.frames.last().ok_or_else(|| FatalError::NoFrame.into())
    }

    pub(crate) fn frame_mut(&mut self) -> RuntimeResult<&mut Frame> {
        self.frames.last_mut().ok_or_else(|| FatalError::NoFrame.into())
    }

    fn stack(&self) -> RuntimeResult<&ReferenceStack> {
        Ok(&self.frame()?.stack)
    }

    pub(crate) fn stack_mut(&mut self) -> RuntimeResult<&mut ReferenceStack> {
        Ok(&mut self.frame_mut()?.stack)
    }

    fn scope_mut(&mut self) -> RuntimeResult<&mut Scope> {
        self.frame_mut()?
            .scopes
            .last_mut()
            .ok_or_else(|| FatalError::ScopeDepth { depth: 0, available: 0 }.into())
    }

    fn push(&mut self, reference: Reference) -> RuntimeResult<()> {
        self.stack_mut()?.push(reference);
        Ok(())
    }

    /// Pop the top reference and read its value.
    fn pop_value(&mut self) -> RuntimeResult<Value> {
        self.stack_mut()?.pop()?.dereference_readonly()
    }

    /// Bind `name` in the innermost scope, replacing any earlier binding.
    fn bind(&mut self, name: &Name, reference: Reference) -> RuntimeResult<()> {
        *self.scope_mut()?.names.insert(name.clone()).0 = reference;
        Ok(())
    }
}

fn initialize_target(target: &Reference, value: Value, immutable: bool) -> RuntimeResult<()> {
    let var = target.get_variable_opt().ok_or(FatalError::NotAVariable)?;
    var.borrow_mut().initialize(value, immutable)
}

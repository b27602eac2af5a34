//! Scoped execution and control-flow statements.

use std::ops::ControlFlow;

use mica_ir::{Name, SourceLocation};

use super::frame::Scope;
use crate::air::{AirStatus, Program};
use crate::errors::{invalid_range, FrameKind, RuntimeError, RuntimeException, RuntimeResult};
use crate::global_context::GlobalContext;
use crate::reference::Reference;
use crate::reference_modifier::ReferenceModifier;
use crate::value::{Compare, ObjectMap, Value};

impl GlobalContext {
    /// Run `body` in a fresh scope.
    pub(crate) fn execute_in_scope(&mut self, body: &Program) -> RuntimeResult<AirStatus> {
        self.with_scope(|ctx| ctx.execute(body))
    }

    /// Run `f` with a fresh innermost scope, closing it afterwards whatever
    /// the outcome.
    pub(crate) fn with_scope(
        &mut self,
        f: impl FnOnce(&mut Self) -> RuntimeResult<AirStatus>,
    ) -> RuntimeResult<AirStatus> {
        self.frame_mut()?.scopes.push(Scope::default());
        let result = f(self);
        self.leave_scope(result)
    }

    /// Run the deferred bodies of the innermost scope, last registered
    /// first, then pop it.
    ///
    /// Deferred bodies run in the exiting scope on an empty evaluation stack;
    /// the stack is restored afterwards so a pending return value survives.
    /// An exception from a deferred body replaces the outcome in flight and
    /// records the replaced value. A fatal error is never replaced.
    pub(crate) fn leave_scope(&mut self, mut result: RuntimeResult<AirStatus>) -> RuntimeResult<AirStatus> {
        loop {
            let frame = self.frame_mut()?;
            let Some((sloc, body)) = frame.scopes.last_mut().and_then(|scope| scope.defers.pop()) else {
                break;
            };
            let saved = std::mem::take(&mut frame.stack);
            frame.saved_stacks.push(saved);
            // The exception in flight stays reachable while the body runs.
            let mark = frame.unwinding.len();
            if let Err(RuntimeError::Exception(exception)) = &result {
                frame.unwinding.push(exception.value.clone());
                frame.unwinding.extend(exception.frames.iter().map(|f| f.value.clone()));
            }

            let outcome = self.execute(&body);

            let frame = self.frame_mut()?;
            frame.unwinding.truncate(mark);
            frame.stack = frame.saved_stacks.pop().unwrap_or_default();
            if let Err(err) = outcome {
                result = Err(supersede(result, err, &sloc));
            }
        }
        self.frame_mut()?.scopes.pop();
        result
    }

    /// Evaluate a branch of `?:`, `??` and their assigning forms. The
    /// condition reference is on top of the stack.
    pub(crate) fn execute_branch(&mut self, branch: &Program, assign: bool) -> RuntimeResult<AirStatus> {
        if branch.is_empty() {
            return Ok(AirStatus::Next);
        }
        if !assign {
            self.stack_mut()?.pop()?;
            return self.execute(branch);
        }
        let status = self.execute(branch)?;
        if status.is_exit() {
            return Ok(status);
        }
        let value = self.pop_value()?;
        self.stack()?.top()?.write(value)?;
        Ok(AirStatus::Next)
    }

    pub(crate) fn execute_switch(
        &mut self,
        code_labels: &[Program],
        code_bodies: &[Program],
        names_added: &[Vec<Name>],
    ) -> RuntimeResult<AirStatus> {
        let control = self.pop_value()?;

        let mut target = None;
        let mut default = None;
        for (i, label) in code_labels.iter().enumerate() {
            if label.is_empty() {
                default.get_or_insert(i);
                continue;
            }
            self.execute(label)?;
            let value = self.pop_value()?;
            if control.compare(&value) == Compare::Equal {
                target = Some(i);
                break;
            }
        }
        let Some(start) = target.or(default) else {
            return Ok(AirStatus::Next);
        };

        self.with_scope(|ctx| {
            // Names of the clauses jumped over are in scope but were never
            // initialized.
            for name in names_added.iter().take(start).flatten() {
                ctx.bind(name, Reference::uninit())?;
            }
            for body in code_bodies.iter().skip(start) {
                match ctx.execute(body)? {
                    AirStatus::Next => {}
                    AirStatus::BreakUnspec | AirStatus::BreakSwitch => return Ok(AirStatus::Next),
                    status => return Ok(status),
                }
            }
            Ok(AirStatus::Next)
        })
    }

    pub(crate) fn execute_while(
        &mut self,
        negative: bool,
        code_cond: &Program,
        code_body: &Program,
    ) -> RuntimeResult<AirStatus> {
        while self.evaluate_condition(code_cond)? != negative {
            if let ControlFlow::Break(status) = while_body_status(self.execute_in_scope(code_body)?) {
                return Ok(status);
            }
            self.maybe_collect();
        }
        Ok(AirStatus::Next)
    }

    pub(crate) fn execute_do_while(
        &mut self,
        code_body: &Program,
        negative: bool,
        code_cond: &Program,
    ) -> RuntimeResult<AirStatus> {
        loop {
            if let ControlFlow::Break(status) = while_body_status(self.execute_in_scope(code_body)?) {
                return Ok(status);
            }
            self.maybe_collect();
            if self.evaluate_condition(code_cond)? == negative {
                return Ok(AirStatus::Next);
            }
        }
    }

    /// `for (init; cond; step) body`. Init, condition and step share one
    /// loop scope; each iteration of the body gets its own scope inside it.
    pub(crate) fn execute_for(
        &mut self,
        code_init: &Program,
        code_cond: &Program,
        code_step: &Program,
        code_body: &Program,
    ) -> RuntimeResult<AirStatus> {
        self.with_scope(|ctx| {
            ctx.execute(code_init)?;
            loop {
                if !code_cond.is_empty() && !ctx.evaluate_condition(code_cond)? {
                    return Ok(AirStatus::Next);
                }
                if let ControlFlow::Break(status) = for_body_status(ctx.execute_in_scope(code_body)?) {
                    return Ok(status);
                }
                ctx.execute(code_step)?;
                ctx.stack_mut()?.clear();
                ctx.maybe_collect();
            }
        })
    }

    /// `for each (key, mapped -> range) body`.
    ///
    /// Arrays yield their indices and objects their keys, in sorted order,
    /// as of loop entry. `mapped` is bound to the range reference extended by
    /// the key, so writes through it reach the container.
    pub(crate) fn execute_for_each(
        &mut self,
        name_key: &Name,
        name_mapped: &Name,
        code_init: &Program,
        code_body: &Program,
    ) -> RuntimeResult<AirStatus> {
        self.with_scope(|ctx| {
            ctx.execute(code_init)?;
            let range_ref = ctx.stack_mut()?.pop()?;
            let range = range_ref.dereference_readonly()?;
            let keys: Vec<(Value, ReferenceModifier)> = match &range {
                Value::Null => Vec::new(),
                Value::Array(items) => (0..items.len())
                    .map(|i| {
                        let index = i64::try_from(i).unwrap_or(i64::MAX);
                        (Value::Integer(index), ReferenceModifier::ArrayIndex(index))
                    })
                    .collect(),
                Value::Object(members) => {
                    let mut names: Vec<&Name> = members.keys().collect();
                    names.sort();
                    names
                        .into_iter()
                        .map(|name| {
                            (
                                Value::string(name.as_str()),
                                ReferenceModifier::ObjectKey(name.clone()),
                            )
                        })
                        .collect()
                }
                other => return Err(invalid_range(other)),
            };

            for (key, modifier) in keys {
                let mut mapped = range_ref.clone();
                mapped.push_modifier(modifier);
                ctx.bind(name_key, Reference::temporary(key))?;
                ctx.bind(name_mapped, mapped)?;

                if let ControlFlow::Break(status) = for_body_status(ctx.execute_in_scope(code_body)?) {
                    return Ok(status);
                }
                ctx.maybe_collect();
            }
            Ok(AirStatus::Next)
        })
    }

    /// `try { ... } catch (e) { ... }`. Only exceptions are caught; fatal
    /// errors pass through.
    pub(crate) fn execute_try(
        &mut self,
        code_try: &Program,
        sloc_catch: &SourceLocation,
        name_except: &Name,
        code_catch: &Program,
    ) -> RuntimeResult<AirStatus> {
        let depth = self.stack()?.len();
        let exception = match self.execute_in_scope(code_try) {
            Err(RuntimeError::Exception(exception)) => exception,
            other => return other,
        };
        tracing::trace!(at = %sloc_catch, error = %exception.message(), "exception caught");
        self.stack_mut()?.truncate(depth);

        let backtrace = backtrace_value(&exception);
        let value = exception.value.clone();
        let backtrace_name = self.names.backtrace.clone();
        self.with_scope(|ctx| {
            ctx.bind(name_except, Reference::temporary(value))?;
            ctx.bind(&backtrace_name, Reference::temporary(backtrace))?;
            ctx.execute(code_catch)
        })
        .map_err(|err| err.with_frame(FrameKind::Catch, sloc_catch, exception.value.clone()))
    }

    /// Run a condition body and test the value it leaves on the stack.
    fn evaluate_condition(&mut self, code: &Program) -> RuntimeResult<bool> {
        self.execute(code)?;
        Ok(self.pop_value()?.test())
    }
}

/// Pick the outcome of a scope whose deferred body raised `err`.
fn supersede(previous: RuntimeResult<AirStatus>, err: RuntimeError, sloc: &SourceLocation) -> RuntimeError {
    match previous {
        Err(fatal @ RuntimeError::Fatal(_)) => fatal,
        Err(RuntimeError::Exception(replaced)) => err.with_frame(FrameKind::Defer, sloc, replaced.value),
        Ok(_) => err.with_frame(FrameKind::Defer, sloc, Value::Null),
    }
}

/// How a `while` or `do while` loop reacts to the status of its body.
fn while_body_status(status: AirStatus) -> ControlFlow<AirStatus> {
    match status {
        AirStatus::Next | AirStatus::ContinueUnspec | AirStatus::ContinueWhile => ControlFlow::Continue(()),
        AirStatus::BreakUnspec | AirStatus::BreakWhile => ControlFlow::Break(AirStatus::Next),
        status => ControlFlow::Break(status),
    }
}

/// How a `for` or `for each` loop reacts to the status of its body.
fn for_body_status(status: AirStatus) -> ControlFlow<AirStatus> {
    match status {
        AirStatus::Next | AirStatus::ContinueUnspec | AirStatus::ContinueFor => ControlFlow::Continue(()),
        AirStatus::BreakUnspec | AirStatus::BreakFor => ControlFlow::Break(AirStatus::Next),
        status => ControlFlow::Break(status),
    }
}

/// `__backtrace`: one object per recorded frame, innermost first.
fn backtrace_value(exception: &RuntimeException) -> Value {
    let frames = exception
        .frames
        .iter()
        .map(|frame| {
            let mut members = ObjectMap::default();
            members.insert(Name::new("frame"), Value::string(frame.kind.label()));
            members.insert(Name::new("file"), Value::string(frame.sloc.file()));
            members.insert(Name::new("line"), Value::Integer(i64::from(frame.sloc.line())));
            members.insert(Name::new("column"), Value::Integer(i64::from(frame.sloc.column())));
            members.insert(Name::new("value"), frame.value.clone());
            Value::object(members)
        })
        .collect();
    Value::array(frames)
}

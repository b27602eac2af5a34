//! Function calls.
//!
//! # Proper Tail Calls
//!
//! A call in tail position does not call: it packages target, `this` and
//! arguments into a `PtcArgs` reference and leaves the function with
//! `ReturnRef`. `call_function` is a trampoline that keeps invoking while the
//! result is a pending tail call, so a chain of tail calls runs in constant
//! native stack. The call modes collected along the chain are applied to the
//! final result: any `Void` discards it, otherwise any `ByVal` turns it into
//! a temporary.

use std::rc::Rc;

use mica_ir::{Name, PtcAware, SourceLocation};

use super::frame::Frame;
use crate::air::{AirNode, AirStatus, Program};
use crate::errors::{custom, not_callable, recursion_limit, FatalError, FrameKind, RuntimeResult};
use crate::function::InstantiatedFunction;
use crate::global_context::GlobalContext;
use crate::reference::{PtcArguments, Reference};
use crate::reference_dictionary::ReferenceDictionary;
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

impl GlobalContext {
    /// `FunctionCall`: target below `nargs` arguments.
    pub(crate) fn execute_call(&mut self, sloc: &SourceLocation, nargs: usize, ptc: PtcAware) -> RuntimeResult<AirStatus> {
        let args = self.stack_mut()?.pop_n(nargs)?;
        self.finish_call(sloc, ptc, args)
    }

    /// `VariadicCall`: target below an argument generator.
    pub(crate) fn execute_variadic_call(&mut self, sloc: &SourceLocation, ptc: PtcAware) -> RuntimeResult<AirStatus> {
        let generator = self.stack_mut()?.pop()?.dereference_readonly()?;
        let args = self.generate_arguments(sloc, &generator)?;
        self.finish_call(sloc, ptc, args)
    }

    /// Expand a generator into arguments: null gives none, an array gives its
    /// elements, and a function is asked for a count, then for each argument
    /// by index.
    fn generate_arguments(&mut self, sloc: &SourceLocation, generator: &Value) -> RuntimeResult<Vec<Reference>> {
        match generator {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => Ok(items.iter().cloned().map(Reference::temporary).collect()),
            Value::Function(_) => {
                let null_this = || Reference::constant(Value::Null);
                let count = self
                    .call_function(sloc, generator, null_this(), Vec::new())?
                    .dereference_readonly()?;
                let count = count
                    .as_integer()
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| {
                        custom(format!("variadic argument count `{count}` is not a non-negative integer"))
                    })?;
                // Generated arguments wait on the evaluation stack, where the
                // collector can see them.
                for index in 0..count {
                    let index = Value::Integer(i64::try_from(index).unwrap_or(i64::MAX));
                    let mut arg = self.call_function(sloc, generator, null_this(), vec![Reference::temporary(index)])?;
                    arg.mutate_into_temporary()?;
                    self.stack_mut()?.push(arg);
                }
                self.stack_mut()?.pop_n(count)
            }
            other => Err(custom(format!(
                "variadic argument generator must be null, an array or a function (got `{}`)",
                other.type_name()
            ))),
        }
    }

    fn finish_call(&mut self, sloc: &SourceLocation, ptc: PtcAware, args: Vec<Reference>) -> RuntimeResult<AirStatus> {
        let mut target_ref = self.stack_mut()?.pop()?;
        let target = target_ref.dereference_readonly()?;
        // `obj.f()` and `arr[i]()` get the container as `this`.
        let self_ref = match target_ref.pop_modifier() {
            Some(_) => target_ref,
            None => Reference::constant(Value::Null),
        };

        if ptc.is_tail() {
            self.stack_mut()?.push(Reference::ptc(PtcArguments {
                sloc: sloc.clone(),
                ptc,
                target,
                self_ref,
                args,
            }));
            return Ok(AirStatus::ReturnRef);
        }

        let result = self.call_function(sloc, &target, self_ref, args)?;
        self.stack_mut()?.push(result);
        Ok(AirStatus::Next)
    }

    /// Call `target` and settle any tail calls it returns.
    pub(crate) fn call_function(
        &mut self,
        sloc: &SourceLocation,
        target: &Value,
        self_ref: Reference,
        args: Vec<Reference>,
    ) -> RuntimeResult<Reference> {
        let mut result = self.invoke(sloc, target, self_ref, args)?;
        let mut by_val = false;
        let mut void = false;
        let mut hops: usize = 0;
        loop {
            let pending = match result.into_ptc_args() {
                Ok(pending) => pending,
                Err(settled) => {
                    result = settled;
                    break;
                }
            };
            let PtcArguments {
                sloc,
                ptc,
                target,
                self_ref,
                args,
            } = Rc::try_unwrap(pending).unwrap_or_else(|shared| (*shared).clone());
            match ptc {
                PtcAware::ByVal => by_val = true,
                PtcAware::Void => void = true,
                PtcAware::ByRef | PtcAware::None => {}
            }
            hops += 1;
            result = self.invoke(&sloc, &target, self_ref, args)?;
        }
        if hops > 0 {
            tracing::trace!(hops, "tail call chain settled");
        }

        if void {
            return Ok(Reference::void());
        }
        if by_val && !result.is_void() {
            result.mutate_into_temporary()?;
        }
        Ok(result)
    }

    /// One non-tail invocation.
    fn invoke(
        &mut self,
        sloc: &SourceLocation,
        target: &Value,
        self_ref: Reference,
        args: Vec<Reference>,
    ) -> RuntimeResult<Reference> {
        let Some(function) = target.as_function().cloned() else {
            return Err(not_callable(target).at(sloc));
        };
        if let Some(limit) = self.options.max_recursion_depth {
            if self.frames.len() >= limit {
                return Err(recursion_limit(limit).with_frame(FrameKind::Call, sloc, target.clone()));
            }
        }
        if let Some(hooks) = &self.hooks {
            hooks.on_function_call(sloc, target);
        }
        ensure_sufficient_stack(|| function.invoke_ptc_aware(self, self_ref, args))
            .map_err(|err| err.with_frame(FrameKind::Call, sloc, target.clone()))
    }

    /// Run a script function in a new frame.
    pub(crate) fn execute_function(
        &mut self,
        func: Rc<InstantiatedFunction>,
        self_ref: Reference,
        args: Vec<Reference>,
    ) -> RuntimeResult<Reference> {
        self.frames.push(Frame::script(Value::function(func.clone()), self_ref.clone()));
        let result = self.run_function_body(&func, self_ref, args);
        self.frames.pop();
        result.map_err(|err| err.with_frame(FrameKind::Function, &func.sloc, Value::string(func.name.as_str())))
    }

    fn run_function_body(
        &mut self,
        func: &InstantiatedFunction,
        self_ref: Reference,
        args: Vec<Reference>,
    ) -> RuntimeResult<Reference> {
        self.bind_arguments(func, self_ref, args)?;
        self.maybe_collect();

        let status = self.execute(&func.program);
        match self.leave_scope(status)? {
            AirStatus::Next | AirStatus::ReturnVoid => Ok(Reference::void()),
            AirStatus::ReturnRef => self.stack_mut()?.pop(),
            stray => Err(FatalError::StrayStatus { status: stray.as_str() }.into()),
        }
    }

    /// Bind parameters, `__varg`, `__this` and `__func` in the parameter
    /// scope. Parameters are fresh variables initialized with the argument
    /// values; missing arguments are null. A `...` parameter ends the named
    /// list and all remaining arguments go to `__varg`.
    fn bind_arguments(&mut self, func: &InstantiatedFunction, self_ref: Reference, args: Vec<Reference>) -> RuntimeResult<()> {
        let mut args = args.into_iter();
        for param in &func.params {
            if *param == self.names.ellipsis {
                break;
            }
            let value = match args.next() {
                Some(arg) => arg.dereference_readonly()?,
                None => Value::Null,
            };
            let var = self.collector.create_variable();
            var.borrow_mut().initialize(value, false)?;
            self.bind(param, Reference::variable(var))?;
        }
        let varg = args
            .map(|arg| arg.dereference_readonly())
            .collect::<RuntimeResult<Vec<_>>>()?;

        let names = self.names.clone();
        self.bind(&names.varg, Reference::constant(Value::array(varg)))?;
        self.bind(&names.this, self_ref)?;
        self.bind(&names.func, Reference::constant(Value::string(func.name.as_str())))?;
        Ok(())
    }

    /// Build a closure, binding references that reach out of its body
    /// against the scopes of the innermost frame.
    #[tracing::instrument(level = "debug", skip_all, fields(name = %name))]
    pub(crate) fn instantiate_function(
        &self,
        sloc: &SourceLocation,
        name: &str,
        params: &[Name],
        code: &[AirNode],
    ) -> RuntimeResult<Value> {
        let scopes: Vec<&ReferenceDictionary> = self
            .frames
            .last()
            .map(|frame| frame.scopes.iter().map(|scope| &scope.names).collect())
            .unwrap_or_default();
        let rebound = code
            .iter()
            .map(|node| node.rebind(&scopes, 1))
            .collect::<RuntimeResult<Vec<_>>>()?;
        let program = Program::solidify(&rebound);
        Ok(Value::function(Rc::new(InstantiatedFunction {
            sloc: sloc.clone(),
            name: name.to_owned(),
            params: params.to_vec(),
            program,
        })))
    }

    /// Push the frame of a host function.
    pub(crate) fn enter_native(&mut self, func: Value, self_ref: &Reference, args: &[Reference]) {
        self.frames.push(Frame::native(func, self_ref.clone(), args));
    }

    pub(crate) fn leave_native(&mut self) {
        self.frames.pop();
    }
}

//! Instruction builders shared by the scenarios.
//!
//! Local references take the scope depth explicitly, exactly as a front-end
//! would emit it: a block, branch or loop body is one scope below its
//! statement, a `for` body two.

use mica_runtime::{
    AirNode, AirStatus, GlobalContext, Name, Program, PtcAware, RuntimeResult, SourceLocation,
    Value, Xop,
};

pub fn sloc() -> SourceLocation {
    SourceLocation::new("scenario.mica", 1, 1)
}

pub fn name(text: &str) -> Name {
    Name::new(text)
}

pub fn konst(value: impl Into<Value>) -> AirNode {
    AirNode::PushConstant {
        value: value.into(),
    }
}

pub fn local(depth: u32, text: &str) -> AirNode {
    AirNode::local_reference(sloc(), depth, name(text))
}

pub fn op(xop: Xop) -> AirNode {
    AirNode::ApplyOperator {
        sloc: sloc(),
        xop,
        assign: false,
    }
}

pub fn op_assign(xop: Xop) -> AirNode {
    AirNode::ApplyOperator {
        sloc: sloc(),
        xop,
        assign: true,
    }
}

pub fn ret() -> AirNode {
    AirNode::SimpleStatus {
        status: AirStatus::ReturnRef,
    }
}

pub fn call(nargs: usize, ptc: PtcAware) -> AirNode {
    AirNode::FunctionCall {
        sloc: sloc(),
        nargs,
        ptc,
    }
}

pub fn body(nodes: Vec<AirNode>) -> Program {
    Program::from(nodes)
}

/// `var name = init;`
pub fn var(text: &str, init: Vec<AirNode>) -> Vec<AirNode> {
    let mut code = vec![AirNode::DeclareVariable {
        sloc: sloc(),
        name: name(text),
    }];
    code.extend(init);
    code.push(AirNode::InitializeVariable {
        sloc: sloc(),
        immutable: false,
    });
    code.push(AirNode::ClearStack);
    code
}

/// `var name;`
pub fn null_var(text: &str) -> AirNode {
    AirNode::DefineNullVariable {
        sloc: sloc(),
        name: name(text),
        immutable: false,
    }
}

/// `name = value;`
pub fn assign(depth: u32, text: &str, value: Vec<AirNode>) -> Vec<AirNode> {
    let mut code = vec![local(depth, text)];
    code.extend(value);
    code.push(op(Xop::Assign));
    code.push(AirNode::ClearStack);
    code
}

pub fn function(params: &[&str], code: Vec<AirNode>) -> AirNode {
    AirNode::DefineFunction {
        sloc: sloc(),
        name: "closure".to_string(),
        params: params.iter().map(|p| name(p)).collect(),
        code_body: body(code),
    }
}

pub fn if_then(code_true: Vec<AirNode>) -> AirNode {
    AirNode::IfStatement {
        negative: false,
        code_true: body(code_true),
        code_false: Program::default(),
    }
}

/// Instantiate `code` as a function without parameters, call it and read
/// the result. A void result reads as null.
pub fn run(ctx: &mut GlobalContext, code: Vec<AirNode>) -> RuntimeResult<Value> {
    let function = ctx.instantiate(&sloc(), "scenario", &[], &code)?;
    let result = ctx.call(&function, Vec::new())?;
    if result.is_void() {
        return Ok(Value::Null);
    }
    result.dereference_readonly()
}

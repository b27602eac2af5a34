//! `ApplyOperator`.
//!
//! Unary operators work on the top of the evaluation stack and binary ones
//! on the top two, left operand deeper. Without `assign` the result replaces
//! the (left) operand as a temporary; with `assign` it is written through the
//! operand reference, which stays on the stack (`+=` and friends).
//!
//! Integer arithmetic is checked: overflow raises an exception instead of
//! wrapping.

use mica_ir::{Name, Xop};

use crate::errors::{
    arithmetic_overflow, custom, division_by_zero, invalid_operand, unordered, RuntimeResult,
};
use crate::global_context::GlobalContext;
use crate::reference::Reference;
use crate::reference_modifier::ReferenceModifier;
use crate::value::{Compare, Value};

impl GlobalContext {
    pub(crate) fn apply_operator(&mut self, xop: Xop, assign: bool) -> RuntimeResult<()> {
        if xop.is_unary() {
            self.apply_unary(xop, assign)
        } else {
            self.apply_binary(xop, assign)
        }
    }

    fn apply_unary(&mut self, xop: Xop, assign: bool) -> RuntimeResult<()> {
        let top = self.stack_mut()?.top_mut()?;
        match xop {
            Xop::IncPre | Xop::DecPre => {
                let next = step(xop, &top.dereference_readonly()?)?;
                top.write(next)
            }
            Xop::IncPost | Xop::DecPost => {
                let old = top.dereference_readonly()?;
                top.write(step(xop, &old)?)?;
                *top = Reference::temporary(old);
                Ok(())
            }
            Xop::Unset => {
                let old = top.dereference_unset()?;
                *top = Reference::temporary(old);
                Ok(())
            }
            Xop::Head => {
                top.push_modifier(ReferenceModifier::ArrayHead);
                Ok(())
            }
            Xop::Tail => {
                top.push_modifier(ReferenceModifier::ArrayTail);
                Ok(())
            }
            _ => {
                let result = evaluate_unary(xop, &top.dereference_readonly()?)?;
                store(top, result, assign)
            }
        }
    }

    fn apply_binary(&mut self, xop: Xop, assign: bool) -> RuntimeResult<()> {
        let stack = self.stack_mut()?;
        let rhs = stack.pop()?.dereference_readonly()?;
        let top = stack.top_mut()?;
        match xop {
            Xop::Assign => top.write(rhs),
            Xop::Subscr => {
                let modifier = match &rhs {
                    Value::Integer(index) => ReferenceModifier::ArrayIndex(*index),
                    Value::String(key) => ReferenceModifier::ObjectKey(Name::new(key)),
                    _ => return Err(invalid_operand(xop, &[&rhs])),
                };
                top.push_modifier(modifier);
                Ok(())
            }
            _ => {
                let result = evaluate_binary(xop, &top.dereference_readonly()?, &rhs)?;
                store(top, result, assign)
            }
        }
    }
}

fn store(top: &mut Reference, result: Value, assign: bool) -> RuntimeResult<()> {
    if assign {
        top.write(result)
    } else {
        *top = Reference::temporary(result);
        Ok(())
    }
}

/// `++` and `--`.
fn step(xop: Xop, operand: &Value) -> RuntimeResult<Value> {
    let delta: i64 = if matches!(xop, Xop::IncPre | Xop::IncPost) { 1 } else { -1 };
    match operand {
        Value::Integer(n) => n
            .checked_add(delta)
            .map(Value::Integer)
            .ok_or_else(|| arithmetic_overflow(format!("{n}{xop}"))),
        #[allow(clippy::cast_precision_loss)]
        Value::Real(r) => Ok(Value::Real(r + delta as f64)),
        _ => Err(invalid_operand(xop, &[operand])),
    }
}

/// Unary operators that produce a fresh value.
pub fn evaluate_unary(xop: Xop, operand: &Value) -> RuntimeResult<Value> {
    let result = match (xop, operand) {
        (Xop::Pos, Value::Integer(_) | Value::Real(_)) => operand.clone(),
        (Xop::Neg, Value::Integer(n)) => {
            Value::Integer(n.checked_neg().ok_or_else(|| arithmetic_overflow(format!("-({n})")))?)
        }
        (Xop::Neg, Value::Real(r)) => Value::Real(-r),
        (Xop::NotB, Value::Integer(n)) => Value::Integer(!n),
        (Xop::NotB, Value::Boolean(b)) => Value::Boolean(!b),
        (Xop::NotL, _) => Value::Boolean(!operand.test()),
        (Xop::Countof, Value::Null) => Value::Integer(0),
        (Xop::Countof, Value::String(s)) => count(s.len()),
        (Xop::Countof, Value::Array(items)) => count(items.len()),
        (Xop::Countof, Value::Object(members)) => count(members.len()),
        (Xop::Typeof, _) => Value::string(operand.type_name()),
        (Xop::Abs, Value::Integer(n)) => {
            Value::Integer(n.checked_abs().ok_or_else(|| arithmetic_overflow(format!("__abs({n})")))?)
        }
        (Xop::Abs, Value::Real(r)) => Value::Real(r.abs()),
        (Xop::Sign, Value::Integer(n)) => Value::Boolean(*n < 0),
        (Xop::Sign, Value::Real(r)) => Value::Boolean(r.is_sign_negative()),
        _ => return Err(invalid_operand(xop, &[operand])),
    };
    Ok(result)
}

fn count(len: usize) -> Value {
    Value::Integer(i64::try_from(len).unwrap_or(i64::MAX))
}

/// Binary operators that produce a fresh value.
pub fn evaluate_binary(xop: Xop, lhs: &Value, rhs: &Value) -> RuntimeResult<Value> {
    match xop {
        Xop::CmpEq => Ok(Value::Boolean(lhs.compare(rhs) == Compare::Equal)),
        Xop::CmpNe => Ok(Value::Boolean(lhs.compare(rhs) != Compare::Equal)),
        Xop::CmpUn => Ok(Value::Boolean(lhs.compare(rhs) == Compare::Unordered)),
        Xop::CmpLt | Xop::CmpGt | Xop::CmpLte | Xop::CmpGte => {
            let order = lhs.compare(rhs);
            if order == Compare::Unordered {
                return Err(unordered(lhs, rhs));
            }
            Ok(Value::Boolean(match xop {
                Xop::CmpLt => order == Compare::Less,
                Xop::CmpGt => order == Compare::Greater,
                Xop::CmpLte => order != Compare::Greater,
                _ => order != Compare::Less,
            }))
        }
        Xop::Cmp3way => Ok(match lhs.compare(rhs) {
            Compare::Less => Value::Integer(-1),
            Compare::Equal => Value::Integer(0),
            Compare::Greater => Value::Integer(1),
            Compare::Unordered => Value::string("[unordered]"),
        }),
        _ => arithmetic(xop, lhs, rhs),
    }
}

fn arithmetic(xop: Xop, lhs: &Value, rhs: &Value) -> RuntimeResult<Value> {
    match (lhs, rhs) {
        (Value::Boolean(a), Value::Boolean(b)) => match xop {
            Xop::Add | Xop::OrB => Ok(Value::Boolean(a | b)),
            Xop::Sub | Xop::XorB => Ok(Value::Boolean(a ^ b)),
            Xop::Mul | Xop::AndB => Ok(Value::Boolean(a & b)),
            _ => Err(invalid_operand(xop, &[lhs, rhs])),
        },
        (Value::Integer(a), Value::Integer(b)) => integer_arithmetic(xop, *a, *b),
        (Value::Integer(_) | Value::Real(_), Value::Integer(_) | Value::Real(_)) => {
            match (lhs.as_real(), rhs.as_real()) {
                (Some(a), Some(b)) => real_arithmetic(xop, a, b).ok_or_else(|| invalid_operand(xop, &[lhs, rhs])),
                _ => Err(invalid_operand(xop, &[lhs, rhs])),
            }
        }
        (Value::String(a), Value::String(b)) if xop == Xop::Add => {
            let mut joined = String::with_capacity(a.len() + b.len());
            joined.push_str(a);
            joined.push_str(b);
            Ok(Value::string(joined))
        }
        (Value::String(s), Value::Integer(n)) | (Value::Integer(n), Value::String(s)) if xop == Xop::Mul => {
            repeat(s, *n)
        }
        _ => Err(invalid_operand(xop, &[lhs, rhs])),
    }
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
fn integer_arithmetic(xop: Xop, a: i64, b: i64) -> RuntimeResult<Value> {
    let overflow = || arithmetic_overflow(format!("{a} {xop} {b}"));
    let result = match xop {
        Xop::Add => a.checked_add(b).ok_or_else(overflow)?,
        Xop::Sub => a.checked_sub(b).ok_or_else(overflow)?,
        Xop::Mul => a.checked_mul(b).ok_or_else(overflow)?,
        Xop::Div | Xop::Mod if b == 0 => return Err(division_by_zero()),
        Xop::Div => a.checked_div(b).ok_or_else(overflow)?,
        Xop::Mod => a.checked_rem(b).ok_or_else(overflow)?,
        Xop::Sll => match shift_count(b)? {
            n if n >= 64 => 0,
            n => ((a as u64) << n) as i64,
        },
        Xop::Srl => match shift_count(b)? {
            n if n >= 64 => 0,
            n => ((a as u64) >> n) as i64,
        },
        Xop::Sla => match shift_count(b)? {
            _ if a == 0 => 0,
            n if n >= 64 => return Err(overflow()),
            n => {
                let shifted = a << n;
                if shifted >> n != a {
                    return Err(overflow());
                }
                shifted
            }
        },
        Xop::Sra => match shift_count(b)? {
            n if n >= 64 => a >> 63,
            n => a >> n,
        },
        Xop::AndB => a & b,
        Xop::OrB => a | b,
        Xop::XorB => a ^ b,
        _ => return Err(invalid_operand(xop, &[&Value::Integer(a), &Value::Integer(b)])),
    };
    Ok(Value::Integer(result))
}

fn shift_count(count: i64) -> RuntimeResult<u32> {
    if count < 0 {
        return Err(custom(format!("negative shift count `{count}`")));
    }
    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}

fn real_arithmetic(xop: Xop, a: f64, b: f64) -> Option<Value> {
    let result = match xop {
        Xop::Add => a + b,
        Xop::Sub => a - b,
        Xop::Mul => a * b,
        Xop::Div => a / b,
        Xop::Mod => a % b,
        _ => return None,
    };
    Some(Value::Real(result))
}

fn repeat(s: &str, times: i64) -> RuntimeResult<Value> {
    let times = usize::try_from(times).map_err(|_| custom(format!("negative duplicate count `{times}`")))?;
    if s.len().checked_mul(times).is_none() {
        return Err(custom("string length overflow"));
    }
    Ok(Value::string(s.repeat(times)))
}

use std::collections::BTreeMap;

use sesh_core::{Builtin, Environment, Value};

use crate::ast::{BinOp, Expr, Stmt, UnOp};
use crate::error::LangError;
use crate::parser::parse;

/// Run one payload against the environment, mutating it in place.
///
/// The payload is parsed in full before any statement runs, so a parse error
/// mutates nothing. A runtime error stops execution at the failing statement
/// and leaves earlier mutations in place; the caller decides whether that
/// partially mutated environment is ever persisted.
pub fn execute(source: &str, env: &mut Environment) -> Result<(), LangError> {
    let program = parse(source)?;
    for stmt in &program {
        exec_stmt(stmt, env)?;
    }
    Ok(())
}

fn exec_stmt(stmt: &Stmt, env: &mut Environment) -> Result<(), LangError> {
    match stmt {
        Stmt::Assign { name, expr } => {
            let value = eval(expr, env)?;
            env.set(name.clone(), value);
        }
        Stmt::Delete { name } => {
            if env.remove(name).is_none() {
                return Err(LangError::Undefined(name.clone()));
            }
        }
        Stmt::Expr(expr) => {
            eval(expr, env)?;
        }
    }
    Ok(())
}

fn eval(expr: &Expr, env: &Environment) -> Result<Value, LangError> {
    match expr {
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Float(x) => Ok(Value::Float(*x)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Nil => Ok(Value::Unit),
        Expr::Ident(name) => match env.get(name) {
            Some(value) => Ok(value.clone()),
            None => Builtin::lookup(name)
                .map(Value::Builtin)
                .ok_or_else(|| LangError::Undefined(name.clone())),
        },
        Expr::List(items) => {
            let values = items
                .iter()
                .map(|item| eval(item, env))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(values))
        }
        Expr::Map(entries) => {
            let mut map = BTreeMap::new();
            for (key, value_expr) in entries {
                map.insert(key.clone(), eval(value_expr, env)?);
            }
            Ok(Value::Map(map))
        }
        Expr::Unary { op, operand } => {
            let value = eval(operand, env)?;
            apply_unary(*op, value)
        }
        Expr::Binary { op, lhs, rhs } => match op {
            // Short-circuit: the right side only runs when needed.
            BinOp::And | BinOp::Or => {
                let left = expect_bool(eval(lhs, env)?, op.symbol())?;
                if (*op == BinOp::And && !left) || (*op == BinOp::Or && left) {
                    return Ok(Value::Bool(left));
                }
                let right = expect_bool(eval(rhs, env)?, op.symbol())?;
                Ok(Value::Bool(right))
            }
            _ => {
                let left = eval(lhs, env)?;
                let right = eval(rhs, env)?;
                apply_binary(*op, left, right)
            }
        },
        Expr::Index { target, index } => {
            let target = eval(target, env)?;
            let index = eval(index, env)?;
            apply_index(target, index)
        }
        Expr::Call { callee, args } => {
            let callee = eval(callee, env)?;
            let builtin = match callee {
                Value::Builtin(b) => b,
                other => return Err(LangError::NotCallable(other.type_name())),
            };
            let args = args
                .iter()
                .map(|arg| eval(arg, env))
                .collect::<Result<Vec<_>, _>>()?;
            call_builtin(builtin, args)
        }
    }
}

fn apply_unary(op: UnOp, value: Value) -> Result<Value, LangError> {
    match (op, value) {
        (UnOp::Neg, Value::Int(n)) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or(LangError::Overflow("-")),
        (UnOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnOp::Neg, other) => Err(LangError::TypeMismatch(format!(
            "cannot negate a {}",
            other.type_name()
        ))),
        (UnOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnOp::Not, other) => Err(LangError::TypeMismatch(format!(
            "`!` needs a bool, got a {}",
            other.type_name()
        ))),
    }
}

fn apply_binary(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, LangError> {
    match op {
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => arith(op, lhs, rhs),
        BinOp::Eq => Ok(Value::Bool(values_equal(&lhs, &rhs))),
        BinOp::Ne => Ok(Value::Bool(!values_equal(&lhs, &rhs))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => compare(op, lhs, rhs),
        BinOp::And | BinOp::Or => unreachable!("short-circuited in eval"),
    }
}

fn arith(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, LangError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => int_arith(op, a, b),
        (Value::Float(a), Value::Float(b)) => float_arith(op, a, b),
        (Value::Int(a), Value::Float(b)) => float_arith(op, a as f64, b),
        (Value::Float(a), Value::Int(b)) => float_arith(op, a, b as f64),
        (Value::Str(a), Value::Str(b)) if op == BinOp::Add => Ok(Value::Str(a + &b)),
        (Value::List(mut a), Value::List(b)) if op == BinOp::Add => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (lhs, rhs) => Err(LangError::TypeMismatch(format!(
            "cannot apply `{}` to a {} and a {}",
            op.symbol(),
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn int_arith(op: BinOp, a: i64, b: i64) -> Result<Value, LangError> {
    let result = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::Div => {
            if b == 0 {
                return Err(LangError::DivisionByZero);
            }
            a.checked_div(b)
        }
        BinOp::Rem => {
            if b == 0 {
                return Err(LangError::DivisionByZero);
            }
            a.checked_rem(b)
        }
        _ => unreachable!("not an arithmetic operator"),
    };
    result.map(Value::Int).ok_or(LangError::Overflow(op.symbol()))
}

/// Float arithmetic is plain IEEE; only division by an exact zero is an
/// error. Overflow to infinity is allowed and caught at persist time.
fn float_arith(op: BinOp, a: f64, b: f64) -> Result<Value, LangError> {
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(LangError::DivisionByZero);
            }
            a / b
        }
        BinOp::Rem => {
            if b == 0.0 {
                return Err(LangError::DivisionByZero);
            }
            a % b
        }
        _ => unreachable!("not an arithmetic operator"),
    };
    Ok(Value::Float(result))
}

/// Equality is total: ints and floats compare numerically, otherwise values
/// of different kinds are simply unequal.
fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        (lhs, rhs) => lhs == rhs,
    }
}

fn compare(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, LangError> {
    let ordering_holds = match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => cmp_with(op, a.partial_cmp(b)),
        (Value::Float(a), Value::Float(b)) => cmp_with(op, a.partial_cmp(b)),
        (Value::Int(a), Value::Float(b)) => cmp_with(op, (*a as f64).partial_cmp(b)),
        (Value::Float(a), Value::Int(b)) => cmp_with(op, a.partial_cmp(&(*b as f64))),
        (Value::Str(a), Value::Str(b)) => cmp_with(op, a.partial_cmp(b)),
        _ => {
            return Err(LangError::TypeMismatch(format!(
                "cannot order a {} and a {}",
                lhs.type_name(),
                rhs.type_name()
            )))
        }
    };
    Ok(Value::Bool(ordering_holds))
}

fn cmp_with(op: BinOp, ordering: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering;
    // NaN orders as none of <, <=, >, >=.
    match ordering {
        None => false,
        Some(ordering) => match op {
            BinOp::Lt => ordering == Ordering::Less,
            BinOp::Le => ordering != Ordering::Greater,
            BinOp::Gt => ordering == Ordering::Greater,
            BinOp::Ge => ordering != Ordering::Less,
            _ => false,
        },
    }
}

fn apply_index(target: Value, index: Value) -> Result<Value, LangError> {
    match (target, index) {
        (Value::List(items), Value::Int(i)) => {
            let at = wrap_index(i, items.len(), "list")?;
            Ok(items[at].clone())
        }
        (Value::Str(s), Value::Int(i)) => {
            let chars: Vec<char> = s.chars().collect();
            let at = wrap_index(i, chars.len(), "str")?;
            Ok(Value::Str(chars[at].to_string()))
        }
        (Value::Map(entries), Value::Str(key)) => entries
            .get(&key)
            .cloned()
            .ok_or(LangError::KeyNotFound(key)),
        (target, index) => Err(LangError::TypeMismatch(format!(
            "cannot index a {} with a {}",
            target.type_name(),
            index.type_name()
        ))),
    }
}

/// Negative indexes count from the end.
fn wrap_index(index: i64, len: usize, kind: &'static str) -> Result<usize, LangError> {
    let wrapped = if index < 0 {
        index + len as i64
    } else {
        index
    };
    if wrapped < 0 || wrapped as usize >= len {
        return Err(LangError::IndexOutOfRange { index, len, kind });
    }
    Ok(wrapped as usize)
}

fn call_builtin(builtin: Builtin, args: Vec<Value>) -> Result<Value, LangError> {
    match builtin {
        Builtin::Print => {
            let parts: Vec<String> = args.iter().map(|v| v.to_string()).collect();
            println!("{}", parts.join(" "));
            Ok(Value::Unit)
        }
        Builtin::Len => {
            let [arg] = take_args(builtin, args)?;
            let len = match &arg {
                Value::Str(s) => s.chars().count(),
                Value::List(items) => items.len(),
                Value::Map(entries) => entries.len(),
                other => {
                    return Err(LangError::TypeMismatch(format!(
                        "len needs a str, list, or map, got a {}",
                        other.type_name()
                    )))
                }
            };
            Ok(Value::Int(len as i64))
        }
        Builtin::Str => {
            let [arg] = take_args(builtin, args)?;
            Ok(Value::Str(arg.to_string()))
        }
        Builtin::Int => {
            let [arg] = take_args(builtin, args)?;
            match arg {
                Value::Int(n) => Ok(Value::Int(n)),
                Value::Float(x) if x.is_finite() => Ok(Value::Int(x.trunc() as i64)),
                Value::Bool(b) => Ok(Value::Int(b as i64)),
                Value::Str(s) => s.trim().parse().map(Value::Int).map_err(|_| {
                    LangError::TypeMismatch(format!("cannot parse `{}` as an int", s))
                }),
                other => Err(LangError::TypeMismatch(format!(
                    "cannot convert a {} to an int",
                    other.type_name()
                ))),
            }
        }
        Builtin::Float => {
            let [arg] = take_args(builtin, args)?;
            match arg {
                Value::Int(n) => Ok(Value::Float(n as f64)),
                Value::Float(x) => Ok(Value::Float(x)),
                Value::Str(s) => s.trim().parse().map(Value::Float).map_err(|_| {
                    LangError::TypeMismatch(format!("cannot parse `{}` as a float", s))
                }),
                other => Err(LangError::TypeMismatch(format!(
                    "cannot convert a {} to a float",
                    other.type_name()
                ))),
            }
        }
        Builtin::Keys => {
            let [arg] = take_args(builtin, args)?;
            match arg {
                Value::Map(entries) => Ok(Value::List(
                    entries.keys().cloned().map(Value::Str).collect(),
                )),
                other => Err(LangError::TypeMismatch(format!(
                    "keys needs a map, got a {}",
                    other.type_name()
                ))),
            }
        }
        Builtin::Push => {
            let [list, item] = take_args(builtin, args)?;
            match list {
                Value::List(mut items) => {
                    items.push(item);
                    Ok(Value::List(items))
                }
                other => Err(LangError::TypeMismatch(format!(
                    "push needs a list, got a {}",
                    other.type_name()
                ))),
            }
        }
    }
}

fn take_args<const N: usize>(builtin: Builtin, args: Vec<Value>) -> Result<[Value; N], LangError> {
    let got = args.len();
    args.try_into().map_err(|_| LangError::Arity {
        name: builtin.name(),
        expected: N,
        got,
    })
}

fn expect_bool(value: Value, op: &'static str) -> Result<bool, LangError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(LangError::TypeMismatch(format!(
            "`{}` needs bools, got a {}",
            op,
            other.type_name()
        ))),
    }
}

//! Tree-walking evaluator.
//!
//! Evaluation is pure: the only state is the lexical scope of lambda
//! parameters, and the only inputs are the item view and the civil timezone
//! used by the time builtins.

use std::sync::Arc;

use chrono_tz::Tz;
use thiserror::Error;

use crate::clock::civil_time_of;
use crate::model::structure::{extract_emojis, is_image_url};
use crate::predicate::ast::{BinaryOp, Expr, LogicalOp, Program, UnaryOp};
use crate::predicate::value::Value;

/// A runtime fault. The caller treats any fault as "does not match".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("cannot read '{property}' of null")]
    NullAccess { property: String },

    #[error("'{op}' cannot apply to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("{receiver} has no method '{method}'")]
    UnknownMethod {
        method: String,
        receiver: &'static str,
    },

    #[error("'{name}' expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },

    #[error("'{0}' expects a lambda argument such as `x => ...`")]
    ExpectedLambda(String),

    #[error("lambda used outside a method argument")]
    LambdaOutsideCall,
}

/// Evaluate `program` against an item view.
///
/// # Errors
///
/// Returns the first [`EvalError`] raised while walking the tree.
pub fn evaluate(program: &Program, item: Value, tz: Tz) -> Result<Value, EvalError> {
    let mut eval = Evaluator {
        scope: Vec::with_capacity(4),
        tz,
    };
    match &program.param {
        Some(name) => eval.scope.push((name.as_str(), item)),
        None => {
            eval.scope.push(("item", item.clone()));
            eval.scope.push(("cast", item));
        }
    }
    eval.eval(&program.body)
}

struct Evaluator<'a> {
    scope: Vec<(&'a str, Value)>,
    tz: Tz,
}

impl<'a> Evaluator<'a> {
    fn eval(&mut self, expr: &'a Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::List(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::list(values))
            }
            Expr::Ident(name) => self.lookup(name),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
                    UnaryOp::Neg => value.as_num().map(|n| Value::Num(-n)).ok_or(
                        EvalError::TypeMismatch {
                            op: "-",
                            left: value.type_name(),
                            right: "nothing",
                        },
                    ),
                }
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left)?;
                let take_left = match op {
                    LogicalOp::And => !left.truthy(),
                    LogicalOp::Or => left.truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if take_left { Ok(left) } else { self.eval(right) }
            }
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, &left, &right)
            }
            Expr::Member { .. } | Expr::Index { .. } | Expr::MethodCall { .. } | Expr::Chain(_) => {
                Ok(self.eval_link(expr)?.unwrap_or_default())
            }
            Expr::Call { function, args } => self.call_function(function, args),
            Expr::Lambda { .. } => Err(EvalError::LambdaOutsideCall),
        }
    }

    /// Evaluate one link of a member chain. `None` means an optional link
    /// met a nullish receiver and the whole chain short-circuits.
    fn eval_link(&mut self, expr: &'a Expr) -> Result<Option<Value>, EvalError> {
        match expr {
            Expr::Chain(inner) => Ok(Some(self.eval_link(inner)?.unwrap_or_default())),
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let Some(target) = self.receiver(object, *optional)? else {
                    return Ok(None);
                };
                property_of(&target, property).map(Some)
            }
            Expr::Index {
                object,
                index,
                optional,
            } => {
                let Some(target) = self.receiver(object, *optional)? else {
                    return Ok(None);
                };
                let key = self.eval(index)?;
                index_of(&target, &key).map(Some)
            }
            Expr::MethodCall {
                receiver,
                method,
                args,
                optional,
            } => {
                let Some(target) = self.receiver(receiver, *optional)? else {
                    return Ok(None);
                };
                self.call_method(&target, method, args).map(Some)
            }
            other => self.eval(other).map(Some),
        }
    }

    fn receiver(&mut self, object: &'a Expr, optional: bool) -> Result<Option<Value>, EvalError> {
        let target = self.eval_link(object)?;
        Ok(target.filter(|t| !(optional && t.is_nullish())))
    }

    fn lookup(&self, name: &str) -> Result<Value, EvalError> {
        self.scope
            .iter()
            .rev()
            .find(|(bound, _)| *bound == name)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| EvalError::UnknownIdentifier(name.to_string()))
    }

    fn eval_args(&mut self, args: &'a [Expr]) -> Result<Vec<Value>, EvalError> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    fn apply(&mut self, lambda: &'a Expr, arg: Value, method: &str) -> Result<Value, EvalError> {
        let Expr::Lambda { param, body } = lambda else {
            return Err(EvalError::ExpectedLambda(method.to_string()));
        };
        self.scope.push((param.as_str(), arg));
        let out = self.eval(body);
        self.scope.pop();
        out
    }

    fn call_method(
        &mut self,
        target: &Value,
        method: &str,
        args: &'a [Expr],
    ) -> Result<Value, EvalError> {
        match target {
            Value::Null => Err(EvalError::NullAccess {
                property: method.to_string(),
            }),
            Value::List(items) => self.list_method(items, method, args),
            Value::Str(s) => {
                let values = self.eval_args(args)?;
                string_method(s, method, &values)
            }
            Value::Regex(re) if method == "test" => {
                let values = self.eval_args(args)?;
                let [subject] = values.as_slice() else {
                    return Err(arity(method, "1", values.len()));
                };
                let Value::Str(subject) = subject else {
                    return Err(EvalError::TypeMismatch {
                        op: "test",
                        left: "regex",
                        right: subject.type_name(),
                    });
                };
                Ok(Value::Bool(re.is_match(subject)))
            }
            other => Err(EvalError::UnknownMethod {
                method: method.to_string(),
                receiver: other.type_name(),
            }),
        }
    }

    fn list_method(
        &mut self,
        items: &Arc<Vec<Value>>,
        method: &str,
        args: &'a [Expr],
    ) -> Result<Value, EvalError> {
        if method == "includes" {
            let values = self.eval_args(args)?;
            let [needle] = values.as_slice() else {
                return Err(arity(method, "1", values.len()));
            };
            return Ok(Value::Bool(items.iter().any(|v| v.strict_eq(needle))));
        }
        if method == "join" {
            let values = self.eval_args(args)?;
            let sep = match values.as_slice() {
                [] => ",".to_string(),
                [sep] => sep.to_string(),
                _ => return Err(arity(method, "0 or 1", values.len())),
            };
            let joined = items
                .iter()
                .map(|v| if v.is_nullish() { String::new() } else { v.to_string() })
                .collect::<Vec<_>>()
                .join(&sep);
            return Ok(Value::from(joined));
        }
        if !matches!(method, "some" | "every" | "filter" | "map" | "find") {
            return Err(EvalError::UnknownMethod {
                method: method.to_string(),
                receiver: "list",
            });
        }
        let [lambda] = args else {
            return Err(arity(method, "1", args.len()));
        };
        if !matches!(lambda, Expr::Lambda { .. }) {
            return Err(EvalError::ExpectedLambda(method.to_string()));
        }
        match method {
            "some" => {
                for item in items.iter() {
                    if self.apply(lambda, item.clone(), method)?.truthy() {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            "every" => {
                for item in items.iter() {
                    if !self.apply(lambda, item.clone(), method)?.truthy() {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            "find" => {
                for item in items.iter() {
                    if self.apply(lambda, item.clone(), method)?.truthy() {
                        return Ok(item.clone());
                    }
                }
                Ok(Value::Null)
            }
            "filter" => {
                let mut kept = Vec::new();
                for item in items.iter() {
                    if self.apply(lambda, item.clone(), method)?.truthy() {
                        kept.push(item.clone());
                    }
                }
                Ok(Value::list(kept))
            }
            _ => {
                let mapped = items
                    .iter()
                    .map(|item| self.apply(lambda, item.clone(), method))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::list(mapped))
            }
        }
    }

    fn call_function(&mut self, name: &str, args: &'a [Expr]) -> Result<Value, EvalError> {
        let values = self.eval_args(args)?;
        match name {
            "len" => one(name, &values).map(|v| match v {
                Value::Str(s) => Value::Num(s.chars().count() as f64),
                Value::List(items) => Value::Num(items.len() as f64),
                _ => Value::Num(0.0),
            }),
            "lower" => one(name, &values).map(|v| map_str(v, str::to_lowercase)),
            "upper" => one(name, &values).map(|v| map_str(v, str::to_uppercase)),
            "trim" => one(name, &values).map(|v| map_str(v, |s| s.trim().to_string())),
            "words" => one(name, &values).map(|v| {
                let words = v
                    .as_str()
                    .map(|s| s.split_whitespace().map(Value::from).collect())
                    .unwrap_or_default();
                Value::list(words)
            }),
            "emojis" => one(name, &values).map(|v| {
                let found = v
                    .as_str()
                    .map(|s| extract_emojis(s).into_iter().map(Value::from).collect())
                    .unwrap_or_default();
                Value::list(found)
            }),
            "isImageUrl" => {
                one(name, &values).map(|v| Value::Bool(v.as_str().is_some_and(is_image_url)))
            }
            "hour" | "minute" | "weekday" => one(name, &values).map(|v| {
                let Some(civil) = v.as_str().and_then(|raw| civil_time_of(raw, self.tz)) else {
                    return Value::Null;
                };
                let field = match name {
                    "hour" => civil.hour,
                    "minute" => civil.minute,
                    _ => civil.weekday,
                };
                Value::Num(f64::from(field))
            }),
            "abs" => numeric(&values).and_then(|nums| match nums.as_slice() {
                [n] => Ok(Value::Num(n.abs())),
                _ => Err(arity(name, "1", nums.len())),
            }),
            "min" | "max" => {
                let nums = numeric(&values)?;
                if nums.is_empty() {
                    return Err(arity(name, "at least 1", 0));
                }
                let pick: fn(f64, f64) -> f64 = if name == "min" { f64::min } else { f64::max };
                Ok(Value::Num(nums.into_iter().reduce(pick).unwrap_or(f64::NAN)))
            }
            _ => Err(EvalError::UnknownFunction(name.to_string())),
        }
    }
}

fn arity(name: &str, expected: &'static str, got: usize) -> EvalError {
    EvalError::Arity {
        name: name.to_string(),
        expected,
        got,
    }
}

fn one<'v>(name: &str, values: &'v [Value]) -> Result<&'v Value, EvalError> {
    match values {
        [v] => Ok(v),
        _ => Err(arity(name, "1", values.len())),
    }
}

fn numeric(values: &[Value]) -> Result<Vec<f64>, EvalError> {
    values
        .iter()
        .map(|v| {
            v.as_num().ok_or(EvalError::TypeMismatch {
                op: "numeric builtin",
                left: "number",
                right: v.type_name(),
            })
        })
        .collect()
}

/// Apply a string transform; `null` passes through.
fn map_str(value: &Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::Str(s) => Value::from(f(s)),
        _ => Value::Null,
    }
}

fn string_method(s: &str, method: &str, args: &[Value]) -> Result<Value, EvalError> {
    let needle = || -> Result<&str, EvalError> {
        match args {
            [Value::Str(n)] => Ok(&**n),
            [other] => Err(EvalError::TypeMismatch {
                op: "string method",
                left: "string",
                right: other.type_name(),
            }),
            _ => Err(arity(method, "1", args.len())),
        }
    };
    match method {
        "includes" => Ok(Value::Bool(s.contains(needle()?))),
        "startsWith" => Ok(Value::Bool(s.starts_with(needle()?))),
        "endsWith" => Ok(Value::Bool(s.ends_with(needle()?))),
        "indexOf" => Ok(Value::Num(
            s.find(needle()?)
                .map_or(-1.0, |byte| s[..byte].chars().count() as f64),
        )),
        "toLowerCase" => Ok(Value::from(s.to_lowercase())),
        "toUpperCase" => Ok(Value::from(s.to_uppercase())),
        "trim" => Ok(Value::from(s.trim())),
        "split" => {
            let parts: Vec<Value> = match args {
                [Value::Str(sep)] if sep.is_empty() => {
                    s.chars().map(|c| Value::from(c.to_string())).collect()
                }
                [Value::Str(sep)] => s.split(&**sep).map(Value::from).collect(),
                [Value::Regex(re)] => re.split(s).map(Value::from).collect(),
                [] => vec![Value::from(s)],
                [other] => {
                    return Err(EvalError::TypeMismatch {
                        op: "split",
                        left: "string",
                        right: other.type_name(),
                    });
                }
                _ => return Err(arity(method, "0 or 1", args.len())),
            };
            Ok(Value::list(parts))
        }
        "match" | "search" => match args {
            [Value::Regex(re)] => Ok(if method == "match" {
                re.find(s)
                    .map_or(Value::Null, |m| Value::list(vec![Value::from(m.as_str())]))
            } else {
                Value::Num(
                    re.find(s)
                        .map_or(-1.0, |m| s[..m.start()].chars().count() as f64),
                )
            }),
            _ => Err(arity(method, "1 regex", args.len())),
        },
        _ => Err(EvalError::UnknownMethod {
            method: method.to_string(),
            receiver: "string",
        }),
    }
}

fn property_of(target: &Value, property: &str) -> Result<Value, EvalError> {
    match target {
        Value::Null => Err(EvalError::NullAccess {
            property: property.to_string(),
        }),
        Value::Object(fields) => Ok(fields.get(property).cloned().unwrap_or_default()),
        Value::Str(s) if property == "length" => Ok(Value::Num(s.chars().count() as f64)),
        Value::List(items) if property == "length" => Ok(Value::Num(items.len() as f64)),
        _ => Ok(Value::Null),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn index_of(target: &Value, key: &Value) -> Result<Value, EvalError> {
    let position = || {
        key.as_num()
            .filter(|n| n.fract() == 0.0 && *n >= 0.0)
            .map(|n| n as usize)
    };
    match target {
        Value::Null => Err(EvalError::NullAccess {
            property: key.to_string(),
        }),
        Value::Object(fields) => Ok(fields.get(&key.to_string()).cloned().unwrap_or_default()),
        Value::List(items) => Ok(position()
            .and_then(|i| items.get(i).cloned())
            .unwrap_or_default()),
        Value::Str(s) => Ok(position()
            .and_then(|i| s.chars().nth(i))
            .map_or(Value::Null, |c| Value::from(c.to_string()))),
        _ => Ok(Value::Null),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let mismatch = || EvalError::TypeMismatch {
        op: op.symbol(),
        left: left.type_name(),
        right: right.type_name(),
    };
    match op {
        BinaryOp::Eq => Ok(Value::Bool(left.strict_eq(right))),
        BinaryOp::Ne => Ok(Value::Bool(!left.strict_eq(right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            if !matches!(
                (left, right),
                (Value::Num(_), Value::Num(_)) | (Value::Str(_), Value::Str(_))
            ) {
                return Err(mismatch());
            }
            let ord = left.compare(right);
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ord.is_some_and(std::cmp::Ordering::is_lt),
                BinaryOp::Le => ord.is_some_and(std::cmp::Ordering::is_le),
                BinaryOp::Gt => ord.is_some_and(std::cmp::Ordering::is_gt),
                _ => ord.is_some_and(std::cmp::Ordering::is_ge),
            }))
        }
        BinaryOp::In => match (left, right) {
            (Value::Str(key), Value::Object(fields)) => {
                Ok(Value::Bool(fields.contains_key(&**key)))
            }
            _ => Err(mismatch()),
        },
        BinaryOp::Add => match (left, right) {
            (Value::Num(a), Value::Num(b)) => Ok(Value::Num(a + b)),
            (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::from(format!("{left}{right}"))),
            _ => Err(mismatch()),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            let (Some(a), Some(b)) = (left.as_num(), right.as_num()) else {
                return Err(mismatch());
            };
            Ok(Value::Num(match op {
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => a % b,
            }))
        }
    }
}

use serde::Deserialize;
use serde_json::{Number, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("Division by zero")]
    DivisionByZero,

    #[error("Unknown operation")]
    UnknownOperation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
        }
    }

    pub fn apply(&self, a: f64, b: f64) -> Result<f64, CalcError> {
        match self {
            Operation::Add => Ok(a + b),
            Operation::Subtract => Ok(a - b),
            Operation::Multiply => Ok(a * b),
            Operation::Divide => {
                if b == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                Ok(a / b)
            }
        }
    }
}

impl FromStr for Operation {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| CalcError::UnknownOperation(s.to_string()))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// REST と CLI が共有するリクエスト形式
#[derive(Debug, Clone, Deserialize)]
pub struct CalculateRequest {
    pub num1: f64,
    pub num2: f64,
    pub operation: String,
}

impl CalculateRequest {
    pub fn evaluate(&self) -> Result<f64, CalcError> {
        evaluate(self.num1, self.num2, &self.operation)
    }
}

/// Evaluates `a <operation> b`.
///
/// Operation names are matched exactly and case-sensitively.
pub fn evaluate(a: f64, b: f64, operation: &str) -> Result<f64, CalcError> {
    let op: Operation = operation.parse()?;
    let result = op.apply(a, b);
    debug!(a, b, operation = %op, ?result, "evaluated");
    result
}

/// Renders a result as a JSON number.
///
/// Integral values inside the exactly representable range become JSON integers
/// so `2 + 3` serializes as `5` rather than `5.0`. Non-finite values become `null`.
pub fn json_number(value: f64) -> Value {
    // 2^53: f64 で整数を正確に表せる上限
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

    // -0.0 は符号を残すため浮動小数のまま
    let negative_zero = value == 0.0 && value.is_sign_negative();
    if value.is_finite() && !negative_zero && value.fract() == 0.0 && value.abs() <= MAX_EXACT {
        return Value::Number(Number::from(value as i64));
    }
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

/// Renders a result as text for the command line.
///
/// Ordinary magnitudes print plainly (`5`, `2.5`). Values at or above `1e16`, or
/// below `1e-4`, switch to exponent form with a signed, two-digit exponent
/// (`1e+300`, `1.5e-07`).
pub fn format_number(value: f64) -> String {
    let magnitude = value.abs();
    if !value.is_finite() || magnitude == 0.0 || (1e-4..1e16).contains(&magnitude) {
        return value.to_string();
    }

    let formatted = format!("{value:e}");
    let Some((mantissa, exponent)) = formatted.split_once('e') else {
        return formatted;
    };
    match exponent.parse::<i32>() {
        Ok(exp) => {
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
        }
        Err(_) => formatted,
    }
}

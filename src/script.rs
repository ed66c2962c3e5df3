use anyhow::{Context, Result};
use std::process::ExitCode;

use crate::calculator::{format_number, CalcError, CalculateRequest};

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptOutcome {
    /// Line written to stdout: the number, or `Error: <message>`.
    pub output: String,
    pub success: bool,
}

impl ScriptOutcome {
    pub fn exit_code(&self) -> ExitCode {
        if self.success {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

/// Evaluates a JSON-encoded `{num1, num2, operation}` argument.
///
/// Calculation errors are reported through the outcome; only an argument that
/// cannot be decoded is returned as `Err`. Division by zero is printed like a
/// result and still exits successfully; an unknown operation does not.
pub fn run(argument: &str) -> Result<ScriptOutcome> {
    let request: CalculateRequest =
        serde_json::from_str(argument).context("invalid calculation argument")?;

    let outcome = match request.evaluate() {
        Ok(value) => ScriptOutcome {
            output: format_number(value),
            success: true,
        },
        Err(e) => ScriptOutcome {
            output: format!("Error: {e}"),
            success: matches!(e, CalcError::DivisionByZero),
        },
    };
    Ok(outcome)
}

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

use calc_backend::{logging, script};

#[derive(Parser)]
#[command(name = "calc-script")]
#[command(about = "Evaluate one calculation and print the result")]
#[command(version)]
struct Cli {
    /// JSON object such as '{"num1": 2, "num2": 3, "operation": "add"}'
    request: String,
}

fn main() -> Result<ExitCode> {
    logging::init("warn");
    let cli = Cli::parse();

    let outcome = script::run(&cli.request)?;
    println!("{}", outcome.output);
    Ok(outcome.exit_code())
}

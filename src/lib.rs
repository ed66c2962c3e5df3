pub mod calculator;
pub mod config;
pub mod jsonrpc;
pub mod logging;
pub mod rest;
pub mod script;
pub mod server;


pub use calculator::{evaluate, CalcError, CalculateRequest, Operation};

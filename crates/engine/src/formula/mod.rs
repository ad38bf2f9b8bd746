// Formula parsing and evaluation

pub mod parser;
pub mod eval;

pub use eval::{display_value, evaluate, evaluate_with_rows, EvalResult, ERROR_DISPLAY};

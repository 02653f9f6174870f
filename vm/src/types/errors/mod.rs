pub mod math_errors;
pub mod program_errors;

pub mod cairo_run_errors;
pub mod decode_errors;
pub mod exec_scope_errors;
pub mod hint_errors;
pub mod memory_errors;
pub mod runner_errors;
pub mod trace_errors;
pub mod vm_errors;

pub mod context;
pub(crate) mod decoding;
pub mod errors;
pub mod runners;
pub mod security;
pub mod trace;
pub mod vm_core;
pub mod vm_memory;

//! # A Cairo bytecode virtual machine
//!
//! Executes compiled Cairo programs over a segmented, write-once memory and
//! produces the relocated trace and memory a prover consumes.
//!
//! ## Feature Flags
//! - `clap`: derives [`clap::ValueEnum`] for [`LayoutName`](types::layout_name::LayoutName)
//!   so command line front ends can parse layouts directly.

#![forbid(unsafe_code)]

pub mod cairo_run;
pub mod hint_processor;
pub mod math_utils;
pub mod serde;
pub mod types;
pub mod utils;
pub mod vm;

pub use starknet_types_core::felt::Felt as Felt252;

#[cfg(test)]
mod tests;

pub mod deserialize_program;
mod deserialize_utils;

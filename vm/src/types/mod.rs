pub mod builtin_name;
pub mod errors;
pub mod exec_scope;
pub mod instance_definitions;
pub mod instruction;
pub mod layout;
pub mod layout_name;
pub mod program;
pub mod relocatable;

//! Common module for library exports

pub use crate::analyzer::StackAnalyzer;
pub use crate::backend::{Backend, DefaultBackend};
pub use crate::error::{StackError, StackResult};
pub use crate::symbols::demangle;
pub use crate::types::{Address, SymbolRecord};

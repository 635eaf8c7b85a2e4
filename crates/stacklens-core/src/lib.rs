//! # stacklens-core
//!
//! Call-stack capture and symbolication for diagnostic reports.
//!
//! This crate answers two questions on demand:
//! - which raw return addresses make up the current call chain, and
//! - which function (and, where debug info allows, which file and line) each
//!   of those addresses belongs to.
//!
//! It is meant to run while some other failure is being handled, so none of
//! its operations fail: every error path degrades to "less information".
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stacklens_core::StackAnalyzer;
//!
//! let mut analyzer = StackAnalyzer::new();
//! analyzer.analyze();
//!
//! analyzer.get_symbols(
//!     |symbol| {
//!         println!("{symbol}");
//!     },
//!     false,
//! );
//! ```
//!
//! ## Backends
//!
//! Exactly one capture/resolve backend is selected at build time, see
//! [`backend`]:
//!
//! - **`DebugInfo`** (`debuginfo` feature, Unix): `backtrace` unwinder + DWARF
//!   (file, line, inlined frames), falling back to symbol tables
//! - **`ExecInfo`** (glibc Linux, macOS): `backtrace(3)` + `dladdr(3)` names
//! - **`RtlCapture`** (Windows): `RtlCaptureStackBackTrace`, addresses only
//!
//! ## Why unsafe code is needed
//!
//! Walking the stack and asking the dynamic loader about addresses are FFI
//! calls (`backtrace(3)`, `dladdr(3)`, `RtlCaptureStackBackTrace`). They are
//! wrapped in safe functions that never hand out dangling data.

#![allow(unsafe_code)] // Required for the native stack-walk and loader APIs

pub mod analyzer;
pub mod backend;
pub mod error;
pub mod prelude;
pub mod symbols;
pub mod types;

pub use analyzer::StackAnalyzer;
pub use backend::{Backend, DefaultBackend};
pub use error::{StackError, StackResult};
pub use symbols::demangle;
pub use types::{Address, SymbolRecord};

//! # Types
//!
//! Backend-agnostic types shared by capture, resolution and the analyzer.
//!
//! These types hide which native facility produced an address or a symbol, so
//! callers never need to know whether a trace came from a DWARF-aware unwinder,
//! `backtrace(3)`, or `RtlCaptureStackBackTrace`.

pub mod address;
pub mod symbols;

// Re-export all public types
pub use address::Address;
pub use symbols::SymbolRecord;

//! Symbol record type.

use std::fmt;

use super::Address;

/// One resolved symbol for one captured address.
///
/// A single address can produce several records when the compiler inlined
/// calls into the function containing it; they are reported innermost first.
///
/// `function_name` is already demangled. It is empty when no backend could
/// name the address, in which case the record renders as `<unknown>@address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRecord
{
    /// Source file, if debug information provided one.
    pub source_file: Option<String>,
    /// Line number, if debug information provided one.
    pub line: Option<u32>,
    /// Demangled function name, possibly empty.
    pub function_name: String,
    /// The captured address this record was resolved from.
    pub address: Address,
}

impl SymbolRecord
{
    /// Record for an address nothing could name.
    pub fn unknown(address: Address) -> Self
    {
        Self {
            source_file: None,
            line: None,
            function_name: String::new(),
            address,
        }
    }

    /// Record carrying only a function name (symbol-table lookups).
    pub fn named(address: Address, function_name: impl Into<String>) -> Self
    {
        Self {
            source_file: None,
            line: None,
            function_name: function_name.into(),
            address,
        }
    }

    /// Whether the record has no function name.
    pub fn is_unknown(&self) -> bool
    {
        self.function_name.is_empty()
    }
}

impl fmt::Display for SymbolRecord
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if self.function_name.is_empty() {
            return write!(f, "<unknown>@{}", self.address);
        }

        write!(f, "{}", self.function_name)?;
        match (&self.source_file, self.line) {
            (Some(file), Some(line)) => write!(f, " ({file}:{line})"),
            (Some(file), None) => write!(f, " ({file})"),
            (None, _) => Ok(()),
        }
    }
}

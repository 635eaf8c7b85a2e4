//! # Stack Analyzer
//!
//! Owns one captured stack trace and turns it into symbols on demand.
//!
//! ## Lifecycle
//!
//! ```text
//! new() ──analyze()──> captured ──trim_to_current_stack_frame()──> trimmed
//!                         │                                           │
//!                         └───────────── get_symbols() / symbols() ───┘
//! ```
//!
//! Capture is cheap: it only records return addresses. Resolution (reading
//! debug info from disk) happens when the symbols are enumerated, which is
//! typically when a report is written, and its results are not kept.

use std::fmt;
use std::marker::PhantomData;

use crate::backend::{Backend, DefaultBackend};
use crate::types::{Address, SymbolRecord};

/// Least-recent frames dropped by [`StackAnalyzer::analyze`]
/// (the runtime's entry point).
pub const SKIP_ENTRY_FRAMES: usize = 1;

/// Most-recent frames dropped by [`StackAnalyzer::analyze`]
/// (`analyze` itself).
pub const BASE_SKIP_FRAMES: usize = 1;

/// A captured call stack, most recent call first.
///
/// The backend is chosen at compile time; [`DefaultBackend`] is the best one
/// the build supports.
///
/// ## Example
///
/// ```rust,no_run
/// use stacklens_core::StackAnalyzer;
///
/// let mut analyzer = StackAnalyzer::new();
/// analyzer.analyze();
/// analyzer.trim_to_current_stack_frame();
///
/// for symbol in analyzer.symbols() {
///     eprintln!("{symbol}");
/// }
/// ```
pub struct StackAnalyzer<B: Backend = DefaultBackend>
{
    addresses: Vec<Address>,
    _backend: PhantomData<fn() -> B>,
}

impl StackAnalyzer
{
    /// Create an analyzer for the [`DefaultBackend`] with an empty trace.
    pub fn new() -> Self
    {
        Self::with_backend()
    }
}

impl<B: Backend> StackAnalyzer<B>
{
    /// Create an analyzer for backend `B` with an empty trace.
    ///
    /// ```rust
    /// use stacklens_core::backend::Unsupported;
    /// use stacklens_core::StackAnalyzer;
    ///
    /// let mut analyzer = StackAnalyzer::<Unsupported>::with_backend();
    /// analyzer.analyze();
    /// assert!(analyzer.is_empty());
    /// ```
    pub fn with_backend() -> Self
    {
        Self {
            addresses: Vec::new(),
            _backend: PhantomData,
        }
    }

    /// Capture the call stack at the caller of `analyze`.
    ///
    /// Replaces any previously captured trace. The trace may be empty if the
    /// backend is unavailable.
    #[inline(never)]
    pub fn analyze(&mut self)
    {
        self.addresses = B::capture(SKIP_ENTRY_FRAMES, BASE_SKIP_FRAMES);
    }

    /// Drop the frames this trace shares with the caller's current stack.
    ///
    /// Captures a fresh trace at the call site and removes the common
    /// least-recent frames from this one, leaving only the frames that were
    /// active at capture time but are no longer on the stack. Does nothing if
    /// the traces share no suffix.
    #[inline(never)]
    pub fn trim_to_current_stack_frame(&mut self)
    {
        let mut current = Self::with_backend();
        current.analyze();
        trim_common_suffix(&mut self.addresses, &mut current.addresses);
    }

    /// Resolve every address and pass each record to `callback`.
    ///
    /// Records arrive in trace order (most recent call first, inlined frames
    /// innermost first), or in exactly the reverse order when `reversed` is
    /// set. Nothing is cached, so repeated calls resolve again.
    pub fn get_symbols<F>(&self, mut callback: F, reversed: bool)
    where
        F: FnMut(&SymbolRecord),
    {
        if reversed {
            let records: Vec<SymbolRecord> = self.symbols().collect();
            records.iter().rev().for_each(callback);
        } else {
            self.symbols().for_each(|record| callback(&record));
        }
    }

    /// Lazily resolve the trace, one address at a time, in trace order.
    pub fn symbols(&self) -> impl Iterator<Item = SymbolRecord> + '_
    {
        self.addresses.iter().copied().flat_map(B::resolve)
    }

    /// The captured addresses, most recent call first.
    pub fn addresses(&self) -> &[Address]
    {
        &self.addresses
    }

    /// Number of captured addresses. Inline frames can make the number of
    /// resolved records larger.
    pub fn len(&self) -> usize
    {
        self.addresses.len()
    }

    /// Whether nothing has been captured (or trimming removed every frame).
    pub fn is_empty(&self) -> bool
    {
        self.addresses.is_empty()
    }
}

impl<B: Backend> Default for StackAnalyzer<B>
{
    fn default() -> Self
    {
        Self::with_backend()
    }
}

impl<B: Backend> Clone for StackAnalyzer<B>
{
    fn clone(&self) -> Self
    {
        Self {
            addresses: self.addresses.clone(),
            _backend: PhantomData,
        }
    }
}

impl<B: Backend> fmt::Debug for StackAnalyzer<B>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("StackAnalyzer")
            .field("backend", &B::NAME)
            .field("addresses", &self.addresses)
            .finish()
    }
}

impl<B: Backend> fmt::Display for StackAnalyzer<B>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        for (index, record) in self.symbols().enumerate() {
            writeln!(f, "#{index:<3} {record}")?;
        }
        Ok(())
    }
}

/// Pop equal trailing addresses from both traces.
fn trim_common_suffix(trace: &mut Vec<Address>, current: &mut Vec<Address>)
{
    while let (Some(last), Some(current_last)) = (trace.last(), current.last()) {
        if last != current_last {
            break;
        }
        trace.pop();
        current.pop();
    }
}

//! Raw program-counter address type.

use std::ffi::c_void;
use std::fmt;

/// Strongly typed program-counter address
///
/// A machine-word sized value captured from a stack walk. It has no meaning
/// beyond what a backend can resolve it to; two addresses are only ever
/// compared for equality (see trimming in [`StackAnalyzer`](crate::StackAnalyzer)).
///
/// ## Example
///
/// ```rust
/// use stacklens_core::types::Address;
///
/// let addr = Address::from(0x1000);
/// assert_eq!(addr.value(), 0x1000);
/// assert_eq!(addr.to_string(), "0x0000000000001000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(usize);

impl Address
{
    /// Create a new address from a `usize` value
    pub const fn new(value: usize) -> Self
    {
        Address(value)
    }

    /// Create an address from a raw code pointer.
    pub fn from_ptr(ptr: *const c_void) -> Self
    {
        Address(ptr as usize)
    }

    /// Get the raw `usize` value of this address
    pub const fn value(self) -> usize
    {
        self.0
    }

    /// The raw value as a pointer, for handing back to loader APIs.
    pub fn as_ptr(self) -> *const c_void
    {
        self.0 as *const c_void
    }

    /// Address to use when looking up the symbol of a return address.
    ///
    /// Captured addresses point at the instruction *after* a call. Looking up
    /// one byte earlier lands inside the call instruction, which belongs to the
    /// right function and line even when the call is the last instruction of
    /// a function or an inlined scope.
    pub const fn lookup_pc(self) -> usize
    {
        self.0.saturating_sub(1)
    }
}

impl From<usize> for Address
{
    fn from(value: usize) -> Self
    {
        Address(value)
    }
}

impl From<Address> for usize
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x}", self.0)
    }
}

impl fmt::LowerHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

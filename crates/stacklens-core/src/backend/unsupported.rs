//! Backend for targets without any stack-walk facility.

use smallvec::{smallvec, SmallVec};

use super::Backend;
use crate::types::{Address, SymbolRecord};

/// Captures nothing and resolves nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

impl Backend for Unsupported
{
    const NAME: &'static str = "unsupported";

    fn capture(_skip_entry: usize, _skip_base: usize) -> Vec<Address>
    {
        Vec::new()
    }

    fn resolve(address: Address) -> SmallVec<[SymbolRecord; 1]>
    {
        smallvec![SymbolRecord::unknown(address)]
    }
}

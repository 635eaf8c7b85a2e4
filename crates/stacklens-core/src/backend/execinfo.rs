//! `execinfo` backend: `backtrace(3)` for capture, `dladdr(3)` for names.
//!
//! Available on glibc Linux and macOS. It needs no debug information, so it
//! only ever reports exported symbol names: no files, lines or inlined
//! frames.
//!
//! ## Limitations
//!
//! `backtrace(3)` gives no way to ask for the stack depth up front, so capture
//! retries with a doubled buffer until the whole stack fits. That allocates,
//! which makes capture unsuitable for signal handlers.

use std::ptr;

use libc::{c_int, c_void};
use smallvec::{smallvec, SmallVec};
use tracing::trace;

use super::{skip_frames, Backend};
use crate::symbols::dladdr;
use crate::types::{Address, SymbolRecord};

const INITIAL_FRAMES: usize = 64;

/// `backtrace(3)` + `dladdr(3)` backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecInfo;

impl Backend for ExecInfo
{
    const NAME: &'static str = "execinfo";

    #[inline(never)]
    fn capture(skip_entry: usize, skip_base: usize) -> Vec<Address>
    {
        let mut buffer: Vec<*mut c_void> = vec![ptr::null_mut(); INITIAL_FRAMES];

        // The loop stays in this function body: the first frame `backtrace`
        // reports must be `capture` itself.
        let count = loop {
            let capacity = c_int::try_from(buffer.len()).unwrap_or(c_int::MAX);

            // SAFETY: `buffer` holds `capacity` writable slots and `backtrace`
            // writes at most that many.
            let count = unsafe { libc::backtrace(buffer.as_mut_ptr(), capacity) };
            let Ok(count) = usize::try_from(count) else {
                return Vec::new();
            };

            if count < buffer.len() || capacity == c_int::MAX {
                break count.min(buffer.len());
            }
            trace!("stack deeper than {} frames, retrying", buffer.len());
            buffer.resize(buffer.len() * 2, ptr::null_mut());
        };

        let mut frames: Vec<Address> = buffer[..count].iter().map(|&pc| Address::from_ptr(pc)).collect();
        skip_frames(&mut frames, 1 + skip_base, skip_entry);
        frames
    }

    fn resolve(address: Address) -> SmallVec<[SymbolRecord; 1]>
    {
        let name = dladdr::nearest_symbol(address.lookup_pc()).unwrap_or_default();
        smallvec![SymbolRecord::named(address, name)]
    }
}

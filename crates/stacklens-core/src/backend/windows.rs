//! Windows backend: `RtlCaptureStackBackTrace` for capture, no resolution.

use std::ffi::c_void;
use std::ptr;

use smallvec::{smallvec, SmallVec};

use super::{skip_frames, Backend};
use crate::types::{Address, SymbolRecord};

const MAX_FRAMES: usize = 64;

#[link(name = "kernel32")]
extern "system" {
    fn RtlCaptureStackBackTrace(
        frames_to_skip: u32,
        frames_to_capture: u32,
        back_trace: *mut *mut c_void,
        back_trace_hash: *mut u32,
    ) -> u16;
}

/// `RtlCaptureStackBackTrace` backend.
///
/// Captures at most 64 frames. Addresses are not resolved; every record is
/// unknown and renders as the raw address.
#[derive(Debug, Clone, Copy, Default)]
pub struct RtlCapture;

impl Backend for RtlCapture
{
    const NAME: &'static str = "rtlcapture";

    #[inline(never)]
    fn capture(skip_entry: usize, skip_base: usize) -> Vec<Address>
    {
        let mut buffer = [ptr::null_mut::<c_void>(); MAX_FRAMES];
        let skip = u32::try_from(1 + skip_base).unwrap_or(u32::MAX);

        // SAFETY: `buffer` holds `MAX_FRAMES` writable slots, the hash pointer
        // may be null.
        let count = unsafe {
            RtlCaptureStackBackTrace(skip, MAX_FRAMES as u32, buffer.as_mut_ptr(), ptr::null_mut())
        };
        let count = usize::from(count).min(MAX_FRAMES);

        let mut frames: Vec<Address> = buffer[..count].iter().map(|&pc| Address::from_ptr(pc)).collect();
        // A full buffer means the walk stopped early; the oldest frames were
        // never captured, so there is no entry frame to drop.
        let entry = if count < MAX_FRAMES { skip_entry } else { 0 };
        skip_frames(&mut frames, 0, entry);
        frames
    }

    fn resolve(address: Address) -> SmallVec<[SymbolRecord; 1]>
    {
        smallvec![SymbolRecord::unknown(address)]
    }
}

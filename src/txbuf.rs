//! Transmit buffer (spec.md §4.2, component B).
//!
//! Represents an in-flight request/response body as either bytes copied
//! into the core (`Inline`) or a boxed slice handed over by the app
//! (`Pointer`) and dereferenced once at `init` time. `#![forbid(unsafe_code)]`
//! rules out modeling `Pointer` as a raw address the way a C implementation
//! would; a `Box<[u8]>` handed over by the `AppSession` at init plays the
//! same role — borrowed ownership, dereferenced exactly once, streamed out
//! incrementally — without unsafe pointer arithmetic. `free()` has no
//! explicit counterpart; `Drop` does the job.

use crate::error::Error;
use crate::util::LengthChecker;

enum Source {
    Inline(Vec<u8>),
    Pointer(Box<[u8]>),
}

impl Source {
    fn bytes(&self) -> &[u8] {
        match self {
            Source::Inline(v) => v,
            Source::Pointer(b) => b,
        }
    }
}

/// Drains a body into scatter-gather segments for the transport tx queue.
///
/// Invariant: `drained() + remaining() == total_len()` always, enforced by
/// the underlying [`LengthChecker`] rather than plain subtraction.
pub(crate) struct TxBuf {
    source: Source,
    checker: LengthChecker,
}

impl TxBuf {
    pub fn inline(data: Vec<u8>) -> Self {
        let total = data.len() as u64;
        TxBuf {
            source: Source::Inline(data),
            checker: LengthChecker::new(total),
        }
    }

    pub fn pointer(data: Box<[u8]>) -> Self {
        let total = data.len() as u64;
        TxBuf {
            source: Source::Pointer(data),
            checker: LengthChecker::new(total),
        }
    }

    pub fn total_len(&self) -> usize {
        self.source.bytes().len()
    }

    pub fn drained(&self) -> usize {
        self.checker.handled() as usize
    }

    pub fn remaining(&self) -> usize {
        self.checker.remaining() as usize
    }

    /// A single contiguous segment of up to `max_len` undrained bytes.
    ///
    /// A real scatter-gather producer (body split across multiple backing
    /// chunks) would return multiple segments here; this core's sources are
    /// always a single contiguous allocation, so one segment suffices.
    pub fn get_segs(&self, max_len: usize) -> &[u8] {
        let remaining = &self.source.bytes()[self.drained()..];
        let n = remaining.len().min(max_len);
        &remaining[..n]
    }

    /// Advance the consumed counter by `n` bytes (clamped to what remains)
    /// and report how many bytes were actually credited.
    pub fn drain(&mut self, n: usize) -> usize {
        let n = n.min(self.remaining());
        // Pre-clamped to `remaining()`, so this can never overrun.
        let _ = self.checker.append(n as u64, Error::ShortTransportSend);
        n
    }

    pub fn is_drained(&self) -> bool {
        self.checker.complete()
    }
}

//! Connection/endpoint configuration (SPEC_FULL.md §11).
//!
//! Validated in the constructor rather than via a derive-based format: a
//! plain struct with a `Result`-returning constructor (see `Call::new`)
//! instead of reaching for `serde`.

use core::time::Duration;

use crate::error::Error;

const MIN_SEGMENT_SIZE: usize = 1024 * 1024;
const MIN_FIFO_SIZE: usize = 4 * 1024;
const MAX_FIFO_SIZE: usize = 2 * 1024 * 1024 * 1024;

/// The fifo threshold and deq-notification threshold spec.md §4.4 fixes at
/// 16 KiB, floored by the queue's actual capacity.
const FIFO_THRESHOLD_CAP: usize = 16 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    first_segment_size: usize,
    add_segment_size: usize,
    fifo_size: usize,
    idle_timeout: Duration,
    tls: bool,
}

impl Config {
    pub fn new(
        first_segment_size: usize,
        add_segment_size: usize,
        fifo_size: usize,
        idle_timeout: Duration,
        tls: bool,
    ) -> Result<Self, Error> {
        if first_segment_size < MIN_SEGMENT_SIZE {
            return Err(Error::InvalidConfig("first_segment_size must be >= 1 MiB"));
        }
        if add_segment_size < MIN_SEGMENT_SIZE {
            return Err(Error::InvalidConfig("add_segment_size must be >= 1 MiB"));
        }
        if !(MIN_FIFO_SIZE..=MAX_FIFO_SIZE).contains(&fifo_size) {
            return Err(Error::InvalidConfig("fifo_size must be within 4 KiB..=2 GiB"));
        }
        if idle_timeout.is_zero() {
            return Err(Error::InvalidConfig("idle_timeout must be non-zero"));
        }

        Ok(Config {
            first_segment_size,
            add_segment_size,
            fifo_size,
            idle_timeout,
            tls,
        })
    }

    pub fn first_segment_size(&self) -> usize {
        self.first_segment_size
    }

    pub fn add_segment_size(&self) -> usize {
        self.add_segment_size
    }

    pub fn fifo_size(&self) -> usize {
        self.fifo_size
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub fn tls(&self) -> bool {
        self.tls
    }

    /// `min(16 KiB, fifo_size)` per spec.md §4.4's tie-break rule, applied
    /// both to the fifo threshold and the deq-notification threshold
    /// installed on the transport tx queue at accept time.
    pub fn fifo_threshold(&self) -> usize {
        self.fifo_size.min(FIFO_THRESHOLD_CAP)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            first_segment_size: MIN_SEGMENT_SIZE,
            add_segment_size: MIN_SEGMENT_SIZE,
            fifo_size: 64 * 1024,
            idle_timeout: Duration::from_secs(30),
            tls: false,
        }
    }
}

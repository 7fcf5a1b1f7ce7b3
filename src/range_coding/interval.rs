use crate::{Result, Violation};

/// A symbol's cumulative frequency interval `[low_count, high_count)` out of `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolInterval {
    low_count: u32,
    high_count: u32,
    total: u32,
}

impl SymbolInterval {
    /// Checks `low_count < high_count <= total`. Whether `total` fits the
    /// current range is only known when the interval is applied.
    pub fn new(low_count: u32, high_count: u32, total: u32) -> Result<Self> {
        if total == 0 {
            return Err(Violation::ZeroTotal.into());
        }

        if low_count >= high_count {
            return Err(Violation::EmptyInterval.into());
        }

        if high_count > total {
            return Err(Violation::CountAboveTotal.into());
        }

        Ok(Self { low_count, high_count, total })
    }

    pub fn low_count(&self) -> u32 {
        self.low_count
    }

    pub fn high_count(&self) -> u32 {
        self.high_count
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Whether `target`, as returned by a decoder, selects this interval.
    pub fn contains(&self, target: u32) -> bool {
        self.low_count <= target && target < self.high_count
    }
}

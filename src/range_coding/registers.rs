use crate::{
    range_coding::{
        SymbolInterval, CODE_SHIFT, COLLAPSE_WIDTH, INITIAL_HIGH, MIN_LOW, MIN_WIDTH, SYMBOL_BITS,
        SYMBOL_MAX, TOP_MASK, UNDERFLOW_WIDEN_BIAS,
    },
    Result, Violation,
};
use tracing::trace;

/// The `(low, high)` registers bounding the undetermined part of the code value.
///
/// Both ends are inclusive. `low <= high` and `low != 0` hold between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    // The low end of the current range
    low: u32,

    // The high end of the current range, one less than the open upper bound
    high: u32,
}

impl Default for Range {
    fn default() -> Self {
        Self::new()
    }
}

impl Range {
    pub fn new() -> Self {
        Self { low: MIN_LOW, high: INITIAL_HIGH }
    }

    pub fn low(&self) -> u32 {
        self.low
    }

    pub fn high(&self) -> u32 {
        self.high
    }

    /// The number of values in the current range. Never overflows since `low >= 1`.
    pub fn width(&self) -> u32 {
        self.high - self.low + 1
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Narrows the range to the sub-range belonging to `interval`.
    ///
    /// Fails without touching the registers if `interval.total()` exceeds the width.
    ///
    /// With `r = width / total`, `r * high_count <= r * total <= width`, so the
    /// new `high` is at most the old one. `low + r * high_count` alone can reach
    /// 2^32 when `high == u32::MAX`, hence the subtraction happens first.
    pub fn narrow(&mut self, interval: &SymbolInterval) -> Result<()> {
        let width = self.width();

        if interval.total() > width {
            return Err(Violation::TotalExceedsRange.into());
        }

        let r = width / interval.total();

        self.high = self.low + (r * interval.high_count() - 1);
        self.low += r * interval.low_count();

        debug_assert!(self.low <= self.high);
        Ok(())
    }

    /// Renormalizes until the top bytes differ and the range is at least [`MIN_WIDTH`] wide.
    ///
    /// `on_shift` receives each high-order byte shifted out of `low`, in order.
    /// The encoder writes it out; the decoder shifts a fresh byte into its code register.
    pub fn renormalize<E, F>(&mut self, mut on_shift: F) -> std::result::Result<(), E>
    where
        F: FnMut(u8) -> std::result::Result<(), E>,
    {
        loop {
            if self.low & TOP_MASK == self.high & TOP_MASK {
                on_shift((self.low >> CODE_SHIFT) as u8)?;
                self.shift();
            } else if self.high - self.low < MIN_WIDTH {
                self.force_underflow();
            } else {
                return Ok(());
            }
        }
    }

    fn shift(&mut self) {
        self.low <<= SYMBOL_BITS;
        self.high = (self.high << SYMBOL_BITS) | SYMBOL_MAX;

        if self.low == 0 {
            self.low = MIN_LOW;
        }
    }

    // The top bytes differ but too few values remain to code with, so pick a
    // sub-range around the midpoint whose top bytes will converge.
    fn force_underflow(&mut self) {
        let mid = (self.low >> 1) + (self.high >> 1);

        trace!(low = self.low, high = self.high, mid, "forcing underflow");

        if self.high - self.low > COLLAPSE_WIDTH {
            self.low = mid - UNDERFLOW_WIDEN_BIAS;
            self.high = mid + UNDERFLOW_WIDEN_BIAS;
        } else {
            self.low = mid;
            self.high = mid;
        }
    }

    #[cfg(test)]
    pub(crate) fn from_parts(low: u32, high: u32) -> Self {
        Self { low, high }
    }
}

//! A carry-less 32-bit range coder.
//!
//! [`RangeEncoder`] turns a sequence of cumulative frequency intervals into
//! bytes and [`RangeDecoder`] recovers them. Neither side owns a probability
//! model: callers feed intervals directly, or plug in a [`SymbolModel`].

mod model;
mod range_coding;

pub use model::SymbolModel;
pub use range_coding::{
    Range, RangeDecoder, RangeEncoder, SymbolInterval, COLLAPSE_WIDTH, INITIAL_HIGH, MIN_LOW,
    MIN_WIDTH, UNDERFLOW_WIDEN_BIAS,
};

/// The rule a caller or model broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("frequency total is zero")]
    ZeroTotal,

    /// `low_count` was not strictly less than `high_count`.
    #[error("low count is not below high count")]
    EmptyInterval,

    #[error("high count exceeds frequency total")]
    CountAboveTotal,

    /// The frequency total is larger than the width of the current range.
    #[error("frequency total exceeds current range width")]
    TotalExceedsRange,

    /// A symbol operation ran before a sink or source was attached.
    #[error("coder is not attached")]
    NotAttached,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("contract violation: {0}")]
    ContractViolation(#[from] Violation),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A previous error ended this session; attach again to start a new one.
    #[error("session already failed")]
    SessionFailed,

    #[error("model has no interval for symbol")]
    UnknownSymbol,

    #[error("model has no symbol for target {0}")]
    NoSymbolForTarget(u32),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A failed `attach`, carrying back the previously attached sink or source.
///
/// The new sink or source stays attached either way, in a failed session for a
/// decoder that could not prime.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct AttachError<T> {
    #[source]
    error: Error,
    previous: Option<T>,
}

impl<T> AttachError<T> {
    pub(crate) fn new(error: Error, previous: Option<T>) -> Self {
        Self { error, previous }
    }

    pub fn error(&self) -> &Error {
        &self.error
    }

    pub fn into_parts(self) -> (Error, Option<T>) {
        (self.error, self.previous)
    }

    /// Returns the sink or source that was attached before, if any.
    pub fn into_previous(self) -> Option<T> {
        self.previous
    }
}

impl<T> From<AttachError<T>> for Error {
    fn from(attach: AttachError<T>) -> Self {
        attach.error
    }
}

// The total number of bits in each of the state registers.
const CODE_BITS: u32 = 32;
// The number of bits to output at a time.
const SYMBOL_BITS: u32 = 8;
// The maximum symbol value.
const SYMBOL_MAX: u32 = (1u32 << SYMBOL_BITS) - 1;
// Bits to shift by to move the high-order symbol into the low-order position.
const CODE_SHIFT: u32 = CODE_BITS - SYMBOL_BITS;
// Mask selecting the high-order symbol of a register.
const TOP_MASK: u32 = SYMBOL_MAX << CODE_SHIFT;
// The number of bytes of `low` written by a flush, and read to prime a decoder.
const FLUSH_BYTES: usize = (CODE_BITS / SYMBOL_BITS) as usize;

/// The smallest value `low` may hold. A shift that would zero `low` sets it here instead.
pub const MIN_LOW: u32 = 1;
/// The initial (and post-flush) value of `high`.
pub const INITIAL_HIGH: u32 = u32::MAX;
/// Renormalization stops once `high - low` reaches this and the top bytes differ.
pub const MIN_WIDTH: u32 = 1 << 16;
/// At or below this width, underflow forcing collapses the range to a single point.
pub const COLLAPSE_WIDTH: u32 = 0x1000;
/// Half-width of the range rebuilt around the midpoint when forcing an underflow.
pub const UNDERFLOW_WIDEN_BIAS: u32 = 0xFF;

mod interval;
mod range_decoder;
mod range_encoder;
mod registers;

pub use interval::SymbolInterval;
pub use range_decoder::RangeDecoder;
pub use range_encoder::RangeEncoder;
pub use registers::Range;

use crate::SymbolInterval;

/// A probability model as seen by the coders.
///
/// The encoder side asks for the interval of a symbol it is about to code;
/// the decoder side asks which symbol's interval contains a decoded target.
/// Both sides must present identical intervals for the stream to round-trip.
pub trait SymbolModel {
    type Symbol;

    /// The frequency total every interval of this model is expressed against.
    fn total(&self) -> u32;

    fn interval_for(&self, symbol: &Self::Symbol) -> Option<SymbolInterval>;

    /// Finds the symbol whose interval contains `target`, where `target < self.total()`.
    fn lookup(&self, target: u32) -> Option<(Self::Symbol, SymbolInterval)>;
}

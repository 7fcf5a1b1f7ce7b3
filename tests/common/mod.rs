use carryless::{SymbolInterval, SymbolModel};

/// A fixed cumulative frequency table. Symbol `i` owns `[bounds[i], bounds[i + 1])`.
pub struct StaticModel {
    bounds: Vec<u32>,
}

impl StaticModel {
    pub fn from_frequencies(frequencies: &[u32]) -> Self {
        let mut bounds = vec![0];
        for &frequency in frequencies {
            assert!(frequency > 0);
            bounds.push(bounds[bounds.len() - 1] + frequency);
        }

        Self { bounds }
    }
}

impl SymbolModel for StaticModel {
    type Symbol = usize;

    fn total(&self) -> u32 {
        self.bounds[self.bounds.len() - 1]
    }

    fn interval_for(&self, symbol: &usize) -> Option<SymbolInterval> {
        let low = *self.bounds.get(*symbol)?;
        let high = *self.bounds.get(symbol + 1)?;

        SymbolInterval::new(low, high, self.total()).ok()
    }

    fn lookup(&self, target: u32) -> Option<(usize, SymbolInterval)> {
        // First bound strictly above `target` closes the symbol's interval.
        let symbol = self.bounds.iter().position(|&bound| bound > target)?.checked_sub(1)?;

        Some((symbol, self.interval_for(&symbol)?))
    }
}

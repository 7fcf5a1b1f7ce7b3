use crate::{
    range_coding::{Range, SymbolInterval, FLUSH_BYTES, SYMBOL_BITS},
    AttachError, Error, Result, SymbolModel, Violation,
};
use std::io::{ErrorKind, Read};
use tracing::debug;

/// Decodes symbol intervals from a byte source written by a [`RangeEncoder`](super::RangeEncoder).
///
/// Per symbol, call [`target`](Self::target), map the result to the
/// interval containing it, and pass that interval to
/// [`decode_symbol`](Self::decode_symbol). The stream carries no end marker;
/// once the source runs dry the decoder reads zeros.
pub struct RangeDecoder<R: Read> {
    source: Option<R>,

    range: Range,

    // The four stream bytes aligned with `range`
    code: u32,

    // Set once an error makes the remaining stream undecodable
    failed: bool,

    // Bytes read from the source, excluding end-of-stream padding
    bytes_consumed: u64,
}

impl<R: Read> Default for RangeDecoder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Read> RangeDecoder<R> {
    /// Creates a decoder with no source attached.
    pub fn new() -> Self {
        Self { source: None, range: Range::new(), code: 0, failed: false, bytes_consumed: 0 }
    }

    /// Creates a decoder attached to `source`, priming it from the first four bytes.
    pub fn with_source(source: R) -> Result<Self> {
        let mut decoder = Self::new();
        decoder.attach(source)?;
        Ok(decoder)
    }

    /// Starts a new session on `source`, handing back any previous source.
    ///
    /// If priming fails, `source` stays attached in a failed session and the
    /// error carries the previous source.
    pub fn attach(&mut self, source: R) -> std::result::Result<Option<R>, AttachError<R>> {
        let previous = self.source.replace(source);

        self.range.reset();
        self.code = 0;
        self.failed = false;
        self.bytes_consumed = 0;

        let result = self.prime();
        if let Err(error) = self.fail_on_error(result) {
            return Err(AttachError::new(error, previous));
        }

        debug!(code = self.code, "range decoder attached");
        Ok(previous)
    }

    fn prime(&mut self) -> Result<()> {
        let source = match self.source.as_mut() {
            Some(source) => source,
            None => return Err(Violation::NotAttached.into()),
        };

        for _ in 0..FLUSH_BYTES {
            let byte = read_byte(source, &mut self.bytes_consumed)?;
            self.code = (self.code << SYMBOL_BITS) | byte as u32;
        }

        Ok(())
    }

    /// Releases the source. Calling this while detached returns `None`.
    pub fn detach(&mut self) -> Option<R> {
        let source = self.source.take();
        if source.is_some() {
            debug!(bytes_consumed = self.bytes_consumed, "range decoder detached");
        }

        self.range.reset();
        self.code = 0;
        self.failed = false;
        source
    }

    pub fn is_attached(&self) -> bool {
        self.source.is_some()
    }

    pub fn bytes_consumed(&self) -> u64 {
        self.bytes_consumed
    }

    pub fn range(&self) -> Range {
        self.range
    }

    /// Returns the cumulative count, out of `total`, that the next coded
    /// symbol's interval contains.
    pub fn target(&mut self, total: u32) -> Result<u32> {
        self.ensure_usable()?;

        let result = self.compute_target(total);
        self.fail_on_error(result)
    }

    // Exact inverse of `Range::narrow`: a symbol coded as [lc, hc) left `code - low`
    // in [r * lc, r * hc), so dividing by r recovers a count in [lc, hc).
    fn compute_target(&self, total: u32) -> Result<u32> {
        if total == 0 {
            return Err(Violation::ZeroTotal.into());
        }

        let width = self.range.width();
        if total > width {
            return Err(Violation::TotalExceedsRange.into());
        }

        let r = width / total;
        let offset = self.code.saturating_sub(self.range.low());

        Ok((offset / r).min(total - 1))
    }

    /// Consumes the symbol occupying `[low_count, high_count)` out of `total`.
    pub fn decode_symbol(&mut self, low_count: u32, high_count: u32, total: u32) -> Result<()> {
        self.ensure_usable()?;

        let result =
            SymbolInterval::new(low_count, high_count, total).and_then(|i| self.decode_interval(&i));
        self.fail_on_error(result)
    }

    pub fn decode(&mut self, interval: SymbolInterval) -> Result<()> {
        self.ensure_usable()?;

        let result = self.decode_interval(&interval);
        self.fail_on_error(result)
    }

    /// Decodes the next symbol of `model`.
    pub fn decode_with<M: SymbolModel>(&mut self, model: &M) -> Result<M::Symbol> {
        let target = self.target(model.total())?;

        let result = match model.lookup(target) {
            Some((symbol, interval)) => self.decode_interval(&interval).map(|_| symbol),
            None => Err(Error::NoSymbolForTarget(target)),
        };
        self.fail_on_error(result)
    }

    fn decode_interval(&mut self, interval: &SymbolInterval) -> Result<()> {
        let source = match self.source.as_mut() {
            Some(source) => source,
            None => return Err(Violation::NotAttached.into()),
        };
        let code = &mut self.code;
        let bytes_consumed = &mut self.bytes_consumed;

        self.range.narrow(interval)?;
        self.range.renormalize(|_| {
            *code = (*code << SYMBOL_BITS) | read_byte(source, bytes_consumed)? as u32;
            Ok::<_, std::io::Error>(())
        })?;

        Ok(())
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.source.is_none() {
            return Err(Violation::NotAttached.into());
        }

        if self.failed {
            return Err(Error::SessionFailed);
        }

        Ok(())
    }

    fn fail_on_error<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.failed = true;
        }

        result
    }
}

// Reads the next byte, or 0 once the source is exhausted.
fn read_byte<R: Read>(source: &mut R, bytes_consumed: &mut u64) -> std::io::Result<u8> {
    let mut byte = [0u8; 1];

    loop {
        match source.read(&mut byte) {
            Ok(0) => return Ok(0),
            Ok(_) => {
                *bytes_consumed += 1;
                return Ok(byte[0]);
            },
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RangeEncoder;
    use std::io;

    // Yields `data`, interrupting before every byte, then fails.
    #[derive(Debug)]
    struct FlakySource {
        data: Vec<u8>,
        position: usize,
        interrupt: bool,
    }

    impl Read for FlakySource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::Error::new(ErrorKind::Interrupted, "try again"));
            }

            if self.position >= self.data.len() {
                return Err(io::Error::new(ErrorKind::Other, "connection reset"));
            }

            buf[0] = self.data[self.position];
            self.position += 1;
            Ok(1)
        }
    }

    #[test]
    fn test_attach_primes_code_msb_first() {
        let bytes = [0x12u8, 0x34, 0x56, 0x78, 0x9A];
        let decoder = RangeDecoder::with_source(&bytes[..]).unwrap();

        assert_eq!(decoder.code, 0x1234_5678);
        assert_eq!(decoder.bytes_consumed(), 4);
        assert_eq!(decoder.range(), Range::new());
    }

    #[test]
    fn test_short_stream_is_zero_padded() {
        let bytes = [0xABu8];
        let decoder = RangeDecoder::with_source(&bytes[..]).unwrap();

        assert_eq!(decoder.code, 0xAB00_0000);
        assert_eq!(decoder.bytes_consumed(), 1);
    }

    #[test]
    fn test_target_before_attach() {
        let mut decoder = RangeDecoder::<&[u8]>::new();

        assert!(matches!(
            decoder.target(4),
            Err(Error::ContractViolation(Violation::NotAttached))
        ));
        assert!(matches!(
            decoder.decode_symbol(0, 1, 4),
            Err(Error::ContractViolation(Violation::NotAttached))
        ));
    }

    #[test]
    fn test_target_of_initial_range() {
        // r = 0xFFFFFFFF / 4 = 0x3FFFFFFF
        let cases: &[(u32, u32)] = &[
            (0x0000_0001, 0),
            (0x4000_0000, 1),
            (0x8000_0000, 2),
            (0x7FFF_FFFE, 1),
            (0xBFFF_FFFD, 2),
            (0xBFFF_FFFE, 3),
            (0xFFFF_FFFF, 3),
        ];

        for &(code, expected) in cases {
            let bytes = code.to_be_bytes();
            let mut decoder = RangeDecoder::with_source(&bytes[..]).unwrap();

            assert_eq!(decoder.target(4).unwrap(), expected, "code {:#010x}", code);
        }
    }

    #[test]
    fn test_target_is_clamped() {
        // The initial width is not a multiple of 6, so the topmost codes lie
        // past the last symbol's range.
        let bytes = 0xFFFF_FFFFu32.to_be_bytes();
        let mut decoder = RangeDecoder::with_source(&bytes[..]).unwrap();

        assert_eq!(decoder.target(6).unwrap(), 5);
    }

    #[test]
    fn test_target_rejects_bad_totals() {
        let bytes = [0u8; 4];
        let mut decoder = RangeDecoder::with_source(&bytes[..]).unwrap();

        assert!(matches!(decoder.target(0), Err(Error::ContractViolation(Violation::ZeroTotal))));
        assert!(matches!(decoder.target(4), Err(Error::SessionFailed)));
    }

    #[test]
    fn test_interrupted_reads_are_retried() {
        let mut encoder = RangeEncoder::with_sink(Vec::<u8>::new());
        for _ in 0..32 {
            encoder.encode_symbol(3, 4, 7).unwrap();
        }
        let data = encoder.finish().unwrap();
        let length = data.len() as u64;

        let source = FlakySource { data, position: 0, interrupt: false };
        let mut decoder = RangeDecoder::with_source(source).unwrap();

        for _ in 0..32 {
            assert_eq!(decoder.target(7).unwrap(), 3);
            decoder.decode_symbol(3, 4, 7).unwrap();
        }
        assert_eq!(decoder.bytes_consumed(), length);
    }

    #[test]
    fn test_read_failure_fails_session() {
        let source = FlakySource { data: vec![0x10, 0x20], position: 0, interrupt: false };
        let err = RangeDecoder::with_source(source).err().unwrap();

        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_failed_attach_hands_back_previous_source() {
        let data = vec![0x10, 0x20, 0x30, 0x40];
        let first = FlakySource { data, position: 0, interrupt: false };
        let mut decoder = RangeDecoder::with_source(first).unwrap();

        let second = FlakySource { data: vec![0x50], position: 0, interrupt: false };
        let err = decoder.attach(second).unwrap_err();
        assert!(matches!(err.error(), Error::Io(_)));
        assert_eq!(err.into_previous().unwrap().position, 4);

        // The source that failed to prime stays attached, in a failed session.
        assert!(decoder.is_attached());
        assert!(matches!(decoder.target(4), Err(Error::SessionFailed)));
        assert_eq!(decoder.bytes_consumed(), 1);
        assert_eq!(decoder.detach().unwrap().data, vec![0x50u8]);
    }

    #[test]
    fn test_detach_is_idempotent() {
        let bytes = [1u8, 2, 3, 4];
        let mut decoder = RangeDecoder::with_source(&bytes[..]).unwrap();

        assert!(decoder.detach().is_some());
        assert!(decoder.detach().is_none());
        assert!(!decoder.is_attached());
    }

    #[test]
    fn test_reattach_resets_state() {
        let second = [0x00u8, 0x00, 0x00, 0x01];
        let mut encoder = RangeEncoder::with_sink(Vec::<u8>::new());
        encoder.encode_symbol(0, 1, 1000).unwrap();
        let first = encoder.finish().unwrap();

        let mut decoder = RangeDecoder::with_source(&first[..]).unwrap();
        decoder.decode_symbol(0, 1, 1000).unwrap();
        assert_ne!(decoder.range(), Range::new());

        let previous = decoder.attach(&second[..]).unwrap();
        assert!(previous.is_some());
        assert_eq!(decoder.range(), Range::new());
        assert_eq!(decoder.code, 1);
    }
}

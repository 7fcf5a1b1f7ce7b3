use crate::{
    range_coding::{Range, SymbolInterval},
    AttachError, Error, Result, SymbolModel, Violation,
};
use std::io::Write;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Session {
    // Nothing coded since the last flush
    Idle,
    // Registers hold state that a flush has yet to write out
    Open,
    // An error ended the session, its output must be discarded
    Failed,
}

/// Encodes symbol intervals into a byte sink.
///
/// Each session ends with exactly one [`flush`](Self::flush), which writes the
/// final four bytes of `low`. Dropping an encoder does not flush it.
pub struct RangeEncoder<W: Write> {
    sink: Option<W>,

    range: Range,

    session: Session,

    // Bytes written to the current sink, flush bytes included
    bytes_written: u64,
}

impl<W: Write> Default for RangeEncoder<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> RangeEncoder<W> {
    /// Creates an encoder with no sink attached.
    pub fn new() -> Self {
        Self { sink: None, range: Range::new(), session: Session::Idle, bytes_written: 0 }
    }

    /// Creates an encoder already attached to `sink`.
    pub fn with_sink(sink: W) -> Self {
        let mut encoder = Self::new();
        encoder.bind(sink);
        encoder
    }

    /// Starts a new session on `sink`.
    ///
    /// An open session on a previously attached sink is flushed first, and
    /// that sink is handed back. `sink` is attached even if that flush fails,
    /// in which case the error carries the previous sink.
    pub fn attach(&mut self, sink: W) -> std::result::Result<Option<W>, AttachError<W>> {
        let flushed = match self.session {
            Session::Open => self.flush(),
            _ => Ok(()),
        };

        let previous = self.sink.take();
        self.bind(sink);

        match flushed {
            Ok(()) => Ok(previous),
            Err(error) => Err(AttachError::new(error, previous)),
        }
    }

    fn bind(&mut self, sink: W) {
        self.sink = Some(sink);
        self.range.reset();
        self.session = Session::Open;
        self.bytes_written = 0;

        debug!("range encoder attached");
    }

    pub fn is_attached(&self) -> bool {
        self.sink.is_some()
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn range(&self) -> Range {
        self.range
    }

    /// Encodes the symbol occupying `[low_count, high_count)` out of `total`.
    pub fn encode_symbol(&mut self, low_count: u32, high_count: u32, total: u32) -> Result<()> {
        self.ensure_usable()?;

        let result =
            SymbolInterval::new(low_count, high_count, total).and_then(|i| self.encode_interval(&i));
        self.fail_on_error(result)
    }

    pub fn encode(&mut self, interval: SymbolInterval) -> Result<()> {
        self.ensure_usable()?;

        let result = self.encode_interval(&interval);
        self.fail_on_error(result)
    }

    /// Encodes `symbol` using the interval `model` assigns to it.
    pub fn encode_with<M: SymbolModel>(&mut self, model: &M, symbol: &M::Symbol) -> Result<()> {
        self.ensure_usable()?;

        let result = model
            .interval_for(symbol)
            .ok_or(Error::UnknownSymbol)
            .and_then(|interval| self.encode_interval(&interval));
        self.fail_on_error(result)
    }

    fn encode_interval(&mut self, interval: &SymbolInterval) -> Result<()> {
        let sink = match self.sink.as_mut() {
            Some(sink) => sink,
            None => return Err(Violation::NotAttached.into()),
        };
        let bytes_written = &mut self.bytes_written;

        self.range.narrow(interval)?;
        self.range.renormalize(|byte| {
            sink.write_all(&[byte])?;
            *bytes_written += 1;
            Ok::<_, std::io::Error>(())
        })?;

        self.session = Session::Open;
        Ok(())
    }

    /// Writes out the final state of the session and resets the registers.
    ///
    /// Does nothing if no sink is attached or nothing is pending.
    pub fn flush(&mut self) -> Result<()> {
        let sink = match self.sink.as_mut() {
            Some(sink) => sink,
            None => return Ok(()),
        };

        match self.session {
            Session::Idle => return Ok(()),
            Session::Failed => return Err(Error::SessionFailed),
            Session::Open => {},
        }

        let result = sink
            .write_all(&self.range.low().to_be_bytes())
            .and_then(|_| sink.flush())
            .map_err(Error::from);

        if result.is_ok() {
            self.bytes_written += self.range.low().to_be_bytes().len() as u64;
            self.range.reset();
            self.session = Session::Idle;

            debug!(bytes_written = self.bytes_written, "range encoder flushed");
        }

        self.fail_on_error(result)
    }

    /// Flushes any open session and releases the sink.
    ///
    /// The sink of a failed session is released without writing to it.
    /// Calling this while detached returns `Ok(None)`.
    pub fn detach(&mut self) -> Result<Option<W>> {
        if self.session == Session::Open {
            self.flush()?;
        }

        let sink = self.sink.take();
        if sink.is_some() {
            debug!(bytes_written = self.bytes_written, "range encoder detached");
        }

        self.range.reset();
        self.session = Session::Idle;
        Ok(sink)
    }

    /// Flushes and returns the attached sink.
    pub fn finish(mut self) -> Result<W> {
        self.detach()?.ok_or_else(|| Violation::NotAttached.into())
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.sink.is_none() {
            return Err(Violation::NotAttached.into());
        }

        if self.session == Session::Failed {
            return Err(Error::SessionFailed);
        }

        Ok(())
    }

    fn fail_on_error<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.session = Session::Failed;
        }

        result
    }
}

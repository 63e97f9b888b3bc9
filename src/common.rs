// Licensed under the Apache-2.0 license

//! Shared driver plumbing: the `Logger` abstraction used by every controller
//! in the crate.
//!
//! Drivers are generic over `L: Logger` and default to [`NoOpLogger`], so a
//! production image that never wires up a console pays nothing for logging.
//! Boards with a UART hand a [`WriterLogger`] wrapping any `embedded-io`
//! writer to the session instead.

use core::fmt;
use embedded_io::Write;

/// Severity of a log record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Level::Debug => "DEBUG",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        };
        f.write_str(tag)
    }
}

/// Sink for driver diagnostics.
///
/// Implementations must never fail the caller: a record that cannot be
/// emitted is dropped.
pub trait Logger {
    fn log(&mut self, level: Level, args: fmt::Arguments<'_>);

    fn debug(&mut self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    fn warn(&mut self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    fn error(&mut self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }
}

/// Logger that discards everything.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    #[inline]
    fn log(&mut self, _level: Level, _args: fmt::Arguments<'_>) {}
}

impl<L: Logger + ?Sized> Logger for &mut L {
    fn log(&mut self, level: Level, args: fmt::Arguments<'_>) {
        (**self).log(level, args);
    }
}

/// Logger that formats records onto an `embedded-io` writer, one line per
/// record, e.g. `[ERROR] spmi: write failed ...`.
pub struct WriterLogger<W: Write> {
    writer: W,
    min_level: Level,
}

impl<W: Write> WriterLogger<W> {
    /// Create a logger emitting every record at `Level::Debug` and above.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self::with_level(writer, Level::Debug)
    }

    /// Create a logger that drops records below `min_level`.
    #[must_use]
    pub fn with_level(writer: W, min_level: Level) -> Self {
        Self { writer, min_level }
    }

    /// Give back the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Logger for WriterLogger<W> {
    fn log(&mut self, level: Level, args: fmt::Arguments<'_>) {
        if level < self.min_level {
            return;
        }
        // A console that cannot keep up must not turn into a bus error.
        let _ = write!(self.writer, "[{level}] {args}\r\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    #[derive(Default)]
    struct Sink {
        bytes: Vec<u8>,
    }

    impl embedded_io::ErrorType for Sink {
        type Error = Infallible;
    }

    impl embedded_io::Write for Sink {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn test_writer_logger_formats_level_and_message() {
        let mut logger = WriterLogger::new(Sink::default());
        logger.error(format_args!("status {:#x}", 0x4));

        let sink = logger.into_inner();
        assert_eq!(sink.bytes, b"[ERROR] status 0x4\r\n");
    }

    #[test]
    fn test_writer_logger_filters_below_min_level() {
        let mut logger = WriterLogger::with_level(Sink::default(), Level::Warn);
        logger.debug(format_args!("scan done"));
        logger.warn(format_args!("slow channel"));

        let sink = logger.into_inner();
        assert_eq!(sink.bytes, b"[WARN] slow channel\r\n");
    }

    #[test]
    fn test_logger_through_mut_reference() {
        fn emit<L: Logger>(mut logger: L) {
            logger.debug(format_args!("{}", 7));
        }

        let mut logger = WriterLogger::new(Sink::default());
        emit(&mut logger);
        assert_eq!(logger.into_inner().bytes, b"[DEBUG] 7\r\n");
    }
}

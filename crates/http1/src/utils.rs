//! Utility macros and helpers shared across the crate.

use bytes::BytesMut;
use std::io;

/// Early-returns `Err($error)` when `$predicate` does not hold.
///
/// `assert!` for fallible paths: parse and encode code uses it for grammar
/// and limit checks where an error return, not a panic, is the contract.
/// The error expression is only evaluated on the failing path.
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;

/// An `io::Write` adapter over a `BytesMut`, so `write!` can format
/// directly into an output buffer without intermediate allocation.
///
/// Writing to a growable buffer cannot fail; the `io::Result` is only
/// there to satisfy the trait.
pub(crate) struct Writer<'a>(pub(crate) &'a mut BytesMut);

impl io::Write for Writer<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

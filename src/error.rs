use core::fmt::{self, Debug};

/// The blocking spin a bounded poll gave up on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage {
    /// Waiting for the instruction cache flush bit to clear.
    CacheFlush,
    /// Waiting for status register 2 to report the part unprotected.
    Unprotect,
}

/// The error type used by this library.
///
/// With the default unbounded polling only a verify mismatch can ever be
/// reported; a stuck controller hangs instead.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A bounded poll ran out of iterations.
    Timeout(Stage),
    /// Read-back differs from the expected data at `offset`.
    VerifyMismatch { offset: u32 },
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Error::Timeout(stage) => defmt::write!(fmt, "Error::Timeout({})", stage),
            Error::VerifyMismatch { offset } => {
                defmt::write!(fmt, "Error::VerifyMismatch({=u32:#x})", offset)
            }
        }
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Timeout(stage) => write!(f, "Error::Timeout({:?})", stage),
            Error::VerifyMismatch { offset } => {
                write!(f, "Error::VerifyMismatch({:#x})", offset)
            }
        }
    }
}

//! Error type shared by every layer of the driver

use core::fmt;

pub use display_interface::DisplayError;

/// Everything that can go wrong while talking to the panel or its buffers.
///
/// No variant is fatal: the caller can retry the operation, or `deinit` and
/// `init` the driver again.
#[derive(Clone, Debug)]
pub enum Error {
    /// Operation attempted before `init` or after `deinit`
    NotInitialized,
    /// `init` called on a driver that is already running
    AlreadyInitialized,
    /// Coordinates outside the panel, inverted rectangle, zero font size,
    /// unknown update code or an inconsistent configuration
    InvalidArgument,
    /// The serial bus or one of the control lines failed.
    ///
    /// The inner kind names the line: `BusWriteError` for the bus itself
    /// (short transfer, failed read, bus came up at 0 Hz), `DCError` for the
    /// mode-select pin, `CSError` for chip-select and `RSError` for reset.
    Transport(DisplayError),
    /// The request cannot be served by this wiring or entry point
    NotSupported,
    /// The panel is mid-refresh and the call refuses to block
    Busy,
}

// `DisplayError` carries no `PartialEq`; two transport errors are equal when
// they name the same line.
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Error::Transport(a), Error::Transport(b)) => {
                core::mem::discriminant(a) == core::mem::discriminant(b)
            }
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl Eq for Error {}

impl From<DisplayError> for Error {
    fn from(e: DisplayError) -> Self {
        Error::Transport(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotInitialized => f.write_str("display driver is not initialized"),
            Error::AlreadyInitialized => f.write_str("display driver is already initialized"),
            Error::InvalidArgument => f.write_str("invalid argument"),
            Error::Transport(kind) => write!(f, "transport error: {:?}", kind),
            Error::NotSupported => f.write_str("operation not supported"),
            Error::Busy => f.write_str("display is busy"),
        }
    }
}

impl core::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_error_converts_into_transport() {
        let e: Error = DisplayError::CSError.into();
        assert_eq!(e, Error::Transport(DisplayError::CSError));
    }

    #[test]
    fn transport_errors_compare_by_line() {
        assert_eq!(
            Error::Transport(DisplayError::DCError),
            Error::Transport(DisplayError::DCError)
        );
        assert_ne!(
            Error::Transport(DisplayError::DCError),
            Error::Transport(DisplayError::CSError)
        );
        assert_ne!(Error::Transport(DisplayError::BusWriteError), Error::Busy);
        assert_ne!(Error::NotSupported, Error::InvalidArgument);
        assert_eq!(Error::NotInitialized.clone(), Error::NotInitialized);
    }

    #[test]
    fn errors_render_human_readable_text() {
        assert_eq!(Error::Busy.to_string(), "display is busy");
        assert_eq!(
            Error::Transport(DisplayError::BusWriteError).to_string(),
            "transport error: BusWriteError"
        );
    }
}

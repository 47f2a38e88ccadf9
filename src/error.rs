// src/error.rs

use std::fmt;
use std::io;

/// Error type shared by the channel layer, configuration and the daemon.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// A capacity that the chosen index width cannot represent.
    CapacityOutOfRange { capacity: u64, width: &'static str },
    /// No channel is registered under this id.
    UnknownChannel(String),
    /// Configuration could not be read or is invalid.
    Config(String),
    /// A sentinel outside the byte range was requested.
    InvalidSentinel(i16),
    /// Captures OS-specific error codes.
    OsError(u32),
    /// Represents any unexpected error.
    Unexpected,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::CapacityOutOfRange { capacity, width } => {
                write!(f, "Capacity {} does not fit index type {}", capacity, width)
            }
            Error::UnknownChannel(id) => write!(f, "Unknown channel '{}'", id),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::InvalidSentinel(value) => write!(f, "Sentinel {} is not a byte", value),
            Error::OsError(code) => write!(f, "OS error with code: {}", code),
            Error::Unexpected => write!(f, "Unexpected error occurred"),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::OsError(e.raw_os_error().unwrap_or(0) as u32)
    }
}

impl Error {
    /// Maps the `Error` to the status codes reported over D-Bus.
    pub fn to_status_code(&self) -> u32 {
        match self {
            Error::OsError(_) => 1,
            Error::Unexpected => 3,
            Error::UnknownChannel(_) => 4,
            Error::CapacityOutOfRange { .. } => 5,
            Error::Config(_) => 6,
            Error::InvalidSentinel(_) => 7,
        }
    }

    /// Status value returned by D-Bus methods: the negated status code.
    pub fn to_dbus_status(&self) -> i32 {
        -(self.to_status_code() as i32)
    }
}

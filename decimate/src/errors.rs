use std::error::Error;
use std::fmt::{Display, Formatter};
use std::{fmt, io};

/// The different kinds of errors the library can return.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
  /// The delta file (or a scratch window read from it) ran out before the
  /// amount of data the caller asked for was available.
  InsufficientInput,
  /// The result store file could not be parsed, or a record in it was
  /// missing one of the required fields.
  CorruptStore,
  /// The external IID battery returned output that could not be decoded
  /// into a test-name -> outcome mapping.
  BatteryProtocol,
  /// Parameters provided to a function were out of range or otherwise
  /// inconsistent (`d < 1`, `minDec > maxDec`, `setSize < 1`, ...).
  InvalidArgument,
  /// Errors are propagated from `Read`/`Write`/filesystem calls.
  Io(io::ErrorKind),
}

/// The error type used in results for all `decimate` functionality.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecimateError {
  pub kind: ErrorKind,
  pub message: String,
}

impl DecimateError {
  pub fn new<S: AsRef<str>>(kind: ErrorKind, message: S) -> Self {
    DecimateError {
      kind,
      message: message.as_ref().to_string(),
    }
  }

  pub fn insufficient_input<S: AsRef<str>>(message: S) -> Self {
    Self::new(ErrorKind::InsufficientInput, message)
  }

  pub fn corrupt_store<S: AsRef<str>>(message: S) -> Self {
    Self::new(ErrorKind::CorruptStore, message)
  }

  pub fn battery_protocol<S: AsRef<str>>(message: S) -> Self {
    Self::new(ErrorKind::BatteryProtocol, message)
  }

  pub fn invalid_argument<S: AsRef<str>>(message: S) -> Self {
    Self::new(ErrorKind::InvalidArgument, message)
  }
}

impl Display for DecimateError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "decimate {:?} error: {}", self.kind, &self.message)
  }
}

impl From<io::Error> for DecimateError {
  fn from(err: io::Error) -> Self {
    DecimateError {
      kind: ErrorKind::Io(err.kind()),
      message: format!("{}", err),
    }
  }
}

impl Error for DecimateError {}

pub type DecimateResult<T> = Result<T, DecimateError>;

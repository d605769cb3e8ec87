use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleErrorCode {
    InvalidArgument,
    NotFound,
    Internal,
    Unavailable,
}

impl ConsoleErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsoleErrorCode::InvalidArgument => "console/invalid-argument",
            ConsoleErrorCode::NotFound => "console/not-found",
            ConsoleErrorCode::Internal => "console/internal",
            ConsoleErrorCode::Unavailable => "console/unavailable",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ConsoleError {
    pub code: ConsoleErrorCode,
    message: String,
}

impl ConsoleError {
    pub fn new(code: ConsoleErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl Display for ConsoleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl Error for ConsoleError {}

pub type ConsoleResult<T> = Result<T, ConsoleError>;

pub fn invalid_argument(message: impl Into<String>) -> ConsoleError {
    ConsoleError::new(ConsoleErrorCode::InvalidArgument, message)
}

pub fn not_found(message: impl Into<String>) -> ConsoleError {
    ConsoleError::new(ConsoleErrorCode::NotFound, message)
}

pub fn internal_error(message: impl Into<String>) -> ConsoleError {
    ConsoleError::new(ConsoleErrorCode::Internal, message)
}

pub fn unavailable(message: impl Into<String>) -> ConsoleError {
    ConsoleError::new(ConsoleErrorCode::Unavailable, message)
}

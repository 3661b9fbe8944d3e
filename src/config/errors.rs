//! Configuration errors
//!
//! All configuration errors are fatal: nothing runs on a bad config.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    /// Config file could not be read
    ReadFailed,
    /// Config file is not valid JSON for the schema
    ParseFailed,
    /// Values parsed but violate a constraint
    Invalid,
}

impl ConfigErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigErrorCode::ReadFailed => "KEYGUARD_CONFIG_READ_FAILED",
            ConfigErrorCode::ParseFailed => "KEYGUARD_CONFIG_PARSE_FAILED",
            ConfigErrorCode::Invalid => "KEYGUARD_CONFIG_INVALID",
        }
    }
}

#[derive(Debug)]
pub struct ConfigError {
    code: ConfigErrorCode,
    message: String,
}

impl ConfigError {
    pub fn new(code: ConfigErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn read_failed(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorCode::ReadFailed, message)
    }

    pub fn parse_failed(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorCode::ParseFailed, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorCode::Invalid, message)
    }

    pub fn code(&self) -> ConfigErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for ConfigError {}

pub type ConfigResult<T> = Result<T, ConfigError>;

// Error types for hostcaps
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Invalid ldconfig line: {0}")]
    InvalidCacheLine(String),

    #[error("Unknown requirement: {0}")]
    InvalidRequirement(String),

    #[error("Required tool not available: {0}")]
    ToolUnavailable(String),

    #[error("Unsupported architecture: {0}")]
    UnsupportedArchitecture(String),

    #[error("No terminal emulator could be detected")]
    NoTerminal,

    #[error("Invalid cache file: {0}")]
    InvalidCache(String),

    #[error("Invalid cache offset: {0}")]
    InvalidCacheOffset(u32),

    #[error("Invalid UTF-8 in cache string")]
    InvalidCacheUtf8,
}

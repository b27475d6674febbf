use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("invalid path-glob pattern: {0}")]
    InvalidPattern(String),
    #[error("retention buffer is full, rejecting new subscriber")]
    JournalFull,
    #[error("no subscription {0}")]
    UnknownSubscription(String),
    #[error("cursor {cursor} is older than the oldest retained event (seq {oldest}); resync by scanning")]
    CursorExpired { cursor: u64, oldest: u64 },
}

pub type Result<T> = std::result::Result<T, WatchError>;

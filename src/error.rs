use std::error::Error;
use std::fmt;
use std::sync::PoisonError;

#[derive(Debug)]
pub enum RoomcastError {
    // Hub errors
    HubLock(String),

    // Room errors
    RoomNotFound(String),
    RoomFull,

    // Configuration errors
    ConfigError(String),
}

impl fmt::Display for RoomcastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HubLock(msg) => write!(f, "Hub lock error: {}", msg),
            Self::RoomNotFound(rid) => write!(f, "Room not found: {}", rid),
            Self::RoomFull => write!(f, "Room is full"),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for RoomcastError {}

// Converting from PoisonError to facilitate poisoned mutex handling
impl<T> From<PoisonError<T>> for RoomcastError {
    fn from(err: PoisonError<T>) -> Self {
        RoomcastError::HubLock(format!("Mutex poisoned: {}", err))
    }
}

// Generic result type for Roomcast
pub type Result<T> = std::result::Result<T, RoomcastError>;

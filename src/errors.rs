use std::fmt;

#[derive(Debug)]
pub enum BinocamError {
    InitializationError(String),
    PermissionDenied(String),
    AccessError(String),
    StartError(String),
    MonitorError(String),
}

impl fmt::Display for BinocamError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BinocamError::InitializationError(msg) => write!(f, "Initialization error: {}", msg),
            BinocamError::PermissionDenied(msg) => write!(f, "Permission denied error: {}", msg),
            BinocamError::AccessError(msg) => write!(f, "Device access error: {}", msg),
            BinocamError::StartError(msg) => write!(f, "Start error: {}", msg),
            BinocamError::MonitorError(msg) => write!(f, "Monitor error: {}", msg),
        }
    }
}

impl std::error::Error for BinocamError {}

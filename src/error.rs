use std::fmt;

#[derive(Debug)]
pub enum EyeGridError {
    InvalidConfiguration(String),
    Asset(String),
    Raster(String),
    Print(String),
    Io(std::io::Error),
}

impl fmt::Display for EyeGridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EyeGridError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            EyeGridError::Asset(message) => write!(f, "asset error: {}", message),
            EyeGridError::Raster(message) => write!(f, "raster error: {}", message),
            EyeGridError::Print(message) => write!(f, "print error: {}", message),
            EyeGridError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for EyeGridError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EyeGridError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EyeGridError {
    fn from(value: std::io::Error) -> Self {
        EyeGridError::Io(value)
    }
}

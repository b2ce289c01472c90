use std::path::Path;

use crate::core::MovementError;

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Parse(String),
    Movement(MovementError),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(e) => write!(f, "io error: {e}"),
            ImportError::Parse(e) => write!(f, "parse error: {e}"),
            ImportError::Movement(e) => write!(f, "movement error: {e}"),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(e) => Some(e),
            ImportError::Movement(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(e: std::io::Error) -> Self {
        ImportError::Io(e)
    }
}

impl From<MovementError> for ImportError {
    fn from(e: MovementError) -> Self {
        ImportError::Movement(e)
    }
}

/// A parser for one exported sheet format.
pub trait SheetImporter {
    type Row;

    fn parse(path: &Path) -> Result<Vec<Self::Row>, ImportError>;
}

pub mod csv;

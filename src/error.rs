use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum NNError {
    // Unrecognized enumerated option (layer kind, optimizer kind, split fraction...)
    Configuration(String),

    // Model related errors
    InvalidLayerConfiguration(String),
    ShapeMismatch(String),
    EmptyModel,

    // Metrics over zero samples
    EmptyInput,

    // Config file errors
    NotFound(String),
    Parse(String),

    IoError(std::io::Error),
    CsvError(csv::Error),
    ShapeError(ndarray::ShapeError),
}

impl fmt::Display for NNError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NNError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            NNError::InvalidLayerConfiguration(msg) => write!(f, "Invalid layer configuration: {}", msg),
            NNError::ShapeMismatch(msg) => write!(f, "Shape mismatch: {}", msg),
            NNError::EmptyModel => write!(f, "Model has no layers"),
            NNError::EmptyInput => write!(f, "Input contains no samples"),
            NNError::NotFound(path) => write!(f, "Could not find file at {}", path),
            NNError::Parse(msg) => write!(f, "Parse error: {}", msg),
            NNError::IoError(err) => write!(f, "I/O error: {}", err),
            NNError::CsvError(err) => write!(f, "CSV error: {}", err),
            NNError::ShapeError(err) => write!(f, "Shape error: {}", err),
        }
    }
}

impl From<std::io::Error> for NNError {
    fn from(err: std::io::Error) -> NNError {
        NNError::IoError(err)
    }
}

impl From<serde_json::Error> for NNError {
    fn from(err: serde_json::Error) -> NNError {
        NNError::Parse(err.to_string())
    }
}

impl From<csv::Error> for NNError {
    fn from(err: csv::Error) -> NNError {
        NNError::CsvError(err)
    }
}

impl From<ndarray::ShapeError> for NNError {
    fn from(err: ndarray::ShapeError) -> NNError {
        NNError::ShapeError(err)
    }
}

impl Error for NNError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NNError::IoError(err) => Some(err),
            NNError::CsvError(err) => Some(err),
            NNError::ShapeError(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, NNError>;

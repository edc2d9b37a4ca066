use thiserror::Error;

/// Failures loading or evaluating the ephemeris and priority data.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("TLE directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("TLE file read error: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Invalid TLE format in {file}: {message}")]
    InvalidTle { file: String, message: String },
    #[error("Propagation error: {0}")]
    Propagation(String),
    #[error("No satellites loaded")]
    NoSatellites,
    #[error("Priority table error: {0}")]
    PriorityTable(#[from] csv::Error),
    #[error("Priority table {0} has no usable rows")]
    NoPriorities(String),
}

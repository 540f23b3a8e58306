use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum EtlError {
    Io(std::io::Error),
    Csv(csv::Error),
    MissingDirectory(PathBuf),
}

impl fmt::Display for EtlError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EtlError::Io(err) => write!(f, "I/O error: {}", err),
            EtlError::Csv(err) => write!(f, "CSV error: {}", err),
            EtlError::MissingDirectory(path) => {
                write!(f, "directory does not exist: {}", path.display())
            }
        }
    }
}

impl std::error::Error for EtlError {}

impl From<std::io::Error> for EtlError {
    fn from(err: std::io::Error) -> Self {
        EtlError::Io(err)
    }
}

impl From<csv::Error> for EtlError {
    fn from(err: csv::Error) -> Self {
        EtlError::Csv(err)
    }
}

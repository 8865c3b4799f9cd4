//! Errors surfaced to the user when a spreadsheet cannot be used.

use thiserror::Error;

/// Why an upload was rejected. The active source is never changed when
/// one of these is returned.
#[derive(Error, Debug)]
pub enum UploadError {
    /// The file decoded but no row held a usable age.
    #[error("no valid ages found in column D (expected whole numbers from 1 to 150)")]
    NoValidData,

    /// The file could not be read or parsed as a spreadsheet.
    #[error("could not read the file as a spreadsheet: {0}")]
    Decode(String),
}

impl From<std::io::Error> for UploadError {
    fn from(err: std::io::Error) -> Self {
        UploadError::Decode(err.to_string())
    }
}

impl From<calamine::Error> for UploadError {
    fn from(err: calamine::Error) -> Self {
        UploadError::Decode(err.to_string())
    }
}

impl From<csv::Error> for UploadError {
    fn from(err: csv::Error) -> Self {
        UploadError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = UploadError::Decode("zip header missing".to_string());
        assert!(err.to_string().contains("zip header missing"));
        assert!(UploadError::NoValidData.to_string().contains("1 to 150"));
    }

    #[test]
    fn test_io_error_maps_to_decode() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(UploadError::from(io), UploadError::Decode(_)));
    }
}

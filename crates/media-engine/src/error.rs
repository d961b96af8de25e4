use earshot_core::AppError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Output error: {0}")]
    OutputError(String),

    #[error("Resample error: {0}")]
    ResampleError(String),

    #[error("Seek error: {0}")]
    SeekError(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Maps a failure while opening `path` onto the load error taxonomy
    pub fn into_load_error(self, path: &std::path::Path) -> AppError {
        let file = path.to_path_buf();
        match self {
            EngineError::FileNotFound(_) => AppError::FileNotFound { path: file },
            EngineError::UnsupportedFormat(format) => AppError::UnsupportedFormat { format, file },
            EngineError::DecodeError(reason) | EngineError::SeekError(reason) => {
                AppError::CorruptedAudioFile { file, reason }
            }
            other => AppError::from(other),
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::FileNotFound(path) => AppError::FileNotFound { path },
            EngineError::UnsupportedFormat(format) => AppError::UnsupportedFormat {
                format,
                file: PathBuf::new(),
            },
            EngineError::DecodeError(message)
            | EngineError::SeekError(message)
            | EngineError::ResampleError(message) => {
                AppError::AudioDecodeError {
                    message,
                    source: None,
                }
            }
            EngineError::OutputError(message) => AppError::PlaybackDeviceError { message },
            EngineError::InvalidState(message) => AppError::InternalError { message },
            EngineError::IoError(e) => AppError::from(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use earshot_core::ErrorCategory;
    use std::path::Path;

    #[test]
    fn test_load_errors_are_load_category() {
        let path = Path::new("/books/broken.mp3");
        for err in [
            EngineError::FileNotFound(path.to_path_buf()),
            EngineError::UnsupportedFormat("xyz".to_string()),
            EngineError::DecodeError("bad header".to_string()),
        ] {
            assert_eq!(err.into_load_error(path).category(), ErrorCategory::Load);
        }
    }

    #[test]
    fn test_output_error_maps_to_device_error() {
        let err: AppError = EngineError::OutputError("no device".to_string()).into();
        assert!(matches!(err, AppError::PlaybackDeviceError { .. }));
        assert_eq!(err.category(), ErrorCategory::Decode);
    }

    #[test]
    fn test_error_display() {
        let err = EngineError::FileNotFound(PathBuf::from("/tmp/a.mp3"));
        assert_eq!(err.to_string(), "File not found: /tmp/a.mp3");
    }
}

//! Error types for configuration operations.

use std::path::PathBuf;
use thiserror::Error;

use cgstream_registry::LoadError;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create directory
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Path of the directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Failed to parse or serialize JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A text graph file is not valid UTF-8
    #[error("graph file is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// File extension does not name a graph encoding
    #[error("unsupported graph file '{0}' (expected .toml, .json or .bin)")]
    UnknownFormat(PathBuf),

    /// Graph decoding or instantiation failed
    #[error("graph error: {0}")]
    Graph(#[from] LoadError),

    /// Validation errors
    #[error("validation failed: {0}")]
    Validation(#[from] crate::validation::ValidationError),
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create a create directory error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::CreateDir {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;
    use std::error::Error;
    use std::path::Path;

    fn mock_io_err() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::NotFound, "mock")
    }

    #[test]
    fn factories_produce_correct_variants() {
        let err = ConfigError::read_file("/some/path", mock_io_err());
        assert!(matches!(err, ConfigError::ReadFile { ref path, .. } if path == Path::new("/some/path")));

        let err = ConfigError::write_file("/out/path", mock_io_err());
        assert!(matches!(err, ConfigError::WriteFile { ref path, .. } if path == Path::new("/out/path")));

        let err = ConfigError::create_dir("/dir/path", mock_io_err());
        assert!(matches!(err, ConfigError::CreateDir { ref path, .. } if path == Path::new("/dir/path")));
    }

    #[test]
    fn io_display_names_the_path() {
        let msg = ConfigError::read_file("/a/b.toml", mock_io_err()).to_string();
        assert!(msg.contains("failed to read file"), "got: {msg}");
        assert!(msg.contains("/a/b.toml"), "got: {msg}");

        let msg = ConfigError::create_dir("/a/b", mock_io_err()).to_string();
        assert!(msg.contains("failed to create directory"), "got: {msg}");
    }

    #[test]
    fn io_variants_expose_source() {
        assert!(ConfigError::read_file("/x", mock_io_err()).source().is_some());
        assert!(ConfigError::write_file("/x", mock_io_err()).source().is_some());
        assert!(ConfigError::create_dir("/x", mock_io_err()).source().is_some());
    }

    #[test]
    fn unknown_format_display() {
        let err = ConfigError::UnknownFormat("graph.yaml".into());
        assert_eq!(
            err.to_string(),
            "unsupported graph file 'graph.yaml' (expected .toml, .json or .bin)"
        );
        assert!(err.source().is_none());
    }

    #[test]
    fn wrapped_errors_keep_their_message() {
        let err: ConfigError = LoadError::UnknownFifo(4).into();
        assert_eq!(err.to_string(), "graph error: unknown FIFO 4");

        let err: ConfigError = ValidationError::EmptySchedule.into();
        assert_eq!(err.to_string(), "validation failed: schedule is empty");
    }
}

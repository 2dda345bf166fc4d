//! Graph description files.
//!
//! The encoding follows the file extension: `.toml`, `.json`, or `.bin`
//! for the compact binary form.

use std::path::Path;

use cgstream_registry::GraphDescription;

use crate::error::ConfigError;

/// Encoding of a graph description file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    /// Human-edited TOML.
    Toml,
    /// JSON, as produced by graph generators.
    Json,
    /// Compact binary form.
    Binary,
}

impl GraphFormat {
    /// Picks the format from the extension of `path`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            "bin" => Some(Self::Binary),
            _ => None,
        }
    }

    /// Decodes a description from file contents.
    pub fn decode(self, bytes: &[u8]) -> Result<GraphDescription, ConfigError> {
        let desc = match self {
            Self::Toml => GraphDescription::from_toml(utf8(bytes)?)?,
            Self::Json => GraphDescription::from_json(utf8(bytes)?)?,
            Self::Binary => GraphDescription::from_bytes(bytes)?,
        };
        Ok(desc)
    }

    /// Encodes a description to file contents.
    pub fn encode(self, desc: &GraphDescription) -> Result<Vec<u8>, ConfigError> {
        let bytes = match self {
            Self::Toml => desc.to_toml()?.into_bytes(),
            Self::Json => desc.to_json()?.into_bytes(),
            Self::Binary => desc.to_bytes()?,
        };
        Ok(bytes)
    }
}

fn utf8(bytes: &[u8]) -> Result<&str, ConfigError> {
    Ok(std::str::from_utf8(bytes)?)
}

/// Load a graph description, choosing the decoder from the extension.
pub fn load_graph(path: impl AsRef<Path>) -> Result<GraphDescription, ConfigError> {
    let path = path.as_ref();
    let format = GraphFormat::from_path(path).ok_or_else(|| ConfigError::UnknownFormat(path.to_path_buf()))?;
    let bytes = std::fs::read(path).map_err(|e| ConfigError::read_file(path, e))?;
    let desc = format.decode(&bytes)?;
    tracing::debug!(
        path = %path.display(),
        ?format,
        nodes = desc.nodes.len(),
        fifos = desc.fifos.len(),
        "graph description loaded"
    );
    Ok(desc)
}

/// Save a graph description, choosing the encoder from the extension.
pub fn save_graph(desc: &GraphDescription, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let format = GraphFormat::from_path(path).ok_or_else(|| ConfigError::UnknownFormat(path.to_path_buf()))?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
    }

    let bytes = format.encode(desc)?;
    std::fs::write(path, bytes).map_err(|e| ConfigError::write_file(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(GraphFormat::from_path(Path::new("a/g.toml")), Some(GraphFormat::Toml));
        assert_eq!(GraphFormat::from_path(Path::new("g.JSON")), Some(GraphFormat::Json));
        assert_eq!(GraphFormat::from_path(Path::new("g.bin")), Some(GraphFormat::Binary));
        assert_eq!(GraphFormat::from_path(Path::new("g.yaml")), None);
        assert_eq!(GraphFormat::from_path(Path::new("graph")), None);
    }

    #[test]
    fn test_unknown_extension_is_rejected_before_reading() {
        let err = load_graph("does/not/exist.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFormat(ref p) if p == &PathBuf::from("does/not/exist.yaml")));
    }

    #[test]
    fn test_missing_file() {
        let err = load_graph("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_utf8_in_text_format() {
        let err = GraphFormat::Json.decode(&[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, ConfigError::Utf8(_)));
    }

    #[test]
    fn test_decode_errors_are_graph_errors() {
        let err = GraphFormat::Toml.decode(b"schedule = \"nope\"").unwrap_err();
        assert!(matches!(err, ConfigError::Graph(_)));
    }
}

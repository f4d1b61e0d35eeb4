use std::path::Path;

use crate::error::ContentError;

/// Turns an opaque content_ref into publishable text.
///
/// Parsing and formatting of the content is someone else's job; the store
/// and engine only ever pass the reference through.
pub trait ContentSource: Send + Sync {
    fn resolve(&self, content_ref: &str) -> Result<String, ContentError>;
}

/// Reads the content_ref as a path on the local filesystem.
pub struct FileContentSource;

impl ContentSource for FileContentSource {
    fn resolve(&self, content_ref: &str) -> Result<String, ContentError> {
        let path = Path::new(content_ref);
        if !path.exists() {
            return Err(ContentError::NotFound(content_ref.to_string()));
        }
        std::fs::read_to_string(path).map_err(|e| ContentError::Io {
            path: content_ref.to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn resolves_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("post.md");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "hello from disk").unwrap();

        let content = FileContentSource
            .resolve(path.to_str().unwrap())
            .unwrap();
        assert!(content.contains("hello from disk"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let result = FileContentSource.resolve("/nonexistent/post.md");
        assert!(matches!(result, Err(ContentError::NotFound(_))));
    }
}

//! File acquisition for the upload screen.
//!
//! Terminals deliver drag-and-drop as a bracketed paste of the file path,
//! so typed, pasted and dropped files all go through [`parse_dropped_path`].

use std::path::{Path, PathBuf};

use image::ImageFormat;
use url::Url;

const FALLBACK_MIME: &str = "application/octet-stream";

/// A local file the user picked for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct PickedFile {
    pub path: PathBuf,
    pub name: String,
    pub mime: String,
    pub dimensions: Option<(u32, u32)>,
}

impl PickedFile {
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());

        Self {
            path: path.to_path_buf(),
            name,
            mime: mime_for_path(path),
            dimensions: None,
        }
    }

    /// Like [`PickedFile::from_path`], also probing the image dimensions.
    pub fn open(path: &Path) -> Self {
        let mut file = Self::from_path(path);
        if file.is_image() {
            file.dimensions = probe_dimensions(path);
        }
        file
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// MIME type by file extension, as a browser would report it.
pub fn mime_for_path(path: &Path) -> String {
    ImageFormat::from_path(path)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| FALLBACK_MIME.to_string())
}

/// Normalize a typed, pasted or dropped path.
pub fn parse_dropped_path(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
        .unwrap_or(trimmed);

    if unquoted.is_empty() {
        return None;
    }

    if unquoted.starts_with("file://") {
        return Url::parse(unquoted).ok()?.to_file_path().ok();
    }

    Some(PathBuf::from(unquoted.replace("\\ ", " ")))
}

/// Pixel dimensions of a local image, if it can be probed.
pub fn probe_dimensions(path: &Path) -> Option<(u32, u32)> {
    image::image_dimensions(path).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_by_extension() {
        assert_eq!(mime_for_path(Path::new("a.png")), "image/png");
        assert_eq!(mime_for_path(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("notes.txt")), FALLBACK_MIME);
        assert_eq!(mime_for_path(Path::new("no_extension")), FALLBACK_MIME);
    }

    #[test]
    fn test_picked_file() {
        let file = PickedFile::from_path(Path::new("/tmp/photos/cat.webp"));
        assert_eq!(file.name, "cat.webp");
        assert!(file.is_image());

        let doc = PickedFile::from_path(Path::new("/tmp/report.pdf"));
        assert!(!doc.is_image());
    }

    #[test]
    fn test_parse_dropped_path() {
        assert_eq!(parse_dropped_path("  "), None);
        assert_eq!(parse_dropped_path("''"), None);
        assert_eq!(
            parse_dropped_path("'/home/me/My Photos/a.png'"),
            Some(PathBuf::from("/home/me/My Photos/a.png"))
        );
        assert_eq!(
            parse_dropped_path("\"/tmp/b.png\"\n"),
            Some(PathBuf::from("/tmp/b.png"))
        );
        assert_eq!(
            parse_dropped_path("/home/me/My\\ Photos/a.png"),
            Some(PathBuf::from("/home/me/My Photos/a.png"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_parse_file_url() {
        assert_eq!(
            parse_dropped_path("file:///tmp/My%20Photos/a.png"),
            Some(PathBuf::from("/tmp/My Photos/a.png"))
        );
    }

    #[test]
    fn test_probe_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        image::RgbImage::new(3, 2).save(&path).unwrap();
        assert_eq!(probe_dimensions(&path), Some((3, 2)));
        assert_eq!(PickedFile::open(&path).dimensions, Some((3, 2)));

        let bogus = dir.path().join("bogus.png");
        std::fs::write(&bogus, b"not a png").unwrap();
        assert_eq!(probe_dimensions(&bogus), None);
    }
}

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use url::Url;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Which kinds of image reference the vision tool accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageInput {
    /// Pass URLs and data URIs through, encode local files
    #[default]
    Auto,
    /// http(s) URLs only
    Url,
    /// `data:image/...` URIs only
    DataUri,
    /// Local paths or `file://` URLs only, always encoded
    LocalFile,
}

impl fmt::Display for ImageInput {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Url => "url",
            Self::DataUri => "data_uri",
            Self::LocalFile => "local_file",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("'{0}' is neither a URL nor an existing local file")]
    Unrecognized(String),

    #[error("image input mode '{mode}' does not accept '{reference}'")]
    NotAccepted {
        mode: ImageInput,
        reference: String,
    },

    #[error("Failed to read image {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

enum ImageRef<'a> {
    Remote(&'a str),
    DataUri(&'a str),
    Local(PathBuf),
}

fn classify(reference: &str) -> Option<ImageRef<'_>> {
    if reference.starts_with("data:image") {
        return Some(ImageRef::DataUri(reference));
    }

    if let Ok(url) = Url::parse(reference) {
        match url.scheme() {
            "http" | "https" => return Some(ImageRef::Remote(reference)),
            "file" => return url.to_file_path().ok().map(ImageRef::Local),
            _ => {}
        }
    }

    let path = Path::new(reference);
    path.exists().then(|| ImageRef::Local(path.to_path_buf()))
}

/// Turn a user-supplied image reference into something the vision API
/// accepts: an http(s) URL or a base64 data URI
#[inline]
pub fn resolve(mode: ImageInput, reference: &str) -> Result<String, ImageError> {
    let not_accepted = || ImageError::NotAccepted {
        mode,
        reference: reference.to_string(),
    };

    match (mode, classify(reference)) {
        (ImageInput::Auto | ImageInput::Url, Some(ImageRef::Remote(url))) => Ok(url.to_string()),
        (ImageInput::Auto | ImageInput::DataUri, Some(ImageRef::DataUri(uri))) => {
            Ok(uri.to_string())
        }
        (ImageInput::Auto | ImageInput::LocalFile, Some(ImageRef::Local(path))) => {
            encode_file(&path)
        }
        (ImageInput::LocalFile, None) => encode_file(Path::new(reference)),
        (ImageInput::Auto, None) => Err(ImageError::Unrecognized(reference.to_string())),
        _ => Err(not_accepted()),
    }
}

/// Read a local file into a `data:<mime>;base64,...` URI
#[inline]
pub fn encode_file(path: &Path) -> Result<String, ImageError> {
    let bytes = fs::read(path).map_err(|source| ImageError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mime = guess_mime(path);
    debug!(
        "Encoding {} ({} bytes) as {}",
        path.display(),
        bytes.len(),
        mime
    );
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

#[inline]
pub fn guess_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg" | "jpe") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("tif" | "tiff") => "image/tiff",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/vnd.microsoft.icon",
        Some("heic") => "image/heic",
        _ => FALLBACK_MIME,
    }
}

//! Where GIF bytes come from.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

pub const GIF_CONTENT_TYPE: &str = "image/gif";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn ok(content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type.into()),
            body,
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            content_type: None,
            body: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the content type names a GIF, ignoring parameters and case.
    pub fn is_gif(&self) -> bool {
        self.content_type
            .as_deref()
            .and_then(|content_type| content_type.split(';').next())
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(GIF_CONTENT_TYPE))
    }
}

/// Resolves a URL to its bytes. An `Err` means the request itself failed; a missing
/// resource is an `Ok` response with a non-OK status.
pub trait Fetch {
    fn fetch(&self, url: &str) -> impl Future<Output = io::Result<Response>> + Send;
}

/// Serves `file://` URLs and plain paths from disk.
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    root: Option<PathBuf>,
}

impl FileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `root` instead of the working directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl Fetch for FileFetcher {
    async fn fetch(&self, url: &str) -> io::Result<Response> {
        let path = self.resolve(url);
        debug!("fetching {}", path.display());

        match tokio::fs::read(&path).await {
            Ok(body) => Ok(Response::ok(content_type_for(&path), body)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Response::not_found()),
            Err(err) => Err(err),
        }
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("gif") => GIF_CONTENT_TYPE,
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

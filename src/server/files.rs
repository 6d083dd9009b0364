//! Static file responses for the responder's file mode.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use std::path::{Component, Path, PathBuf};
use tracing::trace;

/// Serve `request_path` relative to `root`.
///
/// Directories render as a minimal listing, files are returned whole with a
/// content type guessed from the extension. Anything else, including paths
/// that try to escape the root, is a 404.
pub(super) async fn serve(root: &Path, request_path: &str) -> Response<Full<Bytes>> {
    let Some(target) = resolve(root, request_path) else {
        return not_found();
    };

    match tokio::fs::metadata(&target).await {
        Ok(meta) if meta.is_dir() => match directory_listing(&target, request_path).await {
            Ok(html) => response(StatusCode::OK, "text/html; charset=utf-8", html.into()),
            Err(err) => {
                trace!("Failed to list {}: {}", target.display(), err);
                not_found()
            }
        },
        Ok(_) => match tokio::fs::read(&target).await {
            Ok(contents) => response(StatusCode::OK, content_type(&target), contents.into()),
            Err(err) => {
                trace!("Failed to read {}: {}", target.display(), err);
                not_found()
            }
        },
        Err(_) => not_found(),
    }
}

/// Map a request path onto the served root, rejecting escapes.
fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = request_path.trim_start_matches('/');
    let mut target = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => target.push(part),
            Component::CurDir => {}
            // ".." and anything absolute would leave the root.
            _ => return None,
        }
    }
    Some(target)
}

async fn directory_listing(dir: &Path, request_path: &str) -> std::io::Result<String> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().await?.is_dir() {
            name.push('/');
        }
        names.push(name);
    }
    names.sort();

    let prefix = if request_path.ends_with('/') {
        String::new()
    } else {
        let last = request_path.rsplit('/').next().unwrap_or("");
        if last.is_empty() {
            String::new()
        } else {
            format!("{last}/")
        }
    };

    let mut html = String::from("<pre>\n");
    for name in names {
        html.push_str(&format!("<a href=\"{prefix}{name}\">{name}</a>\n"));
    }
    html.push_str("</pre>\n");
    Ok(html)
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("txt") | Some("md") => "text/plain; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}

fn response(status: StatusCode, content_type: &str, body: Bytes) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", content_type)
        .body(Full::new(body))
        .unwrap()
}

fn not_found() -> Response<Full<Bytes>> {
    response(
        StatusCode::NOT_FOUND,
        "text/plain; charset=utf-8",
        Bytes::from_static(b"404 page not found"),
    )
}

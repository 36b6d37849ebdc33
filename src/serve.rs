//! Development server.
//!
//! A lightweight static file server over `_output/`, built on `tiny_http`:
//!
//! - Static file serving with MIME type guessing
//! - Automatic `index.html` resolution for directories
//! - Redirect of directory URLs missing their trailing slash
//! - Directory listing when a directory has no index
//! - Graceful shutdown on Ctrl+C
//!
//! The output root is passed in explicitly; the process working directory is
//! never changed, so the server can run next to a rebuilding watch loop.

use crate::{config::SiteConfig, log, route::INDEX_FILE, shutdown::Shutdown};
use anyhow::{Context, Result, anyhow};
use quick_xml::escape::escape;
use std::{
    fs,
    io::Cursor,
    net::{IpAddr, SocketAddr},
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

// ============================================================================
// Server Entry Point
// ============================================================================

/// Serve the output directory until `shutdown` is triggered.
///
/// Binds to the configured interface and port, moving to the next port
/// (up to [`MAX_PORT_RETRIES`] attempts) when one is taken.
pub fn serve_site(config: &SiteConfig, shutdown: &Shutdown) -> Result<()> {
    let interface: IpAddr = config
        .serve
        .interface
        .parse()
        .with_context(|| format!("Invalid interface `{}`", config.serve.interface))?;

    let (server, addr) = try_bind_port(interface, config.serve.port, MAX_PORT_RETRIES)?;
    let server = Arc::new(server);

    let server_for_signal = Arc::clone(&server);
    shutdown.on_trigger(move || server_for_signal.unblock());

    log!("serve"; "http://{}", addr);

    let root = &config.paths.output;
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, root) {
            log!("serve"; "request error: {e:#}");
        }
    }

    Ok(())
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        max_retries,
        base_port,
        base_port.saturating_add(max_retries.saturating_sub(1)),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

// ============================================================================
// Request Resolution
// ============================================================================

/// What a request URL maps to under the serve root.
#[derive(Debug, PartialEq, Eq)]
enum Target {
    File(PathBuf),
    /// Directory requested without trailing slash; value is the new location.
    Redirect(String),
    /// Directory without an index file.
    Listing { dir: PathBuf, url: String },
    Forbidden,
    NotFound,
}

/// Resolve a raw request URL against `root`.
///
/// Resolution order:
/// 1. Exact file match → serve file
/// 2. Directory without trailing slash → redirect
/// 3. Directory with index.html → serve index.html
/// 4. Directory without index.html → generate listing
/// 5. Nothing found → 404
fn resolve(root: &Path, raw_url: &str) -> Target {
    // Strip query string and fragment before decoding, so an encoded `?`
    // stays part of the path.
    let path_part = raw_url.split(['?', '#']).next().unwrap_or_default();
    let query = &raw_url[path_part.len()..];

    let Ok(decoded) = urlencoding::decode(path_part) else {
        return Target::NotFound;
    };

    let rel = Path::new(decoded.trim_start_matches('/'));
    let mut local = root.to_path_buf();
    for component in rel.components() {
        match component {
            Component::Normal(part) => local.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Target::Forbidden;
            }
        }
    }

    if local.is_file() {
        return Target::File(local);
    }

    if local.is_dir() {
        if !decoded.ends_with('/') {
            return Target::Redirect(format!("{path_part}/{query}"));
        }

        let index = local.join(INDEX_FILE);
        if index.is_file() {
            return Target::File(index);
        }

        return Target::Listing {
            dir: local,
            url: decoded.into_owned(),
        };
    }

    Target::NotFound
}

// ============================================================================
// Request Handling
// ============================================================================

/// Handle a single HTTP request.
fn handle_request(request: Request, root: &Path) -> Result<()> {
    match resolve(root, request.url()) {
        Target::File(path) => serve_file(request, &path),
        Target::Redirect(location) => serve_redirect(request, &location),
        Target::Listing { dir, url } => match generate_directory_listing(&dir, &url) {
            Ok(listing) => serve_html(request, listing),
            Err(_) => serve_status(request, 404, "404 Not Found"),
        },
        Target::Forbidden => serve_status(request, 403, "403 Forbidden"),
        Target::NotFound => serve_status(request, 404, "404 Not Found"),
    }
}

fn header(name: &str, value: &str) -> Result<Header> {
    Header::from_bytes(name, value).map_err(|()| anyhow!("Invalid header {name}: {value}"))
}

/// Serve a file with appropriate content type.
fn serve_file(request: Request, path: &Path) -> Result<()> {
    let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let response =
        Response::from_data(content).with_header(header("Content-Type", guess_content_type(path))?);

    request.respond(response)?;
    Ok(())
}

/// Serve HTML content.
fn serve_html(request: Request, content: String) -> Result<()> {
    let response = Response::from_string(content)
        .with_header(header("Content-Type", "text/html; charset=utf-8")?);
    request.respond(response)?;
    Ok(())
}

fn serve_redirect(request: Request, location: &str) -> Result<()> {
    let response = Response::empty(StatusCode(301)).with_header(header("Location", location)?);
    request.respond(response)?;
    Ok(())
}

/// Serve a plain-text status response (403, 404).
fn serve_status(request: Request, code: u16, body: &'static str) -> Result<()> {
    let response = Response::new(
        StatusCode(code),
        vec![header("Content-Type", "text/plain; charset=utf-8")?],
        Cursor::new(body),
        Some(body.len()),
        None,
    );
    request.respond(response)?;
    Ok(())
}

// ============================================================================
// Content Type Detection
// ============================================================================

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        // Web content
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",
        Some("txt") => "text/plain; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",

        // Images
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",

        // Media & documents
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("pdf") => "application/pdf",
        Some("wasm") => "application/wasm",

        // Default binary
        _ => "application/octet-stream",
    }
}

// ============================================================================
// Directory Listing
// ============================================================================

/// Generate an HTML listing of `dir`, served at `url` (ends with `/`).
///
/// Hidden entries are skipped; directories sort first and get a trailing `/`.
fn generate_directory_listing(dir: &Path, url: &str) -> std::io::Result<String> {
    let mut entries: Vec<(bool, String)> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                return None;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            Some((is_dir, name))
        })
        .collect();
    entries.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    let title = escape(url);
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Index of {title}</title>\n</head>\n<body>\n\
         <h1>Index of {title}</h1>\n<ul>\n"
    );

    if url != "/" {
        html.push_str("<li><a href=\"../\">../</a></li>\n");
    }
    for (is_dir, name) in &entries {
        let suffix = if *is_dir { "/" } else { "" };
        html.push_str(&format!(
            "<li><a href=\"{}{suffix}\">{}{suffix}</a></li>\n",
            urlencoding::encode(name),
            escape(name.as_str())
        ));
    }

    html.push_str("</ul>\n</body>\n</html>\n");
    Ok(html)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn output(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (rel, text) in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        }
        dir
    }

    #[test]
    fn test_resolve_file_and_index() {
        let dir = output(&[("index.html", "home"), ("blog/post1/index.html", "post")]);
        let root = dir.path();

        assert_eq!(resolve(root, "/"), Target::File(root.join("index.html")));
        assert_eq!(resolve(root, "/index.html"), Target::File(root.join("index.html")));
        assert_eq!(
            resolve(root, "/blog/post1/"),
            Target::File(root.join("blog/post1/index.html"))
        );
    }

    #[test]
    fn test_resolve_strips_query_and_decodes() {
        let dir = output(&[("assets/my font.woff2", "")]);
        let root = dir.path();

        assert_eq!(
            resolve(root, "/assets/my%20font.woff2?t=123"),
            Target::File(root.join("assets/my font.woff2"))
        );
    }

    #[test]
    fn test_resolve_redirects_directory_without_slash() {
        let dir = output(&[("blog/post1/index.html", "post")]);

        assert_eq!(
            resolve(dir.path(), "/blog/post1"),
            Target::Redirect("/blog/post1/".into())
        );
        assert_eq!(
            resolve(dir.path(), "/blog/post1?x=1"),
            Target::Redirect("/blog/post1/?x=1".into())
        );
    }

    #[test]
    fn test_resolve_listing_and_not_found() {
        let dir = output(&[("docs/a.pdf", "")]);
        let root = dir.path();

        assert_eq!(
            resolve(root, "/docs/"),
            Target::Listing {
                dir: root.join("docs"),
                url: "/docs/".into()
            }
        );
        assert_eq!(resolve(root, "/missing.html"), Target::NotFound);
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let dir = output(&[("site/index.html", "x"), ("secret.txt", "s")]);
        let root = dir.path().join("site");

        assert_eq!(resolve(&root, "/../secret.txt"), Target::Forbidden);
        assert_eq!(resolve(&root, "/%2e%2e/secret.txt"), Target::Forbidden);
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type(Path::new("a.html")), "text/html; charset=utf-8");
        assert_eq!(guess_content_type(Path::new("a.CSS")), "text/css; charset=utf-8");
        assert_eq!(guess_content_type(Path::new("sitemap.xml")), "application/xml; charset=utf-8");
        assert_eq!(guess_content_type(Path::new("a.png")), "image/png");
        assert_eq!(guess_content_type(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn test_directory_listing() {
        let dir = output(&[("b.txt", ""), ("a&b.html", ""), ("sub/x.html", ""), (".hidden", "")]);

        let html = generate_directory_listing(dir.path(), "/files/").unwrap();

        assert!(html.contains("<title>Index of /files/</title>"));
        assert!(html.contains("<a href=\"../\">../</a>"));
        assert!(html.contains("<a href=\"sub/\">sub/</a>"));
        assert!(html.contains("<a href=\"a%26b.html\">a&amp;b.html</a>"));
        assert!(!html.contains(".hidden"));

        let sub = html.find("sub/").unwrap();
        let a = html.find("a&amp;b.html").unwrap();
        let b = html.find("b.txt").unwrap();
        assert!(sub < a && a < b);
    }

    #[test]
    fn test_root_listing_has_no_parent_link() {
        let dir = output(&[("a.html", "")]);
        let html = generate_directory_listing(dir.path(), "/").unwrap();
        assert!(!html.contains("../"));
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
use anyhow::{Context, bail};
#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;
#[cfg(not(target_arch = "wasm32"))]
use std::fs::File;
#[cfg(not(target_arch = "wasm32"))]
use std::io::Cursor;
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};
#[cfg(not(target_arch = "wasm32"))]
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Serves the browser bundle (page, glue JS and the wasm module) for local play.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser, Debug)]
struct Opts {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,
    /// Directory holding index.html and the wasm-pack output
    #[arg(long, default_value = "web")]
    root: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    if !opts.root.is_dir() {
        bail!("web directory not found at {}", opts.root.display());
    }
    let root = opts
        .root
        .canonicalize()
        .with_context(|| format!("resolving {}", opts.root.display()))?;

    let server = Server::http(&opts.listen)
        .map_err(|e| anyhow::anyhow!("binding {}: {e}", opts.listen))?;
    println!("Serving {} on http://{}", root.display(), opts.listen);

    for request in server.incoming_requests() {
        let line = format!("{} {}", request.method(), request.url());
        match respond(&root, request) {
            Ok(status) => println!("{line} -> {}", status.0),
            Err(e) => eprintln!("{line} failed: {e:?}"),
        }
    }
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn respond(root: &Path, request: Request) -> anyhow::Result<StatusCode> {
    let url = request.url().split('?').next().unwrap_or("/").to_string();
    let Some(path) = resolve(root, &url) else {
        request.respond(not_found())?;
        return Ok(StatusCode(404));
    };
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(_) => {
            request.respond(not_found())?;
            return Ok(StatusCode(404));
        }
    };
    let mut response = Response::from_file(file);
    for (name, value) in [
        ("Content-Type", content_type_for(&path)),
        // the module is rebuilt often during development
        ("Cache-Control", "no-cache"),
    ] {
        if let Ok(header) = Header::from_bytes(name, value) {
            response.add_header(header);
        }
    }
    request.respond(response)?;
    Ok(StatusCode(200))
}

/// Maps a request path under `root`, refusing anything that escapes it.
#[cfg(not(target_arch = "wasm32"))]
fn resolve(root: &Path, url: &str) -> Option<PathBuf> {
    let rel = url.trim_start_matches('/');
    let mut path = root.join(if rel.is_empty() { "index.html" } else { rel });
    if path.is_dir() {
        path.push("index.html");
    }
    let path = path.canonicalize().ok()?;
    (path.is_file() && path.starts_with(root)).then_some(path)
}

#[cfg(not(target_arch = "wasm32"))]
fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "html" => "text/html; charset=utf-8",
        "js" | "mjs" => "application/javascript",
        "css" => "text/css",
        "wasm" => "application/wasm",
        "json" => "application/json",
        "ts" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn not_found() -> Response<Cursor<Vec<u8>>> {
    Response::from_string("Not Found").with_status_code(StatusCode(404))
}

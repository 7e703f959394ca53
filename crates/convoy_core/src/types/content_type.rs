use std::path::Path;

pub const JAVASCRIPT: &str = "application/javascript";
pub const CSS: &str = "text/css";
pub const BINARY: &str = "application/octet-stream";

/// Content type served for a copied file, chosen by extension
pub fn content_type_for(path: &Path) -> &'static str {
  let Some(extension) = path.extension() else {
    return BINARY;
  };

  match extension.to_string_lossy().to_ascii_lowercase().as_str() {
    "js" | "mjs" => JAVASCRIPT,
    "css" => CSS,
    "html" | "htm" => "text/html",
    "json" => "application/json",
    "txt" => "text/plain",
    "xml" => "application/xml",
    "svg" => "image/svg+xml",
    "png" => "image/png",
    "jpg" | "jpeg" => "image/jpeg",
    "gif" => "image/gif",
    "ico" => "image/x-icon",
    "webp" => "image/webp",
    "woff" => "font/woff",
    "woff2" => "font/woff2",
    "ttf" => "font/ttf",
    _ => BINARY,
  }
}

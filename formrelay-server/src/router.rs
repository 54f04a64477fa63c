//! Path classification for GET requests.
//!
//! `route` only looks at the request path. Whether a file actually exists is
//! decided when it is read, so a missing file still ends up as a 404.

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Index,
    Message,
    NotFound,
}

impl Page {
    pub fn file_name(self) -> &'static str {
        match self {
            Page::Index => "index.html",
            Page::Message => "message.html",
            Page::NotFound => "404.html",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Page(Page),
    /// Candidate file, relative to the served root.
    File(PathBuf),
    NotFound,
}

pub fn route(path: &str) -> Route {
    match path {
        "/" => Route::Page(Page::Index),
        "/message" => Route::Page(Page::Message),
        _ => match relative_file(path) {
            Some(file) => Route::File(file),
            None => Route::NotFound,
        },
    }
}

/// Decoded path below the served root, or `None` if it would leave it.
fn relative_file(path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(path.trim_start_matches('/')).decode_utf8().ok()?;
    if decoded.is_empty() || decoded.contains('\0') {
        return None;
    }

    let candidate = Path::new(&*decoded);
    candidate
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
        .then(|| candidate.to_path_buf())
}

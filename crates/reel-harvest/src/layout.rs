//! On-disk layout and URL helpers.
//!
//! ```text
//! <root>/index.html
//! <root>/<creator>/index.html
//! <root>/<creator>/<work>/index.html
//! <root>/<creator>/<work>/<media-filename>
//! ```

use crate::types::Work;
use std::path::{Path, PathBuf};

/// Linux NAME_MAX.
const NAME_MAX: usize = 255;

/// Name of the archived page inside each directory.
pub const ARCHIVE_FILE: &str = "index.html";

/// Turn a display name into a single safe path component.
///
/// Separators, control characters and whitespace become `_`, runs of `_`
/// collapse, leading/trailing dots and underscores are trimmed.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let c = if c == '/' || c == '\\' || c.is_control() || c.is_whitespace() {
            '_'
        } else {
            c
        };
        if c == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        return "untitled".to_string();
    }
    truncate_to_boundary(trimmed, NAME_MAX).to_string()
}

fn truncate_to_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut take = max;
    while take > 0 && !s.is_char_boundary(take) {
        take -= 1;
    }
    &s[..take]
}

/// Last non-empty path segment of a URL, ignoring query and fragment.
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()?
        .to_string();
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment)
}

pub fn creator_dir(root: &Path, creator_slug: &str) -> PathBuf {
    root.join(creator_slug)
}

pub fn work_dir(root: &Path, work: &Work) -> PathBuf {
    root.join(work.creator().slug()).join(work.slug())
}

/// `<root>/<creator>/<work>/<basename of the media URL path>`.
///
/// Falls back to the work slug when the URL has no usable basename.
pub fn media_destination(root: &Path, work: &Work, media_url: &str) -> PathBuf {
    let filename = filename_from_url(media_url)
        .map(|f| slugify(&f))
        .unwrap_or_else(|| work.slug());
    work_dir(root, work).join(filename)
}

/// `<root>/[creator/][work/]index.html`.
pub fn archive_path(root: &Path, creator_slug: Option<&str>, work_slug: Option<&str>) -> PathBuf {
    let mut path = root.to_path_buf();
    if let Some(c) = creator_slug {
        path.push(c);
    }
    if let Some(w) = work_slug {
        path.push(w);
    }
    path.join(ARCHIVE_FILE)
}

/// Output template handed to the external media downloader.
pub fn delegate_template(root: &Path, work: &Work) -> String {
    work_dir(root, work)
        .join("%(title)s.%(ext)s")
        .to_string_lossy()
        .into_owned()
}

/// Join a listing href onto the media base.
///
/// Relative hrefs are appended to the base verbatim; absolute URLs are kept.
pub fn join_media_url(base: &str, href: &str) -> String {
    let href = href.trim();
    if url::Url::parse(href).is_ok() {
        return href.to_string();
    }
    format!("{base}{href}")
}

/// Make an embedded frame source absolute against the page it came from.
pub fn absolutize(page_url: &str, src: &str) -> String {
    let src = src.trim();
    if let Some(rest) = src.strip_prefix("//") {
        return format!("https://{rest}");
    }
    match url::Url::parse(page_url).and_then(|base| base.join(src)) {
        Ok(u) => u.to_string(),
        Err(_) => src.to_string(),
    }
}

/// Compare two URLs after normalization (trailing slash, case of host).
pub fn same_url(a: &str, b: &str) -> bool {
    match (url::Url::parse(a), url::Url::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.trim() == b.trim(),
    }
}

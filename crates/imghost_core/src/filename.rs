/// Image extensions accepted into the upload queue (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff", "svg",
];

/// True when `name` ends in one of [`SUPPORTED_EXTENSIONS`].
pub fn is_supported_image(name: &str) -> bool {
    extension(name)
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Best-effort MIME type for an accepted image name.
pub fn mime_hint(name: &str) -> Option<&'static str> {
    let ext = extension(name)?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        _ => return None,
    };
    Some(mime)
}

/// Repository-safe file name: whitespace runs become `-`, and anything outside
/// `[A-Za-z0-9._-]` is dropped. May return an empty string.
pub fn sanitize_filename(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    let mut in_whitespace = false;
    for c in name.trim().chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                cleaned.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if is_allowed(c) {
            cleaned.push(c);
        }
    }
    cleaned
}

/// Repository directory in canonical form: forward slashes, no leading or
/// trailing separators.
pub fn normalize_directory(dir: &str) -> String {
    dir.trim().replace('\\', "/").trim_matches('/').to_string()
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

fn extension(name: &str) -> Option<&str> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlist_is_case_insensitive() {
        assert!(is_supported_image("cat.PNG"));
        assert!(is_supported_image("scan.TiF"));
        assert!(is_supported_image("photo.jpeg"));
        assert!(!is_supported_image("notes.txt"));
        assert!(!is_supported_image("png"));
        assert!(!is_supported_image("trailing."));
    }

    #[test]
    fn sanitize_collapses_whitespace_and_strips_symbols() {
        assert_eq!(sanitize_filename("My  Holiday Pic (1).png"), "My-Holiday-Pic-1.png");
        assert_eq!(sanitize_filename("  ümlaut.jpg "), "mlaut.jpg");
        assert_eq!(sanitize_filename("???"), "");
    }

    #[test]
    fn directories_are_normalized() {
        assert_eq!(normalize_directory("\\images\\2024\\"), "images/2024");
        assert_eq!(normalize_directory("/images/"), "images");
        assert_eq!(normalize_directory("///"), "");
    }

    #[test]
    fn mime_hint_covers_allowlist() {
        for ext in SUPPORTED_EXTENSIONS {
            assert!(mime_hint(&format!("a.{ext}")).is_some(), "{ext}");
        }
        assert_eq!(mime_hint("a.txt"), None);
    }
}

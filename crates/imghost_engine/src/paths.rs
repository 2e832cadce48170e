/// Repository path to try for the `attempt`-th upload of `filename` into
/// `dir`: `dir/name.ext`, then `dir/name-1.ext`, `dir/name-2.ext`, ...
pub fn candidate_path(dir: &str, filename: &str, attempt: u32) -> String {
    let name = if attempt == 0 {
        filename.to_string()
    } else {
        match filename.rfind('.') {
            Some(dot) => format!("{}-{attempt}{}", &filename[..dot], &filename[dot..]),
            None => format!("{filename}-{attempt}"),
        }
    };
    if dir.is_empty() {
        name
    } else {
        format!("{dir}/{name}")
    }
}

/// Last path segment.
pub(crate) fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

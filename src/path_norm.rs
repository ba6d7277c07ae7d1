//! Separator normalization, POSIX conversion, and path component splitting.

/// Replace every `\` with `/`.
pub fn to_posix(path: &str) -> String {
    path.replace('\\', "/")
}

/// Convert to the platform separator.
#[cfg(unix)]
pub fn normalize_separator(path: &str) -> String {
    to_posix(path)
}

#[cfg(windows)]
pub fn normalize_separator(path: &str) -> String {
    path.replace('/', "\\")
}

/// Whether `path` contains a `/` or `\` separator.
pub fn has_separator(path: &str) -> bool {
    path.contains('/') || path.contains('\\')
}

/// Split `path` on any run of `/` or `\`, dropping empty segments.
pub fn components(path: &str) -> Vec<String> {
    path.split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// The platform separator as a one-character string.
pub fn separator() -> &'static str {
    std::path::MAIN_SEPARATOR_STR
}

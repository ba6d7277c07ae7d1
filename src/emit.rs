//! JSON array / matrix / text formatting and safe single-line escaping.

use std::fs;
use std::io;
use std::path::Path;

/// Escape `"`, `\`, newline, CR, tab per standard JSON string rules. No
/// Unicode escaping beyond ASCII control characters.
pub fn escape_json(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Percent-escape `%`, LF, CR for a single-line `key=value` pipeline. No
/// other characters are modified.
pub fn safe_output_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            '\n' => out.push_str("%0A"),
            '\r' => out.push_str("%0D"),
            c => out.push(c),
        }
    }
    out
}

/// `"[" + comma-joined quoted JSON-escaped items + "]"`; empty list => `"[]"`.
pub fn format_json_array(items: &[String]) -> String {
    if items.is_empty() {
        return "[]".to_string();
    }
    let body = items
        .iter()
        .map(|item| format!("\"{}\"", escape_json(item)))
        .collect::<Vec<_>>()
        .join(",");
    format!("[{body}]")
}

/// `{"include":[{"value":v1},{"value":v2},...]}`; empty list => `{"include":[]}`.
pub fn format_matrix(items: &[String]) -> String {
    if items.is_empty() {
        return "{\"include\":[]}".to_string();
    }
    let body = items
        .iter()
        .map(|item| format!("{{\"value\":\"{}\"}}", escape_json(item)))
        .collect::<Vec<_>>()
        .join(",");
    format!("{{\"include\":[{body}]}}")
}

/// Writes change lists to disk as `.txt` (joined by a separator) or `.json`
/// (a `format_json_array`) files under a caller-supplied directory.
pub struct OutputWriter;

impl OutputWriter {
    pub fn write_text(dir: &Path, name: &str, items: &[String], sep: &str) -> io::Result<()> {
        let path = dir.join(format!("{name}.txt"));
        fs::write(path, items.join(sep))
    }

    pub fn write_json(dir: &Path, name: &str, items: &[String]) -> io::Result<()> {
        let path = dir.join(format!("{name}.json"));
        fs::write(path, format_json_array(items))
    }

    /// Append a `key=value` line to the path named by `CI_OUTPUT`, escaping
    /// `value` with `safe_output_escape`. A no-op when the variable is unset.
    pub fn append_ci_output(key: &str, value: &str) -> io::Result<()> {
        use std::io::Write;

        let Some(path) = std::env::var_os("CI_OUTPUT") else {
            return Ok(());
        };
        let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{key}={}", safe_output_escape(value))
    }
}

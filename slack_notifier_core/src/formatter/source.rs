/**
 * Source file helpers: code excerpts around a line and display paths.
 */
use std::fs;
use std::path::Path;

use tracing::debug;

/**
 * Returns the inclusive, 1-based line range `[line - padding, line + padding]`
 * clamped to `[1, total_lines]`.
 *
 * The range is empty (`first > last`) when `line` lies past the end of the
 * file.
 */
pub fn excerpt_bounds(line: u32, padding: usize, total_lines: usize) -> (usize, usize) {
    let line = line as usize;
    let first = line.saturating_sub(padding).max(1);
    let last = line.saturating_add(padding).min(total_lines);
    (first, last)
}

/**
 * Renders the lines around `line` of `path` as a fenced code block.
 *
 * Each line ends with two spaces so Slack keeps the line breaks. Files that
 * cannot be read yield `None`; a missing excerpt never fails the message.
 */
pub fn file_excerpt(path: &Path, line: u32, padding: usize) -> Option<String> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!(file = %path.display(), error = %err, "Source excerpt unavailable");
            return None;
        }
    };
    let source = String::from_utf8_lossy(&bytes);
    let lines: Vec<&str> = source.lines().collect();

    let (first, last) = excerpt_bounds(line, padding, lines.len());

    let mut excerpt = String::from("```\n");
    for number in first..=last {
        excerpt.push_str(lines[number - 1]);
        excerpt.push_str("  \n");
    }
    excerpt.push_str("```\n");
    Some(excerpt)
}

/**
 * Formats `file` for display as `"{path} at line {line}"`.
 *
 * Paths under `root_dir` are shown relative to it; anything else is shown
 * verbatim.
 */
pub fn display_location(file: &str, line: u32, root_dir: Option<&Path>) -> String {
    let file = file.trim();
    let shown = root_dir
        .and_then(|root| Path::new(file).strip_prefix(root).ok())
        .filter(|relative| !relative.as_os_str().is_empty())
        .map(|relative| relative.display().to_string())
        .unwrap_or_else(|| file.to_string());

    format!("{shown} at line {line}")
}

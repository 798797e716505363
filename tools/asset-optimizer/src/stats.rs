//! Size statistics, human-readable formatting and JSON output shared by the
//! reports and manifests

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Format a byte count with 1024-based units and at most two decimals
///
/// `format_bytes(1536) == "1.5 KB"`, `format_bytes(0) == "0 Bytes"`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let fixed = format!("{value:.2}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

/// Percentage saved going from `original` to `compressed` (negative if it grew)
pub fn reduction_percent(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (original as f64 - compressed as f64) / original as f64 * 100.0
}

/// One decimal place plus a percent sign, e.g. `"35.0%"`
pub fn format_percent(percent: f64) -> String {
    format!("{percent:.1}%")
}

/// `"<original/compressed>:1"` with two decimals
pub fn compression_ratio(original: u64, compressed: u64) -> String {
    if compressed == 0 {
        return "N/A".to_string();
    }
    format!("{:.2}:1", original as f64 / compressed as f64)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Lexically normalize `.` and `..` components
fn normalize(path: &Path) -> Vec<Component<'_>> {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(parts.last(), Some(Component::Normal(_))) {
                    parts.pop();
                } else {
                    parts.push(component);
                }
            }
            other => parts.push(other),
        }
    }
    parts
}

/// Path of `target` relative to the directory `base`, `/`-separated
///
/// Both paths are resolved against the working directory first; neither
/// has to exist.
pub fn relative_path(base: &Path, target: &Path) -> String {
    let base = absolute(base);
    let target = absolute(target);
    let base_parts = normalize(&base);
    let target_parts = normalize(&target);

    let common = base_parts
        .iter()
        .zip(&target_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = Vec::new();
    segments.extend(std::iter::repeat_n("..".to_string(), base_parts.len() - common));
    segments.extend(
        target_parts[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    segments.join("/")
}

/// Current UTC time as RFC 3339 with milliseconds, e.g. `2025-01-01T12:00:00.000Z`
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Pretty-print `value` to `path`, creating the parent directory
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// File name without its extension
pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

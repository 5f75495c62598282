use crate::config;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Create a directory (and all parents) if it doesn't exist, and return the path.
pub fn ensure_dir<P: AsRef<Path>>(path: P) -> io::Result<PathBuf> {
    let p = path.as_ref();
    fs::create_dir_all(p)?;
    Ok(p.to_path_buf())
}

/// Ensure the parent directory of a *file path* exists (no-op if none).
pub fn ensure_parent_dir<P: AsRef<Path>>(file_path: P) -> io::Result<()> {
    if let Some(parent) = file_path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Upload root (absolute), from `config::upload_root()`.
/// If relative in env, resolve against current_dir().
pub fn upload_root() -> PathBuf {
    let p = PathBuf::from(config::upload_root());
    if p.is_absolute() {
        p
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(p)
    }
}

/// Lower-cased extension of `file_name` including the leading dot, or `""`.
///
/// `extension_of("Mark Scheme.PDF")` → `".pdf"`
pub fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Reduces a client-supplied identifier to characters safe for a file name.
fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

/// Storage path for an uploaded form file: `{UPLOAD_ROOT}/{field}-{assignment_id}{ext}`.
///
/// Re-uploading for the same assignment overwrites the previous file.
pub fn upload_path(field: &str, assignment_id: &str, original_file_name: &str) -> PathBuf {
    upload_root().join(format!(
        "{}-{}{}",
        sanitize_component(field),
        sanitize_component(assignment_id),
        extension_of(original_file_name)
    ))
}

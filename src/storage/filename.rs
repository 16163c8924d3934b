//! Upload filename validation

/// Reasons an uploaded filename is refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilenameError {
    #[error("filename is empty")]
    Empty,
    #[error("filename contains characters outside [A-Za-z0-9_.-]")]
    InvalidCharacters,
    #[error("filename refers to a directory entry")]
    Reserved,
    #[error("filename names an existing symbolic link")]
    Symlink,
}

/// Allow-list check equivalent to `^[A-Za-z0-9_.-]+$`
pub fn is_valid_filename(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'))
}

/// Trim and validate a client-supplied filename.
///
/// The allow-list already excludes `/` and `\`; `.` and `..` pass it but
/// would name the directory itself or its parent, so they are refused too.
pub fn sanitize_filename(raw: &str) -> Result<&str, FilenameError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(FilenameError::Empty);
    }
    if !is_valid_filename(name) {
        return Err(FilenameError::InvalidCharacters);
    }
    if name == "." || name == ".." {
        return Err(FilenameError::Reserved);
    }
    Ok(name)
}

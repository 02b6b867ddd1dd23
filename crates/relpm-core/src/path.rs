//! Relative path calculation between absolute file system paths.
//!
//! Playlists store their tracks relative to the directory the playlist file
//! lives in, so a whole music tree can be moved without breaking it. This
//! module does the string-level path math for that:
//!
//! - [`relative_path`] computes `target` relative to `base`
//! - [`resolve_relative`] is the inverse, joining a relative path onto a base
//!   directory
//!
//! Both work on POSIX and Windows style path strings regardless of the host
//! platform, treating `/` and `\` alike.
//!
//! Files on the local disk go through [`absolute`] and
//! [`relative_to_directory`] instead. They compare [`Path`] components, so a
//! `\` inside a POSIX file name such as `AC\DC.mp3` stays part of the name.
//!
//! Deciding whether `base` is a file or a directory is a heuristic: the file
//! system is asked first, and if `base` does not exist a trailing separator
//! marks it as a directory. A missing base directory written without a
//! trailing separator is therefore treated as a file, which yields one `..`
//! too few. Callers that know they hold a directory should use
//! [`relative_to_directory`], which always appends the separator.

use std::borrow::Cow;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use tracing::trace;

use crate::error::{PathError, Result};

/// Directory separator used when producing paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Separator {
    /// `/` (POSIX, and what M3U files conventionally use).
    #[default]
    Unix,
    /// `\` (Windows).
    Windows,
}

impl Separator {
    /// The separator character.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Unix => '/',
            Self::Windows => '\\',
        }
    }

    /// The separator as a string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unix => "/",
            Self::Windows => "\\",
        }
    }

    /// The separator of the platform we are running on.
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(windows) { Self::Windows } else { Self::Unix }
    }
}

impl fmt::Display for Separator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Separator {
    type Error = PathError;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        match value {
            "/" => Ok(Self::Unix),
            "\\" => Ok(Self::Windows),
            other => Err(PathError::InvalidPath {
                path: other.to_string(),
                reason: "unrecognised directory separator".to_string(),
            }),
        }
    }
}

/// Normalize a path: unify separators, resolve `.` and `..`, collapse
/// duplicate separators and drop any trailing separator.
///
/// Fails when `..` would climb above the root (or above the start of a
/// relative path).
pub fn normalize(path: &str, separator: Separator) -> Result<String> {
    let sep = separator.as_char();
    let unified: String = path
        .chars()
        .map(|c| if c == '/' || c == '\\' { sep } else { c })
        .collect();

    let (prefix, rest) = split_prefix(&unified, sep);

    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split(sep) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(PathError::InvalidPath {
                        path: path.to_string(),
                        reason: "'..' climbs above the root".to_string(),
                    }
                    .into());
                }
            }
            other => segments.push(other),
        }
    }

    let mut normalized = prefix;
    normalized.push_str(&segments.join(separator.as_str()));
    Ok(normalized)
}

/// Split off the root of an already separator-unified path.
///
/// Recognises `C:\`, `C:`, UNC `\\server\` and a plain leading separator.
fn split_prefix(path: &str, sep: char) -> (String, &str) {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        if path[2..].starts_with(sep) {
            return (path[..3].to_string(), &path[3..]);
        }
        return (path[..2].to_string(), &path[2..]);
    }

    let double: String = [sep, sep].iter().collect();
    if let Some(unc) = path.strip_prefix(&double) {
        let server_end = unc.find(sep).unwrap_or(unc.len());
        let server = &unc[..server_end];
        let rest = unc.get(server_end + 1..).unwrap_or("");
        return (format!("{double}{server}{sep}"), rest);
    }

    if let Some(rest) = path.strip_prefix(sep) {
        return (sep.to_string(), rest);
    }

    (String::new(), path)
}

/// Split a normalized path into segments the way the relativization compares
/// them: a leading root separator produces an empty first segment, which
/// every POSIX path therefore shares.
fn segments(normalized: &str, separator: Separator) -> Vec<&str> {
    let mut parts: Vec<&str> = normalized.split(separator.as_char()).collect();
    if parts.len() > 1 && parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }
    parts
}

/// Decide whether `base` denotes a file.
///
/// Asks the file system first; for paths that do not exist, a trailing
/// separator in the original string means directory, anything else file.
fn base_is_file(original: &str, normalized: &str, separator: Separator) -> bool {
    match std::fs::metadata(normalized) {
        Ok(meta) => meta.is_file(),
        Err(_) => !original.ends_with(separator.as_str()),
    }
}

/// Compute `target` relative to `base`, using `separator` in the result.
///
/// `base` may be a file (the walk starts at its containing directory) or a
/// directory. See the module docs for how the two are told apart.
///
/// # Errors
///
/// Returns [`PathError::NoCommonRoot`] if the paths share no leading segment,
/// which happens for paths on different drives, and
/// [`PathError::InvalidPath`] if either path cannot be normalized.
///
/// # Example
///
/// ```
/// use relpm_core::path::{Separator, relative_path};
///
/// let rel = relative_path("/a/b/c", "/a/x/y/", Separator::Unix).unwrap();
/// assert_eq!(rel, "../../b/c");
/// ```
pub fn relative_path(target: &str, base: &str, separator: Separator) -> Result<String> {
    let normalized_target = normalize(target, separator)?;
    let normalized_base = normalize(base, separator)?;

    let target_parts = segments(&normalized_target, separator);
    let base_parts = segments(&normalized_base, separator);

    let common = target_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(t, b)| t == b)
        .count();

    if common == 0 {
        return Err(PathError::NoCommonRoot {
            target: normalized_target,
            base: normalized_base,
        }
        .into());
    }

    let dirs_up = if base_parts.len() == common {
        0
    } else if base_is_file(base, &normalized_base, separator) {
        base_parts.len() - common - 1
    } else {
        base_parts.len() - common
    };

    let mut parts: Vec<&str> = std::iter::repeat_n("..", dirs_up).collect();
    parts.extend(&target_parts[common..]);

    let relative = if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join(separator.as_str())
    };

    trace!(target = %normalized_target, base = %normalized_base, %relative, "relativized path");
    Ok(relative)
}

/// Compute `file` relative to `directory`, always treating `directory` as a
/// directory whether or not it exists.
///
/// Both paths are compared component by component after [`absolute`], so
/// file names are never split on a separator foreign to the host.
///
/// # Errors
///
/// Returns [`PathError::NoCommonRoot`] if the paths are on different roots
/// (drives or UNC shares).
pub fn relative_to_directory(directory: &Path, file: &Path, separator: Separator) -> Result<String> {
    let directory = absolute(directory)?;
    let file = absolute(file)?;

    let dir_parts: Vec<Component<'_>> = directory.components().collect();
    let file_parts: Vec<Component<'_>> = file.components().collect();

    let common = dir_parts
        .iter()
        .zip(&file_parts)
        .take_while(|(d, f)| d == f)
        .count();

    if common == 0 {
        return Err(PathError::NoCommonRoot {
            target: file.to_string_lossy().into_owned(),
            base: directory.to_string_lossy().into_owned(),
        }
        .into());
    }

    let mut parts: Vec<Cow<'_, str>> = std::iter::repeat_n(Cow::Borrowed(".."), dir_parts.len() - common).collect();
    parts.extend(file_parts[common..].iter().map(|c| c.as_os_str().to_string_lossy()));

    let relative = if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join(separator.as_str())
    };

    trace!(file = %file.display(), base = %directory.display(), %relative, "relativized file");
    Ok(relative)
}

/// Join `relative` onto `base_dir` and normalize the result.
///
/// This is the inverse of [`relative_path`] for a directory base:
/// `resolve_relative(dir, relative_path(t, dir/)) == normalize(t)`.
pub fn resolve_relative(base_dir: &str, relative: &str, separator: Separator) -> Result<String> {
    let joined = format!("{base_dir}{}{relative}", separator.as_str());
    normalize(&joined, separator)
}

/// Make `path` absolute against the current directory without touching the
/// file system, then resolve `.` and `..` lexically.
///
/// Used to compare playlist identities, so `list.m3u` and `./list.m3u` are
/// the same playlist. Separators are left as the host defines them.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|e| PathError::InvalidPath {
        path: path.to_string_lossy().into_owned(),
        reason: e.to_string(),
    })?;

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            // `..` at the root stays at the root.
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}

/// Last path segment, splitting on either separator style.
///
/// Playlists written on another platform may use the foreign separator, so
/// [`Path::file_name`] alone is not enough.
#[must_use]
pub fn file_name_of(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

//! # Logical Paths
//!
//! A logical path routes to a mounted backend through its leading device
//! token: `<device>:/<segment>/<segment>/...`.
//!
//! ```text
//! sdmc:/JKSV/Saves/config.json
//! └──┘ └─────────────────────┘
//! device        sub-path handed to the backend
//! ```
//!
//! No `.`/`..` normalization is performed. [`DevicePath`] is pure string
//! logic; it never touches a backend.

use std::fmt;
use std::str::FromStr;

use crate::FsError;

/// Separator between the device name and the sub-path.
pub const DEVICE_SEPARATOR: char = ':';

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '/';

/// A parsed `device:/sub/path` string.
///
/// Construction never fails; an unparseable string yields an invalid path
/// for which [`is_valid`](Self::is_valid) is `false` and every query returns
/// `None`. Use [`str::parse`] to reject invalid input up front.
///
/// A path is valid when it is non-empty, the device name before the first
/// `:` is non-empty and contains no `/`, and the remainder after `:` starts
/// with `/`. A remainder that is non-empty but unrooted, as in `sdmc:a`, is
/// rejected: every backend sub-path is absolute.
///
/// # Example
///
/// ```rust
/// use devfs::DevicePath;
///
/// let path = DevicePath::new("sdmc:/saves/game");
/// assert!(path.is_valid());
/// assert_eq!(path.device_name(), Some("sdmc"));
/// assert_eq!(path.sub_path(), Some("/saves/game"));
///
/// assert!(!DevicePath::new("/no/device").is_valid());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DevicePath {
    path: String,
    device_separator: Option<usize>,
}

fn locate_device_separator(path: &str) -> Option<usize> {
    let position = path.find(DEVICE_SEPARATOR)?;
    let device = &path[..position];
    if device.is_empty() || device.contains(PATH_SEPARATOR) {
        return None;
    }
    path[position + 1..]
        .starts_with(PATH_SEPARATOR)
        .then_some(position)
}

impl DevicePath {
    /// Parse `path`. The result may be invalid.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let device_separator = locate_device_separator(&path);
        Self {
            path,
            device_separator,
        }
    }

    /// Returns `true` if the path has a device prefix and a rooted sub-path.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.device_separator.is_some()
    }

    /// The full logical string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Length of the full logical string in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.path.len()
    }

    /// Returns `true` if the logical string is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// The device token, e.g. `sdmc` in `sdmc:/a`.
    pub fn device_name(&self) -> Option<&str> {
        self.device_separator.map(|position| &self.path[..position])
    }

    /// Everything after the device separator, always starting with `/`.
    pub fn sub_path(&self) -> Option<&str> {
        self.device_separator
            .map(|position| &self.path[position + 1..])
    }

    /// Byte position of the first `ch`, or `None` if absent or the path is
    /// invalid.
    pub fn find_first_of(&self, ch: char) -> Option<usize> {
        self.find_next_of(0, ch)
    }

    /// Byte position of the first `ch` at or after `begin`.
    ///
    /// Returns `None` when no occurrence remains, `begin` is past the end, or
    /// the path is invalid.
    pub fn find_next_of(&self, begin: usize, ch: char) -> Option<usize> {
        if !self.is_valid() {
            return None;
        }
        self.path
            .get(begin..)?
            .find(ch)
            .map(|position| position + begin)
    }

    /// Extract `length` bytes starting at `begin` as a new path.
    ///
    /// The range is clamped to the string. A range that does not fall on
    /// character boundaries yields an empty, invalid path.
    pub fn sub_range(&self, begin: usize, length: usize) -> DevicePath {
        let end = begin.saturating_add(length).min(self.path.len());
        let begin = begin.min(end);
        DevicePath::new(self.path.get(begin..end).unwrap_or_default())
    }

    /// Append `name` as a child segment, inserting `/` when needed.
    ///
    /// ```rust
    /// use devfs::DevicePath;
    ///
    /// assert_eq!(DevicePath::new("sdmc:/").join("a").as_str(), "sdmc:/a");
    /// assert_eq!(DevicePath::new("sdmc:/a").join("b").as_str(), "sdmc:/a/b");
    /// ```
    pub fn join(&self, name: &str) -> DevicePath {
        let mut path = self.path.clone();
        if !path.ends_with(PATH_SEPARATOR) {
            path.push(PATH_SEPARATOR);
        }
        path.push_str(name.trim_start_matches(PATH_SEPARATOR));
        DevicePath::new(path)
    }

    /// Device name and sub-path, or [`FsError::InvalidPath`].
    pub(crate) fn split(&self) -> Result<(&str, &str), FsError> {
        match self.device_separator {
            Some(position) => Ok((&self.path[..position], &self.path[position + 1..])),
            None => Err(FsError::InvalidPath {
                path: self.path.clone(),
            }),
        }
    }
}

impl fmt::Display for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl AsRef<str> for DevicePath {
    fn as_ref(&self) -> &str {
        &self.path
    }
}

impl From<&str> for DevicePath {
    fn from(path: &str) -> Self {
        DevicePath::new(path)
    }
}

impl From<String> for DevicePath {
    fn from(path: String) -> Self {
        DevicePath::new(path)
    }
}

impl FromStr for DevicePath {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = DevicePath::new(s);
        if path.is_valid() {
            Ok(path)
        } else {
            Err(FsError::InvalidPath { path: s.to_owned() })
        }
    }
}

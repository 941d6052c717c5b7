//! Core types shared by the handles and the backend traits.

/// Opaque native reference to an open backend resource.
///
/// The internal value is backend-defined (an index, a kernel handle, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(pub u64);

/// Identifier of a raw partition reachable through a
/// [`StorageBackend`](crate::StorageBackend).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartitionId(pub u32);

impl std::fmt::Display for PartitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "partition 0x{:X}", self.0)
    }
}

/// Type of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// Modes a [`File`](crate::File) is opened with.
///
/// `append` is provided by this layer, not by backends: it only moves the
/// starting cursor to the end of the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OpenMode {
    /// Open for reading.
    pub read: bool,
    /// Open for writing.
    pub write: bool,
    /// Create the file. Without `append`, an existing file is replaced.
    pub create: bool,
    /// Start with the cursor at the end of the file.
    pub append: bool,
}

impl OpenMode {
    /// Read-only access to an existing file.
    pub const READ: Self = Self {
        read: true,
        write: false,
        create: false,
        append: false,
    };

    /// Write access; any existing file is deleted and recreated.
    pub const WRITE: Self = Self {
        read: false,
        write: true,
        create: true,
        append: false,
    };

    /// Read and write access to an existing file.
    pub const READ_WRITE: Self = Self {
        read: true,
        write: true,
        create: false,
        append: false,
    };

    /// Write access starting at the end of the file, creating it if missing.
    pub const APPEND: Self = Self {
        read: false,
        write: true,
        create: true,
        append: true,
    };

    /// Returns `true` if opening with these modes deletes an existing file.
    #[inline]
    pub const fn replaces_existing(&self) -> bool {
        self.create && !self.append
    }
}

/// Reference point for a seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SeekOrigin {
    /// Offset from the start of the stream.
    Start,
    /// Offset from the current cursor.
    Current,
    /// Offset from the end of the stream.
    End,
}

/// A directory entry as reported by a backend.
///
/// The name is kept in the backend's native UTF-16 form; narrow accessors
/// convert on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirEntry {
    /// Whether the entry is a directory.
    pub is_directory: bool,
    /// Entry name in UTF-16 code units, without a terminator.
    pub name: Vec<u16>,
}

impl DirEntry {
    /// Build an entry from a UTF-8 name.
    pub fn new(name: &str, is_directory: bool) -> Self {
        Self {
            is_directory,
            name: name.encode_utf16().collect(),
        }
    }

    /// The entry's type.
    #[inline]
    pub fn file_type(&self) -> FileType {
        if self.is_directory {
            FileType::Directory
        } else {
            FileType::File
        }
    }

    /// The entry name converted to UTF-8. Unpaired surrogates become U+FFFD.
    pub fn name_utf8(&self) -> String {
        String::from_utf16_lossy(&self.name)
    }
}

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatTreeError {
    #[error("Invalid category name: '{name}' - must contain only letters, digits and spaces (max {max_length} chars)")]
    InvalidName { name: String, max_length: usize },

    #[error("Category path is empty")]
    EmptyPath,

    #[error("Parent category not found: {name}")]
    ParentNotFound { name: String },

    #[error("Parent category '{name}' is ambiguous ({count} matches) - use a full path such as a/b")]
    AmbiguousParent { name: String, count: usize },

    #[error("Category '{name}' already exists in {scope}")]
    DuplicateAtScope { name: String, scope: String },

    #[error("Category not found: {segment}")]
    SegmentNotFound { segment: String },

    #[error("Category '{path}' has {count} child categories - remove them first")]
    HasChildren { path: String, count: usize },

    #[error("Category store is corrupt: {message}")]
    CorruptStore { message: String },

    #[error("Failed to parse config file {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Config key not found: {key}")]
    ConfigKeyNotFound { key: String },

    #[error("Invalid value for {key}: {message}")]
    InvalidConfigValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Home directory not found")]
    HomeNotFound,
}

pub type Result<T> = std::result::Result<T, CatTreeError>;

impl CatTreeError {
    /// Errors caused by the request itself rather than by the store or the filesystem.
    ///
    /// These are reported back to the caller and leave the hierarchy untouched.
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            Self::InvalidName { .. }
                | Self::EmptyPath
                | Self::ParentNotFound { .. }
                | Self::AmbiguousParent { .. }
                | Self::DuplicateAtScope { .. }
                | Self::SegmentNotFound { .. }
                | Self::HasChildren { .. }
        )
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::SegmentNotFound { .. } | Self::ParentNotFound { .. } => 2,
            Self::DuplicateAtScope { .. } => 3,
            Self::HasChildren { .. } => 4,
            Self::InvalidName { .. } | Self::EmptyPath | Self::AmbiguousParent { .. } => 5,
            Self::CorruptStore { .. } => 6,
            _ => 1,
        }
    }
}

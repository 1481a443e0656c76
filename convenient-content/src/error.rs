//! Error types for loading and resolving configurations.

use crate::entity::EntityRef;
use std::path::PathBuf;

/// Invalid runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// No architecture is allowed
    #[error("allowed_arches must list at least one architecture")]
    NoAllowedArches,

    /// The configs directory is not set
    #[error("configs directory is not set")]
    NoConfigsDirectory,

    /// Settings file could not be read or parsed
    #[error("Cannot load settings from {0}: {1}")]
    Unreadable(PathBuf, String),
}

/// A single configuration document that could not be accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// IO error while reading a document
    #[error("IO error reading {0}: {1}")]
    IoError(PathBuf, String),

    /// Document is not valid YAML or JSON
    #[error("Parse error in {0}: {1}")]
    ParseError(PathBuf, String),

    /// Document lacks its type or version header
    #[error("{0} is missing the document type or version")]
    MissingHeader(PathBuf),

    /// Document type is known but the version is not supported
    #[error("{path}: {document} version {version} is not supported")]
    UnsupportedVersion {
        /// Document file
        path: PathBuf,
        /// Document type
        document: String,
        /// Declared version
        version: u64,
    },

    /// Document data does not match its type
    #[error("Invalid document {0}: {1}")]
    InvalidDocument(PathBuf, String),

    /// Document targets an architecture outside the allowed set
    #[error("{document_id} uses unsupported architecture {arch}")]
    UnsupportedArch {
        /// Id of the offending document
        document_id: String,
        /// Architecture name
        arch: String,
    },

    /// Entity references an id that was not loaded
    #[error("{from} references missing {to}")]
    MissingReference {
        /// Referencing entity
        from: EntityRef,
        /// Missing target
        to: EntityRef,
    },

    /// Addon view extends another addon view
    #[error("{view} extends addon {base}, only compose views can be extended")]
    AddonOfAddon {
        /// The addon view
        view: EntityRef,
        /// Its base, itself an addon
        base: EntityRef,
    },
}

/// Failure to produce a snapshot from a configs directory.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Settings are invalid
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Configs directory could not be listed
    #[error("Cannot read configs directory {0}: {1}")]
    Directory(PathBuf, String),

    /// Strict mode found documents with errors
    #[error("{} invalid config documents", .0.len())]
    Rejected(Vec<ConfigError>),
}

/// A retained entity references an entity missing from the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigIntegrityError {
    /// Dangling id reference
    #[error("{from} references missing {to}")]
    DanglingReference {
        /// Retained entity holding the reference
        from: EntityRef,
        /// Referenced entity that does not exist
        to: EntityRef,
    },
}

/// Any failure of the content resolver.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// Invalid settings
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Loading the configs failed
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Resolving the configs failed
    #[error(transparent)]
    Integrity(#[from] ConfigIntegrityError),
}

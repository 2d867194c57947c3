//! Reference-manager (Zotero) and local archive configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryType {
    #[default]
    User,
    Group,
}

impl LibraryType {
    /// URL path segment of the library.
    #[must_use]
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Group => "groups",
        }
    }
}

/// How the downloaded PDF is attached to the reference item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentMode {
    /// Keep the PDF locally only.
    #[default]
    None,
    /// Upload the file to reference-manager storage.
    Upload,
    /// Attach a link to the local file.
    Linked,
    Both,
}

impl AttachmentMode {
    #[must_use]
    pub const fn uploads(self) -> bool {
        matches!(self, Self::Upload | Self::Both)
    }

    #[must_use]
    pub const fn links(self) -> bool {
        matches!(self, Self::Linked | Self::Both)
    }
}

fn default_base_url() -> String {
    "https://api.zotero.org".to_string()
}

fn default_collection() -> String {
    "ArXiv Daily".to_string()
}

const fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ZoteroConfig {
    #[serde(default)]
    pub api_key: String,

    /// Numeric user or group id.
    #[serde(default)]
    pub library_id: String,

    #[serde(default)]
    pub library_type: LibraryType,

    /// Collection archived items are filed into.
    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default)]
    pub attachment_mode: AttachmentMode,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Where PDFs and notes are written. Empty means `<data_dir>/library`.
    #[serde(default)]
    pub archive_dir: String,
}

impl Default for ZoteroConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            library_id: String::new(),
            library_type: LibraryType::default(),
            collection: default_collection(),
            attachment_mode: AttachmentMode::default(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            archive_dir: String::new(),
        }
    }
}

impl ZoteroConfig {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.library_id.trim().is_empty()
    }

    /// Archive root, resolved against the data directory when unset.
    #[must_use]
    pub fn archive_root(&self, data_dir: &Path) -> PathBuf {
        if self.archive_dir.trim().is_empty() {
            data_dir.join("library")
        } else {
            PathBuf::from(&self.archive_dir)
        }
    }
}

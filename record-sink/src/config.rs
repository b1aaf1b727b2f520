//! Store connection configuration.
//!
//! The configuration document uses the keys `DbType`, `Host`, `Port`,
//! `DbUser`, `DbPwd`, `DbName`, `FileColl` and `TreeColl`. Unknown keys are
//! ignored and missing keys keep their zero value. Nothing is validated
//! here; a bad value shows up when the connection attempt fails.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SinkError};

/// Store kind that selects the in-process [`MemorySink`](crate::MemorySink).
pub const MEMORY_KIND: &str = "memory";

/// Document used when no configuration file is given.
pub const DEFAULT_DOCUMENT: &str = r#"{
    "DbType": "mongodb",
    "Host": "localhost",
    "Port": "27017",
    "DbName": "filetrail",
    "FileColl": "files",
    "TreeColl": "trees"
}"#;

/// Connection and routing information for the record store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store kind, used as the URI scheme.
    #[serde(rename = "DbType")]
    pub kind: String,

    #[serde(rename = "Host")]
    pub host: String,

    /// Port, kept as text.
    #[serde(rename = "Port")]
    pub port: String,

    #[serde(rename = "DbUser", skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(rename = "DbPwd", skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Database holding the record collections.
    #[serde(rename = "DbName")]
    pub database: String,

    /// Collection that receives file creation records.
    #[serde(rename = "FileColl")]
    pub file_collection: String,

    /// Reserved for tree-structure metadata. Not written to.
    #[serde(rename = "TreeColl")]
    pub tree_collection: String,
}

impl StoreConfig {
    /// Load a configuration file. `.toml` files are parsed as TOML,
    /// everything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SinkError::Config(format!("{}: {e}", path.display())))?;

        debug!("Loaded store configuration from {}", path.display());
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }

    /// Parse the embedded default document.
    pub fn embedded() -> Result<Self> {
        Self::from_json_str(DEFAULT_DOCUMENT)
    }

    /// Parse a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| SinkError::Config(format!("invalid JSON: {e}")))
    }

    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SinkError::Config(format!("invalid TOML: {e}")))
    }

    /// Whether this configuration selects the in-process memory store.
    pub fn is_memory(&self) -> bool {
        self.kind.eq_ignore_ascii_case(MEMORY_KIND)
    }

    /// Compose `kind://[user[:password]@]host:port`, percent-encoding the
    /// credentials.
    pub fn connection_uri(&self) -> String {
        self.compose_uri(false)
    }

    /// Same as [`connection_uri`](Self::connection_uri) with the password
    /// masked, for logging.
    pub fn redacted_uri(&self) -> String {
        self.compose_uri(true)
    }

    fn compose_uri(&self, redact: bool) -> String {
        let username = self.username.as_deref().filter(|u| !u.is_empty());
        let password = self.password.as_deref().filter(|p| !p.is_empty());

        let credentials = match (username, password) {
            (Some(user), Some(_)) if redact => format!("{}:****@", urlencoding::encode(user)),
            (Some(user), Some(password)) => format!(
                "{}:{}@",
                urlencoding::encode(user),
                urlencoding::encode(password)
            ),
            (Some(user), None) => format!("{}@", urlencoding::encode(user)),
            (None, _) => String::new(),
        };

        format!("{}://{credentials}{}:{}", self.kind, self.host, self.port)
    }
}

use serde::{Deserialize, Serialize};

/// Where recording blobs live and how they are named
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobConfig {
    /// Content directory, created on startup if missing
    #[serde(default = "default_root")]
    pub root: String,
    /// File extension appended to every generated name
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Serve the content directory as static files
    #[serde(default = "default_serve")]
    pub serve: bool,
    /// URL prefix the content directory is served under
    #[serde(default = "default_public_path")]
    pub public_path: String,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            extension: default_extension(),
            serve: default_serve(),
            public_path: default_public_path(),
        }
    }
}

impl BlobConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.root.is_empty() {
            return Err(anyhow::anyhow!("blob root must not be empty"));
        }
        if self.extension.is_empty() || self.extension.contains(['.', '/', '\\']) {
            return Err(anyhow::anyhow!(
                "invalid blob extension '{}'",
                self.extension
            ));
        }
        if self.serve && (!self.public_path.starts_with('/') || self.public_path.len() < 2) {
            return Err(anyhow::anyhow!(
                "blob public_path must start with '/', got '{}'",
                self.public_path
            ));
        }
        Ok(())
    }
}

fn default_root() -> String {
    "./uploads".to_string()
}

fn default_extension() -> String {
    "webm".to_string()
}

fn default_serve() -> bool {
    true
}

fn default_public_path() -> String {
    "/uploads".to_string()
}

//! Per-request temporary workspace
//!
//! Every file a request writes lives under one [`RequestWorkspace`]. The
//! directory is removed when the workspace is dropped, which happens on every
//! exit path of the request, including client disconnects.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use uuid::Uuid;

/// Prefix of workspace directory names
pub const WORKSPACE_PREFIX: &str = "img_translate_";

/// Temporary directory owned by a single request
#[derive(Debug)]
pub struct RequestWorkspace {
    id: Uuid,
    dir: TempDir,
}

impl RequestWorkspace {
    /// Create a workspace under `root`, or under the system temp dir
    pub fn create(root: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);

        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };

        let id = Uuid::new_v4();
        tracing::debug!(workspace = %id, path = %dir.path().display(), "Created request workspace");

        Ok(Self { id, dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file into the workspace, keeping only the final path component
    /// of `name`
    pub fn write_file(&self, name: &str, data: &[u8]) -> io::Result<PathBuf> {
        let file_name = Path::new(name)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "input".into());
        let path = self.dir.path().join(file_name);
        std::fs::write(&path, data)?;
        Ok(path)
    }
}

impl Drop for RequestWorkspace {
    fn drop(&mut self) {
        tracing::debug!(workspace = %self.id, "Removing request workspace");
    }
}

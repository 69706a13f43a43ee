use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use swarm_core::{SwarmError, SwarmResult};
use tracing::debug;

/// File access granted to agents.
///
/// All paths are relative to the sandbox root.
#[async_trait]
pub trait Explorer: Send + Sync {
    /// Write `content` to `path`, creating parent directories.
    async fn write_file(&self, path: &str, content: &str) -> SwarmResult<()>;

    /// Sorted entry names of `dir`; empty when the directory does not exist.
    async fn list_files(&self, dir: &str) -> SwarmResult<Vec<String>>;
}

/// [`Explorer`] backed by a directory on disk.
pub struct FsExplorer {
    root: PathBuf,
    write_locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl FsExplorer {
    /// A sandbox rooted at `root`, created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The sandbox root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a sandbox-relative path onto the filesystem.
    ///
    /// A leading `/` is taken relative to the root; `..` is rejected.
    pub fn resolve(&self, path: &str) -> SwarmResult<PathBuf> {
        let relative = Path::new(path.trim_start_matches(['/', '\\']));
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(SwarmError::Sandbox(format!(
                        "path escapes sandbox: {path}"
                    )))
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(SwarmError::Sandbox(format!("invalid sandbox path: {path}")))
                }
            }
        }
        Ok(resolved)
    }

    fn lock_for(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        self.write_locks
            .lock()
            .entry(path.to_path_buf())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl Explorer for FsExplorer {
    async fn write_file(&self, path: &str, content: &str) -> SwarmResult<()> {
        let full = self.resolve(path)?;
        if full == self.root {
            return Err(SwarmError::Sandbox("cannot write to sandbox root".into()));
        }

        let lock = self.lock_for(&full);
        let _guard = lock.lock().await;

        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, content).await?;
        debug!(path = %full.display(), bytes = content.len(), "Sandbox write");
        Ok(())
    }

    async fn list_files(&self, dir: &str) -> SwarmResult<Vec<String>> {
        let full = self.resolve(dir)?;
        let mut entries = match tokio::fs::read_dir(&full).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

use std::path::{Path, PathBuf};

use iron_model::Notification;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};

use crate::notify::NotifyError;

/// Appends one line per notification to a file, creating it on first use.
#[derive(Debug, Clone)]
pub struct FileHook {
    path: PathBuf,
}

impl FileHook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) async fn append(&self, n: &Notification) -> Result<(), NotifyError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let mut line = n.headline();
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_one_line_per_notification() {
        let dir = tempfile::tempdir().unwrap();
        let hook = FileHook::new(dir.path().join("notify.log"));

        hook.append(&Notification::error("web", "first", "a")).await.unwrap();
        hook.append(&Notification::warning("web", "second", "b")).await.unwrap();

        let content = std::fs::read_to_string(hook.path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines,
            ["[web - error] first: a", "[web - warning] second: b"]
        );
    }
}

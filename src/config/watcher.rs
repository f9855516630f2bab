//! Configuration file watcher for hot reload.
//!
//! The parent directory is watched rather than the file itself so that
//! editors and config-map mounts that replace the file atomically are seen.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::AppConfig;

/// Remembers the last file contents that produced a reload.
#[derive(Debug, Default)]
struct LastContents(Option<String>);

impl LastContents {
    /// Record `contents`; `false` when identical to the previous reload.
    fn changed(&mut self, contents: &str) -> bool {
        if self.0.as_deref() == Some(contents) {
            return false;
        }
        self.0 = Some(contents.to_string());
        true
    }
}

/// Watches the configuration file and sends validated updates.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<AppConfig>,
}

impl ConfigWatcher {
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<AppConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();
        let file_name = self.path.file_name().map(|n| n.to_os_string());
        let last = Mutex::new(LastContents(fs::read_to_string(&self.path).ok()));

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = %e, "Config watch error");
                        return;
                    }
                };
                if !(event.kind.is_modify() || event.kind.is_create()) {
                    return;
                }
                if !event.paths.iter().any(|p| p.file_name() == file_name.as_deref()) {
                    return;
                }

                let Ok(contents) = fs::read_to_string(&path) else {
                    return;
                };
                let changed = match last.lock() {
                    Ok(mut last) => last.changed(&contents),
                    Err(_) => true,
                };
                if !changed {
                    return;
                }

                tracing::info!(path = %path.display(), "Config file changed, reloading");
                match load_config(Some(&path)) {
                    Ok(config) => {
                        let _ = tx.send(config);
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            "Config reload failed, keeping current configuration"
                        );
                    }
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.path.display(), "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_contents_are_skipped() {
        let mut last = LastContents::default();
        assert!(last.changed("a = 1"));
        assert!(!last.changed("a = 1"));
        assert!(last.changed("a = 2"));
    }

    #[tokio::test]
    async fn test_rewrite_sends_update() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("formsflow.toml");
        fs::write(&path, "[auth]\nenabled = false\n[keycloak]\nrealm = \"first\"\n").unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _guard = watcher.run().unwrap();

        fs::write(&path, "[auth]\nenabled = false\n[keycloak]\nrealm = \"second\"\n").unwrap();

        let config = tokio::time::timeout(Duration::from_secs(10), updates.recv())
            .await
            .expect("no reload within timeout")
            .expect("channel closed");
        assert_eq!(config.keycloak.realm, "second");
    }
}

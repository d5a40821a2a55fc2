//! Position file watcher.
//!
//! The game mod rewrites a small text file whenever the player moves:
//! `x`, `y`, player index, surface index and player name, one per line.
//! Every change is parsed and published on the [`PositionFeed`].

use std::path::{Path, PathBuf};

use earshot_common::{EarshotError, Position, PositionFeed};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// One parsed snapshot of the position file.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRecord {
    pub position: Position,
    pub player_index: i32,
    pub player_name: Option<String>,
}

/// Parse the position file contents.
pub fn parse_position_file(content: &str) -> Result<PositionRecord, EarshotError> {
    let mut lines = content.lines().map(str::trim);

    let x: f64 = parse_field(lines.next(), "x")?;
    let y: f64 = parse_field(lines.next(), "y")?;
    let player_index: i32 = parse_field(lines.next(), "player index")?;
    let surface: i32 = parse_field(lines.next(), "surface index")?;
    let player_name = lines
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    Ok(PositionRecord {
        position: Position::new(x, y, surface),
        player_index,
        player_name,
    })
}

fn parse_field<T: std::str::FromStr>(line: Option<&str>, name: &str) -> Result<T, EarshotError> {
    let line = line.ok_or_else(|| EarshotError::PositionSource(format!("missing {name}")))?;
    line.parse()
        .map_err(|_| EarshotError::PositionSource(format!("invalid {name}: {line:?}")))
}

/// Watches the position file and publishes every parsed change.
pub struct PositionWatcher {
    path: PathBuf,
}

impl PositionWatcher {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the file once. `Ok(None)` when it is missing or does
    /// not hold a complete record yet.
    pub fn read_once(&self) -> Result<Option<PositionRecord>, EarshotError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match parse_position_file(&content) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "Position file not parseable yet");
                Ok(None)
            }
        }
    }

    /// Publish the current contents, then every change, until `shutdown`.
    ///
    /// The file and its directory are created when missing so the game has
    /// somewhere to write.
    pub async fn watch(
        &self,
        feed: PositionFeed,
        shutdown: CancellationToken,
    ) -> Result<(), EarshotError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| {
                EarshotError::PositionSource(format!("not a file path: {}", self.path.display()))
            })?;

        std::fs::create_dir_all(&dir)?;
        if !self.path.exists() {
            std::fs::write(&self.path, "")?;
        }

        // Bridge the sync notify callback into async.
        let (notify_tx, mut notify_rx) = mpsc::channel::<()>(16);
        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        return;
                    }
                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n == file_name).unwrap_or(false));
                    if ours {
                        let _ = notify_tx.try_send(());
                    }
                }
                Err(e) => {
                    error!(error = %e, "Position file watcher error");
                }
            },
            notify::Config::default(),
        )
        .map_err(|e| EarshotError::PositionSource(format!("failed to create watcher: {e}")))?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| {
                EarshotError::PositionSource(format!("failed to watch {}: {e}", dir.display()))
            })?;

        info!(path = %self.path.display(), "Watching position file");
        self.publish_current(&feed);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                signal = notify_rx.recv() => {
                    if signal.is_none() {
                        break;
                    }
                    self.publish_current(&feed);
                }
            }
        }

        info!(path = %self.path.display(), "Stopped watching position file");
        Ok(())
    }

    /// Read failures are transient while the game rewrites the file; the
    /// next change is picked up as usual.
    fn publish_current(&self, feed: &PositionFeed) {
        match self.read_once() {
            Ok(Some(record)) => {
                debug!(
                    player = record.player_name.as_deref().unwrap_or("?"),
                    player_index = record.player_index,
                    position = %record.position,
                    "Local position"
                );
                feed.publish(record.position);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read position file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[test]
    fn parses_complete_record() {
        let record = parse_position_file("12.5\n-3.25\n1\n2\nengineer\n").unwrap();
        assert_eq!(record.position, Position::new(12.5, -3.25, 2));
        assert_eq!(record.player_index, 1);
        assert_eq!(record.player_name.as_deref(), Some("engineer"));
    }

    #[test]
    fn tolerates_crlf_and_missing_name() {
        let record = parse_position_file("1\r\n2\r\n3\r\n4\r\n").unwrap();
        assert_eq!(record.position, Position::new(1.0, 2.0, 4));
        assert_eq!(record.player_name, None);
    }

    #[test]
    fn rejects_partial_writes() {
        assert!(parse_position_file("").is_err());
        assert!(parse_position_file("1.0\n2.0\n").is_err());
        let err = parse_position_file("1.0\nnorth\n1\n1\n").unwrap_err();
        assert!(err.to_string().contains("invalid y"));
    }

    #[test]
    fn read_once_handles_missing_and_garbled_files() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = PositionWatcher::new(dir.path().join("fdpa-comm"));
        assert_eq!(watcher.read_once().unwrap(), None);

        std::fs::write(watcher.path(), "1.0\n").unwrap();
        assert_eq!(watcher.read_once().unwrap(), None);

        std::fs::write(watcher.path(), "1.0\n2.0\n1\n1\nme\n").unwrap();
        assert_eq!(
            watcher.read_once().unwrap().map(|r| r.position),
            Some(Position::new(1.0, 2.0, 1))
        );
    }

    #[tokio::test]
    async fn publishes_existing_contents_on_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fdpa-comm");
        std::fs::write(&path, "5\n6\n1\n1\nme\n").unwrap();

        let feed = PositionFeed::default();
        let shutdown = CancellationToken::new();
        let watcher = PositionWatcher::new(path);
        let task = {
            let feed = feed.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { watcher.watch(feed, shutdown).await })
        };

        timeout(Duration::from_secs(5), async {
            while feed.last_known().is_none() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(feed.last_known(), Some(Position::new(5.0, 6.0, 1)));

        shutdown.cancel();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap().unwrap();
    }

    #[tokio::test]
    async fn creates_missing_file_and_publishes_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script-output").join("fdpa-comm");

        let feed = PositionFeed::default();
        let mut rx = feed.subscribe();
        let shutdown = CancellationToken::new();
        let watcher = PositionWatcher::new(path.clone());
        let task = {
            let feed = feed.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { watcher.watch(feed, shutdown).await })
        };

        // Keep rewriting until the watcher is registered and reports it.
        let received = timeout(Duration::from_secs(10), async {
            loop {
                if path.exists() {
                    std::fs::write(&path, "7\n8\n1\n3\nme\n").unwrap();
                }
                if let Ok(Some(position)) = timeout(Duration::from_millis(200), rx.recv()).await {
                    return position;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(received, Position::new(7.0, 8.0, 3));

        shutdown.cancel();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap().unwrap();
    }

    #[test]
    fn read_once_reports_unreadable_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fdpa-comm");
        std::fs::create_dir(&path).unwrap();
        assert!(PositionWatcher::new(path).read_once().is_err());
    }

    #[tokio::test]
    async fn keeps_watching_after_a_failed_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fdpa-comm");
        std::fs::write(&path, "1\n1\n1\n1\nme\n").unwrap();

        let feed = PositionFeed::default();
        let mut rx = feed.subscribe();
        let shutdown = CancellationToken::new();
        let watcher = PositionWatcher::new(path.clone());
        let task = {
            let feed = feed.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { watcher.watch(feed, shutdown).await })
        };
        assert_eq!(
            timeout(Duration::from_secs(5), rx.recv()).await.unwrap(),
            Some(Position::new(1.0, 1.0, 1))
        );

        // A directory in place of the file cannot be read.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!task.is_finished());
        std::fs::remove_dir(&path).unwrap();

        let received = timeout(Duration::from_secs(10), async {
            loop {
                std::fs::write(&path, "4\n5\n1\n2\nme\n").unwrap();
                if let Ok(Some(position)) = timeout(Duration::from_millis(200), rx.recv()).await {
                    if position == Position::new(4.0, 5.0, 2) {
                        return position;
                    }
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(received, Position::new(4.0, 5.0, 2));

        shutdown.cancel();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap().unwrap();
    }
}

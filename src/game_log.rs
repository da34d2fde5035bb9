// Per-game text log
//
// Each game writes `LOG_<timestamp>.txt` with `INFO: ...` and `ERROR: ...`
// entries. Writes go through tokio's async file API behind a shared mutex so
// the session loop never blocks on disk. A verbose session also prints every
// entry to stdout; entries are forwarded to the `log` facade at debug level,
// errors at error level.

use log::{debug, error};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Severity tag written in front of each entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Info,
    Error,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Info => "INFO",
            LogKind::Error => "ERROR",
        }
    }
}

/// Console sink for verbose sessions
type Console = Arc<parking_lot::Mutex<Box<dyn Write + Send>>>;

fn stdout_console(verbose: bool) -> Option<Console> {
    if verbose {
        let out: Box<dyn Write + Send> = Box::new(io::stdout());
        Some(Arc::new(parking_lot::Mutex::new(out)))
    } else {
        None
    }
}

/// Shared handle to the game's log file
#[derive(Clone)]
pub struct GameLog {
    file: Arc<Mutex<Option<File>>>,
    path: Option<PathBuf>,
    console: Option<Console>,
}

impl GameLog {
    /// Creates `<folder>/LOG_%Y_%m_%d_%H_%M_%S.txt`, creating the folder if needed
    pub async fn create<P: AsRef<Path>>(folder: P, verbose: bool) -> Result<Self, String> {
        let folder = folder.as_ref();
        fs::create_dir_all(folder)
            .await
            .map_err(|e| format!("Failed to create log folder '{}': {}", folder.display(), e))?;

        let name = format!("LOG_{}.txt", chrono::Local::now().format("%Y_%m_%d_%H_%M_%S"));
        let path = folder.join(name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| format!("Failed to create log file '{}': {}", path.display(), e))?;

        debug!("Game log: {}", path.display());
        Ok(GameLog {
            file: Arc::new(Mutex::new(Some(file))),
            path: Some(path),
            console: stdout_console(verbose),
        })
    }

    /// Creates a logger without a file; verbose sessions still print to stdout
    pub fn disabled(verbose: bool) -> Self {
        GameLog {
            file: Arc::new(Mutex::new(None)),
            path: None,
            console: stdout_console(verbose),
        }
    }

    /// Mirrors entries to `writer` instead of stdout
    pub fn with_console<W: Write + Send + 'static>(mut self, writer: W) -> Self {
        let out: Box<dyn Write + Send> = Box::new(writer);
        self.console = Some(Arc::new(parking_lot::Mutex::new(out)));
        self
    }

    /// Path of the log file, if one is being written
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn info(&self, message: &str) {
        self.write(LogKind::Info, message).await;
    }

    pub async fn error(&self, message: &str) {
        self.write(LogKind::Error, message).await;
    }

    async fn write(&self, kind: LogKind, message: &str) {
        let line = format!("{}: {}", kind.as_str(), message);

        match kind {
            LogKind::Error => error!("{}", line),
            LogKind::Info => debug!("{}", line),
        }

        if let Some(console) = &self.console {
            let mut out = console.lock();
            if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
                error!("Failed to print game log entry: {}", e);
            }
        }

        let mut file_guard = self.file.lock().await;
        if let Some(file) = file_guard.as_mut() {
            let line_with_newline = format!("{}\n", line);
            if let Err(e) = file.write_all(line_with_newline.as_bytes()).await {
                error!("Failed to write game log entry: {}", e);
            } else if let Err(e) = file.flush().await {
                error!("Failed to flush game log: {}", e);
            }
        }
    }

    /// Flushes and closes the file; later entries only reach the `log` facade
    pub async fn close(&self) {
        let mut file_guard = self.file.lock().await;
        if let Some(mut file) = file_guard.take() {
            if let Err(e) = file.flush().await {
                error!("Failed to flush game log: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_file_receives_tagged_lines() {
        let folder = std::env::temp_dir().join(format!("painter_log_test_{}", std::process::id()));
        let log = GameLog::create(&folder, false).await.unwrap();
        log.info("Starting simulation ...").await;
        log.error("boom").await;
        log.close().await;
        // entries after close are not written
        log.info("ignored").await;

        let path = log.path().unwrap().to_path_buf();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("LOG_") && name.ends_with(".txt"));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "INFO: Starting simulation ...\nERROR: boom\n");
        let _ = std::fs::remove_dir_all(&folder);
    }

    /// Writer sharing its buffer with the test
    #[derive(Clone, Default)]
    struct Captured(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_verbose_log_mirrors_entries_to_console() {
        let captured = Captured::default();
        let log = GameLog::disabled(true).with_console(captured.clone());
        log.info("Starting simulation ...").await;
        log.error("agent action took more than 1.00 seconds").await;

        let printed = String::from_utf8(captured.0.lock().clone()).unwrap();
        assert_eq!(
            printed,
            "INFO: Starting simulation ...\nERROR: agent action took more than 1.00 seconds\n"
        );
    }

    #[test]
    fn test_console_only_when_verbose() {
        assert!(GameLog::disabled(false).console.is_none());
        assert!(GameLog::disabled(true).console.is_some());
    }

    #[tokio::test]
    async fn test_disabled_log_has_no_file() {
        let log = GameLog::disabled(true);
        log.info("nothing to see").await;
        assert!(log.path().is_none());
    }
}

pub mod commands;
pub mod inference;
pub mod summary_core;

use std::sync::Mutex;

use inference::{CompressionBackend, InferenceClient};
use summary_core::{CharacterInfo, ChatDatabase, ChatSession};

/// Async mutex for state that is locked around `.await` points.
pub type TokioMutex<T> = tokio::sync::Mutex<T>;

/// Everything the commands need for one running chat.
pub struct AppState {
    pub session: TokioMutex<ChatSession>,
    pub db: Mutex<ChatDatabase>,
    pub backend: Box<dyn CompressionBackend>,
}

impl AppState {
    /// Open the database, restore the saved conversation, and build the
    /// compression client from `_models/config.yaml`.
    pub fn initialize(character: CharacterInfo) -> Result<Self, String> {
        let db_path = resolve_db_path();
        let db = ChatDatabase::open(&db_path).map_err(|e| format!("{e}"))?;
        tracing::info!(path = %db_path, "chat database opened");

        let session = ChatSession::restore(&db, character).map_err(|e| format!("{e}"))?;

        let cwd = std::env::current_dir().unwrap_or_default();
        let config = inference::config::find_config_path(&cwd)
            .and_then(|path| inference::config::load_models_config(&path))
            .map_err(|e| format!("{e}"))?;
        let client = InferenceClient::from_config(&config).map_err(|e| format!("{e}"))?;
        tracing::info!(
            base_url = client.base_url(),
            model = client.model_name(),
            "compression backend ready"
        );

        Ok(Self {
            session: TokioMutex::new(session),
            db: Mutex::new(db),
            backend: Box::new(client),
        })
    }
}

/// Return the platform-standard data directory for the archive.
///
/// - macOS: `~/Library/Application Support/com.roleplay-archive.app/`
/// - Windows: `{FOLDERID_RoamingAppData}\com.roleplay-archive.app\`
/// - Linux: `$XDG_DATA_HOME/com.roleplay-archive.app/` (fallback `~/.local/share/...`)
///
/// Falls back to `~/.roleplay-archive/` only if none of the above can be resolved.
pub fn data_dir() -> std::path::PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("com.roleplay-archive.app");
    }
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".roleplay-archive")
}

/// Initialize the tracing subscriber, writing structured logs to the data directory.
///
/// On each startup:
/// 1. Rotates existing logs (archive.log → archive.log.1 → .2 → .3, keeps last 3).
/// 2. Opens a fresh archive.log with a line-flushing writer.
/// 3. Logs a startup banner with the data directory path.
///
/// Fails if the log file cannot be opened or a subscriber is already installed.
pub fn init_tracing() -> Result<(), String> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = data_dir();
    let _ = std::fs::create_dir_all(&log_dir);

    let log_path = log_dir.join("archive.log");
    rotate_log_file(&log_path, 3);

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| format!("failed to open {}: {e}", log_path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("roleplay_archive=info,warn"));

    fmt::fmt()
        .with_env_filter(filter)
        .with_writer(FlushingWriter::new(log_file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .try_init()
        .map_err(|e| format!("failed to install tracing subscriber: {e}"))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %log_dir.display(),
        log_file = %log_path.display(),
        pid = std::process::id(),
        "=== roleplay archive starting ==="
    );
    Ok(())
}

/// Rotate log files: `archive.log` → `archive.log.1` → `.2` → … → `.{keep}`.
///
/// Oldest file beyond `keep` is deleted. Missing files in the chain are skipped.
fn rotate_log_file(base_path: &std::path::Path, keep: u32) {
    let oldest = format!("{}.{keep}", base_path.display());
    let _ = std::fs::remove_file(&oldest);

    for i in (1..keep).rev() {
        let from = format!("{}.{i}", base_path.display());
        let to = format!("{}.{}", base_path.display(), i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    if base_path.exists() {
        let to = format!("{}.1", base_path.display());
        let _ = std::fs::rename(base_path, &to);
    }
}

/// A writer that wraps `std::fs::File` and flushes after every write, so a
/// crash never loses the lines leading up to it.
#[derive(Clone)]
struct FlushingWriter {
    file: std::sync::Arc<Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: std::sync::Arc::new(Mutex::new(file)),
        }
    }
}

impl std::io::Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        let n = std::io::Write::write(&mut *f, buf)?;
        std::io::Write::flush(&mut *f)?;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        std::io::Write::flush(&mut *f)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Resolve the path for the chat SQLite database, creating the data
/// directory if needed.
pub fn resolve_db_path() -> String {
    let dir = data_dir();
    if !dir.exists() {
        let _ = std::fs::create_dir_all(&dir);
    }
    dir.join("chat.db").to_string_lossy().into_owned()
}

//! Git-synced directory store
//!
//! Layout is the one used by `pass`: every item is a gpg-encrypted file
//! under the root, and dot-entries (`.git`, `.gpg-id`, ...) are metadata.

use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::{self, File};
use tokio::sync::{watch, Mutex};
use walkdir::{DirEntry, WalkDir};

use super::path::{clean_root, resolve_item};
use super::traits::{ItemReader, ItemWriter, PassStore, StoreError, StoreResult, StoreState};
use crate::exec::{CommandLine, CommandOutput, CommandRunner, SystemRunner};
use crate::types::CancellationToken;

/// How often the background task pulls when no interval is configured
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// `$PASSWORD_STORE_DIR`, else `~/.password-store`
pub fn default_store_path() -> PathBuf {
    if let Some(dir) = env::var_os("PASSWORD_STORE_DIR").filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    let home = env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    home.join(".password-store")
}

/// Construction parameters for a [`DiskStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub root: PathBuf,
    pub sync_interval: Duration,
    pub git_program: String,
    pub gpg_program: String,
}

impl StoreOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sync_interval: DEFAULT_SYNC_INTERVAL,
            git_program: "git".to_string(),
            gpg_program: "gpg".to_string(),
        }
    }

    /// Options for the store at [`default_store_path`]
    pub fn from_env() -> Self {
        Self::new(default_store_path())
    }

    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    pub fn with_git_program(mut self, program: impl Into<String>) -> Self {
        self.git_program = program.into();
        self
    }

    pub fn with_gpg_program(mut self, program: impl Into<String>) -> Self {
        self.gpg_program = program.into();
        self
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Password store on local disk, kept in sync with its git remote
///
/// Cloning is cheap and every clone refers to the same store, lock and
/// background task.
///
/// All git invocations, scheduled or ad hoc, go through one async mutex, so
/// at most one `git` process touches the working tree at a time. Reads and
/// writes of items are not serialized against git; a caller may observe the
/// tree mid-pull.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use webpass_core::store::{DiskStore, PassStore};
/// use webpass_core::CancellationToken;
///
/// # async fn example() -> webpass_core::store::StoreResult<()> {
/// let store = DiskStore::new("/home/me/.password-store", Duration::from_secs(300));
/// let lifecycle = CancellationToken::new();
/// store.init(lifecycle.clone()).await?;
///
/// for item in store.list().await? {
///     println!("{}", item);
/// }
///
/// lifecycle.cancel();
/// store.stopped().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DiskStore {
    inner: Arc<DiskStoreInner>,
}

struct DiskStoreInner {
    root: PathBuf,
    sync_interval: Duration,
    git_program: String,
    gpg_program: String,
    runner: Arc<dyn CommandRunner>,
    git_lock: Mutex<()>,
    state: watch::Sender<StoreState>,
}

impl DiskStore {
    /// Create a store that runs real `git` and `gpg` processes
    pub fn new(root: impl Into<PathBuf>, sync_interval: Duration) -> Self {
        Self::with_options(StoreOptions::new(root).with_sync_interval(sync_interval))
    }

    /// Create the store at [`default_store_path`] with the default interval
    pub fn from_env() -> Self {
        Self::with_options(StoreOptions::from_env())
    }

    pub fn with_options(options: StoreOptions) -> Self {
        Self::with_runner(options, Arc::new(SystemRunner::new()))
    }

    /// Create a store whose external commands go through `runner`
    pub fn with_runner(options: StoreOptions, runner: Arc<dyn CommandRunner>) -> Self {
        let (state, _) = watch::channel(StoreState::Uninitialized);
        Self {
            inner: Arc::new(DiskStoreInner {
                root: clean_root(&options.root),
                sync_interval: options.sync_interval,
                git_program: options.git_program,
                gpg_program: options.gpg_program,
                runner,
                git_lock: Mutex::new(()),
                state,
            }),
        }
    }

    pub fn sync_interval(&self) -> Duration {
        self.inner.sync_interval
    }

    pub fn state(&self) -> StoreState {
        *self.inner.state.borrow()
    }

    /// Wait until the background task has exited
    ///
    /// Returns immediately if the store was never initialized.
    pub async fn stopped(&self) {
        let mut state = self.inner.state.subscribe();
        let _ = state
            .wait_for(|s| *s != StoreState::Running)
            .await;
    }

    /// Run `git -C <root> <args>` under the store's git lock
    pub async fn run_git(&self, args: &[&str]) -> StoreResult<CommandOutput> {
        let command = CommandLine::new(self.inner.git_program.as_str())
            .arg("-C")
            .arg(self.inner.root.to_string_lossy())
            .args(args.iter().copied());

        let _guard = self.inner.git_lock.lock().await;
        Ok(self.inner.runner.run(&command, "").await?)
    }

    fn item_path(&self, item: &str) -> StoreResult<PathBuf> {
        resolve_item(&self.inner.root, item)
    }

    async fn run_sync_loop(&self, lifecycle: CancellationToken) {
        let root = self.inner.root.display().to_string();
        tracing::info!(root = %root, interval = ?self.inner.sync_interval, "store sync loop started");

        while !lifecycle.is_cancelled() {
            if let Err(e) = self.sync().await {
                tracing::warn!(root = %root, error = %e, "store sync failed");
            }

            tokio::select! {
                biased;
                _ = lifecycle.cancelled() => break,
                _ = tokio::time::sleep(self.inner.sync_interval) => {}
            }
        }

        tracing::info!(root = %root, "store sync loop stopped");
    }
}

impl std::fmt::Debug for DiskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskStore")
            .field("root", &self.inner.root)
            .field("sync_interval", &self.inner.sync_interval)
            .field("state", &self.state())
            .finish()
    }
}

#[async_trait]
impl PassStore for DiskStore {
    async fn init(&self, lifecycle: CancellationToken) -> StoreResult<()> {
        let started = self.inner.state.send_if_modified(|state| {
            if *state == StoreState::Uninitialized {
                *state = StoreState::Running;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(StoreError::AlreadyInitialized);
        }

        let store = self.clone();
        tokio::spawn(async move {
            store.run_sync_loop(lifecycle).await;
            store.inner.state.send_replace(StoreState::Stopped);
        });
        Ok(())
    }

    async fn sync(&self) -> StoreResult<()> {
        self.run_git(&["pull"]).await.map(|_| ())
    }

    fn path(&self) -> &Path {
        &self.inner.root
    }

    async fn exists(&self, item: &str) -> bool {
        match self.item_path(item) {
            Ok(path) => fs::metadata(&path).await.is_ok(),
            Err(_) => false,
        }
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        let root = self.inner.root.clone();
        tokio::task::spawn_blocking(move || list_items(&root))
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
    }

    async fn open(&self, item: &str) -> StoreResult<ItemReader> {
        let path = self.item_path(item)?;
        match File::open(&path).await {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(item.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn decrypt(&self, item: &str, passphrase: &str) -> StoreResult<String> {
        let path = self.item_path(item)?;
        if let Err(e) = fs::metadata(&path).await {
            return Err(match e.kind() {
                io::ErrorKind::NotFound => StoreError::NotFound(item.to_string()),
                _ => e.into(),
            });
        }

        let command = CommandLine::new(self.inner.gpg_program.as_str())
            .args(["--pinentry-mode", "loopback", "--passphrase-fd", "0", "-d"])
            .arg(path.to_string_lossy());

        match self.inner.runner.run(&command, passphrase).await {
            Ok(output) => Ok(output.stdout),
            Err(e) => {
                tracing::debug!(
                    item,
                    stderr = e.stderr().unwrap_or_default(),
                    "decryption failed"
                );
                Err(e.into())
            }
        }
    }

    async fn create(&self, item: &str) -> StoreResult<ItemWriter> {
        let path = self.item_path(item)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let file = File::create(&path).await?;
        Ok(Box::new(file))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    // The root itself may be a dot-directory (`~/.password-store`)
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

fn list_items(root: &Path) -> StoreResult<Vec<String>> {
    let mut items = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry));

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_dir() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let item = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        items.push(item);
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{ExecError, RecordingRunner};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn store_at(root: &Path, runner: Arc<RecordingRunner>) -> DiskStore {
        DiskStore::with_runner(
            StoreOptions::new(root).with_sync_interval(Duration::from_secs(60)),
            runner,
        )
    }

    fn write(root: &Path, item: &str, contents: &str) {
        let path = root.join(item);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[tokio::test]
    async fn test_existing_item_is_visible() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a/b.gpg", "ciphertext");
        let store = store_at(dir.path(), Arc::new(RecordingRunner::new()));

        assert!(store.exists("a/b.gpg").await);
        assert!(store.list().await.unwrap().contains(&"a/b.gpg".to_string()));

        let mut reader = store.open("a/b.gpg").await.unwrap();
        let mut contents = String::new();
        reader.read_to_string(&mut contents).await.unwrap();
        assert_eq!(contents, "ciphertext");
    }

    #[tokio::test]
    async fn test_traversal_is_rejected_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let store = store_at(&dir.path().join("store"), runner.clone());
        let item = "../../etc/passwd";

        assert!(!store.exists(item).await);
        assert!(matches!(store.open(item).await, Err(StoreError::InvalidPath(_))));
        assert!(matches!(store.create(item).await, Err(StoreError::InvalidPath(_))));
        assert!(matches!(
            store.decrypt(item, "pw").await,
            Err(StoreError::InvalidPath(_))
        ));

        // Nothing was created, not even the store root, and gpg never ran
        assert!(!dir.path().join("store").exists());
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_open_missing_item_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(dir.path(), Arc::new(RecordingRunner::new()));

        assert!(!store.exists("missing.gpg").await);
        assert!(matches!(
            store.open("missing.gpg").await,
            Err(StoreError::NotFound(ref item)) if item == "missing.gpg"
        ));
    }

    #[tokio::test]
    async fn test_list_skips_hidden_entries_and_subtrees() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join(".password-store");
        write(&root, ".gpg-id", "ABCDEF");
        write(&root, ".git/config", "[core]");
        write(&root, ".archive/old.gpg", "x");
        write(&root, "a/.draft.gpg", "x");
        write(&root, "a/b.gpg", "x");
        write(&root, "c.gpg", "x");
        write(&root, "d/e/f.gpg", "x");
        std::fs::create_dir_all(root.join("empty")).unwrap();

        let store = store_at(&root, Arc::new(RecordingRunner::new()));
        let items = store.list().await.unwrap();

        assert_eq!(items, vec!["a/b.gpg", "c.gpg", "d/e/f.gpg"]);
    }

    #[tokio::test]
    async fn test_list_missing_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(&dir.path().join("nope"), Arc::new(RecordingRunner::new()));
        assert!(matches!(store.list().await, Err(StoreError::Io(_))));
    }

    #[tokio::test]
    async fn test_create_writes_new_item() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(dir.path(), Arc::new(RecordingRunner::new()));

        let mut writer = store.create("web/example.com.gpg").await.unwrap();
        writer.write_all(b"ciphertext").await.unwrap();
        writer.shutdown().await.unwrap();
        drop(writer);

        assert_eq!(
            std::fs::read_to_string(dir.path().join("web/example.com.gpg")).unwrap(),
            "ciphertext"
        );
    }

    #[tokio::test]
    async fn test_create_truncates_existing_item() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "x.gpg", "a much longer previous value");
        let store = store_at(dir.path(), Arc::new(RecordingRunner::new()));

        let mut writer = store.create("x.gpg").await.unwrap();
        writer.write_all(b"new").await.unwrap();
        writer.shutdown().await.unwrap();
        drop(writer);

        assert_eq!(std::fs::read_to_string(dir.path().join("x.gpg")).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_decrypt_pipes_passphrase_to_gpg() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a/b.gpg", "ciphertext");
        let runner = Arc::new(RecordingRunner::with_stdout("hunter2\nuser: me\n"));
        let store = store_at(dir.path(), runner.clone());

        let plaintext = store.decrypt("a/b.gpg", "correct horse").await.unwrap();
        assert_eq!(plaintext, "hunter2\nuser: me\n");

        let call = &runner.invocations()[0];
        assert_eq!(call.command.program, "gpg");
        assert_eq!(call.stdin, "correct horse");
        assert!(call.command.args.windows(2).any(|w| w == ["--pinentry-mode", "loopback"]));
        let target = call.command.args.last().unwrap();
        assert_eq!(Path::new(target), store.path().join("a/b.gpg"));
    }

    #[tokio::test]
    async fn test_decrypt_missing_item_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let store = store_at(dir.path(), runner.clone());

        assert!(matches!(
            store.decrypt("missing.gpg", "pw").await,
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_decrypt_failure_keeps_stderr() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "x.gpg", "ciphertext");
        let runner = Arc::new(RecordingRunner::failing(2, "gpg: decryption failed: Bad passphrase"));
        let store = store_at(dir.path(), runner);

        match store.decrypt("x.gpg", "wrong").await {
            Err(StoreError::Command(e)) => {
                assert_eq!(e.stderr(), Some("gpg: decryption failed: Bad passphrase"));
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_sync_pulls_in_store_root() {
        let runner = Arc::new(RecordingRunner::new());
        let store = store_at(Path::new("/data/store"), runner.clone());

        store.sync().await.unwrap();

        let call = &runner.invocations()[0];
        assert_eq!(call.command.program, "git");
        assert_eq!(call.command.args, vec!["-C", "/data/store", "pull"]);
    }

    #[tokio::test]
    async fn test_sync_returns_command_failure() {
        let runner = Arc::new(RecordingRunner::failing(1, "fatal: unable to access remote"));
        let store = store_at(Path::new("/data/store"), runner);

        assert!(matches!(
            store.sync().await,
            Err(StoreError::Command(ExecError::Exited { code: Some(1), .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_git_operations_never_overlap() {
        let runner = Arc::new(RecordingRunner::new().with_delay(Duration::from_secs(1)));
        let store = store_at(Path::new("/data/store"), runner.clone());

        let (a, b, c, d) = tokio::join!(
            store.sync(),
            store.run_git(&["status"]),
            store.sync(),
            store.run_git(&["log", "-1"]),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();
        d.unwrap();

        let mut calls = runner.invocations();
        assert_eq!(calls.len(), 4);
        calls.sort_by_key(|c| c.started);
        for pair in calls.windows(2) {
            assert!(
                pair[1].started >= pair[0].finished,
                "{} overlapped {}",
                pair[1].command,
                pair[0].command
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_syncs_immediately_then_on_interval() {
        let runner = Arc::new(RecordingRunner::new());
        let store = store_at(Path::new("/data/store"), runner.clone());
        let lifecycle = CancellationToken::new();

        store.init(lifecycle.clone()).await.unwrap();
        assert_eq!(store.state(), StoreState::Running);

        // t=0, t=60, t=120
        tokio::time::sleep(Duration::from_secs(125)).await;
        assert_eq!(runner.calls_to("git"), 3);

        lifecycle.cancel();
        store.stopped().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_sync_loop() {
        let runner = Arc::new(RecordingRunner::new());
        let store = store_at(Path::new("/data/store"), runner.clone());
        let lifecycle = CancellationToken::new();

        store.init(lifecycle.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runner.call_count(), 1);

        lifecycle.cancel();
        store.stopped().await;
        assert_eq!(store.state(), StoreState::Stopped);

        // Several intervals later nothing else has run
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_failures_do_not_stop_loop() {
        let runner = Arc::new(RecordingRunner::failing(128, "fatal: no remote"));
        let store = store_at(Path::new("/data/store"), runner.clone());
        let lifecycle = CancellationToken::new();

        store.init(lifecycle.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(125)).await;

        assert_eq!(runner.call_count(), 3);
        assert_eq!(store.state(), StoreState::Running);
        lifecycle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_at_most_once() {
        let store = store_at(Path::new("/data/store"), Arc::new(RecordingRunner::new()));
        let lifecycle = CancellationToken::new();

        store.init(lifecycle.clone()).await.unwrap();
        assert!(matches!(
            store.init(lifecycle.clone()).await,
            Err(StoreError::AlreadyInitialized)
        ));

        // A stopped store stays stopped
        lifecycle.cancel();
        store.stopped().await;
        assert!(matches!(
            store.init(CancellationToken::new()).await,
            Err(StoreError::AlreadyInitialized)
        ));
        assert_eq!(store.state(), StoreState::Stopped);
    }

    #[tokio::test]
    async fn test_stopped_returns_when_never_initialized() {
        let store = store_at(Path::new("/data/store"), Arc::new(RecordingRunner::new()));
        store.stopped().await;
        assert_eq!(store.state(), StoreState::Uninitialized);
    }

    #[test]
    fn test_default_store_path_prefers_env() {
        // Only this test touches PASSWORD_STORE_DIR
        std::env::set_var("PASSWORD_STORE_DIR", "/srv/pass");
        assert_eq!(default_store_path(), PathBuf::from("/srv/pass"));

        std::env::remove_var("PASSWORD_STORE_DIR");
        assert!(default_store_path().ends_with(".password-store"));
    }
}

//! Reassignment artifacts
//!
//! The persisted plan/backup pair and the lifecycle position derived from
//! it. Each process run performs one transition; this store is what lets
//! those runs compose into a recoverable cycle. The backup is written
//! before the plan and removed if the plan write fails, so a plan never
//! exists without its rollback path.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Artifact store errors
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Artifact I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No reassignment plan artifact present")]
    NoPlan,

    #[error("No backup artifact present")]
    NoBackup,

    #[error("Unrecognized lifecycle state {0:?} in state file")]
    CorruptState(String),

    #[error("Another reassignment run holds the lock ({owner})")]
    Locked { owner: String },
}

pub type Result<T> = std::result::Result<T, ArtifactError>;

/// Where the lifecycle currently stands, persisted between one-shot runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No live plan; generation is allowed
    Idle,
    /// Plan and backup exist, nothing executed yet
    Generated,
    /// Plan executed, movement possibly still in flight
    Applied,
    /// Every partition of an applied plan reported complete
    Completed,
    /// Backup executed; the plan/backup pair is consumed
    RolledBack,
}

impl LifecycleState {
    fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Generated => "generated",
            LifecycleState::Applied => "applied",
            LifecycleState::Completed => "completed",
            LifecycleState::RolledBack => "rolled-back",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(LifecycleState::Idle),
            "generated" => Some(LifecycleState::Generated),
            "applied" => Some(LifecycleState::Applied),
            "completed" => Some(LifecycleState::Completed),
            "rolled-back" => Some(LifecycleState::RolledBack),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const PLAN_FILE: &str = "reassignment.json";
const BACKUP_FILE: &str = "reassignment-backup.json";
const STATE_FILE: &str = "state";
const LOCK_FILE: &str = "lock";
const CONSUMED_SUFFIX: &str = "consumed";

/// Filesystem store for the plan/backup pair, the persisted lifecycle
/// state and the run lock. The lifecycle controller is its only client.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Open (creating if needed) the artifact directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn plan_path(&self) -> PathBuf {
        self.dir.join(PLAN_FILE)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.dir.join(BACKUP_FILE)
    }

    /// Current lifecycle state; an absent state file means `Idle`.
    pub fn state(&self) -> Result<LifecycleState> {
        let path = self.dir.join(STATE_FILE);
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let trimmed = contents.trim();
                LifecycleState::parse(trimmed)
                    .ok_or_else(|| ArtifactError::CorruptState(trimmed.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(LifecycleState::Idle),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_state(&self, state: LifecycleState) -> Result<()> {
        write_atomic(&self.dir.join(STATE_FILE), state.as_str())?;
        debug!(state = %state, "Lifecycle state persisted");
        Ok(())
    }

    /// Persist a new plan/backup pair and move to `Generated`.
    ///
    /// The backup goes first; if the plan write fails the backup is removed
    /// again and the store is left in `Idle` with no partial pair.
    pub fn store_pair(&self, plan: &str, backup: &str) -> Result<()> {
        self.discard_consumed();

        write_atomic(&self.backup_path(), backup)?;
        if let Err(e) = write_atomic(&self.plan_path(), plan) {
            let _ = std::fs::remove_file(self.backup_path());
            let _ = std::fs::remove_file(self.dir.join(STATE_FILE));
            return Err(e.into());
        }

        self.set_state(LifecycleState::Generated)?;
        Ok(())
    }

    pub fn load_plan(&self) -> Result<String> {
        read_artifact(&self.plan_path()).ok_or(ArtifactError::NoPlan)
    }

    pub fn load_backup(&self) -> Result<String> {
        read_artifact(&self.backup_path()).ok_or(ArtifactError::NoBackup)
    }

    /// Mark the pair consumed after a successful rollback; a consumed pair
    /// is kept for the operator's records but can never be loaded again.
    pub fn mark_consumed(&self) -> Result<()> {
        for path in [self.plan_path(), self.backup_path()] {
            let consumed = consumed_path(&path);
            if let Err(e) = std::fs::rename(&path, &consumed) {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Could not archive consumed artifact"
                );
            }
        }
        self.set_state(LifecycleState::RolledBack)
    }

    /// Take the run lock. Fails fast when another run holds it; a stale
    /// lock is reported with its owning pid, never stolen.
    pub fn lock(&self) -> Result<RunLock> {
        let path = self.dir.join(LOCK_FILE);
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(mut file) => {
                let _ = write!(file, "{}", std::process::id());
                Ok(RunLock { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let owner = std::fs::read_to_string(&path)
                    .map(|pid| format!("pid {}", pid.trim()))
                    .unwrap_or_else(|_| "unknown owner".to_string());
                Err(ArtifactError::Locked { owner })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn discard_consumed(&self) {
        for path in [self.plan_path(), self.backup_path()] {
            let _ = std::fs::remove_file(consumed_path(&path));
        }
    }
}

/// Held for the duration of a state-changing transition; releases the lock
/// file on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Could not release run lock");
        }
    }
}

fn consumed_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".");
    os.push(CONSUMED_SUFFIX);
    PathBuf::from(os)
}

fn read_artifact(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok()
}

/// Write via a temp file in the same directory plus rename, so a crash
/// mid-write never leaves a half-written artifact behind.
fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, contents)?;
    match std::fs::rename(&tmp, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            let _ = std::fs::remove_file(&tmp);
            Err(e)
        }
    }
}

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Exclusive lock on the data directory, released when dropped
pub struct InstanceLock {
    path: PathBuf,
    #[cfg(unix)]
    _lock: nix::fcntl::Flock<File>,
    #[cfg(not(unix))]
    _file: File,
}

impl InstanceLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .wrap_err_with(|| format!("Failed to open lock file {}", path.display()))
}

/// Take the single-instance lock without blocking. Fails if another prunarr holds it.
#[cfg(unix)]
pub fn acquire(path: &Path) -> Result<InstanceLock> {
    use nix::fcntl::{Flock, FlockArg};

    let file = open_lock_file(path)?;
    let lock = Flock::lock(file, FlockArg::LockExclusiveNonblock).map_err(|(_, errno)| {
        eyre!(
            "Another prunarr instance is already running (lock {} is held: {})",
            path.display(),
            errno
        )
    })?;
    debug!(path = %path.display(), "Instance lock acquired");
    Ok(InstanceLock {
        path: path.to_path_buf(),
        _lock: lock,
    })
}

#[cfg(not(unix))]
pub fn acquire(path: &Path) -> Result<InstanceLock> {
    let file = open_lock_file(path)?;
    debug!(path = %path.display(), "Instance locking is only enforced on unix");
    Ok(InstanceLock {
        path: path.to_path_buf(),
        _file: file,
    })
}

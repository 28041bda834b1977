use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Periodically evicts stored scans and result images older than the
/// configured TTL; without this the upload directory grows without bound.
pub fn spawn_sweeper(dir: PathBuf, ttl: Duration, interval: Duration) {
    actix_web::rt::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match sweep(&dir, ttl) {
                Ok(removed) if removed > 0 => {
                    debug!("retention sweep removed {} expired scan file(s)", removed)
                }
                Ok(_) => {}
                Err(e) => warn!("retention sweep failed: {}", e),
            }
        }
    });
}

/// Removes regular files in `dir` whose modification time is at least
/// `ttl` in the past. Returns how many were removed.
pub fn sweep(dir: &Path, ttl: Duration) -> std::io::Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let now = SystemTime::now();
    let mut removed = 0;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }

        let expired = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .map(|age| age >= ttl)
            .unwrap_or(false);

        if expired {
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!("failed to remove expired file {:?}: {}", entry.path(), e),
            }
        }
    }

    Ok(removed)
}

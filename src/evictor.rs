use crate::model::{EvictionTally, FileCandidate};
use std::fs;
use std::io::ErrorKind;
use tracing::{debug, warn};

/// Deletes `candidates` in order. Per-file failures are logged and counted,
/// never propagated. In dry-run nothing is touched and every candidate is
/// counted as a would-be deletion at its scanned size.
pub fn evict(candidates: Vec<FileCandidate>, dry_run: bool) -> EvictionTally {
    let mut tally = EvictionTally::default();

    for candidate in candidates {
        let path = candidate.path;

        if dry_run {
            debug!(path = %path.display(), bytes = candidate.size, "would delete");
            tally.deleted += 1;
            tally.bytes += candidate.size;
            continue;
        }

        // Size as it is right before removal, not as it was at scan time.
        let size = match fs::symlink_metadata(&path) {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "already gone");
                tally.skipped += 1;
                continue;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot stat, not deleting");
                tally.failed += 1;
                continue;
            }
        };

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), bytes = size, "deleted");
                tally.deleted += 1;
                tally.bytes += size;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "already gone");
                tally.skipped += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "delete failed");
                tally.failed += 1;
            }
        }
    }

    tally
}

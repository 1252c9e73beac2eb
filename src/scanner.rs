use crate::model::FileCandidate;
use crate::protect::ProtectList;
use jwalk::{Parallelism, WalkDir};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Regular files under `directory` older than `retention`, oldest first,
/// at most `batch_size` of them.
///
/// A missing directory yields nothing. Entries that cannot be listed or
/// stat'd are skipped, the walk keeps going.
pub fn scan(
    directory: &Path,
    retention: Duration,
    batch_size: usize,
    protect: &ProtectList,
) -> Vec<FileCandidate> {
    scan_at(directory, retention, batch_size, protect, SystemTime::now())
}

/// [`scan`] against a fixed clock.
pub fn scan_at(
    directory: &Path,
    retention: Duration,
    batch_size: usize,
    protect: &ProtectList,
    now: SystemTime,
) -> Vec<FileCandidate> {
    if !directory.is_dir() {
        if directory.exists() {
            warn!(dir = %directory.display(), "not a directory, skipping");
        } else {
            warn!(dir = %directory.display(), "directory does not exist, skipping");
        }
        return vec![];
    }

    // Walk the canonical form so entry paths line up with the protect list.
    let root = match directory.canonicalize() {
        Ok(root) => root,
        Err(e) => {
            warn!(dir = %directory.display(), error = %e, "cannot resolve directory, skipping");
            return vec![];
        }
    };
    if protect.is_protected(&root) {
        debug!(dir = %root.display(), "directory is protected, skipping");
        return vec![];
    }

    let mut candidates = Vec::new();

    // Serial walk; the run is strictly sequential. Protected entries are
    // pruned before the walker descends into them.
    let prune = protect.clone();
    let walker = WalkDir::new(&root)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(Parallelism::Serial)
        .process_read_dir(move |_, _, _, children| {
            children.retain(|child| match child {
                Ok(entry) => {
                    let path = entry.path();
                    let keep = !prune.is_protected(&path);
                    if !keep {
                        debug!(path = %path.display(), "protected, skipping");
                    }
                    keep
                }
                Err(_) => true,
            });
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %root.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };

        // Symlinks report their own type here, so links to files are skipped too.
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot stat, skipping");
                continue;
            }
        };
        let Ok(modified) = metadata.modified() else {
            warn!(path = %path.display(), "no modification time, skipping");
            continue;
        };

        if is_expired(modified, retention, now) {
            candidates.push(FileCandidate {
                path,
                modified,
                size: metadata.len(),
            });
        }
    }

    candidates.sort_by(|a, b| {
        a.modified
            .cmp(&b.modified)
            .then_with(|| a.path.cmp(&b.path))
    });
    candidates.truncate(batch_size);
    candidates
}

/// Strictly older than `retention`. Files stamped in the future never qualify.
fn is_expired(modified: SystemTime, retention: Duration, now: SystemTime) -> bool {
    now.duration_since(modified)
        .is_ok_and(|age| age > retention)
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(unix)]
    use crate::test_support::set_mode;
    use crate::test_support::{hours, write_aged};
    use anyhow::Result;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn scan_non_existent_path() {
        let path = PathBuf::from("/path/to/non/existent/directory/diskreap_scan_test_12345");
        let items = scan(&path, hours(1), 10, &ProtectList::default());
        assert!(items.is_empty());
    }

    #[test]
    fn scan_file_instead_of_directory() -> Result<()> {
        let dir = tempdir()?;
        let file = dir.path().join("plain.log");
        write_aged(&file, 10, hours(5))?;

        assert!(scan(&file, hours(1), 10, &ProtectList::default()).is_empty());
        Ok(())
    }

    #[test]
    fn scan_orders_oldest_first_and_skips_recent() -> Result<()> {
        let dir = tempdir()?;
        let root = dir.path();

        write_aged(&root.join("c.log"), 30, hours(2))?;
        write_aged(&root.join("a.log"), 10, hours(10))?;
        write_aged(&root.join("nested/deeper/b.log"), 20, hours(5))?;
        write_aged(&root.join("fresh.log"), 40, Duration::from_secs(60))?;
        write_aged(&root.join(".hidden"), 50, hours(3))?;

        let items = scan(root, hours(1), 10, &ProtectList::default());
        let names: Vec<_> = items
            .iter()
            .map(|i| i.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a.log", "b.log", ".hidden", "c.log"]);
        assert_eq!(items[0].size, 10);
        assert_eq!(items[1].size, 20);
        Ok(())
    }

    #[test]
    fn scan_truncates_to_batch_size() -> Result<()> {
        let dir = tempdir()?;
        for i in 0..5u64 {
            write_aged(&dir.path().join(format!("f{i}")), 1, hours(10 - i))?;
        }

        let items = scan(dir.path(), hours(1), 2, &ProtectList::default());

        assert_eq!(items.len(), 2);
        assert!(items[0].path.ends_with("f0"));
        assert!(items[1].path.ends_with("f1"));
        Ok(())
    }

    #[test]
    fn scan_breaks_ties_by_path() -> Result<()> {
        let dir = tempdir()?;
        let stamp = SystemTime::now() - hours(4);
        for name in ["zeta", "alpha", "mid"] {
            let path = dir.path().join(name);
            fs::write(&path, b"x")?;
            fs::File::options().write(true).open(&path)?.set_modified(stamp)?;
        }

        let items = scan(dir.path(), hours(1), 10, &ProtectList::default());
        let names: Vec<_> = items
            .iter()
            .map(|i| i.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
        Ok(())
    }

    #[test]
    fn retention_boundary_is_exclusive() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("edge.dat");
        write_aged(&path, 1, hours(2))?;
        let modified = fs::metadata(&path)?.modified()?;
        let retention = hours(1);
        let protect = ProtectList::default();

        let exact = scan_at(dir.path(), retention, 10, &protect, modified + retention);
        assert!(exact.is_empty());

        let later = modified + retention + Duration::from_micros(1);
        let past = scan_at(dir.path(), retention, 10, &protect, later);
        assert_eq!(past.len(), 1);
        Ok(())
    }

    #[test]
    fn future_timestamps_are_not_eligible() {
        let now = SystemTime::now();
        assert!(!is_expired(now + hours(1), Duration::ZERO, now));
    }

    #[test]
    fn scan_honours_protect_list() -> Result<()> {
        let dir = tempdir()?;
        let root = dir.path();
        write_aged(&root.join("pinned/keep.bin"), 1, hours(9))?;
        write_aged(&root.join("drop.bin"), 1, hours(9))?;

        let protect = ProtectList::new(vec![root.join("pinned")]);
        let items = scan(root, hours(1), 10, &protect);

        assert_eq!(items.len(), 1);
        assert!(items[0].path.ends_with("drop.bin"));
        Ok(())
    }

    #[test]
    fn scan_protects_through_unnormalised_root() -> Result<()> {
        let dir = tempdir()?;
        let root = dir.path();
        fs::create_dir(root.join("sub"))?;
        write_aged(&root.join("pinned/keep.bin"), 1, hours(9))?;
        write_aged(&root.join("drop.bin"), 1, hours(9))?;

        let protect = ProtectList::new(vec![root.join("pinned")]);
        let items = scan(&root.join("sub/.."), hours(1), 10, &protect);

        assert_eq!(items.len(), 1);
        assert!(items[0].path.ends_with("drop.bin"));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn scan_protects_through_symlinked_root() -> Result<()> {
        let dir = tempdir()?;
        let elsewhere = tempdir()?;
        let real = dir.path().join("real");
        write_aged(&real.join("pinned/keep.bin"), 1, hours(9))?;
        write_aged(&real.join("drop.bin"), 1, hours(9))?;
        let alias = elsewhere.path().join("alias");
        std::os::unix::fs::symlink(&real, &alias)?;

        let protect = ProtectList::new(vec![real.join("pinned")]);
        let items = scan(&alias, hours(1), 10, &protect);

        assert_eq!(items.len(), 1);
        assert!(items[0].path.ends_with("drop.bin"));
        Ok(())
    }

    #[test]
    fn scan_of_protected_root_is_empty() -> Result<()> {
        let dir = tempdir()?;
        write_aged(&dir.path().join("keep.bin"), 1, hours(9))?;

        let protect = ProtectList::new(vec![dir.path().to_path_buf()]);
        assert!(scan(dir.path(), hours(1), 10, &protect).is_empty());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn scan_skips_unreadable_subtree() -> Result<()> {
        let dir = tempdir()?;
        let root = dir.path();
        write_aged(&root.join("a.log"), 1, hours(9))?;
        write_aged(&root.join("locked/hidden.log"), 1, hours(9))?;
        write_aged(&root.join("open/b.log"), 1, hours(8))?;

        set_mode(&root.join("locked"), 0o000)?;
        if fs::read_dir(root.join("locked")).is_ok() {
            // Privileged user; permissions are not enforced.
            set_mode(&root.join("locked"), 0o755)?;
            return Ok(());
        }

        let items = scan(root, hours(1), 10, &ProtectList::default());
        set_mode(&root.join("locked"), 0o755)?;

        let names: Vec<_> = items
            .iter()
            .map(|i| i.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.log", "b.log"]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn scan_ignores_symlinks() -> Result<()> {
        let dir = tempdir()?;
        let outside = tempdir()?;
        write_aged(&outside.path().join("target.bin"), 1, hours(9))?;
        write_aged(&outside.path().join("sub/inner.bin"), 1, hours(9))?;

        std::os::unix::fs::symlink(
            outside.path().join("target.bin"),
            dir.path().join("link.bin"),
        )?;
        std::os::unix::fs::symlink(outside.path().join("sub"), dir.path().join("linkdir"))?;

        assert!(scan(dir.path(), hours(1), 10, &ProtectList::default()).is_empty());
        Ok(())
    }
}

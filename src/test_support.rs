use anyhow::Result;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Writes `len` bytes to `path` (creating parents) and backdates its mtime by `age`.
pub fn write_aged(path: &Path, len: usize, age: Duration) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(&vec![0u8; len])?;
    file.set_modified(SystemTime::now() - age)?;
    Ok(())
}

pub fn hours(n: u64) -> Duration {
    Duration::from_secs(n * 3600)
}

/// Regular files left anywhere under `dir`.
pub fn count_files(dir: &Path) -> usize {
    jwalk::WalkDir::new(dir)
        .skip_hidden(false)
        .into_iter()
        .flatten()
        .filter(|e| e.file_type().is_file())
        .count()
}

#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

use std::io;
use std::path::{Path, PathBuf};
use sysinfo::Disks;
use thiserror::Error;

/// Usage of a volume could not be determined.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("cannot resolve {}: {source}", path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no mounted filesystem contains {}", path.display())]
    NoFilesystem { path: PathBuf },
    #[error("filesystem mounted at {} reports zero capacity", mount_point.display())]
    EmptyVolume { mount_point: PathBuf },
}

pub trait UsageProbe {
    /// Percentage (0-100) of the volume holding `mount_point` that is in use.
    fn measure(&self, mount_point: &Path) -> Result<u8, ProbeError>;
}

impl<F> UsageProbe for F
where
    F: Fn(&Path) -> Result<u8, ProbeError>,
{
    fn measure(&self, mount_point: &Path) -> Result<u8, ProbeError> {
        self(mount_point)
    }
}

/// Reads the mounted disk list. Refreshed on every call, never cached.
pub struct DiskProbe;

impl UsageProbe for DiskProbe {
    fn measure(&self, mount_point: &Path) -> Result<u8, ProbeError> {
        let resolved = mount_point
            .canonicalize()
            .map_err(|source| ProbeError::Resolve {
                path: mount_point.to_path_buf(),
                source,
            })?;

        let disks = Disks::new_with_refreshed_list();
        let disk = disks
            .list()
            .iter()
            .filter(|d| resolved.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().components().count())
            .ok_or_else(|| ProbeError::NoFilesystem {
                path: resolved.clone(),
            })?;

        percent_used(disk.total_space(), disk.available_space()).ok_or_else(|| {
            ProbeError::EmptyVolume {
                mount_point: disk.mount_point().to_path_buf(),
            }
        })
    }
}

/// Rounds up like `df` does, so 80.1% reads as 81.
pub fn percent_used(total: u64, available: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let used = u128::from(total.saturating_sub(available));
    let percent = (used * 100).div_ceil(u128::from(total));
    u8::try_from(percent.min(100)).ok()
}

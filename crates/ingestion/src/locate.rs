//! Bag 归档定位
//!
//! 把传入的 bag 路径（`.mcap` 或 `.tgz`）解析为可直接读取的
//! MCAP 日志文件。

use std::fs::File;
use std::path::{Path, PathBuf};

use contracts::ReplayError;
use flate2::read::GzDecoder;
use tar::Archive;
use tracing::{debug, info};

/// `.tgz` 归档内预期的日志文件名
pub const CONTAINED_LOG_NAME: &str = "bags_0.mcap";

/// Resolve a bag path to a readable MCAP file.
///
/// `.mcap` paths pass through unchanged. `.tgz` archives unpack into
/// their parent directory; unpacking is skipped when the contained log
/// already sits next to the archive.
pub fn resolve_bag_path(path: &Path) -> Result<PathBuf, ReplayError> {
    if !path.exists() {
        return Err(ReplayError::ArchiveNotFound {
            path: path.to_path_buf(),
        });
    }

    match path.extension().and_then(|e| e.to_str()) {
        Some("mcap") => Ok(path.to_path_buf()),
        Some("tgz") => extract_contained_log(path),
        _ => Err(ReplayError::archive_format(
            path,
            "expected a .mcap file or a .tgz archive",
        )),
    }
}

fn extract_contained_log(path: &Path) -> Result<PathBuf, ReplayError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let contained = parent.join(CONTAINED_LOG_NAME);
    if contained.exists() {
        debug!(log = %contained.display(), "contained log already extracted, skipping unpack");
        return Ok(contained);
    }

    let file = File::open(path)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.unpack(&parent).map_err(|e| {
        ReplayError::archive_format(path, format!("not a readable gzipped tar archive: {e}"))
    })?;
    info!(archive = %path.display(), dest = %parent.display(), "unpacked bag archive");

    if !contained.exists() {
        return Err(ReplayError::ContainedLogMissing { expected: contained });
    }
    Ok(contained)
}

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::{WardenError, WardenResult};

/// Replace-on-write file helper.
///
/// Content goes to a sibling `<name>.tmp` file first, is synced, then
/// renamed over the target so a crash mid-write never leaves a truncated
/// state file behind.
pub struct AtomicFile;

impl AtomicFile {
    pub fn write(path: &Path, content: &[u8]) -> WardenResult<()> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        if !parent.exists() {
            fs::create_dir_all(&parent)
                .map_err(|e| WardenError::io(&parent, "create_dir", e))?;
        }

        let temp_path = temp_path_for(path);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| WardenError::io(&temp_path, "open", e))?;

        file.write_all(content)
            .map_err(|e| WardenError::io(&temp_path, "write", e))?;
        file.sync_all()
            .map_err(|e| WardenError::io(&temp_path, "fsync", e))?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(WardenError::io(path, "rename", e));
        }

        // fsync directory
        #[cfg(target_family = "unix")]
        {
            if let Ok(dir) = File::open(&parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }

    pub fn write_text(path: &Path, content: &str) -> WardenResult<()> {
        Self::write(path, content.as_bytes())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("state"));
    name.push(".tmp");
    path.with_file_name(name)
}

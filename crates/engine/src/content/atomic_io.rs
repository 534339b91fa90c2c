use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Writes a flushed sibling `.tmp` file, then renames it over `path`. Readers see either
/// the old contents or the new ones, never a partial write.
pub fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let staging = staging_path(path);
    let result = write_synced(&staging, text.as_bytes()).and_then(|()| fs::rename(&staging, path));
    if result.is_err() {
        let _ = fs::remove_file(&staging);
    }
    result
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("write"), OsString::from);
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn replaces_existing_file_and_leaves_no_staging_file() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("nested").join("slot.json");

        write_text_atomic(&path, "first").expect("first write");
        write_text_atomic(&path, "second").expect("second write");

        assert_eq!(fs::read_to_string(&path).expect("read"), "second");
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn failed_rename_cleans_up_staging_file() {
        let temp = TempDir::new().expect("tempdir");
        let target = temp.path().join("occupied");
        fs::create_dir_all(target.join("child")).expect("mkdir");

        assert!(write_text_atomic(&target, "data").is_err());
        assert!(!staging_path(&target).exists());
    }
}

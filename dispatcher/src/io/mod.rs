//! I/O helpers for the dispatch agent.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod config;
pub mod state_store;

/// Replace `path` with `contents` via a sibling `<path>.tmp` and a rename,
/// creating missing parent directories first.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, contents).with_context(|| format!("write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("rename {} to {}", tmp_path.display(), path.display()))
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_path_keeps_the_full_file_name() {
        assert_eq!(
            tmp_path_for(Path::new("a/config.toml")),
            PathBuf::from("a/config.toml.tmp")
        );
    }

    #[test]
    fn write_replaces_existing_contents() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("deep/dir/file.json");
        write_atomic(&path, "one").expect("first write");
        write_atomic(&path, "two").expect("second write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "two");
        assert!(!temp.path().join("deep/dir/file.json.tmp").exists());
    }
}

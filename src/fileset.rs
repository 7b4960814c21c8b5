use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use walkdir::WalkDir;

use crate::UploadError;

/// Mapping from posix-style relative path (no leading slash) to the
/// absolute local path. Read-only once built; keys are unique.
pub type FileSet = BTreeMap<String, PathBuf>;

/// Reject a symlink source root before any network activity. Uploading
/// through a symlinked root has ambiguous semantics (container vs target).
pub fn check_source(source: &Path) -> Result<(), UploadError> {
    match std::fs::symlink_metadata(source) {
        Ok(md) if md.file_type().is_symlink() => {
            Err(UploadError::SymlinkSource(source.to_path_buf()))
        }
        Ok(_) => Ok(()),
        Err(e) => Err(UploadError::Transfer(
            source.to_string_lossy().to_string(),
            format!("本地 stat 失败: {}", e),
        )),
    }
}

/// Build the FileSet for a local source.
///
/// - regular file: single entry keyed by its basename
/// - directory: recursive walk, keys are paths relative to the source root
///
/// Directories themselves carry no entries; the mkdir plan is derived from
/// the file paths. Non-regular entries inside the tree (sockets, symlinks)
/// are skipped.
pub fn list_files(source: &Path) -> Result<FileSet> {
    let mut files: FileSet = BTreeMap::new();
    let md = std::fs::metadata(source)
        .map_err(|e| anyhow::anyhow!("源不存在或不可读: {}: {}", source.display(), e))?;
    if md.is_file() {
        let name = source
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("无效的源路径: {}", source.display()))?
            .to_string_lossy()
            .to_string();
        files.insert(name, source.to_path_buf());
        return Ok(files);
    }

    for entry in WalkDir::new(source).into_iter().flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let rel = path.strip_prefix(source).unwrap_or(path).to_string_lossy().to_string();
        if rel.is_empty() {
            continue;
        }
        // 远端恒为 POSIX 风格路径
        let rel_unix = rel.replace('\\', "/");
        files.insert(rel_unix, path.to_path_buf());
    }
    Ok(files)
}

/// Total byte size of every file in the set. Entries whose metadata cannot
/// be read count as zero; the transfer itself will surface the real error.
pub fn total_size(files: &FileSet) -> u64 {
    files.values().filter_map(|p| std::fs::metadata(p).ok()).map(|md| md.len()).sum()
}

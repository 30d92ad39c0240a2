//! Per-run scratch directory and final output placement.

use crate::error::{ReelError, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

const DEFAULT_STEM: &str = "storyreel";
const DEFAULT_EXTENSION: &str = "mp4";

/// Scratch directory removed when dropped, on every exit path.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh workspace under `root`, creating `root` if needed.
    pub fn create(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root).map_err(|e| {
            ReelError::Resource(format!("cannot create temp dir {}: {}", root.display(), e))
        })?;
        let dir = tempfile::Builder::new()
            .prefix("storyreel-")
            .tempdir_in(root)
            .map_err(|e| {
                ReelError::Resource(format!("cannot create workspace in {}: {}", root.display(), e))
            })?;
        debug!("Workspace at {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Remove the workspace now, reporting failures.
    pub fn close(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}

/// Choose a collision-free output path in `dir`.
///
/// The requested file name is used when nothing exists there yet; otherwise
/// a timestamp and short random suffix are appended to its stem.
pub fn unique_output_path(dir: &Path, requested: Option<&str>) -> PathBuf {
    let requested = requested
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| Path::new(s).file_name())
        .map(PathBuf::from);

    let stem = requested
        .as_deref()
        .and_then(Path::file_stem)
        .and_then(|s| s.to_str())
        .unwrap_or(DEFAULT_STEM)
        .to_string();
    let extension = requested
        .as_deref()
        .and_then(Path::extension)
        .and_then(|s| s.to_str())
        .unwrap_or(DEFAULT_EXTENSION)
        .to_string();

    if requested.is_some() {
        let candidate = dir.join(format!("{}.{}", stem, extension));
        if !candidate.exists() {
            return candidate;
        }
    }

    loop {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let candidate = dir.join(format!("{}_{}_{}.{}", stem, timestamp, &suffix[..8], extension));
        if !candidate.exists() {
            return candidate;
        }
    }
}

/// Move a finished file into place, copying across filesystems.
pub fn persist(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    copy_into_place(from, to)
        .map_err(|e| ReelError::Resource(format!("cannot write output {}: {}", to.display(), e)))?;
    std::fs::remove_file(from)?;
    Ok(())
}

/// Copy through a hidden sibling of `to`, renamed over `to` only once the
/// copy is complete. The sibling is deleted on any failure.
fn copy_into_place(from: &Path, to: &Path) -> std::io::Result<()> {
    let dir = to.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let mut staged = tempfile::Builder::new().prefix(".storyreel-").suffix(".part").tempfile_in(dir)?;
    let mut source = std::fs::File::open(from)?;
    std::io::copy(&mut source, staged.as_file_mut())?;
    staged.as_file().sync_all()?;
    staged.persist(to).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_into_place_writes_complete_file() {
        let src_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let from = src_dir.path().join("render.mp4");
        std::fs::write(&from, b"encoded video").unwrap();
        let to = out_dir.path().join("story.mp4");

        copy_into_place(&from, &to).unwrap();
        assert_eq!(std::fs::read(&to).unwrap(), b"encoded video");
        assert_eq!(std::fs::read_dir(out_dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_failed_copy_leaves_nothing_in_output_dir() {
        let src_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        // Opening a directory succeeds but reading from it fails mid-copy.
        let unreadable = src_dir.path().join("render.mp4");
        std::fs::create_dir(&unreadable).unwrap();
        let to = out_dir.path().join("story.mp4");

        assert!(copy_into_place(&unreadable, &to).is_err());
        assert!(!to.exists());
        assert_eq!(std::fs::read_dir(out_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_workspace_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let ws = Workspace::create(root.path()).unwrap();
            std::fs::write(ws.file("speech.mp3"), b"x").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_workspace_close() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create(&root.path().join("nested")).unwrap();
        let path = ws.path().to_path_buf();
        assert!(path.starts_with(root.path().join("nested")));
        ws.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_requested_name_used_when_free() {
        let dir = tempfile::tempdir().unwrap();
        let path = unique_output_path(dir.path(), Some("my_video.mp4"));
        assert_eq!(path, dir.path().join("my_video.mp4"));
    }

    #[test]
    fn test_requested_name_strips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = unique_output_path(dir.path(), Some("../elsewhere/clip.mov"));
        assert_eq!(path, dir.path().join("clip.mov"));
    }

    #[test]
    fn test_collision_gets_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("my_video.mp4"), b"old").unwrap();

        let path = unique_output_path(dir.path(), Some("my_video.mp4"));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("my_video_"));
        assert!(name.ends_with(".mp4"));
        // my_video_YYYYMMDD_HHMMSS_xxxxxxxx.mp4
        assert_eq!(name.len(), "my_video_".len() + 15 + 1 + 8 + ".mp4".len());
    }

    #[test]
    fn test_default_name() {
        let dir = tempfile::tempdir().unwrap();
        let name = unique_output_path(dir.path(), None)
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert!(name.starts_with("storyreel_"));
        assert!(name.ends_with(".mp4"));
    }

    #[test]
    fn test_persist_moves_file() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("render.mp4");
        let to = dir.path().join("out").join("final.mp4");
        std::fs::write(&from, b"video").unwrap();

        persist(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"video");
    }
}

//! Background clip selection.

use crate::error::{ReelError, Result};
use rand::seq::IndexedRandom;
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File extensions accepted as background clips.
pub const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mov", "avi", "mkv", "webm"];

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(ext)))
}

/// List background clips in `dir`, sorted by path.
pub fn list_backgrounds(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        ReelError::Resource(format!("cannot read videos directory {}: {}", dir.display(), e))
    })?;

    let mut clips: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_video(path))
        .collect();
    clips.sort();
    Ok(clips)
}

/// Pick the background clip for a run.
///
/// An explicit path is tried as given, then relative to `dir`. Without one,
/// a clip is drawn uniformly from `dir` using `rng`.
pub fn select_background<R: Rng + ?Sized>(
    dir: &Path,
    explicit: Option<&Path>,
    rng: &mut R,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        let in_dir = dir.join(path);
        if in_dir.is_file() {
            return Ok(in_dir);
        }
        return Err(ReelError::Resource(format!(
            "background video not found: {}",
            path.display()
        )));
    }

    let clips = list_backgrounds(dir)?;
    debug!("Found {} background clips in {}", clips.len(), dir.display());
    let chosen = clips.choose(rng).cloned().ok_or_else(|| {
        ReelError::Resource(format!(
            "no background videos ({}) found in {}",
            VIDEO_EXTENSIONS.join(", "),
            dir.display()
        ))
    })?;
    info!("Selected background {}", chosen.display());
    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn populate(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), b"clip").unwrap();
        }
    }

    #[test]
    fn test_lists_only_video_files() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), &["a.mp4", "b.MOV", "notes.txt", "c.webm", "d"]);
        let clips = list_backgrounds(dir.path()).unwrap();
        let names: Vec<_> = clips
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mp4", "b.MOV", "c.webm"]);
    }

    #[test]
    fn test_random_pick_is_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), &["a.mp4", "b.mkv", "c.avi"]);
        let mut rng = StdRng::seed_from_u64(7);

        let mut seen = HashSet::new();
        for _ in 0..50 {
            let pick = select_background(dir.path(), None, &mut rng).unwrap();
            assert!(is_video(&pick));
            seen.insert(pick);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_seeded_pick_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), &["a.mp4", "b.mp4", "c.mp4", "d.mp4"]);
        let first = select_background(dir.path(), None, &mut StdRng::seed_from_u64(42)).unwrap();
        let second = select_background(dir.path(), None, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_explicit_name_inside_directory() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), &["chosen.mp4", "other.mp4"]);
        let pick = select_background(dir.path(), Some(Path::new("chosen.mp4")), &mut rand::rng()).unwrap();
        assert_eq!(pick, dir.path().join("chosen.mp4"));
    }

    #[test]
    fn test_missing_explicit_is_resource_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = select_background(dir.path(), Some(Path::new("nope.mp4")), &mut rand::rng());
        assert!(matches!(result, Err(ReelError::Resource(_))));
    }

    #[test]
    fn test_empty_or_missing_directory_is_resource_error() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), &["readme.txt"]);
        assert!(matches!(
            select_background(dir.path(), None, &mut rand::rng()),
            Err(ReelError::Resource(_))
        ));
        assert!(matches!(
            select_background(&dir.path().join("missing"), None, &mut rand::rng()),
            Err(ReelError::Resource(_))
        ));
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Category of a temporary file produced by a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Audio,
    Subtitle,
    Container,
}

/// Handle to a registered artifact, used to exempt it from cleanup.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactHandle(usize);

#[derive(Debug)]
struct Artifact {
    path: PathBuf,
    kind: ArtifactKind,
    kept: bool,
    released: bool,
}

/// Records every temporary file created during a run and removes them
/// exactly once, whether the run succeeds or fails.
///
/// Stages register the files they create but never delete them themselves;
/// deletion is the owner's job at the end of the run. A deletion error for
/// one artifact is logged and never prevents the remaining artifacts from
/// being visited.
#[derive(Debug, Default)]
pub struct ArtifactTracker {
    artifacts: Vec<Artifact>,
}

impl ArtifactTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a path for eventual cleanup.
    pub fn register(&mut self, path: impl Into<PathBuf>, kind: ArtifactKind) -> ArtifactHandle {
        let path = path.into();
        debug!("Registered {:?} artifact: {}", kind, path.display());
        self.artifacts.push(Artifact {
            path,
            kind,
            kept: false,
            released: false,
        });
        ArtifactHandle(self.artifacts.len() - 1)
    }

    /// Exempt one artifact from cleanup, leaving it on disk.
    pub fn keep(&mut self, handle: ArtifactHandle) {
        if let Some(artifact) = self.artifacts.get_mut(handle.0) {
            debug!("Keeping artifact: {}", artifact.path.display());
            artifact.kept = true;
        }
    }

    /// Path of a registered artifact.
    pub fn path(&self, handle: ArtifactHandle) -> &Path {
        &self.artifacts[handle.0].path
    }

    /// Delete every registered path that still exists. Idempotent: each
    /// artifact is deleted at most once, and per-path failures are logged
    /// rather than raised.
    pub fn release_all(&mut self) {
        for artifact in &mut self.artifacts {
            if artifact.kept || artifact.released {
                continue;
            }
            artifact.released = true;

            if !artifact.path.exists() {
                continue;
            }
            match fs::remove_file(&artifact.path) {
                Ok(()) => debug!("Removed {:?} artifact: {}", artifact.kind, artifact.path.display()),
                Err(e) => warn!(
                    "Failed to remove {:?} artifact {}: {}",
                    artifact.kind,
                    artifact.path.display(),
                    e
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_release_all_removes_existing_files() {
        let dir = tempdir().unwrap();
        let audio = dir.path().join("audio.mp3");
        let subs = dir.path().join("subs_en.srt");
        fs::write(&audio, b"a").unwrap();
        fs::write(&subs, b"s").unwrap();

        let mut tracker = ArtifactTracker::new();
        tracker.register(&audio, ArtifactKind::Audio);
        tracker.register(&subs, ArtifactKind::Subtitle);
        tracker.release_all();

        assert!(!audio.exists());
        assert!(!subs.exists());
    }

    #[test]
    fn test_release_all_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audio.mp3");
        fs::write(&path, b"a").unwrap();

        let mut tracker = ArtifactTracker::new();
        tracker.register(&path, ArtifactKind::Audio);
        tracker.release_all();
        tracker.release_all();
        tracker.release_all();

        assert!(!path.exists());
    }

    #[test]
    fn test_missing_file_does_not_stop_cleanup() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("never_created.mp3");
        let present = dir.path().join("subs_fr.srt");
        fs::write(&present, b"s").unwrap();

        let mut tracker = ArtifactTracker::new();
        tracker.register(&missing, ArtifactKind::Audio);
        tracker.register(&present, ArtifactKind::Subtitle);
        tracker.release_all();

        assert!(!present.exists());
    }

    #[test]
    fn test_kept_artifact_survives_cleanup() {
        let dir = tempdir().unwrap();
        let container = dir.path().join("output.mkv");
        fs::write(&container, b"c").unwrap();

        let mut tracker = ArtifactTracker::new();
        let handle = tracker.register(&container, ArtifactKind::Container);
        tracker.keep(handle);
        tracker.release_all();

        assert!(container.exists());
        assert_eq!(tracker.path(handle), container.as_path());
    }
}

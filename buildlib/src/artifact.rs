use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::debug;

/// File name suffixes of the desktop packages the build tool produces.
pub const ARTIFACT_SUFFIXES: [&str; 4] = [".dmg", ".exe", ".AppImage", ".deb"];

pub fn is_artifact(file_name: &str) -> bool {
    ARTIFACT_SUFFIXES
        .iter()
        .any(|suffix| file_name.ends_with(suffix))
}

/// Find the package file in `dir`.
///
/// Only regular files whose name carries one of [`ARTIFACT_SUFFIXES`] are candidates. When
/// several match, the most recently modified one wins and ties go to the smallest file name, so
/// the answer never depends on directory listing order. An unreadable directory resolves to
/// `None`, the same as an empty one.
pub async fn resolve_artifact(dir: &Path) -> Option<PathBuf> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) => {
            debug!(dir = %dir.display(), error = %err, "cannot list output directory");
            return None;
        }
    };

    let mut best: Option<(SystemTime, String, PathBuf)> = None;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_artifact(&name) {
            continue;
        }
        let metadata = match entry.metadata().await {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => continue,
        };
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let better = match &best {
            None => true,
            Some((best_modified, best_name, _)) => {
                modified > *best_modified || (modified == *best_modified && name < *best_name)
            }
        };
        if better {
            best = Some((modified, name, entry.path()));
        }
    }
    best.map(|(_, _, path)| path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self as stdfs, File, FileTimes};
    use std::time::Duration;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str, modified: SystemTime) {
        let file = File::create(dir.join(name)).unwrap();
        file.set_times(FileTimes::new().set_modified(modified)).unwrap();
    }

    #[test]
    fn suffix_matching_is_exact() {
        assert!(is_artifact("app-1.0.0.dmg"));
        assert!(is_artifact("App Setup 1.0.0.exe"));
        assert!(is_artifact("app-1.0.0.AppImage"));
        assert!(is_artifact("app_1.0.0_amd64.deb"));
        assert!(!is_artifact("app-1.0.0.appimage"));
        assert!(!is_artifact("app-1.0.0.dmg.blockmap"));
        assert!(!is_artifact("latest-mac.yml"));
    }

    #[tokio::test]
    async fn finds_dmg_among_other_files() {
        let dist = tempdir().unwrap();
        let now = SystemTime::now();
        touch(dist.path(), "builder-debug.yml", now);
        touch(dist.path(), "app-1.0.0.dmg", now);
        touch(dist.path(), "app-1.0.0.dmg.blockmap", now);
        stdfs::create_dir(dist.path().join("mac")).unwrap();

        let found = resolve_artifact(dist.path()).await;
        assert_eq!(found, Some(dist.path().join("app-1.0.0.dmg")));
    }

    #[tokio::test]
    async fn nothing_recognised_is_not_found() {
        let dist = tempdir().unwrap();
        touch(dist.path(), "latest.yml", SystemTime::now());
        touch(dist.path(), "app.zip", SystemTime::now());
        assert_eq!(resolve_artifact(dist.path()).await, None);
    }

    #[tokio::test]
    async fn missing_directory_is_not_found() {
        let root = tempdir().unwrap();
        assert_eq!(resolve_artifact(&root.path().join("dist")).await, None);
    }

    #[tokio::test]
    async fn directories_with_artifact_names_are_skipped() {
        let dist = tempdir().unwrap();
        stdfs::create_dir(dist.path().join("weird.deb")).unwrap();
        assert_eq!(resolve_artifact(dist.path()).await, None);
    }

    #[tokio::test]
    async fn newest_artifact_wins() {
        let dist = tempdir().unwrap();
        let older = SystemTime::now() - Duration::from_secs(3600);
        touch(dist.path(), "app-0.9.0.dmg", older);
        touch(dist.path(), "app-1.0.0.dmg", SystemTime::now());
        assert_eq!(
            resolve_artifact(dist.path()).await,
            Some(dist.path().join("app-1.0.0.dmg"))
        );
    }

    #[tokio::test]
    async fn equal_times_break_ties_by_name() {
        let dist = tempdir().unwrap();
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        touch(dist.path(), "b.deb", at);
        touch(dist.path(), "a.AppImage", at);
        assert_eq!(
            resolve_artifact(dist.path()).await,
            Some(dist.path().join("a.AppImage"))
        );
    }
}

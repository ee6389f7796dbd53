use std::path::{Path, PathBuf};

/// Creates `dir` and any missing ancestors. Already-existing directories
/// are not an error.
pub async fn ensure_dir(dir: &Path) -> bool {
    match tokio::fs::create_dir_all(dir).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Failed to create directory");
            false
        }
    }
}

/// Writes `content` to `path` without ever exposing a half-written file.
///
/// The content goes to a temporary sibling first and is renamed over the
/// destination, so readers observe either the previous complete file or the
/// new one. Repeated writes to the same path are plain overwrites. Failures
/// are reported as `false` after best-effort cleanup of the temporary
/// artifact; this never panics or propagates, since a failed save must not
/// destabilize the host's event dispatch.
pub async fn write_atomic(path: &Path, content: &str) -> bool {
    if let Some(parent) = path.parent() {
        if !ensure_dir(parent).await {
            return false;
        }
    }

    let temp_path = temp_sibling(path);
    if let Err(e) = tokio::fs::write(&temp_path, content).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to write transcript");
        remove_quietly(&temp_path).await;
        return false;
    }
    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to finalize transcript");
        remove_quietly(&temp_path).await;
        return false;
    }
    true
}

/// Maps `primary_path` to its mirror location under `secondary_root`,
/// preserving the path relative to `primary_root`. Falls back to the bare
/// filename when the primary path is not under the primary root.
pub fn secondary_path(
    primary_path: &Path,
    primary_root: &Path,
    secondary_root: &Path,
) -> PathBuf {
    match primary_path.strip_prefix(primary_root) {
        Ok(relative) => secondary_root.join(relative),
        Err(_) => match primary_path.file_name() {
            Some(name) => secondary_root.join(name),
            None => secondary_root.join("untitled.md"),
        },
    }
}

/// Mirrors `content` under the secondary root using the same atomic
/// protocol. Success and failure here are independent of the primary write;
/// a failed mirror never rolls the primary back.
pub async fn write_secondary(
    primary_path: &Path,
    primary_root: &Path,
    secondary_root: &Path,
    content: &str,
) -> bool {
    let path = secondary_path(primary_path, primary_root, secondary_root);
    write_atomic(&path, content).await
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

async fn remove_quietly(path: &Path) {
    let _ = tokio::fs::remove_file(path).await;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn write_creates_parents_and_leaves_no_temp() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/session.md");

        assert!(write_atomic(&path, "# Session").await);
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "# Session");
        assert!(!temp_sibling(&path).exists());
    }

    #[tokio::test]
    async fn rewrite_overwrites_in_place() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("session.md");

        assert!(write_atomic(&path, "first").await);
        assert!(write_atomic(&path, "second").await);
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "second");

        // Overwrite must not fork sibling artifacts.
        let mut entries = tokio::fs::read_dir(tmp.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name());
        }
        assert_eq!(names, vec!["session.md"]);
    }

    #[tokio::test]
    async fn write_to_unwritable_target_reports_failure() {
        let tmp = TempDir::new().unwrap();
        // A directory at the destination path makes the rename fail.
        let path = tmp.path().join("session.md");
        tokio::fs::create_dir(&path).await.unwrap();

        assert!(!write_atomic(&path, "content").await);
        assert!(!temp_sibling(&path).exists());
    }

    #[test]
    fn secondary_path_preserves_relative_position() {
        let path = secondary_path(
            Path::new("/proj/conversations/2024/a.md"),
            Path::new("/proj/conversations"),
            Path::new("/backup"),
        );
        assert_eq!(path, PathBuf::from("/backup/2024/a.md"));
    }

    #[test]
    fn secondary_path_outside_root_falls_back_to_filename() {
        let path = secondary_path(
            Path::new("/elsewhere/a.md"),
            Path::new("/proj/conversations"),
            Path::new("/backup"),
        );
        assert_eq!(path, PathBuf::from("/backup/a.md"));
    }

    #[tokio::test]
    async fn secondary_failure_is_independent() {
        let tmp = TempDir::new().unwrap();
        let primary_root = tmp.path().join("primary");
        let primary = primary_root.join("a.md");
        assert!(write_atomic(&primary, "content").await);

        // Secondary root blocked by a plain file.
        let secondary_root = tmp.path().join("blocked");
        tokio::fs::write(&secondary_root, "not a dir").await.unwrap();

        assert!(!write_secondary(&primary, &primary_root, &secondary_root, "content").await);
        assert_eq!(
            tokio::fs::read_to_string(&primary).await.unwrap(),
            "content"
        );
    }
}

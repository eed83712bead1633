use serde_json::Value;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tokio::task;
use walkdir::WalkDir;

/// Copy the template tree into a fresh workspace directory.
pub async fn copy_template(template: &Path, workspace: &Path) -> io::Result<()> {
    let (template, workspace) = (template.to_path_buf(), workspace.to_path_buf());
    task::spawn_blocking(move || copy_tree(&template, &workspace))
        .await
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?
}

fn copy_tree(src: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.path_is_symlink() {
            copy_link(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

// links are recreated as they are, even when they point outside the template or nowhere
#[cfg(unix)]
fn copy_link(link: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(link)?, target)
}

#[cfg(windows)]
fn copy_link(link: &Path, target: &Path) -> io::Result<()> {
    use std::os::windows::fs::{symlink_dir, symlink_file};
    let points_to = fs::read_link(link)?;
    if link.is_dir() {
        symlink_dir(points_to, target)
    } else {
        symlink_file(points_to, target)
    }
}

/// Serialize the caller's payload as pretty JSON to `relative` inside the workspace, creating
/// any missing directories. Returns the path written.
pub async fn write_data_file(
    workspace: &Path,
    relative: &Path,
    payload: &Value,
) -> io::Result<PathBuf> {
    let path = workspace.join(relative);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let contents = serde_json::to_vec_pretty(payload)?;
    tokio::fs::write(&path, contents).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn copies_nested_template() {
        let template = tempdir().unwrap();
        fs::create_dir_all(template.path().join("src/renderer")).unwrap();
        fs::write(template.path().join("package.json"), "{}").unwrap();
        fs::write(template.path().join("src/renderer/index.html"), "<html/>").unwrap();

        let root = tempdir().unwrap();
        let workspace = root.path().join("job");
        copy_template(template.path(), &workspace).await.unwrap();

        assert_eq!(fs::read_to_string(workspace.join("package.json")).unwrap(), "{}");
        assert_eq!(
            fs::read_to_string(workspace.join("src/renderer/index.html")).unwrap(),
            "<html/>"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinks_are_recreated() {
        use std::os::unix::fs::symlink;

        let template = tempdir().unwrap();
        fs::create_dir_all(template.path().join("assets/icons")).unwrap();
        fs::write(template.path().join("assets/icons/app.png"), "png").unwrap();
        symlink("assets/icons", template.path().join("icons")).unwrap();
        symlink("missing.txt", template.path().join("dangling")).unwrap();

        let root = tempdir().unwrap();
        let workspace = root.path().join("job");
        copy_template(template.path(), &workspace).await.unwrap();

        let icons = workspace.join("icons");
        assert!(fs::symlink_metadata(&icons).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&icons).unwrap(), Path::new("assets/icons"));
        assert_eq!(fs::read_to_string(icons.join("app.png")).unwrap(), "png");
        assert_eq!(
            fs::read_link(workspace.join("dangling")).unwrap(),
            Path::new("missing.txt")
        );
    }

    #[tokio::test]
    async fn data_file_creates_directories() {
        let workspace = tempdir().unwrap();
        let payload = json!({ "title": "Hello", "width": 800 });
        let path = write_data_file(workspace.path(), Path::new("src/data/config.json"), &payload)
            .await
            .unwrap();

        assert_eq!(path, workspace.path().join("src/data/config.json"));
        let written: Value = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
        assert_eq!(written, payload);
    }
}

//! Filesystem access used by the template finder and the compiled template cache.
//!
//! [`LocalFilesystem`] is the real disk. Anything else, e.g. an in-memory store,
//! can be plugged into [`crate::Views::with_filesystem`].
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use uuid::Uuid;

pub trait Filesystem: Send + Sync {
    /// Is there a file at this path? Directories don't count.
    fn exists(&self, path: &Path) -> bool;

    /// Last modification time.
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Replace the file with `contents`, stamped with the `modified` time.
    /// Readers see either the old file or the new one, never a partial write.
    fn write_atomic(&self, path: &Path, contents: &str, modified: SystemTime) -> io::Result<()>;

    /// All files under the directory, recursively, sorted by path.
    /// A directory that doesn't exist has no files.
    fn list_directory(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    fn remove(&self, path: &Path) -> io::Result<()>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// The local disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFilesystem;

impl Filesystem for LocalFilesystem {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    // Written to a temporary file next to the destination,
    // then renamed over it. Rename is atomic on the same filesystem.
    fn write_atomic(&self, path: &Path, contents: &str, modified: SystemTime) -> io::Result<()> {
        let (dir, name) = match (path.parent(), path.file_name()) {
            (Some(dir), Some(name)) => (dir, name.to_string_lossy()),
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("\"{}\" is not a file path", path.display()),
                ))
            }
        };

        let temp = dir.join(format!(".{}.{}.tmp", name, Uuid::new_v4()));

        let result = write_temp(&temp, contents, modified).and_then(|_| fs::rename(&temp, path));

        if result.is_err() {
            let _ = fs::remove_file(&temp);
        }

        result
    }

    fn list_directory(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = vec![];

        if path.is_dir() {
            walk(path, &mut files)?;
        }

        files.sort();

        Ok(files)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }
}

fn write_temp(path: &Path, contents: &str, modified: SystemTime) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.set_modified(modified)?;
    file.sync_all()
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            walk(&path, files)?;
        } else {
            files.push(path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;
    use tempdir::TempDir;

    #[test]
    fn test_write_atomic() -> io::Result<()> {
        let dir = TempDir::new("vellum-fs")?;
        let path = dir.path().join("artifact.json");
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("clock");
        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(now.as_secs() + 3600);
        let fs = LocalFilesystem;

        fs.write_atomic(&path, "first", stamp)?;
        fs.write_atomic(&path, "second", stamp)?;

        assert_eq!(fs.read_to_string(&path)?, "second");
        assert_eq!(fs.modified(&path)?, stamp);

        // No temporary files are left behind.
        assert_eq!(fs.list_directory(dir.path())?, vec![path]);

        Ok(())
    }

    #[test]
    fn test_write_atomic_failure() -> io::Result<()> {
        let dir = TempDir::new("vellum-fs")?;
        let fs = LocalFilesystem;

        // Can't rename a file over a directory.
        let target = dir.path().join("taken");
        fs.create_dir_all(&target.join("inner"))?;

        assert!(fs.write_atomic(&target, "text", SystemTime::now()).is_err());
        assert_eq!(fs.list_directory(dir.path())?, Vec::<PathBuf>::new());

        assert!(fs
            .write_atomic(&dir.path().join("missing/artifact.json"), "text", SystemTime::now())
            .is_err());

        Ok(())
    }

    #[test]
    fn test_list_directory() -> io::Result<()> {
        let dir = TempDir::new("vellum-fs")?;
        let fs = LocalFilesystem;

        fs.create_dir_all(&dir.path().join("b/c"))?;
        fs::write(dir.path().join("b/c/d.tmpl"), "")?;
        fs::write(dir.path().join("a.tmpl"), "")?;

        assert_eq!(
            fs.list_directory(dir.path())?,
            vec![dir.path().join("a.tmpl"), dir.path().join("b/c/d.tmpl")]
        );
        assert!(fs.exists(&dir.path().join("a.tmpl")));
        assert!(!fs.exists(&dir.path().join("b")));
        assert!(fs.list_directory(&dir.path().join("nope"))?.is_empty());

        Ok(())
    }
}

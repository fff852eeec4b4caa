//! In-memory [`Storage`] backend used by unit tests and `--dry-run`.

use anyhow::{Result, anyhow, bail};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use crate::error::UpgradeError;
use crate::upgrade::storage::{DirEntry, Storage};

#[derive(Debug, Default)]
struct MemState {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
    downloads: BTreeMap<String, Vec<u8>>,
    writes: Vec<PathBuf>,
}

#[derive(Debug, Default)]
pub struct MemStorage {
    state: RefCell<MemState>,
}

/// Lexical normalization so `a/./b` and `a/b` address the same entry.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `bytes` for a later `download(url, ..)`.
    pub fn register_download(&self, url: &str, bytes: Vec<u8>) {
        self.state
            .borrow_mut()
            .downloads
            .insert(url.to_string(), bytes);
    }

    /// Copies a real directory tree into memory at the same path.
    pub fn mirror_from(&self, source: &dyn Storage, root: &Path) -> Result<usize> {
        if !source.exists(root) {
            return Ok(0);
        }
        self.create_dir_all(root)?;
        let mut mirrored = 0;
        for file in source.walk_files(root)? {
            let bytes = source.read(&file)?;
            self.insert(&file, bytes);
            mirrored += 1;
        }
        // empty directories matter for discovery of template folders
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in source.list_dir(&dir)? {
                if entry.is_dir {
                    self.create_dir_all(&entry.path)?;
                    pending.push(entry.path);
                }
            }
        }
        self.state.borrow_mut().writes.clear();
        Ok(mirrored)
    }

    /// Files written since creation or the last mirror, in write order.
    pub fn written_paths(&self) -> Vec<PathBuf> {
        self.state.borrow().writes.clone()
    }

    fn insert(&self, path: &Path, contents: Vec<u8>) {
        let path = normalize(path);
        let mut state = self.state.borrow_mut();
        let mut parent = path.parent();
        while let Some(dir) = parent {
            if dir.as_os_str().is_empty() {
                break;
            }
            state.dirs.insert(dir.to_path_buf());
            parent = dir.parent();
        }
        state.writes.push(path.clone());
        state.files.insert(path, contents);
    }
}

impl Storage for MemStorage {
    fn exists(&self, path: &Path) -> bool {
        let path = normalize(path);
        let state = self.state.borrow();
        state.files.contains_key(&path) || state.dirs.contains(&path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.state.borrow().dirs.contains(&normalize(path))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.state
            .borrow()
            .files
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| anyhow!("failed to read {}: not found", path.display()))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if self.is_dir(path) {
            bail!("failed to write {}: is a directory", path.display());
        }
        self.insert(path, contents.to_vec());
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let path = normalize(path);
        let mut state = self.state.borrow_mut();
        let mut current = Some(path.as_path());
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            state.dirs.insert(dir.to_path_buf());
            current = dir.parent();
        }
        Ok(())
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let path = normalize(path);
        let state = self.state.borrow();
        if !state.dirs.contains(&path) {
            bail!("failed to list {}: not a directory", path.display());
        }

        let mut out: Vec<DirEntry> = Vec::new();
        let children = state
            .dirs
            .iter()
            .map(|p| (p, true))
            .chain(state.files.keys().map(|p| (p, false)));
        for (child, is_dir) in children {
            if child.parent() != Some(path.as_path()) {
                continue;
            }
            let Some(name) = child.file_name() else {
                continue;
            };
            out.push(DirEntry {
                name: name.to_string_lossy().to_string(),
                path: child.clone(),
                is_dir,
            });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let path = normalize(path);
        let mut state = self.state.borrow_mut();
        state.files.retain(|p, _| !p.starts_with(&path));
        state.dirs.retain(|p| !p.starts_with(&path));
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from = normalize(from);
        let to = normalize(to);
        if from == to {
            return Ok(());
        }
        if !self.exists(&from) {
            bail!("failed to move {}: not found", from.display());
        }
        self.copy(&from, &to)?;
        self.remove(&from)
    }

    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let bytes = self
            .state
            .borrow()
            .downloads
            .get(url)
            .cloned()
            .ok_or_else(|| UpgradeError::Download {
                url: url.to_string(),
                reason: "no registered bundle".to_string(),
            })?;
        self.write(dest, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_returns_direct_children_only() {
        let mem = MemStorage::new();
        mem.write(Path::new("/i/config/burst/a.xml"), b"a").expect("write");
        mem.write(Path::new("/i/config/b.xml"), b"b").expect("write");
        mem.create_dir_all(Path::new("/i/templates/custom")).expect("mkdir");

        let names = mem
            .list_dir(Path::new("/i/config"))
            .expect("list")
            .into_iter()
            .map(|e| (e.name, e.is_dir))
            .collect::<Vec<_>>();
        assert_eq!(names, vec![("b.xml".to_string(), false), ("burst".to_string(), true)]);
        assert!(mem.is_dir(Path::new("/i/templates/custom")));
    }

    #[test]
    fn rename_moves_whole_tree() {
        let mem = MemStorage::new();
        mem.write(Path::new("/s/from/x/1.txt"), b"1").expect("write");
        mem.rename(Path::new("/s/from"), Path::new("/s/to")).expect("rename");
        assert!(!mem.exists(Path::new("/s/from/x/1.txt")));
        assert_eq!(mem.read(Path::new("/s/to/x/1.txt")).expect("read"), b"1");
    }

    #[test]
    fn unregistered_download_fails_with_url() {
        let mem = MemStorage::new();
        let err = mem
            .download("https://example.invalid/b.zip", Path::new("/s/b.zip"))
            .expect_err("no bundle");
        assert!(err.to_string().contains("https://example.invalid/b.zip"));

        mem.register_download("https://example.invalid/b.zip", b"zip".to_vec());
        mem.download("https://example.invalid/b.zip", Path::new("/s/b.zip"))
            .expect("download");
        assert_eq!(mem.written_paths(), vec![PathBuf::from("/s/b.zip")]);
    }
}

//! Storage and network boundary of the upgrade engine.
//!
//! The orchestrator performs every read, write, copy, move, delete,
//! listing, archive operation and download through [`Storage`].
//! [`LocalStorage`] talks to the real filesystem and network;
//! [`crate::upgrade::mem_storage::MemStorage`] keeps everything in memory
//! for tests and dry runs.

use anyhow::{Context, Result, bail};
use std::fs;
use std::io::{self, BufReader, BufWriter, Cursor, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::UpgradeError;
use crate::upgrade::archive::{self, ArchiveEntry, ArchiveWriter};
use crate::upgrade::util::slash_path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

pub trait Storage {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    /// Writes a file, creating missing parent directories.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    /// Direct children sorted by name.
    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;
    /// Removes a file or a whole directory tree. Missing paths are fine.
    fn remove(&self, path: &Path) -> Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
    fn download(&self, url: &str, dest: &Path) -> Result<()>;

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).with_context(|| format!("{} is not valid UTF-8", path.display()))
    }

    /// Every file below `root`, sorted by path.
    fn walk_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in self.list_dir(&dir)? {
                if entry.is_dir {
                    pending.push(entry.path);
                } else {
                    out.push(entry.path);
                }
            }
        }
        out.sort();
        Ok(out)
    }

    /// Copies a file, or a directory tree recursively, creating parents.
    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        if !self.is_dir(from) {
            let bytes = self.read(from)?;
            return self.write(to, &bytes);
        }
        self.create_dir_all(to)?;
        for entry in self.list_dir(from)? {
            self.copy(&entry.path, &to.join(&entry.name))?;
        }
        Ok(())
    }

    fn extract_archive(&self, archive_path: &Path, dest: &Path) -> Result<()> {
        let bytes = self.read(archive_path)?;
        let entries = archive::read_entries(Cursor::new(bytes.as_slice()))
            .with_context(|| format!("failed to open archive {}", archive_path.display()))?;
        for entry in entries {
            match entry {
                ArchiveEntry::Dir(name) => self.create_dir_all(&dest.join(name))?,
                ArchiveEntry::File(name, contents) => self.write(&dest.join(name), &contents)?,
            }
        }
        Ok(())
    }

    /// Zips `source_dir` with entries rooted at the directory's own name.
    fn write_archive(&self, source_dir: &Path, archive_path: &Path) -> Result<()> {
        let base = source_dir.parent().unwrap_or(source_dir);
        let mut entries = Vec::new();
        let mut pending = vec![source_dir.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let relative = dir.strip_prefix(base).unwrap_or(&dir);
            entries.push(ArchiveEntry::Dir(format!("{}/", slash_path(relative))));
            for entry in self.list_dir(&dir)? {
                if entry.is_dir {
                    pending.push(entry.path);
                } else {
                    let relative = entry.path.strip_prefix(base).unwrap_or(&entry.path);
                    entries.push(ArchiveEntry::File(slash_path(relative), self.read(&entry.path)?));
                }
            }
        }

        let cursor = archive::write_entries(Cursor::new(Vec::new()), &entries)
            .with_context(|| format!("failed to build archive {}", archive_path.display()))?;
        self.write(archive_path, &cursor.into_inner())
    }

    fn list_archive(&self, archive_path: &Path) -> Result<Vec<String>> {
        let bytes = self.read(archive_path)?;
        archive::entry_names(Cursor::new(bytes.as_slice()))
            .with_context(|| format!("failed to list archive {}", archive_path.display()))
    }

    /// Lowercase hex SHA-256 of a file's contents.
    fn file_sha256(&self, path: &Path) -> Result<String> {
        Ok(archive::sha256_hex(&self.read(path)?))
    }
}

#[derive(Debug, Clone)]
pub struct LocalStorage {
    timeout: Duration,
}

impl LocalStorage {
    pub fn new(download_timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(download_timeout_secs),
        }
    }

    fn open(&self, path: &Path) -> Result<fs::File> {
        fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))
    }

    fn create(&self, path: &Path) -> Result<fs::File> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::File::create(path).with_context(|| format!("failed to create {}", path.display()))
    }

    /// Streams the response body into `dest`.
    fn fetch_http(&self, url: &str, dest: &Path) -> Result<()> {
        let download_err = |reason: String| UpgradeError::Download {
            url: url.to_string(),
            reason,
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|err| download_err(err.to_string()))?;
        let mut response = client
            .get(url)
            .send()
            .map_err(|err| download_err(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(download_err(format!("http status {status}")).into());
        }
        let mut out = BufWriter::new(self.create(dest)?);
        response
            .copy_to(&mut out)
            .map_err(|err| download_err(err.to_string()))?;
        out.flush()
            .with_context(|| format!("failed to write {}", dest.display()))?;
        Ok(())
    }
}

impl Storage for LocalStorage {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("failed to create {}", path.display()))
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let mut out = Vec::new();
        for entry in
            fs::read_dir(path).with_context(|| format!("failed to list {}", path.display()))?
        {
            let entry = entry.with_context(|| format!("failed to list {}", path.display()))?;
            let file_type = entry
                .file_type()
                .with_context(|| format!("failed to stat {}", entry.path().display()))?;
            out.push(DirEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                path: entry.path(),
                is_dir: file_type.is_dir(),
            });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let result = if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        match result {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("failed to remove {}", path.display())),
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        if from == to {
            return Ok(());
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                if matches!(
                    rename_err.kind(),
                    ErrorKind::CrossesDevices | ErrorKind::PermissionDenied
                ) {
                    self.copy(from, to)?;
                    self.remove(from)
                } else {
                    Err(rename_err).with_context(|| {
                        format!("failed to move {} to {}", from.display(), to.display())
                    })
                }
            }
        }
    }

    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return self.fetch_http(url, dest);
        }
        let source = url.strip_prefix("file://").unwrap_or(url);
        if source.trim().is_empty() {
            bail!(UpgradeError::Download {
                url: url.to_string(),
                reason: "empty location".to_string(),
            });
        }
        let mut input = fs::File::open(source).map_err(|err| UpgradeError::Download {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
        let mut out = self.create(dest)?;
        io::copy(&mut input, &mut out)
            .with_context(|| format!("failed to copy {url} to {}", dest.display()))?;
        Ok(())
    }

    fn extract_archive(&self, archive_path: &Path, dest: &Path) -> Result<()> {
        let reader = BufReader::new(self.open(archive_path)?);
        archive::extract_to_dir(reader, dest)
            .with_context(|| format!("failed to unpack archive {}", archive_path.display()))?;
        Ok(())
    }

    /// Streams every file of `source_dir` into the archive; only one entry
    /// is in flight at a time.
    fn write_archive(&self, source_dir: &Path, archive_path: &Path) -> Result<()> {
        let base = source_dir.parent().unwrap_or(source_dir);
        let mut zip = ArchiveWriter::new(BufWriter::new(self.create(archive_path)?));
        let mut pending = vec![source_dir.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let relative = dir.strip_prefix(base).unwrap_or(&dir);
            zip.add_dir(&format!("{}/", slash_path(relative)))?;
            for entry in self.list_dir(&dir)? {
                if entry.is_dir {
                    pending.push(entry.path);
                    continue;
                }
                let relative = entry.path.strip_prefix(base).unwrap_or(&entry.path);
                zip.add_file(&slash_path(relative), BufReader::new(self.open(&entry.path)?))?;
            }
        }
        zip.finish()
            .and_then(|mut out| out.flush().map_err(Into::into))
            .with_context(|| format!("failed to build archive {}", archive_path.display()))
    }

    fn list_archive(&self, archive_path: &Path) -> Result<Vec<String>> {
        archive::entry_names(BufReader::new(self.open(archive_path)?))
            .with_context(|| format!("failed to list archive {}", archive_path.display()))
    }

    fn file_sha256(&self, path: &Path) -> Result<String> {
        archive::sha256_reader(BufReader::new(self.open(path)?))
            .with_context(|| format!("failed to hash {}", path.display()))
    }
}

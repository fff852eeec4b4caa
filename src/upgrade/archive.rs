use anyhow::{Context, Result, bail};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::upgrade::util::slash_path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveEntry {
    Dir(String),
    File(String, Vec<u8>),
}

impl ArchiveEntry {
    pub fn name(&self) -> &str {
        match self {
            ArchiveEntry::Dir(name) | ArchiveEntry::File(name, _) => name,
        }
    }
}

/// Deflated zip writer fed one entry at a time, so file contents can be
/// streamed from disk instead of held in memory.
pub struct ArchiveWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: SimpleFileOptions,
}

impl<W: Write + Seek> ArchiveWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    pub fn add_dir(&mut self, name: &str) -> Result<()> {
        self.zip
            .add_directory(name.trim_end_matches('/'), self.options)
            .with_context(|| format!("failed to add directory {name}"))
    }

    pub fn add_file<R: Read>(&mut self, name: &str, mut contents: R) -> Result<u64> {
        self.zip
            .start_file(name, self.options)
            .with_context(|| format!("failed to start entry {name}"))?;
        io::copy(&mut contents, &mut self.zip)
            .with_context(|| format!("failed to write entry {name}"))
    }

    pub fn finish(self) -> Result<W> {
        self.zip.finish().context("failed to finish archive")
    }
}

/// Writes entries in the given order. Directory names get a trailing `/`.
pub fn write_entries<W: Write + Seek>(writer: W, entries: &[ArchiveEntry]) -> Result<W> {
    let mut archive = ArchiveWriter::new(writer);
    for entry in entries {
        match entry {
            ArchiveEntry::Dir(name) => archive.add_dir(name)?,
            ArchiveEntry::File(name, contents) => {
                archive.add_file(name, contents.as_slice())?;
            }
        }
    }
    archive.finish()
}

/// Unpacks straight onto disk below `dest`, one entry at a time. Names
/// that would escape `dest` are rejected before anything is written for
/// them.
pub fn extract_to_dir<R: Read + Seek>(reader: R, dest: &Path) -> Result<usize> {
    let mut archive = ZipArchive::new(reader).context("failed to read zip archive")?;
    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .with_context(|| format!("failed to read zip entry {i}"))?;
        let Some(safe) = file.enclosed_name() else {
            bail!("zip entry escapes archive root: {}", file.name());
        };
        let target = dest.join(&safe);
        if file.is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("failed to create {}", target.display()))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut out = fs::File::create(&target)
            .with_context(|| format!("failed to create {}", target.display()))?;
        io::copy(&mut file, &mut out)
            .with_context(|| format!("failed to extract {}", target.display()))?;
    }
    Ok(archive.len())
}

/// Reads every entry. Names that would escape the extraction root are
/// rejected.
pub fn read_entries<R: Read + Seek>(reader: R) -> Result<Vec<ArchiveEntry>> {
    let mut archive = ZipArchive::new(reader).context("failed to read zip archive")?;
    let mut out = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .with_context(|| format!("failed to read zip entry {i}"))?;
        let Some(safe) = file.enclosed_name() else {
            bail!("zip entry escapes archive root: {}", file.name());
        };
        let name = slash_path(&safe);

        if file.is_dir() {
            out.push(ArchiveEntry::Dir(name));
        } else {
            let mut contents = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut contents)
                .with_context(|| format!("failed to read zip entry {name}"))?;
            out.push(ArchiveEntry::File(name, contents));
        }
    }

    Ok(out)
}

pub fn entry_names<R: Read + Seek>(reader: R) -> Result<Vec<String>> {
    let archive = ZipArchive::new(reader).context("failed to read zip archive")?;
    Ok(archive.file_names().map(str::to_string).collect())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Incremental digest over a reader; memory use does not grow with size.
pub fn sha256_reader<R: Read>(mut reader: R) -> Result<String> {
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher).context("failed to hash stream")?;
    Ok(format!("{:x}", hasher.finalize()))
}

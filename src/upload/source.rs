use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Random-access file contents for an upload.
pub trait FileSource: Send {
    fn name(&self) -> &str;

    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill `buf` completely from `offset`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;
}

/// File already held in memory (drag-and-drop payloads, tests).
#[derive(Debug, Clone)]
pub struct MemoryFile {
    name: String,
    data: Vec<u8>,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

impl FileSource for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let start = usize::try_from(offset).context("offset out of range")?;
        let end = start
            .checked_add(buf.len())
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| anyhow!("read past end of {}", self.name))?;
        buf.copy_from_slice(&self.data[start..end]);
        Ok(())
    }
}

/// File on disk, read slice by slice so large uploads stay out of memory.
#[derive(Debug)]
pub struct DiskFile {
    name: String,
    file: File,
    len: u64,
}

impl DiskFile {
    pub fn open(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow!("'{}' has no usable file name", path.display()))?
            .to_string();
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let len = file
            .metadata()
            .with_context(|| format!("failed to stat {}", path.display()))?
            .len();
        Ok(Self { name, file, len })
    }
}

impl FileSource for DiskFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(offset))
            .with_context(|| format!("failed to seek {}", self.name))?;
        self.file
            .read_exact(buf)
            .with_context(|| format!("failed to read {}", self.name))
    }
}

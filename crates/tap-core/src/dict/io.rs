//! Dictionary file I/O.
//!
//! Read-only sessions map the file; updatable sessions own a copy of the
//! bytes. Flushing always goes through a temporary file, fsync and rename,
//! so the file on disk is either the old image or the new one.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use super::buffers::DictBuffers;
use super::{gc, DictError, DictHeader, Dictionary};

impl Dictionary {
    /// Open a dictionary read-only, using mmap for zero-copy access.
    pub fn open(path: &Path) -> Result<Self, DictError> {
        let file = File::open(path)?;
        // SAFETY: The file is opened read-only and the mapping is immutable.
        let mmap = unsafe { Mmap::map(&file)? };
        let header = DictHeader::parse(&mmap)?;
        Ok(Self {
            header,
            buffers: DictBuffers::from_mmap(mmap),
        })
    }

    /// Open a dictionary for updating. The whole image is read into memory;
    /// mutations live there until `flush`.
    pub fn open_updatable(path: &Path) -> Result<Self, DictError> {
        let bytes = fs::read(path)?;
        let header = DictHeader::parse(&bytes)?;
        if !header.version().is_updatable() {
            return Err(DictError::ReadOnly);
        }
        Ok(Self {
            header,
            buffers: DictBuffers::from_owned(bytes, true),
        })
    }

    /// Write the current image to `path` (tmp + fsync + rename).
    ///
    /// The header is re-serialized to pick up entry counts; body offsets are
    /// self-relative, so the body bytes move under the new header verbatim.
    pub fn flush(&mut self, path: &Path) -> Result<(), DictError> {
        let mut header = self.header.clone();
        let mut image = header.serialize();
        image.extend_from_slice(&self.buffers.body_from(self.header.root_pos() as usize));

        write_atomically(path, &image)?;
        debug!(bytes = image.len(), path = %path.display(), "flushed dictionary");

        // Rebase onto the flushed image so memory matches disk again.
        let writable = self.buffers.is_writable();
        self.buffers = DictBuffers::from_owned(image, writable);
        self.header = header;
        Ok(())
    }

    /// Garbage-collect into a fresh compact image and write it to `path`.
    /// The in-memory dictionary switches to the rebuilt image.
    pub fn flush_with_gc(&mut self, path: &Path, now: u32) -> Result<(), DictError> {
        if !self.header.version().is_updatable() || !self.buffers.is_writable() {
            return Err(DictError::ReadOnly);
        }

        // Counts are not known until the mark phase, but the header must be
        // sized before node positions can be assigned. Count and date
        // attributes are fixed-width, so updating them afterwards keeps the
        // serialized length stable.
        let mut header = self.header.clone();
        header.set_date(now as u64);
        let new_root_pos = header.serialize().len() as super::DictPos;

        let result = gc::run(
            &self.buffers,
            self.header.version(),
            self.header.root_pos(),
            new_root_pos,
            now,
        )?;

        header.set_unigram_count(result.unigram_count);
        header.set_bigram_count(result.bigram_count);
        let mut image = header.serialize();
        debug_assert_eq!(image.len(), new_root_pos as usize);
        image.extend_from_slice(&result.body);

        write_atomically(path, &image)?;
        debug!(
            unigrams = result.unigram_count,
            bigrams = result.bigram_count,
            bytes = image.len(),
            path = %path.display(),
            "flushed dictionary with gc"
        );

        self.buffers = DictBuffers::from_owned(image, true);
        self.header = header;
        Ok(())
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), DictError> {
    let tmp = path.with_extension("tmp");
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

use std::collections::{HashMap, HashSet};
use std::io;

use super::DeviceIo;

/// One transfer issued against an in-memory device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRead {
    pub path: String,
    pub offset: u64,
    pub len: usize,
}

#[derive(Debug)]
pub struct MemHandle {
    path: String,
    pos: u64,
}

/// In-memory devices keyed by firmware path, with a transfer log.
#[derive(Debug, Default)]
pub struct MemDevices {
    images: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    reads: Vec<DeviceRead>,
    opens: usize,
    closes: usize,
}

impl MemDevices {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, image: Vec<u8>) {
        self.images.insert(path.into(), image);
    }

    /// Makes every later read from `path` fail.
    pub fn fail_reads(&mut self, path: impl Into<String>) {
        self.failing.insert(path.into());
    }

    #[must_use]
    pub fn reads(&self) -> &[DeviceRead] {
        &self.reads
    }

    pub fn clear_reads(&mut self) {
        self.reads.clear();
    }

    #[must_use]
    pub const fn opens(&self) -> usize {
        self.opens
    }

    #[must_use]
    pub const fn closes(&self) -> usize {
        self.closes
    }
}

impl DeviceIo for MemDevices {
    type Handle = MemHandle;

    fn open(&mut self, path: &str) -> io::Result<MemHandle> {
        if !self.images.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no device at {path}"),
            ));
        }
        self.opens += 1;
        Ok(MemHandle {
            path: path.to_string(),
            pos: 0,
        })
    }

    fn seek(&mut self, handle: &mut MemHandle, offset: u64) -> io::Result<()> {
        handle.pos = offset;
        Ok(())
    }

    fn read(&mut self, handle: &mut MemHandle, buf: &mut [u8]) -> io::Result<usize> {
        self.reads.push(DeviceRead {
            path: handle.path.clone(),
            offset: handle.pos,
            len: buf.len(),
        });
        if self.failing.contains(&handle.path) {
            return Err(io::Error::other(format!("injected failure on {}", handle.path)));
        }
        let image = self
            .images
            .get(&handle.path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, handle.path.clone()))?;

        let Ok(off) = usize::try_from(handle.pos) else {
            return Ok(0);
        };
        if off >= image.len() {
            return Ok(0);
        }
        let end = off.saturating_add(buf.len()).min(image.len());
        let n = end - off;
        buf[..n].copy_from_slice(&image[off..end]);
        handle.pos += n as u64;
        Ok(n)
    }

    fn close(&mut self, handle: MemHandle) {
        drop(handle);
        self.closes += 1;
    }
}

use memmap2::{Mmap, MmapOptions};
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use super::DeviceIo;

/// A read-only, memory-mapped disk image.
pub struct Disk {
    path: PathBuf,
    map: Option<Mmap>,
    len: u64,
}

impl Disk {
    /// # Errors
    /// Returns an error if the image cannot be opened or mapped.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        let map = if len == 0 {
            None
        } else {
            let map_len = usize::try_from(len).map_err(|_| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("image length {len} exceeds addressable size"),
                )
            })?;
            // The mapping is read-only and the image is not resized while the loader runs.
            Some(unsafe { MmapOptions::new().len(map_len).map(&file)? })
        };

        Ok(Self {
            path: path.to_path_buf(),
            map,
            len,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn read_at(&self, off: u64, buf: &mut [u8]) -> usize {
        let Some(map) = self.map.as_ref() else {
            return 0;
        };
        let Ok(off) = usize::try_from(off) else {
            return 0;
        };
        if off >= map.len() {
            return 0;
        }
        let end = off.saturating_add(buf.len()).min(map.len());
        let src = &map[off..end];
        let n = src.len();
        buf[..n].copy_from_slice(src);
        n
    }
}

/// Open image plus the device cursor.
pub struct DiskHandle {
    disk: Disk,
    pos: u64,
}

impl DiskHandle {
    #[must_use]
    pub const fn disk(&self) -> &Disk {
        &self.disk
    }
}

/// Host stand-in for the firmware's device tree: firmware paths resolve to image files.
#[derive(Debug, Default)]
pub struct ImageDevices {
    aliases: HashMap<String, PathBuf>,
}

impl ImageDevices {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes the firmware path `device` to the image at `image`.
    pub fn map(&mut self, device: impl Into<String>, image: impl Into<PathBuf>) {
        self.aliases.insert(device.into(), image.into());
    }

    /// Image backing `device`; unmapped paths are taken as host paths.
    #[must_use]
    pub fn resolve(&self, device: &str) -> PathBuf {
        self.aliases
            .get(device)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(device))
    }
}

impl DeviceIo for ImageDevices {
    type Handle = DiskHandle;

    fn open(&mut self, path: &str) -> io::Result<DiskHandle> {
        let disk = Disk::open(&self.resolve(path))?;
        Ok(DiskHandle { disk, pos: 0 })
    }

    fn seek(&mut self, handle: &mut DiskHandle, offset: u64) -> io::Result<()> {
        handle.pos = offset;
        Ok(())
    }

    fn read(&mut self, handle: &mut DiskHandle, buf: &mut [u8]) -> io::Result<usize> {
        let n = handle.disk.read_at(handle.pos, buf);
        handle.pos += n as u64;
        Ok(n)
    }

    fn close(&mut self, handle: DiskHandle) {
        drop(handle);
    }
}

//! Block-device collaborators consumed by the assembly.

mod disk;
#[cfg(test)]
mod disk_tests;
mod memory;

pub use disk::{Disk, DiskHandle, ImageDevices};
pub use memory::{DeviceRead, MemDevices, MemHandle};

use std::io;

/// Raw device access by firmware path.
///
/// `read` may return fewer bytes than requested; callers check the count.
pub trait DeviceIo {
    type Handle;

    /// # Errors
    /// Returns an error if no device answers to `path`.
    fn open(&mut self, path: &str) -> io::Result<Self::Handle>;

    /// Positions the handle's absolute byte cursor.
    ///
    /// # Errors
    /// Returns an error if the device rejects the position.
    fn seek(&mut self, handle: &mut Self::Handle, offset: u64) -> io::Result<()>;

    /// # Errors
    /// Returns an error if the device fails the transfer.
    fn read(&mut self, handle: &mut Self::Handle, buf: &mut [u8]) -> io::Result<usize>;

    fn close(&mut self, handle: Self::Handle);
}

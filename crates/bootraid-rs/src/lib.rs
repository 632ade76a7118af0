//! AppleRAID discovery, assembly and read engine for the boot path.
//!
//! Candidate partitions are checked for a trailing `AppleRAIDHeader`, grouped
//! into mirror/stripe/concat sets (possibly nested), and the set holding the
//! booted partition is then readable through [`assembly::RaidAssembly::read`].
#![allow(clippy::cargo_common_metadata)]

pub mod assembly;
pub mod device;
pub mod error;
pub mod header;
pub mod metadata;
pub mod metrics;
pub mod plist;

#[cfg(test)]
mod fixtures;

pub use assembly::{
    AssemblyConfig, AssemblyEvent, BootEnv, BootPaths, BootTarget, FirmwarePaths, Member,
    MemberId, MemberKind, RaidAssembly, RaidSet, RaidType,
};
pub use error::RaidError;

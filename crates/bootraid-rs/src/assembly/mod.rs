//! RAID set assembly and the read engine.
//!
//! [`RaidAssembly`] owns the member arena. Discovery fills it with leaves,
//! assimilation groups them into (possibly nested) sets, and reads then walk
//! the finished forest down to the leaf devices.

mod assimilate;
mod bootstrap;
mod mapper;
mod member;
mod read;
mod registry;
#[cfg(test)]
mod registry_tests;

pub use bootstrap::{BootEnv, BootPaths, BootTarget, FirmwarePaths};
pub use mapper::StripeCursor;
pub use member::{ChunkGeometry, Member, MemberId, MemberKind, RaidSet, RaidType, SetSpec};

use std::fmt::Write;

use crate::device::DeviceIo;
use crate::error::RaidError;

/// Tunables for discovery and the synthesized boot path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssemblyConfig {
    /// Prefix of boot paths that name an assembled set.
    pub raid_prefix: String,
    /// Secondary loader appended to the rewritten boot path.
    pub secondary_loader: String,
    /// Arena slots reserved per boot-config partition entry.
    pub fanout: usize,
    /// Arena slots reserved when the boot config is a single partition.
    pub single_spec_capacity: usize,
    /// Deepest set nesting accepted during assimilation.
    pub max_nesting_depth: usize,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            raid_prefix: "AppleRAID".to_string(),
            secondary_loader: ":tbxi".to_string(),
            fanout: 3,
            single_spec_capacity: 4,
            max_nesting_depth: 8,
        }
    }
}

impl AssemblyConfig {
    /// `raid_boot_path` names the set at `id` as a boot device.
    #[must_use]
    pub fn raid_boot_path(&self, id: MemberId) -> String {
        format!("{}/{}:0,\\{}", self.raid_prefix, id, self.secondary_loader)
    }

    #[must_use]
    pub fn is_raid_path(&self, path: &str) -> bool {
        path.strip_prefix(self.raid_prefix.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Arena index encoded in a path produced by [`Self::raid_boot_path`].
    #[must_use]
    pub fn parse_raid_path(&self, path: &str) -> Option<usize> {
        let rest = path.strip_prefix(self.raid_prefix.as_str())?.strip_prefix('/')?;
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        rest[..end].parse().ok()
    }
}

/// Something noteworthy that happened while adopting members.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssemblyEvent {
    /// The boot-relevant member became part of `to`.
    Succession { from: MemberId, to: MemberId },
    Adopted { parent: MemberId, child: MemberId, slot: usize },
    /// A mirror leg from an older generation was ignored.
    StaleMember { parent: MemberId, child: MemberId, seq_num: u64, current: u64 },
    /// A newer mirror leg evicted every current leg.
    GenerationAdvanced { parent: MemberId, from: u64, to: u64 },
    /// Two members claimed the same slot; the later one replaced the earlier.
    DuplicateSlot { parent: MemberId, slot: usize, previous: MemberId, replacement: MemberId },
    CandidateRejected { member: MemberId, reason: String },
}

/// Arena of RAID members plus the device collaborator used to read them.
pub struct RaidAssembly<D: DeviceIo> {
    io: D,
    config: AssemblyConfig,
    members: Vec<Member<D::Handle>>,
    capacity: usize,
    master: Option<MemberId>,
    events: Vec<AssemblyEvent>,
}

impl<D: DeviceIo> RaidAssembly<D> {
    /// Creates an assembly with an empty arena; call [`Self::reserve`] before allocating.
    pub const fn new(io: D, config: AssemblyConfig) -> Self {
        Self {
            io,
            config,
            members: Vec::new(),
            capacity: 0,
            master: None,
            events: Vec::new(),
        }
    }

    /// # Errors
    /// Returns [`RaidError::ArenaFull`] if the arena cannot be allocated.
    pub fn with_capacity(io: D, config: AssemblyConfig, capacity: usize) -> Result<Self, RaidError> {
        let mut assembly = Self::new(io, config);
        assembly.reserve(capacity)?;
        Ok(assembly)
    }

    pub const fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    pub const fn io(&self) -> &D {
        &self.io
    }

    pub const fn io_mut(&mut self) -> &mut D {
        &mut self.io
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The member standing for the partition the system booted from.
    pub const fn master(&self) -> Option<MemberId> {
        self.master
    }

    pub const fn set_master(&mut self, id: Option<MemberId>) {
        self.master = id;
    }

    pub fn events(&self) -> &[AssemblyEvent] {
        &self.events
    }

    /// # Errors
    /// Returns [`RaidError::UnknownMember`] if `id` is not allocated.
    pub fn member(&self, id: MemberId) -> Result<&Member<D::Handle>, RaidError> {
        self.members.get(id.0).ok_or(RaidError::UnknownMember(id))
    }

    pub(crate) fn member_mut(&mut self, id: MemberId) -> Result<&mut Member<D::Handle>, RaidError> {
        self.members.get_mut(id.0).ok_or(RaidError::UnknownMember(id))
    }

    pub fn members(&self) -> impl Iterator<Item = (MemberId, &Member<D::Handle>)> {
        self.members.iter().enumerate().map(|(i, m)| (MemberId(i), m))
    }

    #[must_use]
    pub fn is_raid_path(&self, path: &str) -> bool {
        self.config.is_raid_path(path)
    }

    /// `open_raid_path` resolves a synthesized boot path back to its set.
    ///
    /// # Errors
    /// Returns [`RaidError::BadBootConfig`] if `path` is not a RAID path and
    /// [`RaidError::UnknownMember`] if it names no allocated member.
    pub fn open_raid_path(&self, path: &str) -> Result<MemberId, RaidError> {
        let index = self
            .config
            .parse_raid_path(path)
            .ok_or_else(|| RaidError::BadBootConfig(format!("{path} is not a RAID path")))?;
        let id = MemberId(index);
        self.member(id)?;
        Ok(id)
    }

    /// Renders the member forest, one line per member, children indented under their set.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut referenced = vec![false; self.members.len()];
        for member in &self.members {
            if let Some(set) = member.as_set() {
                for child in set.members.iter().flatten() {
                    if let Some(flag) = referenced.get_mut(child.0) {
                        *flag = true;
                    }
                }
            }
        }

        let mut out = String::new();
        for (i, _) in referenced.iter().enumerate().filter(|(_, r)| !**r) {
            self.describe_into(&mut out, MemberId(i), 0);
        }
        out
    }

    fn describe_into(&self, out: &mut String, id: MemberId, depth: usize) {
        let Some(member) = self.members.get(id.0) else {
            return;
        };
        let indent = "  ".repeat(depth);
        let marker = if self.master == Some(id) { " *" } else { "" };
        match &member.kind {
            MemberKind::Leaf { .. } => {
                let _ = writeln!(
                    out,
                    "{indent}[{id}] leaf {} size={}{marker}",
                    member.path, member.size
                );
            }
            MemberKind::Composite(set) => {
                let state = if set.is_complete() { "complete" } else { "incomplete" };
                let _ = writeln!(
                    out,
                    "{indent}[{id}] {} {} seq={} members={}/{} size={} {state}{marker}",
                    set.raid_type,
                    set.set_uuid,
                    set.seq_num,
                    set.current_member_count,
                    set.members.len(),
                    member.size,
                );
                for (slot, child) in set.members.iter().enumerate() {
                    match child {
                        Some(child) => self.describe_into(out, *child, depth + 1),
                        None => {
                            let _ = writeln!(out, "{indent}  [-] slot {slot} missing");
                        }
                    }
                }
            }
        }
    }
}

use std::fmt;

use crate::plist::Dict;

/// Index of a member in the assembly's arena.
///
/// Ids are weak references: the arena owns every member and ids stay valid
/// until the arena is reset.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(pub usize);

impl MemberId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a composite set.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RaidType {
    Mirror,
    Stripe,
    Concat,
}

impl RaidType {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mirror => "Mirror",
            Self::Stripe => "Stripe",
            Self::Concat => "Concat",
        }
    }
}

impl fmt::Display for RaidType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stripe unit description.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChunkGeometry {
    pub chunk_size: u64,
    pub chunk_count: u64,
}

/// Parameters for a new composite, taken from the first member that names it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetSpec {
    pub set_uuid: String,
    pub raid_type: RaidType,
    pub seq_num: u64,
    pub total_members: u64,
    /// Required for stripes, ignored otherwise.
    pub chunk: Option<ChunkGeometry>,
}

/// Composite state: a mirror, stripe or concatenation of other members.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RaidSet {
    pub(crate) raid_type: RaidType,
    pub(crate) set_uuid: String,
    pub(crate) seq_num: u64,
    pub(crate) current_member_count: usize,
    /// One slot per declared member, addressed by the member's own index.
    pub(crate) members: Vec<Option<MemberId>>,
    pub(crate) chunk: Option<ChunkGeometry>,
}

impl RaidSet {
    #[must_use]
    pub const fn raid_type(&self) -> RaidType {
        self.raid_type
    }

    #[must_use]
    pub fn set_uuid(&self) -> &str {
        &self.set_uuid
    }

    #[must_use]
    pub const fn seq_num(&self) -> u64 {
        self.seq_num
    }

    #[must_use]
    pub fn total_members(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub const fn current_member_count(&self) -> usize {
        self.current_member_count
    }

    #[must_use]
    pub fn members(&self) -> &[Option<MemberId>] {
        &self.members
    }

    #[must_use]
    pub const fn chunk(&self) -> Option<ChunkGeometry> {
        self.chunk
    }

    /// Number of filled slots; always equal to `current_member_count`.
    #[must_use]
    pub fn live_members(&self) -> usize {
        self.members.iter().flatten().count()
    }

    /// Mirrors need one leg; stripes and concats need every member.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        match self.raid_type {
            RaidType::Mirror => self.current_member_count > 0,
            RaidType::Stripe | RaidType::Concat => {
                self.current_member_count == self.members.len()
            }
        }
    }
}

#[derive(Debug)]
pub enum MemberKind<H> {
    /// A partition; the device is opened on first read.
    Leaf { handle: Option<H> },
    Composite(RaidSet),
}

#[derive(Debug)]
pub struct Member<H> {
    pub(crate) path: String,
    pub(crate) size: u64,
    pub(crate) cur_offset: u64,
    /// Header properties, kept once the member's header has been parsed.
    pub(crate) props: Option<Dict>,
    pub(crate) kind: MemberKind<H>,
}

impl<H> Member<H> {
    pub(crate) const fn leaf(path: String, size: u64) -> Self {
        Self {
            path,
            size,
            cur_offset: 0,
            props: None,
            kind: MemberKind::Leaf { handle: None },
        }
    }

    pub(crate) const fn composite(set: RaidSet) -> Self {
        Self {
            path: String::new(),
            size: 0,
            cur_offset: 0,
            props: None,
            kind: MemberKind::Composite(set),
        }
    }

    /// Firmware path of a leaf; empty for composites.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Readable bytes; excludes the trailing header once the member is assimilated.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub const fn cur_offset(&self) -> u64 {
        self.cur_offset
    }

    #[must_use]
    pub const fn props(&self) -> Option<&Dict> {
        self.props.as_ref()
    }

    #[must_use]
    pub const fn kind(&self) -> &MemberKind<H> {
        &self.kind
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self.kind, MemberKind::Leaf { .. })
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.kind, MemberKind::Leaf { handle: Some(_) })
    }

    #[must_use]
    pub const fn as_set(&self) -> Option<&RaidSet> {
        match &self.kind {
            MemberKind::Composite(set) => Some(set),
            MemberKind::Leaf { .. } => None,
        }
    }
}

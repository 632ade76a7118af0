//! Error taxonomy for assembly and reads.

use std::io;

use crate::assembly::MemberId;

/// Errors produced while assembling RAID sets or reading from them.
#[derive(Debug, thiserror::Error)]
pub enum RaidError {
    /// The candidate carries no `AppleRAIDHeader` (or the header block could not be read whole).
    #[error("RAID: member {member} has no AppleRAIDHeader magic")]
    NoMagic { member: MemberId },

    /// The header's property list is malformed or is not a dictionary.
    #[error("RAID: member {member} has a bad header plist: {reason}")]
    BadPlist { member: MemberId, reason: String },

    /// A required header property is missing or malformed.
    #[error("RAID: bad metadata: {0}")]
    BadMetadata(String),

    /// The level name is not one of Mirror, Stripe or Concat.
    #[error("RAID: unsupported RAID type {0:?}")]
    UnsupportedRaidType(String),

    /// A set declared an unusable member count.
    #[error("RAID: invalid member count {0}")]
    InvalidMemberCount(u64),

    /// Every arena slot is in use.
    #[error("RAID: member table full ({capacity} entries)")]
    ArenaFull { capacity: usize },

    /// A read was requested past the end of a member.
    #[error("RAID: member {member} offset {offset} beyond size {size}")]
    OffsetOutOfRange { member: MemberId, offset: u64, size: u64 },

    /// A mirror has no live leg to read from.
    #[error("RAID: mirror {member} has no working member")]
    NoWorkingMember { member: MemberId },

    /// A stripe or concat set is missing the member in `slot`.
    #[error("RAID: set {member} is missing member {slot}")]
    MissingMember { member: MemberId, slot: usize },

    /// Sets nest deeper than the configured bound.
    #[error("RAID: set nesting deeper than {depth} levels")]
    NestingTooDeep { depth: usize },

    /// The id does not name an arena entry.
    #[error("RAID: no member {0}")]
    UnknownMember(MemberId),

    /// The underlying device failed to open, seek or read.
    #[error("RAID: I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Discovery finished without the boot partition belonging to any set.
    #[error("RAID: no RAID set found for the boot partition")]
    NoRaidFound,

    /// The boot partition's set is known but not all members were found.
    #[error("RAID: set {member} is incomplete ({current} of {total} members)")]
    IncompleteSet { member: MemberId, current: usize, total: usize },

    /// The boot configuration is neither a partition list nor a single partition dictionary.
    #[error("RAID: bad boot configuration: {0}")]
    BadBootConfig(String),
}

impl RaidError {
    /// Metadata errors only disqualify the candidate they were raised for.
    #[must_use]
    pub const fn is_metadata(&self) -> bool {
        matches!(
            self,
            Self::NoMagic { .. }
                | Self::BadPlist { .. }
                | Self::BadMetadata(_)
                | Self::UnsupportedRaidType(_)
        )
    }
}

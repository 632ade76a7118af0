use tracing::{debug, info, warn};

use super::{AssemblyEvent, ChunkGeometry, Member, MemberId, MemberKind, RaidAssembly, RaidType, SetSpec};
use crate::device::DeviceIo;
use crate::error::RaidError;
use crate::header::{HEADER_SIZE, RaidHeader, header_offset};
use crate::metadata::{
    CHUNK_COUNT_KEY, CHUNK_SIZE_KEY, MEMBER_INDEX_KEY, SEQUENCE_NUMBER_KEY, SET_UUID_KEY,
    members_len, raid_type_of, string_property, whole_number,
};
use crate::plist::{self, Dict, Value};

/// What adoption did with a candidate.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Adoption {
    /// The candidate now fills `slot`.
    Assigned { slot: usize },
    /// Older mirror generation; left out.
    Stale,
    /// The candidate already fills its slot; it was already examined.
    AlreadyMember,
}

impl<D: DeviceIo> RaidAssembly<D> {
    /// `assimilate` reads the RAID header of `candidate` and files it into its set.
    ///
    /// When that set becomes complete it is examined in turn, so nested sets
    /// assemble bottom-up. Only the candidate is affected by a failure.
    ///
    /// # Errors
    /// Returns the reason the candidate could not join a set; metadata errors
    /// ([`RaidError::is_metadata`]) mean it is simply not a RAID member.
    pub fn assimilate(&mut self, candidate: MemberId) -> Result<(), RaidError> {
        self.assimilate_at(candidate, 0)
    }

    fn assimilate_at(&mut self, candidate: MemberId, depth: usize) -> Result<(), RaidError> {
        if depth > self.config.max_nesting_depth {
            return Err(RaidError::NestingTooDeep {
                depth: self.config.max_nesting_depth,
            });
        }

        let outcome = self
            .read_props(candidate)
            .and_then(|()| self.find_or_create_parent(candidate))
            .and_then(|parent| self.adopt(candidate, parent).map(|a| (parent, a)));

        let (parent, adoption) = match outcome {
            Ok(done) => done,
            Err(err) => {
                if matches!(err, RaidError::NoMagic { .. }) {
                    debug!("{err}");
                } else {
                    warn!("RAID: dropping member {candidate}: {err}");
                }
                self.events.push(AssemblyEvent::CandidateRejected {
                    member: candidate,
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };

        if matches!(adoption, Adoption::Assigned { .. }) && self.is_complete(Some(parent)) {
            info!("RAID: set {parent} is complete, checking for an enclosing set");
            match self.assimilate_at(parent, depth + 1) {
                Ok(()) => {}
                Err(err @ RaidError::NestingTooDeep { .. }) => return Err(err),
                Err(err) => debug!("RAID: set {parent} is top level: {err}"),
            }
        }
        Ok(())
    }

    /// Reads the trailing header of `candidate`, shrinks it to its data region,
    /// and keeps the parsed properties on the member.
    fn read_props(&mut self, candidate: MemberId) -> Result<(), RaidError> {
        let size = self.member(candidate)?.size;
        let offset = header_offset(size).ok_or(RaidError::NoMagic { member: candidate })?;

        let mut block = vec![0u8; HEADER_SIZE];
        let n = self.read(candidate, &mut block, offset)?;
        if n < HEADER_SIZE {
            return Err(RaidError::NoMagic { member: candidate });
        }
        let header =
            RaidHeader::parse(&block).map_err(|_| RaidError::NoMagic { member: candidate })?;
        debug!(
            "RAID: member {candidate} header set={} member={} size={}",
            header.raid_uuid, header.member_uuid, header.size
        );

        if header.size > offset {
            return Err(RaidError::BadMetadata(format!(
                "member {candidate} header claims {} data bytes, only {offset} precede it",
                header.size
            )));
        }
        self.member_mut(candidate)?.size = header.size;

        let props = match plist::parse(RaidHeader::plist_region(&block)) {
            Ok(Value::Dict(dict)) => dict,
            Ok(other) => {
                return Err(RaidError::BadPlist {
                    member: candidate,
                    reason: format!("header plist is a {}", other.kind()),
                });
            }
            Err(err) => {
                return Err(RaidError::BadPlist {
                    member: candidate,
                    reason: err.to_string(),
                });
            }
        };
        self.member_mut(candidate)?.props = Some(props);
        Ok(())
    }

    fn props(&self, id: MemberId) -> Result<&Dict, RaidError> {
        self.member(id)?
            .props
            .as_ref()
            .ok_or_else(|| RaidError::BadMetadata(format!("member {id} has no header properties")))
    }

    fn member_index(&self, id: MemberId) -> Result<usize, RaidError> {
        let index = whole_number(self.props(id)?, MEMBER_INDEX_KEY)?;
        usize::try_from(index)
            .map_err(|_| RaidError::BadMetadata(format!("{MEMBER_INDEX_KEY} {index} out of range")))
    }

    fn find_or_create_parent(&mut self, candidate: MemberId) -> Result<MemberId, RaidError> {
        let props = self.props(candidate)?;
        let seq_num = whole_number(props, SEQUENCE_NUMBER_KEY)?;
        let index = self.member_index(candidate)?;
        let set_uuid = string_property(props, SET_UUID_KEY)?;

        if let Some(parent) = self.find_composite(set_uuid, seq_num, index) {
            return Ok(parent);
        }

        let total_members = members_len(props)? as u64;
        let raid_type = raid_type_of(props)?;
        let chunk = if raid_type == RaidType::Stripe {
            Some(ChunkGeometry {
                chunk_size: whole_number(props, CHUNK_SIZE_KEY)?,
                chunk_count: whole_number(props, CHUNK_COUNT_KEY)?,
            })
        } else {
            None
        };
        if index as u64 >= total_members {
            return Err(RaidError::BadMetadata(format!(
                "member index {index} outside a set of {total_members}"
            )));
        }

        let spec = SetSpec {
            set_uuid: set_uuid.to_string(),
            raid_type,
            seq_num,
            total_members,
            chunk,
        };
        self.allocate_composite(spec)
    }

    /// `adopt` files `candidate` into `parent` at the slot named by its header.
    pub(crate) fn adopt(&mut self, candidate: MemberId, parent: MemberId) -> Result<Adoption, RaidError> {
        if self.subtree_contains(candidate, parent) {
            return Err(RaidError::BadMetadata(format!(
                "set {parent} would become a member of itself through {candidate}"
            )));
        }
        if self.master == Some(candidate) {
            self.master = Some(parent);
            self.events.push(AssemblyEvent::Succession {
                from: candidate,
                to: parent,
            });
            info!("RAID: boot member {candidate} is part of set {parent}");
        }

        let slot = self.member_index(candidate)?;
        let candidate_size = self.member(candidate)?.size;
        let raid_type = self.set(parent)?.raid_type;
        let candidate_seq = match raid_type {
            RaidType::Mirror => Some(whole_number(self.props(candidate)?, SEQUENCE_NUMBER_KEY)?),
            RaidType::Stripe | RaidType::Concat => None,
        };

        let Some(Member { size, kind, .. }) = self.members.get_mut(parent.0) else {
            return Err(RaidError::UnknownMember(parent));
        };
        let MemberKind::Composite(set) = kind else {
            return Err(RaidError::BadMetadata(format!("member {parent} is not a RAID set")));
        };
        if slot >= set.members.len() {
            return Err(RaidError::BadMetadata(format!(
                "member index {slot} outside a set of {}",
                set.members.len()
            )));
        }
        if set.members[slot] == Some(candidate) {
            return Ok(Adoption::AlreadyMember);
        }

        let mut events = Vec::new();
        if let Some(seq) = candidate_seq {
            if seq < set.seq_num {
                debug!(
                    "RAID: member {candidate} seq {seq} is older than set {parent} seq {}, ignoring",
                    set.seq_num
                );
                self.events.push(AssemblyEvent::StaleMember {
                    parent,
                    child: candidate,
                    seq_num: seq,
                    current: set.seq_num,
                });
                return Ok(Adoption::Stale);
            }
            if seq > set.seq_num {
                info!(
                    "RAID: member {candidate} seq {seq} is newer than set {parent} seq {}, evicting older members",
                    set.seq_num
                );
                events.push(AssemblyEvent::GenerationAdvanced {
                    parent,
                    from: set.seq_num,
                    to: seq,
                });
                set.members.fill(None);
                set.current_member_count = 0;
                set.seq_num = seq;
            }
        } else {
            *size = size.checked_add(candidate_size).ok_or_else(|| {
                RaidError::BadMetadata(format!(
                    "set {parent} size overflows adding {candidate_size} bytes of member {candidate}"
                ))
            })?;
        }

        match set.members[slot].replace(candidate) {
            Some(previous) => {
                warn!(
                    "RAID: set {parent} slot {slot} already held member {previous}, replacing with {candidate}"
                );
                events.push(AssemblyEvent::DuplicateSlot {
                    parent,
                    slot,
                    previous,
                    replacement: candidate,
                });
            }
            None => set.current_member_count += 1,
        }
        if candidate_seq.is_some() {
            *size = candidate_size;
        }
        debug!(
            "RAID: member {candidate} joined set {parent} at slot {slot} ({}/{})",
            set.current_member_count,
            set.members.len()
        );

        events.push(AssemblyEvent::Adopted {
            parent,
            child: candidate,
            slot,
        });
        self.events.extend(events);
        Ok(Adoption::Assigned { slot })
    }

    /// Whether `target` is `root` or lies anywhere beneath it.
    fn subtree_contains(&self, root: MemberId, target: MemberId) -> bool {
        let mut seen = vec![false; self.members.len()];
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            let Some(flag) = seen.get_mut(id.0) else {
                continue;
            };
            if std::mem::replace(flag, true) {
                continue;
            }
            if let Some(set) = self.members.get(id.0).and_then(Member::as_set) {
                stack.extend(set.members.iter().flatten().copied());
            }
        }
        false
    }
}

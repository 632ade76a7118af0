use tracing::debug;

use super::{Member, MemberId, MemberKind, RaidAssembly, RaidSet, RaidType, SetSpec};
use crate::device::DeviceIo;
use crate::error::RaidError;

impl<D: DeviceIo> RaidAssembly<D> {
    /// `reserve` resets the arena to hold at most `capacity` members.
    ///
    /// Open leaf handles are closed, and the boot master and event log are cleared.
    ///
    /// # Errors
    /// Returns [`RaidError::ArenaFull`] if the storage cannot be allocated.
    pub fn reserve(&mut self, capacity: usize) -> Result<(), RaidError> {
        self.close_all();
        self.members.clear();
        self.events.clear();
        self.master = None;
        self.capacity = 0;
        self.members
            .try_reserve_exact(capacity)
            .map_err(|_| RaidError::ArenaFull { capacity })?;
        self.capacity = capacity;
        Ok(())
    }

    fn push(&mut self, member: Member<D::Handle>) -> Result<MemberId, RaidError> {
        if self.members.len() >= self.capacity {
            return Err(RaidError::ArenaFull {
                capacity: self.capacity,
            });
        }
        let id = MemberId(self.members.len());
        self.members.push(member);
        Ok(id)
    }

    /// # Errors
    /// Returns [`RaidError::ArenaFull`] if no slot is left.
    pub fn allocate_leaf(&mut self, path: &str, size: u64) -> Result<MemberId, RaidError> {
        let id = self.push(Member::leaf(path.to_string(), size))?;
        debug!("RAID: leaf {id} at {path}, size {size}");
        Ok(id)
    }

    /// `allocate_composite` creates an empty set with one slot per declared member.
    ///
    /// Nothing is allocated when validation fails.
    ///
    /// # Errors
    /// Returns [`RaidError::InvalidMemberCount`] for a zero or unaddressable
    /// member count, [`RaidError::BadMetadata`] for a stripe without a usable
    /// chunk size, and [`RaidError::ArenaFull`] if no slot is left.
    pub fn allocate_composite(&mut self, spec: SetSpec) -> Result<MemberId, RaidError> {
        let total = usize::try_from(spec.total_members)
            .ok()
            .filter(|&n| n > 0)
            .ok_or(RaidError::InvalidMemberCount(spec.total_members))?;

        let chunk = match spec.raid_type {
            RaidType::Stripe => match spec.chunk {
                Some(chunk) if chunk.chunk_size > 0 => Some(chunk),
                _ => {
                    return Err(RaidError::BadMetadata(format!(
                        "stripe set {} has no usable chunk size",
                        spec.set_uuid
                    )));
                }
            },
            RaidType::Mirror | RaidType::Concat => None,
        };

        let set = RaidSet {
            raid_type: spec.raid_type,
            set_uuid: spec.set_uuid,
            seq_num: spec.seq_num,
            current_member_count: 0,
            members: vec![None; total],
            chunk,
        };
        let uuid = set.set_uuid.clone();
        let id = self.push(Member::composite(set))?;
        debug!(
            "RAID: new {} set {id} ({uuid}), {total} members, seq {}",
            spec.raid_type, spec.seq_num
        );
        Ok(id)
    }

    /// `find_composite` looks for the set an examined member belongs to.
    ///
    /// A set matches when `slot` is within its member count, its UUID equals
    /// `set_uuid`, and it is either a mirror (generations are reconciled on
    /// adoption) or of the same generation. The first match in allocation
    /// order wins.
    #[must_use]
    pub fn find_composite(&self, set_uuid: &str, seq_num: u64, slot: usize) -> Option<MemberId> {
        self.members.iter().enumerate().find_map(|(i, member)| {
            let MemberKind::Composite(set) = &member.kind else {
                return None;
            };
            let generation_ok = set.raid_type == RaidType::Mirror || set.seq_num == seq_num;
            (set.members.len() > slot && generation_ok && set.set_uuid == set_uuid)
                .then_some(MemberId(i))
        })
    }

    /// Whether `id` names a set with enough members to serve reads.
    ///
    /// Leaves, unknown ids and `None` are never complete.
    #[must_use]
    pub fn is_complete(&self, id: Option<MemberId>) -> bool {
        id.and_then(|id| self.members.get(id.0))
            .and_then(Member::as_set)
            .is_some_and(RaidSet::is_complete)
    }

    pub(crate) fn set(&self, id: MemberId) -> Result<&RaidSet, RaidError> {
        self.member(id)?
            .as_set()
            .ok_or_else(|| RaidError::BadMetadata(format!("member {id} is not a RAID set")))
    }
}

use tracing::{debug, warn};

use super::{Member, MemberId, MemberKind, RaidAssembly, RaidType, StripeCursor};
use crate::device::DeviceIo;
use crate::error::RaidError;
use crate::metrics::{self, LeafRead, SetRead};

impl<D: DeviceIo> RaidAssembly<D> {
    /// `read` fills `buf` from `id` starting at `offset`.
    ///
    /// Reads are clamped to the member's size, so `offset == size` yields
    /// `Ok(0)`. A short count means a child device ran out of data.
    ///
    /// # Errors
    /// Returns [`RaidError::OffsetOutOfRange`] if `offset` is past the end,
    /// [`RaidError::Io`] if a leaf device fails, [`RaidError::NestingTooDeep`]
    /// if sets nest past `max_nesting_depth`, and the set-specific errors of
    /// the strategies below.
    pub fn read(&mut self, id: MemberId, buf: &mut [u8], offset: u64) -> Result<usize, RaidError> {
        self.read_at_depth(id, buf, offset, 0)
    }

    /// `depth` counts the sets entered above `id`.
    fn read_at_depth(
        &mut self,
        id: MemberId,
        buf: &mut [u8],
        offset: u64,
        depth: usize,
    ) -> Result<usize, RaidError> {
        let member = self.member(id)?;
        let size = member.size;
        if offset > size {
            warn!("RAID: member {id} read at {offset} beyond size {size}");
            return Err(RaidError::OffsetOutOfRange {
                member: id,
                offset,
                size,
            });
        }

        let len = (buf.len() as u64).min(size - offset) as usize;
        if len == 0 {
            return Ok(0);
        }
        let buf = &mut buf[..len];

        let Some(raid_type) = member.as_set().map(|set| set.raid_type) else {
            return self.read_leaf(id, buf, offset);
        };
        if depth > self.config.max_nesting_depth {
            warn!("RAID: set {id} is nested deeper than {} levels", self.config.max_nesting_depth);
            return Err(RaidError::NestingTooDeep {
                depth: self.config.max_nesting_depth,
            });
        }
        let result = match raid_type {
            RaidType::Mirror => self.read_mirror(id, buf, offset, depth + 1),
            RaidType::Stripe => self.read_stripe(id, buf, offset, depth + 1),
            RaidType::Concat => self.read_concat(id, buf, offset, depth + 1),
        };
        metrics::record_set_read(SetRead {
            raid_type,
            bytes: *result.as_ref().unwrap_or(&0) as u64,
            error: result.is_err(),
        });
        result
    }

    /// Moves the member's cursor for [`Self::read_next`].
    ///
    /// # Errors
    /// Returns [`RaidError::OffsetOutOfRange`] if `offset` is past the end.
    pub fn seek(&mut self, id: MemberId, offset: u64) -> Result<(), RaidError> {
        let member = self.member_mut(id)?;
        if offset > member.size {
            return Err(RaidError::OffsetOutOfRange {
                member: id,
                offset,
                size: member.size,
            });
        }
        member.cur_offset = offset;
        Ok(())
    }

    /// Reads at the member's cursor and advances it by the bytes read.
    ///
    /// # Errors
    /// Same as [`Self::read`].
    pub fn read_next(&mut self, id: MemberId, buf: &mut [u8]) -> Result<usize, RaidError> {
        let offset = self.member(id)?.cur_offset;
        let n = self.read(id, buf, offset)?;
        self.member_mut(id)?.cur_offset = offset + n as u64;
        Ok(n)
    }

    fn read_leaf(&mut self, id: MemberId, buf: &mut [u8], offset: u64) -> Result<usize, RaidError> {
        let Self { members, io, .. } = self;
        let Some(Member { path, kind, .. }) = members.get_mut(id.0) else {
            return Err(RaidError::UnknownMember(id));
        };
        let MemberKind::Leaf { handle } = kind else {
            return Err(RaidError::UnknownMember(id));
        };

        if handle.is_none() {
            let opened = io.open(path).map_err(|source| {
                warn!("RAID: cannot open {path}: {source}");
                RaidError::Io {
                    path: path.clone(),
                    source,
                }
            })?;
            debug!("RAID: opened leaf {id} at {path}");
            *handle = Some(opened);
        }
        let Some(h) = handle.as_mut() else {
            return Err(RaidError::UnknownMember(id));
        };

        let result = io.seek(h, offset).and_then(|()| io.read(h, buf));
        if metrics::is_enabled() {
            metrics::record_leaf_read(LeafRead {
                path: path.clone(),
                offset,
                bytes: *result.as_ref().unwrap_or(&0) as u64,
                error: result.is_err(),
            });
        }
        result.map_err(|source| {
            warn!("RAID: read of {} bytes at {offset} from {path} failed: {source}", buf.len());
            RaidError::Io {
                path: path.clone(),
                source,
            }
        })
    }

    /// Serves the read from the lowest-numbered live leg.
    fn read_mirror(
        &mut self,
        id: MemberId,
        buf: &mut [u8],
        offset: u64,
        depth: usize,
    ) -> Result<usize, RaidError> {
        let Some(child) = self.set(id)?.members.iter().flatten().next().copied() else {
            warn!("RAID: mirror {id} has no working member");
            return Err(RaidError::NoWorkingMember { member: id });
        };
        self.read_at_depth(child, buf, offset, depth)
    }

    fn read_stripe(
        &mut self,
        id: MemberId,
        buf: &mut [u8],
        offset: u64,
        depth: usize,
    ) -> Result<usize, RaidError> {
        let set = self.set(id)?;
        let chunk_size = set
            .chunk
            .map(|c| c.chunk_size)
            .filter(|&c| c > 0)
            .ok_or_else(|| RaidError::BadMetadata(format!("stripe {id} has no chunk size")))?;
        let slots = set.members.clone();

        let total = buf.len();
        let mut cursor = StripeCursor::locate(offset, chunk_size, slots.len());
        let mut done = 0usize;
        let mut take = cursor.span(total as u64) as usize;

        while done < total {
            let child = slots[cursor.slot].ok_or(RaidError::MissingMember {
                member: id,
                slot: cursor.slot,
            })?;
            let got =
                self.read_at_depth(child, &mut buf[done..done + take], cursor.member_offset(), depth)?;
            done += got;
            if got < take {
                break;
            }
            cursor.advance();
            take = cursor.span((total - done) as u64) as usize;
        }
        Ok(done)
    }

    fn read_concat(
        &mut self,
        id: MemberId,
        buf: &mut [u8],
        offset: u64,
        depth: usize,
    ) -> Result<usize, RaidError> {
        let slots = self.set(id)?.members.clone();

        let total = buf.len();
        let mut offset = offset;
        let mut done = 0usize;

        while done < total {
            let mut start = 0u64;
            let mut target = None;
            for (slot, child) in slots.iter().enumerate() {
                let child = child.ok_or(RaidError::MissingMember { member: id, slot })?;
                let end = start.checked_add(self.member(child)?.size).ok_or_else(|| {
                    RaidError::BadMetadata(format!("concat {id} extents overflow at slot {slot}"))
                })?;
                if offset < end {
                    target = Some((child, offset - start, end));
                    break;
                }
                start = end;
            }
            let Some((child, member_offset, end)) = target else {
                break;
            };

            let take = ((total - done) as u64).min(end - offset) as usize;
            let got = self.read_at_depth(child, &mut buf[done..done + take], member_offset, depth)?;
            done += got;
            offset += got as u64;
            if got < take {
                break;
            }
        }
        Ok(done)
    }

    /// Closes every opened leaf beneath `id`; unopened leaves are skipped.
    pub fn close(&mut self, id: MemberId) {
        let children = match self.members.get_mut(id.0).map(|m| &mut m.kind) {
            Some(MemberKind::Leaf { handle }) => {
                if let Some(h) = handle.take() {
                    self.io.close(h);
                }
                return;
            }
            Some(MemberKind::Composite(set)) => set.members.iter().flatten().copied().collect::<Vec<_>>(),
            None => return,
        };
        for child in children {
            self.close(child);
        }
    }

    /// Closes every opened leaf in the arena.
    pub fn close_all(&mut self) {
        let Self { members, io, .. } = self;
        for member in members.iter_mut() {
            if let MemberKind::Leaf { handle } = &mut member.kind {
                if let Some(h) = handle.take() {
                    io.close(h);
                }
            }
        }
    }
}

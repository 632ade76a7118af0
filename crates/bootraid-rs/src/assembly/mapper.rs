//! Offset arithmetic for striped sets.

/// Position of a logical stripe offset on one member.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StripeCursor {
    /// Member slot holding the current chunk.
    pub slot: usize,
    /// Chunk number within that member.
    pub member_chunk: u64,
    /// Byte offset inside the current chunk.
    pub sub_chunk_start: u64,
    chunk_size: u64,
    members: usize,
}

impl StripeCursor {
    /// `locate` maps a logical byte offset onto a set of `members` striped in `chunk_size` units.
    ///
    /// Both `chunk_size` and `members` must be non-zero.
    #[must_use]
    pub const fn locate(offset: u64, chunk_size: u64, members: usize) -> Self {
        let chunk_index = offset / chunk_size;
        Self {
            slot: (chunk_index % members as u64) as usize,
            member_chunk: chunk_index / members as u64,
            sub_chunk_start: offset % chunk_size,
            chunk_size,
            members,
        }
    }

    /// Byte offset of the cursor within its member.
    #[must_use]
    pub const fn member_offset(&self) -> u64 {
        self.member_chunk * self.chunk_size + self.sub_chunk_start
    }

    /// Bytes that can be moved before the cursor leaves the current chunk.
    #[must_use]
    pub const fn span(&self, remaining: u64) -> u64 {
        let left = self.chunk_size - self.sub_chunk_start;
        if remaining < left { remaining } else { left }
    }

    /// Moves to the start of the next chunk in stripe order.
    pub const fn advance(&mut self) {
        self.slot += 1;
        if self.slot == self.members {
            self.slot = 0;
            self.member_chunk += 1;
        }
        self.sub_chunk_start = 0;
    }
}

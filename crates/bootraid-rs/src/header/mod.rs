//! Codec for the trailing `AppleRAIDHeader` block.
//!
//! Every member carries a 4096-byte header in the last aligned block before
//! its reported size. The binary prefix is followed, at [`PLIST_OFFSET`], by an
//! XML property list describing the set the member belongs to.

#[cfg(test)]
mod header_tests;

use std::fmt::Write;

/// Size of the header block in bytes.
pub const HEADER_SIZE: usize = 4096;
/// The header sits on a boundary of this many bytes.
pub const HEADER_ALIGN: u64 = 4096;
/// Offset of the embedded property list within the header block.
pub const PLIST_OFFSET: usize = 1024;
/// NUL-padded signature at the start of every header.
pub const RAID_SIGNATURE: &[u8; 16] = b"AppleRAIDHeader\0";

const UUID_LEN: usize = 64;
const RAID_UUID_OFFSET: usize = 16;
const MEMBER_UUID_OFFSET: usize = RAID_UUID_OFFSET + UUID_LEN;
const SIZE_OFFSET: usize = MEMBER_UUID_OFFSET + UUID_LEN;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("header block is {0} bytes, expected 4096")]
    Short(usize),
    #[error("AppleRAIDHeader signature mismatch")]
    BadSignature,
    #[error("property list is {0} bytes, at most 3071 fit")]
    PlistTooLarge(usize),
}

/// Binary fields of a parsed header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaidHeader {
    pub raid_uuid: String,
    pub member_uuid: String,
    /// Size of the data region preceding the header.
    pub size: u64,
}

impl RaidHeader {
    /// # Errors
    /// Returns [`HeaderError::Short`] for a truncated block and
    /// [`HeaderError::BadSignature`] when the magic does not match.
    pub fn parse(block: &[u8]) -> Result<Self, HeaderError> {
        if block.len() < HEADER_SIZE {
            return Err(HeaderError::Short(block.len()));
        }
        if &block[..RAID_SIGNATURE.len()] != RAID_SIGNATURE {
            return Err(HeaderError::BadSignature);
        }

        let mut size = [0u8; 8];
        size.copy_from_slice(&block[SIZE_OFFSET..SIZE_OFFSET + 8]);

        Ok(Self {
            raid_uuid: c_string(&block[RAID_UUID_OFFSET..RAID_UUID_OFFSET + UUID_LEN]),
            member_uuid: c_string(&block[MEMBER_UUID_OFFSET..MEMBER_UUID_OFFSET + UUID_LEN]),
            size: u64::from_be_bytes(size),
        })
    }

    /// The property list bytes of `block`, cut at the first NUL.
    #[must_use]
    pub fn plist_region(block: &[u8]) -> &[u8] {
        let region = block.get(PLIST_OFFSET..).unwrap_or_default();
        let end = region.iter().position(|&b| b == 0).unwrap_or(region.len());
        &region[..end]
    }
}

/// `header_offset` returns where the header of a member of `size` bytes starts.
///
/// # Returns
/// `align_down(size, HEADER_ALIGN) - HEADER_SIZE`, or `None` when the member is
/// too small to hold a header.
#[must_use]
pub const fn header_offset(size: u64) -> Option<u64> {
    let aligned = size - size % HEADER_ALIGN;
    aligned.checked_sub(HEADER_SIZE as u64)
}

fn c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn put_c_string(dst: &mut [u8], s: &str) {
    let n = s.len().min(dst.len() - 1);
    dst[..n].copy_from_slice(&s.as_bytes()[..n]);
}

/// Description of one member, used to forge header blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberLabel {
    pub set_uuid: String,
    pub member_uuid: String,
    pub level: String,
    pub seq_num: u64,
    pub member_index: u64,
    /// UUIDs of every member of the set; its length is the set cardinality.
    pub member_uuids: Vec<String>,
    pub chunk_size: Option<u64>,
    pub chunk_count: Option<u64>,
    /// Data bytes preceding the header.
    pub data_size: u64,
}

impl MemberLabel {
    /// Renders the header property list the way the RAID driver writes it.
    #[must_use]
    pub fn to_plist(&self) -> String {
        let mut out = String::from("<dict>");
        let _ = write!(
            out,
            "<key>AppleRAID-SetUUID</key><string>{}</string>\
             <key>AppleRAID-MemberUUID</key><string>{}</string>\
             <key>AppleRAID-LevelName</key><string>{}</string>\
             <key>AppleRAID-SequenceNumber</key><integer size=\"32\">{}</integer>\
             <key>AppleRAID-MemberIndex</key><integer size=\"32\">{}</integer>",
            escape(&self.set_uuid),
            escape(&self.member_uuid),
            escape(&self.level),
            self.seq_num,
            self.member_index,
        );
        out.push_str("<key>AppleRAID-Members</key><array>");
        for uuid in &self.member_uuids {
            let _ = write!(out, "<string>{}</string>", escape(uuid));
        }
        out.push_str("</array>");
        if let Some(chunk_size) = self.chunk_size {
            let _ = write!(
                out,
                "<key>AppleRAID-ChunkSize</key><integer size=\"64\">0x{chunk_size:x}</integer>"
            );
        }
        if let Some(chunk_count) = self.chunk_count {
            let _ = write!(
                out,
                "<key>AppleRAID-ChunkCount</key><integer size=\"64\">0x{chunk_count:x}</integer>"
            );
        }
        out.push_str("</dict>");
        out
    }

    /// `encode_block` builds a complete header block for this member.
    ///
    /// # Errors
    /// Returns [`HeaderError::PlistTooLarge`] when the property list does not fit.
    pub fn encode_block(&self) -> Result<Vec<u8>, HeaderError> {
        let plist = self.to_plist();
        // One byte stays NUL so readers find the end of the plist.
        if plist.len() >= HEADER_SIZE - PLIST_OFFSET {
            return Err(HeaderError::PlistTooLarge(plist.len()));
        }

        let mut block = vec![0u8; HEADER_SIZE];
        block[..RAID_SIGNATURE.len()].copy_from_slice(RAID_SIGNATURE);
        put_c_string(
            &mut block[RAID_UUID_OFFSET..RAID_UUID_OFFSET + UUID_LEN],
            &self.set_uuid,
        );
        put_c_string(
            &mut block[MEMBER_UUID_OFFSET..MEMBER_UUID_OFFSET + UUID_LEN],
            &self.member_uuid,
        );
        block[SIZE_OFFSET..SIZE_OFFSET + 8].copy_from_slice(&self.data_size.to_be_bytes());
        block[PLIST_OFFSET..PLIST_OFFSET + plist.len()].copy_from_slice(plist.as_bytes());
        Ok(block)
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

use super::*;

fn label() -> MemberLabel {
    MemberLabel {
        set_uuid: "5A1C9E2B-0000-4000-8000-000000000001".to_string(),
        member_uuid: "5A1C9E2B-0000-4000-8000-0000000000A0".to_string(),
        level: "Mirror".to_string(),
        seq_num: 5,
        member_index: 1,
        member_uuids: vec!["m0".to_string(), "m1".to_string()],
        chunk_size: None,
        chunk_count: None,
        data_size: 0x1_0000_0200,
    }
}

#[test]
fn encoded_block_has_fixed_layout() {
    let block = label().encode_block().expect("encode");
    assert_eq!(block.len(), HEADER_SIZE);
    assert_eq!(&block[..16], b"AppleRAIDHeader\0");
    assert_eq!(&block[16..20], b"5A1C");
    assert_eq!(block[16 + 36], 0, "set uuid must be NUL padded");
    assert_eq!(&block[80..84], b"5A1C");
    assert_eq!(
        &block[144..152],
        &[0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x02, 0x00],
        "size is stored big-endian"
    );
    assert_eq!(&block[PLIST_OFFSET..PLIST_OFFSET + 6], b"<dict>");
}

#[test]
fn parse_reads_binary_fields() {
    let block = label().encode_block().expect("encode");
    let header = RaidHeader::parse(&block).expect("parse");
    assert_eq!(header.raid_uuid, "5A1C9E2B-0000-4000-8000-000000000001");
    assert_eq!(header.member_uuid, "5A1C9E2B-0000-4000-8000-0000000000A0");
    assert_eq!(header.size, 0x1_0000_0200);
}

#[test]
fn plist_region_stops_at_first_nul() {
    let block = label().encode_block().expect("encode");
    let region = RaidHeader::plist_region(&block);
    assert!(region.starts_with(b"<dict>"));
    assert!(region.ends_with(b"</dict>"));
    assert!(!region.contains(&0));
}

#[test]
fn parse_rejects_bad_signature() {
    let mut block = label().encode_block().expect("encode");
    block[0] = b'a';
    assert_eq!(RaidHeader::parse(&block), Err(HeaderError::BadSignature));
}

#[test]
fn parse_rejects_short_block() {
    let block = label().encode_block().expect("encode");
    assert_eq!(
        RaidHeader::parse(&block[..HEADER_SIZE - 1]),
        Err(HeaderError::Short(HEADER_SIZE - 1))
    );
}

#[test]
fn header_offset_is_last_aligned_block() {
    assert_eq!(header_offset(8192), Some(4096));
    assert_eq!(header_offset(8192 + 100), Some(4096));
    assert_eq!(header_offset(4096), Some(0));
    assert_eq!(header_offset(4095), None);
    assert_eq!(header_offset(0), None);
}

#[test]
fn stripe_label_carries_hex_chunk_fields() {
    let mut l = label();
    l.level = "Stripe".to_string();
    l.chunk_size = Some(0x8000);
    l.chunk_count = Some(16);
    let plist = l.to_plist();
    assert!(plist.contains("<key>AppleRAID-ChunkSize</key><integer size=\"64\">0x8000</integer>"));
    assert!(plist.contains("<key>AppleRAID-ChunkCount</key><integer size=\"64\">0x10</integer>"));
}

#[test]
fn oversized_plist_is_rejected() {
    let mut l = label();
    l.member_uuids = (0..200).map(|i| format!("member-uuid-{i:04}")).collect();
    assert!(matches!(
        l.encode_block(),
        Err(HeaderError::PlistTooLarge(_))
    ));
}

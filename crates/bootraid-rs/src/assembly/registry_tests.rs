use super::*;
use crate::device::MemDevices;

fn empty(capacity: usize) -> RaidAssembly<MemDevices> {
    RaidAssembly::with_capacity(MemDevices::new(), AssemblyConfig::default(), capacity).expect("arena")
}

fn spec(uuid: &str, raid_type: RaidType, seq_num: u64, total_members: u64) -> SetSpec {
    SetSpec {
        set_uuid: uuid.to_string(),
        raid_type,
        seq_num,
        total_members,
        chunk: (raid_type == RaidType::Stripe).then_some(ChunkGeometry {
            chunk_size: 512,
            chunk_count: 8,
        }),
    }
}

#[test]
fn leaves_are_allocated_in_order() {
    let mut a = empty(4);
    let first = a.allocate_leaf("/ata@0:3", 8192).unwrap();
    let second = a.allocate_leaf("/ata@1:3", 4096).unwrap();
    assert_eq!((first, second), (MemberId(0), MemberId(1)));

    let leaf = a.member(second).unwrap();
    assert!(leaf.is_leaf());
    assert!(!leaf.is_open());
    assert_eq!(leaf.path(), "/ata@1:3");
    assert_eq!(leaf.size(), 4096);
    assert!(leaf.props().is_none());
}

#[test]
fn arena_refuses_allocations_past_capacity() {
    let mut a = empty(1);
    a.allocate_leaf("/ata@0:3", 8192).unwrap();
    assert!(matches!(
        a.allocate_leaf("/ata@1:3", 8192),
        Err(RaidError::ArenaFull { capacity: 1 })
    ));
    assert!(matches!(
        a.allocate_composite(spec("u", RaidType::Mirror, 1, 2)),
        Err(RaidError::ArenaFull { .. })
    ));
    assert_eq!(a.len(), 1);
}

#[test]
fn composite_starts_empty_with_declared_slots() {
    let mut a = empty(2);
    let id = a
        .allocate_composite(spec("set", RaidType::Stripe, 3, 4))
        .unwrap();
    let set = a.member(id).unwrap().as_set().expect("set");
    assert_eq!(set.raid_type(), RaidType::Stripe);
    assert_eq!(set.set_uuid(), "set");
    assert_eq!(set.seq_num(), 3);
    assert_eq!(set.total_members(), 4);
    assert_eq!(set.current_member_count(), 0);
    assert_eq!(set.members(), &[None, None, None, None]);
    assert_eq!(set.chunk().map(|c| c.chunk_size), Some(512));
    assert_eq!(a.member(id).unwrap().size(), 0);
}

#[test]
fn invalid_composites_leave_the_arena_untouched() {
    let mut a = empty(4);
    assert!(matches!(
        a.allocate_composite(spec("u", RaidType::Mirror, 1, 0)),
        Err(RaidError::InvalidMemberCount(0))
    ));

    let mut no_chunk = spec("u", RaidType::Stripe, 1, 2);
    no_chunk.chunk = None;
    assert!(matches!(
        a.allocate_composite(no_chunk),
        Err(RaidError::BadMetadata(_))
    ));

    let mut zero_chunk = spec("u", RaidType::Stripe, 1, 2);
    zero_chunk.chunk = Some(ChunkGeometry {
        chunk_size: 0,
        chunk_count: 8,
    });
    assert!(a.allocate_composite(zero_chunk).is_err());
    assert!(a.is_empty());
}

#[test]
fn find_composite_matches_uuid_slot_and_generation() {
    let mut a = empty(4);
    let mirror = a.allocate_composite(spec("m", RaidType::Mirror, 5, 2)).unwrap();
    let stripe = a.allocate_composite(spec("s", RaidType::Stripe, 5, 2)).unwrap();

    assert_eq!(a.find_composite("m", 5, 1), Some(mirror));
    assert_eq!(
        a.find_composite("m", 9, 0),
        Some(mirror),
        "mirrors match any generation"
    );
    assert_eq!(a.find_composite("m", 5, 2), None, "slot beyond the set");
    assert_eq!(a.find_composite("s", 5, 0), Some(stripe));
    assert_eq!(a.find_composite("s", 4, 0), None, "stripe generations must agree");
    assert_eq!(a.find_composite("other", 5, 0), None);
}

#[test]
fn find_composite_prefers_the_earliest_set() {
    let mut a = empty(4);
    let first = a.allocate_composite(spec("c", RaidType::Concat, 1, 2)).unwrap();
    a.allocate_composite(spec("c", RaidType::Concat, 1, 2)).unwrap();
    assert_eq!(a.find_composite("c", 1, 0), Some(first));
}

#[test]
fn leaves_and_unknown_ids_are_never_complete() {
    let mut a = empty(4);
    let leaf = a.allocate_leaf("/ata@0:3", 8192).unwrap();
    let set = a.allocate_composite(spec("m", RaidType::Mirror, 1, 2)).unwrap();
    assert!(!a.is_complete(None));
    assert!(!a.is_complete(Some(leaf)));
    assert!(!a.is_complete(Some(MemberId(99))));
    assert!(!a.is_complete(Some(set)), "an empty mirror is incomplete");
}

#[test]
fn reserve_resets_the_arena() {
    let mut a = empty(2);
    let leaf = a.allocate_leaf("/ata@0:3", 8192).unwrap();
    a.set_master(Some(leaf));
    a.reserve(6).unwrap();
    assert!(a.is_empty());
    assert_eq!(a.capacity(), 6);
    assert_eq!(a.master(), None);
    assert!(matches!(a.member(leaf), Err(RaidError::UnknownMember(_))));
}

#[test]
fn raid_paths_round_trip_through_the_config() {
    let config = AssemblyConfig::default();
    let path = config.raid_boot_path(MemberId(3));
    assert_eq!(path, "AppleRAID/3:0,\\:tbxi");
    assert!(config.is_raid_path(&path));
    assert_eq!(config.parse_raid_path(&path), Some(3));
    assert!(!config.is_raid_path("/pci@f2000000/ata-6@d/@0:3,\\:tbxi"));
    assert!(!config.is_raid_path("AppleRAIDX/3:0"));
    assert_eq!(config.parse_raid_path("AppleRAID/:0"), None);
}

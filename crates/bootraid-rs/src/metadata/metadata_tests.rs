use super::*;

fn dict(entries: &[(&str, Value)]) -> Dict {
    let mut d = Dict::default();
    for (k, v) in entries {
        d.insert(*k, v.clone());
    }
    d
}

fn level(name: &str) -> Dict {
    dict(&[(LEVEL_NAME_KEY, Value::String(name.to_string()))])
}

#[test]
fn level_name_first_letter_selects_type() {
    assert_eq!(raid_type_of(&level("Mirror")).unwrap(), RaidType::Mirror);
    assert_eq!(raid_type_of(&level("Stripe")).unwrap(), RaidType::Stripe);
    assert_eq!(raid_type_of(&level("Concat")).unwrap(), RaidType::Concat);
}

#[test]
fn unknown_or_missing_level_is_unsupported() {
    for d in [
        level("RAID-5"),
        level(""),
        level("mirror"),
        dict(&[(LEVEL_NAME_KEY, Value::Integer("1".to_string()))]),
        Dict::default(),
    ] {
        assert!(matches!(
            raid_type_of(&d),
            Err(RaidError::UnsupportedRaidType(_))
        ));
    }
}

#[test]
fn whole_number_accepts_decimal_and_hex() {
    let d = dict(&[
        ("dec", Value::Integer("4096".to_string())),
        ("hex", Value::Integer("0x1000".to_string())),
        ("spaced", Value::Integer(" 12 ".to_string())),
        ("huge", Value::Integer("18446744073709551615".to_string())),
    ]);
    assert_eq!(whole_number(&d, "dec").unwrap(), 4096);
    assert_eq!(whole_number(&d, "hex").unwrap(), 4096);
    assert_eq!(whole_number(&d, "spaced").unwrap(), 12);
    assert_eq!(
        whole_number(&d, "huge").unwrap(),
        u64::MAX,
        "the largest value must not collide with an absent marker"
    );
}

#[test]
fn whole_number_rejects_garbage_missing_and_wrong_type() {
    let d = dict(&[
        ("trailing", Value::Integer("12abc".to_string())),
        ("negative", Value::Integer("-1".to_string())),
        ("string", Value::String("12".to_string())),
        ("empty", Value::Integer(String::new())),
    ]);
    for key in ["trailing", "negative", "string", "empty", "absent"] {
        match whole_number(&d, key) {
            Err(RaidError::BadMetadata(msg)) => assert!(msg.contains(key), "{msg}"),
            other => panic!("{key}: expected BadMetadata, got {other:?}"),
        }
    }
}

#[test]
fn members_len_counts_array_entries() {
    let d = dict(&[(
        MEMBERS_KEY,
        Value::Array(vec![Value::String("a".into()), Value::String("b".into())]),
    )]);
    assert_eq!(members_len(&d).unwrap(), 2);
    assert!(members_len(&Dict::default()).is_err());
}

#[test]
fn partition_spec_reads_path_and_size() {
    let entry = Value::Dict(dict(&[
        (BOOT_DEVICE_PATH_KEY, Value::String("/ata@0:3".to_string())),
        (BOOT_DEVICE_SIZE_KEY, Value::Integer("8192".to_string())),
    ]));
    assert_eq!(
        partition_spec(&entry).unwrap(),
        ("/ata@0:3".to_string(), 8192)
    );

    let no_size = Value::Dict(dict(&[(
        BOOT_DEVICE_PATH_KEY,
        Value::String("/ata@0:3".to_string()),
    )]));
    assert!(matches!(
        partition_spec(&no_size),
        Err(RaidError::BadBootConfig(_))
    ));
    assert!(matches!(
        partition_spec(&Value::Boolean(true)),
        Err(RaidError::BadBootConfig(_))
    ));
}

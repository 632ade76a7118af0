//! Typed accessors over header and boot-configuration dictionaries.

#[cfg(test)]
mod metadata_tests;

use crate::assembly::RaidType;
use crate::error::RaidError;
use crate::plist::{Dict, Value};

pub const LEVEL_NAME_KEY: &str = "AppleRAID-LevelName";
pub const SET_UUID_KEY: &str = "AppleRAID-SetUUID";
pub const MEMBER_UUID_KEY: &str = "AppleRAID-MemberUUID";
pub const SEQUENCE_NUMBER_KEY: &str = "AppleRAID-SequenceNumber";
pub const MEMBER_INDEX_KEY: &str = "AppleRAID-MemberIndex";
pub const MEMBERS_KEY: &str = "AppleRAID-Members";
pub const CHUNK_SIZE_KEY: &str = "AppleRAID-ChunkSize";
pub const CHUNK_COUNT_KEY: &str = "AppleRAID-ChunkCount";

pub const BOOT_DEVICE_PATH_KEY: &str = "IOBootDevicePath";
pub const BOOT_DEVICE_SIZE_KEY: &str = "IOBootDeviceSize";

/// `raid_type_of` maps the level name's first letter to a set type.
///
/// # Errors
/// Returns [`RaidError::UnsupportedRaidType`] for a missing, non-string, empty
/// or unknown level name.
pub fn raid_type_of(dict: &Dict) -> Result<RaidType, RaidError> {
    let level = dict.get(LEVEL_NAME_KEY).and_then(Value::as_string);
    match level.and_then(|l| l.chars().next()) {
        Some('M') => Ok(RaidType::Mirror),
        Some('S') => Ok(RaidType::Stripe),
        Some('C') => Ok(RaidType::Concat),
        _ => Err(RaidError::UnsupportedRaidType(
            level.unwrap_or("<missing>").to_string(),
        )),
    }
}

/// `whole_number` reads an unsigned integer property.
///
/// Decimal and `0x`-prefixed hexadecimal numerals are accepted; surrounding
/// whitespace is allowed, anything else after the digits is not.
///
/// # Errors
/// Returns [`RaidError::BadMetadata`] naming `key` if the property is missing,
/// not an integer, or not a clean numeral.
pub fn whole_number(dict: &Dict, key: &str) -> Result<u64, RaidError> {
    let text = match dict.get(key) {
        Some(Value::Integer(text)) => text.trim(),
        Some(other) => {
            return Err(RaidError::BadMetadata(format!(
                "{key} is a {}, not an integer",
                other.kind()
            )));
        }
        None => return Err(RaidError::BadMetadata(format!("{key} is missing"))),
    };

    let parsed = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse::<u64>(),
    };
    parsed.map_err(|_| RaidError::BadMetadata(format!("{key} has bad numeral {text:?}")))
}

/// # Errors
/// Returns [`RaidError::BadMetadata`] if `key` is missing or not a string.
pub fn string_property<'a>(dict: &'a Dict, key: &str) -> Result<&'a str, RaidError> {
    dict.get(key)
        .and_then(Value::as_string)
        .ok_or_else(|| RaidError::BadMetadata(format!("{key} is missing or not a string")))
}

/// Number of entries in the set's member list, i.e. its declared cardinality.
///
/// # Errors
/// Returns [`RaidError::BadMetadata`] if the member list is missing or not an array.
pub fn members_len(dict: &Dict) -> Result<usize, RaidError> {
    dict.get(MEMBERS_KEY)
        .and_then(Value::as_array)
        .map(<[Value]>::len)
        .ok_or_else(|| RaidError::BadMetadata(format!("{MEMBERS_KEY} is missing or not an array")))
}

/// `partition_spec` extracts `(path, size)` from one boot configuration entry.
///
/// # Errors
/// Returns [`RaidError::BadBootConfig`] if the entry is not a dictionary or lacks
/// either property.
pub fn partition_spec(value: &Value) -> Result<(String, u64), RaidError> {
    let dict = value.as_dict().ok_or_else(|| {
        RaidError::BadBootConfig(format!("partition entry is a {}", value.kind()))
    })?;
    let path = string_property(dict, BOOT_DEVICE_PATH_KEY)
        .map_err(|e| RaidError::BadBootConfig(e.to_string()))?;
    let size = whole_number(dict, BOOT_DEVICE_SIZE_KEY)
        .map_err(|e| RaidError::BadBootConfig(e.to_string()))?;
    Ok((path.to_string(), size))
}

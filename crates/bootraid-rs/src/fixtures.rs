//! Builders for member images used across the test modules.

use crate::assembly::{AssemblyConfig, RaidAssembly};
use crate::device::MemDevices;
use crate::header::{HEADER_ALIGN, MemberLabel};
use crate::plist::{Dict, Value};

pub const MIRROR_UUID: &str = "9C4A0E2E-5B27-4E2B-9A1D-6F0D1A3C0001";
pub const STRIPE_UUID: &str = "9C4A0E2E-5B27-4E2B-9A1D-6F0D1A3C0002";
pub const CONCAT_UUID: &str = "9C4A0E2E-5B27-4E2B-9A1D-6F0D1A3C0003";

pub fn label(set_uuid: &str, level: &str, seq_num: u64, member_index: u64, members: usize) -> MemberLabel {
    MemberLabel {
        set_uuid: set_uuid.to_string(),
        member_uuid: format!("{set_uuid}-m{member_index}"),
        level: level.to_string(),
        seq_num,
        member_index,
        member_uuids: (0..members).map(|i| format!("{set_uuid}-m{i}")).collect(),
        chunk_size: None,
        chunk_count: None,
        data_size: 0,
    }
}

pub fn stripe_label(set_uuid: &str, seq_num: u64, member_index: u64, members: usize, chunk_size: u64) -> MemberLabel {
    let mut l = label(set_uuid, "Stripe", seq_num, member_index, members);
    l.chunk_size = Some(chunk_size);
    l.chunk_count = Some(16);
    l
}

/// `data` padded to the header alignment, followed by the header block.
pub fn member_image(data: &[u8], label: &MemberLabel) -> Vec<u8> {
    let mut label = label.clone();
    label.data_size = data.len() as u64;

    let padded = (data.len() as u64).div_ceil(HEADER_ALIGN) * HEADER_ALIGN;
    let mut image = data.to_vec();
    image.resize(padded as usize, 0);
    image.extend(label.encode_block().expect("label fits"));
    image
}

/// Deterministic, position-dependent bytes; different seeds give different data.
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed).wrapping_add((i >> 8) as u8))
        .collect()
}

/// Splits striped `content` into per-member data, `chunk` bytes at a time.
pub fn stripe_split(content: &[u8], chunk: usize, members: usize) -> Vec<Vec<u8>> {
    let mut out = vec![Vec::new(); members];
    for (i, c) in content.chunks(chunk).enumerate() {
        out[i % members].extend_from_slice(c);
    }
    out
}

pub fn devices(images: Vec<(&str, Vec<u8>)>) -> MemDevices {
    let mut devices = MemDevices::new();
    for (path, image) in images {
        devices.insert(path, image);
    }
    devices
}

pub fn assembly(images: Vec<(&str, Vec<u8>)>, capacity: usize) -> RaidAssembly<MemDevices> {
    RaidAssembly::with_capacity(devices(images), AssemblyConfig::default(), capacity)
        .expect("arena")
}

pub fn boot_config(partitions: &[(&str, usize)]) -> Value {
    Value::Array(partitions.iter().map(|&(path, size)| partition(path, size)).collect())
}

pub fn partition(path: &str, size: usize) -> Value {
    let mut d = Dict::default();
    d.insert("IOBootDevicePath", Value::String(path.to_string()));
    d.insert("IOBootDeviceSize", Value::Integer(size.to_string()));
    Value::Dict(d)
}

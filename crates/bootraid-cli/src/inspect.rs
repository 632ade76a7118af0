use std::fmt::Write;

use anyhow::{Context, Result, anyhow};
use bootraid_rs::device::Disk;
use bootraid_rs::header::{HEADER_SIZE, RaidHeader, header_offset};
use bootraid_rs::plist::{self, Value};

use crate::cli::InspectArgs;

pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    let disk = Disk::open(&args.image)
        .with_context(|| format!("failed to open image {}", args.image.display()))?;
    let size = args.size.unwrap_or(disk.len());
    let offset = header_offset(size)
        .ok_or_else(|| anyhow!("{size} bytes is too small to hold a RAID header"))?;

    let mut block = vec![0u8; HEADER_SIZE];
    let n = disk.read_at(offset, &mut block);
    let header = RaidHeader::parse(&block[..n])
        .with_context(|| format!("no RAID header at offset {offset}"))?;
    let props = plist::parse(RaidHeader::plist_region(&block))
        .context("RAID header property list is malformed")?;

    print!("{}", render(offset, &header, &props));
    Ok(())
}

fn render(offset: u64, header: &RaidHeader, props: &Value) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "header offset: {offset}");
    let _ = writeln!(out, "set uuid: {}", header.raid_uuid);
    let _ = writeln!(out, "member uuid: {}", header.member_uuid);
    let _ = writeln!(out, "data size: {}", header.size);
    render_value(&mut out, props, 0);
    out
}

fn render_value(out: &mut String, value: &Value, depth: usize) {
    let indent = "  ".repeat(depth);
    match value {
        Value::Dict(dict) => {
            for (key, value) in dict.iter() {
                match value {
                    Value::Dict(_) | Value::Array(_) => {
                        let _ = writeln!(out, "{indent}{key}:");
                        render_value(out, value, depth + 1);
                    }
                    _ => {
                        let _ = writeln!(out, "{indent}{key}: {}", scalar(value));
                    }
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Dict(_) | Value::Array(_) => {
                        let _ = writeln!(out, "{indent}-");
                        render_value(out, item, depth + 1);
                    }
                    _ => {
                        let _ = writeln!(out, "{indent}- {}", scalar(item));
                    }
                }
            }
        }
        _ => {
            let _ = writeln!(out, "{indent}{}", scalar(value));
        }
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s)
        | Value::Integer(s)
        | Value::Real(s)
        | Value::Data(s)
        | Value::Date(s) => s.clone(),
        Value::Boolean(b) => b.to_string(),
        Value::Dict(_) | Value::Array(_) => value.kind().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use bootraid_rs::header::MemberLabel;

    use super::*;

    #[test]
    fn render_lists_header_and_properties() {
        let label = MemberLabel {
            set_uuid: "SET-9".to_string(),
            member_uuid: "SET-9-m1".to_string(),
            level: "Stripe".to_string(),
            seq_num: 4,
            member_index: 1,
            member_uuids: vec!["SET-9-m0".to_string(), "SET-9-m1".to_string()],
            chunk_size: Some(0x8000),
            chunk_count: Some(2),
            data_size: 65536,
        };
        let block = label.encode_block().unwrap();
        let header = RaidHeader::parse(&block).unwrap();
        let props = plist::parse(RaidHeader::plist_region(&block)).unwrap();

        let text = render(61440, &header, &props);
        assert!(text.contains("header offset: 61440\n"));
        assert!(text.contains("set uuid: SET-9\n"));
        assert!(text.contains("data size: 65536\n"));
        assert!(text.contains("AppleRAID-LevelName: Stripe\n"));
        assert!(text.contains("AppleRAID-ChunkSize: 0x8000\n"));
        assert!(text.contains("AppleRAID-Members:\n  - SET-9-m0\n  - SET-9-m1\n"));
    }
}

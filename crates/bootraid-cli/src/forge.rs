use anyhow::{Context, Result};
use bootraid_rs::header::{HEADER_ALIGN, MemberLabel};
use tracing::info;

use crate::cli::ForgeArgs;

fn label(args: &ForgeArgs, data_size: u64) -> MemberLabel {
    MemberLabel {
        set_uuid: args.set_uuid.clone(),
        member_uuid: args
            .member_uuid
            .clone()
            .unwrap_or_else(|| format!("{}-m{}", args.set_uuid, args.index)),
        level: args.level.clone(),
        seq_num: args.seq,
        member_index: args.index,
        member_uuids: (0..args.members)
            .map(|i| format!("{}-m{i}", args.set_uuid))
            .collect(),
        chunk_size: args.chunk_size,
        chunk_count: args.chunk_count,
        data_size,
    }
}

pub fn run_forge(args: &ForgeArgs) -> Result<()> {
    let mut image = match &args.data {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("failed to read data {}", path.display()))?,
        None => Vec::new(),
    };
    let data_size = image.len() as u64;
    let block = label(args, data_size)
        .encode_block()
        .context("failed to encode RAID header")?;

    let padded = data_size.div_ceil(HEADER_ALIGN) * HEADER_ALIGN;
    image.resize(usize::try_from(padded).context("data too large")?, 0);
    image.extend_from_slice(&block);
    std::fs::write(&args.out, &image)
        .with_context(|| format!("failed to write {}", args.out.display()))?;

    info!(
        "wrote {} member {} of {} ({} bytes) to {}",
        args.level,
        args.index,
        args.set_uuid,
        image.len(),
        args.out.display()
    );
    Ok(())
}

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run RAID discovery over a boot configuration and print the result.
    Assemble(DiscoveryArgs),

    /// Assemble, then read a range from the boot set.
    Read(ReadArgs),

    /// Print the trailing AppleRAID header of a member image.
    Inspect(InspectArgs),

    /// Write a member image: data padded to 4096 bytes, then a header.
    Forge(ForgeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DiscoveryArgs {
    /// Property list with the partition list (or a single partition dictionary).
    #[arg(long, env = "BOOTRAID_BOOT_CONFIG")]
    pub boot_config: PathBuf,

    /// Firmware path of the partition the loader was read from.
    #[arg(long, env = "BOOTRAID_LOADER_DEVICE", default_value = "")]
    pub loader_device: String,

    /// Backs a firmware path with an image file, as `path=file`.
    #[arg(long = "device", value_parser = parse_device)]
    pub devices: Vec<(String, PathBuf)>,

    #[arg(long, env = "BOOTRAID_PREFIX", default_value = "AppleRAID")]
    pub raid_prefix: String,

    #[arg(long, env = "BOOTRAID_SECONDARY_LOADER", default_value = ":tbxi")]
    pub secondary_loader: String,

    #[arg(long, env = "BOOTRAID_FANOUT", default_value_t = 3)]
    pub fanout: usize,

    /// Arena slots reserved when the boot config is a single partition dictionary.
    #[arg(long, env = "BOOTRAID_SINGLE_SPEC_CAPACITY", default_value_t = 4)]
    pub single_spec_capacity: usize,

    #[arg(long, env = "BOOTRAID_MAX_NESTING", default_value_t = 8)]
    pub max_nesting_depth: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ReadArgs {
    #[command(flatten)]
    pub discovery: DiscoveryArgs,

    #[arg(long, default_value_t = 0)]
    pub offset: u64,

    /// Bytes to read; defaults to the rest of the set.
    #[arg(long)]
    pub length: Option<u64>,

    /// Also write the bytes read to this file.
    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long, default_value_t = 64 * 1024)]
    pub block_size: usize,

    /// Count leaf and set transfers and print them afterwards.
    #[arg(long)]
    pub stats: bool,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    pub image: PathBuf,

    /// Member size to locate the header from; defaults to the file length.
    #[arg(long)]
    pub size: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct ForgeArgs {
    #[arg(long)]
    pub out: PathBuf,

    /// Data region; omitted means an empty data region.
    #[arg(long)]
    pub data: Option<PathBuf>,

    #[arg(long)]
    pub set_uuid: String,

    /// Defaults to `<set-uuid>-m<index>`.
    #[arg(long)]
    pub member_uuid: Option<String>,

    /// Mirror, Stripe or Concat.
    #[arg(long)]
    pub level: String,

    #[arg(long, default_value_t = 1)]
    pub seq: u64,

    #[arg(long)]
    pub index: u64,

    /// Number of members in the set.
    #[arg(long)]
    pub members: u64,

    #[arg(long)]
    pub chunk_size: Option<u64>,

    #[arg(long)]
    pub chunk_count: Option<u64>,
}

pub fn parse_device(s: &str) -> Result<(String, PathBuf), String> {
    let (device, file) = s
        .split_once('=')
        .ok_or_else(|| format!("expected path=file, got {s:?}"))?;
    if device.is_empty() || file.is_empty() {
        return Err(format!("expected path=file, got {s:?}"));
    }
    Ok((device.to_string(), PathBuf::from(file)))
}

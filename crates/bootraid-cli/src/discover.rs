use std::fs::File;
use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use bootraid_rs::device::ImageDevices;
use bootraid_rs::{AssemblyConfig, BootEnv, BootTarget, FirmwarePaths, RaidAssembly, RaidError};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::cli::{DiscoveryArgs, ReadArgs};
use crate::stats::ReadStats;

fn assembly_config(args: &DiscoveryArgs) -> AssemblyConfig {
    AssemblyConfig {
        raid_prefix: args.raid_prefix.clone(),
        secondary_loader: args.secondary_loader.clone(),
        fanout: args.fanout,
        single_spec_capacity: args.single_spec_capacity,
        max_nesting_depth: args.max_nesting_depth,
    }
}

/// Runs discovery; the assembly is returned whatever the outcome so it can be printed.
fn discover(
    args: &DiscoveryArgs,
) -> Result<(RaidAssembly<ImageDevices>, BootEnv, Result<BootTarget, RaidError>)> {
    let raw = std::fs::read(&args.boot_config)
        .with_context(|| format!("failed to read boot config {}", args.boot_config.display()))?;
    let boot_config = bootraid_rs::plist::parse(&raw)
        .with_context(|| format!("failed to parse boot config {}", args.boot_config.display()))?;

    let mut io = ImageDevices::new();
    for (device, image) in &args.devices {
        io.map(device.clone(), image.clone());
    }

    let mut env = BootEnv {
        loader_device: args.loader_device.clone(),
        boot_device: String::new(),
    };
    let mut assembly = RaidAssembly::new(io, assembly_config(args));
    let outcome = assembly.look_for_raid(&boot_config, &mut env, &FirmwarePaths);
    Ok((assembly, env, outcome))
}

pub fn run_assemble(args: &DiscoveryArgs) -> Result<()> {
    let (mut assembly, env, outcome) = discover(args)?;
    print!("{}", assembly.describe());
    for event in assembly.events() {
        println!("event: {event:?}");
    }
    assembly.close_all();

    match outcome {
        Ok(target) => {
            println!("boot set: {}", target.member);
            println!("boot device: {}", env.boot_device);
            Ok(())
        }
        Err(err) => Err(anyhow!(err).context("no bootable RAID set")),
    }
}

pub fn run_read(args: &ReadArgs) -> Result<()> {
    let stats = if args.stats {
        let stats = Arc::new(ReadStats::default());
        if !bootraid_rs::metrics::install_metrics_sink(stats.clone()) {
            return Err(anyhow!("a metrics sink is already installed"));
        }
        Some(stats)
    } else {
        None
    };

    let (mut assembly, _env, outcome) = discover(&args.discovery)?;
    let target = outcome.context("no bootable RAID set")?;
    let size = assembly.member(target.member)?.size();
    let end = match args.length {
        Some(length) => args.offset.saturating_add(length).min(size),
        None => size,
    };
    info!(
        "reading {} bytes at {} from {}",
        end.saturating_sub(args.offset),
        args.offset,
        target.boot_path
    );

    let mut out = match &args.out {
        Some(path) => Some(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => None,
    };

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; args.block_size.max(1)];
    let mut total = 0u64;
    assembly.seek(target.member, args.offset)?;
    while args.offset + total < end {
        let want = (end - args.offset - total).min(buf.len() as u64) as usize;
        let n = assembly.read_next(target.member, &mut buf[..want])?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        if let Some(out) = out.as_mut() {
            out.write_all(&buf[..n]).context("failed to write output")?;
        }
        total += n as u64;
        if n < want {
            break;
        }
    }
    assembly.close_all();

    println!("read {total} bytes from {}", target.boot_path);
    println!("sha256 {:x}", hasher.finalize());
    if let Some(stats) = stats {
        print!("{stats}");
    }
    Ok(())
}

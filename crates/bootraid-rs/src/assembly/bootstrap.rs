use tracing::{debug, info, warn};

use super::{MemberId, MemberKind, RaidAssembly};
use crate::device::DeviceIo;
use crate::error::RaidError;
use crate::metadata::partition_spec;
use crate::plist::Value;

/// Firmware path helpers used to recognise the booted partition.
pub trait BootPaths {
    /// Partition following the Apple_Boot helper partition the loader came from.
    fn next_partition(&self, loader_device: &str) -> Option<String>;

    /// Normalised device identity; equal identities name the same partition.
    fn resolve_device(&self, path: &str) -> String;
}

/// Open Firmware style paths: `<device>:<partition>[,<file>]`.
#[derive(Copy, Clone, Debug, Default)]
pub struct FirmwarePaths;

impl BootPaths for FirmwarePaths {
    fn next_partition(&self, loader_device: &str) -> Option<String> {
        let device = loader_device.split(',').next().unwrap_or(loader_device);
        let (disk, partition) = device.rsplit_once(':')?;
        let partition: u32 = partition.parse().ok()?;
        Some(format!("{disk}:{}", partition.checked_add(1)?))
    }

    fn resolve_device(&self, path: &str) -> String {
        path.split(',')
            .next()
            .unwrap_or(path)
            .to_ascii_lowercase()
    }
}

/// Boot-device state shared with the rest of the loader.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BootEnv {
    /// Device the loader itself was read from (the Apple_Boot partition).
    pub loader_device: String,
    /// Device the kernel will be loaded from; rewritten when a RAID set is found.
    pub boot_device: String,
}

/// Outcome of a successful discovery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootTarget {
    pub member: MemberId,
    pub boot_path: String,
}

impl<D: DeviceIo> RaidAssembly<D> {
    /// `look_for_raid` assembles every set reachable from `boot_config` and, if
    /// the booted partition belongs to a complete one, points `env.boot_device` at it.
    ///
    /// `boot_config` is either an array of partition dictionaries or a single
    /// dictionary. Malformed entries and non-RAID partitions are skipped.
    ///
    /// # Errors
    /// Returns [`RaidError::NoRaidFound`] or [`RaidError::IncompleteSet`] when
    /// there is nothing to boot from, [`RaidError::BadBootConfig`] for an
    /// unusable configuration, and [`RaidError::ArenaFull`] if the arena
    /// cannot be allocated.
    pub fn look_for_raid<P: BootPaths>(
        &mut self,
        boot_config: &Value,
        env: &mut BootEnv,
        paths: &P,
    ) -> Result<BootTarget, RaidError> {
        match boot_config {
            Value::Array(specs) => {
                self.reserve(self.config.fanout.saturating_mul(specs.len()))?;
                self.discover_list(specs, env, paths);
            }
            Value::Dict(_) => {
                self.reserve(self.config.single_spec_capacity)?;
                self.discover_single(boot_config)?;
            }
            other => {
                return Err(RaidError::BadBootConfig(format!(
                    "boot configuration is a {}",
                    other.kind()
                )));
            }
        }

        let Some(master) = self.master else {
            info!("RAID: boot partition is not part of a RAID set");
            return Err(RaidError::NoRaidFound);
        };
        if self.is_complete(Some(master)) {
            let boot_path = self.config.raid_boot_path(master);
            info!("RAID: booting from set {master} as {boot_path}");
            env.boot_device.clone_from(&boot_path);
            return Ok(BootTarget {
                member: master,
                boot_path,
            });
        }

        match self.members.get(master.0).map(|m| &m.kind) {
            Some(MemberKind::Composite(set)) => {
                warn!(
                    "RAID: set {master} is incomplete, {} of {} members found",
                    set.current_member_count,
                    set.members.len()
                );
                Err(RaidError::IncompleteSet {
                    member: master,
                    current: set.current_member_count,
                    total: set.members.len(),
                })
            }
            _ => {
                info!("RAID: boot partition is not part of a RAID set");
                Err(RaidError::NoRaidFound)
            }
        }
    }

    fn discover_list<P: BootPaths>(&mut self, specs: &[Value], env: &BootEnv, paths: &P) {
        let boot_partition = paths
            .next_partition(&env.loader_device)
            .map(|p| paths.resolve_device(&p));
        if boot_partition.is_none() {
            warn!(
                "RAID: cannot derive the boot partition from {}",
                env.loader_device
            );
        }

        for (i, spec) in specs.iter().enumerate() {
            let (path, size) = match partition_spec(spec) {
                Ok(spec) => spec,
                Err(err) => {
                    warn!("RAID: skipping boot config entry {i}: {err}");
                    continue;
                }
            };
            let leaf = match self.allocate_leaf(&path, size) {
                Ok(leaf) => leaf,
                Err(err) => {
                    warn!("RAID: skipping {path}: {err}");
                    continue;
                }
            };
            if boot_partition.as_deref() == Some(paths.resolve_device(&path).as_str()) {
                debug!("RAID: leaf {leaf} is the boot partition");
                self.master = Some(leaf);
            }
            // Failures only drop this candidate and are logged by assimilate.
            let _ = self.assimilate(leaf);
        }
    }

    fn discover_single(&mut self, spec: &Value) -> Result<(), RaidError> {
        let (path, size) = partition_spec(spec)?;
        let leaf = self.allocate_leaf(&path, size)?;
        let _ = self.assimilate(leaf);
        // The set built from the first leaf is the next arena entry; no other
        // member is consulted, even when the leaf turned out not to be RAID.
        self.master = Some(MemberId(leaf.0 + 1));
        Ok(())
    }
}

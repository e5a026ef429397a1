//! Resource ceilings installed on the guest process.
//!
//! The ceilings are a best-effort hardening layer: the supervisor running the judge is the one
//! enforcing the real memory and CPU limits. A ceiling that cannot be installed is skipped and the
//! run goes on without it.

use rlimit::Resource;
use serde::{Deserialize, Serialize};

/// Default limit on the address space of the guest, in bytes.
pub const DEFAULT_ADDRESS_SPACE: u64 = 256 * 1024 * 1024;
/// Default limit on the CPU time of the guest, in seconds.
pub const DEFAULT_CPU_TIME: u64 = 10;
/// Default limit on the number of processes/threads the guest can spawn.
pub const DEFAULT_PROCESSES: u64 = 32;
/// Default limit on the size of the files the guest can write, in bytes.
pub const DEFAULT_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// The ceilings to apply to a guest process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCeilings {
    /// Maximum size of the address space, in bytes (`RLIMIT_AS`).
    pub address_space: u64,
    /// Maximum CPU time, in seconds (`RLIMIT_CPU`).
    pub cpu_time: u64,
    /// Maximum number of processes of the user (`RLIMIT_NPROC`).
    pub processes: u64,
    /// Maximum size of a written file, in bytes (`RLIMIT_FSIZE`).
    pub file_size: u64,
}

impl Default for ResourceCeilings {
    fn default() -> Self {
        ResourceCeilings {
            address_space: DEFAULT_ADDRESS_SPACE,
            cpu_time: DEFAULT_CPU_TIME,
            processes: DEFAULT_PROCESSES,
            file_size: DEFAULT_FILE_SIZE,
        }
    }
}

/// A single limit ready to be installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ceiling {
    /// The limited resource.
    pub resource: Resource,
    /// The value used for both the soft and the hard limit.
    pub value: u64,
}

/// The list of ceilings that survived the checks in [`ResourceCeilings::plan`].
///
/// This is computed in the parent so that installing it in the forked child doesn't need to
/// allocate or log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CeilingPlan {
    ceilings: Vec<Ceiling>,
}

impl ResourceCeilings {
    /// The `(resource, requested value)` pairs of these ceilings.
    pub fn requested(&self) -> [(Resource, u64); 4] {
        [
            (Resource::AS, self.address_space),
            (Resource::CPU, self.cpu_time),
            (Resource::NPROC, self.processes),
            (Resource::FSIZE, self.file_size),
        ]
    }

    /// Check each ceiling against the platform and the current hard limits of this process.
    ///
    /// Unsupported resources are dropped, values above the current hard limit are lowered to it
    /// since an unprivileged process cannot raise it. Every problem is only logged.
    pub fn plan(&self) -> CeilingPlan {
        let mut ceilings = Vec::with_capacity(4);
        for (resource, requested) in self.requested() {
            if !resource.is_supported() {
                warn!(
                    "Ceiling {} is not supported on this platform, skipping it",
                    resource.as_name()
                );
                continue;
            }
            let hard = match rlimit::getrlimit(resource) {
                Ok((_, hard)) => hard,
                Err(e) => {
                    warn!("Cannot read {}: {}, skipping it", resource.as_name(), e);
                    continue;
                }
            };
            let value = clamp_to_hard(requested, hard);
            if value != requested {
                warn!(
                    "Ceiling {} lowered from {} to the hard limit {}",
                    resource.as_name(),
                    requested,
                    value
                );
            }
            ceilings.push(Ceiling { resource, value });
        }
        debug!("Ceiling plan: {:?}", ceilings);
        CeilingPlan { ceilings }
    }
}

/// The value to use for a ceiling given the current hard limit.
fn clamp_to_hard(requested: u64, hard: u64) -> u64 {
    if hard == rlimit::INFINITY {
        requested
    } else {
        requested.min(hard)
    }
}

impl CeilingPlan {
    /// The ceilings that will be installed.
    pub fn ceilings(&self) -> &[Ceiling] {
        &self.ceilings
    }

    /// Install all the ceilings on the current process, ignoring the failures.
    ///
    /// This is meant to be called in the child between `fork` and `exec`: it does not allocate,
    /// lock or log.
    pub fn install(&self) {
        for ceiling in &self.ceilings {
            let _ = rlimit::setrlimit(ceiling.resource, ceiling.value, ceiling.value);
        }
    }
}

//! Probe configuration.

use std::path::{Path, PathBuf};

use crate::version::{Version, KNOWN_CORE_VERSIONS};

/// The DRM render node opened when nothing else is configured.
pub const DEFAULT_DEVICE: &str = "/dev/dri/renderD128";

/// Environment variable overriding [`DEFAULT_DEVICE`] in the binary.
pub const DEVICE_ENV: &str = "GBM_PROBE_DEVICE";

pub const DEFAULT_WIDTH: u32 = 320;
pub const DEFAULT_HEIGHT: u32 = 240;

/// What to open and what to ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    pub(crate) device: PathBuf,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) candidates: Vec<Version>,
}

impl ProbeOptions {
    /// The DRM node the GBM device is created on.
    pub fn device(&self) -> &Path {
        &self.device
    }

    /// The size of the off-screen surface.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Versions to try, oldest first.
    pub fn candidates(&self) -> &[Version] {
        &self.candidates
    }
}

impl Default for ProbeOptions {
    fn default() -> Self {
        ProbeOptionsBuilder::new().build()
    }
}

/// Builder for [`ProbeOptions`].
#[derive(Debug, Clone)]
pub struct ProbeOptionsBuilder {
    options: ProbeOptions,
}

impl ProbeOptionsBuilder {
    pub fn new() -> Self {
        Self {
            options: ProbeOptions {
                device: PathBuf::from(DEFAULT_DEVICE),
                width: DEFAULT_WIDTH,
                height: DEFAULT_HEIGHT,
                candidates: KNOWN_CORE_VERSIONS.to_vec(),
            },
        }
    }

    /// Open `device` instead of [`DEFAULT_DEVICE`].
    pub fn with_device(mut self, device: impl Into<PathBuf>) -> Self {
        self.options.device = device.into();
        self
    }

    /// Size of the off-screen surface. Zero dimensions are raised to one.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.options.width = width.max(1);
        self.options.height = height.max(1);
        self
    }

    /// Replace the candidate versions.
    ///
    /// The order given doesn't matter; candidates are sorted oldest first
    /// and deduplicated.
    pub fn with_candidates(mut self, candidates: impl IntoIterator<Item = Version>) -> Self {
        let mut candidates: Vec<_> = candidates.into_iter().collect();
        candidates.sort();
        candidates.dedup();
        self.options.candidates = candidates;
        self
    }

    /// Take the device from [`DEVICE_ENV`] when it is set and not empty.
    pub fn with_env(self) -> Self {
        match std::env::var_os(DEVICE_ENV) {
            Some(device) if !device.is_empty() => self.with_device(device),
            _ => self,
        }
    }

    pub fn build(self) -> ProbeOptions {
        self.options
    }
}

impl Default for ProbeOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

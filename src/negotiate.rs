//! Context negotiation: finding the newest core profile the platform accepts.

use crate::error::{ErrorKind, Result};
use crate::platform::{ConfigRequest, Platform};
use crate::version::Version;

/// Try to create a core profile context of exactly `version`.
///
/// On success the caller owns both the config and the context. When the
/// context can't be created the config chosen for it is destroyed before the
/// error is returned, so a failed attempt leaves nothing behind.
pub fn try_create_context<P: Platform + ?Sized>(
    platform: &P,
    display: &P::Display,
    version: Version,
) -> Result<(P::Config, P::Context)> {
    let request = ConfigRequest::core(version);
    let config = platform.choose_config(display, &request)?;

    match platform.create_context(display, &config) {
        Ok(context) => Ok((config, context)),
        Err(err) => {
            if let Err(cleanup) = platform.destroy_config(display, config) {
                log::warn!("failed to destroy the config of a failed {version} attempt: {cleanup}");
            }
            Err(err)
        },
    }
}

/// Create a context for the newest of `candidates` the platform supports.
///
/// `candidates` are given oldest first and tried newest first; the first
/// success is returned together with its version. Failed attempts are not
/// errors on their own; only running out of candidates is.
pub fn probe_version<P: Platform + ?Sized>(
    platform: &P,
    display: &P::Display,
    candidates: &[Version],
) -> Result<(P::Config, P::Context, Version)> {
    for &version in candidates.iter().rev() {
        match try_create_context(platform, display, version) {
            Ok((config, context)) => {
                log::info!("created an OpenGL {version} core profile context");
                return Ok((config, context, version));
            },
            Err(err) => log::debug!("OpenGL {version} core profile rejected: {err}"),
        }
    }

    Err(ErrorKind::NoSupportedVersion.into())
}

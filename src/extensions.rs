//! Gating optional functionality on advertised extensions.

use crate::error::{Error, ErrorKind, Result};
use crate::gl::{ffi, Gl};
use crate::loader::PROGRAM_BINARY;
use crate::platform::ProcLoader;

/// Extension names are compared on at most this many bytes.
///
/// Two names sharing their first `MAX_EXTENSION_LEN` bytes compare equal.
/// No registered extension name comes close to this length.
pub const MAX_EXTENSION_LEN: usize = 128;

/// The extension providing `glGetProgramBinary` and `glProgramBinary`.
pub const GET_PROGRAM_BINARY: &str = "GL_ARB_get_program_binary";

/// Succeed if the current context advertises `name`.
///
/// Extensions are enumerated with `glGetStringi`; the match is exact and
/// case sensitive. Any GL error during the enumeration is reported as
/// [`ErrorKind::GlError`], an exhausted enumeration as
/// [`ErrorKind::ExtensionUnsupported`].
pub fn require_extension(gl: &Gl, name: &str) -> Result<()> {
    let count = gl.get_integer(ffi::NUM_EXTENSIONS)?;
    gl.check_error("glGetIntegerv(GL_NUM_EXTENSIONS)")?;

    for index in 0..count.max(0) as u32 {
        let extension = gl.get_string_i(ffi::EXTENSIONS, index)?;
        let failed = gl.get_error()? != ffi::NO_ERROR;
        match extension {
            Some(extension) if !failed => {
                if extension_eq(extension.to_bytes(), name.as_bytes()) {
                    log::debug!("found {name} at index {index} of {count}");
                    return Ok(());
                }
            },
            _ => {
                return Err(Error::with_message(
                    ErrorKind::GlError,
                    "glGetStringi(GL_EXTENSIONS) failed",
                ))
            },
        }
    }

    Err(Error::with_message(
        ErrorKind::ExtensionUnsupported,
        format!("required extension is not supported: {name}"),
    ))
}

/// Enable program binaries on the current context.
///
/// Requires [`GET_PROGRAM_BINARY`] and at least one binary format, then binds
/// the extension's entry points through `loader`. An extension advertising
/// zero formats is treated as missing.
pub fn require_program_binary<L: ProcLoader + ?Sized>(gl: &mut Gl, loader: &L) -> Result<()> {
    require_extension(gl, GET_PROGRAM_BINARY)?;

    let formats = gl.get_integer(ffi::NUM_PROGRAM_BINARY_FORMATS)?;
    if formats <= 0 {
        return Err(ErrorKind::NoBinaryFormats.into());
    }
    log::debug!("{formats} program binary format(s) supported");

    gl.resolve(loader, PROGRAM_BINARY)
}

/// Bounded comparison of two extension names.
fn extension_eq(advertised: &[u8], requested: &[u8]) -> bool {
    let advertised = &advertised[..advertised.len().min(MAX_EXTENSION_LEN)];
    let requested = &requested[..requested.len().min(MAX_EXTENSION_LEN)];
    advertised == requested
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_is_exact() {
        assert!(extension_eq(b"GL_ARB_get_program_binary", b"GL_ARB_get_program_binary"));
        assert!(!extension_eq(b"GL_ARB_get_program_binary", b"GL_ARB_get_program"));
        assert!(!extension_eq(b"GL_ARB_get_program", b"GL_ARB_get_program_binary"));
        assert!(!extension_eq(b"GL_ARB_get_program_binary_ext", b"GL_ARB_get_program_binary"));
        assert!(!extension_eq(b"gl_arb_get_program_binary", b"GL_ARB_get_program_binary"));
        assert!(!extension_eq(b"", b"GL_ARB_get_program_binary"));
    }

    #[test]
    fn names_past_the_bound_compare_equal() {
        let stem = "GL_X_".repeat(MAX_EXTENSION_LEN / 5 + 1);
        assert!(stem.len() > MAX_EXTENSION_LEN);

        let left = format!("{stem}left");
        let right = format!("{stem}right");
        assert!(extension_eq(left.as_bytes(), right.as_bytes()));

        let short = &stem[..MAX_EXTENSION_LEN - 1];
        assert!(!extension_eq(short.as_bytes(), left.as_bytes()));
    }
}

//! The probe as a whole: context, identification, program binary.

use std::io::Write;

use crate::context::GbmContext;
use crate::error::{Error, ErrorKind, Result};
use crate::options::ProbeOptions;
use crate::platform::Platform;
use crate::program;

/// Run the full probe on `platform`, reporting to `out`.
///
/// The context's identification strings are written as soon as the context
/// is up, the program binary lengths once the sample went through. The
/// context is destroyed explicitly on success so teardown failures are
/// reported.
pub fn run<P: Platform, W: Write>(platform: P, options: &ProbeOptions, out: &mut W) -> Result<()> {
    let mut context = GbmContext::create(platform, options)?;

    let info = context.info()?;
    writeln!(out, "OpenGL vendor string: {}", info.vendor).map_err(output_error)?;
    writeln!(out, "OpenGL renderer string: {}", info.renderer).map_err(output_error)?;
    writeln!(out, "OpenGL version string: {}", info.version).map_err(output_error)?;

    context.require_program_binary()?;
    let binary = program::program_binary_sample(context.gl())?;
    writeln!(out, "program binary expected length: {}", binary.expected_length)
        .map_err(output_error)?;
    writeln!(out, "program binary length returned: {}", binary.returned_length)
        .map_err(output_error)?;
    log::debug!("program binary format 0x{:x}", binary.format);

    context.destroy()
}

fn output_error(err: std::io::Error) -> Error {
    Error::with_message(ErrorKind::Output, err.to_string())
}

//! The purpose of this library is to find out what OpenGL a GBM device can
//! do without a display server, and whether its driver can hand out program
//! binaries.
//!
//! A [`GbmContext`] walks the known core profile versions from the newest
//! down and keeps the first one the platform creates a context for, on a small
//! off-screen window surface. The GL functions it uses are resolved through
//! the OpenGL library first and the platform's `GetProcAddress` second, see
//! [`loader`].
//!
//! Program binaries are optional: [`extensions::require_program_binary`]
//! checks for `GL_ARB_get_program_binary` and at least one binary format
//! before [`program::program_binary_sample`] compiles a small program,
//! extracts its binary and loads it back.
//!
//! [`driver::run`] does all of the above against any [`Platform`];
//! [`GbmPlatform`] is the real one.
//!
//! [`GbmContext`]: crate::context::GbmContext
//! [`Platform`]: crate::platform::Platform
//! [`GbmPlatform`]: crate::platform::gbm::GbmPlatform

#![deny(missing_debug_implementations)]

pub mod context;
pub mod driver;
pub mod error;
pub mod extensions;
pub mod gl;
pub mod loader;
pub mod negotiate;
pub mod options;
pub mod platform;
pub mod program;
pub mod version;

mod lib_loading;

pub use crate::context::{ContextInfo, GbmContext};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::options::{ProbeOptions, ProbeOptionsBuilder};
pub use crate::version::Version;

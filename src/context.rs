//! The owner of every platform resource the probe acquires.

use std::fmt;

use crate::error::{ErrorKind, Result};
use crate::extensions;
use crate::gl::{ffi, Gl};
use crate::loader::{CORE_QUERIES, MANDATORY};
use crate::negotiate;
use crate::options::ProbeOptions;
use crate::platform::{ContextApi, Platform};
use crate::version::{parse_version, Version};

/// Substituted for identification strings the context fails to report.
pub const GL_ERROR_STRING: &str = "GL_ERROR";

/// The strings a context identifies itself with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextInfo {
    pub vendor: String,
    pub renderer: String,
    pub version: String,
}

/// A current OpenGL context on an off-screen surface, with its GL functions.
///
/// Creation acquires, in order, the display connection, a config and context
/// pair, the window surface, and makes the context current. [`destroy`]
/// releases them in the reverse order and reports the first failure; dropping
/// the value does the same on a best-effort basis.
///
/// [`destroy`]: GbmContext::destroy
pub struct GbmContext<P: Platform> {
    platform: P,
    display: Option<P::Display>,
    config: Option<P::Config>,
    context: Option<P::Context>,
    window: Option<P::Window>,
    current: bool,
    version: Version,
    parsed_version: Option<Version>,
    gl: Gl,
}

impl<P: Platform> GbmContext<P> {
    /// Negotiate a context on `platform` and make it current.
    ///
    /// The core queries and every mandatory entry point are bound before this
    /// returns; a missing one fails the creation.
    pub fn create(platform: P, options: &ProbeOptions) -> Result<Self> {
        let display = platform.connect()?;
        let mut this = Self {
            platform,
            display: Some(display),
            config: None,
            context: None,
            window: None,
            current: false,
            version: Version::new(0, 0),
            parsed_version: None,
            gl: Gl::new(),
        };

        this.activate(options)?;
        Ok(this)
    }

    fn activate(&mut self, options: &ProbeOptions) -> Result<()> {
        let display = self.display.as_ref().ok_or(ErrorKind::BadDisplay)?;

        if !self.platform.supports_context_api(display, ContextApi::OpenGl) {
            return Err(ErrorKind::NotSupported("display does not support OpenGL").into());
        }

        let (config, context, version) =
            negotiate::probe_version(&self.platform, display, options.candidates())?;
        self.version = version;
        let config = self.config.insert(config);
        let context = self.context.insert(context);

        let (width, height) = options.size();
        let window =
            self.window.insert(self.platform.create_window(display, config, width, height)?);

        self.platform.make_current(display, window, context)?;
        self.current = true;

        self.gl.resolve(&self.platform, CORE_QUERIES)?;
        self.gl.clear_errors()?;
        let version_string = self.gl.get_string(ffi::VERSION)?;
        let version_string =
            if self.gl.get_error()? == ffi::NO_ERROR { version_string } else { None };
        self.parsed_version = parse_version(version_string.as_deref());
        match self.parsed_version {
            Some(parsed) => log::info!("driver reports OpenGL {parsed}"),
            None => log::warn!("unrecognised GL_VERSION string {version_string:?}"),
        }

        self.gl.resolve(&self.platform, MANDATORY)
    }

    /// The version the context was negotiated for.
    pub fn version(&self) -> Version {
        self.version
    }

    /// The version parsed from `GL_VERSION`, `None` when it was unreadable.
    ///
    /// Drivers may report a newer version than requested. This is advisory
    /// only.
    pub fn parsed_version(&self) -> Option<Version> {
        self.parsed_version
    }

    /// The GL functions of the context.
    pub fn gl(&self) -> &Gl {
        &self.gl
    }

    /// Vendor, renderer and version strings, with [`GL_ERROR_STRING`] for
    /// any the context fails to report.
    pub fn info(&self) -> Result<ContextInfo> {
        self.gl.clear_errors()?;
        Ok(ContextInfo {
            vendor: self.query_string(ffi::VENDOR)?,
            renderer: self.query_string(ffi::RENDERER)?,
            version: self.query_string(ffi::VERSION)?,
        })
    }

    fn query_string(&self, name: ffi::types::GLenum) -> Result<String> {
        let value = self.gl.get_string(name)?;
        Ok(match (value, self.gl.get_error()?) {
            (Some(value), ffi::NO_ERROR) => value,
            _ => GL_ERROR_STRING.to_owned(),
        })
    }

    /// Enable program binaries, see [`extensions::require_program_binary`].
    pub fn require_program_binary(&mut self) -> Result<()> {
        extensions::require_program_binary(&mut self.gl, &self.platform)
    }

    /// Release everything in reverse acquisition order.
    pub fn destroy(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        let Some(display) = self.display.as_ref() else {
            return Ok(());
        };

        if self.current {
            self.current = false;
            self.platform.release_current(display)?;
        }

        if let Some(window) = self.window.take() {
            self.platform.destroy_window(display, window)?;
        }

        if let Some(context) = self.context.take() {
            self.platform.destroy_context(display, context)?;
        }

        if let Some(config) = self.config.take() {
            self.platform.destroy_config(display, config)?;
        }

        if let Some(display) = self.display.take() {
            self.platform.disconnect(display)?;
        }

        Ok(())
    }
}

impl<P: Platform> Drop for GbmContext<P> {
    fn drop(&mut self) {
        // Each step gives up its resource before releasing it, so every
        // failure makes progress.
        while let Err(err) = self.release() {
            log::warn!("releasing the GBM context failed: {err}");
        }
    }
}

impl<P: Platform> fmt::Debug for GbmContext<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GbmContext")
            .field("display", &self.display)
            .field("config", &self.config)
            .field("context", &self.context)
            .field("window", &self.window)
            .field("current", &self.current)
            .field("version", &self.version)
            .field("parsed_version", &self.parsed_version)
            .finish()
    }
}

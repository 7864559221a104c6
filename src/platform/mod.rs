//! The boundary with the display/windowing layer.
//!
//! Everything the probe needs from the outside world goes through
//! [`Platform`] and [`ProcLoader`]. The real implementation lives in
//! [`gbm`]; tests provide their own.

use std::ffi::{c_void, CStr};
use std::fmt;

use crate::error::Result;
use crate::version::Version;

pub mod gbm;

/// The client Api a context is created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextApi {
    /// Desktop OpenGL.
    OpenGl,
}

/// The OpenGL profile requested for a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlProfile {
    /// Core profile, deprecated functionality removed.
    Core,
}

/// Surface attributes a configuration can be matched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceAttrib {
    RedSize,
    GreenSize,
    BlueSize,
    AlphaSize,
    DepthSize,
    StencilSize,
    DoubleBuffered,
}

/// The value requested for a [`SurfaceAttrib`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttribValue {
    /// Accept whatever the platform offers.
    DontCare,
}

/// Surface attributes the negotiator leaves to the platform.
pub const SOFT_SURFACE_ATTRIBS: [SurfaceAttrib; 7] = [
    SurfaceAttrib::RedSize,
    SurfaceAttrib::GreenSize,
    SurfaceAttrib::BlueSize,
    SurfaceAttrib::AlphaSize,
    SurfaceAttrib::DepthSize,
    SurfaceAttrib::StencilSize,
    SurfaceAttrib::DoubleBuffered,
];

/// A request for a configuration and the context created from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRequest {
    pub api: ContextApi,
    pub profile: GlProfile,
    pub version: Version,
    pub surface: Vec<(SurfaceAttrib, AttribValue)>,
}

impl ConfigRequest {
    /// A core profile OpenGL request for `version` with every surface
    /// attribute left to the platform.
    pub fn core(version: Version) -> Self {
        let surface =
            SOFT_SURFACE_ATTRIBS.iter().map(|&attrib| (attrib, AttribValue::DontCare)).collect();
        Self { api: ContextApi::OpenGl, profile: GlProfile::Core, version, surface }
    }

    /// The value requested for `attrib`, if it is part of the request.
    pub fn surface_attrib(&self, attrib: SurfaceAttrib) -> Option<AttribValue> {
        self.surface.iter().find(|(a, _)| *a == attrib).map(|(_, value)| *value)
    }
}

/// Function lookup for the rendering Api.
pub trait ProcLoader {
    /// Look `name` up in the OpenGL library itself.
    ///
    /// Returns null when the symbol is not exported.
    fn dl_sym(&self, name: &CStr) -> *const c_void;

    /// Ask the current context for the address of `name`.
    ///
    /// Returns null when the implementation doesn't know the function.
    fn get_proc_address(&self, name: &CStr) -> *const c_void;
}

/// The display layer a [`GbmContext`] is built on.
///
/// Handles are plain values owned by the caller; every `destroy_*` consumes
/// its handle. Callers must destroy the window before the context, the
/// context before its config, and all of them before disconnecting.
///
/// [`GbmContext`]: crate::context::GbmContext
pub trait Platform: ProcLoader {
    type Display: fmt::Debug;
    type Config: fmt::Debug;
    type Context: fmt::Debug;
    type Window: fmt::Debug;

    /// Open the display connection.
    fn connect(&self) -> Result<Self::Display>;

    /// Whether contexts for `api` can be created on `display` at all.
    fn supports_context_api(&self, display: &Self::Display, api: ContextApi) -> bool;

    /// Pick a configuration satisfying `request`.
    fn choose_config(&self, display: &Self::Display, request: &ConfigRequest)
        -> Result<Self::Config>;

    /// Create a context for the Api, profile and version `config` was chosen
    /// with.
    fn create_context(&self, display: &Self::Display, config: &Self::Config)
        -> Result<Self::Context>;

    /// Create the off-screen window surface.
    fn create_window(
        &self,
        display: &Self::Display,
        config: &Self::Config,
        width: u32,
        height: u32,
    ) -> Result<Self::Window>;

    /// Make `context` current on the calling thread, drawing to `window`.
    fn make_current(
        &self,
        display: &Self::Display,
        window: &Self::Window,
        context: &Self::Context,
    ) -> Result<()>;

    /// Make no context current on the calling thread.
    fn release_current(&self, display: &Self::Display) -> Result<()>;

    fn destroy_window(&self, display: &Self::Display, window: Self::Window) -> Result<()>;

    fn destroy_context(&self, display: &Self::Display, context: Self::Context) -> Result<()>;

    fn destroy_config(&self, display: &Self::Display, config: Self::Config) -> Result<()>;

    /// Close the connection. Nothing created from `display` may be alive.
    fn disconnect(&self, display: Self::Display) -> Result<()>;
}

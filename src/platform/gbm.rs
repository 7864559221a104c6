//! EGL on top of a GBM device.
//!
//! The display is obtained through `eglGetPlatformDisplay` when the client
//! supports `EGL_KHR_platform_gbm`, through `eglGetPlatformDisplayEXT` with
//! `EGL_MESA_platform_gbm`, and through plain `eglGetDisplay` otherwise. The
//! window surface is created the same way the display was.

use std::collections::HashSet;
use std::ffi::{c_char, c_void, CStr, CString};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::ptr;

use bitflags::bitflags;
use gbm::{AsRaw, BufferObjectFlags, Device, Format, Surface};
use gbm_probe_egl_sys::egl;
use gbm_probe_egl_sys::egl::types::EGLAttrib;
use gbm_probe_egl_sys::{EGLConfig, EGLContext, EGLDisplay, EGLSurface, EGLenum, EGLint};
use libloading::Library;
use once_cell::sync::{Lazy, OnceCell};

use crate::error::{Error, ErrorKind, Result};
use crate::lib_loading::{self, SymLoading, SymWrapper};
use crate::platform::{
    AttribValue, ConfigRequest, ContextApi, GlProfile, Platform, ProcLoader, SurfaceAttrib,
};
use crate::version::Version;

const EGL_LIBRARIES: &[&str] = &["libEGL.so.1", "libEGL.so"];

/// Libraries searched for GL functions before asking EGL.
pub const GL_LIBRARIES: &[&str] = &["libOpenGL.so.0", "libGL.so.1"];

const EGL_DONT_CARE: EGLint = -1;

pub(crate) static EGL: Lazy<Option<Egl>> =
    Lazy::new(|| unsafe { SymWrapper::new(EGL_LIBRARIES).map(Egl) });

type EglGetProcAddress = unsafe extern "system" fn(*const c_char) -> *const c_void;

static EGL_GET_PROC_ADDRESS: OnceCell<Option<EglGetProcAddress>> = OnceCell::new();

pub(crate) struct Egl(SymWrapper<egl::Egl>);

// The function table is written once when the library is loaded.
unsafe impl Sync for Egl {}
unsafe impl Send for Egl {}

impl Deref for Egl {
    type Target = egl::Egl;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl SymLoading for egl::Egl {
    unsafe fn load_with(lib: &Library) -> Self {
        let loader = move |name: &'static str| -> *const c_void {
            let Ok(name) = CString::new(name) else {
                return ptr::null();
            };

            // Check if the symbol is available in the library directly.
            if let Ok(sym) = unsafe { lib.get::<*const c_void>(name.as_bytes_with_nul()) } {
                return *sym;
            }

            // Before EGL 1.5 eglGetProcAddress only knows extension functions,
            // hence the library lookup first.
            let get_proc_address = EGL_GET_PROC_ADDRESS.get_or_init(|| unsafe {
                lib.get::<EglGetProcAddress>(b"eglGetProcAddress\0").ok().map(|sym| *sym)
            });

            match *get_proc_address {
                Some(get_proc_address) => unsafe { get_proc_address(name.as_ptr()) },
                None => ptr::null(),
            }
        };

        Self::load_with(loader)
    }
}

bitflags! {
    /// What a display offers to the probe.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DisplayFeatures: u32 {
        /// Contexts can be created for a specific version and profile.
        const CREATE_CONTEXT = 0b0000_0001;
        /// Desktop OpenGL is one of the client Apis.
        const OPENGL         = 0b0000_0010;
    }
}

/// EGL over the GBM device of a DRM render node.
pub struct GbmPlatform {
    egl: &'static Egl,
    gl_library: Option<Library>,
    device: PathBuf,
}

impl GbmPlatform {
    /// Load EGL and the OpenGL library for a platform on `device`.
    ///
    /// The device itself is only opened by [`Platform::connect`].
    pub fn new(device: impl Into<PathBuf>) -> Result<Self> {
        let egl = EGL
            .as_ref()
            .ok_or_else(|| Error::with_message(ErrorKind::NotFound, "failed to load libEGL"))?;

        let gl_library = unsafe { lib_loading::open_first(GL_LIBRARIES) };
        if gl_library.is_none() {
            log::warn!("no OpenGL library found, GL functions come from eglGetProcAddress only");
        }

        Ok(Self { egl, gl_library, device: device.into() })
    }

    /// The DRM node [`Platform::connect`] opens.
    pub fn device(&self) -> &Path {
        &self.device
    }

    fn get_platform_display(
        &self,
        device: &Device<File>,
        client_extensions: &HashSet<&'static str>,
    ) -> Result<EglDisplay> {
        if !self.egl.GetPlatformDisplay.is_loaded() {
            return Err(ErrorKind::NotSupported("eglGetPlatformDisplay is not supported").into());
        }

        if !client_extensions.contains("EGL_KHR_platform_gbm") {
            return Err(ErrorKind::NotSupported("EGL_KHR_platform_gbm is not supported").into());
        }

        let attrs = [egl::NONE as EGLAttrib];
        let display = unsafe {
            self.egl.GetPlatformDisplay(
                egl::PLATFORM_GBM_KHR,
                device.as_raw() as *mut _,
                attrs.as_ptr(),
            )
        };

        self.check_display_error(display, "eglGetPlatformDisplay").map(EglDisplay::Khr)
    }

    fn get_platform_display_ext(
        &self,
        device: &Device<File>,
        client_extensions: &HashSet<&'static str>,
    ) -> Result<EglDisplay> {
        if !self.egl.GetPlatformDisplayEXT.is_loaded() {
            return Err(ErrorKind::NotSupported("eglGetPlatformDisplayEXT is not supported").into());
        }

        if !client_extensions.contains("EGL_MESA_platform_gbm") {
            return Err(ErrorKind::NotSupported("EGL_MESA_platform_gbm is not supported").into());
        }

        let attrs = [egl::NONE as EGLint];
        let display = unsafe {
            self.egl.GetPlatformDisplayEXT(
                egl::PLATFORM_GBM_MESA,
                device.as_raw() as *mut _,
                attrs.as_ptr(),
            )
        };

        self.check_display_error(display, "eglGetPlatformDisplayEXT").map(EglDisplay::Ext)
    }

    fn get_display(&self, device: &Device<File>) -> Result<EglDisplay> {
        let display = unsafe { self.egl.GetDisplay(device.as_raw() as _) };
        self.check_display_error(display, "eglGetDisplay").map(EglDisplay::Legacy)
    }

    fn check_display_error(&self, display: EGLDisplay, call: &str) -> Result<EGLDisplay> {
        if display == egl::NO_DISPLAY {
            Err(last_error(self.egl, call))
        } else {
            Ok(display)
        }
    }

    fn native_format(&self, display: &GbmDisplay, config: EGLConfig) -> Option<Format> {
        let mut visual_id = 0;
        let ok = unsafe {
            self.egl.GetConfigAttrib(
                *display.raw,
                config,
                egl::NATIVE_VISUAL_ID as EGLint,
                &mut visual_id,
            )
        };

        if ok == egl::FALSE {
            return None;
        }

        Format::try_from(visual_id as u32).ok()
    }
}

impl fmt::Debug for GbmPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GbmPlatform")
            .field("device", &self.device)
            .field("gl_library", &self.gl_library.is_some())
            .finish()
    }
}

impl ProcLoader for GbmPlatform {
    fn dl_sym(&self, name: &CStr) -> *const c_void {
        let Some(library) = self.gl_library.as_ref() else {
            return ptr::null();
        };

        match unsafe { library.get::<*const c_void>(name.to_bytes_with_nul()) } {
            Ok(sym) => *sym,
            Err(_) => ptr::null(),
        }
    }

    fn get_proc_address(&self, name: &CStr) -> *const c_void {
        unsafe { self.egl.GetProcAddress(name.as_ptr()) as *const _ }
    }
}

impl Platform for GbmPlatform {
    type Config = GbmConfig;
    type Context = EglContext;
    type Display = GbmDisplay;
    type Window = GbmWindow;

    fn connect(&self) -> Result<GbmDisplay> {
        let file = OpenOptions::new().read(true).write(true).open(&self.device).map_err(|err| {
            io_error(err, ErrorKind::NotFound, format!("failed to open {}", self.device.display()))
        })?;

        let device = Device::new(file).map_err(|err| {
            io_error(err, ErrorKind::InitializationFailed, "failed to create the GBM device".into())
        })?;

        let client_extensions = get_extensions(self.egl, egl::NO_DISPLAY);
        let raw = self
            .get_platform_display(&device, &client_extensions)
            .or_else(|_| self.get_platform_display_ext(&device, &client_extensions))
            .or_else(|_| self.get_display(&device))?;

        let version = unsafe {
            let (mut major, mut minor) = (0, 0);
            if self.egl.Initialize(*raw, &mut major, &mut minor) == egl::FALSE {
                return Err(last_error(self.egl, "eglInitialize"));
            }

            Version::new(major as u32, minor as u32)
        };

        let extensions = get_extensions(self.egl, *raw);
        let client_apis = query_string_set(self.egl, *raw, egl::CLIENT_APIS);
        let features = extract_display_features(&extensions, &client_apis, version);
        log::debug!("EGL {version} display over {}: {features:?}", self.device.display());

        Ok(GbmDisplay { raw, version, features, device })
    }

    fn supports_context_api(&self, display: &GbmDisplay, api: ContextApi) -> bool {
        match api {
            ContextApi::OpenGl => display.features.contains(DisplayFeatures::OPENGL),
        }
    }

    fn choose_config(&self, display: &GbmDisplay, request: &ConfigRequest) -> Result<GbmConfig> {
        let attrs = config_attributes(request);

        let mut num_configs = 0;
        unsafe {
            if self.egl.ChooseConfig(
                *display.raw,
                attrs.as_ptr(),
                ptr::null_mut(),
                0,
                &mut num_configs,
            ) == egl::FALSE
            {
                return Err(last_error(self.egl, "eglChooseConfig"));
            }
        }

        if num_configs <= 0 {
            return Err(Error::with_message(ErrorKind::BadConfig, "no matching EGL config"));
        }

        let mut configs: Vec<EGLConfig> = Vec::with_capacity(num_configs as usize);
        unsafe {
            if self.egl.ChooseConfig(
                *display.raw,
                attrs.as_ptr(),
                configs.as_mut_ptr(),
                num_configs,
                &mut num_configs,
            ) == egl::FALSE
            {
                return Err(last_error(self.egl, "eglChooseConfig"));
            }

            configs.set_len(num_configs as usize);
        }

        // The surface is allocated by GBM, so its format decides.
        configs
            .into_iter()
            .find_map(|raw| {
                let format = self.native_format(display, raw)?;
                display
                    .device
                    .is_format_supported(format, BufferObjectFlags::RENDERING)
                    .then(|| GbmConfig { raw, format, request: request.clone() })
            })
            .ok_or_else(|| {
                Error::with_message(
                    ErrorKind::BadConfig,
                    "no EGL config has a format the GBM device renders to",
                )
            })
    }

    fn create_context(&self, display: &GbmDisplay, config: &GbmConfig) -> Result<EglContext> {
        let request = &config.request;
        let api = match request.api {
            ContextApi::OpenGl => egl::OPENGL_API,
        };

        if unsafe { self.egl.BindAPI(api) } == egl::FALSE {
            return Err(last_error(self.egl, "eglBindAPI"));
        }

        if !display.features.contains(DisplayFeatures::CREATE_CONTEXT) {
            return Err(ErrorKind::NotSupported("EGL_KHR_create_context is not supported").into());
        }

        let attrs = context_attributes(request);
        let raw = unsafe {
            self.egl.CreateContext(*display.raw, config.raw, egl::NO_CONTEXT, attrs.as_ptr())
        };

        if raw == egl::NO_CONTEXT {
            return Err(last_error(self.egl, "eglCreateContext"));
        }

        Ok(EglContext { raw })
    }

    fn create_window(
        &self,
        display: &GbmDisplay,
        config: &GbmConfig,
        width: u32,
        height: u32,
    ) -> Result<GbmWindow> {
        log::debug!("creating a {width}x{height} {:?} GBM surface", config.format);
        let surface: Surface<()> = display
            .device
            .create_surface(width, height, config.format, BufferObjectFlags::RENDERING)
            .map_err(|err| {
                io_error(err, ErrorKind::BadNativeWindow, "failed to create the GBM surface".into())
            })?;

        let native_window = surface.as_raw() as *mut c_void;
        let raw = match display.raw {
            EglDisplay::Khr(raw_display) => unsafe {
                let attrs = [egl::NONE as EGLAttrib];
                self.egl.CreatePlatformWindowSurface(
                    raw_display,
                    config.raw,
                    native_window,
                    attrs.as_ptr(),
                )
            },
            EglDisplay::Ext(raw_display) => unsafe {
                let attrs = [egl::NONE as EGLint];
                self.egl.CreatePlatformWindowSurfaceEXT(
                    raw_display,
                    config.raw,
                    native_window,
                    attrs.as_ptr(),
                )
            },
            EglDisplay::Legacy(raw_display) => unsafe {
                let attrs = [egl::NONE as EGLint];
                self.egl.CreateWindowSurface(
                    raw_display,
                    config.raw,
                    native_window as _,
                    attrs.as_ptr(),
                )
            },
        };

        if raw == egl::NO_SURFACE {
            return Err(last_error(self.egl, "eglCreateWindowSurface"));
        }

        Ok(GbmWindow { raw, surface, width, height })
    }

    fn make_current(
        &self,
        display: &GbmDisplay,
        window: &GbmWindow,
        context: &EglContext,
    ) -> Result<()> {
        if unsafe { self.egl.MakeCurrent(*display.raw, window.raw, window.raw, context.raw) }
            == egl::FALSE
        {
            return Err(last_error(self.egl, "eglMakeCurrent"));
        }

        Ok(())
    }

    fn release_current(&self, display: &GbmDisplay) -> Result<()> {
        if unsafe {
            self.egl.MakeCurrent(*display.raw, egl::NO_SURFACE, egl::NO_SURFACE, egl::NO_CONTEXT)
        } == egl::FALSE
        {
            return Err(last_error(self.egl, "eglMakeCurrent"));
        }

        Ok(())
    }

    fn destroy_window(&self, display: &GbmDisplay, window: GbmWindow) -> Result<()> {
        // The GBM surface goes away with `window`, after the EGL surface.
        if unsafe { self.egl.DestroySurface(*display.raw, window.raw) } == egl::FALSE {
            return Err(last_error(self.egl, "eglDestroySurface"));
        }

        Ok(())
    }

    fn destroy_context(&self, display: &GbmDisplay, context: EglContext) -> Result<()> {
        if unsafe { self.egl.DestroyContext(*display.raw, context.raw) } == egl::FALSE {
            return Err(last_error(self.egl, "eglDestroyContext"));
        }

        Ok(())
    }

    fn destroy_config(&self, _display: &GbmDisplay, _config: GbmConfig) -> Result<()> {
        // EGL configs belong to the display.
        Ok(())
    }

    fn disconnect(&self, display: GbmDisplay) -> Result<()> {
        // The display is private to this platform, so nothing else uses it.
        if unsafe { self.egl.Terminate(*display.raw) } == egl::FALSE {
            return Err(last_error(self.egl, "eglTerminate"));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EglDisplay {
    /// Obtained with `eglGetPlatformDisplay`.
    Khr(EGLDisplay),
    /// Obtained with `eglGetPlatformDisplayEXT`.
    Ext(EGLDisplay),
    /// Obtained with `eglGetDisplay`.
    Legacy(EGLDisplay),
}

impl Deref for EglDisplay {
    type Target = EGLDisplay;

    fn deref(&self) -> &Self::Target {
        match self {
            EglDisplay::Khr(display) | EglDisplay::Ext(display) | EglDisplay::Legacy(display) => {
                display
            },
        }
    }
}

/// An initialized EGL display and the GBM device under it.
pub struct GbmDisplay {
    raw: EglDisplay,
    version: Version,
    features: DisplayFeatures,
    device: Device<File>,
}

impl fmt::Debug for GbmDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GbmDisplay")
            .field("raw", &self.raw)
            .field("version", &self.version)
            .field("features", &self.features)
            .finish_non_exhaustive()
    }
}

/// An EGL config whose native visual is a GBM format.
#[derive(Debug)]
pub struct GbmConfig {
    raw: EGLConfig,
    format: Format,
    request: ConfigRequest,
}

#[derive(Debug)]
pub struct EglContext {
    raw: EGLContext,
}

/// A GBM surface and the EGL window surface drawing to it.
pub struct GbmWindow {
    raw: EGLSurface,
    surface: Surface<()>,
    width: u32,
    height: u32,
}

impl fmt::Debug for GbmWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GbmWindow")
            .field("raw", &self.raw)
            .field("surface", &self.surface.as_raw())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// The `eglChooseConfig` attribute list for `request`.
///
/// Window surfaces are always requested. Double buffering has no EGL config
/// attribute and is left out.
fn config_attributes(request: &ConfigRequest) -> Vec<EGLint> {
    let renderable = match request.api {
        ContextApi::OpenGl => egl::OPENGL_BIT,
    };

    let mut attrs = vec![
        egl::SURFACE_TYPE as EGLint,
        egl::WINDOW_BIT as EGLint,
        egl::RENDERABLE_TYPE as EGLint,
        renderable as EGLint,
    ];

    for &(attrib, value) in &request.surface {
        let name = match attrib {
            SurfaceAttrib::RedSize => egl::RED_SIZE,
            SurfaceAttrib::GreenSize => egl::GREEN_SIZE,
            SurfaceAttrib::BlueSize => egl::BLUE_SIZE,
            SurfaceAttrib::AlphaSize => egl::ALPHA_SIZE,
            SurfaceAttrib::DepthSize => egl::DEPTH_SIZE,
            SurfaceAttrib::StencilSize => egl::STENCIL_SIZE,
            SurfaceAttrib::DoubleBuffered => continue,
        };

        attrs.push(name as EGLint);
        attrs.push(match value {
            AttribValue::DontCare => EGL_DONT_CARE,
        });
    }

    attrs.push(egl::NONE as EGLint);
    attrs
}

/// The `eglCreateContext` attribute list for `request`.
fn context_attributes(request: &ConfigRequest) -> Vec<EGLint> {
    let mut attrs = vec![
        egl::CONTEXT_MAJOR_VERSION as EGLint,
        request.version.major as EGLint,
        egl::CONTEXT_MINOR_VERSION as EGLint,
        request.version.minor as EGLint,
    ];

    let profile = match request.profile {
        GlProfile::Core => egl::CONTEXT_OPENGL_CORE_PROFILE_BIT,
    };

    attrs.push(egl::CONTEXT_OPENGL_PROFILE_MASK as EGLint);
    attrs.push(profile as EGLint);

    attrs.push(egl::NONE as EGLint);
    attrs
}

fn extract_display_features(
    extensions: &HashSet<&'static str>,
    client_apis: &HashSet<&'static str>,
    version: Version,
) -> DisplayFeatures {
    let mut features = DisplayFeatures::empty();

    features.set(
        DisplayFeatures::CREATE_CONTEXT,
        version >= Version::new(1, 5) || extensions.contains("EGL_KHR_create_context"),
    );

    // eglBindAPI(EGL_OPENGL_API) appeared in 1.4.
    features.set(
        DisplayFeatures::OPENGL,
        version >= Version::new(1, 4) && client_apis.contains("OpenGL"),
    );

    features
}

/// Map the pending EGL error to an [`Error`] for `call`.
fn last_error(egl: &Egl, call: &str) -> Error {
    let raw_code = unsafe { egl.GetError() } as EGLenum;
    let kind = match raw_code {
        egl::SUCCESS => {
            return Error::with_message(ErrorKind::Misc, format!("{call} failed without a reason"))
        },
        egl::NOT_INITIALIZED => ErrorKind::NotInitialized,
        egl::BAD_ACCESS => ErrorKind::BadAccess,
        egl::BAD_ALLOC => ErrorKind::BadAlloc,
        egl::BAD_ATTRIBUTE => ErrorKind::BadAttribute,
        egl::BAD_CONTEXT => ErrorKind::BadContext,
        egl::BAD_CONFIG => ErrorKind::BadConfig,
        egl::BAD_CURRENT_SURFACE => ErrorKind::BadCurrentSurface,
        egl::BAD_DISPLAY => ErrorKind::BadDisplay,
        egl::BAD_SURFACE => ErrorKind::BadSurface,
        egl::BAD_MATCH => ErrorKind::BadMatch,
        egl::BAD_PARAMETER => ErrorKind::BadParameter,
        egl::BAD_NATIVE_PIXMAP => ErrorKind::BadNativeWindow,
        egl::BAD_NATIVE_WINDOW => ErrorKind::BadNativeWindow,
        egl::CONTEXT_LOST => ErrorKind::ContextLost,
        _ => ErrorKind::Misc,
    };

    Error::new(Some(raw_code as i64), Some(format!("{call} failed")), kind)
}

fn io_error(err: io::Error, kind: ErrorKind, context: String) -> Error {
    Error::new(err.raw_os_error().map(i64::from), Some(format!("{context}: {err}")), kind)
}

/// Collect EGL extensions for the given `display`.
fn get_extensions(egl: &Egl, display: EGLDisplay) -> HashSet<&'static str> {
    query_string_set(egl, display, egl::EXTENSIONS)
}

fn query_string_set(egl: &Egl, display: EGLDisplay, name: EGLenum) -> HashSet<&'static str> {
    // eglQueryString returns static strings.
    unsafe { extensions_from_ptr(egl.QueryString(display, name as EGLint)) }
}

/// # Safety
///
/// `extensions` must be null or point to a static, null terminated string.
unsafe fn extensions_from_ptr(extensions: *const c_char) -> HashSet<&'static str> {
    if extensions.is_null() {
        return HashSet::new();
    }

    match unsafe { CStr::from_ptr(extensions) }.to_str() {
        Ok(extensions) => extensions.split(' ').filter(|name| !name.is_empty()).collect(),
        Err(_) => HashSet::new(),
    }
}

//! A scripted platform and GL driver for running the probe without a GPU.
//!
//! The platform records every call it receives in a shared event log. The GL
//! entry points are plain `extern "system"` functions reading a thread-local
//! driver state, so every test thread gets its own driver.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::ffi::{c_void, CStr, CString};
use std::ptr;
use std::rc::Rc;

use gbm_probe::gl::ffi;
use gbm_probe::gl::ffi::types::{GLchar, GLenum, GLint, GLsizei, GLubyte, GLuint};
use gbm_probe::platform::{ConfigRequest, ContextApi, Platform, ProcLoader};
use gbm_probe::{Error, ErrorKind, Result, Version};

/// The binary format tag the mock driver hands out.
pub const BINARY_FORMAT: GLenum = 0x8e21;

/// Platform operations that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Connect,
    ChooseConfig,
    CreateContext,
    CreateWindow,
    MakeCurrent,
    ReleaseCurrent,
    DestroyWindow,
    DestroyContext,
    DestroyConfig,
    Disconnect,
}

/// What the platform was asked to do, in order. Failed calls are recorded
/// too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect,
    ChooseConfig(Version),
    CreateContext(Version),
    CreateWindow(u32, u32),
    MakeCurrent,
    ReleaseCurrent,
    DestroyWindow,
    DestroyContext(Version),
    DestroyConfig(Version),
    Disconnect,
}

pub type Events = Rc<RefCell<Vec<Event>>>;

/// How the mock platform and driver behave.
#[derive(Debug, Clone)]
pub struct Script {
    /// Versions a context can be created for.
    pub supported: Vec<Version>,
    /// Versions no config is found for.
    pub no_config: Vec<Version>,
    /// Whether the display offers desktop OpenGL.
    pub opengl: bool,
    pub vendor: Option<&'static str>,
    pub renderer: Option<&'static str>,
    pub version: Option<&'static str>,
    pub extensions: Vec<&'static str>,
    /// Index at which `glGetStringi(GL_EXTENSIONS)` fails.
    pub broken_extension: Option<usize>,
    pub binary_formats: GLint,
    pub binary: Vec<u8>,
    pub compiles: bool,
    pub links: bool,
    /// Symbols neither lookup tier knows.
    pub missing: Vec<&'static str>,
    /// Symbols only `get_proc_address` knows.
    pub context_only: Vec<&'static str>,
    pub fail_on: Vec<Op>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            supported: vec![Version::new(4, 1)],
            no_config: Vec::new(),
            opengl: true,
            vendor: Some("Mock Vendor"),
            renderer: Some("Mock Renderer"),
            version: Some("4.1 Mock 24.0.1"),
            extensions: vec!["GL_ARB_ES2_compatibility", "GL_ARB_get_program_binary", "GL_KHR_debug"],
            broken_extension: None,
            binary_formats: 1,
            binary: (0..64).collect(),
            compiles: true,
            links: true,
            missing: Vec::new(),
            context_only: Vec::new(),
            fail_on: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct MockDisplay;

#[derive(Debug)]
pub struct MockConfig(pub Version);

#[derive(Debug)]
pub struct MockContext(pub Version);

#[derive(Debug)]
pub struct MockWindow(pub u32, pub u32);

/// A [`Platform`] following a [`Script`].
#[derive(Debug)]
pub struct MockPlatform {
    script: Script,
    events: Events,
    lookups: Cell<usize>,
}

impl MockPlatform {
    /// Create the platform and install the matching driver on this thread.
    pub fn new(script: Script) -> (Self, Events) {
        Driver::install(&script);
        let events = Events::default();
        (Self { script, events: events.clone(), lookups: Cell::new(0) }, events)
    }

    /// How many symbol lookups were made through either tier.
    pub fn lookups(&self) -> usize {
        self.lookups.get()
    }

    fn record(&self, event: Event, op: Op) -> Result<()> {
        self.events.borrow_mut().push(event);
        if self.script.fail_on.contains(&op) {
            return Err(Error::with_message(op_error(op), format!("scripted {op:?} failure")));
        }

        Ok(())
    }

    fn lookup(&self, name: &CStr, tier_knows: bool) -> *const c_void {
        self.lookups.set(self.lookups.get() + 1);
        let name = name.to_str().unwrap();
        if !tier_knows || self.script.missing.contains(&name) {
            return ptr::null();
        }

        gl_function(name)
    }
}

fn op_error(op: Op) -> ErrorKind {
    match op {
        Op::Connect => ErrorKind::NotFound,
        Op::ChooseConfig | Op::DestroyConfig => ErrorKind::BadConfig,
        Op::CreateContext | Op::DestroyContext => ErrorKind::BadContext,
        Op::CreateWindow => ErrorKind::BadNativeWindow,
        Op::MakeCurrent | Op::ReleaseCurrent => ErrorKind::BadMatch,
        Op::DestroyWindow => ErrorKind::BadSurface,
        Op::Disconnect => ErrorKind::BadDisplay,
    }
}

impl ProcLoader for MockPlatform {
    fn dl_sym(&self, name: &CStr) -> *const c_void {
        let context_only = self.script.context_only.contains(&name.to_str().unwrap());
        self.lookup(name, !context_only)
    }

    fn get_proc_address(&self, name: &CStr) -> *const c_void {
        self.lookup(name, true)
    }
}

impl Platform for MockPlatform {
    type Config = MockConfig;
    type Context = MockContext;
    type Display = MockDisplay;
    type Window = MockWindow;

    fn connect(&self) -> Result<MockDisplay> {
        self.record(Event::Connect, Op::Connect)?;
        Ok(MockDisplay)
    }

    fn supports_context_api(&self, _display: &MockDisplay, api: ContextApi) -> bool {
        api == ContextApi::OpenGl && self.script.opengl
    }

    fn choose_config(&self, _display: &MockDisplay, request: &ConfigRequest) -> Result<MockConfig> {
        let version = request.version;
        self.record(Event::ChooseConfig(version), Op::ChooseConfig)?;
        if self.script.no_config.contains(&version) {
            return Err(Error::with_message(ErrorKind::BadConfig, "no matching config"));
        }

        Ok(MockConfig(version))
    }

    fn create_context(&self, _display: &MockDisplay, config: &MockConfig) -> Result<MockContext> {
        self.record(Event::CreateContext(config.0), Op::CreateContext)?;
        if !self.script.supported.contains(&config.0) {
            return Err(Error::with_message(ErrorKind::BadMatch, "version not supported"));
        }

        Ok(MockContext(config.0))
    }

    fn create_window(
        &self,
        _display: &MockDisplay,
        _config: &MockConfig,
        width: u32,
        height: u32,
    ) -> Result<MockWindow> {
        self.record(Event::CreateWindow(width, height), Op::CreateWindow)?;
        Ok(MockWindow(width, height))
    }

    fn make_current(
        &self,
        _display: &MockDisplay,
        _window: &MockWindow,
        _context: &MockContext,
    ) -> Result<()> {
        self.record(Event::MakeCurrent, Op::MakeCurrent)
    }

    fn release_current(&self, _display: &MockDisplay) -> Result<()> {
        self.record(Event::ReleaseCurrent, Op::ReleaseCurrent)
    }

    fn destroy_window(&self, _display: &MockDisplay, _window: MockWindow) -> Result<()> {
        self.record(Event::DestroyWindow, Op::DestroyWindow)
    }

    fn destroy_context(&self, _display: &MockDisplay, context: MockContext) -> Result<()> {
        self.record(Event::DestroyContext(context.0), Op::DestroyContext)
    }

    fn destroy_config(&self, _display: &MockDisplay, config: MockConfig) -> Result<()> {
        self.record(Event::DestroyConfig(config.0), Op::DestroyConfig)
    }

    fn disconnect(&self, _display: MockDisplay) -> Result<()> {
        self.record(Event::Disconnect, Op::Disconnect)
    }
}

/// The release sequence for a context of `version`.
pub fn teardown(version: Version) -> Vec<Event> {
    vec![
        Event::ReleaseCurrent,
        Event::DestroyWindow,
        Event::DestroyContext(version),
        Event::DestroyConfig(version),
        Event::Disconnect,
    ]
}

/// The mock driver state of the current thread.
#[derive(Debug, Default)]
pub struct Driver {
    vendor: Option<CString>,
    renderer: Option<CString>,
    version: Option<CString>,
    extensions: Vec<CString>,
    broken_extension: Option<usize>,
    binary_formats: GLint,
    binary: Vec<u8>,
    compiles: bool,
    links: bool,
    errors: VecDeque<GLenum>,
    next_name: GLuint,
    /// GL calls other than `glGetError`, in order.
    pub calls: Vec<&'static str>,
    /// Shader sources as passed to `glShaderSource`.
    pub sources: Vec<String>,
    /// The blob last passed to `glProgramBinary`.
    pub loaded_binary: Option<(GLenum, Vec<u8>)>,
}

thread_local! {
    static DRIVER: RefCell<Driver> = RefCell::new(Driver::default());
}

impl Driver {
    fn install(script: &Script) {
        let string = |s: Option<&str>| s.map(|s| CString::new(s).unwrap());
        let driver = Driver {
            vendor: string(script.vendor),
            renderer: string(script.renderer),
            version: string(script.version),
            extensions: script.extensions.iter().map(|e| CString::new(*e).unwrap()).collect(),
            broken_extension: script.broken_extension,
            binary_formats: script.binary_formats,
            binary: script.binary.clone(),
            compiles: script.compiles,
            links: script.links,
            next_name: 1,
            ..Driver::default()
        };

        DRIVER.with(|cell| *cell.borrow_mut() = driver);
    }

    /// Inspect the driver of the current thread.
    pub fn with<T>(f: impl FnOnce(&Driver) -> T) -> T {
        DRIVER.with(|cell| f(&cell.borrow()))
    }

    /// Queue a GL error as if the last call had raised it.
    pub fn raise(error: GLenum) {
        DRIVER.with(|cell| cell.borrow_mut().errors.push_back(error));
    }

    fn call<T>(name: &'static str, f: impl FnOnce(&mut Driver) -> T) -> T {
        DRIVER.with(|cell| {
            let mut driver = cell.borrow_mut();
            driver.calls.push(name);
            f(&mut driver)
        })
    }

    fn gen_name(&mut self) -> GLuint {
        let name = self.next_name;
        self.next_name += 1;
        name
    }
}

fn gl_function(name: &str) -> *const c_void {
    match name {
        "glGetError" => get_error as *const c_void,
        "glGetIntegerv" => get_integerv as *const c_void,
        "glGetString" => get_string as *const c_void,
        "glGetStringi" => get_stringi as *const c_void,
        "glCreateShader" => create_shader as *const c_void,
        "glShaderSource" => shader_source as *const c_void,
        "glCompileShader" => compile_shader as *const c_void,
        "glGetShaderiv" => get_shaderiv as *const c_void,
        "glGetShaderInfoLog" => get_shader_info_log as *const c_void,
        "glDeleteShader" => delete_shader as *const c_void,
        "glCreateProgram" => create_program as *const c_void,
        "glAttachShader" => attach_shader as *const c_void,
        "glLinkProgram" => link_program as *const c_void,
        "glGetProgramiv" => get_programiv as *const c_void,
        "glGetProgramInfoLog" => get_program_info_log as *const c_void,
        "glDeleteProgram" => delete_program as *const c_void,
        "glGetProgramBinary" => get_program_binary as *const c_void,
        "glProgramBinary" => program_binary as *const c_void,
        _ => ptr::null(),
    }
}

const COMPILE_LOG: &str = "0:3: error: syntax error";
const LINK_LOG: &str = "error: unresolved varyings";

unsafe extern "system" fn get_error() -> GLenum {
    DRIVER.with(|cell| cell.borrow_mut().errors.pop_front().unwrap_or(ffi::NO_ERROR))
}

unsafe extern "system" fn get_integerv(pname: GLenum, data: *mut GLint) {
    let value = Driver::call("glGetIntegerv", |driver| match pname {
        ffi::NUM_EXTENSIONS => Some(driver.extensions.len() as GLint),
        ffi::NUM_PROGRAM_BINARY_FORMATS => Some(driver.binary_formats),
        _ => {
            driver.errors.push_back(ffi::INVALID_ENUM);
            None
        },
    });

    if let Some(value) = value {
        *data = value;
    }
}

unsafe extern "system" fn get_string(name: GLenum) -> *const GLubyte {
    Driver::call("glGetString", |driver| {
        let string = match name {
            ffi::VENDOR => &driver.vendor,
            ffi::RENDERER => &driver.renderer,
            ffi::VERSION => &driver.version,
            _ => {
                driver.errors.push_back(ffi::INVALID_ENUM);
                return ptr::null();
            },
        };

        string.as_ref().map_or(ptr::null(), |s| s.as_ptr() as *const GLubyte)
    })
}

unsafe extern "system" fn get_stringi(name: GLenum, index: GLuint) -> *const GLubyte {
    Driver::call("glGetStringi", |driver| {
        let broken = driver.broken_extension == Some(index as usize);
        match driver.extensions.get(index as usize) {
            Some(extension) if name == ffi::EXTENSIONS && !broken => {
                extension.as_ptr() as *const GLubyte
            },
            _ => {
                driver.errors.push_back(ffi::INVALID_VALUE);
                ptr::null()
            },
        }
    })
}

unsafe extern "system" fn create_shader(_kind: GLenum) -> GLuint {
    Driver::call("glCreateShader", Driver::gen_name)
}

unsafe extern "system" fn shader_source(
    _shader: GLuint,
    count: GLsizei,
    strings: *const *const GLchar,
    lengths: *const GLint,
) {
    let mut source = String::new();
    for i in 0..count as usize {
        let bytes = std::slice::from_raw_parts(*strings.add(i) as *const u8, *lengths.add(i) as usize);
        source.push_str(std::str::from_utf8(bytes).unwrap());
    }

    Driver::call("glShaderSource", |driver| driver.sources.push(source));
}

unsafe extern "system" fn compile_shader(_shader: GLuint) {
    Driver::call("glCompileShader", |_| ());
}

unsafe extern "system" fn get_shaderiv(_shader: GLuint, pname: GLenum, params: *mut GLint) {
    *params = Driver::call("glGetShaderiv", |driver| match pname {
        ffi::COMPILE_STATUS => driver.compiles as GLint,
        ffi::INFO_LOG_LENGTH if !driver.compiles => COMPILE_LOG.len() as GLint + 1,
        _ => 0,
    });
}

unsafe fn write_log(log: &str, size: GLsizei, written: *mut GLsizei, out: *mut GLchar) {
    let n = log.len().min(size.max(1) as usize - 1);
    ptr::copy_nonoverlapping(log.as_ptr() as *const GLchar, out, n);
    *out.add(n) = 0;
    if !written.is_null() {
        *written = n as GLsizei;
    }
}

unsafe extern "system" fn get_shader_info_log(
    _shader: GLuint,
    size: GLsizei,
    written: *mut GLsizei,
    log: *mut GLchar,
) {
    Driver::call("glGetShaderInfoLog", |_| ());
    write_log(COMPILE_LOG, size, written, log);
}

unsafe extern "system" fn delete_shader(_shader: GLuint) {
    Driver::call("glDeleteShader", |_| ());
}

unsafe extern "system" fn create_program() -> GLuint {
    Driver::call("glCreateProgram", Driver::gen_name)
}

unsafe extern "system" fn attach_shader(_program: GLuint, _shader: GLuint) {
    Driver::call("glAttachShader", |_| ());
}

unsafe extern "system" fn link_program(_program: GLuint) {
    Driver::call("glLinkProgram", |_| ());
}

unsafe extern "system" fn get_programiv(_program: GLuint, pname: GLenum, params: *mut GLint) {
    *params = Driver::call("glGetProgramiv", |driver| match pname {
        ffi::LINK_STATUS => driver.links as GLint,
        ffi::INFO_LOG_LENGTH if !driver.links => LINK_LOG.len() as GLint + 1,
        ffi::PROGRAM_BINARY_LENGTH => driver.binary.len() as GLint,
        _ => 0,
    });
}

unsafe extern "system" fn get_program_info_log(
    _program: GLuint,
    size: GLsizei,
    written: *mut GLsizei,
    log: *mut GLchar,
) {
    Driver::call("glGetProgramInfoLog", |_| ());
    write_log(LINK_LOG, size, written, log);
}

unsafe extern "system" fn delete_program(_program: GLuint) {
    Driver::call("glDeleteProgram", |_| ());
}

unsafe extern "system" fn get_program_binary(
    _program: GLuint,
    size: GLsizei,
    length: *mut GLsizei,
    format: *mut GLenum,
    binary: *mut c_void,
) {
    let blob = Driver::call("glGetProgramBinary", |driver| driver.binary.clone());
    let n = blob.len().min(size.max(0) as usize);
    ptr::copy_nonoverlapping(blob.as_ptr(), binary as *mut u8, n);
    *length = n as GLsizei;
    *format = BINARY_FORMAT;
}

unsafe extern "system" fn program_binary(
    _program: GLuint,
    format: GLenum,
    binary: *const c_void,
    length: GLsizei,
) {
    let blob = std::slice::from_raw_parts(binary as *const u8, length as usize).to_vec();
    Driver::call("glProgramBinary", |driver| driver.loaded_binary = Some((format, blob)));
}

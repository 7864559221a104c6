//! Runtime binding of GL entry points.
//!
//! Every GL function the probe calls is an [`EntryPoint`]. Its address is
//! looked up by name when needed and stored in an [`EntryPoints`] slot; the
//! typed accessors refuse to hand out a slot that was never filled.

use std::ffi::{c_void, CStr};
use std::fmt;
use std::mem;
use std::ptr::NonNull;

use crate::error::{Error, ErrorKind, Result};
use crate::gl::ffi::types::{GLchar, GLenum, GLint, GLsizei, GLubyte, GLuint};
use crate::platform::ProcLoader;

pub type GetErrorFn = unsafe extern "system" fn() -> GLenum;
pub type GetIntegervFn = unsafe extern "system" fn(GLenum, *mut GLint);
pub type GetStringFn = unsafe extern "system" fn(GLenum) -> *const GLubyte;
pub type GetStringiFn = unsafe extern "system" fn(GLenum, GLuint) -> *const GLubyte;
pub type CreateShaderFn = unsafe extern "system" fn(GLenum) -> GLuint;
pub type ShaderSourceFn =
    unsafe extern "system" fn(GLuint, GLsizei, *const *const GLchar, *const GLint);
pub type CompileShaderFn = unsafe extern "system" fn(GLuint);
pub type GetShaderivFn = unsafe extern "system" fn(GLuint, GLenum, *mut GLint);
pub type GetShaderInfoLogFn = unsafe extern "system" fn(GLuint, GLsizei, *mut GLsizei, *mut GLchar);
pub type DeleteShaderFn = unsafe extern "system" fn(GLuint);
pub type CreateProgramFn = unsafe extern "system" fn() -> GLuint;
pub type AttachShaderFn = unsafe extern "system" fn(GLuint, GLuint);
pub type LinkProgramFn = unsafe extern "system" fn(GLuint);
pub type GetProgramivFn = unsafe extern "system" fn(GLuint, GLenum, *mut GLint);
pub type GetProgramInfoLogFn =
    unsafe extern "system" fn(GLuint, GLsizei, *mut GLsizei, *mut GLchar);
pub type DeleteProgramFn = unsafe extern "system" fn(GLuint);
pub type GetProgramBinaryFn =
    unsafe extern "system" fn(GLuint, GLsizei, *mut GLsizei, *mut GLenum, *mut c_void);
pub type ProgramBinaryFn = unsafe extern "system" fn(GLuint, GLenum, *const c_void, GLsizei);

macro_rules! entry_points {
    ($($variant:ident => $name:expr, $accessor:ident: $fn_ty:ty;)*) => {
        /// A GL function the probe binds at runtime.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum EntryPoint {
            $($variant,)*
        }

        impl EntryPoint {
            /// Every entry point, in declaration order.
            pub const ALL: &'static [EntryPoint] = &[$(EntryPoint::$variant,)*];

            const COUNT: usize = Self::ALL.len();

            /// The C symbol name.
            pub fn name(self) -> &'static CStr {
                match self {
                    $(EntryPoint::$variant => $name,)*
                }
            }
        }

        impl EntryPoints {
            $(
                pub(crate) fn $accessor(&self) -> Result<$fn_ty> {
                    let address = self.address(EntryPoint::$variant)?;
                    // SAFETY: the slot only ever holds the address the loader
                    // returned for this exact symbol.
                    Ok(unsafe { mem::transmute::<*mut c_void, $fn_ty>(address.as_ptr()) })
                }
            )*
        }
    };
}

entry_points! {
    GetError => c"glGetError", get_error: GetErrorFn;
    GetIntegerv => c"glGetIntegerv", get_integerv: GetIntegervFn;
    GetString => c"glGetString", get_string: GetStringFn;
    GetStringi => c"glGetStringi", get_stringi: GetStringiFn;
    CreateShader => c"glCreateShader", create_shader: CreateShaderFn;
    ShaderSource => c"glShaderSource", shader_source: ShaderSourceFn;
    CompileShader => c"glCompileShader", compile_shader: CompileShaderFn;
    GetShaderiv => c"glGetShaderiv", get_shaderiv: GetShaderivFn;
    GetShaderInfoLog => c"glGetShaderInfoLog", get_shader_info_log: GetShaderInfoLogFn;
    DeleteShader => c"glDeleteShader", delete_shader: DeleteShaderFn;
    CreateProgram => c"glCreateProgram", create_program: CreateProgramFn;
    AttachShader => c"glAttachShader", attach_shader: AttachShaderFn;
    LinkProgram => c"glLinkProgram", link_program: LinkProgramFn;
    GetProgramiv => c"glGetProgramiv", get_programiv: GetProgramivFn;
    GetProgramInfoLog => c"glGetProgramInfoLog", get_program_info_log: GetProgramInfoLogFn;
    DeleteProgram => c"glDeleteProgram", delete_program: DeleteProgramFn;
    GetProgramBinary => c"glGetProgramBinary", get_program_binary: GetProgramBinaryFn;
    ProgramBinary => c"glProgramBinary", program_binary: ProgramBinaryFn;
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name().to_string_lossy())
    }
}

/// Queries needed to read the context's identification strings.
pub const CORE_QUERIES: &[EntryPoint] =
    &[EntryPoint::GetError, EntryPoint::GetIntegerv, EntryPoint::GetString];

/// Everything the probe cannot run without.
pub const MANDATORY: &[EntryPoint] = &[
    EntryPoint::GetStringi,
    EntryPoint::CreateShader,
    EntryPoint::ShaderSource,
    EntryPoint::CompileShader,
    EntryPoint::GetShaderiv,
    EntryPoint::GetShaderInfoLog,
    EntryPoint::DeleteShader,
    EntryPoint::CreateProgram,
    EntryPoint::AttachShader,
    EntryPoint::LinkProgram,
    EntryPoint::GetProgramiv,
    EntryPoint::GetProgramInfoLog,
    EntryPoint::DeleteProgram,
];

/// Entry points of `GL_ARB_get_program_binary`.
pub const PROGRAM_BINARY: &[EntryPoint] = &[EntryPoint::GetProgramBinary, EntryPoint::ProgramBinary];

/// Look `entry` up, first in the GL library, then through the context.
pub fn resolve<L: ProcLoader + ?Sized>(loader: &L, entry: EntryPoint) -> Result<NonNull<c_void>> {
    let name = entry.name();

    if let Some(address) = NonNull::new(loader.dl_sym(name) as *mut c_void) {
        log::debug!("resolved {entry} from the GL library");
        return Ok(address);
    }

    if let Some(address) = NonNull::new(loader.get_proc_address(name) as *mut c_void) {
        log::debug!("resolved {entry} through the context");
        return Ok(address);
    }

    Err(Error::with_message(
        ErrorKind::MissingEntryPoint,
        format!("failed to get function pointer for {entry}"),
    ))
}

/// Resolved addresses, one slot per [`EntryPoint`].
pub struct EntryPoints {
    slots: [Option<NonNull<c_void>>; EntryPoint::COUNT],
}

impl EntryPoints {
    pub fn new() -> Self {
        Self { slots: [None; EntryPoint::COUNT] }
    }

    /// Whether `entry` has an address.
    pub fn is_resolved(&self, entry: EntryPoint) -> bool {
        self.slots[entry as usize].is_some()
    }

    /// Resolve every entry of `entries` that isn't resolved yet.
    ///
    /// Stops at the first entry neither tier knows; entries before it stay
    /// resolved.
    pub fn resolve_all<L: ProcLoader + ?Sized>(
        &mut self,
        loader: &L,
        entries: &[EntryPoint],
    ) -> Result<()> {
        for &entry in entries {
            if self.is_resolved(entry) {
                continue;
            }

            self.slots[entry as usize] = Some(resolve(loader, entry)?);
        }

        Ok(())
    }

    fn address(&self, entry: EntryPoint) -> Result<NonNull<c_void>> {
        self.slots[entry as usize].ok_or_else(|| {
            Error::with_message(
                ErrorKind::UnresolvedEntryPoint,
                format!("{entry} used before it was resolved"),
            )
        })
    }
}

impl Default for EntryPoints {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EntryPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resolved: Vec<_> =
            EntryPoint::ALL.iter().filter(|entry| self.is_resolved(**entry)).collect();
        f.debug_struct("EntryPoints").field("resolved", &resolved).finish()
    }
}

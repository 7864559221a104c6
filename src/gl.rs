//! Thin, checked wrappers over the runtime-bound GL entry points.

use std::ffi::{c_void, CStr};

use crate::error::{Error, ErrorKind, Result};
use crate::loader::{EntryPoint, EntryPoints};
use crate::platform::ProcLoader;

use self::ffi::types::{GLchar, GLenum, GLint, GLsizei, GLuint};

pub mod ffi {
    #![allow(clippy::all)]
    #![allow(missing_debug_implementations)]
    include!(concat!(env!("OUT_DIR"), "/gl_bindings.rs"));
}

/// Upper bound on queued errors drained by [`Gl::clear_errors`].
const MAX_QUEUED_ERRORS: usize = 64;

/// The GL functions of the current context.
///
/// Calls go through [`EntryPoints`]; a function that was never resolved
/// yields [`ErrorKind::UnresolvedEntryPoint`] instead of being called.
///
/// A `Gl` is only handed out by [`GbmContext`], which keeps its context
/// current for as long as the borrow lives.
///
/// [`GbmContext`]: crate::context::GbmContext
#[derive(Debug, Default)]
pub struct Gl {
    entry_points: EntryPoints,
}

impl Gl {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn resolve<L: ProcLoader + ?Sized>(
        &mut self,
        loader: &L,
        entries: &[EntryPoint],
    ) -> Result<()> {
        self.entry_points.resolve_all(loader, entries)
    }

    /// Whether `entry` is bound.
    pub fn is_resolved(&self, entry: EntryPoint) -> bool {
        self.entry_points.is_resolved(entry)
    }

    /// `glGetError`.
    pub fn get_error(&self) -> Result<GLenum> {
        let get_error = self.entry_points.get_error()?;
        Ok(unsafe { get_error() })
    }

    /// Drain the error queue.
    pub fn clear_errors(&self) -> Result<()> {
        for _ in 0..MAX_QUEUED_ERRORS {
            if self.get_error()? == ffi::NO_ERROR {
                return Ok(());
            }
        }

        log::warn!("GL error queue did not drain after {MAX_QUEUED_ERRORS} reads");
        Ok(())
    }

    /// Fail with [`ErrorKind::GlError`] naming `call` if an error is queued.
    pub fn check_error(&self, call: &str) -> Result<()> {
        match self.get_error()? {
            ffi::NO_ERROR => Ok(()),
            code => Err(Error::new(
                Some(code as i64),
                Some(format!("{call} failed")),
                ErrorKind::GlError,
            )),
        }
    }

    /// `glGetIntegerv` for a single value.
    pub fn get_integer(&self, pname: GLenum) -> Result<GLint> {
        let get_integerv = self.entry_points.get_integerv()?;
        let mut value = 0;
        unsafe { get_integerv(pname, &mut value) };
        Ok(value)
    }

    /// `glGetString`, `None` when the driver returns null.
    pub fn get_string(&self, name: GLenum) -> Result<Option<String>> {
        let get_string = self.entry_points.get_string()?;
        let ptr = unsafe { get_string(name) };
        if ptr.is_null() {
            return Ok(None);
        }

        // SAFETY: GL strings are static and NUL terminated.
        let string = unsafe { CStr::from_ptr(ptr.cast()) };
        Ok(Some(string.to_string_lossy().into_owned()))
    }

    /// `glGetStringi`, `None` when the driver returns null.
    pub fn get_string_i(&self, name: GLenum, index: GLuint) -> Result<Option<&CStr>> {
        let get_stringi = self.entry_points.get_stringi()?;
        let ptr = unsafe { get_stringi(name, index) };
        if ptr.is_null() {
            return Ok(None);
        }

        // SAFETY: GL strings are static and NUL terminated.
        Ok(Some(unsafe { CStr::from_ptr(ptr.cast()) }))
    }

    pub fn create_shader(&self, kind: GLenum) -> Result<GLuint> {
        let create_shader = self.entry_points.create_shader()?;
        Ok(unsafe { create_shader(kind) })
    }

    /// Replace the source of `shader` with `source`.
    pub fn shader_source(&self, shader: GLuint, source: &str) -> Result<()> {
        let shader_source = self.entry_points.shader_source()?;
        let length = GLint::try_from(source.len())
            .map_err(|_| ErrorKind::NotSupported("shader source is too long"))?;
        let string = source.as_ptr() as *const GLchar;
        unsafe { shader_source(shader, 1, &string, &length) };
        Ok(())
    }

    pub fn compile_shader(&self, shader: GLuint) -> Result<()> {
        let compile_shader = self.entry_points.compile_shader()?;
        unsafe { compile_shader(shader) };
        Ok(())
    }

    pub fn get_shader(&self, shader: GLuint, pname: GLenum) -> Result<GLint> {
        let get_shaderiv = self.entry_points.get_shaderiv()?;
        let mut value = 0;
        unsafe { get_shaderiv(shader, pname, &mut value) };
        Ok(value)
    }

    pub fn shader_info_log(&self, shader: GLuint) -> Result<String> {
        let length = self.get_shader(shader, ffi::INFO_LOG_LENGTH)?;
        let get_shader_info_log = self.entry_points.get_shader_info_log()?;
        read_info_log(length, |size, written, log| unsafe {
            get_shader_info_log(shader, size, written, log)
        })
    }

    pub fn delete_shader(&self, shader: GLuint) -> Result<()> {
        let delete_shader = self.entry_points.delete_shader()?;
        unsafe { delete_shader(shader) };
        Ok(())
    }

    pub fn create_program(&self) -> Result<GLuint> {
        let create_program = self.entry_points.create_program()?;
        Ok(unsafe { create_program() })
    }

    pub fn attach_shader(&self, program: GLuint, shader: GLuint) -> Result<()> {
        let attach_shader = self.entry_points.attach_shader()?;
        unsafe { attach_shader(program, shader) };
        Ok(())
    }

    pub fn link_program(&self, program: GLuint) -> Result<()> {
        let link_program = self.entry_points.link_program()?;
        unsafe { link_program(program) };
        Ok(())
    }

    pub fn get_program(&self, program: GLuint, pname: GLenum) -> Result<GLint> {
        let get_programiv = self.entry_points.get_programiv()?;
        let mut value = 0;
        unsafe { get_programiv(program, pname, &mut value) };
        Ok(value)
    }

    pub fn program_info_log(&self, program: GLuint) -> Result<String> {
        let length = self.get_program(program, ffi::INFO_LOG_LENGTH)?;
        let get_program_info_log = self.entry_points.get_program_info_log()?;
        read_info_log(length, |size, written, log| unsafe {
            get_program_info_log(program, size, written, log)
        })
    }

    pub fn delete_program(&self, program: GLuint) -> Result<()> {
        let delete_program = self.entry_points.delete_program()?;
        unsafe { delete_program(program) };
        Ok(())
    }

    /// `glGetProgramBinary` into `binary`.
    ///
    /// Returns the length the driver wrote and the binary format tag.
    pub fn get_program_binary(
        &self,
        program: GLuint,
        binary: &mut [u8],
    ) -> Result<(GLsizei, GLenum)> {
        let get_program_binary = self.entry_points.get_program_binary()?;
        let size = GLsizei::try_from(binary.len())
            .map_err(|_| ErrorKind::NotSupported("program binary is too large"))?;
        let mut length = 0;
        let mut format = 0;
        unsafe {
            get_program_binary(
                program,
                size,
                &mut length,
                &mut format,
                binary.as_mut_ptr() as *mut c_void,
            )
        };
        Ok((length, format))
    }

    /// `glProgramBinary` from `binary`.
    pub fn program_binary(&self, program: GLuint, format: GLenum, binary: &[u8]) -> Result<()> {
        let program_binary = self.entry_points.program_binary()?;
        let length = GLsizei::try_from(binary.len())
            .map_err(|_| ErrorKind::NotSupported("program binary is too large"))?;
        unsafe { program_binary(program, format, binary.as_ptr() as *const c_void, length) };
        Ok(())
    }
}

fn read_info_log(
    length: GLint,
    read: impl FnOnce(GLsizei, *mut GLsizei, *mut GLchar),
) -> Result<String> {
    let Ok(capacity) = usize::try_from(length) else {
        return Ok(String::new());
    };
    if capacity == 0 {
        return Ok(String::new());
    }

    let mut log = vec![0u8; capacity];
    let mut written: GLsizei = 0;
    read(length, &mut written, log.as_mut_ptr() as *mut GLchar);

    let written = usize::try_from(written).unwrap_or(0).min(capacity);
    log.truncate(written);
    if log.last() == Some(&0) {
        log.pop();
    }

    Ok(String::from_utf8_lossy(&log).trim_end().to_owned())
}

//! Compiling a program and round-tripping it through its binary form.

use crate::error::{Error, ErrorKind, Result};
use crate::gl::ffi::types::{GLenum, GLuint};
use crate::gl::{ffi, Gl};

pub const VERTEX_SHADER_SOURCE: &str = "\
#version 150 core
in vec4 position;

void main()
{
    gl_Position = position;
}
";

pub const FRAGMENT_SHADER_SOURCE: &str = "\
#version 150 core
uniform vec4 color = vec4(0.0, 1.0, 0.0, 1.0);
out vec4 frag_color;

void main()
{
    frag_color = color;
}
";

/// What the driver reported while extracting a program binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramBinary {
    /// `GL_PROGRAM_BINARY_LENGTH` before extraction.
    pub expected_length: i32,
    /// The length `glGetProgramBinary` reported writing.
    pub returned_length: i32,
    /// The driver-specific format tag.
    pub format: GLenum,
    /// The blob, truncated to `returned_length`.
    pub data: Vec<u8>,
}

/// Compile and link a vertex/fragment program.
///
/// Compile and link failures are returned with the driver's info log.
pub fn build_program(gl: &Gl, vertex_source: &str, fragment_source: &str) -> Result<GLuint> {
    let vertex = compile_shader(gl, ffi::VERTEX_SHADER, vertex_source)?;
    let fragment = match compile_shader(gl, ffi::FRAGMENT_SHADER, fragment_source) {
        Ok(fragment) => fragment,
        Err(err) => {
            gl.delete_shader(vertex)?;
            return Err(err);
        },
    };

    let program = gl.create_program()?;
    gl.attach_shader(program, vertex)?;
    gl.attach_shader(program, fragment)?;
    gl.link_program(program)?;

    // Attached shaders are freed along with the program.
    gl.delete_shader(vertex)?;
    gl.delete_shader(fragment)?;

    if let Err(err) = check_link(gl, program, "linking") {
        gl.delete_program(program)?;
        return Err(err);
    }

    Ok(program)
}

fn compile_shader(gl: &Gl, kind: GLenum, source: &str) -> Result<GLuint> {
    let shader = gl.create_shader(kind)?;
    gl.shader_source(shader, source)?;
    gl.compile_shader(shader)?;

    if gl.get_shader(shader, ffi::COMPILE_STATUS)? == ffi::FALSE as i32 {
        let log = gl.shader_info_log(shader)?;
        gl.delete_shader(shader)?;
        let stage = if kind == ffi::VERTEX_SHADER { "vertex" } else { "fragment" };
        return Err(Error::with_message(
            ErrorKind::ShaderCompile,
            format!("{stage} shader failed to compile: {log}"),
        ));
    }

    Ok(shader)
}

fn check_link(gl: &Gl, program: GLuint, what: &str) -> Result<()> {
    if gl.get_program(program, ffi::LINK_STATUS)? == ffi::FALSE as i32 {
        let log = gl.program_info_log(program)?;
        return Err(Error::with_message(
            ErrorKind::ProgramLink,
            format!("program {what} failed: {log}"),
        ));
    }

    Ok(())
}

/// Extract the binary of a linked `program`.
///
/// Needs the program binary entry points, see
/// [`require_program_binary`](crate::extensions::require_program_binary).
pub fn program_binary(gl: &Gl, program: GLuint) -> Result<ProgramBinary> {
    let expected_length = gl.get_program(program, ffi::PROGRAM_BINARY_LENGTH)?;

    let mut data = vec![0u8; usize::try_from(expected_length).unwrap_or(0)];
    let (returned_length, format) = gl.get_program_binary(program, &mut data)?;
    gl.check_error("glGetProgramBinary")?;

    data.truncate(usize::try_from(returned_length).unwrap_or(0));
    Ok(ProgramBinary { expected_length, returned_length, format, data })
}

/// Load `binary` into a new program and check that it links.
pub fn load_program_binary(gl: &Gl, binary: &ProgramBinary) -> Result<GLuint> {
    let program = gl.create_program()?;
    gl.program_binary(program, binary.format, &binary.data)?;

    if let Err(err) = check_link(gl, program, "loading from its binary") {
        gl.delete_program(program)?;
        return Err(err);
    }

    Ok(program)
}

/// Build the demo program, extract its binary and reload it.
pub fn program_binary_sample(gl: &Gl) -> Result<ProgramBinary> {
    let program = build_program(gl, VERTEX_SHADER_SOURCE, FRAGMENT_SHADER_SOURCE)?;
    let binary = program_binary(gl, program);
    gl.delete_program(program)?;
    let binary = binary?;

    let reloaded = load_program_binary(gl, &binary)?;
    gl.delete_program(reloaded)?;

    Ok(binary)
}

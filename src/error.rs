//! Probe error handling.

use std::fmt;

/// A specialized [`Result`] type for probe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for all the platform and GL operations of the probe.
#[derive(Debug, Clone)]
pub struct Error {
    /// The raw code of the underlying error.
    raw_code: Option<i64>,

    /// The raw message from the platform or the driver, when it could be
    /// obtained.
    raw_os_message: Option<String>,

    /// The simplified error kind to handle matching.
    kind: ErrorKind,
}

impl Error {
    pub(crate) fn new(
        raw_code: Option<i64>,
        raw_os_message: Option<String>,
        kind: ErrorKind,
    ) -> Self {
        Self { raw_code, raw_os_message, kind }
    }

    /// Build an error of the given kind carrying a message.
    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { raw_code: None, raw_os_message: Some(message.into()), kind }
    }

    /// Helper to check that error is [`ErrorKind::NotSupported`].
    #[inline]
    pub fn not_supported(&self) -> bool {
        matches!(&self.kind, ErrorKind::NotSupported(_))
    }

    /// The underlying error kind.
    #[inline]
    pub fn error_kind(&self) -> ErrorKind {
        self.kind
    }

    /// The underlying raw code in case it's present.
    #[inline]
    pub fn raw_code(&self) -> Option<i64> {
        self.raw_code
    }

    /// The message attached by the platform or the probe, if any.
    #[inline]
    pub fn message(&self) -> Option<&str> {
        self.raw_os_message.as_deref()
    }

    /// The name of the subsystem the error is reported under.
    #[inline]
    pub fn module(&self) -> &'static str {
        self.kind.module()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(raw_code) = self.raw_code {
            write!(f, "[{raw_code:x}] ")?;
        }

        let msg = if let Some(raw_os_message) = self.raw_os_message.as_ref() {
            raw_os_message
        } else {
            self.kind.as_str()
        };

        write!(f, "{msg}")
    }
}

impl std::error::Error for Error {}

/// Build an error with just a kind.
impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error { raw_code: None, raw_os_message: None, kind }
    }
}

/// A list specifying general categories of probe errors.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested display, device or library wasn't found or some
    /// required symbol in it was missing.
    NotFound,

    /// Failed to perform resource initialization.
    InitializationFailed,

    /// The display was not initialized.
    NotInitialized,

    /// Can't access a requested resource.
    BadAccess,

    /// An operation could not be completed, because it failed to allocate
    /// enough memory.
    BadAlloc,

    /// An unrecognized attribute or attribute value was passed.
    BadAttribute,

    /// The context is no longer valid.
    BadContext,

    /// Invalid config was passed.
    BadConfig,

    /// The current surface of the calling thread is no longer valid.
    BadCurrentSurface,

    /// The display is no longer valid.
    BadDisplay,

    /// The surface is invalid.
    BadSurface,

    /// Arguments are inconsistent.
    BadMatch,

    /// One or more argument values are invalid.
    BadParameter,

    /// Bad native window was provided.
    BadNativeWindow,

    /// The context was lost.
    ContextLost,

    /// The operation is not supported by the platform.
    NotSupported(&'static str),

    /// The misc error that can't be classified occurred.
    Misc,

    /// None of the candidate versions produced a context.
    NoSupportedVersion,

    /// Neither lookup tier could resolve an entry point.
    MissingEntryPoint,

    /// An entry point was used before it was resolved.
    UnresolvedEntryPoint,

    /// The GL error query reported a failure.
    GlError,

    /// A required extension is not advertised by the context.
    ExtensionUnsupported,

    /// The context reports zero program binary formats.
    NoBinaryFormats,

    /// A shader failed to compile.
    ShaderCompile,

    /// A program failed to link or to load from a binary.
    ProgramLink,

    /// Writing the report failed.
    Output,
}

impl ErrorKind {
    pub(crate) fn as_str(&self) -> &'static str {
        use ErrorKind::*;
        match *self {
            NotFound => "not found",
            InitializationFailed => "initialization failed",
            NotInitialized => "the display is not initialized",
            BadAccess => "access to the resource failed",
            BadAlloc => "out of memory",
            BadAttribute => "an unrecognized attribute or attribute value was passed",
            BadContext => "argument does not name a valid context",
            BadConfig => "argument does not name a valid config",
            BadCurrentSurface => "the current surface of the calling thread is no longer valid",
            BadDisplay => "argument does not name a valid display",
            BadSurface => "argument does not name a valid surface",
            BadMatch => "arguments are inconsistent",
            BadParameter => "one or more argument values are invalid",
            BadNativeWindow => "argument does not refer to a valid native window",
            ContextLost => "context loss",
            NotSupported(reason) => reason,
            Misc => "misc platform error",
            NoSupportedVersion => "failed to create",
            MissingEntryPoint => "failed to get function pointer",
            UnresolvedEntryPoint => "entry point used before it was resolved",
            GlError => "the GL reported an error",
            ExtensionUnsupported => "required extension is not supported",
            NoBinaryFormats => "no binary formats are supported",
            ShaderCompile => "shader compilation failed",
            ProgramLink => "program linking failed",
            Output => "failed to write the report",
        }
    }

    /// The subsystem prefix used in diagnostics.
    pub fn module(&self) -> &'static str {
        use ErrorKind::*;
        match *self {
            MissingEntryPoint | UnresolvedEntryPoint => "loader",
            NoSupportedVersion | GlError | ExtensionUnsupported | NoBinaryFormats => "context",
            ShaderCompile | ProgramLink | Output => "program",
            _ => "platform",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefers_message_and_prints_code() {
        let err = Error::new(Some(0x3009), Some("eglMakeCurrent failed".into()), ErrorKind::BadMatch);
        assert_eq!(err.to_string(), "[3009] eglMakeCurrent failed");

        let err: Error = ErrorKind::NoBinaryFormats.into();
        assert_eq!(err.to_string(), "no binary formats are supported");
    }

    #[test]
    fn modules_follow_the_failing_subsystem() {
        assert_eq!(ErrorKind::BadConfig.module(), "platform");
        assert_eq!(ErrorKind::MissingEntryPoint.module(), "loader");
        assert_eq!(ErrorKind::ExtensionUnsupported.module(), "context");
        assert_eq!(ErrorKind::ProgramLink.module(), "program");
    }
}

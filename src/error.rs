use core::fmt;

#[cfg(debug_assertions)]
mod error_impl {
    use super::{Error, ErrorExt, ErrorKind};

    pub type ErrorInner = alloc::boxed::Box<Chained>;

    #[derive(Clone, Debug)]
    pub struct Chained {
        this: &'static ErrorKind,
        src: Option<Error>,
    }
    impl ErrorExt for Error {
        #[inline]
        fn kind(&self) -> ErrorKind {
            *self.inner.this
        }
        #[inline]
        fn source(&self) -> Option<&Error> {
            self.inner.src.as_ref()
        }
        #[inline]
        fn chain_ctx(self, ctx: &'static ErrorKind) -> Error {
            Error {
                inner: Chained {
                    this: ctx,
                    src: Some(self),
                }
                .into(),
            }
        }
    }
    impl From<&'static ErrorKind> for Error {
        #[inline]
        fn from(kind: &'static ErrorKind) -> Error {
            Error {
                inner: Chained {
                    this: kind,
                    src: None,
                }
                .into(),
            }
        }
    }
}

#[cfg(not(debug_assertions))]
mod error_impl {
    use super::{Error, ErrorExt, ErrorKind};

    /// In release mode errors are just a thin pointer.
    pub type ErrorInner = &'static ErrorKind;
    impl ErrorExt for Error {
        #[inline]
        fn kind(&self) -> ErrorKind {
            *self.inner
        }
        #[inline]
        fn source(&self) -> Option<&Error> {
            None
        }
        #[inline]
        fn chain_ctx(self, _ctx: &'static ErrorKind) -> Error {
            // Release errors only hold the root cause
            self
        }
    }
    impl From<&'static ErrorKind> for Error {
        #[inline]
        fn from(inner: &'static ErrorKind) -> Error {
            Error { inner }
        }
    }
}

/// Represents an error while decoding a MIDI stream or loading a Standard Midi File.
///
/// In debug mode this type carries a chain of context kinds, with the root cause at the bottom.
/// In release mode it is a thin pointer to the root `ErrorKind`, so `Error::source` always
/// returns `None`.
///
/// `Error::kind` always reports the root cause, so that callers can tell apart an
/// `UnexpectedEndOfTrack` from an `UnsupportedDivisionFormat` no matter how much parsing context
/// was attached on the way up.
///
/// If the `std` feature is enabled, this type implements `std::error::Error`.
#[derive(Clone)]
pub struct Error {
    inner: self::error_impl::ErrorInner,
}
impl Error {
    /// Create a new error with the given `ErrorKind`.
    #[inline]
    pub fn new(kind: &'static ErrorKind) -> Error {
        Error::from(kind)
    }

    /// The root cause of this error.
    pub fn kind(&self) -> ErrorKind {
        let mut root = self;
        while let Some(src) = root.source() {
            root = src;
        }
        ErrorExt::kind(root)
    }

    /// The outermost context attached to this error.
    ///
    /// Equal to `kind()` in release mode.
    #[inline]
    pub fn context_kind(&self) -> ErrorKind {
        ErrorExt::kind(self)
    }

    /// The underlying cause for this error.
    ///
    /// Note that this method will always return `None` in release mode, since error chains
    /// are not tracked in release.
    #[inline]
    pub fn source(&self) -> Option<&Error> {
        ErrorExt::source(self)
    }
}
impl fmt::Display for Error {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.context_kind(), f)?;
        if self.source().is_some() {
            write!(f, ": {}", self.kind())?;
        }
        Ok(())
    }
}
impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.context_kind())?;
        let mut maybe_src = self.source();
        while let Some(src) = maybe_src {
            writeln!(f)?;
            write!(f, "  caused by: {}", src.context_kind())?;
            maybe_src = src.source();
        }
        Ok(())
    }
}
impl PartialEq<ErrorKind> for Error {
    fn eq(&self, rhs: &ErrorKind) -> bool {
        self.kind() == *rhs
    }
}
#[cfg(feature = "std")]
impl std::error::Error for Error {
    #[inline]
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

trait ErrorExt {
    fn kind(&self) -> ErrorKind;
    fn source(&self) -> Option<&Error>;
    fn chain_ctx(self, ctx: &'static ErrorKind) -> Error;
}

/// The type of error that occurred.
///
/// `MalformedMessage` is the only kind produced by the live decoder; it never stops the stream,
/// the decoder resynchronizes at the next status byte.
/// The other kinds abort loading a file, and leave any previously loaded state untouched.
///
/// Running out of space in a ring buffer is not an error: the event is dropped and counted.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The data is not a Standard Midi File, or its header is damaged beyond use.
    Invalid(&'static str),

    /// A bad byte sequence in a MIDI stream or track.
    MalformedMessage(&'static str),

    /// A variable-length delta time spans more than 4 bytes.
    InvalidDeltaTime,

    /// The track ran out of bytes before its End-of-Track meta event.
    UnexpectedEndOfTrack,

    /// The header division is SMPTE-based instead of pulses per quarter note.
    UnsupportedDivisionFormat,
}
impl ErrorKind {
    /// Get the informative message on what exact part of the MIDI format was not respected.
    #[inline]
    pub fn message(&self) -> &'static str {
        match *self {
            ErrorKind::Invalid(msg) => msg,
            ErrorKind::MalformedMessage(msg) => msg,
            ErrorKind::InvalidDeltaTime => "delta time longer than 4 bytes",
            ErrorKind::UnexpectedEndOfTrack => "track ended without an end-of-track event",
            ErrorKind::UnsupportedDivisionFormat => "smpte time division is not supported",
        }
    }

    /// Whether this error aborts loading a file, as opposed to a recoverable stream error.
    #[inline]
    pub fn is_load_error(&self) -> bool {
        !matches!(self, ErrorKind::MalformedMessage(_))
    }
}
impl fmt::Display for ErrorKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::Invalid(msg) => write!(f, "invalid midi: {}", msg),
            ErrorKind::MalformedMessage(msg) => write!(f, "malformed midi message: {}", msg),
            other => write!(f, "invalid midi: {}", other.message()),
        }
    }
}

macro_rules! err_invalid {
    ($msg:expr) => {{
        const ERR_KIND: &'static ErrorKind = &ErrorKind::Invalid($msg);
        ERR_KIND
    }};
}
macro_rules! err_malformed {
    ($msg:expr) => {{
        const ERR_KIND: &'static ErrorKind = &ErrorKind::MalformedMessage($msg);
        ERR_KIND
    }};
}
macro_rules! err_delta {
    () => {{
        const ERR_KIND: &'static ErrorKind = &ErrorKind::InvalidDeltaTime;
        ERR_KIND
    }};
}
macro_rules! err_eot {
    () => {{
        const ERR_KIND: &'static ErrorKind = &ErrorKind::UnexpectedEndOfTrack;
        ERR_KIND
    }};
}
macro_rules! err_division {
    () => {{
        const ERR_KIND: &'static ErrorKind = &ErrorKind::UnsupportedDivisionFormat;
        ERR_KIND
    }};
}

pub(crate) trait ResultExt<T> {
    fn context(self, ctx: &'static ErrorKind) -> StdResult<T, Error>;
}
impl<T> ResultExt<T> for StdResult<T, Error> {
    #[inline]
    fn context(self, ctx: &'static ErrorKind) -> StdResult<T, Error> {
        self.map_err(|err| err.chain_ctx(ctx))
    }
}
impl<T> ResultExt<T> for StdResult<T, &'static ErrorKind> {
    #[inline]
    fn context(self, ctx: &'static ErrorKind) -> StdResult<T, Error> {
        self.map_err(|errkind| Error::from(errkind).chain_ctx(ctx))
    }
}

/// The result type used by the MIDI parser.
pub type Result<T> = StdResult<T, Error>;
pub(crate) use core::result::Result as StdResult;

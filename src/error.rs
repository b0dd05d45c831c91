use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which covers every failure this library can report
/// through a [`crate::Result`].
///
/// Only the raw layers produce these errors: the byte [`crate::Parser`], the
/// [`crate::metadata::signatures::SignatureParser`], custom attribute blob decoding and
/// implementations of [`crate::metadata::reader::MetadataReader`]. The decoders that
/// sit on top convert every error into a sentinel type or into a fallback to the
/// untransformed type, so a broken reference never escapes as an `Err`.
///
/// # Error Categories
///
/// ## Binary format
/// - [`Error::Malformed`] - Corrupted or invalid blob content
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of a blob
/// - [`Error::RecursionLimit`] - A signature nests deeper than allowed
///
/// ## Metadata lookups
/// - [`Error::TypeNotFound`] - A token does not name an existing row
/// - [`Error::UnexpectedToken`] - A token names a table that is not valid at this position
/// - [`Error::UnsupportedSignature`] - The signature is well formed but cannot be represented
///
/// # Examples
///
/// ```rust
/// use dotimport::{Error, metadata::signatures::parse_field_signature};
///
/// match parse_field_signature(&[0x06]) {
///     Ok(_) => unreachable!(),
///     Err(Error::OutOfBounds) => println!("truncated field signature"),
///     Err(e) => println!("other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The blob is damaged and could not be parsed.
    ///
    /// The error carries the source location where the malformation was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing a blob.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// Recursion limit reached.
    ///
    /// Signatures are recursive and come from untrusted input, so the parser bounds
    /// its depth. The associated value is the limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// The requested row does not exist in the metadata image.
    ///
    /// The associated [`Token`] identifies which row was requested.
    #[error("Failed to find row in metadata - {0}")]
    TypeNotFound(Token),

    /// A token of an unexpected table was encountered.
    ///
    /// Raised when, for example, a `TypeDefOrRef` position holds a `MethodDef` token.
    #[error("Unexpected token at this position - {0}")]
    UnexpectedToken(Token),

    /// The signature is structurally valid but uses a construct the importer cannot represent.
    #[error("Unsupported signature content - {0}")]
    UnsupportedSignature(String),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}

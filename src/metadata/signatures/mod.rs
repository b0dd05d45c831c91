//! Signature blob parsing and encoding.
//!
//! Signatures carry the erased shape of every member type: parameter and return types,
//! field types, property types and type specifications. This module turns the binary
//! encoding (ECMA-335 II.23.2) into [`TypeSignature`] trees whose type references are
//! still raw [`crate::metadata::token::Token`]s. Resolving those tokens into symbols is
//! the job of [`crate::metadata::decoder`].
//!
//! # Signature Kinds
//!
//! - **Method Signatures** - Calling convention, generic arity, return and parameter slots
//! - **Field Signatures** - Field type, including ref fields
//! - **Property Signatures** - Property type and indexer parameters
//! - **TypeSpec Signatures** - Constructed types referenced through the `TypeSpec` table
//! - **Local Variable Signatures** - Method body locals, including pinned and by-ref slots
//!
//! Every slot keeps its custom modifiers together with the required/optional bit, and
//! by-ref slots keep the modifiers preceding `BYREF` apart from those following it,
//! because member-reference matching compares both lists.
//!
//! # Examples
//!
//! ```rust
//! use dotimport::metadata::signatures::{parse_method_signature, TypeSignature};
//!
//! let method_sig = parse_method_signature(&[0x20, 0x01, 0x01, 0x0E])?;
//! assert!(method_sig.has_this());
//! assert_eq!(method_sig.params[0].base, TypeSignature::String);
//! # Ok::<(), dotimport::Error>(())
//! ```
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 23.2 - Blobs and Signatures

mod encoders;
mod parser;
mod types;

pub use encoders::*;
pub use parser::*;
pub use types::*;

use crate::Result;

fn parse_blob<'a, T>(
    data: &'a [u8],
    parse: impl FnOnce(&mut SignatureParser<'a>) -> Result<T>,
) -> Result<T> {
    parse(&mut SignatureParser::new(data))
}

/// Parses a `MethodDefSig` or `MethodRefSig` blob with the default depth limit.
///
/// # Errors
/// Returns an error for truncated blobs, unknown element types or nesting beyond the limit.
pub fn parse_method_signature(data: &[u8]) -> Result<SignatureMethod> {
    parse_blob(data, SignatureParser::parse_method_signature)
}

/// Parses a `FieldSig` blob (header `0x06`).
///
/// # Errors
/// Returns an error if the header is not a field header or the type cannot be read.
pub fn parse_field_signature(data: &[u8]) -> Result<SignatureField> {
    parse_blob(data, SignatureParser::parse_field_signature)
}

/// Parses a `PropertySig` blob, indexer parameters included.
///
/// # Errors
/// Returns an error if the header lacks the property bit or a slot cannot be read.
pub fn parse_property_signature(data: &[u8]) -> Result<SignatureProperty> {
    parse_blob(data, SignatureParser::parse_property_signature)
}

/// Parses a `LocalVarSig` blob.
///
/// # Errors
/// Returns an error if the header is not `0x07` or a local cannot be read.
pub fn parse_local_var_signature(data: &[u8]) -> Result<SignatureLocalVariables> {
    parse_blob(data, SignatureParser::parse_local_var_signature)
}

/// Parses the type of a `TypeSpec` row.
///
/// # Errors
/// Returns an error if the blob does not hold a single well-formed type.
pub fn parse_type_spec_signature(data: &[u8]) -> Result<SignatureTypeSpec> {
    parse_blob(data, SignatureParser::parse_type_spec_signature)
}

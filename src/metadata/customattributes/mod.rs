//! Compiler-emitted custom attributes the importer reads.
//!
//! Erased source annotations (dynamic, native integers, tuple element names, nullability)
//! travel as custom attributes next to the member they describe. This module finds such an
//! attribute on a metadata row, decodes its fixed arguments, and hands the decoders a
//! [`DecodedFlags`] value. Finding an attribute never fails: a reader error counts as
//! "absent", and an undecodable blob counts as [`DecodedFlags::Malformed`].
//!
//! # Key Components
//!
//! - [`AttributeDescription`] - Well-known attribute type plus accepted constructors
//! - [`parse_custom_attribute_blob`] - Fixed-argument decoding (ECMA-335 II.23.3)
//! - [`dynamic_flags`], [`native_integer_flags`], [`tuple_element_names`],
//!   [`nullable_flags`] - Per-row lookups used by the transform passes
//! - Value blob encoders used by the in-memory image builder
//!
//! # Examples
//!
//! ```rust
//! use dotimport::metadata::customattributes::{
//!     encode_bool_array, parse_custom_attribute_blob, AttributeDescription,
//! };
//!
//! let blob = encode_bool_array(&[false, true]);
//! let value = parse_custom_attribute_blob(AttributeDescription::DYNAMIC.signatures[1], &blob)?;
//! assert_eq!(value.fixed_args[0].as_bool_array(), Some(vec![false, true]));
//! # Ok::<(), dotimport::Error>(())
//! ```

mod encoders;
mod parser;
mod types;

pub use encoders::*;
pub use parser::*;
pub use types::*;

use crate::metadata::{reader::MetadataReader, token::Token};

/// A matching attribute row: which constructor overload it used, and its value if the
/// blob could be decoded.
struct FoundAttribute {
    overload: usize,
    value: Option<CustomAttributeValue>,
}

/// Looks up the first row on `host` that matches `description`.
///
/// When several rows match, the first one whose blob decodes wins. If none decodes, the
/// first match is returned without a value.
fn find_attribute(
    reader: &dyn MetadataReader,
    host: Token,
    description: &AttributeDescription,
) -> Option<FoundAttribute> {
    if host.is_null() {
        return None;
    }

    let rows = match reader.custom_attributes(host) {
        Ok(rows) => rows,
        Err(error) => {
            log::warn!("custom attributes of {host} could not be read - {error}");
            return None;
        }
    };

    let mut undecodable = None;
    for row in &rows {
        let Some(overload) =
            description.matches(&row.namespace, &row.name, &row.constructor_signature)
        else {
            continue;
        };

        match parse_custom_attribute_blob(&row.constructor_signature, &row.value) {
            Ok(value) => {
                return Some(FoundAttribute {
                    overload,
                    value: Some(value),
                })
            }
            Err(error) => {
                log::warn!("{} on {host} could not be decoded - {error}", description.name);
                undecodable.get_or_insert(FoundAttribute {
                    overload,
                    value: None,
                });
            }
        }
    }

    undecodable
}

/// Shared shape of `DynamicAttribute` and `NativeIntegerAttribute`: overload 0 is
/// parameterless, overload 1 takes `bool[]`.
fn boolean_flags(
    reader: &dyn MetadataReader,
    host: Token,
    description: &AttributeDescription,
) -> DecodedFlags<bool> {
    let Some(found) = find_attribute(reader, host, description) else {
        return DecodedFlags::Absent;
    };

    let Some(value) = found.value else {
        return DecodedFlags::Malformed;
    };

    if found.overload == 0 {
        return DecodedFlags::Parameterless;
    }

    match value.fixed_args.first().and_then(CustomAttributeArgument::as_bool_array) {
        Some(flags) => DecodedFlags::Values(flags),
        None => DecodedFlags::Malformed,
    }
}

/// Reads `DynamicAttribute` from `host`
#[must_use]
pub fn dynamic_flags(reader: &dyn MetadataReader, host: Token) -> DecodedFlags<bool> {
    boolean_flags(reader, host, &AttributeDescription::DYNAMIC)
}

/// Reads `NativeIntegerAttribute` from `host`
#[must_use]
pub fn native_integer_flags(reader: &dyn MetadataReader, host: Token) -> DecodedFlags<bool> {
    boolean_flags(reader, host, &AttributeDescription::NATIVE_INTEGER)
}

/// Reads `TupleElementNamesAttribute` from `host`
#[must_use]
pub fn tuple_element_names(
    reader: &dyn MetadataReader,
    host: Token,
) -> DecodedFlags<Option<String>> {
    let Some(found) = find_attribute(reader, host, &AttributeDescription::TUPLE_ELEMENT_NAMES)
    else {
        return DecodedFlags::Absent;
    };

    match found
        .value
        .as_ref()
        .and_then(|value| value.fixed_args.first())
        .and_then(CustomAttributeArgument::as_string_array)
    {
        Some(names) => DecodedFlags::Values(names),
        None => DecodedFlags::Malformed,
    }
}

/// Reads `NullableAttribute` from `host`.
///
/// The `(byte)` overload yields [`DecodedFlags::Single`], the `(byte[])` overload
/// [`DecodedFlags::Values`].
#[must_use]
pub fn nullable_flags(reader: &dyn MetadataReader, host: Token) -> DecodedFlags<u8> {
    let Some(found) = find_attribute(reader, host, &AttributeDescription::NULLABLE) else {
        return DecodedFlags::Absent;
    };

    let Some(argument) = found.value.and_then(|value| value.fixed_args.into_iter().next()) else {
        return DecodedFlags::Malformed;
    };

    match argument {
        CustomAttributeArgument::U1(byte) => DecodedFlags::Single(byte),
        array => match array.as_byte_array() {
            Some(bytes) => DecodedFlags::Values(bytes),
            None => DecodedFlags::Malformed,
        },
    }
}

/// Reads the byte of `NullableContextAttribute` from `host`, if present and decodable
#[must_use]
pub fn nullable_context(reader: &dyn MetadataReader, host: Token) -> Option<u8> {
    let found = find_attribute(reader, host, &AttributeDescription::NULLABLE_CONTEXT)?;
    match found.value?.fixed_args.first()? {
        CustomAttributeArgument::U1(byte) => Some(*byte),
        _ => None,
    }
}

/// `true` if `host` carries `TypeIdentifierAttribute`, marking an embedded interop type
#[must_use]
pub fn has_type_identifier(reader: &dyn MetadataReader, host: Token) -> bool {
    find_attribute(reader, host, &AttributeDescription::TYPE_IDENTIFIER).is_some()
}

/// Reads and parses `GuidAttribute` from `host`
#[must_use]
pub fn guid(reader: &dyn MetadataReader, host: Token) -> Option<uguid::Guid> {
    let found = find_attribute(reader, host, &AttributeDescription::GUID)?;
    let value = found.value?;
    let CustomAttributeArgument::String(Some(text)) = value.fixed_args.first()? else {
        return None;
    };

    match uguid::Guid::try_parse(text) {
        Ok(guid) => Some(guid),
        Err(_) => {
            log::warn!("GuidAttribute on {host} carries an invalid GUID - {text}");
            None
        }
    }
}

//! Fixed-argument decoding of custom attribute blobs (ECMA-335 II.23.3).

use crate::{
    file::parser::Parser,
    metadata::{
        customattributes::{CustomAttributeArgument, CustomAttributeValue},
        signatures::{SignatureParser, TypeSignature},
    },
    Error, Result,
};

/// Blob prolog required by ECMA-335 II.23.3
const PROLOG: u16 = 0x0001;

/// Sentinel count for a null array
const NULL_ARRAY: u32 = 0xFFFF_FFFF;

/// Decodes the fixed arguments of a custom attribute blob, using the parameter types of
/// the constructor signature to drive parsing.
///
/// Named arguments following the fixed arguments are not decoded.
///
/// # Arguments
/// * `constructor_signature` - `MethodDefSig` blob of the attribute constructor
/// * `value` - The attribute value blob
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for a missing prolog, truncated data or a constructor
/// parameter type the importer does not decode.
pub fn parse_custom_attribute_blob(
    constructor_signature: &[u8],
    value: &[u8],
) -> Result<CustomAttributeValue> {
    let constructor = SignatureParser::new(constructor_signature).parse_method_signature()?;

    let mut parser = Parser::new(value);
    let prolog = parser.read_le::<u16>()?;
    if prolog != PROLOG {
        return Err(malformed_error!(
            "Custom attribute blob has invalid prolog - {:#06x}",
            prolog
        ));
    }

    let mut fixed_args = Vec::with_capacity(constructor.params.len());
    for param in &constructor.params {
        if param.by_ref {
            return Err(malformed_error!("Custom attribute constructor takes a by-ref parameter"));
        }
        fixed_args.push(parse_fixed_arg(&mut parser, &param.base)?);
    }

    Ok(CustomAttributeValue { fixed_args })
}

fn parse_fixed_arg(parser: &mut Parser, arg_type: &TypeSignature) -> Result<CustomAttributeArgument> {
    match arg_type {
        TypeSignature::SzArray(array) => {
            let count = parser.read_le::<u32>()?;
            if count == NULL_ARRAY {
                return Ok(CustomAttributeArgument::Array(None));
            }
            if count as usize > parser.remaining() {
                return Err(Error::OutOfBounds);
            }

            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(parse_elem(parser, &array.base)?);
            }
            Ok(CustomAttributeArgument::Array(Some(items)))
        }
        other => parse_elem(parser, other),
    }
}

fn parse_elem(parser: &mut Parser, elem_type: &TypeSignature) -> Result<CustomAttributeArgument> {
    match elem_type {
        TypeSignature::Boolean => Ok(CustomAttributeArgument::Bool(parser.read_le::<u8>()? != 0)),
        TypeSignature::U1 => Ok(CustomAttributeArgument::U1(parser.read_le::<u8>()?)),
        TypeSignature::I4 => Ok(CustomAttributeArgument::I4(parser.read_le::<i32>()?)),
        TypeSignature::String => Ok(CustomAttributeArgument::String(parser.read_ser_string()?)),
        other => Err(malformed_error!(
            "Unsupported custom attribute argument type - {:?}",
            other
        )),
    }
}

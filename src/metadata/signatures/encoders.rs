//! Signature encoders, the inverse of [`crate::metadata::signatures::SignatureParser`].
//!
//! The importer itself only reads signatures. The encoders exist to produce blobs for
//! in-memory images ([`crate::metadata::image::ImageBuilder`]), for tests and for
//! benchmarks, and they follow the same ECMA-335 II.23.2 layout the parser accepts.
//!
//! # Available Encoders
//!
//! - [`encode_type_signature`] - A single type
//! - [`encode_method_signature`] - `MethodDefSig` / `MethodRefSig`
//! - [`encode_field_signature`] - `FieldSig`
//! - [`encode_property_signature`] - `PropertySig`
//! - [`encode_typespec_signature`] - `TypeSpec` blobs

use crate::{
    metadata::{
        signatures::{
            SignatureField, SignatureMethod, SignatureModifier, SignatureParameter,
            SignatureProperty, SignatureTypeSpec, TypeSignature, SIGNATURE_HEADER,
        },
        tables::TableId,
        token::Token,
        typesystem::ELEMENT_TYPE,
    },
    Error, Result,
};

/// Appends `value` as an ECMA-335 compressed unsigned integer.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for values above `0x1FFF_FFFF`.
pub fn write_compressed_uint(value: u32, buffer: &mut Vec<u8>) -> Result<()> {
    match value {
        0..=0x7F => buffer.push(value as u8),
        0x80..=0x3FFF => {
            buffer.push(0x80 | (value >> 8) as u8);
            buffer.push(value as u8);
        }
        0x4000..=0x1FFF_FFFF => {
            buffer.push(0xC0 | (value >> 24) as u8);
            buffer.push((value >> 16) as u8);
            buffer.push((value >> 8) as u8);
            buffer.push(value as u8);
        }
        _ => {
            return Err(malformed_error!(
                "Value {} is too large for a compressed integer",
                value
            ))
        }
    }

    Ok(())
}

/// Appends `value` as an ECMA-335 compressed signed integer (rotated sign bit).
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for values outside `-2^28..2^28`.
#[allow(clippy::cast_sign_loss)]
pub fn write_compressed_int(value: i32, buffer: &mut Vec<u8>) -> Result<()> {
    let (bits, mask) = if (-0x40..0x40).contains(&value) {
        (7, 0x7F)
    } else if (-0x2000..0x2000).contains(&value) {
        (14, 0x3FFF)
    } else if (-0x1000_0000..0x1000_0000).contains(&value) {
        (29, 0x1FFF_FFFF)
    } else {
        return Err(malformed_error!(
            "Value {} is too large for a compressed signed integer",
            value
        ));
    };

    let twos = (value as u32) & mask;
    let rotated = ((twos << 1) & mask) | (twos >> (bits - 1));

    // the width must match the range, even when the rotated value would fit a shorter form
    match bits {
        7 => buffer.push(rotated as u8),
        14 => {
            buffer.push(0x80 | (rotated >> 8) as u8);
            buffer.push(rotated as u8);
        }
        _ => {
            buffer.push(0xC0 | (rotated >> 24) as u8);
            buffer.push((rotated >> 16) as u8);
            buffer.push((rotated >> 8) as u8);
            buffer.push(rotated as u8);
        }
    }

    Ok(())
}

/// Appends a `TypeDefOrRefOrSpecEncoded` token (ECMA-335 II.23.2.8).
///
/// # Errors
/// Returns [`crate::Error::UnexpectedToken`] if the token is not a TypeDef, TypeRef or TypeSpec.
pub fn write_compressed_token(token: Token, buffer: &mut Vec<u8>) -> Result<()> {
    let tag = match token.kind() {
        Some(TableId::TypeDef) => 0,
        Some(TableId::TypeRef) => 1,
        Some(TableId::TypeSpec) => 2,
        _ => return Err(Error::UnexpectedToken(token)),
    };

    write_compressed_uint((token.row() << 2) | tag, buffer)
}

fn encode_custom_modifiers(modifiers: &[SignatureModifier], buffer: &mut Vec<u8>) -> Result<()> {
    for modifier in modifiers {
        buffer.push(if modifier.is_required {
            ELEMENT_TYPE::CMOD_REQD
        } else {
            ELEMENT_TYPE::CMOD_OPT
        });
        write_compressed_token(modifier.modifier_type, buffer)?;
    }

    Ok(())
}

fn encode_parameter(parameter: &SignatureParameter, buffer: &mut Vec<u8>) -> Result<()> {
    if parameter.by_ref {
        encode_custom_modifiers(&parameter.ref_modifiers, buffer)?;
        buffer.push(ELEMENT_TYPE::BYREF);
    }
    encode_custom_modifiers(&parameter.modifiers, buffer)?;
    encode_type_signature(&parameter.base, buffer)
}

/// Appends the encoding of a single type.
///
/// # Errors
/// Returns an error for [`TypeSignature::Unknown`] and for tokens that cannot be encoded.
pub fn encode_type_signature(signature: &TypeSignature, buffer: &mut Vec<u8>) -> Result<()> {
    match signature {
        TypeSignature::Unknown => {
            return Err(Error::UnsupportedSignature(
                "Unknown cannot be encoded".to_string(),
            ))
        }
        TypeSignature::Void => buffer.push(ELEMENT_TYPE::VOID),
        TypeSignature::Boolean => buffer.push(ELEMENT_TYPE::BOOLEAN),
        TypeSignature::Char => buffer.push(ELEMENT_TYPE::CHAR),
        TypeSignature::I1 => buffer.push(ELEMENT_TYPE::I1),
        TypeSignature::U1 => buffer.push(ELEMENT_TYPE::U1),
        TypeSignature::I2 => buffer.push(ELEMENT_TYPE::I2),
        TypeSignature::U2 => buffer.push(ELEMENT_TYPE::U2),
        TypeSignature::I4 => buffer.push(ELEMENT_TYPE::I4),
        TypeSignature::U4 => buffer.push(ELEMENT_TYPE::U4),
        TypeSignature::I8 => buffer.push(ELEMENT_TYPE::I8),
        TypeSignature::U8 => buffer.push(ELEMENT_TYPE::U8),
        TypeSignature::R4 => buffer.push(ELEMENT_TYPE::R4),
        TypeSignature::R8 => buffer.push(ELEMENT_TYPE::R8),
        TypeSignature::String => buffer.push(ELEMENT_TYPE::STRING),
        TypeSignature::I => buffer.push(ELEMENT_TYPE::I),
        TypeSignature::U => buffer.push(ELEMENT_TYPE::U),
        TypeSignature::Object => buffer.push(ELEMENT_TYPE::OBJECT),
        TypeSignature::TypedByRef => buffer.push(ELEMENT_TYPE::TYPEDBYREF),
        TypeSignature::Ptr(pointer) => {
            buffer.push(ELEMENT_TYPE::PTR);
            encode_custom_modifiers(&pointer.modifiers, buffer)?;
            encode_type_signature(&pointer.base, buffer)?;
        }
        TypeSignature::ValueType(token) => {
            buffer.push(ELEMENT_TYPE::VALUETYPE);
            write_compressed_token(*token, buffer)?;
        }
        TypeSignature::Class(token) => {
            buffer.push(ELEMENT_TYPE::CLASS);
            write_compressed_token(*token, buffer)?;
        }
        TypeSignature::GenericParamType(index) => {
            buffer.push(ELEMENT_TYPE::VAR);
            write_compressed_uint(*index, buffer)?;
        }
        TypeSignature::GenericParamMethod(index) => {
            buffer.push(ELEMENT_TYPE::MVAR);
            write_compressed_uint(*index, buffer)?;
        }
        TypeSignature::Array(array) => {
            buffer.push(ELEMENT_TYPE::ARRAY);
            encode_custom_modifiers(&array.modifiers, buffer)?;
            encode_type_signature(&array.base, buffer)?;
            write_compressed_uint(array.rank, buffer)?;
            write_compressed_uint(array.sizes.len() as u32, buffer)?;
            for size in &array.sizes {
                write_compressed_uint(*size, buffer)?;
            }
            write_compressed_uint(array.lower_bounds.len() as u32, buffer)?;
            for bound in &array.lower_bounds {
                write_compressed_int(*bound, buffer)?;
            }
        }
        TypeSignature::GenericInst(base, args) => {
            buffer.push(ELEMENT_TYPE::GENERICINST);
            encode_type_signature(base, buffer)?;
            write_compressed_uint(args.len() as u32, buffer)?;
            for arg in args {
                encode_custom_modifiers(&arg.modifiers, buffer)?;
                encode_type_signature(&arg.base, buffer)?;
            }
        }
        TypeSignature::FnPtr(method) => {
            buffer.push(ELEMENT_TYPE::FNPTR);
            encode_method_into(method, buffer)?;
        }
        TypeSignature::SzArray(array) => {
            buffer.push(ELEMENT_TYPE::SZARRAY);
            encode_custom_modifiers(&array.modifiers, buffer)?;
            encode_type_signature(&array.base, buffer)?;
        }
    }

    Ok(())
}

fn encode_method_into(signature: &SignatureMethod, buffer: &mut Vec<u8>) -> Result<()> {
    let mut header = signature.header;
    if signature.param_count_generic > 0 {
        header |= SIGNATURE_HEADER::GENERIC;
    }
    buffer.push(header);

    if header & SIGNATURE_HEADER::GENERIC != 0 {
        write_compressed_uint(signature.param_count_generic, buffer)?;
    }

    let count = signature.params.len() + signature.varargs.len();
    write_compressed_uint(count as u32, buffer)?;
    encode_parameter(&signature.return_type, buffer)?;
    for param in &signature.params {
        encode_parameter(param, buffer)?;
    }
    if !signature.varargs.is_empty() {
        buffer.push(ELEMENT_TYPE::SENTINEL);
        for param in &signature.varargs {
            encode_parameter(param, buffer)?;
        }
    }

    Ok(())
}

/// Encodes a method signature blob.
///
/// The `GENERIC` header bit is set automatically when `param_count_generic` is non-zero.
///
/// # Errors
/// Returns an error if any contained type cannot be encoded.
pub fn encode_method_signature(signature: &SignatureMethod) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    encode_method_into(signature, &mut buffer)?;
    Ok(buffer)
}

/// Encodes a field signature blob.
///
/// # Errors
/// Returns an error if the field type cannot be encoded.
pub fn encode_field_signature(signature: &SignatureField) -> Result<Vec<u8>> {
    let mut buffer = vec![SIGNATURE_HEADER::FIELD];
    encode_parameter(
        &SignatureParameter {
            ref_modifiers: signature.ref_modifiers.clone(),
            by_ref: signature.by_ref,
            modifiers: signature.modifiers.clone(),
            base: signature.base.clone(),
        },
        &mut buffer,
    )?;
    Ok(buffer)
}

/// Encodes a property signature blob.
///
/// # Errors
/// Returns an error if any contained type cannot be encoded.
pub fn encode_property_signature(signature: &SignatureProperty) -> Result<Vec<u8>> {
    let mut buffer = vec![signature.header | SIGNATURE_HEADER::PROPERTY];
    write_compressed_uint(signature.params.len() as u32, &mut buffer)?;
    encode_parameter(&signature.property_type, &mut buffer)?;
    for param in &signature.params {
        encode_parameter(param, &mut buffer)?;
    }
    Ok(buffer)
}

/// Encodes a `TypeSpec` blob.
///
/// # Errors
/// Returns an error if the type cannot be encoded.
pub fn encode_typespec_signature(signature: &SignatureTypeSpec) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    encode_type_signature(&signature.base, &mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{file::parser::Parser, metadata::signatures::SignatureParser};

    #[test]
    fn test_write_compressed_uint() {
        let cases: [(u32, &[u8]); 5] = [
            (0x03, &[0x03]),
            (0x80, &[0x80, 0x80]),
            (0x2E57, &[0xAE, 0x57]),
            (0x4000, &[0xC0, 0x00, 0x40, 0x00]),
            (0x1FFF_FFFF, &[0xDF, 0xFF, 0xFF, 0xFF]),
        ];

        for (value, expected) in cases {
            let mut buffer = Vec::new();
            write_compressed_uint(value, &mut buffer).unwrap();
            assert_eq!(buffer, expected);
        }

        assert!(write_compressed_uint(0x2000_0000, &mut Vec::new()).is_err());
    }

    #[test]
    fn test_write_compressed_int_matches_reader() {
        for value in [0, 3, -3, 63, -64, 64, -65, 8191, -8192, 8192, -8193, 0x0FFF_FFFF, -0x1000_0000] {
            let mut buffer = Vec::new();
            write_compressed_int(value, &mut buffer).unwrap();
            assert_eq!(Parser::new(&buffer).read_compressed_int().unwrap(), value, "{value}");
        }
    }

    #[test]
    fn test_write_compressed_token() {
        let mut buffer = Vec::new();
        write_compressed_token(Token::new(0x0100_0012), &mut buffer).unwrap();
        assert_eq!(buffer, vec![0x49]);

        assert!(matches!(
            write_compressed_token(Token::new(0x0600_0001), &mut buffer),
            Err(Error::UnexpectedToken(_))
        ));
    }

    #[test]
    fn test_encode_method_signature() {
        let signature = SignatureMethod {
            header: SIGNATURE_HEADER::HAS_THIS,
            param_count_generic: 1,
            return_type: SignatureParameter::from(TypeSignature::String),
            params: vec![
                SignatureParameter {
                    by_ref: true,
                    ..SignatureParameter::from(TypeSignature::I4)
                },
                SignatureParameter::from(TypeSignature::GenericParamMethod(0)),
            ],
            varargs: vec![],
        };

        let encoded = encode_method_signature(&signature).unwrap();
        assert_eq!(encoded, vec![0x30, 0x01, 0x02, 0x0E, 0x10, 0x08, 0x1E, 0x00]);

        let parsed = SignatureParser::new(&encoded).parse_method_signature().unwrap();
        assert_eq!(parsed.header, 0x30);
        assert_eq!(parsed.params, signature.params);
    }

    #[test]
    fn test_encode_field_with_byref_modifiers() {
        let modifier = SignatureModifier {
            is_required: true,
            modifier_type: Token::new(0x0100_0001),
        };
        let field = SignatureField {
            ref_modifiers: vec![modifier],
            by_ref: true,
            modifiers: vec![],
            base: TypeSignature::I4,
        };

        let encoded = encode_field_signature(&field).unwrap();
        assert_eq!(encoded, vec![0x06, 0x1F, 0x05, 0x10, 0x08]);
        assert_eq!(
            SignatureParser::new(&encoded).parse_field_signature().unwrap(),
            field
        );
    }

    #[test]
    fn test_encode_unknown_fails() {
        assert!(encode_typespec_signature(&SignatureTypeSpec {
            base: TypeSignature::Unknown
        })
        .is_err());
    }
}

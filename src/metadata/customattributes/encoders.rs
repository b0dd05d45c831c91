//! Encoders for the attribute value blobs the importer decodes.
//!
//! Used by [`crate::metadata::image::ImageBuilder`] to attach compiler-emitted
//! attributes to in-memory images.

use crate::{metadata::signatures::write_compressed_uint, Result};

fn prolog() -> Vec<u8> {
    vec![0x01, 0x00]
}

fn finish(mut blob: Vec<u8>) -> Vec<u8> {
    // no named arguments
    blob.extend_from_slice(&[0x00, 0x00]);
    blob
}

fn write_ser_string(value: Option<&str>, blob: &mut Vec<u8>) -> Result<()> {
    match value {
        None => blob.push(0xFF),
        Some(value) => {
            write_compressed_uint(value.len() as u32, blob)?;
            blob.extend_from_slice(value.as_bytes());
        }
    }
    Ok(())
}

/// Value blob for a parameterless constructor
#[must_use]
pub fn encode_no_args() -> Vec<u8> {
    finish(prolog())
}

/// Value blob for a `bool[]` constructor
#[must_use]
pub fn encode_bool_array(values: &[bool]) -> Vec<u8> {
    let mut blob = prolog();
    blob.extend_from_slice(&(values.len() as u32).to_le_bytes());
    blob.extend(values.iter().map(|value| u8::from(*value)));
    finish(blob)
}

/// Value blob for a `byte[]` constructor
#[must_use]
pub fn encode_byte_array(values: &[u8]) -> Vec<u8> {
    let mut blob = prolog();
    blob.extend_from_slice(&(values.len() as u32).to_le_bytes());
    blob.extend_from_slice(values);
    finish(blob)
}

/// Value blob for a `byte` constructor
#[must_use]
pub fn encode_byte(value: u8) -> Vec<u8> {
    let mut blob = prolog();
    blob.push(value);
    finish(blob)
}

/// Value blob for a constructor taking a `null` array
#[must_use]
pub fn encode_null_array() -> Vec<u8> {
    let mut blob = prolog();
    blob.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
    finish(blob)
}

/// Value blob for a `string[]` constructor whose elements may be null
///
/// # Errors
/// Returns an error if a string is too long for a compressed length.
pub fn encode_string_array(values: &[Option<&str>]) -> Result<Vec<u8>> {
    let mut blob = prolog();
    blob.extend_from_slice(&(values.len() as u32).to_le_bytes());
    for value in values {
        write_ser_string(*value, &mut blob)?;
    }
    Ok(finish(blob))
}

/// Value blob for a constructor taking a sequence of strings
///
/// # Errors
/// Returns an error if a string is too long for a compressed length.
pub fn encode_strings(values: &[Option<&str>]) -> Result<Vec<u8>> {
    let mut blob = prolog();
    for value in values {
        write_ser_string(*value, &mut blob)?;
    }
    Ok(finish(blob))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::customattributes::{
        parse_custom_attribute_blob, AttributeDescription, CustomAttributeArgument,
    };

    #[test]
    fn test_bool_array_decodes() {
        let blob = encode_bool_array(&[false, true, true]);
        let value =
            parse_custom_attribute_blob(AttributeDescription::DYNAMIC.signatures[1], &blob).unwrap();
        assert_eq!(value.fixed_args[0].as_bool_array(), Some(vec![false, true, true]));
    }

    #[test]
    fn test_string_array_decodes() {
        let blob = encode_string_array(&[Some("x"), None, Some("")]).unwrap();
        let value = parse_custom_attribute_blob(
            AttributeDescription::TUPLE_ELEMENT_NAMES.signatures[0],
            &blob,
        )
        .unwrap();
        assert_eq!(
            value.fixed_args[0].as_string_array(),
            Some(vec![Some("x".to_string()), None, Some(String::new())])
        );
    }

    #[test]
    fn test_scalar_forms_decode() {
        let value =
            parse_custom_attribute_blob(AttributeDescription::NULLABLE.signatures[0], &encode_byte(2))
                .unwrap();
        assert_eq!(value.fixed_args, vec![CustomAttributeArgument::U1(2)]);

        let value =
            parse_custom_attribute_blob(AttributeDescription::DYNAMIC.signatures[0], &encode_no_args())
                .unwrap();
        assert!(value.fixed_args.is_empty());

        let blob = encode_strings(&[Some("scope"), Some("id")]).unwrap();
        let value =
            parse_custom_attribute_blob(AttributeDescription::TYPE_IDENTIFIER.signatures[1], &blob)
                .unwrap();
        assert_eq!(value.fixed_args.len(), 2);
    }
}

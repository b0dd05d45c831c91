//! Custom attribute values and well-known attribute descriptions.
//!
//! The importer never needs general attribute decoding. It asks one question of a
//! metadata row: "does it carry this particular compiler-emitted attribute, and with which
//! arguments?" [`AttributeDescription`] names such an attribute together with the
//! constructor signatures it may be emitted with, and [`CustomAttributeValue`] holds the
//! decoded fixed arguments.

/// A decoded fixed argument of a custom attribute constructor
#[derive(Debug, Clone, PartialEq)]
pub enum CustomAttributeArgument {
    /// `bool`
    Bool(bool),
    /// `byte`
    U1(u8),
    /// `int`
    I4(i32),
    /// `string`, `None` for a null string
    String(Option<String>),
    /// A single-dimensional array, `None` for a null array
    Array(Option<Vec<CustomAttributeArgument>>),
}

impl CustomAttributeArgument {
    /// Extracts a `bool[]`, mapping a null array to `None`
    #[must_use]
    pub fn as_bool_array(&self) -> Option<Vec<bool>> {
        let CustomAttributeArgument::Array(Some(items)) = self else {
            return None;
        };

        items
            .iter()
            .map(|item| match item {
                CustomAttributeArgument::Bool(value) => Some(*value),
                _ => None,
            })
            .collect()
    }

    /// Extracts a `byte[]`, mapping a null array to `None`
    #[must_use]
    pub fn as_byte_array(&self) -> Option<Vec<u8>> {
        let CustomAttributeArgument::Array(Some(items)) = self else {
            return None;
        };

        items
            .iter()
            .map(|item| match item {
                CustomAttributeArgument::U1(value) => Some(*value),
                _ => None,
            })
            .collect()
    }

    /// Extracts a `string[]` whose elements may be null, mapping a null array to `None`
    #[must_use]
    pub fn as_string_array(&self) -> Option<Vec<Option<String>>> {
        let CustomAttributeArgument::Array(Some(items)) = self else {
            return None;
        };

        items
            .iter()
            .map(|item| match item {
                CustomAttributeArgument::String(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }
}

/// The fixed arguments of one attribute instance, in constructor parameter order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CustomAttributeValue {
    /// Constructor arguments
    pub fixed_args: Vec<CustomAttributeArgument>,
}

/// Identifies a well-known attribute by its declaring type and accepted constructors.
///
/// Each entry in `signatures` is the full constructor `MethodDefSig` blob. An attribute
/// row matches when its type name is equal and its constructor signature equals one of the
/// entries. The index of the matching entry tells the caller which overload was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescription {
    /// Namespace of the attribute type
    pub namespace: &'static str,
    /// Name of the attribute type
    pub name: &'static str,
    /// Accepted constructor signatures
    pub signatures: &'static [&'static [u8]],
}

const CTOR_NO_ARGS: &[u8] = &[0x20, 0x00, 0x01];
const CTOR_BOOL_ARRAY: &[u8] = &[0x20, 0x01, 0x01, 0x1D, 0x02];
const CTOR_STRING_ARRAY: &[u8] = &[0x20, 0x01, 0x01, 0x1D, 0x0E];
const CTOR_BYTE: &[u8] = &[0x20, 0x01, 0x01, 0x05];
const CTOR_BYTE_ARRAY: &[u8] = &[0x20, 0x01, 0x01, 0x1D, 0x05];
const CTOR_STRING: &[u8] = &[0x20, 0x01, 0x01, 0x0E];
const CTOR_STRING_STRING: &[u8] = &[0x20, 0x02, 0x01, 0x0E, 0x0E];

const COMPILER_SERVICES: &str = "System.Runtime.CompilerServices";
const INTEROP_SERVICES: &str = "System.Runtime.InteropServices";

impl AttributeDescription {
    /// `DynamicAttribute()` and `DynamicAttribute(bool[])`
    pub const DYNAMIC: AttributeDescription = AttributeDescription {
        namespace: COMPILER_SERVICES,
        name: "DynamicAttribute",
        signatures: &[CTOR_NO_ARGS, CTOR_BOOL_ARRAY],
    };

    /// `NativeIntegerAttribute()` and `NativeIntegerAttribute(bool[])`
    pub const NATIVE_INTEGER: AttributeDescription = AttributeDescription {
        namespace: COMPILER_SERVICES,
        name: "NativeIntegerAttribute",
        signatures: &[CTOR_NO_ARGS, CTOR_BOOL_ARRAY],
    };

    /// `TupleElementNamesAttribute(string[])`
    pub const TUPLE_ELEMENT_NAMES: AttributeDescription = AttributeDescription {
        namespace: COMPILER_SERVICES,
        name: "TupleElementNamesAttribute",
        signatures: &[CTOR_STRING_ARRAY],
    };

    /// `NullableAttribute(byte)` and `NullableAttribute(byte[])`
    pub const NULLABLE: AttributeDescription = AttributeDescription {
        namespace: COMPILER_SERVICES,
        name: "NullableAttribute",
        signatures: &[CTOR_BYTE, CTOR_BYTE_ARRAY],
    };

    /// `NullableContextAttribute(byte)`
    pub const NULLABLE_CONTEXT: AttributeDescription = AttributeDescription {
        namespace: COMPILER_SERVICES,
        name: "NullableContextAttribute",
        signatures: &[CTOR_BYTE],
    };

    /// `TypeIdentifierAttribute()` and `TypeIdentifierAttribute(string scope, string identifier)`
    pub const TYPE_IDENTIFIER: AttributeDescription = AttributeDescription {
        namespace: INTEROP_SERVICES,
        name: "TypeIdentifierAttribute",
        signatures: &[CTOR_NO_ARGS, CTOR_STRING_STRING],
    };

    /// `GuidAttribute(string)`
    pub const GUID: AttributeDescription = AttributeDescription {
        namespace: INTEROP_SERVICES,
        name: "GuidAttribute",
        signatures: &[CTOR_STRING],
    };

    /// Returns the index of the constructor signature that `constructor_signature` matches,
    /// if the attribute type is this description's type.
    #[must_use]
    pub fn matches(
        &self,
        namespace: &str,
        name: &str,
        constructor_signature: &[u8],
    ) -> Option<usize> {
        if self.namespace != namespace || self.name != name {
            return None;
        }

        self.signatures
            .iter()
            .position(|signature| *signature == constructor_signature)
    }
}

/// The content of a flag-carrying attribute on one metadata row.
///
/// This is the input the transform decoders consume. `Malformed` covers an attribute that
/// is present but whose blob could not be decoded, and a `null` argument array.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedFlags<T> {
    /// The attribute is not present
    Absent,
    /// The attribute uses its parameterless constructor
    Parameterless,
    /// The attribute carries a single scalar value that applies to every slot
    Single(T),
    /// The attribute carries an array of values
    Values(Vec<T>),
    /// The attribute is present but its arguments could not be decoded
    Malformed,
}

impl<T> DecodedFlags<T> {
    /// `true` unless the attribute is absent
    #[must_use]
    pub fn is_present(&self) -> bool {
        !matches!(self, DecodedFlags::Absent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_matches() {
        let dynamic = AttributeDescription::DYNAMIC;
        assert_eq!(
            dynamic.matches(COMPILER_SERVICES, "DynamicAttribute", CTOR_NO_ARGS),
            Some(0)
        );
        assert_eq!(
            dynamic.matches(COMPILER_SERVICES, "DynamicAttribute", CTOR_BOOL_ARRAY),
            Some(1)
        );
        assert_eq!(
            dynamic.matches(COMPILER_SERVICES, "DynamicAttribute", CTOR_STRING_ARRAY),
            None
        );
        assert_eq!(
            dynamic.matches("System", "DynamicAttribute", CTOR_NO_ARGS),
            None
        );
    }

    #[test]
    fn test_argument_extraction() {
        let flags = CustomAttributeArgument::Array(Some(vec![
            CustomAttributeArgument::Bool(true),
            CustomAttributeArgument::Bool(false),
        ]));
        assert_eq!(flags.as_bool_array(), Some(vec![true, false]));
        assert_eq!(flags.as_byte_array(), None);

        let names = CustomAttributeArgument::Array(Some(vec![
            CustomAttributeArgument::String(Some("a".to_string())),
            CustomAttributeArgument::String(None),
        ]));
        assert_eq!(
            names.as_string_array(),
            Some(vec![Some("a".to_string()), None])
        );

        assert_eq!(CustomAttributeArgument::Array(None).as_bool_array(), None);
        assert_eq!(CustomAttributeArgument::U1(1).as_byte_array(), None);
    }

    #[test]
    fn test_decoded_flags_presence() {
        assert!(!DecodedFlags::<bool>::Absent.is_present());
        assert!(DecodedFlags::<bool>::Malformed.is_present());
        assert!(DecodedFlags::Values(vec![true]).is_present());
    }
}

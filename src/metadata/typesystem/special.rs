use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::metadata::signatures::TypeSignature;

/// Core library types the importer needs to recognise by name
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, EnumCount)]
pub enum SpecialType {
    #[default]
    None,
    Object,
    ValueType,
    Enum,
    MulticastDelegate,
    Void,
    Boolean,
    Char,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    String,
    IntPtr,
    UIntPtr,
    TypedReference,
    Nullable,
}

impl SpecialType {
    /// Namespace and metadata name, `None` for [`SpecialType::None`]
    #[must_use]
    pub fn metadata_name(self) -> Option<(&'static str, &'static str)> {
        let name = match self {
            SpecialType::None => return None,
            SpecialType::Object => "Object",
            SpecialType::ValueType => "ValueType",
            SpecialType::Enum => "Enum",
            SpecialType::MulticastDelegate => "MulticastDelegate",
            SpecialType::Void => "Void",
            SpecialType::Boolean => "Boolean",
            SpecialType::Char => "Char",
            SpecialType::SByte => "SByte",
            SpecialType::Byte => "Byte",
            SpecialType::Int16 => "Int16",
            SpecialType::UInt16 => "UInt16",
            SpecialType::Int32 => "Int32",
            SpecialType::UInt32 => "UInt32",
            SpecialType::Int64 => "Int64",
            SpecialType::UInt64 => "UInt64",
            SpecialType::Single => "Single",
            SpecialType::Double => "Double",
            SpecialType::String => "String",
            SpecialType::IntPtr => "IntPtr",
            SpecialType::UIntPtr => "UIntPtr",
            SpecialType::TypedReference => "TypedReference",
            SpecialType::Nullable => "Nullable`1",
        };
        Some(("System", name))
    }

    /// Maps a namespace and metadata name to the special type it denotes
    #[must_use]
    pub fn from_metadata_name(namespace: &str, name: &str) -> SpecialType {
        if namespace != "System" {
            return SpecialType::None;
        }

        SpecialType::iter()
            .find(|special| matches!(special.metadata_name(), Some((_, n)) if n == name))
            .unwrap_or(SpecialType::None)
    }

    /// The special type a short-form signature element stands for
    #[must_use]
    pub fn from_signature(signature: &TypeSignature) -> Option<SpecialType> {
        Some(match signature {
            TypeSignature::Void => SpecialType::Void,
            TypeSignature::Boolean => SpecialType::Boolean,
            TypeSignature::Char => SpecialType::Char,
            TypeSignature::I1 => SpecialType::SByte,
            TypeSignature::U1 => SpecialType::Byte,
            TypeSignature::I2 => SpecialType::Int16,
            TypeSignature::U2 => SpecialType::UInt16,
            TypeSignature::I4 => SpecialType::Int32,
            TypeSignature::U4 => SpecialType::UInt32,
            TypeSignature::I8 => SpecialType::Int64,
            TypeSignature::U8 => SpecialType::UInt64,
            TypeSignature::R4 => SpecialType::Single,
            TypeSignature::R8 => SpecialType::Double,
            TypeSignature::String => SpecialType::String,
            TypeSignature::I => SpecialType::IntPtr,
            TypeSignature::U => SpecialType::UIntPtr,
            TypeSignature::Object => SpecialType::Object,
            TypeSignature::TypedByRef => SpecialType::TypedReference,
            _ => return None,
        })
    }

    /// `true` if the type has a dedicated element type code and must not be referenced
    /// through `CLASS`/`VALUETYPE`
    #[must_use]
    pub fn has_short_form(self) -> bool {
        !matches!(
            self,
            SpecialType::None
                | SpecialType::ValueType
                | SpecialType::Enum
                | SpecialType::MulticastDelegate
                | SpecialType::Nullable
        )
    }
}

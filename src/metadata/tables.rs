//! Metadata table identifiers.
//!
//! Only the tables whose tokens reach the decoders are listed: type and member rows,
//! resolution scopes, and the owners of custom attributes.

use strum::{EnumCount, EnumIter, IntoEnumIterator};

/// Identifies a metadata table by the value stored in a token's high byte.
#[derive(Clone, Copy, PartialEq, Debug, EnumIter, EnumCount, Eq, Hash)]
pub enum TableId {
    /// `Module` - the current module
    Module = 0x00,
    /// `TypeRef` - references to types in other scopes
    TypeRef = 0x01,
    /// `TypeDef` - types defined in this module
    TypeDef = 0x02,
    /// `Field` - field definitions
    Field = 0x04,
    /// `MethodDef` - method definitions
    MethodDef = 0x06,
    /// `Param` - parameter rows, including the return slot (sequence 0)
    Param = 0x08,
    /// `InterfaceImpl` - interfaces implemented by a type
    InterfaceImpl = 0x09,
    /// `MemberRef` - references to fields and methods of other types
    MemberRef = 0x0A,
    /// `CustomAttribute` - attribute instances
    CustomAttribute = 0x0C,
    /// `Event` - event definitions
    Event = 0x14,
    /// `Property` - property definitions
    Property = 0x17,
    /// `ModuleRef` - references to other modules of the same assembly
    ModuleRef = 0x1A,
    /// `TypeSpec` - type specifications (signature blobs)
    TypeSpec = 0x1B,
    /// `Assembly` - the current assembly
    Assembly = 0x20,
    /// `AssemblyRef` - referenced assemblies
    AssemblyRef = 0x23,
    /// `GenericParam` - generic parameters of types and methods
    GenericParam = 0x2A,
    /// `MethodSpec` - generic method instantiations
    MethodSpec = 0x2B,
}

impl TableId {
    /// Maps a token's table byte to a known table
    #[must_use]
    pub fn from_byte(value: u8) -> Option<TableId> {
        TableId::iter().find(|table| *table as u8 == value)
    }

    /// `true` for the three tables a `TypeDefOrRefOrSpec` position may name
    #[must_use]
    pub fn is_type(&self) -> bool {
        matches!(self, TableId::TypeDef | TableId::TypeRef | TableId::TypeSpec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_byte() {
        for table in TableId::iter() {
            assert_eq!(TableId::from_byte(table as u8), Some(table));
        }
        assert_eq!(TableId::from_byte(0x03), None);
        assert_eq!(TableId::COUNT, 17);
    }

    #[test]
    fn test_is_type() {
        assert!(TableId::TypeSpec.is_type());
        assert!(!TableId::MemberRef.is_type());
    }
}

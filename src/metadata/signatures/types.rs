use crate::metadata::token::Token;

#[allow(non_snake_case, dead_code, missing_docs)]
/// Leading bytes and flags of signature blobs (ECMA-335 II.23.2.1 - II.23.2.5)
pub mod SIGNATURE_HEADER {
    pub const DEFAULT: u8 = 0x00;
    pub const C: u8 = 0x01;
    pub const STDCALL: u8 = 0x02;
    pub const THISCALL: u8 = 0x03;
    pub const FASTCALL: u8 = 0x04;
    pub const VARARG: u8 = 0x05;
    pub const FIELD: u8 = 0x06;
    pub const LOCAL_SIG: u8 = 0x07;
    pub const PROPERTY: u8 = 0x08;
    pub const UNMANAGED: u8 = 0x09;
    pub const GENERICINST: u8 = 0x0A;
    // Mask selecting the calling convention or signature kind
    pub const KIND_MASK: u8 = 0x0F;
    pub const GENERIC: u8 = 0x10;
    pub const HAS_THIS: u8 = 0x20;
    pub const EXPLICIT_THIS: u8 = 0x40;
}

/// The calling convention part of a method or function pointer signature header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallingConvention {
    /// Managed default convention
    Default,
    /// Unmanaged cdecl
    C,
    /// Unmanaged stdcall
    StdCall,
    /// Unmanaged thiscall
    ThisCall,
    /// Unmanaged fastcall
    FastCall,
    /// Managed variable argument list
    VarArg,
    /// Unmanaged, convention carried in modifiers
    Unmanaged,
    /// A kind value that has no defined meaning for methods
    Other(u8),
}

impl CallingConvention {
    /// Extracts the calling convention from a raw header byte
    #[must_use]
    pub fn from_header(header: u8) -> Self {
        match header & SIGNATURE_HEADER::KIND_MASK {
            SIGNATURE_HEADER::DEFAULT => CallingConvention::Default,
            SIGNATURE_HEADER::C => CallingConvention::C,
            SIGNATURE_HEADER::STDCALL => CallingConvention::StdCall,
            SIGNATURE_HEADER::THISCALL => CallingConvention::ThisCall,
            SIGNATURE_HEADER::FASTCALL => CallingConvention::FastCall,
            SIGNATURE_HEADER::VARARG => CallingConvention::VarArg,
            SIGNATURE_HEADER::UNMANAGED => CallingConvention::Unmanaged,
            other => CallingConvention::Other(other),
        }
    }
}

/// A custom modifier as it appears in a signature blob: the modifier's type token and
/// whether it was `modreq` (required) or `modopt` (optional).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureModifier {
    /// `true` for `CMOD_REQD`, `false` for `CMOD_OPT`
    pub is_required: bool,
    /// `TypeDefOrRef` token of the modifier type
    pub modifier_type: Token,
}

/// A type as encoded in a signature blob, before any token is resolved
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TypeSignature {
    /// Placeholder for a slot that could not be parsed
    #[default]
    Unknown,
    Void,
    Boolean,
    Char,
    I1,
    U1,
    I2,
    U2,
    I4,
    U4,
    I8,
    U8,
    R4,
    R8,
    String,
    I,
    U,
    Object,
    TypedByRef,
    Ptr(SignaturePointer),
    // TypeDefOrRefOrSpecEncoded
    ValueType(Token),
    // TypeDefOrRefOrSpecEncoded
    Class(Token),
    // Position of a type-level generic parameter
    GenericParamType(u32),
    // Position of a method-level generic parameter
    GenericParamMethod(u32),
    Array(SignatureArray),
    GenericInst(Box<TypeSignature>, Vec<SignatureTypeArgument>),
    FnPtr(Box<SignatureMethod>),
    SzArray(SignatureSzArray),
}

/// A multi-dimensional array (`ELEMENT_TYPE_ARRAY`) with its shape
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureArray {
    /// Custom modifiers preceding the element type
    pub modifiers: Vec<SignatureModifier>,
    /// The element type
    pub base: Box<TypeSignature>,
    /// Number of dimensions
    pub rank: u32,
    /// Sizes of the leading dimensions, may be shorter than `rank`
    pub sizes: Vec<u32>,
    /// Lower bounds of the leading dimensions, may be shorter than `rank`
    pub lower_bounds: Vec<i32>,
}

/// A single-dimensional, zero-based array (`ELEMENT_TYPE_SZARRAY`)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureSzArray {
    /// Custom modifiers preceding the element type
    pub modifiers: Vec<SignatureModifier>,
    /// The element type
    pub base: Box<TypeSignature>,
}

/// An unmanaged pointer (`ELEMENT_TYPE_PTR`)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignaturePointer {
    /// Custom modifiers preceding the pointed-at type
    pub modifiers: Vec<SignatureModifier>,
    /// The pointed-at type
    pub base: Box<TypeSignature>,
}

/// One argument of a `GENERICINST`, with the modifiers that precede it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureTypeArgument {
    /// Custom modifiers preceding the argument
    pub modifiers: Vec<SignatureModifier>,
    /// The argument type
    pub base: TypeSignature,
}

impl From<TypeSignature> for SignatureTypeArgument {
    fn from(base: TypeSignature) -> Self {
        SignatureTypeArgument {
            modifiers: Vec::new(),
            base,
        }
    }
}

/// A parameter or return slot: `CustomMod* [BYREF CustomMod*] Type`
///
/// When `BYREF` is present, the modifiers in front of it are the ref-custom-modifiers
/// and the modifiers after it belong to the type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureParameter {
    /// Modifiers that precede `BYREF`, empty when the slot is not by-ref
    pub ref_modifiers: Vec<SignatureModifier>,
    /// `true` if the slot is passed by reference
    pub by_ref: bool,
    /// Modifiers applying to the type itself
    pub modifiers: Vec<SignatureModifier>,
    /// The slot type
    pub base: TypeSignature,
}

impl From<TypeSignature> for SignatureParameter {
    fn from(base: TypeSignature) -> Self {
        SignatureParameter {
            base,
            ..SignatureParameter::default()
        }
    }
}

/// `MethodDefSig`, `MethodRefSig` and the method part of `FNPTR`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureMethod {
    /// The raw header byte, compared verbatim when matching member references
    pub header: u8,
    /// Number of method-level generic parameters
    pub param_count_generic: u32,
    /// The return slot
    pub return_type: SignatureParameter,
    /// Fixed parameters
    pub params: Vec<SignatureParameter>,
    /// Parameters following a `SENTINEL`, only present at vararg call sites
    pub varargs: Vec<SignatureParameter>,
}

impl SignatureMethod {
    /// `true` if an instance pointer is passed
    #[must_use]
    pub fn has_this(&self) -> bool {
        self.header & SIGNATURE_HEADER::HAS_THIS != 0
    }

    /// `true` if the instance pointer is an explicit first parameter
    #[must_use]
    pub fn explicit_this(&self) -> bool {
        self.header & SIGNATURE_HEADER::EXPLICIT_THIS != 0
    }

    /// `true` if the method declares generic parameters
    #[must_use]
    pub fn is_generic(&self) -> bool {
        self.header & SIGNATURE_HEADER::GENERIC != 0
    }

    /// The calling convention encoded in the header
    #[must_use]
    pub fn calling_convention(&self) -> CallingConvention {
        CallingConvention::from_header(self.header)
    }
}

/// `FieldSig`, which may describe a ref field
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureField {
    /// Modifiers preceding `BYREF`
    pub ref_modifiers: Vec<SignatureModifier>,
    /// `true` for ref fields
    pub by_ref: bool,
    /// Modifiers applying to the field type
    pub modifiers: Vec<SignatureModifier>,
    /// The field type
    pub base: TypeSignature,
}

/// `PropertySig`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureProperty {
    /// The raw header byte
    pub header: u8,
    /// The property type slot
    pub property_type: SignatureParameter,
    /// Indexer parameters
    pub params: Vec<SignatureParameter>,
}

impl SignatureProperty {
    /// `true` for instance properties
    #[must_use]
    pub fn has_this(&self) -> bool {
        self.header & SIGNATURE_HEADER::HAS_THIS != 0
    }
}

/// `TypeSpec` blob
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureTypeSpec {
    /// The specified type
    pub base: TypeSignature,
}

/// One entry of a `LocalVarSig`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureLocalVariable {
    /// Modifiers preceding the local's type
    pub modifiers: Vec<SignatureModifier>,
    /// `true` if the local is pinned
    pub is_pinned: bool,
    /// `true` for by-ref locals
    pub by_ref: bool,
    /// The local's type
    pub base: TypeSignature,
}

/// `LocalVarSig` (II.23.2.6)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureLocalVariables {
    /// Locals in slot order
    pub locals: Vec<SignatureLocalVariable>,
}

impl TypeSignature {
    /// `true` for the element types that have a dedicated short-form code, and therefore
    /// never legitimately appear as a `CLASS`/`VALUETYPE` token
    #[must_use]
    pub fn is_short_form(&self) -> bool {
        matches!(
            self,
            TypeSignature::Void
                | TypeSignature::Boolean
                | TypeSignature::Char
                | TypeSignature::I1
                | TypeSignature::U1
                | TypeSignature::I2
                | TypeSignature::U2
                | TypeSignature::I4
                | TypeSignature::U4
                | TypeSignature::I8
                | TypeSignature::U8
                | TypeSignature::R4
                | TypeSignature::R8
                | TypeSignature::String
                | TypeSignature::I
                | TypeSignature::U
                | TypeSignature::Object
                | TypeSignature::TypedByRef
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calling_convention_from_header() {
        assert_eq!(CallingConvention::from_header(0x20), CallingConvention::Default);
        assert_eq!(CallingConvention::from_header(0x05), CallingConvention::VarArg);
        assert_eq!(CallingConvention::from_header(0x32), CallingConvention::StdCall);
        assert_eq!(CallingConvention::from_header(0x0C), CallingConvention::Other(0x0C));
    }

    #[test]
    fn test_method_header_flags() {
        let method = SignatureMethod {
            header: 0x30,
            ..SignatureMethod::default()
        };
        assert!(method.has_this());
        assert!(method.is_generic());
        assert!(!method.explicit_this());
        assert_eq!(method.calling_convention(), CallingConvention::Default);
    }

    #[test]
    fn test_is_short_form() {
        assert!(TypeSignature::I4.is_short_form());
        assert!(TypeSignature::Object.is_short_form());
        assert!(!TypeSignature::Class(Token::new(0x0100_0001)).is_short_form());
        assert!(!TypeSignature::Unknown.is_short_form());
    }
}

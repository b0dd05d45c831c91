use std::{fmt, sync::Arc};

use crate::metadata::{
    signatures::CallingConvention,
    typesystem::{NamedType, SpecialType},
};

/// Reference to a `TypeSymbol`
pub type TypeRc = Arc<TypeSymbol>;

#[allow(non_snake_case, dead_code, missing_docs)]
/// Possible bytes that represent the various 'Types' of a signature
pub mod ELEMENT_TYPE {
    //Marks end of a list
    pub const END: u8 = 0x00;
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0a;
    pub const U8: u8 = 0x0b;
    pub const R4: u8 = 0x0c;
    pub const R8: u8 = 0x0d;
    pub const STRING: u8 = 0x0e;
    // Followed by type
    pub const PTR: u8 = 0x0f;
    // Followed by type
    pub const BYREF: u8 = 0x10;
    // Followed by TypeDef or TypeRef token
    pub const VALUETYPE: u8 = 0x11;
    // Followed by TypeDef or TypeRef token
    pub const CLASS: u8 = 0x12;
    // Generic parameter in a generic type definition, represented as number
    pub const VAR: u8 = 0x13;
    // type rank boundsCount bound1 … loCount lo1 …
    pub const ARRAY: u8 = 0x14;
    // Generic type instantiation. Followed by type type-arg-count type-1 ... type-n
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    // System.IntPtr
    pub const I: u8 = 0x18;
    // System.UIntPtr
    pub const U: u8 = 0x19;
    // Followed by full method signature
    pub const FNPTR: u8 = 0x1b;
    // System.Object
    pub const OBJECT: u8 = 0x1c;
    // Single-dim array with 0 lower bound
    pub const SZARRAY: u8 = 0x1d;
    // Generic parameter in a generic method definition, represented as number
    pub const MVAR: u8 = 0x1e;
    // Required modifier : followed by a TypeDef or TypeRef token
    pub const CMOD_REQD: u8 = 0x1f;
    // Optional modifier : followed by a TypeDef or TypeRef token
    pub const CMOD_OPT: u8 = 0x20;
    // Sentinel for vararg method signature
    pub const SENTINEL: u8 = 0x41;
    // Denotes a local variable that points at a pinned object
    pub const PINNED: u8 = 0x45;
}

/// A node of a decoded type tree.
///
/// Trees are immutable once built and shared through [`TypeRc`]. Transform passes that
/// change nothing hand back the very same `Arc`, so `Arc::ptr_eq` doubles as a cheap
/// "unchanged" test.
#[derive(Debug, Clone)]
pub enum TypeSymbol {
    /// A type that could not be decoded
    Error(ErrorType),
    /// A class, struct, interface, enum or delegate, possibly constructed
    Named(NamedType),
    /// A single or multi-dimensional array
    Array(ArrayType),
    /// An unmanaged pointer
    Pointer(PointerType),
    /// A function pointer
    FunctionPointer(FunctionPointerType),
    /// A generic parameter of a type or method, or a positional placeholder
    TypeParameter(TypeParameter),
    /// `object` annotated as `dynamic`
    Dynamic,
}

/// The ways a type reference can fail to decode
#[derive(Debug, Clone)]
pub enum ErrorType {
    /// The metadata uses a construct that cannot be represented
    Unsupported,
    /// The reference is well formed but its target cannot be found
    Missing {
        /// Namespace of the missing type
        namespace: String,
        /// Name of the missing type, without arity suffix
        name: String,
        /// Arity parsed from the metadata name
        arity: u32,
    },
    /// A generic instantiation closed over embedded interop types
    IllegalGenericInstantiation {
        /// The instantiation as it would otherwise have been decoded
        underlying: TypeRc,
    },
    /// Concurrent resolutions of the same token disagreed
    Conflicting,
}

/// Nullable reference type annotation of a type slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NullableAnnotation {
    /// No nullable information (byte `0`)
    #[default]
    Oblivious,
    /// Declared without `?` (byte `1`)
    NotAnnotated,
    /// Declared with `?` (byte `2`)
    Annotated,
}

impl NullableAnnotation {
    /// Maps a `NullableAttribute` byte to an annotation, `None` for undefined values
    #[must_use]
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0 => Some(NullableAnnotation::Oblivious),
            1 => Some(NullableAnnotation::NotAnnotated),
            2 => Some(NullableAnnotation::Annotated),
            _ => None,
        }
    }
}

/// A resolved `modreq`/`modopt`
#[derive(Debug, Clone)]
pub struct CustomModifier {
    /// The modifier type
    pub modifier: TypeRc,
    /// `true` for `modopt`
    pub is_optional: bool,
}

/// A type together with the annotations that belong to the slot it occupies.
///
/// This is what parameter lists, return slots, array elements and type arguments hold.
#[derive(Debug, Clone)]
pub struct AnnotatedType {
    /// The type
    pub ty: TypeRc,
    /// Nullable annotation of the slot
    pub nullable: NullableAnnotation,
    /// Custom modifiers of the slot, in signature order
    pub modifiers: Vec<CustomModifier>,
}

impl AnnotatedType {
    /// An oblivious, unmodified slot of type `ty`
    #[must_use]
    pub fn new(ty: TypeRc) -> Self {
        AnnotatedType {
            ty,
            nullable: NullableAnnotation::Oblivious,
            modifiers: Vec::new(),
        }
    }

    /// An oblivious slot of type `ty` carrying `modifiers`
    #[must_use]
    pub fn with_modifiers(ty: TypeRc, modifiers: Vec<CustomModifier>) -> Self {
        AnnotatedType {
            ty,
            nullable: NullableAnnotation::Oblivious,
            modifiers,
        }
    }

    /// The same slot holding a different type
    #[must_use]
    pub fn with_type(&self, ty: TypeRc) -> Self {
        AnnotatedType {
            ty,
            nullable: self.nullable,
            modifiers: self.modifiers.clone(),
        }
    }

    /// The same slot with a different nullable annotation
    #[must_use]
    pub fn with_nullable(&self, nullable: NullableAnnotation) -> Self {
        AnnotatedType {
            ty: self.ty.clone(),
            nullable,
            modifiers: self.modifiers.clone(),
        }
    }

    /// `true` if both slots share the same type allocation, annotation and modifier allocations
    #[must_use]
    pub fn is_same_as(&self, other: &AnnotatedType) -> bool {
        Arc::ptr_eq(&self.ty, &other.ty)
            && self.nullable == other.nullable
            && self.modifiers.len() == other.modifiers.len()
            && self
                .modifiers
                .iter()
                .zip(&other.modifiers)
                .all(|(a, b)| a.is_optional == b.is_optional && Arc::ptr_eq(&a.modifier, &b.modifier))
    }
}

/// Array shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayShape {
    /// `T[]`, zero based with a single dimension
    SingleDimensional,
    /// `T[,]` and friends, including rank-1 arrays declared through `ELEMENT_TYPE_ARRAY`
    MultiDimensional {
        /// Number of dimensions
        rank: u32,
        /// Sizes of the leading dimensions
        sizes: Vec<u32>,
        /// Lower bounds of the leading dimensions
        lower_bounds: Vec<i32>,
    },
}

/// An array type
#[derive(Debug, Clone)]
pub struct ArrayType {
    /// The element slot
    pub element: AnnotatedType,
    /// The array shape
    pub shape: ArrayShape,
}

/// An unmanaged pointer type
#[derive(Debug, Clone)]
pub struct PointerType {
    /// The pointed-at slot
    pub pointed_at: AnnotatedType,
}

/// How a function pointer parameter or return is passed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RefKind {
    /// By value
    #[default]
    None,
    /// By reference (`BYREF`)
    Ref,
}

/// A parameter or the return slot of a function pointer
#[derive(Debug, Clone)]
pub struct FunctionPointerParam {
    /// The slot type
    pub ty: AnnotatedType,
    /// By value or by reference
    pub ref_kind: RefKind,
    /// Modifiers preceding `BYREF`
    pub ref_modifiers: Vec<CustomModifier>,
}

/// A function pointer type
#[derive(Debug, Clone)]
pub struct FunctionPointerType {
    /// Calling convention from the signature header
    pub calling_convention: CallingConvention,
    /// The return slot
    pub return_param: FunctionPointerParam,
    /// Parameters in declaration order
    pub params: Vec<FunctionPointerParam>,
}

/// The entity a type parameter belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeParameterOwner {
    /// Declared by the TypeDef with this token
    Type(crate::metadata::token::Token),
    /// Declared by the MethodDef with this token
    Method(crate::metadata::token::Token),
    /// A position-only stand-in used while matching member references
    Placeholder {
        /// `true` for a method-level position (`!!n`)
        method: bool,
    },
}

/// A generic parameter
#[derive(Debug, Clone)]
pub struct TypeParameter {
    /// Zero-based position within the owner's own parameter list
    pub ordinal: u32,
    /// The declaring entity
    pub owner: TypeParameterOwner,
    /// Declared name, absent for placeholders
    pub name: Option<String>,
}

impl TypeSymbol {
    /// The structural sentinel
    #[must_use]
    pub fn unsupported() -> TypeRc {
        Arc::new(TypeSymbol::Error(ErrorType::Unsupported))
    }

    /// A sentinel for a reference whose target cannot be found
    #[must_use]
    pub fn missing(namespace: &str, name: &str) -> TypeRc {
        let (name, arity) = split_generic_arity(name);
        Arc::new(TypeSymbol::Error(ErrorType::Missing {
            namespace: namespace.to_string(),
            name: name.to_string(),
            arity,
        }))
    }

    /// A method-level (`!!n`) or type-level (`!n`) positional placeholder
    #[must_use]
    pub fn placeholder(ordinal: u32, method: bool) -> TypeRc {
        Arc::new(TypeSymbol::TypeParameter(TypeParameter {
            ordinal,
            owner: TypeParameterOwner::Placeholder { method },
            name: None,
        }))
    }

    /// `true` for any [`TypeSymbol::Error`]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, TypeSymbol::Error(_))
    }

    /// `true` for the structural sentinel
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, TypeSymbol::Error(ErrorType::Unsupported))
    }

    /// `true` for [`TypeSymbol::Dynamic`]
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        matches!(self, TypeSymbol::Dynamic)
    }

    /// `true` for type parameters and placeholders
    #[must_use]
    pub fn is_type_parameter(&self) -> bool {
        matches!(self, TypeSymbol::TypeParameter(_))
    }

    /// The named type, if this is one
    #[must_use]
    pub fn as_named(&self) -> Option<&NamedType> {
        match self {
            TypeSymbol::Named(named) => Some(named),
            _ => None,
        }
    }

    /// The special type of a named type, [`SpecialType::None`] for everything else
    #[must_use]
    pub fn special_type(&self) -> SpecialType {
        match self {
            TypeSymbol::Named(named) => named.definition.special,
            _ => SpecialType::None,
        }
    }

    /// `true` for `System.Object` (not `dynamic`)
    #[must_use]
    pub fn is_object(&self) -> bool {
        self.special_type() == SpecialType::Object
    }

    /// `true` for structs and enums. Type parameters are not value types here.
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        match self {
            TypeSymbol::Named(named) => named.definition.is_value_type(),
            _ => false,
        }
    }

    /// `true` for named types that were decoded as `nint`/`nuint`
    #[must_use]
    pub fn is_native_integer(&self) -> bool {
        matches!(self, TypeSymbol::Named(named) if named.native_integer)
    }
}

/// Splits a mangled metadata name like ``List`1`` into its base name and arity
#[must_use]
pub fn split_generic_arity(name: &str) -> (&str, u32) {
    if let Some((base, suffix)) = name.rsplit_once('`') {
        if let Ok(arity) = suffix.parse::<u32>() {
            if arity > 0 && !suffix.starts_with('0') {
                return (base, arity);
            }
        }
    }
    (name, 0)
}

impl fmt::Display for AnnotatedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ty)?;
        if self.nullable == NullableAnnotation::Annotated && !self.ty.is_value_type() {
            write!(f, "?")?;
        }
        Ok(())
    }
}

impl fmt::Display for TypeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSymbol::Error(ErrorType::Unsupported) => write!(f, "<unsupported>"),
            TypeSymbol::Error(ErrorType::Missing {
                namespace, name, ..
            }) => {
                if namespace.is_empty() {
                    write!(f, "<missing {name}>")
                } else {
                    write!(f, "<missing {namespace}.{name}>")
                }
            }
            TypeSymbol::Error(ErrorType::IllegalGenericInstantiation { underlying }) => {
                write!(f, "<illegal {underlying}>")
            }
            TypeSymbol::Error(ErrorType::Conflicting) => write!(f, "<conflicting>"),
            TypeSymbol::Named(named) => write!(f, "{named}"),
            TypeSymbol::Array(array) => {
                write!(f, "{}", array.element)?;
                match &array.shape {
                    ArrayShape::SingleDimensional => write!(f, "[]"),
                    ArrayShape::MultiDimensional { rank, .. } => {
                        let commas = ",".repeat((*rank).saturating_sub(1) as usize);
                        if *rank == 1 {
                            write!(f, "[*]")
                        } else {
                            write!(f, "[{commas}]")
                        }
                    }
                }
            }
            TypeSymbol::Pointer(pointer) => {
                write!(f, "{}", pointer.pointed_at)?;
                write!(f, "*")
            }
            TypeSymbol::FunctionPointer(fnptr) => {
                write!(f, "delegate*<")?;
                for param in &fnptr.params {
                    if param.ref_kind == RefKind::Ref {
                        write!(f, "ref ")?;
                    }
                    write!(f, "{}", param.ty)?;
                    write!(f, ", ")?;
                }
                if fnptr.return_param.ref_kind == RefKind::Ref {
                    write!(f, "ref ")?;
                }
                write!(f, "{}", fnptr.return_param.ty)?;
                write!(f, ">")
            }
            TypeSymbol::TypeParameter(param) => match (&param.name, param.owner) {
                (Some(name), _) => write!(f, "{name}"),
                (None, TypeParameterOwner::Placeholder { method: true }) => {
                    write!(f, "!!{}", param.ordinal)
                }
                (None, _) => write!(f, "!{}", param.ordinal),
            },
            TypeSymbol::Dynamic => write!(f, "dynamic"),
        }
    }
}

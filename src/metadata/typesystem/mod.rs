//! The symbol model decoded metadata is turned into.
//!
//! Types form immutable trees of [`TypeSymbol`] nodes shared through [`TypeRc`]. Named
//! types point at a [`NamedTypeDef`], the unconstructed definition loaded once per
//! module, which in turn loads its members lazily. Everything the decoders need to build,
//! compare and rewrite those trees lives here.
//!
//! # Key Components
//!
//! - [`TypeSymbol`] / [`AnnotatedType`] - Type tree nodes and annotated slots
//! - [`NamedTypeDef`] / [`NamedType`] - Definitions and their (possibly constructed) uses
//! - [`MethodSymbol`], [`FieldSymbol`], [`PropertySymbol`], [`EventSymbol`] - Members with
//!   lazily decoded signatures
//! - [`TypeMap`] - Type parameter substitution
//! - [`types_equal`] / [`TypeCompareKind`] - Structural comparison
//! - [`factory`] - Builders for arrays, pointers, function pointers and instantiations
//! - [`SpecialType`] - Core library types recognised by name
//!
//! # Examples
//!
//! ```rust
//! use dotimport::metadata::typesystem::{split_generic_arity, TypeSymbol};
//!
//! assert_eq!(split_generic_arity("Dictionary`2"), ("Dictionary", 2));
//! assert!(TypeSymbol::unsupported().is_unsupported());
//! ```

mod base;
mod compare;
pub mod factory;
mod members;
mod named;
mod special;
mod substitution;

pub use base::{
    split_generic_arity, AnnotatedType, ArrayShape, ArrayType, CustomModifier, ErrorType,
    FunctionPointerParam, FunctionPointerType, NullableAnnotation, PointerType, RefKind,
    TypeParameter, TypeParameterOwner, TypeRc, TypeSymbol, ELEMENT_TYPE,
};
pub use compare::{annotated_equal, modifiers_equal, types_equal, TypeCompareKind};
pub use members::{
    EventRc, EventSymbol, FieldRc, FieldSignature, FieldSymbol, MethodRc, MethodSignature,
    MethodSymbol, ParamInfo, PropertyRc, PropertySignature, PropertySymbol, Symbol,
};
pub use named::{NamedType, NamedTypeDef, NamedTypeDefRc, TypeKind};
pub use special::SpecialType;
pub use substitution::TypeMap;

//! # dotimport Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the dotimport library. Import this module to get quick access to the essential
//! types for loading metadata and decoding it into symbols.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotimport operations
pub use crate::Error;

/// The result type used throughout dotimport
pub use crate::Result;

/// Low-level blob parsing
pub use crate::Parser;

// ================================================================================================
// Loading
// ================================================================================================

/// Assemblies, modules and the options they are loaded with
pub use crate::metadata::{
    assembly::{AssemblyRc, AssemblySymbol},
    module::{ModuleRc, ModuleSymbol},
    options::{ImportOptions, LengthPolicy},
};

/// Row-level metadata access and the in-memory image
pub use crate::metadata::{
    image::{core_library_image, ImageBuilder, MetadataImage},
    reader::MetadataReader,
};

/// Metadata token type for referencing table entries
pub use crate::metadata::token::Token;

/// Metadata table identifiers
pub use crate::metadata::tables::TableId;

// ================================================================================================
// Signatures
// ================================================================================================

/// Parsed signature blobs
pub use crate::metadata::signatures::{
    SignatureField, SignatureMethod, SignatureParameter, SignatureProperty, TypeSignature,
};

// ================================================================================================
// Type System
// ================================================================================================

/// Type tree nodes and their annotations
pub use crate::metadata::typesystem::{
    AnnotatedType, ErrorType, NullableAnnotation, RefKind, SpecialType, TypeRc, TypeSymbol,
};

/// Definitions and members
pub use crate::metadata::typesystem::{
    FieldSymbol, MethodSymbol, NamedType, NamedTypeDef, NamedTypeDefRc, PropertySymbol, Symbol,
};

/// Structural comparison and substitution
pub use crate::metadata::typesystem::{types_equal, TypeCompareKind, TypeMap};

// ================================================================================================
// Decoding
// ================================================================================================

/// Signature and token decoding
pub use crate::metadata::decoder::{MetadataDecoder, MethodContext, TypeContext};

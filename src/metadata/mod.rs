//! Metadata model and decoding for .NET assemblies.
//!
//! This module contains everything between raw ECMA-335 metadata rows and the symbol graph
//! a compiler binds against: the row-level [`reader::MetadataReader`] seam, the signature
//! and custom attribute blob parsers, the symbol model and the decoder that turns one into
//! the other.
//!
//! # Key Components
//!
//! - [`assembly`] / [`module`] - Loaded assemblies, their modules and the token caches
//! - [`reader`] - Row-level access to a metadata image
//! - [`image`] - An in-memory metadata image and its builder
//! - [`signatures`] - Method, field, property and type signature blobs
//! - [`customattributes`] - Custom attribute blobs and the compiler-emitted attributes
//! - [`typesystem`] - Type and member symbols
//! - [`decoder`] - Token resolution, signature decoding and the attribute transform passes
//! - [`token`] - Metadata table row references used throughout .NET
//!
//! # Examples
//!
//! ```rust
//! use dotimport::metadata::{
//!     assembly::AssemblySymbol,
//!     image::{self, ImageBuilder},
//!     options::ImportOptions,
//!     signatures::TypeSignature,
//! };
//!
//! let corlib = AssemblySymbol::new("System.Private.CoreLib", ImportOptions::default());
//! corlib.add_module(image::core_library_image());
//!
//! let mut builder = ImageBuilder::new("App.dll");
//! builder.assembly_ref("System.Private.CoreLib");
//! let widget = builder.type_def("App", "Widget", dotimport::Token::new(0));
//! builder.simple_field(widget, "name", TypeSignature::String)?;
//!
//! let app = AssemblySymbol::new("App", ImportOptions::default());
//! let module = app.add_module(builder.build());
//! app.set_references(vec![corlib])?;
//!
//! let widget = module.lookup_top_level("App", "Widget").unwrap();
//! assert_eq!(widget.fields()[0].signature().ty.to_string(), "System.String");
//! # Ok::<(), dotimport::Error>(())
//! ```

/// Assemblies and their references
pub mod assembly;
/// Implementation of custom attribute parsing and representation
pub mod customattributes;
/// Turning tokens and signatures into symbols
pub mod decoder;
/// In-memory metadata images
pub mod image;
/// Modules and their caches
pub mod module;
/// Import options
pub mod options;
/// Row-level access to metadata tables
pub mod reader;
/// Implementation of method and type signatures
pub mod signatures;
/// Metadata table identifiers
pub mod tables;
/// Commonly used metadata token type
pub mod token;
/// Implementation of the .NET type system
pub mod typesystem;

// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![allow(clippy::too_many_arguments)]

//! # dotimport
//!
//! [![Crates.io](https://img.shields.io/crates/v/dotimport.svg)](https://crates.io/crates/dotimport)
//! [![Documentation](https://docs.rs/dotimport/badge.svg)](https://docs.rs/dotimport)
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](https://github.com/BinFlip/dotimport/blob/main/LICENSE-APACHE)
//!
//! Decodes .NET metadata into the symbol graph a compiler binds against. Tokens and
//! signature blobs become shared, immutable type trees; the attributes compilers emit to
//! carry information the CLR type system cannot express (`dynamic`, tuple element names,
//! nullable reference types, `nint`/`nuint`) are folded back into those trees.
//!
//! ## Features
//!
//! - **Token resolution** - TypeDef, TypeRef and TypeSpec tokens, across modules and assemblies
//! - **Signature decoding** - Every ECMA-335 type form, custom modifiers and by-ref slots
//! - **Transform passes** - `dynamic`, native integers, nullable annotations and named tuples
//! - **Member references** - MemberRef tokens matched against (possibly constructed) types
//! - **Lock-free caches** - Modules can be decoded from any number of threads
//! - **Never fails** - Broken or unsupported metadata decodes to a sentinel type, not an `Err`
//!
//! ## Quick Start
//!
//! ```rust
//! use dotimport::prelude::*;
//!
//! let corlib = AssemblySymbol::new("System.Private.CoreLib", ImportOptions::default());
//! corlib.add_module(core_library_image());
//!
//! let mut builder = ImageBuilder::new("App.dll");
//! builder.assembly_ref("System.Private.CoreLib");
//! let widget = builder.type_def("App", "Widget", Token::new(0));
//! let field = builder.simple_field(widget, "payload", TypeSignature::Object)?;
//! builder.dynamic_attribute(field, None);
//!
//! let app = AssemblySymbol::new("App", ImportOptions::default());
//! let module = app.add_module(builder.build());
//! app.set_references(vec![corlib])?;
//!
//! let widget = module.lookup_top_level("App", "Widget").unwrap();
//! assert_eq!(widget.fields()[0].signature().ty.to_string(), "dynamic");
//! # Ok::<(), dotimport::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`prelude`] - Convenient re-exports of commonly used types
//! - [`metadata`] - The metadata model, the symbol model and the decoder
//! - [`Error`] and [`Result`] - Errors of the raw blob and row layers
//!
//! Metadata rows reach the decoder through the [`metadata::reader::MetadataReader`] trait.
//! [`metadata::image::MetadataImage`] is the in-memory implementation used by tests and
//! tools; a PE loader plugs in the same way.
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade. Rejected attribute payloads, unresolvable
//! tokens and malformed signatures are reported at `debug`; conflicting cache publications
//! at `warn`. Install any `log` implementation to see them.

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use dotimport::prelude::*;
///
/// let corlib = AssemblySymbol::new("System.Private.CoreLib", ImportOptions::default());
/// let module = corlib.add_module(core_library_image());
/// assert!(module.lookup_top_level("System", "Object").is_some());
/// ```
pub mod prelude;

/// Definitions, decoding and symbols of CIL metadata based on ECMA-335
///
/// # Key Components
///
/// ## Loading
/// - [`metadata::assembly::AssemblySymbol`] - An assembly, its modules and references
/// - [`metadata::module::ModuleSymbol`] - One metadata image and its caches
/// - [`metadata::reader::MetadataReader`] - Row-level access to an image
///
/// ## Blobs
/// - [`metadata::signatures`] - Method, field, property and type signatures
/// - [`metadata::customattributes`] - Attribute blobs and the compiler-emitted attributes
///
/// ## Symbols
/// - [`metadata::typesystem`] - Types and members
/// - [`metadata::decoder`] - Everything that turns metadata into symbols
pub mod metadata;

/// `dotimport` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
///
/// # Examples
///
/// ```rust
/// use dotimport::{Parser, Result};
///
/// fn first_compressed(blob: &[u8]) -> Result<u32> {
///     Parser::new(blob).read_compressed_uint()
/// }
/// assert_eq!(first_compressed(&[0x81, 0x00]).unwrap(), 0x100);
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `dotimport` Error type
///
/// Reported by the blob parsers and metadata readers. Decoding itself never fails: see
/// [`metadata::decoder`] for how errors turn into sentinel types.
pub use error::Error;

pub use file::{io::CilIO, parser::Parser};
pub use metadata::token::Token;

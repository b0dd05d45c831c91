//! Byte-level access to metadata blobs.
//!
//! Signature and custom attribute blobs are read through a [`parser::Parser`], a bounds
//! checked cursor that understands the ECMA-335 compressed integer and token encodings.
//! [`io`] provides the little-endian primitive reads the parser is built on.
//!
//! # Key Components
//!
//! - [`crate::file::parser::Parser`] - Cursor over a blob
//! - [`crate::file::io::CilIO`] - Primitive types that can be read little-endian
//! - [`crate::file::io::read_le_at`] - Single read at an explicit offset

pub mod io;
pub mod parser;

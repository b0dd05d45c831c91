//! The raw metadata reader the importer is built on.
//!
//! [`MetadataReader`] is the seam between binary metadata and symbol construction. It
//! answers row-level questions (names, flags, signature blobs, attribute rows) keyed by
//! [`Token`], and knows nothing about symbols. A PE-backed reader, or the in-memory
//! [`crate::metadata::image::MetadataImage`], implement it.
//!
//! Every method is fallible. Callers in the decoding layer convert errors into sentinel
//! types instead of propagating them.

use bitflags::bitflags;

use crate::{metadata::token::Token, Result};

bitflags! {
    /// `TypeAttributes` flags of a TypeDef row (ECMA-335 II.23.1.15)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeAttributes: u32 {
        /// Visibility mask
        const VISIBILITY_MASK = 0x0000_0007;
        /// Visible outside the assembly
        const PUBLIC = 0x0000_0001;
        /// Nested and publicly visible
        const NESTED_PUBLIC = 0x0000_0002;
        /// Type is an interface
        const INTERFACE = 0x0000_0020;
        /// Type is abstract
        const ABSTRACT = 0x0000_0080;
        /// Type cannot be derived from
        const SEALED = 0x0000_0100;
        /// Name is special
        const SPECIAL_NAME = 0x0000_0400;
        /// Type is imported from COM
        const IMPORT = 0x0000_1000;
        /// Type is serializable
        const SERIALIZABLE = 0x0000_2000;
        /// Static initializer may run before first static field access
        const BEFORE_FIELD_INIT = 0x0010_0000;
    }
}

bitflags! {
    /// `MethodAttributes` flags of a MethodDef row (ECMA-335 II.23.1.10)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodAttributes: u16 {
        /// Accessibility mask
        const MEMBER_ACCESS_MASK = 0x0007;
        /// Accessible by anyone
        const PUBLIC = 0x0006;
        /// Defined on the type rather than per instance
        const STATIC = 0x0010;
        /// Cannot be overridden
        const FINAL = 0x0020;
        /// Virtual method
        const VIRTUAL = 0x0040;
        /// Hides by name and signature
        const HIDE_BY_SIG = 0x0080;
        /// Abstract method
        const ABSTRACT = 0x0400;
        /// Name is special
        const SPECIAL_NAME = 0x0800;
        /// Name is special to the runtime
        const RT_SPECIAL_NAME = 0x1000;
    }
}

bitflags! {
    /// `FieldAttributes` flags of a Field row (ECMA-335 II.23.1.5)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldAttributes: u16 {
        /// Accessibility mask
        const FIELD_ACCESS_MASK = 0x0007;
        /// Accessible by anyone
        const PUBLIC = 0x0006;
        /// Defined on the type rather than per instance
        const STATIC = 0x0010;
        /// Can only be initialized
        const INIT_ONLY = 0x0020;
        /// Compile-time constant
        const LITERAL = 0x0040;
        /// Name is special
        const SPECIAL_NAME = 0x0200;
    }
}

/// A TypeDef row
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefRow {
    /// Namespace, empty for nested types
    pub namespace: String,
    /// Metadata name, including any generic arity suffix
    pub name: String,
    /// Type flags
    pub flags: TypeAttributes,
    /// Base type (`TypeDefOrRefOrSpec`), nil for interfaces and `System.Object`
    pub extends: Token,
    /// Enclosing TypeDef for nested types
    pub enclosing: Option<Token>,
}

/// A TypeRef row
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRefRow {
    /// Namespace of the referenced type
    pub namespace: String,
    /// Metadata name of the referenced type
    pub name: String,
    /// Module, ModuleRef, AssemblyRef or TypeRef the type lives in
    pub resolution_scope: Token,
}

/// A GenericParam row
#[derive(Debug, Clone, PartialEq)]
pub struct GenericParamRow {
    /// Zero-based position in the owner's parameter list
    pub number: u32,
    /// Parameter name
    pub name: String,
}

/// A Param row
#[derive(Debug, Clone, PartialEq)]
pub struct ParamRow {
    /// 0 for the return slot, otherwise the 1-based parameter position
    pub sequence: u32,
    /// Parameter name
    pub name: String,
    /// The row's own token, which hosts the parameter's attributes
    pub token: Token,
}

/// A MethodDef row
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDefRow {
    /// Method name
    pub name: String,
    /// Method flags
    pub flags: MethodAttributes,
    /// `MethodDefSig` blob
    pub signature: Vec<u8>,
    /// Param rows, in sequence order
    pub params: Vec<ParamRow>,
}

/// A Field row
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRow {
    /// Field name
    pub name: String,
    /// Field flags
    pub flags: FieldAttributes,
    /// `FieldSig` blob
    pub signature: Vec<u8>,
}

/// A Property row
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRow {
    /// Property name
    pub name: String,
    /// `PropertySig` blob
    pub signature: Vec<u8>,
}

/// An Event row
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    /// Event name
    pub name: String,
    /// Delegate type of the event (`TypeDefOrRefOrSpec`)
    pub event_type: Token,
}

/// An InterfaceImpl row
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceImplRow {
    /// The row's own token, which hosts attributes on the interface reference
    pub token: Token,
    /// The implemented interface (`TypeDefOrRefOrSpec`)
    pub interface: Token,
}

/// A MemberRef row
#[derive(Debug, Clone, PartialEq)]
pub struct MemberRefRow {
    /// TypeDef, TypeRef, TypeSpec, ModuleRef or MethodDef the member belongs to
    pub parent: Token,
    /// Member name
    pub name: String,
    /// `MethodRefSig` or `FieldSig` blob
    pub signature: Vec<u8>,
}

/// A CustomAttribute row with its constructor already resolved to a type name and signature
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttributeRow {
    /// Namespace of the attribute type
    pub namespace: String,
    /// Name of the attribute type
    pub name: String,
    /// `MethodDefSig` blob of the constructor
    pub constructor_signature: Vec<u8>,
    /// Value blob
    pub value: Vec<u8>,
}

/// Row-level access to one module's metadata.
///
/// Tokens passed in are validated by the implementation. A token that names a missing row
/// yields [`crate::Error::TypeNotFound`], a token of the wrong table yields
/// [`crate::Error::UnexpectedToken`].
pub trait MetadataReader: Send + Sync {
    /// Name of the module (the `Module` row)
    fn module_name(&self) -> &str;

    /// Number of TypeDef rows, the first being the `<Module>` type
    fn type_def_count(&self) -> u32;

    /// Reads a TypeDef row
    ///
    /// # Errors
    /// Returns an error if the token does not name a TypeDef row.
    fn type_def(&self, token: Token) -> Result<TypeDefRow>;

    /// TypeDef tokens of the types directly nested in `token`
    ///
    /// # Errors
    /// Returns an error if the token does not name a TypeDef row.
    fn nested_types(&self, token: Token) -> Result<Vec<Token>>;

    /// Reads a TypeRef row
    ///
    /// # Errors
    /// Returns an error if the token does not name a TypeRef row.
    fn type_ref(&self, token: Token) -> Result<TypeRefRow>;

    /// Returns the signature blob of a TypeSpec row
    ///
    /// # Errors
    /// Returns an error if the token does not name a TypeSpec row.
    fn type_spec(&self, token: Token) -> Result<&[u8]>;

    /// Name of the assembly an AssemblyRef row refers to
    ///
    /// # Errors
    /// Returns an error if the token does not name an AssemblyRef row.
    fn assembly_ref(&self, token: Token) -> Result<String>;

    /// Name of the module a ModuleRef row refers to
    ///
    /// # Errors
    /// Returns an error if the token does not name a ModuleRef row.
    fn module_ref(&self, token: Token) -> Result<String>;

    /// GenericParam rows owned by a TypeDef or MethodDef, ordered by number
    ///
    /// # Errors
    /// Returns an error if the owner token is invalid.
    fn generic_params(&self, owner: Token) -> Result<Vec<GenericParamRow>>;

    /// MethodDef tokens of a type, in table order
    ///
    /// # Errors
    /// Returns an error if the token does not name a TypeDef row.
    fn methods(&self, type_def: Token) -> Result<Vec<Token>>;

    /// Reads a MethodDef row
    ///
    /// # Errors
    /// Returns an error if the token does not name a MethodDef row.
    fn method_def(&self, token: Token) -> Result<MethodDefRow>;

    /// Field tokens of a type, in table order
    ///
    /// # Errors
    /// Returns an error if the token does not name a TypeDef row.
    fn fields(&self, type_def: Token) -> Result<Vec<Token>>;

    /// Reads a Field row
    ///
    /// # Errors
    /// Returns an error if the token does not name a Field row.
    fn field(&self, token: Token) -> Result<FieldRow>;

    /// Property tokens of a type, in table order
    ///
    /// # Errors
    /// Returns an error if the token does not name a TypeDef row.
    fn properties(&self, type_def: Token) -> Result<Vec<Token>>;

    /// Reads a Property row
    ///
    /// # Errors
    /// Returns an error if the token does not name a Property row.
    fn property(&self, token: Token) -> Result<PropertyRow>;

    /// Event tokens of a type, in table order
    ///
    /// # Errors
    /// Returns an error if the token does not name a TypeDef row.
    fn events(&self, type_def: Token) -> Result<Vec<Token>>;

    /// Reads an Event row
    ///
    /// # Errors
    /// Returns an error if the token does not name an Event row.
    fn event(&self, token: Token) -> Result<EventRow>;

    /// InterfaceImpl rows of a type
    ///
    /// # Errors
    /// Returns an error if the token does not name a TypeDef row.
    fn interface_impls(&self, type_def: Token) -> Result<Vec<InterfaceImplRow>>;

    /// Reads a MemberRef row
    ///
    /// # Errors
    /// Returns an error if the token does not name a MemberRef row.
    fn member_ref(&self, token: Token) -> Result<MemberRefRow>;

    /// Custom attributes attached to any row
    ///
    /// # Errors
    /// Returns an error if the attribute rows cannot be read.
    fn custom_attributes(&self, owner: Token) -> Result<Vec<CustomAttributeRow>>;
}

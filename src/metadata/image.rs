//! In-memory metadata images.
//!
//! [`MetadataImage`] implements [`MetadataReader`] over plain row vectors, and
//! [`ImageBuilder`] assembles one row at a time, handing back the token of every row it
//! adds. Tokens follow the usual layout: TypeDef row 1 is the `<Module>` type, and rows
//! are numbered in the order they are added.
//!
//! # Examples
//!
//! ```rust
//! use dotimport::metadata::{image::ImageBuilder, reader::MetadataReader};
//! use dotimport::Token;
//!
//! let mut builder = ImageBuilder::new("Sample.dll");
//! let widget = builder.type_def("Sample", "Widget", Token::new(0));
//! let image = builder.build();
//!
//! assert_eq!(image.type_def_count(), 2);
//! assert_eq!(image.type_def(widget)?.name, "Widget");
//! # Ok::<(), dotimport::Error>(())
//! ```

use crate::{
    metadata::{
        customattributes::{
            encode_bool_array, encode_byte, encode_byte_array, encode_no_args,
            encode_string_array, encode_strings, AttributeDescription,
        },
        reader::{
            CustomAttributeRow, EventRow, FieldAttributes, FieldRow, GenericParamRow,
            InterfaceImplRow, MemberRefRow, MetadataReader, MethodAttributes, MethodDefRow,
            ParamRow, PropertyRow, TypeAttributes, TypeDefRow, TypeRefRow,
        },
        signatures::{
            encode_field_signature, encode_method_signature, encode_property_signature,
            encode_typespec_signature, SignatureField, SignatureMethod, SignatureParameter,
            SignatureProperty, SignatureTypeSpec, TypeSignature,
        },
        tables::TableId,
        token::Token,
    },
    Error, Result,
};

#[derive(Debug, Clone)]
struct TypeDefEntry {
    row: TypeDefRow,
    nested: Vec<Token>,
    methods: Vec<Token>,
    fields: Vec<Token>,
    properties: Vec<Token>,
    events: Vec<Token>,
}

/// An in-memory metadata module
#[derive(Debug, Clone)]
pub struct MetadataImage {
    name: String,
    type_defs: Vec<TypeDefEntry>,
    type_refs: Vec<TypeRefRow>,
    type_specs: Vec<Vec<u8>>,
    assembly_refs: Vec<String>,
    module_refs: Vec<String>,
    methods: Vec<MethodDefRow>,
    fields: Vec<FieldRow>,
    properties: Vec<PropertyRow>,
    events: Vec<EventRow>,
    interface_impls: Vec<(Token, InterfaceImplRow)>,
    member_refs: Vec<MemberRefRow>,
    generic_params: Vec<(Token, GenericParamRow)>,
    custom_attributes: Vec<(Token, CustomAttributeRow)>,
}

fn row_of<T>(rows: &[T], token: Token, table: TableId) -> Result<&T> {
    if !token.is_table(table) {
        return Err(Error::UnexpectedToken(token));
    }

    (token.row() as usize)
        .checked_sub(1)
        .and_then(|index| rows.get(index))
        .ok_or(Error::TypeNotFound(token))
}

fn row_of_mut<T>(rows: &mut [T], token: Token, table: TableId) -> Option<&mut T> {
    if !token.is_table(table) {
        return None;
    }

    (token.row() as usize)
        .checked_sub(1)
        .and_then(|index| rows.get_mut(index))
}

impl MetadataImage {
    fn type_entry(&self, token: Token) -> Result<&TypeDefEntry> {
        row_of(&self.type_defs, token, TableId::TypeDef)
    }
}

impl MetadataReader for MetadataImage {
    fn module_name(&self) -> &str {
        &self.name
    }

    fn type_def_count(&self) -> u32 {
        self.type_defs.len() as u32
    }

    fn type_def(&self, token: Token) -> Result<TypeDefRow> {
        Ok(self.type_entry(token)?.row.clone())
    }

    fn nested_types(&self, token: Token) -> Result<Vec<Token>> {
        Ok(self.type_entry(token)?.nested.clone())
    }

    fn type_ref(&self, token: Token) -> Result<TypeRefRow> {
        row_of(&self.type_refs, token, TableId::TypeRef).cloned()
    }

    fn type_spec(&self, token: Token) -> Result<&[u8]> {
        row_of(&self.type_specs, token, TableId::TypeSpec).map(Vec::as_slice)
    }

    fn assembly_ref(&self, token: Token) -> Result<String> {
        row_of(&self.assembly_refs, token, TableId::AssemblyRef).cloned()
    }

    fn module_ref(&self, token: Token) -> Result<String> {
        row_of(&self.module_refs, token, TableId::ModuleRef).cloned()
    }

    fn generic_params(&self, owner: Token) -> Result<Vec<GenericParamRow>> {
        if !owner.is_table(TableId::TypeDef) && !owner.is_table(TableId::MethodDef) {
            return Err(Error::UnexpectedToken(owner));
        }

        let mut params: Vec<GenericParamRow> = self
            .generic_params
            .iter()
            .filter(|(param_owner, _)| *param_owner == owner)
            .map(|(_, row)| row.clone())
            .collect();
        params.sort_by_key(|row| row.number);
        Ok(params)
    }

    fn methods(&self, type_def: Token) -> Result<Vec<Token>> {
        Ok(self.type_entry(type_def)?.methods.clone())
    }

    fn method_def(&self, token: Token) -> Result<MethodDefRow> {
        row_of(&self.methods, token, TableId::MethodDef).cloned()
    }

    fn fields(&self, type_def: Token) -> Result<Vec<Token>> {
        Ok(self.type_entry(type_def)?.fields.clone())
    }

    fn field(&self, token: Token) -> Result<FieldRow> {
        row_of(&self.fields, token, TableId::Field).cloned()
    }

    fn properties(&self, type_def: Token) -> Result<Vec<Token>> {
        Ok(self.type_entry(type_def)?.properties.clone())
    }

    fn property(&self, token: Token) -> Result<PropertyRow> {
        row_of(&self.properties, token, TableId::Property).cloned()
    }

    fn events(&self, type_def: Token) -> Result<Vec<Token>> {
        Ok(self.type_entry(type_def)?.events.clone())
    }

    fn event(&self, token: Token) -> Result<EventRow> {
        row_of(&self.events, token, TableId::Event).cloned()
    }

    fn interface_impls(&self, type_def: Token) -> Result<Vec<InterfaceImplRow>> {
        self.type_entry(type_def)?;
        Ok(self
            .interface_impls
            .iter()
            .filter(|(owner, _)| *owner == type_def)
            .map(|(_, row)| row.clone())
            .collect())
    }

    fn member_ref(&self, token: Token) -> Result<MemberRefRow> {
        row_of(&self.member_refs, token, TableId::MemberRef).cloned()
    }

    fn custom_attributes(&self, owner: Token) -> Result<Vec<CustomAttributeRow>> {
        Ok(self
            .custom_attributes
            .iter()
            .filter(|(host, _)| *host == owner)
            .map(|(_, row)| row.clone())
            .collect())
    }
}

/// Builds a [`MetadataImage`] row by row.
///
/// Row-adding methods return the new row's token. Methods that encode a signature return
/// `Result`, since encoding can fail on out-of-range compressed values. Rows that name an
/// owner which does not exist are still added, but are not listed under any type.
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    image: MetadataImage,
}

impl ImageBuilder {
    /// Starts an image for module `name`, with the `<Module>` type at TypeDef row 1
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut builder = ImageBuilder {
            image: MetadataImage {
                name: name.to_string(),
                type_defs: Vec::new(),
                type_refs: Vec::new(),
                type_specs: Vec::new(),
                assembly_refs: Vec::new(),
                module_refs: Vec::new(),
                methods: Vec::new(),
                fields: Vec::new(),
                properties: Vec::new(),
                events: Vec::new(),
                interface_impls: Vec::new(),
                member_refs: Vec::new(),
                generic_params: Vec::new(),
                custom_attributes: Vec::new(),
            },
        };
        builder.push_type_def("", "<Module>", TypeAttributes::empty(), Token::new(0), None);
        builder
    }

    /// The `Module` resolution scope, for type references into this module
    #[must_use]
    pub fn module_scope() -> Token {
        Token::from_parts(TableId::Module, 1)
    }

    /// The `<Module>` type holding global members
    #[must_use]
    pub fn module_type() -> Token {
        Token::from_parts(TableId::TypeDef, 1)
    }

    fn push_type_def(
        &mut self,
        namespace: &str,
        name: &str,
        flags: TypeAttributes,
        extends: Token,
        enclosing: Option<Token>,
    ) -> Token {
        self.image.type_defs.push(TypeDefEntry {
            row: TypeDefRow {
                namespace: namespace.to_string(),
                name: name.to_string(),
                flags,
                extends,
                enclosing,
            },
            nested: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
        });
        let token = Token::from_parts(TableId::TypeDef, self.image.type_defs.len() as u32);

        if let Some(enclosing) = enclosing {
            if let Some(entry) = row_of_mut(&mut self.image.type_defs, enclosing, TableId::TypeDef)
            {
                entry.nested.push(token);
            }
        }
        token
    }

    /// Adds a public top-level type
    pub fn type_def(&mut self, namespace: &str, name: &str, extends: Token) -> Token {
        self.push_type_def(namespace, name, TypeAttributes::PUBLIC, extends, None)
    }

    /// Adds a top-level type with explicit flags
    pub fn type_def_with_flags(
        &mut self,
        namespace: &str,
        name: &str,
        flags: TypeAttributes,
        extends: Token,
    ) -> Token {
        self.push_type_def(namespace, name, flags, extends, None)
    }

    /// Adds a public top-level interface
    pub fn interface_def(&mut self, namespace: &str, name: &str) -> Token {
        self.push_type_def(
            namespace,
            name,
            TypeAttributes::PUBLIC | TypeAttributes::INTERFACE | TypeAttributes::ABSTRACT,
            Token::new(0),
            None,
        )
    }

    /// Adds a public type nested in `enclosing`
    pub fn nested_type_def(&mut self, enclosing: Token, name: &str, extends: Token) -> Token {
        self.push_type_def("", name, TypeAttributes::NESTED_PUBLIC, extends, Some(enclosing))
    }

    /// Adds a nested type with explicit flags
    pub fn nested_type_def_with_flags(
        &mut self,
        enclosing: Token,
        name: &str,
        flags: TypeAttributes,
        extends: Token,
    ) -> Token {
        self.push_type_def("", name, flags, extends, Some(enclosing))
    }

    /// Adds a TypeRef resolved through `resolution_scope`
    pub fn type_ref(&mut self, resolution_scope: Token, namespace: &str, name: &str) -> Token {
        self.image.type_refs.push(TypeRefRow {
            namespace: namespace.to_string(),
            name: name.to_string(),
            resolution_scope,
        });
        Token::from_parts(TableId::TypeRef, self.image.type_refs.len() as u32)
    }

    /// Adds a TypeSpec with a raw signature blob
    pub fn type_spec_blob(&mut self, blob: Vec<u8>) -> Token {
        self.image.type_specs.push(blob);
        Token::from_parts(TableId::TypeSpec, self.image.type_specs.len() as u32)
    }

    /// Adds a TypeSpec for `signature`
    ///
    /// # Errors
    /// Returns an error if the signature cannot be encoded.
    pub fn type_spec(&mut self, signature: &TypeSignature) -> Result<Token> {
        let blob = encode_typespec_signature(&SignatureTypeSpec {
            base: signature.clone(),
        })?;
        Ok(self.type_spec_blob(blob))
    }

    /// Adds an AssemblyRef. References are numbered in the order they are added, which is
    /// the order an assembly's references must be supplied in.
    pub fn assembly_ref(&mut self, name: &str) -> Token {
        self.image.assembly_refs.push(name.to_string());
        Token::from_parts(TableId::AssemblyRef, self.image.assembly_refs.len() as u32)
    }

    /// Adds a ModuleRef
    pub fn module_ref(&mut self, name: &str) -> Token {
        self.image.module_refs.push(name.to_string());
        Token::from_parts(TableId::ModuleRef, self.image.module_refs.len() as u32)
    }

    /// Adds a method with a raw signature blob to `owner`
    pub fn method_blob(
        &mut self,
        owner: Token,
        name: &str,
        flags: MethodAttributes,
        signature: Vec<u8>,
    ) -> Token {
        self.image.methods.push(MethodDefRow {
            name: name.to_string(),
            flags,
            signature,
            params: Vec::new(),
        });
        let token = Token::from_parts(TableId::MethodDef, self.image.methods.len() as u32);
        if let Some(entry) = row_of_mut(&mut self.image.type_defs, owner, TableId::TypeDef) {
            entry.methods.push(token);
        }
        token
    }

    /// Adds a method to `owner`
    ///
    /// # Errors
    /// Returns an error if the signature cannot be encoded.
    pub fn method(
        &mut self,
        owner: Token,
        name: &str,
        flags: MethodAttributes,
        signature: &SignatureMethod,
    ) -> Result<Token> {
        let blob = encode_method_signature(signature)?;
        Ok(self.method_blob(owner, name, flags, blob))
    }

    /// Adds a Param row to `method`. Sequence 0 is the return slot.
    pub fn param(&mut self, method: Token, sequence: u32, name: &str) -> Token {
        let rows = self
            .image
            .methods
            .iter()
            .map(|method| method.params.len())
            .sum::<usize>();
        let token = Token::from_parts(TableId::Param, rows as u32 + 1);

        if let Some(row) = row_of_mut(&mut self.image.methods, method, TableId::MethodDef) {
            row.params.push(ParamRow {
                sequence,
                name: name.to_string(),
                token,
            });
            row.params.sort_by_key(|param| param.sequence);
        }
        token
    }

    /// Adds a field with a raw signature blob to `owner`
    pub fn field_blob(
        &mut self,
        owner: Token,
        name: &str,
        flags: FieldAttributes,
        signature: Vec<u8>,
    ) -> Token {
        self.image.fields.push(FieldRow {
            name: name.to_string(),
            flags,
            signature,
        });
        let token = Token::from_parts(TableId::Field, self.image.fields.len() as u32);
        if let Some(entry) = row_of_mut(&mut self.image.type_defs, owner, TableId::TypeDef) {
            entry.fields.push(token);
        }
        token
    }

    /// Adds a field to `owner`
    ///
    /// # Errors
    /// Returns an error if the signature cannot be encoded.
    pub fn field(
        &mut self,
        owner: Token,
        name: &str,
        flags: FieldAttributes,
        signature: &SignatureField,
    ) -> Result<Token> {
        let blob = encode_field_signature(signature)?;
        Ok(self.field_blob(owner, name, flags, blob))
    }

    /// Adds a public instance field of type `ty`
    ///
    /// # Errors
    /// Returns an error if the signature cannot be encoded.
    pub fn simple_field(&mut self, owner: Token, name: &str, ty: TypeSignature) -> Result<Token> {
        self.field(
            owner,
            name,
            FieldAttributes::PUBLIC,
            &SignatureField {
                base: ty,
                ..SignatureField::default()
            },
        )
    }

    /// Adds a property to `owner`
    ///
    /// # Errors
    /// Returns an error if the signature cannot be encoded.
    pub fn property(
        &mut self,
        owner: Token,
        name: &str,
        signature: &SignatureProperty,
    ) -> Result<Token> {
        let blob = encode_property_signature(signature)?;
        self.image.properties.push(PropertyRow {
            name: name.to_string(),
            signature: blob,
        });
        let token = Token::from_parts(TableId::Property, self.image.properties.len() as u32);
        if let Some(entry) = row_of_mut(&mut self.image.type_defs, owner, TableId::TypeDef) {
            entry.properties.push(token);
        }
        Ok(token)
    }

    /// Adds an event of delegate type `event_type` to `owner`
    pub fn event(&mut self, owner: Token, name: &str, event_type: Token) -> Token {
        self.image.events.push(EventRow {
            name: name.to_string(),
            event_type,
        });
        let token = Token::from_parts(TableId::Event, self.image.events.len() as u32);
        if let Some(entry) = row_of_mut(&mut self.image.type_defs, owner, TableId::TypeDef) {
            entry.events.push(token);
        }
        token
    }

    /// Records that `owner` implements `interface`
    pub fn interface_impl(&mut self, owner: Token, interface: Token) -> Token {
        let token = Token::from_parts(
            TableId::InterfaceImpl,
            self.image.interface_impls.len() as u32 + 1,
        );
        self.image
            .interface_impls
            .push((owner, InterfaceImplRow { token, interface }));
        token
    }

    /// Adds a MemberRef with a raw signature blob
    pub fn member_ref(&mut self, parent: Token, name: &str, signature: Vec<u8>) -> Token {
        self.image.member_refs.push(MemberRefRow {
            parent,
            name: name.to_string(),
            signature,
        });
        Token::from_parts(TableId::MemberRef, self.image.member_refs.len() as u32)
    }

    /// Adds a MemberRef to a method
    ///
    /// # Errors
    /// Returns an error if the signature cannot be encoded.
    pub fn method_ref(
        &mut self,
        parent: Token,
        name: &str,
        signature: &SignatureMethod,
    ) -> Result<Token> {
        let blob = encode_method_signature(signature)?;
        Ok(self.member_ref(parent, name, blob))
    }

    /// Adds a MemberRef to a field
    ///
    /// # Errors
    /// Returns an error if the signature cannot be encoded.
    pub fn field_ref(
        &mut self,
        parent: Token,
        name: &str,
        signature: &SignatureField,
    ) -> Result<Token> {
        let blob = encode_field_signature(signature)?;
        Ok(self.member_ref(parent, name, blob))
    }

    /// Declares the next generic parameter of a TypeDef or MethodDef.
    ///
    /// A nested type re-declares the parameters of its containers first, as compilers
    /// emit them.
    pub fn generic_param(&mut self, owner: Token, name: &str) -> Token {
        let number = self
            .image
            .generic_params
            .iter()
            .filter(|(param_owner, _)| *param_owner == owner)
            .count() as u32;
        self.image.generic_params.push((
            owner,
            GenericParamRow {
                number,
                name: name.to_string(),
            },
        ));
        Token::from_parts(TableId::GenericParam, self.image.generic_params.len() as u32)
    }

    /// Attaches an attribute described by `description`, using constructor `overload` and
    /// the given value blob
    pub fn custom_attribute(
        &mut self,
        host: Token,
        description: &AttributeDescription,
        overload: usize,
        value: Vec<u8>,
    ) {
        let constructor_signature = description
            .signatures
            .get(overload)
            .map(|signature| signature.to_vec())
            .unwrap_or_default();

        self.image.custom_attributes.push((
            host,
            CustomAttributeRow {
                namespace: description.namespace.to_string(),
                name: description.name.to_string(),
                constructor_signature,
                value,
            },
        ));
    }

    fn flags_attribute(
        &mut self,
        host: Token,
        description: &AttributeDescription,
        flags: Option<&[bool]>,
    ) {
        match flags {
            None => self.custom_attribute(host, description, 0, encode_no_args()),
            Some(flags) => self.custom_attribute(host, description, 1, encode_bool_array(flags)),
        }
    }

    /// `DynamicAttribute()` for `None`, `DynamicAttribute(bool[])` otherwise
    pub fn dynamic_attribute(&mut self, host: Token, flags: Option<&[bool]>) {
        self.flags_attribute(host, &AttributeDescription::DYNAMIC, flags);
    }

    /// `NativeIntegerAttribute()` for `None`, `NativeIntegerAttribute(bool[])` otherwise
    pub fn native_integer_attribute(&mut self, host: Token, flags: Option<&[bool]>) {
        self.flags_attribute(host, &AttributeDescription::NATIVE_INTEGER, flags);
    }

    /// `TupleElementNamesAttribute(string[])`
    ///
    /// # Errors
    /// Returns an error if a name is too long to encode.
    pub fn tuple_element_names_attribute(
        &mut self,
        host: Token,
        names: &[Option<&str>],
    ) -> Result<()> {
        let value = encode_string_array(names)?;
        self.custom_attribute(host, &AttributeDescription::TUPLE_ELEMENT_NAMES, 0, value);
        Ok(())
    }

    /// `NullableAttribute(byte[])`
    pub fn nullable_attribute(&mut self, host: Token, flags: &[u8]) {
        self.custom_attribute(
            host,
            &AttributeDescription::NULLABLE,
            1,
            encode_byte_array(flags),
        );
    }

    /// `NullableAttribute(byte)`, the annotation applied to every slot
    pub fn nullable_default_attribute(&mut self, host: Token, flag: u8) {
        self.custom_attribute(host, &AttributeDescription::NULLABLE, 0, encode_byte(flag));
    }

    /// `NullableContextAttribute(byte)`
    pub fn nullable_context_attribute(&mut self, host: Token, flag: u8) {
        self.custom_attribute(
            host,
            &AttributeDescription::NULLABLE_CONTEXT,
            0,
            encode_byte(flag),
        );
    }

    /// `TypeIdentifierAttribute()`, marking `host` as an embedded interop type
    pub fn type_identifier_attribute(&mut self, host: Token) {
        self.custom_attribute(
            host,
            &AttributeDescription::TYPE_IDENTIFIER,
            0,
            encode_no_args(),
        );
    }

    /// `GuidAttribute(string)`
    ///
    /// # Errors
    /// Returns an error if the string is too long to encode.
    pub fn guid_attribute(&mut self, host: Token, guid: &str) -> Result<()> {
        let value = encode_strings(&[Some(guid)])?;
        self.custom_attribute(host, &AttributeDescription::GUID, 0, value);
        Ok(())
    }

    /// Finishes the image
    #[must_use]
    pub fn build(self) -> MetadataImage {
        self.image
    }
}

const PRIMITIVES: &[&str] = &[
    "Void", "Boolean", "Char", "SByte", "Byte", "Int16", "UInt16", "Int32", "UInt32", "Int64",
    "UInt64", "Single", "Double", "IntPtr", "UIntPtr", "TypedReference",
];

/// A builder pre-populated with a minimal core library.
///
/// It defines `System.Object`, `ValueType`, `Enum`, `MulticastDelegate`, `String`, the
/// primitive value types, ``Nullable`1`` and ``ValueTuple`1`` to ``ValueTuple`8``. Callers
/// may add further rows before building.
#[must_use]
pub fn core_library_builder() -> ImageBuilder {
    let mut builder = ImageBuilder::new("System.Private.CoreLib.dll");
    let nil = Token::new(0);
    let sealed = TypeAttributes::PUBLIC | TypeAttributes::SEALED;

    let object = builder.type_def("System", "Object", nil);
    let value_type = builder.type_def_with_flags(
        "System",
        "ValueType",
        TypeAttributes::PUBLIC | TypeAttributes::ABSTRACT,
        object,
    );
    builder.type_def_with_flags(
        "System",
        "Enum",
        TypeAttributes::PUBLIC | TypeAttributes::ABSTRACT,
        value_type,
    );
    builder.type_def_with_flags(
        "System",
        "MulticastDelegate",
        TypeAttributes::PUBLIC | TypeAttributes::ABSTRACT,
        object,
    );
    builder.type_def_with_flags("System", "String", sealed, object);

    for name in PRIMITIVES {
        builder.type_def_with_flags("System", name, sealed, value_type);
    }

    let nullable = builder.type_def_with_flags("System", "Nullable`1", sealed, value_type);
    builder.generic_param(nullable, "T");

    for arity in 1..=8u32 {
        let tuple = builder.type_def_with_flags(
            "System",
            &format!("ValueTuple`{arity}"),
            TypeAttributes::PUBLIC | TypeAttributes::SERIALIZABLE,
            value_type,
        );
        for position in 1..=arity {
            let name = if position == 8 {
                "TRest".to_string()
            } else {
                format!("T{position}")
            };
            builder.generic_param(tuple, &name);
        }
    }

    builder
}

/// A minimal core library image, see [`core_library_builder`]
#[must_use]
pub fn core_library_image() -> MetadataImage {
    core_library_builder().build()
}

/// Builds a method signature blob description: instance method with the given return
/// and parameter types and no modifiers
#[must_use]
pub fn instance_method(return_type: TypeSignature, params: Vec<TypeSignature>) -> SignatureMethod {
    SignatureMethod {
        header: 0x20,
        param_count_generic: 0,
        return_type: SignatureParameter::from(return_type),
        params: params.into_iter().map(SignatureParameter::from).collect(),
        varargs: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_and_tokens() -> Result<()> {
        let mut builder = ImageBuilder::new("Test.dll");
        let outer = builder.type_def("N", "Outer", Token::new(0));
        let inner = builder.nested_type_def(outer, "Inner", Token::new(0));
        let method = builder.method(
            outer,
            "M",
            MethodAttributes::PUBLIC,
            &instance_method(TypeSignature::Void, vec![TypeSignature::I4]),
        )?;
        let param = builder.param(method, 1, "x");
        let field = builder.simple_field(inner, "f", TypeSignature::String)?;
        let image = builder.build();

        assert_eq!(outer, Token::new(0x0200_0002));
        assert_eq!(inner, Token::new(0x0200_0003));
        assert_eq!(image.type_def_count(), 3);
        assert_eq!(image.type_def(Token::new(0x0200_0001))?.name, "<Module>");
        assert_eq!(image.nested_types(outer)?, vec![inner]);
        assert_eq!(image.type_def(inner)?.enclosing, Some(outer));
        assert_eq!(image.methods(outer)?, vec![method]);
        assert_eq!(image.method_def(method)?.params[0].token, param);
        assert_eq!(image.fields(inner)?, vec![field]);
        assert_eq!(image.field(field)?.signature, vec![0x06, 0x0E]);
        Ok(())
    }

    #[test]
    fn test_invalid_tokens() {
        let image = ImageBuilder::new("Test.dll").build();
        assert!(matches!(
            image.type_def(Token::new(0x0200_0009)),
            Err(Error::TypeNotFound(_))
        ));
        assert!(matches!(
            image.type_def(Token::new(0x0100_0001)),
            Err(Error::UnexpectedToken(_))
        ));
        assert!(matches!(
            image.type_ref(Token::new(0x0100_0000)),
            Err(Error::TypeNotFound(_))
        ));
        assert!(image.generic_params(Token::new(0x0A00_0001)).is_err());
    }

    #[test]
    fn test_generic_params_are_numbered() -> Result<()> {
        let mut builder = ImageBuilder::new("Test.dll");
        let ty = builder.type_def("N", "Pair`2", Token::new(0));
        builder.generic_param(ty, "A");
        builder.generic_param(ty, "B");
        let image = builder.build();

        let params = image.generic_params(ty)?;
        assert_eq!(params.len(), 2);
        assert_eq!(params[1].number, 1);
        assert_eq!(params[1].name, "B");
        Ok(())
    }

    #[test]
    fn test_core_library() -> Result<()> {
        let image = core_library_image();
        let names: Vec<String> = (2..=image.type_def_count())
            .map(|row| image.type_def(Token::from_parts(TableId::TypeDef, row)))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .map(|row| row.name)
            .collect();

        for expected in ["Object", "ValueType", "Enum", "String", "IntPtr", "Nullable`1", "ValueTuple`8"] {
            assert!(names.iter().any(|name| name == expected), "{expected} missing");
        }
        Ok(())
    }
}

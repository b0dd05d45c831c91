//! Turns metadata tokens and signature blobs into symbols.
//!
//! [`MetadataDecoder`] resolves TypeDef, TypeRef and TypeSpec tokens of one module and
//! decodes parsed signatures into [`TypeRc`] trees, using the module's caches so that a
//! token resolves to the same symbol on every call and every thread. Member signatures are
//! then run through the transform passes, in this order:
//!
//! 1. `dynamic` restoration ([`apply_dynamic_transform`])
//! 2. native integers ([`apply_native_integer_transform`])
//! 3. nullable annotations ([`apply_nullable_transform`])
//! 4. tuple element names ([`decode_tuple_names`])
//!
//! Content the symbol model cannot represent never fails a decode: it becomes the
//! unsupported sentinel ([`TypeSymbol::unsupported`]), either for the whole slot or for the
//! smallest enclosing node. Tokens that point at types nobody defines become `Missing`.
//!
//! # Examples
//!
//! ```rust
//! use dotimport::metadata::{
//!     assembly::AssemblySymbol, image, options::ImportOptions, signatures::TypeSignature,
//! };
//!
//! let corlib = AssemblySymbol::new("System.Private.CoreLib", ImportOptions::default());
//! let module = corlib.add_module(image::core_library_image());
//!
//! let decoder = module.decoder();
//! let ty = decoder.decode_type(&TypeSignature::SzArray(Default::default()));
//! assert!(ty.is_unsupported());
//!
//! let string = decoder.decode_type(&TypeSignature::String);
//! assert_eq!(string.to_string(), "System.String");
//! ```

mod context;
mod cursor;
mod dynamic;
mod memberref;
mod nativeint;
mod nullable;
mod signature;
mod tuple;

use std::{cell::Cell, sync::Arc};

use dashmap::DashMap;

pub use context::{MethodContext, TypeContext};
pub use dynamic::{apply_dynamic_transform, transform_local_type};
pub use memberref::find_member;
pub use nativeint::apply_native_integer_transform;
pub use nullable::{apply_nullable_transform, NullableBytes};
pub use tuple::decode_tuple_names;

/// Transforms driven by explicit flag values instead of attribute lookups
pub mod flags {
    pub use super::dynamic::transform_with_flags as apply_dynamic_flags;
    pub use super::nativeint::transform_with_flags as apply_native_integer_flags;
    pub use super::nullable::transform_with_bytes as apply_nullable_bytes;
    pub use super::tuple::transform_with_names as apply_tuple_names;
}

pub(crate) use signature::{
    decode_base_type, decode_event_type, decode_field_signature, decode_interfaces,
    decode_method_signature, decode_property_signature,
};

use crate::{
    metadata::{
        customattributes,
        module::ModuleSymbol,
        signatures::{
            CallingConvention, SignatureModifier, SignatureParameter, SignatureParser,
            TypeSignature,
        },
        tables::TableId,
        token::Token,
        typesystem::{
            factory::{self, NoPiaContext},
            types_equal, AnnotatedType, CustomModifier, ErrorType, FunctionPointerParam,
            NamedTypeDefRc, RefKind, SpecialType, TypeCompareKind, TypeRc, TypeSymbol,
        },
    },
    Error,
};

/// Marks signature content that has no representation in the symbol model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UnsupportedContent;

pub(crate) type Decoded<T> = std::result::Result<T, UnsupportedContent>;

impl From<Error> for UnsupportedContent {
    fn from(error: Error) -> Self {
        log::debug!("metadata could not be decoded - {error}");
        UnsupportedContent
    }
}

/// How a TypeDef resolves for the decoder. Results for embedded interop types are never
/// cached, so every lookup reports `is_local` again.
struct DefinitionUse {
    ty: TypeRc,
    is_local: bool,
}

/// Decodes tokens and signatures of one module under a generic context
pub struct MetadataDecoder<'a> {
    module: &'a ModuleSymbol,
    type_context: TypeContext,
    method_context: MethodContext,
    type_spec_depth: Cell<usize>,
}

impl<'a> MetadataDecoder<'a> {
    /// A decoder without generic context
    #[must_use]
    pub fn new(module: &'a ModuleSymbol) -> Self {
        MetadataDecoder {
            module,
            type_context: TypeContext::None,
            method_context: MethodContext::None,
            type_spec_depth: Cell::new(0),
        }
    }

    /// Sets what `!n` resolves to
    #[must_use]
    pub fn with_type_context(mut self, context: TypeContext) -> Self {
        self.type_context = context;
        self
    }

    /// Sets what `!!n` resolves to
    #[must_use]
    pub fn with_method_context(mut self, context: MethodContext) -> Self {
        self.method_context = context;
        self
    }

    /// The module whose tokens this decoder resolves
    #[must_use]
    pub fn module(&self) -> &'a ModuleSymbol {
        self.module
    }

    /// Resolves a TypeDef, TypeRef or TypeSpec token
    #[must_use]
    pub fn get_type_of_token(&self, token: Token) -> TypeRc {
        self.get_type_of_token_ex(token).0
    }

    /// Resolves a TypeDef, TypeRef or TypeSpec token, also reporting whether the result
    /// was reached through an embedded interop type
    #[must_use]
    pub fn get_type_of_token_ex(&self, token: Token) -> (TypeRc, bool) {
        let resolved = match token.kind() {
            Some(TableId::TypeDef) => Ok(self.resolve_type_def(token)),
            Some(TableId::TypeRef) => Ok(self.resolve_type_ref(token, 0)),
            Some(TableId::TypeSpec) => self.decode_type_spec(token),
            _ => Err(UnsupportedContent),
        };

        resolved.unwrap_or_else(|_| {
            log::debug!("token {token} does not resolve to a type");
            (TypeSymbol::unsupported(), false)
        })
    }

    /// Decodes a parsed type signature
    #[must_use]
    pub fn decode_type(&self, signature: &TypeSignature) -> TypeRc {
        match self.decode(signature) {
            Ok((ty, _)) => ty,
            Err(UnsupportedContent) => TypeSymbol::unsupported(),
        }
    }

    /// Decodes custom modifiers, resolving each modifier type token
    #[must_use]
    pub fn decode_modifiers(&self, modifiers: &[SignatureModifier]) -> Vec<CustomModifier> {
        modifiers
            .iter()
            .map(|modifier| CustomModifier {
                modifier: self.get_type_of_token(modifier.modifier_type),
                is_optional: !modifier.is_required,
            })
            .collect()
    }

    pub(crate) fn decode(&self, signature: &TypeSignature) -> Decoded<(TypeRc, bool)> {
        match signature {
            TypeSignature::Unknown => Err(UnsupportedContent),
            TypeSignature::Class(token) | TypeSignature::ValueType(token) => {
                self.decode_named_reference(*token)
            }
            TypeSignature::GenericParamType(position) => {
                Ok((self.type_context.resolve(*position), false))
            }
            TypeSignature::GenericParamMethod(position) => {
                Ok((self.method_context.resolve(*position), false))
            }
            TypeSignature::Ptr(pointer) => {
                let (pointed_at, is_local) = self.decode(&pointer.base)?;
                let modifiers = self.decode_modifiers(&pointer.modifiers);
                Ok((
                    factory::make_pointer(AnnotatedType::with_modifiers(pointed_at, modifiers)),
                    is_local,
                ))
            }
            TypeSignature::SzArray(array) => {
                let (element, is_local) = self.decode(&array.base)?;
                let modifiers = self.decode_modifiers(&array.modifiers);
                Ok((
                    factory::make_sz_array(AnnotatedType::with_modifiers(element, modifiers)),
                    is_local,
                ))
            }
            TypeSignature::Array(array) => {
                if array.rank == 0 {
                    return Err(UnsupportedContent);
                }

                let (element, is_local) = self.decode(&array.base)?;
                let modifiers = self.decode_modifiers(&array.modifiers);
                Ok((
                    factory::make_array(
                        AnnotatedType::with_modifiers(element, modifiers),
                        array.rank,
                        array.sizes.clone(),
                        array.lower_bounds.clone(),
                    ),
                    is_local,
                ))
            }
            TypeSignature::GenericInst(base, arguments) => {
                let (TypeSignature::Class(token) | TypeSignature::ValueType(token)) = &**base
                else {
                    return Err(UnsupportedContent);
                };
                if token.is_table(TableId::TypeSpec) {
                    return Err(UnsupportedContent);
                }

                let (generic, base_is_local) = self.get_type_of_token_ex(*token);
                let mut decoded = Vec::with_capacity(arguments.len());
                let mut refers_to_local = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    let (ty, is_local) = self.decode(&argument.base)?;
                    if ty.is_unsupported() {
                        return Err(UnsupportedContent);
                    }
                    decoded.push(AnnotatedType::with_modifiers(
                        ty,
                        self.decode_modifiers(&argument.modifiers),
                    ));
                    refers_to_local.push(is_local);
                }

                let linked = self
                    .module
                    .assembly()
                    .map(|assembly| assembly.linked_references())
                    .unwrap_or_default();
                let no_pia = NoPiaContext {
                    linked_assemblies: &linked,
                    module_has_local_types: self.module.contains_local_types(),
                };

                let is_local = base_is_local || refers_to_local.contains(&true);
                let constructed =
                    factory::substitute_type_arguments(&generic, decoded, &refers_to_local, &no_pia);
                if constructed.is_unsupported() {
                    return Err(UnsupportedContent);
                }
                Ok((constructed, is_local))
            }
            TypeSignature::FnPtr(method) => {
                if method.is_generic() || method.param_count_generic != 0 {
                    return Err(UnsupportedContent);
                }

                let (return_param, mut is_local) =
                    self.decode_function_pointer_param(&method.return_type)?;
                let mut params = Vec::with_capacity(method.params.len());
                for param in &method.params {
                    let (decoded, param_is_local) = self.decode_function_pointer_param(param)?;
                    is_local |= param_is_local;
                    params.push(decoded);
                }

                Ok((
                    factory::make_function_pointer(
                        CallingConvention::from_header(method.header),
                        return_param,
                        params,
                    ),
                    is_local,
                ))
            }
            primitive => {
                let special = SpecialType::from_signature(primitive).ok_or(UnsupportedContent)?;
                Ok((self.module.special_type(special), false))
            }
        }
    }

    fn decode_function_pointer_param(
        &self,
        param: &SignatureParameter,
    ) -> Decoded<(FunctionPointerParam, bool)> {
        let (ty, is_local) = self.decode(&param.base)?;
        Ok((
            FunctionPointerParam {
                ty: AnnotatedType::with_modifiers(ty, self.decode_modifiers(&param.modifiers)),
                ref_kind: if param.by_ref {
                    RefKind::Ref
                } else {
                    RefKind::None
                },
                ref_modifiers: self.decode_modifiers(&param.ref_modifiers),
            },
            is_local,
        ))
    }

    /// `CLASS`/`VALUETYPE` followed by a token
    fn decode_named_reference(&self, token: Token) -> Decoded<(TypeRc, bool)> {
        if token.is_table(TableId::TypeSpec) {
            return Err(UnsupportedContent);
        }

        let (ty, is_local) = self.get_type_of_token_ex(token);
        if ty.special_type().has_short_form() {
            log::debug!("{ty} is referenced through a token instead of its element type");
            return Err(UnsupportedContent);
        }
        Ok((ty, is_local))
    }

    fn decode_type_spec(&self, token: Token) -> Decoded<(TypeRc, bool)> {
        let max_depth = self.module.options().max_signature_depth;
        let depth = self.type_spec_depth.get();
        if depth >= max_depth {
            log::warn!("TypeSpec {token} nests deeper than {max_depth} levels");
            return Err(UnsupportedContent);
        }

        let blob = self.module.reader().type_spec(token)?;
        let mut parser = SignatureParser::with_max_depth(blob, max_depth);
        let spec = parser.parse_type_spec_signature()?;

        self.type_spec_depth.set(depth + 1);
        let decoded = self.decode(&spec.base);
        self.type_spec_depth.set(depth);
        decoded
    }

    fn resolve_type_def(&self, token: Token) -> (TypeRc, bool) {
        if let Some(cached) = self.module.typedef_cache.get(&token) {
            return (cached.clone(), false);
        }

        let Some(definition) = self.module.type_def(token) else {
            return (TypeSymbol::unsupported(), false);
        };

        let resolved = self.use_definition(&definition);
        if resolved.is_local {
            return (resolved.ty, true);
        }
        (publish(&self.module.typedef_cache, token, resolved.ty), false)
    }

    /// Classifies a definition found for a token: embedded interop types are replaced by
    /// their canonical type, generic or nested ones are not supported
    fn use_definition(&self, definition: &NamedTypeDefRc) -> DefinitionUse {
        let mut container = definition.containing();
        while let Some(outer) = container {
            if outer.is_local_type {
                return DefinitionUse {
                    ty: TypeSymbol::unsupported(),
                    is_local: true,
                };
            }
            container = outer.containing();
        }

        if !definition.is_local_type {
            return DefinitionUse {
                ty: definition.declared_type(),
                is_local: false,
            };
        }

        if definition.arity() > 0 || definition.containing().is_some() {
            log::debug!("embedded interop type {} is generic", definition.full_name());
            return DefinitionUse {
                ty: TypeSymbol::unsupported(),
                is_local: true,
            };
        }

        DefinitionUse {
            ty: self.canonical_local_type(definition),
            is_local: true,
        }
    }

    /// The type an embedded interop type stands for: the same-named, non-embedded type in
    /// the first referenced assembly that is not itself linked, with a matching GUID when
    /// both carry one
    fn canonical_local_type(&self, definition: &NamedTypeDefRc) -> TypeRc {
        let local_guid = customattributes::guid(self.module.reader(), definition.token);
        let candidates = self
            .module
            .assembly()
            .map(|assembly| assembly.references().to_vec())
            .unwrap_or_default();

        for reference in candidates.iter().filter(|reference| !reference.is_linked) {
            let Some(candidate) = reference.lookup_top_level(&definition.namespace, &definition.name)
            else {
                continue;
            };
            if candidate.is_local_type {
                continue;
            }

            let candidate_guid = candidate
                .module()
                .and_then(|module| customattributes::guid(module.reader(), candidate.token));
            if let (Some(local), Some(canonical)) = (local_guid, candidate_guid) {
                if local != canonical {
                    continue;
                }
            }

            return candidate.declared_type();
        }

        log::debug!(
            "no canonical type found for embedded interop type {}",
            definition.full_name()
        );
        TypeSymbol::missing(&definition.namespace, &definition.name)
    }

    fn resolve_type_ref(&self, token: Token, depth: usize) -> (TypeRc, bool) {
        if let Some(cached) = self.module.typeref_cache.get(&token) {
            return (cached.clone(), false);
        }

        if depth >= self.module.options().max_signature_depth {
            log::warn!("TypeRef {token} has a cyclic resolution scope");
            return (TypeSymbol::unsupported(), false);
        }

        let row = match self.module.reader().type_ref(token) {
            Ok(row) => row,
            Err(error) => {
                log::debug!("TypeRef {token} could not be read - {error}");
                return (TypeSymbol::unsupported(), false);
            }
        };

        let scope = row.resolution_scope;
        let found = match scope.kind() {
            _ if scope.is_null() => return (TypeSymbol::unsupported(), false),
            Some(TableId::TypeRef) => {
                let (container, _) = self.resolve_type_ref(scope, depth + 1);
                match container.as_named() {
                    Some(outer) => self.module.lookup_nested(&outer.definition, &row.name),
                    None if container.is_unsupported() => {
                        return (TypeSymbol::unsupported(), false)
                    }
                    None => None,
                }
            }
            Some(TableId::AssemblyRef) => self
                .module
                .assembly()
                .and_then(|assembly| assembly.reference(scope.row()))
                .and_then(|reference| reference.lookup_top_level(&row.namespace, &row.name)),
            Some(TableId::ModuleRef) => self
                .module
                .reader()
                .module_ref(scope)
                .ok()
                .and_then(|name| self.module.assembly()?.module_by_name(&name))
                .and_then(|sibling| sibling.lookup_top_level(&row.namespace, &row.name)),
            Some(TableId::Module) => self.module.lookup_top_level(&row.namespace, &row.name),
            _ => {
                log::debug!("TypeRef {token} has an unexpected resolution scope {scope}");
                return (TypeSymbol::unsupported(), false);
            }
        };

        let resolved = match found {
            Some(definition) => self.use_definition(&definition),
            None => {
                log::debug!("TypeRef {token} ({}.{}) is not defined", row.namespace, row.name);
                DefinitionUse {
                    ty: TypeSymbol::missing(&row.namespace, &row.name),
                    is_local: false,
                }
            }
        };

        if resolved.is_local {
            return (resolved.ty, true);
        }
        (
            publish(&self.module.typeref_cache, token, resolved.ty),
            false,
        )
    }
}

/// Publishes `ty` for `token`. If another thread got there first its value wins; if the two
/// disagree, the caller receives a conflict sentinel and the cache keeps the first value.
fn publish(cache: &DashMap<Token, TypeRc>, token: Token, ty: TypeRc) -> TypeRc {
    let winner = cache.entry(token).or_insert_with(|| ty.clone()).clone();
    let agrees = Arc::ptr_eq(&winner, &ty)
        || (winner.is_unsupported() && ty.is_unsupported())
        || types_equal(&winner, &ty, TypeCompareKind::empty());
    if agrees {
        return winner;
    }

    log::warn!("token {token} resolved to both {winner} and {ty}");
    Arc::new(TypeSymbol::Error(ErrorType::Conflicting))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures: a core library assembly and an application assembly referencing it

    use crate::metadata::{
        assembly::{AssemblyRc, AssemblySymbol},
        image::{core_library_builder, ImageBuilder},
        module::ModuleRc,
        options::ImportOptions,
        signatures::TypeSignature,
        token::Token,
        typesystem::{factory, AnnotatedType, TypeRc},
    };

    pub(crate) struct Fixture {
        pub(crate) core_assembly: AssemblyRc,
        pub(crate) app_assembly: AssemblyRc,
        pub(crate) core: ModuleRc,
        pub(crate) app: ModuleRc,
    }

    impl Fixture {
        pub(crate) fn new() -> Self {
            Self::with_app(|_| ()).0
        }

        pub(crate) fn with_app<T>(build: impl FnOnce(&mut ImageBuilder) -> T) -> (Self, T) {
            Self::create(core_library_builder(), build)
        }

        /// Like [`Fixture::with_app`], over a core library that declares
        /// `RuntimeFeature.NumericIntPtr`
        pub(crate) fn with_core_features<T>(
            build: impl FnOnce(&mut ImageBuilder) -> T,
        ) -> (Self, T) {
            let mut core = core_library_builder();
            let feature = core.type_def(
                "System.Runtime.CompilerServices",
                "RuntimeFeature",
                Token::new(0),
            );
            core.simple_field(feature, "NumericIntPtr", TypeSignature::String)
                .unwrap();
            Self::create(core, build)
        }

        fn create<T>(
            core: ImageBuilder,
            build: impl FnOnce(&mut ImageBuilder) -> T,
        ) -> (Self, T) {
            let core_assembly = AssemblySymbol::new("System.Private.CoreLib", ImportOptions::default());
            let core = core_assembly.add_module(core.build());

            let mut builder = ImageBuilder::new("App.dll");
            builder.assembly_ref("System.Private.CoreLib");
            let value = build(&mut builder);

            let app_assembly = AssemblySymbol::new("App", ImportOptions::default());
            let app = app_assembly.add_module(builder.build());
            app_assembly
                .set_references(vec![core_assembly.clone()])
                .unwrap();

            (
                Fixture {
                    core_assembly,
                    app_assembly,
                    core,
                    app,
                },
                value,
            )
        }

        /// Token of the AssemblyRef row pointing at the core library
        pub(crate) fn core_ref() -> Token {
            Token::new(0x2300_0001)
        }
    }

    /// The declared type of a top-level definition in `module`
    pub(crate) fn named(module: &ModuleRc, namespace: &str, name: &str) -> TypeRc {
        module
            .lookup_top_level(namespace, name)
            .unwrap_or_else(|| panic!("{namespace}.{name} is not defined"))
            .declared_type()
    }

    /// A top-level generic definition of `module` constructed over `arguments`
    pub(crate) fn construct(
        module: &ModuleRc,
        namespace: &str,
        name: &str,
        arguments: Vec<TypeRc>,
    ) -> TypeRc {
        let definition = module
            .lookup_top_level(namespace, name)
            .unwrap_or_else(|| panic!("{namespace}.{name} is not defined"));
        factory::construct_named(
            &definition,
            None,
            arguments.into_iter().map(AnnotatedType::new).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{testing::Fixture, *};
    use crate::metadata::{
        assembly::AssemblySymbol,
        image::ImageBuilder,
        options::ImportOptions,
        signatures::{
            SignatureArray, SignaturePointer, SignatureSzArray, SignatureTypeArgument,
        },
        typesystem::ArrayShape,
    };

    fn sz_array(base: TypeSignature) -> TypeSignature {
        TypeSignature::SzArray(SignatureSzArray {
            modifiers: Vec::new(),
            base: Box::new(base),
        })
    }

    #[test]
    fn test_primitives_resolve_through_the_core_library() {
        let fixture = Fixture::new();
        let decoder = fixture.app.decoder();

        let int32 = decoder.decode_type(&TypeSignature::I4);
        assert_eq!(int32.to_string(), "System.Int32");
        let definition = &int32.as_named().unwrap().definition;
        assert!(Arc::ptr_eq(
            &definition.module().unwrap(),
            &fixture.core_assembly.manifest_module().unwrap()
        ));
        let again = decoder.decode_type(&TypeSignature::I4);
        assert!(Arc::ptr_eq(&int32, &again));

        assert!(decoder.decode_type(&TypeSignature::Unknown).is_unsupported());
        assert_eq!(
            decoder.decode_type(&sz_array(TypeSignature::String)).to_string(),
            "System.String[]"
        );
    }

    #[test]
    fn test_multi_dimensional_arrays() {
        let fixture = Fixture::new();
        let decoder = fixture.app.decoder();
        let signature = TypeSignature::Array(SignatureArray {
            modifiers: Vec::new(),
            base: Box::new(TypeSignature::I4),
            rank: 2,
            sizes: vec![3],
            lower_bounds: Vec::new(),
        });

        let array = decoder.decode_type(&signature);
        match &*array {
            TypeSymbol::Array(array) => assert_eq!(
                array.shape,
                ArrayShape::MultiDimensional {
                    rank: 2,
                    sizes: vec![3],
                    lower_bounds: Vec::new()
                }
            ),
            other => panic!("unexpected {other:?}"),
        }

        let rank_zero = TypeSignature::Array(SignatureArray {
            modifiers: Vec::new(),
            base: Box::new(TypeSignature::I4),
            rank: 0,
            sizes: Vec::new(),
            lower_bounds: Vec::new(),
        });
        assert!(decoder.decode_type(&rank_zero).is_unsupported());
    }

    #[test]
    fn test_type_refs_resolve_and_cache() {
        let (fixture, (list, missing, nested, unknown_scope)) = Fixture::with_app(|builder| {
            let list = builder.type_ref(Fixture::core_ref(), "System", "String");
            let missing = builder.type_ref(Fixture::core_ref(), "System", "Gone");
            let outer = builder.type_def("App", "Outer", Token::new(0));
            builder.nested_type_def(outer, "Inner", Token::new(0));
            let outer_ref = builder.type_ref(ImageBuilder::module_scope(), "App", "Outer");
            let nested = builder.type_ref(outer_ref, "", "Inner");
            let unknown_scope = builder.type_ref(Token::new(0x0600_0001), "App", "Outer");
            (list, missing, nested, unknown_scope)
        });
        let decoder = fixture.app.decoder();

        let string = decoder.get_type_of_token(list);
        assert_eq!(string.to_string(), "System.String");
        assert!(Arc::ptr_eq(&string, &decoder.get_type_of_token(list)));

        let gone = decoder.get_type_of_token(missing);
        assert!(gone.is_error() && !gone.is_unsupported());
        assert_eq!(gone.to_string(), "<missing System.Gone>");

        assert_eq!(decoder.get_type_of_token(nested).to_string(), "App.Outer+Inner");
        assert!(decoder.get_type_of_token(unknown_scope).is_unsupported());
        assert!(decoder.get_type_of_token(Token::new(0x0600_0001)).is_unsupported());
    }

    #[test]
    fn test_short_form_types_through_tokens_are_unsupported() {
        let (fixture, int32_ref) = Fixture::with_app(|builder| {
            builder.type_ref(Fixture::core_ref(), "System", "Int32")
        });
        let decoder = fixture.app.decoder();

        assert!(decoder
            .decode_type(&TypeSignature::ValueType(int32_ref))
            .is_unsupported());
        assert_eq!(decoder.get_type_of_token(int32_ref).to_string(), "System.Int32");
    }

    #[test]
    fn test_generic_instantiation() {
        let (fixture, tuple_ref) = Fixture::with_app(|builder| {
            builder.type_ref(Fixture::core_ref(), "System", "ValueTuple`2")
        });
        let decoder = fixture.app.decoder();
        let instantiate = |arguments: Vec<TypeSignature>| {
            TypeSignature::GenericInst(
                Box::new(TypeSignature::ValueType(tuple_ref)),
                arguments
                    .into_iter()
                    .map(|base| SignatureTypeArgument {
                        modifiers: Vec::new(),
                        base,
                    })
                    .collect(),
            )
        };

        let pair =
            decoder.decode_type(&instantiate(vec![TypeSignature::I4, TypeSignature::String]));
        assert_eq!(pair.to_string(), "(System.Int32, System.String)");

        // Wrong arity, and an argument that cannot be represented
        assert!(decoder
            .decode_type(&instantiate(vec![TypeSignature::I4]))
            .is_unsupported());
        assert!(decoder
            .decode_type(&instantiate(vec![TypeSignature::I4, TypeSignature::Unknown]))
            .is_unsupported());
    }

    #[test]
    fn test_generic_parameters_need_context() {
        let fixture = Fixture::new();
        let decoder = fixture.app.decoder();
        assert!(decoder
            .decode_type(&TypeSignature::GenericParamType(0))
            .is_unsupported());

        let nullable = fixture.core.lookup_top_level("System", "Nullable`1").unwrap();
        let in_context = fixture
            .core
            .decoder()
            .with_type_context(TypeContext::Definition(nullable.clone()))
            .with_method_context(MethodContext::Placeholders);
        assert_eq!(
            in_context
                .decode_type(&TypeSignature::GenericParamType(0))
                .to_string(),
            "T"
        );
        assert_eq!(
            in_context
                .decode_type(&TypeSignature::GenericParamMethod(1))
                .to_string(),
            "!!1"
        );
    }

    #[test]
    fn test_type_specs() {
        let (fixture, (spec, pointer_spec, bad_spec)) = Fixture::with_app(|builder| {
            let spec = builder.type_spec(&sz_array(TypeSignature::I4)).unwrap();
            let pointer_spec = builder
                .type_spec(&TypeSignature::Ptr(SignaturePointer {
                    modifiers: Vec::new(),
                    base: Box::new(TypeSignature::Void),
                }))
                .unwrap();
            let bad_spec = builder.type_spec_blob(vec![0xFF]);
            (spec, pointer_spec, bad_spec)
        });
        let decoder = fixture.app.decoder();

        assert_eq!(decoder.get_type_of_token(spec).to_string(), "System.Int32[]");
        assert_eq!(decoder.get_type_of_token(pointer_spec).to_string(), "System.Void*");
        assert!(decoder.get_type_of_token(bad_spec).is_unsupported());
        assert!(decoder
            .decode_type(&TypeSignature::Class(spec))
            .is_unsupported());
    }

    #[test]
    fn test_conflicting_publication() {
        let fixture = Fixture::new();
        let token = Token::new(0x0100_0042);
        let first = TypeSymbol::missing("A", "First");
        let second = TypeSymbol::missing("B", "Second");

        let published = publish(&fixture.app.typeref_cache, token, first.clone());
        assert!(Arc::ptr_eq(&published, &first));

        let conflict = publish(&fixture.app.typeref_cache, token, second);
        assert!(matches!(&*conflict, TypeSymbol::Error(ErrorType::Conflicting)));
        assert!(Arc::ptr_eq(
            &fixture.app.typeref_cache.get(&token).unwrap(),
            &first
        ));

        let equal = publish(&fixture.app.typeref_cache, token, TypeSymbol::missing("A", "First"));
        assert!(Arc::ptr_eq(&equal, &first));
    }

    #[test]
    fn test_local_types_are_replaced_by_their_canonical_type() {
        let interop = AssemblySymbol::new("Interop", ImportOptions::default());
        let mut interop_image = ImageBuilder::new("Interop.dll");
        let canonical = interop_image.interface_def("Contoso", "IWidget");
        interop_image
            .guid_attribute(canonical, "d437908e-65e6-487c-9735-7bdff699bea5")
            .unwrap();
        interop.add_module(interop_image.build());

        let mut app_image = ImageBuilder::new("App.dll");
        let local = app_image.interface_def("Contoso", "IWidget");
        app_image.type_identifier_attribute(local);
        app_image
            .guid_attribute(local, "d437908e-65e6-487c-9735-7bdff699bea5")
            .unwrap();
        let generic_local = app_image.interface_def("Contoso", "IBox`1");
        app_image.generic_param(generic_local, "T");
        app_image.type_identifier_attribute(generic_local);
        let app = AssemblySymbol::new("App", ImportOptions::default());
        let module = app.add_module(app_image.build());
        app.set_references(vec![interop.clone()]).unwrap();

        let decoder = module.decoder();
        let (resolved, is_local) = decoder.get_type_of_token_ex(local);
        assert!(is_local);
        let definition = &resolved.as_named().unwrap().definition;
        assert!(!definition.is_local_type);
        assert!(Arc::ptr_eq(
            &definition.module().unwrap(),
            &interop.manifest_module().unwrap()
        ));

        let (generic, generic_is_local) = decoder.get_type_of_token_ex(generic_local);
        assert!(generic.is_unsupported());
        assert!(generic_is_local);

        // Repeated lookups report the embedded type again
        let (_, again_is_local) = decoder.get_type_of_token_ex(local);
        assert!(again_is_local);
        let (again, again_generic_is_local) = decoder.get_type_of_token_ex(generic_local);
        assert!(again.is_unsupported());
        assert!(again_generic_is_local);
        assert!(module.typedef_cache.get(&generic_local).is_none());
    }
}

//! Modules: one metadata image and everything decoded from it.
//!
//! A [`ModuleSymbol`] owns its [`MetadataReader`] together with the token-keyed caches the
//! decoder fills: type definitions (one [`NamedTypeDef`] per TypeDef row, shared through a
//! `SkipMap`), resolved TypeDef tokens and resolved TypeRef tokens. All of them are filled
//! with first-writer-wins semantics, so any number of threads can decode from the same
//! module without locking on the read path.
//!
//! # Examples
//!
//! ```rust
//! use dotimport::metadata::{assembly::AssemblySymbol, image, options::ImportOptions};
//!
//! let corlib = AssemblySymbol::new("System.Private.CoreLib", ImportOptions::default());
//! let module = corlib.add_module(image::core_library_image());
//!
//! let string = module.lookup_top_level("System", "String").unwrap();
//! assert_eq!(string.full_name(), "System.String");
//! ```

use std::{
    collections::HashMap,
    sync::{Arc, OnceLock, Weak},
};

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use rayon::prelude::*;

use crate::metadata::{
    assembly::{AssemblyRc, AssemblySymbol},
    customattributes,
    decoder::{self, MetadataDecoder},
    options::ImportOptions,
    reader::{MetadataReader, TypeAttributes},
    tables::TableId,
    token::Token,
    typesystem::{
        NamedTypeDef, NamedTypeDefRc, SpecialType, Symbol, TypeKind, TypeRc, TypeSymbol,
    },
};

/// Reference to a `ModuleSymbol`
pub type ModuleRc = Arc<ModuleSymbol>;

/// A module loaded into an assembly
pub struct ModuleSymbol {
    reader: Box<dyn MetadataReader>,
    assembly: Weak<AssemblySymbol>,
    options: ImportOptions,
    this: Weak<ModuleSymbol>,
    type_defs: SkipMap<Token, NamedTypeDefRc>,
    pub(crate) typedef_cache: DashMap<Token, TypeRc>,
    pub(crate) typeref_cache: DashMap<Token, TypeRc>,
    top_level: OnceLock<HashMap<(String, String), Token>>,
    member_owners: OnceLock<HashMap<Token, Token>>,
    has_local_types: OnceLock<bool>,
}

impl ModuleSymbol {
    pub(crate) fn new(
        reader: Box<dyn MetadataReader>,
        assembly: Weak<AssemblySymbol>,
        options: ImportOptions,
    ) -> ModuleRc {
        Arc::new_cyclic(|this| ModuleSymbol {
            reader,
            assembly,
            options,
            this: this.clone(),
            type_defs: SkipMap::new(),
            typedef_cache: DashMap::new(),
            typeref_cache: DashMap::new(),
            top_level: OnceLock::new(),
            member_owners: OnceLock::new(),
            has_local_types: OnceLock::new(),
        })
    }

    /// Module name from the metadata
    #[must_use]
    pub fn name(&self) -> &str {
        self.reader.module_name()
    }

    /// The underlying reader
    #[must_use]
    pub fn reader(&self) -> &dyn MetadataReader {
        self.reader.as_ref()
    }

    /// The containing assembly, `None` once it has been dropped
    #[must_use]
    pub fn assembly(&self) -> Option<AssemblyRc> {
        self.assembly.upgrade()
    }

    /// Options of the containing assembly
    #[must_use]
    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// A decoder for this module without generic context
    #[must_use]
    pub fn decoder(&self) -> MetadataDecoder<'_> {
        MetadataDecoder::new(self)
    }

    /// The definition for a TypeDef token, created on first request.
    ///
    /// Returns `None` if the row cannot be read, or if its enclosing chain is broken or
    /// cyclic.
    #[must_use]
    pub fn type_def(&self, token: Token) -> Option<NamedTypeDefRc> {
        self.type_def_at_depth(token, 0)
    }

    fn type_def_at_depth(&self, token: Token, depth: usize) -> Option<NamedTypeDefRc> {
        if let Some(entry) = self.type_defs.get(&token) {
            return Some(entry.value().clone());
        }

        if depth > self.options.max_signature_depth {
            log::debug!("enclosing chain of {token} is too deep");
            return None;
        }

        let row = match self.reader.type_def(token) {
            Ok(row) => row,
            Err(error) => {
                log::debug!("TypeDef {token} could not be read - {error}");
                return None;
            }
        };

        let containing = match row.enclosing {
            Some(enclosing) => Some(self.type_def_at_depth(enclosing, depth + 1)?),
            None => None,
        };

        let mut parameter_names: Vec<String> = match self.reader.generic_params(token) {
            Ok(params) => params.into_iter().map(|param| param.name).collect(),
            Err(error) => {
                log::warn!("generic parameters of {token} could not be read - {error}");
                Vec::new()
            }
        };
        let inherited = containing.as_ref().map_or(0, |c| c.total_arity()) as usize;
        if parameter_names.len() < inherited {
            log::debug!("{token} re-declares fewer generic parameters than its container");
            parameter_names.clear();
        } else {
            parameter_names.drain(..inherited);
        }

        let kind = self.type_kind(&row.namespace, &row.name, row.flags, row.extends);
        let is_local_type = customattributes::has_type_identifier(self.reader(), token);

        let definition = Arc::new(NamedTypeDef::new(
            token,
            row,
            kind,
            is_local_type,
            containing,
            self.this.clone(),
            parameter_names,
        ));
        let entry = self.type_defs.get_or_insert(token, definition);
        let definition = entry.value().clone();
        Some(definition)
    }

    /// Classifies a TypeDef row from its flags and the name of its base type
    fn type_kind(&self, namespace: &str, name: &str, flags: TypeAttributes, extends: Token) -> TypeKind {
        if flags.contains(TypeAttributes::INTERFACE) {
            return TypeKind::Interface;
        }

        let base = match extends.kind() {
            Some(TableId::TypeDef) => self
                .reader
                .type_def(extends)
                .ok()
                .map(|row| (row.namespace, row.name)),
            Some(TableId::TypeRef) => self
                .reader
                .type_ref(extends)
                .ok()
                .map(|row| (row.namespace, row.name)),
            _ => None,
        };

        let Some((base_namespace, base_name)) = base else {
            return TypeKind::Class;
        };
        if base_namespace != "System" {
            return TypeKind::Class;
        }

        match base_name.as_str() {
            "ValueType" if !(namespace == "System" && name == "Enum") => TypeKind::Struct,
            "Enum" => TypeKind::Enum,
            "MulticastDelegate" => TypeKind::Delegate,
            _ => TypeKind::Class,
        }
    }

    /// Every TypeDef of the module in row order, `<Module>` first
    #[must_use]
    pub fn type_defs(&self) -> Vec<NamedTypeDefRc> {
        (1..=self.reader.type_def_count())
            .filter_map(|row| self.type_def(Token::from_parts(TableId::TypeDef, row)))
            .collect()
    }

    /// Finds a top-level type by namespace and metadata name
    #[must_use]
    pub fn lookup_top_level(&self, namespace: &str, name: &str) -> Option<NamedTypeDefRc> {
        let index = self.top_level.get_or_init(|| {
            let mut index = HashMap::new();
            for row in 2..=self.reader.type_def_count() {
                let token = Token::from_parts(TableId::TypeDef, row);
                match self.reader.type_def(token) {
                    Ok(def) if def.enclosing.is_none() => {
                        index.entry((def.namespace, def.name)).or_insert(token);
                    }
                    Ok(_) => {}
                    Err(error) => log::debug!("TypeDef {token} skipped in name index - {error}"),
                }
            }
            index
        });

        let token = index.get(&(namespace.to_string(), name.to_string()))?;
        self.type_def(*token)
    }

    /// Finds a type nested directly in `container` by metadata name
    #[must_use]
    pub fn lookup_nested(&self, container: &NamedTypeDefRc, name: &str) -> Option<NamedTypeDefRc> {
        container
            .nested_types()
            .into_iter()
            .find(|nested| nested.name == name)
    }

    /// A core library type, resolved through the containing assembly
    #[must_use]
    pub fn special_type(&self, special: SpecialType) -> TypeRc {
        match self.assembly() {
            Some(assembly) => assembly.special_type(special),
            None => match special.metadata_name() {
                Some((namespace, name)) => TypeSymbol::missing(namespace, name),
                None => TypeSymbol::unsupported(),
            },
        }
    }

    /// `true` if any type of this module carries `TypeIdentifierAttribute`
    #[must_use]
    pub fn contains_local_types(&self) -> bool {
        *self.has_local_types.get_or_init(|| {
            (2..=self.reader.type_def_count()).any(|row| {
                customattributes::has_type_identifier(
                    self.reader(),
                    Token::from_parts(TableId::TypeDef, row),
                )
            })
        })
    }

    /// Maps a MethodDef or Field token to the TypeDef that declares it
    fn member_owner(&self, member: Token) -> Option<Token> {
        let owners = self.member_owners.get_or_init(|| {
            let mut owners = HashMap::new();
            for row in 1..=self.reader.type_def_count() {
                let owner = Token::from_parts(TableId::TypeDef, row);
                let methods = self.reader.methods(owner).unwrap_or_default();
                let fields = self.reader.fields(owner).unwrap_or_default();
                for token in methods.into_iter().chain(fields) {
                    owners.entry(token).or_insert(owner);
                }
            }
            owners
        });
        owners.get(&member).copied()
    }

    /// Resolves a MemberRef token to the method or field it names.
    ///
    /// TypeDef, TypeRef and TypeSpec parents are resolved to a type and searched by
    /// signature. A MethodDef parent (a vararg call site) is that method. A ModuleRef parent
    /// names the `<Module>` type of a sibling module. Anything else yields `None`.
    #[must_use]
    pub fn get_symbol_for_member_ref(&self, token: Token) -> Option<Symbol> {
        let row = match self.reader.member_ref(token) {
            Ok(row) => row,
            Err(error) => {
                log::debug!("MemberRef {token} could not be read - {error}");
                return None;
            }
        };

        let parent = row.parent;
        let containing = match parent.kind() {
            Some(TableId::TypeDef | TableId::TypeRef | TableId::TypeSpec) => {
                self.decoder().get_type_of_token(parent)
            }
            Some(TableId::MethodDef) => {
                return self.get_symbol_for_token(parent);
            }
            Some(TableId::ModuleRef) => {
                let name = self.reader.module_ref(parent).ok()?;
                let sibling = self.assembly()?.module_by_name(&name)?;
                sibling.type_def(Token::from_parts(TableId::TypeDef, 1))?.declared_type()
            }
            _ => return None,
        };

        decoder::find_member(self, &containing, token, false)
    }

    /// Resolves any IL operand token to the symbol it names.
    ///
    /// TypeDef, TypeRef and TypeSpec tokens yield types; MethodDef and Field tokens the
    /// member of their declaring definition; MemberRef tokens go through
    /// [`ModuleSymbol::get_symbol_for_member_ref`]. Other tokens, MethodSpec included,
    /// yield `None`.
    #[must_use]
    pub fn get_symbol_for_token(&self, token: Token) -> Option<Symbol> {
        match token.kind()? {
            TableId::TypeDef | TableId::TypeRef | TableId::TypeSpec => {
                Some(Symbol::Type(self.decoder().get_type_of_token(token)))
            }
            TableId::MethodDef => {
                let owner = self.type_def(self.member_owner(token)?)?;
                owner
                    .methods()
                    .iter()
                    .find(|method| method.token == token)
                    .cloned()
                    .map(Symbol::Method)
            }
            TableId::Field => {
                let owner = self.type_def(self.member_owner(token)?)?;
                owner
                    .fields()
                    .iter()
                    .find(|field| field.token == token)
                    .cloned()
                    .map(Symbol::Field)
            }
            TableId::MemberRef => self.get_symbol_for_member_ref(token),
            _ => None,
        }
    }

    /// Decodes every member signature, base type and interface list of the module in
    /// parallel. Returns the number of type definitions visited.
    pub fn preload_signatures(&self) -> usize {
        let definitions = self.type_defs();
        definitions.par_iter().for_each(|definition| {
            let _ = definition.base_type();
            let _ = definition.interfaces();
            for method in definition.methods() {
                let _ = method.signature();
            }
            for field in definition.fields() {
                let _ = field.signature();
            }
            for property in definition.properties() {
                let _ = property.signature();
            }
            for event in definition.events() {
                let _ = event.event_type();
            }
        });
        definitions.len()
    }
}

impl std::fmt::Debug for ModuleSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleSymbol")
            .field("name", &self.name())
            .field("type_defs", &self.type_defs.len())
            .finish_non_exhaustive()
    }
}

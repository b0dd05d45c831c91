use std::{
    fmt,
    sync::{Arc, OnceLock, Weak},
};

use crate::metadata::{
    customattributes,
    decoder,
    module::{ModuleRc, ModuleSymbol},
    reader::{TypeAttributes, TypeDefRow},
    token::Token,
    typesystem::{
        split_generic_arity, AnnotatedType, EventRc, EventSymbol, FieldRc, FieldSymbol, MethodRc,
        MethodSymbol, PropertyRc, PropertySymbol, SpecialType, TypeParameter,
        TypeParameterOwner, TypeRc, TypeSymbol,
    },
};

/// Reference to a `NamedTypeDef`
pub type NamedTypeDefRc = Arc<NamedTypeDef>;

/// The category of a type definition, derived from its flags and base type name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Reference type
    Class,
    /// Value type deriving from `System.ValueType`
    Struct,
    /// Value type deriving from `System.Enum`
    Enum,
    /// Interface
    Interface,
    /// Class deriving from `System.MulticastDelegate`
    Delegate,
}

/// An unconstructed type definition loaded from a TypeDef row.
///
/// Definitions are created once per module and token and live in the module's definition
/// map. They refer to their module weakly, and everything that needs metadata access
/// (members, base type, interfaces) is loaded on first use and published through a
/// `OnceLock`.
pub struct NamedTypeDef {
    /// The TypeDef token
    pub token: Token,
    /// Namespace, empty for nested types
    pub namespace: String,
    /// Metadata name, including the arity suffix
    pub name: String,
    /// Type flags
    pub flags: TypeAttributes,
    /// The `extends` token of the row
    pub extends: Token,
    /// Category of the type
    pub kind: TypeKind,
    /// Special type recognised by name
    pub special: SpecialType,
    /// `true` for embedded interop (NoPia) types
    pub is_local_type: bool,
    containing: Option<NamedTypeDefRc>,
    module: Weak<ModuleSymbol>,
    type_parameters: Vec<TypeRc>,
    declared_type: OnceLock<TypeRc>,
    base_type: OnceLock<Option<TypeRc>>,
    interfaces: OnceLock<Vec<TypeRc>>,
    nested: OnceLock<Vec<Weak<NamedTypeDef>>>,
    methods: OnceLock<Vec<MethodRc>>,
    fields: OnceLock<Vec<FieldRc>>,
    properties: OnceLock<Vec<PropertyRc>>,
    events: OnceLock<Vec<EventRc>>,
    nullable_context: OnceLock<Option<u8>>,
}

impl NamedTypeDef {
    /// Creates a definition from its row.
    ///
    /// `type_parameter_names` are the names of the parameters this type declares itself,
    /// i.e. without the ones it re-declares for its containing types.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        token: Token,
        row: TypeDefRow,
        kind: TypeKind,
        is_local_type: bool,
        containing: Option<NamedTypeDefRc>,
        module: Weak<ModuleSymbol>,
        type_parameter_names: Vec<String>,
    ) -> Self {
        let special = if containing.is_none() {
            SpecialType::from_metadata_name(&row.namespace, &row.name)
        } else {
            SpecialType::None
        };

        let type_parameters = type_parameter_names
            .into_iter()
            .enumerate()
            .map(|(ordinal, name)| {
                Arc::new(TypeSymbol::TypeParameter(TypeParameter {
                    ordinal: ordinal as u32,
                    owner: TypeParameterOwner::Type(token),
                    name: Some(name),
                }))
            })
            .collect();

        NamedTypeDef {
            token,
            namespace: row.namespace,
            name: row.name,
            flags: row.flags,
            extends: row.extends,
            kind,
            special,
            is_local_type,
            containing,
            module,
            type_parameters,
            declared_type: OnceLock::new(),
            base_type: OnceLock::new(),
            interfaces: OnceLock::new(),
            nested: OnceLock::new(),
            methods: OnceLock::new(),
            fields: OnceLock::new(),
            properties: OnceLock::new(),
            events: OnceLock::new(),
            nullable_context: OnceLock::new(),
        }
    }

    /// The module this type was loaded from, `None` once the module has been dropped
    #[must_use]
    pub fn module(&self) -> Option<ModuleRc> {
        self.module.upgrade()
    }

    /// The enclosing definition of a nested type
    #[must_use]
    pub fn containing(&self) -> Option<&NamedTypeDefRc> {
        self.containing.as_ref()
    }

    /// Type parameters declared by this type itself
    #[must_use]
    pub fn type_parameters(&self) -> &[TypeRc] {
        &self.type_parameters
    }

    /// Number of type parameters this type declares itself
    #[must_use]
    pub fn arity(&self) -> u32 {
        self.type_parameters.len() as u32
    }

    /// Number of type parameters including those of all containing types
    #[must_use]
    pub fn total_arity(&self) -> u32 {
        self.arity() + self.containing.as_ref().map_or(0, |c| c.total_arity())
    }

    /// All type parameters in scope, outermost container first
    #[must_use]
    pub fn all_type_parameters(&self) -> Vec<TypeRc> {
        let mut parameters = self
            .containing
            .as_ref()
            .map(|c| c.all_type_parameters())
            .unwrap_or_default();
        parameters.extend(self.type_parameters.iter().cloned());
        parameters
    }

    /// Resolves a type-level generic position (`!n`) against this type.
    ///
    /// Positions below the containing types' total arity belong to a container. A position
    /// past the total arity yields `None`.
    #[must_use]
    pub fn type_parameter_at(&self, position: u32) -> Option<TypeRc> {
        let outer = self.containing.as_ref().map_or(0, |c| c.total_arity());
        if position < outer {
            return self.containing.as_ref()?.type_parameter_at(position);
        }

        self.type_parameters
            .get((position - outer) as usize)
            .cloned()
    }

    /// Name without the arity suffix
    #[must_use]
    pub fn base_name(&self) -> &str {
        split_generic_arity(&self.name).0
    }

    /// `Namespace.Name` for top-level types, `Outer+Name` for nested ones
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.containing {
            Some(containing) => format!("{}+{}", containing.full_name(), self.name),
            None if self.namespace.is_empty() => self.name.clone(),
            None => format!("{}.{}", self.namespace, self.name),
        }
    }

    /// `true` for structs and enums
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        matches!(self.kind, TypeKind::Struct | TypeKind::Enum)
    }

    /// `true` for interfaces
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    /// The element count `n` if this is ``System.ValueTuple`n``
    #[must_use]
    pub fn value_tuple_arity(&self) -> Option<usize> {
        if self.containing.is_some() || self.namespace != "System" {
            return None;
        }

        match split_generic_arity(&self.name) {
            ("ValueTuple", arity) if (1..=8).contains(&arity) && arity == self.arity() => {
                Some(arity as usize)
            }
            _ => None,
        }
    }

    /// The type as it appears inside its own declaration: constructed over its own type
    /// parameters, nested in the declared type of its container.
    #[must_use]
    pub fn declared_type(self: &Arc<Self>) -> TypeRc {
        self.declared_type
            .get_or_init(|| {
                Arc::new(TypeSymbol::Named(NamedType {
                    definition: self.clone(),
                    containing: self.containing.as_ref().map(|c| c.declared_type()),
                    type_arguments: self
                        .type_parameters
                        .iter()
                        .map(|parameter| AnnotatedType::new(parameter.clone()))
                        .collect(),
                    native_integer: false,
                    tuple_names: None,
                }))
            })
            .clone()
    }

    /// The decoded base type, `None` for interfaces, `System.Object` and undecodable rows
    #[must_use]
    pub fn base_type(self: &Arc<Self>) -> Option<TypeRc> {
        self.base_type
            .get_or_init(|| {
                let module = self.module()?;
                decoder::decode_base_type(&module, self)
            })
            .clone()
    }

    /// Decoded interfaces from the InterfaceImpl rows
    #[must_use]
    pub fn interfaces(self: &Arc<Self>) -> &[TypeRc] {
        self.interfaces.get_or_init(|| match self.module() {
            Some(module) => decoder::decode_interfaces(&module, self),
            None => Vec::new(),
        })
    }

    /// Directly nested definitions
    #[must_use]
    pub fn nested_types(&self) -> Vec<NamedTypeDefRc> {
        self.nested
            .get_or_init(|| {
                let Some(module) = self.module() else {
                    return Vec::new();
                };

                match module.reader().nested_types(self.token) {
                    Ok(tokens) => tokens
                        .into_iter()
                        .filter_map(|token| module.type_def(token))
                        .map(|def| Arc::downgrade(&def))
                        .collect(),
                    Err(error) => {
                        log::warn!("nested types of {} could not be read - {error}", self.token);
                        Vec::new()
                    }
                }
            })
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// Methods in table order
    #[must_use]
    pub fn methods(self: &Arc<Self>) -> &[MethodRc] {
        self.methods.get_or_init(|| {
            self.load_members(
                |module| module.reader().methods(self.token),
                |module, token| MethodSymbol::load(module, token, Arc::downgrade(self)),
            )
        })
    }

    /// Fields in table order
    #[must_use]
    pub fn fields(self: &Arc<Self>) -> &[FieldRc] {
        self.fields.get_or_init(|| {
            self.load_members(
                |module| module.reader().fields(self.token),
                |module, token| FieldSymbol::load(module, token, Arc::downgrade(self)),
            )
        })
    }

    /// Properties in table order
    #[must_use]
    pub fn properties(self: &Arc<Self>) -> &[PropertyRc] {
        self.properties.get_or_init(|| {
            self.load_members(
                |module| module.reader().properties(self.token),
                |module, token| PropertySymbol::load(module, token, Arc::downgrade(self)),
            )
        })
    }

    /// Events in table order
    #[must_use]
    pub fn events(self: &Arc<Self>) -> &[EventRc] {
        self.events.get_or_init(|| {
            self.load_members(
                |module| module.reader().events(self.token),
                |module, token| EventSymbol::load(module, token, Arc::downgrade(self)),
            )
        })
    }

    fn load_members<T>(
        &self,
        list: impl FnOnce(&ModuleSymbol) -> crate::Result<Vec<Token>>,
        load: impl Fn(&ModuleSymbol, Token) -> crate::Result<T>,
    ) -> Vec<Arc<T>> {
        let Some(module) = self.module() else {
            return Vec::new();
        };

        let tokens = match list(&module) {
            Ok(tokens) => tokens,
            Err(error) => {
                log::warn!("members of {} could not be listed - {error}", self.token);
                return Vec::new();
            }
        };

        tokens
            .into_iter()
            .filter_map(|token| match load(&module, token) {
                Ok(member) => Some(Arc::new(member)),
                Err(error) => {
                    log::warn!("member {token} of {} could not be loaded - {error}", self.token);
                    None
                }
            })
            .collect()
    }

    /// The `NullableContextAttribute` byte that applies to members of this type: the
    /// type's own attribute, else the nearest containing type's.
    #[must_use]
    pub fn nullable_context(&self) -> Option<u8> {
        *self.nullable_context.get_or_init(|| {
            let own = self
                .module()
                .and_then(|module| customattributes::nullable_context(module.reader(), self.token));
            own.or_else(|| self.containing.as_ref().and_then(|c| c.nullable_context()))
        })
    }
}

impl fmt::Debug for NamedTypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedTypeDef")
            .field("token", &self.token)
            .field("name", &self.full_name())
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// A named type, possibly constructed.
///
/// `type_arguments` only holds the arguments for the definition's own type parameters;
/// arguments of containing types live on `containing`.
#[derive(Debug, Clone)]
pub struct NamedType {
    /// The definition
    pub definition: NamedTypeDefRc,
    /// The (possibly constructed) containing type of a nested type
    pub containing: Option<TypeRc>,
    /// Arguments for the definition's own type parameters
    pub type_arguments: Vec<AnnotatedType>,
    /// `true` if an `IntPtr`/`UIntPtr` has been decoded as `nint`/`nuint`
    pub native_integer: bool,
    /// Element names of a named tuple, one per element across the whole rest chain
    pub tuple_names: Option<Vec<Option<String>>>,
}

impl NamedType {
    /// The same node with a different container and arguments. Native-integer and tuple
    /// name information is kept.
    #[must_use]
    pub fn with_arguments(
        &self,
        containing: Option<TypeRc>,
        type_arguments: Vec<AnnotatedType>,
    ) -> TypeRc {
        Arc::new(TypeSymbol::Named(NamedType {
            definition: self.definition.clone(),
            containing,
            type_arguments,
            native_integer: self.native_integer,
            tuple_names: self.tuple_names.clone(),
        }))
    }

    /// The same node as `nint`/`nuint` (`true`) or plain `IntPtr`/`UIntPtr`
    #[must_use]
    pub fn with_native_integer(&self, native_integer: bool) -> TypeRc {
        Arc::new(TypeSymbol::Named(NamedType {
            native_integer,
            ..self.clone()
        }))
    }

    /// The same node carrying tuple element names
    #[must_use]
    pub fn with_tuple_names(&self, tuple_names: Option<Vec<Option<String>>>) -> TypeRc {
        Arc::new(TypeSymbol::Named(NamedType {
            tuple_names,
            ..self.clone()
        }))
    }

    /// Arguments of all containing types followed by this type's own
    #[must_use]
    pub fn all_type_arguments(&self) -> Vec<AnnotatedType> {
        let mut arguments = self
            .containing
            .as_ref()
            .and_then(|c| c.as_named())
            .map(NamedType::all_type_arguments)
            .unwrap_or_default();
        arguments.extend(self.type_arguments.iter().cloned());
        arguments
    }

    /// Number of tuple elements if this is a tuple, counting the whole rest chain.
    ///
    /// ``ValueTuple`8`` is only a tuple when its eighth argument is itself a tuple.
    #[must_use]
    pub fn tuple_cardinality(&self) -> Option<usize> {
        let arity = self.definition.value_tuple_arity()?;
        if self.type_arguments.len() != arity {
            return None;
        }

        if arity < 8 {
            return Some(arity);
        }

        let rest = self.type_arguments[7].ty.as_named()?.tuple_cardinality()?;
        Some(7 + rest)
    }

    /// `true` for tuple-shaped value tuple instantiations
    #[must_use]
    pub fn is_tuple(&self) -> bool {
        self.tuple_cardinality().is_some()
    }

    /// Element slots of a tuple, flattened across the rest chain
    #[must_use]
    pub fn tuple_elements(&self) -> Vec<AnnotatedType> {
        let mut elements = Vec::new();
        let mut current = Some(self);
        while let Some(tuple) = current {
            if tuple.type_arguments.len() == 8 {
                elements.extend(tuple.type_arguments[..7].iter().cloned());
                current = tuple.type_arguments[7].ty.as_named();
            } else {
                elements.extend(tuple.type_arguments.iter().cloned());
                current = None;
            }
        }
        elements
    }
}

impl fmt::Display for NamedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.native_integer {
            return match self.definition.special {
                SpecialType::UIntPtr => write!(f, "nuint"),
                _ => write!(f, "nint"),
            };
        }

        if self.is_tuple() {
            let elements = self.tuple_elements();
            write!(f, "(")?;
            for (index, element) in elements.iter().enumerate() {
                if index > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{element}")?;
                if let Some(Some(name)) = self.tuple_names.as_ref().and_then(|n| n.get(index)) {
                    write!(f, " {name}")?;
                }
            }
            return write!(f, ")");
        }

        match &self.containing {
            Some(containing) => write!(f, "{containing}+{}", self.definition.base_name())?,
            None if self.definition.namespace.is_empty() => {
                write!(f, "{}", self.definition.base_name())?;
            }
            None => write!(
                f,
                "{}.{}",
                self.definition.namespace,
                self.definition.base_name()
            )?,
        }

        if !self.type_arguments.is_empty() {
            write!(f, "<")?;
            for (index, argument) in self.type_arguments.iter().enumerate() {
                if index > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{argument}")?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

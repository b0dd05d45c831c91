use std::sync::{Arc, OnceLock, Weak};

use crate::{
    metadata::{
        decoder,
        module::ModuleSymbol,
        reader::{FieldAttributes, MethodAttributes, ParamRow},
        signatures::CallingConvention,
        token::Token,
        typesystem::{
            AnnotatedType, CustomModifier, NamedTypeDef, NamedTypeDefRc, TypeParameter,
            TypeParameterOwner, TypeRc, TypeSymbol,
        },
    },
    Result,
};

/// Reference to a `MethodSymbol`
pub type MethodRc = Arc<MethodSymbol>;
/// Reference to a `FieldSymbol`
pub type FieldRc = Arc<FieldSymbol>;
/// Reference to a `PropertySymbol`
pub type PropertyRc = Arc<PropertySymbol>;
/// Reference to an `EventSymbol`
pub type EventRc = Arc<EventSymbol>;

/// One decoded parameter or return slot
#[derive(Debug, Clone)]
pub struct ParamInfo {
    /// The slot type after every transform pass
    pub ty: AnnotatedType,
    /// `true` for `ref`/`out`/`in` slots
    pub by_ref: bool,
    /// Modifiers preceding `BYREF`
    pub ref_modifiers: Vec<CustomModifier>,
    /// The Param row the slot's attributes live on, nil if there is none
    pub host: Token,
    /// Name from the Param row
    pub name: Option<String>,
}

impl ParamInfo {
    pub(crate) fn unsupported(host: Token) -> Self {
        ParamInfo {
            ty: AnnotatedType::new(TypeSymbol::unsupported()),
            by_ref: false,
            ref_modifiers: Vec::new(),
            host,
            name: None,
        }
    }
}

/// A decoded `MethodDefSig`
#[derive(Debug, Clone)]
pub struct MethodSignature {
    /// The raw header byte
    pub header: u8,
    /// Number of method type parameters declared in the signature
    pub generic_arity: u32,
    /// The return slot
    pub return_param: ParamInfo,
    /// Parameters in declaration order
    pub params: Vec<ParamInfo>,
}

impl MethodSignature {
    /// Calling convention from the header
    #[must_use]
    pub fn calling_convention(&self) -> CallingConvention {
        CallingConvention::from_header(self.header)
    }
}

/// A method loaded from a MethodDef row
#[derive(Debug)]
pub struct MethodSymbol {
    /// The MethodDef token
    pub token: Token,
    /// Method name
    pub name: String,
    /// Method flags
    pub flags: MethodAttributes,
    pub(crate) signature_blob: Vec<u8>,
    pub(crate) param_rows: Vec<ParamRow>,
    containing: Weak<NamedTypeDef>,
    type_parameters: Vec<TypeRc>,
    signature: OnceLock<MethodSignature>,
}

impl MethodSymbol {
    pub(crate) fn load(
        module: &ModuleSymbol,
        token: Token,
        containing: Weak<NamedTypeDef>,
    ) -> Result<Self> {
        let row = module.reader().method_def(token)?;
        let type_parameters = module
            .reader()
            .generic_params(token)?
            .into_iter()
            .map(|param| {
                Arc::new(TypeSymbol::TypeParameter(TypeParameter {
                    ordinal: param.number,
                    owner: TypeParameterOwner::Method(token),
                    name: Some(param.name),
                }))
            })
            .collect();

        Ok(MethodSymbol {
            token,
            name: row.name,
            flags: row.flags,
            signature_blob: row.signature,
            param_rows: row.params,
            containing,
            type_parameters,
            signature: OnceLock::new(),
        })
    }

    /// The declaring type definition
    #[must_use]
    pub fn containing(&self) -> Option<NamedTypeDefRc> {
        self.containing.upgrade()
    }

    /// Method type parameters, ordered by position
    #[must_use]
    pub fn type_parameters(&self) -> &[TypeRc] {
        &self.type_parameters
    }

    /// Number of method type parameters
    #[must_use]
    pub fn arity(&self) -> u32 {
        self.type_parameters.len() as u32
    }

    /// `true` for static methods
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodAttributes::STATIC)
    }

    /// The decoded and transformed signature, computed on first access
    pub fn signature(&self) -> &MethodSignature {
        self.signature.get_or_init(|| {
            match self
                .containing()
                .and_then(|def| def.module().map(|module| (def, module)))
            {
                Some((def, module)) => decoder::decode_method_signature(&module, self, &def),
                None => MethodSignature {
                    header: 0,
                    generic_arity: self.arity(),
                    return_param: ParamInfo::unsupported(Token::new(0)),
                    params: Vec::new(),
                },
            }
        })
    }

    /// The decoded return slot
    pub fn return_param(&self) -> &ParamInfo {
        &self.signature().return_param
    }

    /// The decoded parameters
    pub fn params(&self) -> &[ParamInfo] {
        &self.signature().params
    }
}

/// A decoded `FieldSig`
#[derive(Debug, Clone)]
pub struct FieldSignature {
    /// Field type after every transform pass
    pub ty: AnnotatedType,
    /// `true` for ref fields
    pub by_ref: bool,
    /// Modifiers preceding `BYREF`
    pub ref_modifiers: Vec<CustomModifier>,
}

/// A field loaded from a Field row
#[derive(Debug)]
pub struct FieldSymbol {
    /// The Field token
    pub token: Token,
    /// Field name
    pub name: String,
    /// Field flags
    pub flags: FieldAttributes,
    pub(crate) signature_blob: Vec<u8>,
    containing: Weak<NamedTypeDef>,
    signature: OnceLock<FieldSignature>,
}

impl FieldSymbol {
    pub(crate) fn load(
        module: &ModuleSymbol,
        token: Token,
        containing: Weak<NamedTypeDef>,
    ) -> Result<Self> {
        let row = module.reader().field(token)?;
        Ok(FieldSymbol {
            token,
            name: row.name,
            flags: row.flags,
            signature_blob: row.signature,
            containing,
            signature: OnceLock::new(),
        })
    }

    /// The declaring type definition
    #[must_use]
    pub fn containing(&self) -> Option<NamedTypeDefRc> {
        self.containing.upgrade()
    }

    /// The decoded and transformed signature
    pub fn signature(&self) -> &FieldSignature {
        self.signature.get_or_init(|| {
            match self
                .containing()
                .and_then(|def| def.module().map(|module| (def, module)))
            {
                Some((def, module)) => decoder::decode_field_signature(&module, self, &def),
                None => FieldSignature {
                    ty: AnnotatedType::new(TypeSymbol::unsupported()),
                    by_ref: false,
                    ref_modifiers: Vec::new(),
                },
            }
        })
    }

    /// The decoded field type
    pub fn field_type(&self) -> &AnnotatedType {
        &self.signature().ty
    }
}

/// A decoded `PropertySig`
#[derive(Debug, Clone)]
pub struct PropertySignature {
    /// The raw header byte
    pub header: u8,
    /// The property type slot
    pub property: ParamInfo,
    /// Indexer parameters
    pub params: Vec<ParamInfo>,
}

/// A property loaded from a Property row
#[derive(Debug)]
pub struct PropertySymbol {
    /// The Property token
    pub token: Token,
    /// Property name
    pub name: String,
    pub(crate) signature_blob: Vec<u8>,
    containing: Weak<NamedTypeDef>,
    signature: OnceLock<PropertySignature>,
}

impl PropertySymbol {
    pub(crate) fn load(
        module: &ModuleSymbol,
        token: Token,
        containing: Weak<NamedTypeDef>,
    ) -> Result<Self> {
        let row = module.reader().property(token)?;
        Ok(PropertySymbol {
            token,
            name: row.name,
            signature_blob: row.signature,
            containing,
            signature: OnceLock::new(),
        })
    }

    /// The declaring type definition
    #[must_use]
    pub fn containing(&self) -> Option<NamedTypeDefRc> {
        self.containing.upgrade()
    }

    /// The decoded and transformed signature
    pub fn signature(&self) -> &PropertySignature {
        self.signature.get_or_init(|| {
            match self
                .containing()
                .and_then(|def| def.module().map(|module| (def, module)))
            {
                Some((def, module)) => decoder::decode_property_signature(&module, self, &def),
                None => PropertySignature {
                    header: 0,
                    property: ParamInfo::unsupported(self.token),
                    params: Vec::new(),
                },
            }
        })
    }
}

/// An event loaded from an Event row
#[derive(Debug)]
pub struct EventSymbol {
    /// The Event token
    pub token: Token,
    /// Event name
    pub name: String,
    pub(crate) event_type_token: Token,
    containing: Weak<NamedTypeDef>,
    event_type: OnceLock<AnnotatedType>,
}

impl EventSymbol {
    pub(crate) fn load(
        module: &ModuleSymbol,
        token: Token,
        containing: Weak<NamedTypeDef>,
    ) -> Result<Self> {
        let row = module.reader().event(token)?;
        Ok(EventSymbol {
            token,
            name: row.name,
            event_type_token: row.event_type,
            containing,
            event_type: OnceLock::new(),
        })
    }

    /// The declaring type definition
    #[must_use]
    pub fn containing(&self) -> Option<NamedTypeDefRc> {
        self.containing.upgrade()
    }

    /// The decoded delegate type of the event
    pub fn event_type(&self) -> &AnnotatedType {
        self.event_type.get_or_init(|| {
            match self
                .containing()
                .and_then(|def| def.module().map(|module| (def, module)))
            {
                Some((def, module)) => decoder::decode_event_type(&module, self, &def),
                None => AnnotatedType::new(TypeSymbol::unsupported()),
            }
        })
    }
}

/// Anything a metadata token can resolve to
#[derive(Debug, Clone)]
pub enum Symbol {
    /// A type
    Type(TypeRc),
    /// A method of a type definition
    Method(MethodRc),
    /// A field of a type definition
    Field(FieldRc),
}

impl Symbol {
    /// The type, if this is one
    #[must_use]
    pub fn as_type(&self) -> Option<&TypeRc> {
        match self {
            Symbol::Type(ty) => Some(ty),
            _ => None,
        }
    }

    /// The method, if this is one
    #[must_use]
    pub fn as_method(&self) -> Option<&MethodRc> {
        match self {
            Symbol::Method(method) => Some(method),
            _ => None,
        }
    }

    /// The field, if this is one
    #[must_use]
    pub fn as_field(&self) -> Option<&FieldRc> {
        match self {
            Symbol::Field(field) => Some(field),
            _ => None,
        }
    }
}

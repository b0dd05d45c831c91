use std::sync::Arc;

use crate::metadata::typesystem::{
    AnnotatedType, ArrayType, CustomModifier, FunctionPointerParam, FunctionPointerType, NamedType,
    NullableAnnotation, PointerType, TypeRc, TypeSymbol,
};

/// Maps type parameters to annotated types and rewrites type trees accordingly.
///
/// Parameters are matched by allocation, so a map built from a definition's declared
/// parameters only touches trees that reference those exact parameters. Subtrees that do
/// not change keep their identity.
#[derive(Debug, Clone, Default)]
pub struct TypeMap {
    entries: Vec<(TypeRc, AnnotatedType)>,
}

impl TypeMap {
    /// Pairs `parameters` with `arguments` positionally. Surplus entries on either side
    /// are ignored.
    #[must_use]
    pub fn new(parameters: &[TypeRc], arguments: Vec<AnnotatedType>) -> Self {
        TypeMap {
            entries: parameters.iter().cloned().zip(arguments).collect(),
        }
    }

    /// The map that turns the definition of `named` into `named`
    #[must_use]
    pub fn for_named_type(named: &NamedType) -> Self {
        TypeMap::new(
            &named.definition.all_type_parameters(),
            named.all_type_arguments(),
        )
    }

    /// Adds further pairs to the map
    #[must_use]
    pub fn with(mut self, parameters: &[TypeRc], arguments: Vec<AnnotatedType>) -> Self {
        self.entries
            .extend(parameters.iter().cloned().zip(arguments));
        self
    }

    /// `true` if the map has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, ty: &TypeRc) -> Option<&AnnotatedType> {
        self.entries
            .iter()
            .find(|(parameter, _)| Arc::ptr_eq(parameter, ty))
            .map(|(_, argument)| argument)
    }

    /// Substitutes within a slot.
    ///
    /// When the slot is a mapped parameter, the slot's modifiers come first, followed by the
    /// argument's. An annotated slot stays annotated, otherwise the argument's annotation is used.
    #[must_use]
    pub fn substitute_annotated(&self, slot: &AnnotatedType) -> AnnotatedType {
        if let Some(argument) = self.lookup(&slot.ty) {
            let mut modifiers = slot.modifiers.clone();
            modifiers.extend(argument.modifiers.iter().cloned());
            let nullable = match slot.nullable {
                NullableAnnotation::Annotated => NullableAnnotation::Annotated,
                _ => argument.nullable,
            };
            return AnnotatedType {
                ty: argument.ty.clone(),
                nullable,
                modifiers,
            };
        }

        let ty = self.substitute(&slot.ty);
        if Arc::ptr_eq(&ty, &slot.ty) {
            slot.clone()
        } else {
            slot.with_type(ty)
        }
    }

    /// Substitutes the modifier types of a modifier list
    #[must_use]
    pub fn substitute_modifiers(&self, modifiers: &[CustomModifier]) -> Vec<CustomModifier> {
        modifiers
            .iter()
            .map(|modifier| CustomModifier {
                modifier: self.substitute(&modifier.modifier),
                is_optional: modifier.is_optional,
            })
            .collect()
    }

    /// Substitutes within a bare type
    #[must_use]
    pub fn substitute(&self, ty: &TypeRc) -> TypeRc {
        if self.is_empty() {
            return ty.clone();
        }

        if let Some(argument) = self.lookup(ty) {
            return argument.ty.clone();
        }

        match &**ty {
            TypeSymbol::Named(named) => {
                let containing = named.containing.as_ref().map(|c| self.substitute(c));
                let arguments: Vec<AnnotatedType> = named
                    .type_arguments
                    .iter()
                    .map(|argument| self.substitute_annotated(argument))
                    .collect();

                let containing_same = match (&containing, &named.containing) {
                    (Some(new), Some(old)) => Arc::ptr_eq(new, old),
                    _ => true,
                };
                let arguments_same = arguments
                    .iter()
                    .zip(&named.type_arguments)
                    .all(|(new, old)| new.is_same_as(old));
                if containing_same && arguments_same {
                    return ty.clone();
                }

                Arc::new(TypeSymbol::Named(NamedType {
                    definition: named.definition.clone(),
                    containing,
                    type_arguments: arguments,
                    native_integer: named.native_integer,
                    tuple_names: named.tuple_names.clone(),
                }))
            }
            TypeSymbol::Array(array) => {
                let element = self.substitute_annotated(&array.element);
                if element.is_same_as(&array.element) {
                    return ty.clone();
                }
                Arc::new(TypeSymbol::Array(ArrayType {
                    element,
                    shape: array.shape.clone(),
                }))
            }
            TypeSymbol::Pointer(pointer) => {
                let pointed_at = self.substitute_annotated(&pointer.pointed_at);
                if pointed_at.is_same_as(&pointer.pointed_at) {
                    return ty.clone();
                }
                Arc::new(TypeSymbol::Pointer(PointerType { pointed_at }))
            }
            TypeSymbol::FunctionPointer(fnptr) => {
                let substitute_param = |param: &FunctionPointerParam| FunctionPointerParam {
                    ty: self.substitute_annotated(&param.ty),
                    ref_kind: param.ref_kind,
                    ref_modifiers: param.ref_modifiers.clone(),
                };

                let return_param = substitute_param(&fnptr.return_param);
                let params: Vec<FunctionPointerParam> =
                    fnptr.params.iter().map(substitute_param).collect();

                let unchanged = return_param.ty.is_same_as(&fnptr.return_param.ty)
                    && params
                        .iter()
                        .zip(&fnptr.params)
                        .all(|(new, old)| new.ty.is_same_as(&old.ty));
                if unchanged {
                    return ty.clone();
                }

                Arc::new(TypeSymbol::FunctionPointer(FunctionPointerType {
                    calling_convention: fnptr.calling_convention,
                    return_param,
                    params,
                }))
            }
            TypeSymbol::Error(_) | TypeSymbol::TypeParameter(_) | TypeSymbol::Dynamic => ty.clone(),
        }
    }
}

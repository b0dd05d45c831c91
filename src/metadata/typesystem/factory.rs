//! Builders for constructed types.
//!
//! Everything here is a pure function of already decoded parts. The metadata decoder uses
//! these when it first builds a type, and the transform passes use them when they rebuild
//! a node that changed.

use std::sync::Arc;

use crate::metadata::{
    assembly::AssemblyRc,
    signatures::CallingConvention,
    typesystem::{
        AnnotatedType, ArrayShape, ArrayType, ErrorType, FunctionPointerParam,
        FunctionPointerType, NamedType, NamedTypeDefRc, PointerType, TypeRc, TypeSymbol,
    },
};

/// Builds `element[]`
#[must_use]
pub fn make_sz_array(element: AnnotatedType) -> TypeRc {
    Arc::new(TypeSymbol::Array(ArrayType {
        element,
        shape: ArrayShape::SingleDimensional,
    }))
}

/// Builds a multi-dimensional array. `sizes` and `lower_bounds` may cover fewer
/// dimensions than `rank`.
#[must_use]
pub fn make_array(
    element: AnnotatedType,
    rank: u32,
    sizes: Vec<u32>,
    lower_bounds: Vec<i32>,
) -> TypeRc {
    Arc::new(TypeSymbol::Array(ArrayType {
        element,
        shape: ArrayShape::MultiDimensional {
            rank,
            sizes,
            lower_bounds,
        },
    }))
}

/// Builds `pointed_at*`
#[must_use]
pub fn make_pointer(pointed_at: AnnotatedType) -> TypeRc {
    Arc::new(TypeSymbol::Pointer(PointerType { pointed_at }))
}

/// Builds a function pointer type
#[must_use]
pub fn make_function_pointer(
    calling_convention: CallingConvention,
    return_param: FunctionPointerParam,
    params: Vec<FunctionPointerParam>,
) -> TypeRc {
    Arc::new(TypeSymbol::FunctionPointer(FunctionPointerType {
        calling_convention,
        return_param,
        params,
    }))
}

/// Builds one level of a named type
#[must_use]
pub fn construct_named(
    definition: &NamedTypeDefRc,
    containing: Option<TypeRc>,
    type_arguments: Vec<AnnotatedType>,
) -> TypeRc {
    Arc::new(TypeSymbol::Named(NamedType {
        definition: definition.clone(),
        containing,
        type_arguments,
        native_integer: false,
        tuple_names: None,
    }))
}

/// What the embedded interop check needs to know about the importing module
#[derive(Debug, Clone, Copy)]
pub struct NoPiaContext<'a> {
    /// Referenced assemblies whose interop types are embedded rather than referenced
    pub linked_assemblies: &'a [AssemblyRc],
    /// `true` if the importing module defines local (embedded) types itself
    pub module_has_local_types: bool,
}

impl NoPiaContext<'_> {
    /// A context in which the check never fires
    pub const NONE: NoPiaContext<'static> = NoPiaContext {
        linked_assemblies: &[],
        module_has_local_types: false,
    };

    fn is_active(&self) -> bool {
        self.module_has_local_types || !self.linked_assemblies.is_empty()
    }
}

/// Instantiates `generic` with `arguments`.
///
/// `arguments` cover the whole container chain, outermost container first, and must
/// match the definition's total arity. `refers_to_local[i]` tells whether argument `i`
/// was resolved through an embedded interop type. An instantiation over such a type (or
/// over a type from a linked assembly) is wrapped in
/// [`ErrorType::IllegalGenericInstantiation`], except for arguments of the interface
/// levels at the inner end of the chain.
#[must_use]
pub fn substitute_type_arguments(
    generic: &TypeRc,
    arguments: Vec<AnnotatedType>,
    refers_to_local: &[bool],
    no_pia: &NoPiaContext<'_>,
) -> TypeRc {
    let definition = match &**generic {
        TypeSymbol::Named(named) => named.definition.clone(),
        TypeSymbol::Error(ErrorType::Missing { .. }) => return generic.clone(),
        _ => return TypeSymbol::unsupported(),
    };

    if definition.total_arity() as usize != arguments.len() {
        return TypeSymbol::unsupported();
    }

    let mut chain = vec![definition.clone()];
    let mut current = definition.containing().cloned();
    while let Some(container) = current {
        current = container.containing().cloned();
        chain.push(container);
    }
    chain.reverse();

    let mut constructed: Option<TypeRc> = None;
    let mut offset = 0usize;
    for level in &chain {
        let arity = level.arity() as usize;
        if arity == 0 && offset == 0 {
            constructed = Some(level.declared_type());
            continue;
        }

        let level_arguments = arguments[offset..offset + arity].to_vec();
        offset += arity;
        constructed = Some(construct_named(level, constructed.take(), level_arguments));
    }

    let Some(result) = constructed else {
        return TypeSymbol::unsupported();
    };

    if !no_pia.is_active() {
        return result;
    }

    let mut last_checked = arguments.len() as isize - 1;
    for level in chain.iter().rev() {
        if !level.is_interface() {
            break;
        }
        last_checked -= level.arity() as isize;
    }

    for index in (0..=last_checked).rev() {
        let index = index as usize;
        let local = refers_to_local.get(index).copied().unwrap_or(false);
        if local
            || (!no_pia.linked_assemblies.is_empty()
                && is_or_closed_over_type_from(&arguments[index].ty, no_pia.linked_assemblies))
        {
            return Arc::new(TypeSymbol::Error(ErrorType::IllegalGenericInstantiation {
                underlying: result,
            }));
        }
    }

    result
}

/// `true` if `ty` is defined in, or is constructed over a type defined in, one of `assemblies`
#[must_use]
pub fn is_or_closed_over_type_from(ty: &TypeRc, assemblies: &[AssemblyRc]) -> bool {
    match &**ty {
        TypeSymbol::Named(named) => {
            let defined_there = named
                .definition
                .module()
                .and_then(|module| module.assembly())
                .is_some_and(|assembly| assemblies.iter().any(|a| Arc::ptr_eq(a, &assembly)));

            defined_there
                || named
                    .containing
                    .as_ref()
                    .is_some_and(|c| is_or_closed_over_type_from(c, assemblies))
                || named
                    .type_arguments
                    .iter()
                    .any(|argument| is_or_closed_over_type_from(&argument.ty, assemblies))
        }
        TypeSymbol::Array(array) => is_or_closed_over_type_from(&array.element.ty, assemblies),
        TypeSymbol::Pointer(pointer) => {
            is_or_closed_over_type_from(&pointer.pointed_at.ty, assemblies)
        }
        TypeSymbol::FunctionPointer(fnptr) => {
            is_or_closed_over_type_from(&fnptr.return_param.ty.ty, assemblies)
                || fnptr
                    .params
                    .iter()
                    .any(|param| is_or_closed_over_type_from(&param.ty.ty, assemblies))
        }
        TypeSymbol::Error(_) | TypeSymbol::TypeParameter(_) | TypeSymbol::Dynamic => false,
    }
}

use std::sync::Arc;

use bitflags::bitflags;

use crate::metadata::typesystem::{
    AnnotatedType, CustomModifier, ErrorType, FunctionPointerParam, NamedType,
    TypeParameterOwner, TypeRc, TypeSymbol,
};

bitflags! {
    /// Which facets two types may differ in and still compare equal
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeCompareKind: u8 {
        /// `dynamic` equals `object`
        const IGNORE_DYNAMIC = 0x01;
        /// Tuple element names are not compared
        const IGNORE_TUPLE_NAMES = 0x02;
        /// Nullable annotations are not compared
        const IGNORE_NULLABLE = 0x04;
        /// `nint`/`nuint` equal `IntPtr`/`UIntPtr`
        const IGNORE_NATIVE_INTEGERS = 0x08;
        /// Custom modifiers are not compared
        const IGNORE_CUSTOM_MODIFIERS = 0x10;
        /// Everything the runtime signature cannot see
        const CLR_SIGNATURE = Self::IGNORE_DYNAMIC.bits()
            | Self::IGNORE_TUPLE_NAMES.bits()
            | Self::IGNORE_NULLABLE.bits()
            | Self::IGNORE_NATIVE_INTEGERS.bits();
    }
}

/// Structural type equality under `kind`.
///
/// Named types are equal when they share the same definition allocation and their
/// containing types and arguments compare equal. Declared type parameters are equal only
/// to themselves, positional placeholders are equal by position.
#[must_use]
pub fn types_equal(a: &TypeRc, b: &TypeRc, kind: TypeCompareKind) -> bool {
    if Arc::ptr_eq(a, b) {
        return true;
    }

    match (&**a, &**b) {
        (TypeSymbol::Dynamic, TypeSymbol::Dynamic) => true,
        (TypeSymbol::Dynamic, other) | (other, TypeSymbol::Dynamic) => {
            kind.contains(TypeCompareKind::IGNORE_DYNAMIC) && other.is_object()
        }
        (TypeSymbol::Named(x), TypeSymbol::Named(y)) => named_equal(x, y, kind),
        (TypeSymbol::Array(x), TypeSymbol::Array(y)) => {
            x.shape == y.shape && annotated_equal(&x.element, &y.element, kind)
        }
        (TypeSymbol::Pointer(x), TypeSymbol::Pointer(y)) => {
            annotated_equal(&x.pointed_at, &y.pointed_at, kind)
        }
        (TypeSymbol::FunctionPointer(x), TypeSymbol::FunctionPointer(y)) => {
            x.calling_convention == y.calling_convention
                && x.params.len() == y.params.len()
                && fnptr_param_equal(&x.return_param, &y.return_param, kind)
                && x
                    .params
                    .iter()
                    .zip(&y.params)
                    .all(|(p, q)| fnptr_param_equal(p, q, kind))
        }
        (TypeSymbol::TypeParameter(x), TypeSymbol::TypeParameter(y)) => match (x.owner, y.owner) {
            (
                TypeParameterOwner::Placeholder { method: m },
                TypeParameterOwner::Placeholder { method: n },
            ) => m == n && x.ordinal == y.ordinal,
            _ => false,
        },
        (
            TypeSymbol::Error(ErrorType::Missing {
                namespace: ns1,
                name: n1,
                arity: a1,
            }),
            TypeSymbol::Error(ErrorType::Missing {
                namespace: ns2,
                name: n2,
                arity: a2,
            }),
        ) => ns1 == ns2 && n1 == n2 && a1 == a2,
        _ => false,
    }
}

fn named_equal(x: &NamedType, y: &NamedType, kind: TypeCompareKind) -> bool {
    if !Arc::ptr_eq(&x.definition, &y.definition) {
        return false;
    }

    if !kind.contains(TypeCompareKind::IGNORE_NATIVE_INTEGERS)
        && x.native_integer != y.native_integer
    {
        return false;
    }

    if !kind.contains(TypeCompareKind::IGNORE_TUPLE_NAMES) && x.tuple_names != y.tuple_names {
        return false;
    }

    let containers_equal = match (&x.containing, &y.containing) {
        (Some(c), Some(d)) => types_equal(c, d, kind),
        (None, None) => true,
        _ => false,
    };

    containers_equal
        && x.type_arguments.len() == y.type_arguments.len()
        && x
            .type_arguments
            .iter()
            .zip(&y.type_arguments)
            .all(|(p, q)| annotated_equal(p, q, kind))
}

fn fnptr_param_equal(x: &FunctionPointerParam, y: &FunctionPointerParam, kind: TypeCompareKind) -> bool {
    x.ref_kind == y.ref_kind
        && annotated_equal(&x.ty, &y.ty, kind)
        && (kind.contains(TypeCompareKind::IGNORE_CUSTOM_MODIFIERS)
            || modifiers_equal(&x.ref_modifiers, &y.ref_modifiers))
}

/// Compares two slots: their types, annotations and modifiers under `kind`
#[must_use]
pub fn annotated_equal(a: &AnnotatedType, b: &AnnotatedType, kind: TypeCompareKind) -> bool {
    types_equal(&a.ty, &b.ty, kind)
        && (kind.contains(TypeCompareKind::IGNORE_NULLABLE) || a.nullable == b.nullable)
        && (kind.contains(TypeCompareKind::IGNORE_CUSTOM_MODIFIERS)
            || modifiers_equal(&a.modifiers, &b.modifiers))
}

/// Two modifier lists match when they have the same length and agree pairwise in
/// optionality and modifier type
#[must_use]
pub fn modifiers_equal(a: &[CustomModifier], b: &[CustomModifier]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            x.is_optional == y.is_optional
                && types_equal(&x.modifier, &y.modifier, TypeCompareKind::empty())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::typesystem::{ArrayShape, ArrayType, NullableAnnotation};

    #[test]
    fn test_placeholders_compare_by_position() {
        let a = TypeSymbol::placeholder(0, true);
        let b = TypeSymbol::placeholder(0, true);
        let c = TypeSymbol::placeholder(0, false);
        let d = TypeSymbol::placeholder(1, true);

        assert!(types_equal(&a, &b, TypeCompareKind::empty()));
        assert!(!types_equal(&a, &c, TypeCompareKind::empty()));
        assert!(!types_equal(&a, &d, TypeCompareKind::empty()));
    }

    #[test]
    fn test_arrays_and_annotations() {
        let element = TypeSymbol::placeholder(0, false);
        let array = |nullable| {
            Arc::new(TypeSymbol::Array(ArrayType {
                element: AnnotatedType::new(element.clone()).with_nullable(nullable),
                shape: ArrayShape::SingleDimensional,
            }))
        };

        let plain = array(NullableAnnotation::Oblivious);
        let annotated = array(NullableAnnotation::Annotated);
        assert!(!types_equal(&plain, &annotated, TypeCompareKind::empty()));
        assert!(types_equal(&plain, &annotated, TypeCompareKind::CLR_SIGNATURE));
    }

    #[test]
    fn test_modifiers() {
        let modifier = TypeSymbol::placeholder(3, false);
        let required = CustomModifier {
            modifier: modifier.clone(),
            is_optional: false,
        };
        let optional = CustomModifier {
            modifier,
            is_optional: true,
        };

        assert!(modifiers_equal(&[required.clone()], &[required.clone()]));
        assert!(!modifiers_equal(&[required.clone()], &[optional]));
        assert!(!modifiers_equal(&[required], &[]));
    }

    #[test]
    fn test_errors() {
        let unsupported = TypeSymbol::unsupported();
        assert!(!types_equal(&unsupported, &TypeSymbol::unsupported(), TypeCompareKind::empty()));
        assert!(types_equal(&unsupported, &unsupported, TypeCompareKind::empty()));
        assert!(types_equal(
            &TypeSymbol::missing("N", "A`1"),
            &TypeSymbol::missing("N", "A`1"),
            TypeCompareKind::empty()
        ));
    }
}

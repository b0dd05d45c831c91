//! Restores tuple element names from `TupleElementNamesAttribute`.
//!
//! The attribute lists the names of every tuple in the slot, outer tuples first and each
//! tuple's names in element order. Walking the type in reverse pre-order lets the decoder
//! take names from the end of the list: it always reaches a tuple's elements before the
//! tuple itself.

use std::sync::Arc;

use crate::metadata::{
    customattributes::{self, DecodedFlags},
    decoder::cursor::NameCursor,
    module::ModuleSymbol,
    token::Token,
    typesystem::{
        AnnotatedType, ArrayType, FunctionPointerParam, FunctionPointerType, NamedType,
        PointerType, TypeRc, TypeSymbol,
    },
};

struct TupleDecoder<'a> {
    names: Option<NameCursor<'a>>,
    failed: bool,
    found_error: bool,
}

impl TupleDecoder<'_> {
    fn decode(&mut self, ty: &TypeRc) -> TypeRc {
        match &**ty {
            TypeSymbol::Named(named) => self.decode_named(ty, named),
            TypeSymbol::Array(array) => {
                let element = self.decode(&array.element.ty);
                if Arc::ptr_eq(&element, &array.element.ty) {
                    return ty.clone();
                }

                Arc::new(TypeSymbol::Array(ArrayType {
                    element: array.element.with_type(element),
                    shape: array.shape.clone(),
                }))
            }
            TypeSymbol::Pointer(pointer) => {
                let pointed_at = self.decode(&pointer.pointed_at.ty);
                if Arc::ptr_eq(&pointed_at, &pointer.pointed_at.ty) {
                    return ty.clone();
                }

                Arc::new(TypeSymbol::Pointer(PointerType {
                    pointed_at: pointer.pointed_at.with_type(pointed_at),
                }))
            }
            TypeSymbol::FunctionPointer(function) => {
                // Parameters last to first, then the return
                let mut params = Vec::with_capacity(function.params.len());
                let mut changed = false;
                for param in function.params.iter().rev() {
                    let decoded = self.decode_param(param);
                    changed |= !Arc::ptr_eq(&decoded.ty.ty, &param.ty.ty);
                    params.push(decoded);
                }
                params.reverse();

                let return_param = self.decode_param(&function.return_param);
                changed |= !Arc::ptr_eq(&return_param.ty.ty, &function.return_param.ty.ty);

                if !changed {
                    return ty.clone();
                }

                Arc::new(TypeSymbol::FunctionPointer(FunctionPointerType {
                    calling_convention: function.calling_convention,
                    return_param,
                    params,
                }))
            }
            TypeSymbol::Error(_) => {
                self.found_error = true;
                ty.clone()
            }
            TypeSymbol::TypeParameter(_) | TypeSymbol::Dynamic => ty.clone(),
        }
    }

    fn decode_named(&mut self, ty: &TypeRc, named: &NamedType) -> TypeRc {
        if let Some(cardinality) = named.tuple_cardinality() {
            return self.decode_tuple(ty, named, cardinality);
        }

        let arguments = self.decode_arguments(&named.type_arguments);
        let containing = match &named.containing {
            Some(container) => Some(match container.as_named() {
                Some(outer) => self.decode_named(container, outer),
                None => container.clone(),
            }),
            None => None,
        };

        let changed = match (&containing, &named.containing) {
            (Some(new), Some(old)) => !Arc::ptr_eq(new, old),
            _ => false,
        } || arguments
            .iter()
            .zip(&named.type_arguments)
            .any(|(new, old)| !Arc::ptr_eq(&new.ty, &old.ty));

        if !changed {
            return ty.clone();
        }

        named.with_arguments(containing, arguments)
    }

    /// Decodes arguments last to first, returning them in declaration order
    fn decode_arguments(&mut self, arguments: &[AnnotatedType]) -> Vec<AnnotatedType> {
        let mut decoded: Vec<AnnotatedType> = arguments
            .iter()
            .rev()
            .map(|argument| {
                let ty = self.decode(&argument.ty);
                if Arc::ptr_eq(&ty, &argument.ty) {
                    argument.clone()
                } else {
                    argument.with_type(ty)
                }
            })
            .collect();
        decoded.reverse();
        decoded
    }

    fn decode_tuple(&mut self, ty: &TypeRc, named: &NamedType, cardinality: usize) -> TypeRc {
        let elements = named.tuple_elements();
        let decoded = self.decode_arguments(&elements);
        let rebuilt = rebuild_tuple(ty, named, &decoded);

        let names = self.take_names(cardinality);
        if names == named.tuple_names {
            return rebuilt;
        }

        match rebuilt.as_named() {
            Some(outer) => outer.with_tuple_names(names),
            None => rebuilt,
        }
    }

    /// Names for a tuple of `cardinality` elements. All-`None` names mean an unnamed tuple.
    fn take_names(&mut self, cardinality: usize) -> Option<Vec<Option<String>>> {
        let cursor = self.names.as_mut()?;
        match cursor.take_back(cardinality) {
            Some(taken) if taken.iter().any(Option::is_some) => Some(taken.to_vec()),
            Some(_) => None,
            None => {
                self.failed = true;
                None
            }
        }
    }

    fn decode_param(&mut self, param: &FunctionPointerParam) -> FunctionPointerParam {
        let ty = self.decode(&param.ty.ty);
        FunctionPointerParam {
            ty: param.ty.with_type(ty),
            ref_kind: param.ref_kind,
            ref_modifiers: param.ref_modifiers.clone(),
        }
    }
}

/// Puts decoded `elements` back into the tuple node `ty` and its rest chain
fn rebuild_tuple(ty: &TypeRc, named: &NamedType, elements: &[AnnotatedType]) -> TypeRc {
    let arguments = if named.type_arguments.len() == 8 {
        let rest = &named.type_arguments[7];
        let rebuilt_rest = match rest.ty.as_named() {
            Some(rest_named) => rebuild_tuple(&rest.ty, rest_named, &elements[7..]),
            None => rest.ty.clone(),
        };

        let mut arguments = elements[..7].to_vec();
        arguments.push(if Arc::ptr_eq(&rebuilt_rest, &rest.ty) {
            rest.clone()
        } else {
            rest.with_type(rebuilt_rest)
        });
        arguments
    } else {
        elements.to_vec()
    };

    let unchanged = arguments
        .iter()
        .zip(&named.type_arguments)
        .all(|(new, old)| Arc::ptr_eq(&new.ty, &old.ty));
    if unchanged {
        return ty.clone();
    }

    named.with_arguments(named.containing.clone(), arguments)
}

/// Applies a list of tuple element names to `ty`. `None` stands for a slot without the
/// attribute.
///
/// Too few names or leftover names yield the unsupported sentinel, unless the type contains
/// an error type, in which case it is returned unchanged.
#[must_use]
pub fn transform_with_names(ty: &TypeRc, names: Option<&[Option<String>]>) -> TypeRc {
    let mut decoder = TupleDecoder {
        names: names.map(NameCursor::new),
        failed: false,
        found_error: false,
    };

    let decoded = decoder.decode(ty);
    let all_used = decoder
        .names
        .as_ref()
        .map_or(true, |cursor| cursor.remaining() == 0);
    if !decoder.failed && all_used {
        return decoded;
    }

    if decoder.found_error {
        return ty.clone();
    }

    log::debug!("tuple element names {names:?} do not fit {ty}");
    TypeSymbol::unsupported()
}

/// Applies the `TupleElementNamesAttribute` found on `host` to `ty`.
///
/// Without the attribute `ty` is returned unchanged. An empty or malformed name list yields
/// the unsupported sentinel.
#[must_use]
pub fn decode_tuple_names(ty: &TypeRc, host: Token, module: &ModuleSymbol) -> TypeRc {
    match customattributes::tuple_element_names(module.reader(), host) {
        DecodedFlags::Absent => ty.clone(),
        DecodedFlags::Values(names) if !names.is_empty() => transform_with_names(ty, Some(&names)),
        _ => {
            log::debug!("TupleElementNamesAttribute on {host} could not be decoded");
            TypeSymbol::unsupported()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        decoder::testing::{construct, named, Fixture},
        signatures::TypeSignature,
        typesystem::{factory, types_equal, TypeCompareKind},
    };

    fn names(list: &[Option<&str>]) -> Vec<Option<String>> {
        list.iter().map(|name| name.map(str::to_string)).collect()
    }

    #[test]
    fn test_nested_tuple_names() {
        let fixture = Fixture::new();
        let int32 = named(&fixture.core, "System", "Int32");
        let string = named(&fixture.core, "System", "String");
        let inner = construct(&fixture.core, "System", "ValueTuple`2", vec![string.clone(), string]);
        let outer = construct(&fixture.core, "System", "ValueTuple`2", vec![int32, inner]);

        let list = names(&[Some("id"), Some("pair"), Some("a"), Some("b")]);
        let decoded = transform_with_names(&outer, Some(&list));
        assert_eq!(
            decoded.to_string(),
            "(System.Int32 id, (System.String a, System.String b) pair)"
        );
        assert!(types_equal(&decoded, &outer, TypeCompareKind::IGNORE_TUPLE_NAMES));
    }

    #[test]
    fn test_long_tuples_flatten_the_rest_chain() {
        let fixture = Fixture::new();
        let int32 = named(&fixture.core, "System", "Int32");
        let rest = construct(&fixture.core, "System", "ValueTuple`2", vec![int32.clone(), int32.clone()]);
        let mut arguments = vec![int32; 7];
        arguments.push(rest);
        let long = construct(&fixture.core, "System", "ValueTuple`8", arguments);

        let list: Vec<Option<String>> = (0..9).map(|i| Some(format!("e{i}"))).collect();
        let decoded = transform_with_names(&long, Some(&list));
        let outer = decoded.as_named().unwrap();
        assert_eq!(outer.tuple_names.as_ref().unwrap().len(), 9);
        assert_eq!(outer.type_arguments[7].ty.as_named().unwrap().tuple_names, None);
        assert!(decoded.to_string().ends_with("System.Int32 e8)"));
    }

    #[test]
    fn test_unnamed_and_mismatched() {
        let fixture = Fixture::new();
        let int32 = named(&fixture.core, "System", "Int32");
        let pair = construct(&fixture.core, "System", "ValueTuple`2", vec![int32.clone(), int32]);

        let unnamed = transform_with_names(&pair, Some(&names(&[None, None])));
        assert!(Arc::ptr_eq(&unnamed, &pair));

        assert!(transform_with_names(&pair, Some(&names(&[Some("a")]))).is_unsupported());
        let too_many = names(&[Some("a"), Some("b"), Some("c")]);
        assert!(transform_with_names(&pair, Some(&too_many)).is_unsupported());
    }

    #[test]
    fn test_error_types_keep_the_original() {
        let fixture = Fixture::new();
        let int32 = named(&fixture.core, "System", "Int32");
        let missing = TypeSymbol::missing("Gone", "Thing");
        let pair = construct(&fixture.core, "System", "ValueTuple`2", vec![int32, missing]);
        let array = factory::make_sz_array(AnnotatedType::new(pair));

        let decoded = transform_with_names(&array, Some(&names(&[Some("a")])));
        assert!(Arc::ptr_eq(&decoded, &array));
    }

    #[test]
    fn test_attribute_lookup() {
        let (fixture, (named_field, empty_field)) = Fixture::with_app(|builder| {
            let owner = builder.type_def("App", "Holder", Token::new(0));
            let named_field = builder.simple_field(owner, "a", TypeSignature::Object).unwrap();
            builder
                .tuple_element_names_attribute(named_field, &[Some("x"), Some("y")])
                .unwrap();
            let empty_field = builder.simple_field(owner, "b", TypeSignature::Object).unwrap();
            builder.tuple_element_names_attribute(empty_field, &[]).unwrap();
            (named_field, empty_field)
        });
        let string = named(&fixture.core, "System", "String");
        let pair = construct(&fixture.core, "System", "ValueTuple`2", vec![string.clone(), string]);

        let decoded = decode_tuple_names(&pair, named_field, &fixture.app);
        assert_eq!(decoded.to_string(), "(System.String x, System.String y)");
        assert!(decode_tuple_names(&pair, empty_field, &fixture.app).is_unsupported());
    }
}

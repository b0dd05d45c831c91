//! Finds the member a MemberRef row refers to.
//!
//! The MemberRef signature is decoded against the (possibly constructed) containing type:
//! `!n` becomes the n-th type argument and `!!n` a positional placeholder. Each candidate
//! with the right name and shape is substituted the same way and compared without regard
//! to tuple names, nullability, native integers or `dynamic`.

use crate::metadata::{
    decoder::{MetadataDecoder, MethodContext, TypeContext},
    module::ModuleSymbol,
    signatures::{SignatureParameter, SignatureParser, SIGNATURE_HEADER},
    token::Token,
    typesystem::{
        modifiers_equal, types_equal, AnnotatedType, CustomModifier, FieldRc, MethodRc,
        NamedTypeDefRc, ParamInfo, Symbol, TypeCompareKind, TypeMap, TypeRc, TypeSymbol,
    },
};

/// A slot of the MemberRef signature, decoded
struct TargetSlot {
    ty: TypeRc,
    modifiers: Vec<CustomModifier>,
    by_ref: bool,
    ref_modifiers: Vec<CustomModifier>,
}

impl TargetSlot {
    fn decode(decoder: &MetadataDecoder<'_>, param: &SignatureParameter) -> Self {
        TargetSlot {
            ty: decoder.decode_type(&param.base),
            modifiers: decoder.decode_modifiers(&param.modifiers),
            by_ref: param.by_ref,
            ref_modifiers: decoder.decode_modifiers(&param.ref_modifiers),
        }
    }

    fn matches(
        &self,
        map: &TypeMap,
        ty: &AnnotatedType,
        by_ref: bool,
        ref_modifiers: &[CustomModifier],
    ) -> bool {
        self.by_ref == by_ref
            && types_equal(
                &map.substitute(&ty.ty),
                &self.ty,
                TypeCompareKind::CLR_SIGNATURE,
            )
            && modifiers_equal(&map.substitute_modifiers(&ty.modifiers), &self.modifiers)
            && modifiers_equal(&map.substitute_modifiers(ref_modifiers), &self.ref_modifiers)
    }
}

/// Finds the method or field of `containing` that the MemberRef `member_ref` of `module`
/// names. With `methods_only`, field references yield `None`.
///
/// The first candidate whose signature matches wins. A row or signature that cannot be read,
/// or a containing type that is not a named type, yields `None`.
#[must_use]
pub fn find_member(
    module: &ModuleSymbol,
    containing: &TypeRc,
    member_ref: Token,
    methods_only: bool,
) -> Option<Symbol> {
    let TypeSymbol::Named(named) = &**containing else {
        log::debug!("MemberRef {member_ref} points into {containing}, which has no members");
        return None;
    };

    let row = match module.reader().member_ref(member_ref) {
        Ok(row) => row,
        Err(error) => {
            log::debug!("MemberRef {member_ref} could not be read - {error}");
            return None;
        }
    };

    let arguments = named.all_type_arguments();
    let map = TypeMap::new(&named.definition.all_type_parameters(), arguments.clone());
    let decoder = MetadataDecoder::new(module)
        .with_type_context(TypeContext::Arguments(arguments))
        .with_method_context(MethodContext::Placeholders);

    let header = *row.signature.first()?;
    let mut parser =
        SignatureParser::with_max_depth(&row.signature, module.options().max_signature_depth);

    if header & SIGNATURE_HEADER::KIND_MASK == SIGNATURE_HEADER::FIELD {
        if methods_only {
            return None;
        }

        let signature = parser
            .parse_field_signature()
            .map_err(|error| log::debug!("MemberRef {member_ref} signature - {error}"))
            .ok()?;
        let target = TargetSlot {
            ty: decoder.decode_type(&signature.base),
            modifiers: decoder.decode_modifiers(&signature.modifiers),
            by_ref: signature.by_ref,
            ref_modifiers: decoder.decode_modifiers(&signature.ref_modifiers),
        };

        return find_field(&named.definition, &row.name, &target, &map).map(Symbol::Field);
    }

    let signature = parser
        .parse_method_signature()
        .map_err(|error| log::debug!("MemberRef {member_ref} signature - {error}"))
        .ok()?;
    let target_return = TargetSlot::decode(&decoder, &signature.return_type);
    let target_params: Vec<TargetSlot> = signature
        .params
        .iter()
        .map(|param| TargetSlot::decode(&decoder, param))
        .collect();

    named
        .definition
        .methods()
        .iter()
        .filter(|method| {
            method.name == row.name
                && method.signature_blob.first() == Some(&header)
                && method.arity() == signature.param_count_generic
        })
        .find(|method| method_matches(method, &map, &target_return, &target_params))
        .cloned()
        .map(Symbol::Method)
}

fn find_field(
    definition: &NamedTypeDefRc,
    name: &str,
    target: &TargetSlot,
    map: &TypeMap,
) -> Option<FieldRc> {
    definition
        .fields()
        .iter()
        .filter(|field| field.name == name)
        .find(|field| {
            let signature = field.signature();
            target.matches(map, &signature.ty, signature.by_ref, &signature.ref_modifiers)
        })
        .cloned()
}

fn method_matches(
    method: &MethodRc,
    map: &TypeMap,
    target_return: &TargetSlot,
    target_params: &[TargetSlot],
) -> bool {
    let candidate = method.signature();
    if candidate.params.len() != target_params.len() {
        return false;
    }

    let placeholders = (0..method.arity())
        .map(|ordinal| AnnotatedType::new(TypeSymbol::placeholder(ordinal, true)))
        .collect();
    let map = map.clone().with(method.type_parameters(), placeholders);

    let slot_matches = |target: &TargetSlot, param: &ParamInfo| {
        target.matches(&map, &param.ty, param.by_ref, &param.ref_modifiers)
    };

    slot_matches(target_return, &candidate.return_param)
        && target_params
            .iter()
            .zip(&candidate.params)
            .all(|(target, param)| slot_matches(target, param))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        decoder::testing::Fixture,
        image::{instance_method, ImageBuilder},
        reader::MethodAttributes,
        signatures::{
            SignatureField, SignatureMethod, SignatureSzArray, SignatureTypeArgument,
            TypeSignature,
        },
    };

    fn generic_method(params: Vec<TypeSignature>) -> SignatureMethod {
        SignatureMethod {
            header: 0x30,
            param_count_generic: 1,
            return_type: SignatureParameter {
                base: TypeSignature::Void,
                ..Default::default()
            },
            params: params
                .into_iter()
                .map(|base| SignatureParameter {
                    base,
                    ..Default::default()
                })
                .collect(),
            varargs: Vec::new(),
        }
    }

    #[test]
    fn test_overloads_on_a_constructed_type() {
        let (fixture, (first, by_signature, field_ref, missing)) = Fixture::with_app(|builder| {
            let box_def = builder.type_def("App", "Box`1", Token::new(0));
            builder.generic_param(box_def, "T");

            let first = builder
                .method(
                    box_def,
                    "Put",
                    MethodAttributes::PUBLIC,
                    &instance_method(TypeSignature::Void, vec![TypeSignature::GenericParamType(0)]),
                )
                .unwrap();
            builder
                .method(
                    box_def,
                    "Put",
                    MethodAttributes::PUBLIC,
                    &instance_method(TypeSignature::Void, vec![TypeSignature::String]),
                )
                .unwrap();
            builder
                .simple_field(box_def, "value", TypeSignature::GenericParamType(0))
                .unwrap();

            let box_of_int = builder
                .type_spec(&TypeSignature::GenericInst(
                    Box::new(TypeSignature::Class(box_def)),
                    vec![SignatureTypeArgument {
                        modifiers: Vec::new(),
                        base: TypeSignature::I4,
                    }],
                ))
                .unwrap();

            // Put(!0) as seen through Box<int>
            let by_signature = builder
                .method_ref(
                    box_of_int,
                    "Put",
                    &instance_method(TypeSignature::Void, vec![TypeSignature::GenericParamType(0)]),
                )
                .unwrap();
            let field_ref = builder
                .field_ref(
                    box_of_int,
                    "value",
                    &SignatureField {
                        base: TypeSignature::GenericParamType(0),
                        ..Default::default()
                    },
                )
                .unwrap();
            let missing = builder
                .method_ref(
                    box_of_int,
                    "Put",
                    &instance_method(TypeSignature::Void, vec![TypeSignature::I8]),
                )
                .unwrap();
            (first, by_signature, field_ref, missing)
        });
        let module = &fixture.app;

        let resolved = module.get_symbol_for_member_ref(by_signature).unwrap();
        assert_eq!(resolved.as_method().unwrap().token, first);

        let field = module.get_symbol_for_member_ref(field_ref).unwrap();
        assert_eq!(field.as_field().unwrap().name, "value");

        assert!(module.get_symbol_for_member_ref(missing).is_none());
    }

    #[test]
    fn test_method_type_parameters_match_by_position() {
        let (fixture, (holder, generic, reference)) = Fixture::with_app(|builder| {
            let holder = builder.type_def("App", "Holder", Token::new(0));
            builder
                .method(
                    holder,
                    "Put",
                    MethodAttributes::PUBLIC,
                    &instance_method(TypeSignature::Void, vec![TypeSignature::Object]),
                )
                .unwrap();
            let generic = builder
                .method(
                    holder,
                    "Put",
                    MethodAttributes::PUBLIC,
                    &generic_method(vec![TypeSignature::GenericParamMethod(0)]),
                )
                .unwrap();
            builder.generic_param(generic, "U");
            let reference = builder
                .method_ref(
                    holder,
                    "Put",
                    &generic_method(vec![TypeSignature::GenericParamMethod(0)]),
                )
                .unwrap();
            (holder, generic, reference)
        });

        let containing = fixture.app.decoder().get_type_of_token(holder);
        let found = find_member(&fixture.app, &containing, reference, false).unwrap();
        assert_eq!(found.as_method().unwrap().token, generic);
    }

    #[test]
    fn test_methods_only_skips_fields() {
        let (fixture, (holder, reference)) = Fixture::with_app(|builder| {
            let holder = builder.type_def("App", "Holder", Token::new(0));
            builder
                .simple_field(holder, "count", TypeSignature::I4)
                .unwrap();
            let reference = builder
                .field_ref(
                    holder,
                    "count",
                    &SignatureField {
                        base: TypeSignature::I4,
                        ..Default::default()
                    },
                )
                .unwrap();
            (holder, reference)
        });

        let containing = fixture.app.decoder().get_type_of_token(holder);
        assert!(find_member(&fixture.app, &containing, reference, true).is_none());
        assert!(find_member(&fixture.app, &containing, reference, false).is_some());

        let array = fixture
            .app
            .decoder()
            .decode_type(&TypeSignature::SzArray(SignatureSzArray {
                modifiers: Vec::new(),
                base: Box::new(TypeSignature::I4),
            }));
        assert!(find_member(&fixture.app, &array, reference, false).is_none());
    }

    #[test]
    fn test_module_ref_parent_names_the_module_type() {
        let mut part = ImageBuilder::new("Part.netmodule");
        part.method(
            ImageBuilder::module_type(),
            "Helper",
            MethodAttributes::STATIC,
            &SignatureMethod {
                header: 0x00,
                return_type: SignatureParameter {
                    base: TypeSignature::Void,
                    ..Default::default()
                },
                ..Default::default()
            },
        )
        .unwrap();

        let (fixture, reference) = Fixture::with_app(|builder| {
            let scope = builder.module_ref("Part.netmodule");
            builder
                .method_ref(
                    scope,
                    "Helper",
                    &SignatureMethod {
                        header: 0x00,
                        return_type: SignatureParameter {
                            base: TypeSignature::Void,
                            ..Default::default()
                        },
                        ..Default::default()
                    },
                )
                .unwrap()
        });
        let sibling = fixture.app_assembly.add_module(part.build());

        let found = fixture.app.get_symbol_for_member_ref(reference).unwrap();
        let method = found.as_method().unwrap();
        assert_eq!(method.name, "Helper");
        assert!(std::sync::Arc::ptr_eq(
            &method.containing().unwrap().module().unwrap(),
            &sibling
        ));
    }
}

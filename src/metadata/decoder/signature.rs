//! Member signature decoding.
//!
//! Every slot (return value, parameter, field, property, event, base type, interface) is
//! decoded in the generic context of its member and then run through the transform passes
//! enabled in [`ImportOptions`](crate::metadata::options::ImportOptions). The passes read
//! their attributes from the slot's host row.

use std::sync::Arc;

use crate::metadata::{
    customattributes,
    decoder::{
        apply_dynamic_transform, apply_native_integer_transform, apply_nullable_transform,
        decode_tuple_names, MetadataDecoder, MethodContext, TypeContext,
    },
    module::ModuleSymbol,
    signatures::{SignatureParameter, SignatureParser},
    token::Token,
    typesystem::{
        AnnotatedType, CustomModifier, EventSymbol, FieldSignature, FieldSymbol,
        MethodSignature, MethodSymbol, NamedTypeDefRc, ParamInfo, PropertySignature,
        PropertySymbol, RefKind, TypeRc, TypeSymbol,
    },
};

/// A slot as the signature spells it
struct RawSlot {
    ty: AnnotatedType,
    by_ref: bool,
    ref_modifiers: Vec<CustomModifier>,
}

impl RawSlot {
    fn from_type(ty: TypeRc) -> Self {
        RawSlot {
            ty: AnnotatedType::new(ty),
            by_ref: false,
            ref_modifiers: Vec::new(),
        }
    }

    fn decode(decoder: &MetadataDecoder<'_>, param: &SignatureParameter) -> Self {
        RawSlot {
            ty: AnnotatedType::with_modifiers(
                decoder.decode_type(&param.base),
                decoder.decode_modifiers(&param.modifiers),
            ),
            by_ref: param.by_ref,
            ref_modifiers: decoder.decode_modifiers(&param.ref_modifiers),
        }
    }
}

/// Where the attributes of a slot live
#[derive(Clone, Copy)]
struct SlotOrigin<'a> {
    /// Row carrying the slot's own attributes, nil if there is none
    host: Token,
    /// Member whose `NullableContextAttribute` applies
    member: Token,
    definition: &'a NamedTypeDefRc,
}

fn transform_slot(module: &ModuleSymbol, slot: &RawSlot, origin: SlotOrigin<'_>) -> AnnotatedType {
    let options = module.options();
    let mut ty = slot.ty.ty.clone();

    if options.decode_dynamic {
        let ref_kind = if slot.by_ref {
            RefKind::Ref
        } else {
            RefKind::None
        };
        let modifier_count = slot.ref_modifiers.len() + slot.ty.modifiers.len();
        ty = apply_dynamic_transform(&ty, modifier_count, ref_kind, origin.host, module);
    }

    if options.decode_native_integers {
        ty = apply_native_integer_transform(&ty, origin.host, module, Some(origin.definition));
    }

    let mut annotated = if Arc::ptr_eq(&ty, &slot.ty.ty) {
        slot.ty.clone()
    } else {
        slot.ty.with_type(ty)
    };

    if options.apply_nullable {
        let context = customattributes::nullable_context(module.reader(), origin.member)
            .or_else(|| origin.definition.nullable_context());
        annotated = apply_nullable_transform(&annotated, origin.host, module, context);
    }

    if options.decode_tuple_names {
        let named = decode_tuple_names(&annotated.ty, origin.host, module);
        if !Arc::ptr_eq(&named, &annotated.ty) {
            annotated = annotated.with_type(named);
        }
    }

    annotated
}

fn param_info(
    module: &ModuleSymbol,
    slot: RawSlot,
    origin: SlotOrigin<'_>,
    name: Option<String>,
) -> ParamInfo {
    ParamInfo {
        ty: transform_slot(module, &slot, origin),
        by_ref: slot.by_ref,
        ref_modifiers: slot.ref_modifiers,
        host: origin.host,
        name,
    }
}

fn definition_decoder<'a>(
    module: &'a ModuleSymbol,
    definition: &NamedTypeDefRc,
) -> MetadataDecoder<'a> {
    MetadataDecoder::new(module).with_type_context(TypeContext::Definition(definition.clone()))
}

/// Decodes the MethodDefSig of `method`
pub(crate) fn decode_method_signature(
    module: &ModuleSymbol,
    method: &MethodSymbol,
    definition: &NamedTypeDefRc,
) -> MethodSignature {
    let param_row = |sequence: u32| {
        method
            .param_rows
            .iter()
            .find(|row| row.sequence == sequence)
    };
    let origin = |sequence: u32| SlotOrigin {
        host: param_row(sequence).map_or(Token::new(0), |row| row.token),
        member: method.token,
        definition,
    };
    let name = |sequence: u32| {
        param_row(sequence)
            .map(|row| row.name.clone())
            .filter(|name| !name.is_empty())
    };

    let mut parser =
        SignatureParser::with_max_depth(&method.signature_blob, module.options().max_signature_depth);
    let signature = match parser.parse_method_signature_lenient() {
        Ok(signature) => signature,
        Err(error) => {
            log::debug!("signature of method {} could not be parsed - {error}", method.token);
            return MethodSignature {
                header: method.signature_blob.first().copied().unwrap_or_default(),
                generic_arity: method.arity(),
                return_param: ParamInfo::unsupported(origin(0).host),
                params: Vec::new(),
            };
        }
    };

    let decoder = definition_decoder(module, definition)
        .with_method_context(MethodContext::for_method(method));

    let return_param = param_info(
        module,
        RawSlot::decode(&decoder, &signature.return_type),
        origin(0),
        name(0),
    );
    let params = signature
        .params
        .iter()
        .zip(1u32..)
        .map(|(param, sequence)| {
            param_info(
                module,
                RawSlot::decode(&decoder, param),
                origin(sequence),
                name(sequence),
            )
        })
        .collect();

    MethodSignature {
        header: signature.header,
        generic_arity: signature.param_count_generic,
        return_param,
        params,
    }
}

/// Decodes the FieldSig of `field`
pub(crate) fn decode_field_signature(
    module: &ModuleSymbol,
    field: &FieldSymbol,
    definition: &NamedTypeDefRc,
) -> FieldSignature {
    let mut parser =
        SignatureParser::with_max_depth(&field.signature_blob, module.options().max_signature_depth);
    let signature = match parser.parse_field_signature() {
        Ok(signature) => signature,
        Err(error) => {
            log::debug!("signature of field {} could not be parsed - {error}", field.token);
            return FieldSignature {
                ty: AnnotatedType::new(TypeSymbol::unsupported()),
                by_ref: false,
                ref_modifiers: Vec::new(),
            };
        }
    };

    let decoder = definition_decoder(module, definition);
    let slot = RawSlot {
        ty: AnnotatedType::with_modifiers(
            decoder.decode_type(&signature.base),
            decoder.decode_modifiers(&signature.modifiers),
        ),
        by_ref: signature.by_ref,
        ref_modifiers: decoder.decode_modifiers(&signature.ref_modifiers),
    };
    let origin = SlotOrigin {
        host: field.token,
        member: field.token,
        definition,
    };

    FieldSignature {
        ty: transform_slot(module, &slot, origin),
        by_ref: slot.by_ref,
        ref_modifiers: slot.ref_modifiers,
    }
}

/// Decodes the PropertySig of `property`. Indexer parameters have no host row of their own.
pub(crate) fn decode_property_signature(
    module: &ModuleSymbol,
    property: &PropertySymbol,
    definition: &NamedTypeDefRc,
) -> PropertySignature {
    let mut parser = SignatureParser::with_max_depth(
        &property.signature_blob,
        module.options().max_signature_depth,
    );
    let signature = match parser.parse_property_signature() {
        Ok(signature) => signature,
        Err(error) => {
            log::debug!("signature of property {} could not be parsed - {error}", property.token);
            return PropertySignature {
                header: property.signature_blob.first().copied().unwrap_or_default(),
                property: ParamInfo::unsupported(property.token),
                params: Vec::new(),
            };
        }
    };

    let decoder = definition_decoder(module, definition);
    let property_slot = param_info(
        module,
        RawSlot::decode(&decoder, &signature.property_type),
        SlotOrigin {
            host: property.token,
            member: property.token,
            definition,
        },
        Some(property.name.clone()),
    );
    let params = signature
        .params
        .iter()
        .map(|param| {
            param_info(
                module,
                RawSlot::decode(&decoder, param),
                SlotOrigin {
                    host: Token::new(0),
                    member: property.token,
                    definition,
                },
                None,
            )
        })
        .collect();

    PropertySignature {
        header: signature.header,
        property: property_slot,
        params,
    }
}

/// Decodes the delegate type of `event`
pub(crate) fn decode_event_type(
    module: &ModuleSymbol,
    event: &EventSymbol,
    definition: &NamedTypeDefRc,
) -> AnnotatedType {
    let ty = definition_decoder(module, definition).get_type_of_token(event.event_type_token);
    transform_slot(
        module,
        &RawSlot::from_type(ty),
        SlotOrigin {
            host: event.token,
            member: event.token,
            definition,
        },
    )
}

/// Decodes the `extends` token of `definition`, `None` if it has none
pub(crate) fn decode_base_type(
    module: &ModuleSymbol,
    definition: &NamedTypeDefRc,
) -> Option<TypeRc> {
    if definition.extends.is_null() {
        return None;
    }

    let ty = definition_decoder(module, definition).get_type_of_token(definition.extends);
    let slot = transform_slot(
        module,
        &RawSlot::from_type(ty),
        SlotOrigin {
            host: definition.token,
            member: definition.token,
            definition,
        },
    );
    Some(slot.ty)
}

/// Decodes the InterfaceImpl rows of `definition`. Each row hosts its own attributes.
pub(crate) fn decode_interfaces(module: &ModuleSymbol, definition: &NamedTypeDefRc) -> Vec<TypeRc> {
    let rows = match module.reader().interface_impls(definition.token) {
        Ok(rows) => rows,
        Err(error) => {
            log::warn!("interfaces of {} could not be read - {error}", definition.token);
            return Vec::new();
        }
    };

    let decoder = definition_decoder(module, definition);
    rows.iter()
        .map(|row| {
            let ty = decoder.get_type_of_token(row.interface);
            transform_slot(
                module,
                &RawSlot::from_type(ty),
                SlotOrigin {
                    host: row.token,
                    member: definition.token,
                    definition,
                },
            )
            .ty
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::metadata::{
        decoder::testing::Fixture,
        image::instance_method,
        reader::{FieldAttributes, MethodAttributes},
        signatures::{SignatureParameter, SignatureProperty, SignatureTypeArgument, TypeSignature},
        token::Token,
        typesystem::{NullableAnnotation, TypeSymbol},
    };

    #[test]
    fn test_method_slots_use_their_param_rows() {
        let (fixture, holder) = Fixture::with_app(|builder| {
            let object = builder.type_ref(Fixture::core_ref(), "System", "Object");
            let holder = builder.type_def("App", "Holder", object);
            let signature = instance_method(
                TypeSignature::Object,
                vec![TypeSignature::Object, TypeSignature::String],
            );
            let method = builder
                .method(holder, "Run", MethodAttributes::PUBLIC, &signature)
                .unwrap();
            let returned = builder.param(method, 0, "");
            builder.dynamic_attribute(returned, Some(&[true]));
            let value = builder.param(method, 1, "value");
            builder.dynamic_attribute(value, None);
            builder.nullable_context_attribute(method, 2);
            builder.nullable_context_attribute(holder, 1);
            holder
        });

        let definition = fixture.app.type_def(holder).unwrap();
        let run = &definition.methods()[0];
        let signature = run.signature();

        assert!(signature.return_param.ty.ty.is_dynamic());
        assert!(signature.return_param.name.is_none());
        assert_eq!(signature.params.len(), 2);
        assert_eq!(signature.params[0].name.as_deref(), Some("value"));
        assert!(signature.params[0].ty.ty.is_dynamic());
        assert_eq!(signature.params[0].ty.nullable, NullableAnnotation::Annotated);

        // No Param row: no attributes, but the method's context still applies
        assert!(signature.params[1].host.is_null());
        assert_eq!(signature.params[1].ty.ty.to_string(), "System.String");
        assert_eq!(signature.params[1].ty.nullable, NullableAnnotation::Annotated);

        assert_eq!(definition.base_type().unwrap().to_string(), "System.Object");
    }

    #[test]
    fn test_generic_interfaces_and_events() {
        let (fixture, holder) = Fixture::with_app(|builder| {
            let thing = builder.interface_def("App", "IThing`1");
            builder.generic_param(thing, "T");
            let spec = builder
                .type_spec(&TypeSignature::GenericInst(
                    Box::new(TypeSignature::Class(thing)),
                    vec![SignatureTypeArgument {
                        modifiers: Vec::new(),
                        base: TypeSignature::Object,
                    }],
                ))
                .unwrap();

            let holder = builder.type_def("App", "Holder", Token::new(0));
            let implementation = builder.interface_impl(holder, spec);
            builder.dynamic_attribute(implementation, Some(&[false, true]));
            builder.nullable_context_attribute(holder, 1);

            let delegate = builder.type_ref(Fixture::core_ref(), "System", "MulticastDelegate");
            builder.event(holder, "Changed", delegate);
            holder
        });

        let definition = fixture.app.type_def(holder).unwrap();
        assert!(definition.base_type().is_none());

        let interfaces = definition.interfaces();
        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces[0].to_string(), "App.IThing<dynamic>");

        let event = &definition.events()[0];
        assert_eq!(event.event_type().ty.to_string(), "System.MulticastDelegate");
        assert_eq!(event.event_type().nullable, NullableAnnotation::NotAnnotated);
    }

    #[test]
    fn test_properties_and_fields() {
        let (fixture, holder) = Fixture::with_app(|builder| {
            let holder = builder.type_def("App", "Holder", Token::new(0));
            let indexer = SignatureProperty {
                header: 0x28,
                property_type: SignatureParameter {
                    base: TypeSignature::String,
                    ..Default::default()
                },
                params: vec![SignatureParameter {
                    base: TypeSignature::I4,
                    ..Default::default()
                }],
            };
            let item = builder.property(holder, "Item", &indexer).unwrap();
            builder.nullable_attribute(item, &[2]);

            let field = builder
                .simple_field(holder, "count", TypeSignature::GenericParamType(0))
                .unwrap();
            builder.nullable_attribute(field, &[1]);
            holder
        });

        let definition = fixture.app.type_def(holder).unwrap();
        let property = definition.properties()[0].signature();
        assert_eq!(property.header, 0x28);
        assert_eq!(property.property.ty.nullable, NullableAnnotation::Annotated);
        assert_eq!(property.params.len(), 1);
        assert!(property.params[0].host.is_null());
        assert_eq!(property.params[0].ty.ty.to_string(), "System.Int32");

        // Holder is not generic, so `!0` has nothing to resolve to
        let field = definition.fields()[0].field_type();
        assert!(field.ty.is_unsupported());
    }

    #[test]
    fn test_unparseable_signatures() {
        let (fixture, holder) = Fixture::with_app(|builder| {
            let holder = builder.type_def("App", "Holder", Token::new(0));
            builder.method_blob(holder, "Broken", MethodAttributes::PUBLIC, Vec::new());
            builder.field_blob(holder, "broken", FieldAttributes::PUBLIC, vec![0x06]);
            holder
        });

        let definition = fixture.app.type_def(holder).unwrap();
        let method = definition.methods()[0].signature();
        assert!(method.return_param.ty.ty.is_unsupported());
        assert!(method.params.is_empty());

        let field = definition.fields()[0].field_type();
        assert!(matches!(&*field.ty, TypeSymbol::Error(_)));
    }
}

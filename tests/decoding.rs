//! End-to-end decoding of member signatures.
//!
//! Every test builds a small application image against the in-memory core library, loads
//! both into assemblies and inspects the symbols the application's members decode to,
//! after all transform passes have run.

use dotimport::{
    metadata::{
        image::instance_method,
        reader::MethodAttributes,
        signatures::{SignatureSzArray, SignatureTypeArgument},
    },
    prelude::*,
    Result,
};

const CORE_REF: Token = Token(0x2300_0001);

/// The application module together with the assemblies it resolves through. Modules only
/// hold their assembly weakly, so the assemblies must outlive every decode.
struct Loaded {
    module: ModuleRc,
    _app: AssemblyRc,
    _corlib: AssemblyRc,
}

/// Loads the core library and an application module built by `build`, which receives
/// the application builder with the core library reference already in place
fn load<T>(
    options: ImportOptions,
    build: impl FnOnce(&mut ImageBuilder) -> Result<T>,
) -> Result<(Loaded, T)> {
    let corlib = AssemblySymbol::new("System.Private.CoreLib", options);
    corlib.add_module(core_library_image());

    let mut builder = ImageBuilder::new("App.dll");
    builder.assembly_ref("System.Private.CoreLib");
    let built = build(&mut builder)?;

    let app = AssemblySymbol::new("App", options);
    let module = app.add_module(builder.build());
    app.set_references(vec![corlib.clone()])?;
    Ok((
        Loaded {
            module,
            _app: app,
            _corlib: corlib,
        },
        built,
    ))
}

fn argument(base: TypeSignature) -> SignatureTypeArgument {
    SignatureTypeArgument {
        modifiers: Vec::new(),
        base,
    }
}

fn value_tuple(builder: &mut ImageBuilder, elements: Vec<TypeSignature>) -> TypeSignature {
    let name = format!("ValueTuple`{}", elements.len());
    let tuple = builder.type_ref(CORE_REF, "System", &name);
    TypeSignature::GenericInst(
        Box::new(TypeSignature::ValueType(tuple)),
        elements.into_iter().map(argument).collect(),
    )
}

#[test]
fn test_named_tuple_return() -> Result<()> {
    let (loaded, holder) = load(ImportOptions::default(), |builder| {
        let holder = builder.type_def("App", "Holder", Token::new(0));
        let returns = value_tuple(builder, vec![TypeSignature::I4, TypeSignature::I4]);
        let method = builder.method(
            holder,
            "Pair",
            MethodAttributes::PUBLIC,
            &instance_method(returns, Vec::new()),
        )?;
        let returned = builder.param(method, 0, "");
        builder.tuple_element_names_attribute(returned, &[Some("a"), Some("b")])?;
        Ok(holder)
    })?;

    let holder = loaded.module.type_def(holder).unwrap();
    let returned = &holder.methods()[0].signature().return_param.ty;
    let tuple = returned.ty.as_named().unwrap();

    assert!(tuple.is_tuple());
    assert_eq!(
        tuple.tuple_names,
        Some(vec![Some("a".to_string()), Some("b".to_string())])
    );
    assert_eq!(returned.ty.to_string(), "(System.Int32 a, System.Int32 b)");
    Ok(())
}

#[test]
fn test_dynamic_object_field() -> Result<()> {
    let (loaded, holder) = load(ImportOptions::default(), |builder| {
        let holder = builder.type_def("App", "Holder", Token::new(0));
        let on = builder.simple_field(holder, "on", TypeSignature::Object)?;
        builder.dynamic_attribute(on, Some(&[true]));
        let off = builder.simple_field(holder, "off", TypeSignature::Object)?;
        builder.dynamic_attribute(off, Some(&[false]));
        builder.simple_field(holder, "plain", TypeSignature::Object)?;
        Ok(holder)
    })?;

    let holder = loaded.module.type_def(holder).unwrap();
    let fields = holder.fields();
    assert!(fields[0].field_type().ty.is_dynamic());
    assert!(fields[1].field_type().ty.is_object());
    assert!(!fields[1].field_type().ty.is_dynamic());
    assert!(fields[2].field_type().ty.is_object());
    Ok(())
}

#[test]
fn test_intptr_without_attribute_stays_intptr() -> Result<()> {
    let (loaded, holder) = load(ImportOptions::default(), |builder| {
        let holder = builder.type_def("App", "Holder", Token::new(0));
        let method = builder.method(
            holder,
            "Take",
            MethodAttributes::PUBLIC,
            &instance_method(
                TypeSignature::Void,
                vec![TypeSignature::I, TypeSignature::I],
            ),
        )?;
        builder.param(method, 1, "plain");
        let native = builder.param(method, 2, "native");
        builder.native_integer_attribute(native, Some(&[true]));
        Ok(holder)
    })?;

    let holder = loaded.module.type_def(holder).unwrap();
    let take = &holder.methods()[0];
    let params = take.params();
    assert_eq!(params[0].ty.ty.to_string(), "System.IntPtr");
    assert!(!params[0].ty.ty.is_native_integer());
    assert_eq!(params[1].ty.ty.to_string(), "nint");
    assert!(params[1].ty.ty.is_native_integer());
    Ok(())
}

#[test]
fn test_mismatched_dynamic_flags_leave_the_type_alone() -> Result<()> {
    let (loaded, holder) = load(ImportOptions::default(), |builder| {
        let holder = builder.type_def("App", "Holder", Token::new(0));
        let field = builder.simple_field(holder, "value", TypeSignature::Object)?;
        builder.dynamic_attribute(field, Some(&[true, false]));
        Ok(holder)
    })?;

    let holder = loaded.module.type_def(holder).unwrap();
    let ty = &holder.fields()[0].field_type().ty;
    assert!(ty.is_object());
    assert!(!ty.is_error());
    Ok(())
}

#[test]
fn test_dynamic_inside_generic_arguments() -> Result<()> {
    let (loaded, holder) = load(ImportOptions::default(), |builder| {
        let pair = builder.type_def("App", "Pair`2", Token::new(0));
        builder.generic_param(pair, "TFirst");
        builder.generic_param(pair, "TSecond");

        let holder = builder.type_def("App", "Holder", Token::new(0));
        let signature = TypeSignature::GenericInst(
            Box::new(TypeSignature::Class(pair)),
            vec![
                argument(TypeSignature::Object),
                argument(TypeSignature::SzArray(SignatureSzArray {
                    modifiers: Vec::new(),
                    base: Box::new(TypeSignature::Object),
                })),
            ],
        );
        let field = builder.simple_field(holder, "pair", signature)?;
        builder.dynamic_attribute(field, Some(&[false, true, false, true]));
        Ok(holder)
    })?;

    let holder = loaded.module.type_def(holder).unwrap();
    assert_eq!(
        holder.fields()[0].field_type().ty.to_string(),
        "App.Pair<dynamic, dynamic[]>"
    );
    Ok(())
}

#[test]
fn test_parameterless_native_integer_marks_every_slot() -> Result<()> {
    let (loaded, holder) = load(ImportOptions::default(), |builder| {
        let holder = builder.type_def("App", "Holder", Token::new(0));
        let field = builder.simple_field(
            holder,
            "handles",
            TypeSignature::SzArray(SignatureSzArray {
                modifiers: Vec::new(),
                base: Box::new(TypeSignature::U),
            }),
        )?;
        builder.native_integer_attribute(field, None);
        Ok(holder)
    })?;

    let holder = loaded.module.type_def(holder).unwrap();
    assert_eq!(holder.fields()[0].field_type().ty.to_string(), "nuint[]");
    Ok(())
}

#[test]
fn test_nullable_annotations_and_context() -> Result<()> {
    let (loaded, holder) = load(ImportOptions::default(), |builder| {
        let holder = builder.type_def("App", "Holder", Token::new(0));
        builder.nullable_context_attribute(holder, 1);

        let annotated = builder.simple_field(holder, "maybe", TypeSignature::String)?;
        builder.nullable_attribute(annotated, &[2]);
        builder.simple_field(holder, "always", TypeSignature::String)?;
        builder.simple_field(holder, "number", TypeSignature::I4)?;
        Ok(holder)
    })?;

    let holder = loaded.module.type_def(holder).unwrap();
    let fields = holder.fields();

    let maybe = fields[0].field_type();
    assert_eq!(maybe.nullable, NullableAnnotation::Annotated);
    assert_eq!(maybe.to_string(), "System.String?");

    assert_eq!(
        fields[1].field_type().nullable,
        NullableAnnotation::NotAnnotated
    );
    assert_eq!(fields[2].field_type().to_string(), "System.Int32");
    Ok(())
}

#[test]
fn test_erased_options_skip_every_pass() -> Result<()> {
    let (loaded, holder) = load(ImportOptions::erased(), |builder| {
        let holder = builder.type_def("App", "Holder", Token::new(0));
        let dynamic = builder.simple_field(holder, "value", TypeSignature::Object)?;
        builder.dynamic_attribute(dynamic, None);
        builder.nullable_attribute(dynamic, &[2]);

        let native = builder.simple_field(holder, "handle", TypeSignature::I)?;
        builder.native_integer_attribute(native, None);

        let tuple = value_tuple(builder, vec![TypeSignature::I4, TypeSignature::String]);
        let named = builder.simple_field(holder, "pair", tuple)?;
        builder.tuple_element_names_attribute(named, &[Some("id"), Some("label")])?;
        Ok(holder)
    })?;

    let holder = loaded.module.type_def(holder).unwrap();
    let fields = holder.fields();
    assert!(fields[0].field_type().ty.is_object());
    assert_eq!(fields[0].field_type().nullable, NullableAnnotation::Oblivious);
    assert_eq!(fields[1].field_type().ty.to_string(), "System.IntPtr");

    let pair = fields[2].field_type().ty.as_named().unwrap();
    assert!(pair.tuple_names.is_none());
    assert_eq!(pair.to_string(), "(System.Int32, System.String)");
    Ok(())
}

#[test]
fn test_out_of_range_type_parameter_is_unsupported() -> Result<()> {
    let (loaded, holder) = load(ImportOptions::default(), |builder| {
        let holder = builder.type_def("App", "Holder`1", Token::new(0));
        builder.generic_param(holder, "T");
        builder.simple_field(holder, "first", TypeSignature::GenericParamType(0))?;
        builder.simple_field(holder, "second", TypeSignature::GenericParamType(1))?;
        Ok(holder)
    })?;

    let holder = loaded.module.type_def(holder).unwrap();
    let fields = holder.fields();
    assert_eq!(fields[0].field_type().ty.to_string(), "T");
    assert!(fields[1].field_type().ty.is_unsupported());
    Ok(())
}

#[test]
fn test_missing_type_reference() -> Result<()> {
    let (loaded, (holder, reference)) = load(ImportOptions::default(), |builder| {
        let reference = builder.type_ref(CORE_REF, "System", "DoesNotExist");
        let holder = builder.type_def("App", "Holder", Token::new(0));
        builder.simple_field(holder, "missing", TypeSignature::Class(reference))?;
        Ok((holder, reference))
    })?;

    let holder = loaded.module.type_def(holder).unwrap();
    let missing = &holder.fields()[0].field_type().ty;
    assert!(matches!(&**missing, TypeSymbol::Error(ErrorType::Missing { .. })));
    assert_eq!(missing.to_string(), "<missing System.DoesNotExist>");

    // Cached: the same token yields the same node
    let again = loaded.module.decoder().get_type_of_token(reference);
    assert!(std::sync::Arc::ptr_eq(missing, &again));
    Ok(())
}

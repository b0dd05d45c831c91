//! MemberRef and operand token resolution.
//!
//! A library assembly defines the members; the application refers to them through
//! TypeRef, TypeSpec and MethodDef parents the way compiled call sites do.

use dotimport::{
    metadata::{
        image::instance_method, reader::MethodAttributes, signatures::SignatureTypeArgument,
    },
    prelude::*,
    Result,
};

/// Both modules plus the assemblies they resolve through, which must stay alive while
/// the tests decode
struct Loaded {
    app: ModuleRc,
    library: ModuleRc,
    _assemblies: Vec<AssemblyRc>,
}

/// Library tokens the tests refer back to
struct Library {
    widget: Token,
    foo_int: Token,
    foo_string: Token,
    count: Token,
}

fn build_library() -> Result<(ImageBuilder, Library)> {
    let mut builder = ImageBuilder::new("Lib.dll");
    builder.assembly_ref("System.Private.CoreLib");

    let widget = builder.type_def("Lib", "Widget", Token::new(0));
    let foo_int = builder.method(
        widget,
        "Foo",
        MethodAttributes::PUBLIC,
        &instance_method(TypeSignature::Void, vec![TypeSignature::I4]),
    )?;
    let foo_string = builder.method(
        widget,
        "Foo",
        MethodAttributes::PUBLIC,
        &instance_method(TypeSignature::Void, vec![TypeSignature::String]),
    )?;
    let count = builder.simple_field(widget, "Count", TypeSignature::I4)?;

    let boxed = builder.type_def("Lib", "Box`1", Token::new(0));
    builder.generic_param(boxed, "T");
    builder.method(
        boxed,
        "Set",
        MethodAttributes::PUBLIC,
        &instance_method(TypeSignature::Void, vec![TypeSignature::GenericParamType(0)]),
    )?;

    Ok((
        builder,
        Library {
            widget,
            foo_int,
            foo_string,
            count,
        },
    ))
}

fn load(
    build_app: impl FnOnce(&mut ImageBuilder) -> Result<Vec<Token>>,
) -> Result<(Loaded, Library, Vec<Token>)> {
    let options = ImportOptions::default();
    let corlib = AssemblySymbol::new("System.Private.CoreLib", options);
    corlib.add_module(core_library_image());

    let (library_image, tokens) = build_library()?;
    let lib = AssemblySymbol::new("Lib", options);
    let library = lib.add_module(library_image.build());
    lib.set_references(vec![corlib.clone()])?;

    let mut builder = ImageBuilder::new("App.dll");
    builder.assembly_ref("System.Private.CoreLib");
    builder.assembly_ref("Lib");
    let references = build_app(&mut builder)?;

    let app_assembly = AssemblySymbol::new("App", options);
    let app = app_assembly.add_module(builder.build());
    app_assembly.set_references(vec![corlib.clone(), lib.clone()])?;

    let loaded = Loaded {
        app,
        library,
        _assemblies: vec![app_assembly, lib, corlib],
    };
    Ok((loaded, tokens, references))
}

const LIB_REF: Token = Token(0x2300_0002);

#[test]
fn test_overload_is_chosen_by_signature() -> Result<()> {
    let (loaded, library, references) = load(|builder| {
        let widget = builder.type_ref(LIB_REF, "Lib", "Widget");
        let by_int = builder.method_ref(
            widget,
            "Foo",
            &instance_method(TypeSignature::Void, vec![TypeSignature::I4]),
        )?;
        let by_string = builder.method_ref(
            widget,
            "Foo",
            &instance_method(TypeSignature::Void, vec![TypeSignature::String]),
        )?;
        Ok(vec![by_int, by_string])
    })?;

    let by_int = loaded.app.get_symbol_for_member_ref(references[0]).unwrap();
    assert_eq!(by_int.as_method().unwrap().token, library.foo_int);

    let by_string = loaded.app.get_symbol_for_member_ref(references[1]).unwrap();
    assert_eq!(by_string.as_method().unwrap().token, library.foo_string);
    Ok(())
}

#[test]
fn test_no_matching_method_yields_none() -> Result<()> {
    let (loaded, _, references) = load(|builder| {
        let widget = builder.type_ref(LIB_REF, "Lib", "Widget");
        let renamed = builder.method_ref(
            widget,
            "Bar",
            &instance_method(TypeSignature::Void, vec![TypeSignature::I4]),
        )?;
        let wrong_shape = builder.method_ref(
            widget,
            "Foo",
            &instance_method(TypeSignature::Void, vec![TypeSignature::I8]),
        )?;
        let missing_type = builder.type_ref(LIB_REF, "Lib", "Gadget");
        let on_missing = builder.method_ref(
            missing_type,
            "Foo",
            &instance_method(TypeSignature::Void, vec![TypeSignature::I4]),
        )?;
        Ok(vec![renamed, wrong_shape, on_missing])
    })?;

    for reference in references {
        assert!(loaded.app.get_symbol_for_member_ref(reference).is_none());
    }
    Ok(())
}

#[test]
fn test_field_reference_and_operand_tokens() -> Result<()> {
    let (loaded, library, references) = load(|builder| {
        let widget = builder.type_ref(LIB_REF, "Lib", "Widget");
        let count = builder.field_ref(
            widget,
            "Count",
            &SignatureField {
                base: TypeSignature::I4,
                ..Default::default()
            },
        )?;
        Ok(vec![widget, count])
    })?;

    let field = loaded.app.get_symbol_for_token(references[1]).unwrap();
    assert_eq!(field.as_field().unwrap().token, library.count);

    let widget = loaded.app.get_symbol_for_token(references[0]).unwrap();
    assert_eq!(widget.as_type().unwrap().to_string(), "Lib.Widget");

    // Definitions resolve within their own module
    let method = loaded.library.get_symbol_for_token(library.foo_int).unwrap();
    assert_eq!(method.as_method().unwrap().name, "Foo");
    let definition = loaded.library.get_symbol_for_token(library.widget).unwrap();
    assert!(definition.as_type().is_some());

    assert!(loaded
        .app
        .get_symbol_for_token(Token::from_parts(TableId::MethodSpec, 1))
        .is_none());
    Ok(())
}

#[test]
fn test_reference_through_constructed_type() -> Result<()> {
    let (loaded, _, references) = load(|builder| {
        let boxed = builder.type_ref(LIB_REF, "Lib", "Box`1");
        let box_of_string = builder.type_spec(&TypeSignature::GenericInst(
            Box::new(TypeSignature::Class(boxed)),
            vec![SignatureTypeArgument {
                modifiers: Vec::new(),
                base: TypeSignature::String,
            }],
        ))?;

        // Call sites spell the member with the definition's own `!0`
        let set = builder.method_ref(
            box_of_string,
            "Set",
            &instance_method(TypeSignature::Void, vec![TypeSignature::GenericParamType(0)]),
        )?;
        let mismatched = builder.method_ref(
            box_of_string,
            "Set",
            &instance_method(TypeSignature::Void, vec![TypeSignature::I4]),
        )?;
        Ok(vec![set, mismatched])
    })?;

    let set = loaded.app.get_symbol_for_member_ref(references[0]).unwrap();
    let set = set.as_method().unwrap();
    assert_eq!(set.name, "Set");
    assert_eq!(set.containing().unwrap().full_name(), "Lib.Box`1");

    assert!(loaded.app.get_symbol_for_member_ref(references[1]).is_none());
    Ok(())
}

#[test]
fn test_vararg_call_site_points_at_the_method() -> Result<()> {
    let (loaded, _, references) = load(|builder| {
        let holder = builder.type_def("App", "Holder", Token::new(0));
        let log = builder.method(
            holder,
            "Log",
            MethodAttributes::STATIC,
            &SignatureMethod {
                header: 0x05,
                return_type: SignatureParameter {
                    base: TypeSignature::Void,
                    ..Default::default()
                },
                ..Default::default()
            },
        )?;
        let call_site = builder.member_ref(log, "Log", vec![0x05, 0x01, 0x01, 0x41, 0x08]);
        Ok(vec![log, call_site])
    })?;

    let resolved = loaded.app.get_symbol_for_member_ref(references[1]).unwrap();
    assert_eq!(resolved.as_method().unwrap().token, references[0]);
    Ok(())
}

//! Restores `nint`/`nuint` from `NativeIntegerAttribute` flags.
//!
//! One flag is recorded per non-generic `IntPtr`/`UIntPtr` node, in pre-order. Runtimes
//! that declare `RuntimeFeature.NumericIntPtr` make the two spellings identical, and the
//! pass is skipped for them.

use std::sync::Arc;

use crate::metadata::{
    customattributes::{self, DecodedFlags},
    decoder::{cursor::FlagCursor, Decoded, UnsupportedContent},
    module::ModuleSymbol,
    token::Token,
    typesystem::{
        ArrayType, FunctionPointerParam, FunctionPointerType, NamedType, NamedTypeDefRc,
        PointerType, SpecialType, TypeRc, TypeSymbol,
    },
};

struct NativeIntegerDecoder<'a> {
    /// `None` for the parameterless attribute: every node is native
    flags: Option<FlagCursor<'a, bool>>,
    saw_error: bool,
}

impl NativeIntegerDecoder<'_> {
    fn consume(&mut self) -> Decoded<bool> {
        match &mut self.flags {
            None => Ok(true),
            Some(cursor) => cursor.consume().ok_or(UnsupportedContent),
        }
    }

    fn transform(&mut self, ty: &TypeRc) -> Decoded<TypeRc> {
        match &**ty {
            TypeSymbol::Named(named) => self.transform_named(ty, named),
            TypeSymbol::Array(array) => {
                let element = self.transform(&array.element.ty)?;
                if Arc::ptr_eq(&element, &array.element.ty) {
                    return Ok(ty.clone());
                }

                Ok(Arc::new(TypeSymbol::Array(ArrayType {
                    element: array.element.with_type(element),
                    shape: array.shape.clone(),
                })))
            }
            TypeSymbol::Pointer(pointer) => {
                let pointed_at = self.transform(&pointer.pointed_at.ty)?;
                if Arc::ptr_eq(&pointed_at, &pointer.pointed_at.ty) {
                    return Ok(ty.clone());
                }

                Ok(Arc::new(TypeSymbol::Pointer(PointerType {
                    pointed_at: pointer.pointed_at.with_type(pointed_at),
                })))
            }
            TypeSymbol::FunctionPointer(function) => {
                let return_param = self.transform_param(&function.return_param)?;
                let mut changed = !Arc::ptr_eq(&return_param.ty.ty, &function.return_param.ty.ty);
                let mut params = Vec::with_capacity(function.params.len());
                for param in &function.params {
                    let transformed = self.transform_param(param)?;
                    changed |= !Arc::ptr_eq(&transformed.ty.ty, &param.ty.ty);
                    params.push(transformed);
                }

                if !changed {
                    return Ok(ty.clone());
                }

                Ok(Arc::new(TypeSymbol::FunctionPointer(FunctionPointerType {
                    calling_convention: function.calling_convention,
                    return_param,
                    params,
                })))
            }
            TypeSymbol::TypeParameter(_) | TypeSymbol::Dynamic => Ok(ty.clone()),
            TypeSymbol::Error(_) => {
                self.saw_error = true;
                Ok(ty.clone())
            }
        }
    }

    fn transform_named(&mut self, ty: &TypeRc, named: &NamedType) -> Decoded<TypeRc> {
        if named.type_arguments.is_empty()
            && matches!(
                named.definition.special,
                SpecialType::IntPtr | SpecialType::UIntPtr
            )
        {
            let native = self.consume()?;
            if native == named.native_integer {
                return Ok(ty.clone());
            }
            return Ok(named.with_native_integer(native));
        }

        let containing = match &named.containing {
            Some(container) => match container.as_named() {
                Some(outer) => Some(self.transform_named(container, outer)?),
                None => Some(container.clone()),
            },
            None => None,
        };
        let mut changed = match (&containing, &named.containing) {
            (Some(new), Some(old)) => !Arc::ptr_eq(new, old),
            _ => false,
        };

        let mut arguments = Vec::with_capacity(named.type_arguments.len());
        for argument in &named.type_arguments {
            let transformed = self.transform(&argument.ty)?;
            changed |= !Arc::ptr_eq(&transformed, &argument.ty);
            arguments.push(argument.with_type(transformed));
        }

        if !changed {
            return Ok(ty.clone());
        }

        Ok(named.with_arguments(containing, arguments))
    }

    fn transform_param(&mut self, param: &FunctionPointerParam) -> Decoded<FunctionPointerParam> {
        let ty = self.transform(&param.ty.ty)?;
        Ok(FunctionPointerParam {
            ty: param.ty.with_type(ty),
            ref_kind: param.ref_kind,
            ref_modifiers: param.ref_modifiers.clone(),
        })
    }
}

/// Applies native-integer flags to `ty`. `None` stands for the parameterless attribute,
/// under which every `IntPtr`/`UIntPtr` node is native.
///
/// Running out of flags, leftover flags and an empty flag array all yield the unsupported
/// sentinel. A walk that reaches the end of a tree containing an error type returns the
/// tree unchanged.
#[must_use]
pub fn transform_with_flags(ty: &TypeRc, flags: Option<&[bool]>) -> TypeRc {
    if flags.is_some_and(<[bool]>::is_empty) {
        return TypeSymbol::unsupported();
    }

    let mut decoder = NativeIntegerDecoder {
        flags: flags.map(FlagCursor::new),
        saw_error: false,
    };

    let Ok(transformed) = decoder.transform(ty) else {
        log::debug!("native integer flags {flags:?} ran out before the end of {ty}");
        return TypeSymbol::unsupported();
    };

    if decoder.saw_error {
        log::debug!("{ty} contains an error type, native integer flags ignored");
        return ty.clone();
    }

    if decoder.flags.as_ref().is_some_and(|cursor| !cursor.is_exhausted()) {
        log::debug!("native integer flags {flags:?} do not fit {ty}");
        return TypeSymbol::unsupported();
    }

    transformed
}

/// Applies the `NativeIntegerAttribute` found on `host` to `ty`.
///
/// `containing` is the type declaring the member the slot belongs to. The pass is skipped
/// when its assembly's runtime supports numeric `IntPtr`.
#[must_use]
pub fn apply_native_integer_transform(
    ty: &TypeRc,
    host: Token,
    module: &ModuleSymbol,
    containing: Option<&NamedTypeDefRc>,
) -> TypeRc {
    let assembly = containing
        .and_then(|definition| definition.module())
        .and_then(|owner| owner.assembly())
        .or_else(|| module.assembly());
    if assembly.is_some_and(|assembly| assembly.runtime_supports_numeric_intptr()) {
        return ty.clone();
    }

    match customattributes::native_integer_flags(module.reader(), host) {
        DecodedFlags::Absent => ty.clone(),
        DecodedFlags::Parameterless => transform_with_flags(ty, None),
        DecodedFlags::Values(flags) => transform_with_flags(ty, Some(&flags)),
        DecodedFlags::Single(_) | DecodedFlags::Malformed => {
            log::debug!("NativeIntegerAttribute on {host} could not be decoded");
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
        typesystem::{factory, AnnotatedType},
    };

    #[test]
    fn test_flags_in_pre_order() {
        let fixture = Fixture::new();
        let intptr = named(&fixture.core, "System", "IntPtr");
        let uintptr = named(&fixture.core, "System", "UIntPtr");
        let pair = construct(&fixture.core, "System", "ValueTuple`2", vec![intptr, uintptr]);

        let transformed = transform_with_flags(&pair, Some(&[true, false]));
        assert_eq!(transformed.to_string(), "(nint, System.UIntPtr)");

        let all = transform_with_flags(&pair, None);
        assert_eq!(all.to_string(), "(nint, nuint)");

        let unchanged = transform_with_flags(&pair, Some(&[false, false]));
        assert!(Arc::ptr_eq(&unchanged, &pair));
    }

    #[test]
    fn test_flag_count_must_match() {
        let fixture = Fixture::new();
        let intptr = named(&fixture.core, "System", "IntPtr");
        let array = factory::make_sz_array(AnnotatedType::new(intptr));

        assert!(transform_with_flags(&array, Some(&[])).is_unsupported());
        assert!(transform_with_flags(&array, Some(&[true, true])).is_unsupported());
        assert_eq!(
            transform_with_flags(&array, Some(&[true])).to_string(),
            "nint[]"
        );

        let object = named(&fixture.core, "System", "Object");
        assert!(transform_with_flags(&object, Some(&[true])).is_unsupported());
    }

    #[test]
    fn test_error_types_keep_the_original() {
        let fixture = Fixture::new();
        let intptr = named(&fixture.core, "System", "IntPtr");
        let pair = construct(
            &fixture.core,
            "System",
            "ValueTuple`2",
            vec![TypeSymbol::missing("Gone", "Type"), intptr],
        );

        assert!(Arc::ptr_eq(&transform_with_flags(&pair, Some(&[true])), &pair));
        // Extra flags after a completed walk still defer to the error type
        assert!(Arc::ptr_eq(
            &transform_with_flags(&pair, Some(&[true, false])),
            &pair
        ));
    }

    #[test]
    fn test_running_out_of_flags_past_an_error_type_is_unsupported() {
        let fixture = Fixture::new();
        let intptr = named(&fixture.core, "System", "IntPtr");
        let triple = construct(
            &fixture.core,
            "System",
            "ValueTuple`3",
            vec![TypeSymbol::missing("Gone", "Type"), intptr.clone(), intptr],
        );

        let result = transform_with_flags(&triple, Some(&[true]));
        assert!(result.is_unsupported());
        assert!(!Arc::ptr_eq(&result, &triple));
    }

    #[test]
    fn test_skipped_when_runtime_has_numeric_intptr() {
        let (fixture, field) = Fixture::with_core_features(|builder| {
            let owner = builder.type_def("App", "Holder", Token::new(0));
            let field = builder.simple_field(owner, "value", TypeSignature::I).unwrap();
            builder.native_integer_attribute(field, None);
            field
        });
        let intptr = named(&fixture.core, "System", "IntPtr");

        let result = apply_native_integer_transform(&intptr, field, &fixture.app, None);
        assert!(Arc::ptr_eq(&result, &intptr));
    }

    #[test]
    fn test_attribute_lookup() {
        let (fixture, field) = Fixture::with_app(|builder| {
            let owner = builder.type_def("App", "Holder", Token::new(0));
            let field = builder.simple_field(owner, "value", TypeSignature::I).unwrap();
            builder.native_integer_attribute(field, Some(&[true]));
            field
        });
        let intptr = named(&fixture.core, "System", "IntPtr");

        let result = apply_native_integer_transform(&intptr, field, &fixture.app, None);
        assert!(result.is_native_integer());
    }
}

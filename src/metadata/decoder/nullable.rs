//! Applies nullable annotations from `NullableAttribute` and `NullableContextAttribute`.
//!
//! Bytes are `0` (oblivious), `1` (not annotated) and `2` (annotated). Reference-typed
//! nodes consume one byte each in pre-order; value types consume none but their type
//! arguments are still walked.

use std::sync::Arc;

use crate::metadata::{
    customattributes::{self, DecodedFlags},
    decoder::cursor::FlagCursor,
    module::ModuleSymbol,
    token::Token,
    typesystem::{
        AnnotatedType, ArrayType, FunctionPointerParam, FunctionPointerType, NamedType,
        NullableAnnotation, PointerType, TypeRc, TypeSymbol,
    },
};

/// Where annotation bytes come from
#[derive(Debug, Clone, Copy)]
pub enum NullableBytes<'a> {
    /// One byte for every slot
    Uniform(u8),
    /// One byte per consuming node, in pre-order
    Each(&'a [u8]),
}

struct NullableDecoder<'a> {
    uniform: Option<u8>,
    bytes: FlagCursor<'a, u8>,
}

impl NullableDecoder<'_> {
    fn next_annotation(&mut self) -> Option<NullableAnnotation> {
        let byte = match self.uniform {
            Some(byte) => byte,
            None => self.bytes.consume()?,
        };
        NullableAnnotation::from_byte(byte)
    }

    fn apply(&mut self, slot: &AnnotatedType) -> Option<AnnotatedType> {
        let ty = &slot.ty;
        match &**ty {
            TypeSymbol::Named(named) if named.definition.is_value_type() => {
                let walked = self.walk_arguments(ty, named)?;
                Some(rebuilt(slot, walked, slot.nullable))
            }
            TypeSymbol::Named(named) => {
                let annotation = self.next_annotation()?;
                let walked = self.walk_arguments(ty, named)?;
                Some(rebuilt(slot, walked, annotation))
            }
            TypeSymbol::Array(array) => {
                let annotation = self.next_annotation()?;
                let element = self.apply(&array.element)?;
                let walked = if element.is_same_as(&array.element) {
                    ty.clone()
                } else {
                    Arc::new(TypeSymbol::Array(ArrayType {
                        element,
                        shape: array.shape.clone(),
                    }))
                };
                Some(rebuilt(slot, walked, annotation))
            }
            TypeSymbol::Pointer(pointer) => {
                let pointed_at = self.apply(&pointer.pointed_at)?;
                if pointed_at.is_same_as(&pointer.pointed_at) {
                    return Some(slot.clone());
                }

                let walked = Arc::new(TypeSymbol::Pointer(PointerType { pointed_at }));
                Some(rebuilt(slot, walked, slot.nullable))
            }
            TypeSymbol::FunctionPointer(function) => {
                let return_param = self.apply_param(&function.return_param)?;
                let mut changed = !return_param.ty.is_same_as(&function.return_param.ty);
                let mut params = Vec::with_capacity(function.params.len());
                for param in &function.params {
                    let applied = self.apply_param(param)?;
                    changed |= !applied.ty.is_same_as(&param.ty);
                    params.push(applied);
                }

                if !changed {
                    return Some(slot.clone());
                }

                let walked = Arc::new(TypeSymbol::FunctionPointer(FunctionPointerType {
                    calling_convention: function.calling_convention,
                    return_param,
                    params,
                }));
                Some(rebuilt(slot, walked, slot.nullable))
            }
            TypeSymbol::TypeParameter(_) | TypeSymbol::Dynamic | TypeSymbol::Error(_) => {
                let annotation = self.next_annotation()?;
                Some(slot.with_nullable(annotation))
            }
        }
    }

    /// Walks the arguments of the containing types, then the node's own
    fn walk_arguments(&mut self, ty: &TypeRc, named: &NamedType) -> Option<TypeRc> {
        let containing = match &named.containing {
            Some(container) => match container.as_named() {
                Some(outer) => Some(self.walk_arguments(container, outer)?),
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
            let applied = self.apply(argument)?;
            changed |= !applied.is_same_as(argument);
            arguments.push(applied);
        }

        if !changed {
            return Some(ty.clone());
        }

        Some(named.with_arguments(containing, arguments))
    }

    fn apply_param(&mut self, param: &FunctionPointerParam) -> Option<FunctionPointerParam> {
        Some(FunctionPointerParam {
            ty: self.apply(&param.ty)?,
            ref_kind: param.ref_kind,
            ref_modifiers: param.ref_modifiers.clone(),
        })
    }
}

fn rebuilt(slot: &AnnotatedType, ty: TypeRc, nullable: NullableAnnotation) -> AnnotatedType {
    AnnotatedType {
        ty,
        nullable,
        modifiers: slot.modifiers.clone(),
    }
}

/// Applies annotation bytes to `slot`.
///
/// An invalid byte, running out of bytes, or leftover bytes leave the slot unchanged.
#[must_use]
pub fn transform_with_bytes(slot: &AnnotatedType, bytes: NullableBytes<'_>) -> AnnotatedType {
    let (uniform, each) = match bytes {
        NullableBytes::Uniform(byte) => (Some(byte), &[][..]),
        NullableBytes::Each(each) => (None, each),
    };
    let mut decoder = NullableDecoder {
        uniform,
        bytes: FlagCursor::new(each),
    };

    match decoder.apply(slot) {
        Some(applied) if uniform.is_some() || decoder.bytes.is_exhausted() => applied,
        _ => {
            log::debug!("nullable bytes {bytes:?} do not fit {}", slot.ty);
            slot.clone()
        }
    }
}

/// Applies the nullability recorded for `host` to `slot`.
///
/// A `NullableAttribute` on `host` wins: a byte array annotates node by node, a single
/// byte annotates every node. Without one, `context` (the nearest `NullableContextAttribute`
/// of the member or its containing types) is the default for every node. With neither, or
/// when the default is oblivious, the slot is returned unchanged.
#[must_use]
pub fn apply_nullable_transform(
    slot: &AnnotatedType,
    host: Token,
    module: &ModuleSymbol,
    context: Option<u8>,
) -> AnnotatedType {
    let values;
    let bytes = match customattributes::nullable_flags(module.reader(), host) {
        DecodedFlags::Values(each) => {
            values = each;
            NullableBytes::Each(&values)
        }
        DecodedFlags::Single(byte) => NullableBytes::Uniform(byte),
        DecodedFlags::Malformed => {
            log::debug!("NullableAttribute on {host} could not be decoded");
            return slot.clone();
        }
        DecodedFlags::Absent | DecodedFlags::Parameterless => match context {
            Some(byte) => NullableBytes::Uniform(byte),
            None => return slot.clone(),
        },
    };

    if matches!(bytes, NullableBytes::Uniform(0)) {
        return slot.clone();
    }

    transform_with_bytes(slot, bytes)
}

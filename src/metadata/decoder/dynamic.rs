//! Restores `dynamic` from `DynamicAttribute` flags.
//!
//! The compiler erases `dynamic` to `System.Object` and records one flag per type node in a
//! pre-order walk of the slot: the slot's own custom modifiers and `ref` come first, then
//! the type tree. A `true` flag on an object node turns it into `dynamic`; a `true` flag on
//! anything else contradicts the signature and the slot keeps its erased type.

use std::sync::Arc;

use crate::metadata::{
    customattributes::{self, DecodedFlags},
    decoder::cursor::FlagCursor,
    module::ModuleSymbol,
    options::LengthPolicy,
    token::Token,
    typesystem::{
        ArrayType, FunctionPointerParam, FunctionPointerType, NamedType, PointerType, RefKind,
        TypeRc, TypeSymbol,
    },
};

struct DynamicDecoder<'a> {
    flags: FlagCursor<'a, bool>,
    have_modifier_flags: bool,
}

impl DynamicDecoder<'_> {
    fn consume(&mut self) -> bool {
        self.flags.consume_or_default()
    }

    /// Skips the flags of `count` custom modifiers. Each one must be `false`.
    fn handle_modifiers(&mut self, count: usize) -> bool {
        if !self.have_modifier_flags {
            return true;
        }

        (0..count).all(|_| !self.consume())
    }

    fn handle_ref_kind(&mut self, ref_kind: RefKind) -> bool {
        if !self.have_modifier_flags || ref_kind == RefKind::None {
            return true;
        }

        !self.consume()
    }

    fn transform(&mut self, ty: &TypeRc) -> Option<TypeRc> {
        match &**ty {
            TypeSymbol::Named(_) if ty.is_object() => {
                if self.consume() {
                    Some(Arc::new(TypeSymbol::Dynamic))
                } else {
                    Some(ty.clone())
                }
            }
            TypeSymbol::Named(named) => self.transform_named(ty, named, false),
            TypeSymbol::Array(array) => {
                if self.consume() || !self.handle_modifiers(array.element.modifiers.len()) {
                    return None;
                }

                let element = self.transform(&array.element.ty)?;
                if Arc::ptr_eq(&element, &array.element.ty) {
                    return Some(ty.clone());
                }

                Some(Arc::new(TypeSymbol::Array(ArrayType {
                    element: array.element.with_type(element),
                    shape: array.shape.clone(),
                })))
            }
            TypeSymbol::Pointer(pointer) => {
                if self.consume() || !self.handle_modifiers(pointer.pointed_at.modifiers.len()) {
                    return None;
                }

                let pointed_at = self.transform(&pointer.pointed_at.ty)?;
                if Arc::ptr_eq(&pointed_at, &pointer.pointed_at.ty) {
                    return Some(ty.clone());
                }

                Some(Arc::new(TypeSymbol::Pointer(PointerType {
                    pointed_at: pointer.pointed_at.with_type(pointed_at),
                })))
            }
            TypeSymbol::FunctionPointer(function) => {
                if self.consume() {
                    return None;
                }

                let return_param = self.transform_param(&function.return_param)?;
                let mut changed = !Arc::ptr_eq(&return_param.ty.ty, &function.return_param.ty.ty);
                let mut params = Vec::with_capacity(function.params.len());
                for param in &function.params {
                    let transformed = self.transform_param(param)?;
                    changed |= !Arc::ptr_eq(&transformed.ty.ty, &param.ty.ty);
                    params.push(transformed);
                }

                if !changed {
                    return Some(ty.clone());
                }

                Some(Arc::new(TypeSymbol::FunctionPointer(FunctionPointerType {
                    calling_convention: function.calling_convention,
                    return_param,
                    params,
                })))
            }
            TypeSymbol::Dynamic => {
                self.consume();
                Some(ty.clone())
            }
            TypeSymbol::TypeParameter(_) | TypeSymbol::Error(_) => {
                if self.consume() {
                    None
                } else {
                    Some(ty.clone())
                }
            }
        }
    }

    /// A named node: its own flag, then the arguments of its containing types, then its
    /// own arguments. Containing types have no flag of their own.
    fn transform_named(
        &mut self,
        ty: &TypeRc,
        named: &NamedType,
        is_container: bool,
    ) -> Option<TypeRc> {
        if !is_container && self.consume() {
            return None;
        }

        let containing = match &named.containing {
            Some(container) => match container.as_named() {
                Some(outer) => Some(self.transform_named(container, outer, true)?),
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
            return Some(ty.clone());
        }

        Some(named.with_arguments(containing, arguments))
    }

    fn transform_param(&mut self, param: &FunctionPointerParam) -> Option<FunctionPointerParam> {
        if !self.handle_modifiers(param.ref_modifiers.len())
            || !self.handle_ref_kind(param.ref_kind)
            || !self.handle_modifiers(param.ty.modifiers.len())
        {
            return None;
        }

        let ty = self.transform(&param.ty.ty)?;
        Some(FunctionPointerParam {
            ty: param.ty.with_type(ty),
            ref_kind: param.ref_kind,
            ref_modifiers: param.ref_modifiers.clone(),
        })
    }
}

fn run(
    ty: &TypeRc,
    flags: &[bool],
    have_modifier_flags: bool,
    custom_modifier_count: usize,
    ref_kind: RefKind,
    policy: LengthPolicy,
) -> TypeRc {
    let mut decoder = DynamicDecoder {
        flags: FlagCursor::new(flags),
        have_modifier_flags,
    };

    if decoder.handle_modifiers(custom_modifier_count) && decoder.handle_ref_kind(ref_kind) {
        if let Some(transformed) = decoder.transform(ty) {
            let consistent = match policy {
                LengthPolicy::Strict => decoder.flags.is_exhausted(),
                LengthPolicy::BestEffort => !decoder.flags.remaining().contains(&true),
            };
            if consistent {
                return transformed;
            }
        }
    }

    log::debug!("dynamic flags {flags:?} do not fit {ty}, keeping the erased type");
    ty.clone()
}

/// Applies an explicit flag sequence to `ty`.
///
/// `custom_modifier_count` counts the slot's modifiers (those before and after `BYREF`),
/// and `ref_kind` says whether the slot itself is by-ref; both consume leading flags. An
/// empty flag sequence yields the unsupported sentinel. Flags that do not fit the type
/// leave it unchanged.
#[must_use]
pub fn transform_with_flags(
    ty: &TypeRc,
    flags: &[bool],
    custom_modifier_count: usize,
    ref_kind: RefKind,
    policy: LengthPolicy,
) -> TypeRc {
    if flags.is_empty() {
        return TypeSymbol::unsupported();
    }

    run(ty, flags, true, custom_modifier_count, ref_kind, policy)
}

/// Applies flags recovered for a local variable or an embedded interop type, where the
/// sequence may be shorter than the walk: missing flags count as `false`.
#[must_use]
pub fn transform_local_type(
    ty: &TypeRc,
    flags: &[bool],
    custom_modifier_count: usize,
    ref_kind: RefKind,
) -> TypeRc {
    transform_with_flags(
        ty,
        flags,
        custom_modifier_count,
        ref_kind,
        LengthPolicy::BestEffort,
    )
}

/// Applies the `DynamicAttribute` found on `host` to `ty`.
///
/// Without the attribute `ty` is returned unchanged. The parameterless form marks just the
/// top-level node. A malformed attribute yields the unsupported sentinel.
#[must_use]
pub fn apply_dynamic_transform(
    ty: &TypeRc,
    custom_modifier_count: usize,
    ref_kind: RefKind,
    host: Token,
    module: &ModuleSymbol,
) -> TypeRc {
    let policy = module.options().dynamic_length_check;
    match customattributes::dynamic_flags(module.reader(), host) {
        DecodedFlags::Absent => ty.clone(),
        DecodedFlags::Parameterless => run(ty, &[true], false, 0, RefKind::None, policy),
        DecodedFlags::Values(flags) => {
            transform_with_flags(ty, &flags, custom_modifier_count, ref_kind, policy)
        }
        DecodedFlags::Single(_) | DecodedFlags::Malformed => {
            log::debug!("DynamicAttribute on {host} could not be decoded");
            TypeSymbol::unsupported()
        }
    }
}

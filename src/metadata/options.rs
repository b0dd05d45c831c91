//! Import options.
//!
//! [`ImportOptions`] is handed to an [`crate::metadata::assembly::AssemblySymbol`] when it
//! is created and applies to every module of that assembly.

/// How a decoded flag sequence is checked against the number of flags a type consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthPolicy {
    /// Every flag must be consumed, and reading past the end aborts the transform
    #[default]
    Strict,
    /// Reading past the end yields `false`, and no `true` may be left unconsumed
    BestEffort,
}

/// Settings that control how signatures are decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// Maximum nesting depth of a signature (default: 64)
    pub max_signature_depth: usize,

    /// Decode `dynamic` from `DynamicAttribute`
    pub decode_dynamic: bool,

    /// Length policy for `DynamicAttribute` flags on members, base types and interfaces
    pub dynamic_length_check: LengthPolicy,

    /// Apply `NullableAttribute` / `NullableContextAttribute` annotations
    pub apply_nullable: bool,

    /// Reconstruct named tuples from `TupleElementNamesAttribute`
    pub decode_tuple_names: bool,

    /// Decode `nint`/`nuint` from `NativeIntegerAttribute`
    pub decode_native_integers: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            max_signature_depth: 64,
            decode_dynamic: true,
            dynamic_length_check: LengthPolicy::Strict,
            apply_nullable: true,
            decode_tuple_names: true,
            decode_native_integers: true,
        }
    }
}

impl ImportOptions {
    /// Options that skip every transform pass, so members decode to their erased shape
    #[must_use]
    pub fn erased() -> Self {
        Self {
            decode_dynamic: false,
            apply_nullable: false,
            decode_tuple_names: false,
            decode_native_integers: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_presets() {
        let default = ImportOptions::default();
        assert_eq!(default.max_signature_depth, 64);
        assert_eq!(default.dynamic_length_check, LengthPolicy::Strict);
        assert!(default.decode_dynamic);
        assert!(default.apply_nullable);
        assert!(default.decode_tuple_names);
        assert!(default.decode_native_integers);

        let erased = ImportOptions::erased();
        assert!(!erased.decode_dynamic);
        assert!(!erased.apply_nullable);
        assert!(!erased.decode_tuple_names);
        assert!(!erased.decode_native_integers);
        assert_eq!(erased.max_signature_depth, default.max_signature_depth);
    }
}

//! Assemblies: a named set of modules plus the assemblies they reference.
//!
//! An [`AssemblySymbol`] owns its modules and holds strong references to the assemblies
//! its AssemblyRef rows point at, in row order. Modules refer back to their assembly
//! weakly. Two assemblies that reference each other therefore keep each other alive
//! until one of them is dropped explicitly by the host.
//!
//! # Examples
//!
//! ```rust
//! use dotimport::metadata::{assembly::AssemblySymbol, image, options::ImportOptions};
//! use dotimport::metadata::typesystem::SpecialType;
//!
//! let corlib = AssemblySymbol::new("System.Private.CoreLib", ImportOptions::default());
//! corlib.add_module(image::core_library_image());
//!
//! let object = corlib.special_type(SpecialType::Object);
//! assert_eq!(object.to_string(), "System.Object");
//! ```

use std::sync::{Arc, OnceLock, Weak};

use dashmap::DashMap;

use crate::{
    metadata::{
        module::{ModuleRc, ModuleSymbol},
        options::ImportOptions,
        reader::MetadataReader,
        typesystem::{NamedTypeDefRc, SpecialType, TypeRc, TypeSymbol},
    },
    Error, Result,
};

/// Reference to an `AssemblySymbol`
pub type AssemblyRc = Arc<AssemblySymbol>;

/// A loaded assembly
pub struct AssemblySymbol {
    /// Simple name of the assembly
    pub name: String,
    /// `true` if interop types from this assembly are embedded into referencing modules
    pub is_linked: bool,
    options: ImportOptions,
    this: Weak<AssemblySymbol>,
    modules: boxcar::Vec<ModuleRc>,
    references: OnceLock<Vec<AssemblyRc>>,
    special_types: DashMap<SpecialType, TypeRc>,
    numeric_intptr: OnceLock<bool>,
}

impl AssemblySymbol {
    /// Creates an empty assembly
    #[must_use]
    pub fn new(name: &str, options: ImportOptions) -> AssemblyRc {
        Self::create(name, false, options)
    }

    /// Creates an empty assembly whose interop types get embedded by its consumers
    #[must_use]
    pub fn new_linked(name: &str, options: ImportOptions) -> AssemblyRc {
        Self::create(name, true, options)
    }

    fn create(name: &str, is_linked: bool, options: ImportOptions) -> AssemblyRc {
        Arc::new_cyclic(|this| AssemblySymbol {
            name: name.to_string(),
            is_linked,
            options,
            this: this.clone(),
            modules: boxcar::Vec::new(),
            references: OnceLock::new(),
            special_types: DashMap::new(),
            numeric_intptr: OnceLock::new(),
        })
    }

    /// Adds a module backed by `reader`. The first module added is the manifest module.
    ///
    /// The module refers back to its assembly weakly. Keep the returned [`AssemblyRc`] (and
    /// the assemblies passed to [`AssemblySymbol::set_references`]) alive while decoding: once
    /// the assembly is dropped, references leaving the module resolve to `Missing` and
    /// primitives to the unsupported sentinel.
    pub fn add_module(&self, reader: impl MetadataReader + 'static) -> ModuleRc {
        let module = ModuleSymbol::new(Box::new(reader), self.this.clone(), self.options);
        self.modules.push(module.clone());
        module
    }

    /// Options this assembly was created with
    #[must_use]
    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// The modules added so far, manifest module first
    #[must_use]
    pub fn modules(&self) -> Vec<ModuleRc> {
        self.modules.iter().map(|(_, module)| module.clone()).collect()
    }

    /// The manifest module
    #[must_use]
    pub fn manifest_module(&self) -> Option<ModuleRc> {
        self.modules.get(0).cloned()
    }

    /// A module of this assembly by name, compared case-insensitively
    #[must_use]
    pub fn module_by_name(&self, name: &str) -> Option<ModuleRc> {
        self.modules
            .iter()
            .map(|(_, module)| module)
            .find(|module| module.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Sets the referenced assemblies, in AssemblyRef row order.
    ///
    /// # Errors
    /// Returns an error if the references have already been set.
    pub fn set_references(&self, references: Vec<AssemblyRc>) -> Result<()> {
        self.references
            .set(references)
            .map_err(|_| Error::Error(format!("references of {} are already set", self.name)))
    }

    /// Referenced assemblies in AssemblyRef row order, empty until set
    #[must_use]
    pub fn references(&self) -> &[AssemblyRc] {
        self.references.get().map_or(&[], Vec::as_slice)
    }

    /// The referenced assembly for AssemblyRef row `row` (1-based)
    #[must_use]
    pub fn reference(&self, row: u32) -> Option<AssemblyRc> {
        let index = (row as usize).checked_sub(1)?;
        self.references().get(index).cloned()
    }

    /// Referenced assemblies whose interop types are embedded
    #[must_use]
    pub fn linked_references(&self) -> Vec<AssemblyRc> {
        self.references()
            .iter()
            .filter(|reference| reference.is_linked)
            .cloned()
            .collect()
    }

    /// Finds a top-level type by namespace and metadata name in any module
    #[must_use]
    pub fn lookup_top_level(&self, namespace: &str, name: &str) -> Option<NamedTypeDefRc> {
        self.modules
            .iter()
            .find_map(|(_, module)| module.lookup_top_level(namespace, name))
    }

    /// The assembly that defines `System.Object`: this one or the first reference that does
    #[must_use]
    pub fn core_library(&self) -> Option<AssemblyRc> {
        if self.lookup_top_level("System", "Object").is_some() {
            return self.this.upgrade();
        }

        self.references()
            .iter()
            .find(|reference| reference.lookup_top_level("System", "Object").is_some())
            .cloned()
    }

    /// A core library type.
    ///
    /// Found types are cached. A type the core library does not define, or an assembly
    /// without a core library, yields a `Missing` sentinel.
    #[must_use]
    pub fn special_type(&self, special: SpecialType) -> TypeRc {
        if let Some(cached) = self.special_types.get(&special) {
            return cached.clone();
        }

        let Some((namespace, name)) = special.metadata_name() else {
            return TypeSymbol::unsupported();
        };

        let found = self
            .core_library()
            .and_then(|core| core.lookup_top_level(namespace, name));
        match found {
            Some(definition) => self
                .special_types
                .entry(special)
                .or_insert_with(|| definition.declared_type())
                .clone(),
            None => TypeSymbol::missing(namespace, name),
        }
    }

    /// `true` if the core library declares `RuntimeFeature.NumericIntPtr`, in which case
    /// `IntPtr`/`UIntPtr` already are the native integer types and the native-integer pass
    /// is skipped.
    #[must_use]
    pub fn runtime_supports_numeric_intptr(&self) -> bool {
        if let Some(value) = self.numeric_intptr.get() {
            return *value;
        }

        let Some(core) = self.core_library() else {
            // Not cached, references may not be set yet
            return false;
        };

        let supported = core
            .lookup_top_level("System.Runtime.CompilerServices", "RuntimeFeature")
            .is_some_and(|feature| {
                feature
                    .fields()
                    .iter()
                    .any(|field| field.name == "NumericIntPtr")
            });
        *self.numeric_intptr.get_or_init(|| supported)
    }
}

impl std::fmt::Debug for AssemblySymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssemblySymbol")
            .field("name", &self.name)
            .field("is_linked", &self.is_linked)
            .field("modules", &self.modules.count())
            .field("references", &self.references().len())
            .finish_non_exhaustive()
    }
}

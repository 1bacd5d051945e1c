use dashmap::DashMap;

use crate::{
    adapter::{LocalLibraryMetadataAdapter, NativeLibraryMetadataAdapter},
    model::{descriptor::BuildDescriptor, identity::ModuleVersionSelector},
    resolver::{
        LocalLibraryResolver, LocalLibraryResolvers, PrebuiltLibraryResolver,
        ProjectComponentResolver,
    },
    selector::{BinarySelector, VariantBinarySelector},
    substitution::{
        DeclaredSubstitutionRule, DependencySubstitutionRule, ModuleForcingRule,
        SubstitutionRules,
    },
};

use super::ResolutionEngine;

#[derive(Default)]
pub struct ResolutionEngineBuilder {
    forced_modules: Vec<ModuleVersionSelector>,
    substitutions: Vec<DeclaredSubstitutionRule>,
    extra_rules: SubstitutionRules,
    resolvers: Option<LocalLibraryResolvers>,
    adapter: Option<Box<dyn LocalLibraryMetadataAdapter>>,
    selector: Option<Box<dyn BinarySelector>>,
}

impl ResolutionEngineBuilder {
    /// Takes the forced modules and declared substitutions of a build descriptor.
    pub fn descriptor(self, descriptor: &BuildDescriptor) -> Self {
        descriptor
            .substitutions
            .iter()
            .cloned()
            .fold(self.forced_modules(descriptor.forced.clone()), Self::substitute)
    }

    /// Pins a module to a version. A later declaration for the same module wins.
    pub fn force(mut self, module: ModuleVersionSelector) -> Self {
        self.forced_modules.push(module);
        self
    }

    pub fn forced_modules(mut self, modules: impl IntoIterator<Item = ModuleVersionSelector>) -> Self {
        self.forced_modules.extend(modules);
        self
    }

    /// Declared substitutions run after forcing, in declaration order.
    pub fn substitute(mut self, rule: DeclaredSubstitutionRule) -> Self {
        self.substitutions.push(rule);
        self
    }

    /// Appends a rule after forcing and declared substitutions.
    pub fn rule(mut self, rule: impl DependencySubstitutionRule + 'static) -> Self {
        self.extra_rules.push(rule);
        self
    }

    /// Registers a candidate resolver.
    ///
    /// Defaults to the project component resolver followed by the prebuilt
    /// library resolver. Registering any resolver replaces the defaults.
    pub fn resolver(mut self, resolver: impl LocalLibraryResolver + 'static) -> Self {
        self.resolvers
            .get_or_insert_with(LocalLibraryResolvers::new)
            .push(resolver);
        self
    }

    /// Defaults to [`NativeLibraryMetadataAdapter`].
    pub fn adapter(mut self, adapter: impl LocalLibraryMetadataAdapter + 'static) -> Self {
        self.adapter = Some(Box::new(adapter));
        self
    }

    /// Defaults to a [`VariantBinarySelector`] accepting any variant.
    pub fn selector(mut self, selector: impl BinarySelector + 'static) -> Self {
        self.selector = Some(Box::new(selector));
        self
    }

    pub fn build(self) -> ResolutionEngine {
        let Self {
            forced_modules,
            substitutions,
            extra_rules,
            resolvers,
            adapter,
            selector,
        } = self;

        let mut rules = SubstitutionRules::new();
        rules.push(ModuleForcingRule::new(forced_modules));
        for rule in substitutions {
            rules.push(rule);
        }
        rules.extend(extra_rules);

        let resolvers = resolvers.unwrap_or_else(|| {
            let mut resolvers = LocalLibraryResolvers::new();
            resolvers.push(ProjectComponentResolver);
            resolvers.push(PrebuiltLibraryResolver);
            resolvers
        });

        ResolutionEngine {
            rules,
            resolvers,
            adapter: adapter.unwrap_or_else(|| Box::new(NativeLibraryMetadataAdapter)),
            selector: selector.unwrap_or_else(|| Box::new(VariantBinarySelector::default())),
            metadata_cache: DashMap::new(),
        }
    }
}

use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, info, trace};
use thiserror::Error;
use tokio::task::JoinSet;

use crate::{
    adapter::{AdapterError, LocalLibraryMetadataAdapter},
    model::{
        identity::ModuleVersionSelector,
        library::{Binary, LibraryName, VariantComponent},
        metadata::ResolvedComponentMetadata,
    },
    registry::ProjectModel,
    resolver::LocalLibraryResolvers,
    selector::{BinarySelector, SelectionError},
    substitution::{SubstitutionError, SubstitutionOutcome, SubstitutionRequest, SubstitutionRules},
};

mod builder;

pub use builder::ResolutionEngineBuilder;

#[derive(Error, Debug)]
pub enum LibraryResolutionError {
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

/// Substitutes module dependency edges and resolves library dependency edges
/// of a project against its local components.
pub struct ResolutionEngine {
    rules: SubstitutionRules,
    resolvers: LocalLibraryResolvers,
    adapter: Box<dyn LocalLibraryMetadataAdapter>,
    selector: Box<dyn BinarySelector>,
    // Keyed by project path and selected binary.
    metadata_cache: DashMap<(String, Binary), Arc<ResolvedComponentMetadata>>,
}

impl ResolutionEngine {
    pub fn builder() -> ResolutionEngineBuilder {
        ResolutionEngineBuilder::default()
    }

    /// Names of the substitution rules, in the order they run.
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.names()
    }

    /// Runs every substitution rule over a freshly declared module edge.
    pub fn substitute(
        &self,
        requested: &ModuleVersionSelector,
    ) -> Result<SubstitutionOutcome, SubstitutionError> {
        self.substitute_request(SubstitutionRequest::new(requested.clone()))
    }

    /// Runs every substitution rule over an edge whose target may already
    /// differ from what was declared.
    pub fn substitute_request(
        &self,
        mut request: SubstitutionRequest,
    ) -> Result<SubstitutionOutcome, SubstitutionError> {
        self.rules.apply(&mut request)?;
        let outcome = request.into_outcome();
        debug!(
            "Dependency {} resolves against {} ({})",
            outcome.declared, outcome.target, outcome.reason
        );
        Ok(outcome)
    }

    pub fn candidates<'a>(
        &self,
        model: &'a ProjectModel,
        library_name: &LibraryName,
    ) -> Vec<VariantComponent<'a>> {
        self.resolvers.resolve_candidates(model, library_name)
    }

    /// Selects the binary `library_name` resolves to and adapts it into metadata.
    pub fn resolve_library(
        &self,
        model: &ProjectModel,
        library_name: &LibraryName,
    ) -> Result<Arc<ResolvedComponentMetadata>, LibraryResolutionError> {
        let candidates = self.candidates(model, library_name);
        let selected = self.selector.select(library_name, &candidates)?;

        let key = (model.project_path().to_string(), selected);
        if let Some(metadata) = self.metadata_cache.get(&key) {
            trace!("Reusing metadata of {} for library {}", key.1, library_name);
            return Ok(metadata.clone());
        }

        let metadata = Arc::new(
            self.adapter
                .create_local_component_metadata(&key.1, model.project_path())?,
        );
        Ok(self.metadata_cache.entry(key).or_insert(metadata).clone())
    }

    /// Resolves every declared edge of a project concurrently. Each edge
    /// fails on its own; the report keeps declaration order.
    pub async fn resolve_pass(
        self: Arc<Self>,
        model: Arc<ProjectModel>,
        modules: Vec<ModuleVersionSelector>,
        libraries: Vec<LibraryName>,
    ) -> anyhow::Result<ResolutionReport> {
        info!(
            "Resolving {} module and {} library dependencies of project {}",
            modules.len(),
            libraries.len(),
            model.project_path()
        );

        let mut module_tasks = JoinSet::new();
        for (index, requested) in modules.into_iter().enumerate() {
            let engine = self.clone();
            module_tasks.spawn(async move {
                let result = engine.substitute(&requested);
                (index, ModuleEdge { requested, result })
            });
        }

        let mut library_tasks = JoinSet::new();
        for (index, library) in libraries.into_iter().enumerate() {
            let engine = self.clone();
            let model = model.clone();
            library_tasks.spawn(async move {
                let result = engine.resolve_library(&model, &library);
                (index, LibraryEdge { library, result })
            });
        }

        let mut module_edges = Vec::with_capacity(module_tasks.len());
        while let Some(joined) = module_tasks.join_next().await {
            module_edges.push(joined?);
        }
        let mut library_edges = Vec::with_capacity(library_tasks.len());
        while let Some(joined) = library_tasks.join_next().await {
            library_edges.push(joined?);
        }

        module_edges.sort_by_key(|(index, _)| *index);
        library_edges.sort_by_key(|(index, _)| *index);

        let report = ResolutionReport {
            modules: module_edges.into_iter().map(|(_, edge)| edge).collect(),
            libraries: library_edges.into_iter().map(|(_, edge)| edge).collect(),
        };
        info!(
            "Resolved project {} with {} failed dependencies",
            model.project_path(),
            report.failures()
        );
        Ok(report)
    }
}

#[derive(Debug)]
pub struct ModuleEdge {
    pub requested: ModuleVersionSelector,
    pub result: Result<SubstitutionOutcome, SubstitutionError>,
}

#[derive(Debug)]
pub struct LibraryEdge {
    pub library: LibraryName,
    pub result: Result<Arc<ResolvedComponentMetadata>, LibraryResolutionError>,
}

/// Per-edge results of a resolution pass, in declaration order.
#[derive(Debug, Default)]
pub struct ResolutionReport {
    pub modules: Vec<ModuleEdge>,
    pub libraries: Vec<LibraryEdge>,
}

impl ResolutionReport {
    pub fn failures(&self) -> usize {
        let modules = self.modules.iter().filter(|edge| edge.result.is_err()).count();
        let libraries = self
            .libraries
            .iter()
            .filter(|edge| edge.result.is_err())
            .count();
        modules + libraries
    }

    pub fn is_success(&self) -> bool {
        self.failures() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use anyhow::bail;

    use super::*;

    use crate::{
        model::{
            descriptor::BuildDescriptor,
            identity::{ComponentSelector, ModuleComponentSelector, ModuleIdentifier},
            library::Linkage,
            metadata::{DependencySpec, Usage},
        },
        resolver::PrebuiltLibraryResolver,
        selector::VariantBinarySelector,
        substitution::{DeclaredSubstitutionRule, FnRule, SelectionReason, SubstitutionSource},
    };

    use pretty_assertions::assert_eq;

    const DESCRIPTOR: &str = r#"
        project = ":app"
        [resolution]
        force = ["org.example:lib:2.0"]
        [[resolution.substitute]]
        module = "org.legacy:util"
        with = "org.example:util:3.1"
        [dependencies]
        modules = ["org.example:lib:[1.0,)", "org.legacy:util:0.9", "org.other:thing:1.4"]
        libraries = ["core", "mathkit", "zlib", "missing"]

        [[repositories]]
        name = "vendor"
        [[repositories.libraries]]
        name = "mathkit"
        headers = ["vendor/include"]
        [[repositories.libraries.binaries]]
        platform = "linux-x86-64"
        linkage = "shared"
        shared_library = "vendor/lib/libmathkit.so"
        [[repositories.libraries]]
        name = "zlib"
        [[repositories.libraries.binaries]]
        platform = "linux-x86-64"
        linkage = "static"
        static_library = "vendor/lib/libz.a"

        [[repositories]]
        name = "thirdparty"
        [[repositories.libraries]]
        name = "mathkit"
        headers = ["thirdparty/include"]
        [[repositories.libraries.binaries]]
        platform = "windows-x86-64"
        linkage = "shared"
        shared_library = "thirdparty/bin/mathkit.dll"
        link_file = "thirdparty/lib/mathkit.lib"

        [[libraries]]
        name = "core"
        headers = ["src/core/headers"]
        [[libraries.binaries]]
        platform = "linux-x86-64"
        linkage = "static"
        static_library = "build/libs/core/libcore.a"
        build_task = ":coreStaticLibrary"
        [libraries.binaries.dependencies]
        link = [{ library = "mathkit" }]
    "#;

    fn descriptor() -> BuildDescriptor {
        BuildDescriptor::from_toml_str(DESCRIPTOR).unwrap()
    }

    fn linux_engine(descriptor: &BuildDescriptor) -> ResolutionEngine {
        ResolutionEngine::builder()
            .descriptor(descriptor)
            .selector(VariantBinarySelector {
                platform: Some("linux-x86-64".to_string()),
                ..Default::default()
            })
            .build()
    }

    #[test]
    fn rules_run_forcing_then_declared_then_extra() {
        let engine = ResolutionEngine::builder()
            .force(ModuleVersionSelector::new("org.example", "lib", "2.0"))
            .substitute(DeclaredSubstitutionRule::new(
                SubstitutionSource::Module(ModuleIdentifier::new("org.legacy", "util")),
                ComponentSelector::project(":util"),
            ))
            .rule(FnRule::new("audit", |_: &mut SubstitutionRequest| Ok(())))
            .build();

        assert_eq!(
            engine.rule_names().collect::<Vec<_>>(),
            vec!["force", "substitute org.legacy:util with project :util", "audit"]
        );
    }

    #[test]
    fn forced_version_replaces_conflict_resolved_target() {
        let engine = ResolutionEngine::builder()
            .force(ModuleVersionSelector::new("org.example", "lib", "2.0"))
            .build();
        let request = SubstitutionRequest::with_target(
            ModuleVersionSelector::new("org.example", "lib", "[1.0,)"),
            ComponentSelector::module("org.example", "lib", "1.5"),
        );

        let outcome = engine.substitute_request(request).unwrap();

        assert_eq!(
            outcome.target,
            ComponentSelector::module("org.example", "lib", "2.0")
        );
        assert_eq!(outcome.reason, SelectionReason::Forced);
        assert_eq!(
            outcome.declared,
            ModuleVersionSelector::new("org.example", "lib", "[1.0,)")
        );
    }

    #[test]
    fn untouched_module_keeps_requested_reason() {
        let engine = linux_engine(&descriptor());
        let requested = ModuleVersionSelector::new("org.other", "thing", "1.4");

        let outcome = engine.substitute(&requested).unwrap();

        assert_eq!(outcome.target, ComponentSelector::from(&requested));
        assert_eq!(outcome.reason, SelectionReason::Requested);
    }

    #[test]
    fn declared_substitution_applies_after_forcing() {
        let engine = linux_engine(&descriptor());

        let outcome = engine
            .substitute(&ModuleVersionSelector::new("org.legacy", "util", "0.9"))
            .unwrap();

        assert_eq!(
            outcome.target,
            ComponentSelector::Module(ModuleComponentSelector::new("org.example", "util", "3.1"))
        );
        assert_eq!(outcome.reason, SelectionReason::SelectedByRule);
    }

    #[test]
    fn failing_rule_is_named() {
        let engine = ResolutionEngine::builder()
            .rule(FnRule::new("reject-snapshots", |request: &mut SubstitutionRequest| {
                if request.old_requested().version.ends_with("-SNAPSHOT") {
                    bail!("snapshots are not allowed");
                }
                Ok(())
            }))
            .build();

        let error = engine
            .substitute(&ModuleVersionSelector::new("org.example", "lib", "1.0-SNAPSHOT"))
            .unwrap_err();

        assert_eq!(
            error.to_string(),
            "Substitution rule `reject-snapshots` failed for org.example:lib:1.0-SNAPSHOT: \
             snapshots are not allowed"
        );
    }

    #[test]
    fn same_prebuilt_library_in_two_repositories_gives_two_candidates() {
        let descriptor = descriptor();
        let engine = linux_engine(&descriptor);

        let candidates = engine.candidates(&descriptor.model, &LibraryName::from("mathkit"));

        assert_eq!(
            candidates
                .iter()
                .map(VariantComponent::display_name)
                .collect::<Vec<_>>(),
            vec![
                "prebuilt library 'mathkit' from repository 'vendor'",
                "prebuilt library 'mathkit' from repository 'thirdparty'",
            ]
        );
    }

    #[test]
    fn project_candidates_come_before_prebuilt() {
        let descriptor = BuildDescriptor::from_toml_str(
            r#"
            [[repositories]]
            name = "vendor"
            [[repositories.libraries]]
            name = "core"
            [[libraries]]
            name = "core"
        "#,
        )
        .unwrap();
        let engine = ResolutionEngine::builder().build();

        let candidates = engine.candidates(&descriptor.model, &LibraryName::from("core"));

        assert_eq!(candidates.len(), 2);
        assert!(matches!(candidates[0], VariantComponent::Project(_)));
        assert!(matches!(candidates[1], VariantComponent::Prebuilt(_)));
    }

    #[test]
    fn custom_resolver_replaces_defaults() {
        let descriptor = descriptor();
        let engine = ResolutionEngine::builder()
            .resolver(PrebuiltLibraryResolver)
            .build();

        assert!(engine
            .candidates(&descriptor.model, &LibraryName::from("core"))
            .is_empty());
    }

    #[test]
    fn resolves_project_library_with_its_dependencies() {
        let descriptor = descriptor();
        let engine = linux_engine(&descriptor);

        let metadata = engine
            .resolve_library(&descriptor.model, &LibraryName::from("core"))
            .unwrap();

        assert_eq!(metadata.id().library_name, "core");
        assert_eq!(
            metadata.dependencies(Usage::Link),
            &[DependencySpec::library("mathkit")]
        );
        assert_eq!(
            metadata.task_dependency(Usage::Link).unwrap().tasks(),
            vec![":coreStaticLibrary"]
        );
    }

    #[test]
    fn resolved_metadata_is_cached() {
        let descriptor = descriptor();
        let engine = linux_engine(&descriptor);
        let zlib = LibraryName::from("zlib");

        let first = engine.resolve_library(&descriptor.model, &zlib).unwrap();
        let second = engine.resolve_library(&descriptor.model, &zlib).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn models_sharing_a_project_path_keep_their_own_files() {
        let model = |shared_library: &str| {
            BuildDescriptor::from_toml_str(&format!(
                r#"
                [[repositories]]
                name = "vendor"
                [[repositories.libraries]]
                name = "mathkit"
                [[repositories.libraries.binaries]]
                linkage = "shared"
                shared_library = "{shared_library}"
            "#
            ))
            .unwrap()
            .model
        };
        let engine = ResolutionEngine::builder().build();
        let mathkit = LibraryName::from("mathkit");
        let run_file = |model: &ProjectModel| {
            let metadata = engine.resolve_library(model, &mathkit).unwrap();
            metadata.artifacts(Usage::Run)[0].file().to_path_buf()
        };

        assert_eq!(run_file(&model("a/libmathkit.so")), PathBuf::from("a/libmathkit.so"));
        assert_eq!(run_file(&model("b/libmathkit.so")), PathBuf::from("b/libmathkit.so"));
    }

    #[test]
    fn selection_failure_is_reported() {
        let descriptor = descriptor();
        let engine = ResolutionEngine::builder()
            .descriptor(&descriptor)
            .selector(VariantBinarySelector {
                linkage: Some(Linkage::Shared),
                ..Default::default()
            })
            .build();

        let error = engine
            .resolve_library(&descriptor.model, &LibraryName::from("mathkit"))
            .unwrap_err();

        assert!(matches!(
            error,
            LibraryResolutionError::Selection(SelectionError::Ambiguous { count: 2, .. })
        ));
    }

    #[tokio::test]
    async fn resolve_pass_keeps_declaration_order() {
        let descriptor = descriptor();
        let engine = Arc::new(linux_engine(&descriptor));
        let model = Arc::new(descriptor.model.clone());

        let report = engine
            .resolve_pass(model, descriptor.modules.clone(), descriptor.libraries.clone())
            .await
            .unwrap();

        let targets = report
            .modules
            .iter()
            .map(|edge| edge.result.as_ref().unwrap().target.to_string())
            .collect::<Vec<_>>();
        assert_eq!(
            targets,
            vec!["org.example:lib:2.0", "org.example:util:3.1", "org.other:thing:1.4"]
        );

        let libraries = report
            .libraries
            .iter()
            .map(|edge| (edge.library.to_string(), edge.result.is_ok()))
            .collect::<Vec<_>>();
        assert_eq!(
            libraries,
            vec![
                ("core".to_string(), true),
                ("mathkit".to_string(), true),
                ("zlib".to_string(), true),
                ("missing".to_string(), false),
            ]
        );
        assert!(matches!(
            report.libraries[3].result,
            Err(LibraryResolutionError::Selection(SelectionError::LibraryNotFound(_)))
        ));
        assert_eq!(report.failures(), 1);
        assert!(!report.is_success());
    }
}

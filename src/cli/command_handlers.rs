use std::{fmt::Write, path::Path, sync::Arc};

use anyhow::{bail, Context};
use log::{debug, info};

use crate::{
    api::{LibraryEdge, ModuleEdge, ResolutionReport},
    model::{
        descriptor::BuildDescriptor,
        library::{LibraryName, VariantComponent},
        metadata::Usage,
    },
    selector::VariantBinarySelector,
    ResolutionEngine,
};

/// Reads the descriptor and sets up an engine selecting binaries for `target`.
pub fn load_engine(
    descriptor_path: &Path,
    target: VariantBinarySelector,
) -> anyhow::Result<(BuildDescriptor, ResolutionEngine)> {
    let descriptor = BuildDescriptor::from_file(descriptor_path)
        .with_context(|| format!("Failed to load {}", descriptor_path.display()))?;
    debug!("Selecting binaries with {:?}", target);
    let engine = ResolutionEngine::builder()
        .descriptor(&descriptor)
        .selector(target)
        .build();
    Ok((descriptor, engine))
}

/// Handler to resolve command
pub async fn do_resolve(
    engine: ResolutionEngine,
    descriptor: BuildDescriptor,
) -> anyhow::Result<()> {
    let BuildDescriptor {
        project_path,
        modules,
        libraries,
        model,
        ..
    } = descriptor;

    let report = Arc::new(engine)
        .resolve_pass(Arc::new(model), modules, libraries)
        .await?;
    print!("{}", render_report(&report)?);

    if !report.is_success() {
        bail!(
            "{} dependencies of project {} could not be resolved",
            report.failures(),
            project_path
        );
    }
    info!("Resolved every dependency of project {}", project_path);
    Ok(())
}

/// Handler to modules command
pub fn do_modules(engine: &ResolutionEngine, descriptor: &BuildDescriptor) -> anyhow::Result<()> {
    let mut failures = 0;
    let mut output = String::new();
    for requested in &descriptor.modules {
        let edge = ModuleEdge {
            requested: requested.clone(),
            result: engine.substitute(requested),
        };
        if edge.result.is_err() {
            failures += 1;
        }
        render_module_edge(&mut output, &edge)?;
    }
    print!("{}", output);

    if failures > 0 {
        bail!("{} module dependencies could not be substituted", failures);
    }
    Ok(())
}

/// Handler to candidates command
pub fn do_candidates(
    engine: &ResolutionEngine,
    descriptor: &BuildDescriptor,
    library: &str,
) -> anyhow::Result<()> {
    let library = LibraryName::from(library);
    let candidates = engine.candidates(&descriptor.model, &library);
    if candidates.is_empty() {
        info!(
            "No component of project {} provides library {}",
            descriptor.project_path, library
        );
        return Ok(());
    }
    print!("{}", render_candidates(&candidates)?);
    Ok(())
}

fn render_candidates(candidates: &[VariantComponent]) -> Result<String, std::fmt::Error> {
    let mut output = String::new();
    for candidate in candidates {
        writeln!(output, "{}", candidate.display_name())?;
        for binary in candidate.binaries() {
            writeln!(output, "  {}", binary)?;
        }
    }
    Ok(output)
}

fn render_report(report: &ResolutionReport) -> Result<String, std::fmt::Error> {
    let mut output = String::new();
    for edge in &report.modules {
        render_module_edge(&mut output, edge)?;
    }
    for edge in &report.libraries {
        render_library_edge(&mut output, edge)?;
    }
    Ok(output)
}

fn render_module_edge(output: &mut String, edge: &ModuleEdge) -> std::fmt::Result {
    match &edge.result {
        Ok(outcome) => writeln!(
            output,
            "{} -> {} ({})",
            edge.requested, outcome.target, outcome.reason
        ),
        Err(err) => writeln!(output, "{} -> FAILED: {}", edge.requested, err),
    }
}

fn render_library_edge(output: &mut String, edge: &LibraryEdge) -> std::fmt::Result {
    let metadata = match &edge.result {
        Ok(metadata) => metadata,
        Err(err) => return writeln!(output, "library '{}' -> FAILED: {}", edge.library, err),
    };
    writeln!(output, "library '{}' -> {}", edge.library, metadata.id())?;
    for usage in Usage::ALL {
        for artifact in metadata.artifacts(usage) {
            writeln!(output, "  {}: {}", usage, artifact.file().display())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn descriptor() -> BuildDescriptor {
        BuildDescriptor::from_toml_str(
            r#"
            project = ":app"
            [resolution]
            force = ["org.example:lib:2.0"]
            [dependencies]
            modules = ["org.example:lib:1.0", "org.other:thing:1.4"]
            libraries = ["mathkit", "zlib"]
            [[repositories]]
            name = "vendor"
            [[repositories.libraries]]
            name = "mathkit"
            headers = ["vendor/include"]
            [[repositories.libraries.binaries]]
            linkage = "shared"
            shared_library = "vendor/lib/libmathkit.so"
        "#,
        )
        .unwrap()
    }

    fn engine(descriptor: &BuildDescriptor) -> ResolutionEngine {
        ResolutionEngine::builder().descriptor(descriptor).build()
    }

    #[tokio::test]
    async fn render_resolution_report() {
        let descriptor = descriptor();
        let report = Arc::new(engine(&descriptor))
            .resolve_pass(
                Arc::new(descriptor.model.clone()),
                descriptor.modules.clone(),
                descriptor.libraries.clone(),
            )
            .await
            .unwrap();

        assert_eq!(
            render_report(&report).unwrap(),
            "org.example:lib:1.0 -> org.example:lib:2.0 (forced)\n\
             org.other:thing:1.4 -> org.other:thing:1.4 (requested)\n\
             library 'mathkit' -> project ':app' library 'mathkit'\n  \
             compile: vendor/include\n  \
             link: vendor/lib/libmathkit.so\n  \
             run: vendor/lib/libmathkit.so\n\
             library 'zlib' -> FAILED: Could not locate library `zlib`\n"
        );
    }

    #[tokio::test]
    async fn resolve_fails_on_unresolved_library() {
        let descriptor = descriptor();
        let error = do_resolve(engine(&descriptor), descriptor)
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "1 dependencies of project :app could not be resolved"
        );
    }

    #[test]
    fn render_candidate_binaries() {
        let descriptor = descriptor();
        let engine = engine(&descriptor);
        let candidates = engine.candidates(&descriptor.model, &LibraryName::from("mathkit"));

        assert_eq!(
            render_candidates(&candidates).unwrap(),
            "prebuilt library 'mathkit' from repository 'vendor'\n  \
             prebuilt shared library 'vendor:mathkit:default/default/default'\n"
        );
    }

    #[test]
    fn load_engine_reports_missing_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.toml");

        let error = load_engine(&path, VariantBinarySelector::default())
            .err()
            .unwrap();

        assert_eq!(
            error.to_string(),
            format!("Failed to load {}", path.display())
        );
    }
}

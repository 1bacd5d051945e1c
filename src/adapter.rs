use std::collections::BTreeMap;

use log::debug;
use thiserror::Error;

use crate::model::{
    library::{Binary, BuildableFile, NativeLibraryBinary},
    metadata::{
        DependencySpec, LibraryBinaryIdentifier, LibraryPublishArtifact, LocalArtifactMetadata,
        ResolvedComponentMetadata, TaskDependency, Usage,
    },
};

pub const HEADER_ARTIFACT: &str = "header";
pub const LINK_FILE_ARTIFACT: &str = "link-file";
pub const RUNTIME_FILE_ARTIFACT: &str = "runtime-file";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AdapterError {
    #[error("Can't create metadata for binary: {0}")]
    UnsupportedBinary(String),
}

/// Turns a selected binary into metadata the dependency graph can resolve.
pub trait LocalLibraryMetadataAdapter: Send + Sync {
    fn create_local_component_metadata(
        &self,
        selected: &Binary,
        project_path: &str,
    ) -> Result<ResolvedComponentMetadata, AdapterError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeLibraryMetadataAdapter;

impl LocalLibraryMetadataAdapter for NativeLibraryMetadataAdapter {
    fn create_local_component_metadata(
        &self,
        selected: &Binary,
        project_path: &str,
    ) -> Result<ResolvedComponentMetadata, AdapterError> {
        match selected {
            Binary::NativeLibrary(library) => Ok(create_for_native_library(library, project_path)),
            Binary::NativeExecutable(_) => {
                Err(AdapterError::UnsupportedBinary(selected.display_name()))
            }
        }
    }
}

/// The file collections a library binary exposes for each usage.
struct LibraryFileSets<'a> {
    header_dirs: &'a [BuildableFile],
    link_files: &'a [BuildableFile],
    runtime_files: &'a [BuildableFile],
}

fn create_for_native_library(
    library: &NativeLibraryBinary,
    project_path: &str,
) -> ResolvedComponentMetadata {
    let link_files = library.link_files();
    let runtime_files = library.runtime_files();
    create_metadata(
        create_component_id(library, project_path),
        &library.display_name(),
        LibraryFileSets {
            header_dirs: library.header_dirs(),
            link_files: &link_files,
            runtime_files: &runtime_files,
        },
        dependency_specs(library),
    )
}

fn create_metadata(
    id: LibraryBinaryIdentifier,
    display_name: &str,
    files: LibraryFileSets,
    dependencies: BTreeMap<Usage, Vec<DependencySpec>>,
) -> ResolvedComponentMetadata {
    debug!("Creating metadata for {} as {}", display_name, id);
    let project_path = id.project_path.clone();

    // Task dependencies come from the file collections, not from the published artifacts.
    let mut builder = ResolvedComponentMetadata::builder(id.clone(), project_path)
        .task_dependency(Usage::Compile, TaskDependency::new().add(files.header_dirs))
        .task_dependency(Usage::Link, TaskDependency::new().add(files.link_files))
        .task_dependency(Usage::Run, TaskDependency::new().add(files.runtime_files))
        .dependencies(dependencies);

    let artifacts = [
        (Usage::Compile, HEADER_ARTIFACT, files.header_dirs),
        (Usage::Link, LINK_FILE_ARTIFACT, files.link_files),
        (Usage::Run, RUNTIME_FILE_ARTIFACT, files.runtime_files),
    ];
    for (usage, artifact_type, files) in artifacts {
        for file in files {
            builder.add_artifact(
                usage,
                LocalArtifactMetadata {
                    component_id: id.clone(),
                    component_display_name: display_name.to_string(),
                    artifact: LibraryPublishArtifact::new(artifact_type, &file.path),
                },
            );
        }
    }

    builder.build()
}

fn create_component_id(library: &NativeLibraryBinary, project_path: &str) -> LibraryBinaryIdentifier {
    let library_name = match library {
        NativeLibraryBinary::Prebuilt(binary) => &binary.component().name,
        NativeLibraryBinary::Project(binary) => &binary.library().name,
    };
    LibraryBinaryIdentifier::new(
        project_path,
        library_name.as_str(),
        LibraryBinaryIdentifier::LIBRARY_VARIANT,
    )
}

fn dependency_specs(library: &NativeLibraryBinary) -> BTreeMap<Usage, Vec<DependencySpec>> {
    match library {
        NativeLibraryBinary::Project(binary) => binary.dependency_specs().clone(),
        // Prebuilt libraries are leaves.
        NativeLibraryBinary::Prebuilt(_) => BTreeMap::new(),
    }
}

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::model::library::BuildableFile;

/// Purpose a set of library artifacts is needed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Usage {
    Compile,
    Link,
    Run,
}

impl Usage {
    pub const ALL: [Usage; 3] = [Usage::Compile, Usage::Link, Usage::Run];

    pub fn as_str(&self) -> &'static str {
        match self {
            Usage::Compile => "compile",
            Usage::Link => "link",
            Usage::Run => "run",
        }
    }
}

impl Display for Usage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dependency declared by a project-built binary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum DependencySpec {
    Library {
        project_path: Option<String>,
        library_name: String,
        variant: Option<String>,
    },
    Module {
        group: String,
        name: String,
        version: Option<String>,
    },
}

impl DependencySpec {
    pub fn library(library_name: impl Into<String>) -> Self {
        DependencySpec::Library {
            project_path: None,
            library_name: library_name.into(),
            variant: None,
        }
    }
}

impl Display for DependencySpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencySpec::Library {
                project_path,
                library_name,
                variant,
            } => {
                if let Some(project_path) = project_path {
                    write!(f, "project '{}' ", project_path)?;
                }
                write!(f, "library '{}'", library_name)?;
                if let Some(variant) = variant {
                    write!(f, " variant '{}'", variant)?;
                }
                Ok(())
            }
            DependencySpec::Module {
                group,
                name,
                version: Some(version),
            } => write!(f, "{}:{}:{}", group, name, version),
            DependencySpec::Module {
                group,
                name,
                version: None,
            } => write!(f, "{}:{}", group, name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct LibraryBinaryIdentifier {
    pub project_path: String,
    pub library_name: String,
    pub variant: String,
}

impl LibraryBinaryIdentifier {
    pub const LIBRARY_VARIANT: &'static str = "library";

    pub fn new(
        project_path: impl Into<String>,
        library_name: impl Into<String>,
        variant: impl Into<String>,
    ) -> Self {
        LibraryBinaryIdentifier {
            project_path: project_path.into(),
            library_name: library_name.into(),
            variant: variant.into(),
        }
    }
}

impl Display for LibraryBinaryIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "project '{}' {} '{}'",
            self.project_path, self.variant, self.library_name
        )
    }
}

/// A file or directory exposed by a library binary, labelled with what it is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibraryPublishArtifact {
    pub name: String,
    pub extension: String,
    pub artifact_type: String,
    pub classifier: Option<String>,
    pub file: PathBuf,
}

impl LibraryPublishArtifact {
    pub fn new(artifact_type: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        let (name, extension) = split_file_name(&file);
        LibraryPublishArtifact {
            name,
            extension,
            artifact_type: artifact_type.into(),
            classifier: None,
            file,
        }
    }
}

fn split_file_name(file: &Path) -> (String, String) {
    let name = file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    match name.rfind('.') {
        Some(index) if index > 0 => (name[..index].to_string(), name[index + 1..].to_string()),
        _ => (name, String::new()),
    }
}

/// An artifact of a resolved local component, tied back to the binary it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalArtifactMetadata {
    pub component_id: LibraryBinaryIdentifier,
    pub component_display_name: String,
    pub artifact: LibraryPublishArtifact,
}

impl LocalArtifactMetadata {
    pub fn file(&self) -> &Path {
        &self.artifact.file
    }
}

impl Display for LocalArtifactMetadata {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) of {}",
            self.artifact.file.display(),
            self.artifact.artifact_type,
            self.component_display_name
        )
    }
}

/// Opaque set of buildable values whose producing tasks must run before the
/// associated artifacts can be used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDependency {
    values: Vec<BuildableFile>,
}

impl TaskDependency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds values not already present, keeping first-seen order.
    pub fn add<'a>(mut self, values: impl IntoIterator<Item = &'a BuildableFile>) -> Self {
        for value in values {
            if !self.values.contains(value) {
                self.values.push(value.clone());
            }
        }
        self
    }

    pub fn values(&self) -> &[BuildableFile] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Paths of the tasks producing the values, in first-seen order.
    pub fn tasks(&self) -> Vec<&str> {
        let mut tasks: Vec<&str> = Vec::new();
        for task in self.values.iter().flat_map(|value| value.built_by.iter()) {
            if !tasks.contains(&task.as_str()) {
                tasks.push(task);
            }
        }
        tasks
    }
}

/// Metadata of a selected local library binary, as consumed by the rest of the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedComponentMetadata {
    id: LibraryBinaryIdentifier,
    project_path: String,
    artifacts_by_usage: BTreeMap<Usage, Vec<LocalArtifactMetadata>>,
    task_deps_by_usage: BTreeMap<Usage, TaskDependency>,
    transitive_deps: BTreeMap<Usage, Vec<DependencySpec>>,
}

impl ResolvedComponentMetadata {
    pub fn builder(
        id: LibraryBinaryIdentifier,
        project_path: impl Into<String>,
    ) -> ResolvedComponentMetadataBuilder {
        ResolvedComponentMetadataBuilder {
            metadata: ResolvedComponentMetadata {
                id,
                project_path: project_path.into(),
                artifacts_by_usage: BTreeMap::new(),
                task_deps_by_usage: BTreeMap::new(),
                transitive_deps: BTreeMap::new(),
            },
        }
    }

    pub fn id(&self) -> &LibraryBinaryIdentifier {
        &self.id
    }

    pub fn project_path(&self) -> &str {
        &self.project_path
    }

    pub fn usages(&self) -> impl Iterator<Item = Usage> + '_ {
        self.task_deps_by_usage.keys().copied()
    }

    pub fn artifacts(&self, usage: Usage) -> &[LocalArtifactMetadata] {
        self.artifacts_by_usage
            .get(&usage)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn task_dependency(&self, usage: Usage) -> Option<&TaskDependency> {
        self.task_deps_by_usage.get(&usage)
    }

    pub fn dependencies(&self, usage: Usage) -> &[DependencySpec] {
        self.transitive_deps
            .get(&usage)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn transitive_deps(&self) -> &BTreeMap<Usage, Vec<DependencySpec>> {
        &self.transitive_deps
    }
}

/// Assembles [`ResolvedComponentMetadata`], keeping every usage that carries
/// artifacts paired with a task dependency entry.
pub struct ResolvedComponentMetadataBuilder {
    metadata: ResolvedComponentMetadata,
}

impl ResolvedComponentMetadataBuilder {
    pub fn task_dependency(mut self, usage: Usage, task_dependency: TaskDependency) -> Self {
        self.metadata
            .task_deps_by_usage
            .insert(usage, task_dependency);
        self
    }

    pub fn add_artifact(&mut self, usage: Usage, artifact: LocalArtifactMetadata) {
        self.metadata.task_deps_by_usage.entry(usage).or_default();
        let artifacts = self.metadata.artifacts_by_usage.entry(usage).or_default();
        if !artifacts.contains(&artifact) {
            artifacts.push(artifact);
        }
    }

    pub fn dependencies(mut self, dependencies: BTreeMap<Usage, Vec<DependencySpec>>) -> Self {
        self.metadata.transitive_deps = dependencies;
        self
    }

    pub fn build(self) -> ResolvedComponentMetadata {
        self.metadata
    }
}

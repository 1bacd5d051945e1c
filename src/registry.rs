use std::collections::BTreeMap;

use log::debug;

use crate::model::library::{PrebuiltLibraries, ProjectExecutable, ProjectLibrary};

/// Model path prebuilt-library repositories are registered under.
pub const REPOSITORIES_PATH: &str = "repositories";
/// Model path project components are registered under.
pub const COMPONENTS_PATH: &str = "components";

/// Prebuilt-library repositories, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrebuiltRepositories(pub Vec<PrebuiltLibraries>);

impl PrebuiltRepositories {
    pub fn iter(&self) -> impl Iterator<Item = &PrebuiltLibraries> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectComponent {
    Library(ProjectLibrary),
    Executable(ProjectExecutable),
}

/// Components declared by the project itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectComponents(pub Vec<ProjectComponent>);

impl ProjectComponents {
    pub fn libraries(&self) -> impl Iterator<Item = &ProjectLibrary> {
        self.0.iter().filter_map(|component| match component {
            ProjectComponent::Library(library) => Some(library),
            ProjectComponent::Executable(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelNode {
    PrebuiltRepositories(PrebuiltRepositories),
    Components(ProjectComponents),
}

/// A type that can be looked up in a [`ProjectModel`].
pub trait ModelElement {
    const TYPE_NAME: &'static str;

    fn from_node(node: &ModelNode) -> Option<&Self>;
}

impl ModelElement for PrebuiltRepositories {
    const TYPE_NAME: &'static str = "ModelMap<PrebuiltLibraries>";

    fn from_node(node: &ModelNode) -> Option<&Self> {
        match node {
            ModelNode::PrebuiltRepositories(repositories) => Some(repositories),
            ModelNode::Components(_) => None,
        }
    }
}

impl ModelElement for ProjectComponents {
    const TYPE_NAME: &'static str = "ComponentSpecContainer";

    fn from_node(node: &ModelNode) -> Option<&Self> {
        match node {
            ModelNode::Components(components) => Some(components),
            ModelNode::PrebuiltRepositories(_) => None,
        }
    }
}

/// Read-only view of a single project's model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectModel {
    project_path: String,
    nodes: BTreeMap<String, ModelNode>,
}

impl ProjectModel {
    pub fn new(project_path: impl Into<String>) -> Self {
        ProjectModel {
            project_path: project_path.into(),
            nodes: BTreeMap::new(),
        }
    }

    pub fn with_node(mut self, path: impl Into<String>, node: ModelNode) -> Self {
        self.nodes.insert(path.into(), node);
        self
    }

    pub fn project_path(&self) -> &str {
        &self.project_path
    }

    /// Finds the element registered at `path` if it has type `T`.
    pub fn find<T: ModelElement>(&self, path: &str) -> Option<&T> {
        let found = self.nodes.get(path).and_then(T::from_node);
        if found.is_none() {
            debug!(
                "No {} registered at `{}` in project {}",
                T::TYPE_NAME,
                path,
                self.project_path
            );
        }
        found
    }
}

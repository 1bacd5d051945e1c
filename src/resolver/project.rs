use crate::{
    model::library::{LibraryName, VariantComponent},
    registry::{ProjectComponents, ProjectModel, COMPONENTS_PATH},
};

use super::LocalLibraryResolver;

/// Finds libraries built by the project itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectComponentResolver;

impl LocalLibraryResolver for ProjectComponentResolver {
    fn resolve_candidates<'a>(
        &self,
        model: &'a ProjectModel,
        library_name: &LibraryName,
    ) -> Vec<VariantComponent<'a>> {
        model
            .find::<ProjectComponents>(COMPONENTS_PATH)
            .map(|components| {
                components
                    .libraries()
                    .filter(|library| library.name == library_name.as_str())
                    .map(VariantComponent::Project)
                    .collect()
            })
            .unwrap_or_default()
    }
}

use log::trace;

use crate::{
    model::library::{LibraryName, VariantComponent},
    registry::{PrebuiltRepositories, ProjectModel, REPOSITORIES_PATH},
};

use super::LocalLibraryResolver;

/// Finds libraries declared by the project's prebuilt-library repositories.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrebuiltLibraryResolver;

impl LocalLibraryResolver for PrebuiltLibraryResolver {
    fn resolve_candidates<'a>(
        &self,
        model: &'a ProjectModel,
        library_name: &LibraryName,
    ) -> Vec<VariantComponent<'a>> {
        let Some(repositories) = model.find::<PrebuiltRepositories>(REPOSITORIES_PATH) else {
            return Vec::new();
        };
        // Same name in several repositories yields several candidates.
        repositories
            .iter()
            .filter_map(|repository| {
                let library = repository.resolve_library(library_name.as_str());
                if library.is_none() {
                    trace!(
                        "Repository {} has no prebuilt library {}",
                        repository.name,
                        library_name
                    );
                }
                library
            })
            .map(VariantComponent::Prebuilt)
            .collect()
    }
}

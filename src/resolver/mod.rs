mod prebuilt;
mod project;

use log::debug;

use crate::{
    model::library::{LibraryName, VariantComponent},
    registry::ProjectModel,
};

pub use prebuilt::PrebuiltLibraryResolver;
pub use project::ProjectComponentResolver;

/// A source of candidate components for a library dependency.
///
/// Returning nothing means the source has no library of that name; it is not
/// an error.
pub trait LocalLibraryResolver: Send + Sync {
    fn resolve_candidates<'a>(
        &self,
        model: &'a ProjectModel,
        library_name: &LibraryName,
    ) -> Vec<VariantComponent<'a>>;
}

/// Every registered resolver, queried in registration order.
#[derive(Default)]
pub struct LocalLibraryResolvers {
    resolvers: Vec<Box<dyn LocalLibraryResolver>>,
}

impl LocalLibraryResolvers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resolver: impl LocalLibraryResolver + 'static) {
        self.resolvers.push(Box::new(resolver));
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Concatenates the candidates of every resolver.
    pub fn resolve_candidates<'a>(
        &self,
        model: &'a ProjectModel,
        library_name: &LibraryName,
    ) -> Vec<VariantComponent<'a>> {
        let candidates = self
            .resolvers
            .iter()
            .flat_map(|resolver| resolver.resolve_candidates(model, library_name))
            .collect::<Vec<_>>();
        debug!(
            "Found {} candidate(s) for library {} in project {}",
            candidates.len(),
            library_name,
            model.project_path()
        );
        candidates
    }
}

use log::debug;
use thiserror::Error;

use crate::model::library::{Binary, LibraryName, Linkage, VariantComponent};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Could not locate library `{0}`")]
    LibraryNotFound(LibraryName),
    #[error("No binary of library `{library}` matches {criteria}, candidates: {candidates}")]
    NoMatchingBinary {
        library: LibraryName,
        criteria: String,
        candidates: String,
    },
    #[error("No more than 1 matching binary is supported, but library `{library}` has {count} matching {criteria}: {binaries}")]
    Ambiguous {
        library: LibraryName,
        criteria: String,
        count: usize,
        binaries: String,
    },
}

/// Chooses the one binary a library dependency resolves to.
pub trait BinarySelector: Send + Sync {
    fn select(
        &self,
        library: &LibraryName,
        candidates: &[VariantComponent],
    ) -> Result<Binary, SelectionError>;
}

/// Selects by target platform, flavor, build type and linkage. A criterion
/// left unset matches any binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantBinarySelector {
    pub platform: Option<String>,
    pub flavor: Option<String>,
    pub build_type: Option<String>,
    pub linkage: Option<Linkage>,
}

impl VariantBinarySelector {
    fn matches(&self, binary: &Binary) -> bool {
        let variant = binary.variant();
        let matches_dimension = |wanted: &Option<String>, actual: &str| {
            wanted.as_deref().map_or(true, |wanted| wanted == actual)
        };
        matches_dimension(&self.platform, variant.platform.as_str())
            && matches_dimension(&self.flavor, variant.flavor.as_str())
            && matches_dimension(&self.build_type, variant.build_type.as_str())
            && self
                .linkage
                .map_or(true, |linkage| binary.linkage() == Some(linkage))
    }

    fn criteria(&self) -> String {
        let mut criteria = Vec::new();
        if let Some(platform) = &self.platform {
            criteria.push(format!("platform '{}'", platform));
        }
        if let Some(flavor) = &self.flavor {
            criteria.push(format!("flavor '{}'", flavor));
        }
        if let Some(build_type) = &self.build_type {
            criteria.push(format!("build type '{}'", build_type));
        }
        if let Some(linkage) = &self.linkage {
            criteria.push(format!("linkage '{}'", linkage));
        }
        if criteria.is_empty() {
            "any variant".to_string()
        } else {
            criteria.join(", ")
        }
    }
}

impl BinarySelector for VariantBinarySelector {
    fn select(
        &self,
        library: &LibraryName,
        candidates: &[VariantComponent],
    ) -> Result<Binary, SelectionError> {
        if candidates.is_empty() {
            return Err(SelectionError::LibraryNotFound(library.clone()));
        }

        let mut matching = candidates
            .iter()
            .flat_map(VariantComponent::binaries)
            .filter(|binary| self.matches(binary))
            .collect::<Vec<_>>();

        match matching.len() {
            0 => Err(SelectionError::NoMatchingBinary {
                library: library.clone(),
                criteria: self.criteria(),
                candidates: candidates
                    .iter()
                    .map(VariantComponent::display_name)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
            1 => {
                let binary = matching.remove(0);
                debug!("Selected {} for library {}", binary, library);
                Ok(binary)
            }
            count => Err(SelectionError::Ambiguous {
                library: library.clone(),
                criteria: self.criteria(),
                count,
                binaries: matching
                    .iter()
                    .map(Binary::display_name)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
    path::PathBuf,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::model::{
    metadata::{DependencySpec, Usage},
    ParseError,
};

/// Name a library dependency is declared with.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct LibraryName(String);

impl LibraryName {
    pub fn new(name: impl Into<String>) -> Self {
        LibraryName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LibraryName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LibraryName {
    fn from(s: &str) -> Self {
        LibraryName(s.to_string())
    }
}

impl From<String> for LibraryName {
    fn from(s: String) -> Self {
        LibraryName(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    Shared,
    Static,
}

impl FromStr for Linkage {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.to_ascii_lowercase();
        match value.as_str() {
            "shared" => Ok(Linkage::Shared),
            "static" => Ok(Linkage::Static),
            _ => Err(ParseError::InvalidLinkage(value)),
        }
    }
}

impl Display for Linkage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Linkage::Shared => f.write_str("shared"),
            Linkage::Static => f.write_str("static"),
        }
    }
}

/// A file or directory together with the tasks that produce it.
/// Sources and prebuilt files are produced by nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildableFile {
    pub path: PathBuf,
    pub built_by: Vec<String>,
}

impl BuildableFile {
    pub fn source(path: impl Into<PathBuf>) -> Self {
        BuildableFile {
            path: path.into(),
            built_by: Vec::new(),
        }
    }

    pub fn built_by(path: impl Into<PathBuf>, task: impl Into<String>) -> Self {
        BuildableFile {
            path: path.into(),
            built_by: vec![task.into()],
        }
    }
}

/// The files a library binary is linked and run with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LibraryFiles {
    Shared {
        shared_library: BuildableFile,
        /// Import library or linker stub, when it differs from the shared library itself.
        link_file: Option<BuildableFile>,
    },
    Static {
        static_library: BuildableFile,
    },
}

impl LibraryFiles {
    pub fn linkage(&self) -> Linkage {
        match self {
            LibraryFiles::Shared { .. } => Linkage::Shared,
            LibraryFiles::Static { .. } => Linkage::Static,
        }
    }

    pub fn link_files(&self) -> Vec<BuildableFile> {
        match self {
            LibraryFiles::Shared {
                link_file: Some(link_file),
                ..
            } => vec![link_file.clone()],
            LibraryFiles::Shared {
                shared_library,
                link_file: None,
            } => vec![shared_library.clone()],
            LibraryFiles::Static { static_library } => vec![static_library.clone()],
        }
    }

    pub fn runtime_files(&self) -> Vec<BuildableFile> {
        match self {
            LibraryFiles::Shared { shared_library, .. } => vec![shared_library.clone()],
            LibraryFiles::Static { .. } => Vec::new(),
        }
    }
}

/// Target platform, flavor and build type a binary was built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct VariantDimensions {
    pub platform: String,
    pub flavor: String,
    pub build_type: String,
}

impl VariantDimensions {
    pub const DEFAULT: &'static str = "default";

    pub fn new(
        platform: impl Into<String>,
        flavor: impl Into<String>,
        build_type: impl Into<String>,
    ) -> Self {
        VariantDimensions {
            platform: platform.into(),
            flavor: flavor.into(),
            build_type: build_type.into(),
        }
    }
}

impl Default for VariantDimensions {
    fn default() -> Self {
        VariantDimensions::new(Self::DEFAULT, Self::DEFAULT, Self::DEFAULT)
    }
}

impl Display for VariantDimensions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.platform, self.flavor, self.build_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct ProjectLibraryRef {
    pub project_path: String,
    pub name: String,
}

/// A library binary built by the current build.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectLibraryBinary {
    pub library: ProjectLibraryRef,
    pub variant: VariantDimensions,
    pub header_dirs: Vec<BuildableFile>,
    pub files: LibraryFiles,
    pub dependency_specs: BTreeMap<Usage, Vec<DependencySpec>>,
}

impl ProjectLibraryBinary {
    pub fn library(&self) -> &ProjectLibraryRef {
        &self.library
    }

    pub fn dependency_specs(&self) -> &BTreeMap<Usage, Vec<DependencySpec>> {
        &self.dependency_specs
    }

    pub fn display_name(&self) -> String {
        format!(
            "{} library '{}:{}'",
            self.files.linkage(),
            self.library.name,
            self.variant
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct PrebuiltComponentRef {
    pub repository: String,
    pub name: String,
}

/// A library binary declared by a prebuilt-library repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrebuiltLibraryBinary {
    pub component: PrebuiltComponentRef,
    pub variant: VariantDimensions,
    pub header_dirs: Vec<BuildableFile>,
    pub files: LibraryFiles,
}

impl PrebuiltLibraryBinary {
    pub fn component(&self) -> &PrebuiltComponentRef {
        &self.component
    }

    pub fn display_name(&self) -> String {
        format!(
            "prebuilt {} library '{}:{}:{}'",
            self.files.linkage(),
            self.component.repository,
            self.component.name,
            self.variant
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NativeLibraryBinary {
    Project(ProjectLibraryBinary),
    Prebuilt(PrebuiltLibraryBinary),
}

impl NativeLibraryBinary {
    pub fn header_dirs(&self) -> &[BuildableFile] {
        match self {
            NativeLibraryBinary::Project(binary) => &binary.header_dirs,
            NativeLibraryBinary::Prebuilt(binary) => &binary.header_dirs,
        }
    }

    pub fn link_files(&self) -> Vec<BuildableFile> {
        self.files().link_files()
    }

    pub fn runtime_files(&self) -> Vec<BuildableFile> {
        self.files().runtime_files()
    }

    pub fn linkage(&self) -> Linkage {
        self.files().linkage()
    }

    pub fn variant(&self) -> &VariantDimensions {
        match self {
            NativeLibraryBinary::Project(binary) => &binary.variant,
            NativeLibraryBinary::Prebuilt(binary) => &binary.variant,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            NativeLibraryBinary::Project(binary) => binary.display_name(),
            NativeLibraryBinary::Prebuilt(binary) => binary.display_name(),
        }
    }

    fn files(&self) -> &LibraryFiles {
        match self {
            NativeLibraryBinary::Project(binary) => &binary.files,
            NativeLibraryBinary::Prebuilt(binary) => &binary.files,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NativeExecutableBinary {
    pub component: String,
    pub variant: VariantDimensions,
    pub executable: BuildableFile,
}

impl NativeExecutableBinary {
    pub fn display_name(&self) -> String {
        format!("executable '{}:{}'", self.component, self.variant)
    }
}

/// Every kind of binary a project model can hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Binary {
    NativeLibrary(NativeLibraryBinary),
    NativeExecutable(NativeExecutableBinary),
}

impl Binary {
    pub fn variant(&self) -> &VariantDimensions {
        match self {
            Binary::NativeLibrary(binary) => binary.variant(),
            Binary::NativeExecutable(binary) => &binary.variant,
        }
    }

    pub fn linkage(&self) -> Option<Linkage> {
        match self {
            Binary::NativeLibrary(binary) => Some(binary.linkage()),
            Binary::NativeExecutable(_) => None,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Binary::NativeLibrary(binary) => binary.display_name(),
            Binary::NativeExecutable(binary) => binary.display_name(),
        }
    }
}

impl Display for Binary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// A library component built by the current project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLibrary {
    pub name: String,
    pub binaries: Vec<ProjectLibraryBinary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectExecutable {
    pub name: String,
    pub binaries: Vec<NativeExecutableBinary>,
}

/// A library declared by a prebuilt-library repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrebuiltLibrary {
    pub name: String,
    pub repository: String,
    pub binaries: Vec<PrebuiltLibraryBinary>,
}

/// A named repository of prebuilt libraries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrebuiltLibraries {
    pub name: String,
    pub libraries: Vec<PrebuiltLibrary>,
}

impl PrebuiltLibraries {
    pub fn new(name: impl Into<String>) -> Self {
        PrebuiltLibraries {
            name: name.into(),
            libraries: Vec::new(),
        }
    }

    pub fn resolve_library(&self, name: &str) -> Option<&PrebuiltLibrary> {
        self.libraries.iter().find(|library| library.name == name)
    }
}

/// A component that may provide a binary for a library dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantComponent<'a> {
    Project(&'a ProjectLibrary),
    Prebuilt(&'a PrebuiltLibrary),
}

impl<'a> VariantComponent<'a> {
    pub fn name(&self) -> &'a str {
        match *self {
            VariantComponent::Project(library) => &library.name,
            VariantComponent::Prebuilt(library) => &library.name,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            VariantComponent::Project(library) => format!("library '{}'", library.name),
            VariantComponent::Prebuilt(library) => format!(
                "prebuilt library '{}' from repository '{}'",
                library.name, library.repository
            ),
        }
    }

    pub fn binaries(&self) -> Vec<Binary> {
        match self {
            VariantComponent::Project(library) => library
                .binaries
                .iter()
                .cloned()
                .map(|binary| Binary::NativeLibrary(NativeLibraryBinary::Project(binary)))
                .collect(),
            VariantComponent::Prebuilt(library) => library
                .binaries
                .iter()
                .cloned()
                .map(|binary| Binary::NativeLibrary(NativeLibraryBinary::Prebuilt(binary)))
                .collect(),
        }
    }
}

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use log::{debug, error};
use serde::Deserialize;

use crate::{
    model::{
        identity::{
            parse_coordinate, ComponentSelector, ModuleComponentSelector, ModuleIdentifier,
            ModuleVersionSelector,
        },
        library::{
            BuildableFile, LibraryFiles, LibraryName, Linkage, NativeExecutableBinary,
            PrebuiltComponentRef, PrebuiltLibraries, PrebuiltLibrary, PrebuiltLibraryBinary,
            ProjectExecutable, ProjectLibrary, ProjectLibraryBinary, ProjectLibraryRef,
            VariantDimensions,
        },
        metadata::{DependencySpec, Usage},
        ParseError,
    },
    registry::{
        ModelNode, PrebuiltRepositories, ProjectComponent, ProjectComponents, ProjectModel,
        COMPONENTS_PATH, REPOSITORIES_PATH,
    },
    substitution::{DeclaredSubstitutionRule, SubstitutionSource},
};

pub const DEFAULT_DESCRIPTOR_FILE: &str = "build.toml";
pub const ROOT_PROJECT: &str = ":";

/// Everything a build descriptor declares, ready to feed the resolution engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDescriptor {
    pub project_path: String,
    pub forced: Vec<ModuleVersionSelector>,
    pub substitutions: Vec<DeclaredSubstitutionRule>,
    pub modules: Vec<ModuleVersionSelector>,
    pub libraries: Vec<LibraryName>,
    pub model: ProjectModel,
}

impl BuildDescriptor {
    pub fn from_file(path: &Path) -> Result<BuildDescriptor, ParseError> {
        debug!("Attempting to read build descriptor from {}", path.display());
        let contents = std::fs::read_to_string(path)?;

        let descriptor = BuildDescriptor::from_toml_str(&contents);
        if let Err(err) = &descriptor {
            error!(
                "Could not build a valid descriptor from {} due to err {err}",
                path.display()
            )
        }
        descriptor
    }

    pub fn from_toml_str(data: &str) -> Result<BuildDescriptor, ParseError> {
        let raw = toml::from_str::<RawDescriptor>(data)?;
        let project_path = raw.project;

        let forced = raw
            .resolution
            .force
            .iter()
            .map(|coordinate| ModuleVersionSelector::parse(coordinate))
            .collect::<Result<Vec<_>, _>>()?;

        let substitutions = raw
            .resolution
            .substitute
            .into_iter()
            .map(parse_substitution)
            .collect::<Result<Vec<_>, _>>()?;

        let modules = raw
            .dependencies
            .modules
            .iter()
            .map(|coordinate| ModuleVersionSelector::parse(coordinate))
            .collect::<Result<Vec<_>, _>>()?;

        let libraries = raw
            .dependencies
            .libraries
            .into_iter()
            .map(LibraryName::from)
            .collect();

        let mut model = ProjectModel::new(project_path.clone());
        if !raw.repositories.is_empty() {
            let repositories = raw
                .repositories
                .into_iter()
                .map(parse_repository)
                .collect::<Result<Vec<_>, _>>()?;
            model = model.with_node(
                REPOSITORIES_PATH,
                ModelNode::PrebuiltRepositories(PrebuiltRepositories(repositories)),
            );
        }
        if !raw.libraries.is_empty() || !raw.executables.is_empty() {
            let mut components = Vec::new();
            for library in raw.libraries {
                components.push(ProjectComponent::Library(parse_project_library(
                    &project_path,
                    library,
                )?));
            }
            for executable in raw.executables {
                components.push(ProjectComponent::Executable(parse_executable(executable)));
            }
            model = model.with_node(
                COMPONENTS_PATH,
                ModelNode::Components(ProjectComponents(components)),
            );
        }

        Ok(BuildDescriptor {
            project_path,
            forced,
            substitutions,
            modules,
            libraries,
            model,
        })
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDescriptor {
    #[serde(default = "root_project")]
    project: String,
    #[serde(default)]
    resolution: RawResolution,
    #[serde(default)]
    dependencies: RawDependencies,
    #[serde(default)]
    repositories: Vec<RawRepository>,
    #[serde(default)]
    libraries: Vec<RawLibrary>,
    #[serde(default)]
    executables: Vec<RawExecutable>,
}

fn root_project() -> String {
    ROOT_PROJECT.to_string()
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawResolution {
    #[serde(default)]
    force: Vec<String>,
    #[serde(default)]
    substitute: Vec<RawSubstitution>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSubstitution {
    module: String,
    with: Option<String>,
    project: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawDependencies {
    #[serde(default)]
    modules: Vec<String>,
    #[serde(default)]
    libraries: Vec<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRepository {
    name: String,
    #[serde(default)]
    libraries: Vec<RawPrebuiltLibrary>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPrebuiltLibrary {
    name: String,
    #[serde(default)]
    headers: Vec<PathBuf>,
    #[serde(default)]
    binaries: Vec<RawPrebuiltBinary>,
}

// Prebuilt files come from no task and declare no dependencies.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPrebuiltBinary {
    platform: Option<String>,
    flavor: Option<String>,
    build_type: Option<String>,
    linkage: Linkage,
    shared_library: Option<PathBuf>,
    link_file: Option<PathBuf>,
    static_library: Option<PathBuf>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLibrary {
    name: String,
    #[serde(default)]
    headers: Vec<PathBuf>,
    #[serde(default)]
    binaries: Vec<RawBinary>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBinary {
    platform: Option<String>,
    flavor: Option<String>,
    build_type: Option<String>,
    linkage: Linkage,
    shared_library: Option<PathBuf>,
    link_file: Option<PathBuf>,
    static_library: Option<PathBuf>,
    build_task: Option<String>,
    #[serde(default)]
    dependencies: RawUsageDependencies,
}

impl RawBinary {
    fn variant(&self) -> VariantDimensions {
        variant(&self.platform, &self.flavor, &self.build_type)
    }
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawUsageDependencies {
    #[serde(default)]
    compile: Vec<RawDependencySpec>,
    #[serde(default)]
    link: Vec<RawDependencySpec>,
    #[serde(default)]
    run: Vec<RawDependencySpec>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDependencySpec {
    library: Option<String>,
    project: Option<String>,
    module: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawExecutable {
    name: String,
    #[serde(default)]
    binaries: Vec<RawExecutableBinary>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawExecutableBinary {
    platform: Option<String>,
    flavor: Option<String>,
    build_type: Option<String>,
    executable: PathBuf,
    build_task: Option<String>,
}

fn variant(
    platform: &Option<String>,
    flavor: &Option<String>,
    build_type: &Option<String>,
) -> VariantDimensions {
    let or_default = |value: &Option<String>| {
        value
            .clone()
            .unwrap_or_else(|| VariantDimensions::DEFAULT.to_string())
    };
    VariantDimensions::new(or_default(platform), or_default(flavor), or_default(build_type))
}

fn buildable(path: PathBuf, build_task: &Option<String>) -> BuildableFile {
    match build_task {
        Some(task) => BuildableFile::built_by(path, task.as_str()),
        None => BuildableFile::source(path),
    }
}

fn parse_substitution(raw: RawSubstitution) -> Result<DeclaredSubstitutionRule, ParseError> {
    let from = match parse_coordinate(&raw.module)? {
        (group, name, None) => SubstitutionSource::Module(ModuleIdentifier::new(group, name)),
        (group, name, Some(version)) => {
            SubstitutionSource::ModuleVersion(ModuleComponentSelector::new(group, name, version))
        }
    };
    let to = match (raw.with, raw.project) {
        (Some(with), None) => ComponentSelector::from(&ModuleVersionSelector::parse(&with)?),
        (None, Some(project)) => ComponentSelector::project(project),
        _ => return Err(ParseError::InvalidSubstitution(raw.module)),
    };
    Ok(DeclaredSubstitutionRule::new(from, to))
}

fn parse_library_files(
    component: &str,
    linkage: Linkage,
    shared_library: Option<BuildableFile>,
    link_file: Option<BuildableFile>,
    static_library: Option<BuildableFile>,
) -> Result<LibraryFiles, ParseError> {
    let missing = |key| ParseError::MissingBinaryFile {
        component: component.to_string(),
        linkage,
        key,
    };

    match linkage {
        Linkage::Shared => Ok(LibraryFiles::Shared {
            shared_library: shared_library.ok_or_else(|| missing("shared_library"))?,
            link_file,
        }),
        Linkage::Static => Ok(LibraryFiles::Static {
            static_library: static_library.ok_or_else(|| missing("static_library"))?,
        }),
    }
}

fn parse_project_library_files(
    component: &str,
    binary: &RawBinary,
) -> Result<LibraryFiles, ParseError> {
    let file = |path: &PathBuf| buildable(path.clone(), &binary.build_task);
    parse_library_files(
        component,
        binary.linkage,
        binary.shared_library.as_ref().map(file),
        binary.link_file.as_ref().map(file),
        binary.static_library.as_ref().map(file),
    )
}

fn parse_prebuilt_library_files(
    component: &str,
    binary: &RawPrebuiltBinary,
) -> Result<LibraryFiles, ParseError> {
    let file = |path: &PathBuf| BuildableFile::source(path.clone());
    parse_library_files(
        component,
        binary.linkage,
        binary.shared_library.as_ref().map(file),
        binary.link_file.as_ref().map(file),
        binary.static_library.as_ref().map(file),
    )
}

fn parse_repository(raw: RawRepository) -> Result<PrebuiltLibraries, ParseError> {
    let mut repository = PrebuiltLibraries::new(raw.name);
    for library in raw.libraries {
        let header_dirs = library
            .headers
            .into_iter()
            .map(BuildableFile::source)
            .collect::<Vec<_>>();
        let binaries = library
            .binaries
            .iter()
            .map(|binary| -> Result<PrebuiltLibraryBinary, ParseError> {
                Ok(PrebuiltLibraryBinary {
                    component: PrebuiltComponentRef {
                        repository: repository.name.clone(),
                        name: library.name.clone(),
                    },
                    variant: variant(&binary.platform, &binary.flavor, &binary.build_type),
                    header_dirs: header_dirs.clone(),
                    files: parse_prebuilt_library_files(&library.name, binary)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        repository.libraries.push(PrebuiltLibrary {
            name: library.name,
            repository: repository.name.clone(),
            binaries,
        });
    }
    Ok(repository)
}

fn parse_project_library(project_path: &str, raw: RawLibrary) -> Result<ProjectLibrary, ParseError> {
    let binaries = raw
        .binaries
        .iter()
        .map(|binary| -> Result<ProjectLibraryBinary, ParseError> {
            let mut dependency_specs = BTreeMap::new();
            let declared = [
                (Usage::Compile, &binary.dependencies.compile),
                (Usage::Link, &binary.dependencies.link),
                (Usage::Run, &binary.dependencies.run),
            ];
            for (usage, specs) in declared {
                if specs.is_empty() {
                    continue;
                }
                let specs = specs
                    .iter()
                    .map(|spec| parse_dependency_spec(&raw.name, spec))
                    .collect::<Result<Vec<_>, _>>()?;
                dependency_specs.insert(usage, specs);
            }

            Ok(ProjectLibraryBinary {
                library: ProjectLibraryRef {
                    project_path: project_path.to_string(),
                    name: raw.name.clone(),
                },
                variant: binary.variant(),
                header_dirs: raw.headers.iter().cloned().map(BuildableFile::source).collect(),
                files: parse_project_library_files(&raw.name, binary)?,
                dependency_specs,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ProjectLibrary {
        name: raw.name,
        binaries,
    })
}

fn parse_dependency_spec(owner: &str, raw: &RawDependencySpec) -> Result<DependencySpec, ParseError> {
    match (&raw.library, &raw.module) {
        (Some(library), None) => Ok(DependencySpec::Library {
            project_path: raw.project.clone(),
            library_name: library.clone(),
            variant: None,
        }),
        (None, Some(module)) if raw.project.is_none() => {
            let (group, name, version) = parse_coordinate(module)?;
            Ok(DependencySpec::Module {
                group,
                name,
                version,
            })
        }
        _ => Err(ParseError::InvalidDependencySpec(owner.to_string())),
    }
}

fn parse_executable(raw: RawExecutable) -> ProjectExecutable {
    let binaries = raw
        .binaries
        .into_iter()
        .map(|binary| NativeExecutableBinary {
            component: raw.name.clone(),
            variant: variant(&binary.platform, &binary.flavor, &binary.build_type),
            executable: buildable(binary.executable, &binary.build_task),
        })
        .collect();
    ProjectExecutable {
        name: raw.name,
        binaries,
    }
}

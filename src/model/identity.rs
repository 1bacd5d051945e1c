use std::{
    fmt::{Display, Formatter},
    sync::OnceLock,
};

use regex_lite::Regex;

use crate::model::ParseError;

/// Group and name of a module, without any version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct ModuleIdentifier {
    pub group: String,
    pub name: String,
}

impl ModuleIdentifier {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        ModuleIdentifier {
            group: group.into(),
            name: name.into(),
        }
    }

    /// Parses `group:name`. A trailing version is rejected.
    pub fn parse(value: &str) -> Result<Self, ParseError> {
        match parse_coordinate(value)? {
            (group, name, None) => Ok(ModuleIdentifier { group, name }),
            (_, _, Some(_)) => Err(ParseError::InvalidCoordinate(value.to_string())),
        }
    }
}

impl Display for ModuleIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

/// A dependency as the user declared it. The version is an opaque constraint
/// (`1.2`, `[1.0,)`, `latest.release`, ...) and is never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct ModuleVersionSelector {
    pub group: String,
    pub name: String,
    pub version: String,
}

impl ModuleVersionSelector {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        ModuleVersionSelector {
            group: group.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// Parses `group:name:version`.
    pub fn parse(value: &str) -> Result<Self, ParseError> {
        match parse_coordinate(value)? {
            (group, name, Some(version)) => Ok(ModuleVersionSelector {
                group,
                name,
                version,
            }),
            (_, _, None) => Err(ParseError::MissingVersion(value.to_string())),
        }
    }

    pub fn module(&self) -> ModuleIdentifier {
        ModuleIdentifier::new(&self.group, &self.name)
    }
}

impl Display for ModuleVersionSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct ModuleComponentSelector {
    pub group: String,
    pub name: String,
    pub version: String,
}

impl ModuleComponentSelector {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        ModuleComponentSelector {
            group: group.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn module(&self) -> ModuleIdentifier {
        ModuleIdentifier::new(&self.group, &self.name)
    }
}

impl From<&ModuleVersionSelector> for ModuleComponentSelector {
    fn from(selector: &ModuleVersionSelector) -> Self {
        ModuleComponentSelector::new(&selector.group, &selector.name, &selector.version)
    }
}

impl Display for ModuleComponentSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct ProjectComponentSelector {
    pub project_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct LibraryComponentSelector {
    pub project_path: String,
    pub library_name: String,
    pub variant: Option<String>,
}

/// The target a dependency edge currently points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum ComponentSelector {
    Module(ModuleComponentSelector),
    Project(ProjectComponentSelector),
    Library(LibraryComponentSelector),
}

impl ComponentSelector {
    pub fn module(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        ComponentSelector::Module(ModuleComponentSelector::new(group, name, version))
    }

    pub fn project(project_path: impl Into<String>) -> Self {
        ComponentSelector::Project(ProjectComponentSelector {
            project_path: project_path.into(),
        })
    }

    pub fn library(project_path: impl Into<String>, library_name: impl Into<String>) -> Self {
        ComponentSelector::Library(LibraryComponentSelector {
            project_path: project_path.into(),
            library_name: library_name.into(),
            variant: None,
        })
    }

    pub fn as_module(&self) -> Option<&ModuleComponentSelector> {
        match self {
            ComponentSelector::Module(selector) => Some(selector),
            ComponentSelector::Project(_) | ComponentSelector::Library(_) => None,
        }
    }
}

impl From<&ModuleVersionSelector> for ComponentSelector {
    fn from(selector: &ModuleVersionSelector) -> Self {
        ComponentSelector::Module(selector.into())
    }
}

impl Display for ComponentSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentSelector::Module(selector) => write!(f, "{}", selector),
            ComponentSelector::Project(selector) => write!(f, "project {}", selector.project_path),
            ComponentSelector::Library(LibraryComponentSelector {
                project_path,
                library_name,
                variant: None,
            }) => write!(f, "project '{}' library '{}'", project_path, library_name),
            ComponentSelector::Library(LibraryComponentSelector {
                project_path,
                library_name,
                variant: Some(variant),
            }) => write!(
                f,
                "project '{}' library '{}' variant '{}'",
                project_path, library_name, variant
            ),
        }
    }
}

fn coordinate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<group>[^:\s]+):(?P<name>[^:\s]+)(?::(?P<version>[^:]+))?$")
            .expect("coordinate pattern is valid")
    })
}

/// Splits `group:name[:version]` into its parts.
pub(crate) fn parse_coordinate(
    value: &str,
) -> Result<(String, String, Option<String>), ParseError> {
    let captures = coordinate_pattern()
        .captures(value.trim())
        .ok_or_else(|| ParseError::InvalidCoordinate(value.to_string()))?;
    let part = |name: &str| captures.name(name).map(|m| m.as_str().trim().to_string());

    match (part("group"), part("name")) {
        (Some(group), Some(name)) => Ok((group, name, part("version"))),
        _ => Err(ParseError::InvalidCoordinate(value.to_string())),
    }
}

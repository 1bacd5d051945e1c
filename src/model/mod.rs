use thiserror::Error;

pub mod descriptor;
pub mod identity;
pub mod library;
pub mod metadata;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error reading build descriptor: {0}")]
    IO(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid module coordinate `{0}`, expected `group:name` or `group:name:version`")]
    InvalidCoordinate(String),
    #[error("Module coordinate `{0}` must declare a version")]
    MissingVersion(String),
    #[error("Invalid linkage `{0}`, expected `shared` or `static`")]
    InvalidLinkage(String),
    #[error("Substitution of `{0}` must declare exactly one of `with` or `project`")]
    InvalidSubstitution(String),
    #[error("Dependency of library `{0}` must declare exactly one of `library` or `module`")]
    InvalidDependencySpec(String),
    #[error("{linkage} binary of `{component}` is missing `{key}`")]
    MissingBinaryFile {
        component: String,
        linkage: library::Linkage,
        key: &'static str,
    },
}

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("System already declared: {0}")]
    DuplicateSystem(String),

    #[error("System name must not be empty")]
    EmptyName,

    #[error("Resource name must not be empty (system '{0}')")]
    EmptyResourceName(String),

    #[error("Unknown resource id {id} in system '{system}'")]
    UnknownResource { system: String, id: u32 },
}

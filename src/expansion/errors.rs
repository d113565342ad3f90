use crate::{archive::ArchiveError, krm::ResourceListError};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum TransformError {
    #[error("{0}")]
    ResourceList(#[source] ResourceListError),
    #[error("spec.functions must contain at least one function")]
    NoFunctions,
    #[error("'name' is required for each function when there are multiple functions")]
    AmbiguousFunctionNames,
    #[error("Function name {0:?} is used more than once")]
    DuplicateFunctionName(String),
    #[error("Failed to generate package: {0}")]
    Package(#[source] PackageError),
    #[error("Failed to serialize generated resource: {0}")]
    Serialize(#[source] serde_json::Error),
}

#[derive(ThisError, Debug)]
pub enum PackageError {
    #[error("Failed to package literal source: {0}")]
    Literal(#[source] ArchiveError),
}

use crate::value::ErrorPtr;
use itertools::Itertools;
use thiserror::Error;

/// Errors related to resolving resources.
#[derive(Error, Clone, Debug)]
pub enum ResolverError {
    #[error("Detected dependency cycle: {}", .0.iter().join(" -> "))]
    DependencyCycle(Vec<String>),
    #[error("Cannot find resource: {0}")]
    UnknownResource(String),
    #[error("Tried to downcast resource '{name}' to incompatible type: {type_name}")]
    IncompatibleValue {
        name: String,
        type_name: &'static str,
    },
    /// A producer failed. The original error is displayed as-is.
    #[error("{0}")]
    Producer(ErrorPtr),
}

impl PartialEq for ResolverError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::DependencyCycle(left), Self::DependencyCycle(right)) => left == right,
            (Self::UnknownResource(left), Self::UnknownResource(right)) => left == right,
            (
                Self::IncompatibleValue {
                    name: left_name,
                    type_name: left_type,
                },
                Self::IncompatibleValue {
                    name: right_name,
                    type_name: right_type,
                },
            ) => left_name == right_name && left_type == right_type,
            (Self::Producer(left), Self::Producer(right)) => left.to_string() == right.to_string(),
            _ => false,
        }
    }
}

/// Error related to producer registries.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum ProducerRegistryError {
    #[error("Attempted to register a duplicated producer with name: {0}")]
    DuplicateProducerName(String),
    #[error("Detected dependency cycle between producers: {}", .0.iter().join(" -> "))]
    DependencyCycle(Vec<String>),
}

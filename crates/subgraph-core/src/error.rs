#![forbid(unsafe_code)]

use thiserror::Error;

use crate::object::ObjectId;

pub type Result<T> = std::result::Result<T, GraphError>;

/// Contract violations reported by the subscription graph.
///
/// All of these are caller bugs. They are surfaced immediately and the graph
/// never retries or repairs state on the caller's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("{object} is a proxy over {target}; subscription lookups take the raw object")]
    ProxyIdentity { object: ObjectId, target: ObjectId },

    #[error("{object} already has a registration; it cannot be re-seeded")]
    Reseed { object: ObjectId },

    #[error("{object} is not live in this container")]
    StaleObject { object: ObjectId },
}

impl GraphError {
    /// The object the violation was reported for.
    #[must_use]
    pub fn object(&self) -> ObjectId {
        match self {
            Self::ProxyIdentity { object, .. }
            | Self::Reseed { object }
            | Self::StaleObject { object } => *object,
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Row-major grid of a flow component; `None` cells are land.
pub type Matrix = Vec<Vec<Option<f64>>>;

/// The `u` (east) and `v` (north) components of one flow field, stored as `[u, v]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(Matrix, Matrix)", into = "(Matrix, Matrix)")]
pub struct MatrixPair {
    pub u: Matrix,
    pub v: Matrix,
}

impl From<(Matrix, Matrix)> for MatrixPair {
    fn from((u, v): (Matrix, Matrix)) -> Self {
        Self { u, v }
    }
}

impl From<MatrixPair> for (Matrix, Matrix) {
    fn from(pair: MatrixPair) -> Self {
        (pair.u, pair.v)
    }
}

/// One entry of the object store's index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactListing {
    pub time: DateTime<Utc>,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactState {
    /// Not downloaded yet.
    Pending,
    /// The download failed; not retried.
    Failed,
    Ready(Arc<MatrixPair>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub time: DateTime<Utc>,
    pub id: String,
    pub state: ArtifactState,
}

impl Artifact {
    pub fn is_pending(&self) -> bool {
        matches!(self.state, ArtifactState::Pending)
    }

    pub fn matrices(&self) -> Option<&MatrixPair> {
        match &self.state {
            ArtifactState::Ready(pair) => Some(pair),
            _ => None,
        }
    }

    pub(crate) fn with_state(&self, state: ArtifactState) -> Self {
        Self {
            time: self.time,
            id: self.id.clone(),
            state,
        }
    }
}

impl From<ArtifactListing> for Artifact {
    fn from(listing: ArtifactListing) -> Self {
        Self {
            time: listing.time,
            id: listing.id,
            state: ArtifactState::Pending,
        }
    }
}

//! Point-in-time registry status, published by the actor.

use serde::Serialize;

use crate::build::BuildState;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStatus {
    /// True once the initial scan and first build have finished.
    pub initialized: bool,
    pub state: BuildState,
    /// Handler names, internal first.
    pub functions: Vec<String>,
    pub routes: usize,
    /// Number of successful builds.
    pub generation: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_error: Option<String>,
}

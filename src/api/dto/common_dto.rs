//! Shared DTO types used across multiple endpoints.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Query parameters for the leaderboard.
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LimitParams {
    /// Rows to return (1 to 100). Defaults to 20.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Query parameters for the competitor list.
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct RosterParams {
    /// Include deactivated competitors. Defaults to `false`.
    #[serde(default)]
    pub include_inactive: bool,
}

/// Request body toggling a boolean flag.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ToggleRequest {
    /// New value.
    pub enabled: bool,
}

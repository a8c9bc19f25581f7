use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::Role;

/// One user's access to a provider, joined with the user's profile.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProviderAccessEntry {
    /// Backing access tuple id.
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub role: Role,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderAccessListResponse {
    pub results: Vec<ProviderAccessEntry>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GrantUserProviderAccessRequest {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAccessRoleRequest {
    pub role: Role,
}

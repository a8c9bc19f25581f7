use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

/// Kind of identity that can hold a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrincipalType {
    User,
    ServiceAccount,
}

impl PrincipalType {
    pub fn as_str(self) -> &'static str {
        match self {
            PrincipalType::User => "USER",
            PrincipalType::ServiceAccount => "SERVICE_ACCOUNT",
        }
    }
}

impl Default for PrincipalType {
    fn default() -> Self {
        PrincipalType::User
    }
}

impl fmt::Display for PrincipalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrincipalType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(PrincipalType::User),
            "SERVICE_ACCOUNT" => Ok(PrincipalType::ServiceAccount),
            other => Err(AppError::invalid_argument(format!("unknown principal type `{other}`"))),
        }
    }
}

/// Kind of object a grant can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    Folder,
    Workflow,
    Provider,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Folder => "FOLDER",
            ResourceType::Workflow => "WORKFLOW",
            ResourceType::Provider => "PROVIDER",
        }
    }

    /// Backing table holding rows of this resource type.
    pub(crate) fn table(self) -> &'static str {
        match self {
            ResourceType::Folder => "folders",
            ResourceType::Workflow => "workflows",
            ResourceType::Provider => "providers",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FOLDER" => Ok(ResourceType::Folder),
            "WORKFLOW" => Ok(ResourceType::Workflow),
            "PROVIDER" => Ok(ResourceType::Provider),
            other => Err(AppError::invalid_argument(format!("unknown resource type `{other}`"))),
        }
    }
}

/// An identity that can be granted access: `(principal_type, principal_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Principal {
    pub principal_type: PrincipalType,
    pub principal_id: Uuid,
}

impl Principal {
    pub fn new(principal_type: PrincipalType, principal_id: Uuid) -> Self {
        Self {
            principal_type,
            principal_id,
        }
    }

    pub fn user(user_id: Uuid) -> Self {
        Self::new(PrincipalType::User, user_id)
    }

    pub fn service_account(account_id: Uuid) -> Self {
        Self::new(PrincipalType::ServiceAccount, account_id)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.principal_type, self.principal_id)
    }
}

/// An object access can be granted on: `(resource_type, resource_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Resource {
    pub resource_type: ResourceType,
    pub resource_id: Uuid,
}

impl Resource {
    pub fn new(resource_type: ResourceType, resource_id: Uuid) -> Self {
        Self {
            resource_type,
            resource_id,
        }
    }

    pub fn folder(folder_id: Uuid) -> Self {
        Self::new(ResourceType::Folder, folder_id)
    }

    pub fn workflow(workflow_id: Uuid) -> Self {
        Self::new(ResourceType::Workflow, workflow_id)
    }

    pub fn provider(provider_id: Uuid) -> Self {
        Self::new(ResourceType::Provider, provider_id)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.resource_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_round_trip_through_strings() {
        for ty in [ResourceType::Folder, ResourceType::Workflow, ResourceType::Provider] {
            assert_eq!(ty.as_str().parse::<ResourceType>().unwrap(), ty);
        }
        assert_eq!(
            "service_account".parse::<PrincipalType>().unwrap(),
            PrincipalType::ServiceAccount
        );
        assert!("group".parse::<PrincipalType>().is_err());
    }

    #[test]
    fn display_uses_type_slash_id() {
        let id = Uuid::nil();
        assert_eq!(
            Resource::workflow(id).to_string(),
            "WORKFLOW/00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            Principal::service_account(id).to_string(),
            "SERVICE_ACCOUNT/00000000-0000-0000-0000-000000000000"
        );
    }
}

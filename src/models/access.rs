use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::authz::{Principal, PrincipalType, Resource, ResourceType, Role};
use crate::errors::AppError;

// =============================================================================
// ACCESS TUPLE (persisted direct grant)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AccessTuple {
    pub id: Uuid,
    pub principal_type: PrincipalType,
    pub principal_id: Uuid,
    pub resource_type: ResourceType,
    pub resource_id: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccessTuple {
    pub fn principal(&self) -> Principal {
        Principal::new(self.principal_type, self.principal_id)
    }

    pub fn resource(&self) -> Resource {
        Resource::new(self.resource_type, self.resource_id)
    }
}

/// Raw row shape; enum columns are still text until validated.
#[derive(Debug, Clone)]
pub struct DbAccessTuple {
    pub id: Uuid,
    pub principal_type: String,
    pub principal_id: Uuid,
    pub resource_type: String,
    pub resource_id: Uuid,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbAccessTuple> for AccessTuple {
    type Error = AppError;

    fn try_from(value: DbAccessTuple) -> Result<Self, Self::Error> {
        let corrupt = |err: AppError| AppError::internal(format!("corrupt access tuple {}: {err}", value.id));

        Ok(AccessTuple {
            id: value.id,
            principal_type: value.principal_type.parse().map_err(corrupt)?,
            principal_id: value.principal_id,
            resource_type: value.resource_type.parse().map_err(corrupt)?,
            resource_id: value.resource_id,
            role: value.role.parse().map_err(corrupt)?,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

// =============================================================================
// RESOLVED ACCESS (derived)
// =============================================================================

/// Effective role of a principal on a resource, with provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResolvedAccess {
    pub principal_type: PrincipalType,
    pub principal_id: Uuid,
    pub resource_type: ResourceType,
    pub resource_id: Uuid,
    pub role: Role,
    /// Ancestor folder that produced `role`; `None` when the grant is direct.
    pub inherited_from: Option<Uuid>,
    /// Backing tuple when the grant is direct.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tuple_id: Option<Uuid>,
}

impl ResolvedAccess {
    pub fn direct(tuple: &AccessTuple) -> Self {
        Self {
            principal_type: tuple.principal_type,
            principal_id: tuple.principal_id,
            resource_type: tuple.resource_type,
            resource_id: tuple.resource_id,
            role: tuple.role,
            inherited_from: None,
            tuple_id: Some(tuple.id),
        }
    }

    pub fn inherited(principal: Principal, resource: Resource, role: Role, from_folder: Uuid) -> Self {
        Self {
            principal_type: principal.principal_type,
            principal_id: principal.principal_id,
            resource_type: resource.resource_type,
            resource_id: resource.resource_id,
            role,
            inherited_from: Some(from_folder),
            tuple_id: None,
        }
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.principal_type, self.principal_id)
    }

    pub fn resource(&self) -> Resource {
        Resource::new(self.resource_type, self.resource_id)
    }

    pub fn is_inherited(&self) -> bool {
        self.inherited_from.is_some()
    }
}

// =============================================================================
// REQUESTS / QUERIES
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct AccessGrantRequest {
    pub principal_type: PrincipalType,
    pub principal_id: Uuid,
    pub resource_type: ResourceType,
    pub resource_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AccessRevokeQuery {
    pub principal_type: PrincipalType,
    pub principal_id: Uuid,
    pub resource_type: ResourceType,
    pub resource_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AccessRoleUpdateRequest {
    pub principal_type: PrincipalType,
    pub principal_id: Uuid,
    pub resource_type: ResourceType,
    pub resource_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EffectiveRoleQuery {
    pub resource_type: ResourceType,
    pub resource_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EffectiveRoleResponse {
    pub resource_type: ResourceType,
    pub resource_id: Uuid,
    pub role: Option<Role>,
    pub inherited_from: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AccessibleResourcesQuery {
    pub resource_type: Option<ResourceType>,
    pub min_role: Option<Role>,
    #[serde(default)]
    pub expand_hierarchy: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ResourcePrincipalsQuery {
    pub resource_type: ResourceType,
    pub resource_id: Uuid,
    pub principal_type: Option<PrincipalType>,
    pub min_role: Option<Role>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_tuple(role: &str) -> DbAccessTuple {
        let now = Utc::now();
        DbAccessTuple {
            id: Uuid::new_v4(),
            principal_type: "USER".to_string(),
            principal_id: Uuid::new_v4(),
            resource_type: "WORKFLOW".to_string(),
            resource_id: Uuid::new_v4(),
            role: role.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn converts_valid_row() {
        let tuple = AccessTuple::try_from(db_tuple("OWNER")).unwrap();
        assert_eq!(tuple.role, Role::Owner);
        assert_eq!(tuple.resource_type, ResourceType::Workflow);

        let resolved = ResolvedAccess::direct(&tuple);
        assert!(!resolved.is_inherited());
        assert_eq!(resolved.tuple_id, Some(tuple.id));
    }

    #[test]
    fn unknown_role_is_internal_error() {
        let err = AccessTuple::try_from(db_tuple("ADMIN")).unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Workflow {
    pub id: Uuid,
    pub namespace_id: Uuid,
    pub name: String,
    pub parent_folder_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WorkflowCreateRequest {
    pub namespace_id: Uuid,
    #[schema(example = "Nightly sync")]
    pub name: String,
    pub parent_folder_id: Option<Uuid>,
}

/// Move a workflow into `parent_folder_id`, or to the namespace root with
/// `detach = true`. A body with neither leaves the workflow where it is.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct WorkflowMoveRequest {
    pub parent_folder_id: Option<Uuid>,
    #[serde(default)]
    pub detach: bool,
}

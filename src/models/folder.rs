use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Folder {
    pub id: Uuid,
    pub namespace_id: Uuid,
    pub name: String,
    /// `None` for a root folder of the namespace.
    pub parent_folder_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A folder id at a given distance from the traversal start (0 = start).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct FolderDepth {
    pub folder_id: Uuid,
    pub depth: u32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FolderCreateRequest {
    pub namespace_id: Uuid,
    #[schema(example = "Marketing automations")]
    pub name: String,
    pub parent_folder_id: Option<Uuid>,
}

/// Rename and/or move a folder.
///
/// `parent_folder_id` moves the folder under another folder; `detach = true`
/// moves it back to the namespace root. Supplying both is rejected.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct FolderUpdateRequest {
    #[schema(example = "Archived")]
    pub name: Option<String>,
    pub parent_folder_id: Option<Uuid>,
    #[serde(default)]
    pub detach: bool,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct FolderListQuery {
    pub namespace_id: Option<Uuid>,
    /// Omit to list root folders.
    pub parent_folder_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FolderWithPath {
    #[serde(flatten)]
    pub folder: Folder,
    /// Root first, ending with the folder itself.
    pub path: Vec<Folder>,
}

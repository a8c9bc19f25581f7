//! Authorization engine.
//!
//! Access is held as direct tuples `(principal, resource, role)`. Folders and
//! workflows additionally inherit every grant made on an ancestor folder, and
//! the most permissive role reachable by any path is the effective one.
//!
//! - [`role`]: the `USER < OWNER` ordering
//! - [`hierarchy`]: folder tree traversal and structural mutations
//! - [`tuples`]: storage of direct grants
//! - [`resolver`]: effective role for a single principal/resource pair
//! - [`enumerator`]: accessible resources for a principal, principals for a resource
//! - [`grants`]: owner-gated grant, revoke and role change

pub mod enumerator;
pub mod grants;
pub mod hierarchy;
pub mod lookup;
mod principal;
pub mod resolver;
mod role;
pub mod tuples;

pub use principal::{Principal, PrincipalType, Resource, ResourceType};
pub use role::{higher, meets_minimum, outranks, Role};

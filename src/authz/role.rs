use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::AppError;

/// Privilege level held by a principal on a resource.
///
/// `USER` may view and execute; `OWNER` may additionally grant, revoke and
/// delete. Ordering is defined by [`Role::priority`] only, so new roles slot in
/// by adding a row to [`ROLE_PRIORITY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Owner,
}

/// Single priority table for every role. Higher number wins.
const ROLE_PRIORITY: &[(Role, u8)] = &[(Role::User, 1), (Role::Owner, 2)];

impl Role {
    pub fn priority(self) -> u8 {
        ROLE_PRIORITY
            .iter()
            .find(|(role, _)| *role == self)
            .map(|(_, priority)| *priority)
            .unwrap_or(0)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Owner => "OWNER",
        }
    }
}

/// The more permissive of two roles. Ties return `a`.
pub fn higher(a: Role, b: Role) -> Role {
    if b.priority() > a.priority() {
        b
    } else {
        a
    }
}

/// True iff `role` is at least as permissive as `min`.
pub fn meets_minimum(role: Role, min: Role) -> bool {
    role.priority() >= min.priority()
}

/// True iff `candidate` is strictly more permissive than `current`.
pub fn outranks(candidate: Role, current: Role) -> bool {
    higher(current, candidate) != current
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "OWNER" => Ok(Role::Owner),
            other => Err(AppError::invalid_argument(format!("unknown role `{other}`"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Role; 2] = [Role::User, Role::Owner];

    #[test]
    fn owner_outranks_user() {
        assert!(Role::Owner.priority() > Role::User.priority());
        assert_eq!(higher(Role::Owner, Role::User), Role::Owner);
        assert_eq!(higher(Role::User, Role::Owner), Role::Owner);
        assert_eq!(higher(Role::User, Role::User), Role::User);
        assert!(outranks(Role::Owner, Role::User));
        assert!(!outranks(Role::Owner, Role::Owner));
        assert!(!outranks(Role::User, Role::Owner));
    }

    #[test]
    fn higher_is_commutative_and_dominates_both_inputs() {
        for a in ALL {
            for b in ALL {
                let h = higher(a, b);
                assert_eq!(h, higher(b, a));
                assert!(meets_minimum(h, a));
                assert!(meets_minimum(h, b));
            }
        }
    }

    #[test]
    fn meets_minimum_table() {
        assert!(meets_minimum(Role::Owner, Role::User));
        assert!(meets_minimum(Role::Owner, Role::Owner));
        assert!(!meets_minimum(Role::User, Role::Owner));
        assert!(meets_minimum(Role::User, Role::User));
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("owner".parse::<Role>().unwrap(), Role::Owner);
        assert_eq!(" USER ".parse::<Role>().unwrap(), Role::User);
        assert!(matches!("admin".parse::<Role>(), Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn serializes_in_upper_case() {
        assert_eq!(serde_json::to_string(&Role::Owner).unwrap(), "\"OWNER\"");
        let parsed: Role = serde_json::from_str("\"USER\"").unwrap();
        assert_eq!(parsed, Role::User);
    }
}

//! Test data factories
//!
//! Every generated user gets a fresh UUID and an email derived from it, so
//! tests running in parallel against one API never collide.
//!
//! ```
//! use testkit_e2e::factory::{create_admin_user, create_user, Role, UserOverrides};
//!
//! let user = create_user(UserOverrides::default());
//! assert_eq!(user.role, Role::User);
//!
//! let admin = create_admin_user(UserOverrides {
//!     email: Some("admin@example.com".to_string()),
//!     ..Default::default()
//! });
//! assert_eq!(admin.email, "admin@example.com");
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Barbara", "Dennis", "Edsger", "Frances", "Grace", "Ken", "Linus", "Margaret",
    "Niklaus", "Radia", "Tony", "Vint",
];

const LAST_NAMES: &[&str] = &[
    "Allen", "Cerf", "Dijkstra", "Hamilton", "Hoare", "Hopper", "Kernighan", "Liskov", "Lovelace",
    "Perlman", "Ritchie", "Thompson", "Torvalds", "Turing", "Wirth",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
    Moderator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Moderator => "moderator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "moderator" => Ok(Role::Moderator),
            other => Err(format!("unknown role '{}', expected user, admin or moderator", other)),
        }
    }
}

/// A user as sent to `POST /api/users`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Fields to pin instead of generating
#[derive(Debug, Clone, Default)]
pub struct UserOverrides {
    pub id: Option<Uuid>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub created_at: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

/// Active `user`-role account with generated identity
pub fn create_user(overrides: UserOverrides) -> User {
    let mut rng = rand::thread_rng();
    let first = FIRST_NAMES.choose(&mut rng).copied().unwrap_or("Test");
    let last = LAST_NAMES.choose(&mut rng).copied().unwrap_or("User");

    let id = overrides.id.unwrap_or_else(Uuid::new_v4);
    let suffix: String = id.simple().to_string().chars().take(8).collect();

    User {
        id,
        email: overrides.email.unwrap_or_else(|| {
            format!("{}.{}.{}@example.com", first, last, suffix).to_lowercase()
        }),
        name: overrides
            .name
            .unwrap_or_else(|| format!("{} {}", first, last)),
        role: overrides.role.unwrap_or_default(),
        created_at: overrides.created_at.unwrap_or_else(Utc::now),
        is_active: overrides.is_active.unwrap_or(true),
    }
}

/// Admin account; an explicit role override still wins
pub fn create_admin_user(overrides: UserOverrides) -> User {
    create_user(UserOverrides {
        role: overrides.role.or(Some(Role::Admin)),
        ..overrides
    })
}

/// Deactivated account; an explicit `is_active` override still wins
pub fn create_inactive_user(overrides: UserOverrides) -> User {
    create_user(UserOverrides {
        is_active: overrides.is_active.or(Some(false)),
        ..overrides
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let user = create_user(UserOverrides::default());
        assert_eq!(user.role, Role::User);
        assert!(user.is_active);
        assert!(user.email.ends_with("@example.com"));
        assert!(user.name.contains(' '));
    }

    #[test]
    fn test_emails_are_unique() {
        let a = create_user(UserOverrides::default());
        let b = create_user(UserOverrides::default());
        assert_ne!(a.id, b.id);
        assert_ne!(a.email, b.email);
    }

    #[test]
    fn test_overrides_apply() {
        let id = Uuid::new_v4();
        let user = create_user(UserOverrides {
            id: Some(id),
            email: Some("specific@example.com".to_string()),
            role: Some(Role::Moderator),
            ..Default::default()
        });
        assert_eq!(user.id, id);
        assert_eq!(user.email, "specific@example.com");
        assert_eq!(user.role, Role::Moderator);
    }

    #[test]
    fn test_admin_and_inactive_variants() {
        assert_eq!(create_admin_user(UserOverrides::default()).role, Role::Admin);
        assert!(!create_inactive_user(UserOverrides::default()).is_active);

        let demoted = create_admin_user(UserOverrides {
            role: Some(Role::User),
            ..Default::default()
        });
        assert_eq!(demoted.role, Role::User);
    }

    #[test]
    fn test_serializes_camel_case() {
        let user = create_inactive_user(UserOverrides::default());
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["isActive"], false);
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("owner".parse::<Role>().is_err());
    }
}

//! User model
//!
//! The User entity, its gender enum, and the public profile shape handed to
//! views and JSON responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A registered reader of the portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Mobile number used as the login name (unique)
    pub mobile: String,
    /// Display name (unique)
    pub nick_name: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Storage key of the avatar image
    pub avatar_url: Option<String>,
    /// Personal signature
    pub signature: Option<String>,
    pub gender: Gender,
    pub is_admin: bool,
    pub last_login: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User.
    ///
    /// The password must already be hashed with `services::password::hash_password()`.
    pub fn new(mobile: String, nick_name: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            mobile,
            nick_name,
            password_hash,
            avatar_url: None,
            signature: None,
            gender: Gender::default(),
            is_admin: false,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Public avatar URL: the storage prefix plus key, or an empty string.
    pub fn avatar_url_with(&self, domain_prefix: &str) -> String {
        match self.avatar_url.as_deref() {
            Some(key) if !key.is_empty() => format!("{}{}", domain_prefix, key),
            _ => String::new(),
        }
    }

    /// Build the public profile representation
    pub fn to_profile(&self, domain_prefix: &str, followers_count: i64, news_count: i64) -> UserProfile {
        UserProfile {
            id: self.id,
            nick_name: self.nick_name.clone(),
            avatar_url: self.avatar_url_with(domain_prefix),
            mobile: self.mobile.clone(),
            gender: self.gender,
            signature: self.signature.clone().unwrap_or_default(),
            followers_count,
            news_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    #[default]
    Man,
    Woman,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Man => write!(f, "MAN"),
            Gender::Woman => write!(f, "WOMAN"),
        }
    }
}

impl FromStr for Gender {
    type Err = anyhow::Error;

    /// Only the exact stored spellings are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MAN" => Ok(Gender::Man),
            "WOMAN" => Ok(Gender::Woman),
            _ => Err(anyhow::anyhow!("Invalid gender: {}", s)),
        }
    }
}

/// Public profile of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub nick_name: String,
    /// Domain prefix + storage key, or `""` when no avatar is set
    pub avatar_url: String,
    pub mobile: String,
    pub gender: Gender,
    pub signature: String,
    pub followers_count: i64,
    pub news_count: i64,
}

/// Input for creating a new user (before password hashing)
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub mobile: String,
    pub nick_name: String,
    /// Plaintext password (will be hashed)
    pub password: String,
}

/// Base-info form as posted by the client.
///
/// Fields are optional here so that a missing field is reported as a
/// parameter error instead of a body rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBaseInfoInput {
    pub nick_name: Option<String>,
    pub gender: Option<String>,
    pub signature: Option<String>,
}

/// Password change form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangePasswordInput {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new() {
        let user = User::new("13800000000".to_string(), "reader".to_string(), "hash".to_string());

        assert_eq!(user.id, 0);
        assert_eq!(user.gender, Gender::Man);
        assert!(user.avatar_url.is_none());
        assert!(!user.is_admin);
    }

    #[test]
    fn test_avatar_url_with_prefix() {
        let mut user = User::new("13800000000".to_string(), "reader".to_string(), "hash".to_string());
        assert_eq!(user.avatar_url_with("/uploads/"), "");

        user.avatar_url = Some("abc123".to_string());
        assert_eq!(user.avatar_url_with("/uploads/"), "/uploads/abc123");
    }

    #[test]
    fn test_to_profile() {
        let mut user = User::new("13800000000".to_string(), "reader".to_string(), "hash".to_string());
        user.id = 7;
        user.signature = Some("hi".to_string());

        let profile = user.to_profile("http://img.example.com/", 3, 2);
        assert_eq!(profile.id, 7);
        assert_eq!(profile.signature, "hi");
        assert_eq!(profile.followers_count, 3);
        assert_eq!(profile.news_count, 2);
        assert_eq!(profile.avatar_url, "");
    }

    #[test]
    fn test_gender_parse_is_exact() {
        assert_eq!(Gender::from_str("MAN").unwrap(), Gender::Man);
        assert_eq!(Gender::from_str("WOMAN").unwrap(), Gender::Woman);
        assert!(Gender::from_str("man").is_err());
        assert!(Gender::from_str("OTHER").is_err());
        assert!(Gender::from_str("").is_err());
    }

    #[test]
    fn test_gender_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Gender::Woman).unwrap(), "\"WOMAN\"");
        assert_eq!(Gender::Man.to_string(), "MAN");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("13800000000".to_string(), "reader".to_string(), "secret".to_string());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Role, User};

/// Session token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl Claims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    pub fn is_expired(&self) -> bool {
        self.exp < chrono::Utc::now().timestamp()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    /// Claims for a freshly authenticated user.
    pub fn for_user(user: &User) -> ClaimsBuilder {
        ClaimsBuilder::new()
            .user_id(user.id)
            .role(user.role)
            .email(user.email.clone())
            .name(user.first_name.clone(), user.last_name.clone())
    }

    pub fn builder() -> ClaimsBuilder {
        ClaimsBuilder::new()
    }
}

#[derive(Debug)]
pub struct ClaimsBuilder {
    sub: Option<String>,
    roles: Vec<String>,
    email: String,
    first_name: String,
    last_name: String,
    ttl_secs: i64,
}

impl Default for ClaimsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimsBuilder {
    pub fn new() -> Self {
        Self {
            sub: None,
            roles: Vec::new(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            ttl_secs: 86_400,
        }
    }

    pub fn subject(mut self, sub: impl Into<String>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    pub fn user_id(mut self, id: Uuid) -> Self {
        self.sub = Some(id.to_string());
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.roles.push(role.as_str().to_string());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    /// Token lifetime in seconds.
    pub fn ttl_secs(mut self, secs: i64) -> Self {
        self.ttl_secs = secs;
        self
    }

    pub fn build(self) -> Result<Claims, String> {
        let sub = self.sub.ok_or("Subject is required")?;
        let now = chrono::Utc::now().timestamp();

        Ok(Claims {
            sub,
            iat: now,
            exp: now + self.ttl_secs,
            roles: self.roles,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_identity() {
        let id = Uuid::new_v4();
        let claims = Claims::builder()
            .user_id(id)
            .role(Role::Admin)
            .email("ada@example.com")
            .name("Ada", "Lovelace")
            .ttl_secs(60)
            .build()
            .unwrap();

        assert_eq!(claims.user_id(), Some(id));
        assert!(claims.has_role("ADMIN"));
        assert!(claims.has_role("admin"));
        assert!(!claims.has_role("USER"));
        assert_eq!(claims.exp - claims.iat, 60);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_missing_subject() {
        assert!(Claims::builder().build().is_err());
    }

    #[test]
    fn test_wire_names_are_camel_case() {
        let claims = Claims::builder()
            .subject("u-1")
            .name("Grace", "Hopper")
            .build()
            .unwrap();
        let json = serde_json::to_value(&claims).unwrap();

        assert_eq!(json["firstName"], "Grace");
        assert_eq!(json["lastName"], "Hopper");
        assert!(json.get("first_name").is_none());
    }

    #[test]
    fn test_expired() {
        let claims = Claims {
            sub: "u-1".into(),
            iat: 0,
            exp: 1,
            roles: vec![],
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
        };
        assert!(claims.is_expired());
    }
}

//! Domain operations, one type per RPC function.
//!
//! Each operation validates its input, checks what the caller may do, talks
//! to the [`Store`](crate::store::Store) and wraps the result in a [`Reply`].

pub mod projects;
pub mod tasks;
pub mod tickets;
pub mod users;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::function::AuthContext;
use crate::model::Role;

/// Response envelope returned by every operation.
#[derive(Debug, Clone, Serialize)]
pub struct Reply<T> {
    pub status: u16,
    pub message: String,
    pub data: T,
}

impl<T> Reply<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: 200,
            message: message.into(),
            data,
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: 201,
            message: message.into(),
            data,
        }
    }
}

/// `Ok(Reply::ok(..))` with the error type pinned, for use as the tail of an
/// `async` body.
pub fn ok<T>(message: impl Into<String>, data: T) -> Result<Reply<T>> {
    Ok(Reply::ok(message, data))
}

/// `Ok(Reply::created(..))` with the error type pinned.
pub fn created<T>(message: impl Into<String>, data: T) -> Result<Reply<T>> {
    Ok(Reply::created(message, data))
}

/// Arguments for functions that take none. Accepts `{}`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct NoArgs {}

/// Arguments carrying a single id.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ById {
    pub id: Uuid,
}

/// Payload of a successful delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Deleted {
    pub id: Uuid,
}

pub(crate) fn require_admin(auth: &AuthContext) -> Result<()> {
    auth.require_role(Role::Admin.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_envelope() {
        let reply = Reply::created("Task successfully created", 7);
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": 201, "message": "Task successfully created", "data": 7})
        );
        assert_eq!(Reply::ok("fine", ()).status, 200);
    }

    #[test]
    fn test_no_args_accepts_empty_object() {
        let _: NoArgs = serde_json::from_value(serde_json::json!({})).unwrap();
    }
}

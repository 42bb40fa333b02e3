/// API route handlers
///
/// Handlers are thin: they extract the actor and request body, call
/// [`AccessService`](bugtrack_shared::service::AccessService), and wrap the
/// result in the `{"success": true, "data": ...}` envelope.
///
/// - `health`: Health check endpoint
/// - `auth`: Current user
/// - `users`: User lookup
/// - `projects`: Project CRUD and membership
/// - `bugs`: Bug CRUD, comments, and attachments

pub mod auth;
pub mod bugs;
pub mod health;
pub mod projects;
pub mod users;

use serde::{Deserialize, Serialize};

/// Success envelope for every `/v1` response
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,

    /// Number of items, set for list responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,

    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            count: None,
            data,
        }
    }
}

impl<T> Envelope<Vec<T>> {
    pub fn list(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: Some(data.len()),
            data,
        }
    }
}

/// Empty `data` object for deletions
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Empty {}

//! Model service boundary: record types and the HTTP client

mod client;
mod types;

pub use client::ApiClient;
pub use types::{Capabilities, Group, Model, ModelMeta, UpdatePayload, UpdateResponse};

use anyhow::Result;

/// Operations the editing session needs from the service
pub trait AclService {
    /// List every group that can be granted access
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be reached or answers badly
    fn list_groups(&self) -> Result<Vec<Group>>;

    /// List every model, enabled or not
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be reached or answers badly
    fn list_models(&self) -> Result<Vec<Model>>;

    /// Replace a model record with `payload`
    ///
    /// A non-success status is returned as a response, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error only when no response was received
    fn update_model(&self, payload: &UpdatePayload) -> Result<UpdateResponse>;

    /// URL the update for `model_id` is sent to, for diagnostics
    fn update_url(&self, model_id: &str) -> String;
}

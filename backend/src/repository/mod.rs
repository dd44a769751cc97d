//! Farm persistence
//!
//! A farm and its plots are loaded and saved as one document. Saves are conditional
//! on the revision the caller loaded, so two overlapping edits cannot silently
//! overwrite each other.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Farm;

#[cfg(test)]
pub mod memory;
pub mod postgres;

#[cfg(test)]
pub use memory::InMemoryFarmRepository;
pub use postgres::PgFarmRepository;

#[async_trait]
pub trait FarmRepository: Send + Sync {
    /// Active farms owned by `owner_id`, oldest first
    async fn list_for_owner(&self, owner_id: Uuid) -> AppResult<Vec<Farm>>;

    /// An active farm, only if `owner_id` owns it
    async fn find(&self, owner_id: Uuid, farm_id: Uuid) -> AppResult<Option<Farm>>;

    /// Store a new farm; the stored copy is returned
    async fn insert(&self, farm: &Farm) -> AppResult<Farm>;

    /// Replace a farm if its stored revision still equals `farm.revision`.
    ///
    /// Returns the stored copy with the revision incremented. Fails with
    /// `Conflict` when another save got there first and `NotFound` when the farm is
    /// gone, inactive or not owned by `farm.owner_id`.
    async fn save(&self, farm: &Farm) -> AppResult<Farm>;

    /// Like [`find`](Self::find) but a missing farm is an error
    async fn load(&self, owner_id: Uuid, farm_id: Uuid) -> AppResult<Farm> {
        self.find(owner_id, farm_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Farm".to_string()))
    }
}

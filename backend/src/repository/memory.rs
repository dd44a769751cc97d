//! In-process farm store for service and route tests

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::FarmRepository;
use crate::error::{AppError, AppResult};
use crate::models::Farm;

#[derive(Default)]
pub struct InMemoryFarmRepository {
    farms: RwLock<HashMap<Uuid, Farm>>,
}

impl InMemoryFarmRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FarmRepository for InMemoryFarmRepository {
    async fn list_for_owner(&self, owner_id: Uuid) -> AppResult<Vec<Farm>> {
        let farms = self.farms.read().await;
        let mut owned: Vec<Farm> = farms
            .values()
            .filter(|farm| farm.owner_id == owner_id && farm.is_active)
            .cloned()
            .collect();
        owned.sort_by_key(|farm| farm.created_at);
        Ok(owned)
    }

    async fn find(&self, owner_id: Uuid, farm_id: Uuid) -> AppResult<Option<Farm>> {
        let farms = self.farms.read().await;
        Ok(farms
            .get(&farm_id)
            .filter(|farm| farm.owner_id == owner_id && farm.is_active)
            .cloned())
    }

    async fn insert(&self, farm: &Farm) -> AppResult<Farm> {
        let mut farms = self.farms.write().await;
        if farms.contains_key(&farm.id) {
            return Err(AppError::Conflict {
                resource: "farm".to_string(),
                message: format!("Farm {} already exists", farm.id),
            });
        }
        farms.insert(farm.id, farm.clone());
        Ok(farm.clone())
    }

    async fn save(&self, farm: &Farm) -> AppResult<Farm> {
        let mut farms = self.farms.write().await;
        let stored = farms
            .get_mut(&farm.id)
            .filter(|stored| stored.owner_id == farm.owner_id && stored.is_active)
            .ok_or_else(|| AppError::NotFound("Farm".to_string()))?;

        if stored.revision != farm.revision {
            return Err(AppError::stale_revision(farm.revision));
        }

        let mut saved = farm.clone();
        saved.revision = farm.revision + 1;
        saved.created_at = stored.created_at;
        saved.updated_at = Utc::now();
        *stored = saved.clone();
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::grid::GridShape;
    use shared::reconcile::initial_plots;

    fn farm(owner_id: Uuid) -> Farm {
        Farm {
            id: Uuid::new_v4(),
            owner_id,
            name: "Store Farm".to_string(),
            location: None,
            soil_type: None,
            total_size: Decimal::from(4),
            grid_annotation: None,
            grid: Some(GridShape::new(2, 2)),
            plots: initial_plots(GridShape::new(2, 2), Decimal::from(4)),
            is_active: true,
            revision: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_bumps_revision_and_rejects_stale_copy() {
        let store = InMemoryFarmRepository::new();
        let owner = Uuid::new_v4();
        let original = store.insert(&farm(owner)).await.unwrap();

        let mut first = original.clone();
        first.name = "First".to_string();
        let saved = store.save(&first).await.unwrap();
        assert_eq!(saved.revision, 2);

        let mut second = original.clone();
        second.name = "Second".to_string();
        let err = store.save(&second).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));

        let stored = store.load(owner, original.id).await.unwrap();
        assert_eq!(stored.name, "First");
    }

    #[tokio::test]
    async fn test_find_hides_inactive_and_foreign_farms() {
        let store = InMemoryFarmRepository::new();
        let owner = Uuid::new_v4();
        let farm = store.insert(&farm(owner)).await.unwrap();

        assert!(store.find(Uuid::new_v4(), farm.id).await.unwrap().is_none());

        let mut retired = farm.clone();
        retired.is_active = false;
        store.save(&retired).await.unwrap();

        assert!(store.find(owner, farm.id).await.unwrap().is_none());
        assert!(store.list_for_owner(owner).await.unwrap().is_empty());
        let err = store.save(&retired).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}

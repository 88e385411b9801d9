use crate::model::Species;
use crate::repository::{CatalogRepository, StoreResult};
use std::sync::Arc;

/// Read-only list of species that may be drawn into a pool.
#[derive(Debug, Clone)]
pub struct Catalog {
    repository: Arc<dyn CatalogRepository>,
}

impl Catalog {
    pub fn new(repository: Arc<dyn CatalogRepository>) -> Self {
        Self { repository }
    }

    /// Every species, ordered by id.
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn entries(&self) -> StoreResult<Vec<Species>> {
        let mut entries = self.repository.species().await?;
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entries)
    }

    /// # Errors
    /// Propagates store failures.
    pub async fn get(&self, id: &str) -> StoreResult<Option<Species>> {
        self.repository.species_by_id(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReferenceData;
    use crate::store::MemoryStore;

    fn species(id: &str) -> Species {
        Species { id: id.into(), name: id.to_uppercase(), description: String::new(), habitat_id: None }
    }

    #[tokio::test]
    async fn entries_are_ordered_by_id() {
        let data = ReferenceData {
            habitats: Vec::new(),
            species: vec![species("owl"), species("axolotl"), species("deer")],
            branches: Vec::new(),
        };
        let catalog = Catalog::new(Arc::new(MemoryStore::with_reference(&data)));

        let ids: Vec<_> = catalog.entries().await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, ["axolotl", "deer", "owl"]);

        assert_eq!(catalog.get("deer").await.unwrap().map(|s| s.name), Some("DEER".to_owned()));
        assert!(catalog.get("dodo").await.unwrap().is_none());
    }
}

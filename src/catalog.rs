//! Memory catalog
//!
//! The ordered list of memories, embedded at build time. Ids run 1..=N and
//! define the order they must be collected in.

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Catalog item identifier (1-based, order-significant)
pub type ItemId = u32;

/// Built-in catalog data
const BUILTIN_CATALOG: &str = include_str!("../assets/catalog.json");

fn default_scale() -> f32 {
    1.0
}

/// A single memory envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectibleItem {
    pub id: ItemId,
    pub title: String,
    pub message: String,
    /// Image asset path
    pub image: String,
    /// Display scale (1.0 = default envelope size)
    #[serde(default = "default_scale")]
    pub scale: f32,
}

/// Immutable, validated list of memories
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    items: Vec<CollectibleItem>,
}

impl Catalog {
    /// Parse and validate a catalog from JSON
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let items: Vec<CollectibleItem> = serde_json::from_str(json)?;
        Self::from_items(items)
    }

    /// Validate a list of items (ids must be exactly 1..=N in order)
    pub fn from_items(items: Vec<CollectibleItem>) -> Result<Self, CatalogError> {
        if items.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (position, item) in items.iter().enumerate() {
            let expected = position as ItemId + 1;
            if item.id != expected {
                return Err(CatalogError::IdOutOfSequence {
                    position,
                    expected,
                    found: item.id,
                });
            }
        }
        Ok(Self { items })
    }

    /// The catalog shipped with the experience
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ItemId) -> Option<&CollectibleItem> {
        let index = (id as usize).checked_sub(1)?;
        self.items.get(index)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollectibleItem> {
        self.items.iter()
    }

    /// Image paths, in catalog order (for the preload manifest)
    pub fn image_paths(&self) -> Vec<String> {
        self.items.iter().map(|item| item.image.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::CATALOG_SIZE;

    fn item(id: ItemId) -> CollectibleItem {
        CollectibleItem {
            id,
            title: format!("Memory {id}"),
            message: "hello".to_string(),
            image: format!("img/{id}.png"),
            scale: 1.0,
        }
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = Catalog::builtin().expect("builtin catalog parses");
        assert_eq!(catalog.len(), CATALOG_SIZE);
        assert_eq!(catalog.get(1).map(|i| i.id), Some(1));
        assert_eq!(catalog.get(12).map(|i| i.id), Some(12));
        assert!(catalog.get(0).is_none());
        assert!(catalog.get(13).is_none());
    }

    #[test]
    fn test_scale_defaults_to_one() {
        let catalog = Catalog::from_json(
            r#"[{"id":1,"title":"t","message":"m","image":"a.png"}]"#,
        )
        .unwrap();
        assert_eq!(catalog.get(1).unwrap().scale, 1.0);
    }

    #[test]
    fn test_rejects_out_of_sequence_ids() {
        let err = Catalog::from_items(vec![item(1), item(3)]).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::IdOutOfSequence { position: 1, expected: 2, found: 3 }
        ));
    }

    #[test]
    fn test_rejects_empty_and_malformed() {
        assert!(matches!(Catalog::from_items(vec![]), Err(CatalogError::Empty)));
        assert!(matches!(Catalog::from_json("{"), Err(CatalogError::Parse(_))));
    }
}

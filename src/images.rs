//! Keyed lookup from an image reference to a displayable asset.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::CatalogItem;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ImageAsset {
    pub url: String,
    pub description: String,
    #[serde(default)]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ImageLibrary {
    assets: BTreeMap<String, ImageAsset>,
}

impl ImageLibrary {
    pub fn new(assets: BTreeMap<String, ImageAsset>) -> Self {
        Self { assets }
    }

    pub fn get(&self, key: &str) -> Option<&ImageAsset> {
        self.assets.get(key)
    }

    /// Resolve the asset for a catalog item. An unknown reference resolves to
    /// `None`; callers skip the item rather than treat it as an error.
    pub fn resolve(&self, item: &CatalogItem) -> Option<&ImageAsset> {
        let asset = self.assets.get(&item.image);
        if asset.is_none() {
            debug!(item = %item.id, image = %item.image, "no asset for image reference, skipping");
        }
        asset
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

//! The showcased car catalog: an ordered, immutable list of records loaded
//! once at startup from a YAML file.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::images::{ImageAsset, ImageLibrary};

/// One showcased car. Display order is the file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub description: String,
    /// Key into the image library.
    pub image: String,
    /// Accent color used for page theming, `#RRGGBB`.
    pub accent_color: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CatalogFile {
    items: Vec<CatalogItem>,
    #[serde(default)]
    images: BTreeMap<String, ImageAsset>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    /// Validates and wraps an ordered list of items.
    ///
    /// # Errors
    /// Returns [`Error::EmptyCatalog`] for an empty list and
    /// [`Error::BadCatalog`] for duplicate ids or malformed accent colors.
    pub fn new(items: Vec<CatalogItem>) -> Result<Self, Error> {
        if items.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        let mut ids = BTreeSet::new();
        for item in &items {
            if !ids.insert(item.id.as_str()) {
                return Err(Error::BadCatalog(format!("duplicate item id '{}'", item.id)));
            }
            parse_accent_color(&item.accent_color)?;
        }
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CatalogItem> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }
}

/// Loads the catalog and its image library from a single YAML file.
pub fn load_catalog_file(path: impl AsRef<Path>) -> Result<(Catalog, ImageLibrary), Error> {
    let raw = std::fs::read_to_string(path)?;
    let file: CatalogFile = serde_yaml::from_str(&raw)?;
    let catalog = Catalog::new(file.items)?;
    Ok((catalog, ImageLibrary::new(file.images)))
}

/// Parse a `#RRGGBB` accent color into its channels.
pub fn parse_accent_color(raw: &str) -> Result<[u8; 3], Error> {
    let bad = || Error::BadCatalog(format!("accent color '{raw}' must be #RRGGBB"));
    let hex = raw.strip_prefix('#').ok_or_else(bad)?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(bad());
    }
    let mut channels = [0u8; 3];
    for (i, chunk) in [&hex[0..2], &hex[2..4], &hex[4..6]].into_iter().enumerate() {
        channels[i] = u8::from_str_radix(chunk, 16).map_err(|_| bad())?;
    }
    Ok(channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, color: &str) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            name: format!("{id}-name"),
            brand: "TestWorks".to_string(),
            description: "A test car.".to_string(),
            image: format!("{id}-img"),
            accent_color: color.to_string(),
        }
    }

    #[test]
    fn preserves_file_order() {
        let catalog = Catalog::new(vec![item("b", "#112233"), item("a", "#445566")]).unwrap();
        assert_eq!(catalog.get(0).unwrap().id, "b");
        assert_eq!(catalog.get(1).unwrap().id, "a");
    }

    #[test]
    fn rejects_empty_catalog() {
        assert!(matches!(Catalog::new(Vec::new()), Err(Error::EmptyCatalog)));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Catalog::new(vec![item("a", "#112233"), item("a", "#445566")]).unwrap_err();
        assert!(matches!(err, Error::BadCatalog(_)));
    }

    #[test]
    fn parses_accent_colors() {
        assert_eq!(parse_accent_color("#D32F2F").unwrap(), [0xD3, 0x2F, 0x2F]);
        assert!(parse_accent_color("D32F2F").is_err());
        assert!(parse_accent_color("#D32F").is_err());
        assert!(parse_accent_color("#GGGGGG").is_err());
    }

    #[test]
    fn loads_items_and_images_from_yaml() {
        let yaml = r##"
items:
  - id: c1
    name: Cyber-GT
    brand: FutureDrive
    description: Electric performance.
    image: car-1
    accent-color: "#9E9E9E"
images:
  car-1:
    url: "https://example.com/car-1.jpg"
    description: A silver sports car
    hint: sports car
"##;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        std::fs::write(&path, yaml).unwrap();
        let (catalog, images) = load_catalog_file(&path).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(0).unwrap().brand, "FutureDrive");
        assert_eq!(
            images.get("car-1").unwrap().url,
            "https://example.com/car-1.jpg"
        );
    }
}

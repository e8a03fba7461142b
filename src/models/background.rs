use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One themed background the kiosk can composite a selfie onto.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Background {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    /// Thumbnail reference served to kiosk clients.
    pub thumbnail: String,
    /// Scene prompt fragment forwarded to the generation API.
    #[serde(skip_serializing, default)]
    pub prompt: String,
}

/// Static catalog of available backgrounds, keyed by id.
pub struct BackgroundCatalog {
    entries: Vec<Background>,
    by_id: HashMap<String, usize>,
}

impl BackgroundCatalog {
    pub fn new(entries: Vec<Background>) -> Self {
        let by_id = entries
            .iter()
            .enumerate()
            .map(|(i, b)| (b.id.clone(), i))
            .collect();
        Self { entries, by_id }
    }

    /// The content set shipped with the kiosk deployment.
    pub fn builtin() -> Self {
        Self::new(vec![
            Background {
                id: "neon-skyline".to_string(),
                name: "Neon Skyline".to_string(),
                description: "Night-time city rooftop washed in neon signage".to_string(),
                category: "City".to_string(),
                thumbnail: "/thumbnails/neon-skyline.jpg".to_string(),
                prompt: "standing on a rooftop overlooking a neon-lit city at night".to_string(),
            },
            Background {
                id: "old-town".to_string(),
                name: "Old Town".to_string(),
                description: "Cobblestone alley with lantern-lit facades".to_string(),
                category: "City".to_string(),
                thumbnail: "/thumbnails/old-town.jpg".to_string(),
                prompt: "in a cobblestone alley of a historic old town at dusk".to_string(),
            },
            Background {
                id: "alpine-lake".to_string(),
                name: "Alpine Lake".to_string(),
                description: "Mirror-still mountain lake at sunrise".to_string(),
                category: "Nature".to_string(),
                thumbnail: "/thumbnails/alpine-lake.jpg".to_string(),
                prompt: "at the shore of a mirror-still alpine lake at sunrise".to_string(),
            },
            Background {
                id: "redwood-trail".to_string(),
                name: "Redwood Trail".to_string(),
                description: "Sunbeams through a towering redwood forest".to_string(),
                category: "Nature".to_string(),
                thumbnail: "/thumbnails/redwood-trail.jpg".to_string(),
                prompt: "on a forest trail between towering redwoods with sunbeams".to_string(),
            },
            Background {
                id: "orbit-station".to_string(),
                name: "Orbit Station".to_string(),
                description: "Observation deck of a space station above Earth".to_string(),
                category: "Fantasy".to_string(),
                thumbnail: "/thumbnails/orbit-station.jpg".to_string(),
                prompt: "on the observation deck of a space station with Earth below".to_string(),
            },
        ])
    }

    pub fn get(&self, id: &str) -> Option<&Background> {
        self.by_id.get(id).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries grouped into named categories, preserving catalog order
    /// within each category.
    pub fn grouped(&self) -> Vec<(String, Vec<&Background>)> {
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<&Background>> = HashMap::new();
        for entry in &self.entries {
            if !groups.contains_key(&entry.category) {
                order.push(entry.category.clone());
            }
            groups.entry(entry.category.clone()).or_default().push(entry);
        }
        order
            .into_iter()
            .map(|cat| {
                let items = groups.remove(&cat).unwrap_or_default();
                (cat, items)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let catalog = BackgroundCatalog::builtin();
        let bg = catalog.get("neon-skyline").expect("known id");
        assert_eq!(bg.name, "Neon Skyline");
        assert_eq!(bg.category, "City");
    }

    #[test]
    fn test_unknown_id_is_none() {
        let catalog = BackgroundCatalog::builtin();
        assert!(catalog.get("bg-does-not-exist").is_none());
    }

    #[test]
    fn test_grouped_preserves_category_order() {
        let catalog = BackgroundCatalog::builtin();
        let grouped = catalog.grouped();
        let categories: Vec<&str> = grouped.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(categories, vec!["City", "Nature", "Fantasy"]);
        let city = &grouped[0].1;
        assert_eq!(city.len(), 2);
        assert_eq!(city[0].id, "neon-skyline");
    }

    #[test]
    fn test_prompt_not_serialized() {
        let catalog = BackgroundCatalog::builtin();
        let bg = catalog.get("alpine-lake").unwrap();
        let json = serde_json::to_value(bg).expect("serialize");
        assert!(json.get("prompt").is_none());
        assert!(json.get("thumbnail").is_some());
    }
}

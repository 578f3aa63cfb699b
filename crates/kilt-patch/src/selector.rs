//! Container selection from resource tags
//!
//! Resources opt containers in or out of instrumentation with a fixed set
//! of tags. Container lists are separated by [`CONTAINER_LIST_SEPARATOR`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Patch every container of the resource (opt-in mode)
pub const INCLUDE_TAG: &str = "kilt-include";
/// Leave the whole resource alone
pub const IGNORE_TAG: &str = "kilt-ignore";
/// Containers to patch (opt-in mode)
pub const INCLUDE_CONTAINERS_TAG: &str = "kilt-include-containers";
/// Containers to leave alone (opt-out mode)
pub const IGNORE_CONTAINERS_TAG: &str = "kilt-ignore-containers";

/// Separator of container names in list tags
pub const CONTAINER_LIST_SEPARATOR: char = ':';

const OPT_TAG_KEYS: [&str; 4] = [
    INCLUDE_TAG,
    IGNORE_TAG,
    INCLUDE_CONTAINERS_TAG,
    IGNORE_CONTAINERS_TAG,
];

/// Opt tags of one resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptTags {
    tags: IndexMap<String, String>,
}

impl OptTags {
    /// Create empty tag set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if `key` belongs to the opt tag vocabulary (case-sensitive)
    #[inline]
    #[must_use]
    pub fn is_opt_key(key: &str) -> bool {
        OPT_TAG_KEYS.contains(&key)
    }

    /// Keep the recognized pairs, later duplicates win
    #[must_use]
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let tags = pairs
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .filter(|(key, _)| Self::is_opt_key(key))
            .collect();
        Self { tags }
    }

    /// Extract opt tags from a resource's `Properties.Tags` list of `{Key, Value}`
    ///
    /// Entries without a string `Key` are ignored; non-string values are kept as JSON text.
    #[must_use]
    pub fn from_resource(resource: &Value) -> Self {
        let Some(Value::Array(entries)) = resource.get("Properties").and_then(|p| p.get("Tags")) else {
            return Self::new();
        };

        Self::from_pairs(entries.iter().filter_map(|entry| {
            let key = entry.get("Key")?.as_str()?;
            let value = match entry.get("Value") {
                Some(Value::String(value)) => value.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            Some((key.to_string(), value))
        }))
    }

    /// Raw value of a tag
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Number of recognized tags
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Check if no opt tag is present
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Check if the resource opts in as a whole
    #[inline]
    #[must_use]
    pub fn has_global_include(&self) -> bool {
        self.tags.contains_key(INCLUDE_TAG)
    }

    /// Check if the whole resource must be left alone
    #[inline]
    #[must_use]
    pub fn skips_resource(&self) -> bool {
        self.tags.contains_key(IGNORE_TAG)
    }

    /// Containers explicitly included
    pub fn included_containers(&self) -> impl Iterator<Item = &str> {
        self.list(INCLUDE_CONTAINERS_TAG)
    }

    /// Containers explicitly ignored
    pub fn ignored_containers(&self) -> impl Iterator<Item = &str> {
        self.list(IGNORE_CONTAINERS_TAG)
    }

    fn list(&self, key: &str) -> impl Iterator<Item = &str> {
        self.get(key)
            .unwrap_or_default()
            .split(CONTAINER_LIST_SEPARATOR)
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Decide whether a container is instrumented
///
/// In opt-in mode a container is patched only when it is listed in
/// [`INCLUDE_CONTAINERS_TAG`] or the resource carries [`INCLUDE_TAG`].
/// Otherwise it is patched unless listed in [`IGNORE_CONTAINERS_TAG`].
#[must_use]
pub fn should_patch(container_name: &str, tags: &OptTags, opt_in: bool) -> bool {
    if opt_in {
        tags.has_global_include() || tags.included_containers().any(|name| name == container_name)
    } else {
        !tags.ignored_containers().any(|name| name == container_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn opt_keys() {
        for key in OPT_TAG_KEYS {
            assert!(OptTags::is_opt_key(key), "{key}");
        }
        assert!(!OptTags::is_opt_key("so-long-and-thanks-for-all-the-fish"));
        assert!(!OptTags::is_opt_key("Kilt-Include"));
    }

    #[test]
    fn tags_without_properties_or_tags() {
        let no_properties = json!({"McGuffin": {"Tags": [{"Key": "kilt-ignore", "Value": "x"}]}});
        assert!(OptTags::from_resource(&no_properties).is_empty());

        let no_tags = json!({"Properties": {"Accio": [{"Key": "kilt-ignore", "Value": "x"}]}});
        assert!(OptTags::from_resource(&no_tags).is_empty());
    }

    #[test]
    fn unknown_tags_are_ignored() {
        let resource = json!({"Properties": {"Tags": [
            {"Key": "SoLong", "Value": "AndThanksForAllTheFish"},
            {"Key": "TimeIsAnIllusion", "Value": "LunchtimeDoublySo"},
        ]}});
        assert!(OptTags::from_resource(&resource).is_empty());
    }

    #[test]
    fn all_opt_tags() {
        let resource = json!({"Properties": {"Tags": [
            {"Key": "SoLong", "Value": "AndThanksForAllTheFish"},
            {"Key": "kilt-ignore", "Value": "nanananananaBatman"},
            {"Key": "kilt-include", "Value": "gimmeGimmeGimmeFriedChicken"},
            {"Key": "kilt-ignore-containers", "Value": "expelliarmus"},
            {"Key": "kilt-include-containers", "Value": "accioContainer"},
        ]}});
        let tags = OptTags::from_resource(&resource);
        assert_eq!(tags.len(), 4);
        assert_eq!(tags.get(IGNORE_TAG), Some("nanananananaBatman"));
        assert_eq!(tags.get(INCLUDE_TAG), Some("gimmeGimmeGimmeFriedChicken"));
        assert_eq!(tags.get(IGNORE_CONTAINERS_TAG), Some("expelliarmus"));
        assert_eq!(tags.get(INCLUDE_CONTAINERS_TAG), Some("accioContainer"));
        assert!(tags.skips_resource());
        assert!(tags.has_global_include());
    }

    #[test]
    fn opt_in_requires_inclusion() {
        let tags = OptTags::from_pairs([(INCLUDE_CONTAINERS_TAG, "app:worker")]);
        assert!(should_patch("app", &tags, true));
        assert!(should_patch("worker", &tags, true));
        assert!(!should_patch("proxy", &tags, true));
        assert!(!should_patch("app", &OptTags::new(), true));

        let global = OptTags::from_pairs([(INCLUDE_TAG, "")]);
        assert!(should_patch("proxy", &global, true));
    }

    #[test]
    fn opt_out_respects_ignores() {
        let tags = OptTags::from_pairs([(IGNORE_CONTAINERS_TAG, "proxy : sidecar")]);
        assert!(should_patch("app", &tags, false));
        assert!(!should_patch("proxy", &tags, false));
        assert!(!should_patch("sidecar", &tags, false));
        assert!(should_patch("anything", &OptTags::new(), false));
    }

    #[test]
    fn include_tags_do_not_matter_in_opt_out() {
        let tags = OptTags::from_pairs([(INCLUDE_CONTAINERS_TAG, "other")]);
        assert!(should_patch("app", &tags, false));
    }
}

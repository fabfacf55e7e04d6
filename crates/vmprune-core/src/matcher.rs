use crate::errors::Result;
use crate::models::{InventoryObject, ManagedImage};
use regex::Regex;

/// Matches inventory names against an image family pattern
#[derive(Debug, Clone)]
pub struct ImageMatcher {
    pattern: String,
    regex: Regex,
}

impl ImageMatcher {
    /// Compile the pattern once for the whole run.
    ///
    /// The pattern is compiled as given. Whole-name matching is checked on
    /// the leftmost match in `match_name`, not by anchoring, so lazy
    /// quantifiers and alternations cannot reach a different full-length
    /// match than a plain search would.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the version extracted from `name`, or `None` if it is not a
    /// family member.
    ///
    /// The version comes from the last capture group; a pattern without
    /// groups, a group that did not participate, or a non-numeric capture
    /// all yield version 0.
    pub fn match_name(&self, name: &str) -> Option<u64> {
        let captures = self.regex.captures(name)?;
        let whole = captures.get(0)?;
        if whole.start() != 0 || whole.end() != name.len() {
            return None;
        }

        let version = if captures.len() > 1 {
            captures
                .get(captures.len() - 1)
                .and_then(|m| m.as_str().parse::<u64>().ok())
                .unwrap_or(0)
        } else {
            0
        };

        Some(version)
    }

    /// Build the image set from an inventory snapshot, in scan order
    pub fn collect(&self, objects: &[InventoryObject]) -> Vec<ManagedImage> {
        objects
            .iter()
            .filter_map(|object| {
                self.match_name(&object.name).map(|version| ManagedImage {
                    name: object.name.clone(),
                    version,
                    source_ref: object.reference.clone(),
                })
            })
            .collect()
    }
}

pub fn match_name(pattern: &str, name: &str) -> Result<Option<u64>> {
    Ok(ImageMatcher::new(pattern)?.match_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ObjectRef;

    #[test]
    fn test_full_match_required() {
        let matcher = ImageMatcher::new(r"img-(\d+)").unwrap();

        assert_eq!(matcher.match_name("img-12"), Some(12));
        assert_eq!(matcher.match_name("img-12-extra"), None);
        assert_eq!(matcher.match_name("old-img-12"), None);
        assert_eq!(matcher.match_name("unrelated"), None);
    }

    #[test]
    fn test_leftmost_match_must_span_the_name() {
        // The first alternative wins the search and covers only "img-12"
        let alternation = ImageMatcher::new(r"img-(\d+)|img-(\d+)-extra").unwrap();
        assert_eq!(alternation.match_name("img-12-extra"), None);
        assert_eq!(alternation.match_name("img-12"), Some(12));

        // A lazy group stops after one digit
        let lazy = ImageMatcher::new(r"img-(\d+?)").unwrap();
        assert_eq!(lazy.match_name("img-12"), None);
        assert_eq!(lazy.match_name("img-7"), Some(7));

        let short_first = ImageMatcher::new("a|ab").unwrap();
        assert_eq!(short_first.match_name("ab"), None);
        assert_eq!(short_first.match_name("a"), Some(0));
    }

    #[test]
    fn test_version_from_last_group() {
        let matcher = ImageMatcher::new(r"(ubuntu|debian)-(\d+)\.(\d+)").unwrap();

        assert_eq!(matcher.match_name("ubuntu-22.7"), Some(7));
        assert_eq!(matcher.match_name("debian-12.104"), Some(104));
    }

    #[test]
    fn test_version_defaults_to_zero() {
        let no_group = ImageMatcher::new(r"golden-image").unwrap();
        assert_eq!(no_group.match_name("golden-image"), Some(0));

        let non_numeric = ImageMatcher::new(r"img-(\w+)").unwrap();
        assert_eq!(non_numeric.match_name("img-latest"), Some(0));

        let optional = ImageMatcher::new(r"img(-\d+)?-(\d+)?").unwrap();
        assert_eq!(optional.match_name("img-"), Some(0));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(ImageMatcher::new(r"img-(\d+").is_err());
        assert!(match_name(r"img-(\d+", "img-1").is_err());
    }

    #[test]
    fn test_collect_keeps_scan_order_and_drops_others() {
        let matcher = ImageMatcher::new(r"img-(\d+)").unwrap();
        let objects = vec![
            InventoryObject::new("img-3", ObjectRef::new("vm-3")),
            InventoryObject::new("db-server", ObjectRef::new("vm-9")),
            InventoryObject::new("img-1", ObjectRef::new("vm-1")),
            InventoryObject::new("img-1-copy", ObjectRef::new("vm-8")),
        ];

        let images = matcher.collect(&objects);

        assert_eq!(images.len(), 2);
        assert_eq!(images[0].name, "img-3");
        assert_eq!(images[0].version, 3);
        assert_eq!(images[0].source_ref, ObjectRef::new("vm-3"));
        assert_eq!(images[1].name, "img-1");
    }
}

use crate::models::ManagedImage;

/// Orders image sets for retention
pub trait Ranker {
    fn rank(&self, images: Vec<ManagedImage>) -> Vec<ManagedImage>;
}

/// Ascending by version. Equal versions keep their scan order.
pub struct VersionRanker;

impl Ranker for VersionRanker {
    fn rank(&self, mut images: Vec<ManagedImage>) -> Vec<ManagedImage> {
        // `sort_by_key` is stable; ties are a naming problem, not ours to break
        images.sort_by_key(|image| image.version);
        images
    }
}

pub fn rank(images: Vec<ManagedImage>) -> Vec<ManagedImage> {
    VersionRanker.rank(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ObjectRef;

    fn image(name: &str, version: u64) -> ManagedImage {
        ManagedImage {
            name: name.to_string(),
            version,
            source_ref: ObjectRef::new(format!("vm-{}", name)),
        }
    }

    #[test]
    fn test_sorted_ascending() {
        let ranked = rank(vec![image("c", 5), image("a", 1), image("b", 3), image("z", 0)]);
        let versions: Vec<u64> = ranked.iter().map(|i| i.version).collect();
        assert_eq!(versions, vec![0, 1, 3, 5]);
    }

    #[test]
    fn test_equal_versions_keep_input_order() {
        let ranked = rank(vec![
            image("second", 2),
            image("tie-first", 1),
            image("first", 0),
            image("tie-second", 1),
        ]);
        let names: Vec<&str> = ranked.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["first", "tie-first", "tie-second", "second"]);
    }

    #[test]
    fn test_empty() {
        assert!(rank(Vec::new()).is_empty());
    }
}

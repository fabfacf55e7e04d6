use crate::errors::{ParseError, Result, UtilsError};
use vmprune_core::escape_inventory_name;

/// Trait for parsing different types of inputs
pub trait Parser<T> {
    type Output;

    fn parse(&self, input: &str) -> Result<Self::Output>;
}

/// Boolean flag parser used for environment overrides
pub struct BoolFlagParser;

impl Parser<bool> for BoolFlagParser {
    type Output = bool;

    /// Accepts `t`, `y`, `1`, `true`, `yes` and `f`, `n`, `0`, `false`, `no`
    /// in any case
    fn parse(&self, input: &str) -> Result<Self::Output> {
        match input.trim().to_lowercase().as_str() {
            "t" | "y" | "1" | "true" | "yes" => Ok(true),
            "f" | "n" | "0" | "false" | "no" => Ok(false),
            other => Err(UtilsError::Parse(ParseError::InvalidValue(format!(
                "'{}' is not a boolean",
                other
            )))),
        }
    }
}

/// vCenter inventory path, e.g. `/DC/host/esx01/Resources`.
///
/// Object names may contain `/`, which inventory paths escape as `%2f`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryPath {
    segments: Vec<String>,
}

impl InventoryPath {
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Self { segments }
    }
}

impl std::fmt::Display for InventoryPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", escape_inventory_name(segment))?;
        }
        Ok(())
    }
}

/// Parse a boolean flag, falling back to `default` when empty
pub fn parse_bool(input: &str, default: bool) -> Result<bool> {
    if input.trim().is_empty() {
        return Ok(default);
    }
    BoolFlagParser.parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_flag_parsing() {
        assert!(parse_bool("T", false).unwrap());
        assert!(parse_bool("yes", false).unwrap());
        assert!(parse_bool("1", false).unwrap());
        assert!(!parse_bool("False", true).unwrap());
        assert!(!parse_bool("0", true).unwrap());

        // Empty falls back to the default
        assert!(parse_bool("", true).unwrap());
        assert!(!parse_bool("  ", false).unwrap());

        assert!(parse_bool("maybe", true).is_err());
    }

    #[test]
    fn test_inventory_path_escapes_segments() {
        let path = InventoryPath::from_segments(["DC", "host", "esx/01", "50%", "Resources"]);
        assert_eq!(path.to_string(), "/DC/host/esx%2f01/50%25/Resources");
    }

    #[test]
    fn test_inventory_path_child() {
        let root = InventoryPath::from_segments(["DC", "host", "esx01", "Resources"]);
        assert_eq!(root.child("builds").to_string(), "/DC/host/esx01/Resources/builds");
    }
}

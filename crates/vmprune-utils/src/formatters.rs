use chrono::{DateTime, Utc};
use vmprune_core::ImageOutcome;

/// Trait for formatting different types of data
pub trait Formatter<T> {
    fn format(&self, input: T) -> String;
}

/// Bracketed, comma separated list of names: `[img-1, img-2]`
pub struct NameListFormatter;

impl<S: AsRef<str>> Formatter<&[S]> for NameListFormatter {
    fn format(&self, names: &[S]) -> String {
        let joined: Vec<&str> = names.iter().map(|n| n.as_ref()).collect();
        format!("[{}]", joined.join(", "))
    }
}

/// Short label for a per-image outcome, without the reason
pub struct OutcomeFormatter;

impl Formatter<&ImageOutcome> for OutcomeFormatter {
    fn format(&self, outcome: &ImageOutcome) -> String {
        match outcome {
            ImageOutcome::Deleted => "deleted",
            ImageOutcome::ConversionFailed { .. } => "conversion failed",
            ImageOutcome::DeletionFailed { .. } => "deletion failed",
            ImageOutcome::InfoRetrievalFailed { .. } => "info retrieval failed",
            ImageOutcome::SkippedNoPool { .. } => "skipped (no pool)",
        }
        .to_string()
    }
}

/// Elapsed time between two instants
pub struct ElapsedFormatter;

impl Formatter<(DateTime<Utc>, DateTime<Utc>)> for ElapsedFormatter {
    fn format(&self, input: (DateTime<Utc>, DateTime<Utc>)) -> String {
        let (start, end) = input;
        let millis = (end - start).num_milliseconds().max(0);
        let seconds = millis / 1000;

        if seconds >= 3600 {
            format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
        } else if seconds >= 60 {
            format!("{}m {}s", seconds / 60, seconds % 60)
        } else {
            format!("{}.{}s", seconds, (millis % 1000) / 100)
        }
    }
}

pub fn format_name_list<S: AsRef<str>>(names: &[S]) -> String {
    NameListFormatter.format(names)
}

pub fn format_outcome(outcome: &ImageOutcome) -> String {
    OutcomeFormatter.format(outcome)
}

pub fn format_elapsed(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    ElapsedFormatter.format((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_name_list_formatting() {
        let names = vec!["img-1".to_string(), "img-2".to_string()];
        assert_eq!(format_name_list(&names), "[img-1, img-2]");

        let empty: Vec<String> = Vec::new();
        assert_eq!(format_name_list(&empty), "[]");

        assert_eq!(format_name_list(&["only"]), "[only]");
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(format_outcome(&ImageOutcome::Deleted), "deleted");
        assert_eq!(
            format_outcome(&ImageOutcome::SkippedNoPool {
                reason: "no pool".to_string()
            }),
            "skipped (no pool)"
        );
    }

    #[test]
    fn test_elapsed_formatting() {
        let start = Utc::now();

        assert_eq!(format_elapsed(start, start + Duration::milliseconds(2500)), "2.5s");
        assert_eq!(format_elapsed(start, start + Duration::seconds(61)), "1m 1s");
        assert_eq!(format_elapsed(start, start + Duration::seconds(3720)), "1h 2m");
        assert_eq!(format_elapsed(start, start - Duration::seconds(5)), "0.0s");
    }
}

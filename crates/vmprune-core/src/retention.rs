use crate::errors::{CleanupError, Result};
use crate::models::{ManagedImage, RetentionDecision};

/// Keep-count retention with an exemption for the image just built.
#[derive(Debug, Clone, Copy)]
pub struct RetentionSelector {
    keep_count: usize,
}

impl RetentionSelector {
    /// Fails with `InvalidPolicy` for a keep count of zero. Defaulting is the
    /// caller's job.
    pub fn new(keep_count: usize) -> Result<Self> {
        if keep_count == 0 {
            return Err(CleanupError::InvalidPolicy(
                "keep count must be a positive integer".to_string(),
            ));
        }
        Ok(Self { keep_count })
    }

    pub fn keep_count(&self) -> usize {
        self.keep_count
    }

    /// Partition an ascending image set.
    ///
    /// The lowest `n - keep_count` versions are deleted. If the current
    /// artifact landed in the delete set it is moved to the end of the keep
    /// set, even if that keeps more than `keep_count` images.
    pub fn select(
        &self,
        ranked: Vec<ManagedImage>,
        current_artifact: Option<&str>,
    ) -> RetentionDecision {
        let extra = ranked.len().saturating_sub(self.keep_count);
        let mut to_delete = ranked;
        let mut to_keep = to_delete.split_off(extra);

        if let Some(current) = current_artifact {
            if let Some(pos) = to_delete.iter().position(|image| image.name == current) {
                let exempt = to_delete.remove(pos);
                log::info!(
                    "'{}' is the current build artifact, keeping it regardless of keep count",
                    exempt.name
                );
                to_keep.push(exempt);
            }
        }

        RetentionDecision { to_delete, to_keep }
    }
}

pub fn select(
    ranked: Vec<ManagedImage>,
    keep_count: usize,
    current_artifact: Option<&str>,
) -> Result<RetentionDecision> {
    Ok(RetentionSelector::new(keep_count)?.select(ranked, current_artifact))
}

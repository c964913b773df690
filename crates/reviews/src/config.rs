//! Review policy switches.

/// What to do when a user reviews a book they have already reviewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateReviewPolicy {
    /// Accept the extra review; it counts toward the average like any other.
    #[default]
    Allow,
    /// Fail with [`ReviewError::DuplicateReview`](crate::ReviewError::DuplicateReview).
    Reject,
}

impl std::str::FromStr for DuplicateReviewPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "allow" => Ok(DuplicateReviewPolicy::Allow),
            "reject" => Ok(DuplicateReviewPolicy::Reject),
            other => Err(format!(
                "unknown duplicate review policy '{other}' (expected 'allow' or 'reject')"
            )),
        }
    }
}

/// Policies applied by the review service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReviewConfig {
    pub duplicate_reviews: DuplicateReviewPolicy,
}

impl ReviewConfig {
    /// Sets the duplicate review policy.
    pub fn with_duplicate_reviews(mut self, policy: DuplicateReviewPolicy) -> Self {
        self.duplicate_reviews = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parsing() {
        assert_eq!("allow".parse::<DuplicateReviewPolicy>(), Ok(DuplicateReviewPolicy::Allow));
        assert_eq!("REJECT".parse::<DuplicateReviewPolicy>(), Ok(DuplicateReviewPolicy::Reject));
        assert!("sometimes".parse::<DuplicateReviewPolicy>().is_err());
    }

    #[test]
    fn defaults_allow_duplicates() {
        assert_eq!(
            ReviewConfig::default().duplicate_reviews,
            DuplicateReviewPolicy::Allow
        );
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionStatus {
    Registered,
    Contributed,
}

impl fmt::Display for ContributionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContributionStatus::Registered => write!(f, "registered"),
            ContributionStatus::Contributed => write!(f, "contributed"),
        }
    }
}

///
/// A participant slot in a ceremony.
///
/// The slot is created on registration and transitions exactly once
/// from `registered` to `contributed` when its parameters are accepted.
///
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    participant_id: String,
    display_name: String,
    public_key: String,
    registration_time: OffsetDateTime,
    contribution_order: u64,
    status: ContributionStatus,
    hash: Option<String>,
    contribution_time: Option<OffsetDateTime>,
    contribution_id: Option<String>,
    validation_id: Option<String>,
    timeout_at: OffsetDateTime,
}

impl Contribution {
    ///
    /// Creates a new registered slot for the given participant.
    ///
    #[inline]
    pub(crate) fn new_registration(
        participant_id: String,
        display_name: String,
        public_key: String,
        contribution_order: u64,
        registration_time: OffsetDateTime,
        timeout_at: OffsetDateTime,
    ) -> Self {
        Self {
            participant_id,
            display_name,
            public_key,
            registration_time,
            contribution_order,
            status: ContributionStatus::Registered,
            hash: None,
            contribution_time: None,
            contribution_id: None,
            validation_id: None,
            timeout_at,
        }
    }

    #[inline]
    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    #[inline]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[inline]
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    #[inline]
    pub fn registration_time(&self) -> OffsetDateTime {
        self.registration_time
    }

    /// Returns the 1-based position of this participant in the ceremony.
    #[inline]
    pub fn contribution_order(&self) -> u64 {
        self.contribution_order
    }

    #[inline]
    pub fn status(&self) -> ContributionStatus {
        self.status
    }

    /// Returns `true` if the parameters of this participant were accepted.
    #[inline]
    pub fn is_contributed(&self) -> bool {
        self.status == ContributionStatus::Contributed
    }

    /// Returns the canonical hash of the accepted parameters, if any.
    #[inline]
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    #[inline]
    pub fn contribution_time(&self) -> Option<OffsetDateTime> {
        self.contribution_time
    }

    #[inline]
    pub fn contribution_id(&self) -> Option<&str> {
        self.contribution_id.as_deref()
    }

    #[inline]
    pub fn validation_id(&self) -> Option<&str> {
        self.validation_id.as_deref()
    }

    #[inline]
    pub fn timeout_at(&self) -> OffsetDateTime {
        self.timeout_at
    }

    /// Returns `true` if the registration is still open and its window has elapsed at `at`.
    #[inline]
    pub fn is_overdue(&self, at: OffsetDateTime) -> bool {
        self.status == ContributionStatus::Registered && self.timeout_at <= at
    }

    ///
    /// Marks the slot as contributed with the given hash.
    ///
    /// Returns `false` if the slot was already contributed,
    /// in which case nothing is modified.
    ///
    #[inline]
    pub(crate) fn mark_contributed(
        &mut self,
        hash: String,
        contribution_id: String,
        validation_id: String,
        contribution_time: OffsetDateTime,
    ) -> bool {
        // Check that the slot has not contributed before.
        if self.status != ContributionStatus::Registered {
            return false;
        }

        self.status = ContributionStatus::Contributed;
        self.hash = Some(hash);
        self.contribution_id = Some(contribution_id);
        self.validation_id = Some(validation_id);
        self.contribution_time = Some(contribution_time);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Contribution {
        let now = OffsetDateTime::now_utc();
        Contribution::new_registration(
            "p1".to_string(),
            "Alice".to_string(),
            "pk1".to_string(),
            1,
            now,
            now + time::Duration::hours(48),
        )
    }

    #[test]
    fn test_mark_contributed_once() {
        let mut contribution = registration();
        assert!(!contribution.is_contributed());

        let now = OffsetDateTime::now_utc();
        assert!(contribution.mark_contributed("aa".into(), "c1".into(), "v1".into(), now));
        assert!(contribution.is_contributed());
        assert_eq!(Some("aa"), contribution.hash());

        // A second transition is refused and leaves the first result in place.
        assert!(!contribution.mark_contributed("bb".into(), "c2".into(), "v2".into(), now));
        assert_eq!(Some("aa"), contribution.hash());
        assert_eq!(Some("c1"), contribution.contribution_id());
    }

    #[test]
    fn test_is_overdue() {
        let mut contribution = registration();
        let later = contribution.timeout_at() + time::Duration::seconds(1);
        assert!(!contribution.is_overdue(contribution.registration_time()));
        assert!(contribution.is_overdue(later));

        contribution.mark_contributed("aa".into(), "c1".into(), "v1".into(), later);
        assert!(!contribution.is_overdue(later));
    }
}

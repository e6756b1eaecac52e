use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ArchiveKey;
use super::error::{Result, StoreError};

/// Lifecycle state of one archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveStatus {
    Valid,
    Invalidated,
    InProgress,
}

impl ArchiveStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ArchiveStatus::Valid => "valid",
            ArchiveStatus::Invalidated => "invalidated",
            ArchiveStatus::InProgress => "in_progress",
        }
    }

    /// Allowed moves, `None` standing for an archive never built.
    ///
    /// ```text
    /// missing ──────────────> Valid | InProgress
    /// any ──────────────────> Invalidated
    /// Invalidated ──────────> InProgress
    /// InProgress ───────────> Valid
    /// ```
    pub fn can_transition(from: Option<ArchiveStatus>, to: ArchiveStatus) -> bool {
        use ArchiveStatus::*;
        matches!(
            (from, to),
            (_, Invalidated)
                | (None, Valid)
                | (None, InProgress)
                | (Some(Invalidated), InProgress)
                | (Some(InProgress), Valid)
        )
    }
}

impl fmt::Display for ArchiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stored state of one archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveMarker {
    pub status: ArchiveStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub invalidated_at: Option<DateTime<Utc>>,
}

impl ArchiveMarker {
    pub fn valid() -> Self {
        Self {
            status: ArchiveStatus::Valid,
            started_at: None,
            invalidated_at: None,
        }
    }

    /// Marker after moving `current` to `to` at `now`
    pub fn transition(
        key: &ArchiveKey,
        current: Option<&ArchiveMarker>,
        to: ArchiveStatus,
        now: DateTime<Utc>,
    ) -> Result<ArchiveMarker> {
        let from = current.map(|m| m.status);
        if !ArchiveStatus::can_transition(from, to) {
            return Err(StoreError::IllegalTransition {
                key: key.to_string(),
                from,
                to,
            });
        }

        let mut next = current.cloned().unwrap_or_else(ArchiveMarker::valid);
        next.status = to;
        match to {
            ArchiveStatus::Invalidated => {
                if from != Some(ArchiveStatus::Invalidated) {
                    next.invalidated_at = Some(now);
                }
                next.started_at = None;
            }
            ArchiveStatus::InProgress => next.started_at = Some(now),
            ArchiveStatus::Valid => {
                next.started_at = None;
                next.invalidated_at = None;
            }
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::PeriodKind;
    use chrono::NaiveDate;

    fn key() -> ArchiveKey {
        ArchiveKey::new(
            1,
            PeriodKind::Day,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            None,
            None,
        )
    }

    #[test]
    fn test_lifecycle() {
        let now = Utc::now();
        let built = ArchiveMarker::transition(&key(), None, ArchiveStatus::Valid, now).unwrap();
        let invalidated =
            ArchiveMarker::transition(&key(), Some(&built), ArchiveStatus::Invalidated, now)
                .unwrap();
        assert_eq!(invalidated.invalidated_at, Some(now));

        let running =
            ArchiveMarker::transition(&key(), Some(&invalidated), ArchiveStatus::InProgress, now)
                .unwrap();
        assert_eq!(running.started_at, Some(now));

        let failed =
            ArchiveMarker::transition(&key(), Some(&running), ArchiveStatus::Invalidated, now)
                .unwrap();
        assert_eq!(failed.started_at, None);

        let rebuilt = ArchiveMarker::transition(
            &key(),
            Some(&running),
            ArchiveStatus::Valid,
            now,
        )
        .unwrap();
        assert_eq!(rebuilt, ArchiveMarker::valid());
    }

    #[test]
    fn test_invalidate_is_idempotent() {
        let first = Utc::now();
        let later = first + chrono::Duration::seconds(30);
        let once =
            ArchiveMarker::transition(&key(), None, ArchiveStatus::Invalidated, first).unwrap();
        let twice =
            ArchiveMarker::transition(&key(), Some(&once), ArchiveStatus::Invalidated, later)
                .unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_illegal_moves() {
        use ArchiveStatus::*;
        assert!(!ArchiveStatus::can_transition(Some(Valid), InProgress));
        assert!(!ArchiveStatus::can_transition(Some(InProgress), InProgress));
        assert!(!ArchiveStatus::can_transition(Some(Invalidated), Valid));
        assert!(!ArchiveStatus::can_transition(Some(Valid), Valid));

        let err = ArchiveMarker::transition(&key(), Some(&ArchiveMarker::valid()), InProgress, Utc::now())
            .unwrap_err();
        assert!(err.to_string().contains("valid -> in_progress"));
    }
}

//! Sponsor report rows and the aggregate metrics derived from them.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// One row of the analysis report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SponsorRecord {
    pub sponsor: String,
    pub duration_seconds: f64,
    pub detections: u64,
    pub first_appearance: f64,
}

impl SponsorRecord {
    fn validate(&self, index: usize) -> Result<(), CoreError> {
        let invalid = |reason: String| CoreError::InvalidRecord { index, reason };

        if self.sponsor.trim().is_empty() {
            return Err(invalid("sponsor name is empty".to_owned()));
        }
        if !self.duration_seconds.is_finite() || self.duration_seconds < 0.0 {
            return Err(invalid(format!(
                "duration_seconds must be a non-negative number, got {}",
                self.duration_seconds
            )));
        }
        if !self.first_appearance.is_finite() || self.first_appearance < 0.0 {
            return Err(invalid(format!(
                "first_appearance must be a non-negative number, got {}",
                self.first_appearance
            )));
        }
        Ok(())
    }

    /// Ranking used for top-sponsor selection: longer on screen wins, then
    /// earlier first appearance.
    fn rank_against(&self, other: &Self) -> Ordering {
        self.duration_seconds
            .total_cmp(&other.duration_seconds)
            .then_with(|| other.first_appearance.total_cmp(&self.first_appearance))
    }
}

/// The ordered sponsor rows returned for a completed job.
///
/// The service promises descending `duration_seconds` with ties broken by
/// ascending `first_appearance`. Rows are kept in the order received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    sponsors: Vec<SponsorRecord>,
}

impl Report {
    /// Builds a report from rows received from the service.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRecord`] for the first row with an empty
    /// sponsor name or a negative/non-finite duration or timestamp.
    pub fn new(sponsors: Vec<SponsorRecord>) -> Result<Self, CoreError> {
        for (index, record) in sponsors.iter().enumerate() {
            record.validate(index)?;
        }
        Ok(Self { sponsors })
    }

    #[must_use]
    pub fn sponsors(&self) -> &[SponsorRecord] {
        &self.sponsors
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sponsors.is_empty()
    }

    /// Returns the leading `limit` rows in report order, as charted on the
    /// dashboard.
    #[must_use]
    pub fn chart_rows(&self, limit: usize) -> &[SponsorRecord] {
        &self.sponsors[..self.sponsors.len().min(limit)]
    }

    /// Whether the rows follow the documented ordering contract.
    #[must_use]
    pub fn follows_ordering_contract(&self) -> bool {
        self.sponsors
            .windows(2)
            .all(|pair| pair[0].rank_against(&pair[1]) != Ordering::Less)
    }
}

/// Display-ready metrics derived from a [`Report`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateView {
    pub top_sponsor: Option<SponsorRecord>,
    pub total_detections: u64,
    pub unique_brand_count: usize,
}

impl AggregateView {
    #[must_use]
    pub fn from_report(report: &Report) -> Self {
        Self::from_records(report.sponsors())
    }

    /// Computes the view from raw rows.
    ///
    /// `top_sponsor` is chosen by maximum `duration_seconds`, ties by minimum
    /// `first_appearance`, then by earliest position. It does not assume the
    /// rows are sorted.
    #[must_use]
    pub fn from_records(records: &[SponsorRecord]) -> Self {
        let top_sponsor = records
            .iter()
            .fold(None::<&SponsorRecord>, |best, candidate| match best {
                Some(best) if candidate.rank_against(best) != Ordering::Greater => Some(best),
                _ => Some(candidate),
            })
            .cloned();

        Self {
            top_sponsor,
            total_detections: records
                .iter()
                .fold(0u64, |acc, r| acc.saturating_add(r.detections)),
            unique_brand_count: records.len(),
        }
    }

    /// The "no data" state: the job completed but nothing was detected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unique_brand_count == 0
    }
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;

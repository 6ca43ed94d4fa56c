//! Preference-driven ranking of scored candidates

use crate::constants::DEFAULT_MAX_RECOMMENDATIONS;
use crate::models::{EmployeeId, Preference};
use crate::scoring::{ScoredCandidate, ScoredSet};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Which end of the distance scale ranks first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DistanceOrder {
    /// Closest candidates first
    #[default]
    Nearest,
    /// Largest distance score first
    Farthest,
}

/// Sorts and truncates candidates according to a preference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingPolicy {
    pub preference: Preference,
    pub distance_order: DistanceOrder,

    /// Maximum recommendations per term
    pub limit: usize,
}

impl RankingPolicy {
    pub fn new(preference: Preference) -> Self {
        Self {
            preference,
            distance_order: DistanceOrder::default(),
            limit: DEFAULT_MAX_RECOMMENDATIONS,
        }
    }

    pub fn with_distance_order(mut self, distance_order: DistanceOrder) -> Self {
        self.distance_order = distance_order;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn by_distance(&self, a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
        match self.distance_order {
            DistanceOrder::Nearest => a.distance_score.total_cmp(&b.distance_score),
            DistanceOrder::Farthest => b.distance_score.total_cmp(&a.distance_score),
        }
    }

    /// `Less` when `a` should be recommended before `b`
    fn compare(&self, a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
        let by_collaboration = || b.collaboration_score.cmp(&a.collaboration_score);
        let by_expertise = || b.expertise_score.total_cmp(&a.expertise_score);

        match self.preference {
            Preference::Location => self.by_distance(a, b),
            Preference::Collaboration => by_collaboration(),
            Preference::Expertise => by_expertise(),
            Preference::Composite => by_expertise()
                .then_with(|| self.by_distance(a, b))
                .then_with(by_collaboration),
        }
    }

    /// Best candidates of one set, at most `limit` of them
    ///
    /// Candidates that compare equal keep their input order.
    pub fn rank(&self, set: &ScoredSet) -> Vec<EmployeeId> {
        let mut ordered: Vec<&ScoredCandidate> = set.candidates.iter().collect();
        ordered.sort_by(|a, b| self.compare(a, b));
        ordered
            .into_iter()
            .take(self.limit)
            .map(|candidate| candidate.employee_id.clone())
            .collect()
    }
}

impl Default for RankingPolicy {
    fn default() -> Self {
        Self::new(Preference::default())
    }
}

//! Per-candidate signals relative to a reference employee

use crate::matrix::{CollaborationMatrix, DistanceMatrix};
use crate::models::EmployeeId;
use crate::resolve::CandidateSet;
use serde::Serialize;

/// The three raw signals for one candidate
///
/// No weighting or normalization happens here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub employee_id: EmployeeId,

    /// Meetings shared with the reference employee
    pub collaboration_score: u32,

    /// Kilometers from the reference employee, sentinel when unknown
    pub distance_score: f64,

    /// Semantic relevance to the term, 0 for exact name matches
    pub expertise_score: f64,
}

/// Scored candidates for one term, in candidate order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredSet {
    pub term: String,
    pub candidates: Vec<ScoredCandidate>,
}

/// Attaches matrix lookups and relevance scores to candidates
pub struct ScoringEngine<'a> {
    distance: &'a DistanceMatrix,
    collaboration: &'a CollaborationMatrix,
}

impl<'a> ScoringEngine<'a> {
    pub fn new(distance: &'a DistanceMatrix, collaboration: &'a CollaborationMatrix) -> Self {
        Self {
            distance,
            collaboration,
        }
    }

    /// Score every candidate of every set against the reference employee
    pub fn score(&self, reference: &EmployeeId, sets: &[CandidateSet]) -> Vec<ScoredSet> {
        sets.iter()
            .map(|set| ScoredSet {
                term: set.term.clone(),
                candidates: set
                    .candidates
                    .iter()
                    .map(|candidate| ScoredCandidate {
                        employee_id: candidate.employee_id.clone(),
                        collaboration_score: self
                            .collaboration
                            .get(reference, &candidate.employee_id),
                        distance_score: self.distance.get(reference, &candidate.employee_id),
                        expertise_score: candidate.relevance().unwrap_or(0.0),
                    })
                    .collect(),
            })
            .collect()
    }
}

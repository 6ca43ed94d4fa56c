//! The runtime recommendation pipeline
//!
//! Resolver, availability filter, scoring and ranking run in sequence for each
//! request over matrices that were built offline and are read-only here.

use crate::availability::AvailabilityFilter;
use crate::constants::{DEFAULT_MAX_RECOMMENDATIONS, DEFAULT_SEMANTIC_K};
use crate::matrix::{CollaborationMatrix, DistanceMatrix};
use crate::models::{
    Employee, EmployeeId, Meeting, Outcome, RecommendationRequest, RecommendationResponse,
    RoleRecommendation, StaffingStorage,
};
use crate::ranking::{DistanceOrder, RankingPolicy};
use crate::resolve::CandidateResolver;
use crate::scoring::ScoringEngine;
use crate::search::SemanticMatcher;
use anyhow::Context;
use chrono::NaiveDateTime;
use std::collections::HashSet;
use thiserror::Error;

/// Request validation errors
#[derive(Error, Debug)]
pub enum RecommendError {
    #[error("Unknown reference employee: {id}")]
    UnknownReference { id: EmployeeId },

    #[error("Time window starts at {start} after it ends at {end}")]
    InvalidWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

/// Tunables for the runtime pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommenderConfig {
    /// Semantic matches requested per free-text term
    pub semantic_k: usize,

    /// Recommendations returned per term
    pub max_recommendations: usize,

    /// Direction distances rank in
    pub distance_order: DistanceOrder,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            semantic_k: DEFAULT_SEMANTIC_K,
            max_recommendations: DEFAULT_MAX_RECOMMENDATIONS,
            distance_order: DistanceOrder::default(),
        }
    }
}

/// Everything needed to answer recommendation requests
pub struct RecommendationEngine {
    employee_ids: HashSet<EmployeeId>,
    resolver: CandidateResolver,
    availability: AvailabilityFilter,
    distance: DistanceMatrix,
    collaboration: CollaborationMatrix,
    config: RecommenderConfig,
}

impl RecommendationEngine {
    pub fn new(
        employees: &[Employee],
        meetings: &[Meeting],
        distance: DistanceMatrix,
        collaboration: CollaborationMatrix,
        matcher: Box<dyn SemanticMatcher>,
        config: RecommenderConfig,
    ) -> Self {
        tracing::info!(
            "Recommendation engine ready: {} employees, {} meetings",
            employees.len(),
            meetings.len()
        );
        Self {
            employee_ids: employees.iter().map(|e| e.id.clone()).collect(),
            resolver: CandidateResolver::new(employees, matcher).with_k(config.semantic_k),
            availability: AvailabilityFilter::new(meetings),
            distance,
            collaboration,
            config,
        }
    }

    /// Load reference data and batch artifacts from storage
    pub async fn load(
        storage: &dyn StaffingStorage,
        matcher: Box<dyn SemanticMatcher>,
        config: RecommenderConfig,
    ) -> crate::Result<Self> {
        let employees = storage.load_employees().await?;
        let meetings = storage.load_meetings().await?;
        let distance = storage
            .load_distance_matrix()
            .await
            .context("Failed to load distance matrix")?;
        let collaboration = storage
            .load_collaboration_matrix()
            .await
            .context("Failed to load collaboration matrix")?;

        Ok(Self::new(
            &employees,
            &meetings,
            distance,
            collaboration,
            matcher,
            config,
        ))
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    /// Recommend employees for every participant term of a request
    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> crate::Result<RecommendationResponse> {
        let reference = &request.reference_employee;
        if !self.employee_ids.contains(reference) {
            return Err(RecommendError::UnknownReference {
                id: reference.clone(),
            }
            .into());
        }

        let window = request.window();
        if let (Some(start), Some(end)) = (window.start, window.end) {
            if start > end {
                return Err(RecommendError::InvalidWindow { start, end }.into());
            }
        }

        tracing::debug!(
            "Recommending for {} terms relative to {} ({:?})",
            request.participants.len(),
            reference,
            request.preference
        );

        let resolved = self.resolver.resolve_all(&request.participants).await?;
        let matched: Vec<bool> = resolved.iter().map(|set| !set.is_empty()).collect();

        let available = self.availability.filter(resolved, &window);
        let scored = ScoringEngine::new(&self.distance, &self.collaboration)
            .score(reference, &available);

        let policy = RankingPolicy::new(request.preference)
            .with_distance_order(self.config.distance_order)
            .with_limit(self.config.max_recommendations);

        let recommendations = scored
            .iter()
            .zip(matched)
            .map(|(set, matched)| {
                let employee_ids = policy.rank(set);
                let outcome = if !matched {
                    Outcome::NoMatch
                } else if employee_ids.is_empty() {
                    Outcome::NoneAvailable
                } else {
                    Outcome::Recommended
                };
                tracing::debug!("Term {:?}: {:?} {:?}", set.term, outcome, employee_ids);
                RoleRecommendation {
                    term: set.term.clone(),
                    employee_ids,
                    outcome,
                }
            })
            .collect();

        Ok(RecommendationResponse { recommendations })
    }
}

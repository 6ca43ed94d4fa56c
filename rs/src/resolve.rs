//! Resolution of participant terms to candidate employees
//!
//! A term naming an employee exactly is taken at its word; anything else is
//! handed to the semantic matcher. Each term keeps its own candidates and
//! relevance scores.

use crate::constants::DEFAULT_SEMANTIC_K;
use crate::models::{Employee, EmployeeId};
use crate::search::SemanticMatcher;
use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};

/// Why an employee is a candidate for a term
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchOrigin {
    /// The term is the employee's full name
    ExactName,
    /// The semantic matcher ranked the employee for the term
    Semantic { relevance: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub employee_id: EmployeeId,
    pub origin: MatchOrigin,
}

impl Candidate {
    /// Relevance to the term; exact name matches carry none
    pub fn relevance(&self) -> Option<f64> {
        match self.origin {
            MatchOrigin::ExactName => None,
            MatchOrigin::Semantic { relevance } => Some(relevance),
        }
    }
}

/// Candidates for one participant term, in resolution order
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSet {
    pub term: String,
    pub candidates: Vec<Candidate>,
}

impl CandidateSet {
    pub fn exact(term: impl Into<String>, employee_id: EmployeeId) -> Self {
        Self {
            term: term.into(),
            candidates: vec![Candidate {
                employee_id,
                origin: MatchOrigin::ExactName,
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn employee_ids(&self) -> impl Iterator<Item = &EmployeeId> {
        self.candidates.iter().map(|candidate| &candidate.employee_id)
    }
}

/// Turns participant terms into candidate sets
pub struct CandidateResolver {
    /// Lowercased full name to employee; first record wins on duplicates
    names: HashMap<String, EmployeeId>,

    matcher: Box<dyn SemanticMatcher>,

    /// Semantic result cap per term
    k: usize,
}

impl CandidateResolver {
    pub fn new(employees: &[Employee], matcher: Box<dyn SemanticMatcher>) -> Self {
        let mut names = HashMap::with_capacity(employees.len());
        for employee in employees {
            let key = normalize_name(&employee.full_name);
            if key.is_empty() {
                continue;
            }
            if let Some(existing) = names.get(&key) {
                tracing::warn!(
                    "Duplicate full name {:?}: {} shadows {}",
                    employee.full_name,
                    existing,
                    employee.id
                );
                continue;
            }
            names.insert(key, employee.id.clone());
        }

        Self {
            names,
            matcher,
            k: DEFAULT_SEMANTIC_K,
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Employee whose full name equals the term, ignoring case
    pub fn exact_match(&self, term: &str) -> Option<&EmployeeId> {
        self.names.get(&normalize_name(term))
    }

    /// Resolve one term to its candidates
    ///
    /// An empty semantic result yields an empty set, not an error.
    pub async fn resolve(&self, term: &str) -> Result<CandidateSet> {
        if let Some(employee_id) = self.exact_match(term) {
            tracing::debug!("Term {:?} matched employee {} by name", term, employee_id);
            return Ok(CandidateSet::exact(term, employee_id.clone()));
        }

        let matches = self
            .matcher
            .search(term, self.k)
            .await
            .with_context(|| format!("Semantic search failed for {term:?}"))?;

        let mut seen = HashSet::new();
        let candidates: Vec<Candidate> = matches
            .into_iter()
            .filter(|found| seen.insert(found.employee_id.clone()))
            .take(self.k)
            .map(|found| Candidate {
                employee_id: found.employee_id,
                origin: MatchOrigin::Semantic {
                    relevance: found.relevance,
                },
            })
            .collect();

        if candidates.is_empty() {
            tracing::info!("No employees matched {:?}", term);
        } else {
            tracing::debug!("Term {:?} matched {} employees semantically", term, candidates.len());
        }

        Ok(CandidateSet {
            term: term.to_string(),
            candidates,
        })
    }

    /// Resolve every term independently, preserving order
    pub async fn resolve_all(&self, terms: &[String]) -> Result<Vec<CandidateSet>> {
        let mut sets = Vec::with_capacity(terms.len());
        for term in terms {
            sets.push(self.resolve(term).await?);
        }
        Ok(sets)
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

//! Calendar availability filtering

use crate::models::{EmployeeId, Meeting, TimeWindow};
use crate::resolve::CandidateSet;
use chrono::NaiveDateTime;
use std::collections::HashMap;

/// Removes candidates who are invited to a meeting overlapping the window
#[derive(Debug, Clone, Default)]
pub struct AvailabilityFilter {
    /// Meeting intervals per invited employee
    busy: HashMap<EmployeeId, Vec<(NaiveDateTime, NaiveDateTime)>>,
}

impl AvailabilityFilter {
    pub fn new(meetings: &[Meeting]) -> Self {
        let mut busy: HashMap<EmployeeId, Vec<_>> = HashMap::new();
        for meeting in meetings {
            for employee_id in &meeting.roster {
                let intervals = busy.entry(employee_id.clone()).or_default();
                // A roster listing someone twice is still one meeting
                if intervals.last() != Some(&(meeting.start, meeting.end)) {
                    intervals.push((meeting.start, meeting.end));
                }
            }
        }
        Self { busy }
    }

    /// Whether the employee has no meeting overlapping the window
    pub fn is_available(&self, employee_id: &EmployeeId, window: &TimeWindow) -> bool {
        if window.is_unbounded() {
            return true;
        }
        let conflicting = self.busy.get(employee_id).is_some_and(|intervals| {
            intervals
                .iter()
                .any(|&(start, end)| window.overlaps(start, end))
        });
        !conflicting
    }

    /// Drop unavailable candidates from every set
    ///
    /// Each set is filtered on its own, so an employee removed under one term
    /// is judged again under any other. Without a window nothing changes.
    pub fn filter(&self, sets: Vec<CandidateSet>, window: &TimeWindow) -> Vec<CandidateSet> {
        if window.is_unbounded() {
            return sets;
        }

        sets.into_iter()
            .map(|mut set| {
                let before = set.len();
                set.candidates
                    .retain(|candidate| self.is_available(&candidate.employee_id, window));
                tracing::debug!(
                    "Availability kept {} of {} candidates for {:?}",
                    set.len(),
                    before,
                    set.term
                );
                set
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{Candidate, MatchOrigin};
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn set(term: &str, ids: &[&str]) -> CandidateSet {
        CandidateSet {
            term: term.to_string(),
            candidates: ids
                .iter()
                .map(|id| Candidate {
                    employee_id: EmployeeId::new(*id),
                    origin: MatchOrigin::Semantic { relevance: 0.5 },
                })
                .collect(),
        }
    }

    fn ids(set: &CandidateSet) -> Vec<&str> {
        set.employee_ids().map(EmployeeId::as_str).collect()
    }

    fn calendar() -> AvailabilityFilter {
        AvailabilityFilter::new(&[
            // Ends exactly when the window opens
            Meeting::new(at(9, 0), at(10, 0), vec!["boundary".into(), "shared".into()]),
            Meeting::new(at(7, 0), at(8, 0), vec!["early".into()]),
            Meeting::new(at(12, 0), at(13, 0), vec!["late".into()]),
        ])
    }

    #[test]
    fn test_no_window_passes_through() {
        let sets = vec![set("a", &["boundary", "early"])];
        let filtered = calendar().filter(sets.clone(), &TimeWindow::default());
        assert_eq!(filtered, sets);
    }

    #[test]
    fn test_boundary_meeting_conflicts() {
        let window = TimeWindow::new(Some(at(10, 0)), Some(at(11, 0)));
        let filtered = calendar().filter(vec![set("a", &["boundary", "early", "free"])], &window);

        assert_eq!(ids(&filtered[0]), vec!["early", "free"]);
    }

    #[test]
    fn test_meeting_before_window_is_kept() {
        let window = TimeWindow::new(Some(at(8, 30)), Some(at(8, 45)));
        let filter = calendar();

        assert!(filter.is_available(&"early".into(), &window));
        assert!(filter.is_available(&"late".into(), &window));
        assert!(filter.is_available(&"nobody-knows".into(), &window));
    }

    #[test]
    fn test_terms_filter_independently() {
        let window = TimeWindow::new(Some(at(9, 30)), Some(at(9, 45)));
        let filtered = calendar().filter(
            vec![set("a", &["shared", "early"]), set("b", &["late", "shared"])],
            &window,
        );

        assert_eq!(ids(&filtered[0]), vec!["early"]);
        assert_eq!(ids(&filtered[1]), vec!["late"]);
    }

    #[test]
    fn test_everyone_busy_leaves_empty_set() {
        let window = TimeWindow::new(Some(at(9, 0)), Some(at(13, 0)));
        let filtered = calendar().filter(vec![set("a", &["boundary", "late"])], &window);

        assert!(filtered[0].is_empty());
    }

    #[test]
    fn test_open_ended_window() {
        let window = TimeWindow::new(None, Some(at(8, 0)));
        let filtered = calendar().filter(vec![set("a", &["early", "late"])], &window);

        assert_eq!(ids(&filtered[0]), vec!["late"]);
    }
}

//! Integration tests for the teammate recommendation pipeline
//!
//! These tests run the full pipeline without model downloads: a keyword
//! matcher stands in for the embedding search. Tests that require the
//! FastEmbed model are marked with #[ignore].

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use teammate::{
    CollaborationMatrix, DistanceMatrix, DistanceOrder, Employee, EmployeeId, FileStorage,
    Meeting, Outcome, Preference, RecommendError, RecommendationEngine, RecommendationRequest,
    RecommenderConfig, SearchEngine, SemanticMatch, SemanticMatcher, StaffingStorage,
};
use tempfile::TempDir;

const WEB_ENGINEER: &str = "Software Engineer with web service experience";

/// Scores profiles by the share of query words they contain
struct KeywordMatcher {
    profiles: Vec<(EmployeeId, HashSet<String>)>,
}

impl KeywordMatcher {
    fn new(employees: &[Employee]) -> Self {
        Self {
            profiles: employees
                .iter()
                .map(|employee| (employee.id.clone(), words(&employee.profile_text())))
                .collect(),
        }
    }
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[async_trait::async_trait]
impl SemanticMatcher for KeywordMatcher {
    async fn search(&self, text: &str, k: usize) -> anyhow::Result<Vec<SemanticMatch>> {
        let query = words(text);
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut matches: Vec<SemanticMatch> = self
            .profiles
            .iter()
            .map(|(id, profile)| {
                let shared = query.intersection(profile).count();
                SemanticMatch::new(id.clone(), shared as f64 / query.len() as f64)
            })
            .filter(|found| found.relevance > 0.0)
            .collect();
        matches.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        matches.truncate(k);
        Ok(matches)
    }
}

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 3)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn staff() -> Vec<Employee> {
    vec![
        Employee::new("1", "Mark")
            .with_campus("HQ")
            .with_location(51.5074, -0.1278),
        Employee::new("2", "Priya Nair")
            .with_campus("HQ")
            .with_location(51.5074, -0.1278)
            .with_description("Software engineer building web services APIs"),
        Employee::new("3", "Tom Berg")
            .with_campus("PAR")
            .with_location(48.8566, 2.3522)
            .with_description("Senior software engineer, web service and cloud"),
        Employee::new("4", "Lena Vos")
            .with_location(0.0, 0.0)
            .with_description("Web designer"),
        Employee::new("5", "Sam Ortiz")
            .with_campus("HQ")
            .with_location(51.5074, -0.1278)
            .with_description("HR business partner"),
        Employee::new("6", "Quinn Hale")
            .with_campus("BER")
            .with_location(52.5200, 13.4050)
            .with_description("Software engineer for embedded firmware"),
        Employee::new("7", "Ravi Shah")
            .with_campus("PAR")
            .with_location(48.8566, 2.3522)
            .with_description("Data engineer for web analytics"),
    ]
}

fn calendar() -> Vec<Meeting> {
    vec![
        Meeting::new(at(8, 0), at(9, 0), vec!["1".into(), "5".into()]),
        Meeting::new(at(10, 0), at(11, 0), vec!["3".into(), "6".into(), "5".into()]),
        Meeting::new(at(14, 0), at(15, 0), vec!["5".into(), "6".into()]),
        Meeting::new(at(16, 0), at(17, 0), vec!["4".into(), "5".into()]),
    ]
}

fn engine_with(meetings: &[Meeting], config: RecommenderConfig) -> RecommendationEngine {
    let employees = staff();
    RecommendationEngine::new(
        &employees,
        meetings,
        DistanceMatrix::build(&employees),
        CollaborationMatrix::build(meetings),
        Box::new(KeywordMatcher::new(&employees)),
        config,
    )
}

fn engine() -> RecommendationEngine {
    engine_with(&calendar(), RecommenderConfig::default())
}

fn request(participants: &[&str]) -> RecommendationRequest {
    RecommendationRequest::new(
        "5",
        participants.iter().map(|term| term.to_string()).collect(),
    )
}

fn ids(list: &[EmployeeId]) -> Vec<&str> {
    list.iter().map(EmployeeId::as_str).collect()
}

/// Name lookup plus semantic search, no window, composite ranking
#[tokio::test]
async fn test_end_to_end_default_ranking() {
    let response = engine()
        .recommend(&request(&["mark", WEB_ENGINEER]))
        .await
        .unwrap();

    assert_eq!(response.recommendations.len(), 2);

    let mark = &response.recommendations[0];
    assert_eq!(mark.term, "mark");
    assert_eq!(ids(&mark.employee_ids), vec!["1"]);
    assert_eq!(mark.outcome, Outcome::Recommended);

    // Tom and Priya lead on expertise; Ravi and Quinn tie and the
    // closer one (Paris vs Berlin) wins
    let engineers = response.get(WEB_ENGINEER).unwrap();
    assert_eq!(ids(engineers), vec!["3", "2", "7"]);
}

#[tokio::test]
async fn test_window_removes_busy_candidates() {
    let mut req = request(&["mark", WEB_ENGINEER]);
    req.start_time = Some(at(11, 0));
    req.end_time = Some(at(12, 0));

    let response = engine().recommend(&req).await.unwrap();

    // Mark's 08:00 meeting ended before the window
    assert_eq!(ids(response.get("mark").unwrap()), vec!["1"]);

    // Tom and Quinn have a meeting ending exactly when the window opens
    assert_eq!(ids(response.get(WEB_ENGINEER).unwrap()), vec!["2", "7", "4"]);
}

#[tokio::test]
async fn test_collaboration_preference() {
    let mut req = request(&[WEB_ENGINEER]);
    req.preference = Preference::Collaboration;

    let response = engine().recommend(&req).await.unwrap();

    // Quinn shares two meetings with Sam, Tom and Lena one each
    assert_eq!(ids(response.get(WEB_ENGINEER).unwrap()), vec!["6", "3", "4"]);
}

#[tokio::test]
async fn test_location_preference_directions() {
    let mut req = request(&[WEB_ENGINEER]);
    req.preference = Preference::Location;

    let nearest = engine().recommend(&req).await.unwrap();
    // Priya shares Sam's campus; Tom and Ravi are equally far and keep match order
    assert_eq!(ids(nearest.get(WEB_ENGINEER).unwrap()), vec!["2", "3", "7"]);

    let legacy = engine_with(
        &calendar(),
        RecommenderConfig {
            distance_order: DistanceOrder::Farthest,
            ..RecommenderConfig::default()
        },
    );
    let farthest = legacy.recommend(&req).await.unwrap();
    // Lena's unknown location reads as the sentinel distance
    assert_eq!(ids(farthest.get(WEB_ENGINEER).unwrap()), vec!["4", "6", "3"]);
}

#[tokio::test]
async fn test_unknown_preference_falls_back_to_composite() {
    let json = format!(
        r#"{{"participants": ["{WEB_ENGINEER}"], "preference": "Seniority", "reference_employee": 5}}"#
    );
    let req: RecommendationRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(req.preference, Preference::Composite);

    let response = engine().recommend(&req).await.unwrap();
    assert_eq!(ids(response.get(WEB_ENGINEER).unwrap()), vec!["3", "2", "7"]);
}

#[tokio::test]
async fn test_no_match_and_none_available_are_not_errors() {
    let mut req = request(&["astronaut", "Mark", WEB_ENGINEER]);
    req.start_time = Some(at(8, 30));
    req.end_time = Some(at(8, 45));

    let response = engine().recommend(&req).await.unwrap();

    let outcomes: Vec<Outcome> = response.recommendations.iter().map(|r| r.outcome).collect();
    assert_eq!(
        outcomes,
        vec![Outcome::NoMatch, Outcome::NoneAvailable, Outcome::Recommended]
    );
    assert!(response.get("astronaut").unwrap().is_empty());
    assert!(response.get("Mark").unwrap().is_empty());
}

#[tokio::test]
async fn test_recommendation_limit() {
    let config = RecommenderConfig {
        max_recommendations: 5,
        ..RecommenderConfig::default()
    };
    let response = engine_with(&calendar(), config)
        .recommend(&request(&[WEB_ENGINEER]))
        .await
        .unwrap();
    assert_eq!(response.get(WEB_ENGINEER).unwrap().len(), 5);

    let narrow = RecommenderConfig {
        semantic_k: 2,
        ..RecommenderConfig::default()
    };
    let response = engine_with(&calendar(), narrow)
        .recommend(&request(&[WEB_ENGINEER]))
        .await
        .unwrap();
    assert_eq!(ids(response.get(WEB_ENGINEER).unwrap()), vec!["3", "2"]);
}

#[tokio::test]
async fn test_request_validation() {
    let engine = engine();

    let mut stranger = request(&["Mark"]);
    stranger.reference_employee = EmployeeId::new("999");
    let err = engine.recommend(&stranger).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RecommendError>(),
        Some(RecommendError::UnknownReference { .. })
    ));

    let mut inverted = request(&["Mark"]);
    inverted.start_time = Some(at(12, 0));
    inverted.end_time = Some(at(11, 0));
    let err = engine.recommend(&inverted).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RecommendError>(),
        Some(RecommendError::InvalidWindow { .. })
    ));
}

/// Batch build into a data directory, then serve from the persisted files
#[tokio::test]
async fn test_file_backed_pipeline() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileStorage::new(temp_dir.path()).await.unwrap();

    let employees_json = serde_json::to_string(&staff()).unwrap();
    tokio::fs::write(temp_dir.path().join("employees.json"), employees_json)
        .await
        .unwrap();
    tokio::fs::write(
        temp_dir.path().join("meetings.json"),
        r#"[
            {"meeting_start_time": "2024-06-03 10:00:00", "meeting_end_time": "2024-06-03 11:00:00", "invited_members": "[3, 6, 5]"},
            {"meeting_start_time": "2024-06-03 14:00:00", "meeting_end_time": "2024-06-03 15:00:00", "invited_members": "[5, 6]"},
            {"meeting_start_time": "garbled", "meeting_end_time": "2024-06-03 15:00:00", "invited_members": "[5, 2]"}
        ]"#,
    )
    .await
    .unwrap();

    let employees = storage.load_employees().await.unwrap();
    let meetings = storage.load_meetings().await.unwrap();
    assert_eq!(employees.len(), 7);
    assert_eq!(meetings.len(), 2);

    storage
        .save_distance_matrix(&DistanceMatrix::build(&employees))
        .await
        .unwrap();
    storage
        .save_collaboration_matrix(&CollaborationMatrix::build(&meetings))
        .await
        .unwrap();

    let distance = storage.load_distance_matrix().await.unwrap();
    let collaboration = storage.load_collaboration_matrix().await.unwrap();
    for a in &employees {
        for b in &employees {
            assert_eq!(distance.get(&a.id, &b.id), distance.get(&b.id, &a.id));
            assert_eq!(collaboration.get(&a.id, &b.id), collaboration.get(&b.id, &a.id));
        }
    }
    assert_eq!(collaboration.get(&"5".into(), &"6".into()), 2);
    assert_eq!(collaboration.get(&"5".into(), &"2".into()), 0);

    let engine = RecommendationEngine::load(
        &storage,
        Box::new(KeywordMatcher::new(&employees)),
        RecommenderConfig::default(),
    )
    .await
    .unwrap();

    let mut req = request(&[WEB_ENGINEER]);
    req.preference = Preference::Collaboration;
    let response = engine.recommend(&req).await.unwrap();
    assert_eq!(ids(response.get(WEB_ENGINEER).unwrap()), vec!["6", "3", "2"]);
}

#[tokio::test]
async fn test_engine_load_requires_artifacts() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileStorage::new(temp_dir.path()).await.unwrap();
    tokio::fs::write(temp_dir.path().join("employees.json"), "[]")
        .await
        .unwrap();
    tokio::fs::write(temp_dir.path().join("meetings.json"), "[]")
        .await
        .unwrap();

    let result = RecommendationEngine::load(
        &storage,
        Box::new(KeywordMatcher::new(&[])),
        RecommenderConfig::default(),
    )
    .await;
    let err = result.err().unwrap();
    assert!(format!("{err:#}").contains("build-matrices"));
}

// Tests that require model download - run manually with: cargo test -- --ignored
#[tokio::test]
#[ignore]
async fn test_embedding_pipeline() {
    let employees = staff();
    let index = SearchEngine::new(Default::default())
        .build_index(&employees)
        .await
        .unwrap();
    assert_eq!(index.len(), employees.len());

    let engine = RecommendationEngine::new(
        &employees,
        &calendar(),
        DistanceMatrix::build(&employees),
        CollaborationMatrix::build(&calendar()),
        Box::new(SearchEngine::new(index)),
        RecommenderConfig::default(),
    );

    let mut req = request(&["mark", WEB_ENGINEER, "HR"]);
    req.preference = Preference::Expertise;
    let response = engine.recommend(&req).await.unwrap();

    assert_eq!(ids(response.get("mark").unwrap()), vec!["1"]);
    let engineers = response.get(WEB_ENGINEER).unwrap();
    assert_eq!(engineers.len(), 3);
    assert!(ids(engineers).contains(&"3"));
}

//! Constants for the teammate recommendation pipeline

// Distance matrix

/// Distance in kilometers used for pairs whose distance is unknown or unusable.
pub const SENTINEL_DISTANCE_KM: f64 = 9999.0;

/// Mean radius of the earth used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

// Candidate resolution and ranking

/// Number of semantic matches requested per free-text participant term.
pub const DEFAULT_SEMANTIC_K: usize = 5;

/// Maximum number of employees recommended per participant term.
pub const DEFAULT_MAX_RECOMMENDATIONS: usize = 3;

// Semantic index

/// Embedding model used to index employee profiles and queries.
pub const EMBEDDING_MODEL_NAME: &str = "all-MiniLM-L6-v2";

// Data directory layout

/// Employee reference records.
pub const EMPLOYEES_FILE: &str = "employees.json";

/// Historical meeting records.
pub const MEETINGS_FILE: &str = "meetings.json";

/// Persisted employee-to-employee distance table.
pub const DISTANCE_MATRIX_FILE: &str = "distance_matrix.json";

/// Persisted employee-to-employee co-meeting counts.
pub const COLLABORATION_MATRIX_FILE: &str = "collaboration_matrix.json";

/// Persisted semantic index over employee profiles.
pub const EMPLOYEE_INDEX_FILE: &str = "employee_index.json";

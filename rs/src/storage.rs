//! File-based storage implementation
//!
//! A data directory holds the employee and meeting exports alongside the
//! artifacts the batch commands produce, all as JSON files.

use crate::constants::{
    COLLABORATION_MATRIX_FILE, DISTANCE_MATRIX_FILE, EMPLOYEES_FILE, EMPLOYEE_INDEX_FILE,
    MEETINGS_FILE,
};
use crate::matrix::{CollaborationMatrix, DistanceMatrix};
use crate::models::{Employee, Meeting, StaffingStorage};
use crate::search::EmployeeIndex;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Storage-specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("{file} not found in {dir}; run `teammate {command}` first")]
    MissingArtifact {
        file: &'static str,
        dir: PathBuf,
        command: &'static str,
    },

    #[error("{file} must contain a JSON array of records")]
    NotAnArray { file: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage directory error: {message}")]
    Directory { message: String },
}

/// File-based storage implementation
///
/// Reference records are read on every load; nothing is cached between calls.
pub struct FileStorage {
    /// Base directory for storage
    data_dir: PathBuf,
}

impl FileStorage {
    /// Create a new file storage instance
    ///
    /// The data directory will be created if it doesn't exist.
    pub async fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self, StorageError> {
        let data_dir = data_dir.as_ref().to_path_buf();

        // Create data directory if it doesn't exist
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).await?;
        }

        // Verify it's a directory
        let metadata = fs::metadata(&data_dir).await?;
        if !metadata.is_dir() {
            return Err(StorageError::Directory {
                message: format!("{} is not a directory", data_dir.display()),
            });
        }

        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    /// Load a JSON array of records, skipping rows that fail to parse
    async fn load_records<T: DeserializeOwned>(
        &self,
        file: &'static str,
    ) -> Result<Vec<T>, StorageError> {
        let path = self.path(file);
        tracing::info!("Loading records from {}", path.display());
        let start = std::time::Instant::now();

        let content = fs::read_to_string(&path).await?;
        let rows = match serde_json::from_str::<serde_json::Value>(&content)? {
            serde_json::Value::Array(rows) => rows,
            _ => return Err(StorageError::NotAnArray { file }),
        };

        let total = rows.len();
        let mut records = Vec::with_capacity(total);
        for (row_number, row) in rows.into_iter().enumerate() {
            match serde_json::from_value(row) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping row {} of {}: {}", row_number, file, e);
                }
            }
        }

        tracing::info!(
            "Loaded {} of {} rows from {} in {:?}",
            records.len(),
            total,
            file,
            start.elapsed()
        );
        Ok(records)
    }

    /// Load a batch artifact, pointing at the command that produces it when absent
    async fn load_artifact<T: DeserializeOwned>(
        &self,
        file: &'static str,
        command: &'static str,
    ) -> Result<T, StorageError> {
        let path = self.path(file);
        if !path.exists() {
            return Err(StorageError::MissingArtifact {
                file,
                dir: self.data_dir.clone(),
                command,
            });
        }
        let content = fs::read_to_string(&path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn save_artifact<T: Serialize>(
        &self,
        file: &'static str,
        artifact: &T,
    ) -> Result<(), StorageError> {
        let path = self.path(file);
        let content = serde_json::to_string_pretty(artifact)?;
        fs::write(&path, content).await?;
        tracing::info!("Wrote {}", path.display());
        Ok(())
    }
}

#[async_trait::async_trait]
impl StaffingStorage for FileStorage {
    async fn load_employees(&self) -> crate::Result<Vec<Employee>> {
        self.load_records(EMPLOYEES_FILE)
            .await
            .context("Failed to load employee records")
    }

    async fn load_meetings(&self) -> crate::Result<Vec<Meeting>> {
        self.load_records(MEETINGS_FILE)
            .await
            .context("Failed to load meeting records")
    }

    async fn load_distance_matrix(&self) -> crate::Result<DistanceMatrix> {
        Ok(self
            .load_artifact(DISTANCE_MATRIX_FILE, "build-matrices")
            .await?)
    }

    async fn save_distance_matrix(&self, matrix: &DistanceMatrix) -> crate::Result<()> {
        self.save_artifact(DISTANCE_MATRIX_FILE, matrix)
            .await
            .context("Failed to save distance matrix")
    }

    async fn load_collaboration_matrix(&self) -> crate::Result<CollaborationMatrix> {
        Ok(self
            .load_artifact(COLLABORATION_MATRIX_FILE, "build-matrices")
            .await?)
    }

    async fn save_collaboration_matrix(&self, matrix: &CollaborationMatrix) -> crate::Result<()> {
        self.save_artifact(COLLABORATION_MATRIX_FILE, matrix)
            .await
            .context("Failed to save collaboration matrix")
    }

    async fn load_employee_index(&self) -> crate::Result<EmployeeIndex> {
        Ok(self
            .load_artifact(EMPLOYEE_INDEX_FILE, "build-index")
            .await?)
    }

    async fn save_employee_index(&self, index: &EmployeeIndex) -> crate::Result<()> {
        self.save_artifact(EMPLOYEE_INDEX_FILE, index)
            .await
            .context("Failed to save employee index")
    }
}

//! Pipeline input, per-file outcome, batch result and progress events.

use std::path::Path;

use serde::Serialize;

use crate::models::BookRecord;

/// One uploaded photo.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Reference to the stored original, attached to every book it yields.
    pub image_ref: Option<String>,
}

impl UploadedImage {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            image_ref: None,
        }
    }

    pub fn with_image_ref(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }

    /// Declared extension, from the file name.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
    }
}

/// Per-file state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStage {
    Pending,
    Normalizing,
    Extracting,
    Parsing,
    Enriching,
    Classifying,
    Done,
    Failed,
}

impl FileStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStage::Pending => "pending",
            FileStage::Normalizing => "normalizing",
            FileStage::Extracting => "extracting",
            FileStage::Parsing => "parsing",
            FileStage::Enriching => "enriching",
            FileStage::Classifying => "classifying",
            FileStage::Done => "done",
            FileStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FileStage::Done | FileStage::Failed)
    }
}

impl std::fmt::Display for FileStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What happened to one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub file_name: String,
    pub added: Vec<BookRecord>,
    /// Candidates skipped because the owner already had them.
    pub duplicates: usize,
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            added: Vec::new(),
            duplicates: 0,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn stage(&self) -> FileStage {
        if self.is_success() {
            FileStage::Done
        } else {
            FileStage::Failed
        }
    }
}

/// A failed file in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFileError {
    pub file_name: String,
    pub error: String,
}

/// Summary of a whole batch, outcomes in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub processed_files: usize,
    pub total_added: usize,
    pub outcomes: Vec<FileOutcome>,
    pub errors: Vec<BatchFileError>,
}

impl BatchResult {
    pub fn from_outcomes(outcomes: Vec<FileOutcome>) -> Self {
        let total_added = outcomes.iter().map(|o| o.added.len()).sum();
        let errors = outcomes
            .iter()
            .filter_map(|o| {
                o.error.as_ref().map(|error| BatchFileError {
                    file_name: o.file_name.clone(),
                    error: error.clone(),
                })
            })
            .collect();

        Self {
            processed_files: outcomes.len(),
            total_added,
            outcomes,
            errors,
        }
    }

    /// Every record added by the batch, in file order.
    pub fn added_records(&self) -> impl Iterator<Item = &BookRecord> {
        self.outcomes.iter().flat_map(|o| o.added.iter())
    }

    pub fn summary(&self) -> String {
        format!(
            "Processed {} image(s), added {} book(s)",
            self.processed_files, self.total_added
        )
    }
}

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    BatchStarted {
        total_files: usize,
    },
    StageChanged {
        file_name: String,
        stage: FileStage,
    },
    BookAdded {
        file_name: String,
        record: BookRecord,
    },
    DuplicateSkipped {
        file_name: String,
        title: String,
        author: String,
    },
    FileFinished {
        file_name: String,
        added: usize,
        error: Option<String>,
    },
    BatchFinished {
        processed_files: usize,
        total_added: usize,
        failed_files: usize,
    },
}

//! Bulk import of document-store exports.
//!
//! One JSON document per line, as written by `mongoexport`:
//!
//! ```json
//! {"_id": {"$oid": "65f0.."}, "embedding": [[0.1, ..]], "requiresVerification": "False",
//!  "verified_labels": ["20-29", "Female"], "incorrect_labels": ["Male"]}
//! ```
//!
//! `requiresVerification` may be the legacy `"True"`/`"False"` string or a
//! JSON boolean; a document without it is treated as pending. `embedding` may
//! be flat or wrapped in a single-row outer array.

use crate::writer::RecordWriter;
use facelabel_core::VerifiedRecord;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("line {line}: {source}")]
    Store {
        line: usize,
        #[source]
        source: facelabel_core::Error,
    },
}

/// Counts from one import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub verified: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentId {
    Text(String),
    Number(i64),
    Oid {
        #[serde(rename = "$oid")]
        oid: String,
    },
}

impl DocumentId {
    fn into_string(self) -> String {
        match self {
            DocumentId::Text(s) => s,
            DocumentId::Number(n) => n.to_string(),
            DocumentId::Oid { oid } => oid,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EmbeddingField {
    Flat(Vec<f32>),
    Nested(Vec<Vec<f32>>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VerificationFlag {
    Bool(bool),
    Text(String),
}

#[derive(Deserialize)]
struct ExportedDocument {
    #[serde(rename = "_id", default)]
    id: Option<DocumentId>,
    embedding: EmbeddingField,
    #[serde(rename = "requiresVerification", default)]
    requires_verification: Option<VerificationFlag>,
    #[serde(default)]
    verified_labels: Vec<String>,
    #[serde(default)]
    incorrect_labels: Vec<String>,
}

impl ExportedDocument {
    fn into_record(self) -> std::result::Result<VerifiedRecord, String> {
        let embedding = match self.embedding {
            EmbeddingField::Flat(v) => v,
            EmbeddingField::Nested(mut rows) if rows.len() == 1 => rows.remove(0),
            EmbeddingField::Nested(rows) => {
                return Err(format!("expected one embedding row, got {}", rows.len()))
            }
        };

        let requires_verification = match self.requires_verification {
            None => true,
            Some(VerificationFlag::Bool(b)) => b,
            Some(VerificationFlag::Text(s)) => match s.to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => return Err(format!("invalid requiresVerification '{}'", s)),
            },
        };

        let id = self
            .id
            .map(DocumentId::into_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(VerifiedRecord {
            id,
            embedding,
            requires_verification,
            verified_labels: self.verified_labels,
            incorrect_labels: self.incorrect_labels,
        })
    }
}

/// Parse one exported document
pub fn parse_document(line: &str) -> std::result::Result<VerifiedRecord, String> {
    let doc: ExportedDocument = serde_json::from_str(line).map_err(|e| e.to_string())?;
    doc.into_record()
}

/// Import every document from `reader`, stopping at the first bad line
pub fn import_reader<R: BufRead>(
    reader: R,
    writer: &dyn RecordWriter,
) -> Result<ImportSummary, ImportError> {
    let mut summary = ImportSummary::default();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record = parse_document(&line).map_err(|message| ImportError::Parse {
            line: line_no,
            message,
        })?;
        let verified = record.is_verified();
        writer.put(record).map_err(|source| ImportError::Store {
            line: line_no,
            source,
        })?;

        summary.imported += 1;
        if verified {
            summary.verified += 1;
        }
    }

    Ok(summary)
}

/// Import a JSONL export file into `writer`
pub fn import_jsonl<P: AsRef<Path>>(
    path: P,
    writer: &dyn RecordWriter,
) -> Result<ImportSummary, ImportError> {
    let file = File::open(path.as_ref())?;
    let summary = import_reader(BufReader::new(file), writer)?;
    tracing::info!(
        path = %path.as_ref().display(),
        imported = summary.imported,
        verified = summary.verified,
        "Imported records"
    );
    Ok(summary)
}

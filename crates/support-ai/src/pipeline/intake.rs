use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{FieldName, FieldValue, Observation, SourceKind};

/// Applicant-declared data as received from the ingestion layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationForm {
    pub submitted_at: DateTime<Utc>,
    pub fields: BTreeMap<FieldName, FieldValue>,
}

/// One field lifted out of a document by the upstream extraction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub field: FieldName,
    pub value: FieldValue,
    pub confidence: u8,
}

/// Structured extraction payload for a single uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentExtraction {
    pub document_id: String,
    pub source: SourceKind,
    pub extracted_at: DateTime<Utc>,
    pub fields: Vec<ExtractedField>,
}

/// Malformed inbound data is rejected here, never clamped into range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationInputError {
    #[error("confidence {confidence} for {field:?} from {source_kind:?} is outside 0-100")]
    ConfidenceOutOfRange {
        field: FieldName,
        source_kind: SourceKind,
        confidence: u8,
    },
    #[error("empty text value for {field:?} from {source_kind:?}")]
    EmptyValue {
        field: FieldName,
        source_kind: SourceKind,
    },
    #[error("non-finite number for {field:?} from {source_kind:?}")]
    NonFiniteNumber {
        field: FieldName,
        source_kind: SourceKind,
    },
    #[error("document {document_id} declares the application form as its source")]
    FormAsDocumentSource { document_id: String },
}

/// Normalize the self-reported form into observations at the configured
/// baseline confidence.
pub fn observations_from_form(
    form: &ApplicationForm,
    source_confidence: u8,
) -> Result<Vec<Observation>, ValidationInputError> {
    form.fields
        .iter()
        .map(|(&field, value)| {
            check_value(field, SourceKind::ApplicationForm, value)?;
            Ok(Observation {
                field,
                value: value.clone(),
                source: SourceKind::ApplicationForm,
                source_confidence,
                observed_at: form.submitted_at,
            })
        })
        .collect()
}

/// Normalize one document extraction payload into observations tagged with
/// the document's declared source kind.
pub fn observations_from_document(
    document: &DocumentExtraction,
) -> Result<Vec<Observation>, ValidationInputError> {
    if document.source == SourceKind::ApplicationForm {
        return Err(ValidationInputError::FormAsDocumentSource {
            document_id: document.document_id.clone(),
        });
    }

    document
        .fields
        .iter()
        .map(|extracted| {
            if extracted.confidence > 100 {
                return Err(ValidationInputError::ConfidenceOutOfRange {
                    field: extracted.field,
                    source_kind: document.source,
                    confidence: extracted.confidence,
                });
            }
            check_value(extracted.field, document.source, &extracted.value)?;
            Ok(Observation {
                field: extracted.field,
                value: extracted.value.clone(),
                source: document.source,
                source_confidence: extracted.confidence,
                observed_at: document.extracted_at,
            })
        })
        .collect()
}

fn check_value(
    field: FieldName,
    source: SourceKind,
    value: &FieldValue,
) -> Result<(), ValidationInputError> {
    match value {
        FieldValue::Text(raw) if raw.trim().is_empty() => Err(ValidationInputError::EmptyValue {
            field,
            source_kind: source,
        }),
        FieldValue::Number(number) if !number.is_finite() => {
            Err(ValidationInputError::NonFiniteNumber {
                field,
                source_kind: source,
            })
        }
        _ => Ok(()),
    }
}

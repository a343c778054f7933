use crate::report::ReportType;
use std::fmt;
use thiserror::Error;

/// The three conditions a render can be reported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    TemplateNotFound,
    RenderFailure,
}

/// Where in the drawing pipeline a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Load,
    Text,
    Boolean,
    Status,
    FreeText,
    Table,
    Serialize,
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderStage::Load => "load",
            RenderStage::Text => "text",
            RenderStage::Boolean => "boolean",
            RenderStage::Status => "status",
            RenderStage::FreeText => "free-text",
            RenderStage::Table => "table",
            RenderStage::Serialize => "serialize",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ActaError {
    #[error("unknown report type: {0}")]
    UnknownReportType(String),

    #[error("template digest mismatch for {report_type}: expected {expected}, found {actual}")]
    TemplateDigestMismatch {
        report_type: ReportType,
        expected: String,
        actual: String,
    },

    #[error("template not found for {report_type}: {name}")]
    TemplateNotFound {
        report_type: ReportType,
        name: String,
    },

    #[error("render failed during {stage}: {message}")]
    Render { stage: RenderStage, message: String },
}

impl ActaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActaError::UnknownReportType(_) | ActaError::TemplateDigestMismatch { .. } => {
                ErrorKind::Configuration
            }
            ActaError::TemplateNotFound { .. } => ErrorKind::TemplateNotFound,
            ActaError::Render { .. } => ErrorKind::RenderFailure,
        }
    }

    pub(crate) fn render(stage: RenderStage, message: impl Into<String>) -> Self {
        ActaError::Render {
            stage,
            message: message.into(),
        }
    }

    pub fn stage(&self) -> Option<RenderStage> {
        match self {
            ActaError::Render { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// A record value that cannot be drawn as text: a list or an object where a
/// scalar was expected. Carries the field name only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field {field} holds a {shape} where a scalar was expected")]
pub struct ValueShapeError {
    pub field: String,
    pub shape: &'static str,
}

pub(crate) fn lopdf_err(stage: RenderStage, err: lopdf::Error) -> ActaError {
    ActaError::render(stage, format!("pdf error: {err}"))
}

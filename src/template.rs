//! Where template bytes come from, and how they are checked.

use crate::error::ActaError;
use crate::report::ReportType;
use lopdf::Document as LoDocument;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template {name} is not available")]
    NotFound { name: String },

    #[error("failed to read template {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Supplies the raw bytes of the template for a report type.
pub trait TemplateSource: Send + Sync {
    fn load(&self, report_type: ReportType) -> Result<Vec<u8>, TemplateError>;

    /// Expected SHA-256 (lowercase hex) of the template, if pinned.
    fn pinned_digest(&self, _report_type: ReportType) -> Option<&str> {
        None
    }
}

impl<T: TemplateSource + ?Sized> TemplateSource for Box<T> {
    fn load(&self, report_type: ReportType) -> Result<Vec<u8>, TemplateError> {
        (**self).load(report_type)
    }

    fn pinned_digest(&self, report_type: ReportType) -> Option<&str> {
        (**self).pinned_digest(report_type)
    }
}

/// Reads `<root>/<report>.pdf` on every call.
#[derive(Debug, Clone)]
pub struct DirTemplateSource {
    root: PathBuf,
    pins: BTreeMap<ReportType, String>,
}

impl DirTemplateSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pins: BTreeMap::new(),
        }
    }

    /// Pins the template to a digest so that a redesigned template cannot be
    /// served against stale coordinates.
    pub fn with_pin(mut self, report_type: ReportType, sha256_hex: impl Into<String>) -> Self {
        self.pins
            .insert(report_type, sha256_hex.into().trim().to_ascii_lowercase());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, report_type: ReportType) -> PathBuf {
        self.root.join(report_type.template_file_name())
    }
}

impl TemplateSource for DirTemplateSource {
    fn load(&self, report_type: ReportType) -> Result<Vec<u8>, TemplateError> {
        let path = self.path_for(report_type);
        let name = report_type.template_file_name().to_string();
        std::fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                TemplateError::NotFound { name }
            } else {
                TemplateError::Io { name, source }
            }
        })
    }

    fn pinned_digest(&self, report_type: ReportType) -> Option<&str> {
        self.pins.get(&report_type).map(String::as_str)
    }
}

/// Templates held in memory, e.g. compiled into the binary.
#[derive(Debug, Clone, Default)]
pub struct StaticTemplateSource {
    templates: BTreeMap<ReportType, Vec<u8>>,
}

impl StaticTemplateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, report_type: ReportType, bytes: impl Into<Vec<u8>>) -> Self {
        self.templates.insert(report_type, bytes.into());
        self
    }
}

impl TemplateSource for StaticTemplateSource {
    fn load(&self, report_type: ReportType) -> Result<Vec<u8>, TemplateError> {
        self.templates
            .get(&report_type)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound {
                name: report_type.template_file_name().to_string(),
            })
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Loads the template for `report_type` and enforces its pin, if any.
pub(crate) fn fetch(source: &dyn TemplateSource, report_type: ReportType) -> Result<Vec<u8>, ActaError> {
    let bytes = source.load(report_type).map_err(|err| {
        tracing::error!(report = %report_type, error = %err, "template unavailable");
        ActaError::TemplateNotFound {
            report_type,
            name: report_type.template_file_name().to_string(),
        }
    })?;
    if let Some(expected) = source.pinned_digest(report_type) {
        let actual = sha256_hex(&bytes);
        if actual != expected {
            return Err(ActaError::TemplateDigestMismatch {
                report_type,
                expected: expected.to_string(),
                actual,
            });
        }
    }
    Ok(bytes)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateReport {
    pub pdf_version: String,
    pub page_count: usize,
    pub encrypted: bool,
    pub file_size_bytes: usize,
    pub sha256: String,
}

impl TemplateReport {
    /// Reasons the template cannot be overlaid, empty when usable.
    pub fn issues(&self) -> Vec<&'static str> {
        let mut issues = Vec::new();
        if self.encrypted {
            issues.push("template PDF is encrypted");
        }
        if self.page_count == 0 {
            issues.push("template PDF has no pages");
        }
        issues
    }
}

pub fn inspect_template(bytes: &[u8]) -> Result<TemplateReport, lopdf::Error> {
    let pdf = LoDocument::load_mem(bytes)?;
    Ok(TemplateReport {
        pdf_version: pdf.version.clone(),
        page_count: pdf.get_pages().len(),
        encrypted: pdf.is_encrypted(),
        file_size_bytes: bytes.len(),
        sha256: sha256_hex(bytes),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateCheck {
    Ready(TemplateReport),
    Missing,
    Unusable(String),
}

/// Checks every report type's template once; used at startup to surface
/// deployment problems before the first request does.
pub fn check_templates(source: &dyn TemplateSource) -> BTreeMap<ReportType, TemplateCheck> {
    ReportType::ALL
        .into_iter()
        .map(|report_type| {
            let check = match fetch(source, report_type) {
                Err(ActaError::TemplateNotFound { .. }) => TemplateCheck::Missing,
                Err(err) => TemplateCheck::Unusable(err.to_string()),
                Ok(bytes) => match inspect_template(&bytes) {
                    Err(err) => TemplateCheck::Unusable(format!("pdf parse error: {err}")),
                    Ok(report) => match report.issues().first() {
                        Some(issue) => TemplateCheck::Unusable(issue.to_string()),
                        None => TemplateCheck::Ready(report),
                    },
                },
            };
            (report_type, check)
        })
        .collect()
}

use crate::error::ActaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two acts the service knows how to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    #[serde(alias = "recepcion")]
    Reception,
    #[serde(alias = "baja")]
    Decommission,
}

impl ReportType {
    pub const ALL: [ReportType; 2] = [ReportType::Reception, ReportType::Decommission];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportType::Reception => "reception",
            ReportType::Decommission => "decommission",
        }
    }

    pub fn template_file_name(self) -> &'static str {
        match self {
            ReportType::Reception => "reception.pdf",
            ReportType::Decommission => "decommission.pdf",
        }
    }

    /// `Acta_<reportType>_<unix-ms>.pdf`
    pub fn attachment_filename(self, unix_ms: i64) -> String {
        format!("Acta_{}_{}.pdf", self.as_str(), unix_ms)
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = ActaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "reception" | "recepcion" => Ok(ReportType::Reception),
            "decommission" | "baja" => Ok(ReportType::Decommission),
            other => Err(ActaError::UnknownReportType(other.to_string())),
        }
    }
}

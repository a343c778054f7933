//! Per-report coordinate maps.
//!
//! Every anchor here is hand-tuned against one specific template layout. A
//! redesigned template needs a matching update in this file (and a new
//! digest pin, see [`crate::template::DirTemplateSource::with_pin`]).

use crate::error::ActaError;
use crate::report::ReportType;
use crate::types::{Anchor, Pt};
use std::sync::LazyLock;

pub const TEXT_FONT_SIZE: i32 = 10;
pub const TABLE_FONT_SIZE: i32 = 8;
pub const TABLE_SAFETY_MARGIN: i32 = 50;
pub const MARK_GLYPH: &str = "X";
pub const STATUS_FIELD: &str = "equipment_status";
pub const COMPONENTS_FIELD: &str = "components";

#[derive(Debug, Clone, PartialEq)]
pub struct TextField {
    pub name: &'static str,
    pub anchor: Anchor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BooleanField {
    pub name: &'static str,
    pub true_pos: Anchor,
    pub false_pos: Anchor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusMarker {
    pub keyword: &'static str,
    pub anchor: Anchor,
}

/// A region where a paragraph is word-wrapped top-down.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub field: &'static str,
    pub x: Pt,
    pub start_y: Pt,
    pub min_y: Pt,
    pub max_width: Pt,
}

/// Component sub-fields in column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentColumn {
    Name,
    Inventory,
    Brand,
    Model,
    Serial,
}

impl ComponentColumn {
    pub const ALL: [ComponentColumn; 5] = [
        ComponentColumn::Name,
        ComponentColumn::Inventory,
        ComponentColumn::Brand,
        ComponentColumn::Model,
        ComponentColumn::Serial,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ComponentColumn::Name => "name",
            ComponentColumn::Inventory => "inventory",
            ComponentColumn::Brand => "brand",
            ComponentColumn::Model => "model",
            ComponentColumn::Serial => "serial",
        }
    }

    pub fn max_chars(self) -> usize {
        match self {
            ComponentColumn::Name => 25,
            ComponentColumn::Inventory => 15,
            ComponentColumn::Brand => 12,
            ComponentColumn::Model => 12,
            ComponentColumn::Serial => 15,
        }
    }

    pub fn index(self) -> usize {
        match self {
            ComponentColumn::Name => 0,
            ComponentColumn::Inventory => 1,
            ComponentColumn::Brand => 2,
            ComponentColumn::Model => 3,
            ComponentColumn::Serial => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRegion {
    pub start_y: Pt,
    pub row_height: Pt,
    pub safety_margin: Pt,
    pub columns: [Pt; 5],
}

impl TableRegion {
    pub fn column_x(&self, column: ComponentColumn) -> Pt {
        self.columns[column.index()]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateMap {
    pub report_type: ReportType,
    pub text_fields: Vec<TextField>,
    pub boolean_fields: Vec<BooleanField>,
    pub status_markers: Vec<StatusMarker>,
    pub text_blocks: Vec<TextBlock>,
    pub table: Option<TableRegion>,
}

impl CoordinateMap {
    pub fn text_anchor(&self, name: &str) -> Option<Anchor> {
        self.text_fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.anchor)
    }

    pub fn boolean(&self, name: &str) -> Option<&BooleanField> {
        self.boolean_fields.iter().find(|field| field.name == name)
    }

    /// Marker for an already lowercased status keyword.
    pub fn status_anchor(&self, keyword: &str) -> Option<Anchor> {
        self.status_markers
            .iter()
            .find(|marker| marker.keyword == keyword)
            .map(|marker| marker.anchor)
    }
}

pub fn lookup(report_type: ReportType) -> &'static CoordinateMap {
    match report_type {
        ReportType::Reception => &RECEPTION,
        ReportType::Decommission => &DECOMMISSION,
    }
}

pub fn lookup_name(name: &str) -> Result<&'static CoordinateMap, ActaError> {
    let report_type: ReportType = name.parse()?;
    Ok(lookup(report_type))
}

fn text(entries: &[(&'static str, i32, i32)]) -> Vec<TextField> {
    entries
        .iter()
        .map(|&(name, x, y)| TextField {
            name,
            anchor: Anchor::new(x, y),
        })
        .collect()
}

fn booleans(entries: &[(&'static str, (i32, i32), (i32, i32))]) -> Vec<BooleanField> {
    entries
        .iter()
        .map(|&(name, (tx, ty), (fx, fy))| BooleanField {
            name,
            true_pos: Anchor::new(tx, ty),
            false_pos: Anchor::new(fx, fy),
        })
        .collect()
}

fn block(field: &'static str, x: i32, start_y: i32, min_y: i32, max_width: i32) -> TextBlock {
    TextBlock {
        field,
        x: Pt::from_i32(x),
        start_y: Pt::from_i32(start_y),
        min_y: Pt::from_i32(min_y),
        max_width: Pt::from_i32(max_width),
    }
}

static RECEPTION: LazyLock<CoordinateMap> = LazyLock::new(|| CoordinateMap {
    report_type: ReportType::Reception,
    text_fields: text(&[
        ("center_name", 125, 717),
        ("service", 125, 703),
        ("manager", 125, 690),
        ("center_code", 435, 717),
        ("unit", 380, 703),
        ("floor", 380, 690),
        ("hole", 485, 690),
        ("description", 130, 652),
        ("brand", 130, 638),
        ("serial_number", 130, 624),
        ("provider", 130, 610),
        ("model", 380, 638),
        ("property", 380, 624),
        ("contact", 380, 610),
        ("reception_date", 130, 572),
        ("acceptance_date", 290, 572),
        ("warranty_end", 445, 572),
        ("periodicity", 425, 543),
        ("main_inventory_number", 130, 370),
        ("parent_inventory_number", 365, 370),
        ("order_number", 420, 235),
        ("amount_tax_included", 420, 210),
    ]),
    boolean_fields: booleans(&[
        ("compliance", (290, 555), (320, 555)),
        ("manuals_usage", (290, 545), (320, 545)),
        ("manuals_tech", (290, 530), (320, 530)),
        ("order_accordance", (290, 515), (320, 515)),
        ("patient_data", (290, 500), (320, 500)),
        ("backup_required", (290, 490), (320, 490)),
        ("preventive_maintenance", (480, 555), (515, 555)),
        ("maintenance_contract", (480, 530), (515, 530)),
        ("received_correctly", (285, 248), (320, 248)),
        ("users_trained", (285, 234), (320, 234)),
        ("safe_to_use", (285, 221), (320, 221)),
        ("requires_epis", (285, 207), (320, 207)),
    ]),
    status_markers: vec![
        StatusMarker {
            keyword: "good",
            anchor: Anchor::new(255, 465),
        },
        StatusMarker {
            keyword: "bad",
            anchor: Anchor::new(365, 465),
        },
        StatusMarker {
            keyword: "obsolete",
            anchor: Anchor::new(480, 465),
        },
    ],
    text_blocks: vec![block("observations", 60, 430, 400, 460)],
    table: Some(TableRegion {
        start_y: Pt::from_i32(340),
        row_height: Pt::from_i32(18),
        safety_margin: Pt::from_i32(TABLE_SAFETY_MARGIN),
        columns: [60, 210, 300, 380, 440].map(Pt::from_i32),
    }),
});

static DECOMMISSION: LazyLock<CoordinateMap> = LazyLock::new(|| CoordinateMap {
    report_type: ReportType::Decommission,
    text_fields: text(&[
        ("center_name", 120, 696),
        ("service", 120, 683),
        ("manager", 120, 670),
        ("center_code", 425, 696),
        ("unit", 370, 683),
        ("floor", 370, 670),
        ("hole", 470, 670),
        ("description", 120, 622),
        ("brand", 120, 609),
        ("serial_number", 120, 596),
        ("main_inventory_number", 120, 583),
        ("model", 355, 609),
        ("property", 355, 596),
        ("parent_inventory_number", 355, 583),
        ("baja_date", 120, 534),
        ("work_order_number", 445, 234),
    ]),
    boolean_fields: booleans(&[
        ("repair_budget", (270, 234), (300, 234)),
        ("replacement_budget", (270, 221), (300, 221)),
        ("sat_report", (270, 208), (300, 208)),
        ("other_docs", (270, 195), (300, 195)),
        ("data_cleaned", (270, 182), (300, 182)),
    ]),
    status_markers: Vec::new(),
    text_blocks: vec![
        block("observations", 60, 370, 280, 440),
        block("justification_report", 60, 510, 420, 440),
    ],
    table: None,
});

//! Record + report type → filled PDF.

use crate::error::{ActaError, RenderStage};
use crate::layout::{FloorPolicy, layout_block, layout_table};
use crate::record::Record;
use crate::registry::{
    self, CoordinateMap, MARK_GLYPH, STATUS_FIELD, TABLE_FONT_SIZE, TEXT_FONT_SIZE,
};
use crate::report::ReportType;
use crate::stamp::PageStamp;
use crate::surface::{DrawOp, RecordingSurface, Surface};
use crate::template::{self, TemplateSource};
use crate::types::Pt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub floor_policy: FloorPolicy,
}

/// What a render drew and what it silently skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub text_fields: usize,
    pub marks: usize,
    pub paragraph_lines: usize,
    pub clipped_lines: usize,
    pub table_rows: usize,
    pub omitted_rows: usize,
    pub replaced_chars: usize,
}

#[derive(Debug, Clone)]
pub struct Rendered {
    pub bytes: Vec<u8>,
    pub summary: RenderSummary,
}

/// Stateless renderer. Every call reads its own template copy, so one
/// instance can serve concurrent requests.
#[derive(Debug, Clone)]
pub struct OverlayRenderer<S> {
    source: S,
    options: RenderOptions,
}

impl<S: TemplateSource> OverlayRenderer<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            options: RenderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn options(&self) -> RenderOptions {
        self.options
    }

    pub fn render(&self, record: &Record, report_type: ReportType) -> Result<Vec<u8>, ActaError> {
        self.render_with_summary(record, report_type)
            .map(|rendered| rendered.bytes)
    }

    /// String report type from the transport boundary.
    pub fn render_named(&self, record: &Record, report_type: &str) -> Result<Vec<u8>, ActaError> {
        let report_type = report_type.parse::<ReportType>().inspect_err(|err| {
            tracing::warn!(error = %err, "rejected report type");
        })?;
        self.render(record, report_type)
    }

    pub fn render_with_summary(
        &self,
        record: &Record,
        report_type: ReportType,
    ) -> Result<Rendered, ActaError> {
        let span = tracing::info_span!("render", report = %report_type);
        let _guard = span.enter();

        let result = self.render_inner(record, report_type);
        match &result {
            Ok(rendered) => tracing::debug!(
                bytes = rendered.bytes.len(),
                text_fields = rendered.summary.text_fields,
                marks = rendered.summary.marks,
                paragraph_lines = rendered.summary.paragraph_lines,
                table_rows = rendered.summary.table_rows,
                omitted_rows = rendered.summary.omitted_rows,
                "rendered"
            ),
            Err(err) => tracing::error!(
                kind = ?err.kind(),
                stage = ?err.stage(),
                error = %err,
                "render failed"
            ),
        }
        result
    }

    fn render_inner(&self, record: &Record, report_type: ReportType) -> Result<Rendered, ActaError> {
        let map = registry::lookup(report_type);
        let bytes = template::fetch(&self.source, report_type)?;
        let mut stamp = PageStamp::load(&bytes)?;
        let mut summary = draw_record(&mut stamp, map, record, self.options)?;
        summary.replaced_chars = stamp.replaced_chars();
        if summary.replaced_chars > 0 {
            tracing::warn!(
                replaced = summary.replaced_chars,
                "characters outside WinAnsi written as '?'"
            );
        }
        let bytes = stamp.finish()?;
        Ok(Rendered { bytes, summary })
    }

    /// Lays the record out without touching a template: the draw calls a
    /// render would make.
    pub fn plan(
        &self,
        record: &Record,
        report_type: ReportType,
    ) -> Result<(Vec<DrawOp>, RenderSummary), ActaError> {
        let mut surface = RecordingSurface::new();
        let summary = draw_record(
            &mut surface,
            registry::lookup(report_type),
            record,
            self.options,
        )?;
        Ok((surface.into_ops(), summary))
    }
}

/// Draws everything `record` provides for `map`, in a fixed order: text
/// fields, booleans, status marker, free-text blocks, table.
pub fn draw_record<S: Surface + ?Sized>(
    surface: &mut S,
    map: &CoordinateMap,
    record: &Record,
    options: RenderOptions,
) -> Result<RenderSummary, ActaError> {
    let mut summary = RenderSummary::default();
    let text_size = Pt::from_i32(TEXT_FONT_SIZE);

    for field in &map.text_fields {
        let value = record
            .text(field.name)
            .map_err(|err| ActaError::render(RenderStage::Text, err.to_string()))?;
        if let Some(value) = value {
            surface.draw_text(&value, field.anchor, text_size)?;
            summary.text_fields += 1;
        }
    }

    for field in &map.boolean_fields {
        let anchor = match record.flag(field.name) {
            Some(true) => field.true_pos,
            Some(false) => field.false_pos,
            None => continue,
        };
        surface
            .draw_text(MARK_GLYPH, anchor, text_size)
            .map_err(|err| restage(err, RenderStage::Boolean))?;
        summary.marks += 1;
    }

    let status = record
        .text(STATUS_FIELD)
        .map_err(|err| ActaError::render(RenderStage::Status, err.to_string()))?;
    if let Some(anchor) = status.and_then(|s| map.status_anchor(&s.to_lowercase())) {
        surface
            .draw_text(MARK_GLYPH, anchor, text_size)
            .map_err(|err| restage(err, RenderStage::Status))?;
        summary.marks += 1;
    }

    for block in &map.text_blocks {
        let text = record
            .text(block.field)
            .map_err(|err| ActaError::render(RenderStage::FreeText, err.to_string()))?;
        let Some(text) = text else {
            continue;
        };
        let layout = layout_block(block, &text, text_size, options.floor_policy);
        if layout.clipped > 0 {
            tracing::warn!(
                block = block.field,
                clipped = layout.clipped,
                "paragraph clipped at block floor"
            );
        }
        for line in &layout.lines {
            surface
                .draw_text(&line.text, line.anchor, text_size)
                .map_err(|err| restage(err, RenderStage::FreeText))?;
        }
        summary.paragraph_lines += layout.lines.len();
        summary.clipped_lines += layout.clipped;
    }

    if let Some(region) = &map.table {
        let rows = record
            .components()
            .map_err(|err| ActaError::render(RenderStage::Table, err.to_string()))?;
        let layout = layout_table(region, &rows);
        let table_size = Pt::from_i32(TABLE_FONT_SIZE);
        for cell in &layout.cells {
            surface
                .draw_text(&cell.text, cell.anchor, table_size)
                .map_err(|err| restage(err, RenderStage::Table))?;
        }
        if layout.rows_omitted > 0 {
            tracing::debug!(
                placed = layout.rows_placed,
                omitted = layout.rows_omitted,
                "component rows past the safety margin omitted"
            );
        }
        summary.table_rows = layout.rows_placed;
        summary.omitted_rows = layout.rows_omitted;
    }

    Ok(summary)
}

fn restage(err: ActaError, stage: RenderStage) -> ActaError {
    match err {
        ActaError::Render { message, .. } => ActaError::Render { stage, message },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::registry::lookup;
    use crate::stamp::{PlacedText, extract_placed_text};
    use crate::template::StaticTemplateSource;
    use crate::testing::single_page_pdf;
    use crate::types::Anchor;
    use serde_json::{Value, json};

    const TEMPLATE_TEXT: &str = "PLANTILLA";

    fn renderer() -> OverlayRenderer<StaticTemplateSource> {
        OverlayRenderer::new(
            StaticTemplateSource::new()
                .with(ReportType::Reception, single_page_pdf(TEMPLATE_TEXT))
                .with(ReportType::Decommission, single_page_pdf(TEMPLATE_TEXT)),
        )
    }

    fn record(value: Value) -> Record {
        Record::from_value(value).expect("object")
    }

    fn overlay_text(pdf: &[u8]) -> Vec<PlacedText> {
        extract_placed_text(pdf)
            .expect("extract")
            .into_iter()
            .filter(|p| p.text != TEMPLATE_TEXT)
            .collect()
    }

    fn at(placed: &[PlacedText], anchor: Anchor) -> Vec<String> {
        placed
            .iter()
            .filter(|p| p.x == anchor.x.to_f32() && p.y == anchor.y.to_f32())
            .map(|p| p.text.clone())
            .collect()
    }

    fn plan(rec: &Record, report_type: ReportType) -> RecordingSurface {
        let mut surface = RecordingSurface::new();
        draw_record(&mut surface, lookup(report_type), rec, RenderOptions::default())
            .expect("draw");
        surface
    }

    #[test]
    fn empty_record_draws_nothing() {
        let r = renderer();
        for report_type in ReportType::ALL {
            let rendered = r
                .render_with_summary(&Record::new(), report_type)
                .expect("render");
            assert_eq!(rendered.summary, RenderSummary::default());
            assert!(overlay_text(&rendered.bytes).is_empty());
            let all = extract_placed_text(&rendered.bytes).expect("extract");
            assert_eq!(all.len(), 1);
        }
    }

    #[test]
    fn text_fields_land_at_their_anchors() {
        let rec = record(json!({
            "center_name": "POLICLINICA GIPUZKOA",
            "service": "Radiología",
            "serial_number": "SN-0042",
            "amount_tax_included": 1210.5,
            "unknown_field": "ignored",
            "manager": ""
        }));
        let pdf = renderer().render(&rec, ReportType::Reception).expect("render");
        let placed = overlay_text(&pdf);
        let map = lookup(ReportType::Reception);

        for (field, expected) in [
            ("center_name", "POLICLINICA GIPUZKOA"),
            ("service", "Radiología"),
            ("serial_number", "SN-0042"),
            ("amount_tax_included", "1210.5"),
        ] {
            let anchor = map.text_anchor(field).expect("anchor");
            assert_eq!(at(&placed, anchor), vec![expected.to_string()], "{field}");
        }
        assert_eq!(placed.len(), 4);
        assert!(placed.iter().all(|p| p.font_size == 10.0));
        assert!(!placed.iter().any(|p| p.text == "ignored"));
    }

    #[test]
    fn booleans_mark_exactly_one_side() {
        let rec = record(json!({
            "compliance": true,
            "manuals_usage": false,
            "manuals_tech": "true",
            "patient_data": null
        }));
        let surface = plan(&rec, ReportType::Reception);
        let map = lookup(ReportType::Reception);

        let compliance = map.boolean("compliance").expect("field");
        assert_eq!(surface.texts_at(compliance.true_pos), vec!["X"]);
        assert!(surface.texts_at(compliance.false_pos).is_empty());

        let usage = map.boolean("manuals_usage").expect("field");
        assert!(surface.texts_at(usage.true_pos).is_empty());
        assert_eq!(surface.texts_at(usage.false_pos), vec!["X"]);

        for name in ["manuals_tech", "patient_data", "backup_required"] {
            let field = map.boolean(name).expect("field");
            assert!(surface.texts_at(field.true_pos).is_empty(), "{name}");
            assert!(surface.texts_at(field.false_pos).is_empty(), "{name}");
        }
        assert_eq!(surface.ops().len(), 2);
    }

    #[test]
    fn status_marker_is_case_insensitive() {
        let map = lookup(ReportType::Reception);
        let surface = plan(&record(json!({ "equipment_status": "Obsolete" })), ReportType::Reception);
        let anchor = map.status_anchor("obsolete").expect("marker");
        assert_eq!(surface.texts_at(anchor), vec!["X"]);
        assert_eq!(surface.ops().len(), 1);

        let surface = plan(&record(json!({ "equipment_status": "broken" })), ReportType::Reception);
        assert!(surface.ops().is_empty());

        let surface = plan(&record(json!({ "equipment_status": "good" })), ReportType::Decommission);
        assert!(surface.ops().is_empty());
    }

    #[test]
    fn decommission_draws_both_paragraph_blocks() {
        let rec = record(json!({
            "observations": "Equipo retirado del servicio.",
            "justification_report": "Reparación no viable según informe del servicio técnico."
        }));
        let surface = plan(&rec, ReportType::Decommission);
        let map = lookup(ReportType::Decommission);
        for block in &map.text_blocks {
            let texts = surface.texts_at(Anchor::at(block.x, block.start_y));
            assert_eq!(texts.len(), 1, "{}", block.field);
        }
        assert!(surface.ops().iter().all(|op| op.font_size == Pt::from_i32(10)));
    }

    #[test]
    fn long_observations_wrap_downwards() {
        let text = "palabra ".repeat(50);
        let rec = record(json!({ "observations": text }));
        let surface = plan(&rec, ReportType::Reception);
        let block = &lookup(ReportType::Reception).text_blocks[0];
        let ys: Vec<Pt> = surface.ops().iter().map(|op| op.anchor.y).collect();
        assert!(ys.len() > 1);
        for (i, y) in ys.iter().enumerate() {
            assert_eq!(*y, block.start_y - Pt::from_i32(12) * i as i32);
        }
        let rejoined: Vec<&str> = surface.ops().iter().map(|op| op.text.as_str()).collect();
        assert_eq!(rejoined.join(" "), text.trim());
    }

    #[test]
    fn clamp_policy_stops_at_the_floor() {
        let rec = record(json!({ "observations": "palabra ".repeat(400) }));
        let (ops, summary) = renderer()
            .with_options(RenderOptions {
                floor_policy: FloorPolicy::Clamp,
            })
            .plan(&rec, ReportType::Reception)
            .expect("plan");
        assert_eq!(ops.len(), 3);
        assert!(summary.clipped_lines > 0);
    }

    #[test]
    fn table_overflow_is_silently_truncated() {
        let rows: Vec<Value> = (0..30)
            .map(|i| json!({ "name": format!("Componente {i}"), "serial": format!("S{i}") }))
            .collect();
        let rec = record(json!({ "components": rows }));
        let rendered = renderer()
            .render_with_summary(&rec, ReportType::Reception)
            .expect("render");
        assert_eq!(rendered.summary.table_rows, 17);
        assert_eq!(rendered.summary.omitted_rows, 13);

        let placed = overlay_text(&rendered.bytes);
        assert_eq!(placed.len(), 34);
        assert!(placed.iter().all(|p| p.font_size == 8.0 && p.y >= 50.0));
        assert!(placed.iter().any(|p| p.text == "Componente 16"));
        assert!(!placed.iter().any(|p| p.text == "Componente 17"));
    }

    #[test]
    fn decommission_ignores_components() {
        let rec = record(json!({ "components": [{ "name": "Sonda" }] }));
        let surface = plan(&rec, ReportType::Decommission);
        assert!(surface.ops().is_empty());
    }

    #[test]
    fn unknown_report_type_is_a_configuration_error() {
        let err = renderer()
            .render_named(&Record::new(), "bogus")
            .expect_err("bogus");
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn missing_template_is_reported_as_not_found() {
        let r = OverlayRenderer::new(
            StaticTemplateSource::new().with(ReportType::Reception, single_page_pdf("R")),
        );
        let err = r
            .render(&Record::new(), ReportType::Decommission)
            .expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::TemplateNotFound);
        assert!(err.to_string().contains("decommission"));
    }

    #[test]
    fn corrupt_template_is_a_render_failure() {
        let r = OverlayRenderer::new(
            StaticTemplateSource::new().with(ReportType::Reception, b"%PDF-1.5 nonsense".to_vec()),
        );
        let err = r.render(&Record::new(), ReportType::Reception).expect_err("corrupt");
        assert_eq!(err.kind(), ErrorKind::RenderFailure);
        assert_eq!(err.stage(), Some(RenderStage::Load));
    }

    #[test]
    fn structured_value_in_text_field_fails_without_leaking_content() {
        let rec = record(json!({ "brand": { "secret": "do-not-log" } }));
        let err = renderer().render(&rec, ReportType::Reception).expect_err("shape");
        assert_eq!(err.kind(), ErrorKind::RenderFailure);
        assert_eq!(err.stage(), Some(RenderStage::Text));
        let message = err.to_string();
        assert!(message.contains("brand"));
        assert!(!message.contains("do-not-log"));
    }

    #[test]
    fn a_failed_render_does_not_affect_the_next() {
        let r = renderer();
        let bad = record(json!({ "components": "oops" }));
        assert!(r.render(&bad, ReportType::Reception).is_err());
        let good = record(json!({ "brand": "Philips" }));
        let pdf = r.render(&good, ReportType::Reception).expect("render");
        assert_eq!(overlay_text(&pdf).len(), 1);
    }

    #[test]
    fn rendering_is_deterministic() {
        let rec = record(json!({
            "center_name": "POLICLINICA GIPUZKOA",
            "compliance": true,
            "equipment_status": "good",
            "observations": "Sin incidencias en la recepción.",
            "components": [{ "name": "Sonda", "inventory": "INV-9" }]
        }));
        let r = renderer();
        let first = r.render(&rec, ReportType::Reception).expect("first");
        let second = r.render(&rec, ReportType::Reception).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn round_trip_yields_each_value_once_at_its_anchor() {
        let map = lookup(ReportType::Decommission);
        let mut rec = Record::new();
        for (i, field) in map.text_fields.iter().enumerate() {
            rec.set(field.name, format!("valor-{i}"));
        }
        let pdf = renderer().render(&rec, ReportType::Decommission).expect("render");
        let placed = overlay_text(&pdf);
        assert_eq!(placed.len(), map.text_fields.len());
        for (i, field) in map.text_fields.iter().enumerate() {
            assert_eq!(at(&placed, field.anchor), vec![format!("valor-{i}")]);
        }
    }

    #[test]
    fn plan_matches_what_render_draws() {
        let rec = record(json!({
            "brand": "Philips",
            "received_correctly": true,
            "equipment_status": "bad"
        }));
        let r = renderer();
        let (ops, summary) = r.plan(&rec, ReportType::Reception).expect("plan");
        let placed = overlay_text(&r.render(&rec, ReportType::Reception).expect("render"));
        assert_eq!(ops.len(), placed.len());
        assert_eq!(summary.text_fields, 1);
        assert_eq!(summary.marks, 2);
        for (op, p) in ops.iter().zip(&placed) {
            assert_eq!(op.text, p.text);
            assert_eq!(op.anchor.x.to_f32(), p.x);
            assert_eq!(op.anchor.y.to_f32(), p.y);
        }
    }
}

use crate::error::ActaError;
use crate::types::{Anchor, Pt};

/// Something overlay text can be drawn onto.
pub trait Surface {
    fn draw_text(&mut self, text: &str, anchor: Anchor, font_size: Pt) -> Result<(), ActaError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawOp {
    pub text: String,
    pub anchor: Anchor,
    pub font_size: Pt,
}

/// Collects draw calls instead of writing a PDF.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<DrawOp> {
        self.ops
    }

    pub fn texts_at(&self, anchor: Anchor) -> Vec<&str> {
        self.ops
            .iter()
            .filter(|op| op.anchor == anchor)
            .map(|op| op.text.as_str())
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn draw_text(&mut self, text: &str, anchor: Anchor, font_size: Pt) -> Result<(), ActaError> {
        self.ops.push(DrawOp {
            text: text.to_string(),
            anchor,
            font_size,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_keeps_call_order() {
        let mut surface = RecordingSurface::new();
        let size = Pt::from_i32(10);
        surface.draw_text("uno", Anchor::new(10, 20), size).expect("draw");
        surface.draw_text("X", Anchor::new(290, 555), size).expect("draw");
        surface.draw_text("dos", Anchor::new(10, 20), size).expect("draw");

        assert_eq!(surface.ops().len(), 3);
        assert_eq!(surface.texts_at(Anchor::new(10, 20)), vec!["uno", "dos"]);
        assert!(surface.texts_at(Anchor::new(0, 0)).is_empty());

        let ops = surface.into_ops();
        assert_eq!(ops[1].text, "X");
        assert_eq!(ops[1].font_size, size);
    }
}

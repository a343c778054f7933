//! Draws overlay text onto page 1 of a loaded template.

use crate::error::{ActaError, RenderStage, lopdf_err};
use crate::font::{decode_winansi, encode_winansi, font_dictionary};
use crate::surface::Surface;
use crate::types::{Anchor, Color, Pt};
use lopdf::content::{Content, Operation};
use lopdf::{
    Dictionary, Document as LoDocument, Object as LoObject, ObjectId as LoObjectId,
    Stream as LoStream, StringFormat,
};

const FONT_RESOURCE_PREFIX: &str = "FActa";
const MAX_TREE_DEPTH: usize = 32;

pub struct PageStamp {
    doc: LoDocument,
    page_id: LoObjectId,
    font_name: Vec<u8>,
    operations: Vec<Operation>,
    draws: usize,
    replaced_chars: usize,
}

impl PageStamp {
    pub fn load(template: &[u8]) -> Result<Self, ActaError> {
        let doc = LoDocument::load_mem(template).map_err(|err| lopdf_err(RenderStage::Load, err))?;
        if doc.is_encrypted() {
            return Err(ActaError::render(
                RenderStage::Load,
                "template PDF is encrypted",
            ));
        }
        let Some(page_id) = doc.get_pages().values().next().copied() else {
            return Err(ActaError::render(RenderStage::Load, "template PDF has no pages"));
        };
        let resources = inherited_resources(&doc, page_id);
        let fonts = sub_dict(&doc, &resources, b"Font");
        let font_name = unused_font_name(&fonts);
        Ok(Self {
            doc,
            page_id,
            font_name,
            operations: Vec::new(),
            draws: 0,
            replaced_chars: 0,
        })
    }

    pub fn draws(&self) -> usize {
        self.draws
    }

    /// Characters that had no WinAnsi code and were written as `?`.
    pub fn replaced_chars(&self) -> usize {
        self.replaced_chars
    }

    /// Serializes the document. With nothing drawn the template is written
    /// back without any added resources or content.
    pub fn finish(mut self) -> Result<Vec<u8>, ActaError> {
        if !self.operations.is_empty() {
            self.install_font()?;
            self.append_overlay()?;
        }
        let mut out = Vec::new();
        self.doc.save_to(&mut out).map_err(|err| {
            ActaError::render(RenderStage::Serialize, format!("pdf save error: {err}"))
        })?;
        Ok(out)
    }

    fn install_font(&mut self) -> Result<(), ActaError> {
        let font_id = self.doc.add_object(font_dictionary());
        let mut resources = inherited_resources(&self.doc, self.page_id);
        let mut fonts = sub_dict(&self.doc, &resources, b"Font");
        fonts.set(self.font_name.clone(), LoObject::Reference(font_id));
        resources.set("Font", LoObject::Dictionary(fonts));

        let page = self
            .doc
            .get_object_mut(self.page_id)
            .and_then(LoObject::as_dict_mut)
            .map_err(|err| lopdf_err(RenderStage::Serialize, err))?;
        page.set("Resources", LoObject::Dictionary(resources));
        Ok(())
    }

    /// Existing page content is isolated in `q … Q` so that state it leaves
    /// behind cannot move or recolor the overlay.
    fn append_overlay(&mut self) -> Result<(), ActaError> {
        let existing = self.doc.get_page_contents(self.page_id);
        let overlay = Content {
            operations: std::mem::take(&mut self.operations),
        }
        .encode()
        .map_err(|err| lopdf_err(RenderStage::Serialize, err))?;

        let mut contents: Vec<LoObject> = Vec::with_capacity(existing.len() + 3);
        if !existing.is_empty() {
            let save_id = self
                .doc
                .add_object(LoStream::new(Dictionary::new(), b"q\n".to_vec()));
            contents.push(LoObject::Reference(save_id));
            contents.extend(existing.into_iter().map(LoObject::Reference));
            let restore_id = self
                .doc
                .add_object(LoStream::new(Dictionary::new(), b"\nQ\n".to_vec()));
            contents.push(LoObject::Reference(restore_id));
        }
        let overlay_id = self.doc.add_object(LoStream::new(Dictionary::new(), overlay));
        contents.push(LoObject::Reference(overlay_id));

        let page = self
            .doc
            .get_object_mut(self.page_id)
            .and_then(LoObject::as_dict_mut)
            .map_err(|err| lopdf_err(RenderStage::Serialize, err))?;
        page.set("Contents", LoObject::Array(contents));
        Ok(())
    }
}

impl Surface for PageStamp {
    fn draw_text(&mut self, text: &str, anchor: Anchor, font_size: Pt) -> Result<(), ActaError> {
        let encoded = encode_winansi(text);
        self.replaced_chars += encoded.replaced;
        let color = Color::BLACK;
        self.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![LoObject::Name(self.font_name.clone()), number(font_size)],
            ),
            Operation::new(
                "rg",
                vec![
                    number(Pt::from_f32(color.r)),
                    number(Pt::from_f32(color.g)),
                    number(Pt::from_f32(color.b)),
                ],
            ),
            Operation::new(
                "Tm",
                vec![
                    LoObject::Integer(1),
                    LoObject::Integer(0),
                    LoObject::Integer(0),
                    LoObject::Integer(1),
                    number(anchor.x),
                    number(anchor.y),
                ],
            ),
            Operation::new(
                "Tj",
                vec![LoObject::String(encoded.bytes, StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
        self.draws += 1;
        Ok(())
    }
}

fn number(value: Pt) -> LoObject {
    match value.as_whole() {
        Some(whole) => LoObject::Integer(whole),
        None => value.to_f32().into(),
    }
}

fn resolve_dict(doc: &LoDocument, obj: &LoObject) -> Dictionary {
    match obj {
        LoObject::Dictionary(d) => d.clone(),
        LoObject::Reference(id) => doc
            .get_object(*id)
            .ok()
            .and_then(|o| o.as_dict().ok())
            .cloned()
            .unwrap_or_default(),
        _ => Dictionary::new(),
    }
}

/// Resources of the page, falling back to the nearest ancestor in the page
/// tree that declares them.
fn inherited_resources(doc: &LoDocument, page_id: LoObjectId) -> Dictionary {
    let mut node = doc.get_object(page_id).and_then(LoObject::as_dict).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let Some(dict) = node else {
            break;
        };
        if let Ok(resources) = dict.get(b"Resources") {
            return resolve_dict(doc, resources);
        }
        node = dict
            .get(b"Parent")
            .and_then(LoObject::as_reference)
            .and_then(|id| doc.get_object(id))
            .and_then(LoObject::as_dict)
            .ok();
    }
    Dictionary::new()
}

fn sub_dict(doc: &LoDocument, resources: &Dictionary, key: &[u8]) -> Dictionary {
    match resources.get(key) {
        Ok(obj) => resolve_dict(doc, obj),
        Err(_) => Dictionary::new(),
    }
}

fn unused_font_name(fonts: &Dictionary) -> Vec<u8> {
    let mut candidate = FONT_RESOURCE_PREFIX.as_bytes().to_vec();
    let mut suffix = 1usize;
    while fonts.has(&candidate) {
        candidate = format!("{FONT_RESOURCE_PREFIX}{suffix}").into_bytes();
        suffix += 1;
    }
    candidate
}

/// A string shown on page 1, with its text-space origin and font size.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
}

/// Reads back every `Tj` string on page 1 together with the position it was
/// set at. Understands the `Tf`/`Td`/`Tm` subset the overlay and simple
/// templates use; enough to verify a render.
pub fn extract_placed_text(pdf: &[u8]) -> Result<Vec<PlacedText>, ActaError> {
    let doc = LoDocument::load_mem(pdf).map_err(|err| lopdf_err(RenderStage::Load, err))?;
    let Some(page_id) = doc.get_pages().values().next().copied() else {
        return Ok(Vec::new());
    };
    let content = doc
        .get_and_decode_page_content(page_id)
        .map_err(|err| lopdf_err(RenderStage::Load, err))?;

    let mut placed = Vec::new();
    let mut font_size = 0.0f32;
    let (mut x, mut y) = (0.0f32, 0.0f32);
    for op in &content.operations {
        match op.operator.as_str() {
            "BT" => {
                x = 0.0;
                y = 0.0;
            }
            "Tf" => {
                if let Some(size) = op.operands.get(1).and_then(operand_f32) {
                    font_size = size;
                }
            }
            "Td" => {
                if let [dx, dy] = op.operands.as_slice() {
                    x += operand_f32(dx).unwrap_or(0.0);
                    y += operand_f32(dy).unwrap_or(0.0);
                }
            }
            "Tm" => {
                if let [_, _, _, _, e, f] = op.operands.as_slice() {
                    x = operand_f32(e).unwrap_or(0.0);
                    y = operand_f32(f).unwrap_or(0.0);
                }
            }
            "Tj" => {
                if let Some(LoObject::String(bytes, _)) = op.operands.first() {
                    placed.push(PlacedText {
                        text: decode_winansi(bytes),
                        x,
                        y,
                        font_size,
                    });
                }
            }
            _ => {}
        }
    }
    Ok(placed)
}

fn operand_f32(obj: &LoObject) -> Option<f32> {
    match obj {
        LoObject::Integer(i) => Some(*i as f32),
        LoObject::Real(r) => Some(*r as f32),
        _ => None,
    }
}

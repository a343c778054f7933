//! Template fixtures built with lopdf.

use lopdf::{Document as LoDocument, Object as LoObject, Stream as LoStream, dictionary};

pub(crate) fn single_page_pdf(text: &str) -> Vec<u8> {
    build(text, false)
}

/// Same page, but `Resources` lives on the `Pages` node instead of the page.
pub(crate) fn single_page_pdf_with_inherited_resources(text: &str) -> Vec<u8> {
    build(text, true)
}

fn build(text: &str, inherit_resources: bool) -> Vec<u8> {
    let mut doc = LoDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = format!("BT /F1 18 Tf 72 760 Td ({}) Tj ET", text).into_bytes();
    let content_id = doc.add_object(LoStream::new(dictionary! {}, content));
    let mut page = dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    let mut pages = dictionary! {
        "Type" => "Pages",
        "Count" => 1,
    };
    if inherit_resources {
        pages.set("Resources", resources_id);
    } else {
        page.set("Resources", resources_id);
    }
    let page_id = doc.add_object(page);
    pages.set("Kids", vec![LoObject::Reference(page_id)]);
    doc.objects.insert(pages_id, LoObject::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save");
    out
}

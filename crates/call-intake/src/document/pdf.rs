use std::io::Write;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use super::fonts::{encode_win_ansi, Font};
use super::layout::{Layout, PAGE_HEIGHT, PAGE_WIDTH};
use super::RenderError;

const PDF_VERSION: &str = "1.5";

/// Serializes a layout as a PDF with one content stream per page.
pub(crate) fn write_pdf<W: Write>(layout: &Layout, sink: &mut W) -> Result<(), RenderError> {
    let mut doc = Document::with_version(PDF_VERSION);
    let pages_id = doc.new_object_id();

    let mut fonts = lopdf::Dictionary::new();
    for font in [Font::Regular, Font::Bold] {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), font_id);
    }
    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
    });

    let mut kids: Vec<Object> = Vec::with_capacity(layout.pages.len());
    for page in &layout.pages {
        let mut operations = Vec::with_capacity(page.runs.len() * 4);
        for run in &page.runs {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec![run.font.resource_name().into(), run.size.into()],
            ));
            operations.push(Operation::new("Td", vec![run.x.into(), run.y.into()]));
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(encode_win_ansi(&run.text))],
            ));
            operations.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.save_to(sink)?;
    sink.flush()?;
    Ok(())
}

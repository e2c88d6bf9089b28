//! Small PDFs generated with `lopdf` for tests.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

/// One page per entry; each page is a list of blocks, each block a list of lines.
pub fn pdf_with_pages(pages: &[&[&[&str]]]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let font_id = courier(&mut doc);
    let contents = pages
        .iter()
        .map(|blocks| block_operations(blocks))
        .collect();
    let resources = dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    };
    save(doc, contents, resources)
}

pub fn pdf_with_blocks(blocks: &[&[&str]]) -> Vec<u8> {
    pdf_with_pages(&[blocks])
}

/// A page that shows `page_lines` directly, then draws a Form XObject `/X1`
/// holding `form_lines`. Without `form_fonts` the form relies on the page's fonts.
pub fn pdf_with_form(page_lines: &[&str], form_lines: &[&str], form_fonts: bool) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let font_id = courier(&mut doc);
    let form_resources = form_fonts.then(|| {
        dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        }
    });
    let form_id = add_form(&mut doc, block_operations(&[form_lines]), form_resources);

    let mut page = block_operations(&[page_lines]);
    page.push(Operation::new("Do", vec!["X1".into()]));
    let resources = dictionary! {
        "Font" => dictionary! { "F1" => font_id },
        "XObject" => dictionary! { "X1" => form_id },
    };
    save(doc, vec![page], resources)
}

/// A page whose only text sits `depth` Form XObjects deep (`/X1` draws `/X2`, and so on).
pub fn pdf_with_nested_forms(depth: usize, line: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let font_id = courier(&mut doc);

    let mut child: Option<ObjectId> = None;
    for level in (1..=depth).rev() {
        let mut resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        };
        let operations = match child {
            Some(child_id) => {
                let name = format!("X{}", level + 1);
                resources.set("XObject", dictionary! { name.as_str() => child_id });
                vec![Operation::new("Do", vec![Object::Name(name.into_bytes())])]
            }
            None => block_operations(&[&[line]]),
        };
        child = Some(add_form(&mut doc, operations, Some(resources)));
    }

    let mut resources = dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    };
    let mut page = Vec::new();
    if let Some(first) = child {
        resources.set("XObject", dictionary! { "X1" => first });
        page.push(Operation::new("Do", vec!["X1".into()]));
    }
    save(doc, vec![page], resources)
}

fn courier(doc: &mut Document) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    })
}

fn add_form(doc: &mut Document, operations: Vec<Operation>, resources: Option<Dictionary>) -> ObjectId {
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    if let Some(resources) = resources {
        dict.set("Resources", resources);
    }
    let content = Content { operations };
    doc.add_object(Stream::new(dict, content.encode().unwrap()))
}

/// Writes one page per content list. Resources live on the `Pages` node so pages inherit them.
fn save(mut doc: Document, contents: Vec<Vec<Operation>>, resources: Dictionary) -> Vec<u8> {
    let pages_id = doc.new_object_id();
    let resources_id = doc.add_object(resources);

    let mut kids = Vec::new();
    for operations in contents {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn block_operations(blocks: &[&[&str]]) -> Vec<Operation> {
    let mut ops = Vec::new();
    let mut y = 720;
    for lines in blocks {
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("Tf", vec!["F1".into(), 11.into()]));
        ops.push(Operation::new("TL", vec![14.into()]));
        ops.push(Operation::new("Td", vec![72.into(), y.into()]));
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                ops.push(Operation::new("T*", vec![]));
            }
            ops.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        }
        ops.push(Operation::new("ET", vec![]));
        y -= 14 * (lines.len() as i64 + 1);
    }
    ops
}

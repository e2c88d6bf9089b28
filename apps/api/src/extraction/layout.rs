//! Structured pass: walks a page content stream and groups shown text into
//! blocks (`BT`…`ET`), lines, and spans (one per text-showing operator).
//! Form XObjects drawn with `Do` are walked in place.

use std::collections::HashMap;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::extraction::fonts::{page_fonts, resource_fonts, FontDecoder, FontMap};
use crate::extraction::{PageLayout, TextBlock, TextLine, TextSpan};

/// `TJ` adjustments are in thousandths of an em; gaps wider than this read as a space.
const WORD_GAP: f64 = 200.0;
const SAME_LINE_EPSILON: f64 = 0.5;
/// Form XObjects nested deeper than this are skipped; also stops self-referencing forms.
const MAX_FORM_DEPTH: usize = 8;

type FormMap<'d> = HashMap<Vec<u8>, &'d Stream>;

/// Fonts and Form XObjects a content stream can refer to by name.
struct Scope<'d> {
    doc: Option<&'d Document>,
    fonts: FontMap,
    forms: FormMap<'d>,
}

/// Builds the layout for one page. A page whose content cannot be decoded
/// contributes no blocks.
pub fn page_layout(doc: &Document, page_id: ObjectId) -> PageLayout {
    let content = match doc.get_and_decode_page_content(page_id) {
        Ok(content) => content,
        Err(e) => {
            debug!("Skipping page {page_id:?}: undecodable content ({e})");
            return PageLayout::default();
        }
    };
    let scope = Scope {
        doc: Some(doc),
        fonts: page_fonts(doc, page_id),
        forms: page_forms(doc, page_id),
    };
    let mut builder = LayoutBuilder::new();
    builder.walk(&content.operations, &scope, 0);
    builder.finish()
}

/// Walks operations that only use `fonts`; `Do` has nothing to resolve against.
pub fn walk_operations(operations: &[Operation], fonts: &FontMap) -> PageLayout {
    let scope = Scope {
        doc: None,
        fonts: fonts.clone(),
        forms: FormMap::new(),
    };
    let mut builder = LayoutBuilder::new();
    builder.walk(operations, &scope, 0);
    builder.finish()
}

/// Form XObjects from the page resources and those inherited through `/Parent`.
/// The nearest definition of a name wins.
fn page_forms(doc: &Document, page_id: ObjectId) -> FormMap<'_> {
    let (own, inherited) = doc.get_page_resources(page_id);
    let inherited = inherited
        .into_iter()
        .filter_map(|id| doc.get_dictionary(id).ok());

    let mut forms = FormMap::new();
    for resources in own.into_iter().chain(inherited) {
        for (name, stream) in resource_forms(doc, resources) {
            forms.entry(name).or_insert(stream);
        }
    }
    forms
}

fn resource_forms<'d>(doc: &'d Document, resources: &'d Dictionary) -> FormMap<'d> {
    let Ok(xobjects) = resources.get_deref(b"XObject", doc).and_then(Object::as_dict) else {
        return FormMap::new();
    };
    xobjects
        .iter()
        .filter_map(|(name, obj)| {
            let stream = doc.dereference(obj).ok()?.1.as_stream().ok()?;
            let is_form = stream
                .dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .is_ok_and(|subtype| subtype == b"Form");
            is_form.then(|| (name.clone(), stream))
        })
        .collect()
}

struct LayoutBuilder {
    fallback: FontDecoder,
    font: Option<Vec<u8>>,
    page: PageLayout,
    block: Option<TextBlock>,
    line: TextLine,
    line_y: Option<f64>,
}

impl LayoutBuilder {
    fn new() -> Self {
        Self {
            fallback: FontDecoder::default(),
            font: None,
            page: PageLayout::default(),
            block: None,
            line: TextLine::default(),
            line_y: None,
        }
    }

    fn walk(&mut self, operations: &[Operation], scope: &Scope<'_>, depth: usize) {
        for op in operations {
            self.apply(op, scope, depth);
        }
    }

    fn apply(&mut self, op: &Operation, scope: &Scope<'_>, depth: usize) {
        match op.operator.as_str() {
            "BT" => {
                self.end_block();
                self.block = Some(TextBlock::default());
                self.line_y = None;
            }
            "ET" => self.end_block(),
            "Tf" => {
                if let Some(Object::Name(name)) = op.operands.first() {
                    self.font = Some(name.clone());
                }
            }
            "Td" | "TD" => {
                if number(op.operands.get(1)).is_some_and(|ty| ty != 0.0) {
                    self.break_line();
                } else {
                    self.soft_space();
                }
            }
            "Tm" => {
                if let Some(y) = number(op.operands.get(5)) {
                    match self.line_y {
                        Some(prev) if (prev - y).abs() > SAME_LINE_EPSILON => self.break_line(),
                        _ => self.soft_space(),
                    }
                    self.line_y = Some(y);
                }
            }
            "T*" => self.break_line(),
            "Tj" => {
                if let Some(text) = self.show(scope, op.operands.first()) {
                    self.push_span(text);
                }
            }
            "'" => {
                self.break_line();
                if let Some(text) = self.show(scope, op.operands.first()) {
                    self.push_span(text);
                }
            }
            "\"" => {
                self.break_line();
                if let Some(text) = self.show(scope, op.operands.get(2)) {
                    self.push_span(text);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    let text = self.show_array(scope, items);
                    self.push_span(text);
                }
            }
            "Do" => {
                if let Some(Object::Name(name)) = op.operands.first() {
                    self.draw_form(name, scope, depth);
                }
            }
            _ => {}
        }
    }

    /// Walks a Form XObject's content with its own resources layered over the caller's.
    /// The caller's font selection is restored afterwards.
    fn draw_form(&mut self, name: &[u8], scope: &Scope<'_>, depth: usize) {
        let (Some(doc), Some(form)) = (scope.doc, scope.forms.get(name).copied()) else {
            return;
        };
        if depth >= MAX_FORM_DEPTH {
            debug!("Skipping form XObject {}: nested too deep", String::from_utf8_lossy(name));
            return;
        }
        let data = form
            .decompressed_content()
            .unwrap_or_else(|_| form.content.clone());
        let content = match Content::decode(&data) {
            Ok(content) => content,
            Err(e) => {
                debug!("Skipping form XObject {}: {e}", String::from_utf8_lossy(name));
                return;
            }
        };

        let mut nested = Scope {
            doc: Some(doc),
            fonts: scope.fonts.clone(),
            forms: scope.forms.clone(),
        };
        if let Ok(resources) = form.dict.get_deref(b"Resources", doc).and_then(Object::as_dict) {
            nested.fonts.extend(resource_fonts(doc, resources));
            nested.forms.extend(resource_forms(doc, resources));
        }

        let font = self.font.take();
        self.walk(&content.operations, &nested, depth + 1);
        self.font = font;
    }

    fn decoder<'s>(&'s self, scope: &'s Scope<'_>) -> &'s FontDecoder {
        self.font
            .as_ref()
            .and_then(|name| scope.fonts.get(name))
            .unwrap_or(&self.fallback)
    }

    fn show(&self, scope: &Scope<'_>, operand: Option<&Object>) -> Option<String> {
        match operand {
            Some(Object::String(bytes, _)) => Some(self.decoder(scope).decode(bytes)),
            _ => None,
        }
    }

    fn show_array(&self, scope: &Scope<'_>, items: &[Object]) -> String {
        let decoder = self.decoder(scope);
        let mut text = String::new();
        for item in items {
            match item {
                Object::String(bytes, _) => text.push_str(&decoder.decode(bytes)),
                other => {
                    let gap = number(Some(other)).map_or(0.0, |n| -n);
                    if gap > WORD_GAP && !text.is_empty() && !text.ends_with(' ') {
                        text.push(' ');
                    }
                }
            }
        }
        text
    }

    fn push_span(&mut self, text: String) {
        if !text.is_empty() {
            self.line.spans.push(TextSpan { text });
        }
    }

    /// Separates horizontally offset runs on the same line.
    fn soft_space(&mut self) {
        let needs_space = self
            .line
            .spans
            .last()
            .is_some_and(|span| !span.text.ends_with(char::is_whitespace));
        if needs_space {
            self.push_span(" ".to_string());
        }
    }

    fn break_line(&mut self) {
        if self.line.spans.is_empty() {
            return;
        }
        let line = std::mem::take(&mut self.line);
        self.block.get_or_insert_with(TextBlock::default).lines.push(line);
    }

    fn end_block(&mut self) {
        self.break_line();
        if let Some(block) = self.block.take() {
            if !block.lines.is_empty() {
                self.page.blocks.push(block);
            }
        }
    }

    fn finish(mut self) -> PageLayout {
        self.end_block();
        self.page
    }
}

fn number(obj: Option<&Object>) -> Option<f64> {
    match obj? {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::cmap::CMap;
    use crate::extraction::fixtures;
    use crate::extraction::flatten_pages;

    fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    fn text(s: &str) -> Object {
        Object::string_literal(s)
    }

    fn walk(ops: Vec<Operation>) -> PageLayout {
        walk_operations(&ops, &HashMap::new())
    }

    fn flat(layout: PageLayout) -> String {
        flatten_pages(&[layout])
    }

    #[test]
    fn test_bt_et_delimits_blocks() {
        let layout = walk(vec![
            op("BT", vec![]),
            op("Tj", vec![text("Jane Doe")]),
            op("ET", vec![]),
            op("BT", vec![]),
            op("Tj", vec![text("Experience")]),
            op("ET", vec![]),
        ]);
        assert_eq!(layout.blocks.len(), 2);
        assert_eq!(flat(layout), "Jane Doe\n\nExperience");
    }

    #[test]
    fn test_next_line_operators_split_lines() {
        let layout = walk(vec![
            op("BT", vec![]),
            op("Tj", vec![text("Jane Doe")]),
            op("T*", vec![]),
            op("Tj", vec![text("Software Engineer")]),
            op("Td", vec![0.into(), (-14).into()]),
            op("Tj", vec![text("Berlin")]),
            op("'", vec![text("Remote")]),
            op("ET", vec![]),
        ]);
        assert_eq!(layout.blocks.len(), 1);
        assert_eq!(layout.blocks[0].lines.len(), 4);
        assert_eq!(flat(layout), "Jane Doe\nSoftware Engineer\nBerlin\nRemote");
    }

    #[test]
    fn test_horizontal_move_stays_on_line() {
        let layout = walk(vec![
            op("BT", vec![]),
            op("Tj", vec![text("Rust")]),
            op("Td", vec![40.into(), 0.into()]),
            op("Tj", vec![text("Go")]),
            op("ET", vec![]),
        ]);
        assert_eq!(layout.blocks[0].lines.len(), 1);
        assert_eq!(flat(layout), "Rust Go");
    }

    #[test]
    fn test_tm_breaks_line_when_y_changes() {
        let tm = |y: i64| {
            op(
                "Tm",
                vec![1.into(), 0.into(), 0.into(), 1.into(), 72.into(), y.into()],
            )
        };
        let layout = walk(vec![
            op("BT", vec![]),
            tm(700),
            op("Tj", vec![text("Skills")]),
            tm(700),
            op("Tj", vec![text("Rust")]),
            tm(686),
            op("Tj", vec![text("Python")]),
            op("ET", vec![]),
        ]);
        assert_eq!(flat(layout), "Skills Rust\nPython");
    }

    #[test]
    fn test_tj_array_kerning_inserts_word_gaps() {
        let layout = walk(vec![
            op("BT", vec![]),
            op(
                "TJ",
                vec![Object::Array(vec![
                    text("Soft"),
                    (-15).into(),
                    text("ware"),
                    (-300).into(),
                    text("Engineer"),
                ])],
            ),
            op("ET", vec![]),
        ]);
        assert_eq!(flat(layout), "Software Engineer");
    }

    #[test]
    fn test_double_quote_operator_shows_third_operand() {
        let layout = walk(vec![
            op("BT", vec![]),
            op("Tj", vec![text("A")]),
            op("\"", vec![0.into(), 0.into(), text("B")]),
            op("ET", vec![]),
        ]);
        assert_eq!(flat(layout), "A\nB");
    }

    #[test]
    fn test_blocks_without_text_are_dropped() {
        let layout = walk(vec![
            op("BT", vec![]),
            op("Tf", vec!["F1".into(), 12.into()]),
            op("ET", vec![]),
            op("re", vec![0.into(), 0.into(), 10.into(), 10.into()]),
        ]);
        assert!(layout.blocks.is_empty());
    }

    #[test]
    fn test_selected_font_decodes_text() {
        let mut fonts = HashMap::new();
        fonts.insert(
            b"F2".to_vec(),
            FontDecoder {
                two_byte: true,
                to_unicode: Some(CMap::parse(
                    b"2 beginbfchar <0001> <004A> <0002> <006F> endbfchar",
                )),
            },
        );
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec!["F2".into(), 11.into()]),
            op(
                "Tj",
                vec![Object::String(
                    vec![0x00, 0x01, 0x00, 0x02],
                    lopdf::StringFormat::Hexadecimal,
                )],
            ),
            op("ET", vec![]),
        ];
        assert_eq!(flat(walk_operations(&ops, &fonts)), "Jo");
    }

    #[test]
    fn test_page_layout_reads_generated_pdf() {
        let bytes = fixtures::pdf_with_blocks(&[&["Jane Doe", "Software Engineer"], &["Skills"]]);
        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();

        let layout = page_layout(&doc, page_id);
        assert_eq!(flat(layout), "Jane Doe\nSoftware Engineer\n\nSkills");
    }

    fn first_page_layout(bytes: &[u8]) -> PageLayout {
        let doc = Document::load_mem(bytes).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        page_layout(&doc, page_id)
    }

    #[test]
    fn test_form_xobject_text_follows_page_text() {
        let bytes = fixtures::pdf_with_form(&["Jane Doe"], &["Experience: Rust at Acme"], true);
        let layout = first_page_layout(&bytes);
        assert_eq!(layout.blocks.len(), 2);
        assert_eq!(flat(layout), "Jane Doe\n\nExperience: Rust at Acme");
    }

    #[test]
    fn test_form_xobject_without_resources_uses_page_fonts() {
        let bytes = fixtures::pdf_with_form(&["Jane Doe"], &["Skills: Rust"], false);
        assert_eq!(flat(first_page_layout(&bytes)), "Jane Doe\n\nSkills: Rust");
    }

    #[test]
    fn test_nested_forms_are_walked() {
        let bytes = fixtures::pdf_with_nested_forms(3, "Summary");
        assert_eq!(flat(first_page_layout(&bytes)), "Summary");
    }

    #[test]
    fn test_forms_past_depth_limit_are_skipped() {
        let bytes = fixtures::pdf_with_nested_forms(MAX_FORM_DEPTH + 1, "Summary");
        assert!(first_page_layout(&bytes).blocks.is_empty());
    }

    #[test]
    fn test_do_without_document_is_ignored() {
        let layout = walk(vec![
            op("BT", vec![]),
            op("Tj", vec![text("Jane Doe")]),
            op("ET", vec![]),
            op("Do", vec!["X1".into()]),
        ]);
        assert_eq!(flat(layout), "Jane Doe");
    }
}

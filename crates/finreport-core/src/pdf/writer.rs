//! Tagged PDF emission.
//!
//! Every visible block is a marked-content sequence linked to a structure
//! element, so the logical tree (`Document > H1/H2/P/Caption/Table/Figure`)
//! survives independently of where things sit on the page. Table cells are
//! individual `TH`/`TD` elements under `TR` rows.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

use crate::config::PageSetup;
use crate::layout::fonts::{encode_win_ansi, text_width, Font};
use crate::layout::{Page, Placed, PlacedLine, TextStyle};
use crate::render::table::{cell_font, CELL_PADDING_X};
use crate::render::{CellRole, ImageBlock, TableBlock};
use crate::types::Points;
use crate::ReportResult;

const PDF_VERSION: &str = "1.7";

const HEADER_FILL: [f32; 3] = [0.463, 0.725, 0.0];
const STRIPE_FILL: [f32; 3] = [0.961, 0.961, 0.961];
const TOTAL_FILL: [f32; 3] = [0.91, 0.91, 0.91];
const GRID_STROKE: [f32; 3] = [0.8, 0.8, 0.8];
const RULE_STROKE: [f32; 3] = [0.2, 0.2, 0.2];
const WHITE: [f32; 3] = [1.0, 1.0, 1.0];
const BLACK: [f32; 3] = [0.0, 0.0, 0.0];

/// Document information dictionary entries.
#[derive(Debug, Clone, Default)]
pub struct PdfMetadata {
    pub title: String,
    pub author: String,
    pub subject: String,
}

// ---------------------------------------------------------------------------
// Structure tree bookkeeping
// ---------------------------------------------------------------------------

struct StructElem {
    id: ObjectId,
    tag: &'static str,
    parent: ObjectId,
    page: Option<ObjectId>,
    kids: Vec<Object>,
    attributes: Option<Dictionary>,
    alt: Option<String>,
}

impl StructElem {
    fn new(id: ObjectId, tag: &'static str, parent: ObjectId) -> Self {
        Self {
            id,
            tag,
            parent,
            page: None,
            kids: Vec::new(),
            attributes: None,
            alt: None,
        }
    }

    fn into_object(self) -> (ObjectId, Object) {
        let mut dict = dictionary! {
            "Type" => "StructElem",
            "S" => self.tag,
            "P" => self.parent,
        };
        if let Some(page) = self.page {
            dict.set("Pg", page);
        }
        match self.kids.len() {
            0 => {}
            1 => dict.set("K", self.kids.into_iter().next().unwrap_or(Object::Null)),
            _ => dict.set("K", self.kids),
        }
        if let Some(attrs) = self.attributes {
            dict.set("A", attrs);
        }
        if let Some(alt) = self.alt {
            dict.set("Alt", text_string(&alt));
        }
        (self.id, Object::Dictionary(dict))
    }
}

/// Content and tagging state for one page.
struct PageBuilder {
    id: ObjectId,
    ops: Vec<Operation>,
    /// Structure element owning each MCID, indexed by MCID
    mcid_owners: Vec<ObjectId>,
    images: Vec<(String, ObjectId)>,
}

impl PageBuilder {
    fn begin_marked(&mut self, tag: &str, owner: ObjectId) -> i64 {
        let mcid = self.mcid_owners.len() as i64;
        self.mcid_owners.push(owner);
        self.ops.push(Operation::new(
            "BDC",
            vec![Object::Name(tag.as_bytes().to_vec()), dictionary! { "MCID" => mcid }.into()],
        ));
        mcid
    }

    fn end_marked(&mut self) {
        self.ops.push(Operation::new("EMC", vec![]));
    }

    fn begin_artifact(&mut self) {
        self.ops.push(Operation::new("BMC", vec![Object::Name(b"Artifact".to_vec())]));
    }

    fn fill_rect(&mut self, x: Points, y: Points, w: Points, h: Points, color: [f32; 3]) {
        self.ops.push(Operation::new("rg", rgb(color)));
        self.ops.push(Operation::new("re", reals(&[x, y, w, h])));
        self.ops.push(Operation::new("f", vec![]));
    }

    fn line(&mut self, from: (Points, Points), to: (Points, Points), width: Points, color: [f32; 3]) {
        self.ops.push(Operation::new("RG", rgb(color)));
        self.ops.push(Operation::new("w", vec![width.into()]));
        self.ops.push(Operation::new("m", reals(&[from.0, from.1])));
        self.ops.push(Operation::new("l", reals(&[to.0, to.1])));
        self.ops.push(Operation::new("S", vec![]));
    }

    fn text_lines(&mut self, font: Font, size: Points, color: [f32; 3], lines: &[PlacedLine]) -> ReportResult<()> {
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new(
            "Tf",
            vec![Object::Name(font.resource_name().as_bytes().to_vec()), size.into()],
        ));
        self.ops.push(Operation::new("rg", rgb(color)));
        for line in lines {
            self.ops.push(Operation::new("Tm", reals(&[1.0, 0.0, 0.0, 1.0, line.x, line.y])));
            self.ops.push(Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(&line.text)?, StringFormat::Literal)],
            ));
        }
        self.ops.push(Operation::new("ET", vec![]));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Serialise laid-out pages into a tagged PDF.
///
/// The output contains no timestamps or random identifiers, so identical
/// pages produce identical bytes.
pub fn write_pdf(pages: &[Page], setup: &PageSetup, meta: &PdfMetadata) -> ReportResult<Vec<u8>> {
    let mut doc = Document::with_version(PDF_VERSION);
    let pages_id = doc.new_object_id();
    let struct_root_id = doc.new_object_id();
    let document_elem_id = doc.new_object_id();

    let mut font_dict = Dictionary::new();
    for font in Font::ALL {
        let id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        font_dict.set(font.resource_name(), id);
    }

    let mut elems: Vec<StructElem> = Vec::new();
    let mut document_kids: Vec<Object> = Vec::new();
    let mut parent_tree_nums: Vec<Object> = Vec::new();
    let mut page_ids: Vec<Object> = Vec::new();
    let mut image_count = 0usize;

    for (page_index, page) in pages.iter().enumerate() {
        let mut pb = PageBuilder {
            id: doc.new_object_id(),
            ops: Vec::new(),
            mcid_owners: Vec::new(),
            images: Vec::new(),
        };

        for item in &page.items {
            match item {
                Placed::Text { lines, style } => {
                    let elem_id = emit_text(&mut doc, &mut pb, &mut elems, document_elem_id, lines, style)?;
                    document_kids.push(elem_id.into());
                }
                Placed::Table { x, y, table } => {
                    let table_id = emit_table(&mut doc, &mut pb, &mut elems, document_elem_id, *x, *y, table)?;
                    document_kids.push(table_id.into());
                }
                Placed::Image { x, y, image } => {
                    image_count += 1;
                    let figure_id = emit_image(
                        &mut doc,
                        &mut pb,
                        &mut elems,
                        document_elem_id,
                        *x,
                        *y,
                        image,
                        format!("Im{image_count}"),
                    );
                    document_kids.push(figure_id.into());
                }
            }
        }

        let content = Content { operations: pb.ops };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let mut xobjects = Dictionary::new();
        for (name, id) in &pb.images {
            xobjects.set(name.as_str(), *id);
        }
        let mut resources = dictionary! { "Font" => font_dict.clone() };
        if !pb.images.is_empty() {
            resources.set("XObject", xobjects);
        }

        doc.objects.insert(
            pb.id,
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => reals(&[0.0, 0.0, setup.width, setup.height]),
                "Contents" => content_id,
                "Resources" => resources,
                "StructParents" => page_index as i64,
                "Tabs" => "S",
            }),
        );
        parent_tree_nums.push((page_index as i64).into());
        parent_tree_nums.push(Object::Array(
            pb.mcid_owners.iter().map(|id| Object::Reference(*id)).collect(),
        ));
        page_ids.push(pb.id.into());
    }

    for elem in elems {
        let (id, obj) = elem.into_object();
        doc.objects.insert(id, obj);
    }
    doc.objects.insert(
        document_elem_id,
        Object::Dictionary(dictionary! {
            "Type" => "StructElem",
            "S" => "Document",
            "P" => struct_root_id,
            "K" => document_kids,
        }),
    );
    let parent_tree_id = doc.add_object(dictionary! { "Nums" => parent_tree_nums });
    doc.objects.insert(
        struct_root_id,
        Object::Dictionary(dictionary! {
            "Type" => "StructTreeRoot",
            "K" => document_elem_id,
            "ParentTree" => parent_tree_id,
            "ParentTreeNextKey" => pages.len() as i64,
        }),
    );

    let page_count = page_ids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => page_count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "StructTreeRoot" => struct_root_id,
        "MarkInfo" => dictionary! { "Marked" => true },
        "Lang" => Object::string_literal("en-US"),
        "ViewerPreferences" => dictionary! { "DisplayDocTitle" => true },
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => text_string(&meta.title),
        "Author" => text_string(&meta.author),
        "Subject" => text_string(&meta.subject),
        "Producer" => text_string(concat!("finreport ", env!("CARGO_PKG_VERSION"))),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    debug!(pages = page_count, images = image_count, bytes = bytes.len(), "pdf serialised");
    Ok(bytes)
}

// ---------------------------------------------------------------------------
// Block emitters
// ---------------------------------------------------------------------------

fn emit_text(
    doc: &mut Document,
    pb: &mut PageBuilder,
    elems: &mut Vec<StructElem>,
    parent: ObjectId,
    lines: &[PlacedLine],
    style: &TextStyle,
) -> ReportResult<ObjectId> {
    let id = doc.new_object_id();
    let tag = style.tag.name();
    let mcid = pb.begin_marked(tag, id);
    pb.text_lines(style.font, style.size, style.color, lines)?;
    pb.end_marked();

    let mut elem = StructElem::new(id, tag, parent);
    elem.page = Some(pb.id);
    elem.kids.push(mcid.into());
    elems.push(elem);
    Ok(id)
}

fn emit_table(
    doc: &mut Document,
    pb: &mut PageBuilder,
    elems: &mut Vec<StructElem>,
    parent: ObjectId,
    x: Points,
    top: Points,
    table: &TableBlock,
) -> ReportResult<ObjectId> {
    let width = table.width();
    let height = table.height();

    // Decoration first, as artifacts, so it stays out of the logical tree.
    pb.begin_artifact();
    let mut row_top = top;
    for r in 0..table.row_count() {
        let h = table.row_height(r);
        let fill = if r == 0 {
            Some(HEADER_FILL)
        } else if table.emphasised_rows.contains(&r) {
            Some(TOTAL_FILL)
        } else if r % 2 == 1 {
            Some(STRIPE_FILL)
        } else {
            None
        };
        if let Some(color) = fill {
            pb.fill_rect(x, row_top - h, width, h, color);
        }
        row_top -= h;
    }
    let mut row_top = top;
    for r in 0..=table.row_count() {
        pb.line((x, row_top), (x + width, row_top), 0.5, GRID_STROKE);
        if r < table.row_count() {
            row_top -= table.row_height(r);
        }
    }
    let mut col_x = x;
    for c in 0..=table.column_count() {
        pb.line((col_x, top), (col_x, top - height), 0.5, GRID_STROKE);
        if let Some(w) = table.column_widths.get(c) {
            col_x += w;
        }
    }
    let header_bottom = top - table.row_height(0);
    pb.line((x, header_bottom), (x + width, header_bottom), 1.5, RULE_STROKE);
    let mut row_top = top;
    for r in 0..table.row_count() {
        if table.emphasised_rows.contains(&r) {
            pb.line((x, row_top), (x + width, row_top), 1.0, RULE_STROKE);
        }
        row_top -= table.row_height(r);
    }
    pb.end_marked();

    let table_id = doc.new_object_id();
    let mut table_elem = StructElem::new(table_id, "Table", parent);
    table_elem.page = Some(pb.id);

    let mut row_top = top;
    for (r, row) in table.rows.iter().enumerate() {
        let h = table.row_height(r);
        let tr_id = doc.new_object_id();
        let mut tr = StructElem::new(tr_id, "TR", table_id);
        tr.page = Some(pb.id);

        let mut cell_x = x;
        for cell in row {
            let col_w = table.column_widths.get(cell.col).copied().unwrap_or(0.0);
            let (font, size) = cell_font(cell, &table.emphasised_rows);
            let text_w = text_width(font, size, &cell.text)?;
            let tx = match cell.role {
                CellRole::Header => cell_x + (col_w - text_w) / 2.0,
                CellRole::RowHeader => cell_x + CELL_PADDING_X,
                CellRole::Data => cell_x + col_w - CELL_PADDING_X - text_w,
            };
            let ty = row_top - h / 2.0 - size * 0.35;
            let color = if cell.role == CellRole::Header { WHITE } else { BLACK };

            let cell_id = doc.new_object_id();
            let tag = if cell.role == CellRole::Data { "TD" } else { "TH" };
            let mcid = pb.begin_marked(tag, cell_id);
            pb.text_lines(
                font,
                size,
                color,
                &[PlacedLine {
                    x: tx,
                    y: ty,
                    text: cell.text.clone(),
                }],
            )?;
            pb.end_marked();

            let mut cell_elem = StructElem::new(cell_id, tag, tr_id);
            cell_elem.page = Some(pb.id);
            cell_elem.kids.push(mcid.into());
            match cell.role {
                CellRole::Header => {
                    cell_elem.attributes = Some(dictionary! { "O" => "Table", "Scope" => "Column" });
                }
                CellRole::RowHeader => {
                    cell_elem.attributes = Some(dictionary! { "O" => "Table", "Scope" => "Row" });
                }
                CellRole::Data => {}
            }
            elems.push(cell_elem);
            tr.kids.push(cell_id.into());
            cell_x += col_w;
        }
        elems.push(tr);
        table_elem.kids.push(tr_id.into());
        row_top -= h;
    }
    elems.push(table_elem);
    Ok(table_id)
}

#[allow(clippy::too_many_arguments)]
fn emit_image(
    doc: &mut Document,
    pb: &mut PageBuilder,
    elems: &mut Vec<StructElem>,
    parent: ObjectId,
    x: Points,
    y: Points,
    block: &ImageBlock,
    name: String,
) -> ObjectId {
    let img = &block.image;
    let xobject_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => img.width as i64,
            "Height" => img.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        img.pixels.clone(),
    ));

    let figure_id = doc.new_object_id();
    let mcid = pb.begin_marked("Figure", figure_id);
    pb.ops.push(Operation::new("q", vec![]));
    pb.ops.push(Operation::new(
        "cm",
        reals(&[block.display_width, 0.0, 0.0, block.display_height, x, y]),
    ));
    pb.ops.push(Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]));
    pb.ops.push(Operation::new("Q", vec![]));
    pb.end_marked();
    pb.images.push((name, xobject_id));

    let mut figure = StructElem::new(figure_id, "Figure", parent);
    figure.page = Some(pb.id);
    figure.kids.push(mcid.into());
    figure.alt = Some(block.alt_text.clone());
    figure.attributes = Some(dictionary! {
        "O" => "Layout",
        "BBox" => reals(&[x, y, x + block.display_width, y + block.display_height]),
    });
    elems.push(figure);
    figure_id
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn reals(values: &[Points]) -> Vec<Object> {
    values.iter().map(|v| (*v).into()).collect()
}

fn rgb(color: [f32; 3]) -> Vec<Object> {
    reals(&color)
}

/// PDF text string: PDFDocEncoding-compatible ASCII as is, anything else as
/// UTF-16BE with a byte order mark.
pub fn text_string(s: &str) -> Object {
    if s.is_ascii() {
        return Object::String(s.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in s.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

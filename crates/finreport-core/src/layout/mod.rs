//! Flow layout: stacks blocks top to bottom, starting a new page whenever the
//! next block does not fit. Blocks are never split across pages.

pub mod fonts;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PageSetup;
use crate::error::ReportError;
use crate::render::{ImageBlock, TableBlock};
use crate::types::Points;
use crate::ReportResult;

use fonts::{text_width, wrap_text, Font};

// ---------------------------------------------------------------------------
// Styles
// ---------------------------------------------------------------------------

/// Logical role of a text block in the PDF structure tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextTag {
    H1,
    H2,
    P,
    Caption,
}

impl TextTag {
    pub fn name(self) -> &'static str {
        match self {
            TextTag::H1 => "H1",
            TextTag::H2 => "H2",
            TextTag::P => "P",
            TextTag::Caption => "Caption",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font: Font,
    pub size: Points,
    pub leading: Points,
    pub align: Align,
    pub color: [f32; 3],
    pub space_before: Points,
    pub space_after: Points,
    pub tag: TextTag,
}

impl TextStyle {
    pub const COVER_TITLE: TextStyle = TextStyle {
        font: Font::HelveticaBold,
        size: 28.0,
        leading: 34.0,
        align: Align::Center,
        color: [0.0, 0.0, 0.0],
        space_before: 0.0,
        space_after: 20.0,
        tag: TextTag::H1,
    };

    pub const COVER_SUBTITLE: TextStyle = TextStyle {
        font: Font::Helvetica,
        size: 16.0,
        leading: 20.0,
        align: Align::Center,
        color: [0.333, 0.333, 0.333],
        space_before: 0.0,
        space_after: 40.0,
        tag: TextTag::P,
    };

    pub const SECTION_HEAD: TextStyle = TextStyle {
        font: Font::HelveticaBold,
        size: 16.0,
        leading: 20.0,
        align: Align::Left,
        color: [0.0, 0.0, 0.0],
        space_before: 20.0,
        space_after: 10.0,
        tag: TextTag::H2,
    };

    pub const BODY: TextStyle = TextStyle {
        font: Font::Helvetica,
        size: 11.0,
        leading: 15.0,
        align: Align::Left,
        color: [0.0, 0.0, 0.0],
        space_before: 0.0,
        space_after: 12.0,
        tag: TextTag::P,
    };

    pub const BODY_CENTERED: TextStyle = TextStyle {
        align: Align::Center,
        ..TextStyle::BODY
    };

    pub const CAPTION: TextStyle = TextStyle {
        font: Font::Helvetica,
        size: 10.0,
        leading: 12.0,
        align: Align::Center,
        color: [0.4, 0.4, 0.4],
        space_before: 6.0,
        space_after: 16.0,
        tag: TextTag::Caption,
    };
}

// ---------------------------------------------------------------------------
// Input blocks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Text { text: String, style: TextStyle },
    Table(TableBlock),
    Image(ImageBlock),
    Spacer(Points),
    PageBreak,
}

impl Block {
    pub fn text(text: impl Into<String>, style: TextStyle) -> Self {
        Block::Text {
            text: text.into(),
            style,
        }
    }

    fn describe(&self) -> String {
        match self {
            Block::Text { text, .. } => format!("text \"{}\"", truncate(text, 40)),
            Block::Table(t) => format!("table \"{}\"", t.caption),
            Block::Image(i) => format!("image \"{}\"", i.caption),
            Block::Spacer(_) => "spacer".into(),
            Block::PageBreak => "page break".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One line of text; `y` is the baseline in PDF user space (origin bottom left).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedLine {
    pub x: Points,
    pub y: Points,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Placed {
    Text {
        lines: Vec<PlacedLine>,
        style: TextStyle,
    },
    /// `y` is the top edge of the table
    Table {
        x: Points,
        y: Points,
        table: TableBlock,
    },
    /// `y` is the bottom edge of the image
    Image {
        x: Points,
        y: Points,
        image: ImageBlock,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    pub items: Vec<Placed>,
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

struct Measured {
    height: Points,
    space_before: Points,
    lines: Vec<String>,
}

/// Lay `blocks` out on pages of geometry `setup`.
pub fn paginate(blocks: &[Block], setup: &PageSetup) -> ReportResult<Vec<Page>> {
    let top = setup.height - setup.margin_top;
    let bottom = setup.margin_bottom;
    let content_width = setup.content_width();
    let content_height = setup.content_height();
    if content_width <= 0.0 || content_height <= 0.0 {
        return Err(ReportError::overflow("page", "Margins leave no content area"));
    }

    let mut pages = vec![Page::default()];
    let mut cursor = top;

    for (idx, block) in blocks.iter().enumerate() {
        match block {
            Block::PageBreak => {
                pages.push(Page::default());
                cursor = top;
                continue;
            }
            Block::Spacer(h) => {
                if cursor - h < bottom {
                    pages.push(Page::default());
                    cursor = top;
                } else {
                    cursor -= h;
                }
                continue;
            }
            _ => {}
        }

        let m = measure(block, content_width)?;
        if m.height > content_height {
            return Err(ReportError::overflow(
                block.describe(),
                format!(
                    "Block height {:.1}pt exceeds the {:.1}pt content area",
                    m.height, content_height
                ),
            ));
        }

        let at_top = (cursor - top).abs() < f32::EPSILON;
        let mut needed = m.height + if at_top { 0.0 } else { m.space_before };
        // Headings stay with the block that follows them.
        if matches!(block, Block::Text { style, .. } if style.tag == TextTag::H2) {
            if let Some(next) = blocks.get(idx + 1) {
                if let Ok(n) = measure(next, content_width) {
                    if m.height + n.space_before + n.height <= content_height {
                        needed += n.space_before + n.height;
                    }
                }
            }
        }
        if cursor - needed < bottom && !at_top {
            pages.push(Page::default());
            cursor = top;
        } else if !at_top {
            cursor -= m.space_before;
        }

        let placed = place(block, m, setup, cursor)?;
        cursor -= placed.1;
        if let Some(page) = pages.last_mut() {
            page.items.push(placed.0);
        }

        if pages.len() > setup.max_pages {
            return Err(ReportError::overflow(
                block.describe(),
                format!("Document exceeds {} pages", setup.max_pages),
            ));
        }
    }

    // A trailing page break leaves an empty page; drop it.
    if pages.len() > 1 && pages.last().is_some_and(|p| p.items.is_empty()) {
        pages.pop();
    }

    debug!(pages = pages.len(), "layout complete");
    Ok(pages)
}

fn measure(block: &Block, content_width: Points) -> ReportResult<Measured> {
    match block {
        Block::Text { text, style } => {
            let lines = wrap_text(style.font, style.size, text, content_width)?;
            for line in &lines {
                if text_width(style.font, style.size, line)? > content_width {
                    return Err(ReportError::overflow(
                        block.describe(),
                        format!("Word in \"{line}\" is wider than the content area"),
                    ));
                }
            }
            Ok(Measured {
                height: lines.len() as Points * style.leading + style.space_after,
                space_before: style.space_before,
                lines,
            })
        }
        Block::Table(t) => {
            if t.width() > content_width {
                return Err(ReportError::overflow(
                    block.describe(),
                    format!(
                        "Table width {:.1}pt exceeds the {:.1}pt content width",
                        t.width(),
                        content_width
                    ),
                ));
            }
            Ok(Measured {
                height: t.height(),
                space_before: 0.0,
                lines: Vec::new(),
            })
        }
        Block::Image(i) => {
            if i.display_width > content_width {
                return Err(ReportError::overflow(
                    block.describe(),
                    format!(
                        "Image width {:.1}pt exceeds the {:.1}pt content width",
                        i.display_width, content_width
                    ),
                ));
            }
            Ok(Measured {
                height: i.display_height,
                space_before: 0.0,
                lines: Vec::new(),
            })
        }
        Block::Spacer(h) => Ok(Measured {
            height: *h,
            space_before: 0.0,
            lines: Vec::new(),
        }),
        Block::PageBreak => Ok(Measured {
            height: 0.0,
            space_before: 0.0,
            lines: Vec::new(),
        }),
    }
}

/// Place a measured block with its top at `cursor`. Returns the item and the
/// vertical space it consumed.
fn place(block: &Block, m: Measured, setup: &PageSetup, cursor: Points) -> ReportResult<(Placed, Points)> {
    let left = setup.margin_left;
    let width = setup.content_width();
    match block {
        Block::Text { style, .. } => {
            let mut lines = Vec::with_capacity(m.lines.len());
            for (i, line) in m.lines.into_iter().enumerate() {
                let w = text_width(style.font, style.size, &line)?;
                let x = match style.align {
                    Align::Left => left,
                    Align::Center => left + (width - w) / 2.0,
                };
                let y = cursor - i as Points * style.leading - style.size;
                lines.push(PlacedLine { x, y, text: line });
            }
            Ok((Placed::Text { lines, style: *style }, m.height))
        }
        Block::Table(t) => Ok((
            Placed::Table {
                x: left + (width - t.width()) / 2.0,
                y: cursor,
                table: t.clone(),
            },
            m.height,
        )),
        Block::Image(i) => Ok((
            Placed::Image {
                x: left + (width - i.display_width) / 2.0,
                y: cursor - i.display_height,
                image: i.clone(),
            },
            m.height,
        )),
        Block::Spacer(_) | Block::PageBreak => Err(ReportError::overflow(
            block.describe(),
            "Spacers and page breaks are not placed",
        )),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{head}...")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportConfig;
    use crate::render::render_table;
    use crate::report::build_report;

    fn body(text: &str) -> Block {
        Block::text(text, TextStyle::BODY)
    }

    fn all_lines(page: &Page) -> Vec<&PlacedLine> {
        page.items
            .iter()
            .flat_map(|i| match i {
                Placed::Text { lines, .. } => lines.iter().collect(),
                _ => Vec::new(),
            })
            .collect()
    }

    #[test]
    fn test_page_break_starts_new_page() {
        let blocks = vec![body("cover"), Block::PageBreak, body("summary")];
        let pages = paginate(&blocks, &PageSetup::default()).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(all_lines(&pages[1])[0].text, "summary");
    }

    #[test]
    fn test_first_line_sits_below_top_margin() {
        let pages = paginate(&[body("hello")], &PageSetup::default()).unwrap();
        let line = all_lines(&pages[0])[0];
        assert_eq!(line.x, 72.0);
        assert_eq!(line.y, 792.0 - 72.0 - 11.0);
    }

    #[test]
    fn test_blocks_flow_onto_next_page() {
        let blocks: Vec<Block> = (0..60).map(|i| body(&format!("Paragraph {i}"))).collect();
        let pages = paginate(&blocks, &PageSetup::default()).unwrap();
        // 27pt per paragraph, 648pt content -> 24 per page
        assert_eq!(pages.len(), 3);
        for page in &pages {
            for line in all_lines(page) {
                assert!(line.y >= 72.0);
            }
        }
    }

    #[test]
    fn test_centered_text() {
        let style = TextStyle::CAPTION;
        let pages = paginate(&[Block::text("Caption", style)], &PageSetup::default()).unwrap();
        let line = all_lines(&pages[0])[0];
        let w = text_width(style.font, style.size, "Caption").unwrap();
        assert!((line.x - (72.0 + (468.0 - w) / 2.0)).abs() < 1e-3);
    }

    #[test]
    fn test_heading_kept_with_next_block() {
        let mut blocks: Vec<Block> = (0..23).map(|i| body(&format!("Paragraph {i}"))).collect();
        blocks.push(Block::text("Section", TextStyle::SECTION_HEAD));
        let table = render_table(&build_report(&ReportConfig::default()).unwrap()).unwrap();
        blocks.push(Block::Table(table));
        let pages = paginate(&blocks, &PageSetup::default()).unwrap();
        assert_eq!(pages.len(), 2);
        assert!(matches!(pages[1].items[0], Placed::Text { ref lines, .. } if lines[0].text == "Section"));
        assert!(matches!(pages[1].items[1], Placed::Table { .. }));
    }

    #[test]
    fn test_table_wider_than_page_overflows() {
        let table = render_table(&build_report(&ReportConfig::default()).unwrap()).unwrap();
        let narrow = PageSetup {
            width: 300.0,
            ..PageSetup::default()
        };
        let err = paginate(&[Block::Table(table)], &narrow).unwrap_err();
        assert!(matches!(err, ReportError::LayoutOverflow { .. }));
    }

    #[test]
    fn test_block_taller_than_page_overflows() {
        let long = vec!["word"; 5000].join(" ");
        let err = paginate(&[body(&long)], &PageSetup::default()).unwrap_err();
        assert!(matches!(err, ReportError::LayoutOverflow { .. }));
    }

    #[test]
    fn test_page_limit() {
        let blocks: Vec<Block> = (0..6).flat_map(|_| [body("x"), Block::PageBreak]).collect();
        let setup = PageSetup {
            max_pages: 3,
            ..PageSetup::default()
        };
        let err = paginate(&blocks, &setup).unwrap_err();
        assert!(matches!(err, ReportError::LayoutOverflow { ref reason, .. } if reason.contains("3 pages")));
    }

    #[test]
    fn test_trailing_page_break_dropped() {
        let pages = paginate(&[body("x"), Block::PageBreak], &PageSetup::default()).unwrap();
        assert_eq!(pages.len(), 1);
    }
}

use edubridge_common::{Error, Result};
use oxidize_pdf::{Document, Font, Page};

const HEADER: &str = "EduBridge - Lesson Plan";
const WRAP_COLUMNS: usize = 90;
const MARGIN_X: f64 = 50.0;
const TOP_Y: f64 = 790.0;
const BOTTOM_Y: f64 = 60.0;
const FOOTER_Y: f64 = 30.0;
const BODY_SIZE: f64 = 11.0;
const LINE_HEIGHT: f64 = 15.0;

/// Render a lesson document as PDF bytes.
///
/// Markdown emphasis markers are dropped and text outside Latin-1 is replaced
/// with `?`, since the built-in fonts cannot draw it.
pub fn render_pdf(title: &str, content: &str) -> Result<Vec<u8>> {
    let mut doc = Document::new();
    doc.set_title(title);

    let lines = layout_lines(content);
    let mut page_number = 1usize;
    let mut page = Page::a4();
    let mut y = TOP_Y;

    write_line(&mut page, Font::HelveticaBold, 10.0, y, HEADER)?;
    y -= LINE_HEIGHT * 2.0;
    write_line(&mut page, Font::HelveticaBold, 16.0, y, &to_latin1(title))?;
    y -= LINE_HEIGHT * 2.0;

    for line in &lines {
        if y < BOTTOM_Y {
            finish_page(&mut doc, page, page_number)?;
            page_number += 1;
            page = Page::a4();
            y = TOP_Y;
        }
        if !line.is_empty() {
            write_line(&mut page, Font::Helvetica, BODY_SIZE, y, line)?;
        }
        y -= LINE_HEIGHT;
    }
    finish_page(&mut doc, page, page_number)?;

    save_to_bytes(&mut doc)
}

fn write_line(page: &mut Page, font: Font, size: f64, y: f64, text: &str) -> Result<()> {
    page.text()
        .set_font(font, size)
        .at(MARGIN_X, y)
        .write(text)
        .map_err(|e| Error::Render(format!("failed to write PDF text: {e}")))?;
    Ok(())
}

fn finish_page(doc: &mut Document, mut page: Page, number: usize) -> Result<()> {
    let footer = format!("Page {number}");
    page.text()
        .set_font(Font::Helvetica, 8.0)
        .at(280.0, FOOTER_Y)
        .write(&footer)
        .map_err(|e| Error::Render(format!("failed to write PDF footer: {e}")))?;
    doc.add_page(page);
    Ok(())
}

fn save_to_bytes(doc: &mut Document) -> Result<Vec<u8>> {
    doc.to_bytes()
        .map_err(|e| Error::Render(format!("failed to serialize PDF: {e}")))
}

/// Clean and wrap body text into printable lines.
fn layout_lines(content: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in content.lines() {
        let cleaned = to_latin1(&raw.replace("**", "").replace("###", ""));
        let cleaned = cleaned.trim_end();
        if cleaned.trim().is_empty() {
            lines.push(String::new());
            continue;
        }
        lines.extend(wrap(cleaned, WRAP_COLUMNS));
    }
    lines
}

fn wrap(line: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();

    for word in line.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);

        // Break single words longer than a full line.
        while current.chars().count() > width {
            let head: String = current.chars().take(width).collect();
            let tail: String = current.chars().skip(width).collect();
            out.push(head);
            current = tail;
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn to_latin1(text: &str) -> String {
    text.chars()
        .map(|c| if (c as u32) <= 0xFF { c } else { '?' })
        .collect()
}

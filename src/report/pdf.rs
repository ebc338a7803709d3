//! Incremental PDF report.
//!
//! Each call renders its new pages into a scratch document, merges them
//! after the pages of the existing report and swaps the result into place
//! with an atomic rename. The previous report is never partially written.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::ReportError;
use crate::models::ChartArtifact;

/// US Letter in points.
const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 54.0;

const TITLE_SIZE: f32 = 16.0;
const CAPTION_SIZE: f32 = 11.0;
const TABLE_FONT_SIZE: f32 = 10.0;

/// Default number of summary rows drawn before the rest are elided.
pub const DEFAULT_SUMMARY_MAX_ROWS: usize = 30;

/// Append pages to the PDF report at `pdf_path` and return its path.
///
/// A summary table page is rendered from `summary_csv` only when the CSV
/// exists and the report does not. Every artifact whose image exists gets
/// one page; missing images are skipped.
pub fn append_to_pdf_report(
    summary_csv: &Path,
    artifacts: &[ChartArtifact],
    pdf_path: &Path,
    summary_max_rows: usize,
) -> Result<PathBuf, ReportError> {
    let existing = pdf_path.exists();
    let mut pages = PageWriter::new();

    if summary_csv.exists() && !existing {
        let rows = read_table(summary_csv)?;
        pages.add_summary_page(&rows, summary_max_rows)?;
    }

    for artifact in artifacts {
        if !artifact.path.exists() {
            debug!("Skipping missing chart image {}", artifact.path.display());
            continue;
        }
        pages.add_chart_page(artifact)?;
    }

    if pages.is_empty() {
        if existing {
            info!("No new pages for {}", pdf_path.display());
        } else {
            warn!("Nothing to write to {}", pdf_path.display());
        }
        return Ok(pdf_path.to_path_buf());
    }

    let added = pages.len();

    // Phase 1: render the new pages into a scratch file.
    let mut addition = pages.finish()?;
    let mut scratch = NamedTempFile::new()?;
    addition.save_to(scratch.as_file_mut())?;
    scratch.as_file_mut().flush()?;
    let addition = Document::load(scratch.path())?;

    // Phase 2: merge behind the existing pages.
    let mut merged = if existing {
        let mut base = Document::load(pdf_path)?;
        append_pages(&mut base, addition)?;
        base
    } else {
        addition
    };

    // Phase 3: write next to the target and rename over it.
    let dir = match pdf_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut staged = NamedTempFile::new_in(dir)?;
    merged.save_to(staged.as_file_mut())?;
    staged.as_file().sync_all()?;
    staged.persist(pdf_path).map_err(|e| e.error)?;

    info!(
        "Added {} page(s) to {} ({} total)",
        added,
        pdf_path.display(),
        merged.get_pages().len()
    );
    Ok(pdf_path.to_path_buf())
}

/// Move every page of `addition` to the end of `base`'s page tree.
fn append_pages(base: &mut Document, mut addition: Document) -> Result<(), ReportError> {
    addition.renumber_objects_with(base.max_id + 1);

    let base_root = pages_root(base)?;
    let addition_root = pages_root(&addition)?;
    let addition_catalog = addition.trailer.get(b"Root")?.as_reference()?;
    let addition_info = addition
        .trailer
        .get(b"Info")
        .and_then(Object::as_reference)
        .ok();
    let new_pages: Vec<ObjectId> = addition.get_pages().into_values().collect();

    base.max_id = addition.max_id;
    for (id, object) in addition.objects {
        if id == addition_catalog || id == addition_root || Some(id) == addition_info {
            continue;
        }
        base.objects.insert(id, object);
    }

    for &page in &new_pages {
        base.get_object_mut(page)?
            .as_dict_mut()?
            .set("Parent", base_root);
    }

    let root = base.get_object_mut(base_root)?.as_dict_mut()?;
    let mut kids = root.get(b"Kids")?.as_array()?.clone();
    kids.extend(new_pages.iter().map(|&id| Object::Reference(id)));
    let count = root.get(b"Count")?.as_i64()? + new_pages.len() as i64;
    root.set("Kids", kids);
    root.set("Count", count);
    Ok(())
}

fn pages_root(doc: &Document) -> Result<ObjectId, ReportError> {
    let catalog = doc.trailer.get(b"Root")?.as_reference()?;
    Ok(doc.get_dictionary(catalog)?.get(b"Pages")?.as_reference()?)
}

/// Read a CSV file as raw string rows, header included.
fn read_table(path: &Path) -> Result<Vec<Vec<String>>, ReportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(String::from).collect());
    }
    Ok(rows)
}

/// Builds a fresh document one page at a time.
struct PageWriter {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    bold_font_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl PageWriter {
    fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(font("Helvetica"));
        let bold_font_id = doc.add_object(font("Helvetica-Bold"));
        Self {
            doc,
            pages_id,
            font_id,
            bold_font_id,
            page_ids: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.page_ids.is_empty()
    }

    fn len(&self) -> usize {
        self.page_ids.len()
    }

    fn add_summary_page(
        &mut self,
        rows: &[Vec<String>],
        max_rows: usize,
    ) -> Result<(), ReportError> {
        let mut ops = Vec::new();
        let title = "Summary Statistics";
        let title_y = PAGE_HEIGHT - MARGIN - TITLE_SIZE;
        push_text(
            &mut ops,
            "F2",
            TITLE_SIZE,
            centered_x(title, TITLE_SIZE),
            title_y,
            title,
        );

        let (shown, note) = summary_rows(rows, max_rows);
        if !shown.is_empty() {
            let mut cells: Vec<Vec<String>> = shown
                .iter()
                .map(|r| r.iter().map(|c| format_cell(c)).collect())
                .collect();
            // Header labels are drawn verbatim.
            cells[0] = shown[0].clone();
            let ncols = cells.iter().map(Vec::len).max().unwrap_or(0);
            let mut widths = vec![0usize; ncols];
            for row in &cells {
                for (i, cell) in row.iter().enumerate() {
                    widths[i] = widths[i].max(cell.chars().count() + 2);
                }
            }

            let usable = PAGE_WIDTH - 2.0 * MARGIN;
            let natural: f32 = widths.iter().map(|&w| w as f32 * TABLE_FONT_SIZE * 0.5).sum();
            let size = if natural > usable {
                (TABLE_FONT_SIZE * usable / natural).max(5.0)
            } else {
                TABLE_FONT_SIZE
            };
            let col_widths: Vec<f32> = widths.iter().map(|&w| w as f32 * size * 0.5).collect();
            let table_width: f32 = col_widths.iter().sum();
            let left = (PAGE_WIDTH - table_width) / 2.0;
            let row_height = size * 1.8;

            let mut y = title_y - 36.0;
            for (r, row) in cells.iter().enumerate() {
                let mut x = left;
                let font = if r == 0 { "F2" } else { "F1" };
                for (i, cell) in row.iter().enumerate() {
                    push_text(&mut ops, font, size, x + size * 0.5, y, cell);
                    x += col_widths[i];
                }
                if r == 0 {
                    push_rule(&mut ops, left, left + table_width, y - size * 0.5);
                }
                y -= row_height;
            }

            if let Some(note) = note {
                push_text(&mut ops, "F1", size, left, y - size * 0.5, &note);
            }
        }

        self.add_page(ops, Dictionary::new())
    }

    fn add_chart_page(&mut self, artifact: &ChartArtifact) -> Result<(), ReportError> {
        let image = image::open(&artifact.path)
            .map_err(|e| ReportError::Image {
                path: artifact.path.clone(),
                message: e.to_string(),
            })?
            .to_rgb8();
        let (px_w, px_h) = image.dimensions();
        let image_id = self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => px_w as i64,
                "Height" => px_h as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            image.into_raw(),
        ));

        let mut ops = Vec::new();
        let mut top = PAGE_HEIGHT - MARGIN;
        if let Some(title) = &artifact.title {
            top -= TITLE_SIZE;
            push_text(&mut ops, "F2", TITLE_SIZE, centered_x(title, TITLE_SIZE), top, title);
            top -= 18.0;
        }

        let usable = PAGE_WIDTH - 2.0 * MARGIN;
        let lines = artifact
            .description
            .as_deref()
            .map(|d| wrap_text(d, chars_per_line(usable, CAPTION_SIZE)))
            .unwrap_or_default();
        let line_height = CAPTION_SIZE * 1.4;
        let bottom = MARGIN + lines.len() as f32 * line_height + if lines.is_empty() { 0.0 } else { 12.0 };

        let scale = (usable / px_w as f32).min((top - bottom) / px_h as f32);
        let (w, h) = (px_w as f32 * scale, px_h as f32 * scale);
        let x = (PAGE_WIDTH - w) / 2.0;
        let y = top - h;
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new(
            "cm",
            vec![w.into(), 0.into(), 0.into(), h.into(), x.into(), y.into()],
        ));
        ops.push(Operation::new("Do", vec!["Im1".into()]));
        ops.push(Operation::new("Q", vec![]));

        let mut line_y = y - 12.0 - CAPTION_SIZE;
        for line in &lines {
            push_text(&mut ops, "F1", CAPTION_SIZE, centered_x(line, CAPTION_SIZE), line_y, line);
            line_y -= line_height;
        }

        debug!("Added chart page for {}", artifact.path.display());
        self.add_page(ops, dictionary! { "Im1" => image_id })
    }

    fn add_page(&mut self, ops: Vec<Operation>, xobjects: Dictionary) -> Result<(), ReportError> {
        let content = Content { operations: ops };
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let mut resources = dictionary! {
            "Font" => dictionary! {
                "F1" => self.font_id,
                "F2" => self.bold_font_id,
            },
        };
        if !xobjects.is_empty() {
            resources.set("XObject", xobjects);
        }

        let media_box: Vec<Object> = vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()];
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => media_box,
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    fn finish(mut self) -> Result<Document, ReportError> {
        let kids: Vec<Object> = self.page_ids.iter().map(|&id| id.into()).collect();
        let count = kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.doc.add_object(dictionary! {
            "Producer" => Object::string_literal(concat!("data-analyzer ", env!("CARGO_PKG_VERSION"))),
            "CreationDate" => Object::string_literal(Utc::now().format("D:%Y%m%d%H%M%SZ").to_string()),
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);
        self.doc.compress();
        Ok(self.doc)
    }
}

fn font(base: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn push_text(ops: &mut Vec<Operation>, font: &str, size: f32, x: f32, y: f32, text: &str) {
    let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(text);
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
    ops.push(Operation::new("Td", vec![x.into(), y.into()]));
    ops.push(Operation::new(
        "Tj",
        vec![Object::String(bytes.into_owned(), StringFormat::Literal)],
    ));
    ops.push(Operation::new("ET", vec![]));
}

fn push_rule(ops: &mut Vec<Operation>, x0: f32, x1: f32, y: f32) {
    ops.push(Operation::new("w", vec![0.5f32.into()]));
    ops.push(Operation::new("m", vec![x0.into(), y.into()]));
    ops.push(Operation::new("l", vec![x1.into(), y.into()]));
    ops.push(Operation::new("S", vec![]));
}

// Helvetica averages roughly half an em per character.
fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5
}

fn centered_x(text: &str, size: f32) -> f32 {
    ((PAGE_WIDTH - text_width(text, size)) / 2.0).max(MARGIN)
}

fn chars_per_line(width: f32, size: f32) -> usize {
    ((width / (size * 0.5)) as usize).max(1)
}

/// Greedy word wrap to at most `width` characters per line.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}

/// Header plus at most `max_rows` data rows, and a note for the rest.
fn summary_rows(rows: &[Vec<String>], max_rows: usize) -> (&[Vec<String>], Option<String>) {
    let data_rows = rows.len().saturating_sub(1);
    if data_rows <= max_rows {
        return (rows, None);
    }
    let hidden = data_rows - max_rows;
    (
        &rows[..=max_rows],
        Some(format!("... {} more row(s) not shown", hidden)),
    )
}

fn format_cell(cell: &str) -> String {
    if cell.is_empty() {
        return "NaN".to_string();
    }
    match cell.parse::<f64>() {
        Ok(v) if cell.len() > 10 && v.is_finite() => format!("{:.4}", v),
        _ => cell.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::from_pixel(40, 30, image::Rgb([200, 30, 30]))
            .save(&path)
            .unwrap();
        path
    }

    fn summary_csv(dir: &Path) -> PathBuf {
        let path = dir.join("summary_statistics.csv");
        std::fs::write(
            &path,
            ",mean,median,std,min,max\nv,11.666666666666666,10.0,7.6376,5.0,20.0\n",
        )
        .unwrap();
        path
    }

    fn page_count(path: &Path) -> usize {
        Document::load(path).unwrap().get_pages().len()
    }

    #[test]
    fn test_first_report_has_summary_and_charts() {
        let dir = TempDir::new().unwrap();
        let csv = summary_csv(dir.path());
        let chart = ChartArtifact::new(png(dir.path(), "line_chart.png"))
            .with_title(Some("Sales".to_string()))
            .with_description(Some("Monthly sales for the year".to_string()));
        let pdf = dir.path().join("report.pdf");

        let out = append_to_pdf_report(&csv, &[chart], &pdf, DEFAULT_SUMMARY_MAX_ROWS).unwrap();
        assert_eq!(out, pdf);
        assert_eq!(page_count(&pdf), 2);
    }

    #[test]
    fn test_second_call_appends_and_preserves_pages() {
        let dir = TempDir::new().unwrap();
        let csv = summary_csv(dir.path());
        let pdf = dir.path().join("report.pdf");

        let first = vec![ChartArtifact::new(png(dir.path(), "a.png"))];
        append_to_pdf_report(&csv, &first, &pdf, DEFAULT_SUMMARY_MAX_ROWS).unwrap();

        let before = Document::load(&pdf).unwrap();
        let before_pages: Vec<Vec<u8>> = before
            .get_pages()
            .values()
            .map(|&id| before.get_page_content(id).unwrap())
            .collect();
        assert_eq!(before_pages.len(), 2);

        // The summary page is not repeated once the report exists.
        let second = vec![
            ChartArtifact::new(png(dir.path(), "b.png")),
            ChartArtifact::new(png(dir.path(), "c.png")),
        ];
        append_to_pdf_report(&csv, &second, &pdf, DEFAULT_SUMMARY_MAX_ROWS).unwrap();

        let after = Document::load(&pdf).unwrap();
        let pages = after.get_pages();
        assert_eq!(pages.len(), 4);
        for (i, (_, &id)) in pages.iter().take(2).enumerate() {
            assert_eq!(after.get_page_content(id).unwrap(), before_pages[i]);
        }
    }

    #[test]
    fn test_missing_images_are_skipped() {
        let dir = TempDir::new().unwrap();
        let pdf = dir.path().join("report.pdf");
        let artifacts = vec![
            ChartArtifact::new(dir.path().join("missing.png")),
            ChartArtifact::new(png(dir.path(), "present.png")),
        ];

        append_to_pdf_report(&dir.path().join("no_summary.csv"), &artifacts, &pdf, 30).unwrap();
        assert_eq!(page_count(&pdf), 1);
    }

    #[test]
    fn test_nothing_new_leaves_report_untouched() {
        let dir = TempDir::new().unwrap();
        let csv = summary_csv(dir.path());
        let pdf = dir.path().join("report.pdf");
        append_to_pdf_report(&csv, &[], &pdf, 30).unwrap();
        let bytes = std::fs::read(&pdf).unwrap();

        append_to_pdf_report(&csv, &[ChartArtifact::new(dir.path().join("gone.png"))], &pdf, 30)
            .unwrap();
        assert_eq!(std::fs::read(&pdf).unwrap(), bytes);
        assert_eq!(page_count(&pdf), 1);
    }

    #[test]
    fn test_corrupt_report_is_not_replaced() {
        let dir = TempDir::new().unwrap();
        let pdf = dir.path().join("report.pdf");
        std::fs::write(&pdf, b"not a pdf").unwrap();

        let artifacts = vec![ChartArtifact::new(png(dir.path(), "a.png"))];
        let err = append_to_pdf_report(&dir.path().join("none.csv"), &artifacts, &pdf, 30);
        assert!(err.is_err());
        assert_eq!(std::fs::read(&pdf).unwrap(), b"not a pdf");
    }

    #[test]
    fn test_summary_rows_cap() {
        let rows: Vec<Vec<String>> = (0..6).map(|i| vec![i.to_string()]).collect();
        let (shown, note) = summary_rows(&rows, 3);
        assert_eq!(shown.len(), 4);
        assert_eq!(note.as_deref(), Some("... 2 more row(s) not shown"));

        let (shown, note) = summary_rows(&rows, 5);
        assert_eq!(shown.len(), 6);
        assert!(note.is_none());
    }

    #[test]
    fn test_wrap_text() {
        let lines = wrap_text("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
        assert!(wrap_text("", 10).is_empty());
    }

    #[test]
    fn test_format_cell() {
        assert_eq!(format_cell(""), "NaN");
        assert_eq!(format_cell("11.666666666666666"), "11.6667");
        assert_eq!(format_cell("10.0"), "10.0");
        assert_eq!(format_cell("region"), "region");
    }
}

//! Office Open XML readers: DOCX (via `docx-rs`) and XLSX (via `calamine`).

use crate::error::ExtractError;
use crate::pipeline::extract::{ElementKind, TextElement};
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use docx_rs::{
    read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCell,
    TableCellContent, TableChild, TableRowChild,
};
use std::io::Cursor;
use tracing::debug;

// ── DOCX ─────────────────────────────────────────────────────────────────────

/// Paragraphs in body order. Heading/Title styles map to [`ElementKind::Title`],
/// numbered paragraphs to [`ElementKind::ListItem`], each table to one
/// [`ElementKind::Table`] element.
pub fn extract_docx(name: &str, bytes: &[u8]) -> Result<Vec<TextElement>, ExtractError> {
    let docx = read_docx(bytes).map_err(|e| ExtractError::Corrupt {
        name: name.to_string(),
        kind: "DOCX".into(),
        detail: format!("{e:?}"),
    })?;

    let mut elements = Vec::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => {
                let text = paragraph_text(p);
                let text = text.trim();
                if !text.is_empty() {
                    elements.push(TextElement::new(paragraph_kind(p), text));
                }
            }
            DocumentChild::Table(t) => {
                let text = table_text(t);
                if !text.is_empty() {
                    elements.push(TextElement::new(ElementKind::Table, text));
                }
            }
            _ => {}
        }
    }

    debug!("DOCX body: {} elements", elements.len());
    Ok(elements)
}

fn paragraph_kind(p: &Paragraph) -> ElementKind {
    let style = p
        .property
        .style
        .as_ref()
        .map(|s| s.val.to_ascii_lowercase())
        .unwrap_or_default();
    if style == "title" || style.starts_with("heading") {
        ElementKind::Title
    } else if p.property.numbering_property.is_some() {
        ElementKind::ListItem
    } else {
        ElementKind::NarrativeText
    }
}

fn paragraph_text(p: &Paragraph) -> String {
    let mut text = String::new();
    push_runs(&p.children, &mut text);
    text
}

fn push_runs(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for rc in &run.children {
                    match rc {
                        RunChild::Text(t) => out.push_str(&t.text),
                        RunChild::Tab(_) => out.push('\t'),
                        RunChild::Break(_) => out.push('\n'),
                        _ => {}
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => push_runs(&link.children, out),
            _ => {}
        }
    }
}

/// Rows joined by `\n`, non-empty cells within a row joined by a space.
#[allow(unreachable_patterns)]
fn table_text(table: &Table) -> String {
    table
        .rows
        .iter()
        .filter_map(|row| match row {
            TableChild::TableRow(row) => Some(row),
            _ => None,
        })
        .map(|row| {
            row.cells
                .iter()
                .filter_map(|cell| match cell {
                    TableRowChild::TableCell(cell) => Some(cell_text(cell)),
                    _ => None,
                })
                .filter(|c| !c.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn cell_text(cell: &TableCell) -> String {
    let mut parts = Vec::new();
    for content in &cell.children {
        match content {
            TableCellContent::Paragraph(p) => parts.push(paragraph_text(p).trim().to_string()),
            // nested tables flatten into the cell
            TableCellContent::Table(t) => parts.push(table_text(t).replace('\n', " ")),
            _ => {}
        }
    }
    parts.retain(|p| !p.is_empty());
    parts.join(" ")
}

// ── XLSX ─────────────────────────────────────────────────────────────────────

/// One table element per non-empty worksheet, rows in sheet order.
pub fn extract_xlsx(name: &str, bytes: &[u8]) -> Result<Vec<TextElement>, ExtractError> {
    let corrupt = |detail: String| ExtractError::Corrupt {
        name: name.to_string(),
        kind: "XLSX".into(),
        detail,
    };

    let mut workbook: Xlsx<_> =
        open_workbook_from_rs(Cursor::new(bytes)).map_err(|e| corrupt(format!("failed to open xlsx: {e}")))?;

    let mut elements = Vec::new();
    for sheet in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| corrupt(format!("sheet '{sheet}': {e}")))?;

        let lines: Vec<String> = range
            .rows()
            .map(|row| {
                row.iter()
                    .filter(|c| !matches!(c, Data::Empty))
                    .map(|c| c.to_string().trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|l| !l.is_empty())
            .collect();

        debug!("Sheet '{}': {} non-empty rows", sheet, lines.len());
        if !lines.is_empty() {
            elements.push(TextElement::new(ElementKind::Table, lines.join("\n")));
        }
    }
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, IndentLevel, NumberingId, Run, TableRow};
    use std::io::Write;

    fn pack(docx: Docx) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        docx.build().pack(&mut buf).unwrap();
        buf.into_inner()
    }

    fn para(text: &str) -> Paragraph {
        Paragraph::new().add_run(Run::new().add_text(text))
    }

    fn zip_of(files: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (path, body) in files {
            zip.start_file(*path, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn docx_paragraphs_headings_and_lists() {
        let bytes = pack(
            Docx::new()
                .add_paragraph(para("Invoice").style("Heading1"))
                .add_paragraph(
                    Paragraph::new()
                        .add_run(Run::new().add_text("Total"))
                        .add_run(Run::new().add_text(": $45.00")),
                )
                .add_paragraph(Paragraph::new())
                .add_paragraph(
                    para("Widget").numbering(NumberingId::new(1), IndentLevel::new(0)),
                ),
        );
        let els = extract_docx("inv.docx", &bytes).unwrap();
        let texts: Vec<&str> = els.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["Invoice", "Total: $45.00", "Widget"]);
        assert_eq!(els[0].kind, ElementKind::Title);
        assert_eq!(els[1].kind, ElementKind::NarrativeText);
        assert_eq!(els[2].kind, ElementKind::ListItem);
    }

    #[test]
    fn docx_table_becomes_one_element() {
        let row = |a: &str, b: &str| {
            TableRow::new(vec![
                TableCell::new().add_paragraph(para(a)),
                TableCell::new().add_paragraph(para(b)),
            ])
        };
        let bytes = pack(
            Docx::new()
                .add_table(Table::new(vec![row("Item", "Qty"), row("Bolt", "4")]))
                .add_paragraph(para("After")),
        );
        let els = extract_docx("t.docx", &bytes).unwrap();
        assert_eq!(els.len(), 2);
        assert_eq!(els[0].kind, ElementKind::Table);
        assert_eq!(els[0].text, "Item Qty\nBolt 4");
        assert_eq!(els[1].text, "After");
    }

    #[test]
    fn docx_without_body_is_corrupt() {
        let bytes = zip_of(&[("other.xml", "<x/>")]);
        assert!(matches!(
            extract_docx("empty.docx", &bytes),
            Err(ExtractError::Corrupt { ref kind, .. }) if kind == "DOCX"
        ));
    }

    #[test]
    fn non_zip_bytes_are_corrupt() {
        assert!(matches!(
            extract_docx("x.docx", b"plain text, not a zip"),
            Err(ExtractError::Corrupt { .. })
        ));
        assert!(matches!(
            extract_xlsx("x.xlsx", b"plain text, not a zip"),
            Err(ExtractError::Corrupt { .. })
        ));
    }

    const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

    fn sheet(rows: &str) -> String {
        format!(r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="{MAIN_NS}"><sheetData>{rows}</sheetData></worksheet>"#)
    }

    #[test]
    fn xlsx_one_table_per_non_empty_sheet() {
        let workbook = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="{MAIN_NS}" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>
<sheet name="Data" sheetId="1" r:id="rId1"/><sheet name="Blank" sheetId="2" r:id="rId2"/>
</sheets></workbook>"#
        );
        let rels = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
</Relationships>"#;
        let data = sheet(
            r#"<row r="1"><c r="A1" t="inlineStr"><is><t>a</t></is></c><c r="B1" t="inlineStr"><is><t>b</t></is></c></row>
<row r="2"><c r="A2"><v>1</v></c><c r="B2"><v>2</v></c></row>"#,
        );
        let blank = sheet("");
        let bytes = zip_of(&[
            ("xl/workbook.xml", &workbook),
            ("xl/_rels/workbook.xml.rels", rels),
            ("xl/worksheets/sheet1.xml", &data),
            ("xl/worksheets/sheet2.xml", &blank),
        ]);

        let els = extract_xlsx("book.xlsx", &bytes).unwrap();
        assert_eq!(els.len(), 1);
        assert_eq!(els[0].kind, ElementKind::Table);
        assert_eq!(els[0].text, "a b\n1 2");
    }
}

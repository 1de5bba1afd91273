use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use regex::Regex;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::models::MatchResult;

pub const CSV_FILE_NAME: &str = "resume_match_results.csv";
pub const XLSX_FILE_NAME: &str = "resume_match_results.xlsx";
pub const SHEET_NAME: &str = "Results";
pub const HEADER_COLUMNS: [&str; 3] = ["Job Title", "Match Score (%)", "Matched Keywords"];

const KEYWORD_SEPARATOR: &str = " | ";
const NO_KEYWORDS: &str = "None";

const SPREADSHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIP_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

// XML 1.0 forbids these even when escaped.
static XML_INVALID_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F]").unwrap());

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Number(f64),
}

pub fn format_score(score: f64) -> String {
    score.to_string()
}

pub fn format_keywords(keywords: &[String]) -> String {
    if keywords.is_empty() {
        NO_KEYWORDS.to_string()
    } else {
        keywords.join(KEYWORD_SEPARATOR)
    }
}

/// Rows shared by both export formats: title, score, keywords joined by `" | "`.
pub fn export_rows(results: &[MatchResult]) -> Vec<[String; 3]> {
    results
        .iter()
        .map(|result| {
            [
                result.title.clone(),
                format_score(result.score),
                format_keywords(&result.keywords),
            ]
        })
        .collect()
}

/// Renders the full result list as CSV. Returns `None` when there is nothing to export.
pub fn to_csv(results: &[MatchResult]) -> anyhow::Result<Option<String>> {
    if results.is_empty() {
        return Ok(None);
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(HEADER_COLUMNS)?;
    for row in export_rows(results) {
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("failed to flush CSV output: {}", err.error()))?;

    Ok(Some(String::from_utf8(bytes).context("CSV output is not UTF-8")?))
}

/// Builds a single-sheet `.xlsx` workbook. Returns `None` when there is nothing to export.
pub fn to_xlsx(results: &[MatchResult]) -> anyhow::Result<Option<Vec<u8>>> {
    if results.is_empty() {
        return Ok(None);
    }

    let mut rows: Vec<Vec<Cell>> = Vec::with_capacity(results.len() + 1);
    rows.push(
        HEADER_COLUMNS
            .iter()
            .map(|v| Cell::Text(v.to_string()))
            .collect(),
    );
    for result in results {
        let score = if result.score.is_finite() {
            Cell::Number(result.score)
        } else {
            Cell::Text(format_score(result.score))
        };
        rows.push(vec![
            Cell::Text(result.title.clone()),
            score,
            Cell::Text(format_keywords(&result.keywords)),
        ]);
    }

    let mut archive = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts: [(&str, Vec<u8>); 6] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes().to_vec()),
        ("_rels/.rels", ROOT_RELS_XML.as_bytes().to_vec()),
        ("docProps/core.xml", core_properties_xml()?),
        ("xl/workbook.xml", workbook_xml()?),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML.as_bytes().to_vec()),
        ("xl/worksheets/sheet1.xml", worksheet_xml(&rows)?),
    ];

    for (name, content) in parts {
        archive
            .start_file(name, options)
            .with_context(|| format!("failed to add {name} to workbook"))?;
        archive.write_all(&content)?;
    }

    let cursor = archive.finish().context("failed to finalize workbook")?;
    Ok(Some(cursor.into_inner()))
}

pub async fn write_csv(results: &[MatchResult], dir: &Path) -> anyhow::Result<Option<PathBuf>> {
    match to_csv(results)? {
        Some(content) => write_export(dir, CSV_FILE_NAME, content.into_bytes())
            .await
            .map(Some),
        None => Ok(None),
    }
}

pub async fn write_xlsx(results: &[MatchResult], dir: &Path) -> anyhow::Result<Option<PathBuf>> {
    match to_xlsx(results)? {
        Some(content) => write_export(dir, XLSX_FILE_NAME, content).await.map(Some),
        None => Ok(None),
    }
}

async fn write_export(dir: &Path, file_name: &str, content: Vec<u8>) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create export dir {}", dir.display()))?;

    let path = dir.join(file_name);
    tokio::fs::write(&path, content)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

fn xml_writer() -> anyhow::Result<Writer<Cursor<Vec<u8>>>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new(
        "1.0",
        Some("UTF-8"),
        Some("yes"),
    )))?;
    Ok(writer)
}

fn workbook_xml() -> anyhow::Result<Vec<u8>> {
    let mut writer = xml_writer()?;
    writer.write_event(Event::Start(
        BytesStart::new("workbook")
            .with_attributes([("xmlns", SPREADSHEET_NS), ("xmlns:r", RELATIONSHIP_NS)]),
    ))?;
    writer.write_event(Event::Start(BytesStart::new("sheets")))?;
    writer.write_event(Event::Empty(BytesStart::new("sheet").with_attributes([
        ("name", SHEET_NAME),
        ("sheetId", "1"),
        ("r:id", "rId1"),
    ])))?;
    writer.write_event(Event::End(BytesEnd::new("sheets")))?;
    writer.write_event(Event::End(BytesEnd::new("workbook")))?;
    Ok(writer.into_inner().into_inner())
}

fn core_properties_xml() -> anyhow::Result<Vec<u8>> {
    let created = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut writer = xml_writer()?;
    writer.write_event(Event::Start(
        BytesStart::new("cp:coreProperties").with_attributes([
            (
                "xmlns:cp",
                "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
            ),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ("xmlns:dcterms", "http://purl.org/dc/terms/"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
        ]),
    ))?;

    writer.write_event(Event::Start(BytesStart::new("dc:title")))?;
    writer.write_event(Event::Text(BytesText::new("Resume Match Results")))?;
    writer.write_event(Event::End(BytesEnd::new("dc:title")))?;

    writer.write_event(Event::Start(
        BytesStart::new("dcterms:created").with_attributes([("xsi:type", "dcterms:W3CDTF")]),
    ))?;
    writer.write_event(Event::Text(BytesText::new(&created)))?;
    writer.write_event(Event::End(BytesEnd::new("dcterms:created")))?;

    writer.write_event(Event::End(BytesEnd::new("cp:coreProperties")))?;
    Ok(writer.into_inner().into_inner())
}

fn worksheet_xml(rows: &[Vec<Cell>]) -> anyhow::Result<Vec<u8>> {
    let mut writer = xml_writer()?;
    writer.write_event(Event::Start(
        BytesStart::new("worksheet")
            .with_attributes([("xmlns", SPREADSHEET_NS), ("xmlns:r", RELATIONSHIP_NS)]),
    ))?;
    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;

    for (row_index, row) in rows.iter().enumerate() {
        let row_number = (row_index + 1).to_string();
        writer.write_event(Event::Start(
            BytesStart::new("row").with_attributes([("r", row_number.as_str())]),
        ))?;

        for (column_index, cell) in row.iter().enumerate() {
            let reference = format!("{}{row_number}", column_name(column_index));
            match cell {
                Cell::Text(value) => {
                    let value = XML_INVALID_CHARS.replace_all(value, "");
                    writer.write_event(Event::Start(BytesStart::new("c").with_attributes([
                        ("r", reference.as_str()),
                        ("t", "inlineStr"),
                    ])))?;
                    writer.write_event(Event::Start(BytesStart::new("is")))?;
                    writer.write_event(Event::Start(
                        BytesStart::new("t").with_attributes([("xml:space", "preserve")]),
                    ))?;
                    writer.write_event(Event::Text(BytesText::new(&value)))?;
                    writer.write_event(Event::End(BytesEnd::new("t")))?;
                    writer.write_event(Event::End(BytesEnd::new("is")))?;
                    writer.write_event(Event::End(BytesEnd::new("c")))?;
                }
                Cell::Number(value) => {
                    writer.write_event(Event::Start(
                        BytesStart::new("c").with_attributes([("r", reference.as_str())]),
                    ))?;
                    writer.write_event(Event::Start(BytesStart::new("v")))?;
                    writer.write_event(Event::Text(BytesText::new(&value.to_string())))?;
                    writer.write_event(Event::End(BytesEnd::new("v")))?;
                    writer.write_event(Event::End(BytesEnd::new("c")))?;
                }
            }
        }

        writer.write_event(Event::End(BytesEnd::new("row")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
    writer.write_event(Event::End(BytesEnd::new("worksheet")))?;
    Ok(writer.into_inner().into_inner())
}

fn column_name(index: usize) -> String {
    let mut name = String::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        name.insert(0, (b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    name
}

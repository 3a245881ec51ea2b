use std::io::{Cursor, Read};

use anyhow::Context;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};

use super::document_parser::{file_extension, push_entity};
use super::errors::CoreError;
use super::models::SpreadsheetUpload;

/// One data row mapped onto candidate fields. `row` is 1-based and counts
/// data rows only, so the header is row 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpreadsheetRow {
    pub row: usize,
    pub name: String,
    pub title: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub summary: String,
    pub experience: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Title,
    Email,
    Phone,
    Location,
    Skills,
    Summary,
    Experience,
}

fn field_for_header(header: &str) -> Option<Field> {
    let normalized = header
        .trim()
        .to_ascii_lowercase()
        .replace(['_', '-'], " ");
    let field = match normalized.as_str() {
        "name" | "full name" | "candidate" | "candidate name" => Field::Name,
        "title" | "position" | "role" | "job title" => Field::Title,
        "email" | "e mail" | "email address" => Field::Email,
        "phone" | "mobile" | "phone number" => Field::Phone,
        "location" | "city" => Field::Location,
        "skills" | "skill" => Field::Skills,
        "summary" | "bio" => Field::Summary,
        "experience" | "years" | "years of experience" => Field::Experience,
        _ => return None,
    };
    Some(field)
}

pub fn read_rows(upload: &SpreadsheetUpload) -> anyhow::Result<Vec<SpreadsheetRow>> {
    let table = match file_extension(&upload.file_name).as_str() {
        "csv" => read_csv_table(&upload.bytes)
            .with_context(|| format!("failed to read CSV {}", upload.file_name))?,
        "xlsx" => read_xlsx_table(&upload.bytes)
            .with_context(|| format!("failed to read XLSX {}", upload.file_name))?,
        _ => {
            return Err(CoreError::UnsupportedFile(format!(
                "{} (spreadsheets must be .csv or .xlsx; save .xls workbooks as .xlsx)",
                upload.file_name
            ))
            .into())
        }
    };

    let rows = rows_from_table(table)?;
    debug!(file_name = %upload.file_name, rows = rows.len(), "read spreadsheet");
    Ok(rows)
}

/// The first non-blank line is the header; data rows are numbered from it.
fn rows_from_table(table: Vec<Vec<String>>) -> anyhow::Result<Vec<SpreadsheetRow>> {
    let mut lines = table.into_iter().skip_while(|cells| is_blank(cells));
    let header = lines
        .next()
        .ok_or_else(|| CoreError::Spreadsheet("spreadsheet is empty".to_string()))?;

    let columns: Vec<Option<Field>> = header.iter().map(|h| field_for_header(h)).collect();
    if columns.iter().all(Option::is_none) {
        return Err(CoreError::Spreadsheet(format!(
            "no recognised columns in header: {}",
            header.join(", ")
        ))
        .into());
    }
    if !columns.contains(&Some(Field::Name)) {
        warn!("spreadsheet has no name column, rows will get placeholder names");
    }

    let mut rows = Vec::new();
    for (index, cells) in lines.enumerate() {
        if is_blank(&cells) {
            continue;
        }

        let mut row = SpreadsheetRow {
            row: index + 1,
            ..Default::default()
        };
        for (field, cell) in columns.iter().zip(cells.iter()) {
            let value = cell.trim();
            if value.is_empty() {
                continue;
            }
            match field {
                Some(Field::Name) => fill(&mut row.name, value),
                Some(Field::Title) => fill(&mut row.title, value),
                Some(Field::Email) => fill_opt(&mut row.email, value),
                Some(Field::Phone) => fill_opt(&mut row.phone, value),
                Some(Field::Location) => fill_opt(&mut row.location, value),
                Some(Field::Skills) => row.skills.extend(split_skills(value)),
                Some(Field::Summary) => fill(&mut row.summary, value),
                Some(Field::Experience) => fill(&mut row.experience, value),
                None => {}
            }
        }

        if row.name.is_empty() {
            row.name = format!("Candidate {}", row.row);
        }
        rows.push(row);
    }

    Ok(rows)
}

fn is_blank(cells: &[String]) -> bool {
    cells.iter().all(|cell| cell.trim().is_empty())
}

// First non-empty column wins when two headers alias the same field.
fn fill(target: &mut String, value: &str) {
    if target.is_empty() {
        *target = value.to_string();
    }
}

fn fill_opt(target: &mut Option<String>, value: &str) {
    if target.is_none() {
        *target = Some(value.to_string());
    }
}

pub fn split_skills(value: &str) -> Vec<String> {
    value
        .split([',', ';', '|'])
        .map(str::trim)
        .filter(|skill| !skill.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_csv_table(data: &[u8]) -> anyhow::Result<Vec<Vec<String>>> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut table = Vec::new();
    for record in reader.records() {
        let record = record?;
        table.push(record.iter().map(str::to_string).collect());
    }
    Ok(table)
}

fn read_xlsx_table(data: &[u8]) -> anyhow::Result<Vec<Vec<String>>> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(data)).context("file is not an XLSX archive")?;

    let shared_strings = match archive.by_name("xl/sharedStrings.xml") {
        Ok(mut file) => {
            let mut xml = String::new();
            file.read_to_string(&mut xml)?;
            parse_shared_strings(&xml)?
        }
        Err(zip::result::ZipError::FileNotFound) => Vec::new(),
        Err(err) => return Err(err.into()),
    };

    let sheet_path = first_worksheet(archive.file_names())
        .ok_or_else(|| CoreError::Spreadsheet("workbook has no worksheets".to_string()))?;

    let mut xml = String::new();
    archive.by_name(&sheet_path)?.read_to_string(&mut xml)?;
    parse_sheet(&xml, &shared_strings)
}

fn first_worksheet<'a>(names: impl Iterator<Item = &'a str>) -> Option<String> {
    names
        .filter_map(|name| {
            let number = name
                .strip_prefix("xl/worksheets/sheet")?
                .strip_suffix(".xml")?
                .parse::<u32>()
                .ok()?;
            Some((number, name))
        })
        .min_by_key(|(number, _)| *number)
        .map(|(_, name)| name.to_string())
}

fn parse_shared_strings(xml: &str) -> anyhow::Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Empty(e) if e.name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(e) if in_text => current.push_str(&e.xml_content()?),
            Event::GeneralRef(e) if in_text => push_entity(&mut current, &e)?,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(strings)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellType {
    SharedString,
    Other,
}

fn parse_sheet(xml: &str, shared_strings: &[String]) -> anyhow::Result<Vec<Vec<String>>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut current_row: Vec<String> = Vec::new();
    let mut cell_column = 0usize;
    let mut cell_type = CellType::Other;
    let mut cell_value = String::new();
    let mut in_value = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"row" => {
                    if let Some(number) = attribute(&e, b"r")?.and_then(|r| r.parse::<usize>().ok()) {
                        // Rows with no cells are omitted from the XML.
                        while rows.len() + 1 < number {
                            rows.push(Vec::new());
                        }
                    }
                    current_row.clear();
                }
                b"c" => {
                    cell_column = attribute(&e, b"r")?
                        .and_then(|r| column_index(&r))
                        .unwrap_or(current_row.len());
                    cell_type = match attribute(&e, b"t")?.as_deref() {
                        Some("s") => CellType::SharedString,
                        _ => CellType::Other,
                    };
                    cell_value.clear();
                }
                b"v" | b"t" => in_value = true,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"row" => rows.push(std::mem::take(&mut current_row)),
                b"c" => {
                    let value = match cell_type {
                        CellType::SharedString => {
                            let index: usize = cell_value.trim().parse().map_err(|_| {
                                CoreError::Spreadsheet(format!(
                                    "invalid shared string index {cell_value:?}"
                                ))
                            })?;
                            shared_strings.get(index).cloned().ok_or_else(|| {
                                CoreError::Spreadsheet(format!(
                                    "shared string index {index} out of range"
                                ))
                            })?
                        }
                        CellType::Other => cell_value.clone(),
                    };
                    if current_row.len() <= cell_column {
                        current_row.resize(cell_column + 1, String::new());
                    }
                    current_row[cell_column] = value;
                }
                b"v" | b"t" => in_value = false,
                _ => {}
            },
            Event::Empty(e) if e.name().as_ref() == b"row" => rows.push(Vec::new()),
            Event::Text(e) if in_value => cell_value.push_str(&e.xml_content()?),
            Event::GeneralRef(e) if in_value => push_entity(&mut cell_value, &e)?,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rows)
}

fn attribute(
    element: &quick_xml::events::BytesStart<'_>,
    key: &[u8],
) -> anyhow::Result<Option<String>> {
    Ok(element
        .try_get_attribute(key)?
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned()))
}

/// Zero-based column of an A1-style reference ("C7" -> 2).
fn column_index(reference: &str) -> Option<usize> {
    let letters: Vec<u8> = reference
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .map(|b| b.to_ascii_uppercase())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let column = letters
        .iter()
        .fold(0usize, |acc, b| acc * 26 + usize::from(b - b'A' + 1));
    Some(column - 1)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn csv_upload(body: &str) -> SpreadsheetUpload {
        SpreadsheetUpload {
            file_name: "candidates.csv".to_string(),
            bytes: body.as_bytes().to_vec(),
        }
    }

    fn xlsx_upload(shared: &str, sheet: &str) -> SpreadsheetUpload {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        writer.start_file("xl/sharedStrings.xml", options).unwrap();
        writer.write_all(shared.as_bytes()).unwrap();
        writer.start_file("xl/worksheets/sheet1.xml", options).unwrap();
        writer.write_all(sheet.as_bytes()).unwrap();
        SpreadsheetUpload {
            file_name: "candidates.xlsx".to_string(),
            bytes: writer.finish().unwrap().into_inner(),
        }
    }

    #[test]
    fn csv_headers_are_matched_by_alias() {
        let upload = csv_upload(
            "\u{feff}Full Name,Position,E-mail,Mobile,City,Skills,Bio,Years\n\
             Sarah Chen,Senior React Developer,sarah@example.com,+1-555-0123,\"San Francisco, CA\",\"React; TypeScript | Node.js\",Frontend lead,5 years\n",
        );

        let rows = read_rows(&upload).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.row, 1);
        assert_eq!(row.name, "Sarah Chen");
        assert_eq!(row.title, "Senior React Developer");
        assert_eq!(row.email.as_deref(), Some("sarah@example.com"));
        assert_eq!(row.location.as_deref(), Some("San Francisco, CA"));
        assert_eq!(row.skills, vec!["React", "TypeScript", "Node.js"]);
        assert_eq!(row.summary, "Frontend lead");
        assert_eq!(row.experience, "5 years");
    }

    #[test]
    fn every_row_gets_a_name_and_blank_rows_are_skipped() {
        let upload = csv_upload("name,title\nAda,Engineer\n,,\n,Designer\n");

        let rows = read_rows(&upload).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Ada");
        assert_eq!(rows[1].name, "Candidate 3");
        assert_eq!(rows[1].title, "Designer");
    }

    #[test]
    fn unrecognised_header_is_a_spreadsheet_error() {
        let err = read_rows(&csv_upload("foo,bar\n1,2\n")).unwrap_err();
        assert!(err.to_string().contains("no recognised columns"));
    }

    #[test]
    fn empty_csv_is_rejected() {
        let err = read_rows(&csv_upload("")).unwrap_err();
        assert!(err.to_string().contains("spreadsheet is empty"));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let upload = SpreadsheetUpload {
            file_name: "candidates.ods".to_string(),
            bytes: Vec::new(),
        };
        assert!(read_rows(&upload)
            .unwrap_err()
            .to_string()
            .contains("Unsupported file type"));
    }

    #[test]
    fn legacy_xls_error_names_the_supported_formats() {
        let upload = SpreadsheetUpload {
            file_name: "People.xls".to_string(),
            bytes: b"\xd0\xcf\x11\xe0".to_vec(),
        };
        let message = read_rows(&upload).unwrap_err().to_string();

        assert!(message.contains("People.xls"));
        assert!(message.contains(".csv or .xlsx"));
    }

    #[test]
    fn csv_leading_blank_lines_are_skipped() {
        let rows = read_rows(&csv_upload(",,
name,title
Ada,Engineer
")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row, 1);
        assert_eq!(rows[0].name, "Ada");
    }

    #[test]
    fn xlsx_header_below_a_blank_first_row_is_found() {
        let shared = r#"<sst><si><t>Name</t></si><si><t>Title</t></si><si><t>Priya Shah</t></si><si><t>Data Engineer</t></si></sst>"#;
        let sheet = r#"<worksheet><sheetData>
            <row r="2"><c r="A2" t="s"><v>0</v></c><c r="B2" t="s"><v>1</v></c></row>
            <row r="3"><c r="A3" t="s"><v>2</v></c><c r="B3" t="s"><v>3</v></c></row>
        </sheetData></worksheet>"#;

        let rows = read_rows(&xlsx_upload(shared, sheet)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row, 1);
        assert_eq!(rows[0].name, "Priya Shah");
        assert_eq!(rows[0].title, "Data Engineer");
    }

    #[test]
    fn xlsx_shared_and_inline_strings_are_read() {
        let shared = r#"<sst><si><t>Name</t></si><si><t>Skills</t></si><si><t>Marcus &amp; Co</t></si><si/></sst>"#;
        let sheet = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="inlineStr"><is><t>Experience</t></is></c></row>
            <row r="3"><c r="A3" t="s"><v>2</v></c><c r="B3" t="inlineStr"><is><t>Python, Django</t></is></c><c r="C3"><v>4</v></c></row>
        </sheetData></worksheet>"#;

        let rows = read_rows(&xlsx_upload(shared, sheet)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row, 2);
        assert_eq!(rows[0].name, "Marcus & Co");
        assert_eq!(rows[0].skills, vec!["Python", "Django"]);
        assert_eq!(rows[0].experience, "4");
    }

    #[test]
    fn column_references_decode() {
        assert_eq!(column_index("A1"), Some(0));
        assert_eq!(column_index("C7"), Some(2));
        assert_eq!(column_index("AA10"), Some(26));
        assert_eq!(column_index("12"), None);
    }
}

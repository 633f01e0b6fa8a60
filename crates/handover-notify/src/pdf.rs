//! Minimal PDF writer for booking confirmations, statements of account and
//! no-objection certificates.
//!
//! Documents are A4, single column, Helvetica, with a title, key/value
//! lines and a footer. Long documents continue on further pages.

use crate::error::Result;
use chrono::{DateTime, Utc};
use handover_db::{Booking, FinanceNoc, FinancePenalty, FinanceSoa, Property, Unit, UnitOwner};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 56;
const LINE_HEIGHT: i64 = 16;
const VALUE_COLUMN: i64 = 220;
/// Characters per line of 10pt Helvetica across the full text width.
const TEXT_WRAP: usize = 90;
/// Characters per line in the value column.
const FIELD_WRAP: usize = 60;

#[derive(Debug, Clone, PartialEq)]
enum Line {
    Heading(String),
    Field(String, String),
    Text(String),
    Blank,
}

/// Builder for a simple text PDF.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    title: String,
    lines: Vec<Line>,
    footer: Option<String>,
}

impl PdfDocument {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), lines: Vec::new(), footer: None }
    }

    pub fn heading(mut self, text: impl Into<String>) -> Self {
        self.lines.push(Line::Blank);
        self.lines.push(Line::Heading(text.into()));
        self
    }

    /// Long values continue on following lines under the value column.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut key = key.into();
        for chunk in wrap(&value.into(), FIELD_WRAP) {
            self.lines.push(Line::Field(std::mem::take(&mut key), chunk));
        }
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        for chunk in wrap(&text.into(), TEXT_WRAP) {
            self.lines.push(Line::Text(chunk));
        }
        self
    }

    pub fn blank(mut self) -> Self {
        self.lines.push(Line::Blank);
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(text.into());
        self
    }

    fn lines_per_page() -> usize {
        // title block takes three lines, footer one
        ((PAGE_HEIGHT - 2 * MARGIN) / LINE_HEIGHT - 4) as usize
    }

    /// Lay out and serialize the document.
    pub fn render(&self) -> Result<Vec<u8>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let regular = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let bold = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => regular, "F2" => bold },
        });

        let chunks: Vec<&[Line]> = if self.lines.is_empty() {
            vec![&self.lines[..]]
        } else {
            self.lines.chunks(Self::lines_per_page()).collect()
        };
        let page_count = chunks.len();

        let mut kids = Vec::with_capacity(page_count);
        for (index, lines) in chunks.into_iter().enumerate() {
            let content = self.page_content(lines, index + 1, page_count);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(page_count as i64),
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }

    fn page_content(&self, lines: &[Line], page: usize, pages: usize) -> Content {
        let mut ops = Vec::new();
        let mut y = PAGE_HEIGHT - MARGIN;

        write_text(&mut ops, "F2", 18, MARGIN, y, &self.title);
        y -= LINE_HEIGHT * 3;

        for line in lines {
            match line {
                Line::Heading(text) => write_text(&mut ops, "F2", 12, MARGIN, y, text),
                Line::Field(key, value) => {
                    write_text(&mut ops, "F2", 10, MARGIN, y, key);
                    write_text(&mut ops, "F1", 10, VALUE_COLUMN, y, value);
                }
                Line::Text(text) => write_text(&mut ops, "F1", 10, MARGIN, y, text),
                Line::Blank => {}
            }
            y -= LINE_HEIGHT;
        }

        let footer = match &self.footer {
            Some(text) => format!("{}    Page {} of {}", text, page, pages),
            None => format!("Page {} of {}", page, pages),
        };
        write_text(&mut ops, "F1", 8, MARGIN, MARGIN / 2, &footer);

        Content { operations: ops }
    }
}

/// Greedy word wrap. Words longer than `width` are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        let len = word.chars().count();
        if !current.is_empty() && current.chars().count() + 1 + len > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn write_text(ops: &mut Vec<Operation>, font: &str, size: i64, x: i64, y: i64, text: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![Object::Name(font.as_bytes().to_vec()), Object::Integer(size)]));
    ops.push(Operation::new("Td", vec![Object::Integer(x), Object::Integer(y)]));
    ops.push(Operation::new("Tj", vec![Object::string_literal(winansi(text))]));
    ops.push(Operation::new("ET", vec![]));
}

/// The standard fonts only cover Latin-1; anything else is replaced.
fn winansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7e | 0xa0..=0xff => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

/// Format minor units as `CUR 1,234.56`.
pub fn format_money(cents: i64, currency: &str) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let major = (abs / 100).to_string();
    let mut grouped = String::with_capacity(major.len() + major.len() / 3);
    for (i, ch) in major.chars().enumerate() {
        if i > 0 && (major.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{} {}.{:02}", sign, currency, grouped, abs % 100)
}

fn stamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn owner_names(owners: &[UnitOwner]) -> String {
    owners.iter().map(|o| o.name.as_str()).collect::<Vec<_>>().join(", ")
}

// =============================================================================
// Documents
// =============================================================================

pub fn booking_confirmation(
    property: &Property,
    unit: &Unit,
    booking: &Booking,
    owners: &[UnitOwner],
) -> Result<Vec<u8>> {
    let mut doc = PdfDocument::new("Handover Appointment Confirmation")
        .field("Reference", booking.id.to_string())
        .field("Property", &property.name)
        .field("Developer", &property.developer_name)
        .field("Unit", &unit.unit_number)
        .field("Owners", owner_names(owners))
        .heading("Appointment")
        .field("Date", booking.booking_date.format("%A %d %B %Y").to_string())
        .field("Time", booking.slot_time.format("%H:%M").to_string());
    if let Some(location) = &property.location {
        doc = doc.field("Location", location);
    }
    if let Some(notes) = booking.notes.as_deref().filter(|n| !n.is_empty()) {
        doc = doc.heading("Notes");
        for line in notes.lines() {
            doc = doc.text(line);
        }
    }
    doc.blank()
        .text("Please bring a valid photo ID for every owner attending.")
        .footer(format!("Issued {}", stamp(booking.created_at)))
        .render()
}

pub fn statement_of_account(
    property: &Property,
    unit: &Unit,
    soa: &FinanceSoa,
    penalties: &[FinancePenalty],
    currency: &str,
) -> Result<Vec<u8>> {
    let mut doc = PdfDocument::new("Statement of Account")
        .field("Reference", soa.id.to_string())
        .field("Property", &property.name)
        .field("Unit", &unit.unit_number)
        .heading("Summary")
        .field("Total due", format_money(soa.total_due_cents, currency))
        .field("Total paid", format_money(soa.total_paid_cents, currency))
        .field("Balance", format_money(soa.balance_cents(), currency));

    let open: Vec<&FinancePenalty> = penalties.iter().filter(|p| !p.waived).collect();
    if !open.is_empty() {
        doc = doc.heading("Outstanding penalties");
        for penalty in &open {
            doc = doc.field(format_money(penalty.amount_cents, currency), &penalty.reason);
        }
        let total: i64 = open.iter().map(|p| p.amount_cents).sum();
        doc = doc.field("Penalties total", format_money(total, currency));
    }

    doc.footer(format!("Generated {} by {}", stamp(soa.created_at), soa.generated_by))
        .render()
}

pub fn noc(
    property: &Property,
    unit: &Unit,
    owners: &[UnitOwner],
    certificate: &FinanceNoc,
) -> Result<Vec<u8>> {
    PdfDocument::new("No-Objection Certificate")
        .field("Reference", certificate.id.to_string())
        .field("Property", &property.name)
        .field("Developer", &property.developer_name)
        .field("Unit", &unit.unit_number)
        .field("Owners", owner_names(owners))
        .blank()
        .text(format!(
            "{} has no objection to the handover of unit {} to the owners named above.",
            property.developer_name, unit.unit_number
        ))
        .text("All payments due on the unit have been cleared and no penalties are outstanding.")
        .footer(format!("Issued {} by {}", stamp(certificate.created_at), certificate.issued_by))
        .render()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_text(bytes: &[u8]) -> (usize, String) {
        let doc = Document::load_mem(bytes).unwrap();
        let pages = doc.get_pages();
        let mut text = String::new();
        for page_id in pages.values() {
            let content = Content::decode(&doc.get_page_content(*page_id).unwrap()).unwrap();
            for op in content.operations.iter().filter(|op| op.operator == "Tj") {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    text.push_str(&String::from_utf8_lossy(bytes));
                    text.push('\n');
                }
            }
        }
        (pages.len(), text)
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(0, "AED"), "AED 0.00");
        assert_eq!(format_money(123_456_78, "AED"), "AED 123,456.78");
        assert_eq!(format_money(-1_000_00, "USD"), "-USD 1,000.00");
        assert_eq!(format_money(99, "EUR"), "EUR 0.99");
    }

    #[test]
    fn test_render_single_page() {
        let bytes = PdfDocument::new("Title draft")
            .field("Unit", "A-101")
            .text("café")
            .footer("footer")
            .render()
            .unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let (pages, text) = page_text(&bytes);
        assert_eq!(pages, 1);
        assert!(text.contains("Title draft"));
        assert!(text.contains("A-101"));
        assert!(text.contains("Page 1 of 1"));
    }

    #[test]
    fn test_long_documents_paginate() {
        let mut doc = PdfDocument::new("Long");
        for i in 0..120 {
            doc = doc.text(format!("line {}", i));
        }
        let (pages, text) = page_text(&doc.render().unwrap());
        assert!(pages > 1);
        assert!(text.contains("line 119"));
        assert!(text.contains(&format!("Page {} of {}", pages, pages)));
    }

    #[test]
    fn test_empty_document_has_one_page() {
        let (pages, _) = page_text(&PdfDocument::new("Empty").render().unwrap());
        assert_eq!(pages, 1);
    }

    #[test]
    fn test_wrap_breaks_on_words() {
        assert_eq!(wrap("", 10), vec![""]);
        assert_eq!(wrap("keys at the desk", 10), vec!["keys at", "the desk"]);
        assert_eq!(wrap("abcdefghijkl", 5), vec!["abcde", "fghij", "kl"]);
        assert_eq!(wrap("ok abcdefgh", 5), vec!["ok", "abcde", "fgh"]);
    }

    #[test]
    fn test_long_values_stay_inside_the_margin() {
        let note = "Please bring the original sale agreement and a copy of each passport. ".repeat(4);
        let doc = PdfDocument::new("Wrapped").field("Notes", note.clone()).text(note);
        assert!(doc.lines.len() > 2);
        for line in &doc.lines {
            match line {
                Line::Field(_, value) => assert!(value.chars().count() <= FIELD_WRAP),
                Line::Text(text) => assert!(text.chars().count() <= TEXT_WRAP),
                _ => {}
            }
        }
        // the key is printed once
        let keys: Vec<_> = doc
            .lines
            .iter()
            .filter_map(|l| match l {
                Line::Field(key, _) if !key.is_empty() => Some(key.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(keys, vec!["Notes"]);
        assert!(doc.render().unwrap().starts_with(b"%PDF"));
    }
}

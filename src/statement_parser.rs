//! Generic bank statement CSV parsing.
//!
//! Columns are located by header name rather than position, so exports from
//! different banks go through the same path. Amounts follow the Brazilian
//! convention (`1.234,56`).

use anyhow::{Result, bail};
use time::{Date, Month};

use crate::utils::round_money;

const DATE_HEADERS: &[&str] = &["data", "date", "dt"];
const DESCRIPTION_HEADERS: &[&str] = &[
    "descricao",
    "descrição",
    "historico",
    "histórico",
    "description",
];
const VALUE_HEADERS: &[&str] = &["valor", "value", "amount"];
const DEBIT_HEADERS: &[&str] = &["debito", "débito", "debit", "saida", "saída"];
const CREDIT_HEADERS: &[&str] = &["credito", "crédito", "credit", "entrada"];

const BANK_MARKERS: &[(&str, &str)] = &[
    ("nubank", "nubank"),
    ("inter", "inter"),
    ("itau", "itau"),
    ("itaú", "itau"),
    ("bradesco", "bradesco"),
    ("santander", "santander"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub date: Date,
    pub description: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatement {
    pub bank_name: String,
    pub rows: Vec<ParsedRow>,
}

impl ParsedStatement {
    pub fn period(&self) -> (Option<Date>, Option<Date>) {
        (
            self.rows.iter().map(|r| r.date).min(),
            self.rows.iter().map(|r| r.date).max(),
        )
    }
}

#[derive(Debug, Clone, Copy)]
enum AmountColumns {
    Single(usize),
    Split { debit: usize, credit: usize },
}

/// UTF-8 first; anything else is read as Latin-1, which every byte sequence satisfies.
pub fn decode(bytes: &[u8]) -> String {
    let text = match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    };
    text.trim_start_matches('\u{feff}').to_string()
}

pub fn detect_bank(content: &str) -> String {
    let head: String = content.chars().take(500).collect::<String>().to_lowercase();
    BANK_MARKERS
        .iter()
        .find(|(marker, _)| head.contains(marker))
        .map(|(_, bank)| bank.to_string())
        .unwrap_or_else(|| "generic".to_string())
}

fn find_column(headers: &[String], names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|name| h.contains(name)))
}

fn sniff_delimiter(content: &str) -> u8 {
    let first_line = content.lines().next().unwrap_or_default();
    if first_line.matches(';').count() > first_line.matches(',').count() {
        b';'
    } else {
        b','
    }
}

pub fn parse_date(raw: &str) -> Option<Date> {
    let token = raw.split_whitespace().next()?;
    let separator = if token.contains('/') { '/' } else { '-' };
    let parts: Vec<&str> = token.split(separator).collect();
    let [a, b, c] = parts.as_slice() else {
        return None;
    };
    if [a, b, c].iter().any(|p| p.is_empty() || !p.chars().all(|ch| ch.is_ascii_digit())) {
        return None;
    }

    let (year, month, day) = if a.len() == 4 {
        (a.parse::<i32>().ok()?, b.parse::<u8>().ok()?, c.parse::<u8>().ok()?)
    } else {
        let year = match c.len() {
            4 => c.parse::<i32>().ok()?,
            // Two-digit years pivot at 69 like strptime's %y
            2 => {
                let yy = c.parse::<i32>().ok()?;
                if yy < 69 { 2000 + yy } else { 1900 + yy }
            }
            _ => return None,
        };
        (year, b.parse::<u8>().ok()?, a.parse::<u8>().ok()?)
    };

    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}

/// Unparsable input yields 0.0, which callers treat as "no amount".
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned = raw.replace("R$", "").replace('$', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || matches!(cleaned.to_lowercase().as_str(), "nan" | "none") {
        return 0.0;
    }

    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        // A lone dot followed by one or two digits is a decimal point
        match cleaned.rsplit_once('.') {
            Some((head, tail))
                if !head.contains('.') && (1..=2).contains(&tail.len()) =>
            {
                cleaned.to_string()
            }
            _ => cleaned.replace('.', ""),
        }
    };

    let digits: String = normalized
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '.')
        .collect();
    digits.parse::<f64>().map(round_money).unwrap_or(0.0)
}

pub fn parse_csv(bytes: &[u8]) -> Result<ParsedStatement> {
    let content = decode(bytes);
    let bank_name = detect_bank(&content);

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(&content))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let Some(date_col) = find_column(&headers, DATE_HEADERS) else {
        bail!("Could not find a date column");
    };
    let Some(desc_col) = find_column(&headers, DESCRIPTION_HEADERS) else {
        bail!("Could not find a description column");
    };
    let amounts = match find_column(&headers, VALUE_HEADERS) {
        Some(col) => AmountColumns::Single(col),
        None => match (
            find_column(&headers, DEBIT_HEADERS),
            find_column(&headers, CREDIT_HEADERS),
        ) {
            (Some(debit), Some(credit)) => AmountColumns::Split { debit, credit },
            _ => bail!("Could not find an amount column"),
        },
    };

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let Ok(record) = result else {
            skipped += 1;
            continue;
        };
        let field = |idx: usize| record.get(idx).unwrap_or_default();

        let Some(date) = parse_date(field(date_col)) else {
            skipped += 1;
            continue;
        };
        let description = field(desc_col).trim().to_string();
        let amount = match amounts {
            AmountColumns::Single(col) => parse_amount(field(col)),
            AmountColumns::Split { debit, credit } => {
                round_money(parse_amount(field(credit)) - parse_amount(field(debit)).abs())
            }
        };

        if description.is_empty() || amount == 0.0 {
            skipped += 1;
            continue;
        }
        rows.push(ParsedRow {
            date,
            description,
            amount,
        });
    }

    tracing::debug!(bank = %bank_name, parsed = rows.len(), skipped, "parsed statement");
    Ok(ParsedStatement { bank_name, rows })
}

use num_format::{Locale, ToFormattedString as _};
use time::Date;

/// pt-BR currency: `R$ 1.234,56`, negatives as `-R$ 10,00`.
pub fn format_brl(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as i64;
    let whole = (cents / 100).to_formatted_string(&Locale::pt);
    let sign = if amount < 0.0 && cents != 0 { "-" } else { "" };
    format!("{}R$ {},{:02}", sign, whole, cents % 100)
}

pub fn format_date(date: Date) -> String {
    format!(
        "{:02}/{:02}/{:04}",
        date.day(),
        u8::from(date.month()),
        date.year()
    )
}

/// Accepts `150`, `150.5` and the pt-BR `1.234,56`. Blank input is `None`.
pub fn parse_money_input(raw: &str) -> Option<Result<f64, String>> {
    let trimmed = raw.trim().trim_start_matches("R$").trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };
    Some(
        normalized
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("Valor inválido: {}", raw.trim())),
    )
}

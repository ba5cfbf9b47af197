use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use rand::Rng;
use rand::seq::IndexedRandom;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use epmforge_core::{CellValue, Frame, GenerationSettings, round2};

use crate::errors::GenerationError;

const REGIONS: [&str; 4] = ["North", "South", "East", "West"];
const FIRST_NAMES: [&str; 10] = [
    "John", "Jane", "Alex", "Emily", "Chris", "Olivia", "Michael", "Sophia", "David", "Emma",
];
const LAST_NAMES: [&str; 10] = [
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Martinez",
    "Wilson",
];
const EMAIL_DOMAINS: [&str; 3] = ["example.com", "test.com", "mail.com"];
const CATEGORIES: [&str; 4] = ["A", "B", "C", "D"];

/// Fill base measures with uniform draws: [500, 5000] when a pattern tag is
/// declared for the measure, [100, 10000] otherwise, rounded to 2 decimals.
pub fn fill_base_measures(
    frame: &mut Frame,
    base_measures: &BTreeSet<String>,
    settings: &GenerationSettings,
    rng: &mut ChaCha8Rng,
) -> Result<(), GenerationError> {
    for measure in base_measures {
        let (low, high) = if settings.has_pattern(measure) {
            (500.0, 5000.0)
        } else {
            (100.0, 10000.0)
        };
        let values = (0..frame.num_rows())
            .map(|_| CellValue::Number(round2(rng.random_range(low..=high))))
            .collect();
        frame.set_column(measure, values)?;
    }
    Ok(())
}

/// Column families inferred from header names in header-only mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderKind {
    Date,
    Amount,
    Region,
    Sku,
    PersonName,
    TransactionId,
    Email,
    Phone,
    Category,
}

/// First matching substring wins, checked in this order.
fn infer_kind(header: &str) -> HeaderKind {
    let name = header.to_lowercase();
    let matches_any = |needles: &[&str]| needles.iter().any(|needle| name.contains(needle));

    if matches_any(&["date", "period", "month", "year"]) {
        HeaderKind::Date
    } else if matches_any(&["price", "value", "amount", "cost", "revenue", "volume"]) {
        HeaderKind::Amount
    } else if matches_any(&["region", "area", "zone"]) {
        HeaderKind::Region
    } else if matches_any(&["sku", "product", "item"]) {
        HeaderKind::Sku
    } else if matches_any(&["customer name", "name"]) {
        HeaderKind::PersonName
    } else if matches_any(&["transaction id", "txn id", "order id", "invoice id"]) {
        HeaderKind::TransactionId
    } else if matches_any(&["email"]) {
        HeaderKind::Email
    } else if matches_any(&["phone", "mobile"]) {
        HeaderKind::Phone
    } else {
        HeaderKind::Category
    }
}

/// Build the header-only frame: every dimension name becomes a plain column
/// filled by the semantic generator inferred from the name.
pub fn header_only_frame(
    headers: &[String],
    num_rows: usize,
    rng: &mut ChaCha8Rng,
) -> Result<Frame, GenerationError> {
    let start_date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default();
    let mut frame = Frame::with_len(num_rows);

    for header in headers {
        let kind = infer_kind(header);
        debug!(header = %header, ?kind, "header generator inferred");
        let values = (0..num_rows)
            .map(|row| header_cell(kind, row, start_date, rng))
            .collect();
        frame.set_column(header, values)?;
    }

    Ok(frame)
}

fn header_cell(
    kind: HeaderKind,
    row: usize,
    start_date: NaiveDate,
    rng: &mut ChaCha8Rng,
) -> CellValue {
    match kind {
        HeaderKind::Date => {
            let date = start_date + Duration::days(row as i64);
            CellValue::Text(date.format("%Y-%m-%d").to_string())
        }
        HeaderKind::Amount => CellValue::Number(round2(rng.random_range(100.0..=10000.0))),
        HeaderKind::Region => pick(&REGIONS, rng),
        HeaderKind::Sku => CellValue::Text(format!("SKU{:02}", row % 10 + 1)),
        HeaderKind::PersonName => {
            let first = FIRST_NAMES.choose(rng).copied().unwrap_or("John");
            let last = LAST_NAMES.choose(rng).copied().unwrap_or("Smith");
            CellValue::Text(format!("{first} {last}"))
        }
        HeaderKind::TransactionId => {
            CellValue::Text(format!("TXN{}", rng.random_range(100000..=999999)))
        }
        HeaderKind::Email => {
            let user = rng.random_range(1000..=9999);
            let domain = EMAIL_DOMAINS.choose(rng).copied().unwrap_or("example.com");
            CellValue::Text(format!("user{user}@{domain}"))
        }
        HeaderKind::Phone => CellValue::Text(format!(
            "+1-202-{}-{}",
            rng.random_range(100..=999),
            rng.random_range(1000..=9999)
        )),
        HeaderKind::Category => pick(&CATEGORIES, rng),
    }
}

fn pick(choices: &[&str], rng: &mut ChaCha8Rng) -> CellValue {
    let value = choices.choose(rng).copied().unwrap_or("A");
    CellValue::Text(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_first_matching_family() {
        assert_eq!(infer_kind("Order Date"), HeaderKind::Date);
        assert_eq!(infer_kind("Unit Price"), HeaderKind::Amount);
        assert_eq!(infer_kind("Sales Region"), HeaderKind::Region);
        assert_eq!(infer_kind("Product"), HeaderKind::Sku);
        assert_eq!(infer_kind("Customer Name"), HeaderKind::PersonName);
        assert_eq!(infer_kind("Invoice Id"), HeaderKind::TransactionId);
        assert_eq!(infer_kind("Contact Email"), HeaderKind::Email);
        assert_eq!(infer_kind("Mobile"), HeaderKind::Phone);
        assert_eq!(infer_kind("Segment"), HeaderKind::Category);
    }

    #[test]
    fn date_wins_over_amount_in_scan_order() {
        // "Year Cost" names both families; the date family is checked first
        assert_eq!(infer_kind("Year Cost"), HeaderKind::Date);
    }
}

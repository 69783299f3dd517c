use serde::{Deserialize, Serialize};

use crate::schema::DocumentStructure;
use crate::validation::is_total_label;

/// A single spreadsheet cell as delivered by the upstream file-ingestion
/// layer: text, a number, or nothing. The untagged representation lets a
/// plain JSON 2-D array deserialize directly into a [`RawTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }

    /// Numeric view of the cell. Text cells are parsed leniently:
    /// thousands separators and currency symbols are dropped, and an
    /// accounting-style parenthesized value reads as negative.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => parse_numeric_text(s),
            Cell::Empty => None,
        }
    }

    fn render(&self) -> String {
        match self {
            Cell::Number(n) => format!("{}", n),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Empty => String::new(),
        }
    }
}

fn parse_numeric_text(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    let negative = trimmed.starts_with('(') && trimmed.ends_with(')');
    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    Some(if negative { -value.abs() } else { value })
}

/// An in-memory spreadsheet: ordered rows of cells with a fixed column
/// count. Ragged input rows are padded with empty cells on construction
/// so column indices are always in bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTable {
    rows: Vec<Vec<Cell>>,
    columns: usize,
}

impl RawTable {
    pub fn new(mut rows: Vec<Vec<Cell>>) -> Self {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(columns, Cell::Empty);
        }
        Self { rows, columns }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&Cell::Empty)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Delimited textual rendering of the first `max_rows` rows, used as
    /// the document sample inside analysis prompts.
    pub fn sample_text(&self, max_rows: usize) -> String {
        let mut out = String::new();
        for (index, row) in self.rows.iter().take(max_rows).enumerate() {
            let cells: Vec<String> = row.iter().map(Cell::render).collect();
            out.push_str(&format!("Row {}: {}\n", index, cells.join(" | ")));
        }
        out
    }

    /// Index of the column most likely to hold account names: the
    /// leftmost column where text cells outnumber numeric ones.
    pub fn guess_name_column(&self) -> usize {
        for column in 0..self.columns {
            let mut text = 0usize;
            let mut numeric = 0usize;
            for row in &self.rows {
                match row.get(column) {
                    Some(Cell::Text(s)) if !s.trim().is_empty() => {
                        if parse_numeric_text(s).is_some() {
                            numeric += 1;
                        } else {
                            text += 1;
                        }
                    }
                    Some(Cell::Number(_)) => numeric += 1,
                    _ => {}
                }
            }
            if text > numeric && text > 0 {
                return column;
            }
        }
        0
    }
}

/// One line item pulled out of the data region of a table. Discarded
/// once classification has produced an [`AccountClassification`] for it.
///
/// [`AccountClassification`]: crate::schema::AccountClassification
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedAccount {
    pub name: String,
    pub row_index: usize,
    pub value: Option<f64>,
}

/// Walks the structure's data region and pulls out classifiable line
/// items. Blank names and total/subtotal rows are skipped here so the
/// classifiers only ever see real accounts.
pub fn extract_accounts(table: &RawTable, structure: &DocumentStructure) -> Vec<ExtractedAccount> {
    if table.row_count() == 0 {
        return Vec::new();
    }

    let name_column = structure
        .account_columns
        .name_column
        .filter(|c| *c < table.column_count())
        .unwrap_or_else(|| table.guess_name_column());

    let end = structure.data_end_row.min(table.row_count() - 1);
    let start = structure.data_start_row.min(end);

    let mut accounts = Vec::new();
    for row_index in start..=end {
        let name = match table.cell(row_index, name_column).as_text() {
            Some(name) => name.to_string(),
            None => continue,
        };
        if is_total_label(&name) {
            continue;
        }

        let value = row_value(table, structure, row_index, name_column);
        accounts.push(ExtractedAccount {
            name,
            row_index,
            value,
        });
    }

    log::debug!(
        "extracted {} accounts from rows {}..={}",
        accounts.len(),
        start,
        end
    );
    accounts
}

fn row_value(
    table: &RawTable,
    structure: &DocumentStructure,
    row_index: usize,
    name_column: usize,
) -> Option<f64> {
    if let Some(period) = structure.period_columns.first() {
        if let Some(value) = table.cell(row_index, period.column_index).as_number() {
            return Some(value);
        }
    }
    // No usable period columns: take the rightmost numeric cell.
    (0..table.column_count())
        .rev()
        .filter(|c| *c != name_column)
        .find_map(|c| table.cell(row_index, c).as_number())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DocumentStructure;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_ragged_rows_are_padded() {
        let table = RawTable::new(vec![
            vec![text("Account"), text("2023"), text("2024")],
            vec![text("Sales")],
        ]);
        assert_eq!(table.column_count(), 3);
        assert_eq!(*table.cell(1, 2), Cell::Empty);
    }

    #[test]
    fn test_numeric_text_parsing() {
        assert_eq!(text("1,234.50").as_number(), Some(1234.5));
        assert_eq!(text("(500)").as_number(), Some(-500.0));
        assert_eq!(text("$12,000").as_number(), Some(12000.0));
        assert_eq!(text("n/a").as_number(), None);
        assert_eq!(Cell::Empty.as_number(), None);
    }

    #[test]
    fn test_sample_text_renders_rows() {
        let table = RawTable::new(vec![
            vec![text("Account"), text("Amount")],
            vec![text("Sales"), Cell::Number(100.0)],
        ]);
        let sample = table.sample_text(10);
        assert!(sample.contains("Row 0: Account | Amount"));
        assert!(sample.contains("Row 1: Sales | 100"));
    }

    #[test]
    fn test_guess_name_column_skips_numeric_codes() {
        let table = RawTable::new(vec![
            vec![Cell::Number(4000.0), text("Sales"), Cell::Number(100.0)],
            vec![Cell::Number(5000.0), text("Cost of Sales"), Cell::Number(60.0)],
        ]);
        assert_eq!(table.guess_name_column(), 1);
    }

    #[test]
    fn test_extract_accounts_skips_totals_and_blanks() {
        let table = RawTable::new(vec![
            vec![text("Account"), text("2023")],
            vec![text("Sales"), Cell::Number(100.0)],
            vec![Cell::Empty, Cell::Number(5.0)],
            vec![text("Total Revenue"), Cell::Number(105.0)],
            vec![text("Rent"), text("(2,000)")],
        ]);
        let mut structure = DocumentStructure::default();
        structure.data_start_row = 1;
        structure.data_end_row = 4;
        structure.account_columns.name_column = Some(0);

        let accounts = extract_accounts(&table, &structure);
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].name, "Sales");
        assert_eq!(accounts[0].value, Some(100.0));
        assert_eq!(accounts[1].name, "Rent");
        assert_eq!(accounts[1].value, Some(-2000.0));
    }

    #[test]
    fn test_extract_accounts_clamps_out_of_range_bounds() {
        let table = RawTable::new(vec![
            vec![text("Sales"), Cell::Number(100.0)],
            vec![text("Rent"), Cell::Number(-10.0)],
        ]);
        let mut structure = DocumentStructure::default();
        structure.data_start_row = 0;
        structure.data_end_row = 99;

        let accounts = extract_accounts(&table, &structure);
        assert_eq!(accounts.len(), 2);
    }
}

use serde::{Deserialize, Serialize};

/// A table as it appears on the page: header texts plus body rows.
///
/// Nothing here is validated. Column names and row count are whatever the
/// page's markup held at fetch time, and rows may be shorter than the header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A table after header normalization and team tagging, ready to load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// SQL type chosen for a column when the loader has to create the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    BigInt,
    Double,
    Text,
}

impl ColumnType {
    pub fn sql(self) -> &'static str {
        match self {
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Text => "TEXT",
        }
    }

    /// Map a catalog `data_type` back onto the three load types. Integer
    /// and floating kinds keep their family; everything else binds as text.
    pub fn from_catalog(data_type: &str) -> Self {
        match data_type.trim().to_ascii_lowercase().as_str() {
            "bigint" | "integer" | "smallint" => ColumnType::BigInt,
            "double precision" | "real" | "numeric" => ColumnType::Double,
            _ => ColumnType::Text,
        }
    }

    /// Narrowest type holding values of both. BigInt < Double < Text.
    pub fn widen(self, other: ColumnType) -> ColumnType {
        match (self, other) {
            (ColumnType::Text, _) | (_, ColumnType::Text) => ColumnType::Text,
            (ColumnType::Double, _) | (_, ColumnType::Double) => ColumnType::Double,
            _ => ColumnType::BigInt,
        }
    }
}

// "inf" and "NaN" parse as f64 but are names, not numbers, on a stats page.
fn is_decimal(cell: &str) -> bool {
    cell.bytes().any(|b| b.is_ascii_digit()) && cell.parse::<f64>().is_ok()
}

/// A single cell converted for binding. Empty cells become NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    BigInt(Option<i64>),
    Double(Option<f64>),
    Text(Option<String>),
}

impl NormalizedTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell at (row, col), treating missing trailing cells as empty.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Type per column as seen in the non-empty cells, `None` for a column
    /// with no values at all.
    pub fn observed_column_types(&self) -> Vec<Option<ColumnType>> {
        (0..self.columns.len())
            .map(|col| {
                let mut ty: Option<ColumnType> = None;
                for row in 0..self.rows.len() {
                    let cell = self.cell(row, col).trim();
                    if cell.is_empty() {
                        continue;
                    }
                    let cell_ty = if cell.parse::<i64>().is_ok() {
                        ColumnType::BigInt
                    } else if is_decimal(cell) {
                        ColumnType::Double
                    } else {
                        ColumnType::Text
                    };
                    let merged = ty.map_or(cell_ty, |t| t.widen(cell_ty));
                    ty = Some(merged);
                    if merged == ColumnType::Text {
                        break;
                    }
                }
                ty
            })
            .collect()
    }

    /// Infer one type per column from every row.
    ///
    /// Any text cell makes the column text, any decimal makes it a double;
    /// empty cells are ignored and an all-empty column is text.
    pub fn infer_column_types(&self) -> Vec<ColumnType> {
        self.observed_column_types()
            .into_iter()
            .map(|ty| ty.unwrap_or(ColumnType::Text))
            .collect()
    }

    /// Convert one row for binding against the given column types.
    pub fn typed_row(&self, row: usize, types: &[ColumnType]) -> Vec<CellValue> {
        types
            .iter()
            .enumerate()
            .map(|(col, ty)| {
                let cell = self.cell(row, col).trim();
                let empty = cell.is_empty();
                match ty {
                    ColumnType::BigInt => CellValue::BigInt(if empty { None } else { cell.parse().ok() }),
                    ColumnType::Double => CellValue::Double(if empty { None } else { cell.parse().ok() }),
                    ColumnType::Text => {
                        CellValue::Text(if empty { None } else { Some(self.cell(row, col).to_string()) })
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> NormalizedTable {
        NormalizedTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_infer_column_types() {
        let t = table(
            &["Player", "Age", "FG%", "Notes", "Team Name"],
            &[
                &["Jayson Tatum", "22", ".459", "", "BOS"],
                &["Jaylen Brown", "24", "1", "", "BOS"],
                &["Kemba Walker", "", ".420", "", "BOS"],
            ],
        );
        assert_eq!(
            t.infer_column_types(),
            vec![
                ColumnType::Text,
                ColumnType::BigInt,
                ColumnType::Double,
                ColumnType::Text,
                ColumnType::Text,
            ]
        );
    }

    #[test]
    fn test_text_wins_over_numbers() {
        let t = table(&["MP"], &[&["34.1"], &["DNP"], &["12"]]);
        assert_eq!(t.infer_column_types(), vec![ColumnType::Text]);
    }

    #[test]
    fn test_ragged_rows_read_as_empty() {
        let t = table(&["G", "GS"], &[&["72", "72"], &["5"]]);
        assert_eq!(t.cell(1, 1), "");
        assert_eq!(t.cell(9, 0), "");
        assert_eq!(t.infer_column_types(), vec![ColumnType::BigInt, ColumnType::BigInt]);
    }

    #[test]
    fn test_observed_types_leave_empty_columns_open() {
        let t = table(&["C", "3P%", "Team Name"], &[&["", "", "ATL"], &["", "", "ATL"]]);
        assert_eq!(t.observed_column_types(), vec![None, None, Some(ColumnType::Text)]);
    }

    #[test]
    fn test_widen_order() {
        use ColumnType::*;
        assert_eq!(BigInt.widen(BigInt), BigInt);
        assert_eq!(BigInt.widen(Double), Double);
        assert_eq!(Double.widen(BigInt), Double);
        assert_eq!(Double.widen(Text), Text);
        assert_eq!(Text.widen(BigInt), Text);
    }

    #[test]
    fn test_from_catalog() {
        assert_eq!(ColumnType::from_catalog("bigint"), ColumnType::BigInt);
        assert_eq!(ColumnType::from_catalog("double precision"), ColumnType::Double);
        assert_eq!(ColumnType::from_catalog("text"), ColumnType::Text);
        assert_eq!(ColumnType::from_catalog("character varying"), ColumnType::Text);
    }

    #[test]
    fn test_typed_row_nulls_empty_cells() {
        let t = table(&["Player", "G", "FG%"], &[&["Tacko Fall", "", ".667"]]);
        let types = t.infer_column_types();
        assert_eq!(
            t.typed_row(0, &types),
            vec![
                CellValue::Text(Some("Tacko Fall".into())),
                CellValue::Text(None),
                CellValue::Double(Some(0.667)),
            ]
        );
    }
}

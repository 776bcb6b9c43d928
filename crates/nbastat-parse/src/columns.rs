// Header normalization between extraction and load.
//
// Only headers change. Cells pass through untouched apart from the
// injected team column and the removal of dropped columns.

use nbastat_model::{ColumnRules, NormalizedTable, RawTable, TeamCode};
use std::collections::HashSet;

/// Normalize a raw table for loading.
///
/// Steps, in order:
/// 1. append a constant team column named `rules.team_column`;
/// 2. remove every column named in `rules.drop`, then apply `rules.rename`;
/// 3. replace `%` in every header with `rules.pct_token`;
/// 4. lowercase headers if `rules.lowercase`;
///
/// then disambiguate any headers that now collide.
pub fn normalize(raw: &RawTable, team: TeamCode, rules: &ColumnRules) -> NormalizedTable {
    let width = raw.headers.len();

    let mut headers = raw.headers.clone();
    headers.push(rules.team_column.clone());

    let keep: Vec<usize> = (0..headers.len())
        .filter(|&i| !rules.drop.iter().any(|d| d == &headers[i]))
        .collect();

    let columns: Vec<String> = keep
        .iter()
        .map(|&i| {
            let renamed = rename(&headers[i], &rules.rename);
            let header = substitute_percent(&renamed, &rules.pct_token);
            if rules.lowercase {
                header.to_lowercase()
            } else {
                header
            }
        })
        .collect();

    let rows = raw
        .rows
        .iter()
        .map(|row| {
            keep.iter()
                .map(|&i| {
                    if i == width {
                        team.as_str().to_string()
                    } else {
                        row.get(i).cloned().unwrap_or_default()
                    }
                })
                .collect()
        })
        .collect();

    let dropped = headers.len() - keep.len();
    if dropped > 0 {
        tracing::debug!(dropped, "Dropped columns");
    }

    NormalizedTable {
        columns: disambiguate(columns),
        rows,
    }
}

/// Replace every `%` in a header with `token` (`FG%` -> `FGPCT`).
pub fn substitute_percent(header: &str, token: &str) -> String {
    header.replace('%', token)
}

fn rename(header: &str, renames: &[(String, String)]) -> String {
    renames
        .iter()
        .find(|(from, _)| from == header)
        .map(|(_, to)| to.clone())
        .unwrap_or_else(|| header.to_string())
}

/// Suffix repeated headers with `_2`, `_3`, ... in order of appearance.
fn disambiguate(columns: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    columns
        .into_iter()
        .map(|col| {
            if seen.insert(col.clone()) {
                return col;
            }
            let mut n = 2;
            loop {
                let candidate = format!("{col}_{n}");
                if seen.insert(candidate.clone()) {
                    tracing::debug!(column = %col, renamed = %candidate, "Renamed duplicate column");
                    return candidate;
                }
                n += 1;
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    fn upper_rules() -> ColumnRules {
        ColumnRules {
            team_column: "Team Name".into(),
            drop: vec!["Rk".into()],
            rename: Vec::new(),
            pct_token: "PCT".into(),
            lowercase: false,
        }
    }

    fn lower_rules() -> ColumnRules {
        ColumnRules {
            team_column: "Team Name".into(),
            drop: vec!["Rk".into()],
            rename: vec![
                ("PTS/G".into(), "ppg".into()),
                ("Team Name".into(), "team".into()),
            ],
            pct_token: "pct".into(),
            lowercase: true,
        }
    }

    #[test]
    fn test_per_game_shape() {
        let table = raw(
            &["Rk", "Unnamed: 1", "Age", "FG%", "3P%", "PTS/G"],
            &[
                &["1", "Jayson Tatum", "22", ".459", ".386", "26.4"],
                &["2", "Jaylen Brown", "24", ".484", ".397", "24.7"],
            ],
        );
        let out = normalize(&table, TeamCode::Bos, &upper_rules());
        assert_eq!(
            out.columns,
            vec!["Unnamed: 1", "Age", "FGPCT", "3PPCT", "PTS/G", "Team Name"]
        );
        assert_eq!(
            out.rows[0],
            vec!["Jayson Tatum", "22", ".459", ".386", "26.4", "BOS"]
        );
        assert_eq!(out.rows[1][5], "BOS");
    }

    #[test]
    fn test_lowercase_variant() {
        let table = raw(&["Rk", "Unnamed: 0", "G", "FG%", "PTS/G"], &[&["1", "Team", "72", ".466", "112.6"]]);
        let out = normalize(&table, TeamCode::Mia, &lower_rules());
        assert_eq!(out.columns, vec!["unnamed: 0", "g", "fgpct", "ppg", "team"]);
        assert_eq!(out.rows[0], vec!["Team", "72", ".466", "112.6", "MIA"]);
    }

    #[test]
    fn test_rank_column_dropped_anywhere() {
        for position in 0..4 {
            let mut headers = vec!["Player", "G", "PTS"];
            headers.insert(position, "Rk");
            let mut row = vec!["Kyle Lowry", "46", "17.2"];
            row.insert(position, "7");
            let table = raw(&headers, &[row.as_slice()]);

            let out = normalize(&table, TeamCode::Tor, &upper_rules());
            assert!(!out.columns.iter().any(|c| c == "Rk"), "position {position}");
            assert_eq!(out.rows[0], vec!["Kyle Lowry", "46", "17.2", "TOR"]);
        }
    }

    #[test]
    fn test_percent_substitution_idempotent_without_percent() {
        for header in ["PTS", "3PA", "Team Name", "", "eFG"] {
            let once = substitute_percent(header, "PCT");
            assert_eq!(once, header);
            assert_eq!(substitute_percent(&once, "PCT"), once);
        }
    }

    #[test]
    fn test_every_percent_replaced() {
        for header in ["FG%", "%", "eFG%", "TS%%", "%3P%"] {
            let out = substitute_percent(header, "pct");
            assert!(!out.contains('%'), "{header} -> {out}");
            assert_eq!(out.matches("pct").count(), header.matches('%').count());
        }
    }

    #[test]
    fn test_duplicate_headers_disambiguated() {
        let table = raw(&["FG", "FG%", "FG", "FGPCT"], &[&["1", ".5", "2", ".6"]]);
        let out = normalize(&table, TeamCode::Den, &upper_rules());
        assert_eq!(out.columns, vec!["FG", "FGPCT", "FG_2", "FGPCT_2", "Team Name"]);
    }

    #[test]
    fn test_short_rows_padded() {
        let table = raw(&["Player", "G", "PTS"], &[&["Tacko Fall"]]);
        let out = normalize(&table, TeamCode::Bos, &upper_rules());
        assert_eq!(out.rows[0], vec!["Tacko Fall", "", "", "BOS"]);
    }
}

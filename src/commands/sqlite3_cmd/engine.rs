// A minimal in-memory SQL engine backing the `sqlite3` worker-backed built-in.
//
// This does not implement SQLite's on-disk format or its full SQL grammar:
// the spec treats sqlite3 as an external collaborator whose internal query
// engine is out of scope. What's implemented here is enough of a contract
// (CREATE TABLE / INSERT / SELECT with a WHERE/ORDER BY/LIMIT clause) that
// scripts exercising the sqlite3 builtin get deterministic, persisted
// results against the virtual filesystem.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Database {
    pub tables: HashMap<String, Table>,
}

impl Database {
    pub fn from_json(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        serde_json::from_str(raw).unwrap_or_default()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

pub struct QueryOutcome {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub message: Option<String>,
}

impl QueryOutcome {
    fn rows_only(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows, message: None }
    }

    fn ack(message: impl Into<String>) -> Self {
        Self { header: Vec::new(), rows: Vec::new(), message: Some(message.into()) }
    }
}

/// Split a script into individual statements on top-level `;` (ignoring
/// semicolons inside single- or double-quoted string literals).
pub fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;

    for ch in script.chars() {
        match ch {
            '\'' if !in_double => {
                in_single = !in_single;
                current.push(ch);
            }
            '"' if !in_single => {
                in_double = !in_double;
                current.push(ch);
            }
            ';' if !in_single && !in_double => {
                if !current.trim().is_empty() {
                    statements.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        statements.push(current.trim().to_string());
    }
    statements
}

/// Execute a single SQL statement against the database, mutating it in place.
pub fn execute_statement(db: &mut Database, statement: &str) -> Result<QueryOutcome, String> {
    let upper = statement.trim_start();
    let keyword = upper.split_whitespace().next().unwrap_or("").to_ascii_uppercase();

    match keyword.as_str() {
        "CREATE" => execute_create_table(db, statement),
        "INSERT" => execute_insert(db, statement),
        "SELECT" => execute_select(db, statement),
        "DELETE" => execute_delete(db, statement),
        "DROP" => execute_drop_table(db, statement),
        "" => Ok(QueryOutcome::ack("")),
        other => Err(format!("near \"{}\": syntax error", other)),
    }
}

fn execute_create_table(db: &mut Database, statement: &str) -> Result<QueryOutcome, String> {
    let re = regex_lite::Regex::new(
        r"(?is)^CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?[\[`\"]?(\w+)[\]`\"]?\s*\((.*)\)\s*$",
    )
    .unwrap();
    let captures = re
        .captures(statement.trim_end_matches(';').trim())
        .ok_or_else(|| "syntax error in CREATE TABLE".to_string())?;
    let name = captures.get(1).unwrap().as_str().to_string();
    let columns_raw = captures.get(2).unwrap().as_str();

    let columns = split_top_level_commas(columns_raw)
        .into_iter()
        .map(|col| {
            col.trim()
                .split_whitespace()
                .next()
                .unwrap_or("")
                .trim_matches(|c| c == '[' || c == ']' || c == '`' || c == '"')
                .to_string()
        })
        .filter(|c| !c.is_empty())
        .collect();

    db.tables.insert(name, Table { columns, rows: Vec::new() });
    Ok(QueryOutcome::ack(""))
}

fn execute_drop_table(db: &mut Database, statement: &str) -> Result<QueryOutcome, String> {
    let re = regex_lite::Regex::new(r"(?is)^DROP\s+TABLE\s+(?:IF\s+EXISTS\s+)?[\[`\"]?(\w+)[\]`\"]?\s*$").unwrap();
    let captures = re
        .captures(statement.trim_end_matches(';').trim())
        .ok_or_else(|| "syntax error in DROP TABLE".to_string())?;
    let name = captures.get(1).unwrap().as_str();
    db.tables.remove(name);
    Ok(QueryOutcome::ack(""))
}

fn execute_insert(db: &mut Database, statement: &str) -> Result<QueryOutcome, String> {
    let re = regex_lite::Regex::new(
        r"(?is)^INSERT\s+INTO\s+[\[`\"]?(\w+)[\]`\"]?\s*(?:\(([^)]*)\))?\s*VALUES\s*(.+)$",
    )
    .unwrap();
    let trimmed = statement.trim_end_matches(';').trim();
    let captures = re
        .captures(trimmed)
        .ok_or_else(|| "syntax error in INSERT".to_string())?;
    let table_name = captures.get(1).unwrap().as_str().to_string();
    let explicit_columns = captures.get(2).map(|m| {
        split_top_level_commas(m.as_str())
            .into_iter()
            .map(|c| c.trim().to_string())
            .collect::<Vec<_>>()
    });
    let values_raw = captures.get(3).unwrap().as_str();

    let table = db
        .tables
        .get_mut(&table_name)
        .ok_or_else(|| format!("no such table: {}", table_name))?;

    for tuple in split_value_tuples(values_raw) {
        let values: Vec<String> = split_top_level_commas(&tuple)
            .into_iter()
            .map(|v| unquote_literal(v.trim()))
            .collect();

        let row = if let Some(ref cols) = explicit_columns {
            let mut full_row = vec![String::new(); table.columns.len()];
            for (col, value) in cols.iter().zip(values.iter()) {
                if let Some(idx) = table.columns.iter().position(|c| c.eq_ignore_ascii_case(col)) {
                    full_row[idx] = value.clone();
                }
            }
            full_row
        } else {
            values
        };

        table.rows.push(row);
    }

    Ok(QueryOutcome::ack(""))
}

fn execute_delete(db: &mut Database, statement: &str) -> Result<QueryOutcome, String> {
    let re = regex_lite::Regex::new(r"(?is)^DELETE\s+FROM\s+[\[`\"]?(\w+)[\]`\"]?\s*(?:WHERE\s+(.+))?$").unwrap();
    let trimmed = statement.trim_end_matches(';').trim();
    let captures = re
        .captures(trimmed)
        .ok_or_else(|| "syntax error in DELETE".to_string())?;
    let table_name = captures.get(1).unwrap().as_str().to_string();
    let where_clause = captures.get(2).map(|m| m.as_str().to_string());

    let table = db
        .tables
        .get_mut(&table_name)
        .ok_or_else(|| format!("no such table: {}", table_name))?;

    if let Some(clause) = where_clause {
        let predicate = parse_where(&clause, &table.columns)?;
        table.rows.retain(|row| !predicate(row));
    } else {
        table.rows.clear();
    }

    Ok(QueryOutcome::ack(""))
}

fn execute_select(db: &Database, statement: &str) -> Result<QueryOutcome, String> {
    let re = regex_lite::Regex::new(
        r"(?is)^SELECT\s+(.+?)\s+FROM\s+[\[`\"]?(\w+)[\]`\"]?(?:\s+WHERE\s+(.+?))?(?:\s+ORDER\s+BY\s+(\w+)(\s+DESC)?)?(?:\s+LIMIT\s+(\d+))?$",
    )
    .unwrap();
    let trimmed = statement.trim_end_matches(';').trim();
    let captures = re
        .captures(trimmed)
        .ok_or_else(|| "syntax error in SELECT".to_string())?;

    let columns_raw = captures.get(1).unwrap().as_str().trim();
    let table_name = captures.get(2).unwrap().as_str();
    let where_clause = captures.get(3).map(|m| m.as_str().to_string());
    let order_col = captures.get(4).map(|m| m.as_str().to_string());
    let order_desc = captures.get(5).is_some();
    let limit: Option<usize> = captures.get(6).and_then(|m| m.as_str().parse().ok());

    let table = db
        .tables
        .get(table_name)
        .ok_or_else(|| format!("no such table: {}", table_name))?;

    let selected_indices: Vec<usize> = if columns_raw == "*" {
        (0..table.columns.len()).collect()
    } else {
        split_top_level_commas(columns_raw)
            .into_iter()
            .filter_map(|col| {
                let col = col.trim();
                table.columns.iter().position(|c| c.eq_ignore_ascii_case(col))
            })
            .collect()
    };

    let header: Vec<String> = selected_indices.iter().map(|&i| table.columns[i].clone()).collect();

    let mut rows: Vec<Vec<String>> = table.rows.clone();
    if let Some(clause) = where_clause {
        let predicate = parse_where(&clause, &table.columns)?;
        rows.retain(|row| predicate(row));
    }

    if let Some(col) = order_col {
        if let Some(idx) = table.columns.iter().position(|c| c.eq_ignore_ascii_case(&col)) {
            rows.sort_by(|a, b| compare_cells(&a[idx], &b[idx]));
            if order_desc {
                rows.reverse();
            }
        }
    }

    if let Some(limit) = limit {
        rows.truncate(limit);
    }

    let projected: Vec<Vec<String>> = rows
        .into_iter()
        .map(|row| selected_indices.iter().map(|&i| row.get(i).cloned().unwrap_or_default()).collect())
        .collect();

    Ok(QueryOutcome::rows_only(header, projected))
}

fn compare_cells(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
        _ => a.cmp(b),
    }
}

type Predicate = Box<dyn Fn(&[String]) -> bool>;

fn parse_where(clause: &str, columns: &[String]) -> Result<Predicate, String> {
    let re = regex_lite::Regex::new(r"(?i)^\s*(\w+)\s*(=|!=|<>|>=|<=|>|<)\s*(.+?)\s*$").unwrap();
    let captures = re.captures(clause).ok_or_else(|| format!("unsupported WHERE clause: {}", clause))?;
    let col_name = captures.get(1).unwrap().as_str().to_string();
    let op = captures.get(2).unwrap().as_str().to_string();
    let literal = unquote_literal(captures.get(3).unwrap().as_str().trim());

    let idx = columns
        .iter()
        .position(|c| c.eq_ignore_ascii_case(&col_name))
        .ok_or_else(|| format!("no such column: {}", col_name))?;

    Ok(Box::new(move |row: &[String]| {
        let cell = row.get(idx).map(|s| s.as_str()).unwrap_or("");
        match op.as_str() {
            "=" => cells_equal(cell, &literal),
            "!=" | "<>" => !cells_equal(cell, &literal),
            ">" => compare_cells(cell, &literal) == std::cmp::Ordering::Greater,
            "<" => compare_cells(cell, &literal) == std::cmp::Ordering::Less,
            ">=" => compare_cells(cell, &literal) != std::cmp::Ordering::Less,
            "<=" => compare_cells(cell, &literal) != std::cmp::Ordering::Greater,
            _ => false,
        }
    }))
}

fn cells_equal(a: &str, b: &str) -> bool {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => a == b,
    }
}

fn unquote_literal(raw: &str) -> String {
    let raw = raw.trim();
    if (raw.starts_with('\'') && raw.ends_with('\'') && raw.len() >= 2)
        || (raw.starts_with('"') && raw.ends_with('"') && raw.len() >= 2)
    {
        raw[1..raw.len() - 1].to_string()
    } else {
        raw.to_string()
    }
}

fn split_top_level_commas(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut in_single = false;
    let mut in_double = false;

    for ch in input.chars() {
        match ch {
            '\'' if !in_double => {
                in_single = !in_single;
                current.push(ch);
            }
            '"' if !in_single => {
                in_double = !in_double;
                current.push(ch);
            }
            '(' if !in_single && !in_double => {
                depth += 1;
                current.push(ch);
            }
            ')' if !in_single && !in_double => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 && !in_single && !in_double => {
                parts.push(current.clone());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts
}

/// Split `(1,2),(3,4)` style value lists into individual `(...)` tuples.
fn split_value_tuples(input: &str) -> Vec<String> {
    let mut tuples = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;

    for ch in input.chars() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '(' if !in_single && !in_double => {
                depth += 1;
                if depth == 1 {
                    current.clear();
                    continue;
                }
            }
            ')' if !in_single && !in_double => {
                depth -= 1;
                if depth == 0 {
                    tuples.push(current.clone());
                    continue;
                }
            }
            _ => {}
        }
        if depth >= 1 {
            current.push(ch);
        }
    }

    tuples
}

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::error::{RdaoError, Result};
use crate::types::SqlValue;

/// A statement as the caller hands it over: SQL text plus optional bindings.
///
/// `:name` placeholders are replaced by named bindings, `?` placeholders by
/// positional bindings in order. Placeholders inside string literals, quoted
/// identifiers and comments are left alone.
///
/// # Example
/// ```
/// use mssql_rdao::Query;
///
/// let query = Query::new("SELECT * FROM Customers WHERE Name = :name AND Age > ?")
///     .bind("name", "O'Brien")
///     .arg(30);
/// assert_eq!(
///     query.resolve().unwrap(),
///     "SELECT * FROM Customers WHERE Name = N'O''Brien' AND Age > 30"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    sql: String,
    named: HashMap<String, SqlValue>,
    positional: Vec<SqlValue>,
}

impl Query {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Self::default()
        }
    }

    /// Bind a value to the `:name` placeholder.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// Bind the next `?` placeholder.
    pub fn arg(mut self, value: impl Into<SqlValue>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// The unresolved template text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// True when the query carries no bindings and is used verbatim.
    pub fn is_raw(&self) -> bool {
        self.named.is_empty() && self.positional.is_empty()
    }

    /// Produce the final SQL text with every placeholder replaced by a literal.
    pub fn resolve(&self) -> Result<String> {
        if self.is_raw() {
            return Ok(self.sql.clone());
        }
        merge_params(&self.sql, &self.named, &self.positional)
    }
}

impl From<&str> for Query {
    fn from(sql: &str) -> Self {
        Query::new(sql)
    }
}

impl From<String> for Query {
    fn from(sql: String) -> Self {
        Query::new(sql)
    }
}

impl From<&Query> for Query {
    fn from(query: &Query) -> Self {
        query.clone()
    }
}

/// Replace `:name` and `?` placeholders in `sql` with literals.
pub fn merge_params(
    sql: &str,
    named: &HashMap<String, SqlValue>,
    positional: &[SqlValue],
) -> Result<String> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len() + 16);
    let mut next_positional = positional.iter();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' | '[' => {
                let close = if c == '[' { ']' } else { c };
                let end = quoted_end(&chars, i, close);
                out.extend(&chars[i..end]);
                i = end;
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                let end = chars[i..]
                    .iter()
                    .position(|&ch| ch == '\n')
                    .map_or(chars.len(), |p| i + p);
                out.extend(&chars[i..end]);
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let end = block_comment_end(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                out.push_str("::");
                i += 2;
            }
            ':' if chars.get(i + 1).is_some_and(|&ch| is_name_start(ch)) => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_name_char(chars[end]) {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                let value = named
                    .get(&name)
                    .ok_or_else(|| RdaoError::Template(format!("no value bound for :{name}")))?;
                out.push_str(&sql_param(value)?);
                i = end;
            }
            '?' => {
                let value = next_positional.next().ok_or_else(|| {
                    RdaoError::Template(format!(
                        "not enough positional values ({} bound)",
                        positional.len()
                    ))
                })?;
                out.push_str(&sql_param(value)?);
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    let unused = next_positional.count();
    if unused > 0 {
        return Err(RdaoError::Template(format!(
            "{unused} positional value(s) left unused"
        )));
    }

    Ok(out)
}

/// Render a value as a SQL Server literal.
pub fn sql_param(value: &SqlValue) -> Result<String> {
    let literal = match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Text(s) => format!("N'{}'", s.replace('\'', "''")),
        SqlValue::Int32(i) => i.to_string(),
        SqlValue::Int64(i) => i.to_string(),
        SqlValue::Float64(f) if f.is_finite() => f.to_string(),
        SqlValue::Float64(f) => {
            return Err(RdaoError::Template(format!("{f} has no SQL literal")));
        }
        SqlValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        SqlValue::Bytes(bytes) => {
            let mut hex = String::with_capacity(2 + bytes.len() * 2);
            hex.push_str("0x");
            for b in bytes {
                let _ = write!(hex, "{b:02X}");
            }
            hex
        }
        SqlValue::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        SqlValue::Time(t) => format!("'{}'", t.format("%H:%M:%S%.6f")),
        SqlValue::Timestamp(ts) => format!("'{}'", ts.format("%Y-%m-%dT%H:%M:%S%.3f")),
        SqlValue::TimestampTz(ts) => format!("'{}'", ts.format("%Y-%m-%dT%H:%M:%S%.6f%:z")),
    };
    Ok(literal)
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Index one past the closing quote. A doubled quote is an escaped quote.
fn quoted_end(chars: &[char], start: usize, close: char) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == close {
            if chars.get(i + 1) == Some(&close) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

fn block_comment_end(chars: &[char], start: usize) -> usize {
    let mut i = start + 2;
    while i + 1 < chars.len() {
        if chars[i] == '*' && chars[i + 1] == '/' {
            return i + 2;
        }
        i += 1;
    }
    chars.len()
}

use super::ParseError;
use std::mem::take;

/// Splits CSV text into rows of fields
///
/// Handles quoted fields, doubled-quote escapes, embedded newlines and CRLF.
/// Blank lines are skipped. An unterminated quote is an error carrying the
/// line the quote opened on.
pub fn parse_csv(text: &str) -> Result<Vec<Vec<String>>, ParseError> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut quote_line = 0;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => {
                in_quotes = true;
                quote_line = line;
            }
            ',' if !in_quotes => row.push(take(&mut field)),
            '\r' | '\n' if !in_quotes => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                line += 1;
                row.push(take(&mut field));
                if row.len() == 1 && row[0].is_empty() {
                    row.clear();
                } else {
                    rows.push(take(&mut row));
                }
            }
            _ => {
                if ch == '\n' {
                    line += 1;
                }
                field.push(ch);
            }
        }
    }

    if in_quotes {
        return Err(ParseError::Csv {
            line: quote_line,
            message: "unterminated quoted field".to_string(),
        });
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    Ok(rows)
}

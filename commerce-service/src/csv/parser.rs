//! Character-level delimited-text parser.

const DELIMITER: char = ',';
const QUOTE: char = '"';

/// Split raw text into rows of fields.
///
/// Rows are newline-separated (a quoted field cannot span lines). Within a
/// row a quoted-field flag is toggled by `"`; the delimiter is literal
/// inside quotes and a field boundary outside them. Surrounding quotes are
/// stripped and `""` inside a quoted field yields a literal quote. Blank
/// lines are skipped.
pub fn parse_delimited(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(split_row)
        .collect()
}

fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            QUOTE if in_quotes && chars.peek() == Some(&QUOTE) => {
                chars.next();
                current.push(QUOTE);
            }
            QUOTE => in_quotes = !in_quotes,
            DELIMITER if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_rows_split_on_commas() {
        let rows = parse_delimited("a,b,c\nd,e,f");
        assert_eq!(rows, vec![vec!["a", "b", "c"], vec!["d", "e", "f"]]);
    }

    #[test]
    fn quoted_delimiter_is_literal() {
        let rows = parse_delimited(r#"name,price
"Pasir, halus",15000"#);
        assert_eq!(rows[1], vec!["Pasir, halus", "15000"]);
    }

    #[test]
    fn surrounding_quotes_are_stripped() {
        let rows = parse_delimited(r#""a","b""#);
        assert_eq!(rows[0], vec!["a", "b"]);
    }

    #[test]
    fn doubled_quote_yields_literal_quote() {
        let rows = parse_delimited(r#""5"" pipe",100"#);
        assert_eq!(rows[0], vec![r#"5" pipe"#, "100"]);
    }

    #[test]
    fn crlf_and_blank_lines_are_tolerated() {
        let rows = parse_delimited("a,b\r\n\r\n   \nc,d\r\n");
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn empty_trailing_field_is_kept() {
        let rows = parse_delimited("a,b,");
        assert_eq!(rows[0], vec!["a", "b", ""]);
    }

    #[test]
    fn parsing_is_deterministic() {
        let text = "nama,harga\n\"Batu, split\",\"25000\"\nPasir,12000";
        assert_eq!(parse_delimited(text), parse_delimited(text));
    }
}

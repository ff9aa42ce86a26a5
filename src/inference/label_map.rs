//! Object-detection label maps.
//!
//! Parses the text format used by object-detection model exports:
//!
//! ```text
//! item {
//!   id: 1
//!   name: 'car'
//!   display_name: 'Car'
//! }
//! ```

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Mapping from class id to class name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    entries: BTreeMap<u32, String>,
}

#[derive(Default)]
struct PendingItem {
    id: Option<u32>,
    name: Option<String>,
    display_name: Option<String>,
}

impl LabelMap {
    /// Build a label map from `(id, name)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        Self {
            entries: pairs.into_iter().map(|(id, name)| (id, name.into())).collect(),
        }
    }

    /// Read and parse a label map file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::LabelMapRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&contents, path)
    }

    /// Parse label map text. `path` is only used in error messages.
    ///
    /// Line breaks are insignificant, so `item { id: 1 name: 'car' }` on
    /// one line is accepted. `#` starts a comment outside quoted strings.
    pub fn parse(contents: &str, path: &Path) -> Result<Self> {
        let err = |(line, message): (usize, String)| Error::LabelMapParse {
            path: path.to_path_buf(),
            line,
            message,
        };

        let last_line = contents.lines().count().max(1);
        let mut tokens = tokenize(contents).map_err(err)?.into_iter();
        let mut entries = BTreeMap::new();

        while let Some(Spanned { line, token }) = tokens.next() {
            if !matches!(token, Token::Word("item")) {
                return Err(err((line, format!("unexpected {token} outside item"))));
            }
            match tokens.next() {
                Some(Spanned {
                    token: Token::Open, ..
                }) => {}
                Some(Spanned { line, .. }) => {
                    return Err(err((line, "expected '{' after item".to_string())));
                }
                None => return Err(err((line, "expected '{' after item".to_string()))),
            }

            let (close_line, item) = parse_item(&mut tokens, last_line).map_err(err)?;
            let id = item
                .id
                .ok_or_else(|| err((close_line, "item without id".to_string())))?;
            let name = item
                .display_name
                .or(item.name)
                .ok_or_else(|| err((close_line, "item without name".to_string())))?;
            if entries.insert(id, name).is_some() {
                return Err(err((close_line, format!("duplicate id {id}"))));
            }
        }

        Ok(Self { entries })
    }

    /// Class name for `class_id`.
    pub fn name(&self, class_id: u32) -> Option<&str> {
        self.entries.get(&class_id).map(String::as_str)
    }

    /// Whether `class_id` is known.
    pub fn contains(&self, class_id: u32) -> bool {
        self.entries.contains_key(&class_id)
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no classes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Classes in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.entries.iter().map(|(id, name)| (*id, name.as_str()))
    }
}

/// Parse failure as `(line, message)`.
type ParseError = (usize, String);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    Quoted(String),
    Open,
    Close,
    Colon,
}

impl std::fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Word(word) => write!(f, "'{word}'"),
            Self::Quoted(text) => write!(f, "string '{text}'"),
            Self::Open => f.write_str("'{'"),
            Self::Close => f.write_str("'}'"),
            Self::Colon => f.write_str("':'"),
        }
    }
}

/// A token and the line it starts on.
#[derive(Debug)]
struct Spanned<'a> {
    line: usize,
    token: Token<'a>,
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '{' | '}' | ':' | '#' | '\'' | '"')
}

fn tokenize(contents: &str) -> std::result::Result<Vec<Spanned<'_>>, ParseError> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut chars = contents.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let token = match c {
            '\n' => {
                line += 1;
                continue;
            }
            '#' => {
                while chars.next_if(|&(_, c)| c != '\n').is_some() {}
                continue;
            }
            c if c.is_whitespace() => continue,
            '{' => Token::Open,
            '}' => Token::Close,
            ':' => Token::Colon,
            '\'' | '"' => {
                let opened = line;
                let mut text = String::new();
                loop {
                    let ch = match chars.next() {
                        Some((_, ch)) if ch == c => break,
                        Some((_, '\\')) => chars.next().map(|(_, escaped)| escaped),
                        Some((_, ch)) => Some(ch),
                        None => None,
                    };
                    let Some(ch) = ch else {
                        return Err((opened, "unterminated string".to_string()));
                    };
                    if ch == '\n' {
                        line += 1;
                    }
                    text.push(ch);
                }
                tokens.push(Spanned {
                    line: opened,
                    token: Token::Quoted(text),
                });
                continue;
            }
            _ => {
                let mut end = start + c.len_utf8();
                while let Some((i, ch)) = chars.next_if(|&(_, ch)| !is_delimiter(ch)) {
                    end = i + ch.len_utf8();
                }
                Token::Word(&contents[start..end])
            }
        };
        tokens.push(Spanned { line, token });
    }
    Ok(tokens)
}

/// Parse the fields of one item up to its closing brace.
///
/// Returns the line of the closing brace with the collected fields.
fn parse_item<'a>(
    tokens: &mut impl Iterator<Item = Spanned<'a>>,
    last_line: usize,
) -> std::result::Result<(usize, PendingItem), ParseError> {
    let unterminated = || (last_line, "unterminated item".to_string());
    let mut item = PendingItem::default();

    loop {
        let Spanned { line, token } = tokens.next().ok_or_else(unterminated)?;
        let key = match token {
            Token::Close => return Ok((line, item)),
            Token::Word(key) => key,
            other => return Err((line, format!("expected field name, got {other}"))),
        };

        match tokens.next().ok_or_else(unterminated)? {
            Spanned {
                token: Token::Colon,
                ..
            } => {}
            Spanned {
                line,
                token: Token::Open,
            } if key == "item" => return Err((line, "nested item block".to_string())),
            Spanned { line, token } => {
                return Err((line, format!("expected ':' after '{key}', got {token}")));
            }
        }

        let Spanned { line, token } = tokens.next().ok_or_else(unterminated)?;
        let value = match token {
            Token::Word(value) => value.to_string(),
            Token::Quoted(value) => value,
            other => return Err((line, format!("expected value for '{key}', got {other}"))),
        };
        match key {
            "id" => {
                item.id = Some(
                    value
                        .parse()
                        .map_err(|_| (line, format!("invalid id '{value}'")))?,
                );
            }
            "name" => item.name = Some(value),
            "display_name" => item.display_name = Some(value),
            _ => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# buildings and vehicles
item {
  id: 1
  name: 'car'
}
item {
  name: "building"
  id: 2
  display_name: "Building"
}
"#;

    #[test]
    fn test_parse_label_map() {
        let map = LabelMap::parse(SAMPLE, Path::new("labels.pbtxt")).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.name(1), Some("car"));
        assert_eq!(map.name(2), Some("Building"));
        assert!(!map.contains(3));
    }

    #[test]
    fn test_parse_rejects_missing_id() {
        let err = LabelMap::parse("item {\n name: 'x'\n}\n", Path::new("l.pbtxt"));
        assert!(matches!(err, Err(Error::LabelMapParse { line: 3, .. })));
    }

    #[test]
    fn test_parse_rejects_unterminated() {
        let err = LabelMap::parse("item {\n id: 1\n", Path::new("l.pbtxt"));
        assert!(matches!(err, Err(Error::LabelMapParse { .. })));
    }

    #[test]
    fn test_parse_rejects_duplicate_id() {
        let text = "item {\n id: 1\n name: 'a'\n}\nitem {\n id: 1\n name: 'b'\n}\n";
        let err = LabelMap::parse(text, Path::new("l.pbtxt"));
        assert!(matches!(err, Err(Error::LabelMapParse { line: 8, .. })));
    }

    #[test]
    fn test_parse_single_line_items() {
        let text = "item { id: 1 name: 'car' } item{id:2 display_name:\"Truck\"}\n";
        let map = LabelMap::parse(text, Path::new("l.pbtxt")).unwrap();
        assert_eq!(map.name(1), Some("car"));
        assert_eq!(map.name(2), Some("Truck"));
    }

    #[test]
    fn test_hash_inside_quotes_is_kept() {
        let text = "item {\n  id: 1  # first\n  name: 'lot#3' # parking\n}\n";
        let map = LabelMap::parse(text, Path::new("l.pbtxt")).unwrap();
        assert_eq!(map.name(1), Some("lot#3"));
    }

    #[test]
    fn test_escaped_quote_in_name() {
        let map =
            LabelMap::parse(r"item { id: 4 name: 'driver\'s cab' }", Path::new("l.pbtxt")).unwrap();
        assert_eq!(map.name(4), Some("driver's cab"));
    }

    #[test]
    fn test_parse_rejects_unterminated_string() {
        let err = LabelMap::parse("item {\n id: 1\n name: 'car\n}\n", Path::new("l.pbtxt"));
        assert!(matches!(err, Err(Error::LabelMapParse { line: 3, .. })));
    }

    #[test]
    fn test_parse_rejects_nested_and_stray_tokens() {
        let nested = LabelMap::parse("item {\n item {\n", Path::new("l.pbtxt"));
        assert!(matches!(nested, Err(Error::LabelMapParse { line: 2, .. })));

        let stray = LabelMap::parse("id: 1\n", Path::new("l.pbtxt"));
        assert!(matches!(stray, Err(Error::LabelMapParse { line: 1, .. })));

        let bad_id = LabelMap::parse("item { id: one name: 'x' }", Path::new("l.pbtxt"));
        assert!(matches!(bad_id, Err(Error::LabelMapParse { .. })));
    }

    #[test]
    fn test_from_file_missing() {
        let err = LabelMap::from_file(Path::new("/nonexistent/labels.pbtxt"));
        assert!(matches!(err, Err(Error::LabelMapRead { .. })));
    }
}

//! Tokenizer for the text of a single annotation line.

use super::{AnnotationError, MARKER};
use std::iter::Peekable;
use std::str::CharIndices;

/// One lexical token of an annotation line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A bare word
    Word(String),
    /// A double-quoted string, unescaped
    Quoted(String),
    /// `<...>`
    Angle(String),
    /// `(...)`
    Paren(String),
    /// `#name`
    Tag(String),
    /// `key=value`; `quoted` is set when the value was written as a quoted string
    Flag {
        key: String,
        value: String,
        quoted: bool,
    },
    /// `name:type`
    Typed { name: String, ty: String },
    /// `->`
    Arrow,
}

impl Token {
    /// The token's value as plain text, with delimiters removed.
    ///
    /// `Typed` tokens are joined back together so words such as `read:pets` or
    /// `localhost:8080` survive unchanged.
    pub fn text(&self) -> String {
        match self {
            Token::Word(s) | Token::Quoted(s) | Token::Angle(s) | Token::Paren(s) => s.clone(),
            Token::Tag(s) => format!("#{}", s),
            Token::Flag { key, value, .. } => format!("{}={}", key, value),
            Token::Typed { name, ty } => format!("{}:{}", name, ty),
            Token::Arrow => "->".to_string(),
        }
    }

    pub fn is_quoted(&self) -> bool {
        matches!(self, Token::Quoted(_))
    }

    /// True for tokens written without delimiters (`Word` and `Typed`).
    pub fn is_bare(&self) -> bool {
        matches!(self, Token::Word(_) | Token::Typed { .. })
    }
}

/// Splits an annotation line into its verb and the remaining text.
///
/// Returns `None` when the line is not an annotation: after trimming it must start with
/// the marker immediately followed by an ASCII letter.
pub fn split_verb(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim().strip_prefix(MARKER)?;
    if !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    Some((&rest[..end], rest[end..].trim_start()))
}

/// Tokenizes the text following the verb.
pub fn tokenize(input: &str) -> Result<Vec<Token>, AnnotationError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let token = match c {
            '"' => {
                chars.next();
                Token::Quoted(read_quoted(&mut chars)?)
            }
            '<' => {
                chars.next();
                Token::Angle(read_delimited(&mut chars, '<', '>')?)
            }
            '(' => {
                chars.next();
                Token::Paren(read_delimited(&mut chars, '(', ')')?)
            }
            _ => {
                let word = read_word(input, start, &mut chars)?;
                classify_word(word)
            }
        };
        tokens.push(token);
    }

    Ok(tokens)
}

fn read_quoted(chars: &mut Peekable<CharIndices>) -> Result<String, AnnotationError> {
    let mut value = String::new();
    while let Some((_, c)) = chars.next() {
        match c {
            '"' => return Ok(value),
            '\\' => match chars.next() {
                Some((_, escaped)) => value.push(escaped),
                None => return Err(AnnotationError::UnterminatedQuote),
            },
            _ => value.push(c),
        }
    }
    Err(AnnotationError::UnterminatedQuote)
}

fn read_delimited(
    chars: &mut Peekable<CharIndices>,
    open: char,
    close: char,
) -> Result<String, AnnotationError> {
    let mut value = String::new();
    for (_, c) in chars.by_ref() {
        if c == close {
            return Ok(value.trim().to_string());
        }
        value.push(c);
    }
    Err(AnnotationError::UnterminatedDelimiter(open))
}

/// Reads a run of non-space characters. A `key="..."` flag keeps its quoted value, spaces
/// included, as part of the word, and so does a `<..>` generic argument list such as
/// `HashMap<String, i64>`.
fn read_word(
    input: &str,
    start: usize,
    chars: &mut Peekable<CharIndices>,
) -> Result<RawWord, AnnotationError> {
    let mut end = input.len();
    let mut depth = 0usize;
    while let Some(&(idx, c)) = chars.peek() {
        if c.is_whitespace() && depth == 0 {
            end = idx;
            break;
        }
        chars.next();

        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ => {}
        }

        if c == '=' && is_identifier(&input[start..idx]) {
            if let Some(&(_, '"')) = chars.peek() {
                chars.next();
                let value = read_quoted(chars)?;
                return Ok(RawWord::QuotedFlag {
                    key: input[start..idx].to_string(),
                    value,
                });
            }
        }
    }
    Ok(RawWord::Plain(input[start..end].to_string()))
}

enum RawWord {
    Plain(String),
    QuotedFlag { key: String, value: String },
}

fn classify_word(word: RawWord) -> Token {
    let word = match word {
        RawWord::QuotedFlag { key, value } => {
            return Token::Flag {
                key,
                value,
                quoted: true,
            }
        }
        RawWord::Plain(word) => word,
    };

    if word == "->" {
        return Token::Arrow;
    }

    if let Some(tag) = word.strip_prefix('#') {
        if !tag.is_empty() {
            return Token::Tag(tag.to_string());
        }
    }

    if let Some((key, value)) = word.split_once('=') {
        if is_identifier(key) {
            return Token::Flag {
                key: key.to_string(),
                value: value.to_string(),
                quoted: false,
            };
        }
    }

    if let Some((name, ty)) = word.split_once(':') {
        if !name.is_empty() && !ty.is_empty() && !ty.starts_with('/') && !name.contains('/') {
            return Token::Typed {
                name: name.to_string(),
                ty: ty.to_string(),
            };
        }
    }

    Token::Word(word)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    fn quoted(s: &str) -> Token {
        Token::Quoted(s.to_string())
    }

    #[test]
    fn test_split_verb() {
        assert_eq!(split_verb("  !GET /users  "), Some(("GET", "/users")));
        assert_eq!(split_verb("!model"), Some(("model", "")));
        assert_eq!(split_verb("Hello!"), None);
        assert_eq!(split_verb("! api"), None);
        assert_eq!(split_verb("!!api"), None);
        assert_eq!(split_verb(""), None);
    }

    #[test]
    fn test_tokenize_route_line() {
        let tokens = tokenize("/users -> getUsers \"Get all users\" #users #admin").unwrap();
        assert_eq!(
            tokens,
            vec![
                word("/users"),
                Token::Arrow,
                word("getUsers"),
                quoted("Get all users"),
                Token::Tag("users".to_string()),
                Token::Tag("admin".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_typed_and_flags() {
        let tokens = tokenize("limit:integer \"Number of results\" default=10 required").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Typed {
                    name: "limit".to_string(),
                    ty: "integer".to_string()
                },
                quoted("Number of results"),
                Token::Flag {
                    key: "default".to_string(),
                    value: "10".to_string(),
                    quoted: false
                },
                word("required"),
            ]
        );
    }

    #[test]
    fn test_tokenize_quoted_flag_value() {
        let tokens = tokenize("name:string example=\"John Doe\" required").unwrap();
        assert_eq!(
            tokens[1],
            Token::Flag {
                key: "example".to_string(),
                value: "John Doe".to_string(),
                quoted: true
            }
        );
        assert_eq!(tokens[2], word("required"));
    }

    #[test]
    fn test_tokenize_angle_and_paren() {
        let tokens = tokenize("\"Support\" <support@test.com> (active|inactive)").unwrap();
        assert_eq!(
            tokens,
            vec![
                quoted("Support"),
                Token::Angle("support@test.com".to_string()),
                Token::Paren("active|inactive".to_string()),
            ]
        );
    }

    #[test]
    fn test_urls_stay_words() {
        let tokens = tokenize("https://api.test.com/v1?debug=true \"Production\"").unwrap();
        assert_eq!(tokens[0], word("https://api.test.com/v1?debug=true"));
    }

    #[test]
    fn test_typed_text_round_trips() {
        let tokens = tokenize("read:pets localhost:8080").unwrap();
        assert_eq!(tokens[0].text(), "read:pets");
        assert_eq!(tokens[1].text(), "localhost:8080");
    }

    #[test]
    fn test_generic_arguments_stay_in_one_word() {
        let tokens = tokenize("m:HashMap<String, i64> \"Counts\"").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Typed {
                    name: "m".to_string(),
                    ty: "HashMap<String, i64>".to_string(),
                },
                quoted("Counts"),
            ]
        );
        assert_eq!(tokenize("a -> b").unwrap()[1], Token::Arrow);
    }

    #[test]
    fn test_escaped_quote() {
        let tokens = tokenize(r#""say \"hi\"""#).unwrap();
        assert_eq!(tokens, vec![quoted("say \"hi\"")]);
    }

    #[test]
    fn test_unterminated_quote_is_error() {
        assert_eq!(
            tokenize("users \"User operations"),
            Err(AnnotationError::UnterminatedQuote)
        );
        assert_eq!(
            tokenize("example=\"open"),
            Err(AnnotationError::UnterminatedQuote)
        );
    }

    #[test]
    fn test_unterminated_delimiters_are_errors() {
        assert_eq!(
            tokenize("\"Support\" <support@test.com"),
            Err(AnnotationError::UnterminatedDelimiter('<'))
        );
        assert_eq!(
            tokenize("(a|b"),
            Err(AnnotationError::UnterminatedDelimiter('('))
        );
    }

    #[test]
    fn test_lone_hash_and_dash_are_words() {
        let tokens = tokenize("# - nil").unwrap();
        assert_eq!(tokens, vec![word("#"), word("-"), word("nil")]);
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("   ").unwrap().is_empty());
    }
}

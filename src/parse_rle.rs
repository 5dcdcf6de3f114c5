use thiserror::Error;
use tracing::warn;

use crate::WorldOffset;
use crate::parse_util;
use crate::parse_util::ConvertError;
use crate::parse_util::ParseError;
use crate::rule_set;
use crate::rule_set::RuleError;
use crate::rule_set::RuleSet;

/// Everything an RLE file says about its pattern, besides the cells themselves.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RleFile<'a> {
    pub name: Option<&'a [u8]>,
    pub author: Option<&'a [u8]>,
    pub comments: Vec<&'a [u8]>,
    /// Position of the top left corner of the pattern
    pub offset: Option<(WorldOffset, WorldOffset)>,
    /// Width and height announced by the header line
    pub size: Option<(u64, u64)>,
    pub rule: Option<RuleSet>,
}

#[derive(Debug, Error)]
pub enum RleError {
    #[error("Comment line error: {0}")]
    CommentLine(#[from] RleCommentLineError),

    #[error("Header line error: {0}")]
    HeaderLine(#[from] RleHeaderLineError),

    #[error("Encoding error: {0}")]
    Encoding(#[from] RleEncodingError),
}

/// Parse the RLE file format, calling `f(x, y)` for every living cell. Rows grow southwards from
/// the offset given by a `#P` or `#R` line, or from the origin.
///
/// See: https://conwaylife.com/wiki/Run_Length_Encoded
pub fn read_rle<F>(mut bytes: &'_ [u8], f: F) -> Result<RleFile<'_>, RleError>
where
    F: FnMut(WorldOffset, WorldOffset),
{
    let mut file = RleFile::default();

    // Parse as many comment lines as possible
    loop {
        let res = read_line_comment(parse_util::take_ws(bytes))?;
        let (Some(line), rest) = res else { break };

        match line {
            RleCommentLine::Comment { text } => {
                if !text.is_empty() {
                    file.comments.push(text);
                }
            }
            RleCommentLine::Name { name } => {
                if file.name.is_some() {
                    warn!("RLE file name already defined. Using latest");
                }

                file.name = Some(name);
            }
            RleCommentLine::Author { author } => {
                if file.author.is_some() {
                    warn!("RLE author already defined. Using latest");
                }

                file.author = Some(author);
            }
            RleCommentLine::Offset { x, y } => {
                if file.offset.is_some() {
                    warn!("RLE offset already defined. Using latest");
                }

                file.offset = Some((x, y))
            }
            RleCommentLine::Rule { rule } => {
                file.rule = Some(rule);
            }
        }

        bytes = rest;
    }

    bytes = parse_util::take_ws(bytes);

    // Parse header line, if it's present
    let res = read_line_header(bytes)?;
    if let (Some(header), rest) = res {
        let RleHeaderLine {
            width,
            height,
            rule,
        } = header;

        file.size = Some((width, height));

        if let Some(rule) = rule {
            if file.rule.is_some_and(|r| r != rule) {
                warn!(%rule, "RLE rule already defined. Using latest");
            }

            file.rule = Some(rule);
        }

        bytes = rest;
    }

    let (dx, dy) = file.offset.unwrap_or_default();

    read_encoding(bytes, dx, dy, f)?;

    Ok(file)
}

enum RleCommentLine<'a> {
    Comment { text: &'a [u8] },
    Name { name: &'a [u8] },
    Author { author: &'a [u8] },
    Offset { x: WorldOffset, y: WorldOffset },
    Rule { rule: RuleSet },
}

#[derive(Debug, Error)]
pub enum RleCommentLineError {
    #[error("No comment type")]
    NoType,

    #[error("Empty name line")]
    EmptyName,

    #[error("Empty author line")]
    EmptyAuthor,

    #[error("Invalid rule: {0}")]
    InvalidRule(#[from] RuleError),

    #[error("Invalid coordinates: {0}")]
    InvalidCoord(#[from] RleCoordError),

    #[error("Invalid comment type, found '{got}'")]
    InvalidType { got: char },

    #[error("Unexpected '{got}' at the end of the line")]
    TrailingToken { got: char },
}

/// Attempt to parse a comment line, otherwise leaves `bytes` as-is.
fn read_line_comment(
    bytes: &'_ [u8],
) -> Result<(Option<RleCommentLine<'_>>, &'_ [u8]), RleCommentLineError> {
    let Ok(bytes) = parse_util::expect(b'#', bytes) else {
        return Ok((None, bytes));
    };

    let (Some(b), bytes) = parse_util::take_1(bytes) else {
        return Err(RleCommentLineError::NoType);
    };

    match b {
        // Comment line
        b'C' | b'c' => {
            let (text, bytes) = read_rest_of_line(bytes);

            Ok((Some(RleCommentLine::Comment { text }), bytes))
        }

        // Pattern name
        b'N' => {
            let (name, bytes) = read_rest_of_line(bytes);
            if name.is_empty() {
                return Err(RleCommentLineError::EmptyName);
            }

            Ok((Some(RleCommentLine::Name { name }), bytes))
        }

        // Pattern author
        b'O' => {
            let (author, bytes) = read_rest_of_line(bytes);
            if author.is_empty() {
                return Err(RleCommentLineError::EmptyAuthor);
            }

            Ok((Some(RleCommentLine::Author { author }), bytes))
        }

        // Pattern offset
        b'R' | b'P' => {
            let ((x, y), bytes) = read_coordinates(bytes)?;
            let bytes = end_of_line(bytes)
                .map_err(|got| RleCommentLineError::TrailingToken { got: got as char })?;

            Ok((Some(RleCommentLine::Offset { x, y }), bytes))
        }

        // Pattern rules
        b'r' => {
            let bytes = parse_util::take_blanks(bytes);
            let (rule, bytes) = read_rule(bytes)?;
            let bytes = end_of_line(bytes)
                .map_err(|got| RleCommentLineError::TrailingToken { got: got as char })?;

            Ok((Some(RleCommentLine::Rule { rule }), bytes))
        }

        b => Err(RleCommentLineError::InvalidType { got: b as char }),
    }
}

struct RleHeaderLine {
    width: u64,
    height: u64,
    rule: Option<RuleSet>,
}

#[derive(Debug, Error)]
pub enum RleHeaderLineError {
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    #[error("Missing value for '{name}'")]
    MissingDimension { name: char },

    #[error("Failed to parse '{name}': {source}")]
    Dimension {
        name: char,
        #[source]
        source: ConvertError,
    },

    #[error("Invalid token: expected ',' or '\\n', found '{got}'")]
    InvalidToken { got: char },

    #[error("Invalid rule: {0}")]
    InvalidRule(#[from] RuleError),
}

/// Attempt to parse a header line, otherwise leaves `bytes` as-is.
fn read_line_header(bytes: &[u8]) -> Result<(Option<RleHeaderLine>, &[u8]), RleHeaderLineError> {
    if parse_util::peek_1(bytes) != Some(b'x') {
        return Ok((None, bytes));
    }

    let (width, bytes) = read_dimension(b'x', bytes)?;
    let bytes = parse_util::take_blanks(bytes);
    let bytes = parse_util::expect(b',', bytes)?;
    let bytes = parse_util::take_blanks(bytes);
    let (height, bytes) = read_dimension(b'y', bytes)?;
    let bytes = parse_util::take_blanks(bytes);

    let (rule, bytes) = match parse_util::take_1(bytes) {
        (Some(b','), rest) => {
            let rest = parse_util::take_blanks(rest);
            let rest = parse_util::expect_slice(b"rule", rest)?;
            let rest = parse_util::take_blanks(rest);
            let rest = parse_util::expect(b'=', rest)?;
            let rest = parse_util::take_blanks(rest);

            let (rule, rest) = read_rule(rest)?;

            (Some(rule), rest)
        }
        _ => (None, bytes),
    };

    let bytes = end_of_line(bytes).map_err(|got| RleHeaderLineError::InvalidToken { got: got as char })?;

    let line = RleHeaderLine {
        width,
        height,
        rule,
    };

    Ok((Some(line), bytes))
}

/// Parse `name = <digits>`.
fn read_dimension(name: u8, bytes: &[u8]) -> Result<(u64, &[u8]), RleHeaderLineError> {
    let bytes = parse_util::expect(name, bytes)?;
    let bytes = parse_util::take_blanks(bytes);
    let bytes = parse_util::expect(b'=', bytes)?;
    let bytes = parse_util::take_blanks(bytes);

    let (Some(digits), bytes) = parse_util::take_digits(bytes) else {
        return Err(RleHeaderLineError::MissingDimension { name: name as char });
    };

    let value = parse_util::convert(digits).map_err(|source| RleHeaderLineError::Dimension {
        name: name as char,
        source,
    })?;

    Ok((value, bytes))
}

#[derive(Debug, Error)]
pub enum RleEncodingError {
    #[error("Unexpected EOF, the pattern must end with '!'")]
    UnexpectedEof,

    #[error("Failed to convert run length: {0}")]
    RunLength(#[from] ConvertError),

    #[error("Pattern does not fit in the world")]
    Overflow,

    #[error("Unrecognized byte: 0x{got:0X}")]
    UnrecognizedByte { got: u8 },
}

fn read_encoding<F>(
    mut bytes: &[u8],
    dx: WorldOffset,
    dy: WorldOffset,
    mut f: F,
) -> Result<(), RleEncodingError>
where
    F: FnMut(WorldOffset, WorldOffset),
{
    let mut rep: WorldOffset = 1;

    let (mut x, mut y): (WorldOffset, WorldOffset) = (0, 0);

    loop {
        let Some(b) = parse_util::peek_1(bytes) else {
            return Err(RleEncodingError::UnexpectedEof);
        };

        match b {
            // Line breaks may show up between any two items
            b' ' | b'\t' | b'\r' | b'\n' => {
                let (_, rest) = parse_util::take_1(bytes);
                bytes = rest;
            }

            // End of input
            b'!' => break,

            // Dead cell
            b'b' => {
                let (_, rest) = parse_util::take_1(bytes);
                bytes = rest;

                x = x.checked_add(rep).ok_or(RleEncodingError::Overflow)?;

                rep = 1;
            }

            // Live cell
            b'o' => {
                let (_, rest) = parse_util::take_1(bytes);
                bytes = rest;

                let left = dx.checked_add(x).ok_or(RleEncodingError::Overflow)?;
                let top = dy.checked_add(y).ok_or(RleEncodingError::Overflow)?;
                let right = left.checked_add(rep).ok_or(RleEncodingError::Overflow)?;

                for cx in left..right {
                    f(cx, top)
                }

                x = x.checked_add(rep).ok_or(RleEncodingError::Overflow)?;

                rep = 1;
            }

            // End of line
            b'$' => {
                let (_, rest) = parse_util::take_1(bytes);
                bytes = rest;

                y = y.checked_add(rep).ok_or(RleEncodingError::Overflow)?;
                x = 0;

                rep = 1;
            }

            n if n.is_ascii_digit() => {
                let (digits, rest) = parse_util::take_digits(bytes);
                bytes = rest;

                rep = parse_util::convert(digits.unwrap_or_default())?;
            }

            b => return Err(RleEncodingError::UnrecognizedByte { got: b }),
        }
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum RleCoordError {
    #[error("Expected x coordinate, found end of line")]
    NoX,

    #[error("Failed to parse x coordinate: {0}")]
    ParseX(#[source] ConvertError),

    #[error("Expected y coordinate, found end of line")]
    NoY,

    #[error("Failed to parse y coordinate: {0}")]
    ParseY(#[source] ConvertError),
}

/// Parse two blank separated integers, as found in `#P -3 -4`.
fn read_coordinates(bytes: &[u8]) -> Result<((WorldOffset, WorldOffset), &[u8]), RleCoordError> {
    let is_end = |b: u8| b.is_ascii_whitespace();

    let bytes = parse_util::take_blanks(bytes);
    let (Some(x_bytes), bytes) = parse_util::take_until_fn(is_end, bytes) else {
        return Err(RleCoordError::NoX);
    };
    let x: WorldOffset = parse_util::convert(x_bytes).map_err(RleCoordError::ParseX)?;

    let bytes = parse_util::take_blanks(bytes);
    let (Some(y_bytes), bytes) = parse_util::take_until_fn(is_end, bytes) else {
        return Err(RleCoordError::NoY);
    };
    let y: WorldOffset = parse_util::convert(y_bytes).map_err(RleCoordError::ParseY)?;

    Ok(((x, y), bytes))
}

/// Rules show up both as `B3/S23` and as the survival first `23/3`.
fn read_rule(bytes: &[u8]) -> Result<(RuleSet, &[u8]), RuleError> {
    match parse_util::peek_1(bytes) {
        Some(b'b' | b'B') => rule_set::parse_rule(bytes),
        _ => rule_set::parse_nameless_rule(bytes),
    }
}

/// The trimmed rest of the line, and what follows it.
fn read_rest_of_line(bytes: &[u8]) -> (&[u8], &[u8]) {
    let (line, rest) = parse_util::take_with(b'\n', bytes);

    (line.unwrap_or_default().trim_ascii(), rest)
}

/// Skip trailing blanks and the line break. Anything else is handed back as an error.
fn end_of_line(bytes: &[u8]) -> Result<&[u8], u8> {
    let bytes = parse_util::take_blanks(bytes);

    match parse_util::take_1(bytes) {
        (None, rest) | (Some(b'\n'), rest) => Ok(rest),
        (Some(b'\r'), rest) => Ok(rest.strip_prefix(b"\n").unwrap_or(rest)),
        (Some(b), _) => Err(b),
    }
}

#[cfg(test)]
mod test {
    use super::RleEncodingError;
    use super::RleError;
    use super::RleFile;
    use super::read_rle;
    use crate::WorldOffset;
    use crate::rule_set::B3S23;
    use crate::rule_set::RuleSet;

    fn cells(bytes: &[u8]) -> Result<(RleFile<'_>, Vec<(WorldOffset, WorldOffset)>), RleError> {
        let mut cells = Vec::new();
        let file = read_rle(bytes, |x, y| cells.push((x, y)))?;

        Ok((file, cells))
    }

    #[test]
    fn read_coordinates() {
        let bytes = b" -3 12\n";
        let ((x, y), rest) = super::read_coordinates(bytes.as_slice()).unwrap();

        assert_eq!((x, y), (-3, 12));
        assert_eq!(rest, b"\n");
    }

    #[test]
    fn glider() {
        let bytes = b"#N Glider\n#O Richard K. Guy\n#C The smallest spaceship\nx = 3, y = 3, rule = B3/S23\nbob$2bo$3o!\n";

        let (file, cells) = cells(bytes).unwrap();

        assert_eq!(file.name, Some(&b"Glider"[..]));
        assert_eq!(file.author, Some(&b"Richard K. Guy"[..]));
        assert_eq!(file.comments, vec![&b"The smallest spaceship"[..]]);
        assert_eq!(file.size, Some((3, 3)));
        assert_eq!(file.rule, Some(B3S23));
        assert_eq!(cells, vec![(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)]);
    }

    #[test]
    fn offsets_and_blank_rows() {
        let bytes = b"#P -1 -2\nx = 2, y = 4\no2$bo!";

        let (file, cells) = cells(bytes).unwrap();

        assert_eq!(file.offset, Some((-1, -2)));
        assert_eq!(file.rule, None);
        assert_eq!(cells, vec![(-1, -2), (0, 0)]);
    }

    #[test]
    fn crlf_line_breaks() {
        let bytes = b"x = 12, y = 1\r\n6o\r\n6o!\r\n";

        let (_, cells) = cells(bytes).unwrap();

        assert_eq!(cells.len(), 12);
        assert_eq!(cells.last(), Some(&(11, 0)));
    }

    #[test]
    fn nameless_rules() {
        let bytes = b"#r 23/36\nx = 1, y = 1\no!";
        let (file, _) = cells(bytes).unwrap();
        assert_eq!(file.rule, Some(RuleSet::new(0b100_1000, 0b1100).unwrap()));

        let bytes = b"x = 1, y = 1, rule = 23/3\no!";
        let (file, _) = cells(bytes).unwrap();
        assert_eq!(file.rule, Some(B3S23));
    }

    #[test]
    fn header_is_optional() {
        let (file, cells) = cells(b"2o$2o!").unwrap();

        assert_eq!(file, RleFile::default());
        assert_eq!(cells, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn errors() {
        assert!(matches!(cells(b"x = 1, y = 1\no"), Err(RleError::Encoding(_))));
        assert!(matches!(cells(b"x = 1, y = 1\nozo!"), Err(RleError::Encoding(_))));
        assert!(matches!(cells(b"#Z what\no!"), Err(RleError::CommentLine(_))));
        assert!(matches!(cells(b"#N\no!"), Err(RleError::CommentLine(_))));
        assert!(matches!(cells(b"x = 1, y = 1, rule = B9/S\no!"), Err(RleError::HeaderLine(_))));
        assert!(matches!(cells(b"x = 1; y = 1\no!"), Err(RleError::HeaderLine(_))));
    }

    #[test]
    fn long_runs_overflow() {
        assert!(matches!(
            cells(b"#P -10 0\n9223372036854775807bo!"),
            Err(RleError::Encoding(RleEncodingError::Overflow))
        ));
    }
}

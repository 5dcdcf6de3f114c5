use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::parse_util;

/// Neighbour counts run from 0 to 8, so masks only use their low nine bits.
pub const MASK_ALL: u16 = 0x1FF;

/// Rules of Conway's Game of Life.
pub const B3S23: RuleSet = RuleSet::packed(0b1000, 0b1100);

/// # Representation
/// Life rules are represented as
/// ```notrust
/// |------birth------|
/// 0000_0000_0000_0000_0000_0000_0000_0000
///                     |----survival-----|
/// ```
///
/// Bit `i` of either half is set when `i` living neighbours cause a birth (or a survival).
///
/// # Examples
/// ```notrust
/// b3s23:                0000_0000_0000_1000_0000_0000_0000_1100
///
/// b0s0:                 0000_0000_0000_0000_0000_0000_0000_0000
/// b012345678s012345678: 0000_0001_1111_1111_0000_0001_1111_1111
/// ```
///
/// See: https://conwaylife.com/wiki/Rulestring
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleSet {
    rule: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("Birth mask {mask:#b} refers to neighbour counts above 8")]
    BirthOutOfRange { mask: u16 },

    #[error("Survival mask {mask:#b} refers to neighbour counts above 8")]
    SurvivalOutOfRange { mask: u16 },

    #[error("Neighbour count '{got}' is not in 0..=8")]
    InvalidCount { got: char },

    #[error("Expected '{exp}', found '{got}'")]
    UnexpectedToken { exp: char, got: char },

    #[error("Unexpected end of rule, expected '{exp}'")]
    UnexpectedEnd { exp: char },

    #[error("Unexpected trailing input \"{rest}\"")]
    TrailingInput { rest: String },
}

impl From<parse_util::ParseError> for RuleError {
    fn from(err: parse_util::ParseError) -> Self {
        match err {
            parse_util::ParseError::UnexpectedEof { exp } => RuleError::UnexpectedEnd { exp },
            parse_util::ParseError::UnexpectedToken { exp, got } => {
                RuleError::UnexpectedToken { exp, got }
            }
            parse_util::ParseError::UnexpectedSlice { got, .. } => {
                RuleError::TrailingInput { rest: got }
            }
        }
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        B3S23
    }
}

impl RuleSet {
    const fn packed(b: u16, s: u16) -> Self {
        Self {
            rule: (b as u32) << 16 | s as u32,
        }
    }

    /// Create a new `RuleSet` for the given births and survivals. For both `b` and `s`, numbers
    /// are set on a bit basis: if bit `i` of `b` is on, `i` is included in the set of births.
    ///
    /// Masks with any bit past the 8th set are rejected.
    pub fn new(b: u16, s: u16) -> Result<Self, RuleError> {
        if b & !MASK_ALL != 0 {
            return Err(RuleError::BirthOutOfRange { mask: b });
        }

        if s & !MASK_ALL != 0 {
            return Err(RuleError::SurvivalOutOfRange { mask: s });
        }

        Ok(Self::packed(b, s))
    }

    pub fn births(&self) -> u16 {
        ((self.rule >> 16) & MASK_ALL as u32) as u16
    }

    pub fn survivals(&self) -> u16 {
        (self.rule & MASK_ALL as u32) as u16
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuleSet({self})")
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = |mask: u16| -> String {
            (0..=8)
                .filter(|i| mask >> i & 1 == 1)
                .map(|i| char::from(b'0' + i as u8))
                .collect()
        };

        write!(f, "B{}/S{}", digits(self.births()), digits(self.survivals()))
    }
}

/// Accepts `B3/S23`, `b3s23` and the survival-first `23/3` found in RLE `#r` lines.
impl FromStr for RuleSet {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.trim().as_bytes();

        let (rule, rest) = match parse_util::peek_1(bytes) {
            Some(b'b' | b'B') => parse_rule(bytes)?,
            _ => parse_nameless_rule(bytes)?,
        };

        if !rest.is_empty() {
            return Err(RuleError::TrailingInput {
                rest: String::from_utf8_lossy(rest).to_string(),
            });
        }

        Ok(rule)
    }
}

// Parse rules that look like b3/s23 or b3s23
pub(crate) fn parse_rule(bytes: &[u8]) -> Result<(RuleSet, &[u8]), RuleError> {
    let bytes = match parse_util::take_1(bytes) {
        (Some(b'b' | b'B'), rest) => rest,
        (Some(got), _) => return Err(RuleError::UnexpectedToken { exp: 'B', got: got as char }),
        (None, _) => return Err(RuleError::UnexpectedEnd { exp: 'B' }),
    };

    let (b, bytes) = parse_util::take_digits(bytes);
    let bytes = bytes.strip_prefix(b"/").unwrap_or(bytes);

    let bytes = match parse_util::take_1(bytes) {
        (Some(b's' | b'S'), rest) => rest,
        (Some(got), _) => return Err(RuleError::UnexpectedToken { exp: 'S', got: got as char }),
        (None, _) => return Err(RuleError::UnexpectedEnd { exp: 'S' }),
    };

    let (s, bytes) = parse_util::take_digits(bytes);

    let rule = RuleSet::new(counts_to_mask(b)?, counts_to_mask(s)?)?;

    Ok((rule, bytes))
}

// Parse rules that look like 23/3, survivals first. These show up in RLE #r comment lines.
pub(crate) fn parse_nameless_rule(bytes: &[u8]) -> Result<(RuleSet, &[u8]), RuleError> {
    let (s, bytes) = parse_util::take_digits(bytes);
    let bytes = parse_util::expect(b'/', bytes)?;
    let (b, bytes) = parse_util::take_digits(bytes);

    let rule = RuleSet::new(counts_to_mask(b)?, counts_to_mask(s)?)?;

    Ok((rule, bytes))
}

/// Convert the human readable neighbour counts to a packed bit representation
fn counts_to_mask(counts: Option<&[u8]>) -> Result<u16, RuleError> {
    let mut mask = 0;

    for &c in counts.unwrap_or_default() {
        if !(b'0'..=b'8').contains(&c) {
            return Err(RuleError::InvalidCount { got: c as char });
        }

        mask |= 1 << (c - b'0');
    }

    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::B3S23;
    use super::RuleError;
    use super::RuleSet;

    #[test]
    fn life_masks() {
        assert_eq!(B3S23.births(), 1 << 3);
        assert_eq!(B3S23.survivals(), 1 << 2 | 1 << 3);
        assert_eq!(RuleSet::default(), B3S23);
    }

    #[test]
    fn parses_every_notation() {
        for s in ["B3/S23", "b3s23", "B3S23", "23/3", " b3/s23\n"] {
            assert_eq!(s.parse::<RuleSet>(), Ok(B3S23), "failed on {s:?}");
        }

        let highlife: RuleSet = "B36/S23".parse().unwrap();
        assert_eq!(highlife.births(), 1 << 3 | 1 << 6);

        let seeds: RuleSet = "B2/S".parse().unwrap();
        assert_eq!(seeds.survivals(), 0);
    }

    #[test]
    fn displays_canonical_form() {
        assert_eq!(B3S23.to_string(), "B3/S23");
        assert_eq!(RuleSet::new(0x1FF, 0).unwrap().to_string(), "B012345678/S");
    }

    #[test]
    fn rejects_bad_rules() {
        assert_eq!(
            "B9/S23".parse::<RuleSet>(),
            Err(RuleError::InvalidCount { got: '9' })
        );
        assert!("B3/X23".parse::<RuleSet>().is_err());
        assert!("B3/S23 junk".parse::<RuleSet>().is_err());
        assert!("".parse::<RuleSet>().is_err());
    }

    #[test]
    fn rejects_wide_masks() {
        assert_eq!(
            RuleSet::new(1 << 9, 0),
            Err(RuleError::BirthOutOfRange { mask: 1 << 9 })
        );
        assert_eq!(
            RuleSet::new(0, 0xFFFF),
            Err(RuleError::SurvivalOutOfRange { mask: 0xFFFF })
        );
    }
}

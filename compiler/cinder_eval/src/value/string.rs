//! Immutable strings indexed by grapheme cluster.

use std::fmt;
use std::rc::Rc;

use unicode_segmentation::UnicodeSegmentation;

use crate::errors::{
    invalid_slice_index, string_index_out_of_bounds, string_slice_indices, EvalResult,
};

/// A string value. Cloning shares the buffer; strings are never mutated in place.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringValue(Rc<str>);

impl StringValue {
    pub fn new(s: &str) -> Self {
        StringValue(Rc::from(s))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of user-perceived characters.
    pub fn length(&self) -> usize {
        self.0.graphemes(true).count()
    }

    /// The character at `index`.
    pub fn character_at(&self, index: i128) -> EvalResult<StringValue> {
        let length = self.length();
        usize::try_from(index)
            .ok()
            .and_then(|i| self.0.graphemes(true).nth(i))
            .map(StringValue::new)
            .ok_or_else(|| string_index_out_of_bounds(index, length))
    }

    /// Characters in `[from, up_to)`.
    ///
    /// Bounds are checked before ordering, so `slice(0, 10)` on a short string
    /// reports the bounds, while `slice(2, 1)` reports the inverted range.
    pub fn slice(&self, from: i128, up_to: i128) -> EvalResult<StringValue> {
        let length = self.length();
        let in_bounds = |i: i128| (0..=length as i128).contains(&i);
        if !in_bounds(from) || !in_bounds(up_to) {
            return Err(string_slice_indices(from, up_to, length));
        }
        if from > up_to {
            return Err(invalid_slice_index(from, up_to));
        }
        // Both bounds were checked against `length` above.
        let (from, up_to) = (from as usize, up_to as usize);
        let sliced: String = self
            .0
            .graphemes(true)
            .skip(from)
            .take(up_to - from)
            .collect();
        Ok(StringValue::from(sliced))
    }

    pub fn concat(&self, other: &StringValue) -> StringValue {
        let mut joined = String::with_capacity(self.0.len() + other.0.len());
        joined.push_str(&self.0);
        joined.push_str(&other.0);
        StringValue::from(joined)
    }

    pub fn contains(&self, other: &StringValue) -> bool {
        self.0.contains(&*other.0)
    }

    pub fn to_lower(&self) -> StringValue {
        StringValue::from(self.0.to_lowercase())
    }

    pub fn split(&self, separator: &StringValue) -> Vec<StringValue> {
        self.0.split(&*separator.0).map(StringValue::new).collect()
    }

    pub fn replace_all(&self, of: &StringValue, with: &StringValue) -> StringValue {
        if of.0.is_empty() {
            return self.clone();
        }
        StringValue::from(self.0.replace(&*of.0, &with.0))
    }

    pub fn utf8(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn graphemes(&self) -> impl Iterator<Item = &str> {
        self.0.graphemes(true)
    }
}

impl From<String> for StringValue {
    fn from(s: String) -> Self {
        StringValue(Rc::from(s))
    }
}

impl From<&str> for StringValue {
    fn from(s: &str) -> Self {
        StringValue::new(s)
    }
}

impl fmt::Display for StringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for StringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

/// Quote a string the way values print: `"a\"b"`.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use crate::errors::EvalErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_length_counts_graphemes() {
        assert_eq!(StringValue::new("abc").length(), 3);
        assert_eq!(StringValue::new("e\u{301}").length(), 1);
        assert_eq!(StringValue::new("🇨🇭x").length(), 2);
    }

    #[test]
    fn test_slice_errors() {
        let s = StringValue::new("abcdef");
        assert_eq!(
            s.slice(2, 1).unwrap_err().kind,
            EvalErrorKind::InvalidSliceIndex { from: 2, up_to: 1 }
        );
        assert_eq!(
            s.slice(0, 10).unwrap_err().kind,
            EvalErrorKind::StringSliceIndices {
                from: 0,
                up_to: 10,
                length: 6
            }
        );
        assert_eq!(s.slice(1, 4).unwrap().as_str(), "bcd");
        assert_eq!(s.slice(6, 6).unwrap().as_str(), "");
    }

    #[test]
    fn test_character_at() {
        let s = StringValue::new("héllo");
        assert_eq!(s.character_at(1).unwrap().as_str(), "é");
        assert_eq!(
            s.character_at(5).unwrap_err().kind,
            EvalErrorKind::StringIndexOutOfBounds {
                index: 5,
                length: 5
            }
        );
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("a\"b\n"), "\"a\\\"b\\n\"");
    }
}

//! Metadata tokens.
//!
//! A [`Token`] is the 32-bit handle every metadata row is addressed by: the high byte
//! names the table (see [`crate::metadata::tables::TableId`]) and the low 24 bits are
//! the 1-based row index within that table. Row 0 is the nil handle.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::metadata::tables::TableId;

/// A metadata token, identifying one row of one metadata table.
///
/// # Examples
///
/// ```rust
/// use dotimport::{Token, metadata::tables::TableId};
///
/// let token = Token::new(0x0200_0005);
/// assert_eq!(token.table(), 0x02);
/// assert_eq!(token.row(), 5);
/// assert_eq!(token.kind(), Some(TableId::TypeDef));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Token(pub u32);

impl Token {
    /// Create a token from its raw value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Create a token from a table and a 1-based row
    #[must_use]
    pub fn from_parts(table: TableId, row: u32) -> Self {
        Token(((table as u32) << 24) | (row & 0x00FF_FFFF))
    }

    /// The raw 32-bit value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The table byte of this token
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The table this token points into, if the table byte is a known table
    #[must_use]
    pub fn kind(&self) -> Option<TableId> {
        TableId::from_byte(self.table())
    }

    /// The 1-based row index
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// `true` if this is the nil token of its table
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.row() == 0
    }

    /// `true` if this token points into `table`
    #[must_use]
    pub fn is_table(&self, table: TableId) -> bool {
        self.table() == table as u8
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_token_parts() {
        let token = Token::new(0x0600_0001);
        assert_eq!(token.value(), 0x0600_0001);
        assert_eq!(token.table(), 0x06);
        assert_eq!(token.row(), 1);
        assert_eq!(token.kind(), Some(TableId::MethodDef));

        let token = Token::new(0x06FF_FFFF);
        assert_eq!(token.row(), 0x00FF_FFFF);
    }

    #[test]
    fn test_token_from_parts() {
        let token = Token::from_parts(TableId::TypeSpec, 3);
        assert_eq!(token, Token::new(0x1B00_0003));
        assert!(token.is_table(TableId::TypeSpec));
        assert!(!token.is_table(TableId::TypeRef));
    }

    #[test]
    fn test_token_is_null() {
        assert!(Token::new(0).is_null());
        assert!(Token::new(0x0800_0000).is_null());
        assert!(!Token::new(0x0600_0001).is_null());
    }

    #[test]
    fn test_token_unknown_table() {
        assert_eq!(Token::new(0x7F00_0001).kind(), None);
    }

    #[test]
    fn test_token_from_conversion() {
        let value = 0x0600_0001u32;
        let token: Token = value.into();
        assert_eq!(token.value(), value);

        let back_to_u32: u32 = token.into();
        assert_eq!(back_to_u32, value);
    }

    #[test]
    fn test_token_formatting() {
        let token = Token(0x0600_0001);
        assert_eq!(format!("{}", token), "0x06000001");

        let debug_str = format!("{:?}", token);
        assert!(debug_str.contains("Token(0x06000001"));
        assert!(debug_str.contains("table: 0x06"));
        assert!(debug_str.contains("row: 1"));
    }

    #[test]
    fn test_token_hash() {
        let mut map = HashMap::new();
        map.insert(Token(0x0200_0001), "first");
        map.insert(Token(0x0200_0002), "second");
        assert_eq!(map.get(&Token(0x0200_0001)), Some(&"first"));
        assert_eq!(map.get(&Token(0x0200_0003)), None);
    }
}

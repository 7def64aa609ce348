//! UTF-8 decoding on top of a [`ByteStream`], with one character of
//! push-back.

use crate::{
    error::{CsvError, Result},
    source::ByteStream,
};

/// A location in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// 1-based line. `CR`, `LF` and `CR LF` each count as one line break.
    pub line: u64,
    /// 1-based column, counted in characters.
    pub column: u64,
    /// Offset in the raw input, byte-order mark included.
    pub byte: u64,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            line: 1,
            column: 1,
            byte: 0,
        }
    }
}

/// One-character lookahead slot.
///
/// Holds at most one character, together with the position it was read at.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Pushback {
    slot: Option<(char, Position)>,
}

impl Pushback {
    #[inline]
    fn take(&mut self) -> Option<(char, Position)> {
        self.slot.take()
    }

    #[inline]
    fn put(&mut self, ch: char, at: Position) {
        debug_assert!(self.slot.is_none(), "push-back slot already full");
        self.slot = Some((ch, at));
    }

    fn peek_position(&self) -> Option<Position> {
        self.slot.map(|(_, at)| at)
    }
}

/// Number of bytes in the sequence introduced by `lead`, or 0 if `lead`
/// cannot start one.
#[inline]
fn sequence_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}

/// Reads characters from a [`ByteStream`].
#[derive(Debug)]
pub(crate) struct CharReader<S> {
    source: S,
    pushback: Pushback,
    /// Where the next character from `source` starts.
    cursor: Position,
    /// Where the last returned character started.
    last: Position,
    after_cr: bool,
}

impl<S: ByteStream> CharReader<S> {
    pub(crate) fn new(source: S) -> Self {
        Self {
            source,
            pushback: Pushback::default(),
            cursor: Position::default(),
            last: Position::default(),
            after_cr: false,
        }
    }

    /// Returns the next character, taking the pushed-back one first.
    pub(crate) fn read(&mut self) -> Result<Option<char>> {
        if let Some((ch, at)) = self.pushback.take() {
            self.last = at;
            return Ok(Some(ch));
        }
        let at = Position {
            byte: self.source.offset(),
            ..self.cursor
        };
        let Some(ch) = self.decode()? else {
            return Ok(None);
        };
        self.last = at;
        self.advance(ch);
        Ok(Some(ch))
    }

    /// Un-reads `ch`, which must be the character just returned by
    /// [`read`](Self::read).
    pub(crate) fn push_back(&mut self, ch: char) {
        self.pushback.put(ch, self.last);
    }

    /// Position of the character last returned by [`read`](Self::read).
    pub(crate) fn last_position(&self) -> Position {
        self.last
    }

    /// Position of the next character to be read.
    pub(crate) fn position(&self) -> Position {
        self.pushback.peek_position().unwrap_or(Position {
            byte: self.source.offset(),
            ..self.cursor
        })
    }

    pub(crate) fn source(&self) -> &S {
        &self.source
    }

    fn advance(&mut self, ch: char) {
        match ch {
            '\n' if self.after_cr => {}
            '\r' | '\n' => {
                self.cursor.line += 1;
                self.cursor.column = 1;
            }
            _ => self.cursor.column += 1,
        }
        self.after_cr = ch == '\r';
    }

    fn decode(&mut self) -> Result<Option<char>> {
        let offset = self.source.offset();
        let Some(lead) = self.source.next_byte()? else {
            return Ok(None);
        };
        if lead.is_ascii() {
            return Ok(Some(char::from(lead)));
        }

        let len = sequence_len(lead);
        if len == 0 {
            return Err(CsvError::InvalidUtf8 { offset });
        }
        let mut buf = [lead, 0, 0, 0];
        for slot in &mut buf[1..len] {
            *slot = self
                .source
                .next_byte()?
                .ok_or(CsvError::InvalidUtf8 { offset })?;
        }
        match bstr::decode_utf8(&buf[..len]) {
            (Some(ch), n) if n == len => Ok(Some(ch)),
            _ => Err(CsvError::InvalidUtf8 { offset }),
        }
    }
}

//! Cursors over decoded attribute arguments.
//!
//! Flag sequences (dynamic, native integer, nullable) are consumed front to back in
//! pre-order. Tuple element names are consumed back to front, because the name walk visits
//! inner tuples before outer ones.

/// Front-to-back cursor over a flag array
#[derive(Debug, Clone)]
pub(crate) struct FlagCursor<'a, T> {
    flags: &'a [T],
    index: usize,
}

impl<'a, T: Copy + Default> FlagCursor<'a, T> {
    pub(crate) fn new(flags: &'a [T]) -> Self {
        FlagCursor { flags, index: 0 }
    }

    /// Consumes the next flag. Past the end this yields the default value, and the cursor
    /// keeps counting so [`FlagCursor::is_exhausted`] reports the overrun.
    pub(crate) fn consume_or_default(&mut self) -> T {
        let value = self.flags.get(self.index).copied().unwrap_or_default();
        self.index += 1;
        value
    }

    /// Consumes the next flag, `None` past the end
    pub(crate) fn consume(&mut self) -> Option<T> {
        let value = self.flags.get(self.index).copied()?;
        self.index += 1;
        Some(value)
    }

    /// `true` if exactly every flag has been consumed
    pub(crate) fn is_exhausted(&self) -> bool {
        self.index == self.flags.len()
    }

    /// Flags not consumed yet
    pub(crate) fn remaining(&self) -> &'a [T] {
        self.flags.get(self.index..).unwrap_or(&[])
    }
}

/// Back-to-front cursor over tuple element names
#[derive(Debug, Clone)]
pub(crate) struct NameCursor<'a> {
    names: &'a [Option<String>],
    remaining: usize,
}

impl<'a> NameCursor<'a> {
    pub(crate) fn new(names: &'a [Option<String>]) -> Self {
        NameCursor {
            names,
            remaining: names.len(),
        }
    }

    /// Takes the last `count` unconsumed names, in declaration order
    pub(crate) fn take_back(&mut self, count: usize) -> Option<&'a [Option<String>]> {
        let start = self.remaining.checked_sub(count)?;
        let taken = &self.names[start..self.remaining];
        self.remaining = start;
        Some(taken)
    }

    pub(crate) fn remaining(&self) -> usize {
        self.remaining
    }
}

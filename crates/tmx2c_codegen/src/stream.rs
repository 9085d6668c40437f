//! Indentation-aware text stream
//!
//! A [`CodeStream`] is a buffer plus an indentation depth. Anything that owns
//! one implements [`Writer`] and gets the scoped-block helpers, so emitters
//! only ever receive a single `&mut` handle.

const INDENT: &str = "    ";

/// Shared output buffer and indentation depth
#[derive(Debug, Default)]
pub struct CodeStream {
    contents: String,
    depth: usize,
}

impl CodeStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current indentation depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Extract the buffered text, leaving the buffer empty
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.contents)
    }
}

/// Writing operations over a [`CodeStream`]
pub trait Writer {
    fn stream(&mut self) -> &mut CodeStream;

    /// Append text at the current indentation depth
    fn write(&mut self, text: &str) {
        let stream = self.stream();
        for _ in 0..stream.depth {
            stream.contents.push_str(INDENT);
        }
        stream.contents.push_str(text);
    }

    /// Append text verbatim, without indentation
    fn append(&mut self, text: &str) {
        self.stream().contents.push_str(text);
    }

    /// Run `body` one level deeper than the current depth
    fn indented(&mut self, body: impl FnOnce(&mut Self))
    where
        Self: Sized,
    {
        self.stream().depth += 1;
        body(self);
        self.stream().depth -= 1;
    }

    /// Write `start`, run `body` one level deeper, then write `end`
    fn block(&mut self, start: &str, body: impl FnOnce(&mut Self), end: &str)
    where
        Self: Sized,
    {
        self.write(start);
        self.indented(body);
        self.write(end);
    }

    /// Like [`Writer::block`], for bodies that can fail
    ///
    /// `end` is written and the depth restored even when `body` fails.
    fn try_block<E>(
        &mut self,
        start: &str,
        body: impl FnOnce(&mut Self) -> Result<(), E>,
        end: &str,
    ) -> Result<(), E>
    where
        Self: Sized,
    {
        self.write(start);
        self.stream().depth += 1;
        let result = body(self);
        self.stream().depth -= 1;
        self.write(end);
        result
    }
}

impl Writer for CodeStream {
    fn stream(&mut self) -> &mut CodeStream {
        self
    }
}

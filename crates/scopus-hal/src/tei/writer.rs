//! Thin element-level wrapper over the quick-xml writer.

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::TeiError;

type Result<T = ()> = std::result::Result<T, TeiError>;

/// Tab-indented XML writer.
pub(crate) struct TeiWriter {
    inner: Writer<Cursor<Vec<u8>>>,
}

impl TeiWriter {
    pub(crate) fn new() -> Self {
        Self { inner: Writer::new_with_indent(Cursor::new(Vec::new()), b'\t', 1) }
    }

    pub(crate) fn declaration(&mut self) -> Result {
        self.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
    }

    pub(crate) fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result {
        self.write(Event::Start(element(name, attrs)))
    }

    pub(crate) fn end(&mut self, name: &str) -> Result {
        self.write(Event::End(BytesEnd::new(name)))
    }

    pub(crate) fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result {
        self.write(Event::Empty(element(name, attrs)))
    }

    /// `<name attrs>text</name>`; newlines in `text` are flattened.
    pub(crate) fn text(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result {
        let flat = text.replace(['\r', '\n'], " ");
        self.start(name, attrs)?;
        self.write(Event::Text(BytesText::new(flat.trim())))?;
        self.end(name)
    }

    /// Like [`Self::text`] but skipped when the value is absent or blank.
    pub(crate) fn optional_text(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        text: Option<&str>,
    ) -> Result {
        match text.map(str::trim).filter(|t| !t.is_empty()) {
            Some(text) => self.text(name, attrs, text),
            None => Ok(()),
        }
    }

    pub(crate) fn finish(self) -> Result<String> {
        Ok(String::from_utf8(self.inner.into_inner().into_inner())?)
    }

    fn write(&mut self, event: Event<'_>) -> Result {
        self.inner.write_event(event).map_err(|e| TeiError::Xml(e.to_string()))
    }
}

fn element<'a>(name: &'a str, attrs: &[(&'a str, &'a str)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for attr in attrs {
        start.push_attribute(*attr);
    }
    start
}

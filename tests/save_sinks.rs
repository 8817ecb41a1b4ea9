//! Integration tests for save passes across the three sink kinds.
//!
//! Each test builds a small tree, saves it through the public API, and
//! checks the exact bytes that reach the file, stream, or buffer.

#![allow(clippy::unwrap_used)]

use std::cell::Cell;
use std::io::{self, Write};
use std::rc::Rc;

use xmlsave::serial::{save_document, save_subtree, SaveContext, SaveOptions, Target, CHUNK_SIZE};
use xmlsave::tree::NodeKind;
use xmlsave::{Document, OpenError, SaveError, Stage, WriteError};

/// A stream that records what it receives and how often it is flushed.
struct Recorder {
    data: Vec<u8>,
    limit: usize,
    writes: usize,
    flushes: Rc<Cell<usize>>,
}

impl Recorder {
    fn new() -> Self {
        Self::with_limit(usize::MAX)
    }

    fn with_limit(limit: usize) -> Self {
        Self {
            data: Vec::new(),
            limit,
            writes: 0,
            flushes: Rc::new(Cell::new(0)),
        }
    }
}

impl Write for Recorder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes += 1;
        let n = buf.len().min(self.limit);
        self.data.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes.set(self.flushes.get() + 1);
        Ok(())
    }
}

fn catalog(books: usize) -> Document {
    let mut doc = Document::new();
    let root = doc.append_element(doc.root(), "catalog");
    for i in 0..books {
        let book = doc.append_element(root, "book");
        doc.set_attribute(book, "id", &format!("bk{i}"));
        let title = doc.append_element(book, "title");
        doc.append_text(title, &format!("Title {i} & more"));
        doc.append_element(book, "cover");
    }
    doc
}

fn memory(doc: &Document, encoding: &str, options: SaveOptions) -> Vec<u8> {
    save_document(Target::Memory, doc, encoding, options)
        .unwrap()
        .into_bytes()
        .unwrap()
}

#[test]
fn test_path_and_memory_are_byte_identical() {
    let doc = catalog(200);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.xml");

    for options in [
        SaveOptions::NONE,
        SaveOptions::FORMAT,
        SaveOptions::NO_DECLARATION | SaveOptions::NO_EMPTY_TAGS,
        SaveOptions::FORMAT_WHITESPACE,
    ] {
        save_document(Target::Path(&path), &doc, "UTF-8", options).unwrap();
        assert_eq!(
            std::fs::read(&path).unwrap(),
            memory(&doc, "UTF-8", options),
            "options {options:?}"
        );
    }
}

#[test]
fn test_stream_matches_memory_and_is_chunked() {
    let doc = catalog(300);
    let expected = memory(&doc, "UTF-8", SaveOptions::FORMAT);
    assert!(expected.len() > CHUNK_SIZE * 2);

    let mut stream = Recorder::new();
    let flushes = Rc::clone(&stream.flushes);
    save_document(Target::Stream(&mut stream), &doc, "UTF-8", SaveOptions::FORMAT).unwrap();
    assert_eq!(stream.data, expected);
    assert!(stream.writes >= expected.len() / (CHUNK_SIZE * 2));
    assert_eq!(flushes.get(), 1);
}

#[test]
fn test_empty_document() {
    let doc = Document::new();
    assert_eq!(
        memory(&doc, "UTF-8", SaveOptions::NONE),
        b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"
    );
}

#[test]
fn test_root_with_attribute_formatted() {
    let mut doc = Document::new();
    let root = doc.append_element(doc.root(), "root");
    doc.set_attribute(root, "id", "1");
    doc.set_attribute(root, "lang", "en");
    assert_eq!(
        memory(&doc, "UTF-8", SaveOptions::FORMAT),
        b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root id=\"1\" lang=\"en\"/>\n"
    );
}

#[test]
fn test_formatted_nesting() {
    let doc = catalog(1);
    let text = String::from_utf8(memory(&doc, "UTF-8", SaveOptions::FORMAT)).unwrap();
    assert_eq!(
        text,
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <catalog>\n  <book id=\"bk0\">\n    <title>Title 0 &amp; more</title>\n    <cover/>\n  </book>\n</catalog>\n"
    );
}

#[test]
fn test_short_write_fails_without_retry() {
    let doc = catalog(5);
    let mut stream = Recorder::with_limit(16);
    let flushes = Rc::clone(&stream.flushes);
    let err = save_document(Target::Stream(&mut stream), &doc, "UTF-8", SaveOptions::NONE)
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Write);
    assert!(matches!(
        err,
        SaveError::Write(WriteError::ShortWrite { written: 16, .. })
    ));
    assert_eq!(stream.writes, 1);
    assert_eq!(stream.data.len(), 16);
    assert_eq!(flushes.get(), 1, "stream released exactly once");
}

#[test]
fn test_open_failure_leaves_no_file() {
    let doc = catalog(1);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.xml");

    let err = save_document(Target::Path(&path), &doc, "no-such-charset", SaveOptions::NONE)
        .unwrap_err();
    assert!(matches!(err, SaveError::Open(OpenError::UnsupportedEncoding(_))));
    assert!(!path.exists());

    let err = save_document(
        Target::Path(&path),
        &doc,
        "UTF-8",
        SaveOptions::AS_XML | SaveOptions::AS_HTML,
    )
    .unwrap_err();
    assert!(matches!(err, SaveError::Open(OpenError::ConflictingOptions(..))));
    assert!(!path.exists());
}

#[test]
fn test_missing_directory_is_open_failure() {
    let doc = catalog(1);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope").join("out.xml");
    let err = save_document(Target::Path(&path), &doc, "UTF-8", SaveOptions::NONE).unwrap_err();
    assert_eq!(err.stage(), Stage::Open);
}

#[test]
fn test_subtree_to_file() {
    let doc = catalog(2);
    let root = doc.root_element().unwrap();
    let second = doc.children(root).nth(1).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.xml");

    save_subtree(Target::Path(&path), &doc, second, "UTF-8", SaveOptions::NONE).unwrap();
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "<book id=\"bk1\"><title>Title 1 &amp; more</title><cover/></book>"
    );
}

#[test]
fn test_save_context_steps() {
    let doc = catalog(1);
    let mut stream = Recorder::new();
    let flushes = Rc::clone(&stream.flushes);
    let mut ctx =
        SaveContext::open(Target::Stream(&mut stream), "UTF-8", SaveOptions::NO_DECLARATION)
            .unwrap();
    assert_eq!(ctx.options(), SaveOptions::NO_DECLARATION);
    ctx.save_document(&doc).unwrap();
    ctx.close().unwrap();
    assert_eq!(flushes.get(), 1);
    assert!(stream.data.starts_with(b"<catalog>"));
}

#[test]
fn test_ascii_output_uses_character_references() {
    let mut doc = Document::new();
    let root = doc.append_element(doc.root(), "p");
    doc.append_text(root, "na\u{ef}ve \u{2603}");
    assert_eq!(
        memory(&doc, "US-ASCII", SaveOptions::NONE),
        b"<?xml version=\"1.0\" encoding=\"US-ASCII\"?>\n<p>na&#xEF;ve &#x2603;</p>\n"
    );
}

#[test]
fn test_latin1_output_is_iso_8859_1_not_windows_1252() {
    let mut doc = Document::new();
    let root = doc.append_element(doc.root(), "p");
    doc.append_text(root, "caf\u{e9} \u{20ac}\u{2019}");
    assert_eq!(
        memory(&doc, "ISO-8859-1", SaveOptions::NO_DECLARATION),
        b"<p>caf\xE9 &#x20AC;&#x2019;</p>\n"
    );
    assert_eq!(
        memory(&doc, "windows-1252", SaveOptions::NO_DECLARATION),
        b"<p>caf\xE9 \x80\x92</p>\n"
    );
}

#[test]
fn test_xhtml_document() {
    let mut doc = Document::new();
    let doctype = doc.create_node(NodeKind::DocumentType {
        name: "html".to_string(),
        system_id: Some("http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd".to_string()),
        public_id: Some("-//W3C//DTD XHTML 1.0 Strict//EN".to_string()),
    });
    doc.append_child(doc.root(), doctype);
    let html = doc.append_element(doc.root(), "html");
    let body = doc.append_element(html, "body");
    doc.append_element(body, "br");
    doc.append_element(body, "p");

    let text = String::from_utf8(memory(&doc, "UTF-8", SaveOptions::NO_DECLARATION)).unwrap();
    assert!(text.contains("<body><br /><p></p></body>"), "{text}");

    let plain = String::from_utf8(memory(
        &doc,
        "UTF-8",
        SaveOptions::NO_DECLARATION | SaveOptions::NO_XHTML,
    ))
    .unwrap();
    assert!(plain.contains("<body><br/><p/></body>"), "{plain}");
}

#[test]
fn test_as_html() {
    let mut doc = Document::new();
    let root = doc.append_element(doc.root(), "div");
    doc.append_element(root, "br");
    let script = doc.append_element(root, "script");
    doc.append_text(script, "if (a < b) {}");
    assert_eq!(
        memory(&doc, "UTF-8", SaveOptions::AS_HTML),
        b"<div><br><script>if (a < b) {}</script></div>\n"
    );
}

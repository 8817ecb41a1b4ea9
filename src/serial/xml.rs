//! XML formatter.
//!
//! Walks a `Document` (or a subtree) and writes markup into any
//! [`fmt::Write`]. The save context feeds it a chunking writer bound to a
//! sink; the string helpers at the bottom of this module feed it a `String`.
//!
//! The option flags select an [`OutputMode`] (XML, XHTML1 rules, HTML) and a
//! layout (compact, indented, or whitespace inside tags). Escaping does not
//! depend on the options.

use std::fmt::{self, Write};

use crate::tree::{Attribute, Document, NodeId, NodeKind};

use super::SaveOptions;

const INDENT: &str = "  ";

/// Elements that XHTML1 and HTML write without an end tag.
const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "basefont", "br", "col", "frame", "hr", "img", "input", "isindex", "link",
    "meta", "param",
];

/// Public identifiers of the XHTML 1.x DTDs start with this.
const XHTML_PUBLIC_ID_PREFIX: &str = "-//W3C//DTD XHTML 1.";

/// Which markup rules the formatter applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputMode {
    /// Plain XML.
    Xml,
    /// XML following the XHTML1 compatibility guidelines.
    Xhtml,
    /// HTML: no declaration, void elements without `/`, raw `script`/`style`.
    Html,
}

impl OutputMode {
    /// Picks the mode for a document under the given options.
    ///
    /// `as_html` wins, then HTML documents stay HTML unless `as_xml` is set.
    /// XHTML rules apply when required, or when the DOCTYPE is XHTML 1.x and
    /// `no_xhtml` is not set.
    #[must_use]
    pub fn select(doc: &Document, options: SaveOptions) -> Self {
        if options.contains(SaveOptions::AS_HTML)
            || (doc.html && !options.contains(SaveOptions::AS_XML))
        {
            Self::Html
        } else if options.contains(SaveOptions::REQUIRE_XHTML)
            || (!options.contains(SaveOptions::NO_XHTML) && is_xhtml(doc))
        {
            Self::Xhtml
        } else {
            Self::Xml
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Compact,
    Indent,
    /// Newlines and indentation inside tags only.
    WsNonSig,
}

fn is_xhtml(doc: &Document) -> bool {
    doc.doctype_public_id()
        .is_some_and(|id| id.starts_with(XHTML_PUBLIC_ID_PREFIX))
}

fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| name.eq_ignore_ascii_case(v))
}

fn is_raw_text_element(name: &str) -> bool {
    name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style")
}

/// Writes a whole document: declaration (unless suppressed), then every
/// top-level node followed by a newline.
///
/// `encoding` is the label written in the declaration; `None` falls back to
/// the document's own encoding.
///
/// # Errors
///
/// Returns `fmt::Error` if `out` fails.
pub fn write_document<W: Write>(
    out: &mut W,
    doc: &Document,
    encoding: Option<&str>,
    options: SaveOptions,
) -> fmt::Result {
    let formatter = Formatter::new(doc, options);
    if formatter.mode != OutputMode::Html && !options.contains(SaveOptions::NO_DECLARATION) {
        write_declaration(out, doc, encoding)?;
    }
    for child in doc.children(doc.root()) {
        formatter.write_node(out, child, 0, false)?;
        out.write_char('\n')?;
    }
    Ok(())
}

/// Writes the subtree rooted at `id` without a declaration or trailing
/// newline. Saving the document node is the same as [`write_document`].
///
/// # Errors
///
/// Returns `fmt::Error` if `out` fails or `id` is not a node of `doc`.
pub fn write_subtree<W: Write>(
    out: &mut W,
    doc: &Document,
    id: NodeId,
    encoding: Option<&str>,
    options: SaveOptions,
) -> fmt::Result {
    let Some(data) = doc.get(id) else {
        return Err(fmt::Error);
    };
    if matches!(data.kind, NodeKind::Document) {
        return write_document(out, doc, encoding, options);
    }
    Formatter::new(doc, options).write_node(out, id, 0, false)
}

fn write_declaration<W: Write>(out: &mut W, doc: &Document, encoding: Option<&str>) -> fmt::Result {
    let version = doc.version.as_deref().unwrap_or("1.0");
    write!(out, "<?xml version=\"{version}\"")?;
    if let Some(encoding) = encoding.or(doc.encoding.as_deref()) {
        write!(out, " encoding=\"{encoding}\"")?;
    }
    if let Some(standalone) = doc.standalone {
        let value = if standalone { "yes" } else { "no" };
        write!(out, " standalone=\"{value}\"")?;
    }
    out.write_str("?>\n")
}

/// Serializes a document to a string with default options.
///
/// # Examples
///
/// ```
/// use xmlsave::Document;
/// use xmlsave::serial::serialize;
///
/// let mut doc = Document::new();
/// let root = doc.append_element(doc.root(), "root");
/// doc.append_text(root, "Hello");
/// assert_eq!(serialize(&doc), "<?xml version=\"1.0\"?>\n<root>Hello</root>\n");
/// ```
#[must_use]
pub fn serialize(doc: &Document) -> String {
    serialize_with_options(doc, SaveOptions::NONE)
}

/// Serializes a document to a string with the given options.
///
/// The declaration carries the document's own encoding, if any. Options are
/// not checked against the capability table here; the save context does that.
#[must_use]
pub fn serialize_with_options(doc: &Document, options: SaveOptions) -> String {
    let mut output = String::new();
    // Writing into a String cannot fail.
    let _ = write_document(&mut output, doc, None, options);
    output
}

struct Formatter<'d> {
    doc: &'d Document,
    mode: OutputMode,
    layout: Layout,
    no_empty: bool,
}

impl<'d> Formatter<'d> {
    fn new(doc: &'d Document, options: SaveOptions) -> Self {
        let layout = if options.contains(SaveOptions::FORMAT) {
            Layout::Indent
        } else if options.contains(SaveOptions::FORMAT_WHITESPACE) {
            Layout::WsNonSig
        } else {
            Layout::Compact
        };
        Self {
            doc,
            mode: OutputMode::select(doc, options),
            layout,
            no_empty: options.contains(SaveOptions::NO_EMPTY_TAGS),
        }
    }

    fn write_node<W: Write>(
        &self,
        out: &mut W,
        id: NodeId,
        depth: usize,
        parent_is_element_only: bool,
    ) -> fmt::Result {
        let indented = self.layout == Layout::Indent && parent_is_element_only;
        match &self.doc.node(id).kind {
            NodeKind::Element {
                name,
                prefix,
                attributes,
            } => {
                if indented {
                    write_indent(out, depth)?;
                }
                out.write_char('<')?;
                write_qname(out, prefix.as_deref(), name)?;
                for attr in attributes {
                    self.write_attribute(out, attr, depth)?;
                }
                if self.doc.first_child(id).is_none() {
                    self.write_childless_end(out, prefix.as_deref(), name, depth)?;
                } else {
                    self.tag_whitespace(out, depth)?;
                    out.write_char('>')?;
                    self.write_children(out, id, name, depth)?;
                    out.write_str("</")?;
                    write_qname(out, prefix.as_deref(), name)?;
                    self.tag_whitespace(out, depth)?;
                    out.write_char('>')?;
                }
                if indented {
                    out.write_char('\n')?;
                }
            }
            NodeKind::Text { content } => write_escaped_text(out, content)?,
            NodeKind::CData { content } => write!(out, "<![CDATA[{content}]]>")?,
            NodeKind::Comment { content } => {
                if indented {
                    write_indent(out, depth)?;
                }
                write!(out, "<!--{content}-->")?;
                if indented {
                    out.write_char('\n')?;
                }
            }
            NodeKind::ProcessingInstruction { target, data } => {
                if indented {
                    write_indent(out, depth)?;
                }
                write!(out, "<?{target}")?;
                if let Some(d) = data {
                    write!(out, " {d}")?;
                }
                out.write_str("?>")?;
                if indented {
                    out.write_char('\n')?;
                }
            }
            NodeKind::EntityRef { name } => write!(out, "&{name};")?,
            NodeKind::DocumentType {
                name,
                system_id,
                public_id,
            } => {
                write!(out, "<!DOCTYPE {name}")?;
                match (public_id, system_id) {
                    (Some(pub_id), Some(sys_id)) => {
                        write!(out, " PUBLIC \"{pub_id}\" \"{sys_id}\"")?;
                    }
                    (Some(pub_id), None) => write!(out, " PUBLIC \"{pub_id}\"")?,
                    (None, Some(sys_id)) => write!(out, " SYSTEM \"{sys_id}\"")?,
                    (None, None) => {}
                }
                out.write_char('>')?;
            }
            // Only reachable as a subtree root, which `write_subtree` handles.
            NodeKind::Document => {}
        }
        Ok(())
    }

    fn write_children<W: Write>(
        &self,
        out: &mut W,
        id: NodeId,
        name: &str,
        depth: usize,
    ) -> fmt::Result {
        let raw_text = self.mode == OutputMode::Html && is_raw_text_element(name);
        let element_only = self.layout == Layout::Indent && is_element_only(self.doc, id);
        if element_only {
            out.write_char('\n')?;
        }
        for child in self.doc.children(id) {
            match &self.doc.node(child).kind {
                NodeKind::Text { content } if element_only && content.trim().is_empty() => {}
                NodeKind::Text { content } if raw_text => out.write_str(content)?,
                _ => self.write_node(out, child, depth + 1, element_only)?,
            }
        }
        if element_only {
            write_indent(out, depth)?;
        }
        Ok(())
    }

    fn write_attribute<W: Write>(&self, out: &mut W, attr: &Attribute, depth: usize) -> fmt::Result {
        if self.layout == Layout::WsNonSig {
            out.write_char('\n')?;
            write_indent(out, depth + 1)?;
        } else {
            out.write_char(' ')?;
        }
        write_qname(out, attr.prefix.as_deref(), &attr.name)?;
        out.write_str("=\"")?;
        write_escaped_attr(out, &attr.value)?;
        out.write_char('"')
    }

    /// Ends an element that has no children, per mode and `no_empty_tags`.
    fn write_childless_end<W: Write>(
        &self,
        out: &mut W,
        prefix: Option<&str>,
        name: &str,
        depth: usize,
    ) -> fmt::Result {
        let void = prefix.is_none() && is_void_element(name);
        match self.mode {
            OutputMode::Xml if !self.no_empty => {
                self.tag_whitespace(out, depth)?;
                return out.write_str("/>");
            }
            OutputMode::Xhtml if void => {
                self.tag_whitespace(out, depth)?;
                let end = if self.layout == Layout::WsNonSig { "/>" } else { " />" };
                return out.write_str(end);
            }
            OutputMode::Html if void => {
                self.tag_whitespace(out, depth)?;
                return out.write_char('>');
            }
            _ => {}
        }
        self.tag_whitespace(out, depth)?;
        out.write_str("></")?;
        write_qname(out, prefix, name)?;
        self.tag_whitespace(out, depth)?;
        out.write_char('>')
    }

    fn tag_whitespace<W: Write>(&self, out: &mut W, depth: usize) -> fmt::Result {
        if self.layout == Layout::WsNonSig {
            out.write_char('\n')?;
            write_indent(out, depth)?;
        }
        Ok(())
    }
}

/// Returns `true` if the element contains only other elements (and optional
/// whitespace text), meaning it's safe to add indentation.
fn is_element_only(doc: &Document, id: NodeId) -> bool {
    let mut has_element_child = false;
    for child in doc.children(id) {
        match &doc.node(child).kind {
            NodeKind::Element { .. } => has_element_child = true,
            NodeKind::Text { content } => {
                if !content.trim().is_empty() {
                    return false;
                }
            }
            NodeKind::CData { .. } | NodeKind::EntityRef { .. } => return false,
            _ => {}
        }
    }
    has_element_child
}

fn write_indent<W: Write>(out: &mut W, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        out.write_str(INDENT)?;
    }
    Ok(())
}

fn write_qname<W: Write>(out: &mut W, prefix: Option<&str>, name: &str) -> fmt::Result {
    if let Some(pfx) = prefix {
        out.write_str(pfx)?;
        out.write_char(':')?;
    }
    out.write_str(name)
}

/// Escapes text content.
///
/// - `<`, `>`, `&` are escaped with named entity references
/// - `\r` is encoded as `&#13;`
/// - `\t` and `\n` are passed through
/// - other control characters below 0x20 are hex-encoded
fn write_escaped_text<W: Write>(out: &mut W, text: &str) -> fmt::Result {
    for ch in text.chars() {
        match ch {
            '&' => out.write_str("&amp;")?,
            '<' => out.write_str("&lt;")?,
            '>' => out.write_str("&gt;")?,
            '\r' => out.write_str("&#13;")?,
            '\t' | '\n' => out.write_char(ch)?,
            c if (c as u32) < 0x20 => write!(out, "&#x{:X};", c as u32)?,
            _ => out.write_char(ch)?,
        }
    }
    Ok(())
}

/// Escapes an attribute value: as text, plus `"`, and `\t`/`\n` become
/// character references so they survive attribute-value normalization.
fn write_escaped_attr<W: Write>(out: &mut W, text: &str) -> fmt::Result {
    for ch in text.chars() {
        match ch {
            '&' => out.write_str("&amp;")?,
            '<' => out.write_str("&lt;")?,
            '>' => out.write_str("&gt;")?,
            '"' => out.write_str("&quot;")?,
            '\t' => out.write_str("&#9;")?,
            '\n' => out.write_str("&#10;")?,
            '\r' => out.write_str("&#13;")?,
            c if (c as u32) < 0x20 => write!(out, "&#x{:X};", c as u32)?,
            _ => out.write_char(ch)?,
        }
    }
    Ok(())
}

//! XML document model: parsing localization files into an element tree and
//! rendering translated trees back out.
//!
//! Output is always 4-space indented with normalized self-closing tags, and
//! the source file's own XML declaration (including any BOM) is carried
//! over byte-for-byte so diffs against hand-maintained files stay quiet.

use crate::error::{Result, TranslatorError};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;
use std::sync::OnceLock;

/// One XML element. Attribute order is preserved as parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatableNode {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<TranslatableNode>,
}

impl TranslatableNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attribute(&mut self, name: &str, value: String) {
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// Identifier used in log lines: the `name` attribute, else `k`,
    /// else a placeholder.
    pub fn key(&self) -> &str {
        self.attribute("name").or_else(|| self.attribute("k")).unwrap_or("?")
    }
}

/// A parsed source document plus the declaration it arrived with.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub root: TranslatableNode,
    /// Original `<?xml ...?>` line verbatim, BOM included, when present.
    pub declaration: Option<String>,
}

fn declaration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\u{feff}?\s*<\?xml[^>]*\?>").expect("declaration pattern is valid")
    })
}

/// Parse a localization file into a tree.
pub fn parse(content: &str) -> Result<SourceDocument> {
    let declaration = declaration_pattern()
        .find(content)
        .map(|m| m.as_str().to_string());

    let body = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<TranslatableNode> = Vec::new();
    let mut root: Option<TranslatableNode> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                stack.push(node_from_start(&start)?);
            }
            Ok(Event::Empty(start)) => {
                let node = node_from_start(&start)?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::Text(text)) => {
                let value = text
                    .unescape()
                    .map_err(|e| TranslatorError::SourceParse(e.to_string()))?;
                if let Some(current) = stack.last_mut() {
                    if !value.trim().is_empty() {
                        current.text = Some(value.into_owned());
                    }
                }
            }
            Ok(Event::End(_)) => {
                let node = stack.pop().ok_or_else(|| {
                    TranslatorError::SourceParse("unbalanced closing tag".to_string())
                })?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(TranslatorError::SourceParse(e.to_string())),
        }
    }

    if !stack.is_empty() {
        return Err(TranslatorError::SourceParse(
            "unexpected end of document".to_string(),
        ));
    }

    let root = root.ok_or_else(|| {
        TranslatorError::SourceParse("document has no root element".to_string())
    })?;

    Ok(SourceDocument { root, declaration })
}

fn node_from_start(start: &BytesStart<'_>) -> Result<TranslatableNode> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut node = TranslatableNode::new(tag);

    for attr in start.attributes() {
        let attr = attr.map_err(|e| TranslatorError::SourceParse(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| TranslatorError::SourceParse(e.to_string()))?
            .into_owned();
        node.attributes.push((key, value));
    }

    Ok(node)
}

fn attach(
    stack: &mut [TranslatableNode],
    root: &mut Option<TranslatableNode>,
    node: TranslatableNode,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if root.is_some() {
                return Err(TranslatorError::SourceParse(
                    "multiple root elements".to_string(),
                ));
            }
            *root = Some(node);
        }
    }
    Ok(())
}

/// Render a tree back to XML: 4-space indent, `<tag/>` self-closing form,
/// and the original declaration substituted back in when one was captured.
pub fn serialize(root: &TranslatableNode, original_declaration: Option<&str>) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(|e| TranslatorError::Serialize(e.to_string()))?;
    write_node(&mut writer, root)?;

    let rendered = String::from_utf8(writer.into_inner())
        .map_err(|e| TranslatorError::Serialize(e.to_string()))?;

    let mut output = normalize_self_closing(&rendered);
    if let Some(original) = original_declaration {
        let own = declaration_pattern().find(&output).map(|m| m.range());
        if let Some(range) = own {
            output.replace_range(range, original);
        }
    }
    if !output.ends_with('\n') {
        output.push('\n');
    }
    Ok(output)
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &TranslatableNode) -> Result<()> {
    let mut start = BytesStart::new(node.tag.as_str());
    for (key, value) in &node.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if node.text.is_none() && node.children.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| TranslatorError::Serialize(e.to_string()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| TranslatorError::Serialize(e.to_string()))?;
    if let Some(text) = &node.text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(|e| TranslatorError::Serialize(e.to_string()))?;
    }
    for child in &node.children {
        write_node(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(node.tag.as_str())))
        .map_err(|e| TranslatorError::Serialize(e.to_string()))
}

/// `<elem />` and `<elem   />` both become `<elem/>`.
fn normalize_self_closing(xml: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN
        .get_or_init(|| Regex::new(r"(<[^>]+?)\s+/>").expect("self-closing pattern is valid"));
    re.replace_all(xml, "$1/>").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="no"?>
<l10n>
    <texts>
        <text name="greeting" value="Hello world"/>
        <text name="empty" value=""/>
        <group label="Tools">
            <text k="hammer" value="Hammer"/>
        </group>
    </texts>
</l10n>
"#;

    #[test]
    fn test_parse_basic_structure() {
        let doc = parse(SAMPLE).unwrap();
        assert_eq!(doc.root.tag, "l10n");
        let texts = &doc.root.children[0];
        assert_eq!(texts.tag, "texts");
        assert_eq!(texts.children.len(), 3);
        assert_eq!(texts.children[0].attribute("value"), Some("Hello world"));
    }

    #[test]
    fn test_parse_captures_declaration_verbatim() {
        let doc = parse(SAMPLE).unwrap();
        assert_eq!(
            doc.declaration.as_deref(),
            Some(r#"<?xml version="1.0" encoding="utf-8" standalone="no"?>"#)
        );
    }

    #[test]
    fn test_parse_captures_bom_with_declaration() {
        let content = format!("\u{feff}{SAMPLE}");
        let doc = parse(&content).unwrap();
        let decl = doc.declaration.unwrap();
        assert!(decl.starts_with('\u{feff}'));
    }

    #[test]
    fn test_parse_without_declaration() {
        let doc = parse("<l10n><text name=\"a\" value=\"b\"/></l10n>").unwrap();
        assert!(doc.declaration.is_none());
    }

    #[test]
    fn test_parse_syntax_error() {
        let result = parse("<l10n><unclosed></l10n>");
        assert!(matches!(result, Err(TranslatorError::SourceParse(_))));
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(matches!(parse(""), Err(TranslatorError::SourceParse(_))));
    }

    #[test]
    fn test_node_key_prefers_name() {
        let mut node = TranslatableNode::new("text");
        node.set_attribute("name", "greeting".to_string());
        node.set_attribute("k", "other".to_string());
        assert_eq!(node.key(), "greeting");
    }

    #[test]
    fn test_node_key_falls_back_to_k() {
        let mut node = TranslatableNode::new("text");
        node.set_attribute("k", "hammer".to_string());
        assert_eq!(node.key(), "hammer");
    }

    #[test]
    fn test_node_key_placeholder() {
        assert_eq!(TranslatableNode::new("text").key(), "?");
    }

    #[test]
    fn test_set_attribute_overwrites_in_place() {
        let mut node = TranslatableNode::new("text");
        node.set_attribute("value", "old".to_string());
        node.set_attribute("other", "x".to_string());
        node.set_attribute("value", "new".to_string());
        assert_eq!(node.attributes[0], ("value".to_string(), "new".to_string()));
        assert_eq!(node.attributes.len(), 2);
    }

    #[test]
    fn test_serialize_round_trip() {
        let doc = parse(SAMPLE).unwrap();
        let rendered = serialize(&doc.root, doc.declaration.as_deref()).unwrap();
        let reparsed = parse(&rendered).unwrap();
        assert_eq!(reparsed.root, doc.root);
    }

    #[test]
    fn test_serialize_keeps_original_declaration() {
        let doc = parse(SAMPLE).unwrap();
        let rendered = serialize(&doc.root, doc.declaration.as_deref()).unwrap();
        assert!(rendered
            .starts_with(r#"<?xml version="1.0" encoding="utf-8" standalone="no"?>"#));
    }

    #[test]
    fn test_serialize_keeps_bom() {
        let content = format!("\u{feff}{SAMPLE}");
        let doc = parse(&content).unwrap();
        let rendered = serialize(&doc.root, doc.declaration.as_deref()).unwrap();
        assert!(rendered.starts_with('\u{feff}'));
    }

    #[test]
    fn test_serialize_default_declaration() {
        let doc = parse("<l10n><text name=\"a\" value=\"b\"/></l10n>").unwrap();
        let rendered = serialize(&doc.root, None).unwrap();
        assert!(rendered.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
    }

    #[test]
    fn test_serialize_self_closing_without_space() {
        let doc = parse(SAMPLE).unwrap();
        let rendered = serialize(&doc.root, None).unwrap();
        assert!(rendered.contains(r#"<text name="greeting" value="Hello world"/>"#));
        assert!(!rendered.contains(" />"));
    }

    #[test]
    fn test_serialize_four_space_indent() {
        let doc = parse(SAMPLE).unwrap();
        let rendered = serialize(&doc.root, None).unwrap();
        assert!(rendered.contains("\n    <texts>"));
        assert!(rendered.contains("\n        <text"));
        assert!(rendered.contains("\n            <text k=\"hammer\""));
    }

    #[test]
    fn test_serialize_inline_text() {
        let doc = parse("<root><note name=\"n\">Some text</note></root>").unwrap();
        let rendered = serialize(&doc.root, None).unwrap();
        assert!(rendered.contains("Some text"));
        let reparsed = parse(&rendered).unwrap();
        assert_eq!(reparsed.root.children[0].text.as_deref(), Some("Some text"));
    }

    #[test]
    fn test_serialize_escapes_markup_in_values() {
        let mut node = TranslatableNode::new("text");
        node.set_attribute("value", "a < b & c".to_string());
        let root = TranslatableNode {
            tag: "l10n".to_string(),
            attributes: Vec::new(),
            text: None,
            children: vec![node],
        };
        let rendered = serialize(&root, None).unwrap();
        assert!(rendered.contains("a &lt; b &amp; c"));
        let reparsed = parse(&rendered).unwrap();
        assert_eq!(reparsed.root.children[0].attribute("value"), Some("a < b & c"));
    }
}

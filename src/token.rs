//! The records handed to the [`crate::TreeSink`].

/// What a [`Token`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// An opening tag such as `<p class=x>`.
    StartTag,
    /// A closing tag such as `</p>`.
    EndTag,
    /// A run of character data.
    Text,
    /// The body of a `<!-- -->` comment.
    Comment,
}

impl Default for TokenKind {
    fn default() -> Self {
        TokenKind::Text
    }
}

/// A single tag attribute, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute name. Lower-cased unless the tokenizer runs in view-source mode.
    pub name: String,
    /// The attribute value with character references decoded.
    pub value: String,
}

/// The token record.
///
/// The tokenizer reuses one record for the whole document: it fills it in, lends it to
/// [`crate::TreeSink::process_token`] and resets it afterwards. Sinks that want to keep a token
/// must copy what they need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Token {
    /// What this token represents.
    pub kind: TokenKind,
    /// The tag name for tags, empty otherwise.
    pub name: String,
    /// Attributes of a start tag. The first occurrence of a name wins.
    pub attributes: Vec<Attribute>,
    /// Character data for text and comment tokens.
    pub text: String,
    /// Set for `<script .../>`, which is treated as an element that is already closed.
    pub self_closing: bool,
    /// The tag ended in `/>` even though HTML has no such syntax.
    pub broken_xml_style: bool,
    /// The line on which the token started.
    pub line: u32,
}

impl Token {
    /// Look up an attribute value by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub(crate) fn add_attribute(&mut self, name: &str, value: String) {
        if name.is_empty() || self.attribute(name).is_some() {
            return;
        }
        self.attributes.push(Attribute {
            name: name.to_owned(),
            value,
        });
    }

    pub(crate) fn is_start_tag(&self, name: &str) -> bool {
        self.kind == TokenKind::StartTag && self.name == name
    }

    pub(crate) fn reset(&mut self) {
        self.kind = TokenKind::Text;
        self.name.clear();
        self.attributes.clear();
        self.text.clear();
        self.self_closing = false;
        self.broken_xml_style = false;
        self.line = 0;
    }
}

/// A doctype. Some examples:
///
/// * `<!DOCTYPE {name}>`
/// * `<!DOCTYPE {name} PUBLIC '{public_identifier}'>`
/// * `<!DOCTYPE {name} SYSTEM '{system_identifier}'>`
/// * `<!DOCTYPE {name} PUBLIC '{public_identifier}' '{system_identifier}'>`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Doctype {
    /// Set when the declaration was malformed. Tree builders should render in quirks mode.
    pub force_quirks: bool,

    /// The doctype's name, lower-cased. For HTML documents this is "html".
    pub name: String,

    /// The doctype's public identifier.
    pub public_identifier: Option<String>,

    /// The doctype's system identifier.
    pub system_identifier: Option<String>,
}

impl Doctype {
    pub(crate) fn reset(&mut self) {
        *self = Doctype::default();
    }
}

//! The flat, copyable record of where the tokenizer is inside the markup grammar.
//!
//! Everything the state machine needs to resume after running out of input lives either here
//! or in the buffers owned by [`crate::Tokenizer`]. Copying a [`State`] is how the tokenizer takes
//! the snapshot it rolls back to when a `<title>` never closes.

/// Elements whose content is scanned as raw text up to the matching end tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RawText {
    Script,
    Style,
    TextArea,
    Title,
    Xmp,
    IFrame,
}

impl RawText {
    pub(crate) fn for_tag_name(name: &str) -> Option<RawText> {
        Some(match name {
            "script" => RawText::Script,
            "style" => RawText::Style,
            "textarea" => RawText::TextArea,
            "title" => RawText::Title,
            "xmp" => RawText::Xmp,
            "iframe" => RawText::IFrame,
            _ => return None,
        })
    }

    pub(crate) fn tag_name(self) -> &'static str {
        match self {
            RawText::Script => "script",
            RawText::Style => "style",
            RawText::TextArea => "textarea",
            RawText::Title => "title",
            RawText::Xmp => "xmp",
            RawText::IFrame => "iframe",
        }
    }

    /// The literal that ends the region, minus the final delimiter.
    pub(crate) fn end_tag(self) -> &'static str {
        match self {
            RawText::Script => "</script",
            RawText::Style => "</style",
            RawText::TextArea => "</textarea",
            RawText::Title => "</title",
            RawText::Xmp => "</xmp",
            RawText::IFrame => "</iframe",
        }
    }

    pub(crate) fn decodes_entities(self) -> bool {
        matches!(self, RawText::TextArea | RawText::Title)
    }

    /// `<!-- -->` inside these regions hides end tags until the comment closes.
    pub(crate) fn allows_comments(self) -> bool {
        matches!(self, RawText::Script | RawText::Style | RawText::IFrame)
    }
}

/// Markup constructs that are scanned by a dedicated sub-machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Markup {
    Comment,
    ServerInclude,
    ProcessingInstruction,
    Doctype,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagState {
    TagName,
    SearchAttribute,
    AttributeName,
    SearchEqual,
    SearchValue,
    QuotedValue,
    Value,
    SearchEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntityState {
    SearchEntity,
    NumericSearch,
    Hexadecimal,
    Decimal,
    EntityName,
    SearchSemicolon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DoctypeState {
    Begin,
    BeforeName,
    Name,
    AfterName,
    BeforePublicId,
    PublicId,
    AfterPublicId,
    BeforeSystemId,
    SystemId,
    AfterSystemId,
    Bogus,
}

impl Default for DoctypeState {
    fn default() -> Self {
        DoctypeState::Begin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Quote {
    Single,
    Double,
}

impl Quote {
    pub(crate) fn for_char(c: char) -> Option<Quote> {
        match c {
            '\'' => Some(Quote::Single),
            '"' => Some(Quote::Double),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct State {
    /// At most one raw-text element is open at a time.
    pub raw_text: Option<RawText>,
    /// Only [`Markup::Comment`] may be set while `raw_text` is.
    pub markup: Option<Markup>,
    pub tag: Option<TagState>,
    pub entity: Option<EntityState>,
    pub doctype: DoctypeState,
    pub quote: Option<Quote>,
    pub plain_text: bool,
    /// A `<` was consumed and the character deciding what it opens has not been seen yet.
    pub start_tag: bool,
    /// Drop the `\n` of a `\r\n` pair.
    pub skip_lf: bool,
    /// Drop the next line break, e.g. right after `<pre>`.
    pub discard_lf: bool,
    /// The previous raw-text character was an unescaped backslash.
    pub escaped: bool,
    /// Check the time budget at the next opportunity regardless of the chunk counter.
    pub allow_yield: bool,
    pub force_synchronous: bool,
    pub loading_external_script: bool,
}

impl State {
    pub(crate) fn in_raw_text(&self, region: RawText) -> bool {
        self.raw_text == Some(region)
    }
}

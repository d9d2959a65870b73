//! Character reference decoding.
//!
//! The decoder is resumable: every character it has looked at is kept in a small buffer, so a
//! reference split across two writes decodes exactly like an unsplit one. References that do
//! not resolve are written back out literally.
use crate::arrayvec::ArrayVec;
use crate::source::{CharSource, LineCounter};
use crate::state::EntityState;
use crate::utils::surrogate_pat;

/// Longest `#`-prefixed decimal reference, counting the `#`.
const DECIMAL_CAP: usize = 9;
/// Longest `#x`-prefixed hexadecimal reference, counting the `#x`.
const HEXADECIMAL_CAP: usize = 10;
/// Longest named reference candidate.
const NAME_CAP: usize = 9;

#[derive(Debug)]
pub(crate) struct EntityDecoder {
    // everything after the `&`
    candidate: ArrayVec<char, HEXADECIMAL_CAP>,
    value: u32,
}

impl Default for EntityDecoder {
    fn default() -> Self {
        EntityDecoder {
            candidate: ArrayVec::new('\0'),
            value: 0,
        }
    }
}

impl EntityDecoder {
    /// Start decoding. The `&` has already been consumed.
    pub(crate) fn begin(&mut self, state: &mut Option<EntityState>) {
        self.candidate.clear();
        self.value = 0;
        *state = Some(EntityState::SearchEntity);
    }

    /// Run until the reference is resolved and written to `out`, or until `src` runs dry.
    ///
    /// Returns `true` once resolved. `in_tag` enables the attribute-value rule that named
    /// references above U+00FF need their `;`.
    pub(crate) fn run(
        &mut self,
        state: &mut Option<EntityState>,
        src: &mut CharSource,
        lines: &mut LineCounter,
        out: &mut String,
        in_tag: bool,
        view_source: bool,
    ) -> bool {
        loop {
            let current = match *state {
                Some(current) => current,
                None => return true,
            };
            let c = match src.peek() {
                Some(c) => c,
                None => return false,
            };

            match current {
                EntityState::SearchEntity => {
                    if c == '#' {
                        self.candidate.push(c);
                        src.advance_keeping_newline_count(lines);
                        *state = Some(EntityState::NumericSearch);
                    } else {
                        *state = Some(EntityState::EntityName);
                    }
                }
                EntityState::NumericSearch => {
                    if c == 'x' || c == 'X' {
                        self.candidate.push(c);
                        src.advance_keeping_newline_count(lines);
                        *state = Some(EntityState::Hexadecimal);
                    } else if c.is_ascii_digit() {
                        *state = Some(EntityState::Decimal);
                    } else {
                        *state = Some(EntityState::SearchSemicolon);
                    }
                }
                EntityState::Hexadecimal => match c.to_digit(16) {
                    Some(digit) if self.candidate.len() < HEXADECIMAL_CAP => {
                        self.value = self.value * 16 + digit;
                        self.candidate.push(c);
                        src.advance_keeping_newline_count(lines);
                    }
                    _ => *state = Some(EntityState::SearchSemicolon),
                },
                EntityState::Decimal => match c.to_digit(10) {
                    Some(digit) if self.candidate.len() < DECIMAL_CAP => {
                        self.value = self.value * 10 + digit;
                        self.candidate.push(c);
                        src.advance_keeping_newline_count(lines);
                    }
                    _ => *state = Some(EntityState::SearchSemicolon),
                },
                EntityState::EntityName => {
                    if c.is_ascii_alphanumeric() && self.candidate.len() < NAME_CAP {
                        self.candidate.push(c);
                        src.advance_keeping_newline_count(lines);
                    } else {
                        *state = Some(EntityState::SearchSemicolon);
                    }
                }
                EntityState::SearchSemicolon => {
                    if self.resolve(Some(c), in_tag, view_source, out) {
                        src.advance_keeping_newline_count(lines);
                    }
                    *state = None;
                    return true;
                }
            }
        }
    }

    /// Resolve a reference that the input ended in the middle of.
    pub(crate) fn finish(
        &mut self,
        state: &mut Option<EntityState>,
        out: &mut String,
        in_tag: bool,
        view_source: bool,
    ) {
        if state.take().is_some() {
            self.resolve(None, in_tag, view_source, out);
        }
    }

    /// Write out what the candidate stands for. `next` is the character right after it. Returns
    /// whether that character is a `;` belonging to the reference.
    fn resolve(
        &mut self,
        next: Option<char>,
        in_tag: bool,
        view_source: bool,
        out: &mut String,
    ) -> bool {
        let semicolon = next == Some(';');
        let candidate = self.candidate.as_slice();

        if candidate.first() != Some(&'#') && candidate.len() > 1 {
            let name: String = candidate.iter().collect();
            if let Some(value) = lookup(&name) {
                self.value = value;
            }
            // be IE compatible
            if in_tag && self.value > 255 && !semicolon {
                self.value = 0;
            }
        }

        if self.value == 0 || self.value > 0x10FFFF {
            out.push('&');
            out.extend(candidate);
            return false;
        }

        if view_source {
            out.push('&');
            out.extend(candidate);
            if semicolon {
                out.push(';');
            }
        } else {
            out.push(fix_up_char(self.value));
        }
        semicolon
    }
}

/// Map a decoded code point to the character it is shown as.
fn fix_up_char(value: u32) -> char {
    let value = match value {
        0x80 => 0x20AC, // EURO SIGN
        0x82 => 0x201A, // SINGLE LOW-9 QUOTATION MARK
        0x83 => 0x0192, // LATIN SMALL LETTER F WITH HOOK
        0x84 => 0x201E, // DOUBLE LOW-9 QUOTATION MARK
        0x85 => 0x2026, // HORIZONTAL ELLIPSIS
        0x86 => 0x2020, // DAGGER
        0x87 => 0x2021, // DOUBLE DAGGER
        0x88 => 0x02C6, // MODIFIER LETTER CIRCUMFLEX ACCENT
        0x89 => 0x2030, // PER MILLE SIGN
        0x8A => 0x0160, // LATIN CAPITAL LETTER S WITH CARON
        0x8B => 0x2039, // SINGLE LEFT-POINTING ANGLE QUOTATION MARK
        0x8C => 0x0152, // LATIN CAPITAL LIGATURE OE
        0x8E => 0x017D, // LATIN CAPITAL LETTER Z WITH CARON
        0x91 => 0x2018, // LEFT SINGLE QUOTATION MARK
        0x92 => 0x2019, // RIGHT SINGLE QUOTATION MARK
        0x93 => 0x201C, // LEFT DOUBLE QUOTATION MARK
        0x94 => 0x201D, // RIGHT DOUBLE QUOTATION MARK
        0x95 => 0x2022, // BULLET
        0x96 => 0x2013, // EN DASH
        0x97 => 0x2014, // EM DASH
        0x98 => 0x02DC, // SMALL TILDE
        0x99 => 0x2122, // TRADE MARK SIGN
        0x9A => 0x0161, // LATIN SMALL LETTER S WITH CARON
        0x9B => 0x203A, // SINGLE RIGHT-POINTING ANGLE QUOTATION MARK
        0x9C => 0x0153, // LATIN SMALL LIGATURE OE
        0x9E => 0x017E, // LATIN SMALL LETTER Z WITH CARON
        0x9F => 0x0178, // LATIN CAPITAL LETTER Y WITH DIAERESIS
        surrogate_pat!() => 0xFFFD,
        x => x,
    };
    std::char::from_u32(value).unwrap_or('\u{FFFD}')
}

/// Look up a named character reference, case-sensitively.
pub(crate) fn lookup(name: &str) -> Option<u32> {
    ENTITIES
        .binary_search_by(|(candidate, _)| candidate.cmp(&name))
        .ok()
        .map(|i| ENTITIES[i].1)
}

// sorted by byte value for binary search
static ENTITIES: &[(&str, u32)] = &[
    ("AElig", 0x00C6),
    ("Aacute", 0x00C1),
    ("Acirc", 0x00C2),
    ("Agrave", 0x00C0),
    ("Alpha", 0x0391),
    ("Aring", 0x00C5),
    ("Atilde", 0x00C3),
    ("Auml", 0x00C4),
    ("Beta", 0x0392),
    ("Ccedil", 0x00C7),
    ("Chi", 0x03A7),
    ("Dagger", 0x2021),
    ("Delta", 0x0394),
    ("ETH", 0x00D0),
    ("Eacute", 0x00C9),
    ("Ecirc", 0x00CA),
    ("Egrave", 0x00C8),
    ("Epsilon", 0x0395),
    ("Eta", 0x0397),
    ("Euml", 0x00CB),
    ("Gamma", 0x0393),
    ("Iacute", 0x00CD),
    ("Icirc", 0x00CE),
    ("Igrave", 0x00CC),
    ("Iota", 0x0399),
    ("Iuml", 0x00CF),
    ("Kappa", 0x039A),
    ("Lambda", 0x039B),
    ("Mu", 0x039C),
    ("Ntilde", 0x00D1),
    ("Nu", 0x039D),
    ("OElig", 0x0152),
    ("Oacute", 0x00D3),
    ("Ocirc", 0x00D4),
    ("Ograve", 0x00D2),
    ("Omega", 0x03A9),
    ("Omicron", 0x039F),
    ("Oslash", 0x00D8),
    ("Otilde", 0x00D5),
    ("Ouml", 0x00D6),
    ("Phi", 0x03A6),
    ("Pi", 0x03A0),
    ("Prime", 0x2033),
    ("Psi", 0x03A8),
    ("Rho", 0x03A1),
    ("Scaron", 0x0160),
    ("Sigma", 0x03A3),
    ("THORN", 0x00DE),
    ("Tau", 0x03A4),
    ("Theta", 0x0398),
    ("Uacute", 0x00DA),
    ("Ucirc", 0x00DB),
    ("Ugrave", 0x00D9),
    ("Upsilon", 0x03A5),
    ("Uuml", 0x00DC),
    ("Xi", 0x039E),
    ("Yacute", 0x00DD),
    ("Yuml", 0x0178),
    ("Zeta", 0x0396),
    ("aacute", 0x00E1),
    ("acirc", 0x00E2),
    ("acute", 0x00B4),
    ("aelig", 0x00E6),
    ("agrave", 0x00E0),
    ("alefsym", 0x2135),
    ("alpha", 0x03B1),
    ("amp", 0x0026),
    ("and", 0x2227),
    ("ang", 0x2220),
    ("apos", 0x0027),
    ("aring", 0x00E5),
    ("asymp", 0x2248),
    ("atilde", 0x00E3),
    ("auml", 0x00E4),
    ("bdquo", 0x201E),
    ("beta", 0x03B2),
    ("brvbar", 0x00A6),
    ("bull", 0x2022),
    ("cap", 0x2229),
    ("ccedil", 0x00E7),
    ("cedil", 0x00B8),
    ("cent", 0x00A2),
    ("chi", 0x03C7),
    ("circ", 0x02C6),
    ("clubs", 0x2663),
    ("cong", 0x2245),
    ("copy", 0x00A9),
    ("crarr", 0x21B5),
    ("cup", 0x222A),
    ("curren", 0x00A4),
    ("dArr", 0x21D3),
    ("dagger", 0x2020),
    ("darr", 0x2193),
    ("deg", 0x00B0),
    ("delta", 0x03B4),
    ("diams", 0x2666),
    ("divide", 0x00F7),
    ("eacute", 0x00E9),
    ("ecirc", 0x00EA),
    ("egrave", 0x00E8),
    ("empty", 0x2205),
    ("emsp", 0x2003),
    ("ensp", 0x2002),
    ("epsilon", 0x03B5),
    ("equiv", 0x2261),
    ("eta", 0x03B7),
    ("eth", 0x00F0),
    ("euml", 0x00EB),
    ("euro", 0x20AC),
    ("exist", 0x2203),
    ("fnof", 0x0192),
    ("forall", 0x2200),
    ("frac12", 0x00BD),
    ("frac14", 0x00BC),
    ("frac34", 0x00BE),
    ("frasl", 0x2044),
    ("gamma", 0x03B3),
    ("ge", 0x2265),
    ("gt", 0x003E),
    ("hArr", 0x21D4),
    ("harr", 0x2194),
    ("hearts", 0x2665),
    ("hellip", 0x2026),
    ("iacute", 0x00ED),
    ("icirc", 0x00EE),
    ("iexcl", 0x00A1),
    ("igrave", 0x00EC),
    ("image", 0x2111),
    ("infin", 0x221E),
    ("int", 0x222B),
    ("iota", 0x03B9),
    ("iquest", 0x00BF),
    ("isin", 0x2208),
    ("iuml", 0x00EF),
    ("kappa", 0x03BA),
    ("lArr", 0x21D0),
    ("lambda", 0x03BB),
    ("lang", 0x2329),
    ("laquo", 0x00AB),
    ("larr", 0x2190),
    ("lceil", 0x2308),
    ("ldquo", 0x201C),
    ("le", 0x2264),
    ("lfloor", 0x230A),
    ("lowast", 0x2217),
    ("loz", 0x25CA),
    ("lrm", 0x200E),
    ("lsaquo", 0x2039),
    ("lsquo", 0x2018),
    ("lt", 0x003C),
    ("macr", 0x00AF),
    ("mdash", 0x2014),
    ("micro", 0x00B5),
    ("middot", 0x00B7),
    ("minus", 0x2212),
    ("mu", 0x03BC),
    ("nabla", 0x2207),
    ("nbsp", 0x00A0),
    ("ndash", 0x2013),
    ("ne", 0x2260),
    ("ni", 0x220B),
    ("not", 0x00AC),
    ("notin", 0x2209),
    ("nsub", 0x2284),
    ("ntilde", 0x00F1),
    ("nu", 0x03BD),
    ("oacute", 0x00F3),
    ("ocirc", 0x00F4),
    ("oelig", 0x0153),
    ("ograve", 0x00F2),
    ("oline", 0x203E),
    ("omega", 0x03C9),
    ("omicron", 0x03BF),
    ("oplus", 0x2295),
    ("or", 0x2228),
    ("ordf", 0x00AA),
    ("ordm", 0x00BA),
    ("oslash", 0x00F8),
    ("otilde", 0x00F5),
    ("otimes", 0x2297),
    ("ouml", 0x00F6),
    ("para", 0x00B6),
    ("part", 0x2202),
    ("permil", 0x2030),
    ("perp", 0x22A5),
    ("phi", 0x03C6),
    ("pi", 0x03C0),
    ("piv", 0x03D6),
    ("plusmn", 0x00B1),
    ("pound", 0x00A3),
    ("prime", 0x2032),
    ("prod", 0x220F),
    ("prop", 0x221D),
    ("psi", 0x03C8),
    ("quot", 0x0022),
    ("rArr", 0x21D2),
    ("radic", 0x221A),
    ("rang", 0x232A),
    ("raquo", 0x00BB),
    ("rarr", 0x2192),
    ("rceil", 0x2309),
    ("rdquo", 0x201D),
    ("real", 0x211C),
    ("reg", 0x00AE),
    ("rfloor", 0x230B),
    ("rho", 0x03C1),
    ("rlm", 0x200F),
    ("rsaquo", 0x203A),
    ("rsquo", 0x2019),
    ("sbquo", 0x201A),
    ("scaron", 0x0161),
    ("sdot", 0x22C5),
    ("sect", 0x00A7),
    ("shy", 0x00AD),
    ("sigma", 0x03C3),
    ("sigmaf", 0x03C2),
    ("sim", 0x223C),
    ("spades", 0x2660),
    ("sub", 0x2282),
    ("sube", 0x2286),
    ("sum", 0x2211),
    ("sup", 0x2283),
    ("sup1", 0x00B9),
    ("sup2", 0x00B2),
    ("sup3", 0x00B3),
    ("supe", 0x2287),
    ("szlig", 0x00DF),
    ("tau", 0x03C4),
    ("there4", 0x2234),
    ("theta", 0x03B8),
    ("thetasym", 0x03D1),
    ("thinsp", 0x2009),
    ("thorn", 0x00FE),
    ("tilde", 0x02DC),
    ("times", 0x00D7),
    ("trade", 0x2122),
    ("uArr", 0x21D1),
    ("uacute", 0x00FA),
    ("uarr", 0x2191),
    ("ucirc", 0x00FB),
    ("ugrave", 0x00F9),
    ("uml", 0x00A8),
    ("upsih", 0x03D2),
    ("upsilon", 0x03C5),
    ("uuml", 0x00FC),
    ("weierp", 0x2118),
    ("xi", 0x03BE),
    ("yacute", 0x00FD),
    ("yen", 0x00A5),
    ("yuml", 0x00FF),
    ("zeta", 0x03B6),
    ("zwj", 0x200D),
    ("zwnj", 0x200C),
];

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decode_chunks(chunks: &[&str], in_tag: bool, view_source: bool) -> (String, String) {
        let mut decoder = EntityDecoder::default();
        let mut state = None;
        let mut src = CharSource::new();
        let mut lines = LineCounter::default();
        let mut out = String::new();
        decoder.begin(&mut state);

        let mut done = false;
        for chunk in chunks {
            src.append(CharSource::from(*chunk));
            if !done {
                done = decoder.run(&mut state, &mut src, &mut lines, &mut out, in_tag, view_source);
            }
        }
        if !done {
            decoder.finish(&mut state, &mut out, in_tag, view_source);
        }
        (out, src.into_string())
    }

    fn decode(input: &str) -> (String, String) {
        decode_chunks(&[input], false, false)
    }

    #[test]
    fn table_is_sorted() {
        assert!(ENTITIES.windows(2).all(|w| w[0].0 < w[1].0));
        assert!(ENTITIES.iter().all(|(name, _)| name.len() < NAME_CAP));
    }

    #[test]
    fn named() {
        assert_eq!(decode("amp;rest"), ("&".to_owned(), "rest".to_owned()));
        assert_eq!(decode("lt rest"), ("<".to_owned(), " rest".to_owned()));
        assert_eq!(decode("Eacute;"), ("\u{C9}".to_owned(), String::new()));
        assert_eq!(decode("eacute;"), ("\u{E9}".to_owned(), String::new()));
    }

    #[test]
    fn unknown_names_stay_literal() {
        assert_eq!(decode("zzzz;"), ("&zzzz".to_owned(), ";".to_owned()));
        assert_eq!(decode(" x"), ("&".to_owned(), " x".to_owned()));
        assert_eq!(decode("a;"), ("&a".to_owned(), ";".to_owned()));
    }

    #[test]
    fn numeric() {
        assert_eq!(decode("#65;"), ("A".to_owned(), String::new()));
        assert_eq!(decode("#x41;"), ("A".to_owned(), String::new()));
        assert_eq!(decode("#X41 "), ("A".to_owned(), " ".to_owned()));
        assert_eq!(decode("#128;"), ("\u{20AC}".to_owned(), String::new()));
        assert_eq!(decode("#x1F600;"), ("\u{1F600}".to_owned(), String::new()));
        assert_eq!(decode("#xD800;"), ("\u{FFFD}".to_owned(), String::new()));
    }

    #[test]
    fn numeric_without_digits() {
        assert_eq!(decode("#;"), ("&#".to_owned(), ";".to_owned()));
        assert_eq!(decode("#x;"), ("&#x".to_owned(), ";".to_owned()));
        assert_eq!(decode("#0;"), ("&#0".to_owned(), ";".to_owned()));
    }

    #[test]
    fn digit_caps() {
        assert_eq!(
            decode("#123456789;"),
            ("&#12345678".to_owned(), "9;".to_owned())
        );
        assert_eq!(
            decode("#x0000004142;"),
            ("\u{41}".to_owned(), "42;".to_owned())
        );
        assert_eq!(decode("#x110000;"), ("&#x110000".to_owned(), ";".to_owned()));
    }

    #[test]
    fn split_across_writes() {
        assert_eq!(
            decode_chunks(&["a", "m", "p", ";", "x"], false, false),
            ("&".to_owned(), "x".to_owned())
        );
        assert_eq!(
            decode_chunks(&["#", "x", "4", "1"], false, false),
            ("A".to_owned(), String::new())
        );
    }

    #[test]
    fn end_of_input_resolves_without_semicolon() {
        assert_eq!(
            decode_chunks(&["amp"], false, false),
            ("&".to_owned(), String::new())
        );
        assert_eq!(
            decode_chunks(&["#6"], false, false),
            ("\u{6}".to_owned(), String::new())
        );
    }

    #[test]
    fn wide_names_in_attributes_need_semicolon() {
        assert_eq!(
            decode_chunks(&["hellip="], true, false),
            ("&hellip".to_owned(), "=".to_owned())
        );
        assert_eq!(
            decode_chunks(&["hellip;"], true, false),
            ("\u{2026}".to_owned(), String::new())
        );
        assert_eq!(
            decode_chunks(&["eacute="], true, false),
            ("\u{E9}".to_owned(), "=".to_owned())
        );
    }

    #[test]
    fn view_source_echoes() {
        assert_eq!(
            decode_chunks(&["amp;x"], false, true),
            ("&amp;".to_owned(), "x".to_owned())
        );
    }
}

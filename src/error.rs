use thiserror::Error;

use crate::diagnostics::Severity;
use crate::script::ScriptId;

macro_rules! impl_error {
    ($(
        $string:literal <=> $variant:ident : $severity:ident,
    )*) => {
        /// All kinds of malformed markup the tokenizer recovers from.
        ///
        /// None of them stop tokenization on their own. They are reported to the
        /// [`crate::Diagnostics`] collaborator.
        #[derive(Debug, Eq, PartialEq, Clone, Copy)]
        pub enum ParseError {
            $(
                #[doc = concat!("The `", $string, "` error.")]
                $variant
            ),*
        }

        impl std::str::FromStr for ParseError {
            type Err = ();

            /// Parse a `kebab-case` error code into an enum variant.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $string => Ok(Self::$variant), )*
                    _ => Err(())
                }
            }
        }

        impl ParseError {
            /// Convert an enum variant back into its `kebab-case` error code.
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match *self {
                    $( Self::$variant => $string, )*
                }
            }

            /// How bad this error is when the tokenizer is not running in strict mode.
            #[must_use]
            pub fn severity(&self) -> Severity {
                match *self {
                    $( Self::$variant => Severity::$severity, )*
                }
            }
        }
    }
}

impl std::fmt::Display for ParseError {
    /// Convert an enum variant back into its `kebab-case` error code.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

impl_error! {
    "eof-in-tag" <=> EofInTag: Error,
    "eof-in-comment" <=> EofInComment: Error,
    "eof-in-server-include" <=> EofInServerInclude: Error,
    "eof-in-processing-instruction" <=> EofInProcessingInstruction: Error,
    "eof-in-doctype" <=> EofInDoctype: Error,
    "eof-in-raw-text" <=> EofInRawText: Error,
    "eof-before-tag-name" <=> EofBeforeTagName: Warning,
    "missing-title-end-tag" <=> MissingTitleEndTag: Error,
    "tag-name-too-long" <=> TagNameTooLong: Warning,
    "attribute-name-too-long" <=> AttributeNameTooLong: Warning,
    "bogus-doctype" <=> BogusDoctype: Warning,
    "invalid-first-character-of-tag-name" <=> InvalidFirstCharacterOfTagName: Warning,
    "script-fetch-failed" <=> ScriptFetchFailed: Warning,
}

/// Why a script could not be fetched. Produced by [`crate::ScriptHost`] implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to fetch script: {reason}")]
pub struct FetchError {
    /// Human readable cause, e.g. an HTTP status line.
    pub reason: String,
}

impl FetchError {
    /// Create a new fetch error.
    pub fn new(reason: impl Into<String>) -> Self {
        FetchError {
            reason: reason.into(),
        }
    }
}

/// Misuse of [`crate::Tokenizer::script_fetched`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateError {
    /// The id does not belong to a script that is waiting for its source.
    #[error("no pending script with id {0}")]
    UnknownScript(ScriptId),
    /// The fetch for this script was already reported as complete.
    #[error("script {0} was already completed")]
    AlreadyCompleted(ScriptId),
}

//! Decoded subtitle samples.

/// A timed piece of subtitle text produced by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSample {
    /// Identifier of the sample, counts the frames rendered from its page.
    pub id: String,
    /// Time at which the text appears, in ms.
    pub start_ms: i64,
    /// Time at which the text disappears, in ms.
    pub end_ms: i64,
    /// UTF-8 text, with HTML-style font tags when colour mode is enabled.
    pub body: String,
}

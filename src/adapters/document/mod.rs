//! Document adapters - Implementations of the TextExtractor port.
//!
//! - `PlainTextExtractor` - UTF-8 text uploads with key/value summaries

mod plain_text_extractor;

pub use plain_text_extractor::PlainTextExtractor;

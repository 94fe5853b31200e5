pub mod date_parser;
pub mod normalize;
pub mod reader;
pub mod utils;

pub use normalize::{classify_rows, Classified, NormalizedRecord};
pub use reader::{open_source, RawRow, RawRows, SourceError, TextEncoding};

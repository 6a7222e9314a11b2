mod language;

pub use language::{detect_language, ENGLISH, RUSSIAN, UZBEK};

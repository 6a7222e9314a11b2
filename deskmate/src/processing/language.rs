use regex::Regex;
use std::sync::OnceLock;
use whatlang::Script;

/// Language codes the assistant has dedicated prompt wording for.
pub const ENGLISH: &str = "en";
pub const RUSSIAN: &str = "ru";
pub const UZBEK: &str = "uz";

fn uzbek_cyrillic_letters() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ўқғҳЎҚҒҲ]").expect("valid regex"))
}

fn uzbek_latin_words() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)[og][ʻʼ‘]|\b[og]'\p{L}|\b(salom|assalomu|rahmat|iltimos|qanday|qanaqa|nima|nega|qayerda|kerak|yordam|ishlamayapti|ishlamaydi|qilsam|qilish|menga|uchun|bilan|emas|yo'q|bo'ladi|bo'lim|parolni|tizim|kompyuter)\b",
        )
        .expect("valid regex")
    })
}

// Uzbek is agglutinative: possessive, case and tense endings mark it even
// when none of the common words appear.
fn uzbek_latin_suffixes() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b\p{Latin}{2,}(imni|ingni|imiz|ingiz|dim|dingiz|yapti|yapman|moqda|ganman|gansiz|larni|lardan|sizmi)\b",
        )
        .expect("valid regex")
    })
}

fn is_uzbek_latin(text: &str) -> bool {
    uzbek_latin_words().is_match(text) || uzbek_latin_suffixes().is_match(text)
}

/// ISO 639-1 code for a detected language, or whatlang's ISO 639-3 code
/// when the language has no two-letter code.
fn iso_code(lang: whatlang::Lang) -> &'static str {
    match lang.code() {
        "eng" => "en",
        "rus" => "ru",
        "uzb" => "uz",
        "ukr" => "uk",
        "bel" => "be",
        "bul" => "bg",
        "srp" => "sr",
        "mkd" => "mk",
        "kaz" => "kk",
        "fra" => "fr",
        "deu" => "de",
        "spa" => "es",
        "por" => "pt",
        "ita" => "it",
        "nld" => "nl",
        "pol" => "pl",
        "ces" => "cs",
        "slk" => "sk",
        "slv" => "sl",
        "hrv" => "hr",
        "ron" => "ro",
        "hun" => "hu",
        "fin" => "fi",
        "est" => "et",
        "lav" => "lv",
        "lit" => "lt",
        "swe" => "sv",
        "dan" => "da",
        "nob" => "nb",
        "tur" => "tr",
        "aze" => "az",
        "ell" => "el",
        "kat" => "ka",
        "hye" => "hy",
        "ara" => "ar",
        "heb" => "he",
        "pes" => "fa",
        "hin" => "hi",
        "urd" => "ur",
        "ben" => "bn",
        "tha" => "th",
        "vie" => "vi",
        "ind" => "id",
        "cmn" => "zh",
        "jpn" => "ja",
        "kor" => "ko",
        "cat" => "ca",
        "afr" => "af",
        "lat" => "la",
        "epo" => "eo",
        other => other,
    }
}

/// Guess the language of a user message and return its language code.
///
/// Uzbek is checked first because general detectors confuse it with Turkish
/// or Russian: Uzbek-only Cyrillic letters, Uzbek orthography, common words
/// and agglutinative endings all mark it. Everything else goes to whatlang
/// and is trusted only when whatlang calls the result reliable. Unreliable
/// Cyrillic text is Russian; anything else undecidable is English.
pub fn detect_language(text: &str) -> &'static str {
    let info = whatlang::detect(text);
    let script = info
        .as_ref()
        .map(|info| info.script())
        .or_else(|| whatlang::detect_script(text));

    match script {
        Some(Script::Cyrillic) if uzbek_cyrillic_letters().is_match(text) => return UZBEK,
        Some(Script::Latin) if is_uzbek_latin(text) => return UZBEK,
        _ => {}
    }

    if let Some(info) = info.filter(|info| info.is_reliable()) {
        return iso_code(info.lang());
    }

    match script {
        Some(Script::Cyrillic) => RUSSIAN,
        _ => ENGLISH,
    }
}

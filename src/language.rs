//! Best-effort language identification.
//!
//! Detection runs on a punctuation-stripped sample of the extracted text.
//! Short samples produce noise, so anything at or below
//! [`LanguageConfig::min_chars`] gets the fallback label instead.

use whatlang::Lang;

use crate::config::LanguageConfig;

/// Characters fed to the detector. Longer documents are sampled from the start.
const SAMPLE_CHARS: usize = 4096;

#[derive(Debug, Clone)]
pub struct LanguageDetector {
    min_chars: usize,
    fallback: String,
    require_reliable: bool,
}

impl LanguageDetector {
    pub fn new(config: &LanguageConfig) -> Self {
        Self {
            min_chars: config.min_chars,
            fallback: config.fallback.clone(),
            require_reliable: config.require_reliable,
        }
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// ISO 639-1 code of the dominant language, or the fallback label.
    pub fn detect(&self, text: &str) -> String {
        let sample = strip_punctuation(text, SAMPLE_CHARS);
        let trimmed = sample.trim();
        if trimmed.chars().count() <= self.min_chars {
            return self.fallback.clone();
        }

        match whatlang::detect(trimmed) {
            Some(info) if info.is_reliable() || !self.require_reliable => {
                iso639_1(info.lang()).to_string()
            }
            Some(info) => {
                tracing::trace!(
                    lang = info.lang().code(),
                    confidence = info.confidence(),
                    "unreliable language guess discarded"
                );
                self.fallback.clone()
            }
            None => self.fallback.clone(),
        }
    }
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new(&LanguageConfig::default())
    }
}

/// Keeps word characters and whitespace, like `[^\w\s]` removal.
fn strip_punctuation(text: &str, limit: usize) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .take(limit)
        .collect()
}

/// whatlang reports ISO 639-3; the index stores two-letter codes where one exists.
fn iso639_1(lang: Lang) -> &'static str {
    match lang.code() {
        "afr" => "af",
        "aka" => "ak",
        "amh" => "am",
        "ara" => "ar",
        "aze" => "az",
        "bel" => "be",
        "ben" => "bn",
        "bul" => "bg",
        "cat" => "ca",
        "ces" => "cs",
        "cmn" => "zh",
        "dan" => "da",
        "deu" => "de",
        "ell" => "el",
        "eng" => "en",
        "epo" => "eo",
        "est" => "et",
        "fin" => "fi",
        "fra" => "fr",
        "guj" => "gu",
        "heb" => "he",
        "hin" => "hi",
        "hrv" => "hr",
        "hun" => "hu",
        "hye" => "hy",
        "ind" => "id",
        "ita" => "it",
        "jav" => "jv",
        "jpn" => "ja",
        "kan" => "kn",
        "kat" => "ka",
        "khm" => "km",
        "kor" => "ko",
        "lat" => "la",
        "lav" => "lv",
        "lit" => "lt",
        "mal" => "ml",
        "mar" => "mr",
        "mkd" => "mk",
        "mya" => "my",
        "nep" => "ne",
        "nld" => "nl",
        "nob" => "nb",
        "ori" => "or",
        "pan" => "pa",
        "pes" => "fa",
        "pol" => "pl",
        "por" => "pt",
        "ron" => "ro",
        "rus" => "ru",
        "sin" => "si",
        "slk" => "sk",
        "slv" => "sl",
        "sna" => "sn",
        "spa" => "es",
        "srp" => "sr",
        "swe" => "sv",
        "tam" => "ta",
        "tel" => "te",
        "tgl" => "tl",
        "tha" => "th",
        "tuk" => "tk",
        "tur" => "tr",
        "ukr" => "uk",
        "urd" => "ur",
        "uzb" => "uz",
        "vie" => "vi",
        "yid" => "yi",
        "zul" => "zu",
        other => other,
    }
}

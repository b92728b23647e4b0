//! Static vocabularies served alongside directory listings.
//!
//! The discovery UI filters on language codes and prohibited-content
//! categories; both catalogs are fixed at build time and exposed as
//! `{code, name}` entries so clients can render labels without their
//! own tables.

use serde::Serialize;

/// A vocabulary entry: a stable code plus a display name.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct VocabEntry {
    /// Stable identifier used in filter criteria.
    pub code: &'static str,
    /// Human-readable label.
    pub name: &'static str,
}

/// Content categories an instance can declare as prohibited.
pub const PROHIBITED_CONTENT: &[VocabEntry] = &[
    VocabEntry {
        code: "nudity_nocw",
        name: "Nudity without content warning",
    },
    VocabEntry {
        code: "nudity_all",
        name: "Nudity",
    },
    VocabEntry {
        code: "pornography_nocw",
        name: "Pornography without content warning",
    },
    VocabEntry {
        code: "pornography_all",
        name: "Pornography",
    },
    VocabEntry {
        code: "sexism",
        name: "Sexism",
    },
    VocabEntry {
        code: "racism",
        name: "Racism",
    },
    VocabEntry {
        code: "illegalContentLinks",
        name: "Links to illegal content",
    },
    VocabEntry {
        code: "spam",
        name: "Spam",
    },
    VocabEntry {
        code: "advertising",
        name: "Advertising",
    },
    VocabEntry {
        code: "spoilers_nocw",
        name: "Spoilers without content warning",
    },
];

/// Languages an instance can declare, as ISO 639-1 codes.
pub const LANGUAGES: &[VocabEntry] = &[
    VocabEntry { code: "ar", name: "Arabic" },
    VocabEntry { code: "bg", name: "Bulgarian" },
    VocabEntry { code: "ca", name: "Catalan" },
    VocabEntry { code: "cs", name: "Czech" },
    VocabEntry { code: "da", name: "Danish" },
    VocabEntry { code: "de", name: "German" },
    VocabEntry { code: "el", name: "Greek" },
    VocabEntry { code: "en", name: "English" },
    VocabEntry { code: "eo", name: "Esperanto" },
    VocabEntry { code: "es", name: "Spanish" },
    VocabEntry { code: "et", name: "Estonian" },
    VocabEntry { code: "eu", name: "Basque" },
    VocabEntry { code: "fa", name: "Persian" },
    VocabEntry { code: "fi", name: "Finnish" },
    VocabEntry { code: "fr", name: "French" },
    VocabEntry { code: "gl", name: "Galician" },
    VocabEntry { code: "he", name: "Hebrew" },
    VocabEntry { code: "hi", name: "Hindi" },
    VocabEntry { code: "hr", name: "Croatian" },
    VocabEntry { code: "hu", name: "Hungarian" },
    VocabEntry { code: "id", name: "Indonesian" },
    VocabEntry { code: "it", name: "Italian" },
    VocabEntry { code: "ja", name: "Japanese" },
    VocabEntry { code: "ko", name: "Korean" },
    VocabEntry { code: "lt", name: "Lithuanian" },
    VocabEntry { code: "lv", name: "Latvian" },
    VocabEntry { code: "nl", name: "Dutch" },
    VocabEntry { code: "no", name: "Norwegian" },
    VocabEntry { code: "pl", name: "Polish" },
    VocabEntry { code: "pt", name: "Portuguese" },
    VocabEntry { code: "ro", name: "Romanian" },
    VocabEntry { code: "ru", name: "Russian" },
    VocabEntry { code: "sk", name: "Slovak" },
    VocabEntry { code: "sl", name: "Slovenian" },
    VocabEntry { code: "sv", name: "Swedish" },
    VocabEntry { code: "th", name: "Thai" },
    VocabEntry { code: "tr", name: "Turkish" },
    VocabEntry { code: "uk", name: "Ukrainian" },
    VocabEntry { code: "vi", name: "Vietnamese" },
    VocabEntry { code: "zh", name: "Chinese" },
];

//! Language constants accepted by the keyword planner.
//!
//! See <https://developers.google.com/google-ads/api/reference/data/codes-formats#languages>.

/// English
pub const DEFAULT_LANGUAGE_ID: u32 = 1000;

/// A language the keyword planner can filter on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub name: &'static str,
    pub code: &'static str,
    pub id: u32,
}

const fn lang(name: &'static str, code: &'static str, id: u32) -> Language {
    Language { name, code, id }
}

pub static LANGUAGES: &[Language] = &[
    lang("Arabic", "ar", 1019),
    lang("Bengali", "bn", 1056),
    lang("Bulgarian", "bg", 1020),
    lang("Catalan", "ca", 1038),
    lang("Chinese (simplified)", "zh_CN", 1017),
    lang("Chinese (traditional)", "zh_TW", 1018),
    lang("Croatian", "hr", 1039),
    lang("Czech", "cs", 1021),
    lang("Danish", "da", 1009),
    lang("Dutch", "nl", 1010),
    lang("English", "en", 1000),
    lang("Estonian", "et", 1043),
    lang("Filipino", "tl", 1042),
    lang("Finnish", "fi", 1011),
    lang("French", "fr", 1002),
    lang("German", "de", 1001),
    lang("Greek", "el", 1022),
    lang("Gujarati", "gu", 1072),
    lang("Hebrew", "iw", 1027),
    lang("Hindi", "hi", 1023),
    lang("Hungarian", "hu", 1024),
    lang("Icelandic", "is", 1026),
    lang("Indonesian", "id", 1025),
    lang("Italian", "it", 1004),
    lang("Japanese", "ja", 1005),
    lang("Kannada", "kn", 1086),
    lang("Korean", "ko", 1012),
    lang("Latvian", "lv", 1028),
    lang("Lithuanian", "lt", 1029),
    lang("Malay", "ms", 1102),
    lang("Malayalam", "ml", 1098),
    lang("Marathi", "mr", 1101),
    lang("Norwegian", "no", 1013),
    lang("Persian", "fa", 1064),
    lang("Polish", "pl", 1030),
    lang("Portuguese", "pt", 1014),
    lang("Punjabi", "pa", 1110),
    lang("Romanian", "ro", 1032),
    lang("Russian", "ru", 1031),
    lang("Serbian", "sr", 1035),
    lang("Slovak", "sk", 1033),
    lang("Slovenian", "sl", 1034),
    lang("Spanish", "es", 1003),
    lang("Swedish", "sv", 1015),
    lang("Tamil", "ta", 1130),
    lang("Telugu", "te", 1131),
    lang("Thai", "th", 1044),
    lang("Turkish", "tr", 1037),
    lang("Ukrainian", "uk", 1036),
    lang("Urdu", "ur", 1041),
    lang("Vietnamese", "vi", 1040),
];

/// Resolve a language code, English name or numeric id to its constant id
///
/// Matching ignores case. An empty input means English. Returns `None` when
/// nothing matches so the caller can pick its own fallback.
pub fn language_id(input: &str) -> Option<u32> {
    let needle = input.trim();
    let needle = if needle.is_empty() { "en" } else { needle };

    LANGUAGES
        .iter()
        .find(|lang| {
            lang.code.eq_ignore_ascii_case(needle)
                || lang.name.eq_ignore_ascii_case(needle)
                || lang.id.to_string() == needle
        })
        .map(|lang| lang.id)
}

/// Resource name of a language constant, e.g. `languageConstants/1000`
pub fn language_constant_path(id: u32) -> String {
    format!("languageConstants/{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_codes_case_insensitively() {
        assert_eq!(language_id("zh_CN"), Some(1017));
        assert_eq!(language_id("ZH_cn"), Some(1017));
        assert_eq!(language_id("EN"), Some(1000));
        assert_eq!(language_id("es"), Some(1003));
    }

    #[test]
    fn resolves_names_and_ids() {
        assert_eq!(language_id("german"), Some(1001));
        assert_eq!(language_id("Chinese (traditional)"), Some(1018));
        assert_eq!(language_id("1031"), Some(1031));
    }

    #[test]
    fn empty_input_defaults_to_english() {
        assert_eq!(language_id(""), Some(DEFAULT_LANGUAGE_ID));
    }

    #[test]
    fn unknown_code_is_not_found() {
        assert_eq!(language_id("xx"), None);
        assert_eq!(language_id("9999"), None);
    }

    #[test]
    fn table_has_unique_codes_and_ids() {
        for (i, a) in LANGUAGES.iter().enumerate() {
            for b in &LANGUAGES[i + 1..] {
                assert_ne!(a.code, b.code);
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn constant_path() {
        assert_eq!(language_constant_path(1017), "languageConstants/1017");
    }
}

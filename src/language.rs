//! Supported conversation languages and their localized fixed strings

use serde::Serialize;

/// A language the pipeline can listen, reply and speak in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Hindi,
}

impl Language {
    /// Every supported language, in display order
    pub const ALL: [Self; 2] = [Self::English, Self::Hindi];

    /// ISO 639-1 code
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Hindi => "hi",
        }
    }

    /// Human-readable name, as offered to users and used in prompts
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Hindi => "Hindi",
        }
    }

    /// Look up a language by its code
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(code))
    }

    /// Interpret a user-facing selection (display name or code)
    ///
    /// Returns `None` for anything outside the supported set, which callers
    /// treat as "no selection".
    #[must_use]
    pub fn from_selection(selection: &str) -> Option<Self> {
        let selection = selection.trim();
        if selection.is_empty() {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|lang| lang.display_name().eq_ignore_ascii_case(selection))
            .or_else(|| Self::from_code(selection))
    }

    /// Instruction that pins the assistant's reply language
    #[must_use]
    pub fn system_instruction(self) -> String {
        let name = self.display_name();
        format!(
            "Reply ONLY in {name}. If the user speaks another language, translate their message and respond in {name}."
        )
    }

    /// Reply used when nothing intelligible was heard
    #[must_use]
    pub const fn didnt_catch_that(self) -> &'static str {
        match self {
            Self::English => "I didn't catch that. Please try again.",
            Self::Hindi => "मैं समझ नहीं पाया। कृपया फिर से बोलें।",
        }
    }

    /// Spoken in place of an empty reply
    #[must_use]
    pub const fn empty_reply_apology(self) -> &'static str {
        match self {
            Self::English => "Sorry, I couldn't generate a response.",
            Self::Hindi => "क्षमा करें, मैं उत्तर नहीं दे सका।",
        }
    }

    /// Diagnostic substituted for a failed transcription
    #[must_use]
    pub fn transcription_error(self, detail: &str) -> String {
        let prefix = match self {
            Self::English => "[Transcription error]",
            Self::Hindi => "[ट्रांसक्रिप्शन त्रुटि]",
        };
        format!("{prefix} {detail}")
    }

    /// Diagnostic substituted for a failed generation
    #[must_use]
    pub fn generation_error(self, detail: &str) -> String {
        let prefix = match self {
            Self::English => "[Generation error]",
            Self::Hindi => "[जनरेशन त्रुटि]",
        };
        format!("{prefix} {detail}")
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_accepts_names_and_codes() {
        assert_eq!(Language::from_selection("English"), Some(Language::English));
        assert_eq!(Language::from_selection("  hindi "), Some(Language::Hindi));
        assert_eq!(Language::from_selection("hi"), Some(Language::Hindi));
        assert_eq!(Language::from_selection("EN"), Some(Language::English));
    }

    #[test]
    fn unsupported_selection_is_unset() {
        assert_eq!(Language::from_selection(""), None);
        assert_eq!(Language::from_selection("French"), None);
        assert_eq!(Language::from_selection("fr"), None);
    }

    #[test]
    fn codes_do_not_match_display_names() {
        assert_eq!(Language::from_code("English"), None);
        assert_eq!(Language::from_code("hi"), Some(Language::Hindi));
    }

    #[test]
    fn system_instruction_names_language() {
        let instruction = Language::Hindi.system_instruction();
        assert!(instruction.starts_with("Reply ONLY in Hindi."));
        assert!(instruction.ends_with("respond in Hindi."));
    }

    #[test]
    fn diagnostics_are_localized() {
        assert_eq!(
            Language::English.generation_error("timeout"),
            "[Generation error] timeout"
        );
        assert!(Language::Hindi.transcription_error("x").starts_with("[ट्रांसक्रिप्शन त्रुटि]"));
    }
}

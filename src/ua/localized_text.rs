/// Text tagged with a locale, used for display names, descriptions, and inverse names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct LocalizedText {
    locale: String,
    text: String,
}

impl LocalizedText {
    #[must_use]
    pub fn new(locale: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            text: text.into(),
        }
    }

    /// Creates text with an empty locale, for callers that do not localize.
    #[must_use]
    pub fn unlocalized(text: impl Into<String>) -> Self {
        Self::new(String::new(), text)
    }

    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

//! Explanation audiences and the typewriter reveal used for canned explanation text.

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Audience {
    #[default]
    Patient,
    Clinician,
}

impl Audience {
    pub fn as_str(self) -> &'static str {
        match self {
            Audience::Patient => "patient",
            Audience::Clinician => "clinician",
        }
    }
}

impl std::fmt::Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Audience {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" => Ok(Audience::Patient),
            "clinician" | "doctor" => Ok(Audience::Clinician),
            other => Err(CoreError::InvalidInput(format!(
                "unknown audience '{other}' (expected 'patient' or 'clinician')"
            ))),
        }
    }
}

/// Explanation text as currently visible, possibly still being revealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub audience: Audience,
    pub text: String,
    /// `false` while words are still being revealed or a backend request is in flight.
    pub complete: bool,
}

impl Explanation {
    pub fn pending(audience: Audience) -> Self {
        Self {
            audience,
            text: String::new(),
            complete: false,
        }
    }

    /// Append the next revealed word, separated by a single space.
    pub fn push_word(&mut self, word: &str) {
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(word);
    }
}

/// Words of a canned explanation in reveal order.
pub fn reveal_words(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audience_parsing() {
        assert_eq!("Patient".parse::<Audience>().unwrap(), Audience::Patient);
        assert_eq!("clinician".parse::<Audience>().unwrap(), Audience::Clinician);
        assert!("family".parse::<Audience>().is_err());
    }

    #[test]
    fn revealing_every_word_reproduces_the_text() {
        let text = "Your heart has a blocked artery called the LAD.";
        let mut explanation = Explanation::pending(Audience::Patient);
        for word in reveal_words(text) {
            explanation.push_word(word);
        }
        assert_eq!(explanation.text, text);
    }
}

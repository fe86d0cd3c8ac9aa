// src/classify/labels.rs
//! Fixed topical label set and the static relevance weight of each label.

/// Labels in declaration order. Category ties resolve to the earliest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    CybersecurityIncident,
    Outage,
    CriticalBug,
    ReleasePatch,
    GeneralNews,
}

pub const MIN_WEIGHT: f64 = 0.2;
pub const MAX_WEIGHT: f64 = 1.0;

impl Label {
    pub const ALL: [Label; 5] = [
        Label::CybersecurityIncident,
        Label::Outage,
        Label::CriticalBug,
        Label::ReleasePatch,
        Label::GeneralNews,
    ];

    /// Candidate text handed to the scorer; also the persisted category.
    pub fn as_str(self) -> &'static str {
        match self {
            Label::CybersecurityIncident => "cybersecurity incident or data breach",
            Label::Outage => "system outage or service disruption",
            Label::CriticalBug => "critical software bug or vulnerability",
            Label::ReleasePatch => "software release or patch",
            Label::GeneralNews => "general technology news",
        }
    }

    /// Relevance to IT operations staff, in [MIN_WEIGHT, MAX_WEIGHT].
    pub fn weight(self) -> f64 {
        match self {
            Label::CybersecurityIncident => 1.0,
            Label::Outage => 1.0,
            Label::CriticalBug => 0.9,
            Label::ReleasePatch => 0.5,
            Label::GeneralNews => 0.2,
        }
    }

    pub fn candidate_texts() -> Vec<&'static str> {
        Label::ALL.iter().map(|l| l.as_str()).collect()
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_stay_in_bounds() {
        for l in Label::ALL {
            assert!((MIN_WEIGHT..=MAX_WEIGHT).contains(&l.weight()), "{l}");
        }
    }

    #[test]
    fn candidate_texts_are_distinct_and_ordered() {
        let texts = Label::candidate_texts();
        assert_eq!(texts.len(), Label::ALL.len());
        assert_eq!(texts[0], "cybersecurity incident or data breach");
        assert_eq!(texts[4], "general technology news");
        let unique: std::collections::HashSet<_> = texts.iter().collect();
        assert_eq!(unique.len(), texts.len());
    }
}

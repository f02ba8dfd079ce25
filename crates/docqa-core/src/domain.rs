//! Keyword-based domain detection and per-domain rerank terms.

use crate::types::Domain;

const INSURANCE_KEYWORDS: &[&str] = &[
    "policy", "coverage", "premium", "claim", "deductible", "beneficiary", "insurance", "insured",
    "insurer", "underwriter", "medical", "health", "dental", "vision", "disability",
];

const LEGAL_KEYWORDS: &[&str] = &[
    "contract", "agreement", "clause", "terms", "conditions", "legal", "court", "lawsuit",
    "attorney", "jurisdiction", "liability", "obligation", "breach", "damages",
];

const HR_KEYWORDS: &[&str] = &[
    "employee", "employment", "hr", "human resources", "payroll", "benefits", "personnel",
    "workplace", "vacation", "sick leave", "performance", "disciplinary",
];

const COMPLIANCE_KEYWORDS: &[&str] = &[
    "compliance", "regulation", "audit", "regulatory", "standards", "requirements", "policy",
    "procedure", "sox", "gdpr", "hipaa", "iso", "certification",
];

const INSURANCE_BOOST: &[&str] = &[
    "coverage", "covered", "benefits", "eligible", "included", "claim", "reimbursement",
    "payment", "settlement", "exclusion", "excluded", "not covered", "limitation", "restriction",
];

const LEGAL_BOOST: &[&str] = &[
    "section", "clause", "article", "whereas", "therefore", "notwithstanding", "shall", "must",
    "required", "prohibited",
];

const HR_BOOST: &[&str] = &["policy", "procedure", "employee", "manager", "supervisor", "hr"];

const COMPLIANCE_BOOST: &[&str] = &["regulation", "compliance", "audit", "standard", "requirement"];

impl Domain {
    fn keywords(self) -> &'static [&'static str] {
        match self {
            Domain::Insurance => INSURANCE_KEYWORDS,
            Domain::Legal => LEGAL_KEYWORDS,
            Domain::Hr => HR_KEYWORDS,
            Domain::Compliance => COMPLIANCE_KEYWORDS,
            Domain::General => &[],
        }
    }

    /// Terms whose presence in a result earns the domain rerank bonus.
    pub fn boost_terms(self) -> &'static [&'static str] {
        match self {
            Domain::Insurance => INSURANCE_BOOST,
            Domain::Legal => LEGAL_BOOST,
            Domain::Hr => HR_BOOST,
            Domain::Compliance => COMPLIANCE_BOOST,
            Domain::General => &[],
        }
    }

    /// Picks the domain whose keywords occur most often in `text`.
    /// No matches, or a tie for first place, yields `General`.
    pub fn detect(text: &str) -> Domain {
        let haystack = word_haystack(text);
        let mut best = Domain::General;
        let mut best_score = 0usize;
        let mut tied = false;
        for domain in Domain::ALL {
            let score: usize = domain
                .keywords()
                .iter()
                .map(|k| count_term(&haystack, k))
                .sum();
            if score > best_score {
                best = domain;
                best_score = score;
                tied = false;
            } else if score == best_score && score > 0 {
                tied = true;
            }
        }
        if tied { Domain::General } else { best }
    }

    /// Number of distinct boost terms found in `text`.
    pub fn boost_matches(self, text: &str) -> usize {
        let haystack = word_haystack(text);
        self.boost_terms()
            .iter()
            .filter(|t| count_term(&haystack, t) > 0)
            .count()
    }
}

/// Lowercased words joined by single spaces, padded so `" term "` matches whole words.
pub fn word_haystack(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(' ');
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        out.push_str(&word.to_lowercase());
        out.push(' ');
    }
    out
}

fn count_term(haystack: &str, term: &str) -> usize {
    let needle = format!(" {term} ");
    let mut count = 0;
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(&needle) {
        count += 1;
        // keep the trailing space so adjacent matches are still seen
        from += pos + needle.len() - 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_dominant_domain() {
        assert_eq!(Domain::detect("What is my deductible for dental coverage?"), Domain::Insurance);
        assert_eq!(Domain::detect("Can the attorney terminate the contract after a breach?"), Domain::Legal);
        assert_eq!(Domain::detect("How many vacation days does an employee get?"), Domain::Hr);
        assert_eq!(Domain::detect("Are we GDPR compliant after the audit?"), Domain::Compliance);
    }

    #[test]
    fn no_match_or_tie_is_general() {
        assert_eq!(Domain::detect("What colour is the sky?"), Domain::General);
        // "policy" counts for insurance and compliance alike
        assert_eq!(Domain::detect("Does this policy cover knee surgery?"), Domain::General);
    }

    #[test]
    fn boost_matches_whole_words_only() {
        let text = "Knee surgery is covered at 80% after the deductible.";
        assert_eq!(Domain::Insurance.boost_matches(text), 1);
        assert_eq!(Domain::Insurance.boost_matches("uncovered"), 0);
        assert_eq!(Domain::Insurance.boost_matches("It is not covered."), 2);
        assert_eq!(Domain::General.boost_matches(text), 0);
    }
}

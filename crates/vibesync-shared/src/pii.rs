//! Heuristic detection of personal information in anonymous posts.
//!
//! Patterns are deliberately narrow: a single number or a capitalised word
//! after "from" is not enough to reject a post.

use std::sync::OnceLock;

use regex::Regex;

struct PiiPatterns {
    phone: Regex,
    email: Regex,
    address: Regex,
    name: Regex,
}

fn patterns() -> &'static PiiPatterns {
    static PATTERNS: OnceLock<PiiPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| PiiPatterns {
        // seven or more digits, optionally separated
        phone: compile(r"(?:\+?\d[\s\-.()]*){7,}"),
        email: compile(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}"),
        address: compile(
            r"(?i)\b\d+\s+[a-z0-9\s]+?\s(?:street|st|avenue|ave|road|rd|boulevard|blvd|lane|ln|drive|dr|way|circle|cir)\b",
        ),
        name: compile(r"\b(?i:call me|i am|i'm|my name is|this is)\s+[A-Z][a-z]+\b"),
    })
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in PII pattern must compile")
}

pub fn contains_pii(text: &str) -> bool {
    let p = patterns();
    p.phone.is_match(text)
        || p.email.is_match(text)
        || p.address.is_match(text)
        || p.name.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_numbers() {
        assert!(contains_pii("text me at 555-123-4567"));
        assert!(contains_pii("+33 6 12 34 56 78"));
        assert!(!contains_pii("I ate 3 slices at 11pm"));
        assert!(!contains_pii("it was 2024 and I was 19"));
    }

    #[test]
    fn test_email() {
        assert!(contains_pii("mail me: someone.odd@example.org"));
        assert!(!contains_pii("@ the park"));
    }

    #[test]
    fn test_street_address() {
        assert!(contains_pii("I live at 221 Baker Street"));
        assert!(contains_pii("meet at 12 ocean drive tonight"));
        assert!(!contains_pii("I have 2 dogs"));
    }

    #[test]
    fn test_name_introductions() {
        assert!(contains_pii("Hi, my name is Sarah"));
        assert!(contains_pii("call me Alex"));
        assert!(!contains_pii("i am tired of everything"));
        assert!(!contains_pii("this is fine"));
    }
}

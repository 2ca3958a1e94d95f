//! Web-search keyword syntax and accent folding.
//!
//! Keywords follow the syntax popularised by search engines:
//!
//! | Input | Meaning |
//! |-------|---------|
//! | `rust async` | both terms (implicit AND) |
//! | `"machine learning"` | consecutive tokens (phrase) |
//! | `-java` | exclude courses containing the term |
//! | `python or ruby` | either alternative |
//!
//! Text on both sides is folded the same way: Unicode NFD decomposition,
//! combining marks dropped, a few stroke letters mapped to ASCII, then
//! lowercased. `Lập trình` and `lap trinh` produce the same tokens.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fold diacritics and case so accented and unaccented spellings compare equal.
pub fn fold_text(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'đ' | 'Đ' => 'd',
            'ł' | 'Ł' => 'l',
            'ø' | 'Ø' => 'o',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
}

/// Split folded text into alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    fold_text(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// A single search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Word(String),
    /// Tokens that must appear consecutively, in order.
    Phrase(Vec<String>),
}

impl Term {
    fn from_tokens(mut tokens: Vec<String>) -> Option<Self> {
        match tokens.len() {
            0 => None,
            1 => tokens.pop().map(Term::Word),
            _ => Some(Term::Phrase(tokens)),
        }
    }

    /// The folded tokens of this term, in order.
    pub fn tokens(&self) -> &[String] {
        match self {
            Term::Word(w) => std::slice::from_ref(w),
            Term::Phrase(p) => p,
        }
    }

    /// True when any field contains the term's tokens consecutively.
    fn matches(&self, fields: &[&[String]]) -> bool {
        let needle = self.tokens();
        fields
            .iter()
            .any(|doc| doc.windows(needle.len()).any(|w| w == needle))
    }
}

/// Conjunction of required and excluded terms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clause {
    pub include: Vec<Term>,
    pub exclude: Vec<Term>,
}

impl Clause {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    fn matches(&self, fields: &[&[String]]) -> bool {
        self.include.iter().all(|t| t.matches(fields))
            && !self.exclude.iter().any(|t| t.matches(fields))
    }
}

/// A parsed keyword: a disjunction of [`Clause`]s.
///
/// An empty `WebSearch` (the keyword had no searchable tokens) matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebSearch {
    pub clauses: Vec<Clause>,
}

impl WebSearch {
    pub fn parse(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let mut clauses = Vec::new();
        let mut current = Clause::default();
        let mut i = 0;

        while i < chars.len() {
            if chars[i].is_whitespace() {
                i += 1;
                continue;
            }

            let negated = chars[i] == '-';
            if negated {
                i += 1;
                // A dangling '-' is ignored.
                if i >= chars.len() || chars[i].is_whitespace() {
                    continue;
                }
            }

            let raw: String = if chars[i] == '"' {
                let start = i + 1;
                i = start;
                while i < chars.len() && chars[i] != '"' {
                    i += 1;
                }
                let phrase = chars[start..i].iter().collect();
                i += 1; // closing quote, if any
                phrase
            } else {
                let start = i;
                while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '"' {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if !negated && word.eq_ignore_ascii_case("or") {
                    if !current.is_empty() {
                        clauses.push(std::mem::take(&mut current));
                    }
                    continue;
                }
                word
            };

            if let Some(term) = Term::from_tokens(tokenize(&raw)) {
                if negated {
                    current.exclude.push(term);
                } else {
                    current.include.push(term);
                }
            }
        }

        if !current.is_empty() {
            clauses.push(current);
        }
        Self { clauses }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluate against raw (unfolded) document text.
    pub fn matches_text(&self, text: &str) -> bool {
        self.matches_tokens(&tokenize(text))
    }

    /// Evaluate against an already tokenized document.
    pub fn matches_tokens(&self, doc: &[String]) -> bool {
        self.matches_fields(&[doc])
    }

    /// Evaluate against several tokenized fields of one document.
    ///
    /// Terms may be satisfied by different fields, but a phrase never spans
    /// two fields.
    pub fn matches_fields(&self, fields: &[&[String]]) -> bool {
        self.clauses.iter().any(|c| c.matches(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(w: &str) -> Term {
        Term::Word(w.to_string())
    }

    fn phrase(words: &[&str]) -> Term {
        Term::Phrase(words.iter().map(|w| w.to_string()).collect())
    }

    #[test]
    fn test_fold_text_strips_accents() {
        assert_eq!(fold_text("Lập Trình Đa Nền"), "lap trinh da nen");
        assert_eq!(fold_text("Café Crème"), "cafe creme");
    }

    #[test]
    fn test_tokenize_splits_on_punctuation() {
        assert_eq!(tokenize("Node.js & C++!"), vec!["node", "js", "c"]);
        assert!(tokenize("--- !!").is_empty());
    }

    #[test]
    fn test_parse_implicit_and() {
        let q = WebSearch::parse("rust  async");
        assert_eq!(q.clauses.len(), 1);
        assert_eq!(q.clauses[0].include, vec![word("rust"), word("async")]);
        assert!(q.clauses[0].exclude.is_empty());
    }

    #[test]
    fn test_parse_phrase_and_exclusion() {
        let q = WebSearch::parse(r#""Machine Learning" -java"#);
        assert_eq!(q.clauses[0].include, vec![phrase(&["machine", "learning"])]);
        assert_eq!(q.clauses[0].exclude, vec![word("java")]);
    }

    #[test]
    fn test_parse_negated_phrase() {
        let q = WebSearch::parse(r#"web -"visual basic""#);
        assert_eq!(q.clauses[0].include, vec![word("web")]);
        assert_eq!(q.clauses[0].exclude, vec![phrase(&["visual", "basic"])]);
    }

    #[test]
    fn test_parse_or_splits_clauses() {
        let q = WebSearch::parse("python OR ruby rails");
        assert_eq!(q.clauses.len(), 2);
        assert_eq!(q.clauses[0].include, vec![word("python")]);
        assert_eq!(q.clauses[1].include, vec![word("ruby"), word("rails")]);
    }

    #[test]
    fn test_parse_dangling_or_and_minus_ignored() {
        let q = WebSearch::parse("or python - or");
        assert_eq!(q.clauses.len(), 1);
        assert_eq!(q.clauses[0].include, vec![word("python")]);
    }

    #[test]
    fn test_parse_quoted_or_is_a_word() {
        let q = WebSearch::parse(r#"this "or" that"#);
        assert_eq!(q.clauses.len(), 1);
        assert_eq!(q.clauses[0].include.len(), 3);
    }

    #[test]
    fn test_parse_unterminated_quote() {
        let q = WebSearch::parse(r#"deep "neural nets"#);
        assert_eq!(
            q.clauses[0].include,
            vec![word("deep"), phrase(&["neural", "nets"])]
        );
    }

    #[test]
    fn test_parse_hyphenated_word_becomes_phrase() {
        let q = WebSearch::parse("full-stack");
        assert_eq!(q.clauses[0].include, vec![phrase(&["full", "stack"])]);
    }

    #[test]
    fn test_parse_only_punctuation_is_empty() {
        assert!(WebSearch::parse("&<>").is_empty());
        assert!(WebSearch::parse("   ").is_empty());
    }

    #[test]
    fn test_matches_semantics() {
        let text = "Python for Data Science: pandas and machine learning";
        assert!(WebSearch::parse("python pandas").matches_text(text));
        assert!(!WebSearch::parse("python django").matches_text(text));
        assert!(WebSearch::parse(r#""machine learning""#).matches_text(text));
        assert!(!WebSearch::parse(r#""learning machine""#).matches_text(text));
        assert!(!WebSearch::parse("python -pandas").matches_text(text));
        assert!(WebSearch::parse("django or pandas").matches_text(text));
        assert!(WebSearch::parse("-java").matches_text(text));
    }

    #[test]
    fn test_matches_accent_insensitive() {
        let q = WebSearch::parse("lap trinh");
        assert!(q.matches_text("Lập trình Python cơ bản"));
        let q = WebSearch::parse("Lập Trình");
        assert!(q.matches_text("lap trinh python"));
    }

    #[test]
    fn test_phrase_does_not_span_fields() {
        let title = tokenize("Advanced Rust");
        let body = tokenize("Ownership and lifetimes");
        let fields = [title.as_slice(), body.as_slice()];
        assert!(WebSearch::parse("rust lifetimes").matches_fields(&fields));
        assert!(!WebSearch::parse(r#""rust ownership""#).matches_fields(&fields));
    }

    #[test]
    fn test_empty_search_matches_nothing() {
        assert!(!WebSearch::default().matches_text("anything"));
    }
}

//! Tag name normalization
//!
//! Turns raw, noisy tag names into one canonical display spelling. Everything
//! here is pure: no I/O, no state, and the same input always produces the same
//! output.
//!
//! # Examples
//!
//! ```
//! use taxon::domain::normalizer::{name_key, normalize};
//!
//! assert_eq!(normalize("  node.JS "), "Node.js");
//! assert_eq!(normalize("introduction to machine learning"), "Introduction to Machine Learning");
//! assert_eq!(name_key(" Web   Development "), "web development");
//! ```

use crate::domain::TagType;
use crate::error::{Result, TaxonError};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Longest accepted tag name, in characters
pub const MAX_NAME_LEN: usize = 100;

/// Known terms with their canonical capitalization and default type
const KNOWN_TERMS: &[(&str, TagType)] = &[
    // Languages
    ("JavaScript", TagType::Language),
    ("TypeScript", TagType::Language),
    ("Python", TagType::Language),
    ("Java", TagType::Language),
    ("Kotlin", TagType::Language),
    ("Swift", TagType::Language),
    ("Objective-C", TagType::Language),
    ("C", TagType::Language),
    ("C++", TagType::Language),
    ("C#", TagType::Language),
    ("Go", TagType::Language),
    ("Rust", TagType::Language),
    ("Ruby", TagType::Language),
    ("PHP", TagType::Language),
    ("Scala", TagType::Language),
    ("Haskell", TagType::Language),
    ("Elixir", TagType::Language),
    ("Erlang", TagType::Language),
    ("Clojure", TagType::Language),
    ("Dart", TagType::Language),
    ("Lua", TagType::Language),
    ("Perl", TagType::Language),
    ("R", TagType::Language),
    ("SQL", TagType::Language),
    ("HTML", TagType::Language),
    ("CSS", TagType::Language),
    ("Bash", TagType::Language),
    ("PowerShell", TagType::Language),
    ("WebAssembly", TagType::Language),
    // Frameworks and libraries
    ("React", TagType::Framework),
    ("React Native", TagType::Framework),
    ("Next.js", TagType::Framework),
    ("Vue.js", TagType::Framework),
    ("Nuxt.js", TagType::Framework),
    ("Angular", TagType::Framework),
    ("Svelte", TagType::Framework),
    ("jQuery", TagType::Framework),
    ("Express.js", TagType::Framework),
    ("NestJS", TagType::Framework),
    ("Django", TagType::Framework),
    ("Flask", TagType::Framework),
    ("FastAPI", TagType::Framework),
    ("Ruby on Rails", TagType::Framework),
    ("Spring Boot", TagType::Framework),
    ("Laravel", TagType::Framework),
    ("ASP.NET", TagType::Framework),
    (".NET", TagType::Framework),
    ("Flutter", TagType::Framework),
    ("TensorFlow", TagType::Framework),
    ("PyTorch", TagType::Framework),
    ("NumPy", TagType::Framework),
    ("pandas", TagType::Framework),
    ("scikit-learn", TagType::Framework),
    ("Tailwind CSS", TagType::Framework),
    ("Bootstrap", TagType::Framework),
    ("Redux", TagType::Framework),
    ("Tokio", TagType::Framework),
    // Tools and platforms
    ("Node.js", TagType::Tool),
    ("Deno", TagType::Tool),
    ("npm", TagType::Tool),
    ("ESLint", TagType::Tool),
    ("Prettier", TagType::Tool),
    ("webpack", TagType::Tool),
    ("Vite", TagType::Tool),
    ("Babel", TagType::Tool),
    ("Git", TagType::Tool),
    ("GitHub", TagType::Tool),
    ("GitLab", TagType::Tool),
    ("Docker", TagType::Tool),
    ("Kubernetes", TagType::Tool),
    ("Terraform", TagType::Tool),
    ("Ansible", TagType::Tool),
    ("Jenkins", TagType::Tool),
    ("GitHub Actions", TagType::Tool),
    ("AWS", TagType::Tool),
    ("GCP", TagType::Tool),
    ("Azure", TagType::Tool),
    ("Linux", TagType::Tool),
    ("macOS", TagType::Tool),
    ("iOS", TagType::Tool),
    ("Android", TagType::Tool),
    ("PostgreSQL", TagType::Tool),
    ("MySQL", TagType::Tool),
    ("SQLite", TagType::Tool),
    ("MongoDB", TagType::Tool),
    ("Redis", TagType::Tool),
    ("Elasticsearch", TagType::Tool),
    ("Kafka", TagType::Tool),
    ("RabbitMQ", TagType::Tool),
    ("GraphQL", TagType::Tool),
    ("VS Code", TagType::Tool),
    ("Vim", TagType::Tool),
    ("Jest", TagType::Tool),
    ("Cypress", TagType::Tool),
    ("Selenium", TagType::Tool),
    ("Postman", TagType::Tool),
    ("Nginx", TagType::Tool),
    // Concepts and acronyms
    ("API", TagType::Concept),
    ("REST", TagType::Concept),
    ("gRPC", TagType::Concept),
    ("HTTP", TagType::Concept),
    ("JSON", TagType::Concept),
    ("XML", TagType::Concept),
    ("YAML", TagType::Concept),
    ("OAuth", TagType::Concept),
    ("JWT", TagType::Concept),
    ("ORM", TagType::Concept),
    ("CLI", TagType::Concept),
    ("SDK", TagType::Concept),
    ("UI", TagType::Concept),
    ("UX", TagType::Concept),
    ("CI/CD", TagType::Concept),
    ("OOP", TagType::Concept),
    ("TDD", TagType::Concept),
    // Domains
    ("DevOps", TagType::Domain),
    ("AI", TagType::Domain),
    ("ML", TagType::Domain),
    ("NLP", TagType::Domain),
    ("Machine Learning", TagType::Domain),
    ("Web Development", TagType::Domain),
    ("Data Science", TagType::Domain),
];

/// Articles, conjunctions and short prepositions kept lowercase unless leading
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "but", "or", "nor", "for", "so", "yet", "as", "at", "by", "in",
    "of", "off", "on", "per", "to", "up", "via", "with", "from", "into", "onto", "over", "vs",
    "versus",
];

fn whitespace_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Map from every lookup key of every known term to its table entry.
///
/// Exact lowercase keys are inserted before the looser variants so that, for
/// example, "c++" and "c#" keep their own entries while "c" still means C.
fn known_terms() -> &'static HashMap<String, (&'static str, TagType)> {
    static TERMS: OnceLock<HashMap<String, (&'static str, TagType)>> = OnceLock::new();
    TERMS.get_or_init(|| {
        let mut map = HashMap::new();
        for &(term, tag_type) in KNOWN_TERMS {
            map.insert(term.to_lowercase(), (term, tag_type));
        }
        // ".NET" must not claim the plain word "net"
        let loose = KNOWN_TERMS
            .iter()
            .filter(|(term, _)| term.starts_with(char::is_alphanumeric));
        for &(term, tag_type) in loose {
            for key in [alnum_key(term), term.to_lowercase().replace(' ', "")] {
                if !key.is_empty() {
                    map.entry(key).or_insert((term, tag_type));
                }
            }
        }
        map
    })
}

fn stop_words() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

/// Trim and collapse internal whitespace runs to a single space
pub fn collapse_whitespace(raw: &str) -> String {
    whitespace_regex().replace_all(raw.trim(), " ").into_owned()
}

/// Lowercase with every non-alphanumeric character removed
fn alnum_key(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Try the exact-lowercase, alphanumeric-only and no-space variants in order
fn lookup_known(text: &str) -> Option<(&'static str, TagType)> {
    let terms = known_terms();
    let lower = text.to_lowercase();
    [lower.clone(), alnum_key(&lower), lower.replace(' ', "")]
        .iter()
        .filter(|key| !key.is_empty())
        .find_map(|key| terms.get(key.as_str()).copied())
}

/// Normalize a raw name to its canonical display form.
///
/// Known terms win outright; anything else is title-cased word by word.
pub fn normalize(raw: &str) -> String {
    let collapsed = collapse_whitespace(raw);
    if collapsed.is_empty() {
        return collapsed;
    }

    if let Some((canonical, _)) = lookup_known(&collapsed) {
        return canonical.to_string();
    }

    title_case(&collapsed)
}

/// The case-folded uniqueness key of a name
pub fn name_key(name: &str) -> String {
    collapse_whitespace(name).to_lowercase()
}

/// Grouping key for duplicate detection.
///
/// The canonical form's key with word separators (whitespace, `-`, `_` and
/// any non-leading `.`) removed, so "Node.js", "nodejs" and "node js" collide
/// while "C", "C++" and "C#" or "net" and ".NET" stay apart.
pub fn duplicate_key(name: &str) -> String {
    let key: String = name_key(&normalize(name))
        .char_indices()
        .filter(|&(i, c)| !is_word_separator(c) || (c == '.' && i == 0))
        .map(|(_, c)| c)
        .collect();
    if key.is_empty() {
        name_key(name)
    } else {
        key
    }
}

fn is_word_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '-' | '_' | '.')
}

/// Default type for a new tag: from the known-technology table, else concept
pub fn infer_tag_type(name: &str) -> TagType {
    lookup_known(&collapse_whitespace(name))
        .map(|(_, tag_type)| tag_type)
        .unwrap_or(TagType::Concept)
}

/// Reject names that cannot become tags
pub fn validate_name(raw: &str) -> Result<()> {
    let collapsed = collapse_whitespace(raw);
    if collapsed.is_empty() {
        return Err(TaxonError::Validation(
            "Tag name cannot be empty".to_string(),
        ));
    }
    let len = collapsed.chars().count();
    if len > MAX_NAME_LEN {
        return Err(TaxonError::Validation(format!(
            "Tag name is {} characters long; the limit is {}",
            len, MAX_NAME_LEN
        )));
    }
    Ok(())
}

fn title_case(collapsed: &str) -> String {
    collapsed
        .split(' ')
        .enumerate()
        .map(|(index, word)| title_case_word(word, index == 0))
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str, leading: bool) -> String {
    if let Some((canonical, _)) = lookup_known(word) {
        return canonical.to_string();
    }

    word.split('-')
        .enumerate()
        .map(|(index, segment)| {
            let lower = segment.to_lowercase();
            if !(leading && index == 0) && stop_words().contains(lower.as_str()) {
                lower
            } else if let Some((canonical, _)) = lookup_known(segment) {
                canonical.to_string()
            } else {
                capitalize(segment)
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Uppercase the first letter and lowercase the rest, except for deliberately
/// mixed-case words such as "iPhone" or "McDonald", which are kept.
fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let rest: String = chars.collect();

    let has_lower = segment.chars().any(char::is_lowercase);
    let inner_upper = rest.chars().any(char::is_uppercase);
    if has_lower && inner_upper {
        return segment.to_string();
    }

    first.to_uppercase().chain(rest.to_lowercase().chars()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_terms_ignore_case_and_spacing() {
        assert_eq!(normalize("JAVASCRIPT"), "JavaScript");
        assert_eq!(normalize(" javascript "), "JavaScript");
        assert_eq!(normalize("eslint"), "ESLint");
        assert_eq!(normalize("nodejs"), "Node.js");
        assert_eq!(normalize("node.js"), "Node.js");
        assert_eq!(normalize("Node JS"), "Node.js");
        assert_eq!(normalize("type script"), "TypeScript");
    }

    #[test]
    fn test_exact_keys_win_over_stripped_keys() {
        assert_eq!(normalize("c++"), "C++");
        assert_eq!(normalize("c#"), "C#");
        assert_eq!(normalize("c"), "C");
        assert_eq!(normalize("ci/cd"), "CI/CD");
        assert_eq!(normalize(".net"), ".NET");
        assert_eq!(normalize("net income"), "Net Income");
    }

    #[test]
    fn test_title_case_with_stop_words() {
        assert_eq!(
            normalize("introduction to the art of testing"),
            "Introduction to the Art of Testing"
        );
        assert_eq!(normalize("the basics"), "The Basics");
        assert_eq!(normalize("OF MICE AND MEN"), "Of Mice and Men");
    }

    #[test]
    fn test_hyphenated_compounds() {
        assert_eq!(normalize("state-of-the-art"), "State-of-the-Art");
        assert_eq!(normalize("end-to-end testing"), "End-to-End Testing");
        assert_eq!(normalize("real-time systems"), "Real-Time Systems");
    }

    #[test]
    fn test_known_terms_inside_phrases() {
        assert_eq!(normalize("rest api design"), "REST API Design");
        assert_eq!(normalize("nodejs streams"), "Node.js Streams");
    }

    #[test]
    fn test_mixed_case_words_are_kept() {
        assert_eq!(normalize("iPhone development"), "iPhone Development");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(collapse_whitespace("  a \t b\n c  "), "a b c");
        assert_eq!(normalize("  web    apps "), "Web Apps");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["javascript", "state-of-the-art", "rest api design", "Some Topic"] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_name_key() {
        assert_eq!(name_key("  JavaScript "), "javascript");
        assert_eq!(name_key("Web \t Development"), "web development");
    }

    #[test]
    fn test_duplicate_key_groups_spelling_variants() {
        assert_eq!(duplicate_key("Node.js"), duplicate_key("nodejs"));
        assert_eq!(duplicate_key("node js"), "nodejs");
        assert_eq!(duplicate_key("++"), "++");
        assert_eq!(duplicate_key("web-dev"), duplicate_key("Web Dev"));
        assert_eq!(duplicate_key("snake_case"), duplicate_key("Snake Case"));
    }

    #[test]
    fn test_duplicate_key_keeps_meaningful_symbols() {
        assert_eq!(duplicate_key("C"), "c");
        assert_eq!(duplicate_key("c++"), "c++");
        assert_eq!(duplicate_key("C#"), "c#");
        assert_eq!(duplicate_key("F#"), "f#");
        assert_ne!(duplicate_key("F"), duplicate_key("F#"));
        assert_ne!(duplicate_key("net"), duplicate_key(".NET"));
    }

    #[test]
    fn test_infer_tag_type() {
        assert_eq!(infer_tag_type("python"), TagType::Language);
        assert_eq!(infer_tag_type("react"), TagType::Framework);
        assert_eq!(infer_tag_type("docker"), TagType::Tool);
        assert_eq!(infer_tag_type("machine learning"), TagType::Domain);
        assert_eq!(infer_tag_type("recursion"), TagType::Concept);
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Rust").is_ok());
        assert!(matches!(
            validate_name("   "),
            Err(TaxonError::Validation(_))
        ));
        assert!(matches!(
            validate_name(&"x".repeat(MAX_NAME_LEN + 1)),
            Err(TaxonError::Validation(_))
        ));
    }
}

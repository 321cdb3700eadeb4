//! Issue classification: raw ticket in, task analysis out.
//!
//! Heuristic and total. Labels take precedence over text; anything that
//! cannot be recognised falls back to a default instead of failing.

use std::collections::BTreeSet;

use crate::domain::models::features::{FRAMEWORK_VOCABULARY, LANGUAGE_VOCABULARY};
use crate::domain::models::{
    Complexity, IssueCategory, IssueCharacteristics, IssueTicket, Priority, TaskAnalysis,
};

/// Keyword lists scanned in title and body, in precedence order.
const CATEGORY_KEYWORDS: [(IssueCategory, &[&str]); 8] = [
    (
        IssueCategory::Security,
        &["security", "vulnerability", "cve", "xss", "injection", "exploit"],
    ),
    (
        IssueCategory::Bug,
        &["bug", "error", "crash", "broken", "fails", "exception", "regression"],
    ),
    (
        IssueCategory::Performance,
        &["performance", "slow", "latency", "memory leak", "optimize"],
    ),
    (
        IssueCategory::Testing,
        &["test", "coverage", "flaky"],
    ),
    (
        IssueCategory::Documentation,
        &["documentation", "docs", "readme", "typo"],
    ),
    (
        IssueCategory::Refactor,
        &["refactor", "cleanup", "clean up", "restructure"],
    ),
    (
        IssueCategory::Feature,
        &["feature", "add support", "implement", "new"],
    ),
    (
        IssueCategory::Enhancement,
        &["improve", "enhance", "better", "update"],
    ),
];

const EXTENSIONS: [(&str, &str); 14] = [
    (".js", "javascript"),
    (".jsx", "javascript"),
    (".mjs", "javascript"),
    (".ts", "typescript"),
    (".tsx", "typescript"),
    (".py", "python"),
    (".rs", "rust"),
    (".go", "go"),
    (".java", "java"),
    (".cs", "csharp"),
    (".cpp", "cpp"),
    (".cc", "cpp"),
    (".rb", "ruby"),
    (".php", "php"),
];

const LANGUAGE_ALIASES: [(&str, &str); 4] = [
    ("node.js", "javascript"),
    ("nodejs", "javascript"),
    ("golang", "go"),
    ("c++", "cpp"),
];

fn label_category(label: &str) -> Option<IssueCategory> {
    match label {
        "bug" | "defect" => Some(IssueCategory::Bug),
        "feature" | "feature request" => Some(IssueCategory::Feature),
        "enhancement" => Some(IssueCategory::Enhancement),
        "documentation" | "docs" => Some(IssueCategory::Documentation),
        "refactor" | "refactoring" | "tech debt" => Some(IssueCategory::Refactor),
        "performance" | "perf" => Some(IssueCategory::Performance),
        "security" => Some(IssueCategory::Security),
        "test" | "tests" | "testing" => Some(IssueCategory::Testing),
        _ => None,
    }
}

fn label_priority(label: &str) -> Option<Priority> {
    match label {
        "critical" | "urgent" | "p0" | "p1" | "high priority" | "priority: high" => {
            Some(Priority::High)
        }
        "low" | "minor" | "p3" | "low priority" | "priority: low" => Some(Priority::Low),
        _ => None,
    }
}

/// Split into lowercase word tokens, keeping `.`, `+` and `#` so file names
/// and names like `c++` survive.
fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || matches!(c, '.' | '+' | '#' | '_' | '-' | '/')))
        .filter(|t| !t.is_empty())
        .map(|t| t.trim_end_matches('.').to_lowercase())
        .collect()
}

fn contains_phrase(text: &str, tokens: &[String], phrase: &str) -> bool {
    if phrase.contains(' ') {
        text.contains(phrase)
    } else {
        tokens.iter().any(|t| t == phrase)
    }
}

/// Classify a raw ticket.
pub fn analyze(ticket: &IssueTicket) -> TaskAnalysis {
    let labels: Vec<String> = ticket.labels.iter().map(|l| l.trim().to_lowercase()).collect();
    let text = format!("{}\n{}", ticket.title, ticket.body).to_lowercase();
    let words = tokens(&text);

    let category = detect_category(&labels, &text, &words);
    let languages = detect_languages(&words);
    let frameworks = detect_frameworks(&words);
    let complexity = estimate_complexity(ticket, &labels, &words);
    let priority = labels
        .iter()
        .find_map(|l| label_priority(l))
        .unwrap_or_default();

    let mut characteristics = IssueCharacteristics::new(complexity, category).with_priority(priority);
    for language in languages {
        characteristics = characteristics.with_language(language);
    }
    for framework in frameworks {
        characteristics = characteristics.with_framework(framework);
    }

    TaskAnalysis {
        issue_number: ticket.number,
        title: ticket.title.clone(),
        characteristics,
    }
}

fn detect_category(labels: &[String], text: &str, words: &[String]) -> IssueCategory {
    if let Some(category) = labels.iter().find_map(|l| label_category(l)) {
        return category;
    }

    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| contains_phrase(text, words, k)))
        .map_or(IssueCategory::Other, |(category, _)| *category)
}

fn detect_languages(words: &[String]) -> BTreeSet<&'static str> {
    let mut found = BTreeSet::new();
    for word in words {
        if let Some(language) = LANGUAGE_VOCABULARY.iter().find(|l| **l == word.as_str()) {
            found.insert(*language);
        }
        if let Some((_, language)) = LANGUAGE_ALIASES.iter().find(|(alias, _)| *alias == word.as_str()) {
            found.insert(*language);
        }
        if let Some((_, language)) = EXTENSIONS
            .iter()
            .find(|(ext, _)| word.ends_with(ext) && word.len() > ext.len())
        {
            found.insert(*language);
        }
    }
    found
}

fn detect_frameworks(words: &[String]) -> BTreeSet<&'static str> {
    words
        .iter()
        .filter_map(|w| {
            let w = w.strip_suffix(".js").unwrap_or(w);
            let w = if w == "next" { "nextjs" } else { w };
            FRAMEWORK_VOCABULARY.iter().find(|f| **f == w).copied()
        })
        .collect()
}

fn estimate_complexity(ticket: &IssueTicket, labels: &[String], words: &[String]) -> Complexity {
    if labels
        .iter()
        .any(|l| matches!(l.as_str(), "good first issue" | "easy" | "trivial"))
    {
        return Complexity::Low;
    }
    if labels
        .iter()
        .any(|l| matches!(l.as_str(), "complex" | "epic" | "hard" | "breaking change"))
    {
        return Complexity::High;
    }

    let mut score = 0u32;
    score += match ticket.body.len() {
        0..=300 => 0,
        301..=1500 => 1,
        _ => 2,
    };

    let files = words
        .iter()
        .filter(|w| EXTENSIONS.iter().any(|(ext, _)| w.ends_with(ext) && w.len() > ext.len()))
        .collect::<BTreeSet<_>>()
        .len();
    score += match files {
        0..=1 => 0,
        2..=4 => 1,
        _ => 2,
    };

    let checklist = ticket
        .body
        .lines()
        .filter(|l| {
            let l = l.trim_start();
            l.starts_with("- [ ]") || l.starts_with("- [x]") || l.starts_with("* [ ]")
        })
        .count();
    score += match checklist {
        0..=2 => 0,
        3..=6 => 1,
        _ => 2,
    };

    match score {
        0..=1 => Complexity::Low,
        2..=3 => Complexity::Medium,
        _ => Complexity::High,
    }
}

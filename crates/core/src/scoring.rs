use std::sync::LazyLock;

use regex::Regex;

use crate::dom::Element;

/// Configuration for content scoring algorithm
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Weight for positive class/ID patterns
    pub positive_weight: f64,
    /// Weight for negative class/ID patterns
    pub negative_weight: f64,
    /// Maximum content density score from character count
    pub max_char_density_score: f64,
    /// Maximum content density score from comma count
    pub max_comma_density_score: f64,
    /// Characters per point for content density scoring
    pub chars_per_point: usize,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            positive_weight: 25.0,
            negative_weight: -25.0,
            max_char_density_score: 3.0,
            max_comma_density_score: 3.0,
            chars_per_point: 100,
        }
    }
}

/// Calculate the base score for an element based on its tag name
///
/// - ARTICLE: +10, SECTION: +8, DIV: +5
/// - TD, BLOCKQUOTE: +3
/// - FORM, ADDRESS and list elements: -3
/// - headings, TH, HEADER, FOOTER, NAV: -5
pub fn base_tag_score(element: &Element) -> f64 {
    match element.tag_name.as_str() {
        "article" => 10.0,
        "section" => 8.0,
        "div" => 5.0,
        "td" | "blockquote" => 3.0,
        "form" => -3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" | "header" | "footer" | "nav" => -5.0,
        _ => 0.0,
    }
}

static POSITIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story|tweet)").unwrap()
});

static NEGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup)",
    )
    .unwrap()
});

/// Elements whose class/id make them unlikely to hold content.
static UNLIKELY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(-ad-|ai2html|banner|breadcrumbs|combx|comment|community|cover-wrap|disqus|extra|footer|gdpr|header|legends|menu|related|remark|replies|rss|shoutbox|sidebar|skyscraper|social|sponsor|supplemental|ad-break|agegate|pagination|pager|popup|yom-remote)",
    )
    .unwrap()
});

static MAYBE_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(and|article|body|column|content|main|shadow)").unwrap());

/// Calculate the class/ID weight adjustment for an element
///
/// The id is checked before the class names; the first pattern hit decides.
pub fn class_id_weight(element: &Element, config: &ScoreConfig) -> f64 {
    if let Some(id) = element.attr("id") {
        if POSITIVE.is_match(id) {
            return config.positive_weight;
        }
        if NEGATIVE.is_match(id) {
            return config.negative_weight;
        }
    }

    if let Some(class) = element.attr("class") {
        for class_name in class.split_whitespace() {
            if POSITIVE.is_match(class_name) {
                return config.positive_weight;
            }
            if NEGATIVE.is_match(class_name) {
                return config.negative_weight;
            }
        }
    }

    0.0
}

/// Whether an element's class/id marks it as boilerplate.
pub fn is_unlikely_candidate(element: &Element) -> bool {
    if matches!(element.tag_name.as_str(), "html" | "body" | "article" | "main" | "a") {
        return false;
    }
    let signature = format!("{} {}", element.attr("class").unwrap_or_default(), element.attr("id").unwrap_or_default());
    UNLIKELY.is_match(&signature) && !MAYBE_CANDIDATE.is_match(&signature)
}

/// Content score contributed by a paragraph-like element: one point, plus
/// one per comma and one per `chars_per_point` characters (each capped).
pub fn content_density_score(text: &str, config: &ScoreConfig) -> f64 {
    let char_score = ((text.chars().count() / config.chars_per_point) as f64).min(config.max_char_density_score);
    let comma_score = (text.matches(',').count() as f64).min(config.max_comma_density_score);

    1.0 + char_score + comma_score
}

/// Calculate the link density of an element
///
/// Link density is the ratio of link text characters to total text characters.
/// Returns a value from 0.0 (no links) to 1.0 (all text is in links).
pub fn link_density(element: &Element) -> f64 {
    let text_length = element.text_content().chars().count();

    if text_length == 0 {
        return 0.0;
    }

    let link_text_length =
        element.find_all("a").map(|link| link.text_content().chars().count()).sum::<usize>();

    link_text_length as f64 / text_length as f64
}

/// Starting score for a container the first time it receives points.
pub fn initial_score(element: &Element, config: &ScoreConfig) -> f64 {
    base_tag_score(element) + class_id_weight(element, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(tag: &str) -> Element {
        Element::new(tag)
    }

    #[test]
    fn test_base_tag_score() {
        assert_eq!(base_tag_score(&el("article")), 10.0);
        assert_eq!(base_tag_score(&el("section")), 8.0);
        assert_eq!(base_tag_score(&el("div")), 5.0);
        assert_eq!(base_tag_score(&el("blockquote")), 3.0);
        assert_eq!(base_tag_score(&el("li")), -3.0);
        assert_eq!(base_tag_score(&el("nav")), -5.0);
        assert_eq!(base_tag_score(&el("span")), 0.0);
    }

    #[test]
    fn test_class_weight_positive() {
        let element = el("div").with_attr("class", "article-content");
        assert_eq!(class_id_weight(&element, &ScoreConfig::default()), 25.0);
    }

    #[test]
    fn test_class_weight_negative() {
        let element = el("div").with_attr("class", "sidebar");
        assert_eq!(class_id_weight(&element, &ScoreConfig::default()), -25.0);
    }

    #[test]
    fn test_class_weight_id_checked_first() {
        let element = el("div").with_attr("id", "main-article").with_attr("class", "sidebar");
        assert_eq!(class_id_weight(&element, &ScoreConfig::default()), 25.0);
    }

    #[test]
    fn test_class_weight_no_match() {
        let element = el("div").with_attr("class", "container").with_attr("id", "wrapper");
        assert_eq!(class_id_weight(&element, &ScoreConfig::default()), 0.0);
    }

    #[test]
    fn test_unlikely_candidates() {
        assert!(is_unlikely_candidate(&el("div").with_attr("class", "sidebar")));
        assert!(is_unlikely_candidate(&el("div").with_attr("id", "comments")));
        assert!(!is_unlikely_candidate(&el("div").with_attr("class", "sidebar main-column")));
        assert!(!is_unlikely_candidate(&el("body").with_attr("class", "sidebar")));
        assert!(!is_unlikely_candidate(&el("div")));
    }

    #[test]
    fn test_content_density() {
        let config = ScoreConfig::default();
        assert_eq!(content_density_score("Short text here.", &config), 1.0);
        assert_eq!(content_density_score("a, b, c", &config), 3.0);
        assert_eq!(content_density_score(&"a".repeat(500), &config), 4.0);
        assert_eq!(content_density_score(&"a, ".repeat(300), &config), 7.0);
    }

    #[test]
    fn test_link_density() {
        let none = el("div").with_text("Text content without any links.");
        assert_eq!(link_density(&none), 0.0);

        let all = el("div").with_child(el("a").with_attr("href", "#").with_text("Link text"));
        assert_eq!(link_density(&all), 1.0);

        let mixed = el("div")
            .with_text("Some text ")
            .with_child(el("a").with_attr("href", "#").with_text("link"))
            .with_text(" more text");
        let density = link_density(&mixed);
        assert!(density > 0.0 && density < 1.0);

        assert_eq!(link_density(&el("div")), 0.0);
    }

    #[test]
    fn test_initial_score() {
        let config = ScoreConfig::default();
        assert_eq!(initial_score(&el("article").with_attr("class", "post"), &config), 35.0);
        assert_eq!(initial_score(&el("div").with_attr("class", "sidebar"), &config), -20.0);
    }
}

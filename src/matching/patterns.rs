//! Path-prefix rename inference.
//!
//! A URL's pattern is its first non-empty path segment (`/blog/post-1` has
//! pattern `/blog/`). When the old site's `/articles/` tree looks like the
//! new site's `/blog/` tree, that rename is worth surfacing even though
//! every individual URL under it shows up as missing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

use super::similarity::similarity;

/// Minimum similarity before two different patterns count as a rename.
const RENAME_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRename {
    pub old_pattern: String,
    pub new_pattern: String,
    pub old_count: usize,
    pub new_count: usize,
    pub confidence: f64,
}

/// First non-empty path segment, wrapped as `/segment/`.
fn pattern_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed
        .path_segments()?
        .find(|segment| !segment.is_empty())?
        .to_string();
    Some(format!("/{segment}/"))
}

fn pattern_counts(urls: &[String]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for url in urls {
        if let Some(pattern) = pattern_of(url) {
            *counts.entry(pattern).or_insert(0) += 1;
        }
    }
    counts
}

/// Infer likely section renames between the two sides.
pub fn detect_pattern_renames(old_urls: &[String], new_urls: &[String]) -> Vec<PatternRename> {
    let old_counts = pattern_counts(old_urls);
    let new_counts = pattern_counts(new_urls);

    let mut renames = Vec::new();
    for (old_pattern, old_count) in &old_counts {
        let mut best: Option<(&String, f64)> = None;
        for new_pattern in new_counts.keys() {
            if new_pattern == old_pattern {
                continue;
            }
            let score = similarity(old_pattern, new_pattern);
            if best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((new_pattern, score));
            }
        }

        if let Some((new_pattern, confidence)) = best {
            if confidence > RENAME_THRESHOLD {
                renames.push(PatternRename {
                    old_pattern: old_pattern.clone(),
                    new_pattern: new_pattern.clone(),
                    old_count: *old_count,
                    new_count: new_counts[new_pattern],
                    confidence,
                });
            }
        }
    }

    // Deterministic output regardless of map iteration order
    renames.sort_by(|a, b| a.old_pattern.cmp(&b.old_pattern));
    renames
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn extracts_first_segment_pattern() {
        assert_eq!(
            pattern_of("https://a.com/blog/post-1").as_deref(),
            Some("/blog/")
        );
        assert_eq!(pattern_of("https://a.com/"), None);
        assert_eq!(
            pattern_of("https://a.com//articles/x").as_deref(),
            Some("/articles/")
        );
    }

    #[test]
    fn detects_similar_section_rename() {
        let old = urls(&[
            "https://old.site/article/one",
            "https://old.site/article/two",
            "https://old.site/article/three",
        ]);
        let new = urls(&[
            "https://new.site/articles/one",
            "https://new.site/articles/two",
        ]);

        let renames = detect_pattern_renames(&old, &new);
        assert_eq!(renames.len(), 1);
        assert_eq!(renames[0].old_pattern, "/article/");
        assert_eq!(renames[0].new_pattern, "/articles/");
        assert_eq!(renames[0].old_count, 3);
        assert_eq!(renames[0].new_count, 2);
        assert!(renames[0].confidence > RENAME_THRESHOLD);
    }

    #[test]
    fn identical_patterns_are_not_renames() {
        let old = urls(&["https://old.site/blog/a"]);
        let new = urls(&["https://new.site/blog/b"]);
        assert!(detect_pattern_renames(&old, &new).is_empty());
    }

    #[test]
    fn dissimilar_patterns_are_ignored() {
        let old = urls(&["https://old.site/shop/a"]);
        let new = urls(&["https://new.site/contact/b"]);
        assert!(detect_pattern_renames(&old, &new).is_empty());
    }
}

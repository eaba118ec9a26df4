//! Configured-rule matching and loader-list assembly.
//!
//! Rules contribute loader identities to one of three buckets (pre,
//! normal, post) when their pattern matches the resource. The request
//! prefix decides which buckets combine with the request's inline loaders
//! to form the effective chain.

use regex::Regex;
use serde::Deserialize;

use crate::request::{RequestPrefix, split_request};

/// Bucket a rule's loaders land in relative to inline and other
/// configured loaders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Enforce {
    Pre,
    #[default]
    Normal,
    Post,
}

/// One configured rule.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Pattern matched against the resource path
    pub test: Regex,
    /// Bucket the rule's loaders land in
    pub enforce: Enforce,
    /// Loader identities contributed when the rule matches
    pub loaders: Vec<String>,
}

/// A request resolved into its resource and effective loader chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub resource: String,
    /// Ordered loader identities, first entry outermost
    pub loaders: Vec<String>,
}

/// Assemble the effective loader list for a request. Matching rules
/// contribute their identities in rule-declaration order within each
/// bucket; the request prefix selects which buckets apply.
pub fn assemble_loaders(request: &str, rules: &[Rule]) -> ResolvedRequest {
    let split = split_request(request);

    let mut pre = Vec::new();
    let mut normal = Vec::new();
    let mut post = Vec::new();
    for rule in rules {
        if rule.test.is_match(&split.resource) {
            let bucket = match rule.enforce {
                Enforce::Pre => &mut pre,
                Enforce::Normal => &mut normal,
                Enforce::Post => &mut post,
            };
            bucket.extend(rule.loaders.iter().cloned());
        }
    }

    let inline = split.inline_loaders;
    let loaders = match split.prefix {
        RequestPrefix::None => [post, inline, normal, pre].concat(),
        RequestPrefix::SkipInline => [post, normal, pre].concat(),
        RequestPrefix::SkipNormal => [post, pre].concat(),
        RequestPrefix::InlineOnly => inline,
    };

    log::trace!(
        "assembled {} loader(s) for resource `{}`",
        loaders.len(),
        split.resource
    );
    ResolvedRequest {
        resource: split.resource,
        loaders,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str, enforce: Enforce, loaders: &[&str]) -> Rule {
        Rule {
            test: Regex::new(pattern).unwrap(),
            enforce,
            loaders: loaders.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    fn js_rules() -> Vec<Rule> {
        vec![
            rule(r"\.js$", Enforce::Normal, &["normal-1", "normal-2"]),
            rule(r"\.js$", Enforce::Pre, &["pre-1"]),
            rule(r"\.js$", Enforce::Post, &["post-1"]),
        ]
    }

    #[test]
    fn test_default_prefix_combines_all_buckets() {
        let resolved = assemble_loaders("inline-1!inline-2!src/app.js", &js_rules());
        assert_eq!(resolved.resource, "src/app.js");
        assert_eq!(
            resolved.loaders,
            vec!["post-1", "inline-1", "inline-2", "normal-1", "normal-2", "pre-1"]
        );
    }

    #[test]
    fn test_single_bang_drops_inline() {
        let resolved = assemble_loaders("!inline-1!src/app.js", &js_rules());
        assert_eq!(resolved.loaders, vec!["post-1", "normal-1", "normal-2", "pre-1"]);
    }

    #[test]
    fn test_dash_bang_drops_inline_and_normal() {
        let resolved = assemble_loaders("-!inline-1!src/app.js", &js_rules());
        assert_eq!(resolved.loaders, vec!["post-1", "pre-1"]);
    }

    #[test]
    fn test_double_bang_keeps_only_inline() {
        let resolved = assemble_loaders("!!inline-1!inline-2!src/app.js", &js_rules());
        assert_eq!(resolved.loaders, vec!["inline-1", "inline-2"]);
    }

    #[test]
    fn test_non_matching_rules_contribute_nothing() {
        let resolved = assemble_loaders("inline-1!src/app.css", &js_rules());
        assert_eq!(resolved.loaders, vec!["inline-1"]);
    }

    #[test]
    fn test_declaration_order_within_buckets() {
        let rules = vec![
            rule(r"\.js$", Enforce::Pre, &["pre-a"]),
            rule(r"app", Enforce::Pre, &["pre-b"]),
        ];
        let resolved = assemble_loaders("src/app.js", &rules);
        assert_eq!(resolved.loaders, vec!["pre-a", "pre-b"]);
    }
}

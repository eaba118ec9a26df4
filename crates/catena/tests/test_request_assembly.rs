use catena::{Config, assemble_loaders};
use pretty_assertions::assert_eq;

/// The rule set the original demo driver declares: two loaders in each
/// bucket, all matching `.js` resources
fn js_rules() -> Config {
    toml::from_str(
        r#"
        [[rules]]
        test = "\\.js$"
        loaders = ["normal-loader1", "normal-loader2"]

        [[rules]]
        test = "\\.js$"
        enforce = "pre"
        loaders = ["pre-loader1", "pre-loader2"]

        [[rules]]
        test = "\\.js$"
        enforce = "post"
        loaders = ["post-loader1", "post-loader2"]
        "#,
    )
    .unwrap()
}

#[test]
fn test_no_prefix_combines_post_inline_normal_pre() {
    let rules = js_rules().compile().unwrap();
    let resolved = assemble_loaders("inline-loader1!inline-loader2!src/index.js", &rules);

    assert_eq!(resolved.resource, "src/index.js");
    assert_eq!(
        resolved.loaders,
        vec![
            "post-loader1",
            "post-loader2",
            "inline-loader1",
            "inline-loader2",
            "normal-loader1",
            "normal-loader2",
            "pre-loader1",
            "pre-loader2",
        ]
    );
}

#[test]
fn test_single_bang_skips_inline_loaders() {
    let rules = js_rules().compile().unwrap();
    let resolved = assemble_loaders("!inline-loader1!src/index.js", &rules);

    assert_eq!(
        resolved.loaders,
        vec![
            "post-loader1",
            "post-loader2",
            "normal-loader1",
            "normal-loader2",
            "pre-loader1",
            "pre-loader2",
        ]
    );
}

#[test]
fn test_dash_bang_keeps_only_post_and_pre() {
    let rules = js_rules().compile().unwrap();
    let resolved = assemble_loaders("-!inline-loader1!src/index.js", &rules);

    assert_eq!(
        resolved.loaders,
        vec!["post-loader1", "post-loader2", "pre-loader1", "pre-loader2"]
    );
}

#[test]
fn test_double_bang_keeps_only_inline_loaders() {
    let rules = js_rules().compile().unwrap();
    let resolved = assemble_loaders("!!inline-loader1!inline-loader2!src/index.js", &rules);

    assert_eq!(resolved.resource, "src/index.js");
    assert_eq!(resolved.loaders, vec!["inline-loader1", "inline-loader2"]);
}

#[test]
fn test_rules_only_apply_to_matching_resources() {
    let rules = js_rules().compile().unwrap();
    let resolved = assemble_loaders("inline-loader1!src/styles.css", &rules);

    assert_eq!(resolved.resource, "src/styles.css");
    assert_eq!(resolved.loaders, vec!["inline-loader1"]);
}

#[test]
fn test_bare_resource_with_no_rules() {
    let resolved = assemble_loaders("src/index.js", &[]);
    assert_eq!(resolved.resource, "src/index.js");
    assert!(resolved.loaders.is_empty());
}

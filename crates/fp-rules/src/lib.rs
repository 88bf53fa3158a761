//! filterpolicy Network Rules
//!
//! This crate parses adblock-style network filter lines into rules the core
//! engine can evaluate. Plug [`AbpRuleParser`] into a
//! [`fp_core::PolicyEngine`] to filter with ABP/hosts lists.

pub mod parser;
pub mod pattern;
pub mod rule;
pub mod types;
pub mod url;

pub use parser::{parse_rule, AbpRuleParser};
pub use pattern::{AnchorType, Pattern};
pub use rule::{DomainConstraint, HeaderSpec, NetworkRule, RuleTarget};
pub use types::{RuleFlags, SchemeMask};

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use fp_core::{
        BuildOptions, CategoryId, DirectoryListSource, HeaderMap, ListType, PolicyConfig, PolicyEngine, Request,
    };

    const CONFIG: &str = r#"{
        "ConfiguredLists": [
            {"ListType": "Blacklist", "RelativeListPath": "/adult/domains.txt"},
            {"ListType": "Whitelist", "RelativeListPath": "/kids/allowed.txt"},
            {"ListType": "BypassList", "RelativeListPath": "/games/bypass.txt"},
            {"ListType": "TextTrigger", "RelativeListPath": "/adult/triggers.txt"},
            {"ListType": "Blacklist", "RelativeListPath": "/missing/list.txt"}
        ],
        "UpdateFrequency": 10,
        "CustomTriggerBlacklist": ["secret club"],
        "CustomWhitelist": ["example.org", "||homework.example^"],
        "SelfModeration": ["||casino.example^", "plain.example"]
    }"#;

    fn engine_with_lists() -> (tempfile::TempDir, PolicyEngine<AbpRuleParser>) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".adult.domains.txt"),
            "! adult domains\n||porn.example^\n0.0.0.0 xxx.example\n/adult-banner/*\nexample.com##.ad\n",
        )
        .unwrap();
        fs::write(dir.path().join(".kids.allowed.txt"), "||kids.example^\n").unwrap();
        fs::write(dir.path().join(".games.bypass.txt"), "||games.example^\n").unwrap();
        fs::write(dir.path().join(".adult.triggers.txt"), "Naughty Word\r\n\r\nexplicit\r\n").unwrap();

        let config = PolicyConfig::from_json_str(CONFIG).unwrap();
        let engine = PolicyEngine::new(AbpRuleParser::new(), BuildOptions::default());
        engine
            .rebuild(&config, &DirectoryListSource::new(dir.path()))
            .unwrap();
        (dir, engine)
    }

    fn category_names(engine: &PolicyEngine<AbpRuleParser>, url: &str) -> Vec<String> {
        let generation = engine.current();
        engine
            .test_url(&Request::new(url, ""))
            .iter()
            .map(|m| generation.registry().get(m.id).unwrap().name.clone())
            .collect()
    }

    #[test]
    fn test_load_stats() {
        let (_dir, engine) = engine_with_lists();
        let generation = engine.current();
        let stats = generation.stats();

        assert_eq!(stats.lists_loaded, 5);
        assert_eq!(stats.lists_skipped, 1);
        // 3 adult + 1 kids + 1 bypass + 1 custom whitelist + 1 self moderation
        assert_eq!(stats.rules_loaded, 7);
        assert_eq!(stats.rules_failed, 1);
        assert_eq!(stats.triggers_loaded, 3);
        assert_eq!(generation.registry().get_by_name("/adult/domains").unwrap().id, CategoryId(1));
    }

    #[test]
    fn test_url_categories() {
        let (_dir, engine) = engine_with_lists();

        assert_eq!(category_names(&engine, "https://www.porn.example/"), vec!["/adult/domains"]);
        assert_eq!(category_names(&engine, "http://xxx.example/video"), vec!["/adult/domains"]);
        assert_eq!(category_names(&engine, "https://cdn.example/adult-banner/1.png"), vec!["/adult/domains"]);
        assert_eq!(category_names(&engine, "https://kids.example/"), vec!["/kids/allowed"]);
        assert_eq!(category_names(&engine, "https://homework.example/"), vec!["/user/custom_whitelist"]);
        assert_eq!(category_names(&engine, "https://casino.example/"), vec!["/user/self_moderation"]);
        assert!(category_names(&engine, "https://plain.example/").is_empty());
        assert!(category_names(&engine, "https://example.org/").is_empty());
    }

    #[test]
    fn test_bypass_resolution() {
        let (_dir, engine) = engine_with_lists();

        assert_eq!(category_names(&engine, "https://games.example/play"), vec!["/games/bypass"]);
        engine.set_bypass_enabled(true);
        assert!(category_names(&engine, "https://games.example/play").is_empty());
    }

    #[test]
    fn test_text_triggers() {
        let (_dir, engine) = engine_with_lists();
        let generation = engine.current();
        let name = |text: &str| -> Vec<String> {
            engine
                .test_text(text)
                .iter()
                .map(|m| generation.registry().get(m.id).unwrap().name.clone())
                .collect()
        };

        assert_eq!(name("what a NAUGHTY-word"), vec!["/adult/triggers"]);
        assert_eq!(name("join the Secret Club today"), vec!["/user/trigger_blacklist"]);
        assert!(name("explicitly fine").is_empty());
        assert_eq!(engine.test_text("explicit.")[0].list_type, ListType::TextTrigger);
    }

    #[test]
    fn test_header_rules() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".media.video.txt"), "*$header=content-type:video/\n").unwrap();
        let config = PolicyConfig::from_json_str(
            r#"{"ConfiguredLists": [{"ListType": "Blacklist", "RelativeListPath": "/media/video.txt"}]}"#,
        )
        .unwrap();
        let engine = PolicyEngine::new(AbpRuleParser::new(), BuildOptions::default());
        let generation = engine.rebuild(&config, &DirectoryListSource::new(dir.path())).unwrap();
        // A bare `*` pattern is rejected.
        assert_eq!(generation.stats().rules_failed, 1);

        fs::write(dir.path().join(".media.video.txt"), "/stream/*$header=content-type:video/\n").unwrap();
        engine.rebuild(&config, &DirectoryListSource::new(dir.path())).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("Content-Type".to_string(), vec!["video/mp4".to_string()]);
        let url = "https://cdn.example/stream/1";
        let with = Request::new(url, "cdn.example").with_headers(&headers);
        let without = Request::new(url, "cdn.example");

        assert_eq!(engine.test_url(&with).len(), 1);
        assert!(engine.test_url(&without).is_empty());
    }

    #[test]
    fn test_missing_host_fails_open() {
        let (_dir, engine) = engine_with_lists();
        assert!(engine.test_url(&Request::new("porn.example", "")).is_empty());
    }
}

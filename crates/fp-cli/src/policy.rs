//! Engine loading shared by the CLI commands

use std::path::Path;

use fp_core::{
    BuildOptions, DirectoryListSource, HeaderMap, MatchedCategory, PolicyConfig, PolicyEngine,
};
use fp_rules::AbpRuleParser;

pub type Engine = PolicyEngine<AbpRuleParser>;

/// Load a policy and build its first generation.
pub fn load_engine(config_path: &str, lists_dir: &str, options: BuildOptions) -> Result<Engine, String> {
    log::info!("Loading policy {} with lists from {}", config_path, lists_dir);
    let config = PolicyConfig::from_file(Path::new(config_path))
        .map_err(|e| format!("Failed to load config: {}", e))?;

    let engine = PolicyEngine::new(AbpRuleParser::new(), options);
    engine
        .rebuild(&config, &DirectoryListSource::new(lists_dir))
        .map_err(|e| format!("Failed to load lists: {}", e))?;
    Ok(engine)
}

/// Parse repeated `name:value` arguments into a header map.
pub fn parse_headers(args: &[String]) -> Result<HeaderMap, String> {
    let mut headers = HeaderMap::new();
    for arg in args {
        let (name, value) = arg
            .split_once(':')
            .ok_or_else(|| format!("Invalid header '{}', expected name:value", arg))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("Invalid header '{}', empty name", arg));
        }
        headers
            .entry(name.to_string())
            .or_default()
            .push(value.trim().to_string());
    }
    Ok(headers)
}

/// One line per matched category: `id<TAB>list type<TAB>name`.
pub fn describe(engine: &Engine, matched: &[MatchedCategory]) -> Vec<String> {
    let generation = engine.current();
    matched
        .iter()
        .map(|m| {
            let name = generation
                .registry()
                .get(m.id)
                .map(|c| c.name.as_str())
                .unwrap_or("?");
            format!("{}\t{}\t{}", m.id, m.list_type, name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_headers() {
        let args = vec![
            "Content-Type: text/html".to_string(),
            "X-Tag:a".to_string(),
            "X-Tag:b".to_string(),
        ];
        let headers = parse_headers(&args).unwrap();
        assert_eq!(headers["Content-Type"], vec!["text/html"]);
        assert_eq!(headers["X-Tag"], vec!["a", "b"]);

        assert!(parse_headers(&["novalue".to_string()]).is_err());
        assert!(parse_headers(&[":value".to_string()]).is_err());
    }

    #[test]
    fn test_load_engine() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("cfg.json");
        fs::write(
            &cfg,
            r#"{"ConfiguredLists": [{"ListType": "Blacklist", "RelativeListPath": "/ads/hosts.txt"}]}"#,
        )
        .unwrap();
        fs::write(dir.path().join(".ads.hosts.txt"), "0.0.0.0 ads.example\n").unwrap();

        let lists = dir.path().to_str().unwrap();
        let engine = load_engine(cfg.to_str().unwrap(), lists, BuildOptions::default()).unwrap();
        let matched = engine.test_url(&fp_core::Request::new("https://ads.example/", ""));
        assert_eq!(describe(&engine, &matched), vec!["1\tBlacklist\t/ads/hosts"]);

        let missing = dir.path().join("nope.json");
        assert!(load_engine(missing.to_str().unwrap(), lists, BuildOptions::default()).is_err());
    }
}

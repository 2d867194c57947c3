//! Integration tests for TOML configuration loading.
//!
//! Uses `figment::Jail` for sandboxed files and env vars.

use figment::{
    Figment, Jail,
    providers::{Env, Format, Serialized, Toml},
};
use pretty_assertions::assert_eq;
use sift_config::{AttachmentMode, CombineMode, LibraryType, Provider, QueryMode, SiftConfig};

#[test]
fn loads_llm_section_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[llm]
provider = "anthropic"
max_tokens = 1024

[llm.anthropic]
api_key = "ant-key"
model = "claude-test"
"#,
        )?;

        let config: SiftConfig = Figment::from(Serialized::defaults(SiftConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.llm.provider, Provider::Anthropic);
        assert_eq!(config.llm.max_tokens, 1024);
        assert_eq!(config.llm.selected().model, "claude-test");
        assert_eq!(config.llm.anthropic.base_url, "https://api.anthropic.com");
        assert!(config.llm.is_configured());
        assert!(config.validate().is_ok());
        Ok(())
    });
}

#[test]
fn loads_zotero_and_acquisition_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[zotero]
api_key = "zot"
library_id = "12345"
library_type = "group"
attachment_mode = "both"
archive_dir = "/tmp/papers"

[acquisition]
source_fallback = false
max_pages = 8
"#,
        )?;

        let config: SiftConfig = Figment::from(Serialized::defaults(SiftConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert!(config.zotero.is_configured());
        assert_eq!(config.zotero.library_type, LibraryType::Group);
        assert_eq!(config.zotero.attachment_mode, AttachmentMode::Both);
        assert_eq!(config.zotero.collection, "ArXiv Daily");
        assert_eq!(config.archive_root().display().to_string(), "/tmp/papers");
        assert!(!config.acquisition.source_fallback);
        assert_eq!(config.acquisition.max_pages, 8);
        assert_eq!(config.acquisition.max_tokens, 10_000);
        Ok(())
    });
}

#[test]
fn env_overrides_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[feed]
query_mode = "title"
max_results = 10
"#,
        )?;
        jail.set_env("SIFT_FEED__MAX_RESULTS", "7");
        jail.set_env("SIFT_FEED__COMBINE", "all");
        jail.set_env("SIFT_GENERAL__WORKERS", "2");

        let config: SiftConfig = Figment::from(Serialized::defaults(SiftConfig::default()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("SIFT_").split("__"))
            .extract()?;

        assert_eq!(config.feed.query_mode, QueryMode::Title);
        assert_eq!(config.feed.max_results, 7);
        assert_eq!(config.feed.combine, CombineMode::All);
        assert_eq!(config.general.workers, 2);
        Ok(())
    });
}

#[test]
fn project_config_and_conventional_keys_load_through_figment_chain() {
    Jail::expect_with(|jail| {
        jail.create_dir(".sift")?;
        jail.create_file(
            ".sift/config.toml",
            r#"
[llm]
provider = "gemini"

[[template]]
key = "summary"
label = "TL;DR"
instruction = "One paragraph."
"#,
        )?;
        jail.set_env("GEMINI_API_KEY", "gem-key");
        jail.set_env("ZOTERO_API_KEY", "zot-key");

        let config: SiftConfig = SiftConfig::figment_for(jail.directory()).extract()?;

        assert_eq!(config.llm.provider, Provider::Gemini);
        assert_eq!(config.llm.gemini.api_key, "gem-key");
        assert_eq!(config.zotero.api_key, "zot-key");
        assert!(config.validate().is_ok());

        let template = config.analysis_template().expect("template");
        let labels: Vec<String> = template
            .generated_fields()
            .into_iter()
            .map(|f| f.label)
            .collect();
        assert_eq!(labels, vec!["TL;DR", "Assessment"]);
        Ok(())
    });
}

#[test]
fn prefixed_env_beats_conventional_key() {
    Jail::expect_with(|jail| {
        jail.set_env("OPENAI_API_KEY", "from-conventional");
        jail.set_env("SIFT_LLM__OPENAI__API_KEY", "from-prefixed");

        let config: SiftConfig = SiftConfig::figment_for(jail.directory()).extract()?;
        assert_eq!(config.llm.openai.api_key, "from-prefixed");
        Ok(())
    });
}

#[test]
fn schedule_out_of_range_is_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[llm]
analyze = false

[schedule]
hour = 24
"#,
        )?;

        let config: SiftConfig = Figment::from(Serialized::defaults(SiftConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("schedule"));
        Ok(())
    });
}

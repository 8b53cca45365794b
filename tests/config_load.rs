// tests/config_load.rs
use std::path::PathBuf;
use std::{env, fs};

use newswatch::{DedupMode, WatchConfig};

const ENV_VARS: [&str; 6] = [
    "NEWSWATCH_CONFIG",
    "NEWS_WEBHOOK_URL",
    "NEWS_INTERVAL_SECS",
    "NEWS_STATE_PATH",
    "NEWS_DEDUP_MODE",
    "NEWS_LISTEN_ADDR",
];

fn clear_env() {
    for k in ENV_VARS {
        env::remove_var(k);
    }
}

#[test]
fn file_load_reads_layout_table() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("watch.toml");
    fs::write(
        &p,
        r#"
base_url = "https://news.example.test/"
max_items = 20
webhook_url = "https://discord.test/api/webhooks/1/abc"

[layout]
timeline_id = "fil"
excluded_classes = ["contest", "sponsor"]
"#,
    )
    .unwrap();

    let cfg = WatchConfig::load_from_file(&p).unwrap();
    assert_eq!(cfg.base_origin(), "https://news.example.test");
    assert_eq!(cfg.max_items, 20);
    assert_eq!(cfg.layout.timeline_id, "fil");
    assert_eq!(cfg.layout.entry_class, "timeline-news");
    assert_eq!(cfg.layout.excluded_classes, vec!["contest", "sponsor"]);
    assert_eq!(
        cfg.webhook_url.as_deref(),
        Some("https://discord.test/api/webhooks/1/abc")
    );
    assert_eq!(cfg.state_path(), PathBuf::from("state/news_items.json"));
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("watch.toml");
    fs::write(&p, "interval_secs = \"soon\"").unwrap();
    assert!(WatchConfig::load_from_file(&p).is_err());
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // isolate CWD so the repo's own config/ is not read
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    // 1) nothing at all: built-in defaults
    let cfg = WatchConfig::load_default().unwrap();
    assert_eq!(cfg, WatchConfig::default());

    // 2) ./config/newswatch.toml
    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(
        tmp.path().join("config/newswatch.toml"),
        "interval_secs = 1800\n",
    )
    .unwrap();
    assert_eq!(WatchConfig::load_default().unwrap().interval_secs, 1800);

    // 3) NEWSWATCH_CONFIG wins over the fallback
    let p_env = tmp.path().join("other.toml");
    fs::write(&p_env, "interval_secs = 60\ndedup_mode = \"boundary_scan\"\n").unwrap();
    env::set_var("NEWSWATCH_CONFIG", &p_env);
    let cfg = WatchConfig::load_default().unwrap();
    assert_eq!(cfg.interval_secs, 60);
    assert_eq!(cfg.state_path(), PathBuf::from("state/latest_title.cache"));

    // 4) NEWSWATCH_CONFIG must exist
    env::set_var("NEWSWATCH_CONFIG", tmp.path().join("missing.toml"));
    assert!(WatchConfig::load_default().is_err());

    clear_env();
    env::set_current_dir(old).unwrap();
}

#[serial_test::serial]
#[test]
fn env_overrides_apply_on_top_of_file() {
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    env::set_var("NEWS_WEBHOOK_URL", "https://discord.test/api/webhooks/2/xyz");
    env::set_var("NEWS_INTERVAL_SECS", " 300 ");
    env::set_var("NEWS_STATE_PATH", "/var/lib/newswatch/title.cache");
    env::set_var("NEWS_DEDUP_MODE", "marker");
    env::set_var("NEWS_LISTEN_ADDR", "127.0.0.1:9900");

    let cfg = WatchConfig::load_default().unwrap();
    assert_eq!(
        cfg.webhook_url.as_deref(),
        Some("https://discord.test/api/webhooks/2/xyz")
    );
    assert_eq!(cfg.interval_secs, 300);
    assert_eq!(cfg.dedup_mode, DedupMode::BoundaryScan);
    assert_eq!(
        cfg.state_path(),
        PathBuf::from("/var/lib/newswatch/title.cache")
    );
    assert_eq!(cfg.listen_addr, "127.0.0.1:9900");

    // blank webhook switches back to log-only
    env::set_var("NEWS_WEBHOOK_URL", "  ");
    assert_eq!(WatchConfig::load_default().unwrap().webhook_url, None);

    env::set_var("NEWS_INTERVAL_SECS", "0");
    assert!(WatchConfig::load_default().is_err(), "zero interval rejected");

    env::set_var("NEWS_INTERVAL_SECS", "quarter-hour");
    assert!(WatchConfig::load_default().is_err());

    clear_env();
    env::set_current_dir(old).unwrap();
}

//! scrapegate.toml configuration parser.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapegateConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
    #[serde(default, rename = "scope", skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<ScopeConfig>,
    #[serde(default, rename = "static_metric", skip_serializing_if = "Vec::is_empty")]
    pub static_metrics: Vec<StaticMetricConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9464))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Time each producer gets per scrape. Absent means unbounded.
    pub producer_timeout_ms: Option<u64>,
}

impl CollectionConfig {
    pub fn producer_timeout(&self) -> Option<Duration> {
        self.producer_timeout_ms.map(Duration::from_millis)
    }
}

/// One authorization scope: a tag and where its token comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub tag: String,
    /// Literal token.
    pub token: Option<String>,
    /// Name of an environment variable holding the token.
    pub token_env: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaticMetricKind {
    Counter,
    Gauge,
    #[default]
    Untyped,
}

/// A constant metric served on every scrape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticMetricConfig {
    pub name: String,
    pub help: Option<String>,
    #[serde(default)]
    pub kind: StaticMetricKind,
    pub value: f64,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl ScrapegateConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate a TOML document.
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let config: ScrapegateConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for scope in &self.scopes {
            if !is_valid_tag(&scope.tag) {
                return Err(ConfigError::InvalidTag(scope.tag.clone()));
            }
            if !seen.insert(scope.tag.as_str()) {
                return Err(ConfigError::DuplicateTag(scope.tag.clone()));
            }
            if scope.token.is_some() == scope.token_env.is_some() {
                return Err(ConfigError::TokenSource(scope.tag.clone()));
            }
        }
        let mut first_by_name: HashMap<&str, &StaticMetricConfig> = HashMap::new();
        let mut series = HashSet::new();
        for metric in &self.static_metrics {
            if !is_valid_metric_name(&metric.name) {
                return Err(ConfigError::InvalidMetricName(metric.name.clone()));
            }
            if let Some(label) = metric.labels.keys().find(|l| !is_valid_label_name(l)) {
                return Err(ConfigError::InvalidLabelName {
                    metric: metric.name.clone(),
                    label: label.clone(),
                });
            }
            // Entries sharing a name are samples of one family.
            let first = *first_by_name.entry(metric.name.as_str()).or_insert(metric);
            if first.kind != metric.kind || first.help != metric.help {
                return Err(ConfigError::ConflictingStaticMetric(metric.name.clone()));
            }
            if !series.insert((metric.name.as_str(), &metric.labels)) {
                return Err(ConfigError::DuplicateSeries(metric.name.clone()));
            }
        }
        Ok(())
    }

    /// Resolve every scope's token into a tag → secret map.
    ///
    /// `lookup` reads environment variables; the daemon passes
    /// `std::env::var`, tests pass a fixed table.
    pub fn resolve_secrets<F>(&self, lookup: F) -> ConfigResult<BTreeMap<String, String>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut secrets = BTreeMap::new();
        for scope in &self.scopes {
            let secret = match (&scope.token, &scope.token_env) {
                (Some(token), _) => token.clone(),
                (None, Some(var)) => lookup(var).ok_or_else(|| ConfigError::MissingEnv {
                    tag: scope.tag.clone(),
                    var: var.clone(),
                })?,
                (None, None) => return Err(ConfigError::TokenSource(scope.tag.clone())),
            };
            if secret.is_empty() {
                return Err(ConfigError::EmptyToken(scope.tag.clone()));
            }
            secrets.insert(scope.tag.clone(), secret);
        }
        Ok(secrets)
    }

    /// A starter config with one scope reading its token from the environment.
    pub fn scaffold() -> Self {
        ScrapegateConfig {
            server: ServerConfig::default(),
            collection: CollectionConfig {
                producer_timeout_ms: Some(5000),
            },
            scopes: vec![ScopeConfig {
                tag: "default".to_string(),
                token: None,
                token_env: Some("SCRAPEGATE_DEFAULT_TOKEN".to_string()),
            }],
            static_metrics: Vec::new(),
        }
    }
}

/// Tags are path segments restricted to ASCII alphanumerics.
pub fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Metric names match `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Label names match `[a-zA-Z_][a-zA-Z0-9_]*`.
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[server]
listen = "127.0.0.1:9100"

[collection]
producer_timeout_ms = 2500

[[scope]]
tag = "team1"
token = "s3cret"

[[scope]]
tag = "ops"
token_env = "OPS_TOKEN"

[[static_metric]]
name = "deployment_info"
help = "Static deployment facts."
kind = "gauge"
value = 1.0
labels = { region = "eu-west-1" }
"#;

    #[test]
    fn parse_full() {
        let config = ScrapegateConfig::parse(FULL).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:9100".parse::<SocketAddr>().unwrap());
        assert_eq!(config.collection.producer_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.scopes.len(), 2);
        assert_eq!(config.static_metrics[0].kind, StaticMetricKind::Gauge);
        assert_eq!(config.static_metrics[0].labels["region"], "eu-west-1");
    }

    #[test]
    fn parse_minimal_uses_defaults() {
        let config = ScrapegateConfig::parse("").unwrap();
        assert_eq!(config.server.listen, default_listen());
        assert_eq!(config.collection.producer_timeout(), None);
        assert!(config.scopes.is_empty());
    }

    #[test]
    fn static_metric_kind_defaults_to_untyped() {
        let config = ScrapegateConfig::parse(
            r#"
[[static_metric]]
name = "quota"
value = 3
"#,
        )
        .unwrap();
        assert_eq!(config.static_metrics[0].kind, StaticMetricKind::Untyped);
        assert_eq!(config.static_metrics[0].value, 3.0);
    }

    #[test]
    fn rejects_non_alphanumeric_tag() {
        let err = ScrapegateConfig::parse(
            r#"
[[scope]]
tag = "team-1"
token = "x"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTag(tag) if tag == "team-1"));
    }

    #[test]
    fn rejects_duplicate_tag() {
        let err = ScrapegateConfig::parse(
            r#"
[[scope]]
tag = "a"
token = "x"

[[scope]]
tag = "a"
token = "y"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateTag(_)));
    }

    #[test]
    fn rejects_ambiguous_token_source() {
        let both = r#"
[[scope]]
tag = "a"
token = "x"
token_env = "A_TOKEN"
"#;
        let neither = r#"
[[scope]]
tag = "a"
"#;
        assert!(matches!(ScrapegateConfig::parse(both), Err(ConfigError::TokenSource(_))));
        assert!(matches!(ScrapegateConfig::parse(neither), Err(ConfigError::TokenSource(_))));
    }

    #[test]
    fn rejects_bad_metric_name() {
        let err = ScrapegateConfig::parse(
            r#"
[[static_metric]]
name = "9lives"
value = 1
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMetricName(_)));
    }

    #[test]
    fn resolve_secrets_reads_env_lookup() {
        let config = ScrapegateConfig::parse(FULL).unwrap();
        let secrets = config
            .resolve_secrets(|var| (var == "OPS_TOKEN").then(|| "from-env".to_string()))
            .unwrap();
        assert_eq!(secrets["team1"], "s3cret");
        assert_eq!(secrets["ops"], "from-env");
    }

    #[test]
    fn resolve_secrets_missing_env() {
        let config = ScrapegateConfig::parse(FULL).unwrap();
        let err = config.resolve_secrets(|_| None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv { ref var, .. } if var == "OPS_TOKEN"));
    }

    #[test]
    fn resolve_secrets_rejects_empty_token() {
        let config = ScrapegateConfig::parse(
            r#"
[[scope]]
tag = "a"
token = ""
"#,
        )
        .unwrap();
        assert!(matches!(config.resolve_secrets(|_| None), Err(ConfigError::EmptyToken(_))));
    }

    #[test]
    fn scaffold_round_trips() {
        let toml_str = ScrapegateConfig::scaffold().to_toml_string().unwrap();
        assert!(toml_str.contains("SCRAPEGATE_DEFAULT_TOKEN"));
        let parsed = ScrapegateConfig::parse(&toml_str).unwrap();
        assert_eq!(parsed.scopes[0].tag, "default");
    }

    #[test]
    fn from_file_reads_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scrapegate.toml");
        std::fs::write(&path, FULL).unwrap();

        let config = ScrapegateConfig::from_file(&path).unwrap();
        assert_eq!(config.scopes[0].tag, "team1");

        let missing = ScrapegateConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }

    #[test]
    fn tag_and_name_rules() {
        assert!(is_valid_tag("team1"));
        assert!(!is_valid_tag(""));
        assert!(!is_valid_tag("team_1"));
        assert!(is_valid_metric_name("http_requests_total"));
        assert!(is_valid_metric_name(":recorded:rule"));
        assert!(!is_valid_metric_name(""));
        assert!(!is_valid_metric_name("bad-name"));
        assert!(is_valid_label_name("region"));
        assert!(is_valid_label_name("_zone2"));
        assert!(!is_valid_label_name("2zone"));
        assert!(!is_valid_label_name("bad-label"));
        assert!(!is_valid_label_name("a:b"));
        assert!(!is_valid_label_name(""));
    }

    #[test]
    fn rejects_bad_label_name() {
        let err = ScrapegateConfig::parse(
            r#"
[[static_metric]]
name = "quota"
value = 1
labels = { "bad-label" = "x" }
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidLabelName { ref metric, ref label } if metric == "quota" && label == "bad-label"
        ));
    }

    #[test]
    fn same_name_entries_with_distinct_labels_are_accepted() {
        let config = ScrapegateConfig::parse(
            r#"
[[static_metric]]
name = "quota"
kind = "gauge"
value = 1
labels = { region = "eu" }

[[static_metric]]
name = "quota"
kind = "gauge"
value = 2
labels = { region = "us" }
"#,
        )
        .unwrap();
        assert_eq!(config.static_metrics.len(), 2);
    }

    #[test]
    fn rejects_conflicting_static_metric_kind() {
        let err = ScrapegateConfig::parse(
            r#"
[[static_metric]]
name = "quota"
kind = "gauge"
value = 1
labels = { region = "eu" }

[[static_metric]]
name = "quota"
kind = "counter"
value = 2
labels = { region = "us" }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingStaticMetric(name) if name == "quota"));
    }

    #[test]
    fn rejects_duplicate_static_series() {
        let err = ScrapegateConfig::parse(
            r#"
[[static_metric]]
name = "quota"
value = 1
labels = { region = "eu" }

[[static_metric]]
name = "quota"
value = 2
labels = { region = "eu" }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateSeries(name) if name == "quota"));
    }
}

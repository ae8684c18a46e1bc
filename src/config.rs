//! Configuration management for dnb-meta

use config::{Config, ConfigError, Environment, File};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::env;

/// Series names the DNB sometimes reports that are really imprint or
/// product-line labels, not book series. Matched case-insensitively.
pub const DEFAULT_UNWANTED_SERIES: &[&str] = &[
    r"^Roman$",
    r"^Science-fiction$",
    r"^\[Ariadne\]$",
    r"^Ariadne$",
    r"^atb$",
    r"^BvT$",
    r"^Bastei L",
    r"^bb$",
    r"^Beck Paperback",
    r"^Beck\-.*berater",
    r"^Beck'sche Reihe",
    r"^Bibliothek Suhrkamp$",
    r"^BLT$",
    r"^DLV-Taschenbuch$",
    r"^Edition Suhrkamp$",
    r"^Edition Lingen Stiftung$",
    r"^Edition C",
    r"^Edition Metzgenstein$",
    r"^ETB$",
    r"^dtv",
    r"^Ein Goldmann",
    r"^Oettinger-Taschenbuch$",
    r"^Haymon-Taschenbuch$",
    r"^Mira Taschenbuch$",
    r"^Suhrkamp-Taschenbuch$",
    r"^Bastei-L",
    r"^Hey$",
    r"^btb$",
    r"^bt-Kinder",
    r"^Ravensburger",
    r"^Sammlung Luchterhand$",
    r"^blanvalet$",
    r"^KiWi$",
    r"^Piper$",
    r"^C.H. Beck",
    r"^Rororo$",
    r"^Goldmann$",
    r"^Moewig$",
    r"^Fischer Klassik$",
    r"^hey! shorties$",
    r"^Ullstein",
    r"^Unionsverlag",
    r"^Ariadne-Krimi",
    r"^C.-Bertelsmann",
    r"^Phantastische Bibliothek$",
    r"^Knaur",
    r"^Volk-und-Welt",
    r"^Allgemeine",
    r"^Premium",
    r"^Horror-Bibliothek$",
];

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SruConfig {
    pub base_url: String,
    pub maximum_records: u32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CoverConfig {
    /// Cover probe URL; `{isbn}` is replaced with the candidate ISBN.
    pub url_template: String,
}

/// Which subject vocabularies end up in the final tag list.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SubjectMode {
    OnlyGnd,
    PreferGnd,
    Both,
    PreferNonGnd,
    OnlyNonGnd,
    None,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MetadataConfig {
    /// Try to extract series and series index from the free-text title
    /// when the structured fields leave them undetermined.
    pub guess_series: bool,
    /// Append the edition statement to the title ("Mord am Tegernsee : 2. Aufl.").
    pub append_edition_to_title: bool,
    pub subjects: SubjectMode,
    /// Case-insensitive regular expressions for series names to reject.
    pub unwanted_series: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub sru: SruConfig,
    pub cover: CoverConfig,
    pub metadata: MetadataConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (with prefix DNBMETA_)
            .add_source(
                Environment::with_prefix("DNBMETA")
                    .separator("_")
                    .try_parsing(true),
            )
            // Override SRU endpoint from DNB_SRU_URL env var if present
            .set_override_option("sru.base_url", env::var("DNB_SRU_URL").ok())?
            .build()?;

        config.try_deserialize()
    }
}

impl MetadataConfig {
    /// Compile the unwanted-series denylist. A pattern that fails to
    /// compile is logged as a warning and skipped, never fatal.
    pub fn compiled_unwanted_series(&self) -> Vec<Regex> {
        self.unwanted_series
            .iter()
            .filter_map(|pattern| {
                match RegexBuilder::new(pattern).case_insensitive(true).build() {
                    Ok(re) => Some(re),
                    Err(e) => {
                        tracing::warn!(
                            "skipping malformed unwanted-series pattern {:?}: {}",
                            pattern,
                            e
                        );
                        None
                    }
                }
            })
            .collect()
    }
}

impl Default for SruConfig {
    fn default() -> Self {
        Self {
            base_url: "https://services.dnb.de/sru/dnb".to_string(),
            maximum_records: 10,
            timeout_seconds: 30,
        }
    }
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            url_template: "https://portal.dnb.de/opac/mvb/cover?isbn={isbn}".to_string(),
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            guess_series: true,
            append_edition_to_title: false,
            subjects: SubjectMode::Both,
            unwanted_series: DEFAULT_UNWANTED_SERIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Config;

/// On-disk TOML configuration. Every field is optional so partial files
/// layer over the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub llm: Option<LlmConfig>,
    pub paths: Option<PathsConfig>,
    pub pipeline: Option<PipelineConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    pub url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub include_note: Option<bool>,
    pub show_every: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    pub db_path: Option<String>,
    pub gazetteer_path: Option<String>,
    pub cache_path: Option<String>,
    pub series_db_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub max_rows: Option<usize>,
    pub input_table: Option<String>,
    pub output_table: Option<String>,
    pub csv_sample_path: Option<String>,
    pub series_matching: Option<bool>,
    pub max_series_candidates: Option<usize>,
}

/// Platform config file: `<config_dir>/confmeta/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("confmeta").join("config.toml"))
}

/// Cascade `./.confmeta.toml` over the platform config.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".confmeta.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// `None` when the file is missing; an unparsable file is logged and
/// ignored.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => {
            tracing::debug!(path = %path.display(), "loaded config file");
            Some(config)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
            None
        }
    }
}

fn pick<S, T>(
    overlay: Option<&S>,
    base: Option<&S>,
    field: impl Fn(&S) -> Option<T>,
) -> Option<T> {
    overlay.and_then(&field).or_else(|| base.and_then(&field))
}

/// Field-by-field merge; `overlay` wins.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let (bl, ol) = (base.llm.as_ref(), overlay.llm.as_ref());
    let (bp, op) = (base.paths.as_ref(), overlay.paths.as_ref());
    let (bq, oq) = (base.pipeline.as_ref(), overlay.pipeline.as_ref());

    ConfigFile {
        llm: Some(LlmConfig {
            url: pick(ol, bl, |l| l.url.clone()),
            model: pick(ol, bl, |l| l.model.clone()),
            timeout_secs: pick(ol, bl, |l| l.timeout_secs),
            include_note: pick(ol, bl, |l| l.include_note),
            show_every: pick(ol, bl, |l| l.show_every),
        }),
        paths: Some(PathsConfig {
            db_path: pick(op, bp, |p| p.db_path.clone()),
            gazetteer_path: pick(op, bp, |p| p.gazetteer_path.clone()),
            cache_path: pick(op, bp, |p| p.cache_path.clone()),
            series_db_path: pick(op, bp, |p| p.series_db_path.clone()),
        }),
        pipeline: Some(PipelineConfig {
            max_rows: pick(oq, bq, |q| q.max_rows),
            input_table: pick(oq, bq, |q| q.input_table.clone()),
            output_table: pick(oq, bq, |q| q.output_table.clone()),
            csv_sample_path: pick(oq, bq, |q| q.csv_sample_path.clone()),
            series_matching: pick(oq, bq, |q| q.series_matching),
            max_series_candidates: pick(oq, bq, |q| q.max_series_candidates),
        }),
    }
}

impl ConfigFile {
    /// Overwrite `config` with every value this file sets.
    pub fn apply(&self, config: &mut Config) {
        if let Some(llm) = &self.llm {
            if let Some(url) = &llm.url {
                config.llm_url = url.clone();
            }
            if let Some(model) = &llm.model {
                config.model = model.clone();
            }
            if let Some(secs) = llm.timeout_secs {
                // 0 means wait forever
                config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
            }
            if let Some(v) = llm.include_note {
                config.include_note = v;
            }
            if let Some(v) = llm.show_every {
                config.show_every = v;
            }
        }
        if let Some(paths) = &self.paths {
            if let Some(p) = &paths.db_path {
                config.db_path = Some(PathBuf::from(p));
            }
            if let Some(p) = &paths.gazetteer_path {
                config.gazetteer_path = PathBuf::from(p);
            }
            if let Some(p) = &paths.cache_path {
                config.cache_path = Some(PathBuf::from(p));
            }
            if let Some(p) = &paths.series_db_path {
                config.series_db_path = Some(PathBuf::from(p));
            }
        }
        if let Some(q) = &self.pipeline {
            if let Some(v) = q.max_rows {
                config.max_rows = v;
            }
            if let Some(v) = &q.input_table {
                config.input_table = v.clone();
            }
            if let Some(v) = &q.output_table {
                config.output_table = v.clone();
            }
            if let Some(p) = &q.csv_sample_path {
                // empty string turns the sample off
                config.csv_sample_path = (!p.is_empty()).then(|| PathBuf::from(p));
            }
            if let Some(v) = q.series_matching {
                config.series_matching = v;
            }
            if let Some(v) = q.max_series_candidates {
                config.max_series_candidates = v;
            }
        }
    }
}

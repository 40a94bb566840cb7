//! Configuration system for docsift.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::error::{ErrorCode, SiftError, SiftResult};
use crate::scoring::{AggregateMode, DEFAULT_DENSITY_NORM};
use crate::types::{extension_of, Category, FileClass};

/// Acceptance cutoffs per ladder rung.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cutoffs {
    /// Native text layer of paginated documents.
    pub pdf_text: f64,
    /// First visual-recognition rung (standard resolution).
    pub ocr_a: f64,
    /// Second visual-recognition rung (high resolution, rotation retries).
    pub ocr_b: f64,
    /// Modern word-processor body text.
    pub office: f64,
    /// Legacy word-processor text.
    pub legacy: f64,
    /// Plain text files.
    pub plain_text: f64,
    /// Standalone raster image, first attempt.
    pub image: f64,
    /// Standalone raster image, rotation retry.
    pub image_retry: f64,
}

impl Default for Cutoffs {
    fn default() -> Self {
        Self {
            pdf_text: 0.75,
            ocr_a: 0.65,
            ocr_b: 0.55,
            office: 0.60,
            legacy: 0.55,
            plain_text: 0.0,
            image: 0.65,
            image_retry: 0.55,
        }
    }
}

impl Cutoffs {
    fn named(&self) -> [(&'static str, f64); 8] {
        [
            ("pdf_text", self.pdf_text),
            ("ocr_a", self.ocr_a),
            ("ocr_b", self.ocr_b),
            ("office", self.office),
            ("legacy", self.legacy),
            ("plain_text", self.plain_text),
            ("image", self.image),
            ("image_retry", self.image_retry),
        ]
    }
}

/// Thresholds above which a paginated document is emitted per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LargeDocThresholds {
    pub page_count: usize,
    pub size_bytes: u64,
    pub char_count: usize,
}

impl Default for LargeDocThresholds {
    fn default() -> Self {
        Self {
            page_count: 500,
            size_bytes: 100_000_000,
            char_count: 2_000_000,
        }
    }
}

/// Main docsift configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiftConfig {
    /// Root under which run folders appear.
    pub input_dir: PathBuf,
    /// Root under which per-run outputs are written.
    pub output_dir: PathBuf,
    /// Root for scratch space and run locks.
    pub work_dir: PathBuf,
    /// Seconds between discovery sweeps and quiescence polls.
    pub poll_interval_secs: u64,
    /// Marker file name that bypasses the quiescence wait.
    pub ready_marker: String,
    /// Name of the review subdirectory inside a run's output.
    pub review_dir_name: String,
    /// Acceptance cutoffs.
    pub cutoffs: Cutoffs,
    /// Large-document thresholds.
    pub large: LargeDocThresholds,
    /// Minimum free scratch space before any visual-recognition pass.
    pub min_free_bytes: u64,
    /// Maximum embedded images recognized per office document.
    pub max_embedded_images: usize,
    /// Truncate an existing record file at run start instead of appending.
    pub replace_output: bool,
    /// Recognition language code.
    pub ocr_lang: String,
    /// Resolution of the first visual-recognition rung.
    pub ocr_a_dpi: u32,
    /// Resolution of the second visual-recognition rung.
    pub ocr_b_dpi: u32,
    /// Soft timeout per rung, in seconds.
    pub pass_timeout_secs: u64,
    /// Files processed concurrently within a run (1 = sequential).
    pub workers: usize,
    /// Aggregate used for document-level acceptance.
    pub aggregate: AggregateMode,
    /// Character count at which the density signal saturates.
    pub density_norm: f64,
    /// Write a `txt/` sidecar per accepted document.
    pub text_sidecars: bool,
    /// Extensions deleted on sight.
    pub auto_delete_ext: Vec<String>,
    /// Extensions always routed to review.
    pub review_only_ext: Vec<String>,
    /// Write new record files with the five-column layout.
    pub legacy_csv: bool,
}

impl Default for SiftConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("/data/input"),
            output_dir: PathBuf::from("/data/output"),
            work_dir: PathBuf::from("/data/work"),
            poll_interval_secs: 30,
            ready_marker: ".ready".to_string(),
            review_dir_name: "Mandatory Review".to_string(),
            cutoffs: Cutoffs::default(),
            large: LargeDocThresholds::default(),
            min_free_bytes: 1_000_000_000,
            max_embedded_images: 25,
            replace_output: false,
            ocr_lang: "eng".to_string(),
            ocr_a_dpi: 300,
            ocr_b_dpi: 400,
            pass_timeout_secs: 300,
            workers: 1,
            aggregate: AggregateMode::Median,
            density_norm: DEFAULT_DENSITY_NORM,
            text_sidecars: false,
            auto_delete_ext: ["wav", "mp3", "m4a", "aac", "flac", "ogg", "wma", "aiff"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            review_only_ext: vec!["xlsx".to_string()],
            legacy_csv: false,
        }
    }
}

impl SiftConfig {
    /// Load configuration from a file (TOML or JSON).
    pub fn from_file(path: impl AsRef<Path>) -> SiftResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| SiftError::configuration(e.to_string()))
            }
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| SiftError::configuration(e.to_string()))
            }
            _ => Err(SiftError::Configuration {
                message: "Unsupported config file format. Use .toml or .json".to_string(),
                code: ErrorCode::CfgUnsupportedFormat,
            }),
        }
    }

    /// Load configuration from `DOCSIFT_*` environment variables.
    ///
    /// Unparseable values are logged and leave the default in place.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let env = EnvReader { lookup };

        // Paths
        if let Some(v) = env.raw("INPUT_DIR") {
            config.input_dir = PathBuf::from(v);
        }
        if let Some(v) = env.raw("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(v);
        }
        if let Some(v) = env.raw("WORK_DIR") {
            config.work_dir = PathBuf::from(v);
        }
        if let Some(v) = env.raw("READY_MARKER") {
            config.ready_marker = v;
        }

        env.parse("POLL_INTERVAL_SECS", &mut config.poll_interval_secs);

        // Cutoffs
        let c = &mut config.cutoffs;
        env.parse("CUTOFF_PDF_TEXT", &mut c.pdf_text);
        env.parse("CUTOFF_OCR_A", &mut c.ocr_a);
        env.parse("CUTOFF_OCR_B", &mut c.ocr_b);
        env.parse("CUTOFF_OFFICE", &mut c.office);
        env.parse("CUTOFF_LEGACY", &mut c.legacy);
        env.parse("CUTOFF_PLAIN_TEXT", &mut c.plain_text);
        env.parse("CUTOFF_IMAGE", &mut c.image);
        env.parse("CUTOFF_IMAGE_RETRY", &mut c.image_retry);

        // Large-document thresholds
        env.parse("LARGE_PAGE_COUNT", &mut config.large.page_count);
        env.parse("LARGE_SIZE_BYTES", &mut config.large.size_bytes);
        env.parse("LARGE_CHAR_COUNT", &mut config.large.char_count);

        env.parse("MIN_FREE_BYTES", &mut config.min_free_bytes);
        env.parse("MAX_EMBEDDED_IMAGES", &mut config.max_embedded_images);
        env.flag("REPLACE_OUTPUT", &mut config.replace_output);
        if let Some(v) = env.raw("OCR_LANG") {
            config.ocr_lang = v;
        }
        env.parse("OCR_A_DPI", &mut config.ocr_a_dpi);
        env.parse("OCR_B_DPI", &mut config.ocr_b_dpi);
        env.parse("PASS_TIMEOUT_SECS", &mut config.pass_timeout_secs);
        env.parse("WORKERS", &mut config.workers);
        env.parse("AGGREGATE", &mut config.aggregate);
        env.flag("TEXT_SIDECARS", &mut config.text_sidecars);
        env.flag("LEGACY_CSV", &mut config.legacy_csv);
        if let Some(v) = env.raw("AUTO_DELETE_EXT") {
            config.auto_delete_ext = split_extensions(&v);
        }
        if let Some(v) = env.raw("REVIEW_ONLY_EXT") {
            config.review_only_ext = split_extensions(&v);
        }

        config
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> SiftConfigBuilder {
        SiftConfigBuilder::default()
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> SiftResult<()> {
        for (name, value) in self.cutoffs.named() {
            if !(0.0..=1.0).contains(&value) {
                return Err(SiftError::configuration(format!(
                    "cutoff {} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        let c = &self.cutoffs;
        if !(c.pdf_text > c.ocr_a && c.ocr_a > c.ocr_b) {
            return Err(SiftError::cutoff_order(format!(
                "paginated cutoffs must strictly decrease (pdf_text {} > ocr_a {} > ocr_b {})",
                c.pdf_text, c.ocr_a, c.ocr_b
            )));
        }
        if c.image_retry > c.image {
            return Err(SiftError::cutoff_order(format!(
                "image_retry cutoff {} exceeds image cutoff {}",
                c.image_retry, c.image
            )));
        }

        if self.workers == 0 {
            return Err(SiftError::configuration("workers must be at least 1"));
        }
        if self.poll_interval_secs == 0 {
            return Err(SiftError::configuration("poll interval must be at least 1 second"));
        }
        if self.pass_timeout_secs == 0 {
            return Err(SiftError::configuration("pass timeout must be at least 1 second"));
        }
        if self.density_norm <= 0.0 {
            return Err(SiftError::configuration("density_norm must be positive"));
        }
        if self.ocr_lang.trim().is_empty() {
            return Err(SiftError::configuration("ocr_lang must not be empty"));
        }
        Ok(())
    }

    /// Decide how the orchestrator treats a file, by extension.
    pub fn classify(&self, path: &Path) -> FileClass {
        let ext = extension_of(path);
        if self.auto_delete_ext.iter().any(|e| *e == ext) {
            FileClass::AutoDelete
        } else if self.review_only_ext.iter().any(|e| *e == ext) {
            FileClass::ReviewOnly
        } else {
            Category::from_extension(&ext)
                .map(FileClass::Extract)
                .unwrap_or(FileClass::Unsupported)
        }
    }

    /// Polling interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Per-rung soft timeout as a duration.
    pub fn pass_timeout(&self) -> Duration {
        Duration::from_secs(self.pass_timeout_secs)
    }

    /// Root of all scratch scopes.
    pub fn scratch_root(&self) -> PathBuf {
        self.work_dir.join("scratch")
    }

    /// Directory holding run lock files.
    pub fn lock_dir(&self) -> PathBuf {
        self.work_dir.join("locks")
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(&format!("DOCSIFT_{}", key))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, slot: &mut T) {
        if let Some(v) = self.raw(key) {
            match v.parse() {
                Ok(parsed) => *slot = parsed,
                Err(_) => warn!(key = %format!("DOCSIFT_{}", key), value = %v, "Ignoring unparseable setting"),
            }
        }
    }

    fn flag(&self, key: &str, slot: &mut bool) {
        if let Some(v) = self.raw(key) {
            *slot = matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
    }
}

fn split_extensions(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Builder for SiftConfig.
#[derive(Default)]
pub struct SiftConfigBuilder {
    config: SiftConfig,
}

impl SiftConfigBuilder {
    /// Set the input root.
    pub fn input_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.input_dir = path.into();
        self
    }

    /// Set the output root.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_dir = path.into();
        self
    }

    /// Set the work root.
    pub fn work_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.work_dir = path.into();
        self
    }

    /// Set the polling interval.
    pub fn poll_interval_secs(mut self, secs: u64) -> Self {
        self.config.poll_interval_secs = secs;
        self
    }

    /// Set all cutoffs.
    pub fn cutoffs(mut self, cutoffs: Cutoffs) -> Self {
        self.config.cutoffs = cutoffs;
        self
    }

    /// Set large-document thresholds.
    pub fn large(mut self, large: LargeDocThresholds) -> Self {
        self.config.large = large;
        self
    }

    /// Set the free-space floor.
    pub fn min_free_bytes(mut self, bytes: u64) -> Self {
        self.config.min_free_bytes = bytes;
        self
    }

    /// Set the embedded image cap.
    pub fn max_embedded_images(mut self, max: usize) -> Self {
        self.config.max_embedded_images = max;
        self
    }

    /// Truncate existing record files at run start.
    pub fn replace_output(mut self, replace: bool) -> Self {
        self.config.replace_output = replace;
        self
    }

    /// Set the per-rung timeout.
    pub fn pass_timeout_secs(mut self, secs: u64) -> Self {
        self.config.pass_timeout_secs = secs;
        self
    }

    /// Set the worker count.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Set the acceptance aggregate.
    pub fn aggregate(mut self, mode: AggregateMode) -> Self {
        self.config.aggregate = mode;
        self
    }

    /// Enable text sidecars.
    pub fn text_sidecars(mut self, enabled: bool) -> Self {
        self.config.text_sidecars = enabled;
        self
    }

    /// Force the five-column record layout for new files.
    pub fn legacy_csv(mut self, enabled: bool) -> Self {
        self.config.legacy_csv = enabled;
        self
    }

    /// Set the recognition language.
    pub fn ocr_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_lang = lang.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> SiftConfig {
        self.config
    }
}

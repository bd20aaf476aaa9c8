use serde::Deserialize;
use std::{fs, path::Path};
use tracing::warn;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub llm: LlmSection,
}

#[derive(Debug, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_input_dir")]
    pub input_dir: String,
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Appended to the PDF's base name to form the output file name.
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            template: default_template(),
            output_dir: default_output_dir(),
            output_suffix: default_output_suffix(),
        }
    }
}

fn default_input_dir() -> String {
    "input_pdfs".to_string()
}

fn default_template() -> String {
    "files/order_note_template.xlsx".to_string()
}

fn default_output_dir() -> String {
    "output_excel".to_string()
}

fn default_output_suffix() -> String {
    "_filled_order_note.xlsx".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Multimodal: the PDF itself goes to the model.
    #[default]
    Gemini,
    /// Local OpenAI-compatible server, text only.
    Ollama,
    /// Hosted OpenAI-compatible API, text only.
    Remote,
    /// No model at all; regex extraction from the PDF text.
    Heuristics,
}

#[derive(Debug, Deserialize)]
pub struct LlmSection {
    #[serde(default)]
    pub backend: LlmBackend,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_gemini")]
    pub gemini: EndpointConfig,
    #[serde(default = "default_ollama")]
    pub ollama: EndpointConfig,
    #[serde(default = "default_remote")]
    pub remote: EndpointConfig,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            backend: LlmBackend::default(),
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            gemini: default_gemini(),
            ollama: default_ollama(),
            remote: default_remote(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub base_url: String,
    pub model: String,
}

fn default_max_retries() -> u32 {
    5
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_gemini() -> EndpointConfig {
    EndpointConfig {
        base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        model: "gemini-1.5-flash".to_string(),
    }
}

fn default_ollama() -> EndpointConfig {
    EndpointConfig {
        base_url: "http://localhost:11434/v1".to_string(),
        model: "qwen3:8b".to_string(),
    }
}

fn default_remote() -> EndpointConfig {
    EndpointConfig {
        base_url: "https://api.openai.com/v1".to_string(),
        model: "gpt-4o-mini".to_string(),
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Like [`Config::load`], but a missing file means "all defaults".
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }
}

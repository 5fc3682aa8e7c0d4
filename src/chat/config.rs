//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg`, an optional YAML
//! settings file, and the resolved [`ChatConfig`] that seeds a session.

use std::fmt;
use std::path::Path;

use arrrg_derive::CommandLine;
use serde::Deserialize;

use crate::conversation::{DEFAULT_TEMPERATURE, DEFAULT_TOP_K, DEFAULT_TOP_P, GenerationConfig};
use crate::types::Model;

/// Command-line arguments for the coporties-chat tool.
///
/// Numeric values arrive as strings so a typo produces a [`ChatArgsError`]
/// naming the flag instead of a generic parse failure.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: gemini-3-flash-preview)", "MODEL")]
    pub model: Option<String>,

    /// System instruction for the conversation.
    #[arrrg(optional, "System instruction for the conversation", "PROMPT")]
    pub system: Option<String>,

    /// Sampling temperature.
    #[arrrg(optional, "Sampling temperature, 0.0 to 2.0 (default: 0.7)", "TEMP")]
    pub temperature: Option<String>,

    /// Top-k sampling limit.
    #[arrrg(optional, "Top-k sampling limit (default: 40)", "K")]
    pub top_k: Option<String>,

    /// Nucleus sampling threshold.
    #[arrrg(optional, "Top-p sampling threshold, 0.0 to 1.0 (default: 0.95)", "P")]
    pub top_p: Option<String>,

    /// YAML file with default settings.
    #[arrrg(optional, "YAML settings file; flags override its values", "FILE")]
    pub config: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Why arguments or a settings file could not be turned into a [`ChatConfig`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChatArgsError {
    /// A value that should be a number is not one.
    InvalidNumber {
        /// The flag or setting name.
        flag: &'static str,
        /// What was supplied.
        value: String,
    },
    /// A number outside its accepted range.
    OutOfRange {
        /// The flag or setting name.
        flag: &'static str,
        /// What was supplied.
        value: f32,
        /// Smallest accepted value.
        min: f32,
        /// Largest accepted value.
        max: f32,
    },
    /// The settings file could not be read or parsed.
    ConfigFile {
        /// Path of the file.
        path: String,
        /// What went wrong.
        message: String,
    },
}

impl fmt::Display for ChatArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatArgsError::InvalidNumber { flag, value } => {
                write!(f, "--{flag}: '{value}' is not a number")
            }
            ChatArgsError::OutOfRange {
                flag,
                value,
                min,
                max,
            } => write!(f, "--{flag}: {value} is outside {min}..={max}"),
            ChatArgsError::ConfigFile { path, message } => {
                write!(f, "config file {path}: {message}")
            }
        }
    }
}

impl std::error::Error for ChatArgsError {}

/// Settings accepted from a YAML file.
///
/// ```yaml
/// model: gemini-2.5-pro
/// system_instruction: Answer tersely.
/// temperature: 0.4
/// top_k: 32
/// top_p: 0.9
/// ```
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChatFileConfig {
    /// Model id.
    pub model: Option<String>,
    /// System instruction.
    pub system_instruction: Option<String>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Top-k sampling limit.
    pub top_k: Option<u32>,
    /// Nucleus sampling threshold.
    pub top_p: Option<f32>,
}

impl ChatFileConfig {
    /// Parses settings from YAML text.
    pub fn from_yaml_str(path: &str, yaml: &str) -> Result<Self, ChatArgsError> {
        serde_yaml::from_str(yaml).map_err(|e| ChatArgsError::ConfigFile {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Reads settings from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ChatArgsError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let yaml = std::fs::read_to_string(path).map_err(|e| ChatArgsError::ConfigFile {
            path: display.clone(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&display, &yaml)
    }
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments and the settings file with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// Optional system instruction.
    pub system_instruction: Option<String>,

    /// Sampling temperature.
    pub temperature: f32,

    /// Top-k sampling limit.
    pub top_k: u32,

    /// Top-p nucleus sampling value.
    pub top_p: f32,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: gemini-3-flash-preview
    /// - Temperature 0.7, top-k 40, top-p 0.95
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            system_instruction: None,
            temperature: DEFAULT_TEMPERATURE,
            top_k: DEFAULT_TOP_K,
            top_p: DEFAULT_TOP_P,
            use_color: true,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the system instruction.
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the top-k value.
    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = top_k;
        self
    }

    /// Sets the top-p value.
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// The generation settings for a new conversation.
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.temperature,
            top_k: self.top_k,
            top_p: self.top_p,
            system_instruction: self.system_instruction.clone(),
        }
    }

    /// Applies the values present in a settings file.
    pub fn apply_file(mut self, file: ChatFileConfig) -> Result<Self, ChatArgsError> {
        if let Some(model) = file.model {
            self.model = Model::from(model);
        }
        if let Some(instruction) = file.system_instruction {
            self.system_instruction = Some(instruction);
        }
        if let Some(temperature) = file.temperature {
            self.temperature = check_range("temperature", temperature, 0.0, 2.0)?;
        }
        if let Some(top_k) = file.top_k {
            self.top_k = top_k;
        }
        if let Some(top_p) = file.top_p {
            self.top_p = check_range("top_p", top_p, 0.0, 1.0)?;
        }
        Ok(self)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = ChatArgsError;

    fn try_from(args: ChatArgs) -> Result<Self, Self::Error> {
        let mut config = ChatConfig::new();
        if let Some(path) = &args.config {
            config = config.apply_file(ChatFileConfig::from_yaml_file(path)?)?;
        }

        if let Some(model) = args.model {
            config.model = Model::from(model);
        }
        if let Some(system) = args.system {
            config.system_instruction = Some(system);
        }
        if let Some(temperature) = args.temperature.as_deref() {
            config.temperature = parse_f32_in_range("temperature", temperature, 0.0, 2.0)?;
        }
        if let Some(top_k) = args.top_k.as_deref() {
            config.top_k = top_k
                .trim()
                .parse::<u32>()
                .map_err(|_| ChatArgsError::InvalidNumber {
                    flag: "top-k",
                    value: top_k.to_string(),
                })?;
        }
        if let Some(top_p) = args.top_p.as_deref() {
            config.top_p = parse_f32_in_range("top-p", top_p, 0.0, 1.0)?;
        }
        config.use_color = !args.no_color;
        Ok(config)
    }
}

fn parse_f32_in_range(
    flag: &'static str,
    value: &str,
    min: f32,
    max: f32,
) -> Result<f32, ChatArgsError> {
    let parsed = value
        .trim()
        .parse::<f32>()
        .map_err(|_| ChatArgsError::InvalidNumber {
            flag,
            value: value.to_string(),
        })?;
    check_range(flag, parsed, min, max)
}

fn check_range(flag: &'static str, value: f32, min: f32, max: f32) -> Result<f32, ChatArgsError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ChatArgsError::OutOfRange {
            flag,
            value,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.model, Model::Known(KnownModel::Gemini3FlashPreview));
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.top_k, 40);
        assert_eq!(config.top_p, 0.95);
        assert!(config.use_color);
        assert!(config.system_instruction.is_none());
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::try_from(ChatArgs::default()).unwrap();
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            model: Some("gemini-2.5-pro".to_string()),
            system: Some("You are helpful.".to_string()),
            temperature: Some("1.5".to_string()),
            top_k: Some("8".to_string()),
            top_p: Some("0.5".to_string()),
            config: None,
            no_color: true,
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(config.model, Model::Known(KnownModel::Gemini25Pro));
        assert_eq!(config.system_instruction.as_deref(), Some("You are helpful."));
        assert_eq!(config.temperature, 1.5);
        assert_eq!(config.top_k, 8);
        assert_eq!(config.top_p, 0.5);
        assert!(!config.use_color);
    }

    #[test]
    fn custom_model_ids_pass_through() {
        let args = ChatArgs {
            model: Some("gemini-experimental-0101".to_string()),
            ..ChatArgs::default()
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(
            config.model,
            Model::Custom("gemini-experimental-0101".to_string())
        );
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let args = ChatArgs {
            temperature: Some("warm".to_string()),
            ..ChatArgs::default()
        };
        assert!(matches!(
            ChatConfig::try_from(args),
            Err(ChatArgsError::InvalidNumber {
                flag: "temperature",
                ..
            })
        ));

        let args = ChatArgs {
            top_p: Some("1.5".to_string()),
            ..ChatArgs::default()
        };
        let err = ChatConfig::try_from(args).unwrap_err();
        assert!(matches!(err, ChatArgsError::OutOfRange { flag: "top-p", .. }));
        assert_eq!(err.to_string(), "--top-p: 1.5 is outside 0..=1");

        let args = ChatArgs {
            top_k: Some("-3".to_string()),
            ..ChatArgs::default()
        };
        assert!(ChatConfig::try_from(args).is_err());
    }

    #[test]
    fn yaml_settings() {
        let file = ChatFileConfig::from_yaml_str(
            "test.yaml",
            "model: gemini-2.5-flash\nsystem_instruction: Be terse.\ntemperature: 0.25\ntop_k: 16\n",
        )
        .unwrap();
        let config = ChatConfig::new().apply_file(file).unwrap();
        assert_eq!(config.model, Model::Known(KnownModel::Gemini25Flash));
        assert_eq!(config.system_instruction.as_deref(), Some("Be terse."));
        assert_eq!(config.temperature, 0.25);
        assert_eq!(config.top_k, 16);
        assert_eq!(config.top_p, 0.95);
    }

    #[test]
    fn yaml_settings_are_validated() {
        let file = ChatFileConfig::from_yaml_str("test.yaml", "temperature: 9.0\n").unwrap();
        assert!(ChatConfig::new().apply_file(file).is_err());
        assert!(ChatFileConfig::from_yaml_str("test.yaml", "max_tokens: 3\n").is_err());
    }

    #[test]
    fn flags_override_file() {
        let path = std::env::temp_dir().join(format!(
            "coporties-config-{}.yaml",
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&path, "temperature: 0.25\ntop_k: 16\n").unwrap();
        let args = ChatArgs {
            temperature: Some("1.0".to_string()),
            config: Some(path.display().to_string()),
            ..ChatArgs::default()
        };
        let config = ChatConfig::try_from(args).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.temperature, 1.0);
        assert_eq!(config.top_k, 16);
    }

    #[test]
    fn missing_config_file() {
        let args = ChatArgs {
            config: Some("/nonexistent/coporties.yaml".to_string()),
            ..ChatArgs::default()
        };
        assert!(matches!(
            ChatConfig::try_from(args),
            Err(ChatArgsError::ConfigFile { .. })
        ));
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_model(Model::Known(KnownModel::Gemini25Flash))
            .with_system_instruction("Test prompt")
            .with_temperature(0.5)
            .with_top_k(10)
            .with_top_p(0.75)
            .without_color();
        let generation = config.generation_config();
        assert_eq!(generation.temperature, 0.5);
        assert_eq!(generation.top_k, 10);
        assert_eq!(generation.top_p, 0.75);
        assert_eq!(generation.system_instruction.as_deref(), Some("Test prompt"));
        assert!(!config.use_color);
    }
}

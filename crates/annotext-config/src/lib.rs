//! Settings snapshot consumed by the annotation engine.
//!
//! A [`Settings`] value is immutable once handed to a builder or fragmentizer;
//! embedded directives derive new snapshots with [`Settings::with_language`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_LANGUAGE: &str = "en-US";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// What the LaTeX builder does with a command matching a prototype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandAction {
    /// Process the command like any unknown command.
    Default,
    /// Swallow the command and its arguments as markup.
    Ignore,
    /// Replace the command and its arguments with a placeholder word.
    Dummy,
    /// Like `Dummy`, with a placeholder that reads as a plural noun.
    PluralDummy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnvironmentAction {
    Default,
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LatexSettings {
    /// Command prototype (`\foo{}[]`) to action.
    pub commands: BTreeMap<String, CommandAction>,
    /// Environment name or `\begin{name}{}` prototype to action.
    pub environments: BTreeMap<String, EnvironmentAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownSettings {
    /// Node types replaced by a single placeholder word.
    pub dummy: Vec<String>,
    /// Node types whose text is never checked.
    pub ignore: Vec<String>,
}

impl Default for MarkdownSettings {
    fn default() -> Self {
        Self {
            dummy: ["AutoLink", "Code", "InlineMath", "DisplayMath"]
                .map(String::from)
                .to_vec(),
            ignore: ["CodeBlock", "FencedCodeBlock", "IndentedCodeBlock"]
                .map(String::from)
                .to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Natural language of the document, e.g. `en-US` or `de-DE`.
    pub language: String,
    pub latex: LatexSettings,
    pub markdown: MarkdownSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            latex: LatexSettings::default(),
            markdown: MarkdownSettings::default(),
        }
    }
}

impl Settings {
    /// Returns a copy with the natural language replaced.
    #[must_use]
    pub fn with_language(&self, language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..self.clone()
        }
    }

    /// Command prototypes the user configured as `ignore`.
    pub fn ignored_command_prototypes(&self) -> impl Iterator<Item = &str> {
        self.latex
            .commands
            .iter()
            .filter(|(_, action)| **action == CommandAction::Ignore)
            .map(|(prototype, _)| prototype.as_str())
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let settings: Settings =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        Ok(Some(settings))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/annotext");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Expands `~` and environment variables in a user supplied path.
    pub fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Settings::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/annotext/config.toml"));
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();

        assert_eq!(settings.language, "en-US");
        assert!(settings.latex.commands.is_empty());
        assert!(settings.markdown.dummy.contains(&"Code".to_string()));
        assert!(settings.markdown.ignore.contains(&"CodeBlock".to_string()));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(r#"language = "de-DE""#).unwrap();

        assert_eq!(settings.language, "de-DE");
        assert_eq!(settings.markdown, MarkdownSettings::default());
    }

    #[test]
    fn test_command_actions_from_toml() {
        let content = r#"
[latex.commands]
'\mycite{}' = "dummy"
'\todo{}' = "ignore"
'\items{}' = "pluralDummy"

[latex.environments]
lstlisting = "ignore"
"#;
        let settings: Settings = toml::from_str(content).unwrap();

        assert_eq!(
            settings.latex.commands.get(r"\mycite{}"),
            Some(&CommandAction::Dummy)
        );
        assert_eq!(
            settings.latex.commands.get(r"\items{}"),
            Some(&CommandAction::PluralDummy)
        );
        assert_eq!(
            settings.latex.environments.get("lstlisting"),
            Some(&EnvironmentAction::Ignore)
        );
        assert_eq!(
            settings.ignored_command_prototypes().collect::<Vec<_>>(),
            vec![r"\todo{}"]
        );
    }

    #[test]
    fn test_unknown_action_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "[latex.commands]\n'\\foo{}' = \"explode\"\n").unwrap();

        let result = Settings::load_from_path(&config_file);

        assert!(matches!(result, Err(ConfigError::ConfigParseError { .. })));
    }

    #[test]
    fn test_with_language_keeps_everything_else() {
        let mut settings = Settings::default();
        settings
            .latex
            .commands
            .insert(r"\foo{}".to_string(), CommandAction::Ignore);

        let german = settings.with_language("de-DE");

        assert_eq!(german.language, "de-DE");
        assert_eq!(german.latex, settings.latex);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Settings::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let mut settings = Settings::default().with_language("fr");
        settings
            .latex
            .environments
            .insert("comment".to_string(), EnvironmentAction::Ignore);

        settings.save_to_path(&config_file).unwrap();
        let loaded = Settings::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("ANNOTEXT_TEST_DIR", "/test/env/path");
        }

        let expanded = Settings::expand_path(Path::new("$ANNOTEXT_TEST_DIR/config.toml"));

        assert_eq!(expanded, Some(PathBuf::from("/test/env/path/config.toml")));

        unsafe {
            env::remove_var("ANNOTEXT_TEST_DIR");
        }
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = Settings::expand_path(Path::new("~/annotext.toml")).unwrap();

        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().ends_with("annotext.toml"));
    }
}

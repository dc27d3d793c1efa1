use annotext_config::Settings;
use annotext_engine::{AnnotatedDocument, AnnotatedTextFragment};
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::{env, process};

const USAGE: &str =
    "Usage: annotext [--language-id ID] [--config PATH] [--language CODE] [--save-config PATH] [--parts] FILE";

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    file: PathBuf,
    code_language_id: Option<String>,
    config: Option<PathBuf>,
    language: Option<String>,
    save_config: Option<PathBuf>,
    parts: bool,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut parsed = Args::default();
        let mut file = None;
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--language-id" => parsed.code_language_id = Some(value(&mut args, &arg)?),
                "--config" => parsed.config = Some(PathBuf::from(value(&mut args, &arg)?)),
                "--language" => parsed.language = Some(value(&mut args, &arg)?),
                "--save-config" => {
                    parsed.save_config = Some(PathBuf::from(value(&mut args, &arg)?))
                }
                "--parts" => parsed.parts = true,
                flag if flag.starts_with("--") => bail!("Unknown option {flag}"),
                _ if file.is_some() => bail!("Only one file can be given"),
                _ => file = Some(PathBuf::from(&arg)),
            }
        }

        parsed.file = file.context("No file given")?;
        Ok(parsed)
    }

    fn code_language_id(&self) -> String {
        self.code_language_id
            .clone()
            .unwrap_or_else(|| code_language_id_for(&self.file).to_string())
    }

    fn settings(&self) -> Result<Settings> {
        let loaded = match &self.config {
            Some(path) => {
                let path = Settings::expand_path(path).unwrap_or_else(|| path.clone());
                let settings = Settings::load_from_path(&path)?;
                if settings.is_none() {
                    bail!("Config file '{}' does not exist", path.display());
                }
                settings
            }
            None => Settings::load()?,
        };

        let settings = loaded.unwrap_or_default();
        Ok(match &self.language {
            Some(language) => settings.with_language(language.as_str()),
            None => settings,
        })
    }
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .with_context(|| format!("Option {flag} needs a value"))
}

/// Guesses the code language id from a file extension.
fn code_language_id_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("tex" | "latex" | "sty" | "cls") => "latex",
        Some("rnw" | "snw") => "rsweave",
        Some("md" | "markdown") => "markdown",
        Some("rst") => "restructuredtext",
        Some("html" | "htm" | "xhtml") => "html",
        Some("rs") => "rust",
        Some("py") => "python",
        Some("c" | "h") => "c",
        Some("cpp" | "cc" | "hpp") => "cpp",
        Some("java") => "java",
        Some("js" | "mjs") => "javascript",
        Some("ts") => "typescript",
        Some("go") => "go",
        Some("rb") => "ruby",
        Some("sh" | "bash") => "shellscript",
        Some("lua") => "lua",
        Some("sql") => "sql",
        Some("r") => "r",
        _ => "plaintext",
    }
}

fn print_fragment(fragment: &AnnotatedTextFragment, parts: bool) {
    let code_fragment = &fragment.fragment;
    println!(
        "=== {} ({}) at {} ===",
        code_fragment.code_language_id, code_fragment.settings.language, code_fragment.from_pos
    );
    if parts {
        print!("{}", fragment.annotated_text);
    } else {
        println!("{}", fragment.plain_text());
    }
}

fn run(args: &Args) -> Result<()> {
    let settings = args.settings()?;
    if let Some(path) = &args.save_config {
        let path = Settings::expand_path(path).unwrap_or_else(|| path.clone());
        settings
            .save_to_path(&path)
            .with_context(|| format!("Failed to save settings to '{}'", path.display()))?;
        log::info!("Saved settings to {}", path.display());
    }
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read '{}'", args.file.display()))?;

    let code_language_id = args.code_language_id();
    log::debug!("Annotating {} as {code_language_id}", args.file.display());

    let document = AnnotatedDocument::new(&text, &code_language_id, &settings);
    for fragment in document.fragments() {
        print_fragment(fragment, args.parts);
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = match Args::parse(env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("{USAGE}");
            process::exit(1);
        }
    };

    run(&args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Result<Args> {
        Args::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_all_options() {
        let args = parse(&[
            "--language-id",
            "markdown",
            "--language",
            "de-DE",
            "--parts",
            "--config",
            "/tmp/c.toml",
            "notes.txt",
        ])
        .unwrap();

        assert_eq!(
            args,
            Args {
                file: PathBuf::from("notes.txt"),
                code_language_id: Some("markdown".to_string()),
                config: Some(PathBuf::from("/tmp/c.toml")),
                language: Some("de-DE".to_string()),
                save_config: None,
                parts: true,
            }
        );
        assert_eq!(args.code_language_id(), "markdown");
    }

    #[rstest]
    #[case(&[])]
    #[case(&["--language"])]
    #[case(&["a.tex", "--save-config"])]
    #[case(&["--verbose", "a.tex"])]
    #[case(&["a.tex", "b.tex"])]
    fn rejects_bad_arguments(#[case] args: &[&str]) {
        assert!(parse(args).is_err());
    }

    #[rstest]
    #[case("paper.tex", "latex")]
    #[case("analysis.Rnw", "rsweave")]
    #[case("README.md", "markdown")]
    #[case("index.rst", "restructuredtext")]
    #[case("page.HTM", "html")]
    #[case("main.rs", "rust")]
    #[case("build.sh", "shellscript")]
    #[case("model.R", "r")]
    #[case("notes.txt", "plaintext")]
    #[case("Makefile", "plaintext")]
    fn language_id_from_extension(#[case] file: &str, #[case] expected: &str) {
        assert_eq!(code_language_id_for(Path::new(file)), expected);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let args = parse(&["--config", "/nonexistent/annotext.toml", "a.md"]).unwrap();
        assert!(args.settings().is_err());
    }

    #[test]
    fn save_config_writes_effective_settings() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("notes.md");
        std::fs::write(&file, "Some *text*.\n").unwrap();
        let saved = dir.path().join("nested").join("annotext.toml");

        let args = Args {
            file,
            language: Some("fr".to_string()),
            save_config: Some(saved.clone()),
            ..Args::default()
        };
        run(&args).unwrap();

        let settings = Settings::load_from_path(&saved).unwrap().unwrap();
        assert_eq!(settings.language, "fr");

        let reloaded = parse(&["--config", saved.to_str().unwrap(), "a.md"])
            .unwrap()
            .settings()
            .unwrap();
        assert_eq!(reloaded, settings);
    }
}

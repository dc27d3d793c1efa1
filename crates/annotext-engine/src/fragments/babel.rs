//! Babel language names and the language codes they stand for.

/// Babel language name to language code.
pub const BABEL_LANGUAGES: &[(&str, &str)] = &[
    ("acadian", "fr"),
    ("american", "en-US"),
    ("arabic", "ar"),
    ("asturian", "ast-ES"),
    ("australian", "en-AU"),
    ("austrian", "de-AT"),
    ("belarusian", "be-BY"),
    ("brazil", "pt-BR"),
    ("brazilian", "pt-BR"),
    ("breton", "br-FR"),
    ("british", "en-GB"),
    ("canadian", "en-CA"),
    ("canadien", "fr"),
    ("catalan", "ca-ES"),
    ("chinese", "zh-CN"),
    ("danish", "da-DK"),
    ("dutch", "nl"),
    ("english", "en-US"),
    ("esperanto", "eo"),
    ("francais", "fr"),
    ("french", "fr"),
    ("galician", "gl-ES"),
    ("german", "de-DE"),
    ("greek", "el-GR"),
    ("irish", "ga-IE"),
    ("italian", "it"),
    ("japanese", "ja-JP"),
    ("khmer", "km-KH"),
    ("naustrian", "de-AT"),
    ("newzealand", "en-NZ"),
    ("ngerman", "de-DE"),
    ("nswissgerman", "de-CH"),
    ("persian", "fa"),
    ("polish", "pl-PL"),
    ("portuges", "pt-PT"),
    ("portuguese", "pt-PT"),
    ("romanian", "ro-RO"),
    ("russian", "ru-RU"),
    ("slovak", "sk-SK"),
    ("slovenian", "sl-SI"),
    ("spanish", "es"),
    ("swedish", "sv"),
    ("swissgerman", "de-CH"),
    ("tagalog", "tl-PH"),
    ("ukenglish", "en-GB"),
    ("ukrainian", "uk-UA"),
    ("usenglish", "en-US"),
];

/// Region-qualified codes without a babel name of their own.
const EXTRA_CODES: &[&str] = &["en-ZA", "de-DE-x-simple-language", "pt-AO", "pt-MZ"];

/// Every known language code, in table order and without duplicates.
pub fn language_codes() -> Vec<&'static str> {
    let mut codes: Vec<&str> = Vec::new();
    for code in BABEL_LANGUAGES
        .iter()
        .map(|&(_, code)| code)
        .chain(EXTRA_CODES.iter().copied())
    {
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    codes
}

/// `en-US` becomes `enUS`, the form used in `\textenUS{...}`.
pub fn hyphenless(code: &str) -> String {
    code.replace('-', "")
}

/// Resolves a babel name, a hyphen-less code or a code. Anything else is
/// returned unchanged.
pub fn to_language_code(name: &str) -> String {
    let name = name.trim();
    let lowercase = name.to_ascii_lowercase();

    if let Some((_, code)) = BABEL_LANGUAGES.iter().find(|(babel, _)| *babel == lowercase) {
        return (*code).to_string();
    }
    if let Some(code) = language_codes()
        .into_iter()
        .find(|code| code.contains('-') && hyphenless(code) == name)
    {
        return code.to_string();
    }
    name.to_string()
}

/// Names usable as `\begin{<name>}` language environments.
pub fn environment_names() -> Vec<String> {
    BABEL_LANGUAGES
        .iter()
        .map(|&(babel, _)| babel.to_string())
        .chain(language_codes().into_iter().map(str::to_string))
        .collect()
}

/// Suffixes usable as `\text<suffix>{...}` inline commands. Bare codes
/// such as `it` are left out so `\textit` keeps its usual meaning.
pub fn text_command_suffixes() -> Vec<String> {
    BABEL_LANGUAGES
        .iter()
        .map(|&(babel, _)| babel.to_string())
        .chain(
            language_codes()
                .into_iter()
                .filter(|code| code.contains('-'))
                .map(hyphenless),
        )
        .collect()
}

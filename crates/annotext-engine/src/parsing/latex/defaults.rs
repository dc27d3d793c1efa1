//! Base signature tables. Settings entries are layered on top of these.

use annotext_config::{CommandAction, EnvironmentAction, Settings};

use super::signature::{
    CommandSignature, EnvironmentSignature, SignatureAction, SignatureCatalog,
};
use crate::dummy::DummyGenerator;
use crate::fragments::babel::{environment_names, text_command_suffixes};

use SignatureAction::{Dummy, Ignore};

pub const DEFAULT_COMMANDS: &[(&str, SignatureAction)] = &[
    (r"\addbibresource{}", Ignore),
    (r"\addbibresource[]{}", Ignore),
    (r"\addcontentsline{}{}{}", Ignore),
    (r"\addtocontents{}{}", Ignore),
    (r"\addtocounter{}{}", Ignore),
    (r"\addtolength{}{}", Ignore),
    (r"\autocite{}", Dummy),
    (r"\autocite[]{}", Dummy),
    (r"\autocite[][]{}", Dummy),
    (r"\autoref{}", Dummy),
    (r"\bibitem{}", Ignore),
    (r"\bibitem[]{}", Ignore),
    (r"\bibliography{}", Ignore),
    (r"\bibliographystyle{}", Ignore),
    (r"\captionsetup{}", Ignore),
    (r"\captionsetup[]{}", Ignore),
    (r"\cite{}", Dummy),
    (r"\cite[]{}", Dummy),
    (r"\cite[][]{}", Dummy),
    (r"\citealp{}", Dummy),
    (r"\citealp[]{}", Dummy),
    (r"\citealt{}", Dummy),
    (r"\citeauthor{}", Dummy),
    (r"\citep{}", Dummy),
    (r"\citep[]{}", Dummy),
    (r"\citep[][]{}", Dummy),
    (r"\citet{}", Dummy),
    (r"\citet[]{}", Dummy),
    (r"\citeyear{}", Dummy),
    (r"\cref{}", Dummy),
    (r"\Cref{}", Dummy),
    (r"\crefrange{}{}", Dummy),
    (r"\DeclareMathOperator{}{}", Ignore),
    (r"\DeclareMathOperator*{}{}", Ignore),
    (r"\definecolor{}{}{}", Ignore),
    (r"\documentclass{}", Ignore),
    (r"\documentclass[]{}", Ignore),
    (r"\eqref{}", Dummy),
    (r"\fcolorbox{}{}", Ignore),
    (r"\footcite{}", Dummy),
    (r"\footcite[]{}", Dummy),
    (r"\footnote{}", Ignore),
    (r"\footnote[]{}", Ignore),
    (r"\footnotetext{}", Ignore),
    (r"\footnotetext[]{}", Ignore),
    (r"\geometry{}", Ignore),
    (r"\hyperref[]", Ignore),
    (r"\hypersetup{}", Ignore),
    (r"\href{}", Ignore),
    (r"\hspace{}", Ignore),
    (r"\hspace*{}", Ignore),
    (r"\include{}", Ignore),
    (r"\includegraphics{}", Dummy),
    (r"\includegraphics[]{}", Dummy),
    (r"\includeonly{}", Ignore),
    (r"\input{}", Ignore),
    (r"\label{}", Ignore),
    (r"\lstinputlisting{}", Ignore),
    (r"\lstinputlisting[]{}", Ignore),
    (r"\lstset{}", Ignore),
    (r"\nameref{}", Dummy),
    (r"\newcommand{}{}", Ignore),
    (r"\newcommand{}[]{}", Ignore),
    (r"\newcommand{}[][]{}", Ignore),
    (r"\newcommand*{}{}", Ignore),
    (r"\newcommand*{}[]{}", Ignore),
    (r"\newcommand*{}[][]{}", Ignore),
    (r"\newcounter{}", Ignore),
    (r"\newenvironment{}{}{}", Ignore),
    (r"\newenvironment{}[]{}{}", Ignore),
    (r"\newgeometry{}", Ignore),
    (r"\newlength{}", Ignore),
    (r"\newtheorem{}{}", Ignore),
    (r"\newtheorem{}[]{}", Ignore),
    (r"\newtheorem{}{}[]", Ignore),
    (r"\nocite{}", Ignore),
    (r"\pageref{}", Dummy),
    (r"\parencite{}", Dummy),
    (r"\parencite[]{}", Dummy),
    (r"\parencite[][]{}", Dummy),
    (r"\printbibliography[]", Ignore),
    (r"\providecommand{}{}", Ignore),
    (r"\providecommand{}[]{}", Ignore),
    (r"\raisebox{}", Ignore),
    (r"\ref{}", Dummy),
    (r"\ref*{}", Dummy),
    (r"\renewcommand{}{}", Ignore),
    (r"\renewcommand{}[]{}", Ignore),
    (r"\renewcommand{}[][]{}", Ignore),
    (r"\renewcommand*{}{}", Ignore),
    (r"\renewcommand*{}[]{}", Ignore),
    (r"\renewenvironment{}{}{}", Ignore),
    (r"\renewenvironment{}[]{}{}", Ignore),
    (r"\RequirePackage{}", Ignore),
    (r"\RequirePackage[]{}", Ignore),
    (r"\scalebox{}", Ignore),
    (r"\setcounter{}{}", Ignore),
    (r"\setlength{}{}", Ignore),
    (r"\SweaveOpts{}", Ignore),
    (r"\textcite{}", Dummy),
    (r"\textcite[]{}", Dummy),
    (r"\textcolor{}", Ignore),
    (r"\thispagestyle{}", Ignore),
    (r"\pagestyle{}", Ignore),
    (r"\tikzset{}", Ignore),
    (r"\todo{}", Ignore),
    (r"\todo[]{}", Ignore),
    (r"\url{}", Dummy),
    (r"\usepackage{}", Ignore),
    (r"\usepackage[]{}", Ignore),
    (r"\usetikzlibrary{}", Ignore),
    (r"\vref{}", Dummy),
    (r"\vspace{}", Ignore),
    (r"\vspace*{}", Ignore),
];

pub const DEFAULT_IGNORED_ENVIRONMENTS: &[&str] = &[
    "comment",
    "filecontents",
    "filecontents*",
    "lstlisting",
    "markdown",
    "minted",
    "tikzpicture",
    "verbatim",
    "verbatim*",
    "Verbatim",
];

/// Babel inline switches: `\foreignlanguage` and `\text<language>`.
/// Their text is checked in its own fragment, so the surrounding
/// fragment treats them as markup.
pub fn babel_command_prototypes() -> Vec<String> {
    [r"\foreignlanguage{}{}", r"\foreignlanguage[]{}{}"]
        .into_iter()
        .map(str::to_string)
        .chain(
            text_command_suffixes()
                .into_iter()
                .map(|suffix| format!(r"\text{suffix}{{}}")),
        )
        .collect()
}

/// Babel language environments, extracted like the inline switches.
pub fn babel_environment_prototypes() -> Vec<String> {
    [r"\begin{otherlanguage}{}", r"\begin{otherlanguage*}{}"]
        .into_iter()
        .map(str::to_string)
        .chain(environment_names())
        .collect()
}

fn command_action(action: CommandAction) -> (SignatureAction, DummyGenerator) {
    match action {
        CommandAction::Default => (SignatureAction::Default, DummyGenerator::new()),
        CommandAction::Ignore => (SignatureAction::Ignore, DummyGenerator::new()),
        CommandAction::Dummy => (SignatureAction::Dummy, DummyGenerator::new()),
        CommandAction::PluralDummy => (SignatureAction::Dummy, DummyGenerator::plural()),
    }
}

/// Base command table followed by the settings overrides. Invalid
/// prototypes are logged and skipped.
pub fn command_catalog(settings: &Settings) -> SignatureCatalog<CommandSignature> {
    let babel = babel_command_prototypes();
    let base = DEFAULT_COMMANDS
        .iter()
        .copied()
        .chain(babel.iter().map(|prototype| (prototype.as_str(), Ignore)))
        .map(|(prototype, action)| (prototype, action, DummyGenerator::new()));
    let overrides = settings.latex.commands.iter().map(|(prototype, action)| {
        let (action, generator) = command_action(*action);
        (prototype.as_str(), action, generator)
    });

    base.chain(overrides)
        .filter_map(|(prototype, action, generator)| {
            CommandSignature::with_generator(prototype, action, generator)
                .map_err(|err| log::warn!("{err}"))
                .ok()
        })
        .collect()
}

pub fn environment_catalog(settings: &Settings) -> SignatureCatalog<EnvironmentSignature> {
    let babel = babel_environment_prototypes();
    let base = DEFAULT_IGNORED_ENVIRONMENTS
        .iter()
        .copied()
        .chain(babel.iter().map(String::as_str))
        .map(|prototype| (prototype, Ignore));
    let overrides = settings.latex.environments.iter().map(|(prototype, action)| {
        let action = match action {
            EnvironmentAction::Default => SignatureAction::Default,
            EnvironmentAction::Ignore => SignatureAction::Ignore,
        };
        (prototype.as_str(), action)
    });

    base.chain(overrides)
        .filter_map(|(prototype, action)| {
            EnvironmentSignature::parse(prototype, action)
                .map_err(|err| log::warn!("{err}"))
                .ok()
        })
        .collect()
}

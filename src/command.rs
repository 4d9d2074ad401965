// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Stow command construction.
//!
//! Every stow command that cstow runs is built from a __command template__.
//! A command template is a free-form shell command line that contains named
//! placeholders. Cstow substitutes each placeholder with a shell-quoted value
//! for every pair of target directory and stow directory in the user's
//! configuration.
//!
//! # Placeholder Syntax
//!
//! Placeholders are written as `$name` or `${name}`. A literal dollar sign is
//! written as `$$`. Any other use of `$` is a syntax error.
//!
//! A command template must reference exactly three placeholders:
//!
//! - `action`: the GNU Stow action, e.g., `stow`, `restow`, `delete`.
//! - `target`: the target directory that symlinks get placed into.
//! - `dir`: the stow directory that symlinks point back into.
//!
//! Referencing fewer or more placeholders than this makes the template invalid.
//!
//! # See Also
//!
//! - [GNU Stow manual](https://www.gnu.org/software/stow/manual/stow.html)

use regex::Regex;
use std::{
    borrow::Cow,
    collections::BTreeSet,
    fmt::{Display, Formatter, Result as FmtResult},
    path::Path,
    str::FromStr,
    sync::LazyLock,
};
use tracing::{debug, instrument};

/// Default command template.
///
/// Runs GNU Stow without folding, and filters out the noisy "BUG" and "WARN"
/// lines that stow prints in verbose mode.
pub const DEFAULT_COMMAND_TEMPLATE: &str = concat!(
    "stow --${action} --no-folding --verbose --target=${target} --dir=${dir} . ",
    r#"2>&1 | grep --invert-match --regexp="^BUG" --regexp="^WARN""#,
);

static PLACEHOLDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\$(?:(?P<escaped>\$)|(?P<named>[_A-Za-z][_A-Za-z0-9]*)|\{(?P<braced>[_A-Za-z][_A-Za-z0-9]*)\}|(?P<invalid>))",
    )
    .unwrap()
});

/// GNU Stow action to perform.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Action {
    /// Dry run. Stow reports what it would do without touching anything.
    #[default]
    No,

    /// Create symlinks.
    Stow,

    /// Remove symlinks, then create them again.
    Restow,

    /// Remove symlinks.
    Delete,
}

impl Action {
    /// All actions in the order they are presented to the user.
    pub const ALL: [Action; 4] = [Self::No, Self::Stow, Self::Restow, Self::Delete];

    /// Name of action as GNU Stow expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::No => "no",
            Self::Stow => "stow",
            Self::Restow => "restow",
            Self::Delete => "delete",
        }
    }

    /// Banner text for action.
    pub fn title(&self) -> String {
        match self {
            Self::No => "DRY RUN".into(),
            action => action.as_str().to_uppercase(),
        }
    }

    /// Check if action is a dry run.
    pub fn is_dry_run(&self) -> bool {
        matches!(self, Self::No)
    }
}

impl FromStr for Action {
    type Err = InvalidActionError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        match data {
            "no" => Ok(Self::No),
            "stow" => Ok(Self::Stow),
            "restow" => Ok(Self::Restow),
            "delete" => Ok(Self::Delete),
            _ => Err(InvalidActionError {
                action: data.into(),
            }),
        }
    }
}

impl Display for Action {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

/// Action name does not match any known [`Action`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Action '{action}' is invalid\nUse one of these: {}", list_names(Action::ALL.iter().map(Action::as_str)))]
pub struct InvalidActionError {
    /// Offending action name.
    pub action: String,
}

/// Substitution variable of a command template.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub enum Placeholder {
    /// The GNU Stow action.
    Action,

    /// The target directory.
    Target,

    /// The stow directory.
    Dir,
}

impl Placeholder {
    /// Every placeholder a command template must reference.
    pub const ALL: [Placeholder; 3] = [Self::Action, Self::Target, Self::Dir];

    /// Identifier of placeholder inside of a command template.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Target => "target",
            Self::Dir => "dir",
        }
    }

    /// Lookup placeholder by its identifier.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "action" => Some(Self::Action),
            "target" => Some(Self::Target),
            "dir" => Some(Self::Dir),
            _ => None,
        }
    }
}

impl Display for Placeholder {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.name())
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

/// Validated command template.
///
/// # Invariants
///
/// - Placeholder syntax is valid.
/// - Set of referenced placeholders is exactly [`Placeholder::ALL`].
///
/// Thus, rendering a command template can never fail.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CommandTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl CommandTemplate {
    /// Render stow command for target directory and stow directory.
    ///
    /// Each value is shell-quoted, so it always lands in the command line as
    /// a single shell token.
    #[instrument(skip(self), level = "debug")]
    pub fn render(&self, action: Action, target: &Path, dir: &Path) -> String {
        let mut command = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => command.push_str(text),
                Segment::Placeholder(Placeholder::Action) => {
                    command.push_str(&quote(action.as_str()))
                }
                Segment::Placeholder(Placeholder::Target) => {
                    command.push_str(&quote(&target.to_string_lossy()))
                }
                Segment::Placeholder(Placeholder::Dir) => {
                    command.push_str(&quote(&dir.to_string_lossy()))
                }
            }
        }
        debug!("rendered command: {command}");

        command
    }

    /// Raw template text as the user wrote it.
    pub fn as_str(&self) -> &str {
        self.raw.as_str()
    }
}

impl FromStr for CommandTemplate {
    type Err = TemplateError;

    fn from_str(raw: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut identifiers = BTreeSet::new();
        let mut literal = String::new();
        let mut last = 0;

        for captures in PLACEHOLDER_PATTERN.captures_iter(raw) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            literal.push_str(&raw[last..whole.start()]);
            last = whole.end();

            if captures.name("escaped").is_some() {
                literal.push('$');
                continue;
            }

            if captures.name("invalid").is_some() {
                return Err(TemplateError::Syntax {
                    offset: whole.start(),
                });
            }

            let name = captures
                .name("named")
                .or_else(|| captures.name("braced"))
                .map(|name| name.as_str())
                .unwrap_or_default();
            identifiers.insert(name.to_string());

            // INVARIANT: Unknown identifiers never become segments, they get
            // reported as unexpected below.
            if let Some(placeholder) = Placeholder::from_name(name) {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(placeholder));
            }
        }

        literal.push_str(&raw[last..]);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        let missing = Placeholder::ALL
            .iter()
            .filter(|placeholder| !identifiers.contains(placeholder.name()))
            .copied()
            .collect::<Vec<_>>();
        let unexpected = identifiers
            .into_iter()
            .filter(|name| Placeholder::from_name(name).is_none())
            .collect::<Vec<_>>();
        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(TemplateError::PlaceholderMismatch {
                missing,
                unexpected,
            });
        }

        Ok(Self {
            raw: raw.into(),
            segments,
        })
    }
}

impl Display for CommandTemplate {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

/// Quote string so a POSIX shell reads it back as one token.
///
/// Strings made up of only safe characters are left alone. A string holding
/// a NUL byte cannot be quoted, and is passed through as is. Such a command
/// can never be launched, so it never reaches a shell.
pub fn quote(value: &str) -> String {
    shlex::try_quote(value)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| value.into())
}

fn list_names<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names.into_iter().collect::<Vec<_>>().join(", ")
}

fn mismatch_message(missing: &[Placeholder], unexpected: &[String]) -> String {
    let mut message = format!(
        "'command_template' must contain all of these placeholders and no others: {}",
        list_names(Placeholder::ALL.iter().map(Placeholder::name))
    );

    if !missing.is_empty() {
        message.push_str(&format!(
            "\nmissing: {}",
            list_names(missing.iter().map(Placeholder::name))
        ));
    }

    if !unexpected.is_empty() {
        message.push_str(&format!(
            "\nunexpected: {}",
            list_names(unexpected.iter().map(String::as_str))
        ));
    }

    message
}

/// Command template validation error types.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// Stray `$` that does not start a placeholder.
    #[error("invalid placeholder syntax in 'command_template' at byte {offset}")]
    Syntax { offset: usize },

    /// Referenced placeholders do not match [`Placeholder::ALL`].
    #[error("{}", mismatch_message(missing, unexpected))]
    PlaceholderMismatch {
        missing: Vec<Placeholder>,
        unexpected: Vec<String>,
    },
}

/// Friendly result alias :3
type Result<T, E = TemplateError> = std::result::Result<T, E>;

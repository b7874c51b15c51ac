//! Variable substitution for step fields.
//!
//! A template is plain text with `{{Name}}` references. Whitespace inside the
//! braces and a leading dot (`{{ .Name }}`) are accepted. A stray `}}` is
//! literal text; an unclosed `{{` is a syntax error. Text without markers
//! renders unchanged.

use std::fmt;

/// Names a template may reference.
pub const VARIABLES: [&str; 9] = [
    "Name",
    "URL",
    "KeyURL",
    "Arch",
    "Channel",
    "Component",
    "SourcesPath",
    "KeyPath",
    "TempKeyPath",
];

/// Errors raised while parsing or rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// The template is malformed.
    #[error("template syntax error at byte {position} in '{template}': {message}")]
    Syntax {
        /// Offending template text.
        template: String,
        /// Byte offset of the problem.
        position: usize,
        /// What went wrong.
        message: String,
    },

    /// A reference names no known variable.
    #[error("unknown template variable '{name}' in '{template}'")]
    UnknownVariable {
        /// Offending template text.
        template: String,
        /// The referenced name.
        name: String,
    },

    /// A reference names a known variable that has no value in this context.
    #[error("template variable '{name}' is not set (in '{template}')")]
    Unset {
        /// Offending template text.
        template: String,
        /// The referenced name.
        name: String,
    },
}

/// One parsed piece of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text copied through as-is.
    Literal(&'a str),
    /// A variable reference.
    Variable(&'a str),
}

/// Split a template into literal text and variable references.
pub fn parse(template: &str) -> Result<Vec<Segment<'_>>, TemplateError> {
    let mut segments = Vec::new();
    let mut rest = template;
    let mut offset = 0;

    while let Some(open) = rest.find("{{") {
        if open > 0 {
            segments.push(Segment::Literal(&rest[..open]));
        }
        let after = &rest[open + 2..];
        let syntax = |message: &str| TemplateError::Syntax {
            template: template.to_string(),
            position: offset + open,
            message: message.to_string(),
        };

        let Some(close) = after.find("}}") else {
            return Err(syntax("unclosed '{{'"));
        };
        let inner = after[..close].trim();
        let name = inner.strip_prefix('.').unwrap_or(inner);
        if !is_identifier(name) {
            return Err(syntax(&format!("invalid reference '{inner}'")));
        }
        segments.push(Segment::Variable(name));

        let consumed = open + 2 + close + 2;
        offset += consumed;
        rest = &rest[consumed..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }
    Ok(segments)
}

/// Check a template for syntax errors and unknown names without rendering it.
pub fn check(template: &str) -> Result<(), TemplateError> {
    for segment in parse(template)? {
        if let Segment::Variable(name) = segment
            && !VARIABLES.contains(&name)
        {
            return Err(TemplateError::UnknownVariable {
                template: template.to_string(),
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

/// Whether the text contains any template marker.
#[must_use]
pub fn has_markers(text: &str) -> bool {
    text.contains("{{")
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Substitution values for one high-level operation.
///
/// Built once and shared by every step of the operation; there are no
/// setters once construction is done.
///
/// ```
/// use actions::TemplateContext;
///
/// let ctx = TemplateContext::builder()
///     .name("docker")
///     .arch("amd64")
///     .build();
///
/// assert_eq!(
///     ctx.render("/etc/apt/sources.list.d/{{Name}}.list").unwrap(),
///     "/etc/apt/sources.list.d/docker.list"
/// );
/// assert!(ctx.render("{{ .KeyURL }}").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContext {
    name: Option<String>,
    url: Option<String>,
    key_url: Option<String>,
    arch: Option<String>,
    channel: Option<String>,
    component: Option<String>,
    sources_path: Option<String>,
    key_path: Option<String>,
    temp_key_path: Option<String>,
}

impl TemplateContext {
    /// Start building a context.
    #[must_use]
    pub fn builder() -> TemplateContextBuilder {
        TemplateContextBuilder::default()
    }

    /// Value of a variable, if set.
    #[must_use]
    pub fn get(&self, variable: &str) -> Option<&str> {
        match variable {
            "Name" => self.name.as_deref(),
            "URL" => self.url.as_deref(),
            "KeyURL" => self.key_url.as_deref(),
            "Arch" => self.arch.as_deref(),
            "Channel" => self.channel.as_deref(),
            "Component" => self.component.as_deref(),
            "SourcesPath" => self.sources_path.as_deref(),
            "KeyPath" => self.key_path.as_deref(),
            "TempKeyPath" => self.temp_key_path.as_deref(),
            _ => None,
        }
    }

    /// Render a template against this context.
    pub fn render(&self, template: &str) -> Result<String, TemplateError> {
        if !has_markers(template) {
            return Ok(template.to_string());
        }

        let mut out = String::with_capacity(template.len());
        for segment in parse(template)? {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(name) => {
                    if !VARIABLES.contains(&name) {
                        return Err(TemplateError::UnknownVariable {
                            template: template.to_string(),
                            name: name.to_string(),
                        });
                    }
                    let value = self.get(name).ok_or_else(|| TemplateError::Unset {
                        template: template.to_string(),
                        name: name.to_string(),
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

impl fmt::Display for TemplateContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set: Vec<String> = VARIABLES
            .iter()
            .filter_map(|v| self.get(v).map(|value| format!("{v}={value}")))
            .collect();
        write!(f, "{{{}}}", set.join(", "))
    }
}

/// Builder for [`TemplateContext`].
#[derive(Debug, Clone, Default)]
pub struct TemplateContextBuilder {
    inner: TemplateContext,
}

macro_rules! setter {
    ($(#[$doc:meta])* $field:ident) => {
        $(#[$doc])*
        #[must_use]
        pub fn $field(mut self, value: impl Into<String>) -> Self {
            self.inner.$field = Some(value.into());
            self
        }
    };
}

impl TemplateContextBuilder {
    setter!(
        /// `{{Name}}`: repository or package-manager name.
        name
    );
    setter!(
        /// `{{URL}}`: repository URL.
        url
    );
    setter!(
        /// `{{KeyURL}}`: signing key URL.
        key_url
    );
    setter!(
        /// `{{Arch}}`: package architecture.
        arch
    );
    setter!(
        /// `{{Channel}}`: release channel or suite.
        channel
    );
    setter!(
        /// `{{Component}}`: repository component.
        component
    );
    setter!(
        /// `{{SourcesPath}}`: where the repository source entry lives.
        sources_path
    );
    setter!(
        /// `{{KeyPath}}`: where the signing key is installed.
        key_path
    );
    setter!(
        /// `{{TempKeyPath}}`: scratch location for a downloaded key.
        temp_key_path
    );

    /// Finish construction.
    #[must_use]
    pub fn build(self) -> TemplateContext {
        self.inner
    }
}

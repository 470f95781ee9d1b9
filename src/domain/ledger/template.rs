use super::error::LedgerError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{index(?::0?(\d+)d?)?\}").expect("valid regex"));

/// Filename template parameterized by a 1-based chunk index.
///
/// Accepted placeholders: `{index}`, `{index:N}`, `{index:0N}` and `{index:0Nd}`, all
/// rendering the index zero-padded to width `N`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTemplate {
    prefix: String,
    suffix: String,
    width: usize,
}

impl NameTemplate {
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        let invalid = |reason: &str| LedgerError::InvalidTemplate {
            template: raw.to_string(),
            reason: reason.to_string(),
        };

        let mut matches = PLACEHOLDER_RE.captures_iter(raw);
        let captures = matches
            .next()
            .ok_or_else(|| invalid("missing {index} placeholder"))?;
        if matches.next().is_some() {
            return Err(invalid("more than one {index} placeholder"));
        }

        let placeholder = captures
            .get(0)
            .ok_or_else(|| invalid("missing {index} placeholder"))?;
        let width = match captures.get(1) {
            Some(width) => width
                .as_str()
                .parse::<usize>()
                .map_err(|_| invalid("placeholder width is not a number"))?,
            None => 0,
        };

        let prefix = &raw[..placeholder.start()];
        let suffix = &raw[placeholder.end()..];

        if [prefix, suffix]
            .iter()
            .any(|part| part.contains('{') || part.contains('}'))
        {
            return Err(invalid("unsupported placeholder"));
        }
        if raw.contains('/') || raw.contains('\\') {
            return Err(invalid("template must be a bare file name"));
        }

        Ok(Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            width,
        })
    }

    /// Render the template for `index` exactly as written
    pub fn render(&self, index: usize) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            index,
            self.suffix,
            width = self.width
        )
    }

    /// Render the template, appending `.{extension}` when it carries none
    pub fn file_name(&self, index: usize, extension: &str) -> String {
        let rendered = self.render(index);
        if Path::new(&rendered).extension().is_some() || extension.is_empty() {
            rendered
        } else {
            format!("{rendered}.{extension}")
        }
    }

    /// The chunk index whose file name is exactly `name`, if any
    pub fn index_of(&self, name: &str, extension: &str) -> Option<usize> {
        let rest = name.strip_prefix(self.prefix.as_str())?;
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());

        (1..=digits)
            .filter_map(|end| rest[..end].parse::<usize>().ok())
            .find(|&index| index > 0 && self.file_name(index, extension) == name)
    }
}

//! Front matter extraction and parsing.

use std::collections::BTreeMap;

/// Untyped front matter fields, keyed by name.
pub type Fields = BTreeMap<String, serde_yaml::Value>;

/// Front matter syntax, chosen by the opening delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `---` delimited YAML
    Yaml,
    /// `+++` delimited TOML
    Toml,
}

impl Format {
    fn from_delimiter(line: &str) -> Option<Self> {
        match line.trim_end() {
            "---" => Some(Self::Yaml),
            "+++" => Some(Self::Toml),
            _ => None,
        }
    }

    fn delimiter(self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
        }
    }
}

/// Errors that can occur when parsing frontmatter.
#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("Unclosed frontmatter block - missing closing {0}")]
    Unclosed(&'static str),

    #[error("Invalid YAML in frontmatter: {0}")]
    InvalidYaml(String),

    #[error("Invalid TOML in frontmatter: {0}")]
    InvalidToml(String),

    #[error("Frontmatter must be a mapping of names to values")]
    NotAMapping,

    #[error("Frontmatter key {0} is not a string")]
    InvalidKey(String),
}

/// Split a document into its raw frontmatter block and body.
///
/// The block is returned without its delimiters. A document that does not
/// open with `---` or `+++` has no block, and the whole source is the body.
pub fn split_frontmatter(
    source: &str,
) -> Result<(Option<(Format, &str)>, &str), FrontmatterError> {
    let text = source.strip_prefix('\u{feff}').unwrap_or(source);
    let trimmed = text.trim_start();

    let (first_line, rest) = match trimmed.find('\n') {
        Some(end) => (&trimmed[..end], &trimmed[end + 1..]),
        None => (trimmed, ""),
    };

    let Some(format) = Format::from_delimiter(first_line) else {
        return Ok((None, source));
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == format.delimiter() {
            let block = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Ok((Some((format, block)), body.trim_start()));
        }
        offset += line.len();
    }

    Err(FrontmatterError::Unclosed(format.delimiter()))
}

/// Extract frontmatter fields from a document.
///
/// Returns the parsed fields (empty when there is no frontmatter) and the
/// remaining content after the frontmatter block.
pub fn extract_frontmatter(source: &str) -> Result<(Fields, &str), FrontmatterError> {
    let (block, body) = split_frontmatter(source)?;

    let fields = match block {
        Some((Format::Yaml, yaml)) => parse_yaml(yaml)?,
        Some((Format::Toml, toml)) => parse_toml(toml)?,
        None => Fields::new(),
    };

    Ok((fields, body))
}

fn parse_yaml(block: &str) -> Result<Fields, FrontmatterError> {
    if block.trim().is_empty() {
        return Ok(Fields::new());
    }

    let value: serde_yaml::Value =
        serde_yaml::from_str(block).map_err(|e| FrontmatterError::InvalidYaml(e.to_string()))?;

    match value {
        serde_yaml::Value::Null => Ok(Fields::new()),
        serde_yaml::Value::Mapping(mapping) => mapping
            .into_iter()
            .map(|(key, value)| match key {
                serde_yaml::Value::String(key) => Ok((key, value)),
                other => Err(FrontmatterError::InvalidKey(format!("{:?}", other))),
            })
            .collect(),
        _ => Err(FrontmatterError::NotAMapping),
    }
}

fn parse_toml(block: &str) -> Result<Fields, FrontmatterError> {
    let table: toml::Table =
        toml::from_str(block).map_err(|e| FrontmatterError::InvalidToml(e.to_string()))?;

    Ok(table
        .into_iter()
        .map(|(key, value)| (key, toml_to_yaml(value)))
        .collect())
}

/// Convert a TOML value into the YAML value model used for all metadata.
fn toml_to_yaml(value: toml::Value) -> serde_yaml::Value {
    use serde_yaml::Value;

    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => Value::Number(f.into()),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Sequence(items.into_iter().map(toml_to_yaml).collect()),
        toml::Value::Table(table) => Value::Mapping(
            table
                .into_iter()
                .map(|(key, value)| (Value::String(key), toml_to_yaml(value)))
                .collect(),
        ),
    }
}

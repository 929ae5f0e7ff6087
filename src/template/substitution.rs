//! Variable substitution engine for templates

use super::types::{TemplateError, TemplateResult};

/// How leftover tokens are treated after substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubstitutionMode {
    /// Any unresolved {{token}} fails the render
    Strict,
    /// Unresolved tokens render as the empty string
    Lenient,
}

/// Substitute {{variable}} placeholders in a template string.
///
/// Variable values are JSON scalars: strings are inserted verbatim,
/// numbers and booleans are formatted, null renders empty. Arrays and
/// objects are rejected.
pub fn substitute(
    template: &str,
    variables: &serde_json::Map<String, serde_json::Value>,
    mode: SubstitutionMode,
) -> TemplateResult<String> {
    let mut result = template.to_string();

    for (key, value) in variables {
        let pattern = format!("{{{{{}}}}}", key);
        let replacement = match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Null => String::new(),
            _ => {
                return Err(TemplateError::InvalidTemplate(format!(
                    "Variable '{}' must be a string, number or boolean",
                    key
                )))
            }
        };
        result = result.replace(&pattern, &replacement);
    }

    let leftovers = unresolved_tokens(&result);
    if leftovers.is_empty() {
        return Ok(result);
    }

    match mode {
        SubstitutionMode::Strict => Err(TemplateError::UnresolvedVariable(
            leftovers[0].name.clone(),
        )),
        SubstitutionMode::Lenient => {
            // Blank out tokens back-to-front so recorded offsets stay valid
            for token in leftovers.iter().rev() {
                result.replace_range(token.start..token.end, "");
            }
            Ok(result)
        }
    }
}

/// An unresolved {{token}} found in a substituted string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedToken {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

/// Scan for remaining {{token}} occurrences.
pub fn unresolved_tokens(input: &str) -> Vec<UnresolvedToken> {
    let mut tokens = Vec::new();
    let mut cursor = 0;

    while let Some(open) = input[cursor..].find("{{") {
        let start = cursor + open;
        match input[start + 2..].find("}}") {
            Some(close) => {
                let name_start = start + 2;
                let name_end = name_start + close;
                let name = input[name_start..name_end].trim();
                if !name.is_empty() && !name.contains("{{") {
                    tokens.push(UnresolvedToken {
                        name: name.to_string(),
                        start,
                        end: name_end + 2,
                    });
                }
                cursor = name_end + 2;
            }
            None => break,
        }
    }

    tokens
}

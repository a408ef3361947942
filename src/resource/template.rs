//! `{placeholder}` expansion for source URIs and extraction rules
//!
//! `{{` and `}}` produce literal braces. Every placeholder must resolve;
//! a missing value is an error rather than a silently shortened string.

use crate::error::{GetpackError, GetpackResult};

/// Expand `template`, looking placeholder names up through `lookup`
pub fn expand<'a, F>(template: &str, lookup: F) -> GetpackResult<String>
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let start = pos + 1;
                let end = template[start..]
                    .find('}')
                    .map(|i| start + i)
                    .ok_or_else(|| GetpackError::TemplateMalformed {
                        template: template.to_string(),
                        reason: format!("unterminated '{{' at offset {}", pos),
                    })?;
                let key = &template[start..end];
                if key.is_empty() || key.contains('{') {
                    return Err(GetpackError::TemplateMalformed {
                        template: template.to_string(),
                        reason: format!("invalid placeholder at offset {}", pos),
                    });
                }
                let value = lookup(key).ok_or_else(|| GetpackError::TemplateUnresolved {
                    template: template.to_string(),
                    placeholder: key.to_string(),
                })?;
                out.push_str(value);
                while let Some((i, _)) = chars.peek() {
                    if *i > end {
                        break;
                    }
                    chars.next();
                }
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                    out.push('}');
                } else {
                    return Err(GetpackError::TemplateMalformed {
                        template: template.to_string(),
                        reason: format!("unmatched '}}' at offset {}", pos),
                    });
                }
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

use crate::error::BakeError;
use std::collections::HashMap;

/// Make an object name safe to use as a cache file name.
///
/// Characters that are reserved on common file systems are replaced by `_`;
/// everything else (spaces and dots included) is kept so cache files stay
/// readable.
pub fn clean_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| match ch {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim_end_matches(['.', ' ']);
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Script identifier used to reference an exported bake from the table script.
///
/// The `VLM.` prefix is kept as a `VLM_` namespace so generated identifiers
/// never clash with user-authored table elements.
pub fn vpx_identifier(name: &str) -> String {
    let stripped = name.strip_prefix("VLM.").unwrap_or(name);
    format!("VLM_{}", sanitize_identifier(stripped))
}

/// Check exported object names for identifier collisions.
///
/// Returns `Ok(())` if no collisions, or `Err(IdentifierCollision)` with
/// the first collision found.
pub fn check_collisions<'a, I>(names: I) -> Result<(), BakeError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashMap<String, &str> = HashMap::new();

    for name in names {
        let ident = vpx_identifier(name);
        if let Some(&previous) = seen.get(&ident) {
            return Err(BakeError::IdentifierCollision {
                identifier: ident,
                name_a: previous.to_string(),
                name_b: name.to_string(),
            });
        }
        seen.insert(ident, name);
    }

    Ok(())
}

/// Sanitize a string to a script identifier component.
fn sanitize_identifier(s: &str) -> String {
    let mut result = String::with_capacity(s.len());

    for ch in s.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            result.push(ch);
        } else {
            result.push('_');
        }
    }

    if result.is_empty() {
        result.push_str("Bake");
    }

    result
}

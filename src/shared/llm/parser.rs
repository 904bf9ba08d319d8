use lazy_static::lazy_static;
use regex::Regex;

use super::StructuredOutput;

lazy_static! {
    /// Trailing commas before } or ]
    static ref TRAILING_COMMA_RE: Regex = Regex::new(r",(\s*[}\]])").unwrap();
}

/// Pull the JSON object out of a model reply.
///
/// Accepts a ```json fenced block, a bare fenced block, a plain object, or an object
/// embedded in prose (first `{` to last `}`).
pub fn extract_json_string(text: &str) -> Result<String, String> {
    if let Some(after) = text.split("```json").nth(1) {
        return after
            .split("```")
            .next()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| "unterminated ```json block".to_string());
    }

    if let Some(start) = text.find("```") {
        let block_start = start + 3;
        if let Some(newline) = text[block_start..].find('\n') {
            let body_start = block_start + newline + 1;
            if let Some(end) = text[body_start..].find("```") {
                return Ok(text[body_start..body_start + end].trim().to_string());
            }
        }
    }

    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        return Ok(trimmed.to_string());
    }

    let start = text
        .find('{')
        .ok_or_else(|| "no JSON object in reply".to_string())?;
    let end = text
        .rfind('}')
        .ok_or_else(|| "incomplete JSON object in reply".to_string())?;
    if start < end {
        Ok(text[start..=end].to_string())
    } else {
        Err("invalid JSON boundaries in reply".to_string())
    }
}

/// `{"a": 1,}` -> `{"a": 1}`
pub fn fix_trailing_commas(json_str: &str) -> String {
    TRAILING_COMMA_RE.replace_all(json_str, "$1").to_string()
}

fn repair_json(json_str: &str) -> Option<String> {
    let options = llm_json::RepairOptions::default();
    match llm_json::repair_json(json_str, &options) {
        Ok(repaired) => Some(repaired),
        Err(e) => {
            tracing::debug!("JSON repair failed: {:?}", e);
            None
        }
    }
}

/// Parse a model reply into `T`, trying a direct parse, then trailing-comma removal,
/// then `llm_json` repair.
///
/// There is no fallback value: a reply that cannot be parsed, or parses but fails
/// [`StructuredOutput::check`], is an error the caller must surface.
pub fn parse_structured<T>(text: &str) -> Result<T, String>
where
    T: StructuredOutput,
{
    let json_str = extract_json_string(text)?;

    let parsed = serde_json::from_str::<T>(&json_str)
        .or_else(|_| serde_json::from_str::<T>(&fix_trailing_commas(&json_str)))
        .or_else(|first_err| {
            repair_json(&json_str)
                .and_then(|repaired| serde_json::from_str::<T>(&repaired).ok())
                .ok_or(first_err)
        })
        .map_err(|e| {
            format!(
                "unparseable model output ({}): {}",
                e,
                json_str.chars().take(200).collect::<String>()
            )
        })?;

    parsed.check()?;
    Ok(parsed)
}

use crate::errors::AppError;

pub const MAX_TAGS: usize = 20;
pub const MAX_TAG_LEN: usize = 40;

/// Trims, lower-cases, deduplicates and sorts category tags. Blank tags are dropped.
pub fn normalize_tags<I, S>(tags: I) -> Result<Vec<String>, AppError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = tags
        .into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    normalized.sort();
    normalized.dedup();

    if normalized.len() > MAX_TAGS {
        return Err(AppError::Validation(format!(
            "at most {MAX_TAGS} tags are allowed, got {}",
            normalized.len()
        )));
    }
    if let Some(long) = normalized.iter().find(|t| t.chars().count() > MAX_TAG_LEN) {
        return Err(AppError::Validation(format!(
            "tag '{long}' is longer than {MAX_TAG_LEN} characters"
        )));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_and_dedups() {
        let tags = normalize_tags([" Login ", "payment", "login", "", "  "]).unwrap();
        assert_eq!(tags, vec!["login".to_string(), "payment".to_string()]);
    }

    #[test]
    fn test_rejects_too_many_tags() {
        let many: Vec<String> = (0..=MAX_TAGS).map(|i| format!("tag-{i}")).collect();
        assert!(matches!(normalize_tags(&many), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_rejects_long_tag() {
        let long = "x".repeat(MAX_TAG_LEN + 1);
        assert!(matches!(normalize_tags([long]), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_empty_input_is_fine() {
        assert!(normalize_tags(Vec::<String>::new()).unwrap().is_empty());
    }
}

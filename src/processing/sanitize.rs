//! Helpers for normalizing caller supplied values.

/// Trim whitespace and drop empty input.
pub fn sanitize_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Resolve a caller limit: absent uses `default`, non-positive yields 0, values above `max` are capped.
pub fn resolve_limit(requested: Option<i64>, default: usize, max: usize) -> usize {
    match requested {
        None => default.min(max),
        Some(value) if value <= 0 => 0,
        Some(value) => usize::try_from(value).map_or(max, |value| value.min(max)),
    }
}

/// Resolve a 1-based page number; absent or non-positive pages become the first page.
pub fn resolve_page(requested: Option<i64>) -> usize {
    requested
        .and_then(|value| usize::try_from(value).ok())
        .filter(|value| *value > 0)
        .unwrap_or(1)
}

/// Resolve a page size; absent or non-positive sizes use `default`, others are capped at `max`.
pub fn resolve_page_size(requested: Option<i64>, default: usize, max: usize) -> usize {
    requested
        .and_then(|value| usize::try_from(value).ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
        .min(max)
        .max(1)
}

/// Number of pages needed for `count` items.
pub fn page_count(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        count.div_ceil(page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_text_trims_and_drops_blank() {
        assert_eq!(sanitize_text("  refund  "), Some("refund".into()));
        assert_eq!(sanitize_text(" \t\n"), None);
    }

    #[test]
    fn limits_default_clamp_and_zero_out() {
        assert_eq!(resolve_limit(None, 10, 100), 10);
        assert_eq!(resolve_limit(Some(0), 10, 100), 0);
        assert_eq!(resolve_limit(Some(-4), 10, 100), 0);
        assert_eq!(resolve_limit(Some(7), 10, 100), 7);
        assert_eq!(resolve_limit(Some(5_000), 10, 100), 100);
    }

    #[test]
    fn pages_start_at_one() {
        assert_eq!(resolve_page(None), 1);
        assert_eq!(resolve_page(Some(0)), 1);
        assert_eq!(resolve_page(Some(-2)), 1);
        assert_eq!(resolve_page(Some(3)), 3);
        assert_eq!(resolve_page_size(None, 10, 100), 10);
        assert_eq!(resolve_page_size(Some(0), 10, 100), 10);
        assert_eq!(resolve_page_size(Some(500), 10, 100), 100);
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
    }
}

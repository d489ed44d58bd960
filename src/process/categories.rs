use anyhow::{anyhow, Context, Result};

use crate::config::{SEGMENT_SEPARATOR, VALUE_SEPARATOR};

/// Split a raw field like `"related-1;request-0"` into its segments.
pub fn split_segments(raw: &str) -> Vec<&str> {
    raw.split(SEGMENT_SEPARATOR).collect()
}

/// Column names for each segment: the text before the first `-`.
pub fn derive_category_names(raw: &str) -> Vec<String> {
    split_segments(raw)
        .into_iter()
        .map(|seg| {
            seg.split(VALUE_SEPARATOR)
                .next()
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

/// Indicator of one segment: the integer after the last `-`.
pub fn parse_segment_value(segment: &str) -> Result<i64> {
    let value = segment.rsplit(VALUE_SEPARATOR).next().unwrap_or_default();
    value
        .trim()
        .parse::<i64>()
        .with_context(|| format!("category value `{}` in `{}` is not an integer", value, segment))
}

/// Indicators of every segment, in order.
pub fn parse_category_values(raw: &str) -> Result<Vec<i64>> {
    split_segments(raw)
        .into_iter()
        .map(parse_segment_value)
        .collect()
}

/// Like [`parse_category_values`], but the row must carry exactly `expected`
/// segments.
pub fn parse_row_values(raw: &str, expected: usize) -> Result<Vec<i64>> {
    let values = parse_category_values(raw)?;
    if values.len() != expected {
        return Err(anyhow!(
            "expected {} category segments, found {}",
            expected,
            values.len()
        ));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_come_from_text_before_the_separator() {
        assert_eq!(derive_category_names("a-0;b-1;c-0"), vec!["a", "b", "c"]);
        assert_eq!(
            derive_category_names("aid_related-1;child_alone-0"),
            vec!["aid_related", "child_alone"]
        );
    }

    #[test]
    fn values_come_from_text_after_the_last_separator() -> Result<()> {
        assert_eq!(parse_category_values("a-0;b-1;c-0")?, vec![0, 1, 0]);
        assert_eq!(parse_category_values("related-2")?, vec![2]);
        assert_eq!(parse_segment_value("odd-name-1")?, 1);
        Ok(())
    }

    #[test]
    fn non_integer_value_fails() {
        let err = parse_category_values("related-x").unwrap_err();
        assert!(err.to_string().contains("`x`"));
        assert!(parse_category_values("related-1;request-").is_err());
    }

    #[test]
    fn segment_count_is_checked_per_row() {
        assert!(parse_row_values("a-0;b-1", 3).is_err());
        assert_eq!(parse_row_values("a-0;b-1", 2).unwrap(), vec![0, 1]);
    }
}

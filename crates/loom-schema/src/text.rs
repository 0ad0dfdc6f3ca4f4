// SPDX-License-Identifier: Apache-2.0
//! Default-value text codec.
//!
//! Aggregate defaults are written as `(field=value,field=value)` and array
//! defaults as `(value,value,value)`, nesting freely:
//! `(translation=(x=0.0,y=0.0),scale=1.0)`. Parentheses inside quoted
//! strings do not nest.

/// Splits a parenthesised default value into its top-level fragments.
///
/// `"(a=1,b=(x=2,y=3))"` yields `["a=1", "b=(x=2,y=3)"]`. A value without
/// the outer parentheses is split the same way; an empty or `"()"` value
/// yields no fragments.
#[must_use]
pub fn split_default_value(default_value: &str) -> Vec<String> {
    let mut inner = default_value.trim();
    if let Some(stripped) = inner.strip_prefix('(') {
        inner = stripped.strip_suffix(')').unwrap_or(stripped);
    }

    let mut fragments = Vec::new();
    let mut depth = 0_i32;
    let mut in_quotes = false;
    let mut current = String::new();
    for ch in inner.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '(' if !in_quotes => {
                depth += 1;
                current.push(ch);
            }
            ')' if !in_quotes => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 && !in_quotes => {
                fragments.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        fragments.push(current);
    }
    fragments
}

/// Splits an aggregate default into `(field, value)` pairs, skipping
/// fragments without a `=` separator.
#[must_use]
pub fn split_fields(default_value: &str) -> Vec<(String, String)> {
    split_default_value(default_value)
        .into_iter()
        .filter_map(|fragment| {
            fragment
                .split_once('=')
                .map(|(name, value)| (name.trim().to_owned(), value.to_owned()))
        })
        .collect()
}

/// Joins `(field, value)` pairs back into aggregate default text.
#[must_use]
pub fn join_fields<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let body = fields
        .into_iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(",");
    format!("({body})")
}

/// Joins element values back into array default text.
#[must_use]
pub fn join_elements<'a>(elements: impl IntoIterator<Item = &'a str>) -> String {
    let body = elements.into_iter().collect::<Vec<_>>().join(",");
    format!("({body})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_nested_fragments_at_top_level_only() {
        let fragments = split_default_value("(a=1,b=(x=2,y=3),c=\"he,llo\")");
        assert_eq!(fragments, vec!["a=1", "b=(x=2,y=3)", "c=\"he,llo\""]);
    }

    #[test]
    fn empty_value_has_no_fragments() {
        assert!(split_default_value("").is_empty());
        assert!(split_default_value("()").is_empty());
    }

    #[test]
    fn field_split_round_trips() {
        let fields = split_fields("(x=1.0,y=(u=2,v=3))");
        assert_eq!(
            fields,
            vec![
                ("x".to_owned(), "1.0".to_owned()),
                ("y".to_owned(), "(u=2,v=3)".to_owned())
            ]
        );
        let joined = join_fields(fields.iter().map(|(n, v)| (n.as_str(), v.as_str())));
        assert_eq!(joined, "(x=1.0,y=(u=2,v=3))");
    }
}

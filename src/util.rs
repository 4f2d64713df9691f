use url::Url;

/// Extracts the text between two markers.
///
/// Locates the first occurrence of `left` and, starting just past it, the
/// first occurrence of `right`. Returns the text strictly in between.
///
/// # Returns
///
/// * `Some(&str)` - The text between both markers, possibly empty
/// * `None` - If `left` is absent, or `right` does not occur after it
///
/// Never panics, whatever the input.
///
/// # Examples
///
/// ```rust
/// use tubeline::util::extract;
///
/// assert_eq!(extract(r#"{"key":"abc"}"#, r#""key":""#, r#"""#), Some("abc"));
/// assert_eq!(extract("abc", "x", "c"), None);
/// ```
#[must_use]
pub fn extract<'a>(input: &'a str, left: &str, right: &str) -> Option<&'a str> {
    let start = input.find(left)? + left.len();
    let rest = &input[start..];
    let end = rest.find(right)?;

    Some(&rest[..end])
}

/// Sets the query parameter `key` to `value`.
///
/// The first occurrence of `key` is replaced in place and any further ones
/// are dropped; when `key` is absent, it is appended. Other parameters keep
/// their order.
pub fn set_query_param(url: &mut Url, key: &str, value: &str) {
    let mut replaced = false;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .into_owned()
        .filter_map(|(k, v)| {
            if k != key {
                return Some((k, v));
            }
            if replaced {
                return None;
            }
            replaced = true;
            Some((k, value.to_owned()))
        })
        .collect();

    let mut query = url.query_pairs_mut();
    query.clear().extend_pairs(pairs);
    if !replaced {
        query.append_pair(key, value);
    }
}

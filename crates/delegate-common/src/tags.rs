//! Reserved tag schema for delegate instances
//!
//! Every delegate VM carries a `Name` tag identifying it as the delegate.
//! Caller-supplied tags are merged underneath it: the reserved key is always
//! written last so it can never be dropped or overridden.
//!
//! | Tag Key | Value |
//! |---------|-------|
//! | `Name`  | `harness-cie-delegate` |

use std::collections::BTreeMap;

/// Reserved tag key identifying the delegate instance
pub const TAG_NAME: &str = "Name";

/// Value of the reserved `Name` tag
pub const TAG_NAME_VALUE: &str = "harness-cie-delegate";

/// Copy `tags` and stamp the reserved `Name` tag over the copy.
///
/// The input is only borrowed, so repeated calls with the same map always
/// see the caller's original values.
pub fn merge_tags(tags: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut merged = tags.clone();
    merged.insert(TAG_NAME.to_string(), TAG_NAME_VALUE.to_string());
    merged
}

/// Parse `key=value` pairs (as given on the command line) into a tag map.
///
/// Blank entries are skipped. An entry without `=` becomes a tag with an
/// empty value. Later duplicates win.
pub fn parse_tags<I, S>(pairs: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    pairs
        .into_iter()
        .filter_map(|pair| {
            let pair = pair.as_ref().trim();
            if pair.is_empty() {
                return None;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_adds_name() {
        let merged = merge_tags(&BTreeMap::new());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.get(TAG_NAME).map(String::as_str), Some(TAG_NAME_VALUE));
    }

    #[test]
    fn test_merge_overrides_caller_name() {
        let mut tags = BTreeMap::new();
        tags.insert("Name".to_string(), "my-box".to_string());
        tags.insert("team".to_string(), "ci".to_string());

        let merged = merge_tags(&tags);
        assert_eq!(merged["Name"], TAG_NAME_VALUE);
        assert_eq!(merged["team"], "ci");

        // Caller's map is untouched
        assert_eq!(tags["Name"], "my-box");
    }

    #[test]
    fn test_parse_tags() {
        let tags = parse_tags(["team=ci", " env = prod ", "", "flag", "=orphan"]);
        assert_eq!(tags.len(), 3);
        assert_eq!(tags["team"], "ci");
        assert_eq!(tags["env"], "prod");
        assert_eq!(tags["flag"], "");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// merge_tags(T) == T ∪ {Name}, and T is left as it was
            #[test]
            fn merge_is_union_with_name(
                tags in prop::collection::btree_map("[a-zA-Z:/._-]{1,12}", ".{0,16}", 0..20)
            ) {
                let before = tags.clone();
                let merged = merge_tags(&tags);

                prop_assert_eq!(&tags, &before);

                let mut expected = before;
                expected.insert(TAG_NAME.to_string(), TAG_NAME_VALUE.to_string());
                prop_assert_eq!(merged, expected);
            }
        }
    }
}

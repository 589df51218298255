use tracing::warn;

use crate::models::Operation;

/// Apply one edit to a content snapshot.
///
/// Offsets are character offsets, clamped into `[0, len]`, so no input can index out of
/// bounds or split a multi-byte character. Unsupported operations leave the content as is.
pub fn apply(content: &str, operation: &Operation) -> String {
    match operation {
        Operation::Insert { position, text } => {
            let at = byte_offset(content, clamp_position(*position, char_len(content)));
            let mut out = String::with_capacity(content.len() + text.len());
            out.push_str(&content[..at]);
            out.push_str(text);
            out.push_str(&content[at..]);
            out
        }
        Operation::Delete { position, length } => {
            let (start, end) = delete_range(content, *position, *length);
            let (start, end) = (byte_offset(content, start), byte_offset(content, end));
            let mut out = String::with_capacity(content.len() - (end - start));
            out.push_str(&content[..start]);
            out.push_str(&content[end..]);
            out
        }
        Operation::Unsupported => {
            warn!("Operation not supported, content left unchanged");
            content.to_string()
        }
    }
}

/// The operation as it is actually applied to `content`: positions clamped and delete
/// lengths cut to what exists. Peers receive this form.
pub fn normalize(content: &str, operation: &Operation) -> Operation {
    match operation {
        Operation::Insert { position, text } => Operation::Insert {
            position: clamp_position(*position, char_len(content)) as i64,
            text: text.clone(),
        },
        Operation::Delete { position, length } => {
            let (start, end) = delete_range(content, *position, *length);
            Operation::Delete {
                position: start as i64,
                length: (end - start) as i64,
            }
        }
        Operation::Unsupported => Operation::Unsupported,
    }
}

fn char_len(content: &str) -> usize {
    content.chars().count()
}

fn clamp_position(position: i64, len: usize) -> usize {
    usize::try_from(position).map_or(0, |p| p.min(len))
}

// Character range removed by a delete
fn delete_range(content: &str, position: i64, length: i64) -> (usize, usize) {
    let len = char_len(content);
    let start = clamp_position(position, len);
    let length = usize::try_from(length).unwrap_or(0);
    (start, start.saturating_add(length).min(len))
}

fn byte_offset(content: &str, char_index: usize) -> usize {
    content
        .char_indices()
        .nth(char_index)
        .map_or(content.len(), |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_in_the_middle() {
        let out = apply("hello world", &Operation::insert(5, " there"));
        assert_eq!(out, "hello there world");
    }

    #[test]
    fn delete_round_trips_prior_insert() {
        let out = apply("hello there world", &Operation::delete(5, 6));
        assert_eq!(out, "hello world");
    }

    #[test]
    fn insert_past_end_appends() {
        assert_eq!(apply("abc", &Operation::insert(99, "!")), "abc!");
    }

    #[test]
    fn negative_insert_position_prepends() {
        assert_eq!(apply("abc", &Operation::insert(-4, ">")), ">abc");
    }

    #[test]
    fn delete_length_is_cut_at_end() {
        assert_eq!(apply("abcdef", &Operation::delete(4, 100)), "abcd");
        assert_eq!(apply("abcdef", &Operation::delete(10, 2)), "abcdef");
    }

    #[test]
    fn negative_delete_length_removes_nothing() {
        assert_eq!(apply("abcdef", &Operation::delete(2, -3)), "abcdef");
    }

    #[test]
    fn unsupported_is_identity() {
        assert_eq!(apply("keep me", &Operation::Unsupported), "keep me");
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        assert_eq!(apply("héllo", &Operation::insert(2, "-")), "hé-llo");
        assert_eq!(apply("日本語", &Operation::delete(1, 1)), "日語");
    }

    #[test]
    fn insert_grows_by_inserted_length() {
        let content = "the quick brown fox";
        for position in [-3, 0, 4, 19, 50] {
            let out = apply(content, &Operation::insert(position, "abc"));
            assert_eq!(out.chars().count(), content.chars().count() + 3);
        }
    }

    #[test]
    fn delete_shrinks_by_clamped_range() {
        let content = "the quick brown fox";
        let len = content.chars().count() as i64;
        for (position, length) in [(0, 3), (5, 100), (18, 1), (19, 5), (40, 2)] {
            let out = apply(content, &Operation::delete(position, length));
            let removed = (position + length).min(len) - position.min(len);
            assert_eq!(out.chars().count() as i64, len - removed);
        }
    }

    #[test]
    fn normalize_reports_the_applied_edit() {
        assert_eq!(normalize("abc", &Operation::insert(10, "x")), Operation::insert(3, "x"));
        assert_eq!(normalize("abcdef", &Operation::delete(4, 10)), Operation::delete(4, 2));
        assert_eq!(normalize("abc", &Operation::delete(-1, 2)), Operation::delete(0, 2));
    }
}

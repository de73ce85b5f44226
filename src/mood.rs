//! Mood values arrive either on the 1..=5 scale or on the older centered
//! -2..=2 scale. Everything downstream works on the 1..=5 scale.

pub const MOOD_MIN: f64 = 1.0;
pub const MOOD_MAX: f64 = 5.0;

const CENTERED_MIN: f64 = -2.0;
const CENTERED_MAX: f64 = 2.0;
const CENTERED_OFFSET: f64 = 3.0;

pub const NO_VALUE_LABEL: &str = "—";
pub const NO_VALUE_EMOJI: &str = "❓";

const LABELS: [&str; 5] = ["Very bad", "Bad", "Okay", "Good", "Great"];
const EMOJIS: [&str; 5] = ["😣", "😔", "😐", "🙂", "😄"];

/// Words and symbols older clients stored as the mood label when no numeric
/// value was attached to the event.
const LEGACY_LABELS: [(&str, u8); 17] = [
    ("very bad", 1),
    ("awful", 1),
    ("terrible", 1),
    ("😣", 1),
    ("bad", 2),
    ("low", 2),
    ("😔", 2),
    ("okay", 3),
    ("ok", 3),
    ("neutral", 3),
    ("so-so", 3),
    ("😐", 3),
    ("good", 4),
    ("🙂", 4),
    ("great", 5),
    ("excellent", 5),
    ("😄", 5),
];

/// Maps a raw mood value onto 1..=5.
///
/// The 1..=5 range is checked first, so `1.0` and `2.0` (valid on both scales)
/// are read as 1..=5 values. Values outside both scales yield `None`.
pub fn normalize(raw: f64) -> Option<f64> {
    if raw.is_nan() {
        return None;
    }
    if (MOOD_MIN..=MOOD_MAX).contains(&raw) {
        return Some(raw.clamp(MOOD_MIN, MOOD_MAX));
    }
    if (CENTERED_MIN..=CENTERED_MAX).contains(&raw) {
        return Some((raw + CENTERED_OFFSET).clamp(MOOD_MIN, MOOD_MAX));
    }
    None
}

pub fn infer_from_label(label: &str) -> Option<f64> {
    let needle = label.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    LEGACY_LABELS
        .iter()
        .find(|(text, _)| needle == *text)
        .or_else(|| {
            // Labels like "😄 Great day" still carry the emoji.
            LEGACY_LABELS
                .iter()
                .find(|(text, _)| !text.is_ascii() && needle.contains(text))
        })
        .map(|(_, value)| f64::from(*value))
}

fn table_index(normalized: f64) -> Option<usize> {
    if normalized.is_nan() {
        return None;
    }
    (normalized.round().clamp(MOOD_MIN, MOOD_MAX) as usize).checked_sub(1)
}

pub fn to_label(normalized: f64) -> &'static str {
    table_index(normalized).map_or(NO_VALUE_LABEL, |index| LABELS[index])
}

pub fn to_emoji(normalized: f64) -> &'static str {
    table_index(normalized).map_or(NO_VALUE_EMOJI, |index| EMOJIS[index])
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoodDescription {
    pub value: Option<f64>,
    pub label: &'static str,
    pub emoji: &'static str,
}

pub fn describe(raw: f64) -> MoodDescription {
    match normalize(raw) {
        Some(value) => MoodDescription {
            value: Some(value),
            label: to_label(value),
            emoji: to_emoji(value),
        },
        None => MoodDescription {
            value: None,
            label: NO_VALUE_LABEL,
            emoji: NO_VALUE_EMOJI,
        },
    }
}

fn average_bucket(average: f64) -> usize {
    if average < 1.5 {
        0
    } else if average < 2.5 {
        1
    } else if average < 3.5 {
        2
    } else if average < 4.5 {
        3
    } else {
        4
    }
}

pub fn average_to_label(average: f64) -> &'static str {
    describe_average(Some(average)).label
}

pub fn describe_average(average: Option<f64>) -> MoodDescription {
    match average.filter(|value| !value.is_nan()) {
        Some(value) => {
            let bucket = average_bucket(value);
            MoodDescription {
                value: Some(value),
                label: LABELS[bucket],
                emoji: EMOJIS[bucket],
            }
        }
        None => MoodDescription {
            value: None,
            label: NO_VALUE_LABEL,
            emoji: NO_VALUE_EMOJI,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_is_read_on_the_five_point_scale() {
        // 1 is valid on both scales; the five-point reading wins.
        assert_eq!(normalize(1.0), Some(1.0));
        assert_eq!(normalize(2.0), Some(2.0));
    }

    #[test]
    fn centered_values_shift_up_by_three() {
        assert_eq!(normalize(-2.0), Some(1.0));
        assert_eq!(normalize(-1.0), Some(2.0));
        assert_eq!(normalize(0.0), Some(3.0));
        assert_eq!(normalize(0.5), Some(3.5));
    }

    #[test]
    fn out_of_range_values_have_no_mood() {
        assert_eq!(normalize(6.0), None);
        assert_eq!(normalize(-3.0), None);
        assert_eq!(normalize(f64::NAN), None);
    }

    #[test]
    fn normalizing_twice_changes_nothing() {
        for raw in [-2.0, -1.5, -1.0, 0.0, 0.7, 1.0, 1.5, 2.0, 3.0, 4.2, 5.0] {
            let once = normalize(raw).expect("in range");
            assert_eq!(normalize(once), Some(once), "raw={raw}");
        }
    }

    #[test]
    fn describe_uses_rounded_value_for_table_lookup() {
        let described = describe(4.4);
        assert_eq!(described.value, Some(4.4));
        assert_eq!(described.label, "Good");
        assert_eq!(described.emoji, "🙂");

        let centered = describe(2.0);
        assert_eq!(centered.label, "Bad");

        let missing = describe(42.0);
        assert_eq!(missing.value, None);
        assert_eq!(missing.label, NO_VALUE_LABEL);
        assert_eq!(missing.emoji, NO_VALUE_EMOJI);
    }

    #[test]
    fn nan_reads_as_no_value() {
        assert_eq!(to_label(f64::NAN), NO_VALUE_LABEL);
        assert_eq!(to_emoji(f64::NAN), NO_VALUE_EMOJI);
        assert_eq!(average_to_label(f64::NAN), NO_VALUE_LABEL);
        assert_eq!(to_label(0.0), "Very bad");
        assert_eq!(to_emoji(9.0), "😄");
    }

    #[test]
    fn averages_bucket_on_midpoints() {
        assert_eq!(average_to_label(1.49), "Very bad");
        assert_eq!(average_to_label(1.5), "Bad");
        assert_eq!(average_to_label(2.5), "Okay");
        assert_eq!(average_to_label(3.49), "Okay");
        assert_eq!(average_to_label(3.5), "Good");
        assert_eq!(average_to_label(4.5), "Great");
        assert_eq!(describe_average(None).label, NO_VALUE_LABEL);
    }

    #[test]
    fn legacy_labels_resolve_to_values() {
        assert_eq!(infer_from_label("Great"), Some(5.0));
        assert_eq!(infer_from_label("  so-so "), Some(3.0));
        assert_eq!(infer_from_label("😔 rough morning"), Some(2.0));
        assert_eq!(infer_from_label("Mood"), None);
        assert_eq!(infer_from_label(""), None);
    }
}

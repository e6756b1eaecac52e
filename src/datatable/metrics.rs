//! Legacy numeric column indexes
//!
//! Older archives store well-known metrics under stable integer keys
//! (`"2"` instead of `"nb_visits"`). Both spellings must resolve to the
//! same column.

const LEGACY_COLUMN_INDEXES: &[(u32, &str)] = &[
    (1, "nb_uniq_visitors"),
    (2, "nb_visits"),
    (3, "nb_actions"),
    (4, "max_actions"),
    (5, "sum_visit_length"),
    (6, "bounce_count"),
    (7, "nb_visits_converted"),
    (8, "nb_conversions"),
    (9, "revenue"),
    (10, "goals"),
    (11, "sum_daily_nb_uniq_visitors"),
    (12, "nb_hits"),
    (13, "sum_time_spent"),
    (14, "exit_nb_uniq_visitors"),
    (15, "exit_nb_visits"),
    (16, "sum_daily_exit_nb_uniq_visitors"),
    (17, "entry_nb_uniq_visitors"),
    (18, "sum_daily_entry_nb_uniq_visitors"),
    (19, "entry_nb_visits"),
    (20, "entry_nb_actions"),
    (21, "entry_sum_visit_length"),
    (22, "entry_bounce_count"),
];

/// Metric name for a legacy index key such as `"2"`
pub fn name_for_index(key: &str) -> Option<&'static str> {
    let index: u32 = key.parse().ok()?;
    LEGACY_COLUMN_INDEXES
        .iter()
        .find(|(i, _)| *i == index)
        .map(|(_, name)| *name)
}

/// Legacy index key for a metric name such as `"nb_visits"`
pub fn index_for_name(name: &str) -> Option<String> {
    LEGACY_COLUMN_INDEXES
        .iter()
        .find(|(_, n)| *n == name)
        .map(|(i, _)| i.to_string())
}

/// The other spelling of `column`, if it has one
pub fn alias(column: &str) -> Option<String> {
    name_for_index(column)
        .map(str::to_string)
        .or_else(|| index_for_name(column))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_directions() {
        assert_eq!(name_for_index("2"), Some("nb_visits"));
        assert_eq!(index_for_name("nb_visits"), Some("2".to_string()));
        assert_eq!(alias("nb_actions"), Some("3".to_string()));
        assert_eq!(alias("3"), Some("nb_actions".to_string()));
    }

    #[test]
    fn test_unknown() {
        assert_eq!(name_for_index("99"), None);
        assert_eq!(name_for_index("label"), None);
        assert_eq!(alias("conversion_rate"), None);
    }
}

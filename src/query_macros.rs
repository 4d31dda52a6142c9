//! Grafana time macros in panel SQL: detection, and rewriting into literal
//! timestamps so the query can be dry-run outside Grafana.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::{Captures, NoExpand, Regex};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static TIME_FROM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\$__timeFrom\(\s*\)").expect("static regex"));
static TIME_TO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\$__timeTo\(\s*\)").expect("static regex"));
static TIME_FILTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\$__timeFilter\(\s*([^)\s][^)]*?)\s*\)").expect("static regex")
});
static TIME_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bas\s+("time"|time\b)"#).expect("static regex"));

/// Literal bounds substituted for the time macros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: String,
    pub to: String,
}

impl TimeWindow {
    /// The `days`-long window ending at `now`, formatted in UTC.
    pub fn ending_at(now: DateTime<Utc>, days: i64) -> Self {
        let start = now - Duration::days(days);
        Self {
            from: start.format(TIMESTAMP_FORMAT).to_string(),
            to: now.format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    pub fn last_days(days: i64) -> Self {
        Self::ending_at(Utc::now(), days)
    }
}

/// Replace `$__timeFrom()`, `$__timeTo()` and `$__timeFilter(col)` with
/// literal timestamps. Other `$__` macros are left untouched.
pub fn rewrite_time_macros(sql: &str, window: &TimeWindow) -> String {
    let from = format!("TIMESTAMP '{}'", window.from);
    let to = format!("TIMESTAMP '{}'", window.to);

    let sql = TIME_FILTER.replace_all(sql, |caps: &Captures| {
        format!("{} BETWEEN {from} AND {to}", &caps[1])
    });
    let sql = TIME_FROM.replace_all(&sql, NoExpand(&from));
    let sql = TIME_TO.replace_all(&sql, NoExpand(&to));
    sql.into_owned()
}

/// Rewrite macros, trim, and drop a single trailing semicolon.
pub fn prepare_sql(sql: &str, window: &TimeWindow) -> String {
    let rewritten = rewrite_time_macros(sql, window);
    let trimmed = rewritten.trim();
    trimmed
        .strip_suffix(';')
        .unwrap_or(trimmed)
        .trim_end()
        .to_string()
}

/// Wrap a prepared query so executing it fetches at most one row.
pub fn wrap_dry_run(sql: &str) -> String {
    format!("SELECT * FROM ({sql}) AS t LIMIT 1")
}

/// Whether the query references any of the time macros.
pub fn mentions_time_macro(sql: &str) -> bool {
    TIME_FILTER.is_match(sql) || TIME_FROM.is_match(sql) || TIME_TO.is_match(sql)
}

/// Whether the query selects a column aliased `time`.
pub fn has_time_alias(sql: &str) -> bool {
    TIME_ALIAS.is_match(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window() -> TimeWindow {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 30, 0).unwrap();
        TimeWindow::ending_at(now, 7)
    }

    #[test]
    fn window_is_seven_days_in_utc() {
        let w = window();
        assert_eq!(w.from, "2024-03-08 12:30:00");
        assert_eq!(w.to, "2024-03-15 12:30:00");
    }

    #[test]
    fn rewrites_time_filter() {
        let sql = "SELECT count() FROM events WHERE $__timeFilter(ts)";
        assert_eq!(
            rewrite_time_macros(sql, &window()),
            "SELECT count() FROM events WHERE ts BETWEEN TIMESTAMP '2024-03-08 12:30:00' \
             AND TIMESTAMP '2024-03-15 12:30:00'"
        );
    }

    #[test]
    fn rewrites_from_and_to_case_insensitively() {
        let sql = "SELECT * FROM t WHERE ts >= $__TIMEFROM() AND ts < $__timeTo()";
        assert_eq!(
            rewrite_time_macros(sql, &window()),
            "SELECT * FROM t WHERE ts >= TIMESTAMP '2024-03-08 12:30:00' \
             AND ts < TIMESTAMP '2024-03-15 12:30:00'"
        );
    }

    #[test]
    fn unknown_macros_pass_through() {
        let sql = "SELECT $__timeGroup(ts, 1h) AS time, $__interval FROM t";
        assert_eq!(rewrite_time_macros(sql, &window()), sql);
    }

    #[test]
    fn empty_time_filter_is_left_alone() {
        let sql = "SELECT 1 FROM t WHERE $__timeFilter()";
        assert_eq!(rewrite_time_macros(sql, &window()), sql);
        assert_eq!(rewrite_time_macros("WHERE $__timeFilter(  )", &window()), "WHERE $__timeFilter(  )");
        assert!(!mentions_time_macro(sql));
    }

    #[test]
    fn prepare_trims_and_drops_one_semicolon() {
        let w = window();
        assert_eq!(prepare_sql("  SELECT 1;  ", &w), "SELECT 1");
        assert_eq!(prepare_sql("SELECT 1 ;", &w), "SELECT 1");
        assert_eq!(prepare_sql("SELECT 1;;", &w), "SELECT 1;");
        assert_eq!(
            wrap_dry_run(&prepare_sql("SELECT 1;", &w)),
            "SELECT * FROM (SELECT 1) AS t LIMIT 1"
        );
    }

    #[test]
    fn detects_macros_and_aliases() {
        assert!(mentions_time_macro("where $__timefilter(ts)"));
        assert!(mentions_time_macro("ts > $__timeFrom()"));
        assert!(mentions_time_macro("ts > $__timeFrom( ) AND ts < $__TIMETO(  )"));
        assert!(mentions_time_macro("WHERE $__timeFilter( created_at )"));
        assert!(!mentions_time_macro("SELECT 1"));

        assert!(has_time_alias("SELECT ts AS time, v FROM t"));
        assert!(has_time_alias("SELECT ts as \"time\", v FROM t"));
        assert!(has_time_alias("SELECT toStartOfHour(ts)  AS  TIME FROM t"));
        assert!(!has_time_alias("SELECT ts AS timestamp FROM t"));
        assert!(!has_time_alias("SELECT count() AS total FROM t"));
    }
}

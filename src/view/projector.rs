//! Flat order lines → grouped, sorted, filtered table rows.
//!
//! Filtering runs on the flat list before grouping, so a group shows up iff at
//! least one of its lines survives, and only the surviving lines are shown.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDateTime};

use crate::types::{OrderGroup, OrderLine};
use crate::view::status::{status_class, status_label, StatusClass};

/// Shown in a detail row when the line has no option.
pub const NO_OPTION_LABEL: &str = "옵션 없음";

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Raw backend status code; empty means every status.
    pub status: String,
    /// Free text; matched case-insensitively against the id, buyer and product fields.
    pub search: String,
}

impl FilterCriteria {
    pub fn new(status: impl Into<String>, search: impl Into<String>) -> Self {
        Self { status: status.into(), search: search.into() }
    }

    pub fn matches(&self, line: &OrderLine) -> bool {
        if !self.status.is_empty() && line.status() != self.status {
            return false;
        }
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [
            line.product_order_id(),
            line.order_id(),
            line.buyer_name(),
            line.product_name(),
            line.product_option().unwrap_or(""),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

pub fn filter(lines: &[OrderLine], criteria: &FilterCriteria) -> Vec<OrderLine> {
    lines.iter().filter(|l| criteria.matches(l)).cloned().collect()
}

// ---------------------------------------------------------------------------
// Grouping and ordering
// ---------------------------------------------------------------------------

/// Partition lines by `order_id`, keeping first-seen order inside each group.
pub fn group(lines: impl IntoIterator<Item = OrderLine>) -> Vec<OrderGroup> {
    let mut groups: Vec<OrderGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for line in lines {
        match index.get(line.order_id()) {
            Some(&i) => groups[i].lines.push(line),
            None => {
                index.insert(line.order_id().to_string(), groups.len());
                groups.push(OrderGroup::new(line));
            }
        }
    }
    groups
}

/// Descending by raw `order_id` string. This is plain string order, not a
/// date sort: it only tracks recency while ids share one width.
pub fn sort_groups(groups: &mut [OrderGroup]) {
    groups.sort_by(|a, b| b.order_id.cmp(&a.order_id));
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub order_id: String,
    pub order_date: String,
    pub status_code: String,
    pub status_label: String,
    pub status_class: StatusClass,
    /// First product name, plus ` 외 N건` for the remaining lines.
    pub product_summary: String,
    pub total_quantity: i64,
    pub buyer_name: String,
    pub line_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRow {
    pub product_order_id: String,
    pub status_code: String,
    pub status_label: String,
    pub status_class: StatusClass,
    pub product_name: String,
    pub product_option: String,
    pub quantity: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRow {
    pub summary: SummaryRow,
    pub details: Vec<DetailRow>,
}

impl OrderRow {
    pub fn order_id(&self) -> &str {
        &self.summary.order_id
    }
}

/// The projected table. Empty means "no results", never an empty table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderTable {
    pub rows: Vec<OrderRow>,
}

impl OrderTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

pub fn summary_row(group: &OrderGroup) -> SummaryRow {
    let first = group.representative();
    let mut product_summary = first.product_name().to_string();
    if group.len() > 1 {
        product_summary.push_str(&format!(" 외 {}건", group.len() - 1));
    }

    SummaryRow {
        order_id: group.order_id.clone(),
        order_date: format_order_date(first.order_date()),
        status_code: first.status().to_string(),
        status_label: status_label(first.status()).to_string(),
        status_class: status_class(first.status()),
        product_summary,
        total_quantity: group.total_quantity(),
        buyer_name: first.buyer_name().to_string(),
        line_count: group.len(),
    }
}

pub fn detail_rows(group: &OrderGroup) -> Vec<DetailRow> {
    group
        .lines
        .iter()
        .map(|line| DetailRow {
            product_order_id: line.product_order_id().to_string(),
            status_code: line.status().to_string(),
            status_label: status_label(line.status()).to_string(),
            status_class: status_class(line.status()),
            product_name: line.product_name().to_string(),
            product_option: line.product_option().unwrap_or(NO_OPTION_LABEL).to_string(),
            quantity: line.quantity_text(),
        })
        .collect()
}

/// filter → group → sort → rows.
pub fn project(lines: &[OrderLine], criteria: &FilterCriteria) -> OrderTable {
    let filtered = filter(lines, criteria);
    if filtered.is_empty() {
        return OrderTable::default();
    }

    let mut groups = group(filtered);
    sort_groups(&mut groups);

    OrderTable {
        rows: groups
            .iter()
            .map(|g| OrderRow { summary: summary_row(g), details: detail_rows(g) })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Status filter options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusOption {
    pub code: String,
    pub label: String,
}

/// Distinct non-empty statuses present in `lines`, sorted by code.
pub fn status_options(lines: &[OrderLine]) -> Vec<StatusOption> {
    lines
        .iter()
        .map(OrderLine::status)
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|code| StatusOption { code: code.to_string(), label: status_label(code).to_string() })
        .collect()
}

/// Keep the current status selection only if it is still offered.
pub fn reconcile_status(current: &str, options: &[StatusOption]) -> String {
    if options.iter().any(|o| o.code == current) {
        current.to_string()
    } else {
        String::new()
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// `YY-MM-DD HH:MM` in the timestamp's own offset. Unparsable text is shown
/// unchanged; a missing date is blank.
pub fn format_order_date(raw: &str) -> String {
    const OUT: &str = "%y-%m-%d %H:%M";
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(OUT).to_string();
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return dt.format(OUT).to_string();
        }
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn line(order_id: &str, product_order_id: &str, status: &str) -> OrderLine {
        OrderLine {
            order_id: Some(order_id.to_string()),
            product_order_id: Some(product_order_id.to_string()),
            status: Some(status.to_string()),
            product_name: Some(format!("상품 {product_order_id}")),
            buyer_name: Some("홍길동".to_string()),
            quantity: Some(json!(1)),
            ..Default::default()
        }
    }

    fn ids(groups: &[OrderGroup]) -> Vec<&str> {
        groups.iter().map(|g| g.order_id.as_str()).collect()
    }

    #[test]
    fn groups_keep_first_seen_line_order() {
        let lines = vec![
            line("A", "1", "PAYED"),
            line("B", "2", "PAYED"),
            line("A", "3", "DELIVERING"),
        ];
        let groups = group(lines);
        assert_eq!(ids(&groups), vec!["A", "B"]);
        let a: Vec<_> = groups[0].lines.iter().map(|l| l.product_order_id()).collect();
        assert_eq!(a, vec!["1", "3"]);
        assert_eq!(groups[0].representative().status(), "PAYED");
    }

    #[test]
    fn sort_is_descending_string_order() {
        let mut groups = group(vec![
            line("9", "a", ""),
            line("10", "b", ""),
            line("2024010200001", "c", ""),
            line("2024010100001", "d", ""),
        ]);
        sort_groups(&mut groups);
        // "9" > "2024..." > "10" as strings.
        assert_eq!(ids(&groups), vec!["9", "2024010200001", "2024010100001", "10"]);

        let once = groups.clone();
        sort_groups(&mut groups);
        assert_eq!(groups, once);
    }

    #[test]
    fn summary_quantity_coerces_each_line() {
        let mut lines = vec![line("A", "1", "PAYED"), line("A", "2", "PAYED"), line("A", "3", "PAYED")];
        lines[0].quantity = Some(json!("2"));
        lines[1].quantity = Some(json!(3));
        lines[2].quantity = None;

        let groups = group(lines);
        let summary = summary_row(&groups[0]);
        assert_eq!(summary.total_quantity, 5);
        assert_eq!(summary.line_count, 3);
    }

    #[test]
    fn summary_quantity_saturates_instead_of_overflowing() {
        let mut lines = vec![line("A", "1", "PAYED"), line("A", "2", "PAYED")];
        lines[0].quantity = Some(json!(i64::MAX));
        lines[1].quantity = Some(json!("1"));

        let table = project(&lines, &FilterCriteria::default());
        assert_eq!(table.rows[0].summary.total_quantity, i64::MAX);
    }

    #[test]
    fn summary_names_first_product_and_counts_the_rest() {
        let groups = group(vec![line("A", "1", "PAYED"), line("A", "2", "CANCELED")]);
        let summary = summary_row(&groups[0]);
        assert_eq!(summary.product_summary, "상품 1 외 1건");
        assert_eq!(summary.status_code, "PAYED");
        assert_eq!(summary.status_label, "결제완료 (신규주문)");
        assert_eq!(summary.status_class, StatusClass::Paid);

        let single = group(vec![line("B", "9", "PAYED")]);
        assert_eq!(summary_row(&single[0]).product_summary, "상품 9");
    }

    #[test]
    fn detail_rows_cover_every_line() {
        let mut lines = vec![line("A", "1", "PAYED"), line("A", "2", "CANCELED")];
        lines[0].product_option = Some("빨강 / L".to_string());
        lines[1].quantity = Some(json!("4"));

        let groups = group(lines);
        let details = detail_rows(&groups[0]);
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].product_option, "빨강 / L");
        assert_eq!(details[1].product_option, NO_OPTION_LABEL);
        assert_eq!(details[1].quantity, "4");
        assert_eq!(details[1].status_class, StatusClass::Canceled);
    }

    #[test]
    fn search_matches_any_field_case_insensitively() {
        let mut lines = vec![
            line("X1", "P1", "PAYED"),
            line("X2", "P2", "PAYED"),
            line("X3", "P3", "PAYED"),
            line("X4", "P4", "PAYED"),
        ];
        lines[0].product_name = Some("Blue ABC mug".to_string());
        lines[1].product_option = Some("size abc".to_string());
        lines[2].buyer_name = Some("aBc Kim".to_string());

        let criteria = FilterCriteria::new("", "abc");
        let hits: Vec<_> = filter(&lines, &criteria)
            .iter()
            .map(|l| l.order_id().to_string())
            .collect();
        assert_eq!(hits, vec!["X1", "X2", "X3"]);
    }

    #[test]
    fn search_is_trimmed_and_empty_matches_all() {
        let lines = vec![line("X1", "P1", "PAYED"), line("X2", "P2", "DELIVERING")];
        assert_eq!(filter(&lines, &FilterCriteria::default()).len(), 2);
        assert_eq!(filter(&lines, &FilterCriteria::new("", "   ")).len(), 2);
        assert_eq!(filter(&lines, &FilterCriteria::new("", " x2 ")).len(), 1);
    }

    #[test]
    fn status_filter_is_exact_on_raw_code() {
        let lines = vec![line("A", "1", "PAYED"), line("B", "2", "PAYMENT_WAITING")];
        let hits = filter(&lines, &FilterCriteria::new("PAYED", ""));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].order_id(), "A");
        // Labels are not matched.
        assert!(filter(&lines, &FilterCriteria::new("결제완료 (신규주문)", "")).is_empty());
    }

    #[test]
    fn filtering_drops_lines_inside_surviving_groups() {
        let lines = vec![line("A", "1", "PAYED"), line("A", "2", "CANCELED"), line("B", "3", "CANCELED")];
        let table = project(&lines, &FilterCriteria::new("PAYED", ""));
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].order_id(), "A");
        assert_eq!(table.rows[0].details.len(), 1);
        assert_eq!(table.rows[0].summary.product_summary, "상품 1");
    }

    #[test]
    fn no_matches_gives_empty_table() {
        let lines = vec![line("A", "1", "PAYED")];
        let table = project(&lines, &FilterCriteria::new("", "zzz"));
        assert!(table.is_empty());
        assert!(project(&[], &FilterCriteria::default()).is_empty());
    }

    #[test]
    fn missing_fields_render_blank() {
        let lines = vec![OrderLine { order_id: Some("A".to_string()), ..Default::default() }];
        let table = project(&lines, &FilterCriteria::default());
        let summary = &table.rows[0].summary;
        assert_eq!(summary.order_date, "");
        assert_eq!(summary.buyer_name, "");
        assert_eq!(summary.status_label, "");
        assert_eq!(summary.status_class, StatusClass::Default);
        assert_eq!(summary.total_quantity, 0);
    }

    #[test]
    fn status_options_are_distinct_and_sorted() {
        let lines = vec![
            line("A", "1", "PAYED"),
            line("B", "2", "DELIVERING"),
            line("C", "3", "PAYED"),
            line("D", "4", ""),
        ];
        let options = status_options(&lines);
        let codes: Vec<_> = options.iter().map(|o| o.code.as_str()).collect();
        assert_eq!(codes, vec!["DELIVERING", "PAYED"]);
        assert_eq!(options[0].label, "배송중");

        assert_eq!(reconcile_status("PAYED", &options), "PAYED");
        assert_eq!(reconcile_status("RETURNED", &options), "");
    }

    #[test]
    fn dates_are_shortened() {
        assert_eq!(format_order_date("2024-03-05T09:07:00.000+09:00"), "24-03-05 09:07");
        assert_eq!(format_order_date("2024-03-05T09:07:00"), "24-03-05 09:07");
        assert_eq!(format_order_date("N/A"), "N/A");
        assert_eq!(format_order_date(""), "");
    }
}

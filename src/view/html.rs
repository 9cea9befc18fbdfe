//! Dashboard markup. Class names and ids match the stylesheet of the web
//! dashboard, so the output can be dropped into that page as-is.

use crate::types::SyncProgress;
use crate::view::dashboard::{Dashboard, Screen};
use crate::view::projector::{DetailRow, OrderTable, StatusOption, SummaryRow};
use crate::view::status::ALL_STATUSES_LABEL;

pub const NO_RESULTS_TEXT: &str = "검색 결과가 없습니다.";
pub const ERROR_PREFIX: &str = "오류가 발생했습니다: ";

const COLGROUP: &str = concat!(
    "<colgroup>",
    "<col style=\"width: 50px;\">",
    "<col style=\"width: 140px;\">",
    "<col style=\"width: 220px;\">",
    "<col style=\"width: 110px;\">",
    "<col style=\"width: auto;\">",
    "<col style=\"width: 70px;\">",
    "<col style=\"width: 130px;\">",
    "</colgroup>",
);

const TABLE_HEAD: &str = concat!(
    "<thead><tr>",
    "<th></th>",
    "<th>주문일시</th>",
    "<th>주문번호</th>",
    "<th>상태</th>",
    "<th>상품명 / 옵션</th>",
    "<th>수량</th>",
    "<th>구매자</th>",
    "</tr></thead>",
);

/// Escape text for use in element content and double-quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Toolbar
// ---------------------------------------------------------------------------

pub fn render_status_filter(options: &[StatusOption], selected: &str) -> String {
    let mut html = String::from("<select id=\"statusFilter\">");
    html.push_str(&option_tag("", ALL_STATUSES_LABEL, selected.is_empty()));
    for opt in options {
        html.push_str(&option_tag(&opt.code, &opt.label, opt.code == selected));
    }
    html.push_str("</select>");
    html
}

fn option_tag(value: &str, label: &str, selected: bool) -> String {
    format!(
        "<option value=\"{}\"{}>{}</option>",
        escape(value),
        if selected { " selected" } else { "" },
        escape(label)
    )
}

fn render_toolbar(dash: &Dashboard) -> String {
    let mut html = String::from("<div class=\"toolbar\">");
    html.push_str(&render_status_filter(dash.status_options(), &dash.criteria().status));
    html.push_str(&format!(
        "<input type=\"text\" id=\"searchInput\" value=\"{}\">",
        escape(&dash.criteria().search)
    ));
    html.push_str(&format!(
        "<button id=\"refreshBtn\"{}>동기화</button>",
        if dash.sync_running() { " disabled" } else { "" }
    ));
    html.push_str(&format!(
        "<span id=\"lastSynced\">{}</span>",
        escape(dash.notice().unwrap_or(""))
    ));
    html.push_str("</div>");
    html
}

// ---------------------------------------------------------------------------
// List area
// ---------------------------------------------------------------------------

pub fn render_sync_progress(progress: Option<&SyncProgress>) -> String {
    let body = match progress {
        Some(p) => format!(
            "네이버와 동기화 중입니다...<br>구간: {}~{}일 전<br>진행률: {}%",
            p.offset_days, p.window_end_days, p.percent_complete
        ),
        None => "네이버와 동기화 중입니다...<br>진행률: 0%".to_string(),
    };
    format!("<div class=\"no-data\" id=\"syncProgress\">{body}</div>")
}

pub fn render_error(message: &str) -> String {
    format!("<div class=\"error\">{}{}</div>", ERROR_PREFIX, escape(message))
}

pub fn render_no_results() -> String {
    format!("<div class=\"no-data\">{NO_RESULTS_TEXT}</div>")
}

/// Two-level order table. `is_expanded` decides which detail rows are shown.
pub fn render_table(table: &OrderTable, is_expanded: impl Fn(&str) -> bool) -> String {
    let mut html = String::from("<table class=\"order-table\">");
    html.push_str(COLGROUP);
    html.push_str(TABLE_HEAD);
    html.push_str("<tbody>");
    for row in &table.rows {
        let expanded = is_expanded(row.order_id());
        html.push_str(&summary_tr(&row.summary, expanded));
        html.push_str(&details_tr(&row.summary.order_id, &row.details, expanded));
    }
    html.push_str("</tbody></table>");
    html
}

fn summary_tr(row: &SummaryRow, expanded: bool) -> String {
    format!(
        concat!(
            "<tr class=\"order-group-header{}\" data-order-id=\"{}\">",
            "<td><div class=\"toggle-container\"><span class=\"toggle-icon\"></span></div></td>",
            "<td>{}</td>",
            "<td>{}</td>",
            "<td><span class=\"status-badge {}\">{}</span></td>",
            "<td>{}</td>",
            "<td>{}</td>",
            "<td>{}</td>",
            "</tr>",
        ),
        if expanded { " expanded" } else { "" },
        escape(&row.order_id),
        escape(&row.order_date),
        escape(&row.order_id),
        row.status_class,
        escape(&row.status_label),
        escape(&row.product_summary),
        row.total_quantity,
        escape(&row.buyer_name),
    )
}

fn details_tr(order_id: &str, details: &[DetailRow], expanded: bool) -> String {
    let mut html = format!(
        "<tr class=\"order-group-details\" id=\"details-{}\" style=\"display: {};\">",
        escape(order_id),
        if expanded { "table-row" } else { "none" }
    );
    html.push_str("<td colspan=\"7\" style=\"padding: 0;\"><div class=\"detail-container\">");
    html.push_str("<table class=\"detail-table\" style=\"width: 100%; table-layout: fixed; margin: 0;\">");
    html.push_str(COLGROUP);
    html.push_str("<tbody>");
    for d in details {
        html.push_str(&format!(
            concat!(
                "<tr>",
                "<td style=\"color: #cbd5e1; text-align: center;\">└</td>",
                "<td></td>",
                "<td>{}</td>",
                "<td><span class=\"status-badge {}\">{}</span></td>",
                "<td style=\"text-align: center;\">",
                "<div style=\"font-weight: 500;\">{}</div>",
                "<div class=\"text-muted\" style=\"font-size: 0.85rem; margin-top: 2px;\">{}</div>",
                "</td>",
                "<td>{}</td>",
                "<td></td>",
                "</tr>",
            ),
            escape(&d.product_order_id),
            d.status_class,
            escape(&d.status_label),
            escape(&d.product_name),
            escape(&d.product_option),
            escape(&d.quantity),
        ));
    }
    html.push_str("</tbody></table></div></td></tr>");
    html
}

/// Contents of `#orderList` for the current screen. Loading renders nothing;
/// the page-level spinner covers it.
pub fn render_list(screen: Screen<'_>, is_expanded: impl Fn(&str) -> bool) -> String {
    match screen {
        Screen::Loading => String::new(),
        Screen::Syncing(progress) => render_sync_progress(progress),
        Screen::Error(message) => render_error(message),
        Screen::Empty => render_no_results(),
        Screen::Table(table) => render_table(table, is_expanded),
    }
}

/// Toolbar plus list area for the whole dashboard state.
pub fn render_dashboard(dash: &Dashboard) -> String {
    let loading = matches!(dash.screen(), Screen::Loading);
    format!(
        "{}<div id=\"loading\" class=\"loading{}\"></div><div id=\"orderList\">{}</div>",
        render_toolbar(dash),
        if loading { " active" } else { "" },
        render_list(dash.screen(), |id| dash.is_expanded(id)),
    )
}

/// Standalone document around a body fragment, for files written by the CLI.
pub fn render_page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"ko\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape(title),
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::OrderDeskSession;
    use crate::sync::ChunkPlan;
    use crate::types::OrderLine;
    use crate::view::projector::{project, FilterCriteria};
    use serde_json::json;

    fn line(order_id: &str, poid: &str, name: &str, option: Option<&str>) -> OrderLine {
        OrderLine {
            order_id: Some(order_id.to_string()),
            product_order_id: Some(poid.to_string()),
            order_date: Some("2024-01-02T03:04:00+09:00".to_string()),
            status: Some("PAYED".to_string()),
            buyer_name: Some("홍길동".to_string()),
            product_name: Some(name.to_string()),
            product_option: option.map(str::to_string),
            quantity: Some(json!("2")),
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<b>\"A&B\"</b>'"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;&#39;");
    }

    #[test]
    fn table_has_header_and_hidden_details() {
        let lines = vec![line("100", "P1", "머그컵", Some("화이트")), line("100", "P2", "접시", None)];
        let table = project(&lines, &FilterCriteria::default());
        let html = render_table(&table, |_| false);

        assert!(html.starts_with("<table class=\"order-table\"><colgroup>"));
        assert!(html.contains("<th>주문일시</th>"));
        assert!(html.contains("<tr class=\"order-group-header\" data-order-id=\"100\">"));
        assert!(html.contains("<td>24-01-02 03:04</td>"));
        assert!(html.contains("<span class=\"status-badge status-payed\">결제완료 (신규주문)</span>"));
        assert!(html.contains("<td>머그컵 외 1건</td>"));
        assert!(html.contains("<td>4</td>"));
        assert!(html.contains("id=\"details-100\" style=\"display: none;\""));
        assert!(html.contains(">화이트</div>"));
        assert!(html.contains(">옵션 없음</div>"));
    }

    #[test]
    fn expanded_group_shows_details() {
        let lines = vec![line("100", "P1", "머그컵", None), line("200", "P2", "접시", None)];
        let table = project(&lines, &FilterCriteria::default());
        let html = render_table(&table, |id| id == "200");

        assert!(html.contains("<tr class=\"order-group-header expanded\" data-order-id=\"200\">"));
        assert!(html.contains("id=\"details-200\" style=\"display: table-row;\""));
        assert!(html.contains("id=\"details-100\" style=\"display: none;\""));
        // Larger id first.
        assert!(html.find("details-200") < html.find("details-100"));
    }

    #[test]
    fn text_fields_are_escaped() {
        let lines = vec![line("1", "P1", "<script>", None)];
        let table = project(&lines, &FilterCriteria::default());
        let html = render_table(&table, |_| true);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn sync_progress_block() {
        let plan = ChunkPlan::new(90, 15);
        assert_eq!(
            render_sync_progress(Some(&plan.progress(1))),
            "<div class=\"no-data\" id=\"syncProgress\">네이버와 동기화 중입니다...<br>구간: 15~30일 전<br>진행률: 17%</div>"
        );
        assert!(render_sync_progress(None).contains("진행률: 0%"));
    }

    #[test]
    fn error_and_empty_blocks() {
        assert_eq!(render_error("a<b"), "<div class=\"error\">오류가 발생했습니다: a&lt;b</div>");
        assert_eq!(render_list(Screen::Empty, |_| false), "<div class=\"no-data\">검색 결과가 없습니다.</div>");
        assert_eq!(render_list(Screen::Loading, |_| false), "");
    }

    #[test]
    fn status_filter_marks_selection() {
        let options = vec![
            StatusOption { code: "DELIVERING".into(), label: "배송중".into() },
            StatusOption { code: "PAYED".into(), label: "결제완료 (신규주문)".into() },
        ];
        let html = render_status_filter(&options, "PAYED");
        assert!(html.starts_with("<select id=\"statusFilter\"><option value=\"\">전체 상태</option>"));
        assert!(html.contains("<option value=\"PAYED\" selected>결제완료 (신규주문)</option>"));
        assert!(html.contains("<option value=\"DELIVERING\">배송중</option>"));
    }

    #[test]
    fn dashboard_reflects_expanded_groups_and_notice() {
        let mut dash = Dashboard::new(90);
        let mut session = OrderDeskSession::in_memory();
        dash.on_orders_loaded(vec![line("100", "P1", "머그컵", None)], &mut session);
        dash.on_group_toggled("100");

        let html = render_dashboard(&dash);
        assert!(html.contains("order-group-header expanded"));
        assert!(html.contains("<button id=\"refreshBtn\">동기화</button>"));

        dash.on_sync_requested();
        let html = render_dashboard(&dash);
        assert!(html.contains("<button id=\"refreshBtn\" disabled>"));
        assert!(html.contains("id=\"syncProgress\""));

        dash.on_sync_finished(Ok(vec![]));
        let html = render_dashboard(&dash);
        assert!(html.contains("<span id=\"lastSynced\">최근 90일 동기화 완료!</span>"));
        assert!(html.contains(NO_RESULTS_TEXT));
    }

    #[test]
    fn page_wraps_body() {
        let page = render_page("주문 <목록>", "<p>x</p>");
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>주문 &lt;목록&gt;</title>"));
        assert!(page.contains("<p>x</p>"));
    }
}

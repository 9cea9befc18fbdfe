use std::time::{Duration, Instant};

use order_desk::config::{AUTO_SYNC_DELAY_MS, SYNC_NOTICE_SECS};
use order_desk::session::OrderDeskSession;
use order_desk::types::{OrderLine, SyncProgress};
use order_desk::view::{Command, Dashboard, FilterCriteria, Screen};

// ---------------------------------------------------------------------------
// Messages from background tasks
// ---------------------------------------------------------------------------

/// Results sent back to the UI loop by the load and sync tasks. Errors are
/// already turned into their display text.
#[derive(Debug)]
pub enum AppMsg {
    Loaded(Result<Vec<OrderLine>, String>),
    SyncProgress(SyncProgress),
    SyncFinished(Result<Vec<OrderLine>, String>),
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing into the search box; every keystroke re-filters.
    Search,
}

/// One line of the terminal table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibleRow {
    /// Group summary, by index into the projected table.
    Summary(usize),
    /// Detail line `.1` of group `.0`.
    Detail(usize, usize),
}

#[derive(Debug)]
pub struct AppState {
    pub dash: Dashboard,
    pub session: OrderDeskSession,
    pub input: InputMode,
    pub selected: usize,
    pub base_url: String,
    notice_until: Option<Instant>,
    auto_sync_at: Option<Instant>,
}

impl AppState {
    pub fn new(dash: Dashboard, session: OrderDeskSession, base_url: String) -> Self {
        Self {
            dash,
            session,
            input: InputMode::Normal,
            selected: 0,
            base_url,
            notice_until: None,
            auto_sync_at: None,
        }
    }

    /// Apply a background result. Returns what the runtime must start next.
    pub fn apply(&mut self, msg: AppMsg, now: Instant) -> Command {
        match msg {
            AppMsg::Loaded(Ok(orders)) => {
                if self.dash.on_orders_loaded(orders, &mut self.session) == Command::ScheduleAutoSync {
                    self.auto_sync_at = Some(now + Duration::from_millis(AUTO_SYNC_DELAY_MS));
                }
            }
            AppMsg::Loaded(Err(message)) => self.dash.on_load_failed(message),
            AppMsg::SyncProgress(progress) => self.dash.on_sync_progress(progress),
            AppMsg::SyncFinished(result) => {
                self.dash.on_sync_finished(result);
                if self.dash.notice().is_some() {
                    self.notice_until = Some(now + Duration::from_secs(SYNC_NOTICE_SECS));
                }
            }
        }
        self.clamp_selection();
        Command::None
    }

    /// Timers: the pending automatic sync and the notice expiry.
    pub fn tick(&mut self, now: Instant) -> Command {
        if self.notice_until.is_some_and(|t| now >= t) {
            self.notice_until = None;
            self.dash.clear_notice();
        }
        if self.auto_sync_at.is_some_and(|t| now >= t) {
            return self.request_sync();
        }
        Command::None
    }

    pub fn request_sync(&mut self) -> Command {
        self.auto_sync_at = None;
        self.dash.on_sync_requested()
    }

    pub fn auto_sync_pending(&self) -> bool {
        self.auto_sync_at.is_some()
    }

    // --- filter ----------------------------------------------------------

    /// Next status in the filter list, wrapping back to "all".
    pub fn cycle_status(&mut self) {
        let codes: Vec<&str> = std::iter::once("")
            .chain(self.dash.status_options().iter().map(|o| o.code.as_str()))
            .collect();
        let current = codes
            .iter()
            .position(|c| *c == self.dash.criteria().status)
            .unwrap_or(0);
        let next = codes[(current + 1) % codes.len()].to_string();
        let search = self.dash.criteria().search.clone();
        self.set_criteria(FilterCriteria::new(next, search));
    }

    pub fn push_search(&mut self, c: char) {
        let mut criteria = self.dash.criteria().clone();
        criteria.search.push(c);
        self.set_criteria(criteria);
    }

    pub fn pop_search(&mut self) {
        let mut criteria = self.dash.criteria().clone();
        if criteria.search.pop().is_some() {
            self.set_criteria(criteria);
        }
    }

    pub fn clear_search(&mut self) {
        let status = self.dash.criteria().status.clone();
        self.set_criteria(FilterCriteria::new(status, ""));
    }

    fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.dash.on_filter_changed(criteria);
        self.selected = 0;
    }

    // --- table -----------------------------------------------------------

    pub fn visible_rows(&self) -> Vec<VisibleRow> {
        let Screen::Table(table) = self.dash.screen() else {
            return Vec::new();
        };
        let mut rows = Vec::new();
        for (g, row) in table.rows.iter().enumerate() {
            rows.push(VisibleRow::Summary(g));
            if self.dash.is_expanded(row.order_id()) {
                rows.extend((0..row.details.len()).map(|d| VisibleRow::Detail(g, d)));
            }
        }
        rows
    }

    pub fn select_next(&mut self) {
        let max = self.visible_rows().len().saturating_sub(1);
        self.selected = (self.selected + 1).min(max);
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Expand or collapse the group under the cursor; the cursor stays on
    /// that group's summary line.
    pub fn toggle_selected(&mut self) {
        let rows = self.visible_rows();
        let group = match rows.get(self.selected) {
            Some(VisibleRow::Summary(g)) | Some(VisibleRow::Detail(g, _)) => *g,
            None => return,
        };
        let Some(order_id) = self.dash.table().rows.get(group).map(|r| r.order_id().to_string()) else {
            return;
        };
        self.dash.on_group_toggled(&order_id);
        self.selected = self
            .visible_rows()
            .iter()
            .position(|r| *r == VisibleRow::Summary(group))
            .unwrap_or(0);
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_rows().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// `3/6` for the chunk about to be requested.
pub fn chunk_label(progress: &SyncProgress) -> String {
    format!("{}/{}", progress.chunk_index + 1, progress.chunk_count)
}

/// Cut to `max` characters, marking the cut with an ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

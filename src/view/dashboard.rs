use std::collections::HashSet;

use crate::session::OrderDeskSession;
use crate::types::{OrderLine, SyncProgress};
use crate::view::projector::{project, reconcile_status, status_options, FilterCriteria, OrderTable, StatusOption};

// ---------------------------------------------------------------------------
// Commands and screens
// ---------------------------------------------------------------------------

/// What the runtime must do after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    None,
    /// Spawn the sync driver now.
    StartSync,
    /// First load of the session: request a sync after the auto-sync delay.
    ScheduleAutoSync,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Loading,
    Syncing(Option<SyncProgress>),
    Ready,
    Failed(String),
}

/// What the list area should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen<'a> {
    Loading,
    Syncing(Option<&'a SyncProgress>),
    Error(&'a str),
    /// No line survived the filter.
    Empty,
    Table(&'a OrderTable),
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// All mutable state of the order view.
///
/// Handlers take an event, update the state, and return a `Command`; `screen()`
/// turns the state into render instructions. Every re-projection of the list
/// (new data or a filter change) collapses all groups.
#[derive(Debug)]
pub struct Dashboard {
    orders: Vec<OrderLine>,
    criteria: FilterCriteria,
    status_options: Vec<StatusOption>,
    table: OrderTable,
    expanded: HashSet<String>,
    phase: Phase,
    notice: Option<String>,
    sync_running: bool,
    sync_total_days: u32,
}

impl Dashboard {
    pub fn new(sync_total_days: u32) -> Self {
        Self {
            orders: Vec::new(),
            criteria: FilterCriteria::default(),
            status_options: Vec::new(),
            table: OrderTable::default(),
            expanded: HashSet::new(),
            phase: Phase::Loading,
            notice: None,
            sync_running: false,
            sync_total_days,
        }
    }

    // --- loading ---------------------------------------------------------

    pub fn on_load_started(&mut self) {
        self.phase = Phase::Loading;
    }

    /// Cached list arrived. The first successful load of a session asks for
    /// the automatic sync. A running sync keeps its progress view.
    pub fn on_orders_loaded(&mut self, orders: Vec<OrderLine>, session: &mut OrderDeskSession) -> Command {
        self.replace_orders(orders);
        if !self.sync_running {
            self.phase = Phase::Ready;
        }
        if session.claim_auto_sync() {
            Command::ScheduleAutoSync
        } else {
            Command::None
        }
    }

    pub fn on_load_failed(&mut self, message: impl Into<String>) {
        if !self.sync_running {
            self.phase = Phase::Failed(message.into());
        }
    }

    // --- sync ------------------------------------------------------------

    /// Manual or automatic sync trigger. Refused while a sync is running.
    pub fn on_sync_requested(&mut self) -> Command {
        if self.sync_running {
            return Command::None;
        }
        self.sync_running = true;
        self.notice = None;
        self.phase = Phase::Syncing(None);
        Command::StartSync
    }

    pub fn on_sync_progress(&mut self, progress: SyncProgress) {
        if self.sync_running {
            self.phase = Phase::Syncing(Some(progress));
        }
    }

    /// `Ok` carries the reloaded cache; `Err` the user-facing message.
    pub fn on_sync_finished(&mut self, result: std::result::Result<Vec<OrderLine>, String>) {
        self.sync_running = false;
        match result {
            Ok(orders) => {
                self.replace_orders(orders);
                self.phase = Phase::Ready;
                self.notice = Some(format!("최근 {}일 동기화 완료!", self.sync_total_days));
            }
            Err(message) => self.phase = Phase::Failed(message),
        }
    }

    // --- view ------------------------------------------------------------

    pub fn on_filter_changed(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.rerender();
    }

    /// Flip one group between collapsed and expanded. Returns the new state;
    /// unknown order ids stay collapsed.
    pub fn on_group_toggled(&mut self, order_id: &str) -> bool {
        if !self.table.rows.iter().any(|r| r.order_id() == order_id) {
            return false;
        }
        if self.expanded.remove(order_id) {
            false
        } else {
            self.expanded.insert(order_id.to_string());
            true
        }
    }

    pub fn is_expanded(&self, order_id: &str) -> bool {
        self.expanded.contains(order_id)
    }

    pub fn screen(&self) -> Screen<'_> {
        match &self.phase {
            Phase::Loading => Screen::Loading,
            Phase::Syncing(progress) => Screen::Syncing(progress.as_ref()),
            Phase::Failed(message) => Screen::Error(message),
            Phase::Ready if self.table.is_empty() => Screen::Empty,
            Phase::Ready => Screen::Table(&self.table),
        }
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    pub fn sync_running(&self) -> bool {
        self.sync_running
    }

    pub fn orders(&self) -> &[OrderLine] {
        &self.orders
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn status_options(&self) -> &[StatusOption] {
        &self.status_options
    }

    pub fn table(&self) -> &OrderTable {
        &self.table
    }

    fn replace_orders(&mut self, orders: Vec<OrderLine>) {
        self.orders = orders;
        self.status_options = status_options(&self.orders);
        self.criteria.status = reconcile_status(&self.criteria.status, &self.status_options);
        self.rerender();
    }

    fn rerender(&mut self) {
        self.table = project(&self.orders, &self.criteria);
        self.expanded.clear();
    }
}

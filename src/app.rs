use std::cmp::min;

use crossbeam_channel::{Receiver, Sender};
use log::debug;

use crate::api::{ApiRequest, ApiResponse, pages_count};
use crate::session::SessionStore;
use crate::state::{Action, UserRow, ViewState, reduce};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Name,
    Age,
}

/// Working copy of the row being edited in the modal. Field values are text
/// buffers; nothing is written back to `ViewState.data` (save is a stub).
#[derive(Debug, Clone)]
pub struct EditBuffer {
    pub id: i64,
    pub name: String,
    pub age: String,
    pub field: EditField,
    pub cursor: usize,
}

impl EditBuffer {
    fn from_row(row: &UserRow) -> Self {
        let name = row.name.clone();
        let cursor = name.len();
        Self {
            id: row.id,
            name,
            age: row.age.to_string(),
            field: EditField::Name,
            cursor,
        }
    }

    pub fn active(&self) -> &str {
        match self.field {
            EditField::Name => &self.name,
            EditField::Age => &self.age,
        }
    }

    fn active_mut(&mut self) -> &mut String {
        match self.field {
            EditField::Name => &mut self.name,
            EditField::Age => &mut self.age,
        }
    }
}

pub struct App {
    pub should_quit: bool,
    pub status: String,

    /// The grid's complete view-state; only `dispatch` replaces it.
    pub state: ViewState,

    /// Some = modal open. Independent of the grid's state machine.
    pub edit: Option<EditBuffer>,

    // Cell selection (indices into the rendered, sorted page)
    pub sel_row: usize,
    pub sel_col: usize,

    session: SessionStore,
    /// Sequence token of the most recently dispatched load; older responses
    /// are stale and dropped.
    latest_seq: u64,

    pub req_tx: Sender<ApiRequest>,
    pub resp_rx: Receiver<ApiResponse>,
}

impl App {
    pub fn new(
        session: SessionStore,
        req_tx: Sender<ApiRequest>,
        resp_rx: Receiver<ApiResponse>,
    ) -> Self {
        let state = session.restore_or(ViewState::initial());
        Self {
            should_quit: false,
            status: "Press q to quit. e to edit row. PgUp/PgDn to paginate.".into(),
            state,
            edit: None,
            sel_row: 0,
            sel_col: 0,
            session,
            latest_seq: 0,
            req_tx,
            resp_rx,
        }
    }

    /// Reduce, persist, then run the controller effects the action implies.
    pub fn dispatch(&mut self, action: Action) {
        self.state = reduce(self.state.clone(), &action);
        self.session.persist(&self.state);

        match action {
            Action::LoadData => {
                self.dispatch(Action::SetLoading(true));
                self.latest_seq += 1;
                let _ = self.req_tx.send(ApiRequest::FetchPage {
                    seq: self.latest_seq,
                    page_index: self.state.paging.page_index,
                    page_size: self.state.paging.page_size,
                });
                self.status = "Loading users...".into();
            }
            Action::UpdatePageIndex(_) | Action::UpdatePageSize(_) => {
                // Paging changes never fetch directly; they queue one reload
                self.dispatch(Action::SetSingleAction(Some(Box::new(Action::LoadData))));
            }
            _ => {}
        }
    }

    /// Execute the queued one-shot action, clearing it first so it runs once.
    /// Returns true when something ran.
    pub fn run_pending_action(&mut self) -> bool {
        let Some(action) = self.state.single_action.clone() else {
            return false;
        };
        self.dispatch(Action::SetSingleAction(None));
        self.dispatch(action);
        true
    }

    pub fn handle_api_response(&mut self, resp: ApiResponse) {
        match resp {
            ApiResponse::Page {
                seq,
                rows,
                total_count,
            } => {
                if seq != self.latest_seq {
                    debug!("dropping stale response {seq} (latest {})", self.latest_seq);
                    return;
                }
                let pages = pages_count(total_count, self.state.paging.page_size);
                self.dispatch(Action::UpdatePagesCount(pages));
                if pages > 0 && self.state.paging.page_index >= pages {
                    // Keep the page window inside the known row count; this
                    // queues one corrective reload
                    self.dispatch(Action::UpdatePageIndex(pages - 1));
                }
                self.dispatch(Action::UpdateData(rows));
                self.dispatch(Action::SetLoading(false));
                self.clamp_selection();
                self.status = format!(
                    "Page {} of {} ({} rows/page, {} users total)",
                    self.state.paging.page_index + 1,
                    pages,
                    self.state.paging.page_size,
                    total_count
                );
            }
            ApiResponse::Failed { seq, message } => {
                if seq != self.latest_seq {
                    debug!("dropping stale failure {seq} (latest {})", self.latest_seq);
                    return;
                }
                // Uniform policy: empty page, loading cleared, pages_count kept
                self.dispatch(Action::UpdateData(vec![]));
                self.dispatch(Action::SetLoading(false));
                self.clamp_selection();
                self.status = format!("Load failed: {message}");
            }
        }
    }

    fn clamp_selection(&mut self) {
        self.sel_row = self.sel_row.min(self.state.data.len().saturating_sub(1));
        self.sel_col = self.sel_col.min(self.state.columns.len().saturating_sub(1));
    }

    // Paging

    pub fn next_page(&mut self) {
        let idx = self.state.paging.page_index;
        if let Some(pages) = self.state.paging.pages_count
            && idx + 1 >= pages
        {
            self.status = "Already on the last page".into();
            return;
        }
        self.dispatch(Action::UpdatePageIndex(idx + 1));
    }

    pub fn prev_page(&mut self) {
        let idx = self.state.paging.page_index;
        if idx == 0 {
            self.status = "Already on the first page".into();
            return;
        }
        self.dispatch(Action::UpdatePageIndex(idx - 1));
    }

    pub fn cycle_page_size(&mut self) {
        if let Some(size) = self.state.next_page_size() {
            self.dispatch(Action::UpdatePageSize(size));
            self.status = format!("Page size: {size}");
        }
    }

    pub fn reload(&mut self) {
        self.dispatch(Action::LoadData);
    }

    // Sorting

    pub fn sort_on_selected_column(&mut self) {
        let Some(key) = self.state.columns.get(self.sel_col).map(|c| c.key.clone()) else {
            return;
        };
        self.dispatch(Action::UpdateSortDirection { column_key: key });
    }

    // Cell selection

    pub fn move_cell_up(&mut self) {
        self.sel_row = self.sel_row.saturating_sub(1);
    }

    pub fn move_cell_down(&mut self) {
        let last = self.state.data.len().saturating_sub(1);
        self.sel_row = min(self.sel_row + 1, last);
    }

    pub fn move_cell_left(&mut self) {
        self.sel_col = self.sel_col.saturating_sub(1);
    }

    pub fn move_cell_right(&mut self) {
        let last = self.state.columns.len().saturating_sub(1);
        self.sel_col = min(self.sel_col + 1, last);
    }

    // Edit modal

    pub fn open_edit(&mut self) {
        // Selection indexes the rendered (sorted) page
        let rows = self.state.sorted_data();
        let Some(row) = rows.get(self.sel_row) else {
            self.status = "No row selected to edit".into();
            return;
        };
        self.edit = Some(EditBuffer::from_row(row));
        self.status = format!("Editing user {} (Esc to cancel)", row.id);
    }

    pub fn cancel_edit(&mut self) {
        self.edit = None;
        self.status = "Edit cancelled".into();
    }

    // TODO: commit the buffer once the backend exposes a write endpoint;
    // the /users collection is currently read-only.
    pub fn save_edit(&mut self) {
        if self.edit.is_some() {
            self.status = "Save is not implemented yet".into();
        }
    }

    pub fn edit_switch_field(&mut self) {
        if let Some(buf) = self.edit.as_mut() {
            buf.field = match buf.field {
                EditField::Name => EditField::Age,
                EditField::Age => EditField::Name,
            };
            buf.cursor = buf.active().len();
        }
    }

    pub fn edit_insert(&mut self, ch: char) {
        if let Some(buf) = self.edit.as_mut() {
            let cursor = buf.cursor;
            buf.active_mut().insert(cursor, ch);
            buf.cursor += ch.len_utf8();
        }
    }

    pub fn edit_backspace(&mut self) {
        if let Some(buf) = self.edit.as_mut()
            && buf.cursor > 0
        {
            let new_cursor = prev_char(buf.active(), buf.cursor);
            let cursor = buf.cursor;
            buf.active_mut().drain(new_cursor..cursor);
            buf.cursor = new_cursor;
        }
    }

    pub fn edit_delete(&mut self) {
        if let Some(buf) = self.edit.as_mut()
            && buf.cursor < buf.active().len()
        {
            let next = next_char(buf.active(), buf.cursor);
            let cursor = buf.cursor;
            buf.active_mut().drain(cursor..next);
        }
    }

    pub fn edit_left(&mut self) {
        if let Some(buf) = self.edit.as_mut() {
            buf.cursor = prev_char(buf.active(), buf.cursor);
        }
    }

    pub fn edit_right(&mut self) {
        if let Some(buf) = self.edit.as_mut() {
            buf.cursor = next_char(buf.active(), buf.cursor);
        }
    }

    pub fn edit_home(&mut self) {
        if let Some(buf) = self.edit.as_mut() {
            buf.cursor = 0;
        }
    }

    pub fn edit_end(&mut self) {
        if let Some(buf) = self.edit.as_mut() {
            buf.cursor = buf.active().len();
        }
    }
}

fn prev_char(s: &str, idx: usize) -> usize {
    s[..idx].char_indices().next_back().map_or(0, |(i, _)| i)
}

fn next_char(s: &str, idx: usize) -> usize {
    s[idx..]
        .chars()
        .next()
        .map_or(s.len(), |c| idx + c.len_utf8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemBackend, STATE_KEY};

    fn test_app() -> (App, Receiver<ApiRequest>, Sender<ApiResponse>) {
        let (req_tx, req_rx) = crossbeam_channel::unbounded();
        let (resp_tx, resp_rx) = crossbeam_channel::unbounded();
        let session = SessionStore::new(Box::new(MemBackend::new()), STATE_KEY);
        let mut app = App::new(session, req_tx, resp_rx);
        // The initial state queues a first load; drop it so each test controls
        // exactly which loads fire
        app.dispatch(Action::SetSingleAction(None));
        (app, req_rx, resp_tx)
    }

    fn rows(n: usize) -> Vec<UserRow> {
        (0..n)
            .map(|i| UserRow {
                id: i as i64 + 1,
                name: format!("user-{i}"),
                age: 20 + i as i64,
            })
            .collect()
    }

    #[test]
    fn page_index_change_triggers_exactly_one_load() {
        let (mut app, req_rx, _resp_tx) = test_app();

        app.dispatch(Action::UpdatePageIndex(2));
        assert_eq!(app.state.single_action, Some(Action::LoadData));
        assert!(
            req_rx.try_recv().is_err(),
            "no request before the view runs it"
        );

        assert!(app.run_pending_action());
        assert!(app.state.loading);
        match req_rx.try_recv().unwrap() {
            ApiRequest::FetchPage {
                page_index,
                page_size,
                ..
            } => {
                assert_eq!(page_index, 2);
                assert_eq!(page_size, 10);
            }
        }
        // Cleared after one execution: no second load
        assert!(!app.run_pending_action());
        assert!(req_rx.try_recv().is_err());
    }

    #[test]
    fn page_size_change_reloads_preserving_page_index() {
        let (mut app, req_rx, _resp_tx) = test_app();
        app.dispatch(Action::UpdatePageIndex(2));
        app.run_pending_action();
        let _ = req_rx.try_recv();

        app.dispatch(Action::UpdatePageSize(5));
        app.run_pending_action();
        match req_rx.try_recv().unwrap() {
            ApiRequest::FetchPage {
                page_index,
                page_size,
                ..
            } => {
                assert_eq!(page_index, 2);
                assert_eq!(page_size, 5);
            }
        }
        assert!(req_rx.try_recv().is_err());
    }

    #[test]
    fn successful_page_applies_count_data_and_clears_loading() {
        let (mut app, req_rx, _resp_tx) = test_app();
        app.dispatch(Action::LoadData);
        assert!(app.state.loading);
        let _ = req_rx.try_recv();

        app.handle_api_response(ApiResponse::Page {
            seq: 1,
            rows: rows(10),
            total_count: 23,
        });
        assert_eq!(app.state.paging.pages_count, Some(3));
        assert_eq!(app.state.data.len(), 10);
        assert!(!app.state.loading);
    }

    #[test]
    fn stale_response_is_discarded() {
        let (mut app, _req_rx, _resp_tx) = test_app();
        app.dispatch(Action::LoadData); // seq 1
        app.dispatch(Action::LoadData); // seq 2

        app.handle_api_response(ApiResponse::Page {
            seq: 1,
            rows: rows(3),
            total_count: 3,
        });
        assert!(app.state.loading, "stale response must not clear loading");
        assert!(app.state.data.is_empty());

        app.handle_api_response(ApiResponse::Page {
            seq: 2,
            rows: rows(5),
            total_count: 5,
        });
        assert_eq!(app.state.data.len(), 5);
        assert!(!app.state.loading);
    }

    #[test]
    fn failure_clears_data_and_keeps_pages_count() {
        let (mut app, _req_rx, _resp_tx) = test_app();
        app.dispatch(Action::LoadData);
        app.handle_api_response(ApiResponse::Page {
            seq: 1,
            rows: rows(10),
            total_count: 23,
        });

        app.dispatch(Action::LoadData);
        app.handle_api_response(ApiResponse::Failed {
            seq: 2,
            message: "connection refused".into(),
        });
        assert!(app.state.data.is_empty());
        assert!(!app.state.loading);
        assert_eq!(app.state.paging.pages_count, Some(3));
    }

    #[test]
    fn out_of_range_page_index_is_clamped_with_one_reload_queued() {
        let (mut app, _req_rx, _resp_tx) = test_app();
        app.dispatch(Action::UpdatePageIndex(5));
        app.run_pending_action();

        app.handle_api_response(ApiResponse::Page {
            seq: 1,
            rows: vec![],
            total_count: 23,
        });
        assert_eq!(app.state.paging.page_index, 2);
        assert_eq!(app.state.single_action, Some(Action::LoadData));
    }

    #[test]
    fn edit_then_cancel_leaves_row_and_grid_unchanged() {
        let (mut app, _req_rx, _resp_tx) = test_app();
        app.dispatch(Action::UpdateData(vec![UserRow {
            id: 7,
            name: "Ann".into(),
            age: 30,
        }]));
        let before = app.state.clone();

        app.open_edit();
        assert_eq!(app.edit.as_ref().unwrap().id, 7);
        app.edit_insert('e');
        app.edit_switch_field();
        app.edit_backspace();
        app.edit_insert('5');
        app.cancel_edit();

        assert!(app.edit.is_none());
        assert_eq!(app.state, before);
    }

    #[test]
    fn age_field_receives_typed_characters() {
        let (mut app, _req_rx, _resp_tx) = test_app();
        app.dispatch(Action::UpdateData(vec![UserRow {
            id: 7,
            name: "Ann".into(),
            age: 30,
        }]));

        app.open_edit();
        app.edit_switch_field();
        app.edit_insert('4');
        app.edit_insert('2');
        assert_eq!(app.edit.as_ref().unwrap().age, "3042");
    }

    #[test]
    fn save_is_a_stub_that_keeps_the_modal_open() {
        let (mut app, _req_rx, _resp_tx) = test_app();
        app.dispatch(Action::UpdateData(rows(1)));
        app.open_edit();
        app.save_edit();
        assert!(app.edit.is_some());
    }

    #[test]
    fn edit_cursor_moves_within_the_active_field() {
        let (mut app, _req_rx, _resp_tx) = test_app();
        app.dispatch(Action::UpdateData(vec![UserRow {
            id: 1,
            name: "Ann".into(),
            age: 30,
        }]));
        app.open_edit();

        app.edit_home();
        app.edit_insert('J');
        assert_eq!(app.edit.as_ref().unwrap().name, "JAnn");
        app.edit_right();
        app.edit_delete();
        assert_eq!(app.edit.as_ref().unwrap().name, "JAn");
        app.edit_end();
        app.edit_backspace();
        assert_eq!(app.edit.as_ref().unwrap().name, "JA");
    }
}

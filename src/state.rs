use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Number,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascend,
    Descend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortingMode {
    None,
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PagingPosition {
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub key: String,
    pub title: String,
    pub data_type: DataType,
    /// Optional fixed width hint for rendering; columns without one share the rest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u16>,
    /// Active sort on this column; at most one column carries it in Single mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_direction: Option<SortDirection>,
}

impl Column {
    fn new(key: &str, title: &str, data_type: DataType) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            data_type,
            width: None,
            sort_direction: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub age: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paging {
    pub enabled: bool,
    /// Zero-based; the upstream API takes a 1-based page parameter.
    pub page_index: usize,
    pub page_size: usize,
    /// Allowed page sizes; `UpdatePageSize` ignores values outside this set.
    pub page_sizes: Vec<usize>,
    /// None until the first successful load reports a total count.
    pub pages_count: Option<usize>,
    pub position: PagingPosition,
}

/// Everything the grid renders from. Persisted whole to the session store;
/// `loading` is transient and restores as false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub columns: Vec<Column>,
    pub data: Vec<UserRow>,
    pub paging: Paging,
    pub sorting_mode: SortingMode,
    #[serde(skip)]
    pub loading: bool,
    /// One-shot action: the event loop executes it once, then clears it.
    pub single_action: Option<Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Marker consumed by the controller; the reducer passes state through.
    LoadData,
    SetLoading(bool),
    UpdateData(Vec<UserRow>),
    UpdatePagesCount(usize),
    UpdatePageIndex(usize),
    UpdatePageSize(usize),
    UpdateSortDirection { column_key: String },
    SetSingleAction(Option<Box<Action>>),
}

/// Pure state transition: no I/O, no channels. The controller wraps this and
/// sequences the side effects around it.
pub fn reduce(mut state: ViewState, action: &Action) -> ViewState {
    match action {
        Action::LoadData => {}
        Action::SetLoading(flag) => state.loading = *flag,
        Action::UpdateData(rows) => state.data = rows.clone(),
        Action::UpdatePagesCount(n) => state.paging.pages_count = Some(*n),
        Action::UpdatePageIndex(i) => state.paging.page_index = *i,
        Action::UpdatePageSize(s) => {
            if state.paging.page_sizes.contains(s) {
                state.paging.page_size = *s;
            }
        }
        Action::UpdateSortDirection { column_key } => {
            for col in &mut state.columns {
                if col.key == *column_key {
                    col.sort_direction = match col.sort_direction {
                        Some(SortDirection::Ascend) => Some(SortDirection::Descend),
                        _ => Some(SortDirection::Ascend),
                    };
                } else {
                    // Single-column mode: any other active sort is dropped
                    col.sort_direction = None;
                }
            }
        }
        Action::SetSingleAction(next) => {
            state.single_action = next.clone().map(|boxed| *boxed);
        }
    }
    state
}

impl ViewState {
    pub fn initial() -> Self {
        Self {
            columns: vec![
                Column::new("id", "Uid", DataType::Number),
                Column::new("name", "Name", DataType::Text),
                Column::new("age", "Age", DataType::Number),
            ],
            data: vec![],
            paging: Paging {
                enabled: true,
                page_index: 0,
                page_size: 10,
                page_sizes: vec![5, 10, 15],
                pages_count: None,
                position: PagingPosition::Bottom,
            },
            sorting_mode: SortingMode::Single,
            loading: false,
            // Kick off the first load as soon as the event loop runs
            single_action: Some(Action::LoadData),
        }
    }

    pub fn sorted_column(&self) -> Option<(&Column, SortDirection)> {
        if self.sorting_mode == SortingMode::None {
            return None;
        }
        self.columns
            .iter()
            .find_map(|c| c.sort_direction.map(|d| (c, d)))
    }

    /// Current page, ordered per the active sort column. The grid sorts
    /// client-side within the page only; the server defines page membership.
    pub fn sorted_data(&self) -> Vec<UserRow> {
        let mut rows = self.data.clone();
        if let Some((col, dir)) = self.sorted_column() {
            match col.key.as_str() {
                "id" => rows.sort_by_key(|r| r.id),
                "age" => rows.sort_by_key(|r| r.age),
                "name" => rows.sort_by(|a, b| a.name.cmp(&b.name)),
                _ => {}
            }
            if dir == SortDirection::Descend {
                rows.reverse();
            }
        }
        rows
    }

    /// Next allowed page size after the current one, wrapping around.
    pub fn next_page_size(&self) -> Option<usize> {
        let sizes = &self.paging.page_sizes;
        if sizes.is_empty() {
            return None;
        }
        let pos = sizes.iter().position(|&s| s == self.paging.page_size);
        let next = match pos {
            Some(i) => sizes[(i + 1) % sizes.len()],
            None => sizes[0],
        };
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, name: &str, age: i64) -> UserRow {
        UserRow {
            id,
            name: name.to_string(),
            age,
        }
    }

    #[test]
    fn set_loading_toggles_flag_only() {
        let state = ViewState::initial();
        let next = reduce(state.clone(), &Action::SetLoading(true));
        assert!(next.loading);
        assert_eq!(next.data, state.data);
        assert_eq!(next.paging, state.paging);
        let back = reduce(next, &Action::SetLoading(false));
        assert!(!back.loading);
    }

    #[test]
    fn update_data_replaces_rows_wholesale() {
        let mut state = ViewState::initial();
        state.data = vec![row(1, "Old", 99)];
        let next = reduce(
            state,
            &Action::UpdateData(vec![row(7, "Ann", 30), row(8, "Bo", 41)]),
        );
        assert_eq!(next.data.len(), 2);
        assert_eq!(next.data[0].id, 7);
    }

    #[test]
    fn update_pages_count_sets_paging() {
        let next = reduce(ViewState::initial(), &Action::UpdatePagesCount(3));
        assert_eq!(next.paging.pages_count, Some(3));
    }

    #[test]
    fn update_page_index_does_not_reload_by_itself() {
        let mut state = ViewState::initial();
        state.single_action = None;
        let next = reduce(state, &Action::UpdatePageIndex(2));
        assert_eq!(next.paging.page_index, 2);
        assert_eq!(next.single_action, None);
    }

    #[test]
    fn update_page_size_rejects_values_outside_allowed_set() {
        let state = ViewState::initial();
        let next = reduce(state.clone(), &Action::UpdatePageSize(7));
        assert_eq!(next.paging.page_size, state.paging.page_size);
        let next = reduce(next, &Action::UpdatePageSize(5));
        assert_eq!(next.paging.page_size, 5);
    }

    #[test]
    fn set_single_action_sets_and_clears() {
        let state = ViewState::initial();
        let next = reduce(
            state,
            &Action::SetSingleAction(Some(Box::new(Action::LoadData))),
        );
        assert_eq!(next.single_action, Some(Action::LoadData));
        let next = reduce(next, &Action::SetSingleAction(None));
        assert_eq!(next.single_action, None);
    }

    #[test]
    fn load_data_is_a_no_op_for_the_reducer() {
        let state = ViewState::initial();
        let next = reduce(state.clone(), &Action::LoadData);
        assert_eq!(next, state);
    }

    #[test]
    fn sort_direction_cycles_and_stays_single_column() {
        let state = ViewState::initial();
        let sort_age = Action::UpdateSortDirection {
            column_key: "age".to_string(),
        };
        let next = reduce(state, &sort_age);
        let (col, dir) = next.sorted_column().unwrap();
        assert_eq!(col.key, "age");
        assert_eq!(dir, SortDirection::Ascend);

        let next = reduce(next, &sort_age);
        assert_eq!(next.sorted_column().unwrap().1, SortDirection::Descend);

        let next = reduce(
            next,
            &Action::UpdateSortDirection {
                column_key: "name".to_string(),
            },
        );
        let (col, dir) = next.sorted_column().unwrap();
        assert_eq!(col.key, "name");
        assert_eq!(dir, SortDirection::Ascend);
        // old column lost its direction
        let age = next.columns.iter().find(|c| c.key == "age").unwrap();
        assert_eq!(age.sort_direction, None);
    }

    #[test]
    fn sorted_data_orders_current_page_only() {
        let mut state = ViewState::initial();
        state.data = vec![row(2, "Bo", 41), row(1, "Ann", 30), row(3, "Cy", 22)];
        let state = reduce(
            state,
            &Action::UpdateSortDirection {
                column_key: "age".to_string(),
            },
        );
        let ages: Vec<i64> = state.sorted_data().iter().map(|r| r.age).collect();
        assert_eq!(ages, vec![22, 30, 41]);
        // underlying data untouched
        assert_eq!(state.data[0].id, 2);
    }

    #[test]
    fn next_page_size_cycles_through_allowed_set() {
        let mut state = ViewState::initial();
        assert_eq!(state.next_page_size(), Some(15));
        state.paging.page_size = 15;
        assert_eq!(state.next_page_size(), Some(5));
    }

    #[test]
    fn state_round_trips_through_json_with_loading_reset() {
        let mut state = ViewState::initial();
        state.data = vec![row(7, "Ann", 30)];
        state.paging.page_index = 2;
        state.paging.pages_count = Some(5);
        state.loading = true;

        let text = serde_json::to_string(&state).unwrap();
        let restored: ViewState = serde_json::from_str(&text).unwrap();
        assert!(!restored.loading);
        let mut expected = state;
        expected.loading = false;
        assert_eq!(restored, expected);
    }
}

//! A table of editable rows kept in map state.
//!
//! The component below holds its rows in a `use_map_as_state` map and a
//! "select all" flag in a plain state slot. Each test drives it like a user
//! would: call an event handler, let the runtime commit, render again.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use mapstate::hooks::{UseMapAsState, use_map_as_state};
use mapstate::persistent::PersistentOrderedMap;
use mapstate::runtime::{LocalState, Runtime, Scope};
use mapstate::state::StateSlot;
use rstest::{fixture, rstest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowStatus {
    Ready,
    Editing,
    Saving,
    Deleting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TableRow {
    id: u64,
    text: String,
    status: RowStatus,
    checked: bool,
}

impl TableRow {
    fn new(id: u64) -> Self {
        Self {
            id,
            text: "TestString".to_string(),
            status: RowStatus::Ready,
            checked: false,
        }
    }
}

/// Hands out row ids; shared by every render so ids never repeat.
#[derive(Clone, Default)]
struct IdSource(Rc<Cell<u64>>);

impl IdSource {
    fn rows(&self, count: usize) -> Vec<TableRow> {
        (0..count)
            .map(|_| {
                let id = self.0.get() + 1;
                self.0.set(id);
                TableRow::new(id)
            })
            .collect()
    }
}

/// What one render of the table produces.
struct Table {
    rows: UseMapAsState<u64, TableRow>,
    select_all: LocalState<bool>,
    ids: IdSource,
    text_changes: Rc<RefCell<Vec<String>>>,
}

impl Table {
    fn render(scope: &Scope, ids: &IdSource, text_changes: &Rc<RefCell<Vec<String>>>) -> Self {
        let rows = use_map_as_state(scope, || {
            ids.rows(50)
                .into_iter()
                .map(|row| (row.id, row))
                .collect::<PersistentOrderedMap<_, _>>()
        });
        let select_all = scope.use_hook(|| scope.runtime().create_state(false));
        Self {
            rows,
            select_all,
            ids: ids.clone(),
            text_changes: Rc::clone(text_changes),
        }
    }

    fn row_count_label(&self) -> String {
        format!("Table currently has {} rows", self.rows.size())
    }

    fn add_a_bunch_of_rows(&self) {
        for row in self.ids.rows(50) {
            self.rows.set(row.id, row);
        }
    }

    fn select_all(&self) {
        let checked = !self.select_all.current();
        for row in self.rows.values() {
            self.rows.set(row.id, TableRow { checked, ..row });
        }
        self.select_all.set(checked);
    }

    fn delete_selected(&self) {
        let selected: Vec<u64> = self
            .rows
            .values()
            .filter(|row| row.checked)
            .map(|row| row.id)
            .collect();
        for id in selected {
            self.rows.delete(&id);
        }
        if self.select_all.current() {
            self.select_all.set(false);
        }
    }

    fn check_row(&self, id: u64) {
        if let Some(row) = self.rows.get(&id) {
            self.rows.set(id, TableRow { checked: !row.checked, ..row });
        }
    }

    fn edit_row(&self, id: u64) {
        if let Some(row) = self.rows.get(&id) {
            self.rows.set(id, TableRow { status: RowStatus::Editing, ..row });
        }
    }

    fn change_text(&self, id: u64, text: &str) {
        let Some(row) = self.rows.get(&id) else {
            return;
        };
        let next = self.rows.set(id, TableRow { text: text.to_string(), ..row });
        if let Some(updated) = next.get(&id) {
            self.text_changes.borrow_mut().push(updated.text.clone());
        }
    }

    fn start_save(&self, row: &TableRow) {
        self.rows.set(row.id, TableRow { status: RowStatus::Saving, ..row.clone() });
    }

    fn finish_save(&self, row: &TableRow) {
        self.rows.set(row.id, TableRow { status: RowStatus::Ready, ..row.clone() });
    }

    fn start_delete(&self, row: &TableRow) {
        self.rows.set(row.id, TableRow { status: RowStatus::Deleting, ..row.clone() });
    }

    fn finish_delete(&self, row: &TableRow) {
        self.rows.delete(&row.id);
    }

    fn delete_all(&self) {
        self.rows.clear();
    }

    fn first_row(&self) -> TableRow {
        self.rows
            .values()
            .next()
            .unwrap_or_else(|| panic!("table has no rows"))
    }
}

struct App {
    runtime: Runtime,
    scope: Scope,
    ids: IdSource,
    text_changes: Rc<RefCell<Vec<String>>>,
}

impl App {
    fn render(&self) -> Table {
        self.scope
            .render(|scope| Table::render(scope, &self.ids, &self.text_changes))
    }

    /// Commits pending state, then renders.
    fn rerender(&self) -> Table {
        self.runtime.commit();
        self.render()
    }
}

#[fixture]
fn app() -> App {
    let runtime = Runtime::new();
    let scope = runtime.scope();
    App {
        runtime,
        scope,
        ids: IdSource::default(),
        text_changes: Rc::default(),
    }
}

// =============================================================================
// Initial render
// =============================================================================

#[rstest]
fn test_renders_initial_rows(app: App) {
    let table = app.render();

    assert_eq!(table.row_count_label(), "Table currently has 50 rows");
    assert!(table.rows.has(&17));
    assert_eq!(table.rows.to_string(), "[Map]");
}

// =============================================================================
// Bulk operations
// =============================================================================

#[rstest]
fn test_add_a_bunch_of_rows(app: App) {
    app.render().add_a_bunch_of_rows();

    let table = app.rerender();
    assert_eq!(table.rows.size(), 100);
    assert_eq!(table.rows.keys().last(), Some(100));
}

#[rstest]
fn test_select_all_then_delete_selected(app: App) {
    let table = app.render();
    table.add_a_bunch_of_rows();
    let table = app.rerender();

    table.select_all();
    let table = app.rerender();
    assert!(table.select_all.current());
    assert!(table.rows.values().all(|row| row.checked));

    table.delete_selected();
    let table = app.rerender();
    assert_eq!(table.row_count_label(), "Table currently has 0 rows");
    assert!(!table.select_all.current());
}

#[rstest]
fn test_delete_checked_rows_only(app: App) {
    let table = app.render();
    table.check_row(1);
    table.check_row(17);
    let table = app.rerender();

    table.delete_selected();
    let table = app.rerender();

    assert_eq!(table.rows.size(), 48);
    assert!(!table.rows.has(&17));
    assert!(table.rows.has(&2));
}

#[rstest]
fn test_delete_all_rows(app: App) {
    app.render().delete_all();

    let table = app.rerender();
    assert!(table.rows.is_empty());
    assert!(!table.rows.has(&17));
}

// =============================================================================
// Single row lifecycle
// =============================================================================

#[rstest]
fn test_edit_save_cycle(app: App) {
    let table = app.render();
    let id = table.first_row().id;

    table.edit_row(id);
    let table = app.rerender();
    let row = table.rows.get(&id).unwrap_or_else(|| panic!("row {id} missing"));
    assert_eq!(row.status, RowStatus::Editing);

    table.start_save(&row);
    let table = app.rerender();
    assert_eq!(table.rows.get(&id).map(|row| row.status), Some(RowStatus::Saving));

    table.finish_save(&row);
    let table = app.rerender();
    assert_eq!(table.rows.get(&id).map(|row| row.status), Some(RowStatus::Ready));
}

#[rstest]
fn test_edit_delete_cycle(app: App) {
    let table = app.render();
    let row = table.first_row();

    table.start_delete(&row);
    let table = app.rerender();
    assert_eq!(table.rows.get(&row.id).map(|row| row.status), Some(RowStatus::Deleting));

    table.finish_delete(&row);
    let table = app.rerender();
    assert!(!table.rows.has(&row.id));
    assert_eq!(table.rows.size(), 49);
}

// =============================================================================
// Reading back a write before the next render
// =============================================================================

#[rstest]
fn test_text_change_listener_sees_new_text_before_render(app: App) {
    let table = app.render();
    let id = table.first_row().id;

    table.change_text(id, "New Text");

    assert_eq!(app.text_changes.borrow().as_slice(), ["New Text".to_string()]);
    assert_eq!(table.rows.get(&id).map(|row| row.text), Some("TestString".to_string()));

    let table = app.rerender();
    assert_eq!(table.rows.get(&id).map(|row| row.text), Some("New Text".to_string()));
}

#[rstest]
fn test_consecutive_handlers_in_one_turn_all_apply(app: App) {
    let table = app.render();
    let id = table.first_row().id;

    table.edit_row(id);
    table.change_text(id, "first");
    table.change_text(id, "second");
    table.check_row(17);

    let table = app.rerender();
    let row = table.rows.get(&id).unwrap_or_else(|| panic!("row {id} missing"));
    // `edit_row` and `change_text` read the rendered row, so the last write wins.
    assert_eq!(row.text, "second");
    assert_eq!(row.status, RowStatus::Ready);
    assert_eq!(table.rows.get(&17).map(|row| row.checked), Some(true));
    assert_eq!(app.text_changes.borrow().len(), 2);
}

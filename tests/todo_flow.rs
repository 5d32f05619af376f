//! Headless end-to-end tests: a small todo app driven through raw input
//! bytes and explicit ticks, with frames captured in memory.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use ember_tui::{
    Column, Component, ComponentId, Config, Input, Key, MemorySink, Rect, Table, Text, Tui,
};

// =============================================================================
// Fixture
// =============================================================================

struct App {
    tui: Tui,
    sink: MemorySink,
    input: Input,
    input_id: ComponentId,
    table: Table,
    table_id: ComponentId,
}

fn app(rows: Vec<Vec<String>>) -> App {
    let (mut tui, sink) = Tui::headless(Config::default(), 80, 30);
    let tree = tui.tree_mut();
    let root = tree.root();

    let input = Input::new().placeholder("What needs to be done?");
    let input_id = tree
        .add(root, Component::new(input.clone()).rect(Rect::at(0, 0).with_width(40)))
        .unwrap();

    let table = Table::new(vec![Column::new("", 5), Column::new("todo", 20)], rows);
    // Frame + header + 20 body rows.
    let table_id = tree
        .add(root, Component::new(table.clone()).rect(Rect::at(0, 2).with_height(23)))
        .unwrap();

    let rows = table.rows().clone();
    let editor = input.clone();
    tree.on_key(input_id, move |key| {
        if key.key == Key::Enter {
            let text = editor.value();
            if !text.is_empty() {
                rows.update(|rows| rows.push(vec!["( )".to_string(), text]));
                editor.clear();
            }
        }
    })
    .unwrap();

    tree.focus(input_id);
    App {
        tui,
        sink,
        input,
        input_id,
        table,
        table_id,
    }
}

fn numbered(n: usize) -> Vec<Vec<String>> {
    (0..n).map(|i| vec![String::new(), format!("row {i}")]).collect()
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_enter_appends_todo_and_resets_input() {
    let mut app = app(Vec::new());
    app.tui.inject(b"buy milk");
    app.tui.tick().unwrap();
    assert_eq!(app.input.value(), "buy milk");
    assert_eq!(app.input.cursor().peek(), 8);

    app.tui.inject(b"\r");
    app.tui.tick().unwrap();

    assert_eq!(
        app.table.rows().peek(),
        vec![vec!["( )".to_string(), "buy milk".to_string()]]
    );
    assert_eq!(app.input.value(), "");
    assert_eq!(app.input.cursor().peek(), 0);

    // Row 2 is the frame, row 3 the header.
    let row: String = app.tui.renderer().buffer().row_text(4).chars().take(15).collect();
    assert_eq!(row, "│( )  buy milk ");
}

#[test]
fn test_empty_submission_dropped() {
    let mut app = app(Vec::new());
    app.tui.inject(b"\r");
    app.tui.tick().unwrap();
    assert!(app.table.rows().peek().is_empty());
    assert_eq!(app.table.rows().version(), 0);
}

#[test]
fn test_table_scrolls_to_last_row() {
    let mut app = app(numbered(100));
    app.tui.inject(b"\t");
    app.tui.tick().unwrap();
    assert_eq!(app.tui.tree().focused(), Some(app.table_id));

    app.tui.inject(&b"\x1b[B".repeat(99));
    let report = app.tui.tick().unwrap();
    assert_eq!(report.events, 99);

    assert_eq!(app.table.selected().peek(), 99);
    assert_eq!(app.table.visible_range(), 80..100);

    // Body starts below the frame and the header.
    let frame = app.tui.renderer().buffer();
    assert!(frame.row_text(4).contains("row 80"));
    assert!(frame.row_text(23).contains("row 99"));
}

#[test]
fn test_split_ctrl_a_routes_once() {
    let mut app = app(Vec::new());
    app.input.set_value("hello");

    let hits = Rc::new(Cell::new(0));
    let hits_clone = hits.clone();
    let editor = app.input.clone();
    app.tui
        .tree_mut()
        .on_key(app.input_id, move |key| {
            if key.is_ctrl('a') {
                hits_clone.set(hits_clone.get() + 1);
                editor.move_home();
            }
        })
        .unwrap();

    let start = Instant::now();
    app.tui.inject_at(b"\x1b[97;", start);
    assert_eq!(app.tui.tick_at(start).unwrap().events, 0);

    app.tui.inject_at(b"5u", start + Duration::from_millis(3));
    let report = app.tui.tick_at(start + Duration::from_millis(3)).unwrap();

    assert_eq!(report.events, 1);
    assert_eq!(hits.get(), 1);
    assert_eq!(app.input.cursor().peek(), 0);
    assert_eq!(app.input.value(), "hello");

    // Nothing left over once the timeout has long passed.
    let later = app.tui.tick_at(start + Duration::from_secs(1)).unwrap();
    assert_eq!(later.events, 0);
}

#[test]
fn test_unchanged_state_renders_nothing() {
    let mut app = app(numbered(3));
    let first = app.tui.tick().unwrap();
    assert!(first.frame.full_redraw);
    assert_eq!(app.sink.frame_count(), 1);

    let second = app.tui.tick().unwrap();
    assert!(second.frame.is_empty());
    assert_eq!(app.sink.frame_count(), 1);

    app.tui.inject(b"x");
    let third = app.tui.tick().unwrap();
    assert!(!third.frame.is_empty());
    assert!(!third.frame.full_redraw);
    assert_eq!(app.sink.frame_count(), 2);
}

#[test]
fn test_click_selects_row_and_moves_focus() {
    let mut app = app(numbered(5));
    // SGR press at 1-based (3, 6): table-local row 3, body line 1.
    app.tui.inject(b"\x1b[<0;3;6M\x1b[<0;3;6m");
    app.tui.tick().unwrap();

    assert_eq!(app.tui.tree().focused(), Some(app.table_id));
    assert_eq!(app.table.selected().peek(), 1);
    assert_eq!(app.tui.tree().active(), None);
}

#[test]
fn test_label_follows_signal() {
    let (mut tui, sink) = Tui::headless(Config::default(), 12, 1);
    let label = Text::new("0 items left");
    let root = tui.tree().root();
    tui.tree_mut()
        .add(root, Component::new(label.clone()).rect(Rect::at(0, 0)))
        .unwrap();
    tui.tick().unwrap();

    label.set("1 item left");
    tui.tick().unwrap();
    assert_eq!(sink.frame_count(), 2);
    assert!(sink.last_frame().unwrap().contains("1"));
    assert_eq!(tui.renderer().buffer().row_text(0), "1 item left ");
}

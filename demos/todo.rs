//! Todo list demo.
//!
//! ```text
//! cargo run --example todo -- --fps 30 --log-file todo.log
//! ```
//!
//! Type a todo and press Enter to add it. Tab moves between the input and
//! the list; on the list, Enter or Space toggles the selected todo and
//! Delete removes it. Ctrl+A / Ctrl+E jump to the start / end of the input.
//! Ctrl+C quits.

use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use ember_tui::{
    Column, Component, Config, Input, Key, Rect, Rgba, Signal, Style, Table, Text, Theme, Tui,
};
use tracing_subscriber::EnvFilter;

const OPEN: &str = "( )";
const DONE: &str = "(X)";

/// Terminal todo list built on ember-tui
#[derive(Parser, Debug)]
#[command(name = "todo")]
struct Args {
    /// Frames per second
    #[arg(long, default_value = "60")]
    fps: u32,

    /// Write logs here (filtered by RUST_LOG); the terminal belongs to the UI
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    if let Some(path) = &args.log_file {
        let file = File::create(path)?;
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    }

    let config = Config::new()
        .fps(args.fps)
        .base_style(Style::new().fg(Rgba::WHITE).bg(Rgba::BLACK));
    let mut tui = Tui::new(config)?;
    build(&mut tui)?;
    tui.run()?;
    Ok(())
}

fn base_theme() -> Theme {
    Theme::new(Style::new().fg(Rgba::WHITE))
        .focused(Style::new().bg(Rgba::LIGHT_BLUE))
        .active(Style::new().bg(Rgba::DARK_GRAY))
        .disabled(Style::new().fg(Rgba::BLACK).bg(Rgba::DARK_GRAY))
}

fn build(tui: &mut Tui) -> ember_tui::Result<()> {
    let tree = tui.tree_mut();
    let root = tree.root();

    tree.add(
        root,
        Component::new(Text::new("todos")).rect(Rect::at(2, 1)).z_index(1),
    )?;

    let input = Input::new().placeholder("What needs to be done?");
    let input_id = tree.add(
        root,
        Component::new(input.clone())
            .rect(Rect::at(2, 3).with_width(66))
            .theme(base_theme()),
    )?;

    let table = Table::new(
        vec![Column::new("", 5), Column::new("todo", 60)],
        vec![vec![OPEN.to_string(), "tada".to_string()]],
    );
    let table_id = tree.add(
        root,
        Component::new(table.clone())
            .rect(Rect::at(2, 5).with_height(20))
            .theme(Theme::new(Style::new().fg(Rgba::WHITE))),
    )?;

    let left = Signal::new(items_left(&table.rows().peek()));
    let left_clone = left.clone();
    table.rows().subscribe(move |rows| {
        left_clone.set(items_left(rows));
        Ok(())
    });
    tree.add(root, Component::new(Text::from_signal(left)).rect(Rect::at(2, 26)))?;

    // Input: submit and cursor jumps.
    let rows = table.rows().clone();
    let editor = input.clone();
    tree.on_key(input_id, move |key| {
        if key.key == Key::Enter && !key.ctrl() && !key.alt() {
            let text = editor.value();
            if !text.is_empty() {
                rows.update(|rows| rows.push(vec![OPEN.to_string(), text]));
                editor.clear();
            }
        } else if key.is_ctrl('a') {
            editor.move_home();
        } else if key.is_ctrl('e') {
            editor.move_end();
        }
    })?;

    // Table: toggle and delete.
    let list = table.clone();
    tree.on_key(table_id, move |key| {
        let index = list.selected().peek();
        match key.key {
            Key::Enter | Key::Char(' ') => list.rows().update(|rows| {
                if let Some(mark) = rows.get_mut(index).and_then(|row| row.first_mut()) {
                    *mark = if *mark == OPEN { DONE } else { OPEN }.to_string();
                }
            }),
            Key::Delete => list.rows().update(|rows| {
                if index < rows.len() {
                    rows.remove(index);
                }
            }),
            _ => {}
        }
    })?;

    tree.focus(input_id);
    Ok(())
}

fn items_left(rows: &[Vec<String>]) -> String {
    let open = rows
        .iter()
        .filter(|row| row.first().is_some_and(|mark| mark == OPEN))
        .count();
    match open {
        1 => "1 item left".to_string(),
        n => format!("{n} items left"),
    }
}

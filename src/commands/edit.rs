//! Line-based front end for [`Editor`].
//!
//! Commands are read from stdin while previews regenerate on the blocking
//! pool; a finished preview is picked up by the same loop. Part numbers are
//! 1-based.

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use super::AppContext;
use crate::editor::{load_document_ref, Editor, PreviewResult, PreviewRun};
use crate::input::{DebouncedInput, PAGE_RANGE_PATTERN};
use crate::page_chooser::PageChooser;
use crate::page_range::parse_page_list;

const HELP: &str = "\
Commands:
  add ID...            add library documents
  remove N             remove part N
  pages N [TEXT]       show or type the page ranges of part N
  select N PAGES       choose the pages of part N
  split N PAGES        cut part N after each of PAGES
  move FROM TO         move a part
  delete-source on|off delete sources after saving
  metadata MODE        copy_first or redo
  show                 show parts and previews
  save                 execute the session
  cancel               discard the session
  help                 show this text
  quit                 leave without saving";

/// The page range field of one part.
struct PageField {
    index: usize,
    input: DebouncedInput,
    rx: mpsc::UnboundedReceiver<String>,
}

impl PageField {
    fn open(ctx: &AppContext, editor: &Editor, index: usize) -> Result<Self> {
        let (input, rx) = DebouncedInput::new(ctx.config.input.window());
        let mut input = input.with_pattern(PAGE_RANGE_PATTERN)?;
        input.set_value(editor.pages_text(index)?);
        Ok(PageField { index, input, rx })
    }

    /// Close the field and apply whatever it still had to publish.
    async fn close(self, editor: &mut Editor) -> Result<()> {
        let PageField {
            index,
            input,
            mut rx,
        } = self;
        input.close().await;
        let mut last = None;
        while let Some(value) = rx.recv().await {
            last = Some(value);
        }
        if let Some(text) = last {
            editor.set_pages_text(index, &text)?;
        }
        Ok(())
    }
}

async fn next_field_value(field: &mut Option<PageField>) -> Option<(usize, String)> {
    match field {
        Some(f) => {
            let value = f.rx.recv().await?;
            Some((f.index, value))
        }
        None => std::future::pending().await,
    }
}

async fn next_preview(running: &mut Option<PreviewRun>) -> PreviewResult {
    match running {
        Some(run) => run.wait().await,
        None => std::future::pending().await,
    }
}

enum Flow {
    Continue,
    Quit,
}

pub async fn run(ctx: &AppContext, documents: &[u64]) -> Result<()> {
    let (mut editor, mut preview_rx) =
        Editor::new(ctx.config.preview.window(), &ctx.config.split_merge);
    for &id in documents {
        let doc = load_document_ref(&ctx.store, id)
            .with_context(|| format!("Failed to load document {}", id))?;
        editor.add_document(doc);
    }

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut field: Option<PageField> = None;
    let mut running: Option<PreviewRun> = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match handle_line(ctx, &mut editor, &mut field, line.trim()).await {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Quit) => break,
                    Err(e) => println!("Error: {:#}", e),
                }
            }
            Some(()) = preview_rx.recv() => {
                if let Some(stale) = running.take() {
                    stale.abandon();
                }
                running = editor.start_preview(&ctx.store, ctx.scratch_dir());
                if running.is_none() {
                    print_state(&editor);
                }
            }
            done = next_preview(&mut running) => {
                running = None;
                editor.complete_preview(done);
                print_state(&editor);
            }
            Some((index, text)) = next_field_value(&mut field) => {
                debug!("Pages of part {} settled on {:?}", index + 1, text);
                if let Err(e) = editor.set_pages_text(index, &text) {
                    println!("Error: {}", e);
                }
            }
        }
    }

    if let Some(f) = field.take() {
        f.close(&mut editor).await?;
    }
    if let Some(mut run) = running.take() {
        editor.complete_preview(run.wait().await);
    }
    editor.close().await;
    Ok(())
}

fn part_index(editor: &Editor, arg: Option<&str>) -> Result<usize> {
    let arg = arg.context("Missing part number")?;
    let n: usize = arg
        .parse()
        .with_context(|| format!("Invalid part number: {}", arg))?;
    let len = editor.session().documents().len();
    if n == 0 || n > len {
        bail!("No part {} (the session has {})", n, len);
    }
    Ok(n - 1)
}

async fn handle_line(
    ctx: &AppContext,
    editor: &mut Editor,
    field: &mut Option<PageField>,
    line: &str,
) -> Result<Flow> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(Flow::Continue);
    };

    // Typing goes to the open field; anything else closes it first.
    if command == "pages" {
        let index = part_index(editor, words.next())?;
        let rest: Vec<&str> = words.collect();
        if field.as_ref().is_some_and(|f| f.index != index) {
            if let Some(f) = field.take() {
                f.close(editor).await?;
            }
        }
        if field.is_none() {
            *field = Some(PageField::open(ctx, editor, index)?);
        }
        if let Some(f) = field.as_mut() {
            if !rest.is_empty() {
                f.input.clear();
                let rejected = f.input.type_text(&rest.concat());
                if rejected > 0 {
                    println!("Ignored {} key(s) not allowed in page ranges", rejected);
                }
            }
            println!("Part {} pages: {}", index + 1, f.input.value());
        }
        return Ok(Flow::Continue);
    }
    if let Some(f) = field.take() {
        f.close(editor).await?;
    }

    match command {
        "add" => {
            let mut added = 0;
            for word in words {
                let id: u64 = word
                    .parse()
                    .with_context(|| format!("Invalid document id: {}", word))?;
                editor.add_document(load_document_ref(&ctx.store, id)?);
                added += 1;
            }
            if added == 0 {
                bail!("Usage: add ID...");
            }
        }
        "remove" => {
            let index = part_index(editor, words.next())?;
            editor.remove_document(index)?;
        }
        "select" | "split" => {
            let index = part_index(editor, words.next())?;
            let text = words.collect::<Vec<_>>().concat();
            let mut chooser = if command == "split" {
                editor.choose_split(index)?
            } else {
                let mut chooser = editor.choose_pages(index)?;
                chooser.clear();
                chooser
            };
            // The page count may have changed since the part was added.
            if let Some(count) = load_document_ref(&ctx.store, chooser.document().id)?.page_count {
                chooser.loaded(count);
            }
            let count = chooser
                .num_pages()
                .context("The page count of this document is unknown")?;
            let pages = parse_page_list(&text, count)?;
            toggle_pages(&mut chooser, &pages);
            editor.confirm_chooser(index, &mut chooser)?;
        }
        "move" => {
            let from = part_index(editor, words.next())?;
            let to = part_index(editor, words.next())?;
            editor.move_part(from, to)?;
        }
        "delete-source" => {
            editor.delete_source = match words.next() {
                Some("on") => true,
                Some("off") => false,
                _ => bail!("Usage: delete-source on|off"),
            };
        }
        "metadata" => {
            let mode = words.next().context("Usage: metadata copy_first|redo")?;
            editor.metadata = mode.parse().map_err(anyhow::Error::msg)?;
        }
        "show" => print_state(editor),
        "save" => match editor.save(&ctx.store, ctx.scratch_dir()).await {
            Some(ids) => {
                let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
                println!("Created document(s): {}", ids.join(", "));
            }
            None => print_state(editor),
        },
        "cancel" => {
            editor.cancel();
            println!("Session discarded.");
        }
        "help" => println!("{}", HELP),
        "quit" | "exit" => return Ok(Flow::Quit),
        other => bail!("Unknown command: {} (try help)", other),
    }

    Ok(Flow::Continue)
}

fn toggle_pages(chooser: &mut PageChooser, pages: &[u32]) {
    for &page in pages {
        if chooser.mark(page).selected {
            continue;
        }
        if !chooser.toggle(page) {
            match chooser.num_pages() {
                Some(n) => println!(
                    "Page {} cannot be chosen from \"{}\" ({} pages)",
                    page,
                    chooser.document().title,
                    n
                ),
                None => println!("Page {} cannot be chosen here", page),
            }
        }
    }
}

fn print_state(editor: &Editor) {
    let parts = editor.session().documents();
    if parts.is_empty() {
        println!("No documents in the session.");
    }
    for (i, part) in parts.iter().enumerate() {
        let marker = if part.starts_new_document { "+" } else { " " };
        let pages = editor.pages_text(i).unwrap_or_default();
        let pages = if pages.is_empty() { "all".to_string() } else { pages };
        println!(
            "{}{:>3}. [{}] {} (pages: {})",
            marker,
            i + 1,
            part.document.id,
            part.document.title,
            pages
        );
    }

    let preview = editor.preview();
    if preview.loading {
        println!("Generating preview...");
    }
    if let Some(error) = &preview.error {
        println!("Preview error: {}", error);
    }
    for (i, file) in preview.files.iter().enumerate() {
        let pages = preview
            .num_pages
            .get(i)
            .copied()
            .flatten()
            .map(|n| format!("{} page(s)", n))
            .unwrap_or_else(|| "loading".to_string());
        println!("  Output {}: {} ({})", i + 1, file.display(), pages);
    }
}

use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::collection::{NoteCollection, NoteDraft, NoteUpdate, ValidationError};
use crate::config::themes::{load_theme, save_theme, ThemeRegistry};
use crate::config::AppConfig;
use crate::drawing::{ink_for, DrawingPad};
use crate::model::{Attachment, DataUri, Note, NoteKind, Template, DEFAULT_MIME};
use crate::session::{self, Prompter, SessionLock};
use crate::storage::KeyValueStore;
use crate::view::{self, markup_from_source, plain_text, SortOrder, ViewQuery};

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Title for the note (prompted if omitted)
    #[arg()]
    pub title: Option<String>,
    /// Provide the note body inline. If omitted, reads from stdin.
    #[arg(long)]
    pub body: Option<String>,
    /// Store the body as markup verbatim instead of reading `**bold**`, `*italic*`, `__underline__`
    #[arg(long)]
    pub html: bool,
    /// Page template (basic, lined, grid, chalkboard)
    #[arg(long)]
    pub template: Option<Template>,
    /// Files to attach
    #[arg(long = "attach")]
    pub attach: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct DrawArgs {
    /// Title for the drawing
    pub title: String,
    /// Page template (basic, lined, grid, chalkboard)
    #[arg(long)]
    pub template: Option<Template>,
    /// One pen stroke as space separated points, e.g. "0,0 20,5 40,0"
    #[arg(long = "stroke", required = true)]
    pub strokes: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// latest, oldest or most-viewed (defaults to the configured order)
    #[arg(long)]
    pub sort: Option<SortOrder>,
    /// Only show favorites
    #[arg(long)]
    pub favorites: bool,
    /// Case-insensitive title filter
    #[arg(long)]
    pub search: Option<String>,
    /// Unlock the session so locked notes show their previews
    #[arg(long)]
    pub unlock: bool,
}

#[derive(Args, Debug, Clone)]
pub struct NoteArgs {
    /// Note id or a unique prefix of it
    pub note: String,
    /// Prompt for the password when the note is locked
    #[arg(long)]
    pub unlock: bool,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Note id or a unique prefix of it
    pub note: String,
    #[arg(long)]
    pub title: Option<String>,
    /// Replacement body (text notes only)
    #[arg(long)]
    pub body: Option<String>,
    /// Store the body as markup verbatim instead of reading `**bold**`, `*italic*`, `__underline__`
    #[arg(long)]
    pub html: bool,
    #[arg(long)]
    pub unlock: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Note ids or unique prefixes
    #[arg(required = true)]
    pub notes: Vec<String>,
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AttachArgs {
    /// Note id or a unique prefix of it
    pub note: String,
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    /// Store the files as audio recordings
    #[arg(long)]
    pub recording: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DetachArgs {
    /// Note id or a unique prefix of it
    pub note: String,
    /// Attachment number as printed by `show` (starting at 1)
    pub position: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Note id or a unique prefix of it
    pub note: String,
    /// Target directory (defaults to <data>/exports/<id>)
    #[arg(long)]
    pub dir: Option<PathBuf>,
    #[arg(long)]
    pub unlock: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ThemeArgs {
    /// light, dark or toggle; prints the current theme when omitted
    pub value: Option<String>,
}

/// Line prompter on stdin; an empty answer counts as backing out.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn prompt(&mut self, label: &str) -> Option<String> {
        match prompt(label) {
            Ok(answer) if !answer.is_empty() => Some(answer),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(?err, "failed to read from stdin");
                None
            }
        }
    }
}

pub fn add_note<S: KeyValueStore>(
    collection: &mut NoteCollection<S>,
    config: &AppConfig,
    args: AddArgs,
) -> Result<String> {
    let title = match args.title {
        Some(t) => t,
        None => prompt("Title")?,
    };
    let body = match args.body {
        Some(body) => body,
        None => read_stdin()?.unwrap_or_default(),
    };
    let content = if args.html {
        body
    } else {
        markup_from_source(body.trim_end())
    };
    let attachments = args
        .attach
        .iter()
        .map(|path| Attachment::from_file(path))
        .collect::<Result<Vec<_>>>()?;

    let draft = NoteDraft::text(title, content)
        .with_template(args.template.unwrap_or(config.default_template))
        .with_attachments(attachments);
    let id = collection.add(draft)?;
    let note = collection.find(id).context("note vanished after saving")?;
    Ok(format!("Created note {} ({})\n", id.short(), note.title))
}

pub fn draw_note<S: KeyValueStore>(
    collection: &mut NoteCollection<S>,
    config: &AppConfig,
    args: DrawArgs,
) -> Result<String> {
    let template = args.template.unwrap_or(config.default_template);
    let theme = load_theme(collection.store(), config.theme)?;
    let ink = ink_for(template, theme);

    let mut pad = DrawingPad::new(&config.drawing);
    for raw in &args.strokes {
        let points = parse_stroke(raw)?;
        pad.draw_polyline(&points, ink);
    }
    if pad.canvas().is_blank() {
        bail!("the strokes left the canvas blank");
    }
    let bitmap = pad.commit()?;
    let id = collection.add(NoteDraft::handwriting(args.title, bitmap).with_template(template))?;
    let strokes = args.strokes.len();
    Ok(format!(
        "Created handwriting note {} ({} stroke{})\n",
        id.short(),
        strokes,
        if strokes == 1 { "" } else { "s" }
    ))
}

pub fn list_notes<S: KeyValueStore>(
    collection: &NoteCollection<S>,
    config: &AppConfig,
    prompter: &mut dyn Prompter,
    args: ListArgs,
) -> Result<String> {
    let mut session = SessionLock::new();
    if args.unlock {
        session.unlock_interactive(collection.store(), prompter)?;
    }
    let query = ViewQuery {
        sort: args.sort.unwrap_or(config.default_sort),
        favorites_only: args.favorites,
        search: args.search.unwrap_or_default(),
    };
    let rows = view::project(collection.notes(), &query, session.is_unlocked());
    if rows.is_empty() {
        return Ok(if query.has_filters() {
            "No matching notes.\n".to_string()
        } else {
            "No notes yet.\n".to_string()
        });
    }

    let mut out = String::new();
    for row in &rows {
        let star = if row.note.is_favorite { "★ " } else { "" };
        let _ = writeln!(&mut out, "{}  {star}{}", row.id.short(), row.display_title());
        let _ = writeln!(
            &mut out,
            "    {} · {} · {} view{}",
            row.note.kind,
            format_timestamp(row.note.created_at),
            row.note.view_count,
            if row.note.view_count == 1 { "" } else { "s" }
        );
        let preview = row.preview(config.preview_chars);
        if !preview.is_empty() {
            let _ = writeln!(&mut out, "    {preview}");
        }
    }
    let _ = writeln!(
        &mut out,
        "{} of {} notes · {}",
        rows.len(),
        collection.len(),
        query.sort.label()
    );
    Ok(out)
}

pub fn show_note<S: KeyValueStore>(
    collection: &mut NoteCollection<S>,
    prompter: &mut dyn Prompter,
    args: NoteArgs,
) -> Result<String> {
    let index = resolve_note(collection, &args.note)?;
    let session = session_for(collection, index, args.unlock, prompter)?;
    let note = collection
        .open(index, &session)?
        .context("note disappeared while opening")?;
    Ok(format_note(note))
}

pub fn edit_note<S: KeyValueStore>(
    collection: &mut NoteCollection<S>,
    prompter: &mut dyn Prompter,
    args: EditArgs,
) -> Result<String> {
    if args.title.is_none() && args.body.is_none() {
        bail!("nothing to change; pass --title or --body");
    }
    let index = resolve_note(collection, &args.note)?;
    session_for(collection, index, args.unlock, prompter)?;
    let note = collection.get(index).context("note disappeared")?;

    let title = match args.title {
        Some(title) if title.trim().is_empty() => bail!(ValidationError::EmptyTitle),
        Some(title) => Some(title.trim().to_string()),
        None => None,
    };
    let content = match args.body {
        Some(_) if note.is_handwriting() => {
            bail!("handwriting notes only accept a new title")
        }
        Some(body) => {
            let markup = if args.html {
                body
            } else {
                markup_from_source(body.trim_end())
            };
            if plain_text(&markup).trim().is_empty() && !note.has_attachments() {
                bail!(ValidationError::EmptyContent);
            }
            Some(markup)
        }
        None => None,
    };
    let short = note.id.short();
    collection.update(index, NoteUpdate { title, content })?;
    Ok(format!("Updated note {short}\n"))
}

pub fn delete_notes<S: KeyValueStore>(
    collection: &mut NoteCollection<S>,
    prompter: &mut dyn Prompter,
    args: DeleteArgs,
) -> Result<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for reference in &args.notes {
        let index = resolve_note(collection, reference)?;
        let id = collection.notes()[index].id;
        if seen.insert(id) {
            ids.push(id);
        }
    }

    if !args.yes {
        let question = format!(
            "Delete {} note{}? [y/N]",
            ids.len(),
            if ids.len() == 1 { "" } else { "s" }
        );
        let confirmed = prompter
            .prompt(&question)
            .is_some_and(|answer| answer.trim().eq_ignore_ascii_case("y"));
        if !confirmed {
            return Ok("Aborted.\n".to_string());
        }
    }

    let removed = collection.delete_ids(&ids)?;
    Ok(format!(
        "Deleted {removed} note{}\n",
        if removed == 1 { "" } else { "s" }
    ))
}

pub fn toggle_favorite<S: KeyValueStore>(
    collection: &mut NoteCollection<S>,
    args: NoteArgs,
) -> Result<String> {
    let index = resolve_note(collection, &args.note)?;
    let short = collection.notes()[index].id.short();
    let favorite = collection
        .toggle_favorite(index)?
        .context("note disappeared")?;
    Ok(if favorite {
        format!("Note {short} is now a favorite\n")
    } else {
        format!("Note {short} is no longer a favorite\n")
    })
}

/// Locking or unlocking a note always needs an unlocked session.
pub fn toggle_lock<S: KeyValueStore>(
    collection: &mut NoteCollection<S>,
    prompter: &mut dyn Prompter,
    args: NoteArgs,
) -> Result<String> {
    let index = resolve_note(collection, &args.note)?;
    let short = collection.notes()[index].id.short();
    let mut session = SessionLock::new();
    session.unlock_interactive(collection.store(), prompter)?;
    let locked = collection
        .toggle_lock(index, &session)?
        .context("note disappeared")?;
    Ok(if locked {
        format!("Locked note {short}\n")
    } else {
        format!("Unlocked note {short}\n")
    })
}

pub fn attach_files<S: KeyValueStore>(
    collection: &mut NoteCollection<S>,
    args: AttachArgs,
) -> Result<String> {
    let index = resolve_note(collection, &args.note)?;
    let short = collection.notes()[index].id.short();
    let mut out = String::new();
    for path in &args.paths {
        let attachment = if args.recording {
            let bytes =
                fs::read(path).with_context(|| format!("reading recording {}", path.display()))?;
            let mime = mime_guess::from_path(path).first_raw().unwrap_or(DEFAULT_MIME);
            Attachment::recording(mime, &bytes, OffsetDateTime::now_utc())
        } else {
            Attachment::from_file(path)?
        };
        let _ = writeln!(
            &mut out,
            "Attached {} ({}) to note {short}",
            attachment.name, attachment.kind
        );
        collection.add_attachment(index, attachment)?;
    }
    Ok(out)
}

pub fn detach_file<S: KeyValueStore>(
    collection: &mut NoteCollection<S>,
    args: DetachArgs,
) -> Result<String> {
    if args.position == 0 {
        bail!("attachment numbers start at 1");
    }
    let index = resolve_note(collection, &args.note)?;
    let short = collection.notes()[index].id.short();
    match collection.remove_attachment(index, args.position - 1)? {
        Some(removed) => Ok(format!("Removed {} from note {short}\n", removed.name)),
        None => bail!("note {short} has no attachment #{}", args.position),
    }
}

/// Writes every attachment, plus the drawing of a handwriting note, to disk.
pub fn export_note<S: KeyValueStore>(
    collection: &mut NoteCollection<S>,
    prompter: &mut dyn Prompter,
    export_root: &Path,
    args: ExportArgs,
) -> Result<String> {
    let index = resolve_note(collection, &args.note)?;
    session_for(collection, index, args.unlock, prompter)?;
    let note = collection.get(index).context("note disappeared")?;
    let dir = args
        .dir
        .unwrap_or_else(|| export_root.join(note.id.short()));

    let mut written = Vec::new();
    if note.is_handwriting() {
        let uri: DataUri = note
            .content
            .parse()
            .with_context(|| format!("decoding drawing of note {}", note.id.short()))?;
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        let ext = mime_guess::get_mime_extensions_str(uri.essence())
            .and_then(|exts| exts.first())
            .copied()
            .unwrap_or("bin");
        let target = dir.join(format!("{}.{ext}", note.id.short()));
        fs::write(&target, &uri.data)
            .with_context(|| format!("writing drawing {}", target.display()))?;
        written.push(target);
    }
    for attachment in &note.attachments {
        written.push(attachment.export_to(&dir)?);
    }

    if written.is_empty() {
        return Ok(format!("Note {} has nothing to export\n", note.id.short()));
    }
    tracing::info!(note = %note.id, files = written.len(), dir = %dir.display(), "exported note");
    let mut out = String::new();
    for path in written {
        let _ = writeln!(&mut out, "Wrote {}", path.display());
    }
    Ok(out)
}

pub fn change_password<S: KeyValueStore>(
    collection: &NoteCollection<S>,
    prompter: &mut dyn Prompter,
) -> Result<String> {
    let had_password = session::password_is_set(collection.store())?;
    session::change_password_interactive(collection.store(), prompter)?;
    Ok(if had_password {
        "Password changed.\n".to_string()
    } else {
        "Password set.\n".to_string()
    })
}

pub fn theme<S: KeyValueStore>(
    collection: &NoteCollection<S>,
    config: &AppConfig,
    args: ThemeArgs,
) -> Result<String> {
    let current = load_theme(collection.store(), config.theme)?;
    let Some(raw) = args.value else {
        return Ok(format!("{current}\n"));
    };
    let next = if raw.trim().eq_ignore_ascii_case("toggle") {
        current.toggled()
    } else {
        ThemeRegistry::default()
            .resolve(&raw)
            .with_context(|| format!("unknown theme '{raw}' (expected light, dark or toggle)"))?
    };
    save_theme(collection.store(), next)?;
    Ok(format!("Theme set to {next}\n"))
}

/// Finds a note by its id or a unique prefix, with or without hyphens.
fn resolve_note<S: KeyValueStore>(collection: &NoteCollection<S>, reference: &str) -> Result<usize> {
    let needle: String = reference
        .trim()
        .chars()
        .filter(|c| *c != '-')
        .collect::<String>()
        .to_ascii_lowercase();
    if needle.is_empty() {
        bail!("note id cannot be empty");
    }
    let matches: Vec<usize> = collection
        .iter()
        .enumerate()
        .filter(|(_, note)| note.id.to_string().replace('-', "").starts_with(&needle))
        .map(|(index, _)| index)
        .collect();
    match matches.as_slice() {
        [index] => Ok(*index),
        [] => bail!("no note matches '{reference}'"),
        many => bail!(
            "'{reference}' matches {} notes; use a longer id",
            many.len()
        ),
    }
}

/// Session for acting on one note: unlocked only when the note needs it and
/// the caller asked for it.
fn session_for<S: KeyValueStore>(
    collection: &NoteCollection<S>,
    index: usize,
    unlock: bool,
    prompter: &mut dyn Prompter,
) -> Result<SessionLock> {
    let mut session = SessionLock::new();
    let note = collection.get(index).context("note disappeared")?;
    if note.is_locked {
        if !unlock {
            bail!(
                "note {} is locked; pass --unlock to enter the password",
                note.id.short()
            );
        }
        session.unlock_interactive(collection.store(), prompter)?;
    }
    Ok(session)
}

fn parse_stroke(raw: &str) -> Result<Vec<(i32, i32)>> {
    let points = raw
        .split_whitespace()
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .with_context(|| format!("point '{pair}' is not in x,y form"))?;
            let x = x
                .trim()
                .parse::<i32>()
                .with_context(|| format!("bad x coordinate in '{pair}'"))?;
            let y = y
                .trim()
                .parse::<i32>()
                .with_context(|| format!("bad y coordinate in '{pair}'"))?;
            Ok((x, y))
        })
        .collect::<Result<Vec<_>>>()?;
    if points.is_empty() {
        bail!("stroke cannot be empty");
    }
    Ok(points)
}

fn format_note(note: &Note) -> String {
    let mut out = String::new();
    let _ = writeln!(&mut out, "{}", note.title);
    let mut flags = Vec::new();
    if note.is_favorite {
        flags.push("favorite");
    }
    if note.is_locked {
        flags.push("locked");
    }
    let _ = writeln!(
        &mut out,
        "{} · {} · {} · {} view{}{}",
        note.id.short(),
        note.kind,
        note.template,
        note.view_count,
        if note.view_count == 1 { "" } else { "s" },
        if flags.is_empty() {
            String::new()
        } else {
            format!(" · {}", flags.join(", "))
        }
    );
    let _ = writeln!(&mut out, "created {}", format_timestamp(note.created_at));
    out.push('\n');
    match note.kind {
        NoteKind::Text => {
            let _ = writeln!(&mut out, "{}", plain_text(&note.content).trim_end());
        }
        NoteKind::Handwriting => {
            let _ = writeln!(
                &mut out,
                "{} (use `memopad export {}` to save the drawing)",
                view::HANDWRITING_PREVIEW,
                note.id.short()
            );
        }
    }
    if note.has_attachments() {
        out.push('\n');
        let _ = writeln!(&mut out, "Attachments:");
        for (position, attachment) in note.attachments.iter().enumerate() {
            let _ = writeln!(
                &mut out,
                "  {}. {} ({})",
                position + 1,
                attachment.name,
                attachment.kind
            );
        }
    }
    out
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end().to_owned())
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

fn format_timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

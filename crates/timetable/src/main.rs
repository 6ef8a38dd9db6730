//! `ttgrid` - CLI for the timetable engine
//!
//! Loads the user's timetable from local storage, replays the requested edit
//! through the grid's drop and pointer handlers, and saves the result.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context};
use clap::Parser;

use timetable::cli::{
    AddCommand, Cli, Command, ConfigCommand, ImportCommand, MoveCommand, OutputFormat, Placement,
    ResizeCommand,
};
use timetable::config::{GridConfig, DAY_COUNT, DAY_LABELS};
use timetable::grid::{Cell, GridLayout, Point, Timetable};
use timetable::item::{read_items, Change, ItemId, ModuleDescriptor, TimetableItem};
use timetable::{init_logging, Config, Error, Storage, TimetableSession};

type Session = TimetableSession<Storage>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match &cli.command {
        Command::Config(cmd) => handle_config(&config, cmd),
        Command::Status(cmd) => handle_status(&cli, &config, cmd.json),
        Command::Show(cmd) => {
            let session = open_session(&cli, &config).await?;
            print_timetable(&config.grid, session.items(), cmd.format)
        }
        Command::Add(cmd) => {
            let mut session = open_session(&cli, &config).await?;
            let change = handle_add(&config, &session, cmd)?;
            commit(&mut session, change).await
        }
        Command::Move(cmd) => {
            let mut session = open_session(&cli, &config).await?;
            let change = handle_move(&config, &session, cmd)?;
            commit(&mut session, change).await
        }
        Command::Resize(cmd) => {
            let mut session = open_session(&cli, &config).await?;
            let change = handle_resize(&config, &session, cmd)?;
            commit(&mut session, change).await
        }
        Command::Cycle { id } => {
            let mut session = open_session(&cli, &config).await?;
            let (mut grid, id) = grid_with_item(&config, &session, id)?;
            let change = grid.cycle_session_type(&id);
            commit(&mut session, change).await
        }
        Command::Delete { id } => {
            let mut session = open_session(&cli, &config).await?;
            let (mut grid, id) = grid_with_item(&config, &session, id)?;
            grid.set_delete_mode(true);
            let change = grid.click(&id);
            commit(&mut session, change).await
        }
        Command::Import(cmd) => {
            let mut session = open_session(&cli, &config).await?;
            handle_import(&config, &mut session, cmd).await
        }
    }
}

async fn open_session(cli: &Cli, config: &Config) -> anyhow::Result<Session> {
    let user = cli.user_id(config)?;
    let path = config.database_path();
    let storage = Storage::open(&path)
        .with_context(|| format!("failed to open timetable database {}", path.display()))?;

    let mut session = TimetableSession::new(storage, user);
    session
        .refresh()
        .await
        .context("failed to load timetable")?;
    Ok(session)
}

fn grid_for(config: &Config, session: &Session) -> Timetable {
    Timetable::with_items(
        GridLayout::new(config.grid.clone()),
        session.items().to_vec(),
    )
}

fn grid_with_item(
    config: &Config,
    session: &Session,
    id: &str,
) -> anyhow::Result<(Timetable, ItemId)> {
    let grid = grid_for(config, session);
    let id = ItemId::new(id);
    if grid.item(&id).is_none() {
        return Err(Error::ItemNotFound(id.to_string()).into());
    }
    Ok((grid, id))
}

fn check_hour(grid: &GridConfig, hour: u32) -> anyhow::Result<()> {
    if !grid.contains_hour(hour) {
        bail!(
            "hour {hour} is outside the grid ({}:00 to {}:00)",
            grid.start_hour,
            grid.end_hour
        );
    }
    Ok(())
}

fn handle_add(
    config: &Config,
    session: &Session,
    cmd: &AddCommand,
) -> anyhow::Result<Option<Change>> {
    let mut grid = grid_for(config, session);
    let point = match cmd.placement() {
        Some(Placement::Cell { day, hour }) => {
            check_hour(&config.grid, hour)?;
            grid.layout().cell_center(Cell::new(day, hour))
        }
        Some(Placement::Point { x, y }) => grid.layout().to_client(Point::new(x, y)),
        None => bail!("give either --day and --hour or --x and --y"),
    };

    let module = ModuleDescriptor {
        id: cmd.module_id.clone(),
        name: cmd.name.clone(),
        code: cmd.code.clone(),
    };
    Ok(grid.drop_module(point, &module))
}

fn handle_move(
    config: &Config,
    session: &Session,
    cmd: &MoveCommand,
) -> anyhow::Result<Option<Change>> {
    check_hour(&config.grid, cmd.hour)?;
    let (mut grid, id) = grid_with_item(config, session, &cmd.id)?;
    Ok(grid.drag_item_to(&id, Cell::new(cmd.day, cmd.hour)))
}

fn handle_resize(
    config: &Config,
    session: &Session,
    cmd: &ResizeCommand,
) -> anyhow::Result<Option<Change>> {
    let (mut grid, id) = grid_with_item(config, session, &cmd.id)?;
    let change = grid.resize_item_to(&id, cmd.duration);
    if let Some(item) = grid.item(&id) {
        if item.duration != cmd.duration {
            println!("Duration limited to {} hour(s)", item.duration);
        }
    }
    Ok(change)
}

async fn commit(session: &mut Session, change: Option<Change>) -> anyhow::Result<()> {
    let Some(change) = change else {
        println!("No change: the slot is taken or nothing moved.");
        return Ok(());
    };

    session
        .apply(&change)
        .await
        .with_context(|| format!("failed to save {} of {}", change.action(), change.item_id()))?;

    match &change {
        Change::Add(item) => {
            // The store assigns the persisted id
            let saved = session
                .items()
                .iter()
                .find(|it| it.day == item.day && it.start_hour == item.start_hour)
                .unwrap_or(item);
            println!("Added {}", describe(saved));
        }
        Change::Update(item) => println!("Updated {}", describe(item)),
        Change::Delete(item_ref) => println!("Deleted {}", item_ref.id),
    }
    Ok(())
}

async fn handle_import(
    config: &Config,
    session: &mut Session,
    cmd: &ImportCommand,
) -> anyhow::Result<()> {
    let items = read_items(&cmd.file)
        .with_context(|| format!("failed to import {}", cmd.file.display()))?;

    let count = session
        .import(items, &config.grid)
        .await
        .context("failed to import timetable")?
        .len();
    println!("Imported {count} item(s) for {}", session.user());
    Ok(())
}

fn describe(item: &TimetableItem) -> String {
    let day = usize::try_from(item.day)
        .ok()
        .and_then(|day| DAY_LABELS.get(day))
        .copied()
        .unwrap_or("?");
    format!(
        "{} {} {} ({}) {} {}:00-{}:00",
        item.id,
        item.module_code,
        item.title,
        item.session_type,
        day,
        item.start_hour,
        item.end_hour()
    )
}

fn print_timetable(
    grid: &GridConfig,
    items: &[TimetableItem],
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(items)?),
        OutputFormat::List => {
            let mut sorted: Vec<&TimetableItem> = items.iter().collect();
            sorted.sort_by_key(|it| (it.day, it.start_hour));
            if sorted.is_empty() {
                println!("No items.");
            }
            for item in sorted {
                println!("{}", describe(item));
            }
        }
        OutputFormat::Grid => print_grid(grid, items),
    }
    Ok(())
}

fn print_grid(grid: &GridConfig, items: &[TimetableItem]) {
    const WIDTH: usize = 12;

    print!("{:>6}", "");
    for label in DAY_LABELS {
        print!(" | {label:<WIDTH$}");
    }
    println!();

    for hour in grid.start_hour..grid.end_hour {
        print!("{:>6}", format!("{hour}:00"));
        for day in 0..DAY_COUNT {
            let cell = items
                .iter()
                .find(|it| it.day == day && (it.start_hour..it.end_hour()).contains(&hour))
                .map_or(String::new(), |it| {
                    if it.start_hour == hour {
                        it.module_code.chars().take(WIDTH).collect()
                    } else {
                        "  ..".to_string()
                    }
                });
            print!(" | {cell:<WIDTH$}");
        }
        println!();
    }
}

fn handle_status(cli: &Cli, config: &Config, json: bool) -> anyhow::Result<()> {
    let path = config.database_path();
    let storage = Storage::open(&path)
        .with_context(|| format!("failed to open timetable database {}", path.display()))?;
    let stats = storage.stats()?;

    let user = cli.user_id(config).ok();
    let (user_items, revision) = match &user {
        Some(user) => (
            Some(storage.load_items(user)?.len()),
            Some(storage.revision(user)?),
        ),
        None => (None, None),
    };

    if json {
        let status = serde_json::json!({
            "database_path": path,
            "timetables": stats.timetables,
            "total_items": stats.total_items,
            "last_updated": stats.last_updated.map(|t| t.to_rfc3339()),
            "db_size_bytes": stats.db_size_bytes,
            "user": user.as_ref().map(ToString::to_string),
            "user_items": user_items,
            "user_revision": revision,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("ttgrid status");
        println!("-------------");
        println!("Database:      {}", path.display());
        println!("Size:          {} bytes", stats.db_size_bytes);
        println!("Timetables:    {}", stats.timetables);
        println!("Items:         {}", stats.total_items);
        if let Some(updated) = stats.last_updated {
            println!("Last update:   {}", updated.to_rfc3339());
        }
        if let (Some(user), Some(items), Some(revision)) = (&user, user_items, revision) {
            println!();
            println!("User:          {user}");
            println!("Items:         {items}");
            println!("Revision:      {revision}");
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: &ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if *json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                let grid = &config.grid;
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Grid]");
                println!("  Hours:              {}:00 - {}:00", grid.start_hour, grid.end_hour);
                println!("  Hour height:        {} px", grid.hour_height);
                println!("  Container width:    {} px", grid.container_width);
                println!("  Resize zone:        {} px", grid.resize_zone);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Session]");
                println!(
                    "  User:               {}",
                    config.session.user.as_deref().unwrap_or("(not set)")
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.clone().unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

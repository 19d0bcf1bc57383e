use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use log::info;

use blogdesk::workflow::{NavigationRequest, Route};
use blogdesk::{boot, youtube};
use blogdesk::{BlogDesk, BlogListing, DeskConfig, DeskError, MergeOutcome, PostStatus, PreviewedDraft};

#[derive(Parser)]
#[command(name = "blogdesk")]
#[command(about = "Draft, preview and publish blog posts")]
struct Cli {
    /// Config file (defaults to ./blogdesk.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a draft and print its preview markup
    Preview {
        /// Draft JSON file
        draft: PathBuf,
    },
    /// Validate a draft and merge it into the listing
    Publish {
        /// Draft JSON file
        draft: PathBuf,
        /// Update this post instead of the one named in the file
        #[arg(long)]
        id: Option<i64>,
    },
    /// List published posts
    List,
    /// Print the read-only view of a published post
    Show { id: i64 },
    /// Activate or deactivate a post
    Status {
        id: i64,
        /// active | inactive
        status: String,
    },
    /// Delete a post
    Remove { id: i64 },
    /// Print the video id of a YouTube link
    YoutubeId { url: String },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), DeskError> {
    if let Commands::YoutubeId { url } = &cli.command {
        match youtube::extract_id(url) {
            Some(id) => println!("{}", id),
            None => return Err(DeskError::Config(format!("no YouTube video id in '{}'", url))),
        }
        return Ok(());
    }

    let config = DeskConfig::load(cli.config.as_deref())?;
    boot::run(&config)?;
    let listing = BlogListing::load(&config.listing_path, config.match_title_author_date)?;
    let listing_path = config.listing_path.clone();
    let mut desk = BlogDesk::new(config, listing);

    match cli.command {
        Commands::Preview { draft } => {
            open_draft(&mut desk, &draft, None)?;
            desk.submit_for_preview()?;
            println!("{}", desk.render_preview()?);
        }
        Commands::Publish { draft, id } => {
            open_draft(&mut desk, &draft, id)?;
            desk.submit_for_preview()?;
            match desk.publish()? {
                MergeOutcome::Inserted(id) => println!("Published post {}", id),
                MergeOutcome::Updated(id) => println!("Updated post {}", id),
                MergeOutcome::Duplicate(id) => println!("Already published as post {}, nothing to do", id),
            }
            desk.listing().save(&listing_path)?;
        }
        Commands::List => {
            let rows = desk.rows();
            if rows.is_empty() {
                println!("No posts found.");
            }
            for row in rows {
                let scheduled = row
                    .scheduled_for
                    .map(|at| format!(" (scheduled {})", at.format("%Y-%m-%d %H:%M")))
                    .unwrap_or_default();
                println!(
                    "{:>3}. [{}] {} {}{}",
                    row.serial, row.id, row.status, row.title, scheduled
                );
            }
        }
        Commands::Show { id } => {
            println!("{}", desk.preview_published(id)?);
        }
        Commands::Status { id, status } => {
            let status = PostStatus::from_str(&status)
                .ok_or_else(|| DeskError::Config(format!("unknown status '{}'", status)))?;
            desk.set_status(id, status)?;
            desk.listing().save(&listing_path)?;
            println!("Post {} is now {}", id, status);
        }
        Commands::Remove { id } => {
            desk.remove(id)?;
            desk.listing().save(&listing_path)?;
            println!("Deleted post {}", id);
        }
        Commands::YoutubeId { .. } => {}
    }
    Ok(())
}

/// Load a draft file into the editor. The file holds either a bare draft or
/// an `{ "origin": .., "draft": .. }` envelope.
fn open_draft(desk: &mut BlogDesk, path: &Path, id: Option<i64>) -> Result<(), DeskError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| DeskError::Io(format!("{}: {}", path.display(), e)))?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    let mut previewed = if value.get("draft").is_some() {
        PreviewedDraft::from_navigation_state(value)?
    } else {
        PreviewedDraft {
            origin: None,
            draft: serde_json::from_value(value)?,
        }
    };
    if id.is_some() {
        previewed.origin = id;
    }
    info!("Opened draft '{}' from {}", previewed.draft.title, path.display());
    desk.navigate(NavigationRequest {
        route: Route::Editor,
        state: Some(previewed.to_navigation_state()?),
    })
}

use clap::{Parser, Subcommand};
use roster::capture::{self, CandidateFile};
use roster::config::{self, RosterConfig};
use roster::crop::CropSession;
use roster::employee::EmployeeFields;
use roster::imaging::{CropRegion, DisplaySize, EncodedPhoto, RustBackend};
use roster::logging::{self, Verbosity};
use roster::output;
use roster::photo::{PhotoLink, PhotoRef};
use roster::reconcile::Direction;
use roster::roster::{Roster, RosterError};
use roster::store::{self, DocumentStore};
use roster::transcribe::{AudioClip, HttpTranscriber, Transcriber};
use std::path::{Path, PathBuf};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

/// How an uploaded photo is cropped from the command line.
#[derive(clap::Args, Clone, Default)]
struct CropArgs {
    /// Size the image is displayed at while cropping, as WIDTHxHEIGHT
    /// (defaults to its natural size)
    #[arg(long, value_parser = parse_display)]
    display: Option<DisplaySize>,

    /// Crop square in displayed pixels, as X,Y,EDGE
    /// (defaults to the centered initial square)
    #[arg(long, value_parser = parse_region)]
    region: Option<CropRegion>,
}

/// Photo source for add/edit.
#[derive(clap::Args, Clone, Default)]
struct PhotoArgs {
    /// Image file to crop and embed
    #[arg(long, conflicts_with = "photo_url")]
    photo: Option<PathBuf>,

    /// External http(s) image URL, stored as-is
    #[arg(long)]
    photo_url: Option<String>,

    #[command(flatten)]
    crop: CropArgs,
}

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "Manage the team roster: photos, details and display order")]
#[command(long_about = "\
Manage the team roster: photos, details and display order

Photos go through capture → square crop → data URL before they are saved
inside the employee record:

  capture   at most 700 KB, image/* only
  crop      1:1 square, at least 150x150 px of the original image
  encode    PNG (or JPEG) data URL; above 950 KB a warning is shown

The display order is always 0..N-1. Deleting or moving an employee rewrites
the affected orders in one batch; if the team changed elsewhere in the
meantime the batch is refused and the list reloaded.

Run 'roster gen-config' to generate a documented roster.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Directory containing roster.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List employees in display order
    List,
    /// Add an employee at the end of the list
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        role: String,
        #[arg(long)]
        description: String,
        #[command(flatten)]
        photo: PhotoArgs,
    },
    /// Change an employee's details or photo
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[command(flatten)]
        photo: PhotoArgs,
        /// Go back to the placeholder photo
        #[arg(long, conflicts_with_all = ["photo", "photo_url"])]
        clear_photo: bool,
    },
    /// Remove an employee and close the gap in the order
    Delete { id: String },
    /// Move an employee one place up or down
    Move {
        id: String,
        #[arg(value_enum)]
        direction: Direction,
    },
    /// Crop an image and print its data URL without saving anything
    Crop {
        file: PathBuf,
        #[command(flatten)]
        crop: CropArgs,
        /// Write the data URL here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Transcribe an .mp3 or .m4a clip through the configured service
    Transcribe { file: PathBuf },
    /// Print a stock roster.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_logging(Verbosity::from_occurrences(cli.verbose, cli.quiet));

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.config_dir)?;

    match cli.command {
        Command::List => {
            let roster = open_roster(&config);
            let employees = roster.list_all().inspect_err(report)?;
            output::print_employees(&employees);
        }
        Command::Add {
            name,
            role,
            description,
            photo,
        } => {
            let photo = resolve_photo(&photo, &config)?.unwrap_or_default();
            let fields = EmployeeFields {
                name,
                role,
                description,
                photo,
            };
            let roster = open_roster(&config);
            let created = roster.create(&fields).inspect_err(report)?;
            println!("Added {} at position {}", created.name, position(created.order));
        }
        Command::Edit {
            id,
            name,
            role,
            description,
            photo,
            clear_photo,
        } => {
            let new_photo = resolve_photo(&photo, &config)?;
            let roster = open_roster(&config);
            roster.list_all().inspect_err(report)?;
            let Some(current) = roster.employee(&id) else {
                return Err(format!("no employee with id {id}").into());
            };
            let mut fields = current.fields();
            if let Some(name) = name {
                fields.name = name;
            }
            if let Some(role) = role {
                fields.role = role;
            }
            if let Some(description) = description {
                fields.description = description;
            }
            if clear_photo {
                fields.photo = PhotoRef::Placeholder;
            } else if let Some(photo) = new_photo {
                fields.photo = photo;
            }
            roster.update(&id, &fields).inspect_err(report)?;
            println!("Updated {}", fields.name.trim());
        }
        Command::Delete { id } => {
            let roster = open_roster(&config);
            roster.delete(&id).inspect_err(report)?;
            output::print_employees(&roster.employees());
        }
        Command::Move { id, direction } => {
            let roster = open_roster(&config);
            if roster.move_employee(&id, direction).inspect_err(report)? {
                output::print_employees(&roster.employees());
            } else {
                println!("Nothing to move");
            }
        }
        Command::Crop { file, crop, out } => {
            let photo = crop_photo(&file, &crop, &config)?;
            for line in output::format_photo(&photo) {
                eprintln!("{}", line);
            }
            match out {
                Some(path) => std::fs::write(path, photo.data_url.to_string())?,
                None => println!("{}", photo.data_url),
            }
        }
        Command::Transcribe { file } => {
            let clip = AudioClip::from_path(&file)?;
            let transcriber = HttpTranscriber::new(&config.transcription)?;
            println!("{}", transcriber.transcribe(&clip)?);
        }
        Command::GenConfig => unreachable!("handled above"),
    }

    store::disconnect();
    Ok(())
}

fn open_roster(config: &RosterConfig) -> Roster<impl DocumentStore> {
    Roster::new(store::connect(&config.store), config)
}

fn report(err: &RosterError) {
    output::print_notice(&output::notice_for(err));
}

fn position(order: Option<u32>) -> String {
    order.map_or_else(|| "N/A".to_string(), |o| (o + 1).to_string())
}

fn resolve_photo(
    args: &PhotoArgs,
    config: &RosterConfig,
) -> Result<Option<PhotoRef>, Box<dyn std::error::Error>> {
    if let Some(path) = &args.photo {
        let photo = crop_photo(path, &args.crop, config)?;
        return Ok(Some(PhotoRef::Encoded(photo.data_url)));
    }
    if let Some(url) = &args.photo_url {
        return Ok(Some(PhotoRef::External(PhotoLink::parse(url)?)));
    }
    Ok(None)
}

/// Capture, crop and encode one image file.
fn crop_photo(
    path: &Path,
    args: &CropArgs,
    config: &RosterConfig,
) -> Result<EncodedPhoto, Box<dyn std::error::Error>> {
    let backend = RustBackend::new();
    let candidate = CandidateFile::from_path(path)?;
    let image = capture::accept(candidate, &config.upload, &backend).inspect_err(|e| {
        output::print_notice(&output::notice_for_capture(e));
    })?;

    let display = args.display.unwrap_or(DisplaySize::new(
        image.natural.width as f64,
        image.natural.height as f64,
    ));
    let mut session = CropSession::new(config.crop.clone());
    session.load(image, display)?;
    if let Some(region) = args.region {
        session.drag(region)?;
        session.release()?;
    }

    let photo = session
        .apply(&backend, &config.encoder.to_encode_config())
        .inspect_err(|e| output::print_notice(&output::notice_for_crop(e)))?
        .clone();
    if let Some(notice) = output::notice_for_oversize(&photo) {
        output::print_notice(&notice);
    }
    Ok(photo)
}

fn parse_display(s: &str) -> Result<DisplaySize, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{s}`"))?;
    let parse = |v: &str| v.trim().parse::<f64>().map_err(|e| format!("`{v}`: {e}"));
    let size = DisplaySize::new(parse(w)?, parse(h)?);
    if !size.is_valid() {
        return Err(format!("display size must be positive, got `{s}`"));
    }
    Ok(size)
}

fn parse_region(s: &str) -> Result<CropRegion, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("`{v}`: {e}")))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        [x, y, edge] => Ok(CropRegion::square(*x, *y, *edge)),
        _ => Err(format!("expected X,Y,EDGE, got `{s}`")),
    }
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use facility_picker::core::locate::PositionOptions;
use facility_picker::{
    Answer, AnswerKey, FacilityConfig, FacilityId, FacilityMessage, FacilityQuestion, FacilityView,
    FixedPosition, LocateError, Location, PositionSource, RTreeFacilityIndex, SECTOR_CHOICES, Sector,
    SectorClass, SurveyDb,
};

#[derive(Parser)]
#[command(name = "facility-picker")]
#[command(about = "Answer a facility survey question: pick a nearby facility or register a new one")]
struct Cli {
    /// Answer store (SQLite); created if missing
    #[arg(long, value_name = "FILE", default_value = "survey.db")]
    db: PathBuf,

    /// JSON list of known facilities
    #[arg(long, value_name = "FILE")]
    facilities: Option<PathBuf>,

    #[arg(long, value_name = "ID")]
    survey: String,

    #[arg(long, value_name = "ID")]
    question: String,

    /// Search radius in meters
    #[arg(long, default_value_t = facility_picker::config::DEFAULT_SEARCH_RADIUS_M)]
    radius: f64,

    /// Maximum number of nearby facilities to list
    #[arg(long, default_value_t = facility_picker::config::DEFAULT_MAX_RESULTS)]
    max_results: usize,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a position fix and list the facilities around it
    Locate {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
    /// List facilities around the last recorded position
    Nearby,
    /// Answer with an existing nearby facility
    Select { facility_id: String },
    /// Set the name of the new facility
    Name { name: String },
    /// Set the sector of the new facility (water, energy, education, health or free text)
    Sector { sector: String },
    /// Print the stored answer
    Show,
    /// Open the question in a window
    #[cfg(feature = "gui")]
    Gui {
        #[arg(long, allow_hyphen_values = true, requires = "lng")]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lng: Option<f64>,
    },
}

/// The command line has no device; a fix is only available when given as arguments.
#[derive(Debug, Clone, Copy)]
struct CliPosition(Option<Location>);

impl PositionSource for CliPosition {
    async fn current_position(&self, options: PositionOptions) -> Result<Location, LocateError> {
        match self.0 {
            Some(location) => FixedPosition(location).current_position(options).await,
            None => Err(LocateError::Unavailable("no position given".to_string())),
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_candidates<S, I, P>(question: &FacilityQuestion<S, I, P>)
where
    S: facility_picker::AnswerRepository + facility_picker::LocationCache,
    I: facility_picker::FacilityIndex,
    P: PositionSource,
{
    let candidates = question.candidates();
    match question.location() {
        Some(loc) => println!("Position: {:.6}, {:.6}", loc.lat, loc.lng),
        None => println!("Position: unknown (run `locate` first)"),
    }
    if candidates.is_empty() {
        println!("No facilities nearby.");
        return;
    }
    println!("\nNearby facilities:");
    for c in candidates {
        let distance = question
            .location()
            .map(|loc| loc.distance_to(&c.location()))
            .unwrap_or(0.0);
        println!(
            "  {}  {} ({}) - {:.0} m",
            c.uuid,
            c.name,
            c.sector().unwrap_or("-"),
            distance
        );
    }
}

fn print_answer(answer: &Answer) -> anyhow::Result<()> {
    match answer {
        Answer::Empty => println!("No answer."),
        Answer::Existing(existing) => println!(
            "Existing facility {} \"{}\"",
            existing.facility_id, existing.facility_name
        ),
        Answer::Draft(draft) => println!(
            "New facility {} \"{}\"",
            draft.facility_id,
            draft.facility_name.as_deref().unwrap_or("")
        ),
    }
    if !answer.is_empty() {
        println!("{}", serde_json::to_string_pretty(&answer.to_responses())?);
    }
    Ok(())
}

async fn run(args: Cli, config: FacilityConfig, key: AnswerKey) -> anyhow::Result<()> {
    let index = match &args.facilities {
        Some(path) => RTreeFacilityIndex::from_json_file(path)?,
        None => RTreeFacilityIndex::new(),
    };
    let db = SurveyDb::new(&args.db).await?;

    let source = match &args.command {
        Command::Locate { lat, lng } => CliPosition(Some(Location::new(*lat, *lng))),
        _ => CliPosition(None),
    };
    let mut question = FacilityQuestion::new(db.clone(), key, &index, source, &config).await?;

    match args.command {
        Command::Locate { .. } => {
            if !question.refresh_location().await? {
                println!("Location could not be determined.");
            }
            print_candidates(&question);
        }
        Command::Nearby => print_candidates(&question),
        Command::Select { facility_id } => {
            let facility_id = FacilityId::from(facility_id);
            question
                .update(FacilityMessage::SelectFacility(facility_id.clone()))
                .await?;
            match question.answer().await? {
                Answer::Existing(existing) if existing.facility_id == facility_id => {
                    print_answer(&Answer::Existing(existing))?
                }
                _ => println!("Facility {} is not among the nearby facilities.", facility_id),
            }
        }
        Command::Name { name } => {
            question.update(FacilityMessage::NameInput(name)).await?;
            print_answer(&question.answer().await?)?;
        }
        Command::Sector { sector } => {
            let message = match Sector::from_value(&sector) {
                Some(listed) => FacilityMessage::SectorSelected(vec![listed.value().to_string()]),
                None => FacilityMessage::OtherSectorInput(sector),
            };
            question.update(message).await?;
            print_answer(&question.answer().await?)?;
        }
        Command::Show => {
            print_answer(&question.answer().await?)?;
            if let FacilityView::Authoring(view) = question.view().await? {
                let sector = match view.sector {
                    SectorClass::Unset => "-".to_string(),
                    SectorClass::Fixed(s) => s.label().to_string(),
                    SectorClass::Other(s) => format!("other: {}", s),
                };
                let choices: Vec<_> = SECTOR_CHOICES.iter().map(|s| s.value()).collect();
                println!("Sector: {} (choices: {})", sector, choices.join(", "));
            }
        }
        #[cfg(feature = "gui")]
        Command::Gui { .. } => anyhow::bail!("the window is opened outside the command runtime"),
    }

    drop(question);
    db.close().await?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose);

    let config = FacilityConfig::default()
        .with_search_radius(args.radius)
        .with_max_results(args.max_results);
    let key = AnswerKey::new(args.survey.clone(), args.question.clone());

    #[cfg(feature = "gui")]
    if let Command::Gui { lat, lng } = &args.command {
        let location = lat.zip(*lng).map(|(lat, lng)| Location::new(lat, lng));
        let options = facility_picker::gui::LaunchOptions {
            db: args.db.clone(),
            facilities: args.facilities.clone(),
            key,
            config,
        };
        facility_picker::gui::run(options, CliPosition(location))?;
        return Ok(());
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(args, config, key))
}

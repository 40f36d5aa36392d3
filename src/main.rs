use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tablero::config::Settings;
use tablero::leads::{Contact, LeadStatus, LeadStore, NewLead};
use tablero::location::{LocationResolver, ResolvedAddress};
use tablero::pricing::{Catalog, Difficulty, LineSelection, QuoteRequest, QuoteSummary, Urgency};
use tablero::quote::{render_ascii_breakdown, Quoter};
use tablero::zone::{Coordinates, ServiceArea};
use uuid::Uuid;

/// Tablero: quote configurator and lead intake for electrical jobs.
///
/// Examples:
///   tablero zone --lat -34.6037 --lon -58.3816
///   tablero locate "Av. Cabildo 2000, Belgrano"
///   tablero quote starter-residencial --bocas 14 --item toma-exterior=2 --address Palermo
///   tablero quote hogar-completo --urgency priority --professional certificado-dci=1 --lat -34.47 --lon -58.53
///   tablero leads list --status new
///   tablero serve --port 8080
#[derive(Parser)]
#[command(name = "tablero", version, about, long_about = None)]
struct Cli {
    /// Data directory (config.toml, catalog.json, leads.json, geocode cache).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Offline mode: no network geocoding, cache and built-in localities only.
    #[arg(long, global = true)]
    offline: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the coverage zone of a coordinate.
    Zone {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
    /// Geocode an address and show its zone.
    Locate {
        address: String,
    },
    /// Price a job.
    Quote(QuoteArgs),
    /// Print the active price catalog as JSON.
    Catalog,
    /// Inspect and update stored leads.
    Leads {
        #[command(subcommand)]
        action: LeadsCommand,
    },
    /// Run the HTTP API.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Args)]
struct QuoteArgs {
    /// Pack id, e.g. starter-residencial.
    pack: String,

    /// Additional labor item as ID=QTY. Repeatable.
    #[arg(long = "item", value_parser = parse_selection)]
    items: Vec<LineSelection>,

    /// Professional item (certificates, measurements) as ID=QTY. Repeatable.
    #[arg(long = "professional", value_parser = parse_selection)]
    professional: Vec<LineSelection>,

    /// standard, priority or emergency.
    #[arg(long, default_value = "standard")]
    urgency: Urgency,

    /// low, medium or high.
    #[arg(long, default_value = "low")]
    difficulty: Difficulty,

    /// Total bocas (electrical points) on site.
    #[arg(long, default_value_t = 0)]
    bocas: u32,

    /// Total ambientes (rooms) on site.
    #[arg(long, default_value_t = 0)]
    ambientes: u32,

    #[arg(long, allow_hyphen_values = true, requires = "lon")]
    lat: Option<f64>,

    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    lon: Option<f64>,

    /// Site address, geocoded when no --lat/--lon is given.
    #[arg(long)]
    address: Option<String>,

    /// Store the quote as a lead (requires --name and --email or --phone).
    #[arg(long)]
    save: bool,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    email: Option<String>,

    #[arg(long)]
    phone: Option<String>,
}

#[derive(Subcommand)]
enum LeadsCommand {
    /// List leads, newest first.
    List {
        #[arg(long)]
        status: Option<LeadStatus>,
    },
    /// Change a lead's status.
    Status {
        id: Uuid,
        status: LeadStatus,
    },
}

fn parse_selection(s: &str) -> Result<LineSelection, String> {
    let (id, qty) = match s.split_once('=') {
        Some((id, qty)) => (id.trim(), qty.trim()),
        None => (s.trim(), "1"),
    };
    if id.is_empty() {
        return Err(format!("Invalid item '{}'. Use ID=QTY.", s));
    }
    let quantity = qty
        .parse::<u32>()
        .map_err(|_| format!("Invalid quantity '{}' in '{}'.", qty, s))?;
    Ok(LineSelection::new(id, quantity))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = Settings::load(cli.data_dir.clone()).context("loading settings")?;
    settings.offline |= cli.offline;
    settings.log_json |= cli.log_json;

    let default_level = if matches!(cli.command, Command::Serve { .. }) { "info" } else { "warn" };
    tablero::telemetry::init_tracing(settings.log_json, default_level);

    match cli.command {
        Command::Zone { lat, lon } => {
            let resolution = ServiceArea::default().resolve(Coordinates::new(lat, lon))?;
            eprintln!("  {} \u{2192} {} (x{:.2})", Coordinates::new(lat, lon), resolution.tier, resolution.multiplier);
            println!("{}", serde_json::to_string_pretty(&resolution)?);
        }
        Command::Locate { address } => {
            let mut resolver = resolver(&settings);
            let loc = resolver.resolve_address(&address)?;
            let zone = ServiceArea::default().resolve(loc.coordinates)?;
            eprintln!("  {}", loc.display_line());
            eprintln!("  Zone: {}", zone.tier);
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "location": loc, "zone": zone }))?);
        }
        Command::Quote(args) => quote(&settings, args)?,
        Command::Catalog => {
            let catalog = Catalog::load_or_builtin(&settings.data_dir)?;
            println!("{}", serde_json::to_string_pretty(&catalog)?);
        }
        Command::Leads { action } => leads(&settings, action)?,
        Command::Serve { host, port } => {
            if let Some(host) = host {
                settings.host = host;
            }
            if let Some(port) = port {
                settings.port = port;
            }
            let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
            runtime.block_on(tablero::server::start(&settings))?;
        }
    }
    Ok(())
}

fn resolver(settings: &Settings) -> LocationResolver {
    let mut resolver = LocationResolver::new(&settings.data_dir);
    resolver.set_offline(settings.offline);
    resolver
}

fn quote(settings: &Settings, args: QuoteArgs) -> anyhow::Result<()> {
    let site: Option<ResolvedAddress> = match (args.lat, args.lon, &args.address) {
        (Some(lat), Some(lon), _) => Some(LocationResolver::from_manual(Coordinates::checked(lat, lon)?)),
        (_, _, Some(address)) => match resolver(settings).resolve_address(address) {
            Ok(loc) => Some(loc),
            Err(e) => {
                eprintln!("  \u{26A0}\u{FE0F}  {}: quoting without a site location", e);
                None
            }
        },
        _ => None,
    };
    if let Some(loc) = &site {
        eprintln!("  {}", loc.display_line());
    }

    let request = QuoteRequest {
        pack_id: args.pack,
        items: args.items,
        summary: QuoteSummary {
            urgency: args.urgency,
            difficulty: args.difficulty,
            bocas: args.bocas,
            ambientes: args.ambientes,
            professional: args.professional,
        },
    };

    let catalog = Catalog::load_or_builtin(&settings.data_dir)?;
    let quoter = Quoter::new(catalog, ServiceArea::default());
    let coordinates = site.as_ref().map(|l| l.coordinates);
    let output = quoter.quote(&request, coordinates)?;

    eprint!("{}", render_ascii_breakdown(&output));

    if !args.save {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let Some(name) = args.name else {
        bail!("--save needs --name");
    };
    let mut store = LeadStore::open(&settings.data_dir)?;
    let lead = store.create(NewLead {
        contact: Contact { name, email: args.email, phone: args.phone },
        address: args.address,
        coordinates,
        quote: output,
        notes: None,
    })?;
    eprintln!("  Lead {} saved.", lead.id);
    println!("{}", serde_json::to_string_pretty(&lead)?);
    Ok(())
}

fn leads(settings: &Settings, action: LeadsCommand) -> anyhow::Result<()> {
    let mut store = LeadStore::open(&settings.data_dir)?;
    let tz = settings.tz()?;

    match action {
        LeadsCommand::List { status } => {
            let leads = store.list(status);
            for lead in &leads {
                eprintln!(
                    "  {}  {}  {:<9} {:<8} {:>14}  {}",
                    lead.id,
                    lead.created_local(tz),
                    lead.status,
                    lead.quote.zone.tier,
                    tablero::quote::format_amount(lead.quote.breakdown.total),
                    lead.contact.name,
                );
            }
            eprintln!("  {} lead(s)", leads.len());
            println!("{}", serde_json::to_string_pretty(&leads)?);
        }
        LeadsCommand::Status { id, status } => {
            let lead = store.set_status(id, status)?;
            eprintln!("  Lead {} is now {}", lead.id, lead.status);
            println!("{}", serde_json::to_string_pretty(&lead)?);
        }
    }
    Ok(())
}

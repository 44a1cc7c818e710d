use anyhow::{anyhow, bail, Context};
use busline_api::{render, ApiClient, ClientError};
use busline_catalog::{FareEngine, SeatMap, SeatSelection, TripDraft, TripUpdate};
use busline_core::directory::filter_users;
use busline_core::identity::{Credentials, Registration};
use busline_core::{CatalogView, SearchFilter, SessionStore};
use busline_order::{views, BookingLedger, Checkout};
use busline_shared::PaymentMethod;
use busline_store::{Config, FileSessionStore};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "busline", about = "Search buses, book seats and manage the fleet")]
struct Cli {
    #[arg(long, env = "BUSLINE_API_URL", help = "Server base URL (overrides config)")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "BUSLINE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create a rider account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "BUSLINE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    Whoami,
    /// List trips, optionally filtered
    Search {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long, help = "Travel date, YYYY-MM-DD")]
        date: Option<NaiveDate>,
    },
    /// Trip details with the seat map
    Show { trip_id: String },
    /// Price a selection without booking
    Quote {
        trip_id: String,
        #[command(flatten)]
        seats: SeatArgs,
    },
    Book {
        trip_id: String,
        #[command(flatten)]
        seats: SeatArgs,
        #[arg(long, value_enum, default_value_t = PayArg::Online)]
        pay: PayArg,
        #[arg(long, help = "Confirm the online payment")]
        confirm: bool,
    },
    /// Your bookings; upcoming unless --history
    Bookings {
        #[arg(long)]
        history: bool,
    },
    Cancel { booking_id: String },
    #[command(subcommand)]
    Admin(AdminCommand),
    #[command(subcommand)]
    Trip(TripCommand),
}

#[derive(Args)]
struct SeatArgs {
    #[arg(long = "seat", value_name = "N", action = clap::ArgAction::Append)]
    seats: Vec<u32>,
    #[arg(long, requires = "to", conflicts_with = "seats")]
    from: Option<String>,
    #[arg(long, requires = "from")]
    to: Option<String>,
    #[arg(long, default_value_t = 1, help = "Seats for a --from/--to booking")]
    count: u32,
}

impl SeatArgs {
    fn selection(&self) -> anyhow::Result<SeatSelection> {
        match (&self.from, &self.to) {
            (Some(origin), Some(destination)) => Ok(SeatSelection::Segment {
                origin: origin.clone(),
                destination: destination.clone(),
                seats: self.count,
            }),
            _ if !self.seats.is_empty() => Ok(SeatSelection::Numbered(self.seats.clone())),
            _ => bail!("Pick seats with --seat N, or a segment with --from and --to"),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PayArg {
    Online,
    Cash,
}

impl From<PayArg> for PaymentMethod {
    fn from(p: PayArg) -> Self {
        match p {
            PayArg::Online => PaymentMethod::Online,
            PayArg::Cash => PaymentMethod::Cash,
        }
    }
}

#[derive(Subcommand)]
enum AdminCommand {
    Stats,
    Users {
        #[arg(long)]
        search: Option<String>,
    },
    UserBookings { user_id: String },
    Bookings,
    /// Mark a cash booking as paid
    ConfirmPayment { booking_id: String },
    /// Cancel unpaid bookings whose bus has left
    ExpireUnpaid,
}

#[derive(Subcommand)]
enum TripCommand {
    Create {
        #[arg(long)]
        bus_name: String,
        #[arg(long)]
        bus_number: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long = "stop", required = true, action = clap::ArgAction::Append)]
        stops: Vec<String>,
        #[arg(long, help = "RFC 3339, e.g. 2026-11-02T06:00:00Z")]
        starts: DateTime<Utc>,
        #[arg(long)]
        ends: DateTime<Utc>,
        #[arg(long)]
        seats: Option<u32>,
        #[arg(long)]
        inactive: bool,
    },
    Update {
        trip_id: String,
        #[arg(long)]
        bus_name: Option<String>,
        #[arg(long)]
        bus_number: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "add-stop", action = clap::ArgAction::Append)]
        add_stops: Vec<String>,
        #[arg(long = "remove-stop", value_name = "POSITION", action = clap::ArgAction::Append)]
        remove_stops: Vec<usize>,
        #[arg(long)]
        starts: Option<DateTime<Utc>>,
        #[arg(long)]
        ends: Option<DateTime<Utc>>,
        #[arg(long)]
        seats: Option<u32>,
        #[arg(long)]
        active: Option<bool>,
    },
    Delete { trip_id: String },
}

struct App {
    config: Config,
    client: ApiClient,
    store: FileSessionStore,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(2);
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log.filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli, config).await {
        match e.downcast_ref::<ClientError>() {
            Some(client_err) => eprintln!("Error: {}", client_err.user_message()),
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let store = FileSessionStore::new(config.session.resolved_path());
    let base_url = cli
        .api_url
        .clone()
        .unwrap_or_else(|| config.api.base_url.clone());
    tracing::debug!("Using API at {}", base_url);

    let mut client = ApiClient::new(base_url);
    if let Some(session) = store.load().map_err(|e| anyhow!(e))? {
        client = client.with_session(session);
    }
    let app = App {
        config,
        client,
        store,
    };

    let result = dispatch(&app, cli.command).await;
    if let Err(e) = &result {
        if let Some(ClientError::Status { status: 401, .. }) = e.downcast_ref::<ClientError>() {
            tracing::info!("Session rejected by server; clearing it");
            app.store.clear().map_err(|e| anyhow!(e))?;
        }
    }
    result
}

async fn dispatch(app: &App, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Login { email, password } => login(app, email, password).await,
        Command::Register {
            name,
            email,
            password,
        } => register(app, name, email, password).await,
        Command::Logout => {
            app.store.clear().map_err(|e| anyhow!(e))?;
            println!("Signed out");
            Ok(())
        }
        Command::Whoami => {
            match app.client.session() {
                Some(s) => println!("{} ({})", s.user.name, s.role()),
                None => println!("Not signed in"),
            }
            Ok(())
        }
        Command::Search { from, to, date } => search(app, from, to, date).await,
        Command::Show { trip_id } => show(app, &trip_id).await,
        Command::Quote { trip_id, seats } => quote(app, &trip_id, &seats).await,
        Command::Book {
            trip_id,
            seats,
            pay,
            confirm,
        } => book(app, &trip_id, &seats, pay.into(), confirm).await,
        Command::Bookings { history } => my_bookings(app, history).await,
        Command::Cancel { booking_id } => cancel(app, &booking_id).await,
        Command::Admin(cmd) => admin(app, cmd).await,
        Command::Trip(cmd) => trip(app, cmd).await,
    }
}

async fn login(app: &App, email: String, password: String) -> anyhow::Result<()> {
    let session = app
        .client
        .login(&Credentials::new(email, password))
        .await?;
    app.store.save(&session).map_err(|e| anyhow!(e))?;
    println!("Signed in as {} ({})", session.user.name, session.role());
    Ok(())
}

async fn register(app: &App, name: String, email: String, password: String) -> anyhow::Result<()> {
    let registration = Registration::new(name, email, password);
    let strength = registration.strength();
    if !strength.label().is_empty() {
        println!("Password strength: {}", strength.label());
    }
    app.client.register(&registration).await?;
    println!("Registered. You can now log in.");
    Ok(())
}

async fn search(
    app: &App,
    from: Option<String>,
    to: Option<String>,
    date: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let filter = SearchFilter::new(
        from.as_deref().unwrap_or(""),
        to.as_deref().unwrap_or(""),
        date,
    );
    let mut view = CatalogView::new();
    let result = if filter.is_empty() {
        view.load(&app.client).await
    } else {
        view.search(&app.client, filter).await
    };
    let trips = result.map_err(|e| anyhow!(e))?;

    if trips.is_empty() {
        println!("No buses found");
    }
    for trip in trips {
        println!("{}", render::trip_line(trip));
    }
    Ok(())
}

async fn show(app: &App, trip_id: &str) -> anyhow::Result<()> {
    let trip = app.client.get_trip(trip_id).await?;
    print!("{}", render::trip_detail(&trip));
    print!("{}", render::seat_grid(&SeatMap::for_trip(&trip)));
    Ok(())
}

fn fare_engine(config: &Config) -> anyhow::Result<FareEngine> {
    Ok(FareEngine::new(config.fare_config()?))
}

async fn quote(app: &App, trip_id: &str, seats: &SeatArgs) -> anyhow::Result<()> {
    let trip = app.client.get_trip(trip_id).await?;
    let quote = fare_engine(&app.config)?.quote(&trip, &seats.selection()?)?;
    println!("{}", render::quote_summary(&quote));
    Ok(())
}

async fn book(
    app: &App,
    trip_id: &str,
    seats: &SeatArgs,
    method: PaymentMethod,
    confirm: bool,
) -> anyhow::Result<()> {
    if app.client.session().is_none() {
        return Err(ClientError::NotAuthenticated.into());
    }
    let trip = app.client.get_trip(trip_id).await?;
    let checkout = Checkout::new(fare_engine(&app.config)?, Arc::new(app.client.clone()));
    let mut ledger = BookingLedger::new();

    let mut pending = checkout.prepare(&mut ledger, &trip, seats.selection()?, method)?;
    println!("{}", render::quote_summary(&pending.quote));

    if pending.requires_confirmation() {
        if !confirm {
            bail!("Online payment needs --confirm to go ahead");
        }
        pending.confirm_payment();
    }

    let outcome = checkout.complete(&mut ledger, pending).await?;
    print!("{}", render::ticket(&outcome));
    Ok(())
}

async fn my_bookings(app: &App, history: bool) -> anyhow::Result<()> {
    let mut ledger = BookingLedger::new();
    ledger.sync(app.client.my_bookings().await?);

    let now = Utc::now();
    let listed = if history {
        views::history(&ledger, now)
    } else {
        views::active(&ledger, now)
    };
    if listed.is_empty() {
        println!("No bookings");
    }
    for line in listed.into_iter().filter_map(render::tracked_line) {
        println!("{}", line);
    }
    Ok(())
}

async fn cancel(app: &App, booking_id: &str) -> anyhow::Result<()> {
    let mut ledger = BookingLedger::new();
    ledger.sync(app.client.my_bookings().await?);
    let handle = ledger
        .find_by_id(booking_id)
        .with_context(|| format!("No booking {}", booking_id))?;

    ledger.cancel(&handle)?;
    app.client.cancel_booking(booking_id).await?;
    println!("Booking {} cancelled", booking_id);
    Ok(())
}

async fn admin(app: &App, command: AdminCommand) -> anyhow::Result<()> {
    match command {
        AdminCommand::Stats => {
            print!("{}", render::stats_report(&app.client.admin_stats().await?));
        }
        AdminCommand::Users { search } => {
            let users = app.client.list_users().await?;
            for user in filter_users(&users, search.as_deref().unwrap_or("")) {
                println!("{}", render::user_line(user));
            }
        }
        AdminCommand::UserBookings { user_id } => {
            for booking in app.client.user_bookings(&user_id).await? {
                println!("{}", render::admin_booking_line(&booking));
            }
        }
        AdminCommand::Bookings => {
            for booking in app.client.all_bookings().await? {
                println!("{}", render::admin_booking_line(&booking));
            }
        }
        AdminCommand::ConfirmPayment { booking_id } => {
            let mut ledger = BookingLedger::new();
            ledger.sync(app.client.all_bookings().await?);
            let handle = ledger
                .find_by_id(&booking_id)
                .with_context(|| format!("No booking {}", booking_id))?;

            ledger.confirm_payment(&handle)?;
            app.client.confirm_payment(&booking_id).await?;
            println!("Payment for {} confirmed", booking_id);
        }
        AdminCommand::ExpireUnpaid => {
            let mut ledger = BookingLedger::new();
            ledger.sync(app.client.all_bookings().await?);

            let expired = ledger.expire_unpaid(Utc::now());
            for handle in &expired {
                if let Some(id) = ledger.get(handle).and_then(|b| b.server_id()) {
                    app.client.cancel_booking(id).await?;
                    println!("Cancelled unpaid booking {}", id);
                }
            }
            println!("{} booking(s) expired", expired.len());
        }
    }
    Ok(())
}

async fn trip(app: &App, command: TripCommand) -> anyhow::Result<()> {
    match command {
        TripCommand::Create {
            bus_name,
            bus_number,
            name,
            stops,
            starts,
            ends,
            seats,
            inactive,
        } => {
            let mut draft = TripDraft::new(app.config.fleet.default_total_seats);
            draft.bus_name = bus_name;
            draft.bus_number = bus_number;
            draft.name = name;
            for stop in &stops {
                draft.add_stop(stop)?;
            }
            draft.starts_at = Some(starts);
            draft.ends_at = Some(ends);
            if let Some(seats) = seats {
                draft.seats_available = seats;
            }
            draft.is_active = !inactive;

            app.client.create_trip(&draft).await?;
            println!("Trip created");
        }
        TripCommand::Update {
            trip_id,
            bus_name,
            bus_number,
            name,
            add_stops,
            remove_stops,
            starts,
            ends,
            seats,
            active,
        } => {
            let current = app.client.get_trip(&trip_id).await?;
            let mut update = TripUpdate::from_trip(&current);

            if let Some(v) = bus_name {
                update.bus_name = v;
            }
            if let Some(v) = bus_number {
                update.bus_number = v;
            }
            if let Some(v) = name {
                update.name = v;
            }
            for stop in &add_stops {
                update.add_stop(stop)?;
            }
            update.remove_positions(&remove_stops)?;
            if starts.is_some() {
                update.starts_at = starts;
            }
            if ends.is_some() {
                update.ends_at = ends;
            }
            if let Some(v) = seats {
                update.seats_available = v;
            }
            if let Some(v) = active {
                update.is_active = v;
            }

            app.client.update_trip(&update).await?;
            println!("Trip {} updated", trip_id);
        }
        TripCommand::Delete { trip_id } => {
            app.client.delete_trip(&trip_id).await?;
            println!("Trip {} deleted", trip_id);
        }
    }
    Ok(())
}

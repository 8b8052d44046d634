use std::io::Read as _;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};

use rollcall_core::{AttendanceEvent, AttendanceStatus, IdentitySummary, MatchResult};

// `#[zbus::proxy]` generates `RollcallProxy` (async) from this trait;
// method names map to the PascalCase D-Bus members rollcalld serves.
#[zbus::proxy(
    interface = "org.rollcall.Rollcall1",
    default_service = "org.rollcall.Rollcall1",
    default_path = "/org/rollcall/Rollcall1"
)]
trait Rollcall {
    async fn register(&self, name: &str, email: &str, embedding: Vec<f64>)
        -> zbus::Result<String>;
    async fn recognize(&self, embedding: Vec<f64>) -> zbus::Result<String>;
    async fn mark_attendance(&self, identity_id: &str) -> zbus::Result<String>;
    async fn check_status(&self, identity_id: &str) -> zbus::Result<String>;
    async fn list_identities(&self) -> zbus::Result<String>;
    async fn list_attendance(&self) -> zbus::Result<String>;
    async fn status(&self) -> zbus::Result<String>;
}

#[derive(Parser)]
#[command(name = "rollcall", about = "Rollcall attendance CLI")]
struct Cli {
    /// Connect over the system bus instead of the session bus
    #[arg(long, global = true)]
    system: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a person from an embedding
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,
        /// Email address (the stable registration key)
        #[arg(short, long)]
        email: String,
        /// JSON embedding file, or - for stdin
        embedding: String,
    },
    /// Match an embedding against the registered people
    Recognize {
        /// JSON embedding file, or - for stdin
        embedding: String,
    },
    /// Recognize an embedding and mark attendance for the match
    CheckIn {
        /// JSON embedding file, or - for stdin
        embedding: String,
    },
    /// Mark attendance for an identity by id
    Mark {
        /// Identity id (UUID)
        id: String,
    },
    /// Show attendance status for an identity
    Status {
        /// Identity id (UUID)
        id: String,
    },
    /// List registered identities
    List,
    /// List attendance events, newest first
    Attendance {
        /// Emit CSV instead of plain lines
        #[arg(long)]
        csv: bool,
    },
    /// Write all attendance events to a CSV file
    Export {
        /// Output path
        path: String,
    },
    /// Show daemon status
    DaemonStatus,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let conn = if cli.system {
        zbus::Connection::system().await
    } else {
        zbus::Connection::session().await
    }
    .context("connecting to the message bus (is rollcalld running?)")?;
    tracing::debug!(system = cli.system, "bus connection established");
    let proxy = RollcallProxy::new(&conn).await?;

    match cli.command {
        Commands::Register {
            name,
            email,
            embedding,
        } => {
            let values = read_embedding(&embedding)?;
            let raw = proxy.register(&name, &email, values).await?;
            let summary: IdentitySummary = serde_json::from_str(&raw)?;
            println!("registered {} <{}> ({})", summary.name, summary.email, summary.id);
        }
        Commands::Recognize { embedding } => {
            let values = read_embedding(&embedding)?;
            let raw = proxy.recognize(values).await?;
            let result: MatchResult = serde_json::from_str(&raw)?;
            if result.is_match() {
                println!("match: {} (distance {:.3})", result.label, result.distance);
            } else {
                println!("no match");
            }
        }
        Commands::CheckIn { embedding } => {
            let values = read_embedding(&embedding)?;
            let raw = proxy.recognize(values).await?;
            let result: MatchResult = serde_json::from_str(&raw)?;
            if !result.is_match() {
                bail!("no confident match; register first or lower the threshold");
            }
            let raw = proxy.mark_attendance(&result.label).await?;
            let event: AttendanceEvent = serde_json::from_str(&raw)?;
            println!(
                "checked in {} on {} (distance {:.3})",
                event.display_name, event.calendar_date, result.distance
            );
        }
        Commands::Mark { id } => {
            let raw = proxy.mark_attendance(&id).await?;
            let event: AttendanceEvent = serde_json::from_str(&raw)?;
            println!("marked {} on {}", event.display_name, event.calendar_date);
        }
        Commands::Status { id } => {
            let raw = proxy.check_status(&id).await?;
            let status: AttendanceStatus = serde_json::from_str(&raw)?;
            println!(
                "marked today: {}",
                if status.marked_today { "yes" } else { "no" }
            );
            match status.last_marked {
                Some(at) => println!("last marked:  {}", at.to_rfc3339()),
                None => println!("last marked:  never"),
            }
        }
        Commands::List => {
            let raw = proxy.list_identities().await?;
            let summaries: Vec<IdentitySummary> = serde_json::from_str(&raw)?;
            if summaries.is_empty() {
                println!("no identities registered");
            }
            for s in summaries {
                println!("{}  {} <{}>", s.id, s.name, s.email);
            }
        }
        Commands::Attendance { csv } => {
            let raw = proxy.list_attendance().await?;
            let events: Vec<AttendanceEvent> = serde_json::from_str(&raw)?;
            if csv {
                print!("{}", events_to_csv(&events));
            } else {
                if events.is_empty() {
                    println!("no attendance events");
                }
                for e in events {
                    println!("{}  {} ({})", e.marked_at.to_rfc3339(), e.display_name, e.calendar_date);
                }
            }
        }
        Commands::Export { path } => {
            let raw = proxy.list_attendance().await?;
            let events: Vec<AttendanceEvent> = serde_json::from_str(&raw)?;
            std::fs::write(&path, events_to_csv(&events))
                .with_context(|| format!("writing {path}"))?;
            println!("wrote {} events to {path}", events.len());
        }
        Commands::DaemonStatus => {
            let raw = proxy.status().await?;
            println!("{raw}");
        }
    }

    Ok(())
}

/// Read a JSON array of numbers from a file, or from stdin when the
/// argument is `-`.
fn read_embedding(arg: &str) -> Result<Vec<f64>> {
    let raw = if arg == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(arg).with_context(|| format!("reading embedding file {arg}"))?
    };
    serde_json::from_str(raw.trim()).context("embedding must be a JSON array of numbers")
}

fn events_to_csv(events: &[AttendanceEvent]) -> String {
    let mut out = String::from("event_id,identity_id,display_name,marked_at,calendar_date\n");
    for e in events {
        let fields = [
            e.id.to_string(),
            e.identity_id.to_string(),
            e.display_name.clone(),
            e.marked_at.to_rfc3339(),
            e.calendar_date.to_string(),
        ];
        let row: Vec<String> = fields.iter().map(|f| csv_escape(f)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// RFC 4180 quoting: wrap fields containing commas, quotes, or line
/// breaks, doubling embedded quotes.
fn csv_escape(field: &str) -> String {
    if field.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! KSTU portal CLI.
//!
//! A thin command-line front over the client library: the Rust analogue of
//! the mobile app's screens. Geolocation and the check-out photo come from
//! flags and files rather than device sensors.

use clap::{Parser, Subcommand};
use kstu_portal::{
    config::Config,
    device::{FilePhotoCamera, FixedGeolocator},
    models::GeoPoint,
    services::SessionPhase,
    PortalClient,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "kstu-portal", about = "KSTU university portal client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with portal credentials
    Login {
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Show session phase and the signed-in user
    Status,
    /// Fetch the HR profile from the portal
    Profile,
    /// Clear the session (keeps the device PIN)
    Logout,
    /// Store a PIN for local unlock
    SetPin { pin: String },
    /// Unlock a locked session with the device PIN
    Unlock { pin: String },
    /// Attendance check-in/check-out
    #[command(subcommand)]
    Attendance(AttendanceCommand),
}

#[derive(Subcommand)]
enum AttendanceCommand {
    /// List attendance records
    History,
    /// Show the most recent record and the inferred open check-in
    Last,
    /// Check in with a scanned QR payload at the given position
    CheckIn {
        #[arg(long)]
        qr: String,
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lon: f64,
    },
    /// Check out at the given position with a photo file
    CheckOut {
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lon: f64,
        #[arg(long)]
        photo: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    // CLI device adapters; positions default to (0, 0) for commands that
    // never geolocate.
    let (position, photo_path) = match &cli.command {
        Command::Attendance(AttendanceCommand::CheckIn { lat, lon, .. }) => {
            (GeoPoint::new(*lat, *lon), PathBuf::from("photo.jpg"))
        }
        Command::Attendance(AttendanceCommand::CheckOut { lat, lon, photo, .. }) => {
            (GeoPoint::new(*lat, *lon), photo.clone())
        }
        _ => (GeoPoint::new(0.0, 0.0), PathBuf::from("photo.jpg")),
    };

    let store = kstu_portal::store::SecureStore::open(&config.store_path).await;
    let client = PortalClient::new(
        &config,
        store,
        Arc::new(FixedGeolocator(position)),
        Arc::new(FilePhotoCamera { path: photo_path }),
    )?;

    client.session.initialize().await;

    match cli.command {
        Command::Login { username, password } => {
            client.session.login(&username, &password).await?;
            match client.session.current_user().await {
                Some(user) => println!("Signed in as {}", user.full_name()),
                None => println!("Signed in"),
            }
        }
        Command::Status => {
            let phase = client.session.phase().await;
            println!("Session: {:?}", phase);
            if let Some(user) = client.session.current_user().await {
                println!(
                    "User: {} (id {}, {:?}, {} unread)",
                    user.full_name(),
                    user.id,
                    user.role,
                    user.notifications
                );
            }
            if phase == SessionPhase::Locked && !client.session.has_pin_code().await {
                println!("No PIN stored yet: run `set-pin` to create one");
            }
        }
        Command::Profile => {
            let profile = client.api.profile().await?;
            println!("{} {} (id {})", profile.lastname, profile.firstname, profile.id);
            if let Some(department) = profile.department {
                println!("Department: {}", department);
            }
            if let Some(position) = profile.position {
                println!("Position: {}", position);
            }
        }
        Command::Logout => {
            client.session.logout().await;
            println!("Signed out");
        }
        Command::SetPin { pin } => {
            client.session.set_pin_code(&pin).await?;
            println!("PIN stored");
        }
        Command::Unlock { pin } => {
            client.session.unlock_with_pin(&pin).await?;
            println!("Unlocked");
        }
        Command::Attendance(command) => run_attendance(&client, command).await?,
    }

    Ok(())
}

async fn run_attendance(client: &PortalClient, command: AttendanceCommand) -> anyhow::Result<()> {
    match command {
        AttendanceCommand::History => {
            for record in client.attendance.history().await? {
                println!(
                    "{}  {}  {}  {}",
                    record.date.map(|d| d.to_string()).unwrap_or_default(),
                    record.auditorium.as_deref().unwrap_or("-"),
                    record.status_info.as_deref().unwrap_or("-"),
                    record.working_time.as_deref().unwrap_or("-"),
                );
            }
        }
        AttendanceCommand::Last => {
            match client.attendance.refresh_last_record().await? {
                Some(record) => println!("{:#?}", record),
                None => println!("No attendance records"),
            }
            match client.attendance.open_check_in().await {
                Some(open) => println!("Open check-in at {} ({})", open.auditorium, open.start),
                None => println!("No open check-in"),
            }
        }
        AttendanceCommand::CheckIn { qr, .. } => {
            let open = client.attendance.check_in(&qr).await?;
            println!("Checked in at {}", open.auditorium);
        }
        AttendanceCommand::CheckOut { .. } => {
            client.attendance.refresh_last_record().await?;
            client.attendance.check_out().await?;
            println!("Checked out");
        }
    }
    Ok(())
}

/// Initialize logging with an env-filter (RUST_LOG).
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kstu_portal=info".parse().expect("valid directive")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

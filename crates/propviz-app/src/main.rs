use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use propviz_app::backend::HttpBackend;
use propviz_app::config::{load_config, ClientConfig};
use propviz_app::state::AppState;
use propviz_app::wire::FilterPreset;
use propviz_core::commands::ClientCommand;
use propviz_core::enums::{CoordinateMode, NoticeLevel};
use propviz_core::events::ClientEvent;
use propviz_core::state::ClientSnapshot;
use propviz_core::types::{GeoPoint, Position};
use propviz_geo::tracks::{load_airways, load_route};
use propviz_render::{ProfileLayout, ProfilePaths};

#[derive(Parser, Debug)]
#[command(author, version, about = "Radio propagation visualization client")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend API root (overrides the config file)
    #[arg(long)]
    api: Option<String>,

    /// Coordinate mode (overrides the config file)
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Seconds to wait for each backend answer
    #[arg(long, default_value_t = 15)]
    wait_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Grid,
    Map,
}

impl From<ModeArg> for CoordinateMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Grid => CoordinateMode::Grid,
            ModeArg::Map => CoordinateMode::Map,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the scene and print its entities and link statistics
    Scene,

    /// Request a signal-level heatmap and composite it
    Heatmap {
        /// Center latitude (defaults to the configured map center)
        #[arg(long, allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Center longitude
        #[arg(long, allow_negative_numbers = true)]
        lon: Option<f64>,

        #[arg(long)]
        radius_km: Option<f64>,

        #[arg(long)]
        step_m: Option<u32>,

        /// Receiver filter preset
        #[arg(long, value_enum)]
        filter: Option<FilterPreset>,
    },

    /// Line-of-sight profile between two entities
    Profile {
        #[arg(long)]
        tx: String,

        #[arg(long)]
        rx: String,

        #[arg(long)]
        freq_mhz: Option<f64>,

        #[arg(long)]
        k_factor: Option<f64>,

        /// Write the profile drawing as SVG
        #[arg(long)]
        svg: Option<PathBuf>,
    },

    /// Carrier and intermodulation tables at a receiver
    Interference {
        /// Receiver entity (defaults to the configured moving entity)
        #[arg(long)]
        rx: Option<String>,

        #[arg(long)]
        freq_mhz: Option<f64>,

        #[arg(long)]
        window_khz: Option<f64>,

        /// Highest intermodulation order (2-5)
        #[arg(long)]
        max_order: Option<u32>,

        /// Receiver filter preset
        #[arg(long, value_enum)]
        filter: Option<FilterPreset>,
    },

    /// Animate the moving entity along a route file (CSV or GPX)
    Play {
        route: PathBuf,

        /// Airway GeoJSON used for snapping
        #[arg(long)]
        airways: Option<PathBuf>,

        #[arg(long)]
        speed: Option<f64>,

        /// Snap each position onto the nearest airway
        #[arg(long)]
        snap: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if let Some(api) = &args.api {
        config.backend.base_url = api.clone();
    }
    if let Some(mode) = args.mode {
        config.view.mode = mode.into();
    }
    match &args.command {
        Command::Heatmap {
            filter: Some(filter),
            ..
        }
        | Command::Interference {
            filter: Some(filter),
            ..
        } => config.heatmap.filter = *filter,
        _ => {}
    }

    let backend = HttpBackend::new(config.http_settings()).context("Failed to build HTTP client")?;
    info!(api = %config.backend.base_url, mode = ?config.view.mode, "connecting");

    let state = AppState::new();
    let snapshots = state
        .start(config.engine_config(), backend)
        .context("Failed to start event loop")?;
    let session = Session {
        state: &state,
        snapshots,
        wait: Duration::from_secs(args.wait_secs),
        mode: config.view.mode,
    };

    let result = match args.command {
        Command::Scene => cmd_scene(&session),
        Command::Heatmap {
            lat,
            lon,
            radius_km,
            step_m,
            ..
        } => {
            let center = GeoPoint::new(
                lat.unwrap_or(config.view.center_lat),
                lon.unwrap_or(config.view.center_lon),
            );
            cmd_heatmap(
                &session,
                &config,
                center,
                radius_km.unwrap_or(config.heatmap.radius_km),
                step_m.unwrap_or(config.heatmap.step_m),
            )
        }
        Command::Profile {
            tx,
            rx,
            freq_mhz,
            k_factor,
            svg,
        } => cmd_profile(
            &session,
            ClientCommand::RequestProfile {
                tx_id: tx,
                rx_id: rx,
                frequency_mhz: freq_mhz.unwrap_or(config.profile.frequency_mhz),
                k_factor: k_factor.unwrap_or(config.profile.k_factor),
            },
            svg,
        ),
        Command::Interference {
            rx,
            freq_mhz,
            window_khz,
            max_order,
            ..
        } => cmd_interference(
            &session,
            ClientCommand::RequestInterference {
                receiver_id: rx.unwrap_or_else(|| config.playback.moving_entity.clone()),
                f_rx_mhz: freq_mhz.unwrap_or(config.interference.f_rx_mhz),
                window_khz: window_khz.unwrap_or(config.interference.window_khz),
                max_order: max_order.unwrap_or(config.interference.max_order),
            },
        ),
        Command::Play {
            route,
            airways,
            speed,
            snap,
        } => cmd_play(
            &session,
            &config,
            route,
            airways,
            speed.unwrap_or(config.playback.speed),
            snap || config.playback.snap,
        ),
    };

    state.stop().context("Failed to stop event loop")?;
    result
}

/// A running event loop plus the receiving end of its snapshots.
struct Session<'a> {
    state: &'a AppState,
    snapshots: mpsc::Receiver<ClientSnapshot>,
    wait: Duration,
    mode: CoordinateMode,
}

impl Session<'_> {
    fn send(&self, commands: impl IntoIterator<Item = ClientCommand>) -> Result<()> {
        self.state
            .send_all(commands)
            .context("Failed to send command to event loop")
    }

    /// Read snapshots until `done` returns true for one of their events.
    /// Warning and error notices abort the wait.
    fn wait_for(
        &self,
        timeout: Duration,
        mut done: impl FnMut(&ClientEvent) -> bool,
    ) -> Result<ClientSnapshot> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let snapshot = match self.snapshots.recv_timeout(remaining) {
                Ok(snapshot) => snapshot,
                Err(mpsc::RecvTimeoutError::Timeout) => bail!("No answer within {timeout:?}"),
                Err(mpsc::RecvTimeoutError::Disconnected) => bail!("Event loop stopped"),
            };
            for notice in &snapshot.notices {
                match notice.level {
                    NoticeLevel::Info => info!("{}", notice.message),
                    NoticeLevel::Warning | NoticeLevel::Error => bail!("{}", notice.message),
                }
            }
            let mut finished = false;
            for event in &snapshot.events {
                finished |= done(event);
            }
            if finished {
                return Ok(snapshot);
            }
        }
    }

    /// Refresh and wait for the scene (and the statistics in grid mode).
    fn load_scene(&self) -> Result<ClientSnapshot> {
        self.send([ClientCommand::Refresh])?;
        let needs_stats = self.mode == CoordinateMode::Grid;
        let (mut scene, mut stats) = (false, !needs_stats);
        self.wait_for(self.wait, |event| {
            match event {
                ClientEvent::SceneLoaded { .. } => scene = true,
                ClientEvent::StatsRefreshed => stats = true,
                _ => {}
            }
            scene && stats
        })
        .context("Failed to load scene")
    }
}

fn describe(position: &Position) -> String {
    match position {
        Position::Grid(p) => format!("x={:.2} km, y={:.2} km", p.x_km, p.y_km),
        Position::Geo(g) => format!("lat={:.5}, lon={:.5}", g.lat, g.lon),
    }
}

fn cmd_scene(session: &Session) -> Result<()> {
    let snapshot = session.load_scene()?;
    let scene = snapshot.scene.context("Backend returned no scene")?;

    println!(
        "Scene {:.1} x {:.1} km, {} entities",
        scene.bounds.width_km,
        scene.bounds.height_km,
        scene.entities.len()
    );
    for entity in &scene.entities {
        println!(
            "  {:<12} {:<14} {:<24} {}",
            entity.id,
            format!("{:?}", entity.kind),
            entity.label(),
            describe(&entity.position)
        );
    }
    if let Some(stats) = &snapshot.stats {
        println!("\n{stats}");
    }
    Ok(())
}

fn cmd_heatmap(
    session: &Session,
    config: &ClientConfig,
    center: GeoPoint,
    radius_km: f64,
    step_m: u32,
) -> Result<()> {
    session.load_scene()?;
    session.send([ClientCommand::RequestHeatmap {
        center,
        radius_km,
        step_m,
        f_rx_mhz: config.heatmap.f_rx_mhz,
        window_khz: config.heatmap.window_khz,
    }])?;
    let snapshot = session
        .wait_for(session.wait, |e| matches!(e, ClientEvent::HeatmapDrawn { .. }))
        .context("Heatmap request failed")?;

    let heat = &snapshot.heatmap;
    println!(
        "Heatmap: {} samples around {:.5}, {:.5} (r={radius_km} km, step={step_m} m)",
        heat.cached_samples, center.lat, center.lon
    );
    println!(
        "Painted {} px at radius {} px, max alpha {:.2}",
        heat.painted_pixels, heat.radius_px, heat.max_alpha
    );
    Ok(())
}

fn cmd_profile(session: &Session, request: ClientCommand, svg: Option<PathBuf>) -> Result<()> {
    session.load_scene()?;
    session.send([request])?;
    let snapshot = session
        .wait_for(session.wait, |e| matches!(e, ClientEvent::ProfileReady))
        .context("Profile request failed")?;
    let profile = snapshot.profile.context("Backend returned no profile")?;

    println!("{}", profile.summary());
    println!("Distance: {:.2} km, {} samples", profile.distance_m / 1000.0, profile.samples.len());

    if let Some(path) = svg {
        match ProfilePaths::build(&profile, ProfileLayout::default()) {
            Some(paths) => {
                std::fs::write(&path, paths.to_svg())
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!(path = %path.display(), "profile drawing written");
            }
            None => warn!("profile has no samples to draw"),
        }
    }
    Ok(())
}

fn cmd_interference(session: &Session, request: ClientCommand) -> Result<()> {
    session.load_scene()?;
    session.send([request])?;
    let snapshot = session
        .wait_for(session.wait, |e| matches!(e, ClientEvent::InterferenceReady { .. }))
        .context("Interference request failed")?;
    let tables = snapshot
        .interference
        .context("Backend returned no interference result")?;
    println!("{tables}");
    Ok(())
}

fn cmd_play(
    session: &Session,
    config: &ClientConfig,
    route_path: PathBuf,
    airways_path: Option<PathBuf>,
    speed: f64,
    snap: bool,
) -> Result<()> {
    let route = load_route(&route_path)
        .with_context(|| format!("Failed to load route {}", route_path.display()))?;
    let airways = airways_path
        .map(|path| {
            load_airways(&path).with_context(|| format!("Failed to load airways {}", path.display()))
        })
        .transpose()?;

    session.load_scene()?;
    let points = route.len();
    let mut commands = vec![ClientCommand::LoadRoute {
        points: route.points,
    }];
    if let Some(airways) = airways {
        commands.push(ClientCommand::LoadAirways { airways });
    }
    commands.push(ClientCommand::StartPlayback { speed, snap });
    session.send(commands)?;

    let period = Duration::from_millis(config.playback.period_ms);
    let budget = period * (points as u32 + 2) + session.wait;
    session
        .wait_for(budget, |event| match event {
            ClientEvent::EntityMoved {
                id,
                position: Position::Geo(g),
            } => {
                println!("{id} -> {:.5}, {:.5}", g.lat, g.lon);
                false
            }
            ClientEvent::PlaybackStopped { index, reason } => {
                println!("Playback stopped at index {index}: {reason:?}");
                true
            }
            _ => false,
        })
        .context("Playback failed")?;
    Ok(())
}

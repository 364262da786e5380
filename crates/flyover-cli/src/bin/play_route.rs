//! Fly the camera along a route against a headless renderer.
//!
//! The route comes from a GeoJSON file, a straight line, a random walk or a
//! circle. Poses are logged at `trace` and can be recorded as NDJSON.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use flyover_cli::{circular_route, random_route, straight_route, Config, TraceRenderer};
use flyover_core::{
    path_from_geojson_str, CameraFlightController, CameraPose, FlightOutcome, GeoPath,
    IntervalScheduler, LngLat, MarkerHandle, PlayRequest,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Play a route fly-over (fly-in, follow, settle)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// GeoJSON file holding a LineString route
    #[arg(long, conflicts_with_all = ["from", "random"])]
    route: Option<PathBuf>,

    /// Straight route start as "lng,lat"
    #[arg(long, value_parser = parse_lng_lat, requires = "to")]
    from: Option<LngLat>,

    /// Straight route end as "lng,lat"
    #[arg(long, value_parser = parse_lng_lat, requires = "from")]
    to: Option<LngLat>,

    /// Random route around --center
    #[arg(long, conflicts_with = "from")]
    random: bool,

    /// Center for random and circular routes as "lng,lat" (default: Dongguan)
    #[arg(long, value_parser = parse_lng_lat, default_value = "113.8558,22.9890")]
    center: LngLat,

    /// Circle radius in meters when no other route is given
    #[arg(long, default_value_t = 1_500.0)]
    radius: f64,

    /// Seed for --random
    #[arg(long)]
    seed: Option<u64>,

    /// Follow duration in milliseconds (default: derived from route length)
    #[arg(long)]
    duration_ms: Option<u64>,

    /// Frame rate (overrides FLYOVER_FPS)
    #[arg(long)]
    fps: Option<f64>,

    /// Flight config JSON (overrides FLYOVER_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dive in from orbit instead of from the current view
    #[arg(long)]
    establishing: bool,

    /// Record camera and marker updates as NDJSON
    #[arg(long)]
    record: Option<PathBuf>,
}

fn parse_lng_lat(s: &str) -> Result<LngLat, String> {
    let (lng, lat) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"lng,lat\", got {s:?}"))?;
    let point = LngLat::new(
        lng.trim().parse().map_err(|e| format!("bad longitude: {e}"))?,
        lat.trim().parse().map_err(|e| format!("bad latitude: {e}"))?,
    );
    if !point.is_valid() {
        return Err(format!("{s:?} is out of range"));
    }
    Ok(point)
}

fn build_route(args: &Args) -> anyhow::Result<GeoPath> {
    if let Some(file) = &args.route {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("reading route {}", file.display()))?;
        return Ok(path_from_geojson_str(&text)?);
    }
    if let (Some(from), Some(to)) = (args.from, args.to) {
        return Ok(straight_route(from, to, 8)?);
    }
    if args.random {
        let path = match args.seed {
            Some(seed) => random_route(args.center, 0.05, 6, &mut StdRng::seed_from_u64(seed)),
            None => random_route(args.center, 0.05, 6, &mut rand::rng()),
        };
        return Ok(path?);
    }
    Ok(circular_route(args.center, args.radius, 36)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("flyover=info".parse()?)
            .add_directive("play_route=info".parse()?))
        .init();

    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(fps) = args.fps {
        config.fps = fps;
    }
    if let Some(path) = &args.config {
        config.flight_config = Some(path.clone());
    }
    let flight_config = config.load_flight_config()?;

    let path = build_route(&args)?;
    let duration = args
        .duration_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| path.suggested_duration());

    // Start from a regional view over the route so the fly-in has somewhere to come from.
    let initial = CameraPose::from_zoom(path.first(), 5.0, 0.0, 0.0, &flight_config.pitch_range);
    let mut renderer = TraceRenderer::new(initial);
    if let Some(file) = &args.record {
        let sink = File::create(file).with_context(|| format!("creating {}", file.display()))?;
        renderer = renderer.with_recording(BufWriter::new(sink));
    }
    let renderer = Arc::new(renderer);
    let marker = Arc::new(renderer.marker());

    println!("Playing route: {} points, {:.2} km", path.points().len(), path.length());
    println!("  Follow: {:?} at {} fps", duration, config.fps);
    println!();

    let scheduler = IntervalScheduler::new(config.fps)?;
    let mut controller = CameraFlightController::new(renderer.clone(), scheduler, flight_config);

    let mut request = PlayRequest::new(path)
        .with_duration(duration)
        .with_marker(marker.clone());
    if args.establishing {
        let fly_in = controller.config().fly_in.clone().starting_in_orbit();
        request = request.with_fly_in(fly_in);
    }

    let handle = controller.play(request)?;
    let cancel = handle.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling flight");
            cancel.cancel();
        }
    });

    let outcome = handle.finished().await;
    marker.remove();
    renderer.flush()?;

    match outcome? {
        FlightOutcome::Finished => println!("\nFlight complete. Rendered {} frames.", renderer.frames()),
        FlightOutcome::Cancelled => println!("\nFlight cancelled after {} frames.", renderer.frames()),
    }
    Ok(())
}

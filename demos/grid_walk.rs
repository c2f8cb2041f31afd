//! Builds a grid over a random obstacle field, queues a few path requests
//! and prints the resulting walks.
//!
//! Run: cargo run --bin grid-walk -- [--seed N] [--density 0.25] [--config grid.json]
//!
//! Set `RUST_LOG=debug` to watch the scheduler.

use std::cell::RefCell;
use std::collections::HashSet;
use std::io::{self, Write};
use std::num::{ParseFloatError, ParseIntError};
use std::rc::Rc;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use waygrid_core::{Point, Vec2};
use thiserror::Error;
use waygrid_paths::{
    Delivery, GridConfig, GridError, LayerMask, ObstacleOracle, PathFinder, RequestScheduler, SpatialGrid,
    TerrainOracle,
};

const MUD_LAYER: u32 = 3;

#[derive(Error, Debug)]
enum DemoError {
    #[error("missing value for {0}")]
    MissingValue(String),
    #[error("unknown flag {0}")]
    UnknownFlag(String),
    #[error("--seed: {0}")]
    Seed(#[from] ParseIntError),
    #[error("--density: {0}")]
    Density(#[from] ParseFloatError),
    #[error("{path}: {source}")]
    ReadConfig { path: String, source: io::Error },
    #[error("{path}: {source}")]
    ParseConfig {
        path: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("writing output: {0}")]
    Output(#[from] io::Error),
}

struct Args {
    seed: u64,
    density: f64,
    config: Option<String>,
}

fn parse_args(argv: impl IntoIterator<Item = String>) -> Result<Args, DemoError> {
    let mut args = Args {
        seed: 7,
        density: 0.22,
        config: None,
    };
    let mut it = argv.into_iter();
    while let Some(flag) = it.next() {
        let value = it
            .next()
            .ok_or_else(|| DemoError::MissingValue(flag.clone()))?;
        match flag.as_str() {
            "--seed" => args.seed = value.parse()?,
            "--density" => args.density = value.parse()?,
            "--config" => args.config = Some(value),
            other => return Err(DemoError::UnknownFlag(other.to_owned())),
        }
    }
    Ok(args)
}

fn load_config(path: Option<&str>) -> Result<GridConfig, DemoError> {
    match path {
        Some(path) => {
            let text =
                std::fs::read_to_string(path).map_err(|source| DemoError::ReadConfig {
                    path: path.to_owned(),
                    source,
                })?;
            serde_json::from_str(&text).map_err(|source| DemoError::ParseConfig {
                path: path.to_owned(),
                source,
            })
        }
        None => Ok(GridConfig::new(Vec2::new(40.0, 16.0), 0.5)
            .with_default_penalty(0)
            .with_region(LayerMask::layer(MUD_LAYER), 40)),
    }
}

/// Random rocks and mud, scattered over unit squares of world space.
struct Scatter {
    rocks: HashSet<(i64, i64)>,
    mud: HashSet<(i64, i64)>,
}

impl Scatter {
    fn new(config: &GridConfig, density: f64, rng: &mut impl Rng) -> Self {
        let half = config.world_size / 2.0;
        let (x0, x1) = (-half.x.ceil() as i64, half.x.ceil() as i64);
        let (y0, y1) = (-half.y.ceil() as i64, half.y.ceil() as i64);
        let mut rocks = HashSet::new();
        let mut mud = HashSet::new();
        for x in x0..x1 {
            for y in y0..y1 {
                let roll: f64 = rng.random();
                if roll < density {
                    rocks.insert((x, y));
                } else if roll < density * 1.5 {
                    mud.insert((x, y));
                }
            }
        }
        Self { rocks, mud }
    }

    fn square(p: Vec2) -> (i64, i64) {
        (p.x.floor() as i64, p.y.floor() as i64)
    }
}

impl ObstacleOracle for Scatter {
    fn is_obstructed(&self, center: Vec2, _radius: f64) -> bool {
        self.rocks.contains(&Self::square(center))
    }
}

impl TerrainOracle for Scatter {
    fn dominant_terrain(&self, center: Vec2, _radius: f64, mask: LayerMask) -> Option<u32> {
        (mask.contains(MUD_LAYER) && self.mud.contains(&Self::square(center))).then_some(MUD_LAYER)
    }
}

/// Print the grid top row first, with `marks` drawn over the cells.
fn render(grid: &SpatialGrid, marks: &[(Point, char)], out: &mut impl Write) -> io::Result<()> {
    let size = grid.size();
    for y in (0..size.y).rev() {
        let mut line = String::with_capacity(size.x as usize);
        for x in 0..size.x {
            let p = Point::new(x, y);
            let ch = match marks.iter().rev().find(|(m, _)| *m == p) {
                Some(&(_, c)) => c,
                None => match grid.cell_at(p) {
                    Some(c) if !c.walkable() => '#',
                    Some(c) if c.movement_penalty() > 0 => '~',
                    _ => '.',
                },
            };
            line.push(ch);
        }
        writeln!(out, "{line}")?;
    }
    Ok(())
}

type Outcome = (usize, Vec<Vec2>, bool);

fn run() -> Result<(), DemoError> {
    let args = parse_args(std::env::args().skip(1))?;
    let config = load_config(args.config.as_deref())?;
    let mut rng = StdRng::seed_from_u64(args.seed);
    let oracle = Scatter::new(&config, args.density, &mut rng);
    let grid = Arc::new(SpatialGrid::build(&config, &oracle)?);
    log::info!(
        "grid {}x{}, {} walkable cells",
        grid.size().x,
        grid.size().y,
        grid.walkable_count()
    );

    let half = config.world_size / 2.0;
    let requests = [
        (-half + Vec2::new(1.0, 1.0), half - Vec2::new(1.0, 1.0)),
        (Vec2::new(-half.x + 1.0, half.y - 1.0), Vec2::new(half.x - 1.0, -half.y + 1.0)),
        (Vec2::ZERO, Vec2::new(half.x * 10.0, 0.0)),
    ];

    let outcomes: Rc<RefCell<Vec<Outcome>>> = Rc::default();
    let scheduler =
        RequestScheduler::with_delivery(PathFinder::new(Arc::clone(&grid)), Delivery::NextTick);
    for (i, (start, end)) in requests.iter().copied().enumerate() {
        let outcomes = Rc::clone(&outcomes);
        scheduler.request_path(start, end, move |waypoints, success| {
            outcomes.borrow_mut().push((i, waypoints, success));
        });
    }

    let mut frames = 0;
    while scheduler.tick() {
        frames += 1;
    }
    log::info!("{} requests delivered over {frames} ticks", scheduler.completed());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (i, waypoints, success) in outcomes.borrow().iter() {
        let (start, end) = requests[*i];
        writeln!(out, "request {i}: {start} -> {end}: success={success}")?;
        let marks: Vec<(Point, char)> = waypoints
            .iter()
            .enumerate()
            .map(|(n, &w)| {
                let digit = char::from_digit((n % 36) as u32, 36).unwrap_or('*');
                (grid.cell(grid.node_at(w)).coord(), digit)
            })
            .collect();
        render(&grid, &marks, &mut out)?;
        writeln!(out)?;
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{}] {} - {}", record.level(), record.target(), record.args()))
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

use std::path::PathBuf;

use anyhow::Context;
use anyhow::bail;
use tracing::debug;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hashlife::Universe;
use hashlife::field::field_bounds;
use hashlife::field::make_center;
use hashlife::parse_rle::read_rle;

const USAGE: &str = "Usage: hashlife <file.rle> [generations-log2] [--quick] [--count <n>]";

struct Args {
    path: PathBuf,

    /// Single steps advance `2^step` generations
    step: u8,

    /// Step by as much as the root allows instead
    quick: bool,

    /// Number of steps to take
    count: u32,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = std::env::args().skip(1);

    let mut path = None;
    let mut step = None;
    let mut quick = false;
    let mut count = 1;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--quick" => quick = true,
            "--count" => {
                let n = args.next().context("--count needs a value")?;
                count = n
                    .parse()
                    .with_context(|| format!("Invalid step count \"{n}\""))?;
            }
            "-h" | "--help" => bail!(USAGE),
            _ if path.is_none() => path = Some(PathBuf::from(&arg)),
            _ if step.is_none() => {
                let s = arg
                    .parse()
                    .with_context(|| format!("Invalid generations-log2 \"{arg}\""))?;
                step = Some(s);
            }
            _ => bail!("Unexpected argument \"{arg}\"\n{USAGE}"),
        }
    }

    Ok(Args {
        path: path.context(USAGE)?,
        step: step.unwrap_or(0),
        quick,
        count,
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = parse_args()?;

    let data = std::fs::read(&args.path)
        .with_context(|| format!("Failed to open {}", args.path.display()))?;

    let (mut xs, mut ys) = (Vec::new(), Vec::new());
    let file = read_rle(&data, |x, y| {
        xs.push(x);
        ys.push(y);
    })
    .with_context(|| format!("Failed to read RLE file {}", args.path.display()))?;

    if let Some(name) = file.name {
        info!(name = %String::from_utf8_lossy(name), "Pattern");
    }
    if let Some(author) = file.author {
        debug!(author = %String::from_utf8_lossy(author));
    }

    let mut universe = Universe::new();
    if let Some(rule) = file.rule {
        universe.set_rule_set(rule);
    }
    universe.set_step(args.step)?;

    let mut bounds = field_bounds(&xs, &ys);
    make_center(&mut xs, &mut ys, &mut bounds);
    universe
        .setup_field(&mut xs, &mut ys, Some(bounds))
        .context("Pattern does not fit in the universe")?;

    info!(
        cells = xs.len(),
        rule = %universe.rules(),
        level = universe.level(),
        "Loaded"
    );

    for _ in 0..args.count {
        universe.next_generation(!args.quick)?;

        let bounds = universe.root_bounds();
        info!(
            generation = universe.generation(),
            population = %universe.population(),
            top = bounds.top,
            left = bounds.left,
            bottom = bounds.bottom,
            right = bounds.right,
            "Stepped"
        );
    }

    let stats = universe.store().stats();
    info!(
        nodes = stats.nodes,
        table_size = stats.table_size,
        rehashes = stats.rehashes,
        collections = stats.collections,
        "Store"
    );

    Ok(())
}

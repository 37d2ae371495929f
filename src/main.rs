use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use agrocredit::bands::RiskBand;
use agrocredit::config::{CreditBase, ReferenceData, SimulationParameters};
use agrocredit::engine::{Engine, SimulationResult, SweepSummary};
use agrocredit::error::SimulationError;
use agrocredit::outcomes::DistStats;
use agrocredit::scenario::PortfolioInput;
use agrocredit::types::Zone;

/// Monte Carlo credit sizing for a soy/corn campaign.
#[derive(Parser, Debug)]
#[command(name = "agrocredit")]
#[command(version, about, long_about = None)]
struct Args {
    /// Production zone (nucleo, nea)
    #[arg(long, default_value = "nucleo")]
    zone: Zone,

    /// Soybean hectares
    #[arg(long, default_value_t = 200.0)]
    ha_soy: f64,

    /// Corn hectares
    #[arg(long, default_value_t = 150.0)]
    ha_corn: f64,

    /// Farm owns its land (no rent cost)
    #[arg(long)]
    no_rent: bool,

    /// Seed for reproducible runs; drawn from OS entropy when absent
    #[arg(long)]
    seed: Option<u64>,

    /// Monte Carlo draw count
    #[arg(long)]
    draws: Option<usize>,

    /// Credit grid points from 0% to 100% of the base
    #[arg(long)]
    grid_steps: Option<usize>,

    /// Amount the grid percentages refer to
    #[arg(long, value_enum)]
    credit_base: Option<CreditBaseArg>,

    /// Campaign interest rate on the credit
    #[arg(long)]
    interest_rate: Option<f64>,

    /// Green band repayment probability threshold
    #[arg(long)]
    target: Option<f64>,

    /// Red band repayment probability threshold
    #[arg(long)]
    red: Option<f64>,

    /// JSON parameter file; missing fields take defaults, flags override it
    #[arg(long, value_name = "FILE")]
    params: Option<PathBuf>,

    /// Print the result as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Seed sweep: run K consecutive seeds and report the spread
    #[arg(long, value_name = "K", value_parser = clap::value_parser!(u64).range(2..))]
    runs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "AGROCREDIT_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CreditBaseArg {
    Inputs,
    WorkingCapital,
}

impl From<CreditBaseArg> for CreditBase {
    fn from(arg: CreditBaseArg) -> Self {
        match arg {
            CreditBaseArg::Inputs => CreditBase::NeedInputs,
            CreditBaseArg::WorkingCapital => CreditBase::WorkingCapital,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("cannot read {}: {source}", .path.display())]
    ReadParams { path: PathBuf, source: std::io::Error },

    #[error("invalid parameter file {}: {source}", .path.display())]
    ParseParams { path: PathBuf, source: serde_json::Error },

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error("cannot serialise output: {0}")]
    Output(#[from] serde_json::Error),
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_params(args: &Args) -> Result<SimulationParameters, CliError> {
    let mut params = match &args.params {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|source| CliError::ReadParams { path: path.clone(), source })?;
            serde_json::from_str(&text).map_err(|source| CliError::ParseParams { path: path.clone(), source })?
        }
        None => SimulationParameters::default(),
    };

    if let Some(d) = args.draws {
        params.draws = d;
    }
    if let Some(s) = args.grid_steps {
        params.grid_steps = s;
    }
    if let Some(b) = args.credit_base {
        params.credit_base = b.into();
    }
    if let Some(r) = args.interest_rate {
        params.interest_rate = r;
    }
    if let Some(t) = args.target {
        params.target_prob = t;
    }
    if let Some(r) = args.red {
        params.red_prob = r;
    }
    Ok(params)
}

fn main() {
    let args = Args::parse();
    init_tracing(&args.log_level);

    if let Err(e) = run(&args) {
        tracing::error!(error = %e, "run failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let params = load_params(args)?;
    let input = PortfolioInput {
        zone: args.zone,
        ha_soy: args.ha_soy,
        ha_corn: args.ha_corn,
        rent_applies: !args.no_rent,
    };
    let engine = Engine::new(ReferenceData::canonical(), params);

    if let Some(k) = args.runs {
        let start_seed = args.seed.unwrap_or_else(rand::random);
        let results = engine.sweep_seeds(&input, start_seed, k)?;
        let summary = SweepSummary::from_results(&results);
        if args.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            print_sweep(&summary, start_seed, engine.params());
        }
        return Ok(());
    }

    let engine = match args.seed {
        Some(seed) => engine.with_seed(seed),
        None => engine,
    };
    let result = engine.run(&input)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result, engine.params());
    }
    Ok(())
}

// ── Output ────────────────────────────────────────────────────────────────────

fn base_label(base: CreditBase) -> &'static str {
    match base {
        CreditBase::NeedInputs => "inputs",
        CreditBase::WorkingCapital => "working capital",
    }
}

fn print_band(name: &str, band: Option<&RiskBand>) {
    match band {
        Some(b) => println!(
            "  {name:<7} {:>5.1}% – {:>5.1}%   USD {:>12.0} – {:>12.0}",
            b.pct_min * 100.0,
            b.pct_max * 100.0,
            b.amt_min,
            b.amt_max,
        ),
        None => println!("  {name:<7} none"),
    }
}

fn print_result(r: &SimulationResult, params: &SimulationParameters) {
    let p = &r.portfolio;
    println!("\n=== Portfolio ===");
    println!(
        "  Zone: {}   Soy: {:.1} ha   Corn: {:.1} ha   Rent: {}",
        p.zone,
        p.ha_soy,
        p.ha_corn,
        if p.rent_applies { "yes" } else { "no" }
    );
    println!("  Seed: {}   Draws: {}", r.seed, r.draws);

    println!("\n=== Financing needs (USD, mean costs) ===");
    println!("  Inputs:          {:>14.0}", r.need_inputs_usd);
    println!("  Working capital: {:>14.0}", r.need_working_capital_usd);
    println!("  Total cost:      {:>14.0}", r.cost_total_usd);
    println!("  Credit base:     {:>14.0}  ({})", r.credit_base_usd, base_label(r.credit_base));

    println!("\n=== Campaign margin (USD) ===");
    println!("  Bad year (p5):    {:>14.0}", r.insights.bad);
    println!("  Typical (p50):    {:>14.0}", r.insights.typical);
    println!("  Good year (p95):  {:>14.0}", r.insights.good);
    println!("  P(margin > 0):    {:>13.1}%", r.insights.probability_positive * 100.0);

    println!("\n=== Recommendation (target {:.0}%) ===", params.target_prob * 100.0);
    match &r.recommendation {
        Some(rec) => println!(
            "  Up to {:.1}% of the base: USD {:.0} at {:.1}% interest",
            rec.max_credit_pct * 100.0,
            rec.max_credit_amt,
            params.interest_rate * 100.0,
        ),
        None => println!("  No credit level reaches the target repayment probability"),
    }

    println!("\n=== Risk bands ===");
    print_band("Green", r.bands.green.as_ref());
    print_band("Yellow", r.bands.yellow.as_ref());
    print_band("Red", r.bands.red.as_ref());

    println!("\n=== Repayment probability grid ===");
    println!("{:>6} | {:>12} | {:>8} | {:<6}", "Pct", "Amount(USD)", "P(repay)", "Band");
    println!("{}", "-".repeat(6 + 3 + 12 + 3 + 8 + 3 + 6));
    for (i, g) in r.grid.iter().enumerate() {
        let band = [("green", r.bands.green), ("yellow", r.bands.yellow), ("red", r.bands.red)]
            .into_iter()
            .find(|(_, b)| b.is_some_and(|b| b.contains(i)))
            .map_or("", |(name, _)| name);
        println!(
            "{:>5.1}% | {:>12.0} | {:>7.1}% | {:<6}",
            g.pct * 100.0,
            g.amount,
            g.probability * 100.0,
            band,
        );
    }
}

fn print_dist_row(label: &str, scale: f64, ds: Option<&DistStats>) {
    match ds {
        Some(d) => println!(
            "{label:<16} | {:>4} | {:>7.1} | {:>7.1} | {:>7.1} | {:>7.1} | {:>7.1} | {:>7.1}",
            d.n,
            d.min * scale,
            d.p5 * scale,
            d.p50 * scale,
            d.p95 * scale,
            d.max * scale,
            d.mean * scale,
        ),
        None => println!("{label:<16} | {:>4} |", 0),
    }
}

fn print_sweep(s: &SweepSummary, start_seed: u64, params: &SimulationParameters) {
    let last_seed = start_seed.wrapping_add(s.runs as u64).wrapping_sub(1);
    println!(
        "\n=== Seed sweep (N={} runs, seeds {start_seed}–{last_seed}, {} draws each) ===",
        s.runs, params.draws
    );
    println!(
        "{:<16} | {:>4} | {:>7} | {:>7} | {:>7} | {:>7} | {:>7} | {:>7}",
        "Metric", "n", "min", "p5", "p50", "p95", "max", "mean"
    );
    println!("{}", "-".repeat(16 + 3 + 4 + 6 * (3 + 7) + 10));
    print_dist_row("MaxCredit%", 100.0, s.max_credit_pct.as_ref());
    print_dist_row("GreenLen(pts)", 1.0, s.green_len.as_ref());
    println!("\n  Runs with no recommendation: {} of {}", s.no_recommendation, s.runs);
}

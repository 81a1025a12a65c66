use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use survey_aggregation::config::AggregationConfig;
use survey_aggregation::engine::{LocalEngineBuilder, SecretEngine};
use survey_aggregation::form::Form;
use survey_aggregation::respondent::{encode_answers, random_answers, Answers};
use survey_aggregation::session::{ComputationContext, ComputationId};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    about = "Run a privacy-preserving survey aggregation against the in-process engine",
    author,
    version
)]
struct Cli {
    /// Survey form (JSON)
    #[arg(long, value_name = "FILE")]
    form: PathBuf,

    /// Answer sets, one JSON object per respondent keyed by question id
    #[arg(long, value_name = "FILE", conflicts_with = "random")]
    responses: Option<PathBuf>,

    /// Generate this many random valid answer sets instead of reading them
    #[arg(long, value_name = "N")]
    random: Option<usize>,

    /// Aggregation configuration (JSON); defaults are used when omitted
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seed for the engine and the random answer generator
    #[arg(long)]
    seed: Option<u64>,

    /// Respondents that try to join after the computation has begun
    #[arg(long = "late-joiners", default_value_t = 0)]
    late_joiners: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    let form: Form = serde_json::from_str(&std::fs::read_to_string(&cli.form)?)?;
    let form = Arc::new(form);

    let mut config = match &cli.config {
        Some(path) => AggregationConfig::from_file(path)?,
        None => AggregationConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    let answer_sets: Vec<Answers> = match (&cli.responses, cli.random) {
        (Some(path), _) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        (None, Some(count)) => {
            let mut rng = match cli.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            (0..count).map(|_| random_answers(&form, &mut rng)).collect()
        }
        (None, None) => return Err("either --responses or --random is required".into()),
    };

    let engine = Arc::new(LocalEngineBuilder::from_config(&config).build()?);
    let id = ComputationId::random(&form)?;
    let context = ComputationContext::new(id.clone(), form.clone(), engine.clone(), config)?;
    let roster = context.roster();
    let begin = context.begin_handle();
    info!(
        "Computation {} created for form {:?} ({} questions)",
        id,
        form.title,
        form.questions.len()
    );

    let computation = tokio::spawn(context.run());

    let shape = form.input_shape();
    for (index, answers) in answer_sets.iter().enumerate() {
        // Respondents whose answers fail the local checks never join.
        let inputs = match encode_answers(&form, answers) {
            Ok(inputs) => inputs,
            Err(e) => {
                warn!("Answer set {} rejected before submission: {}", index, e);
                continue;
            }
        };
        let party = roster.join().await?;
        engine
            .submit_input(party, inputs.expose_secret(), &shape)
            .await?;
    }

    begin.begin().await?;

    for _ in 0..cli.late_joiners {
        match roster.join().await {
            Ok(party) => warn!("{} joined after begin", party),
            Err(e) => info!("Late joiner turned away: {}", e),
        }
    }

    let results = computation.await??;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .with_writer(std::io::stderr)
            .try_init();
    });
}

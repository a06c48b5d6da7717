use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use viral_predictor::{
    ArtifactStore, ContentType, FeatureSchema, ManualForm, Platform, PredictorConfig, ReferenceCache,
    SchemaRegistry, Table, ViralPredictor,
};

#[derive(Parser)]
#[command(author, version, about = "Predict whether a social media post goes viral", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reference (training) dataset, overrides the configuration
    #[arg(long)]
    reference: Option<PathBuf>,

    /// ONNX classifier artifact, overrides the configuration
    #[arg(long)]
    model: Option<PathBuf>,

    /// Expected sha256 of the classifier artifact
    #[arg(long)]
    model_sha256: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the feature schema the classifier expects
    Schema,
    /// Summarise the reference dataset
    Describe,
    /// Classify one post described on the command line
    Predict {
        #[arg(long, default_value_t = 50_000)]
        followers: u32,
        #[arg(long, default_value_t = 1_000)]
        likes: u32,
        #[arg(long, default_value_t = 100)]
        shares: u32,
        #[arg(long, default_value_t = 50)]
        comments: u32,
        /// Derived from followers, likes and shares when left out
        #[arg(long)]
        engagement_rate: Option<f64>,
        #[arg(long, default_value_t = 12)]
        hour: u32,
        #[arg(long, default_value = "Facebook")]
        platform: Platform,
        #[arg(long, default_value = "Image")]
        content_type: ContentType,
    },
    /// Classify every row of a delimited file
    Batch {
        #[arg(short, long)]
        input: PathBuf,
        /// Output file, stdout when left out
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn load_config(args: &Args) -> Result<PredictorConfig> {
    let mut config = match &args.config {
        Some(path) => PredictorConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => PredictorConfig::default(),
    };
    if let Some(reference) = &args.reference {
        config.reference_dataset = Some(reference.clone());
    }
    if let Some(model) = &args.model {
        config.model.path = Some(model.clone());
    }
    if let Some(sha256) = &args.model_sha256 {
        config.model.sha256 = Some(sha256.clone());
    }
    Ok(config)
}

fn reference_cache(config: &PredictorConfig, store: &ArtifactStore) -> Option<ReferenceCache> {
    config.reference_dataset.as_ref().map(|path| {
        ReferenceCache::new(store.locate(path), config.label_column.clone(), config.delimiter_byte())
    })
}

fn print_schema(config: &PredictorConfig, store: &ArtifactStore) -> Result<()> {
    let literal = config.literal_schema.then(FeatureSchema::manual_form);
    let derived = match reference_cache(config, store) {
        Some(cache) => match cache.get() {
            Ok(reference) => Some(reference.schema().clone()),
            Err(e) if literal.is_some() => {
                log::warn!("Reference dataset unavailable: {}", e);
                None
            }
            Err(e) => return Err(e).context("Failed to load reference dataset"),
        },
        None => None,
    };
    let registry = SchemaRegistry::resolve(derived, literal)?;

    println!("Feature schema ({:?}, {} features):", registry.origin(), registry.get_schema().len());
    for (i, name) in registry.get_schema().iter().enumerate() {
        println!("  {:>2}. {}", i + 1, name);
    }
    Ok(())
}

fn describe(config: &PredictorConfig, store: &ArtifactStore) -> Result<()> {
    let cache = reference_cache(config, store).context("No reference dataset configured")?;
    let reference = cache.get().context("Failed to load reference dataset")?;
    let summary = reference.summary();

    println!("Total posts: {}", summary.total_rows);
    println!("Viral: {}  Not viral: {}", summary.viral, summary.not_viral);
    println!();
    println!("{:<20} {:>8} {:>14} {:>14} {:>14} {:>14}", "column", "count", "mean", "std", "min", "max");
    for column in &summary.columns {
        let std = column.std.map_or_else(|| "-".to_string(), |s| format!("{:.4}", s));
        println!(
            "{:<20} {:>8} {:>14.4} {:>14} {:>14.4} {:>14.4}",
            column.name, column.count, column.mean, std, column.min, column.max
        );
    }
    println!();
    println!("Engagement rate by platform:");
    for platform in &summary.engagement_by_platform {
        println!(
            "  {:<10} posts {:>6}  mean {:.4}  median {:.4}",
            platform.platform, platform.count, platform.mean, platform.median
        );
    }
    Ok(())
}

fn predict(predictor: &ViralPredictor, form: &ManualForm) -> Result<()> {
    let prediction = predictor.predict_form(form)?;
    println!("Prediction: {}", prediction.label);
    if let Some(probabilities) = prediction.probabilities {
        println!("  Not Viral: {:.1}%", probabilities.not_viral * 100.0);
        println!("  Viral:     {:.1}%", probabilities.viral * 100.0);
    }
    Ok(())
}

fn batch(predictor: &ViralPredictor, config: &PredictorConfig, input: &Path, output: Option<&Path>) -> Result<()> {
    let delimiter = config.delimiter_byte();
    let mut table = Table::from_path(input, delimiter)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let result = predictor.predict_batch(&table)?;

    if !result.dropped_columns.is_empty() {
        info!("Ignored columns: {:?}", result.dropped_columns);
    }
    if result.is_degraded() {
        log::warn!(
            "No reference value for {:?}; these features were filled with 0",
            result.degraded_features
        );
    }

    let labels = result.rows.iter().map(|r| r.prediction.label.to_string()).collect();
    let viral_probabilities = result
        .rows
        .iter()
        .map(|r| r.prediction.probabilities.map_or_else(String::new, |p| format!("{:.4}", p.viral)))
        .collect();
    let fallbacks = result
        .rows
        .iter()
        .map(|r| r.fallbacks.iter().map(ToString::to_string).collect::<Vec<_>>().join(";"))
        .collect();
    table.push_column("Prediction", labels)?;
    table.push_column("Viral_Probability", viral_probabilities)?;
    table.push_column("Fallbacks", fallbacks)?;

    match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
            table.write_to(file, delimiter)?;
            info!("Wrote {} predictions to {:?}", result.rows.len(), path);
        }
        None => table.write_to(io::stdout().lock(), delimiter)?,
    }
    eprintln!("{} of {} posts predicted viral", result.viral_count(), result.rows.len());
    Ok(())
}

fn main() -> Result<()> {
    viral_predictor::init_logger();
    let args = Args::parse();
    let config = load_config(&args)?;
    let store = ArtifactStore::new_default().context("Failed to create artifact directory")?;
    info!("Artifact directory: {:?}", store.root());

    match &args.command {
        Command::Schema => print_schema(&config, &store),
        Command::Describe => describe(&config, &store),
        Command::Predict {
            followers,
            likes,
            shares,
            comments,
            engagement_rate,
            hour,
            platform,
            content_type,
        } => {
            let start_time = Instant::now();
            let predictor = ViralPredictor::from_config(&config, &store)?;
            info!("Predictor built in {:.2?}", start_time.elapsed());
            let form = ManualForm {
                followers: *followers,
                likes: *likes,
                shares: *shares,
                comments: *comments,
                engagement_rate: *engagement_rate,
                hour: *hour,
                platform: *platform,
                content_type: *content_type,
            };
            predict(&predictor, &form)
        }
        Command::Batch { input, output } => {
            let start_time = Instant::now();
            let predictor = ViralPredictor::from_config(&config, &store)?;
            info!("Predictor built in {:.2?}", start_time.elapsed());
            batch(&predictor, &config, input, output.as_deref())
        }
    }
}

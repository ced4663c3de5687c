use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    config::{load_settings, normalize_database_url, ClientSettings},
    content::{nearby_hospitals, PRECAUTIONS},
    load_results_view,
    validation::missing_patient_fields,
    ClientEvent, HttpAnalysisEndpoint, ResultsStore, SubmissionCoordinator, TokioPacer,
    UploadItem, WizardError, WizardSession,
};
use shared::domain::{FamilyHistory, Gender};
use storage::Storage;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod output;

#[derive(Parser, Debug)]
#[command(name = "sicklescan", about = "Sickle cell screening from RBC smear images")]
struct Cli {
    /// Settings file read after `sicklescan.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enter patient details, upload images and submit them for analysis.
    Detect(DetectArgs),
    /// Show the results of the last submission.
    Results,
    Precautions,
    Hospitals {
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
}

#[derive(Args, Debug)]
struct DetectArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    age: String,
    #[arg(long)]
    gender: Gender,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    medical_history: Option<String>,
    #[arg(long)]
    family_history: Option<FamilyHistory>,
    #[arg(long)]
    medications: Option<String>,
    /// Image file to analyse. Repeat for several images.
    #[arg(long = "image", required = true)]
    images: Vec<PathBuf>,
    /// Confirms the images may be submitted for analysis.
    #[arg(long)]
    consent: bool,
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long)]
    max_concurrent: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(database_url) = &cli.database_url {
        settings.database_url = normalize_database_url(database_url);
    }

    match cli.command {
        Command::Detect(args) => detect(settings, args).await,
        Command::Results => {
            let store = open_results_store(&settings).await?;
            let view = load_results_view(&store, &TokioPacer, None).await;
            output::print_results(&view);
            Ok(())
        }
        Command::Precautions => {
            output::print_precautions(PRECAUTIONS);
            Ok(())
        }
        Command::Hospitals { limit } => {
            output::print_hospitals(&nearby_hospitals(limit));
            Ok(())
        }
    }
}

async fn open_results_store(settings: &ClientSettings) -> Result<ResultsStore> {
    let storage = Storage::new(&settings.database_url)
        .await
        .with_context(|| format!("failed to open results database '{}'", settings.database_url))?;
    Ok(ResultsStore::new(Arc::new(storage)))
}

fn user_facing(err: WizardError) -> anyhow::Error {
    error!(error = %err, "detection step failed");
    anyhow!(err.user_message())
}

async fn detect(mut settings: ClientSettings, args: DetectArgs) -> Result<()> {
    if let Some(endpoint) = args.endpoint {
        settings.endpoint_url = endpoint;
    }
    if let Some(max_concurrent) = args.max_concurrent {
        settings.max_concurrent_requests = max_concurrent.max(1);
    }

    let mut session = WizardSession::new();
    session
        .edit_patient(|form| {
            form.full_name = args.name;
            form.age = args.age;
            form.gender = Some(args.gender);
            form.phone = args.phone;
            form.email = args.email;
            form.address = args.address;
            form.medical_history = args.medical_history;
            form.family_history = args.family_history;
            form.current_medications = args.medications;
        })
        .map_err(user_facing)?;
    if !session.next() {
        let missing: Vec<&str> = missing_patient_fields(session.patient())
            .into_iter()
            .map(|field| field.label())
            .collect();
        bail!("Please fill in all required fields: {}", missing.join(", "));
    }

    let mut batch = Vec::with_capacity(args.images.len());
    for path in &args.images {
        batch.push(UploadItem::from_path(path).await?);
    }
    session.admit_uploads(batch).map_err(user_facing)?;
    if !session.next() {
        bail!("Please upload at least one image.");
    }

    output::print_review(&session);
    session.set_consent(args.consent).map_err(user_facing)?;

    let store = open_results_store(&settings).await?;
    let endpoint = HttpAnalysisEndpoint::new(
        settings.endpoint()?,
        Duration::from_secs(settings.request_timeout_secs),
    )?;
    info!(url = %endpoint.url(), "using analysis endpoint");
    let coordinator = SubmissionCoordinator::new(Arc::new(endpoint), store.clone())
        .with_max_concurrent(settings.max_concurrent_requests);

    let mut events = BroadcastStream::new(coordinator.subscribe_events());
    let progress = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                Ok(ClientEvent::SubmissionStarted { count, .. }) => {
                    println!("Analyzing {count} image(s)...");
                }
                Ok(ClientEvent::ItemAnalyzed { index, label }) => {
                    println!("  image {}: {label}", index + 1);
                }
                Ok(ClientEvent::SubmissionFailed { message }) => println!("{message}"),
                Ok(ClientEvent::Navigate(route)) => {
                    info!(path = route.path(), "submission complete");
                }
                Err(_) => {}
            }
        }
    });

    let outcome = session.submit(&coordinator).await;
    drop(coordinator);
    let _ = progress.await;
    outcome.map_err(user_facing)?;

    let view = load_results_view(&store, &TokioPacer, Some(&session)).await;
    output::print_results(&view);
    Ok(())
}

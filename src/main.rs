use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use onboarding::api::{Geocoder, NominatimGeocoder, Services};
use onboarding::config::Config;
use onboarding::env_vars;
use onboarding::logging;
use onboarding::types::{PendingRegistration, UploadFile};
use onboarding::wizard::{
    messages, AddressDebouncer, CompanyRegistrationStep, PhoneValidationStep, StepError,
    SubmissionReport, Wizard, WizardHost, WizardStage,
};

#[derive(Parser)]
#[command(name = "onboarding")]
#[command(about = "Phone verification and company registration wizard")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Begin a new registration, replacing any saved draft
    Start {
        #[arg(long)]
        name: String,

        /// Phone number the code was sent to
        #[arg(long)]
        phone: String,

        #[arg(long)]
        password: String,
    },

    /// Submit the 4-digit verification code
    Verify {
        #[arg(long)]
        code: String,
    },

    /// Register the company for the verified user
    Register {
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        activity: String,

        /// Street address; geocoded unless --lat/--lng are given
        #[arg(long, default_value = "")]
        address: String,

        /// Logo image file
        #[arg(long)]
        logo: Option<PathBuf>,

        /// Supporting document (repeatable, PDF only)
        #[arg(long = "doc")]
        docs: Vec<PathBuf>,

        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
    },

    /// Resolve an address and list shops around it
    Geocode {
        address: String,

        /// Wait for the debounce period as the interactive form does
        #[arg(long)]
        debounced: bool,
    },

    /// Show the saved wizard draft
    Status,

    /// Go back one page
    Back,

    /// Delete the saved draft
    Reset,

    /// List the environment variables read by the configuration
    Env,

    /// Write the effective configuration to .onboarding/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;
    let logging_handle = logging::init_logging(&config, cli.debug)?;

    let result = match cli.command {
        Commands::Start {
            name,
            phone,
            password,
        } => cmd_start(&config, name, phone, password),
        Commands::Verify { code } => cmd_verify(&config, &code).await,
        Commands::Register {
            name,
            activity,
            address,
            logo,
            docs,
            lat,
            lng,
        } => {
            let location = lat.zip(lng);
            cmd_register(&config, name, activity, address, logo, docs, location).await
        }
        Commands::Geocode { address, debounced } => {
            cmd_geocode(&config, &address, debounced).await
        }
        Commands::Status => cmd_status(&config),
        Commands::Back => cmd_back(&config),
        Commands::Reset => cmd_reset(&config),
        Commands::Env => {
            cmd_env();
            Ok(())
        }
        Commands::Init { force } => cmd_init(&config, force),
    };

    if let Some(log_path) = logging_handle.log_file_path {
        if log_path.exists() {
            eprintln!("Session log: {}", log_path.display());
        }
    }
    result
}

/// Build the backend providers, which need the backend URL and key
fn connect(config: &Config) -> Result<Services> {
    let services = Services::from_config(config)?;
    tracing::debug!(providers = ?services.provider_names(), "Services ready");
    Ok(services)
}

/// User message, the underlying error, and advice when there is any
fn describe_failure(message: &str, err: &StepError) -> String {
    match err.hint() {
        Some(hint) => format!("{} ({})\n{}", message, err, hint),
        None => format!("{} ({})", message, err),
    }
}

fn load_wizard(config: &Config) -> Result<Wizard> {
    Wizard::load(&config.draft_path())
}

fn require_stage(wizard: &Wizard, expected: WizardStage) -> Result<()> {
    if wizard.stage() != expected {
        bail!(
            "The wizard is at '{}', not '{}' (see `onboarding status`)",
            wizard.stage().title(),
            expected.title()
        );
    }
    Ok(())
}

fn cmd_start(config: &Config, name: String, phone: String, password: String) -> Result<()> {
    let wizard = Wizard::new(PendingRegistration::new(name, phone, password));
    wizard.save(&config.draft_path())?;
    println!("Started registration for {}", wizard.login().phone_number);
    println!("Next: onboarding verify --code <4 digits>");
    Ok(())
}

async fn cmd_verify(config: &Config, code: &str) -> Result<()> {
    let mut wizard = load_wizard(config)?;
    require_stage(&wizard, WizardStage::PhoneValidation)?;
    if wizard.login().phone_number.is_empty() {
        bail!("No registration in progress; run `onboarding start` first");
    }

    let services = connect(config)?;
    let mut step = PhoneValidationStep::new();
    if !step.attempt.paste(code) {
        bail!("{}", messages::INCOMPLETE_CODE);
    }

    match step.submit(&services, &mut wizard).await {
        Ok(user_id) => {
            wizard.save(&config.draft_path())?;
            println!("{}", messages::ACCOUNT_VERIFIED);
            println!("User id: {}", user_id);
            println!("Next: onboarding register --name <company>");
            Ok(())
        }
        Err(err) => {
            let message = step.attempt.error().unwrap_or(messages::SEND_FAILED);
            bail!("{}", describe_failure(message, &err))
        }
    }
}

async fn cmd_register(
    config: &Config,
    name: String,
    activity: String,
    address: String,
    logo: Option<PathBuf>,
    docs: Vec<PathBuf>,
    location: Option<(f64, f64)>,
) -> Result<()> {
    let mut wizard = load_wizard(config)?;
    require_stage(&wizard, WizardStage::CompanyRegistration)?;
    let services = connect(config)?;

    let mut step = CompanyRegistrationStep::with_fallback(config.geocoding.fallback);
    step.draft.name = name;
    step.draft.activity = activity;
    step.set_address(address);

    if let Some(path) = logo {
        step.set_logo(UploadFile::from_path(&path)?);
    }
    let documents = docs
        .iter()
        .map(|path| UploadFile::from_path(path))
        .collect::<Result<Vec<_>>>()?;
    let intake = step.set_documents(documents);
    if let Some(warning) = intake.warning {
        eprintln!("{} ({})", warning, intake.rejected.join(", "));
    }

    match location {
        Some((lat, lng)) => step
            .select_map_point(&services, lat, lng)
            .await
            .map_err(|e| anyhow::anyhow!("{} ({})", e.user_message(), e))?,
        None => {
            if !step.resolve_address_now(&services).await {
                println!("Address not resolved; using {}", step.draft.coordinates);
            }
        }
    }
    println!("Location: {}", step.draft.coordinates);
    if !step.draft.nearby_stores.is_empty() {
        println!("Nearby shops: {}", step.draft.nearby_stores.len());
    }

    wizard.record_company(&step);
    let result = step.submit(&services, &mut wizard).await;
    wizard.save(&config.draft_path())?;

    match result {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(err) => {
            let message = step.error().unwrap_or(messages::COMPANY_SAVE_FAILED);
            bail!("{}", describe_failure(message, &err))
        }
    }
}

fn print_report(report: &SubmissionReport) {
    println!("Company saved: {}", report.company_id);
    println!("{}", "─".repeat(60));
    match (&report.logo_url, report.logo_failed) {
        (Some(url), _) => println!("  Logo:      {}", url),
        (None, true) => println!("  Logo:      upload failed"),
        (None, false) => println!("  Logo:      none"),
    }
    for url in &report.saved_documents {
        println!("  Document:  {}", url);
    }
    for failure in &report.failed_documents {
        println!("  Failed:    {} ({})", failure.file_name, failure.reason);
    }
    if !report.is_complete() {
        println!();
        println!("Some files were not saved; the company record exists without them.");
    }
}

async fn cmd_geocode(config: &Config, address: &str, debounced: bool) -> Result<()> {
    // Only the geocoder is needed; no backend configuration required
    let geocoder: Arc<dyn Geocoder> = Arc::new(NominatimGeocoder::from_config(config)?);
    let settings = &config.geocoding;

    let coordinates = if debounced {
        let (debouncer, mut resolutions) = AddressDebouncer::spawn(
            Arc::clone(&geocoder),
            settings.country_code.clone(),
            settings.debounce(),
        );
        debouncer.push(address);
        let wait = settings.debounce() * 20;
        tokio::time::timeout(wait, resolutions.recv())
            .await
            .ok()
            .flatten()
            .map(|r| r.coordinates)
    } else {
        geocoder.geocode(address, &settings.country_code).await?
    };

    let Some(coordinates) = coordinates else {
        println!("No match for {:?}", address);
        return Ok(());
    };
    println!("{}", coordinates);

    let stores = geocoder
        .nearby_stores(coordinates, settings.nearby_radius_m)
        .await
        .context("Nearby shop lookup failed")?;
    for store in &stores {
        println!("  {}  {}", store.coordinates, store.display_name);
    }
    Ok(())
}

fn cmd_status(config: &Config) -> Result<()> {
    let path = config.draft_path();
    if !path.exists() {
        println!("No registration in progress");
        return Ok(());
    }
    let wizard = load_wizard(config)?;
    let login = wizard.login();

    println!("Stage:   {} (page {})", wizard.stage().title(), wizard.page());
    println!("Name:    {}", login.name);
    println!("Phone:   {}", login.phone_number);
    println!(
        "User id: {}",
        login.user_id.as_deref().unwrap_or("(not verified)")
    );
    if !wizard.company.name.is_empty() {
        println!("Company: {}", wizard.company.name);
        println!("Address: {}", wizard.company.address);
        println!("Location: {}", wizard.company.coordinates);
        if let Some(logo) = &wizard.company.logo_name {
            println!("Logo:    {}", logo);
        }
        for doc in &wizard.company.document_names {
            println!("Doc:     {}", doc);
        }
    }
    println!("Draft:   {}", path.display());
    Ok(())
}

fn cmd_back(config: &Config) -> Result<()> {
    let mut wizard = load_wizard(config)?;
    wizard.back();
    wizard.save(&config.draft_path())?;
    println!("Now at: {}", wizard.stage().title());
    Ok(())
}

fn cmd_reset(config: &Config) -> Result<()> {
    let path = config.draft_path();
    if path.exists() {
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;
        println!("Removed {}", path.display());
    } else {
        println!("Nothing to reset");
    }
    Ok(())
}

fn cmd_init(config: &Config, force: bool) -> Result<()> {
    let path = Config::local_config_path();
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    config.save_to(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn cmd_env() {
    for (category, vars) in env_vars::env_vars_by_category() {
        println!("{}", category.display_name());
        println!("{}", "─".repeat(60));
        for var in vars {
            let marker = if var.required { " (required)" } else { "" };
            println!("  {}{}", var.name, marker);
            println!("      {}", var.description);
            if let Some(default) = var.default {
                println!("      default: {}", default);
            }
        }
        println!();
    }
}

use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Result, bail};
use chrono::Local;
use clap::{Parser, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error};

use streamsage_core::{
    GenerationRequest, GenerationResult, HttpBackend, Provider, Repurposer, render_report,
    save_report,
};

use crate::detect::{Platform, VideoType, detect};

mod config;
mod detect;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", secs / 60.0, secs % 60.0)
    }
}

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Default, ValueEnum)]
enum CliProvider {
    #[default]
    Gemini,
    Openai,
    Grok,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Gemini => Provider::Gemini,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Grok => Provider::Grok,
        }
    }
}

#[derive(Parser)]
#[command(name = "streamsage")]
#[command(
    about = "Generate viral captions, hashtags, a description and a strategy tip for reposting a video"
)]
struct Cli {
    /// Video title. Detected from --url when omitted.
    title: Option<String>,

    /// Video URL used to detect the platform and a display title
    #[arg(short, long)]
    url: Option<String>,

    /// Platform the video is reposted on. Detected from --url when omitted.
    #[arg(short = 'P', long)]
    platform: Option<Platform>,

    /// Extra notes for the AI (e.g. "Targeting fitness enthusiasts")
    #[arg(short, long, default_value = "")]
    context: String,

    /// AI provider for generation
    #[arg(short, long, default_value = "gemini")]
    provider: CliProvider,

    /// Model identifier. Defaults to the provider's default model.
    #[arg(short, long, env = "STREAMSAGE_MODEL")]
    model: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Extra attempts after a transient network failure
    #[arg(long, default_value_t = 1)]
    retries: u32,

    /// Write a plain-text report file
    #[arg(short, long)]
    report: bool,

    /// Directory for the report file. Defaults to the downloads directory.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Print the result as JSON instead of styled text
    #[arg(long)]
    json: bool,

    /// Verbose logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.cyan} {msg}")
    {
        pb.set_style(template);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

struct Video {
    title: String,
    platform: Platform,
    video_type: Option<VideoType>,
}

fn resolve_video(cli: &Cli) -> Result<Video> {
    let detected = cli.url.as_deref().map(detect);

    let title = match (&cli.title, &detected) {
        (Some(title), _) => title.clone(),
        (None, Some(video)) => video.title.clone(),
        (None, None) => bail!("Provide a video TITLE or --url"),
    };
    let platform = cli
        .platform
        .or(detected.as_ref().map(|v| v.platform))
        .unwrap_or_default();

    Ok(Video {
        title,
        platform,
        video_type: detected.map(|v| v.video_type),
    })
}

fn print_result(result: &GenerationResult) {
    println!("\n{}", style("Viral Captions").magenta().bold());
    for caption in &result.captions {
        println!("  • \"{}\"", caption);
    }

    println!("\n{}", style("Trending Tags").cyan().bold());
    println!("  {}", result.hashtags.join(" "));

    println!("\n{}", style("Description").bold());
    println!("  {}", result.description);

    println!("\n{}", style("Strategy Tip").yellow().bold());
    println!("  {}", style(&result.analysis).italic());
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    config::init_logging(cli.verbose);

    let provider: Provider = cli.provider.clone().into();

    // Validate API key early
    let client_config = match config::client_config(
        provider,
        cli.model.clone(),
        Duration::from_secs(cli.timeout),
        cli.retries,
    ) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };
    debug!(config = ?client_config, "Resolved client config");

    let video = resolve_video(&cli)?;
    let model = client_config.model.clone();
    let repurposer = Repurposer::new(Arc::new(HttpBackend::new(client_config)?));

    if !cli.json {
        println!(
            "\n{}  {}\n",
            style("streamsage").cyan().bold(),
            style("AI Content Repurposer").dim()
        );
        let kind = match video.video_type {
            Some(VideoType::Short) => " (short)",
            Some(VideoType::Long) => " (long)",
            None => "",
        };
        println!(
            "{} {} {}",
            style("Video:").dim(),
            video.title,
            style(format!("[{}{}]", video.platform.label(), kind)).dim()
        );
    }

    let started = Instant::now();
    let request = GenerationRequest::new(
        video.title.clone(),
        video.platform.label(),
        cli.context.clone(),
    );
    let cycle = repurposer.generate(request);

    let spinner = (!cli.json && repurposer.state().is_loading()).then(|| {
        create_spinner(&format!("Thinking with {} ({})...", provider.name(), model))
    });

    let result = match cycle.await {
        Ok(result) => result,
        Err(e) => {
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            error!(kind = ?e.kind(), "Repurposing failed: {e}");
            eprintln!(
                "{} AI generation failed. Please ensure the API key is valid and try again.",
                style("✗").red().bold()
            );
            std::process::exit(1);
        }
    };

    if let Some(spinner) = spinner {
        spinner.finish_with_message(format!(
            "{} Repost kit generated ({}) {}",
            style("✓").green().bold(),
            provider.name(),
            style(format!("[{}]", format_duration(started.elapsed()))).dim()
        ));
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", style("─".repeat(60)).dim());
        print_result(&result);
    }

    if cli.report {
        let now = Local::now();
        let report = render_report(&video.title, video.platform.label(), &result, &now);
        let dir = match cli.output_dir {
            Some(dir) => dir,
            None => dirs::download_dir()
                .map(Ok)
                .unwrap_or_else(std::env::current_dir)?,
        };
        let path = save_report(&dir, &report, &now).await?;

        if cli.json {
            eprintln!("{} {}", style("Saved:").dim(), path.display());
        } else {
            println!(
                "\n{} {}\n",
                style("Saved:").dim(),
                style(path.display()).cyan()
            );
        }
    }

    Ok(())
}

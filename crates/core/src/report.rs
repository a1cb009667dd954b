use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use tokio::fs;

use crate::types::GenerationResult;

const HEADER_RULE: &str = "================================";
const SECTION_RULE: &str = "--------------------------------";

/// Format a timestamp the way the report header shows it.
pub fn format_generated_at<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

fn push_section(output: &mut String, title: &str, body: &str) {
    output.push_str(&format!("\n\n{SECTION_RULE}\n{title}\n{SECTION_RULE}\n"));
    output.push_str(body);
}

/// Render the plain-text report for a repost kit.
///
/// Pure: the same inputs and timestamp always give the same text.
pub fn render_report<Tz: TimeZone>(
    video_title: &str,
    platform: &str,
    result: &GenerationResult,
    generated_at: &DateTime<Tz>,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut output = String::new();

    output.push_str("STREAM SAGE - AI ANALYSIS REPORT\n");
    output.push_str(HEADER_RULE);
    output.push('\n');
    output.push_str(&format!("Video Title: {}\n", video_title));
    output.push_str(&format!("Platform: {}\n", platform));
    output.push_str(&format!("Generated On: {}", format_generated_at(generated_at)));

    let captions = result
        .captions
        .iter()
        .map(|c| format!("• {}", c))
        .collect::<Vec<_>>()
        .join("\n");
    push_section(&mut output, "VIRAL CAPTIONS", &captions);
    push_section(&mut output, "TRENDING HASHTAGS", &result.hashtags.join(" "));
    push_section(&mut output, "VIDEO DESCRIPTION", &result.description);
    push_section(&mut output, "STRATEGY & ANALYSIS", &result.analysis);

    output.trim().to_string()
}

/// [`render_report`] stamped with the current local time.
pub fn render_report_now(video_title: &str, platform: &str, result: &GenerationResult) -> String {
    render_report(video_title, platform, result, &Local::now())
}

pub fn report_file_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    format!("StreamSage_Report_{}.txt", at.timestamp_millis())
}

/// Write `report` into `dir` under a timestamped name and return its path.
pub async fn save_report<Tz: TimeZone>(
    dir: &Path,
    report: &str,
    at: &DateTime<Tz>,
) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir).await?;
    let path = dir.join(report_file_name(at));
    fs::write(&path, report).await?;
    Ok(path)
}

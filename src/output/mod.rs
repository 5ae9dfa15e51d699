use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::pipeline::PipelineOutput;
use crate::utils::{format_duration, format_file_size};

/// Render a finished run in the requested format
pub fn format_summary(output: &PipelineOutput, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_as_text(output)),
        OutputFormat::Json => serde_json::to_string_pretty(output).context("Failed to serialize run summary"),
    }
}

fn format_as_text(output: &PipelineOutput) -> String {
    let mut lines = Vec::new();

    let mut source = format!("Source: {}", output.source_audio.title);
    if let Some(duration) = output.source_audio.duration {
        source.push_str(&format!(" ({})", format_duration(duration.as_secs_f64())));
    }
    lines.push(source);
    lines.push(format!("Downloaded audio: {}", output.source_audio.path.display()));
    lines.push(format!("Transcript: {} characters", output.transcript.chars().count()));
    lines.push(format!(
        "Speech: {} ({})",
        output.speech.path.display(),
        format_file_size(output.speech.bytes)
    ));

    lines.join("\n")
}

/// Print a finished run to stdout
pub fn print_summary(output: &PipelineOutput, format: &OutputFormat) -> Result<()> {
    let content = format_summary(output, format)?;
    println!("{}", content);

    if matches!(format, OutputFormat::Text) {
        println!(
            "{} Final output file: {}",
            style("Process completed successfully.").green().bold(),
            output.speech.path.display()
        );
    }
    Ok(())
}

/// Save the transcript as plain text
pub async fn save_transcript(output: &PipelineOutput, path: &Path) -> Result<()> {
    fs_err::tokio::write(path, output.transcript.as_bytes())
        .await
        .context("Failed to save transcript")?;
    Ok(())
}

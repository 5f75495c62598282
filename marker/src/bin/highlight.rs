use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use marker::highlight::{merge_highlights, render_html, render_terminal};
use marker::report::FeedbackReport;
use marker::types::FeedbackCategory;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(ValueEnum, Clone, Debug)]
enum OutputFormat {
    Terminal,
    Html,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Category {
    Spag,
    HistoricalAccuracy,
    OverallComments,
    Marking,
}

impl From<Category> for FeedbackCategory {
    fn from(c: Category) -> Self {
        match c {
            Category::Spag => FeedbackCategory::Spag,
            Category::HistoricalAccuracy => FeedbackCategory::HistoricalAccuracy,
            Category::OverallComments => FeedbackCategory::OverallComments,
            Category::Marking => FeedbackCategory::Marking,
        }
    }
}

/// Show a saved feedback response with its corrections highlighted.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Feedback response JSON as returned by POST /api/feedback
    report: PathBuf,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Terminal)]
    format: OutputFormat,
    /// Shorthand for --format html
    #[arg(long)]
    html: bool,
    /// Only highlight these categories (repeatable)
    #[arg(long = "category", value_enum)]
    categories: Vec<Category>,
    /// Write output to a file instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

fn load_report(path: &Path) -> Result<FeedbackReport> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let report = load_report(&args.report)?;

    let wanted: Vec<FeedbackCategory> = args.categories.iter().map(|&c| c.into()).collect();
    let records: Vec<_> = report
        .feedback
        .into_iter()
        .filter(|r| wanted.is_empty() || wanted.contains(&r.category))
        .collect();

    let text = report.submission;
    let runs = merge_highlights(text.chars().count(), &records);
    let rendered = match (args.html, args.format) {
        (true, _) | (_, OutputFormat::Html) => render_html(&text, &runs),
        (false, OutputFormat::Terminal) => render_terminal(&text, &runs),
    };

    match args.out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating dir {}", parent.display()))?;
            }
            fs::write(&path, rendered).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Saved highlighted submission to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

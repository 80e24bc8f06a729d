//! Markdown reports over a labeled dataset.

use std::fmt::Write as _;

use anyhow::Context;
use ltl_core::analytics::{
    cumulative_stage_counts, persona_summaries, stage_totals, weekly_conversions,
    weekly_stage_counts, WeeklyStageCounts,
};
use ltl_core::dataset::read_labeled;
use ltl_core::{processed_path, AppConfig, EmotionLabel, FunnelStage, LabeledPost};

use crate::ReportArgs;

/// Print a funnel report for a labeled dataset.
///
/// # Errors
///
/// Returns an error if the dataset cannot be read.
pub(crate) fn run_report(config: &AppConfig, args: &ReportArgs) -> anyhow::Result<()> {
    let path = match (&args.dataset, &args.name) {
        (Some(path), _) => path.clone(),
        (None, Some(name)) => processed_path(&config.data_root, name),
        (None, None) => anyhow::bail!("either --dataset or --name is required"),
    };
    let rows = read_labeled(&path).with_context(|| format!("failed to read {}", path.display()))?;

    if rows.is_empty() {
        println!("dataset {} has no rows", path.display());
        return Ok(());
    }

    print!("{}", render_report(&rows, args.cumulative, args.top_personas));
    Ok(())
}

fn stage_row(out: &mut String, label: &str, week: &WeeklyStageCounts) {
    let _ = write!(out, "| {label} |");
    for stage in FunnelStage::ALL {
        let _ = write!(out, " {} |", week.counts.get(stage));
    }
    out.push('\n');
}

fn stage_header(out: &mut String, first: &str) {
    let _ = write!(out, "| {first} |");
    for stage in FunnelStage::ALL {
        let _ = write!(out, " {stage} |");
    }
    out.push('\n');
    out.push_str("|---|");
    for _ in FunnelStage::ALL {
        out.push_str("---|");
    }
    out.push('\n');
}

pub(crate) fn render_report(rows: &[LabeledPost], cumulative: bool, top_personas: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Funnel Report\n");
    let _ = writeln!(out, "Posts: {}\n", rows.len());

    out.push_str("## Stage Totals\n\n");
    let totals = stage_totals(rows);
    out.push_str("| Stage | Posts | Share |\n|---|---|---|\n");
    for stage in FunnelStage::ALL {
        let count = totals.get(stage);
        #[allow(clippy::cast_precision_loss)]
        let share = count as f64 * 100.0 / totals.total().max(1) as f64;
        let _ = writeln!(out, "| {stage} | {count} | {share:.1}% |");
    }

    let weekly = weekly_stage_counts(rows);
    let (title, table) = if cumulative {
        ("Cumulative Stage Counts", cumulative_stage_counts(&weekly))
    } else {
        ("Weekly Stage Counts", weekly.clone())
    };
    let _ = writeln!(out, "\n## {title}\n");
    stage_header(&mut out, "Week");
    for week in &table {
        stage_row(&mut out, &week.week.format("%Y-%m-%d").to_string(), week);
    }

    out.push_str("\n## Weekly Conversions\n\n");
    out.push_str("| Week | Step | Rate |\n|---|---|---|\n");
    for rate in weekly_conversions(&weekly) {
        let _ = writeln!(
            out,
            "| {} | {} | {:.2} |",
            rate.week.format("%Y-%m-%d"),
            rate.step,
            rate.rate
        );
    }

    out.push_str("\n## Top Personas\n\n");
    out.push_str("| Author | Posts | Latest Stage | Furthest Stage |\n|---|---|---|---|\n");
    for persona in persona_summaries(rows).into_iter().take(top_personas) {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} |",
            persona.author, persona.post_count, persona.latest_stage, persona.furthest_stage
        );
    }

    out
}

/// Print every emotion label with its funnel stage.
pub(crate) fn print_stage_table() {
    print!("{}", render_stage_table());
}

fn render_stage_table() -> String {
    let mut out = String::from("| Stage | Emotions |\n|---|---|\n");
    for stage in FunnelStage::ALL {
        let labels: Vec<&str> = EmotionLabel::ALL
            .iter()
            .filter(|l| l.stage() == stage)
            .map(|l| l.as_str())
            .collect();
        let _ = writeln!(out, "| {stage} | {} |", labels.join(", "));
    }
    out
}

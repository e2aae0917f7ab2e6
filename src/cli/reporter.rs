// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CLI output reporter with colored formatting

use super::sweep::SweepSummary;
use crate::geometry::analytics::GeometryStats;
use crate::geometry::{BooleanOp, EvaluationStats};
use colored::*;
use std::time::Duration;

/// CLI reporter for formatted output
pub struct Reporter;

impl Reporter {
    fn rule() {
        println!("{}", "━".repeat(80).bright_black());
    }

    /// Report one evaluated frame
    pub fn report_evaluation(
        label: &str,
        op: BooleanOp,
        stats: &EvaluationStats,
        geometry: &GeometryStats,
    ) {
        println!();
        Self::rule();
        println!("{} {} ({})", "Scene:".bold(), label.cyan(), op.to_string().yellow());
        Self::rule();

        if geometry.is_watertight {
            println!("{} {}", "✅".green(), "Result is closed".green().bold());
        } else {
            println!("{} {}", "⚠️".yellow(), "Result has open edges".yellow().bold());
        }

        println!("\n{}", "Pipeline:".bold());
        Self::print_count("Candidate pairs", stats.candidate_pairs);
        Self::print_count("Segments", stats.segments);
        Self::print_count("Boundary (A)", stats.boundary_a);
        Self::print_count("Boundary (B)", stats.boundary_b);
        Self::print_count("Fragments", stats.fragments);
        Self::print_count("Edges split", stats.stitch.edges_split);
        Self::print_count("Faces cancelled", stats.stitch.cancelled_pairs);
        if stats.degenerate_skipped > 0 {
            Self::print_count("Degenerate skipped", stats.degenerate_skipped);
        }

        println!("\n{}", "Result:".bold());
        Self::print_count("Vertices", geometry.vertex_count);
        Self::print_count("Triangles", geometry.triangle_count);
        Self::print_count("Groups", geometry.group_count);
        println!(
            "  {} {}",
            "Volume:".bright_black(),
            format!("{:.6}", geometry.volume).cyan()
        );
        println!(
            "  {} {}",
            "Time:".bright_black(),
            Self::format_duration(Duration::from_secs_f64(stats.elapsed_ms / 1000.0)).yellow()
        );
        Self::rule();
    }

    /// Report a parameter sweep
    pub fn report_sweep(summary: &SweepSummary) {
        println!();
        Self::rule();
        println!(
            "{} {} frames of {}",
            "Sweep:".bold(),
            summary.frames.to_string().cyan(),
            summary.preset.to_string().cyan()
        );
        Self::rule();
        println!(
            "  {} {}  {} {}  {} {}",
            "min:".bright_black(),
            Self::format_duration(summary.min).green(),
            "mean:".bright_black(),
            Self::format_duration(summary.mean).yellow(),
            "max:".bright_black(),
            Self::format_duration(summary.max).red(),
        );
        println!(
            "  {} {}",
            "Open results:".bright_black(),
            Self::colored_count(summary.open_results)
        );
        if summary.deterministic {
            println!("{} {}", "✅".green(), "Repeated frames are identical".green());
        } else {
            println!("{} {}", "❌".red(), "Repeated frames differ".red().bold());
        }
        Self::rule();
    }

    /// Report error
    pub fn report_error(message: &str) {
        eprintln!("\n{} {}", "❌ Error:".red().bold(), message);
    }

    /// Print success message
    pub fn success(message: &str) {
        println!("{} {}", "✅".green(), message.green());
    }

    fn print_count(name: &str, value: usize) {
        println!(
            "  {} {}",
            format!("{}:", name).bright_black(),
            value.to_string().cyan()
        );
    }

    fn colored_count(value: usize) -> ColoredString {
        if value == 0 {
            value.to_string().green()
        } else {
            value.to_string().red()
        }
    }

    /// Format duration for display
    pub fn format_duration(duration: Duration) -> String {
        let micros = duration.as_micros();

        if micros < 1_000 {
            format!("{}µs", micros)
        } else if micros < 1_000_000 {
            format!("{:.2}ms", micros as f64 / 1_000.0)
        } else {
            format!("{:.2}s", micros as f64 / 1_000_000.0)
        }
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CLI output reporter with colored formatting

use crate::db::ObjectRef;
use crate::ops::{BoundsReport, CombineReport, WalkReport};
use colored::*;
use nalgebra::{Point3, Vector3};
use std::time::Duration;

/// Which lines of a bounds report to print
#[derive(Debug, Clone, Copy)]
pub struct BoundsFields {
    pub dimensions: bool,
    pub extents: bool,
    pub midpoint: bool,
    pub volume: bool,
    /// Suppress the header line
    pub quiet: bool,
}

impl BoundsFields {
    /// With no field selected every field is printed
    pub fn or_all(self) -> Self {
        if self.dimensions || self.extents || self.midpoint || self.volume {
            self
        } else {
            Self {
                dimensions: true,
                extents: true,
                midpoint: true,
                volume: true,
                quiet: self.quiet,
            }
        }
    }
}

/// CLI reporter for formatted output
pub struct Reporter;

impl Reporter {
    /// Report a finished combine
    pub fn report_combine(report: &CombineReport, duration: Duration) {
        println!("\n{}", "━".repeat(80).bright_black());
        println!("{} {}", "Combined:".bold(), report.name.cyan());
        println!("{}", "━".repeat(80).bright_black());
        println!("  {} {}", "Expression:".bright_black(), report.expression);
        println!(
            "  {} {} roots, {} regions, {} leaves",
            "Walked:".bright_black(),
            report.roots,
            report.regions,
            report.leaves
        );
        println!(
            "  {} {}{}",
            "Faces:".bright_black(),
            report.faces.to_string().cyan(),
            if report.triangulated {
                " (triangulated)"
            } else {
                ""
            }
        );
        println!(
            "  {} {}",
            "Volume:".bright_black(),
            format!("{:.6}", report.volume).cyan()
        );
        println!(
            "  {} {}",
            "Fingerprint:".bright_black(),
            report.fingerprint.bright_black()
        );
        println!(
            "  {} {}",
            "Time:".bright_black(),
            Self::format_duration(duration).yellow()
        );
        for err in &report.branch_errors {
            Self::report_warning(err);
        }
        println!("{}", "━".repeat(80).bright_black());
    }

    /// Report a traced walk
    pub fn report_walk(report: &WalkReport) {
        println!(
            "{} {}",
            "Walked:".bold(),
            report.roots.join(" ").cyan()
        );
        let stats = &report.stats;
        println!(
            "  {} {}  {} {}  {} {}",
            "regions".bright_black(),
            stats.regions,
            "leaves".bright_black(),
            stats.leaves,
            "errors".bright_black(),
            stats.branch_errors
        );
        for (kind, count) in &report.leaf_kinds {
            println!("  {:>12} {}", kind.bright_black(), count);
        }
        for err in &report.errors {
            Self::report_warning(err);
        }
    }

    /// Report a bounding box
    pub fn report_bounds(report: &BoundsReport, fields: BoundsFields) {
        let fields = fields.or_all();
        if !fields.quiet {
            let kind = if report.oriented {
                "Oriented bounding box"
            } else {
                "Bounding box"
            };
            println!("{} {}", format!("{}:", kind).bold(), report.objects.join(" ").cyan());
        }
        if fields.extents {
            println!(
                "  {} {}  {} {}",
                "min".bright_black(),
                Self::format_point(&report.min),
                "max".bright_black(),
                Self::format_point(&report.max)
            );
        }
        if fields.dimensions {
            println!(
                "  {} {}",
                "dimensions".bright_black(),
                Self::format_vector(&report.dimensions)
            );
        }
        if fields.midpoint {
            println!(
                "  {} {}",
                "midpoint".bright_black(),
                Self::format_point(&report.midpoint)
            );
        }
        if fields.volume {
            println!("  {} {:.6}", "volume".bright_black(), report.volume);
        }
        if let Some(name) = &report.created {
            Self::success(&format!("created {}", name));
        }
        for err in &report.errors {
            Self::report_warning(err);
        }
    }

    /// List directory entries
    pub fn report_listing(title: &str, entries: &[ObjectRef]) {
        if !title.is_empty() {
            println!("{}", title.bold());
        }
        for entry in entries {
            let kind = entry.kind().to_string();
            let kind = if entry.kind().is_combination() {
                kind.yellow()
            } else {
                kind.bright_black()
            };
            println!("  {:<24} {}", entry.name().cyan(), kind);
        }
    }

    /// Report error
    pub fn report_error(message: &str) {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }

    /// Report warning
    pub fn report_warning(message: &str) {
        eprintln!("{} {}", "Warning:".yellow().bold(), message);
    }

    /// Print success message
    pub fn success(message: &str) {
        println!("{} {}", "✔".green(), message.green());
    }

    fn format_point(p: &Point3<f64>) -> String {
        format!("({:.6}, {:.6}, {:.6})", p.x, p.y, p.z)
    }

    fn format_vector(v: &Vector3<f64>) -> String {
        format!("{:.6} x {:.6} x {:.6}", v.x, v.y, v.z)
    }

    /// Format duration for display
    fn format_duration(duration: Duration) -> String {
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

use inquire::MultiSelect;
use owo_colors::OwoColorize;
use std::collections::BTreeSet;
use std::fmt;

use crate::candidates::ReviewerCandidate;
use crate::presenter::Presenter;
use crate::report::OwnersReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

/// Presenter backed by the terminal.
///
/// Prompts only when `interactive` is set; otherwise every selection counts
/// as closed, which keeps `show`, `check` and `apply` non-blocking.
pub struct TerminalPresenter {
    mode: OutputMode,
    interactive: bool,
}

impl TerminalPresenter {
    pub fn new(mode: OutputMode, interactive: bool) -> Self {
        Self { mode, interactive }
    }
}

struct CandidateOption<'a>(&'a ReviewerCandidate);

impl fmt::Display for CandidateOption<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.label())?;
        if let Some(vote) = self.0.vote_text() {
            write!(f, " {}", colored_vote(self.0.vote, &vote))?;
        }
        Ok(())
    }
}

fn colored_vote(vote: i32, text: &str) -> String {
    if vote > 0 {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}

fn print_report(report: &OwnersReport) {
    println!(
        "🔎 Change {} in {} ({}): {}",
        report.change.bold(),
        report.project,
        report.branch,
        report.subject
    );
    println!("   Minimum owner vote: +{}", report.min_vote);

    println!();
    if report.candidates.is_empty() {
        println!("No owners or reviewers found.");
    } else {
        println!("{}", "Reviewer candidates:".bold());
        for candidate in &report.candidates {
            let mark = if candidate.is_reviewer { "[x]" } else { "[ ]" };
            println!("  {} {}", mark, CandidateOption(candidate));
        }
    }

    if !report.exempt {
        for (group_type, groups) in report.groups.sections() {
            println!();
            if group_type.is_blocking() {
                println!("{}", group_type.title().yellow().bold());
            } else {
                println!("{}", group_type.title().bold());
            }
            if let Some(note) = group_type.note(report.min_vote) {
                println!("{}", note.dimmed());
            }
            for group in groups {
                println!("  {}", report.group_line(group));
            }
        }
    }

    println!();
    if report.exempt || report.groups.all_approved() {
        println!("✅ {}", report.footer());
    } else {
        println!("💡 {}", report.footer());
    }

    if let Some(debug) = report.render_debug() {
        println!();
        print!("{}", debug.dimmed());
    }
}

impl Presenter for TerminalPresenter {
    fn show_report(&mut self, report: &OwnersReport) {
        match self.mode {
            OutputMode::Text => print_report(report),
            OutputMode::Json => match report.to_json() {
                Ok(json) => println!("{}", json),
                Err(e) => log::error!("Failed to serialize report: {}", e),
            },
        }
    }

    fn select_reviewers(&mut self, report: &OwnersReport) -> Option<BTreeSet<String>> {
        if !self.interactive {
            return None;
        }
        if report.candidates.is_empty() {
            println!("ℹ️  No reviewer candidates for this change.");
            return None;
        }

        let options: Vec<CandidateOption> = report.candidates.iter().map(CandidateOption).collect();
        let defaults: Vec<usize> = report
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_reviewer)
            .map(|(index, _)| index)
            .collect();

        let selection = MultiSelect::new("👥 Select reviewers (Esc to close):", options)
            .with_default(&defaults)
            .with_help_message("space toggles, enter applies")
            .prompt_skippable();

        match selection {
            Ok(Some(selected)) => Some(selected.iter().map(|o| o.0.email.clone()).collect()),
            Ok(None) => None,
            Err(e) => {
                log::warn!("Selection cancelled: {}", e);
                None
            }
        }
    }

    fn alert(&mut self, message: &str) {
        eprintln!("{} {}", "⚠️ ".red(), message.red());
    }

    fn hide(&mut self) {
        log::debug!("Closing reviewer checklist");
    }

    fn refresh(&mut self) {
        if self.mode == OutputMode::Text {
            println!("🔄 Reviewers updated. Reloading owners...\n");
        }
    }
}

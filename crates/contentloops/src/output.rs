use colored::Colorize;

use contentloops_core::RunOutcome;

/// Reasoning summary and status on stderr, final post on stdout
pub fn print_outcome(outcome: &RunOutcome) {
    eprintln!();
    eprintln!("{}", "=== REASONING ===".bold());
    if !outcome.plan.rationale.is_empty() {
        eprintln!("{}", "Plan:".bright_cyan().bold());
        eprintln!("{}", outcome.plan.rationale.dimmed());
    }

    for entry in &outcome.thinking_log {
        eprintln!();
        eprintln!(
            "{} (score {:.2})",
            format!("--- Iteration {} ---", entry.iteration).bright_blue(),
            entry.score
        );
        if !entry.generator_rationale.is_empty() {
            eprintln!("{} {}", "Generator:".bright_cyan(), entry.generator_rationale);
        }
        if !entry.evaluator_rationale.is_empty() {
            eprintln!("{} {}", "Evaluator:".bright_magenta(), entry.evaluator_rationale);
        }
        eprintln!("{} {}", "Feedback:".dimmed(), entry.feedback);
    }

    eprintln!();
    if outcome.is_passed() {
        eprintln!("{}", "=== PASSED ===".bright_green().bold());
    } else {
        eprintln!("{}", "=== BELOW THRESHOLD ===".bright_yellow().bold());
        eprintln!("Reached maximum iterations ({})", outcome.iterations);
    }
    eprintln!("Score: {:.2}", outcome.final_score);
    eprintln!(
        "Iterations: {} (best: {})",
        outcome.iterations, outcome.best_iteration
    );
    eprintln!("Duration: {:.1}s", outcome.total_duration_secs);
    if let Some(path) = &outcome.export_path {
        eprintln!("Exported: {}", path.display());
    }

    eprintln!();
    eprintln!("{}", "=== FINAL CONTENT ===".bold());
    println!("{}", outcome.final_content);
}

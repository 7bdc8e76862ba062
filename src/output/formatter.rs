use std::io::IsTerminal;

use chrono::{DateTime, Duration, Utc};
use owo_colors::OwoColorize;
use terminal_size::{terminal_size, Width};

use crate::dashboard::{ClassifiedPr, Dashboard};
use crate::timeline::{ReviewMetrics, Timeline};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate title to fit available width, accounting for Unicode
fn truncate_title(title: &str, max_width: usize) -> String {
    let chars: Vec<char> = title.chars().collect();
    if chars.len() <= max_width {
        title.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Format one dashboard as a heading plus one line per PR.
/// Line format: "#{number}  {state}  {age}  {author}  {title}"
pub fn format_dashboard(
    dashboard: Dashboard,
    prs: &[&ClassifiedPr],
    as_of: DateTime<Utc>,
    use_colors: bool,
) -> String {
    let heading = if use_colors {
        format!(
            "{} {}",
            dashboard.short_description().bold(),
            format!("(#{})", dashboard.anchor()).dimmed()
        )
    } else {
        format!("{} (#{})", dashboard.short_description(), dashboard.anchor())
    };

    if prs.is_empty() {
        return format!("{}\n  none\n", heading);
    }

    let term_width = get_terminal_width();
    let mut out = String::new();
    out.push_str(&heading);
    out.push('\n');
    for pr in prs {
        out.push_str(&format_pr_line(pr, as_of, term_width, use_colors));
        out.push('\n');
    }
    out
}

fn format_pr_line(
    pr: &ClassifiedPr,
    as_of: DateTime<Utc>,
    term_width: Option<usize>,
    use_colors: bool,
) -> String {
    let number = format!("#{:<6}", pr.number());
    let state = format!("{:<18}", pr.state.as_str());
    let age = format!("{:>4}", format_age(pr.staleness(as_of)));
    let author = &pr.snapshot.author;

    // Everything before the title has a fixed layout; give the title the rest.
    let fixed_width = 2 + number.len() + 2 + state.len() + 2 + age.len() + 2 + author.len() + 2;
    let title = match term_width {
        Some(width) if width > fixed_width + 10 => {
            truncate_title(&pr.snapshot.title, width - fixed_width)
        }
        Some(_) => truncate_title(&pr.snapshot.title, 20),
        None => pr.snapshot.title.clone(),
    };

    if use_colors {
        format!(
            "  {}  {}  {}  {}  {}",
            number.bold(),
            state.cyan(),
            age,
            author.yellow(),
            title
        )
    } else {
        format!("  {}  {}  {}  {}  {}", number, state, age, author, title)
    }
}

/// Format dashboard membership as tab-separated values for scripting
/// Columns: dashboard, number, state, age_seconds, author, title (no headers, no colors)
pub fn format_tsv(dashboard: Dashboard, prs: &[&ClassifiedPr], as_of: DateTime<Utc>) -> String {
    prs.iter()
        .map(|pr| {
            format!(
                "{}\t{}\t{}\t{}\t{}\t{}",
                dashboard.anchor(),
                pr.number(),
                pr.state.as_str(),
                pr.staleness(as_of).num_seconds(),
                pr.snapshot.author,
                pr.snapshot.title
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render one PR's reconstructed interval sequence and its aggregate metrics.
pub fn format_timeline(
    number: u64,
    timeline: &Timeline,
    metrics: &ReviewMetrics,
    now: DateTime<Utc>,
    use_colors: bool,
) -> String {
    let mut out = String::new();
    if use_colors {
        out.push_str(&format!("{}\n", format!("PR #{}", number).bold()));
    } else {
        out.push_str(&format!("PR #{}\n", number));
    }
    if timeline.approximate {
        out.push_str("  (history begins after the PR was created; durations are approximate)\n");
    }

    for interval in &timeline.intervals {
        let end = match interval.end {
            Some(end) => end.format("%Y-%m-%d %H:%M").to_string(),
            None => "now".to_string(),
        };
        let line = format!(
            "  {}  {}  {:<18} {}",
            interval.start.format("%Y-%m-%d %H:%M"),
            end,
            interval.state.as_str(),
            format_age(interval.duration_until(now)),
        );
        if use_colors && interval.state.is_review_eligible() {
            out.push_str(&format!("{}\n", line.green()));
        } else {
            out.push_str(&line);
            out.push('\n');
        }
    }

    out.push_str(&format!(
        "\n  Total review time: {}\n  Since last change: {}\n  Current state: {}\n",
        format_age(metrics.total_review_time),
        format_age(metrics.time_since_last_change),
        metrics.current_state.as_str()
    ));
    out
}

/// Format a duration into a human-readable age string
/// "2h" for hours, "3d" for days, "1w" for weeks
pub fn format_age(duration: Duration) -> String {
    let hours = duration.num_hours();
    let days = duration.num_days();
    let weeks = days / 7;

    if weeks >= 1 {
        format!("{}w", weeks)
    } else if days >= 1 {
        format!("{}d", days)
    } else if hours >= 1 {
        format!("{}h", hours)
    } else {
        let minutes = duration.num_minutes();
        if minutes >= 1 {
            format!("{}m", minutes)
        } else {
            "now".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::types::{CiConclusion, Label, PullRequestSnapshot};
    use crate::timeline::Interval;
    use chrono::TimeZone;

    fn sep(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, day, 0, 0, 0).unwrap()
    }

    fn sample_classified(number: u64, labels: &[&str]) -> ClassifiedPr {
        ClassifiedPr::from_snapshot(PullRequestSnapshot {
            number,
            author: "octocat".to_string(),
            title: "feat: add widgets".to_string(),
            labels: labels.iter().map(|n| Label::new(n)).collect(),
            ci: CiConclusion::Success,
            is_draft: false,
            is_fork: false,
            has_merge_conflict: false,
            assignee: "nobody".to_string(),
            approvals: vec![],
            participants: vec![],
            additions: 10,
            deletions: 2,
            changed_files: 1,
            last_updated_at: sep(1),
        })
    }

    #[test]
    fn test_format_dashboard_empty() {
        let result = format_dashboard(Dashboard::Queue, &[], sep(2), false);
        assert!(result.contains("PRs on the review queue"));
        assert!(result.contains("(#queue)"));
        assert!(result.contains("none"));
    }

    #[test]
    fn test_format_dashboard_lists_each_pr() {
        let a = sample_classified(101, &[]);
        let b = sample_classified(202, &["awaiting-zulip"]);
        let result = format_dashboard(Dashboard::Queue, &[&a, &b], sep(2), false);
        assert!(result.contains("#101"));
        assert!(result.contains("#202"));
        assert!(result.contains("ready-for-review"));
        assert!(result.contains("awaiting-decision"));
        assert!(result.contains("octocat"));
        assert!(result.contains("1d"));
    }

    #[test]
    fn test_format_tsv_columns() {
        let a = sample_classified(7, &[]);
        let result = format_tsv(Dashboard::Queue, &[&a], sep(2));
        let fields: Vec<&str> = result.split('\t').collect();
        assert_eq!(fields.len(), 6);
        assert_eq!(fields[0], "queue");
        assert_eq!(fields[1], "7");
        assert_eq!(fields[2], "ready-for-review");
        assert_eq!(fields[3], "86400");
        assert_eq!(fields[4], "octocat");
    }

    #[test]
    fn test_format_timeline_marks_approximate() {
        let timeline = Timeline {
            intervals: vec![Interval {
                state: crate::classify::LifecycleState::ReadyForReview,
                start: sep(1),
                end: None,
            }],
            approximate: true,
        };
        let metrics = ReviewMetrics {
            total_review_time: Duration::days(2),
            time_since_last_change: Duration::days(2),
            current_state: crate::classify::LifecycleState::ReadyForReview,
        };
        let result = format_timeline(42, &timeline, &metrics, sep(3), false);
        assert!(result.contains("PR #42"));
        assert!(result.contains("approximate"));
        assert!(result.contains("now"));
        assert!(result.contains("Total review time: 2d"));
    }

    #[test]
    fn test_format_age_hours() {
        assert_eq!(format_age(Duration::hours(3)), "3h");
    }

    #[test]
    fn test_format_age_days() {
        assert_eq!(format_age(Duration::days(2)), "2d");
    }

    #[test]
    fn test_format_age_weeks() {
        assert_eq!(format_age(Duration::weeks(2)), "2w");
    }

    #[test]
    fn test_format_age_minutes() {
        assert_eq!(format_age(Duration::minutes(30)), "30m");
    }

    #[test]
    fn test_format_age_now() {
        assert_eq!(format_age(Duration::seconds(30)), "now");
    }

    #[test]
    fn test_truncate_title_short() {
        assert_eq!(truncate_title("Short title", 20), "Short title");
    }

    #[test]
    fn test_truncate_title_long() {
        assert_eq!(truncate_title("This is a very long title", 15), "This is a ve...");
    }

    #[test]
    fn test_truncate_title_very_narrow() {
        assert_eq!(truncate_title("Hello world", 3), "Hel");
    }
}

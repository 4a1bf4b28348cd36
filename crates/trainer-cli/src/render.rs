use std::fmt::Write;

use trainer_core::{
    LibraryView, Mode, ReviewView, ScenarioPlayer, ScoreCard, Shell, StepView, TeamSession,
};

const CHAT_TAIL: usize = 10;

pub fn menu() -> String {
    let mut out = String::from("Security Training Simulator\n");
    out.push_str("Solo & team decision-making trainer: OODA Loop, After Action Review\n\n");
    for (n, item) in Shell::menu().iter().enumerate() {
        let _ = writeln!(out, "  {}. {} [{}]", n + 1, item.title, item.action);
        let _ = writeln!(out, "     {}", item.blurb);
    }
    out.push_str("\nchoose 1-4, or `help`");
    out
}

pub fn screen(shell: &Shell) -> String {
    if let Some(player) = shell.player() {
        return player_screen(player);
    }
    if let Some(team) = shell.team() {
        return team_screen(team);
    }
    if let Some(library) = shell.library() {
        return library_screen(library);
    }
    if let Some(review) = shell.review() {
        return review_screen(review);
    }
    match shell.mode() {
        Mode::Menu => menu(),
        _ => "Scenario not found. Type `back` to return to the menu.".to_string(),
    }
}

pub fn player_screen(player: &ScenarioPlayer) -> String {
    match player.view() {
        Some(view) => step(&view),
        None => finished(&player.score()),
    }
}

pub fn step(view: &StepView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.title);
    let _ = writeln!(out, "{}", view.summary);
    let _ = writeln!(
        out,
        "\nStep {} of {} ({})",
        view.position, view.step_count, view.phase
    );
    if let Some(remaining) = view.remaining {
        let _ = writeln!(out, "{}", timer(remaining, view.urgent));
    }
    let _ = writeln!(out, "{}\n", view.prompt);

    for (n, option) in view.options.iter().enumerate() {
        let mark = if option.selected { "*" } else { " " };
        let _ = writeln!(out, "  {mark} {}) {}", n + 1, option.text);
    }

    if let (Some(feedback), Some(score)) = (&view.feedback, view.step_score) {
        let _ = writeln!(out, "\nFeedback: {feedback}");
        let _ = writeln!(out, "Step score: {score}");
    }
    let _ = writeln!(out, "Overall: {}%", view.percent);

    if view.can_advance {
        let _ = write!(out, "type `next` for {}", view.advance_label);
    } else {
        out.push_str("type an option number to choose");
    }
    out
}

pub fn timer(remaining: u32, urgent: bool) -> String {
    if urgent {
        format!("Time left: {remaining}s (!)")
    } else {
        format!("Time left: {remaining}s")
    }
}

pub fn finished(card: &ScoreCard) -> String {
    format!(
        "Scenario complete: {} / {} ({}%)",
        card.cumulative, card.max, card.percent
    )
}

pub fn team_screen(team: &TeamSession) -> String {
    let mut out = String::new();
    let link = if team.is_connected() {
        "connected"
    } else {
        "local only"
    };
    let _ = writeln!(
        out,
        "Team session on {} as {} ({link})",
        team.topic(),
        team.role()
    );

    let _ = writeln!(out, "\nBoard ({} markers):", team.markers().len());
    for marker in team.markers() {
        let _ = writeln!(out, "  @ ({:.1}, {:.1})", marker.x, marker.y);
    }

    let chat = team.chat();
    let _ = writeln!(out, "\nChat:");
    if chat.is_empty() {
        out.push_str("  (no messages)\n");
    }
    for msg in chat.iter().skip(chat.len().saturating_sub(CHAT_TAIL)) {
        let _ = writeln!(out, "  [{}] {}", msg.from, msg.text);
    }
    out.push_str("\ncommands: marker X Y, say TEXT, role NAME, back");
    out
}

pub fn library_screen(library: &LibraryView) -> String {
    let mut out = String::from("Scenario Library\n");
    let filter = library.filter();
    if !filter.is_empty() {
        let _ = writeln!(
            out,
            "filter: tag={} level={}",
            filter.tag.as_deref().unwrap_or("any"),
            filter
                .difficulty
                .map_or("any", |difficulty| difficulty.as_str())
        );
    }

    let entries = library.entries();
    if entries.is_empty() {
        out.push_str("\nNo scenarios match the filter.\n");
    }
    for (n, entry) in entries.iter().enumerate() {
        let _ = writeln!(
            out,
            "\n  {}. {} [{}] ({} steps)",
            n + 1,
            entry.title,
            entry.difficulty,
            entry.step_count
        );
        let _ = writeln!(out, "     {}", entry.summary);
        let _ = writeln!(out, "     tags: {}", entry.tags.join(", "));
    }
    let _ = write!(
        out,
        "\ntags: {}\ncommands: open N|ID, tag T, level L, clear-filter, back",
        library.tags().join(", ")
    );
    out
}

pub fn review_screen(review: &ReviewView) -> String {
    let mut out = String::from("After Action Review\n");
    if review.is_empty() {
        out.push_str("\nNo events logged yet.\n");
    }
    for entry in review.entries() {
        let _ = writeln!(out, "\n{}  {}", entry.when, entry.kind);
        for line in entry.payload.lines() {
            let _ = writeln!(out, "    {line}");
        }
    }
    out.push_str("\ncommands: refresh, clear, back");
    out
}

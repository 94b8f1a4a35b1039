// Text rendering of grids, values and policies

use ndarray::Array2;

use gridworld_core::{Action, CellKind, PolicyEntry, PolicyGrid, Position, ValueGrid};

/// Single-letter display label
pub fn action_label(action: Action) -> &'static str {
    match action {
        Action::Up => "U",
        Action::Down => "D",
        Action::Left => "L",
        Action::Right => "R",
    }
}

fn cell_symbol(kind: CellKind) -> char {
    match kind {
        CellKind::Plain => '.',
        CellKind::Terminal => 'T',
        CellKind::Jump => 'J',
        CellKind::StochasticJump => 'S',
        CellKind::JumpTarget => 'x',
    }
}

pub fn render_layout(layout: &Array2<CellKind>) -> String {
    let mut out = String::new();
    for row in layout.outer_iter() {
        let line: Vec<String> = row.iter().map(|k| cell_symbol(*k).to_string()).collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    out.push_str("legend: . plain  T terminal  J jump  S stochastic jump  x jump target\n");
    out
}

pub fn render_values(values: &ValueGrid) -> String {
    let mut out = String::new();
    for row in values.outer_iter() {
        let line: Vec<String> = row.iter().map(|v| format!("{v:>7.2}")).collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    out
}

/// Label of one policy cell; ties read "U, D"
pub fn policy_label(entry: &PolicyEntry, kind: CellKind) -> String {
    if kind == CellKind::Terminal {
        return "T".to_string();
    }
    let actions = entry.displayed_actions();
    if actions.is_empty() {
        return "-".to_string();
    }
    actions
        .iter()
        .map(action_label)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn policy_labels(policy: &PolicyGrid, layout: &Array2<CellKind>) -> Vec<Vec<String>> {
    policy
        .outer_iter()
        .zip(layout.outer_iter())
        .map(|(entries, kinds)| {
            entries
                .iter()
                .zip(kinds.iter())
                .map(|(e, k)| policy_label(e, *k))
                .collect()
        })
        .collect()
}

pub fn render_policy(policy: &PolicyGrid, layout: &Array2<CellKind>) -> String {
    let labels = policy_labels(policy, layout);
    let width = labels
        .iter()
        .flatten()
        .map(String::len)
        .max()
        .unwrap_or(1);
    let mut out = String::new();
    for row in labels {
        let line: Vec<String> = row.iter().map(|l| format!("{l:^width$}")).collect();
        out.push_str(&line.join(" | "));
        out.push('\n');
    }
    out
}

pub fn render_best_states(states: &[Position], value: f64) -> String {
    let cells: Vec<String> = states.iter().map(ToString::to_string).collect();
    format!("States with the highest value: {}, Value: {value:.2}", cells.join(", "))
}

pub fn rows<T: Clone>(grid: &Array2<T>) -> Vec<Vec<T>> {
    grid.outer_iter().map(|row| row.to_vec()).collect()
}

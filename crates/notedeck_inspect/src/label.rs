use enostr::Note;
use serde::Deserialize;

const MAX_LABEL_CHARS: usize = 80;

#[derive(Deserialize)]
struct ProfileMetadata {
    display_name: Option<String>,
    name: Option<String>,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn truncate(line: &str) -> String {
    let mut chars = line.char_indices();
    match chars.nth(MAX_LABEL_CHARS) {
        Some((end, _)) => format!("{}...", &line[..end]),
        None => line.to_owned(),
    }
}

fn profile_label(note: &Note) -> String {
    match serde_json::from_str::<ProfileMetadata>(&note.content) {
        Ok(profile) => non_empty(profile.display_name)
            .or_else(|| non_empty(profile.name))
            .unwrap_or_else(|| "(unnamed profile)".to_owned()),
        Err(_) => "(unparseable metadata)".to_owned(),
    }
}

fn first_line(note: &Note) -> String {
    match note.content.lines().map(str::trim).find(|l| !l.is_empty()) {
        Some(line) => truncate(line),
        None => "(empty)".to_owned(),
    }
}

/// One line summary of a note for the text report.
pub fn label(note: &Note) -> String {
    match note.kind {
        0 => profile_label(note),
        3 => format!("follows {} accounts", note.tag_values("p").count()),
        5 => format!("deletes {} events", note.tag_values("e").count()),
        6 | 16 => match note.tag_values("e").next() {
            Some(target) => format!("repost of {}", short_id(target)),
            None => "repost".to_owned(),
        },
        7 => {
            let reaction = match note.content.trim() {
                "" | "+" => "like",
                "-" => "dislike",
                other => other,
            };
            match note.tag_values("e").last() {
                Some(target) => format!("{} on {}", truncate(reaction), short_id(target)),
                None => truncate(reaction),
            }
        }
        _ => first_line(note),
    }
}

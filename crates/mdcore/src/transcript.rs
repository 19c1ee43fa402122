use crate::fence::FenceTracker;

pub const ASSISTANT_HEADER: &str = "Assistant";
pub const USER_HEADER: &str = "User";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// A completed question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

fn header_role(line: &str) -> Option<Role> {
    match line.trim() {
        ASSISTANT_HEADER => Some(Role::Assistant),
        USER_HEADER => Some(Role::User),
        _ => None,
    }
}

/// Split a transcript into turns. Text before the first header belongs to
/// the user. Header lines inside fenced code blocks are treated as text.
pub fn parse(text: &str) -> Vec<Turn> {
    let mut turns: Vec<Turn> = Vec::new();
    let mut tracker = FenceTracker::new();
    let mut role = Role::User;
    let mut lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if !tracker.is_inside() {
            if let Some(next_role) = header_role(line) {
                push_turn(&mut turns, role, &lines);
                lines.clear();
                role = next_role;
                continue;
            }
        }
        tracker.feed(line);
        lines.push(line);
    }
    push_turn(&mut turns, role, &lines);

    turns
}

fn push_turn(turns: &mut Vec<Turn>, role: Role, lines: &[&str]) {
    let text = lines.join("\n").trim().to_string();
    if text.is_empty() {
        return;
    }

    match turns.last_mut() {
        Some(last) if last.role == role => {
            last.text.push_str("\n\n");
            last.text.push_str(&text);
        }
        _ => turns.push(Turn { role, text }),
    }
}

/// Text appended to the buffer when an answer arrives. The trailing user
/// header marks where the next question starts.
pub fn format_response(response: &str) -> String {
    format!(
        "\n\n{}\n{}\n\n{}\n",
        ASSISTANT_HEADER,
        response.trim(),
        USER_HEADER
    )
}

/// Completed exchanges plus the pending question, or `None` when the
/// transcript does not end with a user turn.
pub fn split_question(turns: &[Turn]) -> Option<(Vec<Exchange>, String)> {
    let (last, rest) = turns.split_last()?;
    if last.role != Role::User {
        return None;
    }

    let mut history = Vec::new();
    let mut pending: Option<&str> = None;
    for turn in rest {
        match turn.role {
            Role::User => pending = Some(&turn.text),
            Role::Assistant => {
                if let Some(question) = pending.take() {
                    history.push(Exchange {
                        question: question.to_string(),
                        answer: turn.text.clone(),
                    });
                }
            }
        }
    }

    Some((history, last.text.clone()))
}

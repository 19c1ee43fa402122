#[cfg(test)]
mod unit_tests {
    use super::super::*;

    const SESSION: &str = "How do I print in Rust?

Assistant
Use the macro:

```rust
fn main() {
    println!(\"hi\");
}
```

User
And in Python?
";

    #[test]
    fn test_session_turns_and_blocks_agree() {
        let turns = transcript::parse(SESSION);
        assert_eq!(turns.len(), 3);

        let answer = &turns[1];
        assert_eq!(answer.role, Role::Assistant);
        let blocks = code_blocks(&answer.text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language.as_deref(), Some("rust"));
        assert!(blocks[0].content.contains("println!"));
    }

    #[test]
    fn test_session_pending_question() {
        let turns = transcript::parse(SESSION);
        let (history, question) = split_question(&turns).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].question, "How do I print in Rust?");
        insta::assert_snapshot!(question, @"And in Python?");
    }

    #[test]
    fn test_appending_a_response_keeps_the_transcript_open() {
        let mut text = String::from("Ping");
        text.push_str(&format_response("Pong"));
        let turns = transcript::parse(&text);
        assert_eq!(turns.last().map(|t| t.role), Some(Role::Assistant));
        assert!(split_question(&turns).is_none());

        text.push_str("Again");
        let turns = transcript::parse(&text);
        assert_eq!(split_question(&turns).map(|(_, q)| q).as_deref(), Some("Again"));
    }

    #[test]
    fn test_first_language_of_session() {
        assert_eq!(first_language(SESSION).as_deref(), Some("rust"));
    }
}

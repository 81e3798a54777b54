/// One line typed at the chat prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatInput<'a> {
    Quit,
    /// `/key <api key>`; the key may be empty.
    SetKey(&'a str),
    Message(&'a str),
}

impl<'a> ChatInput<'a> {
    /// Commands are matched on the whole first word, so `/keyboard` is a
    /// message, not a key.
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        match command {
            "/quit" if rest.is_empty() => ChatInput::Quit,
            "/key" => ChatInput::SetKey(rest),
            _ => ChatInput::Message(line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_command() {
        assert_eq!(ChatInput::parse("/key sk-abc123"), ChatInput::SetKey("sk-abc123"));
        assert_eq!(ChatInput::parse("  /key\t sk-abc123  "), ChatInput::SetKey("sk-abc123"));
        assert_eq!(ChatInput::parse("/key"), ChatInput::SetKey(""));
    }

    #[test]
    fn test_command_prefix_is_a_message() {
        assert_eq!(ChatInput::parse("/keyboard"), ChatInput::Message("/keyboard"));
        assert_eq!(ChatInput::parse("/keys please"), ChatInput::Message("/keys please"));
        assert_eq!(ChatInput::parse("/quitting time"), ChatInput::Message("/quitting time"));
    }

    #[test]
    fn test_quit_and_plain_text() {
        assert_eq!(ChatInput::parse("/quit"), ChatInput::Quit);
        assert_eq!(ChatInput::parse(" hello there "), ChatInput::Message("hello there"));
        assert_eq!(ChatInput::parse(""), ChatInput::Message(""));
    }
}

//! Command parsing.
//!
//! Raw text is mapped to a `(CommandKind, remainder)` pair by an ordered
//! prefix table built from configuration. Matching is first-hit: kinds are
//! tried in declaration order, prefixes within a kind in list order, so a
//! prefix declared earlier shadows a longer one declared later. That
//! tie-break is deliberate and covered by tests.

use atelier_common::config::PrefixConfig;

/// The command vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Generate from a text prompt
    Imagine,
    /// Upscale or vary a finished task
    Up,
    /// Open an image-collecting generate workflow
    Pad,
    /// Open a blend workflow
    Blend,
    /// Open a describe workflow
    Describe,
    /// Close and submit the open workflow
    End,
    /// Fetch a task's status/result
    Fetch,
    /// Re-run a finished task
    Reroll,
    /// Report queue status
    Queue,
}

impl CommandKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Imagine => "imagine",
            Self::Up => "up",
            Self::Pad => "pad",
            Self::Blend => "blend",
            Self::Describe => "describe",
            Self::End => "end",
            Self::Fetch => "fetch",
            Self::Reroll => "reroll",
            Self::Queue => "queue",
        }
    }
}

/// A recognized command: its kind plus the trimmed text after the prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub kind: CommandKind,
    pub remainder: String,
}

/// Ordered prefix table driving [`CommandKind`] recognition.
#[derive(Debug, Clone)]
pub struct PrefixTable {
    groups: Vec<(CommandKind, Vec<String>)>,
}

impl PrefixTable {
    /// Build the table from configured prefix groups, preserving the
    /// config's declaration order.
    pub fn from_config(prefixes: &PrefixConfig) -> Self {
        let groups = vec![
            (CommandKind::Imagine, prefixes.imagine.clone()),
            (CommandKind::Up, prefixes.up.clone()),
            (CommandKind::Pad, prefixes.pad.clone()),
            (CommandKind::Blend, prefixes.blend.clone()),
            (CommandKind::Describe, prefixes.describe.clone()),
            (CommandKind::End, prefixes.end.clone()),
            (CommandKind::Fetch, prefixes.fetch.clone()),
            (CommandKind::Reroll, prefixes.reroll.clone()),
            (CommandKind::Queue, prefixes.queue.clone()),
        ];
        Self { groups }
    }

    /// Parse a message into a command, if it starts with a known prefix.
    ///
    /// Non-commands (anything not starting with `/`, or with no matching
    /// prefix) yield `None` and are ignored upstream.
    pub fn parse(&self, text: &str) -> Option<ParsedCommand> {
        let text = text.trim();
        if !text.starts_with('/') {
            return None;
        }

        for (kind, prefixes) in &self.groups {
            for prefix in prefixes {
                if let Some(rest) = text.strip_prefix(prefix.as_str()) {
                    return Some(ParsedCommand {
                        kind: *kind,
                        remainder: rest.trim().to_string(),
                    });
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PrefixTable {
        PrefixTable::from_config(&PrefixConfig::default())
    }

    #[test]
    fn test_parse_basic_commands() {
        let t = table();
        assert_eq!(
            t.parse("/i a red fox"),
            Some(ParsedCommand {
                kind: CommandKind::Imagine,
                remainder: "a red fox".into(),
            })
        );
        assert_eq!(
            t.parse("/mj castle at dusk").map(|c| c.kind),
            Some(CommandKind::Imagine)
        );
        assert_eq!(t.parse("/e").map(|c| c.kind), Some(CommandKind::End));
        assert_eq!(t.parse("/e").unwrap().remainder, "");
    }

    #[test]
    fn test_parse_requires_leading_slash() {
        let t = table();
        assert_eq!(t.parse("hello there"), None);
        assert_eq!(t.parse("i a red fox"), None);
        assert_eq!(t.parse(""), None);
    }

    #[test]
    fn test_parse_unknown_prefix() {
        let t = table();
        assert_eq!(t.parse("/zzz nothing"), None);
    }

    #[test]
    fn test_parse_trims_remainder() {
        let t = table();
        let cmd = t.parse("/u   1234  ").unwrap();
        assert_eq!(cmd.kind, CommandKind::Up);
        assert_eq!(cmd.remainder, "1234");
    }

    #[test]
    fn test_first_declared_kind_wins_over_longest_match() {
        // "/i" (imagine) is declared before any longer overlapping prefix,
        // so "/in cat" resolves to imagine with remainder "n cat".
        let mut prefixes = PrefixConfig::default();
        prefixes.fetch = vec!["/in".into()];
        let t = PrefixTable::from_config(&prefixes);

        let cmd = t.parse("/in cat").unwrap();
        assert_eq!(cmd.kind, CommandKind::Imagine);
        assert_eq!(cmd.remainder, "n cat");
    }

    #[test]
    fn test_prefix_list_order_within_kind() {
        let mut prefixes = PrefixConfig::default();
        prefixes.imagine = vec!["/imagine".into(), "/i".into()];
        let t = PrefixTable::from_config(&prefixes);

        let cmd = t.parse("/imagine a boat").unwrap();
        assert_eq!(cmd.remainder, "a boat");
    }
}

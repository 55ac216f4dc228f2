//! Collection-wide counts and recurring themes for dashboards and
//! `kb stats`.

use serde::Serialize;

use crate::models::Conversation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub platform: String,
    pub conversations: usize,
    pub messages: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_conversations: usize,
    pub total_messages: usize,
    /// In order of first appearance.
    pub platforms: Vec<PlatformStats>,
    /// Rounded to the nearest integer; 0 for an empty collection.
    pub average_messages_per_conversation: u64,
}

pub fn summarize(conversations: &[Conversation]) -> Analytics {
    let mut platforms: Vec<PlatformStats> = Vec::new();
    let mut total_messages = 0;

    for conv in conversations {
        total_messages += conv.messages.len();
        let name = conv.platform.as_str();
        match platforms.iter_mut().find(|p| p.platform == name) {
            Some(p) => {
                p.conversations += 1;
                p.messages += conv.messages.len();
            }
            None => platforms.push(PlatformStats {
                platform: name.to_string(),
                conversations: 1,
                messages: conv.messages.len(),
            }),
        }
    }

    let average = if conversations.is_empty() {
        0
    } else {
        (total_messages as f64 / conversations.len() as f64).round() as u64
    };

    Analytics {
        total_conversations: conversations.len(),
        total_messages,
        platforms,
        average_messages_per_conversation: average,
    }
}

/// Keywords tracked by [`detect_themes`]. Matching is a case-insensitive
/// substring test, so `ai` also hits words that merely contain it.
pub const THEME_KEYWORDS: [&str; 13] = [
    "consciousness",
    "collaboration",
    "ai",
    "pattern",
    "recognition",
    "memory",
    "growth",
    "rivalry",
    "competition",
    "cooperation",
    "neural",
    "learning",
    "intelligence",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub theme: String,
    pub description: String,
    /// Messages mentioning the keyword.
    pub frequency: usize,
}

/// Counts the messages mentioning each [`THEME_KEYWORDS`] entry.
///
/// Keywords with no hits are left out. The result is sorted by frequency,
/// highest first; ties keep the order in which keywords were first seen.
pub fn detect_themes(conversations: &[Conversation]) -> Vec<Theme> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for msg in conversations.iter().flat_map(|c| &c.messages) {
        let content = msg.content.to_lowercase();
        for keyword in THEME_KEYWORDS {
            if !content.contains(keyword) {
                continue;
            }
            match counts.iter_mut().find(|(k, _)| *k == keyword) {
                Some((_, n)) => *n += 1,
                None => counts.push((keyword, 1)),
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    counts
        .into_iter()
        .map(|(keyword, frequency)| Theme {
            theme: keyword.to_string(),
            description: format!("Discussions about \"{}\"", keyword),
            frequency,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Message, Platform, Role};
    use chrono::Utc;
    use serde_json::Map;
    use pretty_assertions::assert_eq;

    fn conv(id: &str, platform: Platform, n: usize) -> Conversation {
        with_texts(id, platform, &vec!["x"; n])
    }

    fn with_texts(id: &str, platform: Platform, texts: &[&str]) -> Conversation {
        let now = Utc::now();
        let messages = texts
            .iter()
            .enumerate()
            .map(|(i, text)| Message {
                id: format!("{}_{}", id, i),
                timestamp: now,
                role: Role::Human,
                content: text.to_string(),
                platform: platform.clone(),
                metadata: Map::new(),
            })
            .collect();
        Conversation::from_messages(id.into(), id.into(), platform, messages, Map::new(), now)
    }

    #[test]
    fn empty_collection() {
        let a = summarize(&[]);
        assert_eq!(a.total_conversations, 0);
        assert_eq!(a.average_messages_per_conversation, 0);
        assert!(a.platforms.is_empty());
    }

    #[test]
    fn groups_by_platform_and_rounds_average() {
        let convs = vec![
            conv("a", Platform::ChatGpt, 2),
            conv("b", Platform::Claude, 1),
            conv("c", Platform::ChatGpt, 2),
        ];
        let a = summarize(&convs);
        assert_eq!(a.total_conversations, 3);
        assert_eq!(a.total_messages, 5);
        // 5 / 3 = 1.67
        assert_eq!(a.average_messages_per_conversation, 2);
        assert_eq!(
            a.platforms,
            vec![
                PlatformStats {
                    platform: "ChatGPT".into(),
                    conversations: 2,
                    messages: 4
                },
                PlatformStats {
                    platform: "Claude".into(),
                    conversations: 1,
                    messages: 1
                },
            ]
        );
    }

    #[test]
    fn themes_sorted_by_frequency() {
        let convs = vec![
            with_texts(
                "a",
                Platform::ChatGpt,
                &["Memory and growth", "NEURAL nets need memory", "lunch?"],
            ),
            with_texts("b", Platform::Claude, &["Working memory limits", "growth plans"]),
        ];
        let themes = detect_themes(&convs);
        let got: Vec<(&str, usize)> = themes
            .iter()
            .map(|t| (t.theme.as_str(), t.frequency))
            .collect();
        assert_eq!(got, vec![("memory", 3), ("growth", 2), ("neural", 1)]);
        assert_eq!(themes[0].description, "Discussions about \"memory\"");
    }

    #[test]
    fn no_keywords_no_themes() {
        let convs = vec![with_texts("a", Platform::Imported, &["hello there"])];
        assert!(detect_themes(&convs).is_empty());
        assert!(detect_themes(&[]).is_empty());
    }
}

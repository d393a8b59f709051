//! Discord REST payloads.
use serde::{Deserialize, Serialize};

use crate::format::{Embed, OutboundMessage};

pub const CHANNEL_TYPE_GUILD_TEXT: u8 = 0;
pub const CHANNEL_TYPE_GUILD_ANNOUNCEMENT: u8 = 5;

#[derive(Debug, Serialize, Default)]
pub struct CreateMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<WireEmbed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_reference: Option<MessageReference>,
    pub allowed_mentions: AllowedMentions,
}

impl CreateMessage {
    /// Header plus embed; role mentions in the header notify their members.
    pub fn rich(message: &OutboundMessage) -> Self {
        Self {
            content: Some(message.header.clone()),
            embeds: vec![WireEmbed::from(&message.embed)],
            message_reference: None,
            allowed_mentions: AllowedMentions::roles(),
        }
    }

    pub fn text(text: &str) -> Self {
        Self {
            content: Some(text.to_string()),
            allowed_mentions: AllowedMentions::none(),
            ..Default::default()
        }
    }

    pub fn reply(reply_to: &str, text: &str) -> Self {
        Self {
            message_reference: Some(MessageReference {
                message_id: reply_to.to_string(),
                fail_if_not_exists: false,
            }),
            ..Self::text(text)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EditMessage {
    pub content: String,
    pub embeds: Vec<WireEmbed>,
    pub allowed_mentions: AllowedMentions,
}

impl From<&OutboundMessage> for EditMessage {
    fn from(message: &OutboundMessage) -> Self {
        Self {
            content: message.header.clone(),
            embeds: vec![WireEmbed::from(&message.embed)],
            allowed_mentions: AllowedMentions::roles(),
        }
    }
}

#[derive(Debug, Serialize, Default)]
pub struct AllowedMentions {
    pub parse: Vec<&'static str>,
}

impl AllowedMentions {
    pub fn roles() -> Self {
        Self {
            parse: vec!["roles"],
        }
    }

    pub fn none() -> Self {
        Self { parse: Vec::new() }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageReference {
    pub message_id: String,
    pub fail_if_not_exists: bool,
}

#[derive(Debug, Serialize)]
pub struct WireEmbed {
    pub title: String,
    pub description: String,
    pub color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<WireAuthor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<WireField>,
    pub footer: WireFooter,
}

impl From<&Embed> for WireEmbed {
    fn from(embed: &Embed) -> Self {
        Self {
            title: embed.title.clone(),
            description: embed.description.clone(),
            color: embed.color,
            author: embed.author.as_ref().map(|name| WireAuthor { name: name.clone() }),
            fields: embed
                .fields
                .iter()
                .map(|f| WireField {
                    name: f.name.clone(),
                    value: f.value.clone(),
                    inline: false,
                })
                .collect(),
            footer: WireFooter {
                text: embed.footer.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WireAuthor {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct WireField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Serialize)]
pub struct WireFooter {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageResp {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ChannelResp {
    pub id: String,
    #[serde(rename = "type")]
    pub typ: u8,
}

#[derive(Debug, Deserialize)]
pub struct RoleResp {
    pub id: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::EmbedField;
    use serde_json::json;

    fn message() -> OutboundMessage {
        OutboundMessage {
            header: "**Nowe ogłoszenie w Librusie**\n<@&42>".into(),
            embed: Embed {
                color: 0xD3A5FF,
                author: Some("Anna Nowak".into()),
                title: "**__Plan__**".into(),
                description: "**3b**".into(),
                fields: vec![EmbedField {
                    name: "Od:".into(),
                    value: "2024-03-04".into(),
                }],
                footer: "Dodano: 2024-03-01".into(),
            },
        }
    }

    #[test]
    fn rich_message_payload() {
        let body = serde_json::to_value(CreateMessage::rich(&message())).unwrap();
        assert_eq!(body["content"], "**Nowe ogłoszenie w Librusie**\n<@&42>");
        assert_eq!(body["embeds"][0]["color"], 0xD3A5FF);
        assert_eq!(body["embeds"][0]["author"]["name"], "Anna Nowak");
        assert_eq!(body["embeds"][0]["fields"][0]["name"], "Od:");
        assert_eq!(body["embeds"][0]["footer"]["text"], "Dodano: 2024-03-01");
        assert_eq!(body["allowed_mentions"], json!({ "parse": ["roles"] }));
        assert!(body.get("message_reference").is_none());
    }

    #[test]
    fn reply_payload() {
        let body = serde_json::to_value(CreateMessage::reply("m1", "Zmieniono ogłoszenie ^")).unwrap();
        assert_eq!(body["content"], "Zmieniono ogłoszenie ^");
        assert_eq!(
            body["message_reference"],
            json!({ "message_id": "m1", "fail_if_not_exists": false })
        );
        assert!(body.get("embeds").is_none());
        assert_eq!(body["allowed_mentions"], json!({ "parse": [] }));
    }

    #[test]
    fn edit_payload_replaces_embeds() {
        let body = serde_json::to_value(EditMessage::from(&message())).unwrap();
        assert_eq!(body["embeds"].as_array().unwrap().len(), 1);
        assert_eq!(body["content"], "**Nowe ogłoszenie w Librusie**\n<@&42>");
    }
}

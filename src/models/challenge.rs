use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use super::validation::{ValidationError, Validator};
use crate::views::CardBody;

/// One persisted achievement type, stored in its own table
pub trait ChallengeRecord:
    Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Form payload submitted on create and update
    type Fields: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static;

    const TABLE: &'static str;
    /// Singular noun used in notices ("Machine added successfully")
    const NOUN: &'static str;

    fn id(&self) -> &str;
    fn validate(fields: &Self::Fields) -> Result<(), ValidationError>;
    /// Seeds the edit form from an existing record
    fn to_fields(&self) -> Self::Fields;
    fn card(&self) -> CardBody;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[serde(alias = "tryhackme")]
    Rooms,
    #[serde(alias = "hackthebox")]
    Machines,
    Ctf,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Rooms, Category::Machines, Category::Ctf];

    pub fn slug(&self) -> &'static str {
        match self {
            Category::Rooms => "rooms",
            Category::Machines => "machines",
            Category::Ctf => "ctf",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Category::Rooms => TryHackMeRoom::TABLE,
            Category::Machines => HackTheBoxMachine::TABLE,
            Category::Ctf => CtfChallenge::TABLE,
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "rooms" | "tryhackme" => Some(Category::Rooms),
            "machines" | "hackthebox" => Some(Category::Machines),
            "ctf" => Some(Category::Ctf),
            _ => None,
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::from_slug(s).ok_or_else(|| format!("unknown category '{}' (rooms, machines, ctf)", s))
    }
}

// ---------------------------------------------------------------------------
// TryHackMe rooms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Insane,
}

impl Difficulty {
    pub fn badge_color(&self) -> &'static str {
        match self {
            Difficulty::Easy => "bg-green-500",
            Difficulty::Medium => "bg-yellow-500",
            Difficulty::Hard => "bg-red-500",
            Difficulty::Insane => "bg-purple-500",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::Insane => "Insane",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryHackMeRoom {
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    pub difficulty: Difficulty,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
    #[serde(default)]
    pub completion_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomFields {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<String>,
}

impl ChallengeRecord for TryHackMeRoom {
    type Fields = RoomFields;

    const TABLE: &'static str = "tryhackme_rooms";
    const NOUN: &'static str = "Room";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(fields: &RoomFields) -> Result<(), ValidationError> {
        Validator::new()
            .require_text("title", &fields.title)
            .require_text("description", &fields.description)
            .require("difficulty", fields.difficulty.as_ref())
            .url("url", &fields.url)
            .finish()
    }

    fn to_fields(&self) -> RoomFields {
        RoomFields {
            title: self.title.clone(),
            description: self.description.clone(),
            difficulty: Some(self.difficulty),
            url: self.url.clone(),
            completion_date: self.completion_date.clone(),
        }
    }

    fn card(&self) -> CardBody {
        CardBody {
            title: self.title.clone(),
            description: self.description.clone(),
            badge: Some(self.difficulty.as_str().to_string()),
            badge_color: self.difficulty.badge_color().to_string(),
            details: Vec::new(),
            url: non_empty(&self.url),
        }
    }
}

// ---------------------------------------------------------------------------
// Hack The Box machines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OsType {
    Linux,
    Windows,
    Other,
}

impl OsType {
    pub fn badge_color(&self) -> &'static str {
        match self {
            OsType::Linux => "bg-blue-500",
            OsType::Windows => "bg-purple-500",
            OsType::Other => "bg-gray-500",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OsType::Linux => "Linux",
            OsType::Windows => "Windows",
            OsType::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HackTheBoxMachine {
    pub id: String,
    pub machine_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    pub os_type: OsType,
    pub points: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
    #[serde(default)]
    pub completion_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineFields {
    #[serde(default)]
    pub machine_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub os_type: Option<OsType>,
    #[serde(default)]
    pub points: Option<i64>,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<String>,
}

impl ChallengeRecord for HackTheBoxMachine {
    type Fields = MachineFields;

    const TABLE: &'static str = "hackthebox_machines";
    const NOUN: &'static str = "Machine";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(fields: &MachineFields) -> Result<(), ValidationError> {
        Validator::new()
            .require_text("machine_name", &fields.machine_name)
            .require("os_type", fields.os_type.as_ref())
            .at_least("points", fields.points, 1)
            .url("url", &fields.url)
            .finish()
    }

    fn to_fields(&self) -> MachineFields {
        MachineFields {
            machine_name: self.machine_name.clone(),
            description: self.description.clone(),
            os_type: Some(self.os_type),
            points: Some(self.points),
            url: self.url.clone(),
            completion_date: self.completion_date.clone(),
        }
    }

    fn card(&self) -> CardBody {
        CardBody {
            title: self.machine_name.clone(),
            description: self.description.clone(),
            badge: Some(self.os_type.as_str().to_string()),
            badge_color: self.os_type.badge_color().to_string(),
            details: vec![self.os_type.as_str().to_string(), format!("{} pts", self.points)],
            url: non_empty(&self.url),
        }
    }
}

// ---------------------------------------------------------------------------
// CTF challenges
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CtfChallenge {
    pub id: String,
    pub event_name: String,
    pub challenge_title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub category: String,
    pub my_ranking: i64,
    #[serde(default)]
    pub completion_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CtfFields {
    #[serde(default)]
    pub event_name: String,
    #[serde(default)]
    pub challenge_title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub my_ranking: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<String>,
}

/// Podium, top ten, top fifty, everything else
fn ranking_color(ranking: i64) -> &'static str {
    match ranking {
        r if r <= 3 => "bg-yellow-500",
        r if r <= 10 => "bg-gray-400",
        r if r <= 50 => "bg-orange-600",
        _ => "bg-gray-600",
    }
}

impl ChallengeRecord for CtfChallenge {
    type Fields = CtfFields;

    const TABLE: &'static str = "ctf_challenges";
    const NOUN: &'static str = "Challenge";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(fields: &CtfFields) -> Result<(), ValidationError> {
        Validator::new()
            .require_text("event_name", &fields.event_name)
            .require_text("challenge_title", &fields.challenge_title)
            .require_text("category", &fields.category)
            .at_least("my_ranking", fields.my_ranking, 1)
            .finish()
    }

    fn to_fields(&self) -> CtfFields {
        CtfFields {
            event_name: self.event_name.clone(),
            challenge_title: self.challenge_title.clone(),
            category: self.category.clone(),
            my_ranking: Some(self.my_ranking),
            completion_date: self.completion_date.clone(),
        }
    }

    fn card(&self) -> CardBody {
        CardBody {
            title: self.challenge_title.clone(),
            description: format!("{} - {}", self.event_name, self.category),
            badge: Some(format!("#{}", self.my_ranking)),
            badge_color: ranking_color(self.my_ranking).to_string(),
            details: vec![format!("Rank #{}", self.my_ranking)],
            url: None,
        }
    }
}

/// Nullable text columns read as empty
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_empty(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn machine_row_decodes_from_store_shape() {
        let row = json!({
            "id": "3f2c",
            "machine_name": "Lame",
            "description": "SMB",
            "os_type": "Linux",
            "points": 20,
            "url": "https://x",
            "completion_date": "2024-03-01",
            "created_at": "2024-03-01T10:00:00.123456+00:00"
        });
        let machine: HackTheBoxMachine = serde_json::from_value(row).unwrap();
        assert_eq!(machine.os_type, OsType::Linux);
        assert_eq!(machine.card().details, vec!["Linux".to_string(), "20 pts".to_string()]);
    }

    #[test]
    fn null_text_columns_decode_as_empty() {
        let row = json!({
            "id": "c2",
            "event_name": "PicoCTF",
            "challenge_title": "Flag Hunters",
            "category": null,
            "my_ranking": 4
        });
        let challenge: CtfChallenge = serde_json::from_value(row).unwrap();
        assert_eq!(challenge.category, "");
    }

    #[test]
    fn machine_points_below_one_rejected() {
        let fields = MachineFields {
            machine_name: "Lame".into(),
            os_type: Some(OsType::Linux),
            points: Some(0),
            url: "https://x".into(),
            ..Default::default()
        };
        let err = HackTheBoxMachine::validate(&fields).unwrap_err();
        assert!(err.field_errors.contains_key("points"));
    }

    #[test]
    fn ctf_card_joins_event_and_category() {
        let challenge = CtfChallenge {
            id: "c1".into(),
            event_name: "PicoCTF".into(),
            challenge_title: "Buffer Overflow 1".into(),
            category: "pwn".into(),
            my_ranking: 7,
            completion_date: None,
            created_at: None,
        };
        let card = challenge.card();
        assert_eq!(card.description, "PicoCTF - pwn");
        assert_eq!(card.badge.as_deref(), Some("#7"));
        assert_eq!(card.badge_color, "bg-gray-400");
        assert!(card.url.is_none());
    }

    #[test]
    fn ranking_colors_follow_tiers() {
        assert_eq!(ranking_color(1), "bg-yellow-500");
        assert_eq!(ranking_color(50), "bg-orange-600");
        assert_eq!(ranking_color(51), "bg-gray-600");
    }

    #[test]
    fn room_requires_difficulty() {
        let fields = RoomFields {
            title: "Blue".into(),
            description: "EternalBlue".into(),
            difficulty: None,
            url: "https://tryhackme.com/room/blue".into(),
            completion_date: None,
        };
        let err = TryHackMeRoom::validate(&fields).unwrap_err();
        assert_eq!(err.field_errors.keys().collect::<Vec<_>>(), vec!["difficulty"]);
    }

    #[test]
    fn category_slugs_round_trip_through_from_str() {
        for category in Category::ALL {
            assert_eq!(category.slug().parse::<Category>().unwrap(), category);
        }
        assert_eq!("hackthebox".parse::<Category>().unwrap(), Category::Machines);
        assert!("blogs".parse::<Category>().is_err());
    }
}

//! Combat participants and the host-boundary input types they are built from.
//!
//! A participant is one initiative entry in the tracker. It references a scene
//! token but does not own it; the token can disappear while the participant
//! still exists (see `CombatState::reconcile_token_removal`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display name used when a token has no name of its own.
pub const FALLBACK_NAME: &str = "Unknown";

/// Where a participant is in the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParticipantStatus {
    /// Has not acted this round
    #[default]
    Pending,
    /// Taking their turn right now
    Active,
    /// Already acted this round
    Acted,
    /// Gave up their turn via the wait/swap mechanic
    Waited,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Acted => "acted",
            Self::Waited => "waited",
        }
    }
}

/// Who may take turns for a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Controller {
    /// GM-controlled (NPCs, monsters)
    Gm,
    /// Controlled by the player with this ID
    Player(String),
}

impl Controller {
    pub fn is_gm(&self) -> bool {
        matches!(self, Self::Gm)
    }

    /// Get the controlling player's ID, if player-controlled.
    pub fn player_id(&self) -> Option<&str> {
        match self {
            Self::Player(id) => Some(id),
            Self::Gm => None,
        }
    }
}

/// Token metadata as supplied by the host's scene lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    /// Opaque token reference
    pub token_id: String,

    /// The token's own display name (may be empty)
    pub display_name: String,

    /// Identifier of whoever created the token, if known
    pub creator_id: Option<String>,
}

impl TokenInfo {
    pub fn new(token_id: String, display_name: String, creator_id: Option<String>) -> Self {
        Self {
            token_id,
            display_name,
            creator_id,
        }
    }
}

/// A player in the room roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterPlayer {
    /// Host-assigned player identifier
    pub player_id: String,

    /// Current display name
    pub display_name: String,
}

impl RosterPlayer {
    pub fn new(player_id: String, display_name: String) -> Self {
        Self {
            player_id,
            display_name,
        }
    }
}

/// One initiative entry in the combat tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Stable identity, independent of the backing token
    pub id: Uuid,

    /// Reference to the scene token this entry was created from
    pub token_id: String,

    /// Display name derived at creation time
    pub name: String,

    /// GM override; takes precedence over `name` when non-empty
    pub custom_name: Option<String>,

    /// Initiative card held this round, 1..=10, `None` until drawn
    pub initiative_card: Option<u8>,

    /// Turn status within the current round
    pub status: ParticipantStatus,

    /// Who takes turns for this entry
    pub controlled_by: Controller,
}

impl Participant {
    /// Build a participant from a selected token.
    ///
    /// A token created by a roster player becomes player-controlled and takes
    /// that player's display name; anything else is GM-controlled and keeps
    /// the token's own name (or [`FALLBACK_NAME`] when the token is unnamed).
    pub fn from_token(token: &TokenInfo, roster: &[RosterPlayer]) -> Self {
        let creator = token
            .creator_id
            .as_deref()
            .and_then(|cid| roster.iter().find(|p| p.player_id == cid));

        let mut name = if token.display_name.is_empty() {
            FALLBACK_NAME.to_string()
        } else {
            token.display_name.clone()
        };

        let controlled_by = match creator {
            Some(player) => {
                if !player.display_name.is_empty() {
                    name = player.display_name.clone();
                }
                Controller::Player(player.player_id.clone())
            }
            None => Controller::Gm,
        };

        Self {
            id: Uuid::new_v4(),
            token_id: token.token_id.clone(),
            name,
            custom_name: None,
            initiative_card: None,
            status: ParticipantStatus::Pending,
            controlled_by,
        }
    }

    /// Clone this entry into a fresh participant against the same token,
    /// with no card and a pending status. Used for ferocity (one token,
    /// several initiative entries).
    pub fn ferocity_clone(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            token_id: self.token_id.clone(),
            name: self.name.clone(),
            custom_name: self.custom_name.clone(),
            initiative_card: None,
            status: ParticipantStatus::Pending,
            controlled_by: self.controlled_by.clone(),
        }
    }

    /// Name to show in the tracker: the custom name when set and non-empty,
    /// otherwise the derived name.
    pub fn display_name(&self) -> &str {
        match &self.custom_name {
            Some(custom) if !custom.is_empty() => custom,
            _ => &self.name,
        }
    }

    /// Set or clear the GM name override. Whitespace-only input clears it.
    pub fn set_custom_name(&mut self, raw: &str) {
        let trimmed = raw.trim();
        self.custom_name = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }

    /// Check whether this participant holds an initiative card.
    pub fn has_card(&self) -> bool {
        self.initiative_card.is_some()
    }
}

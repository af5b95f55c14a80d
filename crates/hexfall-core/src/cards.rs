//! Development card catalog and deck.
//!
//! The catalog is an id-ordered list of card records loaded from JSON. The
//! deck expands it by each record's count and hands cards out without
//! replacement.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

/// Catalog shipped with the crate
const DEFAULT_CATALOG: &str = include_str!("../data/development_cards.json");

/// Kinds of development card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DevelopmentCardKind {
    /// Placeholder handed out when nothing else is available
    None,
    Knight,
    RoadBuilding,
    Development,
    Monopoly,
    Points,
}

impl DevelopmentCardKind {
    /// Points cards score when drawn and are never played
    pub fn is_playable(self) -> bool {
        !matches!(self, DevelopmentCardKind::None | DevelopmentCardKind::Points)
    }
}

/// One catalog record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    pub id: u32,
    pub kind: DevelopmentCardKind,
    pub name: String,
    pub description: String,
    pub action_description: String,
    /// Copies of this card in a fresh deck
    #[serde(default)]
    pub count: u32,
}

impl CardDetails {
    fn none() -> Self {
        Self {
            id: u32::MAX,
            kind: DevelopmentCardKind::None,
            name: "None".to_string(),
            description: String::new(),
            action_description: String::new(),
            count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("card catalog mismatch: {0}")]
    ConfigurationMismatch(String),
}

/// Id-ordered card records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardCatalog {
    cards: Vec<CardDetails>,
    #[serde(skip, default = "CardDetails::none")]
    none: CardDetails,
}

impl CardCatalog {
    /// The catalog embedded in the crate
    pub fn standard() -> Result<Self, CatalogError> {
        Self::from_json_str(DEFAULT_CATALOG)
    }

    /// Parse and validate a catalog: ids must run 0, 1, 2, ... in order
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let cards: Vec<CardDetails> = serde_json::from_str(json).map_err(|e| {
            error!(error = %e, "malformed card catalog");
            CatalogError::ConfigurationMismatch(e.to_string())
        })?;

        if cards.is_empty() {
            return Err(CatalogError::ConfigurationMismatch("catalog is empty".to_string()));
        }
        for (expected, card) in cards.iter().enumerate() {
            if card.id as usize != expected {
                error!(expected, found = card.id, "card catalog out of order");
                return Err(CatalogError::ConfigurationMismatch(format!(
                    "expected card id {expected}, found {}",
                    card.id
                )));
            }
            if card.kind == DevelopmentCardKind::None {
                return Err(CatalogError::ConfigurationMismatch(format!(
                    "card {} has no kind",
                    card.id
                )));
            }
        }

        Ok(Self {
            cards,
            none: CardDetails::none(),
        })
    }

    pub fn cards(&self) -> &[CardDetails] {
        &self.cards
    }

    /// Record at `index`; out of range is logged and answered with the NONE card
    pub fn details(&self, index: usize) -> &CardDetails {
        match self.cards.get(index) {
            Some(card) => card,
            None => {
                error!(index, len = self.cards.len(), "card index out of range");
                &self.none
            }
        }
    }

    /// First record of a kind, or the NONE card
    pub fn details_for(&self, kind: DevelopmentCardKind) -> &CardDetails {
        self.cards.iter().find(|c| c.kind == kind).unwrap_or(&self.none)
    }

    /// Every card of a fresh deck, in catalog order
    pub fn deck_contents(&self) -> Vec<DevelopmentCardKind> {
        self.cards
            .iter()
            .flat_map(|card| std::iter::repeat(card.kind).take(card.count as usize))
            .collect()
    }
}

/// Cards not yet drawn
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevelopmentDeck {
    cards: Vec<DevelopmentCardKind>,
}

impl DevelopmentDeck {
    pub fn from_catalog<R: Rng>(catalog: &CardCatalog, rng: &mut R) -> Self {
        let mut cards = catalog.deck_contents();
        cards.shuffle(rng);
        Self { cards }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Take a random card out of the deck. An empty deck yields the NONE card.
    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> DevelopmentCardKind {
        if self.cards.is_empty() {
            warn!("development deck is empty");
            return DevelopmentCardKind::None;
        }
        let index = rng.gen_range(0..self.cards.len());
        self.cards.swap_remove(index)
    }
}

use super::enums::{Ammunition, Charging, Cohesion, Stacking, Tiredness};
use crate::core::{EntityId, Version};

/// Unit state recorded by every action except the next-turn marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementState {
    /// Weak reference to the acting unit's name.
    pub unit: String,
    pub cohesion: Cohesion,
    pub tiredness: Tiredness,
    pub ammunition: Ammunition,
    pub charging: Charging,
    pub engaging: bool,
    pub order_given: bool,
    pub played: bool,
}

/// Destination of a translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexTarget {
    pub hex_col: i32,
    pub hex_row: i32,
    /// Only present for units spanning two hexes.
    pub hex_angle: Option<i32>,
    pub stacking: Stacking,
}

/// One entry of the action log, one payload shape per tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceAction {
    State(ElementState),
    Move {
        state: ElementState,
        target: HexTarget,
    },
    Rotate {
        state: ElementState,
        angle: i32,
    },
    Reorient {
        state: ElementState,
        angle: i32,
    },
    /// Combined translate and face.
    Turn {
        state: ElementState,
        target: HexTarget,
        angle: i32,
    },
    NextTurn,
}

impl SequenceAction {
    pub const TAGS: [&'static str; 6] = ["State", "Move", "Rotate", "Reorient", "Turn", "NextTurn"];

    pub fn tag(&self) -> &'static str {
        match self {
            Self::State(_) => "State",
            Self::Move { .. } => "Move",
            Self::Rotate { .. } => "Rotate",
            Self::Reorient { .. } => "Reorient",
            Self::Turn { .. } => "Turn",
            Self::NextTurn => "NextTurn",
        }
    }

    pub fn state(&self) -> Option<&ElementState> {
        match self {
            Self::State(state)
            | Self::Move { state, .. }
            | Self::Rotate { state, .. }
            | Self::Reorient { state, .. }
            | Self::Turn { state, .. } => Some(state),
            Self::NextTurn => None,
        }
    }

    pub fn unit(&self) -> Option<&str> {
        self.state().map(|state| state.unit.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceElement {
    pub id: EntityId,
    pub version: Version,
    pub action: SequenceAction,
}

impl SequenceElement {
    pub fn new(action: SequenceAction) -> Self {
        Self {
            id: EntityId::Unassigned,
            version: 0,
            action,
        }
    }
}

/// The action log of one turn of one game. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub id: EntityId,
    pub version: Version,
    /// Id of the game this log belongs to.
    pub game: u64,
    /// Turn counter; unique per game.
    pub count: u32,
    pub elements: Vec<SequenceElement>,
}

impl Sequence {
    pub fn key(&self) -> (u64, u32) {
        (self.game, self.count)
    }

    /// Names of the units acted upon, in log order, without repeats.
    pub fn acting_units(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for element in &self.elements {
            if let Some(unit) = element.action.unit() {
                if !names.contains(&unit) {
                    names.push(unit);
                }
            }
        }
        names
    }
}

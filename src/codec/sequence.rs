//! Action-log codec.
//!
//! Elements are tagged by `type`. Each tag selects exactly one payload
//! shape; a tag outside the closed set is rejected before any other field
//! is read.

use super::tables::CodeTable;
use super::{WireCodec, WireObject, stamped};
use crate::core::{Result, SyncError};
use crate::model::{ElementState, HexTarget, Sequence, SequenceAction, SequenceElement};
use serde_json::{Map, Value as JsonValue};

fn read_state(obj: &WireObject<'_>) -> Result<ElementState> {
    Ok(ElementState {
        unit: obj.str("unit")?.to_string(),
        cohesion: obj.code()?,
        tiredness: obj.code()?,
        ammunition: obj.code()?,
        charging: obj.code()?,
        engaging: obj.bool_or("engaging", false)?,
        order_given: obj.bool_or("orderGiven", false)?,
        played: obj.bool_or("played", false)?,
    })
}

fn write_state(state: &ElementState, obj: &mut Map<String, JsonValue>) {
    obj.insert("unit".into(), state.unit.clone().into());
    obj.insert("cohesion".into(), state.cohesion.code().into());
    obj.insert("tiredness".into(), state.tiredness.code().into());
    obj.insert("ammunition".into(), state.ammunition.code().into());
    obj.insert("charging".into(), state.charging.code().into());
    obj.insert("engaging".into(), state.engaging.into());
    obj.insert("orderGiven".into(), state.order_given.into());
    obj.insert("played".into(), state.played.into());
}

fn read_target(obj: &WireObject<'_>) -> Result<HexTarget> {
    Ok(HexTarget {
        hex_col: obj.i32("hexCol")?,
        hex_row: obj.i32("hexRow")?,
        hex_angle: obj.opt_i32("hexAngle")?,
        stacking: obj.code()?,
    })
}

fn write_target(target: &HexTarget, obj: &mut Map<String, JsonValue>) {
    obj.insert("hexCol".into(), target.hex_col.into());
    obj.insert("hexRow".into(), target.hex_row.into());
    if let Some(angle) = target.hex_angle {
        obj.insert("hexAngle".into(), angle.into());
    }
    obj.insert("stacking".into(), target.stacking.code().into());
}

fn read_action(obj: &WireObject<'_>) -> Result<SequenceAction> {
    let action = match obj.str("type")? {
        "State" => SequenceAction::State(read_state(obj)?),
        "Move" => SequenceAction::Move {
            state: read_state(obj)?,
            target: read_target(obj)?,
        },
        "Rotate" => SequenceAction::Rotate {
            state: read_state(obj)?,
            angle: obj.i32("angle")?,
        },
        "Reorient" => SequenceAction::Reorient {
            state: read_state(obj)?,
            angle: obj.i32("angle")?,
        },
        "Turn" => SequenceAction::Turn {
            state: read_state(obj)?,
            target: read_target(obj)?,
            angle: obj.i32("angle")?,
        },
        "NextTurn" => SequenceAction::NextTurn,
        other => return Err(SyncError::UnknownVariantTag(other.to_string())),
    };
    Ok(action)
}

fn write_action(action: &SequenceAction, obj: &mut Map<String, JsonValue>) {
    obj.insert("type".into(), action.tag().into());
    match action {
        SequenceAction::State(state) => write_state(state, obj),
        SequenceAction::Move { state, target } => {
            write_state(state, obj);
            write_target(target, obj);
        }
        SequenceAction::Rotate { state, angle } | SequenceAction::Reorient { state, angle } => {
            write_state(state, obj);
            obj.insert("angle".into(), (*angle).into());
        }
        SequenceAction::Turn {
            state,
            target,
            angle,
        } => {
            write_state(state, obj);
            write_target(target, obj);
            obj.insert("angle".into(), (*angle).into());
        }
        SequenceAction::NextTurn => {}
    }
}

impl WireCodec for SequenceElement {
    fn to_wire(&self) -> JsonValue {
        let mut obj = stamped(self.id, self.version);
        write_action(&self.action, &mut obj);
        JsonValue::Object(obj)
    }

    fn from_wire(value: &JsonValue) -> Result<Self> {
        let obj = WireObject::new(value, "element")?;
        Ok(Self {
            id: obj.id()?,
            version: obj.version()?.unwrap_or(0),
            action: read_action(&obj)?,
        })
    }
}

impl WireCodec for Sequence {
    fn to_wire(&self) -> JsonValue {
        let mut obj = stamped(self.id, self.version);
        obj.insert("game".into(), self.game.into());
        obj.insert("count".into(), self.count.into());
        obj.insert(
            "elements".into(),
            JsonValue::Array(self.elements.iter().map(WireCodec::to_wire).collect()),
        );
        JsonValue::Object(obj)
    }

    fn from_wire(value: &JsonValue) -> Result<Self> {
        let obj = WireObject::new(value, "sequence")?;
        let elements = obj
            .array("elements")?
            .iter()
            .map(SequenceElement::from_wire)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            id: obj.id()?,
            version: obj.version()?.unwrap_or(0),
            game: obj.u64("game")?,
            count: obj.u32("count")?,
            elements,
        })
    }
}

pub fn decode_element(value: &JsonValue) -> Result<SequenceElement> {
    SequenceElement::from_wire(value)
}

pub fn encode_element(element: &SequenceElement) -> JsonValue {
    element.to_wire()
}

pub fn decode_sequence(value: &JsonValue) -> Result<Sequence> {
    Sequence::from_wire(value)
}

pub fn encode_sequence(sequence: &Sequence) -> JsonValue {
    sequence.to_wire()
}

//! Effect field decoder
//!
//! The low 12 bits of a note word hold the effect:
//! ```text
//! iiii aaaa bbbb
//! ```
//! - `i` = 14: extended command, id = 16 + `a`, single argument `b`
//! - `i` in the dual set: arguments `a` and `b`
//! - `i` in the single set: one argument `aaaabbbb`
//! - anything else: [`Effect::Unassigned`]

use num_traits::FromPrimitive;

use crate::song::{Arity, Effect, EffectId};

/// Decode a 12-bit effect field.
pub fn decode_effect(raw: u16) -> Effect {
    let id = ((raw >> 8) & 0x0F) as u8;
    let hi = ((raw >> 4) & 0x0F) as u8;
    let lo = (raw & 0x0F) as u8;
    let param = (raw & 0xFF) as u8;

    if id == EffectId::EXTENDED {
        let ext_id = 16 + hi;
        return match EffectId::from_u8(ext_id) {
            Some(kind) => Effect::from_parts(kind, Some(lo), None),
            None => Effect::Unassigned {
                id: ext_id,
                param: lo,
            },
        };
    }

    match EffectId::from_u8(id) {
        Some(kind) => match kind.arity() {
            Arity::Single => Effect::from_parts(kind, Some(param), None),
            Arity::Dual => Effect::from_parts(kind, Some(hi), Some(lo)),
        },
        None => Effect::Unassigned { id, param },
    }
}

//! Pattern effect commands
//!
//! A note's 12-bit effect field resolves to an identifier plus up to two arguments.
//! Identifiers 0-15 are the main commands; the `E` command (14) expands into 16
//! extended commands numbered 16-31.

use num_derive::{FromPrimitive, ToPrimitive};

/// Effect identifiers. Gaps (8 and the unused `E8x`) have no entry here and decode
/// to [`Effect::Unassigned`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum EffectId {
    /// `0xy` arpeggio
    Arpeggio = 0,
    /// `1xx` slide pitch up
    PortamentoUp = 1,
    /// `2xx` slide pitch down
    PortamentoDown = 2,
    /// `3xx` slide towards the note
    TonePortamento = 3,
    /// `4xy` vibrato
    Vibrato = 4,
    /// `5xy` tone portamento + volume slide
    TonePortamentoVolumeSlide = 5,
    /// `6xy` vibrato + volume slide
    VibratoVolumeSlide = 6,
    /// `7xy` tremolo
    Tremolo = 7,
    /// `9xx` start the sample at an offset
    SampleOffset = 9,
    /// `Axy` volume slide
    VolumeSlide = 10,
    /// `Bxx` jump to play position
    PositionJump = 11,
    /// `Cxx` set volume
    SetVolume = 12,
    /// `Dxx` break to next pattern
    PatternBreak = 13,
    /// `Fxx` set speed/tempo
    SetSpeed = 15,
    /// `E0x` hardware filter
    SetFilter = 16,
    /// `E1x` fine slide up
    FinePortamentoUp = 17,
    /// `E2x` fine slide down
    FinePortamentoDown = 18,
    /// `E3x` glissando control
    Glissando = 19,
    /// `E4x` vibrato waveform
    VibratoWaveform = 20,
    /// `E5x` set finetune
    SetFinetune = 21,
    /// `E6x` pattern loop
    PatternLoop = 22,
    /// `E7x` tremolo waveform
    TremoloWaveform = 23,
    /// `E9x` retrigger note
    RetriggerNote = 25,
    /// `EAx` fine volume slide up
    FineVolumeSlideUp = 26,
    /// `EBx` fine volume slide down
    FineVolumeSlideDown = 27,
    /// `ECx` cut note
    NoteCut = 28,
    /// `EDx` delay note
    NoteDelay = 29,
    /// `EEx` delay pattern
    PatternDelay = 30,
    /// `EFx` invert loop
    InvertLoop = 31,
}

/// How the argument bits of an effect are split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// One 8-bit argument (or one 4-bit argument for extended commands)
    Single,
    /// Two 4-bit arguments
    Dual,
}

impl EffectId {
    /// Identifier of the extended-command escape in the raw effect field.
    pub const EXTENDED: u8 = 14;

    /// Argument layout for this command.
    pub fn arity(self) -> Arity {
        match self {
            EffectId::Arpeggio
            | EffectId::Vibrato
            | EffectId::TonePortamentoVolumeSlide
            | EffectId::VibratoVolumeSlide
            | EffectId::Tremolo
            | EffectId::VolumeSlide => Arity::Dual,
            _ => Arity::Single,
        }
    }

    /// True for the `E` sub-commands (ids 16-31).
    pub fn is_extended(self) -> bool {
        self as u8 >= 16
    }
}

/// A decoded effect: kind plus its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    /// `0xy`; `000` is the usual "no effect" row
    Arpeggio {
        /// First semitone offset
        x: u8,
        /// Second semitone offset
        y: u8,
    },
    /// `1xx`
    PortamentoUp(u8),
    /// `2xx`
    PortamentoDown(u8),
    /// `3xx`
    TonePortamento(u8),
    /// `4xy`
    Vibrato {
        /// Oscillation speed
        speed: u8,
        /// Oscillation depth
        depth: u8,
    },
    /// `5xy`
    TonePortamentoVolumeSlide {
        /// Slide up amount
        up: u8,
        /// Slide down amount
        down: u8,
    },
    /// `6xy`
    VibratoVolumeSlide {
        /// Slide up amount
        up: u8,
        /// Slide down amount
        down: u8,
    },
    /// `7xy`
    Tremolo {
        /// Oscillation speed
        speed: u8,
        /// Oscillation depth
        depth: u8,
    },
    /// `9xx`
    SampleOffset(u8),
    /// `Axy`
    VolumeSlide {
        /// Slide up amount
        up: u8,
        /// Slide down amount
        down: u8,
    },
    /// `Bxx`
    PositionJump(u8),
    /// `Cxx`, 0-64
    SetVolume(u8),
    /// `Dxx`
    PatternBreak(u8),
    /// `Fxx`
    SetSpeed(u8),
    /// Any `Ex` sub-command with its single 4-bit argument
    Extended(EffectId, u8),
    /// An identifier with no assigned command; carries the raw parameter bits
    Unassigned {
        /// Resolved identifier (8 or 24)
        id: u8,
        /// Raw parameter bits
        param: u8,
    },
}

impl Default for Effect {
    fn default() -> Self {
        Effect::Arpeggio { x: 0, y: 0 }
    }
}

impl Effect {
    /// Build an effect from a known identifier and its already-split arguments.
    ///
    /// Missing arguments read as zero.
    pub fn from_parts(id: EffectId, arg1: Option<u8>, arg2: Option<u8>) -> Self {
        let a = arg1.unwrap_or(0);
        let b = arg2.unwrap_or(0);
        match id {
            EffectId::Arpeggio => Effect::Arpeggio { x: a, y: b },
            EffectId::PortamentoUp => Effect::PortamentoUp(a),
            EffectId::PortamentoDown => Effect::PortamentoDown(a),
            EffectId::TonePortamento => Effect::TonePortamento(a),
            EffectId::Vibrato => Effect::Vibrato { speed: a, depth: b },
            EffectId::TonePortamentoVolumeSlide => {
                Effect::TonePortamentoVolumeSlide { up: a, down: b }
            }
            EffectId::VibratoVolumeSlide => Effect::VibratoVolumeSlide { up: a, down: b },
            EffectId::Tremolo => Effect::Tremolo { speed: a, depth: b },
            EffectId::SampleOffset => Effect::SampleOffset(a),
            EffectId::VolumeSlide => Effect::VolumeSlide { up: a, down: b },
            EffectId::PositionJump => Effect::PositionJump(a),
            EffectId::SetVolume => Effect::SetVolume(a),
            EffectId::PatternBreak => Effect::PatternBreak(a),
            EffectId::SetSpeed => Effect::SetSpeed(a),
            extended => Effect::Extended(extended, a),
        }
    }

    /// Numeric identifier (0-31).
    pub fn id(&self) -> u8 {
        match self {
            Effect::Arpeggio { .. } => EffectId::Arpeggio as u8,
            Effect::PortamentoUp(_) => EffectId::PortamentoUp as u8,
            Effect::PortamentoDown(_) => EffectId::PortamentoDown as u8,
            Effect::TonePortamento(_) => EffectId::TonePortamento as u8,
            Effect::Vibrato { .. } => EffectId::Vibrato as u8,
            Effect::TonePortamentoVolumeSlide { .. } => EffectId::TonePortamentoVolumeSlide as u8,
            Effect::VibratoVolumeSlide { .. } => EffectId::VibratoVolumeSlide as u8,
            Effect::Tremolo { .. } => EffectId::Tremolo as u8,
            Effect::SampleOffset(_) => EffectId::SampleOffset as u8,
            Effect::VolumeSlide { .. } => EffectId::VolumeSlide as u8,
            Effect::PositionJump(_) => EffectId::PositionJump as u8,
            Effect::SetVolume(_) => EffectId::SetVolume as u8,
            Effect::PatternBreak(_) => EffectId::PatternBreak as u8,
            Effect::SetSpeed(_) => EffectId::SetSpeed as u8,
            Effect::Extended(id, _) => *id as u8,
            Effect::Unassigned { id, .. } => *id,
        }
    }

    /// Arguments in decode order; absent ones are `None`.
    pub fn args(&self) -> (Option<u8>, Option<u8>) {
        match *self {
            Effect::Arpeggio { x: a, y: b }
            | Effect::Vibrato { speed: a, depth: b }
            | Effect::TonePortamentoVolumeSlide { up: a, down: b }
            | Effect::VibratoVolumeSlide { up: a, down: b }
            | Effect::Tremolo { speed: a, depth: b }
            | Effect::VolumeSlide { up: a, down: b } => (Some(a), Some(b)),
            Effect::PortamentoUp(a)
            | Effect::PortamentoDown(a)
            | Effect::TonePortamento(a)
            | Effect::SampleOffset(a)
            | Effect::PositionJump(a)
            | Effect::SetVolume(a)
            | Effect::PatternBreak(a)
            | Effect::SetSpeed(a)
            | Effect::Extended(_, a) => (Some(a), None),
            Effect::Unassigned { param, .. } => (Some(param), None),
        }
    }

    /// True for the all-zero effect field.
    pub fn is_noop(&self) -> bool {
        matches!(self, Effect::Arpeggio { x: 0, y: 0 })
    }
}

#![allow(dead_code)]

//! Synthetic module bytes for the integration tests.

pub const PATTERNS_OFFSET: usize = 0x043C;
pub const PATTERN_SIZE: usize = 1024;

/// A sample table entry; lengths in frames (must be even).
pub struct SampleSpec {
    pub name: &'static str,
    pub finetune: u8,
    pub volume: u8,
    pub loop_start: usize,
    pub loop_length: usize,
    pub data: Vec<u8>,
}

impl SampleSpec {
    pub fn one_shot(data: Vec<u8>) -> Self {
        SampleSpec {
            name: "oneshot",
            finetune: 0,
            volume: 64,
            loop_start: 0,
            loop_length: 2,
            data,
        }
    }
}

/// A note cell as stored in the file (1-based sample number, 0 = none).
pub fn pack_note(sample_no: u8, period: u16, effect: u16) -> [u8; 4] {
    [
        (sample_no & 0xF0) | ((period >> 8) as u8 & 0x0F),
        (period & 0xFF) as u8,
        ((sample_no & 0x0F) << 4) | ((effect >> 8) as u8 & 0x0F),
        (effect & 0xFF) as u8,
    ]
}

pub struct ModuleBuilder {
    pub name: &'static str,
    pub repeat_idx: u8,
    pub order: Vec<u8>,
    pub magic: [u8; 4],
    pub samples: Vec<SampleSpec>,
    pub notes: Vec<(usize, usize, usize, [u8; 4])>,
}

impl ModuleBuilder {
    pub fn new(order: Vec<u8>) -> Self {
        ModuleBuilder {
            name: "synthetic",
            repeat_idx: 0,
            order,
            magic: *b"M.K.",
            samples: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Place a note at (pattern, channel, row).
    pub fn note(mut self, pattern: usize, channel: usize, row: usize, word: [u8; 4]) -> Self {
        self.notes.push((pattern, channel, row, word));
        self
    }

    pub fn sample(mut self, spec: SampleSpec) -> Self {
        self.samples.push(spec);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let pattern_count = self.order.iter().copied().max().unwrap_or(0) as usize + 1;
        let mut data = vec![0u8; PATTERNS_OFFSET + pattern_count * PATTERN_SIZE];

        let name = self.name.as_bytes();
        data[..name.len()].copy_from_slice(name);

        for (i, s) in self.samples.iter().enumerate() {
            let entry = 0x14 + i * 30;
            data[entry..entry + s.name.len()].copy_from_slice(s.name.as_bytes());
            data[entry + 22..entry + 24].copy_from_slice(&((s.data.len() / 2) as u16).to_be_bytes());
            data[entry + 24] = s.finetune;
            data[entry + 25] = s.volume;
            data[entry + 26..entry + 28].copy_from_slice(&((s.loop_start / 2) as u16).to_be_bytes());
            data[entry + 28..entry + 30].copy_from_slice(&((s.loop_length / 2) as u16).to_be_bytes());
        }

        data[0x3B6] = self.order.len() as u8;
        data[0x3B7] = self.repeat_idx;
        data[0x3B8..0x3B8 + self.order.len()].copy_from_slice(&self.order);
        data[0x438..0x43C].copy_from_slice(&self.magic);

        for &(pattern, channel, row, word) in &self.notes {
            let addr = PATTERNS_OFFSET + pattern * PATTERN_SIZE + channel * 4 + row * 16;
            data[addr..addr + 4].copy_from_slice(&word);
        }

        for s in &self.samples {
            data.extend_from_slice(&s.data);
        }
        data
    }
}

/// Normalized value of a raw sample byte.
pub fn level(byte: u8) -> f32 {
    f32::from(byte as i8) / 128.0
}

//! Loop-aware frame extraction
//!
//! Cuts the `frame_no`-th fixed-size frame out of a (possibly looping) waveform.
//! Positions are absolute: frame `n` starts at sample `n * frame_size`, however many
//! times the loop has already wrapped by then.

use crate::song::LoopRegion;

/// Fill `out` with the waveform starting at absolute sample `start`.
///
/// Without a loop, whatever remains of the waveform is copied and the rest is
/// silence. With a loop, samples before the loop are copied as-is and everything
/// from the loop start on is read from `[loop.start, loop.end())` modulo its length.
pub fn fill_window(out: &mut [f32], data: &[f32], loop_region: Option<LoopRegion>, start: usize) {
    out.fill(0.0);

    let loop_region = loop_region.filter(|r| r.length > 0 && r.end() <= data.len());
    let Some(region) = loop_region else {
        if start < data.len() {
            let n = (data.len() - start).min(out.len());
            out[..n].copy_from_slice(&data[start..start + n]);
        }
        return;
    };

    let mut pos = start;
    let mut written = 0;
    while written < out.len() {
        let (from, n) = if pos < region.start {
            (pos, (region.start - pos).min(out.len() - written))
        } else {
            let offset = (pos - region.start) % region.length;
            (
                region.start + offset,
                (region.length - offset).min(out.len() - written),
            )
        };
        out[written..written + n].copy_from_slice(&data[from..from + n]);
        // folded back into the first loop pass
        pos = from + n;
        written += n;
    }
}

/// Allocate and return frame `frame_no` of `frame_size` samples.
pub fn extract_window(
    data: &[f32],
    loop_region: Option<LoopRegion>,
    frame_no: usize,
    frame_size: usize,
) -> Vec<f32> {
    let mut out = vec![0.0; frame_size];
    fill_window(&mut out, data, loop_region, frame_no.saturating_mul(frame_size));
    out
}

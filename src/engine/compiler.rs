//! Step grid -> pattern source text.
//!
//! A grid becomes a space separated structure mask (`x` for a hit, `~` for
//! a rest). Sample sounds repeat the sample once per step and mask it;
//! tonal sounds play a fixed reference note with the mask as rhythm.

use super::track::SoundId;

pub const HIT: &str = "x";
pub const REST: &str = "~";

/// Pitch tonal tracks play at.
pub const REFERENCE_NOTE: &str = "c3";

pub fn structure_mask(steps: &[bool]) -> String {
    steps
        .iter()
        .map(|&on| if on { HIT } else { REST })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns `None` for a grid with no active steps: such a track
/// contributes nothing to a composition.
pub fn compile_track(steps: &[bool], sound: &SoundId) -> Option<String> {
    if !steps.iter().any(|&s| s) {
        return None;
    }
    let mask = structure_mask(steps);
    let fragment = if sound.is_tonal() {
        format!("note(\"{REFERENCE_NOTE}\").s(\"{sound}\").struct(\"{mask}\")")
    } else {
        format!("s(\"{sound}*{n}\").struct(\"{mask}\")", n = steps.len())
    };
    Some(fragment)
}

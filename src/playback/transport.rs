//! The playback device seam.

use super::types::InstructionSequence;
use crate::error::MozartError;
use crate::event::Tick;

/// A device that plays an installed sequence in real time.
///
/// Only one sequence is installed at a time; installing a new one replaces the
/// previous one. Playback state is observed by polling.
pub trait Transport {
    fn is_running(&self) -> bool;

    /// Current tick within the installed sequence.
    fn tick_position(&self) -> Tick;

    fn start(&mut self);

    fn stop(&mut self);

    fn install_sequence(&mut self, sequence: &InstructionSequence) -> Result<(), MozartError>;

    fn set_tempo(&mut self, mpq: u32);

    fn set_loop_count(&mut self, count: u32);
}

/// Stop whatever is playing, install `sequence` and start it.
pub fn play_sequence<T: Transport + ?Sized>(
    transport: &mut T,
    sequence: &InstructionSequence,
) -> Result<(), MozartError> {
    if transport.is_running() {
        transport.stop();
    }
    transport.install_sequence(sequence)?;
    if let Some(mpq) = sequence.tempo {
        transport.set_tempo(mpq);
    }
    transport.set_loop_count(sequence.loop_count);
    transport.start();
    log::debug!(
        "started sequence of {} instruction(s), loop count {}",
        sequence.instructions.len(),
        sequence.loop_count
    );
    Ok(())
}

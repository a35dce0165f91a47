/// Text-to-speech capability used by cooking mode for read-aloud.
pub trait Speaker {
    fn speak(&mut self, text: &str) -> anyhow::Result<()>;
    fn cancel(&mut self);
    fn is_speaking(&self) -> bool;
}

/// Speaker that never makes a sound.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSpeaker;

impl Speaker for SilentSpeaker {
    fn speak(&mut self, _text: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn cancel(&mut self) {}

    fn is_speaking(&self) -> bool {
        false
    }
}

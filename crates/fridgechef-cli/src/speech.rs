use std::cell::RefCell;
use std::process::{Child, Command, Stdio};

use anyhow::{bail, Context, Result};
use fridgechef_contracts::speech::Speaker;

pub const TTS_COMMAND_ENV: &str = "FRIDGECHEF_TTS_COMMAND";

/// Runs an external text-to-speech program with the narration as its last argument,
/// e.g. `FRIDGECHEF_TTS_COMMAND="espeak -s 150"`.
#[derive(Debug)]
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
    child: RefCell<Option<Child>>,
}

impl CommandSpeaker {
    pub fn from_command_line(command_line: &str) -> Result<Self> {
        let mut parts = shell_words::split(command_line)
            .with_context(|| format!("invalid {TTS_COMMAND_ENV}: {command_line}"))?
            .into_iter();
        let Some(program) = parts.next() else {
            bail!("{TTS_COMMAND_ENV} is empty");
        };
        Ok(Self {
            program,
            args: parts.collect(),
            child: RefCell::new(None),
        })
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&mut self, text: &str) -> Result<()> {
        self.cancel();
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start speech command '{}'", self.program))?;
        *self.child.get_mut() = Some(child);
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.child.get_mut().take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn is_speaking(&self) -> bool {
        let mut slot = self.child.borrow_mut();
        let running = match slot.as_mut().map(Child::try_wait) {
            Some(Ok(None)) => true,
            Some(Ok(Some(_))) | Some(Err(_)) | None => false,
        };
        if !running {
            *slot = None;
        }
        running
    }
}

impl Drop for CommandSpeaker {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Fallback when no speech program is configured: prints the narration.
#[derive(Debug, Default)]
pub struct ConsoleSpeaker;

impl Speaker for ConsoleSpeaker {
    fn speak(&mut self, text: &str) -> Result<()> {
        println!("(read aloud) {text}");
        Ok(())
    }

    fn cancel(&mut self) {}

    fn is_speaking(&self) -> bool {
        false
    }
}

pub fn speaker_from_env() -> Box<dyn Speaker> {
    let Ok(command_line) = std::env::var(TTS_COMMAND_ENV) else {
        return Box::new(ConsoleSpeaker);
    };
    match CommandSpeaker::from_command_line(&command_line) {
        Ok(speaker) => Box::new(speaker),
        Err(err) => {
            eprintln!("fridgechef: {err:#}; falling back to console narration");
            Box::new(ConsoleSpeaker)
        }
    }
}

#[cfg(test)]
mod tests {
    use fridgechef_contracts::speech::Speaker;

    use super::CommandSpeaker;

    #[test]
    fn parses_program_and_arguments() -> anyhow::Result<()> {
        let speaker = CommandSpeaker::from_command_line("espeak -v 'en-us' -s 150")?;
        assert_eq!(speaker.program, "espeak");
        assert_eq!(speaker.args, vec!["-v", "en-us", "-s", "150"]);
        assert!(CommandSpeaker::from_command_line("   ").is_err());
        assert!(CommandSpeaker::from_command_line("say 'unterminated").is_err());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn cancel_stops_a_running_command() -> anyhow::Result<()> {
        let mut speaker = CommandSpeaker::from_command_line("sleep")?;
        speaker.speak("30")?;
        assert!(speaker.is_speaking());
        speaker.cancel();
        assert!(!speaker.is_speaking());
        Ok(())
    }

    #[test]
    fn missing_program_is_an_error() -> anyhow::Result<()> {
        let mut speaker = CommandSpeaker::from_command_line("fridgechef-no-such-tts-binary")?;
        assert!(speaker.speak("Step 1: boil water").is_err());
        assert!(!speaker.is_speaking());
        Ok(())
    }
}

use crate::LogSource;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use crate::reader::read_line_lossy;
use tokio::io::BufReader;
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info};

/// Reads lines from the stdout of a spawned log process (by default
/// `adb logcat -s USB_MUSIC:D`). The child is killed when the source drops.
pub struct CommandSource {
    program: String,
    child: Child,
    stdout: BufReader<ChildStdout>,
    buf: Vec<u8>,
}

impl CommandSource {
    pub fn spawn(argv: &[String]) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("log source command is empty"))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn log source `{program}`"))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("log source `{program}` has no stdout"))?;

        info!(program = %program, ?args, "log source process started");
        Ok(Self {
            program: program.clone(),
            child,
            stdout: BufReader::new(stdout),
            buf: Vec::new(),
        })
    }
}

#[async_trait]
impl LogSource for CommandSource {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        let line = read_line_lossy(&mut self.stdout, &mut self.buf)
            .await
            .with_context(|| format!("failed reading output of `{}`", self.program))?;
        if line.is_none() {
            let status = self.child.wait().await.ok();
            debug!(program = %self.program, ?status, "log source process exited");
        }
        Ok(line)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::CommandSource;
    use crate::LogSource;

    #[tokio::test]
    async fn streams_child_stdout_until_exit() {
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            "printf 'one\\ntwo\\n'".to_string(),
        ];
        let mut source = CommandSource::spawn(&argv).unwrap();
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("one"));
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("two"));
        assert_eq!(source.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn non_utf8_output_is_decoded_lossily() {
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            "printf 'bad \\377\\r\\nok\\n'".to_string(),
        ];
        let mut source = CommandSource::spawn(&argv).unwrap();
        assert_eq!(
            source.next_line().await.unwrap().as_deref(),
            Some("bad \u{FFFD}")
        );
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("ok"));
        assert_eq!(source.next_line().await.unwrap(), None);
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(CommandSource::spawn(&[]).is_err());
    }
}

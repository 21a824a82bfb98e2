//! Child process plumbing for linter sessions.
//!
//! sqlfluff may fork worker processes, so on Unix each linter runs in its
//! own session and termination targets the whole process group.

use tokio::process::{Child, Command};

/// Put the child in its own session so [`terminate`] can signal the group.
///
/// On Linux the child also gets `SIGKILL` when its parent goes away. The
/// kernel ties that to the spawning thread, not the process: on a
/// multi-thread runtime the linter dies if the worker thread that spawned
/// it exits.
#[cfg(unix)]
pub(crate) fn set_new_session(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    // SAFETY: setsid and prctl are async-signal-safe.
    unsafe {
        cmd.as_std_mut().pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            #[cfg(target_os = "linux")]
            if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL) == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
pub(crate) fn set_new_session(_cmd: &mut Command) {}

/// Kill the child (and its process group on Unix), then reap it.
///
/// Safe to call on a child that has already exited.
pub(crate) async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: plain syscall; pid == pgid because of `set_new_session`.
        unsafe {
            libc::killpg(pid as i32, libc::SIGKILL);
        }
    }
    let _ = child.start_kill();
    if let Err(e) = child.wait().await {
        tracing::debug!("Failed to reap linter process: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_child_leads_its_own_session() {
        // Field 6 of /proc/<pid>/stat is the session id.
        let mut cmd = Command::new("sh");
        cmd.args(["-c", r#"echo $$; cut -d' ' -f6 /proc/$$/stat"#])
            .stdout(Stdio::piped());
        set_new_session(&mut cmd);

        let output = cmd.output().await.unwrap();
        let stdout = String::from_utf8(output.stdout).unwrap();
        let mut lines = stdout.lines();
        let pid = lines.next().unwrap();
        let sid = lines.next().unwrap();
        assert_eq!(pid, sid);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_reaps_running_child() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "sleep 30"]);
        set_new_session(&mut cmd);
        let mut child = cmd.spawn().unwrap();

        terminate(&mut child).await;
        assert!(child.try_wait().unwrap().is_some());
        // Already reaped; a second call is harmless.
        terminate(&mut child).await;
    }
}

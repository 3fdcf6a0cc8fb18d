// src/exec/shell.rs

//! Shell invocation for task command lines.

use tokio::process::Command;

/// Build the platform shell command that runs `cmdline` verbatim.
///
/// With `merge_stderr`, the shell's stderr is redirected onto its stdout
/// before the command runs, so both streams share one pipe and one ordering.
pub fn shell_command(cmdline: &str, merge_stderr: bool) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        if merge_stderr {
            c.arg("/C").arg(format!("({cmdline}) 2>&1"));
        } else {
            c.arg("/C").arg(cmdline);
        }
        c
    } else {
        let mut c = Command::new("sh");
        if merge_stderr {
            c.arg("-c").arg(format!("exec 2>&1\n{cmdline}"));
        } else {
            c.arg("-c").arg(cmdline);
        }
        c
    }
}

/// Translate POSIX sequencing and grouping operators to their `cmd.exe`
/// equivalents (`;` → `&`, `{` → `(`, `}` → `)`).
///
/// The engine never rewrites command lines itself; callers that target
/// Windows apply this while building them.
pub fn translate_for_cmd_exe(cmdline: &str) -> String {
    cmdline
        .chars()
        .map(|c| match c {
            ';' => '&',
            '{' => '(',
            '}' => ')',
            other => other,
        })
        .collect()
}

/// Command line as it should be handed to the engine on this platform.
pub fn platform_cmdline(cmdline: &str) -> String {
    if cfg!(windows) {
        translate_for_cmd_exe(cmdline)
    } else {
        cmdline.to_string()
    }
}

//! Sandbox hardening commands.
//!
//! The supervisor hardens a sandbox by executing a short, fixed sequence of
//! shell commands through the sandbox provider's exec interface (see
//! `warden_supervisor::provider::SandboxProvider`) — this crate owns only
//! the command text, not the exec plumbing, since that belongs to whichever
//! provider is wired in.

/// Commands that strip `sudo`/`su` access from the agent user and remove it
/// from privileged groups. Run as the privileged user, before the agent
/// user's first command.
#[must_use]
pub fn strip_privileged_commands(agent_user: &str) -> Vec<String> {
    vec![
        "chmod 000 /usr/bin/sudo /bin/sudo 2>/dev/null || true".to_owned(),
        "chmod 000 /usr/bin/su /bin/su 2>/dev/null || true".to_owned(),
        format!("gpasswd -d {agent_user} sudo 2>/dev/null || true"),
        format!("gpasswd -d {agent_user} wheel 2>/dev/null || true"),
    ]
}

/// Command that remounts `/proc` with `hidepid=2`, hiding other users'
/// processes (in particular, the credential proxy) from the agent user.
#[must_use]
pub fn remount_proc_hidepid_command() -> String {
    "mount -o remount,hidepid=2 /proc".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_privileged_commands_targets_the_agent_user() {
        let commands = strip_privileged_commands("agent");
        assert!(commands.iter().any(|c| c.contains("gpasswd -d agent sudo")));
    }

    #[test]
    fn remount_command_sets_hidepid_2() {
        assert!(remount_proc_hidepid_command().contains("hidepid=2"));
    }
}

//! Yes/no confirmation for destructive actions.

use crate::user::User;
use std::io::{self, Write};

/// How a confirmation request is answered without a human at the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unattended {
    /// Interactive session: ask on stdin
    Ask,
    /// One-shot mode with --yes
    Approve,
    /// One-shot mode without --yes
    Refuse,
}

pub struct Confirmer {
    mode: Unattended,
}

impl Confirmer {
    pub fn new(one_shot: bool, auto_yes: bool) -> Self {
        let mode = match (one_shot, auto_yes) {
            (_, true) => Unattended::Approve,
            (true, false) => Unattended::Refuse,
            (false, false) => Unattended::Ask,
        };
        Self { mode }
    }

    /// Ask whether `user` should be deleted
    pub fn confirm_delete(&self, user: &User) -> bool {
        match self.mode {
            Unattended::Approve => true,
            Unattended::Refuse => {
                eprintln!(
                    "Delete of {} ({}) declined - use --yes in -c mode",
                    user.id, user.username
                );
                false
            }
            Unattended::Ask => {
                println!("Delete user {} ({}, @{})?", user.id, user.name, user.username);
                print!("Confirm? [y/N]: ");
                io::stdout().flush().ok();

                let mut input = String::new();
                if io::stdin().read_line(&mut input).is_ok() {
                    is_yes(&input)
                } else {
                    false
                }
            }
        }
    }
}

fn is_yes(input: &str) -> bool {
    let input = input.trim().to_lowercase();
    input == "y" || input == "yes"
}

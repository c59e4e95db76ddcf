//! Colored status-line output shared by the core and the CLI.
//!
//! Commands narrate their progress as short lines; long-running steps are
//! wrapped in [`operation`], which prints the label followed by `OK` or
//! `ERROR` depending on the outcome.

use colored::Colorize;

pub fn log(msg: &str) {
    println!("{msg}");
}

pub fn success(msg: &str) {
    println!("{}", msg.green());
}

pub fn warn(msg: &str) {
    println!("{}", msg.yellow());
}

pub fn error_line(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Run `f` under a labeled operation, reporting `OK`/`ERROR` on completion.
pub fn operation<T, E>(label: &str, f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
    println!("{label} ...");
    match f() {
        Ok(value) => {
            println!("{label} {}", "OK".green());
            Ok(value)
        }
        Err(e) => {
            println!("{label} {}", "ERROR".red());
            Err(e)
        }
    }
}

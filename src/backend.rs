//! Backend-specific command construction.
//!
//! The tree core only consumes reply text; building the command strings that
//! produce it is the adapter's job, selected once per debugging session.

use crate::command::locals::SECTION_DELIMITER;

pub trait BackendAdapter {
    /// One-time setup commands sent right after the backend starts. Expected
    /// to normalize output into the raw, uncompressed, single-line-per-group
    /// shape the reply grammar assumes.
    fn init_commands(&self) -> Vec<String>;

    /// Evaluation command for one expression.
    fn print_command(&self, expr: &str) -> String;

    /// The combined arguments+locals command. Its reply must carry the two
    /// sections separated by [`SECTION_DELIMITER`] wrapped in newlines.
    fn frame_vars_command(&self) -> String;
}

/// Command construction for GDB's console interpreter.
#[derive(Debug, Default, Clone, Copy)]
pub struct GdbAdapter;

impl BackendAdapter for GdbAdapter {
    fn init_commands(&self) -> Vec<String> {
        vec![
            // pretty-printing, array limits and repeat compression would all
            // break the reply grammar
            "set print pretty off".to_string(),
            "set print array off".to_string(),
            "set print repeats 0".to_string(),
            "set print elements 0".to_string(),
            "set width 0".to_string(),
            format!(
                "define frame-vars\ninfo args\necho \\n{SECTION_DELIMITER}\\n\ninfo locals\nend"
            ),
        ]
    }

    fn print_command(&self, expr: &str) -> String {
        format!("print {expr}")
    }

    fn frame_vars_command(&self) -> String {
        "frame-vars".to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_print_command() {
        assert_eq!(GdbAdapter.print_command("s.p->x"), "print s.p->x");
    }

    #[test]
    fn test_init_defines_frame_vars_command() {
        let init = GdbAdapter.init_commands();
        let define = init
            .iter()
            .find(|c| c.starts_with("define frame-vars"))
            .expect("frame-vars definition present");
        assert!(define.contains(SECTION_DELIMITER));
        assert!(init.iter().any(|c| c == "set print pretty off"));
    }
}
